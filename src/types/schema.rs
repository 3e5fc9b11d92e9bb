//! Field schema describing the layout of one telemetry block

use serde::{Deserialize, Serialize};

use super::FieldKind;
use crate::{Result, TelemetryError};

/// Ordered field layout of a telemetry block. Insertion order is wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Configured tokens, kept verbatim for track headers
    names: Vec<String>,
    /// Resolved kinds, one per token
    fields: Vec<FieldKind>,
}

impl Schema {
    /// Resolve configured tokens into a schema.
    ///
    /// Never fails. Unrecognised tokens become [`FieldKind::Unknown`], which
    /// occupy no bytes and are skipped by the codec.
    pub fn resolve<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let fields = names.iter().map(|n| FieldKind::from_name(n)).collect();
        Self { names, fields }
    }

    /// Resolve configured tokens, rejecting any token that is not recognised.
    pub fn resolve_strict<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let schema = Self::resolve(names);
        let unknown: Vec<&str> = schema
            .names
            .iter()
            .zip(&schema.fields)
            .filter(|(_, kind)| **kind == FieldKind::Unknown)
            .map(|(name, _)| name.as_str())
            .collect();

        if !unknown.is_empty() {
            return Err(TelemetryError::configuration(format!(
                "unknown stream field(s): {}",
                unknown.join(", ")
            )));
        }

        schema.validate()?;
        Ok(schema)
    }

    /// Schema with every known field in canonical order.
    pub fn full() -> Self {
        Self::resolve(FieldKind::KNOWN.iter().map(|k| k.name()))
    }

    /// Build a schema directly from kinds.
    pub fn from_kinds(kinds: &[FieldKind]) -> Self {
        Self::resolve(kinds.iter().map(|k| k.name()))
    }

    /// Reject schemas that cannot describe any data.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(TelemetryError::configuration("stream format is empty"));
        }

        if self.fields.iter().all(|k| *k == FieldKind::Unknown) {
            return Err(TelemetryError::configuration(format!(
                "stream format has no recognised fields: {}",
                self.names.join(",")
            )));
        }

        Ok(())
    }

    /// Expected block length used to size buffers and frame messages.
    ///
    /// Motor arrays count as four motors regardless of what the stream carries.
    pub fn block_length(&self) -> usize {
        self.fields.iter().map(FieldKind::sizing_width).sum()
    }

    /// Whether the schema carries the given kind.
    pub fn has_field(&self, kind: FieldKind) -> bool {
        self.fields.contains(&kind)
    }

    /// Resolved kinds in wire order.
    pub fn fields(&self) -> &[FieldKind] {
        &self.fields
    }

    /// Configured tokens in wire order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Comma-joined tokens, as written on the first line of a track file.
    pub fn header_line(&self) -> String {
        self.names.join(",")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::full()
    }
}
