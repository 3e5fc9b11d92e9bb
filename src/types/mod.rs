//! Core types for telemetry data representation.
//!
//! ## Architecture
//!
//! - [`FieldKind`] names one field of a telemetry block and knows its wire width
//! - [`Schema`] is the ordered field layout, resolved once from configuration
//! - [`Datagram`] is one decoded sample
//! - [`FramePacket`] is an undecoded message as it left the transport
//!
//! ## Usage Example
//!
//! ```rust
//! use flightdeck::types::{FieldKind, Schema};
//!
//! let schema = Schema::resolve(["Timestamp", "Position", "Velocity", "Throttle"]);
//! assert_eq!(schema.fields()[3], FieldKind::Unknown);
//! assert_eq!(schema.block_length(), 4 + 12 + 12);
//! assert!(schema.has_field(FieldKind::Velocity));
//! assert!(!schema.has_field(FieldKind::Gyro));
//! ```

mod datagram;
mod field_kind;
mod frame;
mod schema;

// Re-export all public types
pub use datagram::Datagram;
pub use field_kind::{ASSUMED_MOTOR_COUNT, BYTE, FLOAT32, FieldKind};
pub use frame::FramePacket;
pub use schema::Schema;

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn arb_token() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(FieldKind::KNOWN.to_vec()).prop_map(|k| k.name().to_string()),
            "[a-z][a-zA-Z]{0,8}",
        ]
    }

    proptest! {
        #[test]
        fn prop_block_length_is_sum_of_sizing_widths(
            tokens in prop::collection::vec(arb_token(), 0..16)
        ) {
            let schema = Schema::resolve(&tokens);
            let expected: usize = tokens
                .iter()
                .map(|t| FieldKind::from_name(t).sizing_width())
                .sum();
            prop_assert_eq!(schema.block_length(), expected);
            prop_assert_eq!(schema.len(), tokens.len());
            prop_assert_eq!(schema.header_line(), tokens.join(","));
        }

        #[test]
        fn prop_names_round_trip_through_kinds(kind in prop::sample::select(FieldKind::KNOWN.to_vec())) {
            prop_assert_eq!(FieldKind::from_name(kind.name()), kind);
        }
    }

    #[test]
    fn field_widths_match_wire_format() {
        assert_eq!(FieldKind::Timestamp.width(), Some(4));
        assert_eq!(FieldKind::Position.width(), Some(12));
        assert_eq!(FieldKind::Attitude.width(), Some(16));
        assert_eq!(FieldKind::Velocity.width(), Some(12));
        assert_eq!(FieldKind::Gyro.width(), Some(12));
        assert_eq!(FieldKind::Input.width(), Some(16));
        assert_eq!(FieldKind::Battery.width(), Some(8));
        assert_eq!(FieldKind::MotorArray.width(), None);
        assert_eq!(FieldKind::Unknown.width(), Some(0));
        assert_eq!(FieldKind::MotorArray.sizing_width(), 17);
        assert_eq!(FieldKind::motor_array_width(6), 25);
    }

    #[test]
    fn full_schema_matches_simulator_block() {
        let schema = Schema::full();
        assert_eq!(schema.block_length(), 97);
        assert_eq!(
            schema.header_line(),
            "Timestamp,Position,Attitude,Velocity,Gyro,Input,Battery,MotorRPM"
        );
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn resolution_is_case_sensitive() {
        let schema = Schema::resolve(["timestamp", "POSITION", "MotorRPM"]);
        assert_eq!(
            schema.fields(),
            &[FieldKind::Unknown, FieldKind::Unknown, FieldKind::MotorArray]
        );
        assert_eq!(schema.names()[0], "timestamp");
    }

    #[test]
    fn degenerate_schemas_are_configuration_errors() {
        let empty = Schema::resolve(Vec::<String>::new());
        assert!(matches!(empty.validate(), Err(crate::TelemetryError::Configuration { .. })));

        let unknown_only = Schema::resolve(["Speed", "Rpm"]);
        assert_eq!(unknown_only.block_length(), 0);
        assert!(matches!(
            unknown_only.validate(),
            Err(crate::TelemetryError::Configuration { .. })
        ));
    }

    #[test]
    fn strict_resolution_names_the_offending_tokens() {
        let err = Schema::resolve_strict(["Timestamp", "Altitude", "Position", "Heading"])
            .expect_err("unknown tokens must be rejected");
        let msg = err.to_string();
        assert!(msg.contains("Altitude"));
        assert!(msg.contains("Heading"));

        let ok = Schema::resolve_strict(["Timestamp", "Position"]).expect("known tokens");
        assert_eq!(ok.block_length(), 16);
    }

    #[test]
    fn planar_distance_ignores_vertical_axis() {
        let a = Datagram::at(0.0, [0.0, 0.0, 0.0]);
        let b = Datagram::at(0.0, [3.0, 250.0, 4.0]);
        assert!((a.planar_distance(&b) - 5.0).abs() < 1e-9);
        assert!((b.planar_distance(&a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn zero_position_requires_all_axes() {
        assert!(Datagram::default().is_zero_position());
        assert!(!Datagram::at(0.0, [0.0, 0.1, 0.0]).is_zero_position());
        assert!(!Datagram::at(0.0, [0.0, 0.0, -0.5]).is_zero_position());
    }

    #[test]
    fn max_velocity_uses_absolute_components() {
        let d = Datagram { velocity: [1.5, -7.25, 3.0], ..Datagram::default() };
        assert_eq!(d.max_velocity_component(), 7.25);
    }
}
