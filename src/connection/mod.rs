//! Connections: live UDP ingestion and background track replay.

pub mod live;
pub mod replay;


pub use live::LiveConnection;
pub use replay::ReplayConnection;
