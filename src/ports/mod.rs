//! Port traits: the engine's only view of its collaborators.

pub mod alert_port;
pub mod config_port;
pub mod data_port;
pub mod feed_port;
pub mod report_port;
