pub mod bootstrap;
pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod telemetry;

pub use client::ClientReport;
pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use telemetry::{HandshakeTelemetry, TelemetrySnapshot};
