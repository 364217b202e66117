use std::fs::File;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crypto::DEFAULT_KEM_SCHEME;
use handshake::{HandshakeConfig, HandshakeConfigBuilder, HandshakeObserver};
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};

pub const DEFAULT_WELCOME_MESSAGE: &str = "Welcome to the Quantum Fortress!";

/// Settings shared by the server and client binaries. Missing keys in a
/// config file fall back to the defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen_addr: SocketAddr,
    pub primary_addr: String,
    pub backup_addr: String,
    pub connect_timeout_ms: u64,
    pub handshake_timeout_ms: u64,
    pub client_id: String,
    pub kem_scheme: String,
    pub offer_pq: bool,
    pub require_pq: bool,
    pub max_handshake_message_size: usize,
    pub welcome_message: String,
    pub verbose_logging: bool,
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> NodeResult<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> NodeResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Validated handshake settings with `observer` installed.
    pub fn handshake_config(
        &self,
        observer: Arc<dyn HandshakeObserver>,
    ) -> NodeResult<HandshakeConfig> {
        if self.connect_timeout_ms == 0 {
            return Err(NodeError::InvalidInput(
                "connect timeout must be non-zero".into(),
            ));
        }

        let mut builder = HandshakeConfigBuilder::new()
            .client_id(self.client_id.clone())
            .kem_scheme(self.kem_scheme.clone())
            .offer_pq(self.offer_pq)
            .require_pq(self.require_pq)
            .handshake_timeout(self.handshake_timeout())
            .max_message_size(self.max_handshake_message_size)
            .observer(observer);
        if self.verbose_logging {
            builder = builder.verbose();
        }
        Ok(builder.build()?)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            primary_addr: "127.0.0.1:9999".to_string(),
            backup_addr: "127.0.0.1:9001".to_string(),
            connect_timeout_ms: 2_000,
            handshake_timeout_ms: 30_000,
            client_id: "client-1".to_string(),
            kem_scheme: DEFAULT_KEM_SCHEME.to_string(),
            offer_pq: true,
            require_pq: false,
            max_handshake_message_size: 16 * 1024,
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            verbose_logging: false,
        }
    }
}
