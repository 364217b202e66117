use std::sync::Arc;

use crypto::{HybridKeyPair, KeyExchangeMode, SharedSecret};
use handshake::{HandshakeObserver, HandshakeTransport};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::time::timeout;
use tracing::info;

use crate::bootstrap::{connect_with_failover, Endpoint};
use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};

/// Outcome of one client session
#[derive(Debug)]
pub struct ClientReport {
    pub endpoint: Endpoint,
    pub secret: SharedSecret,
    pub welcome: String,
}

impl ClientReport {
    pub fn mode(&self) -> KeyExchangeMode {
        self.secret.mode()
    }
}

/// Connect (with failover), handshake as initiator and read the greeting.
pub async fn run(config: &NodeConfig, observer: Arc<dyn HandshakeObserver>) -> NodeResult<ClientReport> {
    let handshake_config = config.handshake_config(observer)?;
    let keypair = if config.offer_pq {
        HybridKeyPair::generate(&config.kem_scheme)?
    } else {
        HybridKeyPair::generate_classical()?
    };

    let (socket, endpoint) = connect_with_failover(config).await?;
    let transport = HandshakeTransport::new(handshake_config);
    let established = transport.initiate(&keypair, socket).await?;
    let (secret, stream, buffered) = established.into_parts();

    let limit = config.max_handshake_message_size as u64;
    let mut reader = BufReader::new((&buffered[..]).chain(stream)).take(limit);
    let mut welcome = String::new();
    let greeting_timeout = config.handshake_timeout();
    timeout(greeting_timeout, reader.read_line(&mut welcome))
        .await
        .map_err(|_| NodeError::GreetingTimeout(greeting_timeout))??;
    if !welcome.ends_with('\n') {
        return Err(NodeError::InvalidInput(
            "server closed before sending a greeting".into(),
        ));
    }
    let welcome = welcome.trim_end().to_string();

    info!(
        endpoint = %endpoint,
        mode = %secret.mode(),
        fingerprint = %secret.fingerprint(),
        "received greeting: {}",
        welcome
    );

    Ok(ClientReport {
        endpoint,
        secret,
        welcome,
    })
}
