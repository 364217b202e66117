//! Configuration for hybrid handshakes

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crypto::{resolve_scheme, DEFAULT_KEM_SCHEME};

use crate::error::{HandshakeError, Result};
use crate::observer::{HandshakeObserver, NoopObserver};

/// Smallest record limit that still fits a classical-only hello
const MIN_MESSAGE_SIZE: usize = 256;

/// Configuration for hybrid handshakes
#[derive(Clone)]
pub struct HandshakeConfig {
    /// Identifier sent in the ClientHello
    pub client_id: String,

    /// KEM assumed for a ClientHello that does not name one
    pub kem_scheme: String,

    /// Whether the initiator includes its post-quantum key
    pub offer_pq: bool,

    /// Whether to require post-quantum key material
    /// If true, reject peers that fall back to classical-only
    pub require_pq: bool,

    /// Handshake timeout
    pub handshake_timeout: Duration,

    /// Maximum length of a single handshake record
    pub max_handshake_message_size: usize,

    /// Whether to log detailed handshake information
    pub verbose_logging: bool,

    /// Receives downgrade, success and failure events
    pub observer: Arc<dyn HandshakeObserver>,
}

impl HandshakeConfig {
    /// Create a configuration with defaults
    pub fn new(client_id: impl Into<String>, require_pq: bool) -> Self {
        Self {
            client_id: client_id.into(),
            kem_scheme: DEFAULT_KEM_SCHEME.to_string(),
            offer_pq: true,
            require_pq,
            handshake_timeout: Duration::from_secs(30),
            max_handshake_message_size: 16 * 1024, // 16 KB
            verbose_logging: false,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Create a development configuration (downgrades allowed)
    pub fn development(client_id: impl Into<String>) -> Self {
        Self::new(client_id, false)
    }

    /// Create a production configuration (requires PQ)
    pub fn production(client_id: impl Into<String>) -> Self {
        Self::new(client_id, true)
    }

    /// Set the handshake timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Install an observer
    pub fn with_observer(mut self, observer: Arc<dyn HandshakeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stop offering a post-quantum key as initiator
    pub fn without_pq_offer(mut self) -> Self {
        self.offer_pq = false;
        self
    }

    /// Enable verbose logging
    pub fn with_verbose_logging(mut self) -> Self {
        self.verbose_logging = true;
        self
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self::development("mirage-client")
    }
}

impl fmt::Debug for HandshakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeConfig")
            .field("client_id", &self.client_id)
            .field("kem_scheme", &self.kem_scheme)
            .field("offer_pq", &self.offer_pq)
            .field("require_pq", &self.require_pq)
            .field("handshake_timeout", &self.handshake_timeout)
            .field("max_handshake_message_size", &self.max_handshake_message_size)
            .field("verbose_logging", &self.verbose_logging)
            .finish_non_exhaustive()
    }
}

/// Builder for HandshakeConfig
pub struct HandshakeConfigBuilder {
    client_id: Option<String>,
    kem_scheme: String,
    offer_pq: bool,
    require_pq: bool,
    handshake_timeout: Duration,
    max_handshake_message_size: usize,
    verbose_logging: bool,
    observer: Option<Arc<dyn HandshakeObserver>>,
}

impl Default for HandshakeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            client_id: None,
            kem_scheme: DEFAULT_KEM_SCHEME.to_string(),
            offer_pq: true,
            require_pq: false,
            handshake_timeout: Duration::from_secs(30),
            max_handshake_message_size: 16 * 1024,
            verbose_logging: false,
            observer: None,
        }
    }

    /// Set the identifier sent in the ClientHello
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the KEM scheme by registry name
    pub fn kem_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.kem_scheme = scheme.into();
        self
    }

    /// Set whether the initiator offers a PQ key
    pub fn offer_pq(mut self, offer: bool) -> Self {
        self.offer_pq = offer;
        self
    }

    /// Set whether PQ is required
    pub fn require_pq(mut self, require: bool) -> Self {
        self.require_pq = require;
        self
    }

    /// Set the handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set maximum handshake message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_handshake_message_size = size;
        self
    }

    /// Enable verbose logging
    pub fn verbose(mut self) -> Self {
        self.verbose_logging = true;
        self
    }

    /// Install an observer
    pub fn observer(mut self, observer: Arc<dyn HandshakeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<HandshakeConfig> {
        let client_id = self
            .client_id
            .ok_or_else(|| HandshakeError::InvalidConfig("client id is required".into()))?;

        resolve_scheme(&self.kem_scheme)
            .map_err(|e| HandshakeError::InvalidConfig(e.to_string()))?;

        if self.max_handshake_message_size < MIN_MESSAGE_SIZE {
            return Err(HandshakeError::InvalidConfig(format!(
                "max message size {} is below {MIN_MESSAGE_SIZE} bytes",
                self.max_handshake_message_size
            )));
        }
        if self.handshake_timeout.is_zero() {
            return Err(HandshakeError::InvalidConfig(
                "handshake timeout must be non-zero".into(),
            ));
        }
        if self.require_pq && !self.offer_pq {
            return Err(HandshakeError::InvalidConfig(
                "require_pq conflicts with disabling the PQ offer".into(),
            ));
        }

        Ok(HandshakeConfig {
            client_id,
            kem_scheme: self.kem_scheme,
            offer_pq: self.offer_pq,
            require_pq: self.require_pq,
            handshake_timeout: self.handshake_timeout,
            max_handshake_message_size: self.max_handshake_message_size,
            verbose_logging: self.verbose_logging,
            observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_allow_downgrade() {
        let config = HandshakeConfig::default();
        assert!(!config.require_pq);
        assert!(config.offer_pq);
        assert_eq!(config.kem_scheme, "ML-KEM-768");
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));
        assert_eq!(config.max_handshake_message_size, 16 * 1024);
    }

    #[test]
    fn production_requires_pq() {
        assert!(HandshakeConfig::production("node").require_pq);
    }

    #[test]
    fn builder_rejects_unknown_scheme() {
        let err = HandshakeConfigBuilder::new()
            .client_id("client-1")
            .kem_scheme("Kyber-9000")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn builder_rejects_tiny_records() {
        let result = HandshakeConfigBuilder::new()
            .client_id("client-1")
            .max_message_size(16)
            .build();
        assert!(matches!(result, Err(HandshakeError::InvalidConfig(_))));
    }

    #[test]
    fn builder_requires_client_id() {
        assert!(HandshakeConfigBuilder::new().build().is_err());
    }

    #[test]
    fn builder_applies_settings() {
        let config = HandshakeConfigBuilder::new()
            .client_id("client-7")
            .kem_scheme("ML-KEM-1024")
            .require_pq(true)
            .handshake_timeout(Duration::from_secs(5))
            .verbose()
            .build()
            .unwrap();
        assert_eq!(config.client_id, "client-7");
        assert_eq!(config.kem_scheme, "ML-KEM-1024");
        assert!(config.require_pq);
        assert!(config.verbose_logging);
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
    }
}
