//! Hybrid Handshake
//!
//! A two-message key exchange combining:
//! - Classical X25519 ECDH (always run)
//! - ML-KEM encapsulation (when the initiator offers a post-quantum key)
//!
//! # Protocol Overview
//!
//! ```text
//! Initiator                                   Responder
//!   ClientHello { id, x25519_pub, pq_pub? } ──▶
//!                                             encapsulate
//!   ◀── ServerHello { x25519_ephemeral_pub, pq_ciphertext? }
//! decapsulate
//!
//! secret = x25519_shared || kem_shared   (hybrid)
//! secret = x25519_shared                  (classical-only)
//! ```
//!
//! Each message is one JSON object per line. A peer that leaves out the
//! post-quantum fields downgrades the exchange to classical-only; the
//! downgrade is logged and reported to the configured
//! [`HandshakeObserver`], or rejected outright when `require_pq` is set.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirage_handshake::{HandshakeConfig, HandshakeTransport};
//!
//! let transport = HandshakeTransport::new(HandshakeConfig::development("client-1"));
//! let keypair = HybridKeyPair::generate(DEFAULT_KEM_SCHEME)?;
//! let established = transport.initiate(&keypair, stream).await?;
//! tracing::info!(fingerprint = %established.secret().fingerprint());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handshake;
pub mod observer;
pub mod transport;
pub mod types;

pub use codec::HelloCodec;
pub use config::{HandshakeConfig, HandshakeConfigBuilder};
pub use error::{ErrorKind, HandshakeError, ProtocolError, Result};
pub use handshake::{Initiator, InitiatorState, Responder, ResponderOutcome, ResponderState};
pub use observer::{HandshakeObserver, NoopObserver};
pub use transport::{Established, HandshakeTransport};
pub use types::{ClientHello, Role, ServerHello};
