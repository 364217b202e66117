//! Hybrid classical + post-quantum key agreement.
//!
//! - [`x25519`]: classical ECDH, always run
//! - [`ml_kem`]: FIPS 203 KEM parameter sets behind the [`KemScheme`] registry
//! - [`hybrid`]: identity key pairs, encapsulation and decapsulation
//!
//! The combined secret is `x25519_shared || kem_shared`. When a peer offers no
//! post-quantum key the KEM half is skipped and the secret is the 32-byte
//! X25519 output alone.

pub mod error;
pub mod hybrid;
pub mod ml_kem;
pub mod secret;
pub mod traits;
pub mod x25519;

pub use error::CryptoError;
pub use hybrid::{encapsulate, encapsulate_with_rng, Encapsulation, HybridKeyPair, PeerPqKey};
pub use ml_kem::{resolve_scheme, supported_schemes, DEFAULT_KEM_SCHEME};
pub use secret::{KeyExchangeMode, SharedSecret};
pub use traits::KemScheme;
