//! Hybrid X25519 + KEM key agreement.
//!
//! The responder encapsulates against the initiator's identity keys with a
//! fresh ephemeral X25519 scalar; the initiator decapsulates with its private
//! keys. Both produce `x25519_shared || kem_shared`, or the X25519 output alone
//! when the post-quantum branch is skipped.

use core::fmt;

use rand::rngs::OsRng;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::ml_kem::resolve_scheme;
use crate::secret::{KeyExchangeMode, SharedSecret};
use crate::x25519::{self, X25519_KEY_LEN};

struct PqKeyMaterial {
    algorithm: &'static str,
    public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
}

/// Identity keys for one party: an X25519 pair plus an optional KEM pair.
///
/// Private material is wiped when the key pair is dropped.
pub struct HybridKeyPair {
    classical_public: [u8; X25519_KEY_LEN],
    classical_private: Zeroizing<[u8; X25519_KEY_LEN]>,
    pq: Option<PqKeyMaterial>,
}

impl HybridKeyPair {
    /// Generate X25519 and `scheme` key pairs from the OS RNG.
    pub fn generate(scheme: &str) -> Result<Self> {
        Self::generate_with_rng(scheme, &mut OsRng)
    }

    pub fn generate_with_rng(scheme: &str, rng: &mut impl CryptoRngCore) -> Result<Self> {
        let kem = resolve_scheme(scheme)?;
        let (classical_public, classical_private) = generate_classical(rng)?;
        let keys = kem.generate_keypair(rng)?;

        Ok(Self {
            classical_public,
            classical_private,
            pq: Some(PqKeyMaterial {
                algorithm: kem.name(),
                public_key: keys.public_key,
                private_key: keys.private_key,
            }),
        })
    }

    /// Generate an identity without post-quantum material.
    pub fn generate_classical() -> Result<Self> {
        Self::generate_classical_with_rng(&mut OsRng)
    }

    pub fn generate_classical_with_rng(rng: &mut impl CryptoRngCore) -> Result<Self> {
        let (classical_public, classical_private) = generate_classical(rng)?;
        Ok(Self {
            classical_public,
            classical_private,
            pq: None,
        })
    }

    pub fn classical_public(&self) -> &[u8; X25519_KEY_LEN] {
        &self.classical_public
    }

    pub fn pq_public(&self) -> Option<&[u8]> {
        self.pq.as_ref().map(|pq| pq.public_key.as_slice())
    }

    pub fn pq_algorithm(&self) -> Option<&'static str> {
        self.pq.as_ref().map(|pq| pq.algorithm)
    }

    pub fn has_pq(&self) -> bool {
        self.pq.is_some()
    }

    /// Recover the secret produced by [`encapsulate`] on the peer.
    ///
    /// The KEM branch runs only when `ciphertext` is non-empty and this key
    /// pair carries post-quantum keys.
    pub fn decapsulate(
        &self,
        peer_ephemeral_public: &[u8],
        ciphertext: Option<&[u8]>,
    ) -> Result<SharedSecret> {
        let classical = x25519::diffie_hellman(&self.classical_private, peer_ephemeral_public)?;

        let ciphertext = ciphertext.filter(|ct| !ct.is_empty());
        let pq_shared = match (ciphertext, &self.pq) {
            (Some(ct), Some(pq)) => {
                let scheme = resolve_scheme(pq.algorithm)?;
                Some(scheme.decapsulate(&pq.private_key, ct)?)
            }
            (Some(_), None) => {
                tracing::debug!("ignoring KEM ciphertext: key pair has no post-quantum keys");
                None
            }
            (None, _) => None,
        };

        Ok(SharedSecret::combine(
            &classical,
            pq_shared.as_deref().map(Vec::as_slice),
        ))
    }
}

impl fmt::Debug for HybridKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridKeyPair")
            .field("classical_public", &hex::encode(self.classical_public))
            .field("pq_algorithm", &self.pq_algorithm())
            .field("pq_public_len", &self.pq_public().map(<[u8]>::len))
            .finish_non_exhaustive()
    }
}

fn generate_classical(
    rng: &mut dyn CryptoRngCore,
) -> Result<([u8; X25519_KEY_LEN], Zeroizing<[u8; X25519_KEY_LEN]>)> {
    let private = x25519::random_private(rng)
        .map_err(|e| CryptoError::KeyGenFailure(format!("x25519 entropy: {e}")))?;
    let public = x25519::public_from_private(&private);
    Ok((public, private))
}

/// A peer's post-quantum public key and the scheme it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct PeerPqKey<'a> {
    pub algorithm: &'a str,
    pub public_key: &'a [u8],
}

/// Responder output: what goes on the wire plus the local secret.
pub struct Encapsulation {
    pub ephemeral_public: [u8; X25519_KEY_LEN],
    pub ciphertext: Option<Vec<u8>>,
    pub shared_secret: SharedSecret,
}

impl Encapsulation {
    pub fn mode(&self) -> KeyExchangeMode {
        self.shared_secret.mode()
    }
}

/// Encapsulate against a peer's identity keys using the OS RNG.
pub fn encapsulate(
    peer_classical_public: &[u8],
    peer_pq: Option<PeerPqKey<'_>>,
) -> Result<Encapsulation> {
    encapsulate_with_rng(peer_classical_public, peer_pq, &mut OsRng)
}

/// Encapsulate against a peer's identity keys.
///
/// A fresh ephemeral X25519 scalar is drawn for every call and wiped before
/// returning. When `peer_pq` is absent or its key is empty the KEM branch is
/// skipped and the result is classical-only; callers can see this through
/// [`Encapsulation::mode`].
pub fn encapsulate_with_rng(
    peer_classical_public: &[u8],
    peer_pq: Option<PeerPqKey<'_>>,
    rng: &mut impl CryptoRngCore,
) -> Result<Encapsulation> {
    let peer_pq = peer_pq.filter(|key| !key.public_key.is_empty());

    let scheme = peer_pq.map(|key| resolve_scheme(key.algorithm)).transpose()?;

    let ephemeral_private = x25519::random_private(rng)
        .map_err(|e| CryptoError::EntropyFailure(e.to_string()))?;
    let ephemeral_public = x25519::public_from_private(&ephemeral_private);
    let classical = x25519::diffie_hellman(&ephemeral_private, peer_classical_public)?;
    drop(ephemeral_private);

    let (ciphertext, pq_shared) = match (scheme, peer_pq) {
        (Some(scheme), Some(key)) => {
            let encap = scheme.encapsulate(key.public_key, rng)?;
            (Some(encap.ciphertext), Some(encap.shared_secret))
        }
        _ => {
            tracing::debug!("peer supplied no post-quantum key; classical-only encapsulation");
            (None, None)
        }
    };

    Ok(Encapsulation {
        ephemeral_public,
        ciphertext,
        shared_secret: SharedSecret::combine(
            &classical,
            pq_shared.as_deref().map(Vec::as_slice),
        ),
    })
}
