use core::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::x25519::X25519_KEY_LEN;

/// Which branches contributed to a [`SharedSecret`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyExchangeMode {
    /// X25519 followed by the post-quantum KEM output.
    Hybrid,
    /// X25519 only; the peer did not supply post-quantum material.
    ClassicalOnly,
}

impl KeyExchangeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyExchangeMode::Hybrid => "hybrid",
            KeyExchangeMode::ClassicalOnly => "classical-only",
        }
    }
}

impl fmt::Display for KeyExchangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session secret agreed by both peers.
///
/// The layout is fixed across roles: the 32-byte X25519 output first, then
/// the KEM shared secret when the post-quantum branch ran. Both ends must
/// concatenate in this order or they silently disagree.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: Vec<u8>,
    classical_len: usize,
}

impl SharedSecret {
    pub(crate) fn combine(classical: &[u8; X25519_KEY_LEN], pq: Option<&[u8]>) -> Self {
        let pq = pq.unwrap_or_default();
        let mut bytes = Vec::with_capacity(classical.len() + pq.len());
        bytes.extend_from_slice(classical);
        bytes.extend_from_slice(pq);
        Self {
            bytes,
            classical_len: classical.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mode(&self) -> KeyExchangeMode {
        if self.bytes.len() > self.classical_len {
            KeyExchangeMode::Hybrid
        } else {
            KeyExchangeMode::ClassicalOnly
        }
    }

    pub fn classical_part(&self) -> &[u8] {
        &self.bytes[..self.classical_len]
    }

    pub fn pq_part(&self) -> Option<&[u8]> {
        match self.mode() {
            KeyExchangeMode::Hybrid => Some(&self.bytes[self.classical_len..]),
            KeyExchangeMode::ClassicalOnly => None,
        }
    }

    /// Short SHA-256 digest of the secret, safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        hex::encode(&digest[..8])
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.classical_len == other.classical_len && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("mode", &self.mode())
            .field("len", &self.bytes.len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classical_first_then_pq() {
        let classical = [1u8; 32];
        let pq = [2u8; 32];
        let secret = SharedSecret::combine(&classical, Some(&pq));

        assert_eq!(secret.len(), 64);
        assert_eq!(secret.mode(), KeyExchangeMode::Hybrid);
        assert_eq!(secret.classical_part(), &classical);
        assert_eq!(secret.pq_part(), Some(&pq[..]));
        assert_eq!(&secret.as_bytes()[..32], &classical);
    }

    #[test]
    fn classical_only_has_no_pq_part() {
        let secret = SharedSecret::combine(&[7u8; 32], None);
        assert_eq!(secret.len(), 32);
        assert_eq!(secret.mode(), KeyExchangeMode::ClassicalOnly);
        assert!(secret.pq_part().is_none());
    }

    #[test]
    fn debug_output_hides_secret_bytes() {
        let secret = SharedSecret::combine(&[0xab; 32], None);
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains(&hex::encode([0xab; 32])));
        assert!(rendered.contains(&secret.fingerprint()));
    }

    #[test]
    fn equality_compares_contents() {
        let a = SharedSecret::combine(&[3u8; 32], Some(&[4u8; 32]));
        let b = SharedSecret::combine(&[3u8; 32], Some(&[4u8; 32]));
        let c = SharedSecret::combine(&[3u8; 32], Some(&[5u8; 32]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
