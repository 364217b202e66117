use rand_core::CryptoRngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

pub const X25519_KEY_LEN: usize = 32;

/// Draw a fresh private scalar, surfacing RNG failure instead of panicking.
pub(crate) fn random_private(
    rng: &mut dyn CryptoRngCore,
) -> core::result::Result<Zeroizing<[u8; X25519_KEY_LEN]>, rand_core::Error> {
    let mut private = Zeroizing::new([0u8; X25519_KEY_LEN]);
    rng.try_fill_bytes(&mut *private)?;
    Ok(private)
}

pub(crate) fn public_from_private(private: &[u8; X25519_KEY_LEN]) -> [u8; X25519_KEY_LEN] {
    let secret = StaticSecret::from(*private);
    PublicKey::from(&secret).to_bytes()
}

pub(crate) fn import_public(bytes: &[u8]) -> Result<PublicKey> {
    let array: [u8; X25519_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| CryptoError::invalid_length("x25519 public key", X25519_KEY_LEN, bytes.len()))?;
    Ok(PublicKey::from(array))
}

/// X25519 between a local private scalar and a peer public key.
///
/// An all-zero result means the peer supplied a low-order point and is
/// rejected.
pub(crate) fn diffie_hellman(
    private: &[u8; X25519_KEY_LEN],
    peer_public: &[u8],
) -> Result<Zeroizing<[u8; X25519_KEY_LEN]>> {
    let peer = import_public(peer_public)?;
    let secret = StaticSecret::from(*private);
    let shared = secret.diffie_hellman(&peer);
    if !shared.was_contributory() {
        return Err(CryptoError::KeyImportFailure(
            "x25519 public key is a low-order point".into(),
        ));
    }
    Ok(Zeroizing::new(*shared.as_bytes()))
}
