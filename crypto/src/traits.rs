use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::error::Result;

/// Serialized key pair produced by a [`KemScheme`].
pub struct KemKeyMaterial {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

/// Ciphertext and shared secret produced by [`KemScheme::encapsulate`].
pub struct KemEncapsulation {
    pub ciphertext: Vec<u8>,
    pub shared_secret: Zeroizing<Vec<u8>>,
}

/// A post-quantum key-encapsulation mechanism addressed by name.
///
/// Keys and ciphertexts cross this boundary as opaque byte blobs. Each
/// operation imports (unmarshals) the blobs it receives and rejects any whose
/// length does not match the parameter set.
pub trait KemScheme: Send + Sync {
    fn name(&self) -> &'static str;
    fn public_key_len(&self) -> usize;
    fn private_key_len(&self) -> usize;
    fn ciphertext_len(&self) -> usize;
    fn shared_secret_len(&self) -> usize;

    fn generate_keypair(&self, rng: &mut dyn CryptoRngCore) -> Result<KemKeyMaterial>;

    fn encapsulate(
        &self,
        public_key: &[u8],
        rng: &mut dyn CryptoRngCore,
    ) -> Result<KemEncapsulation>;

    fn decapsulate(&self, private_key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}
