//! ML-KEM (FIPS 203) parameter sets exposed through the [`KemScheme`] registry.

use ml_kem::kem::{Decapsulate, DecapsulationKey, EncapsulationKey};
use ml_kem::{
    Ciphertext, EncapsulateDeterministic, Encoded, EncodedSizeUser, KemCore, MlKem1024,
    MlKem1024Params, MlKem512, MlKem512Params, MlKem768, MlKem768Params,
};
use rand_core::CryptoRngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, Result};
use crate::traits::{KemEncapsulation, KemKeyMaterial, KemScheme};

pub const ML_KEM_512: &str = "ML-KEM-512";
pub const ML_KEM_768: &str = "ML-KEM-768";
pub const ML_KEM_1024: &str = "ML-KEM-1024";

/// Scheme used when a peer does not name one.
pub const DEFAULT_KEM_SCHEME: &str = ML_KEM_768;

pub const ML_KEM_SHARED_SECRET_LEN: usize = 32;

pub const ML_KEM_512_PUBLIC_KEY_LEN: usize = 800;
pub const ML_KEM_512_SECRET_KEY_LEN: usize = 1632;
pub const ML_KEM_512_CIPHERTEXT_LEN: usize = 768;

pub const ML_KEM_768_PUBLIC_KEY_LEN: usize = 1184;
pub const ML_KEM_768_SECRET_KEY_LEN: usize = 2400;
pub const ML_KEM_768_CIPHERTEXT_LEN: usize = 1088;

pub const ML_KEM_1024_PUBLIC_KEY_LEN: usize = 1568;
pub const ML_KEM_1024_SECRET_KEY_LEN: usize = 3168;
pub const ML_KEM_1024_CIPHERTEXT_LEN: usize = 1568;

const SEED_LEN: usize = 32;

/// Draw one 32-byte seed for the deterministic ML-KEM entry points.
///
/// `fill_bytes` panics when the OS RNG fails, so seeds always go through
/// `try_fill_bytes`.
fn random_seed(
    rng: &mut dyn CryptoRngCore,
) -> core::result::Result<Zeroizing<[u8; SEED_LEN]>, rand_core::Error> {
    let mut seed = Zeroizing::new([0u8; SEED_LEN]);
    rng.try_fill_bytes(&mut *seed)?;
    Ok(seed)
}

macro_rules! ml_kem_scheme {
    ($scheme:ident, $kem:ty, $params:ty, $name:expr, $pk_len:expr, $sk_len:expr, $ct_len:expr) => {
        pub struct $scheme;

        impl KemScheme for $scheme {
            fn name(&self) -> &'static str {
                $name
            }

            fn public_key_len(&self) -> usize {
                $pk_len
            }

            fn private_key_len(&self) -> usize {
                $sk_len
            }

            fn ciphertext_len(&self) -> usize {
                $ct_len
            }

            fn shared_secret_len(&self) -> usize {
                ML_KEM_SHARED_SECRET_LEN
            }

            fn generate_keypair(&self, rng: &mut dyn CryptoRngCore) -> Result<KemKeyMaterial> {
                let keygen_entropy =
                    |e: rand_core::Error| CryptoError::KeyGenFailure(format!("ml-kem entropy: {e}"));
                let d = random_seed(rng).map_err(keygen_entropy)?;
                let z = random_seed(rng).map_err(keygen_entropy)?;
                let (dk, ek) =
                    <$kem>::generate_deterministic((&*d).into(), (&*z).into());

                let mut encoded = dk.as_bytes();
                let private_key = Zeroizing::new(encoded.to_vec());
                encoded.as_mut_slice().zeroize();
                Ok(KemKeyMaterial {
                    public_key: ek.as_bytes().to_vec(),
                    private_key,
                })
            }

            fn encapsulate(
                &self,
                public_key: &[u8],
                rng: &mut dyn CryptoRngCore,
            ) -> Result<KemEncapsulation> {
                let encoded = Encoded::<EncapsulationKey<$params>>::try_from(public_key)
                    .map_err(|_| {
                        CryptoError::invalid_length("public key", $pk_len, public_key.len())
                    })?;
                let ek = EncapsulationKey::<$params>::from_bytes(&encoded);
                let m = random_seed(rng).map_err(|e| CryptoError::EntropyFailure(e.to_string()))?;
                let (ct, ss) = ek
                    .encapsulate_deterministic((&*m).into())
                    .map_err(|_| CryptoError::EncapsulationFailure)?;
                Ok(KemEncapsulation {
                    ciphertext: ct.iter().copied().collect(),
                    shared_secret: Zeroizing::new(ss.iter().copied().collect()),
                })
            }

            fn decapsulate(
                &self,
                private_key: &[u8],
                ciphertext: &[u8],
            ) -> Result<Zeroizing<Vec<u8>>> {
                // borrow, never copy, the encoded private key
                let encoded = <&Encoded<DecapsulationKey<$params>>>::try_from(private_key)
                    .map_err(|_| {
                        CryptoError::invalid_length("private key", $sk_len, private_key.len())
                    })?;
                let dk = DecapsulationKey::<$params>::from_bytes(encoded);
                let ct = Ciphertext::<$kem>::try_from(ciphertext).map_err(|_| {
                    CryptoError::invalid_length("ciphertext", $ct_len, ciphertext.len())
                })?;
                let ss = dk
                    .decapsulate(&ct)
                    .map_err(|_| CryptoError::DecapsulationFailure)?;
                Ok(Zeroizing::new(ss.iter().copied().collect()))
            }
        }
    };
}

ml_kem_scheme!(
    MlKem512Scheme,
    MlKem512,
    MlKem512Params,
    ML_KEM_512,
    ML_KEM_512_PUBLIC_KEY_LEN,
    ML_KEM_512_SECRET_KEY_LEN,
    ML_KEM_512_CIPHERTEXT_LEN
);

ml_kem_scheme!(
    MlKem768Scheme,
    MlKem768,
    MlKem768Params,
    ML_KEM_768,
    ML_KEM_768_PUBLIC_KEY_LEN,
    ML_KEM_768_SECRET_KEY_LEN,
    ML_KEM_768_CIPHERTEXT_LEN
);

ml_kem_scheme!(
    MlKem1024Scheme,
    MlKem1024,
    MlKem1024Params,
    ML_KEM_1024,
    ML_KEM_1024_PUBLIC_KEY_LEN,
    ML_KEM_1024_SECRET_KEY_LEN,
    ML_KEM_1024_CIPHERTEXT_LEN
);

static REGISTRY: [&dyn KemScheme; 3] = [&MlKem512Scheme, &MlKem768Scheme, &MlKem1024Scheme];

/// Look up a KEM scheme by its registered name.
pub fn resolve_scheme(name: &str) -> Result<&'static dyn KemScheme> {
    REGISTRY
        .iter()
        .copied()
        .find(|scheme| scheme.name() == name)
        .ok_or_else(|| CryptoError::SchemeUnsupported(name.to_string()))
}

/// Names of every registered scheme.
pub fn supported_schemes() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|scheme| scheme.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn registry_resolves_every_parameter_set() {
        for name in [ML_KEM_512, ML_KEM_768, ML_KEM_1024] {
            let scheme = resolve_scheme(name).expect("registered");
            assert_eq!(scheme.name(), name);
            assert_eq!(scheme.shared_secret_len(), ML_KEM_SHARED_SECRET_LEN);
        }
        assert_eq!(supported_schemes().count(), 3);
    }

    #[test]
    fn unknown_scheme_is_unsupported() {
        let err = resolve_scheme("Kyber9000").err().expect("must fail");
        assert_eq!(err, CryptoError::SchemeUnsupported("Kyber9000".into()));
    }

    #[test]
    fn encapsulate_then_decapsulate_agrees() {
        for name in supported_schemes() {
            let scheme = resolve_scheme(name).unwrap();
            let keys = scheme.generate_keypair(&mut OsRng).unwrap();
            assert_eq!(keys.public_key.len(), scheme.public_key_len());
            assert_eq!(keys.private_key.len(), scheme.private_key_len());

            let encap = scheme.encapsulate(&keys.public_key, &mut OsRng).unwrap();
            assert_eq!(encap.ciphertext.len(), scheme.ciphertext_len());

            let recovered = scheme
                .decapsulate(&keys.private_key, &encap.ciphertext)
                .unwrap();
            assert_eq!(recovered.as_slice(), encap.shared_secret.as_slice());
        }
    }

    #[test]
    fn private_key_material_is_wiped_on_drop() {
        use zeroize::ZeroizeOnDrop;

        fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<DecapsulationKey<MlKem512Params>>();
        assert_zeroize_on_drop::<DecapsulationKey<MlKem768Params>>();
        assert_zeroize_on_drop::<DecapsulationKey<MlKem1024Params>>();
    }

    #[test]
    fn seeds_fix_the_key_pair() {
        use rand::SeedableRng;
        use rand_chacha::ChaCha20Rng;

        let scheme = resolve_scheme(ML_KEM_768).unwrap();
        let a = scheme.generate_keypair(&mut ChaCha20Rng::from_seed([3; 32])).unwrap();
        let b = scheme.generate_keypair(&mut ChaCha20Rng::from_seed([3; 32])).unwrap();
        assert_eq!(a.public_key, b.public_key);
        assert_eq!(a.private_key.as_slice(), b.private_key.as_slice());
    }

    #[test]
    fn truncated_public_key_is_rejected() {
        let scheme = resolve_scheme(ML_KEM_768).unwrap();
        let keys = scheme.generate_keypair(&mut OsRng).unwrap();
        let result = scheme.encapsulate(&keys.public_key[..100], &mut OsRng);
        assert!(matches!(result, Err(CryptoError::KeyImportFailure(_))));
    }

    #[test]
    fn wrong_length_ciphertext_is_rejected() {
        let scheme = resolve_scheme(ML_KEM_512).unwrap();
        let keys = scheme.generate_keypair(&mut OsRng).unwrap();
        let result = scheme.decapsulate(&keys.private_key, &[0u8; 12]);
        assert!(matches!(result, Err(CryptoError::KeyImportFailure(_))));
    }
}
