use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("entropy source failed: {0}")]
    EntropyFailure(String),

    #[error("key generation failed: {0}")]
    KeyGenFailure(String),

    #[error("unsupported KEM scheme: {0}")]
    SchemeUnsupported(String),

    #[error("key import failed: {0}")]
    KeyImportFailure(String),

    #[error("encapsulation failed")]
    EncapsulationFailure,

    #[error("decapsulation failed")]
    DecapsulationFailure,
}

impl CryptoError {
    pub(crate) fn invalid_length(what: &str, expected: usize, found: usize) -> Self {
        CryptoError::KeyImportFailure(format!(
            "{what}: expected {expected} bytes, found {found}"
        ))
    }
}

pub type Result<T> = core::result::Result<T, CryptoError>;
