//! Error types for the hybrid handshake

use crypto::CryptoError;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors that can occur while running a handshake
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Key agreement failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Peer broke the two-message protocol
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A received record could not be decoded
    #[error("wire decode error: {0}")]
    WireDecode(String),

    /// I/O error on the underlying stream
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Stream ended before a complete record arrived
    #[error("connection closed during handshake")]
    ConnectionClosed,

    /// Handshake did not complete within the configured timeout
    #[error("handshake timed out")]
    Timeout,

    /// Invalid local configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Protocol-level violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// ServerHello carried a KEM ciphertext although no PQ key was offered
    #[error("unexpected post-quantum ciphertext")]
    UnexpectedCiphertext,

    /// Peer omitted post-quantum material while it is required
    #[error("peer did not supply post-quantum key material")]
    DowngradeRejected,

    /// Operation not valid in the current state
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },
}

/// Coarse classification of a [`HandshakeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EntropyFailure,
    KeyGenFailure,
    SchemeUnsupported,
    KeyImportFailure,
    EncapsulationFailure,
    DecapsulationFailure,
    WireDecodeFailure,
    ConnectionFailure,
    ProtocolViolation,
    Configuration,
}

impl HandshakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandshakeError::Crypto(err) => match err {
                CryptoError::EntropyFailure(_) => ErrorKind::EntropyFailure,
                CryptoError::KeyGenFailure(_) => ErrorKind::KeyGenFailure,
                CryptoError::SchemeUnsupported(_) => ErrorKind::SchemeUnsupported,
                CryptoError::KeyImportFailure(_) => ErrorKind::KeyImportFailure,
                CryptoError::EncapsulationFailure => ErrorKind::EncapsulationFailure,
                CryptoError::DecapsulationFailure => ErrorKind::DecapsulationFailure,
            },
            HandshakeError::Protocol(_) => ErrorKind::ProtocolViolation,
            HandshakeError::WireDecode(_) => ErrorKind::WireDecodeFailure,
            HandshakeError::Connection(_)
            | HandshakeError::ConnectionClosed
            | HandshakeError::Timeout => ErrorKind::ConnectionFailure,
            HandshakeError::InvalidConfig(_) => ErrorKind::Configuration,
        }
    }
}

impl From<serde_json::Error> for HandshakeError {
    fn from(e: serde_json::Error) -> Self {
        HandshakeError::WireDecode(e.to_string())
    }
}

impl From<LinesCodecError> for HandshakeError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::MaxLineLengthExceeded => {
                HandshakeError::WireDecode("record exceeds maximum handshake message size".into())
            }
            LinesCodecError::Io(io) => HandshakeError::Connection(io),
        }
    }
}

/// Result type for handshake operations
pub type Result<T> = std::result::Result<T, HandshakeError>;
