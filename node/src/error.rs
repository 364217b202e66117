use crypto::CryptoError;
use handshake::HandshakeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("primary {primary} and backup {backup} are both unreachable")]
    Unreachable { primary: String, backup: String },
    #[error("no greeting within {0:?} of the handshake")]
    GreetingTimeout(std::time::Duration),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type NodeResult<T> = Result<T, NodeError>;
