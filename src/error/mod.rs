//! Error handling for the node
//!
//! One error type covers every failure surfaced by the chain, the
//! transaction service, the wallet, and the peer layer.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Error kinds for node operations
#[derive(Debug, Clone)]
pub enum NodeError {
    /// Block index does not follow the chain tail
    InvalidIndex(String),
    /// Block does not reference the tail's hash
    InvalidPrevHash(String),
    /// Stored block hash does not match the recomputed hash
    InvalidBlockHash(String),
    /// Coinbase transaction breaks a structural rule
    InvalidCoinbase(String),
    /// Stored transaction id does not match the recomputed id
    InvalidTxId(String),
    /// An input signature does not verify
    InvalidSignature(String),
    /// Total input amount does not equal total output amount
    AmountMismatch(String),
    /// The same output is consumed more than once
    DuplicateInput(String),
    /// An input references an output that is not unspent
    UtxoNotFound(String),
    /// Not enough unspent outputs to cover the requested amount
    InsufficientFunds { required: u64, available: u64 },
    /// Malformed key material
    KeyParse(String),
    /// Signing key does not own the referenced output
    KeyMismatch(String),
    /// The cryptographic randomness source failed
    CryptoInit(String),
    /// Transport failure on a peer connection
    Io(String),
    /// Malformed framing or JSON on the wire
    Decode(String),
    /// A peer message carried a tag outside the protocol
    UnknownMessageTag(u8),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::InvalidIndex(msg) => write!(f, "invalid block index: {msg}"),
            NodeError::InvalidPrevHash(msg) => write!(f, "invalid prev block hash: {msg}"),
            NodeError::InvalidBlockHash(msg) => write!(f, "invalid block hash: {msg}"),
            NodeError::InvalidCoinbase(msg) => write!(f, "invalid coinbase transaction: {msg}"),
            NodeError::InvalidTxId(msg) => write!(f, "invalid transaction id: {msg}"),
            NodeError::InvalidSignature(msg) => write!(f, "invalid signature: {msg}"),
            NodeError::AmountMismatch(msg) => write!(f, "amount mismatch: {msg}"),
            NodeError::DuplicateInput(msg) => write!(f, "duplicate input: {msg}"),
            NodeError::UtxoNotFound(msg) => write!(f, "unspent output not found: {msg}"),
            NodeError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "insufficient funds: required {required}, available {available}"
                )
            }
            NodeError::KeyParse(msg) => write!(f, "key parse error: {msg}"),
            NodeError::KeyMismatch(msg) => write!(f, "key mismatch: {msg}"),
            NodeError::CryptoInit(msg) => write!(f, "crypto init error: {msg}"),
            NodeError::Io(msg) => write!(f, "i/o error: {msg}"),
            NodeError::Decode(msg) => write!(f, "decode error: {msg}"),
            NodeError::UnknownMessageTag(tag) => write!(f, "unknown peer message tag: {tag}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_reason() {
        let err = NodeError::InvalidIndex("expected 2, got 42".to_string());
        assert_eq!(err.to_string(), "invalid block index: expected 2, got 42");

        let err = NodeError::InsufficientFunds {
            required: 60,
            available: 42,
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: required 60, available 42"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: NodeError = io_err.into();
        assert!(matches!(err, NodeError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: NodeError = json_err.into();
        assert!(matches!(err, NodeError::Decode(_)));
    }
}
