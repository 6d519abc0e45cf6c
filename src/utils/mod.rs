//! Cryptographic utilities
//!
//! Hashing, hex-encoded P-256 key handling, and ASN.1 ECDSA signatures
//! used throughout the node.

pub mod crypto;

pub use crypto::{
    generate_private_key, public_key_of, sha256_hex, sign_digest, verify_signature,
};
