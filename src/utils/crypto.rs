use data_encoding::HEXLOWER;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use ring::digest::{Context, SHA256};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{NodeError, Result};

const SCALAR_LEN: usize = 32;

pub fn sha256_hex(data: &[u8]) -> String {
    let mut context = Context::new(&SHA256);
    context.update(data);
    HEXLOWER.encode(context.finish().as_ref())
}

/// Generate a uniform P-256 scalar and return it as 64 lowercase hex chars.
///
/// Rejection sampling: candidates of zero or at least the group order are
/// discarded and redrawn.
pub fn generate_private_key() -> Result<String> {
    let rng = SystemRandom::new();
    let mut candidate = [0u8; SCALAR_LEN];
    loop {
        rng.fill(&mut candidate)
            .map_err(|_| NodeError::CryptoInit("system randomness source failed".to_string()))?;
        if SecretKey::from_slice(&candidate).is_ok() {
            return Ok(HEXLOWER.encode(&candidate));
        }
    }
}

fn parse_private_key(private_hex: &str) -> Result<SecretKey> {
    let bytes = HEXLOWER
        .decode(private_hex.as_bytes())
        .map_err(|e| NodeError::KeyParse(format!("invalid private key hex: {e}")))?;
    if bytes.len() > SCALAR_LEN {
        return Err(NodeError::KeyParse(format!(
            "private key is {} bytes, expected at most {SCALAR_LEN}",
            bytes.len()
        )));
    }
    // Shorter encodings are accepted and left-padded to the full scalar width
    let mut scalar = [0u8; SCALAR_LEN];
    scalar[SCALAR_LEN - bytes.len()..].copy_from_slice(&bytes);
    SecretKey::from_slice(&scalar)
        .map_err(|e| NodeError::KeyParse(format!("invalid P-256 scalar: {e}")))
}

/// Derive the uncompressed SEC1 public key for a hex-encoded private scalar.
pub fn public_key_of(private_hex: &str) -> Result<String> {
    let secret = parse_private_key(private_hex)?;
    let point = secret.public_key().to_encoded_point(false);
    Ok(HEXLOWER.encode(point.as_bytes()))
}

/// ASN.1 ECDSA signature over the raw digest decoded from `digest_hex`.
pub fn sign_digest(digest_hex: &str, private_hex: &str) -> Result<String> {
    let digest = HEXLOWER
        .decode(digest_hex.as_bytes())
        .map_err(|e| NodeError::Decode(format!("invalid digest hex: {e}")))?;
    let secret = parse_private_key(private_hex)?;
    let signing_key = SigningKey::from(&secret);
    let signature: Signature = signing_key
        .sign_prehash(&digest)
        .map_err(|e| NodeError::InvalidSignature(format!("signing failed: {e}")))?;
    Ok(HEXLOWER.encode(signature.to_der().as_bytes()))
}

/// ASN.1 ECDSA verification. Any parse failure yields `false`; the reason is
/// logged for diagnosis.
pub fn verify_signature(digest_hex: &str, sig_hex: &str, public_hex: &str) -> bool {
    let digest = match HEXLOWER.decode(digest_hex.as_bytes()) {
        Ok(digest) => digest,
        Err(e) => {
            log::debug!("failed to decode digest hex: {e}");
            return false;
        }
    };
    let sig_bytes = match HEXLOWER.decode(sig_hex.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("failed to decode signature hex: {e}");
            return false;
        }
    };
    let signature = match Signature::from_der(&sig_bytes) {
        Ok(signature) => signature,
        Err(e) => {
            log::debug!("failed to parse ASN.1 signature: {e}");
            return false;
        }
    };
    let pub_bytes = match HEXLOWER.decode(public_hex.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("failed to decode public key hex: {e}");
            return false;
        }
    };
    let verifying_key = match VerifyingKey::from_sec1_bytes(&pub_bytes) {
        Ok(key) => key,
        Err(e) => {
            log::debug!("failed to parse SEC1 public key: {e}");
            return false;
        }
    };
    verifying_key.verify_prehash(&digest, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex(b"abc").len(), 64);
    }

    #[test]
    fn test_generate_private_key_is_full_width_hex() {
        let key = generate_private_key().unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_public_key_is_uncompressed_sec1() {
        let key = generate_private_key().unwrap();
        let public = public_key_of(&key).unwrap();
        // 0x04 prefix plus two 32-byte coordinates
        assert_eq!(public.len(), 130);
        assert!(public.starts_with("04"));
        // Derivation is deterministic
        assert_eq!(public, public_key_of(&key).unwrap());
    }

    #[test]
    fn test_public_key_of_rejects_garbage() {
        assert!(matches!(
            public_key_of("zz"),
            Err(NodeError::KeyParse(_))
        ));
        assert!(matches!(
            public_key_of(&"00".repeat(33)),
            Err(NodeError::KeyParse(_))
        ));
        // The zero scalar is not a valid key
        assert!(matches!(
            public_key_of(&"00".repeat(32)),
            Err(NodeError::KeyParse(_))
        ));
    }

    #[test]
    fn test_short_private_key_is_left_padded() {
        let key = generate_private_key().unwrap();
        let trimmed = key.trim_start_matches('0');
        // Only meaningful when the scalar actually has leading zero bytes,
        // but padded parsing must never change the derived point.
        if trimmed.len() < key.len() && trimmed.len() % 2 == 0 {
            assert_eq!(public_key_of(trimmed).unwrap(), public_key_of(&key).unwrap());
        }
    }

    #[test]
    fn test_sign_and_verify_round_trip() {
        let key = generate_private_key().unwrap();
        let public = public_key_of(&key).unwrap();
        let digest = sha256_hex(b"moustache");

        let signature = sign_digest(&digest, &key).unwrap();
        assert!(verify_signature(&digest, &signature, &public));

        // A different digest must not verify
        let other = sha256_hex(b"no moustache");
        assert!(!verify_signature(&other, &signature, &public));

        // A different key must not verify
        let other_public = public_key_of(&generate_private_key().unwrap()).unwrap();
        assert!(!verify_signature(&digest, &signature, &other_public));
    }

    #[test]
    fn test_verify_parse_failures_yield_false() {
        let key = generate_private_key().unwrap();
        let public = public_key_of(&key).unwrap();
        let digest = sha256_hex(b"data");
        let signature = sign_digest(&digest, &key).unwrap();

        assert!(!verify_signature("not hex", &signature, &public));
        assert!(!verify_signature(&digest, "not hex", &public));
        assert!(!verify_signature(&digest, &signature, "not hex"));
        assert!(!verify_signature(&digest, "00ff", &public));
        assert!(!verify_signature(&digest, &signature, "04deadbeef"));
    }
}
