//! Webhook signature parsing and verification.
//!
//! Senders sign the raw request body with HMAC-SHA1 keyed by the webhook's
//! shared secret and send it as `X-Hub-Signature: sha1=<hex digest>`.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::warn;

use crate::error::{RelayError, SignatureHeaderFault};

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Keyed-hash algorithms accepted in the signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    HmacSha1,
}

impl SignatureAlgorithm {
    /// Map the header's algorithm token to an algorithm.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "sha1" => Some(Self::HmacSha1),
            _ => None,
        }
    }
}

/// A parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub algorithm: SignatureAlgorithm,
    /// Raw digest bytes, hex-decoded from the header
    pub digest: Vec<u8>,
}

/// Parse a signature header value of the form `algorithm=hexdigest`.
///
/// A missing header, a value without exactly one `=`, an unknown algorithm
/// and a digest that is not hex are all rejected.
pub fn parse_signature_header(value: Option<&str>) -> Result<Signature, RelayError> {
    let value = match value {
        Some(v) => v,
        None => {
            warn!("signature_header_missing");
            return Err(RelayError::MalformedSignatureHeader(SignatureHeaderFault::Shape));
        }
    };

    let parts: Vec<&str> = value.split('=').collect();
    if parts.len() != 2 {
        warn!(header = %value, "signature_header_malformed");
        return Err(RelayError::MalformedSignatureHeader(SignatureHeaderFault::Shape));
    }

    let algorithm = match SignatureAlgorithm::from_token(parts[0]) {
        Some(a) => a,
        None => {
            warn!(header = %value, algorithm = %parts[0], "signature_header_unknown_algorithm");
            return Err(RelayError::UnknownAlgorithm(parts[0].to_string()));
        }
    };

    let digest = match hex::decode(parts[1]) {
        Ok(d) => d,
        Err(e) => {
            warn!(header = %value, error = %e, "signature_header_invalid_hex");
            return Err(RelayError::MalformedSignatureHeader(SignatureHeaderFault::Contents));
        }
    };

    Ok(Signature { algorithm, digest })
}

/// Verify that `provided_mac` is the HMAC-SHA1 of `message` under `key`.
///
/// The comparison is constant-time and fails on any length mismatch.
pub fn verify_sha1_mac(message: &[u8], provided_mac: &[u8], key: &[u8]) -> bool {
    let mut mac = match HmacSha1::new_from_slice(key) {
        Ok(m) => m,
        Err(_) => {
            warn!("signature_invalid_key");
            return false;
        }
    };
    mac.update(message);

    // verify_slice compares in constant time
    mac.verify_slice(provided_mac).is_ok()
}

/// Verify a parsed signature against the captured body.
pub fn verify(message: &[u8], signature: &Signature, key: &[u8]) -> bool {
    match signature.algorithm {
        SignatureAlgorithm::HmacSha1 => verify_sha1_mac(message, &signature.digest, key),
    }
}

/// Compute the hex HMAC-SHA1 of `message` under `key`, as a sender would.
pub fn sign_sha1(message: &[u8], key: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_MAC: &str = "816421f91f8bb65da114aef4616abf77052cccfe";

    #[test]
    fn test_verify_known_vector() {
        let mac = hex::decode(HELLO_MAC).unwrap();
        assert!(verify_sha1_mac(b"Hello, World!", &mac, b"foobar"));
    }

    #[test]
    fn test_verify_wrong_key() {
        let mac = hex::decode(HELLO_MAC).unwrap();
        assert!(!verify_sha1_mac(b"Hello, World!", &mac, b"foobar1234"));
    }

    #[test]
    fn test_verify_altered_message() {
        let mac = hex::decode(HELLO_MAC).unwrap();
        assert!(!verify_sha1_mac(
            b"Hello, World! This message has been altered.",
            &mac,
            b"foobar"
        ));
    }

    #[test]
    fn test_verify_any_flipped_bit_fails() {
        let message = br#"{"zen":"Mind your words, they are important."}"#;
        let mac = hex::decode(sign_sha1(message, b"foobar")).unwrap();
        assert!(verify_sha1_mac(message, &mac, b"foobar"));

        for byte in 0..mac.len() {
            for bit in 0..8 {
                let mut tampered = mac.clone();
                tampered[byte] ^= 1 << bit;
                assert!(!verify_sha1_mac(message, &tampered, b"foobar"));
            }
        }
    }

    #[test]
    fn test_verify_truncated_and_empty_digest() {
        let mac = hex::decode(HELLO_MAC).unwrap();
        assert!(!verify_sha1_mac(b"Hello, World!", &mac[..10], b"foobar"));
        assert!(!verify_sha1_mac(b"Hello, World!", &[], b"foobar"));
    }

    #[test]
    fn test_sign_matches_known_vector() {
        assert_eq!(sign_sha1(b"Hello, World!", b"foobar"), HELLO_MAC);
    }

    #[test]
    fn test_parse_valid_header() {
        let sig = parse_signature_header(Some(&format!("sha1={}", HELLO_MAC))).unwrap();
        assert_eq!(sig.algorithm, SignatureAlgorithm::HmacSha1);
        assert_eq!(sig.digest, hex::decode(HELLO_MAC).unwrap());
        assert!(verify(b"Hello, World!", &sig, b"foobar"));
    }

    #[test]
    fn test_parse_missing_header() {
        let err = parse_signature_header(None).unwrap_err();
        assert!(matches!(
            err,
            RelayError::MalformedSignatureHeader(SignatureHeaderFault::Shape)
        ));
    }

    #[test]
    fn test_parse_without_separator() {
        let err = parse_signature_header(Some("foo")).unwrap_err();
        assert_eq!(err.message(), "malformed signature header");
    }

    #[test]
    fn test_parse_with_two_separators() {
        let err = parse_signature_header(Some("sha1=abcd=ef")).unwrap_err();
        assert_eq!(err.message(), "malformed signature header");
    }

    #[test]
    fn test_parse_unknown_algorithm() {
        let err = parse_signature_header(Some("sha2=aebfc")).unwrap_err();
        assert!(matches!(err, RelayError::UnknownAlgorithm(ref a) if a == "sha2"));
        assert_eq!(err.message(), "malformed signature header, unknown algo");
    }

    #[test]
    fn test_parse_invalid_hex() {
        let err = parse_signature_header(Some("sha1=zzzz")).unwrap_err();
        assert_eq!(err.message(), "malformed signature header, unknown contents");
    }
}
