//! # Bearer Tokens
//!
//! Stateless HS256 JSON Web Tokens carrying the caller's email.
//!
//! ```text
//! base64url(header) "." base64url(claims) "." base64url(HMAC-SHA256(secret, header "." claims))
//! ```
//!
//! Nothing is persisted: a token is valid while its signature recomputes and
//! `exp` is in the future. There is no revocation list.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Default validity window
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Identity payload embedded in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claim {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }
}

/// Token verification failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct SignedClaims {
    #[serde(flatten)]
    claim: Claim,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `claim` with a validity window starting now.
    pub fn issue(&self, claim: &Claim) -> Result<String, TokenError> {
        self.issue_at(claim, Utc::now())
    }

    /// Sign `claim` as if issued at `now`.
    pub fn issue_at(&self, claim: &Claim, now: DateTime<Utc>) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let claims = SignedClaims {
            claim: claim.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let header = encode_segment(&header)?;
        let payload = encode_segment(&claims)?;
        let signing_input = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes())?);

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claim, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token against `now`. The signature is checked before expiry,
    /// so a token with a forged `exp` reports `InvalidSignature`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claim, TokenError> {
        let mut segments = token.split('.');
        let (header, payload, signature) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => {
                return Err(TokenError::Malformed(
                    "expected three dot-separated segments".to_string(),
                ))
            }
        };

        let parsed_header: Header = decode_segment(header)?;
        if parsed_header.alg != ALGORITHM {
            return Err(TokenError::Malformed(format!(
                "unsupported algorithm {}",
                parsed_header.alg
            )));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(format!("signature encoding: {e}")))?;

        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        // constant-time comparison
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: SignedClaims = decode_segment(payload)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims.claim)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = self.mac()?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Signing(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("segment encoding: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(format!("segment json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "test-secret-with-enough-bytes",
            Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        )
    }

    #[test]
    fn test_issue_then_verify_returns_claim() {
        let tokens = service();
        let claim = Claim {
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
        };

        let token = tokens.issue(&claim).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(tokens.verify(&token).unwrap(), claim);
    }

    #[test]
    fn test_verify_is_repeatable() {
        let tokens = service();
        let token = tokens.issue(&Claim::new("bob@example.com")).unwrap();

        let first = tokens.verify(&token).unwrap();
        let second = tokens.verify(&token).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_expired_after_window() {
        let tokens = service();
        let issued = Utc::now();
        let token = tokens.issue_at(&Claim::new("a@b.com"), issued).unwrap();

        let just_before = issued + Duration::seconds(DEFAULT_TOKEN_TTL_SECS - 1);
        assert!(tokens.verify_at(&token, just_before).is_ok());

        let at_expiry = issued + Duration::seconds(DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(tokens.verify_at(&token, at_expiry), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let token = service().issue(&Claim::new("a@b.com")).unwrap();
        let other = TokenService::new("another-secret-entirely", Duration::hours(1));

        assert_eq!(other.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let tokens = service();
        let token = tokens.issue(&Claim::new("a@b.com")).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = SignedClaims {
            claim: Claim::new("admin@example.com"),
            iat: 0,
            exp: i64::MAX,
        };
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            encode_segment(&forged_claims).unwrap(),
            parts[2]
        );

        assert_eq!(tokens.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let tokens = service();
        assert!(matches!(tokens.verify(""), Err(TokenError::Malformed(_))));
        assert!(matches!(tokens.verify("a.b"), Err(TokenError::Malformed(_))));
        assert!(matches!(tokens.verify("a.b.c.d"), Err(TokenError::Malformed(_))));
        assert!(matches!(
            tokens.verify("!!!.???.###"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_other_algorithms() {
        let tokens = service();
        let header = encode_segment(&Header {
            alg: "none".to_string(),
            typ: None,
        })
        .unwrap();
        let token = format!("{header}.e30.");

        assert!(matches!(tokens.verify(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("test-secret"));
    }
}
