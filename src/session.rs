//! Session state model and signed token codec
//!
//! The server is stateless: the full conversation (turn history plus the
//! selected tone) round-trips through the client as an opaque token. The
//! token is an explicit, versioned serialization format: a base64url JSON
//! payload joined with a base64url HMAC-SHA256 signature over the payload
//! bytes, keyed by a server-held secret, with an absolute expiry baked in.
//!
//! Decoding never faults: an expired, tampered, or malformed token yields
//! `valid = false` with an empty history and a descriptive error, which
//! callers treat identically to "no token supplied".

use crate::state::Tone;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Current token schema version; unknown versions decode as invalid.
const TOKEN_VERSION: u8 = 1;

/// One user message and its assistant reply
///
/// Immutable once appended to a session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The raw user message
    pub user_text: String,
    /// The assistant reply as returned to the client
    pub assistant_text: String,
    /// When the turn was accepted
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped with the current time
    pub fn new(user_text: String, assistant_text: String) -> Self {
        Self {
            user_text,
            assistant_text,
            created_at: Utc::now(),
        }
    }
}

/// Signed token payload
///
/// This is the wire schema; changing any field requires bumping
/// [`TOKEN_VERSION`].
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    v: u8,
    history: Vec<Turn>,
    tone: Option<Tone>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Result of decoding an inbound session token
#[derive(Debug)]
pub struct DecodedSession {
    /// Turn history, oldest first; empty when the token was invalid
    pub history: Vec<Turn>,
    /// Selected tone, if any
    pub tone: Option<Tone>,
    /// Whether the token verified and had not expired
    pub valid: bool,
    /// Human-readable reason when `valid` is false
    pub error: Option<String>,
}

impl DecodedSession {
    /// A fresh empty session, used both for "no token supplied" and for
    /// every invalid-token path.
    fn fresh(error: Option<String>) -> Self {
        Self {
            history: Vec::new(),
            tone: None,
            valid: false,
            error,
        }
    }
}

/// Encodes and decodes signed session tokens
///
/// # Examples
///
/// ```
/// use bridgechat::session::{SessionCodec, Turn};
/// use bridgechat::state::Tone;
///
/// let codec = SessionCodec::new("a-long-enough-test-secret".to_string(), 24);
/// let history = vec![Turn::new("hi".into(), "Hello!".into())];
/// let token = codec.encode(&history, Some(Tone::Casual)).unwrap();
///
/// let decoded = codec.decode(&token);
/// assert!(decoded.valid);
/// assert_eq!(decoded.history.len(), 1);
/// assert_eq!(decoded.tone, Some(Tone::Casual));
/// ```
#[derive(Clone)]
pub struct SessionCodec {
    secret: Vec<u8>,
    ttl_hours: i64,
}

impl SessionCodec {
    /// Create a codec with the given signing secret and token lifetime
    pub fn new(secret: String, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into_bytes(),
            ttl_hours,
        }
    }

    /// Encode a session into a signed token
    ///
    /// The expiry is absolute: `now + ttl_hours` at encode time. Every
    /// accepted chat turn re-encodes, so an active conversation keeps
    /// sliding its window forward.
    ///
    /// # Errors
    ///
    /// Returns an error only if payload serialization fails, which would
    /// indicate a bug in the schema types rather than bad input.
    pub fn encode(&self, history: &[Turn], tone: Option<Tone>) -> crate::error::Result<String> {
        let now = Utc::now();
        let payload = TokenPayload {
            v: TOKEN_VERSION,
            history: history.to_vec(),
            tone,
            created_at: now,
            expires_at: now + Duration::hours(self.ttl_hours),
        };

        let payload_bytes = serde_json::to_vec(&payload)?;
        let signature = self.sign(&payload_bytes);

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload_bytes),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Decode and verify an inbound token
    ///
    /// Never panics or returns `Err`; all failure modes collapse into a
    /// fresh empty session with `valid = false` and a descriptive error.
    pub fn decode(&self, token: &str) -> DecodedSession {
        let Some((payload_part, signature_part)) = token.split_once('.') else {
            return DecodedSession::fresh(Some("malformed token: missing signature".to_string()));
        };

        let payload_bytes = match URL_SAFE_NO_PAD.decode(payload_part) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Rejecting token with undecodable payload: {}", e);
                return DecodedSession::fresh(Some("malformed token: bad payload encoding".to_string()));
            }
        };

        let signature = match URL_SAFE_NO_PAD.decode(signature_part) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Rejecting token with undecodable signature: {}", e);
                return DecodedSession::fresh(Some(
                    "malformed token: bad signature encoding".to_string(),
                ));
            }
        };

        if !self.verify(&payload_bytes, &signature) {
            tracing::warn!("Rejecting session token with invalid signature");
            return DecodedSession::fresh(Some("invalid token signature".to_string()));
        }

        let payload: TokenPayload = match serde_json::from_slice(&payload_bytes) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Rejecting token with unparseable payload: {}", e);
                return DecodedSession::fresh(Some("malformed token payload".to_string()));
            }
        };

        if payload.v != TOKEN_VERSION {
            return DecodedSession::fresh(Some(format!(
                "unsupported token version: {}",
                payload.v
            )));
        }

        if payload.expires_at <= Utc::now() {
            return DecodedSession::fresh(Some("session token expired".to_string()));
        }

        DecodedSession {
            history: payload.history,
            tone: payload.tone,
            valid: true,
            error: None,
        }
    }

    /// Issue a fresh token with empty history and no tone
    ///
    /// Clearing a session is issuing a new token, not mutating anything
    /// server-side.
    pub fn fresh_token(&self) -> crate::error::Result<String> {
        self.encode(&[], None)
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        // new_from_slice only fails for unusable key lengths, which HMAC
        // does not have; the expect is unreachable for any secret.
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload);
        // verify_slice is constant-time
        mac.verify_slice(signature).is_ok()
    }
}
