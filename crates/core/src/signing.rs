//! Request payload signing
//!
//! Mobile API endpoints accept a form body of `signed_body=<hex>.<json>` plus
//! a signature key version. The signature is HMAC-SHA256 over the exact JSON
//! text that follows the dot.

use std::fmt;

use hmac::{Hmac, Mac};
use igsession_domain::constants::{SIGNATURE_KEY, SIGNATURE_VERSION};
use igsession_domain::{IgError, Result};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Form field carrying the signed payload.
pub const SIGNED_BODY_FIELD: &str = "signed_body";
/// Form field carrying the signature key version.
pub const SIG_KEY_VERSION_FIELD: &str = "ig_sig_key_version";

/// A signed payload ready to be form-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBody {
    pub signed_body: String,
    pub ig_sig_key_version: String,
}

impl SignedBody {
    /// The `(name, value)` pairs to submit as an url-encoded form.
    pub fn form_fields(&self) -> [(&'static str, &str); 2] {
        [
            (SIGNED_BODY_FIELD, self.signed_body.as_str()),
            (SIG_KEY_VERSION_FIELD, self.ig_sig_key_version.as_str()),
        ]
    }
}

/// Deterministic HMAC-SHA256 signer keyed with a shared secret.
#[derive(Clone)]
pub struct RequestSigner {
    mac: HmacSha256,
    version: String,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner").field("version", &self.version).finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer for `key`, tagging signed bodies with `version`.
    ///
    /// # Errors
    /// Returns `IgError::Config` if the key is rejected by the MAC.
    pub fn new(key: impl AsRef<[u8]>, version: impl Into<String>) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(key.as_ref())
            .map_err(|e| IgError::Config(format!("Failed to create request signer: {e}")))?;
        Ok(Self { mac, version: version.into() })
    }

    /// Signer with the service's shared secret and key version.
    ///
    /// # Errors
    /// Returns `IgError::Config` if the key is rejected by the MAC.
    pub fn standard() -> Result<Self> {
        Self::new(SIGNATURE_KEY, SIGNATURE_VERSION)
    }

    /// Lowercase hex HMAC-SHA256 of `text`.
    pub fn signature(&self, text: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(text.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Signs a payload.
    ///
    /// A string payload is signed as-is; any other value is canonicalized to
    /// compact JSON text first.
    pub fn sign(&self, payload: &Value) -> SignedBody {
        let text = match payload {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        self.sign_text(&text)
    }

    /// Signs already-serialized JSON text.
    pub fn sign_text(&self, text: &str) -> SignedBody {
        SignedBody {
            signed_body: format!("{}.{text}", self.signature(text)),
            ig_sig_key_version: self.version.clone(),
        }
    }
}

/// Signs `payload` with the service's shared secret.
///
/// # Errors
/// Returns `IgError::Config` if the signer cannot be created.
pub fn sign(payload: &Value) -> Result<SignedBody> {
    Ok(RequestSigner::standard()?.sign(payload))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn signing_is_deterministic() {
        let payload = json!({"_csrftoken": "abc", "username": "someone", "device_id": "android-1"});
        assert_eq!(sign(&payload).unwrap(), sign(&payload).unwrap());
    }

    #[test]
    fn signed_body_is_hex_dot_json() {
        let payload = json!({"a": 1});
        let signed = sign(&payload).unwrap();

        let (digest, json) = signed.signed_body.split_once('.').unwrap();
        assert_eq!(json, r#"{"a":1}"#);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(signed.ig_sig_key_version, "4");
    }

    #[test]
    fn string_payload_is_passed_through() {
        let text = r#"{"b":2,"a":1}"#;
        let signed = sign(&Value::String(text.to_string())).unwrap();
        assert!(signed.signed_body.ends_with(&format!(".{text}")));
        assert_eq!(signed, RequestSigner::standard().unwrap().sign_text(text));
    }

    #[test]
    fn matches_known_hmac_vector() {
        // RFC 4231 test case 2.
        let signer = RequestSigner::new("Jefe", "4").unwrap();
        assert_eq!(
            signer.signature("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn different_payloads_differ() {
        assert_ne!(sign(&json!({"a": 1})).unwrap(), sign(&json!({"a": 2})).unwrap());
    }

    #[test]
    fn form_fields_pair() {
        let signed = RequestSigner::new("k", "7").unwrap().sign_text("{}");
        let fields = signed.form_fields();
        assert_eq!(fields[0].0, "signed_body");
        assert_eq!(fields[1], ("ig_sig_key_version", "7"));
    }
}
