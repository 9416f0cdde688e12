//! Session patches derived from response headers
//!
//! Every completed response, whatever its status, may carry refreshed
//! credentials. This module only reads them; applying the patch is the
//! transport's job.

use http::HeaderMap;
use igsession_domain::constants::{
    AUTHORIZATION_TERMINATOR, HEADER_SET_AUTHORIZATION, HEADER_SET_PW_KEY_ID_APP,
    HEADER_SET_PW_KEY_ID_WEB, HEADER_SET_PW_PUB_KEY_APP, HEADER_SET_PW_PUB_KEY_WEB,
    HEADER_SET_WWW_CLAIM,
};
use igsession_domain::SessionPatch;

/// Builds the patch carried by `headers`.
///
/// - The claim and password-encryption headers are taken as-is (the web
///   variant of the encryption headers wins over the app variant).
/// - `ig-set-authorization` is ignored when empty or when it ends with `:`,
///   which the service sends to mean "no credential".
/// - Header values that are not visible ASCII are ignored.
pub fn derive_state_update(headers: &HeaderMap) -> SessionPatch {
    let read = |name: &str| headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_owned);

    let authorization = read(HEADER_SET_AUTHORIZATION)
        .filter(|auth| !auth.is_empty() && !auth.ends_with(AUTHORIZATION_TERMINATOR));

    SessionPatch {
        ig_www_claim: read(HEADER_SET_WWW_CLAIM),
        authorization,
        password_encryption_key_id: read(HEADER_SET_PW_KEY_ID_WEB)
            .or_else(|| read(HEADER_SET_PW_KEY_ID_APP)),
        password_encryption_pub_key: read(HEADER_SET_PW_PUB_KEY_WEB)
            .or_else(|| read(HEADER_SET_PW_PUB_KEY_APP)),
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use igsession_domain::SessionState;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn terminated_authorization_is_ignored() {
        let patch = derive_state_update(&headers(&[("ig-set-authorization", "Bearer abc:")]));
        assert!(patch.authorization.is_none());
        assert!(patch.is_empty());
    }

    #[test]
    fn authorization_updates_state() {
        let mut state = SessionState::default();
        state.apply(derive_state_update(&headers(&[("ig-set-authorization", "Bearer abc")])));
        assert_eq!(state.authorization(), Some("Bearer abc"));

        // A terminated value afterwards leaves the credential in place.
        state.apply(derive_state_update(&headers(&[("ig-set-authorization", "Bearer IGT:2:")])));
        assert_eq!(state.authorization(), Some("Bearer abc"));
    }

    #[test]
    fn empty_authorization_is_ignored() {
        let patch = derive_state_update(&headers(&[("ig-set-authorization", "")]));
        assert!(patch.authorization.is_none());
    }

    #[test]
    fn claim_and_encryption_headers() {
        let patch = derive_state_update(&headers(&[
            ("x-ig-set-www-claim", "hmac.AR2"),
            ("ig-set-password-encryption-web-key-id", "251"),
            ("ig-set-password-encryption-web-pub-key", "LS0tLS1CRUdJTiBQVUJMSUMgS0VZ"),
        ]));
        assert_eq!(patch.ig_www_claim.as_deref(), Some("hmac.AR2"));
        assert_eq!(patch.password_encryption_key_id.as_deref(), Some("251"));
        assert_eq!(patch.password_encryption_pub_key.as_deref(), Some("LS0tLS1CRUdJTiBQVUJMSUMgS0VZ"));
    }

    #[test]
    fn app_variant_encryption_headers() {
        let patch = derive_state_update(&headers(&[
            ("ig-set-password-encryption-key-id", "87"),
            ("ig-set-password-encryption-pub-key", "cHVi"),
        ]));
        assert_eq!(patch.password_encryption_key_id.as_deref(), Some("87"));
        assert_eq!(patch.password_encryption_pub_key.as_deref(), Some("cHVi"));
    }

    #[test]
    fn web_variant_wins() {
        let patch = derive_state_update(&headers(&[
            ("ig-set-password-encryption-key-id", "87"),
            ("ig-set-password-encryption-web-key-id", "251"),
        ]));
        assert_eq!(patch.password_encryption_key_id.as_deref(), Some("251"));
    }

    #[test]
    fn unrelated_headers_produce_empty_patch() {
        let patch = derive_state_update(&headers(&[("content-type", "application/json")]));
        assert!(patch.is_empty());
    }
}
