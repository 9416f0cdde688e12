//! Success decisions for the two request modes

use serde_json::Value;

/// Reserved body field checked by the web login path.
pub const AUTHENTICATED_FIELD: &str = "authenticated";

/// Result of checking a web-mode response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebOutcome {
    Success,
    /// 200 with an object body whose `authenticated` field is present but
    /// falsy.
    BadPassword,
    /// Anything else; goes to the classifier.
    Failure,
}

/// JavaScript-style truthiness, which is what the service's boolean-ish
/// fields are designed around.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Truthiness of `body[field]`; a missing field or non-object body is falsy.
pub fn field_is_truthy(body: &Value, field: &str) -> bool {
    body.get(field).is_some_and(is_truthy)
}

/// Web success: the body is an object, the status is 200, and there is no
/// `authenticated` field or it is truthy.
pub fn web_outcome(status: u16, body: &Value) -> WebOutcome {
    let Value::Object(map) = body else {
        return WebOutcome::Failure;
    };
    if status != 200 {
        return WebOutcome::Failure;
    }
    match map.get(AUTHENTICATED_FIELD) {
        Some(authenticated) if !is_truthy(authenticated) => WebOutcome::BadPassword,
        _ => WebOutcome::Success,
    }
}

/// App success: `status == "ok"` in the body, or a 200 when only the HTTP
/// status is checked.
pub fn app_succeeded(status: u16, body: &Value, only_check_status: bool) -> bool {
    body.get("status").and_then(Value::as_str) == Some("ok") || (only_check_status && status == 200)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn truthiness_follows_js() {
        for value in [json!(true), json!(1), json!(-0.5), json!("x"), json!([]), json!({})] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
        for value in [json!(false), json!(0), json!(0.0), json!(""), Value::Null] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
    }

    #[test]
    fn web_authenticated_true_succeeds() {
        assert_eq!(web_outcome(200, &json!({"authenticated": true, "user": true})), WebOutcome::Success);
    }

    #[test]
    fn web_authenticated_false_is_bad_password() {
        assert_eq!(web_outcome(200, &json!({"authenticated": false})), WebOutcome::BadPassword);
        assert_eq!(web_outcome(200, &json!({"authenticated": null})), WebOutcome::BadPassword);
        assert_eq!(web_outcome(200, &json!({"authenticated": 0})), WebOutcome::BadPassword);
    }

    #[test]
    fn web_without_authenticated_succeeds() {
        assert_eq!(web_outcome(200, &json!({"status": "ok"})), WebOutcome::Success);
    }

    #[test]
    fn web_non_object_or_non_200_fails() {
        assert_eq!(web_outcome(200, &json!("text")), WebOutcome::Failure);
        assert_eq!(web_outcome(200, &json!([1])), WebOutcome::Failure);
        assert_eq!(web_outcome(201, &json!({})), WebOutcome::Failure);
        assert_eq!(web_outcome(400, &json!({"authenticated": false})), WebOutcome::Failure);
    }

    #[test]
    fn app_success_rules() {
        assert!(app_succeeded(200, &json!({"status": "ok"}), false));
        // The body decides, even on an unusual status.
        assert!(app_succeeded(201, &json!({"status": "ok"}), false));
        assert!(!app_succeeded(200, &json!({"status": "fail"}), false));
        assert!(app_succeeded(200, &json!({"status": "fail"}), true));
        assert!(!app_succeeded(400, &json!("text"), true));
    }

    #[test]
    fn field_truthiness_on_non_objects() {
        assert!(!field_is_truthy(&json!("spam"), "spam"));
        assert!(field_is_truthy(&json!({"spam": 1}), "spam"));
    }
}
