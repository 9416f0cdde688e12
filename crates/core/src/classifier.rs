//! Failed-response classification
//!
//! Maps a failed response to exactly one [`IgError`] variant. The mapping is
//! an ordered table of named rules; the first rule whose predicate matches
//! builds the error, and the last rule always matches.

use igsession_domain::constants::{
    ACCOUNT_DISABLED_FRAGMENT, CHECKPOINT_REQUIRED_MESSAGE, ERROR_TYPE_GENERIC_REQUEST,
    ERROR_TYPE_TWO_FACTOR, RATE_LIMIT_COURTESY_MESSAGE,
};
use igsession_domain::{IgError, ResponseDetails, SessionState};
use serde_json::Value;
use tracing::debug;

use crate::outcome::field_is_truthy;

type Predicate = fn(&ResponseDetails) -> bool;
type Builder = fn(Box<ResponseDetails>) -> IgError;

/// One classification rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Stable name used in logs.
    pub name: &'static str,
    predicate: Predicate,
    build: Builder,
}

impl Rule {
    pub fn matches(&self, details: &ResponseDetails) -> bool {
        (self.predicate)(details)
    }
}

/// The error chosen for a response, plus the rule that chose it.
#[derive(Debug, Clone)]
pub struct Classification {
    pub rule: &'static str,
    pub error: IgError,
}

fn message(details: &ResponseDetails) -> Option<&str> {
    details.body.get("message").and_then(Value::as_str)
}

fn error_type(details: &ResponseDetails) -> Option<&str> {
    details.body.get("error_type").and_then(Value::as_str)
}

/// Classification rules, evaluated top to bottom.
pub const RULES: &[Rule] = &[
    Rule {
        name: "action_spam",
        predicate: |d| field_is_truthy(&d.body, "spam"),
        build: IgError::ActionSpam,
    },
    Rule { name: "not_found", predicate: |d| d.status == 404, build: IgError::NotFound },
    Rule {
        name: "login_required",
        predicate: |d| matches!(d.status, 302 | 401),
        build: IgError::LoginRequired,
    },
    Rule { name: "too_many_requests", predicate: |d| d.status == 429, build: IgError::RequestsLimit },
    Rule {
        name: "checkpoint_required",
        predicate: |d| message(d) == Some(CHECKPOINT_REQUIRED_MESSAGE),
        build: IgError::CheckpointRequired,
    },
    Rule {
        name: "account_disabled",
        predicate: |d| message(d).is_some_and(|m| m.contains(ACCOUNT_DISABLED_FRAGMENT)),
        build: IgError::InactiveUser,
    },
    Rule {
        name: "wait_a_few_minutes",
        predicate: |d| message(d) == Some(RATE_LIMIT_COURTESY_MESSAGE),
        build: IgError::RequestsLimit,
    },
    Rule {
        name: "two_factor_required",
        predicate: |d| {
            field_is_truthy(&d.body, "two_factor_required")
                || error_type(d) == Some(ERROR_TYPE_TWO_FACTOR)
        },
        build: IgError::TwoFactorRequired,
    },
    Rule {
        name: "generic_request_error",
        predicate: |d| error_type(d) == Some(ERROR_TYPE_GENERIC_REQUEST),
        build: IgError::RequestsLimit,
    },
    FALLBACK_RULE,
];

/// Catch-all rule; always last in [`RULES`].
const FALLBACK_RULE: Rule = Rule { name: "response_error", predicate: |_| true, build: IgError::Response };

/// Classifies a failed response.
pub fn classify(details: ResponseDetails) -> Classification {
    let rule = RULES.iter().find(|rule| rule.matches(&details)).unwrap_or(&FALLBACK_RULE);

    debug!(
        rule = rule.name,
        method = %details.method,
        path = %details.path,
        status = details.status,
        "Classified failed response"
    );
    Classification { rule: rule.name, error: (rule.build)(Box::new(details)) }
}

/// Classifies a failed response and records a checkpoint demand on `state`.
pub fn classify_and_apply(state: &mut SessionState, details: ResponseDetails) -> Classification {
    let classification = classify(details);
    if let IgError::CheckpointRequired(details) = &classification.error {
        state.checkpoint = Some(details.body.clone());
    }
    classification
}
