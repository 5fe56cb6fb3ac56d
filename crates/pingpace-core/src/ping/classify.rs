//! Connectivity failure detection from ping error text.

use serde::Serialize;

use super::types::PingAttemptOutcome;

/// Substrings (lowercase) that mark a failure as a connectivity problem
pub const NETWORK_ERROR_KEYWORDS: &[&str] = &[
    "timeout",
    "timed out",
    "offline",
    "dns",
    "unreachable",
    "network",
    "no internet",
    "connection refused",
    "connection reset",
    "could not resolve",
    "temporarily unavailable",
];

/// How a failed attempt should be treated by the retry protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureClass {
    /// Connectivity problem, worth retrying after a backoff
    Network,
    /// Authentication or anything else; retrying will not help
    Other,
}

/// Check error text for connectivity keywords (case-insensitive)
pub fn is_network_error(error_text: &str) -> bool {
    let lowered = error_text.to_lowercase();
    NETWORK_ERROR_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Classify a failed outcome. Returns `None` for successful attempts.
pub fn classify_failure(outcome: &PingAttemptOutcome) -> Option<FailureClass> {
    if outcome.is_success() {
        return None;
    }
    let text = outcome.error_text.as_deref().unwrap_or_default();
    if is_network_error(text) {
        Some(FailureClass::Network)
    } else {
        Some(FailureClass::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_connection_timed_out_is_network() {
        assert!(is_network_error("connection timed out"));
    }

    #[test]
    fn test_invalid_session_key_is_not_network() {
        assert!(!is_network_error("invalid session key"));
    }

    #[test]
    fn test_case_insensitive_match() {
        assert!(is_network_error("Error: DNS lookup failed"));
        assert!(is_network_error("Network is Unreachable"));
        assert!(is_network_error("You appear to be OFFLINE"));
    }

    #[test]
    fn test_auth_errors_are_other() {
        assert!(!is_network_error("401 Unauthorized"));
        assert!(!is_network_error("Invalid API key · Please run /login"));
        assert!(!is_network_error(""));
    }

    #[test]
    fn test_classify_success_is_none() {
        let outcome = PingAttemptOutcome::success(Utc::now(), 1.2);
        assert_eq!(classify_failure(&outcome), None);
    }

    #[test]
    fn test_classify_failure_variants() {
        let network = PingAttemptOutcome::failure(Utc::now(), 30.0, "request timeout");
        assert_eq!(classify_failure(&network), Some(FailureClass::Network));

        let auth = PingAttemptOutcome::failure(Utc::now(), 0.4, "invalid session key");
        assert_eq!(classify_failure(&auth), Some(FailureClass::Other));
    }

    #[test]
    fn test_classify_failure_without_text_is_other() {
        let mut outcome = PingAttemptOutcome::failure(Utc::now(), 0.1, "x");
        outcome.error_text = None;
        assert_eq!(classify_failure(&outcome), Some(FailureClass::Other));
    }
}
