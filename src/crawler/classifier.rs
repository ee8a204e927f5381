//! Transient-failure classification
//!
//! The upstream sites this crawler targets often answer `200 OK` with a
//! database error page when their connection pool is exhausted. Status codes
//! alone can't be trusted, so every response is judged on status and body.

use crate::config::FetchConfig;

/// Why a response was judged transient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientReason {
    /// No body was received at all
    MissingBody,
    /// 5xx or 429
    ServerStatus(u16),
    /// A 200 body containing a known failure signature
    FailureSignature,
    /// A body shorter than the configured minimum
    Truncated,
}

impl TransientReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransientReason::MissingBody => "missing body",
            TransientReason::ServerStatus(_) => "server status",
            TransientReason::FailureSignature => "failure signature",
            TransientReason::Truncated => "truncated body",
        }
    }
}

/// Classifies a response, returning the reason if it should be retried
///
/// Rules are checked in order and the first match wins:
///
/// 1. missing body
/// 2. status >= 500 or status == 429
/// 3. status == 200 and the body contains a failure signature (case-insensitive)
/// 4. body shorter than `min_body_len` characters
///
/// # Arguments
///
/// * `status` - HTTP status, if one was received
/// * `body` - Response body, if one was received
/// * `config` - Fetch configuration holding signatures and the length floor
pub fn classify(status: Option<u16>, body: Option<&str>, config: &FetchConfig) -> Option<TransientReason> {
    let Some(body) = body else {
        return Some(TransientReason::MissingBody);
    };

    if let Some(code) = status {
        if code >= 500 || code == 429 {
            return Some(TransientReason::ServerStatus(code));
        }

        if code == 200 && has_failure_signature(body, &config.failure_signatures) {
            return Some(TransientReason::FailureSignature);
        }
    }

    if body.chars().count() < config.min_body_len {
        return Some(TransientReason::Truncated);
    }

    None
}

/// Returns true if the response should be retried
pub fn is_transient(status: Option<u16>, body: Option<&str>, config: &FetchConfig) -> bool {
    classify(status, body, config).is_some()
}

fn has_failure_signature(body: &str, signatures: &[String]) -> bool {
    let lowered = body.to_lowercase();
    signatures
        .iter()
        .any(|sig| !sig.is_empty() && lowered.contains(&sig.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(len: usize) -> String {
        "The quick brown fox jumps over the lazy dog. "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_missing_body_is_transient() {
        let cfg = FetchConfig::default();
        assert_eq!(classify(Some(200), None, &cfg), Some(TransientReason::MissingBody));
        assert_eq!(classify(None, None, &cfg), Some(TransientReason::MissingBody));
    }

    #[test]
    fn test_server_statuses() {
        let cfg = FetchConfig::default();
        let body = prose(500);
        assert!(is_transient(Some(503), Some(&body), &cfg));
        assert!(is_transient(Some(500), Some(&body), &cfg));
        assert!(is_transient(Some(429), Some(&body), &cfg));
        assert!(!is_transient(Some(404), Some(&body), &cfg));
    }

    #[test]
    fn test_failure_signature_on_ok() {
        let cfg = FetchConfig::default();
        let mut body = prose(400);
        body.push_str("Warning: User has exceeded the 'MAX_USER_CONNECTIONS' resource");
        assert_eq!(
            classify(Some(200), Some(&body), &cfg),
            Some(TransientReason::FailureSignature)
        );
    }

    #[test]
    fn test_signature_ignored_on_non_ok() {
        let cfg = FetchConfig::default();
        let mut body = prose(400);
        body.push_str("database error");
        assert!(!is_transient(Some(404), Some(&body), &cfg));
    }

    #[test]
    fn test_long_prose_is_clean() {
        let cfg = FetchConfig::default();
        assert!(!is_transient(Some(200), Some(&prose(500)), &cfg));
    }

    #[test]
    fn test_truncated_body() {
        let cfg = FetchConfig::default();
        assert_eq!(
            classify(Some(200), Some("<html></html>"), &cfg),
            Some(TransientReason::Truncated)
        );
        assert!(!is_transient(Some(200), Some(&prose(100)), &cfg));
        assert!(is_transient(Some(200), Some(&prose(99)), &cfg));
    }

    #[test]
    fn test_length_counts_characters() {
        let cfg = FetchConfig::default();
        // 60 Gujarati characters occupy far more than 100 bytes
        let body: String = "ક".repeat(60);
        assert!(body.len() > 100);
        assert!(is_transient(Some(200), Some(&body), &cfg));
    }
}
