//! Maps provider failures onto the user-facing error categories.
//!
//! Structured fields win: the `code`/`type` of the error envelope first, then
//! the HTTP status. Only when neither decides does the message text get
//! inspected, using the same keywords the provider's error texts carry.

use crate::{
    error::{GenerationError, Stage},
    models::ApiErrorBody,
};
use reqwest::StatusCode;

const MAX_RAW_BODY_CHARS: usize = 200;

/// What is known about a failed provider call.
#[derive(Debug, Clone, Default)]
pub struct ProviderFailure {
    pub status: Option<StatusCode>,
    pub body: Option<ApiErrorBody>,
    pub message: String,
}

impl ProviderFailure {
    pub fn from_response(status: StatusCode, body: Option<ApiErrorBody>, raw: &str) -> Self {
        let message = match &body {
            Some(body) if !body.message.is_empty() => body.message.clone(),
            _ if !raw.trim().is_empty() => format!("{} {}", status, one_line_excerpt(raw)),
            _ => status.to_string(),
        };
        Self {
            status: Some(status),
            body,
            message,
        }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Collapses whitespace and keeps at most `MAX_RAW_BODY_CHARS` characters.
fn one_line_excerpt(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(MAX_RAW_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &collapsed[..cut]),
        None => collapsed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Authentication,
    Quota,
    ContentPolicy,
}

pub fn classify(stage: Stage, failure: ProviderFailure) -> GenerationError {
    let category = from_structured(stage, &failure)
        .or_else(|| from_status(failure.status))
        .or_else(|| from_message(stage, &failure.message));

    match category {
        Some(Category::Authentication) => GenerationError::Authentication,
        Some(Category::Quota) => GenerationError::QuotaExceeded,
        Some(Category::ContentPolicy) => GenerationError::ContentPolicy,
        None => GenerationError::Provider {
            stage,
            message: failure.message,
        },
    }
}

fn from_structured(stage: Stage, failure: &ProviderFailure) -> Option<Category> {
    let body = failure.body.as_ref()?;
    let code = body.code_str();
    let kinds = [code.as_deref(), body.kind.as_deref()];

    for kind in kinds.into_iter().flatten() {
        match kind {
            "invalid_api_key" | "invalid_authentication" | "authentication_error" => {
                return Some(Category::Authentication)
            }
            "insufficient_quota" | "rate_limit_exceeded" | "billing_hard_limit_reached" => {
                return Some(Category::Quota)
            }
            "content_policy_violation" if stage == Stage::Image => {
                return Some(Category::ContentPolicy)
            }
            _ => {}
        }
    }
    None
}

fn from_status(status: Option<StatusCode>) -> Option<Category> {
    match status? {
        StatusCode::UNAUTHORIZED => Some(Category::Authentication),
        StatusCode::TOO_MANY_REQUESTS => Some(Category::Quota),
        _ => None,
    }
}

fn from_message(stage: Stage, message: &str) -> Option<Category> {
    if ["Unauthorized", "401", "authentication"]
        .iter()
        .any(|needle| message.contains(needle))
    {
        return Some(Category::Authentication);
    }
    if message.contains("quota") || message.contains("limit") {
        return Some(Category::Quota);
    }
    if stage == Stage::Image && (message.contains("content_policy") || message.contains("policy")) {
        return Some(Category::ContentPolicy);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: Option<&str>, kind: Option<&str>, message: &str) -> ApiErrorBody {
        ApiErrorBody {
            message: message.to_string(),
            kind: kind.map(String::from),
            code: code.map(|c| serde_json::Value::String(c.to_string())),
            param: None,
        }
    }

    #[test]
    fn test_invalid_key_code() {
        let failure = ProviderFailure::from_response(
            StatusCode::UNAUTHORIZED,
            Some(body(
                Some("invalid_api_key"),
                Some("invalid_request_error"),
                "Incorrect API key provided: sk-abc. You can find your API key at https://platform.openai.com/account/api-keys.",
            )),
            "",
        );
        assert!(matches!(
            classify(Stage::Prompt, failure),
            GenerationError::Authentication
        ));
    }

    #[test]
    fn test_insufficient_quota_code() {
        let failure = ProviderFailure::from_response(
            StatusCode::TOO_MANY_REQUESTS,
            Some(body(
                Some("insufficient_quota"),
                Some("insufficient_quota"),
                "You exceeded your current quota, please check your plan and billing details.",
            )),
            "",
        );
        assert!(matches!(
            classify(Stage::Image, failure),
            GenerationError::QuotaExceeded
        ));
    }

    #[test]
    fn test_content_policy_code_only_on_image_stage() {
        let failure = || {
            ProviderFailure::from_response(
                StatusCode::BAD_REQUEST,
                Some(body(
                    Some("content_policy_violation"),
                    Some("invalid_request_error"),
                    "Your request was rejected as a result of our safety system.",
                )),
                "",
            )
        };
        assert!(matches!(
            classify(Stage::Image, failure()),
            GenerationError::ContentPolicy
        ));
        assert!(matches!(
            classify(Stage::Prompt, failure()),
            GenerationError::Provider { stage: Stage::Prompt, .. }
        ));
    }

    #[test]
    fn test_status_without_body() {
        let failure = ProviderFailure::from_response(StatusCode::UNAUTHORIZED, None, "");
        assert!(matches!(
            classify(Stage::Prompt, failure),
            GenerationError::Authentication
        ));
        let failure = ProviderFailure::from_response(StatusCode::TOO_MANY_REQUESTS, None, "");
        assert!(matches!(
            classify(Stage::Prompt, failure),
            GenerationError::QuotaExceeded
        ));
    }

    #[test]
    fn test_message_fallback_auth_keywords() {
        for message in [
            "Status: 401 (Unauthorized)",
            "HTTP 401",
            "authentication failed for this request",
        ] {
            assert!(matches!(
                classify(Stage::Prompt, ProviderFailure::from_message(message)),
                GenerationError::Authentication
            ));
        }
    }

    #[test]
    fn test_message_fallback_quota_keywords() {
        for message in ["monthly quota reached", "Rate limit reached for gpt-4"] {
            assert!(matches!(
                classify(Stage::Prompt, ProviderFailure::from_message(message)),
                GenerationError::QuotaExceeded
            ));
        }
    }

    #[test]
    fn test_message_fallback_policy_keyword() {
        let failure = ProviderFailure::from_message("rejected by policy");
        assert!(matches!(
            classify(Stage::Image, failure.clone()),
            GenerationError::ContentPolicy
        ));
        assert!(matches!(
            classify(Stage::Prompt, failure),
            GenerationError::Provider { .. }
        ));
    }

    #[test]
    fn test_auth_wins_over_quota_in_message() {
        let failure = ProviderFailure::from_message("401: key over its limit");
        assert!(matches!(
            classify(Stage::Image, failure),
            GenerationError::Authentication
        ));
    }

    #[test]
    fn test_unclassified_keeps_provider_text() {
        let failure = ProviderFailure::from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some(body(None, Some("server_error"), "The server had an error")),
            "",
        );
        let err = classify(Stage::Prompt, failure);
        assert_eq!(
            err.to_string(),
            "OpenAI API error while generating prompt: The server had an error"
        );
    }

    #[test]
    fn test_raw_body_used_when_not_json() {
        let failure =
            ProviderFailure::from_response(StatusCode::BAD_GATEWAY, None, "<html>bad gateway</html>");
        assert_eq!(failure.message, "502 Bad Gateway <html>bad gateway</html>");
    }

    #[test]
    fn test_long_raw_body_is_cut_to_one_short_line() {
        let page = format!("<html>\n<body>\n{}\n</body></html>", "ünïcode ".repeat(500));
        let failure = ProviderFailure::from_response(StatusCode::SERVICE_UNAVAILABLE, None, &page);

        assert!(!failure.message.contains('\n'));
        assert!(failure.message.starts_with("503 Service Unavailable <html> <body> ünïcode"));
        assert!(failure.message.ends_with('…'));
        let excerpt = failure.message.trim_start_matches("503 Service Unavailable ");
        assert_eq!(excerpt.chars().count(), MAX_RAW_BODY_CHARS + 1);
    }
}
