use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

/// Token introspection payload from the OAuth provider. The endpoint reports
/// numeric fields as decimal strings.
#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub expires_in: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenInfo {
    pub fn expires_in_seconds(&self) -> Option<i64> {
        self.expires_in.as_deref().and_then(|v| v.parse().ok())
    }

    /// A token is live only while the provider reports remaining lifetime.
    pub fn is_live(&self) -> bool {
        self.expires_in_seconds().is_some_and(|secs| secs > 0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown User")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub icon_link: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub modified_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize)]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Error surface for the REST collaborators. A 401 is its own variant so
/// callers can drop the session and prompt re-authentication instead of
/// showing a generic failure.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Status { status: u16, body: String },
    Http(reqwest::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "authentication failed (401)"),
            ApiError::Status { status, body } => {
                write!(f, "API request failed with status {status}: {body}")
            }
            ApiError::Http(e) => write!(f, "HTTP error: {e}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e)
    }
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        if status.as_u16() == 401 {
            return ApiError::Unauthorized;
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        ApiError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

/// Construct a complete endpoint URL from a base URL and endpoint path,
/// tolerating trailing and leading slashes on either side.
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}

pub mod drive;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_api_url_ignores_slash_variants() {
        assert_eq!(
            construct_api_url("https://api.example.com/v1", "chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            construct_api_url("https://api.example.com/v1///", "/models"),
            "https://api.example.com/v1/models"
        );
    }

    #[test]
    fn token_info_lifetime_parses_decimal_strings() {
        let info: TokenInfo =
            serde_json::from_str(r#"{"expires_in":"3599","email":"a@b.c"}"#).expect("tokeninfo");
        assert_eq!(info.expires_in_seconds(), Some(3599));
        assert!(info.is_live());
    }

    #[test]
    fn expired_or_malformed_token_info_is_not_live() {
        let expired: TokenInfo = serde_json::from_str(r#"{"expires_in":"0"}"#).expect("tokeninfo");
        assert!(!expired.is_live());

        let malformed: TokenInfo =
            serde_json::from_str(r#"{"expires_in":"soon"}"#).expect("tokeninfo");
        assert!(!malformed.is_live());

        let missing: TokenInfo = serde_json::from_str("{}").expect("tokeninfo");
        assert!(!missing.is_live());
    }

    #[test]
    fn drive_file_deserializes_camel_case_fields() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id":"f1","name":"Report","mimeType":"application/vnd.google-apps.document","webViewLink":"https://docs.example.com/f1"}"#,
        )
        .expect("drive file");
        assert_eq!(file.id, "f1");
        assert_eq!(file.name.as_deref(), Some("Report"));
        assert_eq!(
            file.mime_type.as_deref(),
            Some("application/vnd.google-apps.document")
        );
    }
}
