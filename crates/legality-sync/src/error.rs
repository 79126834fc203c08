use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {}", server_message(.detail, .body))]
    Server {
        status: u16,
        /// `detail` field of the server's JSON error body, when it had one.
        detail: Option<String>,
        body: String,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no admin credential available; log in first")]
    MissingCredential,
}

impl ApiError {
    /// Build a [`ApiError::Server`] from a non-success status and its raw body.
    pub fn server(status: u16, body: String) -> Self {
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").cloned())
            .and_then(|d| match d {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            });
        Self::Server {
            status,
            detail,
            body,
        }
    }

    /// The server-provided error message, if the server sent one.
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            Self::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 or 403: the server did not accept the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

fn server_message<'a>(detail: &'a Option<String>, body: &'a str) -> &'a str {
    detail.as_deref().unwrap_or(body)
}
