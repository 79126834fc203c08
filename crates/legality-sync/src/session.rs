//! Operator credential carried explicitly to every admin call.

use std::fmt;

use crate::ApiError;

/// A non-blank admin key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminKey(String);

impl AdminKey {
    /// Accept `raw` if it is non-blank after trimming. Correctness is left to the server.
    pub fn new(raw: impl Into<String>) -> Result<Self, ApiError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ApiError::MissingCredential);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminKey(***)")
    }
}

/// Proof that an operator logged in. Every admin request takes one by reference.
#[derive(Debug, Clone)]
pub struct AdminSession {
    key: AdminKey,
}

impl AdminSession {
    /// Header carrying the credential on admin requests.
    pub const HEADER: &'static str = "x-api-key";

    pub fn new(key: AdminKey) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &AdminKey {
        &self.key
    }

    #[cfg(feature = "http")]
    pub(crate) fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(Self::HEADER, self.key.expose())
    }
}
