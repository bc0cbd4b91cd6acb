//! Explicit session context handed to every API call.

use uuid::Uuid;

use crate::api::ClientError;

/// The signed-in user, as far as the client needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    base_url: String,
    token: Option<String>,
    viewer: Option<Viewer>,
}

impl Session {
    pub fn anonymous(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            viewer: None,
        }
    }

    pub fn signed_in(base_url: impl Into<String>, token: impl Into<String>, viewer: Viewer) -> Self {
        Self {
            token: Some(token.into()),
            viewer: Some(viewer),
            ..Self::anonymous(base_url)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    /// The viewer for operations that need an identity.
    pub fn require_viewer(&self) -> Result<&Viewer, ClientError> {
        self.viewer.as_ref().ok_or(ClientError::NotSignedIn)
    }

    /// Absolute URL for an API path such as `/api/posts/feed`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
