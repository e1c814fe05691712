//! Request and reply bodies exchanged with the HTTP transport.

use serde::{Deserialize, Serialize};

/// An inbound chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// The reply sent back for any message or upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// `ok` on success, otherwise the error kind (e.g. `not_selected`).
    pub kind: String,
    /// Human-readable reply text.
    pub text: String,
    pub ok: bool,
}

impl Reply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            kind: "ok".to_string(),
            text: text.into(),
            ok: true,
        }
    }

    pub fn error(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            ok: false,
        }
    }
}
