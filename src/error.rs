/// Error taxonomy shared by the content script, background worker and popup
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingCredential,
    AuthExpired,
    /// Interactive sign-in was cancelled, denied or returned no token
    SignInFailure,
    PermissionDenied,
    RateLimited,
    ExtractionFailure,
    TransportFailure,
    RemoteFailure,
}

/// Every failure a save, sheet listing or sign-in can end with.
///
/// Serializable so a failure raised in the background worker reaches the
/// content script with its variant intact.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SaverError {
    #[error("Please authenticate with Google first. Click the extension icon to sign in.")]
    MissingToken,

    #[error("Please select a Google Sheet first. Click the extension icon to choose a sheet.")]
    MissingSheet,

    #[error("Authentication expired. Please reconnect.")]
    AuthExpired,

    #[error("Permission denied. Please check your Google Sheets permissions.")]
    PermissionDenied,

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited,

    #[error("Could not extract post data. Please try again.")]
    ExtractionFailed,

    #[error("Extension context invalidated. Please refresh the page.")]
    ContextInvalidated,

    #[error("No response from background script. Please refresh and try again.")]
    NoResponse,

    #[error("Request failed: {message}")]
    Transport { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Sign-in failed: {message}")]
    AuthFlow { message: String },

    #[error("Invalid data: {message}")]
    Serialization { message: String },

    #[error("Google API request failed ({status}): {message}")]
    Remote { status: u16, message: String },
}

impl SaverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaverError::MissingToken | SaverError::MissingSheet => ErrorKind::MissingCredential,
            SaverError::AuthExpired => ErrorKind::AuthExpired,
            SaverError::AuthFlow { .. } => ErrorKind::SignInFailure,
            SaverError::PermissionDenied => ErrorKind::PermissionDenied,
            SaverError::RateLimited => ErrorKind::RateLimited,
            SaverError::ExtractionFailed => ErrorKind::ExtractionFailure,
            SaverError::ContextInvalidated
            | SaverError::NoResponse
            | SaverError::Transport { .. }
            | SaverError::Storage { .. }
            | SaverError::Serialization { .. } => ErrorKind::TransportFailure,
            SaverError::Remote { .. } => ErrorKind::RemoteFailure,
        }
    }

    /// Text for the blocking alert raised when a save fails
    pub fn user_message(&self) -> String {
        match self {
            SaverError::ContextInvalidated => {
                "Extension needs to be refreshed. Please reload the page and try again.".to_string()
            }
            SaverError::MissingToken => {
                "Please sign in with Google first. Click the extension icon in the toolbar.".to_string()
            }
            SaverError::MissingSheet => {
                "Please select a Google Sheet first. Click the extension icon to choose one.".to_string()
            }
            SaverError::NoResponse => "Connection error. Please refresh the page and try again.".to_string(),
            other => format!("Error: {}", other),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        SaverError::Transport { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        SaverError::Storage { message: message.into() }
    }

    pub fn auth_flow(message: impl Into<String>) -> Self {
        SaverError::AuthFlow { message: message.into() }
    }
}

impl From<serde_json::Error> for SaverError {
    fn from(e: serde_json::Error) -> Self {
        SaverError::Serialization { message: e.to_string() }
    }
}

impl From<serde_wasm_bindgen::Error> for SaverError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        SaverError::Serialization { message: e.to_string() }
    }
}

impl From<SaverError> for wasm_bindgen::JsValue {
    fn from(e: SaverError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
