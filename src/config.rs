/// Extension configuration, embedded at build time
use crate::dom::{ContainerMatcher, SelectorChain};
use crate::error::SaverError;
use serde::{Deserialize, Serialize};

const EMBEDDED_CONFIG: &str = include_str!("../config/extension.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub sheets: SheetsConfig,
    pub profile: SelectorProfile,
}

impl ExtensionConfig {
    /// Parse the configuration bundled with the extension
    pub fn load() -> Result<ExtensionConfig, SaverError> {
        Self::from_json(EMBEDDED_CONFIG)
    }

    pub fn from_json(json: &str) -> Result<ExtensionConfig, SaverError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub authorize_endpoint: String,
    pub scopes: Vec<String>,
}

/// Delays, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub debounce_ms: u32,
    pub settle_ms: u32,
    pub success_feedback_ms: u32,
    pub failure_feedback_ms: u32,
    pub status_clear_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            debounce_ms: 500,
            settle_ms: 1000,
            success_feedback_ms: 2000,
            failure_feedback_ms: 3000,
            status_clear_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub default_worksheet: String,
    pub page_size: u32,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        SheetsConfig {
            default_worksheet: "Sheet1".to_string(),
            page_size: 50,
        }
    }
}

/// Everything site-specific: which nodes are posts, where their action bar
/// lives, and where each field is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorProfile {
    pub unit_selector: String,
    pub marker_attribute: String,
    pub control_class: String,
    pub wrapper_class: String,
    pub container: Vec<ContainerMatcher>,
    pub content: SelectorChain,
    pub likes: SelectorChain,
    pub comments: SelectorChain,
    pub reposts: SelectorChain,
    pub url: SelectorChain,
    #[serde(default = "default_content_limit")]
    pub content_limit: usize,
}

fn default_content_limit() -> usize {
    1000
}
