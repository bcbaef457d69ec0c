/// Message protocol between the content script, popup and background worker
use crate::error::SaverError;
use crate::record::ExtractedRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum Request {
    Authenticate,
    GetSheets,
    SaveToSheet(ExtractedRecord),
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::Authenticate => "authenticate",
            Request::GetSheets => "getSheets",
            Request::SaveToSheet(_) => "saveToSheet",
        }
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Request, SaverError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// A spreadsheet offered in the popup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheets: Option<Vec<SheetSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<SaverError>,
}

impl Response {
    pub fn ok() -> Response {
        Response {
            success: true,
            ..Response::default()
        }
    }

    pub fn authenticated(token: String) -> Response {
        Response {
            token: Some(token),
            ..Response::ok()
        }
    }

    pub fn with_sheets(sheets: Vec<SheetSummary>) -> Response {
        Response {
            sheets: Some(sheets),
            ..Response::ok()
        }
    }

    pub fn failed(error: SaverError) -> Response {
        Response {
            success: false,
            error: Some(error.to_string()),
            failure: Some(error),
            ..Response::default()
        }
    }

    pub fn unknown_action() -> Response {
        Response {
            success: false,
            error: Some("Unknown action".to_string()),
            ..Response::default()
        }
    }

    /// Turn a reply back into a result on the sending side
    pub fn into_result(self) -> Result<Response, SaverError> {
        if self.success {
            return Ok(self);
        }
        Err(match (self.failure, self.error) {
            (Some(failure), _) => failure,
            (None, Some(message)) => SaverError::transport(message),
            (None, None) => SaverError::transport(
                "Failed to save post. Please check your connection and try again.",
            ),
        })
    }
}

impl From<Result<Response, SaverError>> for Response {
    fn from(result: Result<Response, SaverError>) -> Self {
        result.unwrap_or_else(Response::failed)
    }
}
