/// Google Drive listing and Google Sheets row appends
use crate::config::SheetsConfig;
use crate::error::SaverError;
use crate::gateway::http::{HttpRequest, HttpResponse, Transport};
use crate::protocol::SheetSummary;
use crate::record::{ExtractedRecord, SHEET_HEADERS, headers_match};
use crate::storage::SettingsStore;
use serde::Deserialize;
use serde_json::json;
use url::Url;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<Worksheet>,
}

#[derive(Debug, Deserialize)]
struct Worksheet {
    properties: WorksheetProperties,
}

#[derive(Debug, Deserialize)]
struct WorksheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Map a non-2xx Google API response onto the error taxonomy
pub fn classify_failure(status: u16, status_text: &str, body: &str) -> SaverError {
    let api_error = serde_json::from_str::<ApiErrorBody>(body).ok().map(|parsed| parsed.error);

    match status {
        401 => SaverError::AuthExpired,
        403 => {
            let rate_limited = api_error.as_ref().is_some_and(|error| {
                error.message.to_lowercase().contains("rate limit")
                    || error
                        .errors
                        .iter()
                        .any(|detail| detail.reason.to_lowercase().contains("ratelimit"))
            });
            if rate_limited {
                SaverError::RateLimited
            } else {
                SaverError::PermissionDenied
            }
        }
        _ => SaverError::Remote {
            status,
            message: api_error
                .map(|error| error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| status_text.to_string()),
        },
    }
}

/// Drive and Sheets calls on behalf of the stored session.
///
/// Any 401 clears the stored token before the error is returned.
pub struct SheetsGateway<T, S> {
    transport: T,
    store: S,
    config: SheetsConfig,
}

impl<T: Transport, S: SettingsStore> SheetsGateway<T, S> {
    pub fn new(transport: T, store: S, config: SheetsConfig) -> Self {
        SheetsGateway {
            transport,
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Spreadsheets visible to the signed-in user
    pub async fn list_sheets(&self) -> Result<Vec<SheetSummary>, SaverError> {
        let session = self.store.load_session().await?;
        let token = session.require_token()?;

        let url = Url::parse_with_params(
            DRIVE_FILES_URL,
            &[
                ("q", format!("mimeType=\"{}\"", SPREADSHEET_MIME_TYPE)),
                ("pageSize", self.config.page_size.to_string()),
            ],
        )
        .map_err(|e| SaverError::transport(e.to_string()))?;

        let response = self.checked(HttpRequest::get(url, token)).await?;
        let list: DriveFileList = response.json()?;

        Ok(list
            .files
            .into_iter()
            .map(|file| SheetSummary {
                id: file.id,
                name: file.name,
            })
            .collect())
    }

    /// Append `record` as one row of the selected spreadsheet
    pub async fn save_record(&self, record: &ExtractedRecord) -> Result<(), SaverError> {
        let session = self.store.load_session().await?;
        let token = session.require_token()?;
        let sheet = session.require_sheet()?;

        let worksheet = self.first_worksheet_name(token, &sheet.id).await?;
        log::debug!("Saving to worksheet '{}' of '{}'", worksheet, sheet.name);

        self.ensure_headers(token, &sheet.id, &worksheet).await?;

        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=RAW",
            SHEETS_API_URL,
            sheet.id,
            encode_component(&quote_worksheet(&worksheet))
        );
        self.checked(HttpRequest::post(url, token, json!({ "values": [record.to_row()] })))
            .await?;

        log::info!("Row appended to '{}'", sheet.name);
        Ok(())
    }

    /// Title of the first worksheet; the configured default when it cannot
    /// be determined for any reason other than expired credentials
    async fn first_worksheet_name(&self, token: &str, sheet_id: &str) -> Result<String, SaverError> {
        let url = format!("{}/{}", SHEETS_API_URL, sheet_id);
        let title = match self.checked(HttpRequest::get(url, token)).await {
            Ok(response) => response
                .json::<SpreadsheetMetadata>()
                .ok()
                .and_then(|metadata| metadata.sheets.into_iter().next())
                .map(|worksheet| worksheet.properties.title),
            Err(SaverError::AuthExpired) => return Err(SaverError::AuthExpired),
            Err(e) => {
                log::warn!("Could not read worksheet names: {}", e);
                None
            }
        };

        Ok(title.unwrap_or_else(|| self.config.default_worksheet.clone()))
    }

    /// Write the header row into an empty sheet; leave any existing first
    /// row alone. Only expired credentials abort the save.
    async fn ensure_headers(&self, token: &str, sheet_id: &str, worksheet: &str) -> Result<(), SaverError> {
        match self.try_ensure_headers(token, sheet_id, worksheet).await {
            Err(SaverError::AuthExpired) => Err(SaverError::AuthExpired),
            Err(e) => {
                log::warn!("Header check failed, appending anyway: {}", e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    async fn try_ensure_headers(&self, token: &str, sheet_id: &str, worksheet: &str) -> Result<(), SaverError> {
        let range = encode_component(&format!("{}!A1:F1", quote_worksheet(worksheet)));
        let url = format!("{}/{}/values/{}", SHEETS_API_URL, sheet_id, range);

        let response = self.checked(HttpRequest::get(url.clone(), token)).await?;
        let existing: ValueRange = response.json()?;
        let first_row: Vec<String> = existing
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|cell| match cell {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
            .collect();

        if first_row.iter().all(|cell| cell.trim().is_empty()) {
            let update = format!("{}?valueInputOption=RAW", url);
            self.checked(HttpRequest::put(update, token, json!({ "values": [SHEET_HEADERS] })))
                .await?;
            log::info!("Header row written");
        } else if !headers_match(&first_row) {
            log::warn!(
                "Sheet headers do not match the expected {:?}, found {:?}",
                SHEET_HEADERS,
                first_row
            );
        }

        Ok(())
    }

    /// Send and turn non-2xx responses into errors
    async fn checked(&self, request: HttpRequest) -> Result<HttpResponse, SaverError> {
        let response = self.transport.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        let error = classify_failure(response.status, &response.status_text, &response.body);
        if error == SaverError::AuthExpired {
            log::warn!("Google rejected the access token, clearing it");
            if let Err(e) = self.store.clear_token().await {
                log::error!("Failed to clear expired token: {}", e);
            }
        }
        Err(error)
    }
}

/// A1-notation sheet reference; quoted so names like `A1` or `Q1 2024` are
/// never read as cell ranges
fn quote_worksheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Percent-encode one URL path segment
fn encode_component(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
