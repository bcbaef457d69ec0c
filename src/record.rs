/// Data structures for a scraped post
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column order of every row written to the sheet
pub const SHEET_HEADERS: [&str; 6] = ["Timestamp", "Content", "Likes", "Comments", "Reposts", "URL"];

/// One post, as read from the page at the moment the user clicked save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub timestamp: String,
    pub content: String,
    pub likes: u64,
    pub comments: u64,
    pub reposts: u64,
    pub url: String,
}

impl ExtractedRecord {
    /// Nothing worth saving was found
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.url.is_empty()
    }

    /// Cell values in `SHEET_HEADERS` order
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.timestamp.clone()),
            Value::from(self.content.clone()),
            Value::from(self.likes),
            Value::from(self.comments),
            Value::from(self.reposts),
            Value::from(self.url.clone()),
        ]
    }
}

/// Whether an existing first row already carries the expected headers
pub fn headers_match(row: &[String]) -> bool {
    row.len() >= SHEET_HEADERS.len()
        && SHEET_HEADERS
            .iter()
            .zip(row)
            .all(|(expected, found)| found.trim().eq_ignore_ascii_case(expected))
}
