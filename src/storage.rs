/// Session persisted in chrome.storage.local
use crate::error::SaverError;
use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const SELECTED_SHEET_KEY: &str = "selectedSheet";

/// The spreadsheet rows are appended to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedSheet {
    pub id: String,
    pub name: String,
}

/// Root storage structure, read in one `get([accessToken, selectedSheet])`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_sheet: Option<SelectedSheet>,
}

impl Session {
    pub fn is_signed_in(&self) -> bool {
        self.access_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    pub fn require_token(&self) -> Result<&str, SaverError> {
        self.access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(SaverError::MissingToken)
    }

    pub fn require_sheet(&self) -> Result<&SelectedSheet, SaverError> {
        self.selected_sheet.as_ref().ok_or(SaverError::MissingSheet)
    }
}

/// Durable key-value settings shared by every extension context.
///
/// No locking: the last write wins.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn load_session(&self) -> Result<Session, SaverError>;

    async fn save_token(&self, token: &str) -> Result<(), SaverError>;

    async fn clear_token(&self) -> Result<(), SaverError>;

    async fn save_selected_sheet(&self, sheet: &SelectedSheet) -> Result<(), SaverError>;

    /// Forget everything (disconnect)
    async fn clear(&self) -> Result<(), SaverError>;
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    pub struct MemoryStore {
        session: RefCell<Session>,
    }

    impl MemoryStore {
        pub fn with_session(session: Session) -> MemoryStore {
            MemoryStore {
                session: RefCell::new(session),
            }
        }

        pub fn snapshot(&self) -> Session {
            self.session.borrow().clone()
        }
    }

    impl SettingsStore for MemoryStore {
        async fn load_session(&self) -> Result<Session, SaverError> {
            Ok(self.snapshot())
        }

        async fn save_token(&self, token: &str) -> Result<(), SaverError> {
            self.session.borrow_mut().access_token = Some(token.to_string());
            Ok(())
        }

        async fn clear_token(&self) -> Result<(), SaverError> {
            self.session.borrow_mut().access_token = None;
            Ok(())
        }

        async fn save_selected_sheet(&self, sheet: &SelectedSheet) -> Result<(), SaverError> {
            self.session.borrow_mut().selected_sheet = Some(sheet.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<(), SaverError> {
            *self.session.borrow_mut() = Session::default();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn create_test_sheet() -> SelectedSheet {
        SelectedSheet {
            id: "1AbC".to_string(),
            name: "Saved posts".to_string(),
        }
    }

    #[test]
    fn test_session_deserializes_storage_keys() {
        let json = r#"{"accessToken": "ya29.token", "selectedSheet": {"id": "1AbC", "name": "Saved posts"}}"#;

        let session: Session = serde_json::from_str(json).unwrap();

        assert_eq!(session.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(session.selected_sheet, Some(create_test_sheet()));
    }

    #[test]
    fn test_empty_storage_is_signed_out() {
        let session: Session = serde_json::from_str("{}").unwrap();

        assert!(!session.is_signed_in());
        assert_eq!(session.require_token(), Err(SaverError::MissingToken));
        assert_eq!(session.require_sheet(), Err(SaverError::MissingSheet));
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let session = Session {
            access_token: Some(String::new()),
            selected_sheet: None,
        };
        assert_eq!(session.require_token(), Err(SaverError::MissingToken));
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let session = Session {
            access_token: Some("t".to_string()),
            selected_sheet: None,
        };

        let json = serde_json::to_string(&session).unwrap();

        assert_eq!(json, r#"{"accessToken":"t"}"#);
    }

    #[test]
    fn test_memory_store_clear_token_keeps_sheet() {
        let store = MemoryStore::default();
        block_on(async {
            store.save_token("t").await.unwrap();
            store.save_selected_sheet(&create_test_sheet()).await.unwrap();
            store.clear_token().await.unwrap();
        });

        let session = store.snapshot();
        assert!(session.access_token.is_none());
        assert_eq!(session.selected_sheet, Some(create_test_sheet()));
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryStore::with_session(Session {
            access_token: Some("t".to_string()),
            selected_sheet: Some(create_test_sheet()),
        });

        block_on(store.clear()).unwrap();

        assert_eq!(store.snapshot(), Session::default());
    }
}
