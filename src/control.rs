/// The injected "Save to Sheet" control and the save it triggers
use crate::config::{SelectorProfile, Timing};
use crate::dom::PageElement;
use crate::error::SaverError;
use crate::extract::extract_record;
use crate::protocol::{Request, Response};
use crate::storage::{SelectedSheet, Session, SettingsStore};

pub const IDLE_LABEL: &str = "Save to Sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    Busy,
    Saved,
    Failed,
}

impl ControlState {
    pub fn label(&self) -> &'static str {
        match self {
            ControlState::Idle => IDLE_LABEL,
            ControlState::Busy => "Saving...",
            ControlState::Saved => "Saved!",
            ControlState::Failed => "Error",
        }
    }

    pub fn is_disabled(&self) -> bool {
        !matches!(self, ControlState::Idle)
    }

    /// CSS modifier added next to the control class
    pub fn modifier(&self) -> Option<&'static str> {
        match self {
            ControlState::Idle => None,
            ControlState::Busy => Some("is-saving"),
            ControlState::Saved => Some("is-saved"),
            ControlState::Failed => Some("is-error"),
        }
    }

    /// How long a finished state stays visible before going back to idle
    pub fn revert_after(&self, timing: &Timing) -> Option<u32> {
        match self {
            ControlState::Saved => Some(timing.success_feedback_ms),
            ControlState::Failed => Some(timing.failure_feedback_ms),
            ControlState::Idle | ControlState::Busy => None,
        }
    }
}

/// Feedback state of one injected control; at most one save in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionControl {
    state: ControlState,
}

impl Default for ActionControl {
    fn default() -> Self {
        ActionControl {
            state: ControlState::Idle,
        }
    }
}

impl ActionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Enter the busy state; refused while a previous click is unresolved
    pub fn begin(&mut self) -> bool {
        if self.state.is_disabled() {
            return false;
        }
        self.state = ControlState::Busy;
        true
    }

    pub fn finish<T>(&mut self, result: &Result<T, SaverError>) -> ControlState {
        self.state = match result {
            Ok(_) => ControlState::Saved,
            Err(_) => ControlState::Failed,
        };
        self.state
    }

    pub fn revert(&mut self) {
        if self.state != ControlState::Busy {
            self.state = ControlState::Idle;
        }
    }
}

/// Sends a request to the background worker; `None` when nobody answered
#[allow(async_fn_in_trait)]
pub trait Messenger {
    async fn send(&self, request: &Request) -> Result<Option<Response>, SaverError>;
}

/// Checked in order: live runtime, token, selected sheet
pub fn check_preconditions(runtime_valid: bool, session: &Session) -> Result<SelectedSheet, SaverError> {
    if !runtime_valid {
        return Err(SaverError::ContextInvalidated);
    }
    session.require_token()?;
    Ok(session.require_sheet()?.clone())
}

/// Extract `unit` and ask the background worker to append it
pub async fn save_post<E, S, M>(
    unit: &E,
    profile: &SelectorProfile,
    runtime_valid: bool,
    store: &S,
    messenger: &M,
    timestamp: String,
) -> Result<Response, SaverError>
where
    E: PageElement,
    S: SettingsStore,
    M: Messenger,
{
    let session = if runtime_valid {
        store.load_session().await?
    } else {
        Session::default()
    };
    let sheet = check_preconditions(runtime_valid, &session)?;

    let record = extract_record(unit, profile, timestamp);
    if record.is_empty() {
        return Err(SaverError::ExtractionFailed);
    }
    log::debug!("Saving post to '{}': {:?}", sheet.name, record);

    let response = messenger
        .send(&Request::SaveToSheet(record))
        .await?
        .ok_or(SaverError::NoResponse)?;

    response.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionConfig;
    use crate::fixture::FixturePage;
    use crate::storage::MemoryStore;
    use futures::executor::block_on;
    use std::cell::RefCell;

    const POST: &str = r#"<div data-urn="urn:li:activity:123">
        <div class="feed-shared-text">Hello world</div>
        <button aria-label="5 reactions"></button>
        <a href="https://x.com/feed/update/123">permalink</a>
    </div>"#;

    /// Records every request and answers with a fixed reply
    struct RecordingMessenger {
        reply: Result<Option<Response>, SaverError>,
        sent: RefCell<Vec<Request>>,
    }

    impl RecordingMessenger {
        fn answering(reply: Result<Option<Response>, SaverError>) -> Self {
            RecordingMessenger {
                reply,
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl Messenger for RecordingMessenger {
        async fn send(&self, request: &Request) -> Result<Option<Response>, SaverError> {
            self.sent.borrow_mut().push(request.clone());
            self.reply.clone()
        }
    }

    fn profile() -> SelectorProfile {
        ExtensionConfig::load().unwrap().profile
    }

    fn ready_session() -> Session {
        Session {
            access_token: Some("tok".to_string()),
            selected_sheet: Some(SelectedSheet {
                id: "s1".to_string(),
                name: "Posts".to_string(),
            }),
        }
    }

    #[test]
    fn test_state_labels_and_delays() {
        let timing = Timing::default();

        assert_eq!(ControlState::Idle.label(), "Save to Sheet");
        assert!(!ControlState::Idle.is_disabled());
        assert!(ControlState::Busy.is_disabled());
        assert_eq!(ControlState::Saved.revert_after(&timing), Some(2000));
        assert_eq!(ControlState::Failed.revert_after(&timing), Some(3000));
        assert_eq!(ControlState::Busy.revert_after(&timing), None);
    }

    #[test]
    fn test_one_action_in_flight() {
        let mut control = ActionControl::new();

        assert!(control.begin());
        assert!(!control.begin());

        assert_eq!(control.finish::<()>(&Err(SaverError::RateLimited)), ControlState::Failed);
        assert!(!control.begin());

        control.revert();
        assert_eq!(control.state(), ControlState::Idle);
        assert!(control.begin());
    }

    #[test]
    fn test_revert_ignored_while_busy() {
        let mut control = ActionControl::new();
        control.begin();
        control.revert();
        assert_eq!(control.state(), ControlState::Busy);
    }

    #[test]
    fn test_precondition_order() {
        assert_eq!(
            check_preconditions(false, &ready_session()),
            Err(SaverError::ContextInvalidated)
        );
        assert_eq!(check_preconditions(true, &Session::default()), Err(SaverError::MissingToken));

        let no_sheet = Session {
            selected_sheet: None,
            ..ready_session()
        };
        assert_eq!(check_preconditions(true, &no_sheet), Err(SaverError::MissingSheet));
        assert_eq!(check_preconditions(true, &ready_session()).unwrap().name, "Posts");
    }

    #[test]
    fn test_missing_sheet_sends_nothing() {
        let page = FixturePage::parse(POST);
        let unit = page.select_one("[data-urn]").unwrap();
        let store = MemoryStore::with_session(Session {
            selected_sheet: None,
            ..ready_session()
        });
        let messenger = RecordingMessenger::answering(Ok(Some(Response::ok())));

        let result = block_on(save_post(&unit, &profile(), true, &store, &messenger, "t".to_string()));

        assert_eq!(result, Err(SaverError::MissingSheet));
        assert!(messenger.sent.borrow().is_empty());
    }

    #[test]
    fn test_invalid_runtime_sends_nothing() {
        let page = FixturePage::parse(POST);
        let unit = page.select_one("[data-urn]").unwrap();
        let store = MemoryStore::with_session(ready_session());
        let messenger = RecordingMessenger::answering(Ok(Some(Response::ok())));

        let result = block_on(save_post(&unit, &profile(), false, &store, &messenger, "t".to_string()));

        assert_eq!(result, Err(SaverError::ContextInvalidated));
        assert!(messenger.sent.borrow().is_empty());
    }

    #[test]
    fn test_save_sends_extracted_record() {
        let page = FixturePage::parse(POST);
        let unit = page.select_one("[data-urn]").unwrap();
        let store = MemoryStore::with_session(ready_session());
        let messenger = RecordingMessenger::answering(Ok(Some(Response::ok())));

        let result = block_on(save_post(&unit, &profile(), true, &store, &messenger, "t".to_string()));

        assert_eq!(result, Ok(Response::ok()));
        let sent = messenger.sent.borrow();
        match &sent[0] {
            Request::SaveToSheet(record) => {
                assert_eq!(record.content, "Hello world");
                assert_eq!(record.likes, 5);
                assert_eq!(record.url, "https://x.com/feed/update/123");
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_empty_post_is_extraction_failure() {
        let page = FixturePage::parse(r#"<div data-urn="urn:li:activity:1"><p>nothing</p></div>"#);
        let unit = page.select_one("[data-urn]").unwrap();
        let store = MemoryStore::with_session(ready_session());
        let messenger = RecordingMessenger::answering(Ok(Some(Response::ok())));

        let result = block_on(save_post(&unit, &profile(), true, &store, &messenger, "t".to_string()));

        assert_eq!(result, Err(SaverError::ExtractionFailed));
        assert!(messenger.sent.borrow().is_empty());
    }

    #[test]
    fn test_missing_reply_is_no_response() {
        let page = FixturePage::parse(POST);
        let unit = page.select_one("[data-urn]").unwrap();
        let store = MemoryStore::with_session(ready_session());
        let messenger = RecordingMessenger::answering(Ok(None));

        let result = block_on(save_post(&unit, &profile(), true, &store, &messenger, "t".to_string()));

        assert_eq!(result, Err(SaverError::NoResponse));
    }

    #[test]
    fn test_failed_reply_carries_error() {
        let page = FixturePage::parse(POST);
        let unit = page.select_one("[data-urn]").unwrap();
        let store = MemoryStore::with_session(ready_session());
        let messenger = RecordingMessenger::answering(Ok(Some(Response::failed(SaverError::AuthExpired))));

        let result = block_on(save_post(&unit, &profile(), true, &store, &messenger, "t".to_string()));

        assert_eq!(result, Err(SaverError::AuthExpired));
    }
}
