/// Background worker: answers requests from the content script and popup
use crate::config::OAuthConfig;
use crate::gateway::http::Transport;
use crate::gateway::oauth::{IdentityFlow, authenticate};
use crate::gateway::sheets::SheetsGateway;
use crate::protocol::{Request, Response};
use crate::storage::SettingsStore;

pub struct BackgroundService<T, S, F> {
    gateway: SheetsGateway<T, S>,
    identity: F,
    oauth: OAuthConfig,
}

impl<T, S, F> BackgroundService<T, S, F>
where
    T: Transport,
    S: SettingsStore,
    F: IdentityFlow,
{
    pub fn new(gateway: SheetsGateway<T, S>, identity: F, oauth: OAuthConfig) -> Self {
        BackgroundService {
            gateway,
            identity,
            oauth,
        }
    }

    pub fn gateway(&self) -> &SheetsGateway<T, S> {
        &self.gateway
    }

    /// Entry point for raw messages; anything unparseable is an unknown action
    pub async fn handle_message(&self, message: serde_json::Value) -> Response {
        match Request::from_json_value(message) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                log::error!("Unknown action: {}", e);
                Response::unknown_action()
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        let action = request.action();
        log::info!("Background received: {}", action);

        let result = match request {
            Request::Authenticate => authenticate(&self.identity, self.gateway.store(), &self.oauth)
                .await
                .map(Response::authenticated),
            Request::GetSheets => self.gateway.list_sheets().await.map(Response::with_sheets),
            Request::SaveToSheet(record) => self.gateway.save_record(&record).await.map(|()| Response::ok()),
        };

        match &result {
            Ok(_) => log::info!("{} succeeded", action),
            Err(e) => log::error!("{} failed: {}", action, e),
        }

        Response::from(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionConfig;
    use crate::error::SaverError;
    use crate::gateway::http::FakeTransport;
    use crate::storage::{MemoryStore, SelectedSheet, Session};
    use futures::executor::block_on;
    use serde_json::json;

    /// Sign-in that always approves with the given token
    struct ApprovingFlow(&'static str);

    impl IdentityFlow for ApprovingFlow {
        async fn launch(&self, url: &str) -> Result<String, SaverError> {
            let state = url::Url::parse(url)
                .unwrap()
                .query_pairs()
                .find(|(key, _)| key == "state")
                .map(|(_, value)| value.into_owned())
                .unwrap();
            Ok(format!("https://ext.chromiumapp.org/#access_token={}&state={}", self.0, state))
        }
    }

    fn service(
        transport: FakeTransport,
        session: Session,
    ) -> BackgroundService<FakeTransport, MemoryStore, ApprovingFlow> {
        let config = ExtensionConfig::load().unwrap();
        BackgroundService::new(
            SheetsGateway::new(transport, MemoryStore::with_session(session), config.sheets),
            ApprovingFlow("granted"),
            config.oauth,
        )
    }

    #[test]
    fn test_authenticate_message() {
        let service = service(FakeTransport::new(), Session::default());

        let response = block_on(service.handle_message(json!({"action": "authenticate"})));

        assert!(response.success);
        assert_eq!(response.token.as_deref(), Some("granted"));
        assert_eq!(
            service.gateway().store().snapshot().access_token.as_deref(),
            Some("granted")
        );
    }

    #[test]
    fn test_get_sheets_message() {
        let transport = FakeTransport::new().respond(200, r#"{"files": [{"id": "a", "name": "Leads"}]}"#);
        let session = Session {
            access_token: Some("tok".to_string()),
            selected_sheet: None,
        };
        let service = service(transport, session);

        let response = block_on(service.handle_message(json!({"action": "getSheets"})));

        assert!(response.success);
        assert_eq!(response.sheets.unwrap()[0].name, "Leads");
    }

    #[test]
    fn test_save_message_without_token() {
        let service = service(FakeTransport::new(), Session::default());
        let message = json!({
            "action": "saveToSheet",
            "data": {"timestamp": "t", "content": "c", "likes": 0, "comments": 0, "reposts": 0, "url": ""}
        });

        let response = block_on(service.handle_message(message));

        assert!(!response.success);
        assert_eq!(response.failure, Some(SaverError::MissingToken));
        assert!(service.gateway().transport().requests().is_empty());
    }

    #[test]
    fn test_save_message_success() {
        let transport = FakeTransport::new()
            .respond(200, r#"{"sheets": [{"properties": {"title": "Sheet1"}}]}"#)
            .respond(200, r#"{"values": [["Timestamp", "Content", "Likes", "Comments", "Reposts", "URL"]]}"#)
            .respond(200, "{}");
        let session = Session {
            access_token: Some("tok".to_string()),
            selected_sheet: Some(SelectedSheet {
                id: "s".to_string(),
                name: "Posts".to_string(),
            }),
        };
        let service = service(transport, session);
        let message = json!({
            "action": "saveToSheet",
            "data": {"timestamp": "t", "content": "Hello", "likes": 1, "comments": 0, "reposts": 0, "url": ""}
        });

        let response = block_on(service.handle_message(message));

        assert_eq!(response, Response::ok());
    }

    #[test]
    fn test_unknown_message() {
        let service = service(FakeTransport::new(), Session::default());

        let response = block_on(service.handle_message(json!({"action": "launchRockets"})));

        assert_eq!(response, Response::unknown_action());
    }
}
