/// Google OAuth implicit grant through the browser's web-auth flow
use crate::config::OAuthConfig;
use crate::error::SaverError;
use crate::storage::SettingsStore;
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

/// Authorize URL plus the `state` value it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub url: String,
    pub state: String,
}

impl AuthRequest {
    pub fn new(config: &OAuthConfig) -> Result<AuthRequest, SaverError> {
        Self::with_state(config, Uuid::new_v4().to_string())
    }

    pub fn with_state(config: &OAuthConfig, state: String) -> Result<AuthRequest, SaverError> {
        let mut url = Url::parse(&config.authorize_endpoint)
            .map_err(|e| SaverError::auth_flow(format!("invalid authorize endpoint: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "token")
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("prompt", "consent");

        Ok(AuthRequest {
            url: url.into(),
            state,
        })
    }
}

/// Pull the access token out of the redirect the provider sent us to.
///
/// The implicit grant puts parameters in the fragment; query parameters are
/// accepted too.
pub fn parse_redirect(redirect_url: &str, expected_state: &str) -> Result<String, SaverError> {
    let url = Url::parse(redirect_url).map_err(|_| SaverError::auth_flow("No redirect URL received"))?;

    let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if let Some(fragment) = url.fragment() {
        params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
    }

    if let Some(error) = params.get("error") {
        return Err(SaverError::auth_flow(error.clone()));
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(SaverError::auth_flow("state mismatch in redirect URL"));
    }

    params
        .remove("access_token")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| SaverError::auth_flow("No access token found in redirect URL"))
}

/// Interactive browser sign-in; resolves to the final redirect URL
#[allow(async_fn_in_trait)]
pub trait IdentityFlow {
    async fn launch(&self, url: &str) -> Result<String, SaverError>;
}

/// Run the interactive flow and persist the token it yields
pub async fn authenticate<F, S>(flow: &F, store: &S, config: &OAuthConfig) -> Result<String, SaverError>
where
    F: IdentityFlow,
    S: SettingsStore,
{
    let request = AuthRequest::new(config)?;
    let redirect = flow.launch(&request.url).await?;
    let token = parse_redirect(&redirect, &request.state)?;

    store.save_token(&token).await?;
    log::info!("Access token obtained and stored");

    Ok(token)
}
