use crate::api::{self, ApiState};
use crate::cli::actions::Action;
use crate::onetime::OneTime;
use crate::provider::{OAuthExchange, ProviderConfig};
use crate::secrets::{self, Secrets};
use crate::session;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub public_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub auth_url: String,
    pub token_url: String,
    pub identity_url: String,
    pub ring_capacity: u64,
    pub secrets_path: PathBuf,
    pub insecure_cookie: bool,
}

/// Handle the server action
///
/// # Errors
///
/// Returns an error if key material cannot be loaded or generated, the
/// public URL is invalid, or the server fails to start.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server(args) = action;

    let secrets = Secrets::load_or_generate(&args.secrets_path)?;
    let session_key = secrets.session_key()?;

    // Fresh every start; outstanding login handshakes do not survive restarts
    let onetime_key = secrets::random_key()?;

    let public_url = Url::parse(&args.public_url).context("invalid public URL")?;
    let redirect_url = public_url
        .join("redirect")
        .context("invalid public URL")?
        .to_string();

    let provider = OAuthExchange::new(ProviderConfig {
        client_id: args.client_id,
        client_secret: args.client_secret,
        auth_url: args.auth_url,
        token_url: args.token_url,
        identity_url: args.identity_url,
        redirect_url,
    })?;

    let state = Arc::new(ApiState {
        onetime: OneTime::new(onetime_key, args.ring_capacity),
        sessions: session::Issuer::new(session_key),
        provider: Arc::new(provider),
        cookie_secure: !args.insecure_cookie,
    });

    api::new(args.port, state).await
}
