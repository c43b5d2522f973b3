use crate::cli::actions::{server, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .with_context(|| format!("missing required argument: --{name}"))
    };

    Ok(Action::Server(server::Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        public_url: required("public-url")?,
        client_id: required("client-id")?,
        client_secret: SecretString::from(required("client-secret")?),
        auth_url: required("auth-url")?,
        token_url: required("token-url")?,
        identity_url: required("identity-url")?,
        ring_capacity: matches
            .get_one::<u64>("ring-capacity")
            .copied()
            .unwrap_or(crate::onetime::DEFAULT_RING_CAPACITY),
        secrets_path: PathBuf::from(required("secrets")?),
        insecure_cookie: matches.get_flag("insecure-cookie"),
    }))
}
