use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

/// Default identity-provider endpoints (Discord).
pub const DEFAULT_AUTH_URL: &str = "https://discord.com/oauth2/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
pub const DEFAULT_IDENTITY_URL: &str = "https://discord.com/api/oauth2/@me";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("anteroom")
        .about("Access-control front-end gating a shared server behind third-party identity login")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("ANTEROOM_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("public-url")
                .long("public-url")
                .help("Public base URL of this service, example: https://panel.example.com")
                .env("ANTEROOM_PUBLIC_URL")
                .required(true),
        )
        .arg(
            Arg::new("client-id")
                .long("client-id")
                .help("OAuth2 client id registered with the identity provider")
                .env("ANTEROOM_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("client-secret")
                .long("client-secret")
                .help("OAuth2 client secret")
                .env("ANTEROOM_CLIENT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("auth-url")
                .long("auth-url")
                .help("Identity-provider authorization endpoint")
                .default_value(DEFAULT_AUTH_URL)
                .env("ANTEROOM_AUTH_URL"),
        )
        .arg(
            Arg::new("token-url")
                .long("token-url")
                .help("Identity-provider token endpoint")
                .default_value(DEFAULT_TOKEN_URL)
                .env("ANTEROOM_TOKEN_URL"),
        )
        .arg(
            Arg::new("identity-url")
                .long("identity-url")
                .help("Identity-provider identity endpoint")
                .default_value(DEFAULT_IDENTITY_URL)
                .env("ANTEROOM_IDENTITY_URL"),
        )
        .arg(
            Arg::new("ring-capacity")
                .long("ring-capacity")
                .help("Replay window size, must exceed 30s of peak login issuance")
                .default_value("65536")
                .env("ANTEROOM_RING_CAPACITY")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("secrets")
                .short('s')
                .long("secrets")
                .help("Path to the secrets file, generated on first run")
                .default_value("anteroom-secrets.json")
                .env("ANTEROOM_SECRETS"),
        )
        .arg(
            Arg::new("insecure-cookie")
                .long("insecure-cookie")
                .help("Drop the Secure cookie attribute, for plain-HTTP development only")
                .env("ANTEROOM_INSECURE_COOKIE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("ANTEROOM_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
