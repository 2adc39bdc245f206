use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::ApiError;

/// Adscope - Google Ads keyword spend audit
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Google Ads API developer token
    #[arg(long, env = "ADSCOPE_DEVELOPER_TOKEN")]
    pub developer_token: Option<String>,

    /// OAuth client id for the installed application
    #[arg(long, env = "ADSCOPE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret for the installed application
    #[arg(long, env = "ADSCOPE_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// Manager (MCC) account id that authorizes access
    #[arg(long, env = "ADSCOPE_LOGIN_CUSTOMER_ID")]
    pub login_customer_id: Option<u64>,

    /// Path to the persisted credential record
    #[arg(long, env = "ADSCOPE_CREDENTIALS_FILE")]
    pub credentials_file: Option<String>,

    /// Base URL of the Google Ads API
    #[arg(
        long,
        env = "ADSCOPE_API_BASE_URL",
        default_value = "https://googleads.googleapis.com"
    )]
    pub api_base_url: String,

    /// OAuth token endpoint
    #[arg(
        long,
        env = "ADSCOPE_TOKEN_URL",
        default_value = "https://oauth2.googleapis.com/token"
    )]
    pub token_url: String,

    /// OAuth authorization endpoint
    #[arg(
        long,
        env = "ADSCOPE_AUTH_URL",
        default_value = "https://accounts.google.com/o/oauth2/auth"
    )]
    pub auth_url: String,

    /// Local port for the OAuth callback listener
    #[arg(long, env = "ADSCOPE_CALLBACK_PORT", default_value = "8080")]
    pub callback_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "30")]
    pub http_connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_request_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Find enabled keywords with spend above a threshold and zero conversions
    Audit {
        /// Minimum accumulated cost (standard currency units) to flag a keyword
        #[arg(long, default_value = "30.0")]
        cost_threshold: f64,

        /// Maximum number of keywords to report
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Account to analyze; prompts interactively when omitted
        #[arg(long)]
        customer_id: Option<u64>,
    },

    /// Generate keyword ideas from seed keywords or a landing page URL
    Ideas {
        /// Seed keyword (repeatable)
        #[arg(long = "seed-keyword")]
        seed_keywords: Vec<String>,

        /// Landing page URL to derive ideas from
        #[arg(long)]
        page_url: Option<String>,

        /// Account to generate ideas under; prompts interactively when omitted
        #[arg(long)]
        customer_id: Option<u64>,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    // Google Ads account-level secrets
    pub developer_token: String,
    pub login_customer_id: u64,

    // OAuth client
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub callback_port: u16,

    // Credential store
    pub credentials_file: PathBuf,

    // Remote API
    pub api_base_url: String,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command), ApiError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let command = args.command.clone();
        let config = Self::from_args(args)?;
        Ok((config, command))
    }

    /// Build and validate a Config from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ApiError> {
        let developer_token = args.developer_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            ApiError::ConfigError(
                "developer token is required (use --developer-token or set ADSCOPE_DEVELOPER_TOKEN)"
                    .to_string(),
            )
        })?;

        let client_id = args.client_id.filter(|c| !c.is_empty()).ok_or_else(|| {
            ApiError::ConfigError(
                "OAuth client id is required (use --client-id or set ADSCOPE_CLIENT_ID)"
                    .to_string(),
            )
        })?;

        let client_secret = args.client_secret.filter(|c| !c.is_empty()).ok_or_else(|| {
            ApiError::ConfigError(
                "OAuth client secret is required (use --client-secret or set ADSCOPE_CLIENT_SECRET)"
                    .to_string(),
            )
        })?;

        let login_customer_id = args.login_customer_id.ok_or_else(|| {
            ApiError::ConfigError(
                "manager account id is required (use --login-customer-id or set ADSCOPE_LOGIN_CUSTOMER_ID)"
                    .to_string(),
            )
        })?;
        if login_customer_id == 0 {
            return Err(ApiError::ConfigError(
                "manager account id must be a positive customer id".to_string(),
            ));
        }

        let credentials_file = match args.credentials_file {
            Some(path) => expand_tilde(&path),
            None => default_credentials_file()?,
        };

        Ok(Config {
            developer_token,
            login_customer_id,
            client_id,
            client_secret,
            auth_url: args.auth_url,
            token_url: args.token_url,
            callback_port: args.callback_port,
            credentials_file,
            api_base_url: args.api_base_url,
            http_connect_timeout: args.http_connect_timeout,
            http_request_timeout: args.http_request_timeout,
            log_level: args.log_level,
        })
    }
}

/// Default credential-store location under the user's config directory
fn default_credentials_file() -> Result<PathBuf, ApiError> {
    let base = dirs::config_dir().ok_or_else(|| {
        ApiError::ConfigError(
            "could not determine a config directory; set ADSCOPE_CREDENTIALS_FILE".to_string(),
        )
    })?;
    Ok(base.join("adscope").join("credentials.json"))
}

/// Expand tilde (~) in file paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
