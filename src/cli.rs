//! CLI argument parsing, validation, and startup helpers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::ServerConfig;
use crate::db::{Database, UserRole};
use crate::jwt::{SigningAlgorithm, TokenCodec, TokenLifetimes};
use crate::keys::{DirectoryKeyProvider, KeyProvider, StaticKeyProvider};
use crate::lookup::UnconfiguredLookup;
use crate::session::{SessionConfig, SessionError, SessionService};
use clap::Parser;
use tracing::{error, info};

/// Environment variables holding base64 encoded PEM keys.
pub const ACCESS_PRIVATE_KEY_VAR: &str = "ACCESS_TOKEN_PRIVATE_KEY";
pub const ACCESS_PUBLIC_KEY_VAR: &str = "ACCESS_TOKEN_PUBLIC_KEY";
pub const REFRESH_PRIVATE_KEY_VAR: &str = "REFRESH_TOKEN_PRIVATE_KEY";
pub const REFRESH_PUBLIC_KEY_VAR: &str = "REFRESH_TOKEN_PUBLIC_KEY";

pub const ADMIN_PASSWORD_VAR: &str = "ADMIN_PASSWORD";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "msisdn-auth",
    about = "MSISDN lookup service with token based sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "msisdn-auth.db")]
    pub database: String,

    /// Set the Secure flag on cookies (use when served over HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Directory with access_{private,public}.pem and refresh_{private,public}.pem.
    /// Used when the *_TOKEN_*_KEY environment variables are not set
    #[arg(long)]
    pub key_dir: Option<String>,

    /// Signature algorithm of the key pairs
    #[arg(long, value_enum, default_value = "eddsa")]
    pub key_algorithm: SigningAlgorithm,

    /// Refresh token lifetime in hours
    #[arg(long, default_value = "12", value_parser = clap::value_parser!(u64).range(12..=24))]
    pub refresh_token_hours: u64,

    /// Timeout for credential store and key provider calls, in milliseconds
    #[arg(long, default_value = "5000", value_parser = clap::value_parser!(u64).range(1..))]
    pub store_timeout_ms: u64,

    /// bcrypt cost for new password hashes
    #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(4..=31))]
    pub password_cost: u32,

    /// Register this admin account on startup if it does not exist.
    /// The password is read from the ADMIN_PASSWORD environment variable
    #[arg(long, env = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            store_timeout: self.store_timeout(),
            password_cost: self.password_cost,
        }
    }
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read an environment variable and remove it so it does not leak into
/// child processes or diagnostics.
fn take_env(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    // SAFETY: called during startup before the runtime spawns any task that
    // reads the environment.
    unsafe { std::env::remove_var(name) };
    Some(value)
}

/// Pick the key source: the four key environment variables if set,
/// otherwise the key directory.
/// Returns None and logs an error if no usable source is configured.
pub fn load_key_provider(key_dir: Option<&str>) -> Option<Box<dyn KeyProvider>> {
    let vars = [
        ACCESS_PRIVATE_KEY_VAR,
        ACCESS_PUBLIC_KEY_VAR,
        REFRESH_PRIVATE_KEY_VAR,
        REFRESH_PUBLIC_KEY_VAR,
    ];
    let values: Vec<Option<String>> = vars.iter().map(|name| take_env(name)).collect();

    match values.as_slice() {
        [Some(access_private), Some(access_public), Some(refresh_private), Some(refresh_public)] => {
            match StaticKeyProvider::from_base64(
                access_private,
                access_public,
                refresh_private,
                refresh_public,
            ) {
                Ok(provider) => {
                    info!("Using signing keys from environment");
                    Some(Box::new(provider))
                }
                Err(e) => {
                    error!(error = %e, "Invalid signing key in environment");
                    None
                }
            }
        }
        [None, None, None, None] => match key_dir {
            Some(dir) => {
                if !Path::new(dir).is_dir() {
                    error!(path = %dir, "Key directory does not exist");
                    return None;
                }
                info!(path = %dir, "Using signing keys from directory");
                Some(Box::new(DirectoryKeyProvider::new(dir)))
            }
            None => {
                error!(
                    "Signing keys are required. Set the {} / {} / {} / {} environment variables (base64 PEM) or use --key-dir",
                    ACCESS_PRIVATE_KEY_VAR,
                    ACCESS_PUBLIC_KEY_VAR,
                    REFRESH_PRIVATE_KEY_VAR,
                    REFRESH_PUBLIC_KEY_VAR
                );
                None
            }
        },
        _ => {
            let missing: Vec<&str> = vars
                .iter()
                .zip(&values)
                .filter(|(_, value)| value.is_none())
                .map(|(name, _)| *name)
                .collect();
            error!(missing = ?missing, "Only some signing key environment variables are set");
            None
        }
    }
}

/// Fetch the keys and build the token codec.
/// Returns None and logs an error if the keys are unusable.
pub async fn load_codec(
    provider: &dyn KeyProvider,
    algorithm: SigningAlgorithm,
    refresh_token_hours: u64,
    timeout: Duration,
) -> Option<Arc<TokenCodec>> {
    let lifetimes = TokenLifetimes::with_refresh_secs(refresh_token_hours * 60 * 60);

    match TokenCodec::load(provider, algorithm, lifetimes, timeout).await {
        Ok(codec) => {
            info!(algorithm = ?algorithm, refresh_token_hours, "Signing keys loaded");
            Some(Arc::new(codec))
        }
        Err(e) => {
            error!(error = %e, "Failed to load signing keys");
            None
        }
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Register the configured admin account if it does not exist yet.
/// Returns false and logs an error if seeding failed.
pub async fn seed_admin(session: &SessionService, username: &str, password: Option<&str>) -> bool {
    let Some(password) = password else {
        error!(
            "{} must be set when an admin username is configured",
            ADMIN_PASSWORD_VAR
        );
        return false;
    };

    match session
        .register_native(username, password, UserRole::Admin)
        .await
    {
        Ok(_) => {
            info!(username = %username, "Admin user created");
            true
        }
        Err(SessionError::UserAlreadyExists) => {
            info!(username = %username, "Admin user already exists");
            true
        }
        Err(e) => {
            error!(username = %username, error = %e, "Failed to create admin user");
            false
        }
    }
}

/// Read the admin password from the environment, removing it afterwards.
pub fn take_admin_password() -> Option<String> {
    take_env(ADMIN_PASSWORD_VAR)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, codec: Arc<TokenCodec>) -> ServerConfig {
    ServerConfig {
        db,
        codec,
        session: args.session_config(),
        secure_cookies: args.secure_cookies,
        lookup: Arc::new(UnconfiguredLookup),
    }
}
