//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use clap::Parser;
use tracing::{error, info};

const MIN_TOKEN_SECRET_LENGTH: usize = 16;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Authgate",
    about = "Identity credential service with rotating refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "4000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "authgate.db")]
    pub database: String,

    /// Access token lifetime (e.g. "15m", "900s")
    #[arg(long, env = "JWT_ACCESS_EXPIRES", default_value = "15m", value_parser = parse_ttl)]
    pub access_expires: u64,

    /// Refresh token lifetime (e.g. "7d", "168h")
    #[arg(long, env = "JWT_REFRESH_EXPIRES", default_value = "7d", value_parser = parse_ttl)]
    pub refresh_expires: u64,

    /// Allowed cross-origin hosts, comma-separated
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    /// Set the Secure flag on cookies (use behind HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Parse a token lifetime like "15m", "7d", "30s" or plain seconds.
fn parse_ttl(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("lifetime must not be empty".to_string());
    }

    let (value, unit) = match s.chars().last() {
        Some(c) if c.is_ascii_digit() => (s, 1),
        Some('s') => (&s[..s.len() - 1], 1),
        Some('m') => (&s[..s.len() - 1], 60),
        Some('h') => (&s[..s.len() - 1], 60 * 60),
        Some('d') => (&s[..s.len() - 1], 24 * 60 * 60),
        _ => return Err(format!("unknown lifetime unit in: {}", s)),
    };

    let value: u64 = value
        .parse()
        .map_err(|_| format!("invalid lifetime: {}", s))?;
    Ok(value * unit)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the access and refresh token secrets from the environment.
/// Returns None and logs an error if either is missing, too short, or
/// both carry the same value. Identical secrets would make the two token
/// classes interchangeable.
pub fn load_token_secrets() -> Option<(Vec<u8>, Vec<u8>)> {
    let access = load_secret("JWT_ACCESS_SECRET")?;
    let refresh = load_secret("JWT_REFRESH_SECRET")?;

    if access == refresh {
        error!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ. Use two independent secrets");
        return None;
    }

    Some((access, refresh))
}

fn load_secret(var: &str) -> Option<Vec<u8>> {
    let Ok(secret) = std::env::var(var) else {
        error!("{} is required. Set it in the environment", var);
        return None;
    };

    // Clear the environment variable to prevent leaking
    // SAFETY: We're single-threaded at this point during startup,
    // and no other code is reading this environment variable.
    unsafe { std::env::remove_var(var) };

    if secret.len() < MIN_TOKEN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            var, MIN_TOKEN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Split the comma-separated CORS allowlist.
pub fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret,
        refresh_secret,
        access_ttl_secs: args.access_expires,
        refresh_ttl_secs: args.refresh_expires,
        secure_cookies: args.secure_cookies,
        cors_origins: split_origins(&args.cors_origin),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl("15m"), Ok(900));
        assert_eq!(parse_ttl("7d"), Ok(604800));
        assert_eq!(parse_ttl("30s"), Ok(30));
        assert_eq!(parse_ttl("2h"), Ok(7200));
        assert_eq!(parse_ttl("45"), Ok(45));

        assert!(parse_ttl("").is_err());
        assert!(parse_ttl("m").is_err());
        assert!(parse_ttl("15x").is_err());
        assert!(parse_ttl("-5m").is_err());
    }

    #[test]
    fn test_load_token_secrets_rejects_identical_values() {
        // SAFETY: this is the only test touching these variables, and
        // load_token_secrets removes them again after reading.
        unsafe {
            std::env::set_var("JWT_ACCESS_SECRET", "the-shared-secret-value");
            std::env::set_var("JWT_REFRESH_SECRET", "the-shared-secret-value");
        }
        assert!(load_token_secrets().is_none());

        unsafe {
            std::env::set_var("JWT_ACCESS_SECRET", "test-access-secret-key");
            std::env::set_var("JWT_REFRESH_SECRET", "test-refresh-secret-key");
        }
        let (access, refresh) = load_token_secrets().unwrap();
        assert_ne!(access, refresh);
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins("http://a.com, http://b.com"),
            vec!["http://a.com", "http://b.com"]
        );
        assert_eq!(split_origins("http://a.com"), vec!["http://a.com"]);
        assert!(split_origins("").is_empty());
        assert!(split_origins(" , ").is_empty());
    }
}
