use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Knobs for the register/login flow.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub password_min_length: usize,
    /// Answer 404 instead of a generic 401 when a login email is unknown.
    pub reveal_unknown_user: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_min_length: 8,
            reveal_unknown_user: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

/// Ten years; longer lifetimes are rejected at startup.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "authkit".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authkit-users".into()),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        if jwt.ttl_minutes <= 0 || jwt.refresh_ttl_minutes <= 0 {
            anyhow::bail!("token lifetimes must be positive");
        }
        if jwt.refresh_ttl_minutes > MAX_TTL_MINUTES {
            anyhow::bail!(
                "JWT_REFRESH_TTL_MINUTES ({}) exceeds the maximum of {} minutes",
                jwt.refresh_ttl_minutes,
                MAX_TTL_MINUTES
            );
        }
        if jwt.ttl_minutes > jwt.refresh_ttl_minutes {
            anyhow::bail!(
                "JWT_TTL_MINUTES ({}) must not exceed JWT_REFRESH_TTL_MINUTES ({})",
                jwt.ttl_minutes,
                jwt.refresh_ttl_minutes
            );
        }

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            password_min_length: parsed_or(
                "AUTH_PASSWORD_MIN_LENGTH",
                defaults.password_min_length,
            ),
            reveal_unknown_user: parsed_or(
                "AUTH_REVEAL_UNKNOWN_USER",
                defaults.reveal_unknown_user,
            ),
        };

        Ok(Self {
            database_url,
            max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            auth,
        })
    }
}
