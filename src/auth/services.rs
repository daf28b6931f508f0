use std::sync::Arc;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{LoginRequest, PublicUser, RegisterRequest};
use crate::auth::jwt::{JwtKeys, TokenIssuer, TokenPair};
use crate::auth::password::CredentialHasher;
use crate::auth::repo::UserRepository;
use crate::auth::repo_types::NewUser;
use crate::config::AuthConfig;
use crate::error::{AuthError, FieldErrors, RegisterError};

const REQUIRED: &str = "This field is required.";

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Runs a hasher call on the blocking pool; Argon2 is CPU-bound.
async fn off_worker<T, F>(hasher: &Arc<dyn CredentialHasher>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&dyn CredentialHasher) -> T + Send + 'static,
    T: Send + 'static,
{
    let hasher = Arc::clone(hasher);
    tokio::task::spawn_blocking(move || f(hasher.as_ref()))
        .await
        .context("password hashing task failed")
}

/// Non-blank value or `None`.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Collects field errors; on success returns the normalized email and the password.
fn validate_registration<'a>(
    req: &'a RegisterRequest,
    policy: &AuthConfig,
) -> Result<(String, &'a str), FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = match present(req.email.as_deref()) {
        None => {
            errors.entry("email").or_default().push(REQUIRED.into());
            None
        }
        Some(raw) => {
            let email = normalize_email(raw);
            if is_valid_email(&email) {
                Some(email)
            } else {
                errors
                    .entry("email")
                    .or_default()
                    .push("Enter a valid email address.".into());
                None
            }
        }
    };

    let password = match present(req.password.as_deref()) {
        None => {
            errors.entry("password").or_default().push(REQUIRED.into());
            None
        }
        Some(p) if p.chars().count() < policy.password_min_length => {
            errors.entry("password").or_default().push(format!(
                "Ensure this field has at least {} characters.",
                policy.password_min_length
            ));
            None
        }
        Some(p) => Some(p),
    };

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok((email, password)),
        _ => Err(errors),
    }
}

/// Validate, hash and persist a new user. Only email and password are taken
/// from the request; the store decides `is_active` and `is_admin`.
pub async fn register(
    users: &dyn UserRepository,
    hasher: Arc<dyn CredentialHasher>,
    policy: &AuthConfig,
    req: RegisterRequest,
) -> Result<PublicUser, RegisterError> {
    let (email, password) = validate_registration(&req, policy).map_err(|fields| {
        let rejected: Vec<&str> = fields.keys().copied().collect();
        warn!(fields = ?rejected, "registration rejected");
        RegisterError::Validation(fields)
    })?;

    let password = password.to_owned();
    let password_hash = off_worker(&hasher, move |h| h.hash(&password)).await??;

    let user = match users.insert(NewUser { email, password_hash }).await {
        Ok(u) => u,
        Err(e) => {
            let err = RegisterError::from(e);
            if matches!(err, RegisterError::Conflict) {
                warn!("email already registered");
            }
            return Err(err);
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.into())
}

/// Check credentials and issue a token pair.
///
/// Lookup happens before verify since the stored hash is needed; an unknown
/// email still pays for one hash verification. `UserNotFound` is returned
/// as-is, callers decide whether to reveal it.
pub async fn login(
    users: &dyn UserRepository,
    hasher: Arc<dyn CredentialHasher>,
    issuer: &dyn TokenIssuer,
    req: &LoginRequest,
) -> Result<TokenPair, AuthError> {
    let (Some(email), Some(password)) = (
        present(req.email.as_deref()),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        warn!("login without credentials");
        return Err(AuthError::MissingCredentials);
    };
    let email = normalize_email(email);
    let password = password.to_owned();

    let Some(user) = users.find_by_email(&email).await? else {
        off_worker(&hasher, move |h| h.verify_dummy(&password)).await?;
        warn!(email = %email, "login unknown email");
        return Err(AuthError::UserNotFound);
    };

    let stored = user.password_hash.clone();
    let matches = off_worker(&hasher, move |h| h.verify(&password, &stored)).await??;
    if !matches {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let pair = issuer.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(pair)
}

/// New access token for a valid refresh token whose user still exists.
pub async fn refresh_access(
    users: &dyn UserRepository,
    keys: &JwtKeys,
    refresh: Option<&str>,
) -> Result<String, AuthError> {
    let token = present(refresh).ok_or(AuthError::MissingCredentials)?;

    let claims = keys.verify_refresh(token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AuthError::InvalidToken
    })?;

    if users.find_by_id(claims.sub).await?.is_none() {
        warn!(user_id = %claims.sub, "refresh for missing user");
        return Err(AuthError::InvalidToken);
    }

    Ok(keys.access_from_refresh(&claims)?)
}

pub async fn current_user(
    users: &dyn UserRepository,
    user_id: Uuid,
) -> Result<PublicUser, AuthError> {
    match users.find_by_id(user_id).await? {
        Some(user) => Ok(user.into()),
        None => {
            warn!(user_id = %user_id, "token subject not found");
            Err(AuthError::InvalidToken)
        }
    }
}
