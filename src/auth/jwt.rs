use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::config::JwtConfig;

/// Refresh token plus the access token derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Issues bearer tokens for an authenticated user.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user_id: Uuid) -> anyhow::Result<TokenPair>;
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

fn minutes(value: i64) -> Duration {
    Duration::from_secs((value.max(0) as u64).saturating_mul(60))
}

/// `now + ttl`, or an error when the result is not a representable timestamp.
fn expiry(now: OffsetDateTime, ttl: Duration) -> anyhow::Result<OffsetDateTime> {
    let secs = i64::try_from(ttl.as_secs())?;
    now.checked_add(TimeDuration::seconds(secs))
        .ok_or_else(|| anyhow::anyhow!("token lifetime of {secs}s overflows the clock"))
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: minutes(cfg.ttl_minutes),
            refresh_ttl: minutes(cfg.refresh_ttl_minutes),
        }
    }

    fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        let token = encode(&Header::default(), claims, &self.encoding)?;
        debug!(user_id = %claims.sub, kind = ?claims.kind, jti = %claims.jti, "jwt signed");
        Ok(token)
    }

    fn refresh_claims(&self, user_id: Uuid) -> anyhow::Result<Claims> {
        let now = OffsetDateTime::now_utc();
        let exp = expiry(now, self.refresh_ttl)?;
        Ok(Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            kind: TokenKind::Refresh,
        })
    }

    /// Access claims bound to a refresh token: same subject, never outliving it.
    fn access_claims_from(&self, refresh: &Claims) -> anyhow::Result<Claims> {
        let now = OffsetDateTime::now_utc();
        let exp = expiry(now, self.access_ttl)?;
        Ok(Claims {
            sub: refresh.sub,
            iat: now.unix_timestamp() as usize,
            exp: (exp.unix_timestamp() as usize).min(refresh.exp),
            iss: refresh.iss.clone(),
            aud: refresh.aud.clone(),
            jti: Uuid::new_v4(),
            kind: TokenKind::Access,
        })
    }

    pub fn access_from_refresh(&self, refresh: &Claims) -> anyhow::Result<String> {
        if refresh.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        self.sign(&self.access_claims_from(refresh)?)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            anyhow::bail!("not an access token");
        }
        Ok(claims)
    }
}

impl TokenIssuer for JwtKeys {
    fn issue(&self, user_id: Uuid) -> anyhow::Result<TokenPair> {
        let refresh_claims = self.refresh_claims(user_id)?;
        let refresh = self.sign(&refresh_claims)?;
        let access = self.access_from_refresh(&refresh_claims)?;
        Ok(TokenPair { refresh, access })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn issue_returns_refresh_and_derived_access() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let pair = keys.issue(user_id).expect("issue");
        assert!(!pair.refresh.is_empty());
        assert!(!pair.access.is_empty());
        assert_ne!(pair.refresh, pair.access);

        let refresh = keys.verify_refresh(&pair.refresh).expect("verify refresh");
        let access = keys.verify_access(&pair.access).expect("verify access");
        assert_eq!(refresh.sub, user_id);
        assert_eq!(access.sub, user_id);
        assert_eq!(access.iss, "test-issuer");
        assert_eq!(access.aud, "test-aud");
        assert_ne!(refresh.jti, access.jti);
        assert!(access.exp < refresh.exp);
    }

    #[test]
    fn access_never_outlives_its_refresh_token() {
        let mut keys = make_keys("dev-secret", "iss", "aud");
        keys.access_ttl = Duration::from_secs(60 * 60);
        keys.refresh_ttl = Duration::from_secs(60);
        let pair = keys.issue(Uuid::new_v4()).expect("issue");
        let refresh = keys.verify(&pair.refresh).expect("refresh");
        let access = keys.verify(&pair.access).expect("access");
        assert_eq!(access.exp, refresh.exp);
    }

    #[test]
    fn verify_refresh_rejects_access_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let pair = keys.issue(Uuid::new_v4()).expect("issue");
        let err = keys.verify_refresh(&pair.access).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
    }

    #[test]
    fn verify_access_rejects_refresh_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let pair = keys.issue(Uuid::new_v4()).expect("issue");
        let err = keys.verify_access(&pair.refresh).unwrap_err();
        assert!(err.to_string().contains("not an access token"));
    }

    #[test]
    fn access_cannot_be_derived_from_access_claims() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let pair = keys.issue(Uuid::new_v4()).expect("issue");
        let access = keys.verify(&pair.access).expect("access");
        assert!(keys.access_from_refresh(&access).is_err());
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let pair = good_keys.issue(Uuid::new_v4()).expect("issue");
        assert!(bad_keys.verify(&pair.access).is_err());
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let ours = make_keys("secret-a", "iss", "aud");
        let theirs = make_keys("secret-b", "iss", "aud");
        let pair = theirs.issue(Uuid::new_v4()).expect("issue");
        assert!(ours.verify(&pair.access).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let mut claims = keys.refresh_claims(Uuid::new_v4()).expect("claims");
        let past = (OffsetDateTime::now_utc() - TimeDuration::hours(2)).unix_timestamp() as usize;
        claims.iat = past;
        claims.exp = past + 60;
        let token = keys.sign(&claims).expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn oversized_lifetime_is_an_error_not_a_panic() {
        let mut keys = make_keys("dev-secret", "iss", "aud");
        keys.refresh_ttl = Duration::from_secs(60 * 1_000_000_000_000_000);
        let err = keys.issue(Uuid::new_v4()).unwrap_err();
        assert!(err.to_string().contains("overflows"));

        let huge = JwtKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: i64::MAX,
            refresh_ttl_minutes: i64::MAX,
        });
        assert!(huge.issue(Uuid::new_v4()).is_err());
    }
}
