use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email already registered")]
    Duplicate,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// User persistence. `insert` must reject a duplicate email atomically.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn insert(&self, user: NewUser) -> Result<User, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    /// Find a user by (normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_active, is_admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| anyhow::Error::new(e).context("select user by email"))?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, is_active, is_admin, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| anyhow::Error::new(e).context("select user by id"))?;
        Ok(user)
    }

    /// Relies on the unique index on `users.email`; no pre-check.
    async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, is_active, is_admin, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await;

        match row {
            Ok(u) => Ok(u),
            Err(e) if is_unique_violation(&e) => Err(RepoError::Duplicate),
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;

    /// Map-backed store; the duplicate check and the insert share one lock.
    #[derive(Default)]
    pub struct InMemoryUserRepository {
        users: Mutex<HashMap<String, User>>,
    }

    impl InMemoryUserRepository {
        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }

        pub fn get(&self, email: &str) -> Option<User> {
            self.users.lock().unwrap().get(email).cloned()
        }

        pub fn remove(&self, email: &str) -> Option<User> {
            self.users.lock().unwrap().remove(email)
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
            Ok(self.get(email))
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn insert(&self, user: NewUser) -> Result<User, RepoError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&user.email) {
                return Err(RepoError::Duplicate);
            }
            let stored = User {
                id: Uuid::new_v4(),
                email: user.email.clone(),
                password_hash: user.password_hash,
                is_active: true,
                is_admin: false,
                created_at: OffsetDateTime::now_utc(),
            };
            users.insert(user.email, stored.clone());
            Ok(stored)
        }
    }
}
