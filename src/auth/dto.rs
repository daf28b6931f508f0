use serde::Serialize;
use serde_json::Value;

use crate::auth::repo_types::User;
use crate::error::FieldErrors;

const NOT_A_STRING: &str = "Not a valid string.";

/// Key used for errors that belong to the body as a whole.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Reads an optional string member; `Err` when it is present with another type.
fn string_field(body: &Value, name: &str) -> Result<Option<String>, ()> {
    match body.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(()),
    }
}

/// Request body for user registration. Any other member of the body,
/// `is_admin` included, is ignored.
#[derive(Debug, Default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn from_json(body: &Value) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        if !body.is_object() {
            errors.insert(
                NON_FIELD_ERRORS,
                vec!["Invalid data. Expected a dictionary.".into()],
            );
            return Err(errors);
        }

        let mut read = |name: &'static str| {
            string_field(body, name).unwrap_or_else(|()| {
                errors.entry(name).or_default().push(NOT_A_STRING.into());
                None
            })
        };
        let req = Self {
            email: read("email"),
            password: read("password"),
        };

        if errors.is_empty() {
            Ok(req)
        } else {
            Err(errors)
        }
    }
}

/// Request body for login. Members of the wrong type count as absent.
#[derive(Debug, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn from_json(body: &Value) -> Self {
        Self {
            email: string_field(body, "email").ok().flatten(),
            password: string_field(body, "password").ok().flatten(),
        }
    }
}

/// Request body for token refresh.
#[derive(Debug, Default)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

impl RefreshRequest {
    pub fn from_json(body: &Value) -> Self {
        Self {
            refresh: string_field(body, "refresh").ok().flatten(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub access: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            is_active: user.is_active,
            is_admin: user.is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn register_request_ignores_privileged_fields() {
        let req = RegisterRequest::from_json(&json!({
            "email": "a@x.com",
            "password": "secret123",
            "is_admin": true,
            "is_active": false
        }))
        .expect("parse");
        assert_eq!(req.email.as_deref(), Some("a@x.com"));
        assert_eq!(req.password.as_deref(), Some("secret123"));
    }

    #[test]
    fn register_request_reports_wrongly_typed_fields() {
        let errors = RegisterRequest::from_json(&json!({ "email": 5, "password": ["x"] }))
            .unwrap_err();
        assert_eq!(errors["email"], vec![NOT_A_STRING.to_string()]);
        assert_eq!(errors["password"], vec![NOT_A_STRING.to_string()]);
    }

    #[test]
    fn register_request_rejects_non_object_bodies() {
        let errors = RegisterRequest::from_json(&json!(["a@x.com"])).unwrap_err();
        assert!(errors.contains_key(NON_FIELD_ERRORS));
    }

    #[test]
    fn null_members_read_as_missing() {
        let req = RegisterRequest::from_json(&json!({ "email": null })).expect("parse");
        assert!(req.email.is_none());
        assert!(req.password.is_none());
    }

    #[test]
    fn login_request_treats_wrong_types_as_missing() {
        let req = LoginRequest::from_json(&json!({ "email": 5, "password": "secret123" }));
        assert!(req.email.is_none());
        assert_eq!(req.password.as_deref(), Some("secret123"));

        let req = LoginRequest::from_json(&json!({}));
        assert!(req.email.is_none());
        assert!(req.password.is_none());
    }

    #[test]
    fn public_user_never_carries_the_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$v=19$secret-material".into(),
            is_active: true,
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).expect("serialize");
        assert!(json.contains("test@example.com"));
        assert!(json.contains("is_active"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
