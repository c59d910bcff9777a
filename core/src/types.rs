use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::ApiError;
use crate::token::parse_timestamp;
use tracing::warn;

/// The two independent authentication domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Admin,
    Tourist,
}

/// Storage keys owned by one session kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageKeys {
    pub token: &'static str,
    pub principal: &'static str,
    pub expires_at: &'static str,
}

impl SessionKind {
    pub const ALL: [SessionKind; 2] = [SessionKind::Admin, SessionKind::Tourist];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Admin => "admin",
            SessionKind::Tourist => "tourist",
        }
    }

    pub fn storage_keys(&self) -> StorageKeys {
        match self {
            SessionKind::Admin => StorageKeys {
                token: "admin_session",
                principal: "admin_user",
                expires_at: "admin_expires_at",
            },
            SessionKind::Tourist => StorageKeys {
                token: "tourist_session",
                principal: "tourist_user",
                expires_at: "tourist_expires_at",
            },
        }
    }

    /// Identifier of the screen a forced logout sends the user to.
    pub fn login_surface(&self) -> &'static str {
        match self {
            SessionKind::Admin => "admin.login",
            SessionKind::Tourist => "tourist.login",
        }
    }

    /// Name of the credential field the login endpoint expects.
    fn identifier_field(&self) -> &'static str {
        match self {
            SessionKind::Admin => "username",
            SessionKind::Tourist => "email",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(SessionKind::Admin),
            "tourist" => Ok(SessionKind::Tourist),
            other => Err(ApiError::Config(format!("Unknown session kind: {}", other))),
        }
    }
}

/// The authenticated identity behind a session.
///
/// Fields the server sends beyond the common ones are kept in `extra` so the
/// record survives a store round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Principal {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            username: None,
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Email for tourists, username for admins, whichever is present.
    pub fn handle(&self) -> Option<&str> {
        self.email.as_deref().or(self.username.as_deref())
    }
}

/// An authenticated session for one kind.
///
/// A value of this type always has a non-empty token and a principal; the
/// absence of a session is `Option::<Session>::None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    kind: SessionKind,
    token: String,
    principal: Principal,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        kind: SessionKind,
        token: impl Into<String>,
        principal: Principal,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ApiError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ApiError::Parsing(format!(
                "Refusing to build a {} session with an empty token",
                kind
            )));
        }
        Ok(Self {
            kind,
            token,
            principal,
            expires_at,
        })
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Replace the principal, e.g. after a profile refresh.
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Login credentials. The identifier is a username for admins and an email
/// for tourists.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }

    /// JSON body for the login endpoint of `kind`.
    pub fn to_body(&self, kind: SessionKind) -> Value {
        let mut body = Map::new();
        body.insert(
            kind.identifier_field().to_string(),
            json!(self.identifier),
        );
        body.insert("password".to_string(), json!(self.password));
        Value::Object(body)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a successful login response.
///
/// `token` is the only accepted name for the bearer token. The principal is
/// accepted under the names the admin and tourist endpoints use, the first
/// one that holds a readable principal wins. An `expires_at` in a format
/// [`parse_timestamp`] does not know is dropped with a warning.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawLoginResponse")]
pub struct LoginResponse {
    pub token: Option<String>,
    pub principal: Option<Principal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct RawLoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    principal: Option<Value>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default)]
    admin: Option<Value>,
    #[serde(default)]
    tourist: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    expires_at: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

impl From<RawLoginResponse> for LoginResponse {
    fn from(raw: RawLoginResponse) -> Self {
        let principal = [raw.principal, raw.user, raw.admin, raw.tourist, raw.data]
            .into_iter()
            .flatten()
            .find_map(|value| serde_json::from_value::<Principal>(value).ok());

        let expires_at = match raw.expires_at {
            None | Some(Value::Null) => None,
            Some(value) => {
                let parsed = parse_timestamp(&value);
                if parsed.is_none() {
                    warn!(expires_at = %value, "Ignoring unreadable expiry in login response");
                }
                parsed
            }
        };

        Self {
            token: raw.token,
            principal,
            expires_at,
            message: raw.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_storage_keys_are_disjoint() {
        let admin = SessionKind::Admin.storage_keys();
        let tourist = SessionKind::Tourist.storage_keys();

        let admin_keys = [admin.token, admin.principal, admin.expires_at];
        for key in [tourist.token, tourist.principal, tourist.expires_at] {
            assert!(!admin_keys.contains(&key));
        }
        assert_eq!(admin.token, "admin_session");
        assert_eq!(admin.principal, "admin_user");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("admin".parse::<SessionKind>().unwrap(), SessionKind::Admin);
        assert_eq!(" Tourist ".parse::<SessionKind>().unwrap(), SessionKind::Tourist);
        assert!("guest".parse::<SessionKind>().is_err());
    }

    #[test]
    fn test_session_rejects_empty_token() {
        let principal = Principal::new(1, "Root");
        assert!(Session::new(SessionKind::Admin, "", principal.clone(), None).is_err());
        assert!(Session::new(SessionKind::Admin, "   ", principal.clone(), None).is_err());
        assert!(Session::new(SessionKind::Admin, "A1", principal, None).is_ok());
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let principal = Principal::new(7, "Ana");
        let session = Session::new(
            SessionKind::Tourist,
            "T1",
            principal.clone(),
            Some(now - chrono::Duration::seconds(1)),
        )
        .unwrap();
        assert!(session.is_expired_at(now));

        let open_ended = Session::new(SessionKind::Tourist, "T1", principal, None).unwrap();
        assert!(!open_ended.is_expired());
    }

    #[test]
    fn test_credentials_body_per_kind() {
        let creds = Credentials::new("root", "secret");
        assert_eq!(
            creds.to_body(SessionKind::Admin),
            json!({"username": "root", "password": "secret"})
        );
        assert_eq!(
            creds.to_body(SessionKind::Tourist),
            json!({"email": "root", "password": "secret"})
        );
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_principal_keeps_unknown_fields() {
        let raw = json!({
            "id": 3,
            "name": "Budi",
            "email": "budi@example.com",
            "nationality": "ID",
            "phone": "+62 812"
        });
        let principal: Principal = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(principal.handle(), Some("budi@example.com"));
        assert_eq!(principal.extra["nationality"], "ID");
        assert_eq!(serde_json::to_value(&principal).unwrap(), raw);
    }

    #[test]
    fn test_login_response_accepts_principal_aliases() {
        let admin: LoginResponse = serde_json::from_value(json!({
            "success": true,
            "token": "A1",
            "admin": {"id": 1, "name": "Root", "username": "root"}
        }))
        .unwrap();
        assert_eq!(admin.token.as_deref(), Some("A1"));
        assert_eq!(admin.principal.unwrap().username.as_deref(), Some("root"));

        let tourist: LoginResponse = serde_json::from_value(json!({
            "success": true,
            "token": "T1",
            "user": {"id": 9, "name": "Ana", "email": "ana@example.com"},
            "expires_at": "2030-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(tourist.expires_at.is_some());
        assert_eq!(tourist.principal.unwrap().id, 9);
    }

    #[test]
    fn test_login_response_reads_common_expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
        for raw in [
            json!("2031-01-01T00:00:00Z"),
            json!("2031-01-01T07:00:00+07:00"),
            json!("2031-01-01 00:00:00"),
            json!(expected.timestamp()),
        ] {
            let response: LoginResponse = serde_json::from_value(json!({
                "token": "T1",
                "user": {"id": 9, "name": "Ana"},
                "expires_at": raw
            }))
            .unwrap();
            assert_eq!(response.expires_at, Some(expected), "expires_at = {}", raw);
        }
    }

    #[test]
    fn test_login_response_drops_unreadable_expiry() {
        let response: LoginResponse = serde_json::from_value(json!({
            "token": "T1",
            "user": {"id": 9, "name": "Ana"},
            "expires_at": "next tuesday"
        }))
        .unwrap();
        assert_eq!(response.token.as_deref(), Some("T1"));
        assert!(response.principal.is_some());
        assert_eq!(response.expires_at, None);
    }

    #[test]
    fn test_login_response_with_two_principal_names() {
        let response: LoginResponse = serde_json::from_value(json!({
            "token": "T1",
            "data": {"token": "T1"},
            "user": {"id": 9, "name": "Ana", "email": "ana@example.com"}
        }))
        .unwrap();
        assert_eq!(response.principal.unwrap().id, 9);
    }
}
