//! Credential checks and token issuance.
//!
//! Tokens are HS256 JWTs carrying the user id, display name and effective capability set.
//! The effective set is recomputed on every login and renewal as the grants stored on the
//! user plus the ones currently configured for their email.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind as JwtErrorKind, DecodingKey, EncodingKey, Header, Validation};
use margarita_core::{CapabilitySet, ObjectId, Session};
use margarita_shared::Masked;
use margarita_store::app_config::PrivilegesConfig;
use margarita_store::{normalize_email, PasswordHasher, StoreError, UserRecord, UserRepository};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    #[serde(default)]
    pub capabilities: CapabilitySet,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid registration data: {0}")]
    Validation(&'static str),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email {0} is already registered")]
    DuplicateEmail(Masked<String>),

    #[error("no token in request")]
    MissingToken,

    #[error("token expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(email) => CredentialError::DuplicateEmail(email),
            other => CredentialError::Store(other),
        }
    }
}

impl CredentialError {
    pub fn status(&self) -> StatusCode {
        match self {
            CredentialError::Validation(_)
            | CredentialError::InvalidCredentials
            | CredentialError::DuplicateEmail(_) => StatusCode::BAD_REQUEST,
            CredentialError::MissingToken
            | CredentialError::Expired
            | CredentialError::Malformed(_) => StatusCode::UNAUTHORIZED,
            CredentialError::Signing(_) | CredentialError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CredentialError::Validation(_) => "VALIDATION",
            CredentialError::InvalidCredentials => "INVALID_CREDENTIALS",
            CredentialError::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            CredentialError::MissingToken
            | CredentialError::Expired
            | CredentialError::Malformed(_) => "AUTHENTICATION",
            CredentialError::Signing(_) | CredentialError::Store(_) => "STORAGE",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            CredentialError::Validation(msg) => *msg,
            CredentialError::InvalidCredentials => "Email o contraseña incorrectos",
            CredentialError::DuplicateEmail(_) => "El usuario ya existe",
            CredentialError::MissingToken => "No hay token en la petición",
            CredentialError::Expired => "Tu sesión ha expirado. Por favor, inicia sesión nuevamente.",
            CredentialError::Malformed(_) => "Token no válido",
            CredentialError::Signing(_) | CredentialError::Store(_) => {
                "Por favor hable con el administrador"
            }
        }
    }
}

/// A freshly signed token and the user it was issued to.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub user: UserRecord,
    pub session: Session,
}

#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub expiration_seconds: u64,
}

pub struct CredentialService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: TokenSettings,
    privileges: PrivilegesConfig,
}

impl CredentialService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        tokens: TokenSettings,
        privileges: PrivilegesConfig,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            privileges,
        }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<IssuedToken, CredentialError> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(CredentialError::Validation(
                "Nombre, email y contraseña son requeridos",
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CredentialError::Validation(
                "El password debe de ser de 6 caracteres",
            ));
        }
        if !email.contains('@') {
            return Err(CredentialError::Validation("El email no es válido"));
        }

        let user = UserRecord {
            id: ObjectId::generate(),
            name: name.to_owned(),
            capabilities: self.privileges.capabilities_for(&email),
            password_hash: self.hasher.hash(password).await?,
            email,
        };
        let user = self.users.insert_user(user).await?;
        info!(user_id = %user.id, email = %Masked::<String>::from(user.email.as_str()), "User registered");

        self.issue(user, Utc::now())
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedToken, CredentialError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CredentialError::Validation("Email y contraseña son requeridos"));
        }

        let Some(user) = self.users.find_by_email(email).await? else {
            debug!(email = %Masked::<String>::from(email), "Login for unknown email");
            return Err(CredentialError::InvalidCredentials);
        };
        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(CredentialError::InvalidCredentials);
        }

        self.issue(user, Utc::now())
    }

    /// Checks signature and expiry and resolves the requester.
    pub fn verify_token(&self, token: &str) -> Result<Session, CredentialError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.tokens.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            JwtErrorKind::ExpiredSignature => CredentialError::Expired,
            _ => CredentialError::Malformed(e.to_string()),
        })?;

        let claims = data.claims;
        let user_id =
            ObjectId::parse(&claims.sub).map_err(|e| CredentialError::Malformed(e.to_string()))?;
        Ok(Session {
            user_id,
            name: claims.name,
            capabilities: claims.capabilities,
        })
    }

    pub async fn renew(&self, token: &str) -> Result<IssuedToken, CredentialError> {
        let session = self.verify_token(token)?;
        self.renew_session(&session).await
    }

    /// Re-reads the user so renamed users and changed grants take effect.
    pub async fn renew_session(&self, session: &Session) -> Result<IssuedToken, CredentialError> {
        let user = self
            .users
            .find_by_id(&session.user_id)
            .await?
            .ok_or_else(|| CredentialError::Malformed(format!("user {} no longer exists", session.user_id)))?;

        self.issue(user, Utc::now())
    }

    fn issue(&self, mut user: UserRecord, now: DateTime<Utc>) -> Result<IssuedToken, CredentialError> {
        user.capabilities = user
            .capabilities
            .union(&self.privileges.capabilities_for(&user.email));

        let expires = now + Duration::seconds(self.tokens.expiration_seconds as i64);
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            capabilities: user.capabilities.clone(),
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };
        let token = self.sign(&claims)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            session: user.session(),
            user,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, CredentialError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.tokens.secret.as_bytes()),
        )
        .map_err(|e| CredentialError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use margarita_core::Capability;
    use margarita_store::InMemoryUserRepository;

    fn service(privileges: PrivilegesConfig) -> CredentialService {
        CredentialService::new(
            Arc::new(InMemoryUserRepository::new()),
            PasswordHasher::new(4),
            TokenSettings {
                secret: "unit-test-secret".into(),
                expiration_seconds: 604_800,
            },
            privileges,
        )
    }

    #[tokio::test]
    async fn test_register_then_login_yields_same_user() {
        let svc = service(PrivilegesConfig::default());
        let registered = svc.register("Ana", "Ana@Example.com", "secreto").await.unwrap();
        assert_eq!(registered.user.email, "ana@example.com");

        let logged_in = svc.authenticate("ana@example.com", "secreto").await.unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let session = svc.verify_token(&logged_in.token).unwrap();
        assert_eq!(session.user_id, registered.user.id);
        assert_eq!(session.name, "Ana");
        assert!(session.capabilities.is_empty());
    }

    #[tokio::test]
    async fn test_registration_rules() {
        let svc = service(PrivilegesConfig::default());
        assert!(matches!(
            svc.register("", "a@b.com", "secreto").await,
            Err(CredentialError::Validation(_))
        ));
        assert!(matches!(
            svc.register("Ana", "a@b.com", "corto").await,
            Err(CredentialError::Validation(_))
        ));
        assert!(matches!(
            svc.register("Ana", "sin-arroba", "secreto").await,
            Err(CredentialError::Validation(_))
        ));

        svc.register("Ana", "a@b.com", "secreto").await.unwrap();
        let dup = svc.register("Otra", "A@B.com", "secreto").await.unwrap_err();
        assert!(matches!(dup, CredentialError::DuplicateEmail(_)));
        assert_eq!(dup.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_alike() {
        let svc = service(PrivilegesConfig::default());
        svc.register("Ana", "a@b.com", "secreto").await.unwrap();

        let wrong = svc.authenticate("a@b.com", "otro-pass").await.unwrap_err();
        let unknown = svc.authenticate("x@b.com", "secreto").await.unwrap_err();
        assert_eq!(wrong.user_message(), unknown.user_message());
        assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_configured_privileges_reach_the_token() {
        let svc = service(PrivilegesConfig {
            non_sharable: vec!["jp@example.com".into()],
            admin_events: vec![],
        });
        let issued = svc.register("JP", "jp@example.com", "secreto").await.unwrap();
        let session = svc.verify_token(&issued.token).unwrap();
        assert!(session.can(Capability::CanCreateNonSharable));
        assert!(!session.can(Capability::CanCreateAdminEvents));
    }

    #[tokio::test]
    async fn test_renew_reissues_for_existing_user_only() {
        let svc = service(PrivilegesConfig::default());
        let issued = svc.register("Ana", "a@b.com", "secreto").await.unwrap();
        let renewed = svc.renew(&issued.token).await.unwrap();
        assert_eq!(renewed.user.id, issued.user.id);

        let ghost = Session::new(ObjectId::generate(), "Nadie");
        assert!(matches!(
            svc.renew_session(&ghost).await,
            Err(CredentialError::Malformed(_))
        ));
    }

    #[test]
    fn test_expired_and_forged_tokens_are_rejected() {
        let svc = service(PrivilegesConfig::default());
        let past = Utc::now() - Duration::days(8);
        let claims = Claims {
            sub: ObjectId::generate().to_string(),
            name: "Ana".into(),
            capabilities: CapabilitySet::new(),
            iat: past.timestamp() as usize,
            exp: (past + Duration::days(7)).timestamp() as usize,
        };
        let expired = svc.sign(&claims).unwrap();
        assert!(matches!(svc.verify_token(&expired), Err(CredentialError::Expired)));

        let other = service(PrivilegesConfig::default());
        let forged = CredentialService {
            tokens: TokenSettings {
                secret: "someone-else".into(),
                expiration_seconds: 60,
            },
            ..other
        };
        let fresh = Claims {
            exp: (Utc::now() + Duration::days(1)).timestamp() as usize,
            ..claims
        };
        let token = forged.sign(&fresh).unwrap();
        assert!(matches!(svc.verify_token(&token), Err(CredentialError::Malformed(_))));
        assert!(matches!(svc.verify_token("not-a-jwt"), Err(CredentialError::Malformed(_))));
    }
}
