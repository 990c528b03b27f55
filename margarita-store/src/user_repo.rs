use crate::error::StoreError;
use async_trait::async_trait;
use margarita_core::{Capability, CapabilitySet, ObjectId, Session};
use margarita_shared::Masked;
use sqlx::PgPool;
use tracing::warn;

/// Credential store entry. The password is only ever held as a bcrypt hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub capabilities: CapabilitySet,
}

impl UserRecord {
    pub fn session(&self) -> Session {
        Session {
            user_id: self.id.clone(),
            name: self.name.clone(),
            capabilities: self.capabilities.clone(),
        }
    }
}

/// Emails are unique case-insensitively and ignore surrounding whitespace.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<UserRecord>, StoreError>;

    /// Fails with `DuplicateEmail` when the normalized email is taken.
    async fn insert_user(&self, user: UserRecord) -> Result<UserRecord, StoreError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    capabilities: Vec<String>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = ObjectId::parse(&row.id)
            .map_err(|e| StoreError::corrupt(row.id.clone(), e.technical_message()))?;
        let capabilities = row
            .capabilities
            .iter()
            .filter_map(|code| {
                let parsed = Capability::from_code(code);
                if parsed.is_none() {
                    warn!(user_id = %id, code = %code, "Ignoring unknown capability");
                }
                parsed
            })
            .collect();

        Ok(UserRecord {
            id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            capabilities,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, capabilities";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn insert_user(&self, mut user: UserRecord) -> Result<UserRecord, StoreError> {
        user.email = normalize_email(&user.email);
        let capabilities: Vec<String> = user
            .capabilities
            .iter()
            .map(|c| c.code().to_owned())
            .collect();

        let result = sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, capabilities) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&capabilities)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateEmail(Masked::<String>::from(user.email)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
