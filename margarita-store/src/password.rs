use crate::error::StoreError;

/// bcrypt wrapper that keeps the hashing work off the async executor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: bcrypt::DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String, StoreError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| StoreError::Hashing(e.to_string()))?
            .map_err(|e| StoreError::Hashing(e.to_string()))
    }

    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, StoreError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| StoreError::Hashing(e.to_string()))?;
        Ok(outcome.unwrap_or(false))
    }
}
