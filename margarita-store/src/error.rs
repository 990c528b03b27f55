use margarita_core::BookingError;
use margarita_shared::Masked;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("email {0} is already registered")]
    DuplicateEmail(Masked<String>),

    #[error("stored row {id} is unreadable: {detail}")]
    Corrupt { id: String, detail: String },

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl StoreError {
    pub fn corrupt(id: impl Into<String>, detail: impl Into<String>) -> Self {
        StoreError::Corrupt {
            id: id.into(),
            detail: detail.into(),
        }
    }

    /// Folds the store failure into the core taxonomy under the given operation name.
    pub fn into_booking_error(self, operation: &str) -> BookingError {
        BookingError::storage(operation, self)
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        err.into_booking_error("store")
    }
}
