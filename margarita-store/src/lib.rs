pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod error;
pub mod memory;
pub mod password;
pub mod user_repo;

pub use app_config::Config;
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use error::StoreError;
pub use memory::{InMemoryBookingRepository, InMemoryUserRepository};
pub use password::PasswordHasher;
pub use user_repo::{normalize_email, PgUserRepository, UserRecord, UserRepository};
