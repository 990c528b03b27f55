use std::sync::Arc;

use margarita_core::{BookingRepository, ValidationRules};
use margarita_store::app_config::ConfigError;
use margarita_store::{Config, PasswordHasher, UserRepository};

use crate::credentials::{CredentialService, TokenSettings};

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingRepository>,
    pub credentials: Arc<CredentialService>,
    pub rules: ValidationRules,
    /// Year of holidays and vacations merged into the listing, if any.
    pub special_dates_year: Option<i32>,
}

impl AppState {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        config: &Config,
    ) -> Result<Self, ConfigError> {
        let credentials = CredentialService::new(
            users,
            PasswordHasher::new(config.auth.bcrypt_cost),
            TokenSettings {
                secret: config.auth.jwt_secret.clone(),
                expiration_seconds: config.auth.jwt_expiration_seconds,
            },
            config.privileges.clone(),
        );

        Ok(Self {
            bookings,
            credentials: Arc::new(credentials),
            rules: config.calendar.rules()?,
            special_dates_year: config.calendar.special_dates_year,
        })
    }
}
