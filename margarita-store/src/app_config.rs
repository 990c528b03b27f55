use margarita_core::validation::MAX_PARTY_SIZE;
use margarita_core::{Capability, CapabilitySet, ReferenceZone, ValidationRules};
use serde::Deserialize;
use std::env;

pub use config::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub privileges: PrivilegesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string, or `memory` for a throwaway in-process store.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == "memory"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_seconds: u64,
    /// Age under which a client may trust its cached session without renewing.
    #[serde(default = "default_freshness")]
    pub freshness_seconds: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalendarConfig {
    #[serde(default = "default_offset_minutes")]
    pub time_zone_offset_minutes: i32,
    #[serde(default = "default_party_size")]
    pub max_party_size: u8,
    /// Year whose holidays and vacations are merged into the booking list.
    pub special_dates_year: Option<i32>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            time_zone_offset_minutes: default_offset_minutes(),
            max_party_size: default_party_size(),
            special_dates_year: None,
        }
    }
}

impl CalendarConfig {
    pub fn zone(&self) -> Result<ReferenceZone, config::ConfigError> {
        ReferenceZone::from_offset_minutes(self.time_zone_offset_minutes).ok_or_else(|| {
            config::ConfigError::Message(format!(
                "calendar.time_zone_offset_minutes {} is out of range",
                self.time_zone_offset_minutes
            ))
        })
    }

    pub fn rules(&self) -> Result<ValidationRules, config::ConfigError> {
        if !(1..=MAX_PARTY_SIZE).contains(&self.max_party_size) {
            return Err(config::ConfigError::Message(format!(
                "calendar.max_party_size must be between 1 and {}, got {}",
                MAX_PARTY_SIZE, self.max_party_size
            )));
        }
        Ok(ValidationRules {
            zone: self.zone()?,
            max_party_size: self.max_party_size,
        })
    }
}

/// Emails granted each capability. Matching is case-insensitive.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PrivilegesConfig {
    #[serde(default)]
    pub non_sharable: Vec<String>,
    #[serde(default)]
    pub admin_events: Vec<String>,
}

impl PrivilegesConfig {
    pub fn capabilities_for(&self, email: &str) -> CapabilitySet {
        let email = email.trim();
        let listed = |list: &[String]| list.iter().any(|e| e.trim().eq_ignore_ascii_case(email));

        let mut set = CapabilitySet::new();
        if listed(&self.non_sharable) {
            set.grant(Capability::CanCreateNonSharable);
        }
        if listed(&self.admin_events) {
            set.grant(Capability::CanCreateAdminEvents);
        }
        set
    }
}

fn default_max_connections() -> u32 { 5 }
fn default_true() -> bool { true }
fn default_jwt_expiration() -> u64 { 7 * 24 * 60 * 60 }
fn default_freshness() -> u64 { 6 * 24 * 60 * 60 }
fn default_bcrypt_cost() -> u32 { 10 }
fn default_offset_minutes() -> i32 { margarita_core::calendar::DEFAULT_OFFSET_MINUTES }
fn default_party_size() -> u8 { MAX_PARTY_SIZE }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `MARGARITA_AUTH__JWT_SECRET=...` sets `auth.jwt_secret`
            .add_source(config::Environment::with_prefix("MARGARITA").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
