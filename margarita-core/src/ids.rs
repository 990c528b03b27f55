use crate::error::{BookingError, Field};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// 24-character hexadecimal document identifier.
///
/// Layout follows the document-database convention: 4 bytes of creation time in seconds,
/// 5 bytes of per-process randomness and a 3 byte counter. Always stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

impl ObjectId {
    pub const LEN: usize = 24;

    pub fn parse(raw: &str) -> Result<Self, BookingError> {
        let raw = raw.trim();
        if raw.len() != Self::LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BookingError::validation(
                Field::BookingId,
                format!("'{raw}' is not a 24 character hexadecimal id"),
            ));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let unique = PROCESS_UNIQUE.get_or_init(|| {
            let mut bytes = [0u8; 5];
            rand::thread_rng().fill_bytes(&mut bytes);
            bytes
        });
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        let seconds = at.timestamp().clamp(0, u32::MAX as i64) as u32;

        let mut id = String::with_capacity(Self::LEN);
        id.push_str(&format!("{seconds:08x}"));
        for b in unique {
            id.push_str(&format!("{b:02x}"));
        }
        id.push_str(&format!("{count:06x}"));
        Self(id)
    }

    /// Deterministic id for system entries: the seconds prefix plus a fixed tail.
    pub fn from_parts(seconds: u32, tail: u64) -> Self {
        Self(format!("{seconds:08x}{tail:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
