use crate::calendar::SlotRange;
use crate::error::{BookingError, Field};
use crate::identity::Capability;
use crate::ids::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display name shown for bookings injected by the system rather than by a user.
pub const ADMIN_OWNER_NAME: &str = "ADMIN";

/// Reservation category. Serialized as the two-letter code used across the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingType {
    #[serde(rename = "CT")]
    FullCapacity,
    #[serde(rename = "PA")]
    PartialBothHouses,
    #[serde(rename = "PR")]
    MainHouseOnly,
    #[serde(rename = "CS")]
    GuestHouseOnly,
    #[serde(rename = "NC")]
    NonSharable,
    #[serde(rename = "FL")]
    FreeWeekend,
    #[serde(rename = "FR")]
    Holiday,
    #[serde(rename = "VC")]
    Vacation,
}

impl BookingType {
    pub const ALL: [BookingType; 8] = [
        BookingType::FullCapacity,
        BookingType::PartialBothHouses,
        BookingType::MainHouseOnly,
        BookingType::GuestHouseOnly,
        BookingType::NonSharable,
        BookingType::FreeWeekend,
        BookingType::Holiday,
        BookingType::Vacation,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            BookingType::FullCapacity => "CT",
            BookingType::PartialBothHouses => "PA",
            BookingType::MainHouseOnly => "PR",
            BookingType::GuestHouseOnly => "CS",
            BookingType::NonSharable => "NC",
            BookingType::FreeWeekend => "FL",
            BookingType::Holiday => "FR",
            BookingType::Vacation => "VC",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingType::FullCapacity => "Reserva Total",
            BookingType::PartialBothHouses => "Reserva Parcial (ambas casas)",
            BookingType::MainHouseOnly => "Casa Principal",
            BookingType::GuestHouseOnly => "Casita",
            BookingType::NonSharable => "Reserva No Compartible",
            BookingType::FreeWeekend => "Finde Libre",
            BookingType::Holiday => "Feriado",
            BookingType::Vacation => "Vacaciones",
        }
    }

    /// Capability needed to create or select this type, if any.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            BookingType::NonSharable => Some(Capability::CanCreateNonSharable),
            BookingType::Holiday | BookingType::Vacation => Some(Capability::CanCreateAdminEvents),
            _ => None,
        }
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(self, BookingType::Holiday | BookingType::Vacation)
    }
}

impl fmt::Display for BookingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BookingType {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s.trim()).ok_or_else(|| {
            BookingError::validation(Field::BookingType, format!("unknown booking type '{s}'"))
        })
    }
}

/// Creating user, denormalized onto the booking for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "booking")]
    pub booking_type: BookingType,
    #[serde(rename = "pax", default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u8>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `None` for system entries (holidays, vacations).
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
}

impl Booking {
    pub fn is_admin_owned(&self) -> bool {
        self.owner.is_none()
    }

    pub fn owner_name(&self) -> &str {
        self.owner
            .as_ref()
            .map(|o| o.name.as_str())
            .unwrap_or(ADMIN_OWNER_NAME)
    }

    pub fn is_owned_by(&self, user_id: &ObjectId) -> bool {
        self.owner.as_ref().is_some_and(|o| &o.id == user_id)
    }
}

/// Raw form values for a booking, exactly as typed or as received in a request body.
///
/// Nothing here is trusted: dates are unparsed strings and the party size is whatever JSON
/// value the caller sent. [`crate::validation::validate_draft`] turns it into a
/// [`ValidBooking`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(rename = "booking", default)]
    pub booking_type: Option<String>,
    #[serde(rename = "pax", default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<serde_json::Value>,
}

impl BookingDraft {
    /// Fresh draft for the "add new" button: today, full capacity, one guest.
    pub fn new_for(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: String::new(),
            notes: None,
            start: Some(start.to_rfc3339()),
            end: Some(end.to_rfc3339()),
            booking_type: Some(BookingType::FullCapacity.code().to_owned()),
            party_size: Some(serde_json::Value::from(1)),
        }
    }

    /// Draft prefilled from a grid selection, applying the last-night adjustment.
    pub fn from_slot(range: &SlotRange) -> Self {
        Self::new_for(range.start, range.stay_end())
    }

    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            title: booking.title.clone(),
            notes: booking.notes.clone(),
            start: Some(booking.start.to_rfc3339()),
            end: Some(booking.end.to_rfc3339()),
            booking_type: Some(booking.booking_type.code().to_owned()),
            party_size: booking.party_size.map(serde_json::Value::from),
        }
    }
}

/// Booking fields that passed validation. The only way to build one outside this crate is
/// through the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidBooking {
    pub(crate) title: String,
    pub(crate) notes: Option<String>,
    pub(crate) booking_type: BookingType,
    pub(crate) party_size: Option<u8>,
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
}

impl ValidBooking {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn booking_type(&self) -> BookingType {
        self.booking_type
    }

    pub fn party_size(&self) -> Option<u8> {
        self.party_size
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn into_booking(self, id: Option<ObjectId>, owner: Option<Owner>) -> Booking {
        Booking {
            id,
            title: self.title,
            notes: self.notes,
            booking_type: self.booking_type,
            party_size: self.party_size,
            start: self.start,
            end: self.end,
            owner,
        }
    }
}
