pub mod authorization;
pub mod booking;
pub mod calendar;
pub mod error;
pub mod identity;
pub mod ids;
pub mod repository;
pub mod selection;
pub mod special_dates;
pub mod validation;

pub use authorization::{authorize_booking_type, authorize_mutation, is_editable, Action};
pub use booking::{Booking, BookingDraft, BookingType, Owner, ValidBooking};
pub use calendar::{ReferenceZone, SlotRange};
pub use error::{BookingError, CoreResult, ErrorKind, Field};
pub use identity::{Capability, CapabilitySet, Session};
pub use ids::ObjectId;
pub use repository::BookingRepository;
pub use selection::{Command, Editor, Intent, Selection, SelectionContext, Transition};
pub use validation::{validate_draft, ValidationRules};
