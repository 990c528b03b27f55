use crate::booking::{Booking, BookingType};
use crate::error::{BookingError, CoreResult};
use crate::identity::Session;

/// Operation a requester wants to perform on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
    /// Open the edit form (double click, edit button).
    Edit,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Edit => "edit",
        }
    }
}

/// Rules 1-3: regular types are open to everyone, NC and FR/VC need a capability.
pub fn authorize_booking_type(booking_type: BookingType, session: &Session) -> CoreResult<()> {
    match booking_type.required_capability() {
        Some(capability) if !session.can(capability) => Err(BookingError::authorization(format!(
            "user {} lacks {:?} required for booking type {}",
            session.user_id, capability, booking_type
        ))),
        _ => Ok(()),
    }
}

/// Only the owner may update, delete or open a booking for editing. Ownerless
/// (system) bookings are closed to everyone on this path.
pub fn authorize_mutation(action: Action, booking: &Booking, session: &Session) -> CoreResult<()> {
    if let Action::Create = action {
        return authorize_booking_type(booking.booking_type, session);
    }

    let resource = booking
        .id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<unsaved>".to_owned());

    match &booking.owner {
        Some(owner) if owner.id == session.user_id => Ok(()),
        Some(owner) => {
            tracing::debug!(
                booking_id = %resource,
                owner_id = %owner.id,
                requester_id = %session.user_id,
                action = action.as_str(),
                "ownership check failed"
            );
            Err(BookingError::authorization(format!(
                "user {} attempted unauthorized {} on booking {}",
                session.user_id,
                action.as_str(),
                resource
            )))
        }
        None => Err(BookingError::authorization(format!(
            "user {} attempted {} on system-owned booking {}",
            session.user_id,
            action.as_str(),
            resource
        ))),
    }
}

/// Everyone can view, but the edit affordances only show for the owner.
pub fn is_editable(booking: &Booking, session: &Session) -> bool {
    booking.is_owned_by(&session.user_id)
}

/// Booking types the requester may pick in the form, in display order.
pub fn selectable_types(session: &Session) -> Vec<BookingType> {
    BookingType::ALL
        .into_iter()
        .filter(|t| authorize_booking_type(*t, session).is_ok())
        .collect()
}
