//! Client side of the reservation calendar: HTTP gateway, cached session and the
//! controller that drives the selection state machine.

pub mod controller;
pub mod gateway;
pub mod session;

pub use controller::{AuthStatus, CalendarController, Outcome, PendingCommand};
pub use gateway::{AuthPayload, BookingGateway, GatewayError, HttpGateway};
pub use session::{CachedUser, SessionCache, SessionError, StoredSession};
