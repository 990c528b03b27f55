use async_trait::async_trait;
use crate::booking::{Booking, Owner, ValidBooking};
use crate::error::CoreResult;
use crate::ids::ObjectId;

/// Booking record store.
///
/// Implementations are the authoritative gate: `update_booking` and `delete_booking` must
/// answer `NotFound` for a missing id and `Authorization` when `owner_id` / `requester_id`
/// does not own the record, regardless of what the caller checked beforehand.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn list_bookings(&self) -> CoreResult<Vec<Booking>>;

    async fn get_booking(&self, id: &ObjectId) -> CoreResult<Option<Booking>>;

    /// Persists a new booking, assigning its id.
    async fn create_booking(&self, candidate: ValidBooking, owner: Owner) -> CoreResult<Booking>;

    async fn update_booking(
        &self,
        id: &ObjectId,
        candidate: ValidBooking,
        owner_id: &ObjectId,
    ) -> CoreResult<Booking>;

    async fn delete_booking(&self, id: &ObjectId, requester_id: &ObjectId) -> CoreResult<()>;
}
