use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use margarita_core::{
    Booking, BookingError, BookingRepository, BookingType, CoreResult, ObjectId, Owner,
    ValidBooking,
};
use sqlx::PgPool;
use tracing::{debug, info};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &ObjectId, operation: &str) -> CoreResult<bool> {
        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM bookings WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).into_booking_error(operation))?;
        Ok(found.is_some())
    }

    /// Explains a conditional write that touched no rows.
    async fn refusal(&self, id: &ObjectId, requester_id: &ObjectId, operation: &str) -> BookingError {
        match self.exists(id, operation).await {
            Ok(true) => {
                debug!(booking_id = %id, requester = %requester_id, "Conditional {} refused", operation);
                BookingError::authorization(format!(
                    "user {requester_id} does not own booking {id}"
                ))
            }
            Ok(false) => BookingError::not_found(id),
            Err(e) => e,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: String,
    title: String,
    notes: Option<String>,
    booking_type: String,
    party_size: Option<i16>,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    owner_id: Option<String>,
    owner_name: Option<String>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let id = ObjectId::parse(&row.id)
            .map_err(|e| StoreError::corrupt(row.id.clone(), e.technical_message()))?;
        let booking_type = BookingType::from_code(&row.booking_type).ok_or_else(|| {
            StoreError::corrupt(row.id.clone(), format!("unknown booking type {}", row.booking_type))
        })?;
        let party_size = row
            .party_size
            .map(u8::try_from)
            .transpose()
            .map_err(|_| StoreError::corrupt(row.id.clone(), "party size out of range"))?;
        let owner = match row.owner_id {
            Some(owner_id) => Some(Owner {
                id: ObjectId::parse(&owner_id)
                    .map_err(|e| StoreError::corrupt(row.id.clone(), e.technical_message()))?,
                name: row.owner_name.unwrap_or_default(),
            }),
            None => None,
        };

        Ok(Booking {
            id: Some(id),
            title: row.title,
            notes: row.notes,
            booking_type,
            party_size,
            start: row.start_at,
            end: row.end_at,
            owner,
        })
    }
}

const SELECT_BOOKING: &str = "SELECT b.id, b.title, b.notes, b.booking_type, b.party_size, \
     b.start_at, b.end_at, b.owner_id, u.name AS owner_name \
     FROM bookings b LEFT JOIN users u ON u.id = b.owner_id";

fn convert(row: BookingRow, operation: &str) -> CoreResult<Booking> {
    Booking::try_from(row).map_err(|e| e.into_booking_error(operation))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn list_bookings(&self) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!("{SELECT_BOOKING} ORDER BY b.start_at"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).into_booking_error("list"))?;

        rows.into_iter().map(|row| convert(row, "list")).collect()
    }

    async fn get_booking(&self, id: &ObjectId) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{SELECT_BOOKING} WHERE b.id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).into_booking_error("get"))?;

        row.map(|row| convert(row, "get")).transpose()
    }

    async fn create_booking(&self, candidate: ValidBooking, owner: Owner) -> CoreResult<Booking> {
        let id = ObjectId::generate();
        sqlx::query(
            "INSERT INTO bookings (id, title, notes, booking_type, party_size, start_at, end_at, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id.as_str())
        .bind(candidate.title())
        .bind(candidate.notes())
        .bind(candidate.booking_type().code())
        .bind(candidate.party_size().map(i16::from))
        .bind(candidate.start())
        .bind(candidate.end())
        .bind(owner.id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from(e).into_booking_error("create"))?;

        info!(booking_id = %id, owner = %owner.id, "Booking created");
        Ok(candidate.into_booking(Some(id), Some(owner)))
    }

    async fn update_booking(
        &self,
        id: &ObjectId,
        candidate: ValidBooking,
        owner_id: &ObjectId,
    ) -> CoreResult<Booking> {
        let result = sqlx::query(
            "UPDATE bookings SET title = $3, notes = $4, booking_type = $5, party_size = $6, \
             start_at = $7, end_at = $8, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(id.as_str())
        .bind(owner_id.as_str())
        .bind(candidate.title())
        .bind(candidate.notes())
        .bind(candidate.booking_type().code())
        .bind(candidate.party_size().map(i16::from))
        .bind(candidate.start())
        .bind(candidate.end())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from(e).into_booking_error("update"))?;

        if result.rows_affected() == 0 {
            return Err(self.refusal(id, owner_id, "update").await);
        }

        self.get_booking(id)
            .await?
            .ok_or_else(|| BookingError::not_found(id))
    }

    async fn delete_booking(&self, id: &ObjectId, requester_id: &ObjectId) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND owner_id = $2")
            .bind(id.as_str())
            .bind(requester_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).into_booking_error("delete"))?;

        if result.rows_affected() == 0 {
            return Err(self.refusal(id, requester_id, "delete").await);
        }

        info!(booking_id = %id, "Booking deleted");
        Ok(())
    }
}
