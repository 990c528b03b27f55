//! Process-local stores used when `database.url = "memory"` and by the HTTP tests.

use crate::error::StoreError;
use crate::user_repo::{normalize_email, UserRecord, UserRepository};
use async_trait::async_trait;
use margarita_core::{
    Booking, BookingError, BookingRepository, CoreResult, ObjectId, Owner, ValidBooking,
};
use margarita_shared::Masked;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<BTreeMap<ObjectId, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_owner(booking: &Booking, id: &ObjectId, requester_id: &ObjectId) -> CoreResult<()> {
    if booking.is_owned_by(requester_id) {
        Ok(())
    } else {
        Err(BookingError::authorization(format!(
            "user {requester_id} does not own booking {id}"
        )))
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn list_bookings(&self) -> CoreResult<Vec<Booking>> {
        let mut all: Vec<Booking> = self.bookings.read().await.values().cloned().collect();
        all.sort_by_key(|b| b.start);
        Ok(all)
    }

    async fn get_booking(&self, id: &ObjectId) -> CoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(id).cloned())
    }

    async fn create_booking(&self, candidate: ValidBooking, owner: Owner) -> CoreResult<Booking> {
        let id = ObjectId::generate();
        let booking = candidate.into_booking(Some(id.clone()), Some(owner));
        self.bookings.write().await.insert(id.clone(), booking.clone());
        info!(booking_id = %id, "Booking created");
        Ok(booking)
    }

    async fn update_booking(
        &self,
        id: &ObjectId,
        candidate: ValidBooking,
        owner_id: &ObjectId,
    ) -> CoreResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let existing = bookings.get_mut(id).ok_or_else(|| BookingError::not_found(id))?;
        check_owner(existing, id, owner_id)?;

        let updated = candidate.into_booking(Some(id.clone()), existing.owner.clone());
        *existing = updated.clone();
        Ok(updated)
    }

    async fn delete_booking(&self, id: &ObjectId, requester_id: &ObjectId) -> CoreResult<()> {
        let mut bookings = self.bookings.write().await;
        let existing = bookings.get(id).ok_or_else(|| BookingError::not_found(id))?;
        check_owner(existing, id, requester_id)?;
        bookings.remove(id);
        info!(booking_id = %id, "Booking deleted");
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<ObjectId, UserRecord>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn insert_user(&self, mut user: UserRecord) -> Result<UserRecord, StoreError> {
        user.email = normalize_email(&user.email);
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(Masked::<String>::from(user.email)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use margarita_core::{
        validate_draft, BookingDraft, CapabilitySet, ErrorKind, Session, ValidationRules,
    };

    fn owner(name: &str) -> (Session, Owner) {
        let session = Session::new(ObjectId::generate(), name);
        let owner = Owner {
            id: session.user_id.clone(),
            name: name.to_owned(),
        };
        (session, owner)
    }

    fn candidate(session: &Session, title: &str, days_ahead: i64) -> ValidBooking {
        let now = Utc::now();
        let start = now + Duration::days(days_ahead);
        let mut draft = BookingDraft::new_for(start, start + Duration::days(2));
        draft.title = title.to_owned();
        validate_draft(&draft, session, &ValidationRules::default(), now).unwrap()
    }

    #[tokio::test]
    async fn test_created_bookings_list_in_start_order() {
        let repo = InMemoryBookingRepository::new();
        let (session, owner) = owner("Ana");

        let later = repo
            .create_booking(candidate(&session, "Later", 10), owner.clone())
            .await
            .unwrap();
        let sooner = repo
            .create_booking(candidate(&session, "Sooner", 3), owner)
            .await
            .unwrap();

        let listed = repo.list_bookings().await.unwrap();
        assert_eq!(listed, vec![sooner, later]);
        assert!(listed.iter().all(|b| b.owner_name() == "Ana"));
    }

    #[tokio::test]
    async fn test_update_keeps_owner_and_refuses_strangers() {
        let repo = InMemoryBookingRepository::new();
        let (ana, ana_owner) = owner("Ana");
        let (luis, _) = owner("Luis");

        let created = repo
            .create_booking(candidate(&ana, "Finde", 5), ana_owner.clone())
            .await
            .unwrap();
        let id = created.id.clone().unwrap();

        let err = repo
            .update_booking(&id, candidate(&luis, "Mio", 5), &luis.user_id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let updated = repo
            .update_booking(&id, candidate(&ana, "Finde largo", 5), &ana.user_id)
            .await
            .unwrap();
        assert_eq!(updated.title, "Finde largo");
        assert_eq!(updated.id, Some(id));
        assert_eq!(updated.owner, Some(ana_owner));
    }

    #[tokio::test]
    async fn test_second_delete_is_not_found() {
        let repo = InMemoryBookingRepository::new();
        let (ana, ana_owner) = owner("Ana");
        let id = repo
            .create_booking(candidate(&ana, "Finde", 5), ana_owner)
            .await
            .unwrap()
            .id
            .unwrap();

        repo.delete_booking(&id, &ana.user_id).await.unwrap();
        let err = repo.delete_booking(&id, &ana.user_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repo.get_booking(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stranger_cannot_delete() {
        let repo = InMemoryBookingRepository::new();
        let (ana, ana_owner) = owner("Ana");
        let (luis, _) = owner("Luis");
        let id = repo
            .create_booking(candidate(&ana, "Finde", 5), ana_owner)
            .await
            .unwrap()
            .id
            .unwrap();

        let err = repo.delete_booking(&id, &luis.user_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(repo.get_booking(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_emails_are_unique_ignoring_case() {
        let repo = InMemoryUserRepository::new();
        let user = UserRecord {
            id: ObjectId::generate(),
            name: "Ana".into(),
            email: " Ana@Example.com".into(),
            password_hash: "hash".into(),
            capabilities: CapabilitySet::new(),
        };
        let stored = repo.insert_user(user.clone()).await.unwrap();
        assert_eq!(stored.email, "ana@example.com");

        let clash = UserRecord {
            id: ObjectId::generate(),
            email: "ANA@example.com".into(),
            ..user
        };
        assert!(matches!(
            repo.insert_user(clash).await,
            Err(StoreError::DuplicateEmail(_))
        ));
        let found = repo.find_by_email("ana@EXAMPLE.com").await.unwrap().unwrap();
        assert_eq!(found.id, stored.id);
        assert_eq!(repo.find_by_id(&stored.id).await.unwrap(), Some(stored));
    }
}
