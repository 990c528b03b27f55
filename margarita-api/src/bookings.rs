use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use margarita_core::{
    authorize_mutation, special_dates, validate_draft, Action, Booking, BookingDraft,
    BookingError, ObjectId, Owner, Session,
};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct EventListResponse {
    ok: bool,
    eventos: Vec<Booking>,
}

#[derive(Debug, Serialize)]
struct EventResponse {
    ok: bool,
    evento: Booking,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    ok: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{id}", put(update_event).delete(delete_event))
}

async fn list_events(State(state): State<AppState>) -> Result<Json<EventListResponse>, AppError> {
    let mut eventos = state.bookings.list_bookings().await?;
    if let Some(year) = state.special_dates_year {
        eventos.extend(special_dates::for_year(year, &state.rules.zone));
        eventos.sort_by_key(|b| b.start);
    }

    Ok(Json(EventListResponse { ok: true, eventos }))
}

async fn create_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<BookingDraft>, JsonRejection>,
) -> Result<Json<EventResponse>, AppError> {
    let Json(draft) = payload?;
    let candidate = validate_draft(&draft, &session, &state.rules, Utc::now())?;

    let owner = Owner {
        id: session.user_id.clone(),
        name: session.name.clone(),
    };
    let evento = state.bookings.create_booking(candidate, owner).await?;

    Ok(Json(EventResponse { ok: true, evento }))
}

fn special_date(state: &AppState, id: &ObjectId) -> Option<Booking> {
    let year = state.special_dates_year?;
    special_dates::for_year(year, &state.rules.zone)
        .into_iter()
        .find(|b| b.id.as_ref() == Some(id))
}

/// Loads the target and checks the requester may act on it. The store re-checks ownership
/// on the write itself.
async fn load_owned(
    state: &AppState,
    raw_id: &str,
    action: Action,
    session: &Session,
) -> Result<(ObjectId, Booking), AppError> {
    let id = ObjectId::parse(raw_id)?;
    let existing = match state.bookings.get_booking(&id).await? {
        Some(booking) => booking,
        None => special_date(state, &id).ok_or_else(|| BookingError::not_found(&id))?,
    };
    authorize_mutation(action, &existing, session)?;
    Ok((id, existing))
}

async fn update_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    payload: Result<Json<BookingDraft>, JsonRejection>,
) -> Result<Json<EventResponse>, AppError> {
    let Json(draft) = payload?;
    let (id, _) = load_owned(&state, &id, Action::Update, &session).await?;

    let candidate = validate_draft(&draft, &session, &state.rules, Utc::now())?;
    let evento = state
        .bookings
        .update_booking(&id, candidate, &session.user_id)
        .await?;

    info!(booking_id = %id, user_id = %session.user_id, "Booking updated");
    Ok(Json(EventResponse { ok: true, evento }))
}

async fn delete_event(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let (id, _) = load_owned(&state, &id, Action::Delete, &session).await?;
    state.bookings.delete_booking(&id, &session.user_id).await?;

    Ok(Json(DeletedResponse { ok: true }))
}
