//! Calendar screen controller.
//!
//! Owns the selection state machine, the loaded bookings and the cached session, and
//! applies the client error policy:
//! - an authentication failure on a mutating call logs the user out;
//! - a failed read logs out only when the server answered 401;
//! - network failures never log out.
//!
//! Store commands are split into [`CalendarController::dispatch`], [`CalendarController::perform`]
//! and [`CalendarController::complete`] so a shell can run the call concurrently. Each
//! command carries the selection generation it was issued under; an acknowledgement for an
//! older generation updates the booking list but leaves the selection alone.

use chrono::{DateTime, Duration, Utc};
use margarita_core::{
    Booking, BookingError, Command, ErrorKind, Intent, ObjectId, Selection, SelectionContext,
    Session, ValidationRules,
};
use tracing::{debug, info, warn};

use crate::gateway::{AuthPayload, BookingGateway, GatewayError};
use crate::session::{SessionCache, StoredSession};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    Checking,
    Authenticated(Session),
    NotAuthenticated { message: Option<String> },
}

/// A store command waiting to be performed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    pub generation: u64,
    pub command: Command,
}

/// Result of a performed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Saved(Booking),
    Deleted(ObjectId),
}

pub struct CalendarController<G> {
    gateway: G,
    cache: SessionCache,
    rules: ValidationRules,
    freshness: Duration,
    status: AuthStatus,
    stored: Option<StoredSession>,
    selection: Selection,
    events: Vec<Booking>,
    generation: u64,
    last_error: Option<String>,
}

impl<G: BookingGateway> CalendarController<G> {
    pub fn new(gateway: G, cache: SessionCache, rules: ValidationRules, freshness: Duration) -> Self {
        Self {
            gateway,
            cache,
            rules,
            freshness,
            status: AuthStatus::Checking,
            stored: None,
            selection: Selection::Empty,
            events: Vec::new(),
            generation: 0,
            last_error: None,
        }
    }

    pub fn status(&self) -> &AuthStatus {
        &self.status
    }

    pub fn session(&self) -> Option<Session> {
        self.stored.as_ref().map(StoredSession::session)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn events(&self) -> &[Booking] {
        &self.events
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Restores the cached session, renewing it only once it is older than the freshness
    /// window.
    pub async fn check_auth_token(&mut self, now: DateTime<Utc>) -> &AuthStatus {
        self.status = AuthStatus::Checking;

        let stored = match self.cache.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Could not read session cache: {}", e);
                None
            }
        };
        let Some(stored) = stored else {
            self.stored = None;
            self.status = AuthStatus::NotAuthenticated { message: None };
            return &self.status;
        };

        if stored.is_fresh(now, self.freshness) {
            debug!(user_id = %stored.user.uid, "Cached token is fresh, skipping renewal");
            self.authenticated(stored);
            return &self.status;
        }

        match self.gateway.renew(&stored.token).await {
            Ok(payload) => self.accept(payload, now).await,
            Err(e) if e.is_unauthorized() => {
                info!("Token rejected on renewal, logging out");
                self.logout().await;
            }
            Err(e) => {
                warn!("Renewal failed, keeping cached session: {}", e);
                self.authenticated(stored);
            }
        }
        &self.status
    }

    pub async fn login(&mut self, email: &str, password: &str, now: DateTime<Utc>) -> &AuthStatus {
        self.status = AuthStatus::Checking;
        match self.gateway.login(email, password).await {
            Ok(payload) => self.accept(payload, now).await,
            Err(e) => self.rejected(e),
        }
        &self.status
    }

    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> &AuthStatus {
        self.status = AuthStatus::Checking;
        match self.gateway.register(name, email, password).await {
            Ok(payload) => self.accept(payload, now).await,
            Err(e) => self.rejected(e),
        }
        &self.status
    }

    /// Drops the cached session and every piece of calendar state.
    pub async fn logout(&mut self) {
        if let Err(e) = self.cache.clear().await {
            warn!("Could not clear session cache: {}", e);
        }
        self.stored = None;
        self.events.clear();
        self.selection = Selection::Empty;
        self.generation += 1;
        self.status = AuthStatus::NotAuthenticated { message: None };
    }

    pub async fn load_events(&mut self) {
        let Some(token) = self.stored.as_ref().map(|s| s.token.clone()) else {
            return;
        };

        match self.gateway.list(&token).await {
            Ok(events) => {
                self.events = events;
                self.last_error = None;
            }
            Err(e) if e.is_unauthorized() => {
                let message = e.user_message().to_owned();
                self.logout().await;
                self.status = AuthStatus::NotAuthenticated { message: Some(message) };
            }
            Err(e) => {
                warn!("Could not load bookings: {}", e);
                self.last_error = Some(e.user_message().to_owned());
            }
        }
    }

    /// Feeds a user intent to the state machine. Returns the store command to perform, if
    /// the transition produced one.
    pub fn dispatch(&mut self, intent: Intent, now: DateTime<Utc>) -> Option<PendingCommand> {
        let Some(session) = self.session() else {
            debug!("Ignoring intent without a session");
            return None;
        };

        if moves_selection(&intent) {
            self.generation += 1;
        }

        let ctx = SelectionContext {
            session: &session,
            rules: &self.rules,
            now,
        };
        let transition = std::mem::take(&mut self.selection).apply(intent, &ctx);
        self.selection = transition.state;
        self.last_error = transition.error.map(|e| e.user_message().to_owned());

        transition.command.map(|command| PendingCommand {
            generation: self.generation,
            command,
        })
    }

    pub async fn perform(&self, pending: &PendingCommand) -> Result<Outcome, GatewayError> {
        let token = self
            .stored
            .as_ref()
            .map(|s| s.token.as_str())
            .ok_or_else(|| BookingError::authentication("no cached session"))?;

        match &pending.command {
            Command::Create(candidate) => self.gateway.create(token, candidate).await.map(Outcome::Saved),
            Command::Update(id, candidate) => {
                self.gateway.update(token, id, candidate).await.map(Outcome::Saved)
            }
            Command::Delete(id) => {
                self.gateway.delete(token, id).await?;
                Ok(Outcome::Deleted(id.clone()))
            }
        }
    }

    pub async fn complete(
        &mut self,
        pending: PendingCommand,
        result: Result<Outcome, GatewayError>,
        now: DateTime<Utc>,
    ) {
        let current = pending.generation == self.generation;

        match result {
            Ok(Outcome::Saved(booking)) => {
                upsert(&mut self.events, booking.clone());
                if current {
                    self.dispatch(Intent::Saved(booking), now);
                }
            }
            Ok(Outcome::Deleted(id)) => {
                self.events.retain(|b| b.id.as_ref() != Some(&id));
                if current {
                    self.dispatch(Intent::Deleted(id), now);
                }
            }
            Err(e) if e.kind() == ErrorKind::Authentication => {
                info!("Mutation rejected for authentication, logging out");
                let message = e.user_message().to_owned();
                self.logout().await;
                self.status = AuthStatus::NotAuthenticated { message: Some(message) };
            }
            Err(e) => {
                warn!(generation = pending.generation, "Store command failed: {}", e);
                if current {
                    let message = e.user_message().to_owned();
                    self.dispatch(Intent::Failed(e.error), now);
                    self.last_error = Some(message);
                }
            }
        }

        if !current {
            debug!(
                generation = pending.generation,
                current = self.generation,
                "Ignoring stale acknowledgement for the selection"
            );
        }
    }

    /// Dispatches, performs and completes in one go.
    pub async fn submit(&mut self, intent: Intent, now: DateTime<Utc>) {
        if let Some(pending) = self.dispatch(intent, now) {
            let result = self.perform(&pending).await;
            self.complete(pending, result, now).await;
        }
    }

    fn authenticated(&mut self, stored: StoredSession) {
        self.status = AuthStatus::Authenticated(stored.session());
        self.stored = Some(stored);
    }

    async fn accept(&mut self, payload: AuthPayload, now: DateTime<Utc>) {
        let stored = StoredSession::from_payload(payload, now);
        if let Err(e) = self.cache.save(&stored).await {
            warn!("Could not persist session: {}", e);
        }
        info!(user_id = %stored.user.uid, "Session established");
        self.authenticated(stored);
    }

    fn rejected(&mut self, e: GatewayError) {
        warn!("Authentication failed: {}", e);
        self.stored = None;
        self.status = AuthStatus::NotAuthenticated {
            message: Some(e.user_message().to_owned()),
        };
    }
}

/// Intents that replace what the user is looking at. Acknowledgements and requests made
/// from the current selection keep the generation.
fn moves_selection(intent: &Intent) -> bool {
    !matches!(
        intent,
        Intent::Submit(_)
            | Intent::RequestDelete
            | Intent::Saved(_)
            | Intent::Deleted(_)
            | Intent::Failed(_)
    )
}

fn upsert(events: &mut Vec<Booking>, booking: Booking) {
    match events.iter_mut().find(|b| b.id.is_some() && b.id == booking.id) {
        Some(existing) => *existing = booking,
        None => events.push(booking),
    }
    events.sort_by_key(|b| b.start);
}
