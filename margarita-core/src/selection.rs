//! Active-selection lifecycle of the calendar screen.
//!
//! The shell never mutates the selection directly: it sends an [`Intent`] and receives a
//! [`Transition`] holding the next state, an optional [`Command`] to run against the
//! booking store, and an optional error to show.

use crate::authorization::{authorize_mutation, is_editable, Action};
use crate::booking::{Booking, BookingDraft, ValidBooking};
use crate::calendar::SlotRange;
use crate::error::{BookingError, Field};
use crate::identity::Session;
use crate::ids::ObjectId;
use crate::validation::{validate_draft, ValidationRules};
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum Editor {
    Existing(Booking),
    Draft(BookingDraft),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Selection {
    #[default]
    Empty,
    Viewing(Booking),
    Editing(Editor),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    SelectSlot(SlotRange),
    SelectEvent(Booking),
    DoubleClick(Booking),
    OpenNew,
    Navigate(NaiveDate),
    Deselect,
    Submit(BookingDraft),
    RequestDelete,
    Saved(Booking),
    Deleted(ObjectId),
    Failed(BookingError),
}

/// Store call the shell must perform on behalf of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(ValidBooking),
    Update(ObjectId, ValidBooking),
    Delete(ObjectId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Selection,
    pub command: Option<Command>,
    pub error: Option<BookingError>,
}

impl Transition {
    fn to(state: Selection) -> Self {
        Self {
            state,
            command: None,
            error: None,
        }
    }

    fn run(state: Selection, command: Command) -> Self {
        Self {
            state,
            command: Some(command),
            error: None,
        }
    }

    fn reject(state: Selection, error: BookingError) -> Self {
        Self {
            state,
            command: None,
            error: Some(error),
        }
    }
}

/// What a transition may consult: who is asking, the validation rules and the clock.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub session: &'a Session,
    pub rules: &'a ValidationRules,
    pub now: DateTime<Utc>,
}

impl Selection {
    pub fn active(&self) -> Option<&Booking> {
        match self {
            Selection::Viewing(booking) | Selection::Editing(Editor::Existing(booking)) => {
                Some(booking)
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty)
    }

    /// The edit modal is open.
    pub fn is_editing(&self) -> bool {
        matches!(self, Selection::Editing(_))
    }

    /// Form values to show in the modal, if it is open.
    pub fn form(&self) -> Option<BookingDraft> {
        match self {
            Selection::Editing(Editor::Existing(booking)) => Some(BookingDraft::from_booking(booking)),
            Selection::Editing(Editor::Draft(draft)) => Some(draft.clone()),
            _ => None,
        }
    }

    /// Whether the delete / edit buttons should be offered for the current selection.
    pub fn can_modify(&self, session: &Session) -> bool {
        self.active().is_some_and(|b| is_editable(b, session))
    }

    pub fn apply(self, intent: Intent, ctx: &SelectionContext<'_>) -> Transition {
        match intent {
            Intent::SelectSlot(range) => self.select_slot(range, ctx),
            Intent::SelectEvent(booking) => Transition::to(Selection::Viewing(booking)),
            Intent::DoubleClick(booking) => {
                if is_editable(&booking, ctx.session) {
                    Transition::to(Selection::Editing(Editor::Existing(booking)))
                } else {
                    Transition::to(self)
                }
            }
            Intent::OpenNew => {
                let today = ctx.rules.zone.today_start(ctx.now);
                Transition::to(Selection::Editing(Editor::Draft(BookingDraft::new_for(today, today))))
            }
            Intent::Navigate(_) | Intent::Deselect => Transition::to(Selection::Empty),
            Intent::Submit(form) => self.submit(form, ctx),
            Intent::RequestDelete => self.request_delete(ctx),
            Intent::Saved(_) | Intent::Deleted(_) => Transition::to(Selection::Empty),
            Intent::Failed(error) => Transition::reject(self, error),
        }
    }

    fn select_slot(self, range: SlotRange, ctx: &SelectionContext<'_>) -> Transition {
        match self {
            Selection::Empty => {
                if range.start < ctx.rules.zone.today_start(ctx.now) {
                    return Transition::to(Selection::Empty);
                }
                Transition::to(Selection::Editing(Editor::Draft(BookingDraft::from_slot(&range))))
            }
            // A click on empty space while something is active only clears it.
            Selection::Viewing(_) | Selection::Editing(_) => Transition::to(Selection::Empty),
        }
    }

    fn submit(self, form: BookingDraft, ctx: &SelectionContext<'_>) -> Transition {
        let Selection::Editing(editor) = self else {
            return Transition::to(self);
        };

        let valid = match validate_draft(&form, ctx.session, ctx.rules, ctx.now) {
            Ok(valid) => valid,
            Err(err) => return Transition::reject(Selection::Editing(editor), err),
        };

        match editor {
            Editor::Draft(_) => {
                Transition::run(Selection::Editing(Editor::Draft(form)), Command::Create(valid))
            }
            Editor::Existing(booking) => {
                if let Err(err) = authorize_mutation(Action::Update, &booking, ctx.session) {
                    return Transition::reject(Selection::Editing(Editor::Existing(booking)), err);
                }
                match booking.id.clone() {
                    Some(id) => Transition::run(
                        Selection::Editing(Editor::Existing(booking)),
                        Command::Update(id, valid),
                    ),
                    None => Transition::reject(
                        Selection::Editing(Editor::Existing(booking)),
                        BookingError::validation(Field::BookingId, "existing booking has no id"),
                    ),
                }
            }
        }
    }

    fn request_delete(self, ctx: &SelectionContext<'_>) -> Transition {
        let Some(booking) = self.active() else {
            return Transition::to(self);
        };

        if let Err(err) = authorize_mutation(Action::Delete, booking, ctx.session) {
            return Transition::reject(self, err);
        }
        match booking.id.clone() {
            Some(id) => Transition::run(self, Command::Delete(id)),
            None => Transition::to(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingType, Owner};
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    fn ana() -> Session {
        Session::new(ObjectId::parse("65f000000000000000000001").unwrap(), "Ana")
    }

    fn bruno() -> Session {
        Session::new(ObjectId::parse("65f000000000000000000002").unwrap(), "Bruno")
    }

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, m, d, 3, 0, 0).unwrap()
    }

    fn booking_of(owner: &Session) -> Booking {
        Booking {
            id: Some(ObjectId::parse("507f1f77bcf86cd799439011").unwrap()),
            title: "Fin de semana".into(),
            notes: None,
            booking_type: BookingType::FullCapacity,
            party_size: Some(4),
            start: at(3, 6),
            end: at(3, 8),
            owner: Some(Owner {
                id: owner.user_id.clone(),
                name: owner.name.clone(),
            }),
        }
    }

    fn with<R>(session: &Session, f: impl FnOnce(&SelectionContext<'_>) -> R) -> R {
        let rules = ValidationRules::default();
        let ctx = SelectionContext {
            session,
            rules: &rules,
            // 2026-03-06 10:00 local
            now: Utc.with_ymd_and_hms(2026, 3, 6, 13, 0, 0).unwrap(),
        };
        f(&ctx)
    }

    #[test]
    fn test_slot_on_empty_opens_prefilled_draft() {
        let t = with(&ana(), |ctx| {
            Selection::Empty.apply(Intent::SelectSlot(SlotRange::new(at(3, 6), at(3, 9))), ctx)
        });
        let form = t.state.form().unwrap();
        assert!(t.state.is_editing());
        assert_eq!(form.start, Some(at(3, 6).to_rfc3339()));
        assert_eq!(form.end, Some(at(3, 8).to_rfc3339()));
    }

    #[test]
    fn test_slot_in_the_past_is_ignored() {
        let t = with(&ana(), |ctx| {
            Selection::Empty.apply(Intent::SelectSlot(SlotRange::new(at(3, 2), at(3, 3))), ctx)
        });
        assert!(t.state.is_empty());
    }

    #[test]
    fn test_slot_while_active_toggles_off() {
        let range = SlotRange::new(at(3, 10), at(3, 11));
        let editing = Selection::Editing(Editor::Draft(BookingDraft::default()));
        let t = with(&ana(), |ctx| editing.apply(Intent::SelectSlot(range), ctx));
        assert!(t.state.is_empty());

        let viewing = Selection::Viewing(booking_of(&ana()));
        let t = with(&ana(), |ctx| viewing.apply(Intent::SelectSlot(range), ctx));
        assert!(t.state.is_empty());
    }

    #[test]
    fn test_double_click_only_opens_own_bookings() {
        let theirs = booking_of(&bruno());
        let viewing = Selection::Viewing(theirs.clone());
        let t = with(&ana(), |ctx| viewing.clone().apply(Intent::DoubleClick(theirs.clone()), ctx));
        assert_eq!(t.state, viewing);

        let mine = booking_of(&ana());
        let t = with(&ana(), |ctx| Selection::Empty.apply(Intent::DoubleClick(mine.clone()), ctx));
        assert_eq!(t.state, Selection::Editing(Editor::Existing(mine)));
    }

    #[test]
    fn test_navigate_always_clears() {
        let states = [
            Selection::Empty,
            Selection::Viewing(booking_of(&ana())),
            Selection::Editing(Editor::Draft(BookingDraft::default())),
        ];
        for state in states {
            let t = with(&ana(), |ctx| {
                state.apply(Intent::Navigate(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()), ctx)
            });
            assert!(t.state.is_empty());
        }
    }

    #[test]
    fn test_submit_draft_issues_create_and_ack_clears() {
        let mut form = BookingDraft::from_slot(&SlotRange::new(at(3, 6), at(3, 9)));
        form.title = "Fin de semana".into();
        let editing = Selection::Editing(Editor::Draft(BookingDraft::default()));
        let t = with(&ana(), |ctx| editing.apply(Intent::Submit(form), ctx));
        assert!(matches!(t.command, Some(Command::Create(_))));
        assert!(t.state.is_editing());

        let saved = booking_of(&ana());
        let t = with(&ana(), |ctx| t.state.apply(Intent::Saved(saved), ctx));
        assert!(t.state.is_empty());
    }

    #[test]
    fn test_invalid_submit_stays_in_editing_with_error() {
        let editing = Selection::Editing(Editor::Draft(BookingDraft::default()));
        let t = with(&ana(), |ctx| editing.clone().apply(Intent::Submit(BookingDraft::default()), ctx));
        assert_eq!(t.state, editing);
        assert!(t.command.is_none());
        assert_eq!(t.error.unwrap().field(), Some(Field::Title));
    }

    #[test]
    fn test_submit_existing_issues_update_with_same_id() {
        let mine = booking_of(&ana());
        let mut form = BookingDraft::from_booking(&mine);
        form.title = "Fin de semana largo".into();
        let t = with(&ana(), |ctx| {
            Selection::Editing(Editor::Existing(mine.clone())).apply(Intent::Submit(form), ctx)
        });
        match t.command {
            Some(Command::Update(id, valid)) => {
                assert_eq!(Some(id), mine.id);
                assert_eq!(valid.title(), "Fin de semana largo");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_requires_ownership() {
        let theirs = Selection::Viewing(booking_of(&bruno()));
        let t = with(&ana(), |ctx| theirs.apply(Intent::RequestDelete, ctx));
        assert!(t.command.is_none());
        assert_eq!(t.error.unwrap().kind(), ErrorKind::Authorization);

        let mine = booking_of(&ana());
        let t = with(&ana(), |ctx| Selection::Viewing(mine.clone()).apply(Intent::RequestDelete, ctx));
        assert_eq!(t.command, Some(Command::Delete(mine.id.clone().unwrap())));
        let t = with(&ana(), |ctx| t.state.apply(Intent::Deleted(mine.id.clone().unwrap()), ctx));
        assert!(t.state.is_empty());
    }

    #[test]
    fn test_failure_keeps_state_and_surfaces_error() {
        let editing = Selection::Editing(Editor::Existing(booking_of(&ana())));
        let err = BookingError::network("update booking", "timeout");
        let t = with(&ana(), |ctx| editing.clone().apply(Intent::Failed(err.clone()), ctx));
        assert_eq!(t.state, editing);
        assert_eq!(t.error, Some(err));
    }

    #[test]
    fn test_can_modify_reflects_ownership() {
        let viewing = Selection::Viewing(booking_of(&bruno()));
        assert!(!viewing.can_modify(&ana()));
        assert!(viewing.can_modify(&bruno()));
        assert!(!Selection::Empty.can_modify(&ana()));
    }
}
