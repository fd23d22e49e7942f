//! Optimistic control changes and their reconciliation.
//!
//! A control action writes its anticipated value into the store immediately,
//! records what it replaced and hands a [`Dispatch`] to the runtime. When the
//! command result comes back, [`OptimisticController::resolve`] either keeps
//! the value (merging whatever the backend echoed) or writes the previous
//! value back.
//!
//! # Invariants
//!
//! - At most one [`PendingChange`] per `(room, field)`. A newer command on the
//!   same field supersedes the older record and inherits its `previous`
//!   value, so reverting the newer one restores the value from before both.
//! - Results of superseded commands never touch the store.
//! - The AC field cannot be changed while the room is in auto mode.

use std::{collections::HashMap, fmt};

use roomsync_client::{Command, CommandError, CommandOutcome};
use roomsync_core::{
    ChangeSet, CollectionSnapshot, Field, FieldValue, RoomId, RoomPatch, RoomStateStore,
    TargetTemperature, Timepoint,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Correlates a dispatched command with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A command to send, tagged with its ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Ticket to report the result under.
    pub ticket: Ticket,
    /// Command to execute.
    pub command: Command,
}

/// In-flight optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange<I> {
    /// Command that owns this record.
    pub ticket: Ticket,
    /// Room the change applies to.
    pub room_id: RoomId,
    /// Field that was changed.
    pub field: Field,
    /// Value to restore on failure.
    pub previous: FieldValue,
    /// When the optimistic value was written.
    pub applied_at: I,
}

/// A control action refused locally; nothing was written or sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The room is not in the store.
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),

    /// The AC is under automatic control.
    #[error("air conditioning of {0} is controlled automatically")]
    ControlLocked(RoomId),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] roomsync_core::ValidationError),
}

/// What a command result did.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Optimistic value kept.
    Confirmed {
        /// Room
        room_id: RoomId,
        /// Field
        field: Field,
    },
    /// Command failed; previous value restored.
    Reverted {
        /// Room
        room_id: RoomId,
        /// Field
        field: Field,
        /// Failure description
        reason: String,
        /// Sending the same command again may succeed
        retryable: bool,
    },
    /// A newer command owns the field; the store was left alone.
    Superseded {
        /// Room
        room_id: RoomId,
        /// Field
        field: Field,
        /// Failure description if the stale command failed
        error: Option<String>,
    },
    /// Creation accepted; the materialize command must be sent next.
    RoomCreated {
        /// Id of the new room
        room_id: RoomId,
        /// Follow-up command
        materialize: Dispatch,
    },
    /// Materialize finished (either way); the room list must be refreshed.
    Materialized {
        /// Id of the new room
        room_id: RoomId,
    },
    /// Creation rejected.
    CreateFailed {
        /// Failure description
        reason: String,
        /// Sending the same command again may succeed
        retryable: bool,
    },
    /// Non-optimistic command succeeded.
    Completed {
        /// Command label
        label: &'static str,
        /// Backend message
        message: Option<String>,
    },
    /// Non-optimistic command failed.
    Failed {
        /// Command label
        label: &'static str,
        /// Failure description
        reason: String,
        /// Sending the same command again may succeed
        retryable: bool,
    },
    /// The ticket was not issued by this controller, or already resolved.
    Unknown,
}

#[derive(Debug, Clone)]
enum Inflight {
    Optimistic { room_id: RoomId, field: Field },
    Create,
    Materialize { room_id: RoomId },
    Plain { label: &'static str },
}

/// Applies, tracks and reconciles optimistic changes.
#[derive(Debug, Clone)]
pub struct OptimisticController<I> {
    pending: HashMap<(RoomId, Field), PendingChange<I>>,
    inflight: HashMap<Ticket, Inflight>,
    next_ticket: u64,
}

impl<I: Timepoint> Default for OptimisticController<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Timepoint> OptimisticController<I> {
    /// Controller with nothing in flight.
    pub fn new() -> Self {
        Self { pending: HashMap::new(), inflight: HashMap::new(), next_ticket: 1 }
    }

    /// Pending record for a field.
    pub fn pending(&self, room_id: &RoomId, field: Field) -> Option<&PendingChange<I>> {
        self.pending.get(&(room_id.clone(), field))
    }

    /// Number of pending optimistic changes.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of commands awaiting a result.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Step the target up or down by half a degree.
    ///
    /// # Errors
    ///
    /// - `ControlError::UnknownRoom` if the room is absent.
    pub fn step_target(
        &mut self,
        store: &mut RoomStateStore,
        room_id: &RoomId,
        up: bool,
        now: I,
    ) -> Result<Dispatch, ControlError> {
        let current = store
            .get(room_id.as_str())
            .map(|room| room.target_temperature)
            .ok_or_else(|| ControlError::UnknownRoom(room_id.clone()))?;
        let target = if up { current.step_up() } else { current.step_down() };
        self.set_field(store, room_id, FieldValue::TargetTemperature(target), now)
    }

    /// Set the target to `celsius`, clamped and rounded.
    ///
    /// # Errors
    ///
    /// - `ControlError::UnknownRoom` if the room is absent.
    pub fn set_target(
        &mut self,
        store: &mut RoomStateStore,
        room_id: &RoomId,
        celsius: f64,
        now: I,
    ) -> Result<Dispatch, ControlError> {
        let target = TargetTemperature::new(celsius);
        self.set_field(store, room_id, FieldValue::TargetTemperature(target), now)
    }

    /// Switch the AC.
    ///
    /// # Errors
    ///
    /// - `ControlError::UnknownRoom` if the room is absent.
    /// - `ControlError::ControlLocked` if the room is in auto mode.
    pub fn set_ac_active(
        &mut self,
        store: &mut RoomStateStore,
        room_id: &RoomId,
        active: bool,
        now: I,
    ) -> Result<Dispatch, ControlError> {
        self.set_field(store, room_id, FieldValue::AcActive(active), now)
    }

    /// Switch auto mode. Enabling it locks the AC control in the same write;
    /// disabling it unlocks the control and leaves the AC state as it is.
    ///
    /// # Errors
    ///
    /// - `ControlError::UnknownRoom` if the room is absent.
    pub fn set_auto_mode(
        &mut self,
        store: &mut RoomStateStore,
        room_id: &RoomId,
        auto: bool,
        now: I,
    ) -> Result<Dispatch, ControlError> {
        self.set_field(store, room_id, FieldValue::AutoMode(auto), now)
    }

    /// Write `value` optimistically and return the command to send.
    ///
    /// # Errors
    ///
    /// - `ControlError::UnknownRoom` if the room is absent.
    /// - `ControlError::ControlLocked` for an AC change in auto mode.
    pub fn set_field(
        &mut self,
        store: &mut RoomStateStore,
        room_id: &RoomId,
        value: FieldValue,
        now: I,
    ) -> Result<Dispatch, ControlError> {
        let room =
            store.get(room_id.as_str()).ok_or_else(|| ControlError::UnknownRoom(room_id.clone()))?;
        let field = value.field();
        if field == Field::AcActive && room.ac_control_locked() {
            return Err(ControlError::ControlLocked(room_id.clone()));
        }

        let key = (room_id.clone(), field);
        let previous = match self.pending.get(&key) {
            Some(older) => {
                debug!(room = %room_id, ?field, superseded = %older.ticket, "superseding pending change");
                older.previous
            },
            None => room.field(field),
        };

        let ticket = self.issue();
        self.pending.insert(key, PendingChange {
            ticket,
            room_id: room_id.clone(),
            field,
            previous,
            applied_at: now,
        });
        self.inflight.insert(ticket, Inflight::Optimistic { room_id: room_id.clone(), field });

        if let Err(err) = store.apply_patch(room_id.clone(), RoomPatch::from(value)) {
            warn!(error = %err, "optimistic write failed");
        }
        debug!(room = %room_id, ?value, %ticket, "optimistic change applied");

        Ok(Dispatch { ticket, command: Command::set_field(room_id.clone(), value) })
    }

    /// Validate a room name and return the creation command.
    ///
    /// # Errors
    ///
    /// - `ControlError::Validation` for a blank name.
    pub fn begin_create_room(&mut self, name: &str) -> Result<Dispatch, ControlError> {
        let command = Command::create_room(name)?;
        let ticket = self.issue();
        self.inflight.insert(ticket, Inflight::Create);
        Ok(Dispatch { ticket, command })
    }

    /// Track a command that has no optimistic effect.
    pub fn plain(&mut self, command: Command) -> Dispatch {
        let ticket = self.issue();
        self.inflight.insert(ticket, Inflight::Plain { label: command.label() });
        Dispatch { ticket, command }
    }

    /// Reconcile a command result with the store.
    pub fn resolve(
        &mut self,
        store: &mut RoomStateStore,
        ticket: Ticket,
        result: Result<CommandOutcome, CommandError>,
    ) -> Resolution {
        let Some(inflight) = self.inflight.remove(&ticket) else {
            warn!(%ticket, "result for unknown ticket");
            return Resolution::Unknown;
        };

        match inflight {
            Inflight::Optimistic { room_id, field } => {
                self.resolve_optimistic(store, ticket, room_id, field, result)
            },
            Inflight::Create => match result {
                Ok(outcome) => {
                    let Some(room_id) = outcome.created else {
                        return Resolution::CreateFailed {
                            reason: "backend did not name the new room".to_owned(),
                            retryable: false,
                        };
                    };
                    info!(room = %room_id, "room created");
                    let materialize = self.materialize(room_id.clone());
                    Resolution::RoomCreated { room_id, materialize }
                },
                Err(err) => {
                    Resolution::CreateFailed { reason: err.reason(), retryable: err.is_transient() }
                },
            },
            Inflight::Materialize { room_id } => {
                if let Err(err) = result {
                    debug!(room = %room_id, error = %err, "materialize failed, refreshing anyway");
                }
                Resolution::Materialized { room_id }
            },
            Inflight::Plain { label } => match result {
                Ok(outcome) => Resolution::Completed { label, message: outcome.message },
                Err(err) => {
                    Resolution::Failed { label, reason: err.reason(), retryable: err.is_transient() }
                },
            },
        }
    }

    /// Finish a room creation once the refreshed list is known.
    ///
    /// Applies the refreshed list if there is one; if the new room is still
    /// not in the store, inserts a placeholder so the user sees it.
    pub fn finish_create(
        &mut self,
        store: &mut RoomStateStore,
        room_id: &RoomId,
        refreshed: Option<CollectionSnapshot>,
    ) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if let Some(snapshot) = refreshed {
            changes.extend(store.apply_collection(snapshot));
        }
        if store.get(room_id.as_str()).is_none() {
            info!(room = %room_id, "new room not reported yet, showing placeholder");
            changes.extend(store.insert_placeholder(room_id.clone()));
        }
        changes
    }

    fn resolve_optimistic(
        &mut self,
        store: &mut RoomStateStore,
        ticket: Ticket,
        room_id: RoomId,
        field: Field,
        result: Result<CommandOutcome, CommandError>,
    ) -> Resolution {
        let key = (room_id.clone(), field);
        let current = self.pending.get(&key).is_some_and(|p| p.ticket == ticket);

        if !current {
            let error = result.err().map(|err| err.reason());
            debug!(room = %room_id, ?field, %ticket, "stale result ignored");
            return Resolution::Superseded { room_id, field, error };
        }

        let Some(pending) = self.pending.remove(&key) else {
            return Resolution::Unknown;
        };

        match result {
            Ok(outcome) => {
                if let Some(patch) = outcome.confirmed {
                    if let Err(err) = store.apply_patch(room_id.clone(), patch) {
                        warn!(error = %err, "could not merge confirmation");
                    }
                }
                Resolution::Confirmed { room_id, field }
            },
            Err(err) => {
                warn!(room = %room_id, ?field, error = %err, "reverting optimistic change");
                if let Err(err) = store.apply_patch(room_id.clone(), RoomPatch::from(pending.previous))
                {
                    warn!(error = %err, "could not revert");
                }
                Resolution::Reverted {
                    room_id,
                    field,
                    reason: err.reason(),
                    retryable: err.is_transient(),
                }
            },
        }
    }

    fn materialize(&mut self, room_id: RoomId) -> Dispatch {
        let ticket = self.issue();
        self.inflight.insert(ticket, Inflight::Materialize { room_id: room_id.clone() });
        Dispatch { ticket, command: Command::SetAutoMode { room_id, auto: true } }
    }

    fn issue(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }
}
