//! Typed control operations over a [`Backend`].

use roomsync_core::{CollectionSnapshot, RoomId, TargetTemperature};
use roomsync_proto::Route;
use tracing::{debug, warn};

use crate::{
    backend::{Backend, Request},
    command::{Command, CommandOutcome},
    error::{CommandError, TransportError},
};

/// Issues control commands and the initial room fetch.
///
/// One request per call, no retries. Failures are returned to the caller,
/// which decides how to reconcile.
#[derive(Debug, Clone)]
pub struct CommandClient<B> {
    backend: B,
}

impl<B: Backend> CommandClient<B> {
    /// Client over `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Set a room's target. `celsius` is clamped to `[15, 30]` and rounded
    /// to the nearest half degree before sending.
    pub async fn set_target_temperature(
        &self,
        room_id: RoomId,
        celsius: f64,
    ) -> Result<CommandOutcome, CommandError> {
        let temperature = TargetTemperature::new(celsius);
        self.execute(Command::SetTargetTemperature { room_id, temperature }).await
    }

    /// Switch a room's air conditioning.
    pub async fn set_ac_active(
        &self,
        room_id: RoomId,
        active: bool,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(Command::SetAcActive { room_id, active }).await
    }

    /// Switch a room's automatic mode.
    pub async fn set_auto_mode(
        &self,
        room_id: RoomId,
        auto: bool,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(Command::SetAutoMode { room_id, auto }).await
    }

    /// Create a room.
    ///
    /// # Errors
    ///
    /// - `CommandError::Validation` for a blank name; nothing is sent.
    pub async fn create_room(&self, name: &str) -> Result<CommandOutcome, CommandError> {
        let command = Command::create_room(name)?;
        self.execute(command).await
    }

    /// Start a room's sensors.
    pub async fn start_sensors(&self, room_id: RoomId) -> Result<CommandOutcome, CommandError> {
        self.execute(Command::StartSensors { room_id }).await
    }

    /// Stop a room's sensors.
    pub async fn stop_sensors(&self, room_id: RoomId) -> Result<CommandOutcome, CommandError> {
        self.execute(Command::StopSensors { room_id }).await
    }

    /// Send any command.
    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, CommandError> {
        if let Command::CreateRoom { name } = &command {
            Command::create_room(name)?;
        }

        let request = command.request()?;
        debug!(command = command.label(), path = %request.path, "sending command");

        let response = self.backend.execute(request).await?;
        let result = command.interpret(response);
        if let Err(err) = &result {
            warn!(command = command.label(), error = %err, "command failed");
        }
        result
    }

    /// Fetch every room as a full snapshot.
    ///
    /// # Errors
    ///
    /// - `TransportError::Status` for a non-2xx answer
    /// - `TransportError::Payload` for an undecodable body
    pub async fn fetch_rooms(&self) -> Result<CollectionSnapshot, TransportError> {
        let response = self.backend.execute(Request::new(&Route::Rooms, None)).await?;
        if !response.is_success() {
            return Err(TransportError::Status { status: response.status });
        }
        let snapshot = CollectionSnapshot::from_slice(&response.body)?;
        debug!(rooms = snapshot.len(), "fetched rooms");
        Ok(snapshot)
    }
}
