//! In-memory backend model.
//!
//! [`SimBackend`] answers the same routes as the real server from a room map
//! held in memory, so the real [`roomsync_client::CommandClient`] and
//! [`roomsync_app::Runtime`] can run against it. Faults are injected per
//! request; every request is logged for assertions.
//!
//! Server behavior mirrored here:
//!
//! - Control endpoints create an unknown room on first use.
//! - A new room starts with target 21 °C, AC off and auto mode on.
//! - In auto mode the AC follows the temperature with a 0.5 °C dead band.

use std::{
    collections::{BTreeSet, VecDeque},
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use roomsync_client::{Backend, Request, Response, TransportError};
use roomsync_core::SensorKind;
use roomsync_proto::{
    AcRequest, AutoModeRequest, CreateRoomRequest, RoomPayload, RoomsPayload, Route,
    SensorPayload, TargetTemperatureRequest,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Target of a room created by the server.
pub const DEFAULT_TARGET: f64 = 21.0;

/// A failure to inject into the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Answer with a non-2xx status and an `erreur` body.
    Reject {
        /// HTTP status
        status: u16,
        /// Reason returned to the client
        reason: String,
    },
    /// Fail the exchange without an answer.
    Unreachable,
}

#[derive(Debug, Default)]
struct ModelState {
    rooms: RoomsPayload,
    sensors_running: BTreeSet<String>,
    faults: VecDeque<Fault>,
    hide_created: bool,
    hidden: BTreeSet<String>,
    requests: Vec<Request>,
}

impl ModelState {
    fn room_mut(&mut self, id: &str) -> &mut RoomPayload {
        self.rooms.get_or_insert_with(id, new_room)
    }

    fn visible(&self) -> RoomsPayload {
        self.rooms
            .iter()
            .filter(|(id, _)| !self.hidden.contains(*id))
            .map(|(id, room)| (id.to_owned(), room.clone()))
            .collect()
    }
}

/// In-memory backend for simulation.
#[derive(Debug, Default)]
pub struct SimBackend {
    state: Mutex<ModelState>,
}

impl SimBackend {
    /// Backend with no rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room before the simulation starts.
    #[must_use]
    pub fn with_room(self, id: &str, room: RoomPayload) -> Self {
        self.insert_room(id, room);
        self
    }

    /// Add or replace a room.
    pub fn insert_room(&self, id: &str, room: RoomPayload) {
        self.lock().rooms.insert(id, room);
    }

    /// Current model state of a room.
    pub fn room(&self, id: &str) -> Option<RoomPayload> {
        self.lock().rooms.get(id).cloned()
    }

    /// Rooms a fetch would return.
    pub fn rooms(&self) -> RoomsPayload {
        self.lock().visible()
    }

    /// Store a sensor reading, as a sensor process would.
    pub fn record_reading(
        &self,
        id: &str,
        kind: SensorKind,
        valeur: f64,
        unite: &str,
        timestamp: u64,
    ) {
        let mut state = self.lock();
        let room = state.room_mut(id);
        let reading = Some(SensorPayload { valeur, unite: unite.to_owned(), timestamp });
        match kind {
            SensorKind::Temperature => {
                room.temperature = reading;
                adjust_automatically(room);
            },
            SensorKind::Humidity => room.humidite = reading,
            SensorKind::Pressure => room.pression = reading,
        }
    }

    /// Fail the next request with `fault`. Faults queue up in order.
    pub fn fail_next(&self, fault: Fault) {
        self.lock().faults.push_back(fault);
    }

    /// Reject the next request with a 400, as the server does for invalid
    /// values.
    pub fn reject_next(&self, reason: &str) {
        self.fail_next(Fault::Reject { status: 400, reason: reason.to_owned() });
    }

    /// While set, created rooms are left out of fetches and stream
    /// messages, like a listing that lags behind creation.
    pub fn hide_created_rooms(&self, hide: bool) {
        self.lock().hide_created = hide;
    }

    /// Make every hidden room visible.
    pub fn reveal_hidden(&self) {
        self.lock().hidden.clear();
    }

    /// Whether sensors of `id` are running.
    pub fn sensors_running(&self, id: &str) -> bool {
        self.lock().sensors_running.contains(id)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// Requests received for `route`.
    pub fn requests_to(&self, route: &Route) -> usize {
        self.lock().requests.iter().filter(|r| r.route().as_ref() == Some(route)).count()
    }

    /// Body of the push event the server would send now.
    pub fn stream_message(&self) -> String {
        self.rooms().to_json().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, ModelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for SimBackend {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        let mut state = self.lock();
        state.requests.push(request.clone());
        let result = match state.faults.pop_front() {
            Some(Fault::Unreachable) => {
                Err(TransportError::Connection("simulated network failure".to_owned()))
            },
            Some(Fault::Reject { status, reason }) => {
                Ok(Response::json(status, &json!({ "erreur": reason })))
            },
            None => handle(&mut state, &request),
        };
        debug!(path = %request.path, ok = result.is_ok(), "simulated exchange");
        std::future::ready(result)
    }
}

fn handle(state: &mut ModelState, request: &Request) -> Result<Response, TransportError> {
    let Some(route) = request.route() else {
        return Ok(error(404, "Route inconnue"));
    };

    let response = match route {
        Route::Rooms => Response { status: 200, body: state.visible().to_json()?.into_bytes() },
        Route::Stream => error(400, "Flux disponible uniquement en streaming"),
        Route::TargetTemperature(id) => match body::<TargetTemperatureRequest>(request) {
            Some(TargetTemperatureRequest { temperature }) => {
                let room = state.room_mut(&id);
                room.temperature_cible = temperature;
                adjust_automatically(room);
                Response::json(200, &json!({ "succes": true, "temperature_cible": temperature }))
            },
            None => error(400, "Température manquante"),
        },
        Route::AirConditioning(id) => match body::<AcRequest>(request) {
            Some(AcRequest { active }) => {
                state.room_mut(&id).climatisation_active = active;
                Response::json(200, &json!({ "succes": true, "climatisation_active": active }))
            },
            None => error(400, "État de climatisation manquant"),
        },
        Route::AutoMode(id) => match body::<AutoModeRequest>(request) {
            Some(AutoModeRequest { auto }) => {
                let room = state.room_mut(&id);
                room.mode_automatique = auto;
                adjust_automatically(room);
                Response::json(200, &json!({ "succes": true, "mode_automatique": auto }))
            },
            None => error(400, "Mode automatique manquant"),
        },
        Route::CreateRoom => match body::<CreateRoomRequest>(request) {
            Some(CreateRoomRequest { nom_piece }) => {
                let name = nom_piece.trim().to_owned();
                if name.is_empty() {
                    return Ok(error(400, "Nom de pièce vide"));
                }
                state.room_mut(&name);
                state.sensors_running.insert(name.clone());
                if state.hide_created {
                    state.hidden.insert(name.clone());
                }
                Response::json(200, &json!({
                    "succes": true,
                    "message": format!("Pièce \"{name}\" ajoutée avec succès"),
                    "piece_id": name,
                    "capteurs_demarres": true,
                }))
            },
            None => error(400, "Nom de pièce manquant"),
        },
        Route::StartSensors(id) => {
            state.sensors_running.insert(id.clone());
            Response::json(200, &json!({
                "succes": true,
                "message": format!("Capteurs démarrés pour la pièce \"{id}\""),
            }))
        },
        Route::StopSensors(id) => {
            state.sensors_running.remove(&id);
            Response::json(200, &json!({
                "succes": true,
                "message": format!("Capteurs arrêtés pour la pièce \"{id}\""),
            }))
        },
    };
    Ok(response)
}

fn body<T: DeserializeOwned>(request: &Request) -> Option<T> {
    request.body.clone().and_then(|body| serde_json::from_value(body).ok())
}

fn error(status: u16, reason: &str) -> Response {
    Response::json(status, &json!({ "erreur": reason }))
}

fn adjust_automatically(room: &mut RoomPayload) {
    let Some(temperature) = room.temperature.as_ref().map(|t| t.valeur) else {
        return;
    };
    if !room.mode_automatique {
        return;
    }
    if temperature > room.temperature_cible + 0.5 {
        room.climatisation_active = true;
    } else if temperature < room.temperature_cible - 0.5 {
        room.climatisation_active = false;
    }
}

fn new_room() -> RoomPayload {
    RoomPayload {
        id: None,
        temperature: None,
        humidite: None,
        pression: None,
        temperature_cible: DEFAULT_TARGET,
        climatisation_active: false,
        mode_automatique: true,
    }
}

/// Room payload with no sensors.
pub fn room(target: f64, ac_active: bool, auto_mode: bool) -> RoomPayload {
    RoomPayload {
        temperature_cible: target,
        climatisation_active: ac_active,
        mode_automatique: auto_mode,
        ..new_room()
    }
}

/// Sensor payload.
pub fn sensor(valeur: f64, unite: &str, timestamp: u64) -> SensorPayload {
    SensorPayload { valeur, unite: unite.to_owned(), timestamp }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use roomsync_client::CommandClient;
    use roomsync_core::RoomId;

    use super::*;

    #[tokio::test]
    async fn control_endpoints_update_model() {
        let backend = SimBackend::new().with_room("lounge", room(21.0, false, false));
        let client = CommandClient::new(backend);

        client.set_target_temperature(RoomId::from("lounge"), 23.0).await.unwrap();
        client.set_ac_active(RoomId::from("lounge"), true).await.unwrap();

        let lounge = client.backend().room("lounge").unwrap();
        assert_eq!(lounge.temperature_cible, 23.0);
        assert!(lounge.climatisation_active);
    }

    #[tokio::test]
    async fn faults_apply_in_order() {
        let backend = SimBackend::new();
        backend.fail_next(Fault::Unreachable);
        backend.reject_next("boom");

        let first = backend.execute(Request::new(&Route::Rooms, None)).await;
        let second = backend.execute(Request::new(&Route::Rooms, None)).await.unwrap();
        let third = backend.execute(Request::new(&Route::Rooms, None)).await.unwrap();

        assert!(matches!(first, Err(TransportError::Connection(_))));
        assert_eq!(second.status, 400);
        assert_eq!(third.status, 200);
        assert_eq!(backend.requests_to(&Route::Rooms), 3);
    }

    #[test]
    fn auto_mode_follows_temperature() {
        let backend = SimBackend::new().with_room("lounge", room(21.0, false, true));

        backend.record_reading("lounge", SensorKind::Temperature, 23.0, "°C", 10);
        assert!(backend.room("lounge").is_some_and(|r| r.climatisation_active));

        backend.record_reading("lounge", SensorKind::Temperature, 21.2, "°C", 20);
        assert!(backend.room("lounge").is_some_and(|r| r.climatisation_active));

        backend.record_reading("lounge", SensorKind::Temperature, 19.0, "°C", 30);
        assert!(backend.room("lounge").is_some_and(|r| !r.climatisation_active));
    }

    #[tokio::test]
    async fn hidden_rooms_stay_out_of_listings() {
        let backend = SimBackend::new();
        backend.hide_created_rooms(true);
        let client = CommandClient::new(backend);

        client.create_room("Kitchen").await.unwrap();
        assert!(client.fetch_rooms().await.unwrap().is_empty());

        client.backend().reveal_hidden();
        assert!(client.fetch_rooms().await.unwrap().contains(&RoomId::from("Kitchen")));
    }
}
