//! Scripted end-to-end runs.
//!
//! [`Simulation`] wires a [`SimBackend`] and a [`SimDriver`] into the real
//! [`Runtime`] and offers the steps tests are written in: press keys, let the
//! backend answer, push a stream update, let time pass.

use std::{sync::Arc, time::Duration};

use roomsync_app::{App, AppAction, KeyInput, Runtime};
use roomsync_client::DEFAULT_RECONNECT_DELAY;
use roomsync_core::Environment;

use crate::{
    invariants::InvariantRegistry,
    sim_backend::SimBackend,
    sim_driver::{SimDriver, SimDriverError},
    sim_env::{SimEnv, SimInstant},
};

/// Upper bound on settle rounds; a run that needs more is looping.
const MAX_SETTLE_ROUNDS: usize = 64;

/// A runtime, its driver and the backend model.
pub struct Simulation {
    runtime: Runtime<SimDriver>,
    backend: Arc<SimBackend>,
    env: SimEnv,
}

impl Simulation {
    /// Start against `backend`: fetch the initial rooms and process the
    /// resulting events. Standard invariants are checked on every render.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn start(backend: SimBackend) -> Result<Self, SimDriverError> {
        Self::start_with(backend, DEFAULT_RECONNECT_DELAY).await
    }

    /// Like [`Simulation::start`] with a custom reconnect delay.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn start_with(
        backend: SimBackend,
        reconnect_delay: Duration,
    ) -> Result<Self, SimDriverError> {
        let backend = Arc::new(backend);
        let env = SimEnv::new();
        let driver = SimDriver::new(Arc::clone(&backend), env.clone())
            .with_invariants(InvariantRegistry::standard());
        let mut runtime = Runtime::new(driver, reconnect_delay);
        runtime.initialize().await?;
        runtime.run_until_idle().await?;
        Ok(Self { runtime, backend, env })
    }

    /// Press a key and process its effects, without delivering commands.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn key(&mut self, key: KeyInput) -> Result<(), SimDriverError> {
        self.runtime.driver_mut().inject_key(key);
        self.process().await
    }

    /// Type `text` and process it.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn type_text(&mut self, text: &str) -> Result<(), SimDriverError> {
        self.runtime.driver_mut().inject_text(text);
        self.process().await
    }

    /// Process queued events. Returns once the driver has none.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn process(&mut self) -> Result<(), SimDriverError> {
        self.runtime.run_until_idle().await.map(|_| ())
    }

    /// Deliver every queued command and refresh, process the results, and
    /// repeat until nothing is in flight.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn settle(&mut self) -> Result<(), SimDriverError> {
        for _ in 0..MAX_SETTLE_ROUNDS {
            self.process().await?;
            let driver = self.runtime.driver_mut();
            if !driver.has_inflight() {
                return Ok(());
            }
            driver.deliver_commands().await;
            driver.deliver_refreshes().await;
        }
        Ok(())
    }

    /// Deliver the oldest queued command only and process its result.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn deliver_one(&mut self) -> Result<bool, SimDriverError> {
        let delivered = self.runtime.driver_mut().deliver_command(0).await;
        self.process().await?;
        Ok(delivered)
    }

    /// Push the backend's current rooms over the stream and process it.
    /// Returns false if no channel is open.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn push_update(&mut self) -> Result<bool, SimDriverError> {
        let pushed = self.runtime.driver_mut().push_stream_update();
        self.process().await?;
        Ok(pushed)
    }

    /// Push a raw stream message and process it.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn push_message(&mut self, message: &str) -> Result<bool, SimDriverError> {
        let pushed = self.runtime.driver_mut().push_stream_message(message.to_owned());
        self.process().await?;
        Ok(pushed)
    }

    /// Drop the stream with an error and process it.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn fail_stream(&mut self, reason: &str) -> Result<bool, SimDriverError> {
        let failed = self.runtime.driver_mut().fail_stream(reason);
        self.process().await?;
        Ok(failed)
    }

    /// Let `duration` pass and deliver one tick.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn advance(&mut self, duration: Duration) -> Result<(), SimDriverError> {
        self.env.advance(duration);
        self.runtime.driver_mut().inject_tick();
        self.process().await
    }

    /// Call an App operation directly and execute the actions it returns.
    ///
    /// # Errors
    ///
    /// - `SimDriverError::Invariant` if a render violates an invariant.
    pub async fn act<F>(&mut self, operation: F) -> Result<(), SimDriverError>
    where
        F: FnOnce(&mut App<SimInstant>, SimInstant) -> Vec<AppAction>,
    {
        let now = self.now();
        let actions = operation(self.runtime.app_mut(), now);
        self.runtime.process_actions(actions)?;
        self.process().await
    }

    /// Close the stream and stop the driver, as on quit.
    pub fn shutdown(&mut self) {
        self.runtime.shutdown();
    }

    /// Application state.
    pub fn app(&self) -> &App<SimInstant> {
        self.runtime.app()
    }

    /// Simulation driver.
    pub fn driver(&self) -> &SimDriver {
        self.runtime.driver()
    }

    /// Mutable simulation driver.
    pub fn driver_mut(&mut self) -> &mut SimDriver {
        self.runtime.driver_mut()
    }

    /// Backend model.
    pub fn backend(&self) -> &SimBackend {
        &self.backend
    }

    /// Current virtual time.
    pub fn now(&self) -> SimInstant {
        self.env.now()
    }
}
