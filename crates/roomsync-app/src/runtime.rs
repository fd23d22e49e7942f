//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Driver`]: Platform-specific I/O

use std::time::Duration;

use tracing::{debug, info};

use crate::{App, AppAction, AppEvent, Driver};

/// Generic runtime that orchestrates App and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
pub struct Runtime<D: Driver> {
    driver: D,
    app: App<D::Instant>,
}

impl<D: Driver> Runtime<D> {
    /// Create a new runtime with the given driver.
    pub fn new(driver: D, reconnect_delay: Duration) -> Self {
        Self { driver, app: App::new(reconnect_delay) }
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Fetches the initial room list
    /// 2. Polls for events from the driver
    /// 3. Feeds them to the App and executes the resulting actions
    ///
    /// On quit the push channel is closed and the driver stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        if !self.initialize().await? {
            loop {
                if self.step().await? {
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Render the loading state and perform the initial fetch.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn initialize(&mut self) -> Result<bool, D::Error> {
        self.driver.render(&self.app)?;
        let result = self.driver.fetch_rooms().await;
        info!(ok = result.is_ok(), "initial room list fetched");
        self.process_event(AppEvent::RoomsLoaded(result))
    }

    /// Process one event, if the driver has one.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        match self.driver.poll_event().await? {
            Some(event) => self.process_event(event),
            None => Ok(false),
        }
    }

    /// Process events until the driver has none ready.
    ///
    /// Returns `true` if the application asked to quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run_until_idle(&mut self) -> Result<bool, D::Error> {
        while let Some(event) = self.driver.poll_event().await? {
            if self.process_event(event)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Feed one event to the App and execute its actions.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn process_event(&mut self, event: AppEvent) -> Result<bool, D::Error> {
        let now = self.driver.now();
        let actions = self.app.handle(event, now);
        self.process_actions(actions)
    }

    /// Execute actions returned by the App, e.g. from calling one of its
    /// operations directly.
    ///
    /// Returns `true` if should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut quit = false;
        for action in actions {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,
                AppAction::Quit => quit = true,
                AppAction::OpenStream => self.driver.open_stream(),
                AppAction::CloseStream => self.driver.close_stream(),
                AppAction::RefreshRooms { created } => self.driver.refresh_rooms(created),
                AppAction::Dispatch(dispatch) => {
                    debug!(ticket = %dispatch.ticket, command = dispatch.command.label(), "dispatching");
                    self.driver.dispatch(dispatch);
                },
            }
        }
        Ok(quit)
    }

    /// Close the push channel and stop the driver.
    pub fn shutdown(&mut self) {
        let now = self.driver.now();
        for action in self.app.stop_stream(now) {
            if action == AppAction::CloseStream {
                self.driver.close_stream();
            }
        }
        self.driver.stop();
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App<D::Instant> {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App<D::Instant> {
        &mut self.app
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
