//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. Network uses reqwest through
//! [`HttpBackend`]; commands and refreshes run concurrently and their results
//! come back through [`Driver::poll_event`] in completion order. Time comes
//! from [`SystemEnv`].

use std::{
    future::Future,
    io::{self, Stdout, stdout},
    time::{Duration, Instant},
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::{
    StreamExt,
    future::BoxFuture,
    stream::FuturesUnordered,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use roomsync_app::{App, AppEvent, Dispatch, Driver, KeyInput};
use roomsync_client::{
    ClientConfig, CommandClient, StreamSignal, TransportError,
    transport::{HttpBackend, StreamConnection, connect_stream},
};
use roomsync_core::{CollectionSnapshot, Environment, RoomId, SystemEnv};
use thiserror::Error;
use tracing::{debug, info};

use crate::ui;

/// Period of [`AppEvent::Tick`]; bounds how late a reconnect can fire.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport setup error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The terminal stopped delivering input.
    #[error("terminal input closed")]
    InputClosed,
}

/// What woke the driver.
enum Wake {
    Input(Option<io::Result<Event>>),
    Completed(AppEvent),
    Signal(Option<StreamSignal>),
    Tick,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui), and backend
/// communication (reqwest). Owns at most one push channel.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    client: CommandClient<HttpBackend>,
    inflight: FuturesUnordered<BoxFuture<'static, AppEvent>>,
    stream: Option<StreamConnection>,
    env: SystemEnv,
    next_tick: Instant,
}

impl TerminalDriver {
    /// Create a new terminal driver talking to `config.base_url`.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self, TerminalError> {
        let backend = HttpBackend::new(config)?;

        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        let env = SystemEnv::new();

        Ok(Self {
            terminal,
            event_stream: EventStream::new(),
            client: CommandClient::new(backend),
            inflight: FuturesUnordered::new(),
            stream: None,
            next_tick: env.now() + TICK_INTERVAL,
            env,
        })
    }

    /// Convert crossterm `KeyCode` to `KeyInput`.
    fn convert_key(code: KeyCode) -> Option<KeyInput> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }
}

async fn next_signal(stream: Option<&mut StreamConnection>) -> Option<StreamSignal> {
    match stream {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send {
        let Self { event_stream, inflight, stream, env, next_tick, .. } = self;
        let env = *env;
        let until_tick = next_tick.saturating_duration_since(env.now());

        async move {
            let wake = tokio::select! {
                maybe_event = event_stream.next() => Wake::Input(maybe_event),
                Some(event) = inflight.next(), if !inflight.is_empty() => Wake::Completed(event),
                signal = next_signal(stream.as_mut()) => Wake::Signal(signal),
                () = env.sleep(until_tick) => Wake::Tick,
            };

            match wake {
                Wake::Input(Some(Ok(Event::Key(key)))) if key.kind == KeyEventKind::Press => {
                    Ok(Self::convert_key(key.code).map(AppEvent::Key))
                },
                Wake::Input(Some(Ok(Event::Resize(cols, rows)))) => {
                    Ok(Some(AppEvent::Resize(cols, rows)))
                },
                Wake::Input(Some(Ok(_))) => Ok(None),
                Wake::Input(Some(Err(e))) => Err(TerminalError::Io(e)),
                Wake::Input(None) => Err(TerminalError::InputClosed),
                Wake::Completed(event) => Ok(Some(event)),
                Wake::Signal(Some(signal)) => Ok(Some(AppEvent::Stream(signal))),
                Wake::Signal(None) => {
                    // Task finished after its final signal.
                    *stream = None;
                    Ok(None)
                },
                Wake::Tick => {
                    *next_tick = env.now() + TICK_INTERVAL;
                    Ok(Some(AppEvent::Tick))
                },
            }
        }
    }

    fn fetch_rooms(
        &mut self,
    ) -> impl Future<Output = Result<CollectionSnapshot, TransportError>> + Send {
        let client = self.client.clone();
        async move { client.fetch_rooms().await }
    }

    fn refresh_rooms(&mut self, created: Option<RoomId>) {
        let client = self.client.clone();
        self.inflight.push(Box::pin(async move {
            let result = client.fetch_rooms().await;
            AppEvent::RoomsRefreshed { created, result }
        }));
    }

    fn dispatch(&mut self, dispatch: Dispatch) {
        let client = self.client.clone();
        self.inflight.push(Box::pin(async move {
            let result = client.execute(dispatch.command).await;
            AppEvent::CommandCompleted { ticket: dispatch.ticket, result }
        }));
    }

    fn open_stream(&mut self) {
        if let Some(old) = self.stream.take() {
            old.stop();
        }
        info!(url = %self.client.backend().config().base_url, "opening update stream");
        self.stream = Some(connect_stream(self.client.backend()));
    }

    fn close_stream(&mut self) {
        if let Some(connection) = self.stream.take() {
            debug!("closing update stream");
            connection.stop();
        }
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App<Instant>) -> Result<(), Self::Error> {
        let now = self.env.now();
        self.terminal.draw(|frame| {
            ui::render(frame, app, now);
        })?;
        Ok(())
    }

    fn stop(&mut self) {
        self.close_stream();
        self.inflight.clear();
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
