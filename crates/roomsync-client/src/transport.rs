//! HTTP transport for the client.
//!
//! Provides [`HttpBackend`], which performs command and fetch exchanges, and
//! [`connect_stream`], which runs the push channel on a background task and
//! reports [`StreamSignal`]s over a channel. This is a thin layer that only
//! moves bytes; reconnect policy stays in the Sans-IO [`crate::UpdateStream`].

use std::future::Future;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use roomsync_proto::{EventStreamDecoder, Method, Route};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    backend::{Backend, Request, Response},
    config::ClientConfig,
    error::TransportError,
    stream::StreamSignal,
};

/// [`Backend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    /// Build a backend for `config.base_url`.
    ///
    /// # Errors
    ///
    /// - `TransportError::Connection` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Connection(format!("client setup failed: {e}")))?;
        Ok(Self { client, config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Backend for HttpBackend {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        let url = self.config.url(&request.path);
        let client = self.client.clone();

        async move {
            let builder = match request.method {
                Method::Get => client.get(&url),
                Method::Post => client.post(&url),
            };
            let builder = match &request.body {
                Some(body) => builder.json(body),
                None => builder,
            };

            let response = builder.send().await.map_err(classify)?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Request(format!("body read failed: {e}")))?;

            debug!(method = %request.method, %url, status, "exchange complete");
            Ok(Response { status, body: body.to_vec() })
        }
    }
}

/// Handle to a running push channel.
///
/// Dropping the handle stops the channel task.
#[derive(Debug)]
pub struct StreamConnection {
    signals: mpsc::Receiver<StreamSignal>,
    abort_handle: tokio::task::AbortHandle,
}

impl StreamConnection {
    /// Next signal. `None` once the task has finished and every signal has
    /// been received.
    pub async fn recv(&mut self) -> Option<StreamSignal> {
        self.signals.recv().await
    }

    /// Stop the channel task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Open the push channel on a background task.
///
/// The task reports `Opened`, then one `Message` per event, then exactly one
/// of `Closed` or `Failed`. Must be called within a tokio runtime.
pub fn connect_stream(backend: &HttpBackend) -> StreamConnection {
    let (tx, rx) = mpsc::channel(32);
    let url = backend.config.url(&Route::Stream.path());
    let handle = tokio::spawn(run_stream(backend.client.clone(), url, tx));

    StreamConnection { signals: rx, abort_handle: handle.abort_handle() }
}

async fn run_stream(client: reqwest::Client, url: String, tx: mpsc::Sender<StreamSignal>) {
    let last = match pump_events(&client, &url, &tx).await {
        Ok(()) => StreamSignal::Closed,
        Err(err) => StreamSignal::Failed(err.to_string()),
    };
    // Receiver gone means the driver already stopped caring.
    let _ = tx.send(last).await;
}

async fn pump_events(
    client: &reqwest::Client,
    url: &str,
    tx: &mpsc::Sender<StreamSignal>,
) -> Result<(), TransportError> {
    let response =
        client.get(url).header(ACCEPT, "text/event-stream").send().await.map_err(classify)?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status { status: status.as_u16() });
    }
    if tx.send(StreamSignal::Opened).await.is_err() {
        return Ok(());
    }

    let mut decoder = EventStreamDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| TransportError::Stream(e.to_string()))?;
        let events = match decoder.feed(&chunk) {
            Ok(events) => events,
            Err(err) => {
                warn!(error = %err, "discarding oversized stream line");
                continue;
            },
        };
        for event in events {
            if tx.send(StreamSignal::Message(event.data)).await.is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() || err.is_timeout() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
