use std::{fmt::Display, sync::Arc};

use futures::{Stream, StreamExt};
use shared::protocol::LogEvent;
use tokio::{sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::store::FleetStore;

/// Subscription to the inventory service's activity log socket.
///
/// A single task owns the socket and appends every well-formed event to the
/// [`FleetStore`] log. Transport problems end the task quietly (they are
/// traced, never surfaced to the caller); there is no reconnect. Closing or
/// dropping the handle stops delivery.
pub struct LogChannel {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LogChannel {
    /// Starts connecting to `url` in the background. Must be called from
    /// within a Tokio runtime.
    pub fn open(url: impl Into<String>, store: Arc<FleetStore>) -> Self {
        let url = url.into();
        Self::spawn(store, move |store| async move {
            let (ws_stream, _) = match connect_async(url.as_str()).await {
                Ok(connected) => connected,
                Err(err) => {
                    warn!(%url, error = %err, "log channel: connect failed");
                    return;
                }
            };
            info!(%url, "log channel: connected");
            let (_, ws_reader) = ws_stream.split();
            pump_frames(ws_reader, &store).await;
            info!(%url, "log channel: closed");
        })
    }

    /// Forwards an already established frame stream. Used by [`Self::open`]
    /// and by callers that bring their own transport.
    pub fn from_stream<S, E>(frames: S, store: Arc<FleetStore>) -> Self
    where
        S: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
    {
        Self::spawn(store, move |store| async move {
            pump_frames(frames, &store).await;
        })
    }

    fn spawn<F, Fut>(store: Arc<FleetStore>, run: F) -> Self
    where
        F: FnOnce(Arc<FleetStore>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let session = run(store);
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => debug!("log channel: shutdown requested"),
                _ = session => {}
            }
        });
        Self {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the subscription and waits for the forwarding task to exit; no
    /// event is appended after this returns.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LogChannel {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn pump_frames<S, E>(mut frames: S, store: &FleetStore)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Text(text)) => deliver(store, &text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "log channel: receive failed");
                break;
            }
        }
    }
}

/// Appends one raw frame to the store log. Frames that are not log events
/// are dropped.
fn deliver(store: &FleetStore, raw: &str) {
    match serde_json::from_str::<LogEvent>(raw) {
        Ok(event) => store.append_log(event.message, event.level),
        Err(err) => debug!(error = %err, "log channel: dropping malformed event"),
    }
}

#[cfg(test)]
#[path = "tests/log_channel_tests.rs"]
mod tests;
