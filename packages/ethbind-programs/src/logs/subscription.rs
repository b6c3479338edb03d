use std::{any::type_name, pin::pin};

use ethbind_core::{error, Result};
use futures::{Stream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::logs::{DecodeLog, DecodedLog, RawLog};

/// Forwards `E` events from a live log stream into `sink` on a separate task,
/// in the order the stream yields them. Logs of other events are skipped.
///
/// The task ends when the stream ends, when the receiver is dropped, on the
/// first stream or decoding fault, or when the returned [`Subscription`] is
/// cancelled. Must be called from within a tokio runtime.
pub fn watch<E, S>(logs: S, sink: mpsc::Sender<DecodedLog<E>>) -> Subscription
where
    E: DecodeLog + Send + 'static,
    S: Stream<Item = Result<RawLog>> + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let task = tokio::spawn(forward(logs, sink, cancel_token.clone()));

    Subscription {
        cancel_token,
        task: Some(task),
    }
}

async fn forward<E, S>(
    logs: S,
    sink: mpsc::Sender<DecodedLog<E>>,
    cancel_token: CancellationToken,
) -> Result<()>
where
    E: DecodeLog,
    S: Stream<Item = Result<RawLog>>,
{
    let event = type_name::<E>();
    tracing::debug!(event, "subscription started");

    let mut logs = pin!(logs);
    loop {
        let next = tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                tracing::debug!(event, "subscription cancelled");
                return Ok(());
            }
            next = logs.next() => next,
        };

        let log = match next {
            Some(Ok(log)) => log,
            Some(Err(err)) => {
                tracing::warn!(event, %err, "log stream failed");
                return Err(err);
            }
            None => {
                tracing::debug!(event, "log stream ended");
                return Ok(());
            }
        };

        if !E::is_emitted_in(&log) {
            continue;
        }

        let decoded = match DecodedLog::decode(log) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(event, %err, "failed to decode log");
                return Err(err);
            }
        };

        // A full channel must not hold up cancellation.
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                tracing::debug!(event, "subscription cancelled");
                return Ok(());
            }
            sent = sink.send(decoded) => {
                if sent.is_err() {
                    tracing::debug!(event, "receiver dropped, stopping subscription");
                    return Ok(());
                }
            }
        }
    }
}

/// Handle to a task started by [`watch`]. Dropping it cancels the task
/// without waiting for it.
#[derive(Debug)]
pub struct Subscription {
    cancel_token: CancellationToken,
    task: Option<JoinHandle<Result<()>>>,
}

impl Subscription {
    /// Cancels the subscription and waits for the forwarding task to stop.
    /// Once this returns, the log stream has been dropped and nothing more
    /// is sent to the channel.
    ///
    /// Returns the fault that ended the task, if it ended on its own with one.
    pub async fn unsubscribe(mut self) -> Result<()> {
        self.cancel_token.cancel();
        self.join_task().await
    }

    /// Waits for the forwarding task to finish on its own.
    pub async fn join(mut self) -> Result<()> {
        self.join_task().await
    }

    /// A token that cancels this subscription when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    async fn join_task(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|err| error!(Transport, "subscription task failed: {err}"))?,
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
