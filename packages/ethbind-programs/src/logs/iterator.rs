use std::fmt::{Debug, Formatter};

use ethbind_core::{Error, Result};

use crate::logs::{DecodeLog, DecodedLog, RawLog};

type LogSource = Box<dyn Iterator<Item = Result<RawLog>> + Send>;

/// Pulls decoded `E` events out of a bounded range of logs.
///
/// Logs of other events are skipped. The first decoding or transport fault
/// ends the iteration and stays available through [`LogIterator::error`].
/// Not meant to be driven from more than one place at a time.
pub struct LogIterator<E> {
    logs: Option<LogSource>,
    current: Option<DecodedLog<E>>,
    error: Option<Error>,
}

impl<E: DecodeLog> LogIterator<E> {
    pub fn new<L>(logs: L) -> Self
    where
        L: IntoIterator<Item = Result<RawLog>>,
        L::IntoIter: Send + 'static,
    {
        Self {
            logs: Some(Box::new(logs.into_iter())),
            current: None,
            error: None,
        }
    }

    /// Moves to the next event. Returns `false` once the logs are exhausted,
    /// after a fault, or after [`LogIterator::close`].
    pub fn advance(&mut self) -> bool {
        self.current = None;

        let Some(logs) = self.logs.as_mut() else {
            return false;
        };

        let outcome = logs
            .find(|log| log.as_ref().map_or(true, E::is_emitted_in))
            .map(|log| log.and_then(DecodedLog::decode));

        match outcome {
            Some(Ok(decoded)) => {
                self.current = Some(decoded);
                true
            }
            Some(Err(err)) => {
                tracing::warn!(%err, "log iteration failed");
                self.error = Some(err);
                self.close();
                false
            }
            None => {
                self.close();
                false
            }
        }
    }

    /// The event reached by the last successful [`LogIterator::advance`].
    pub fn event(&self) -> Option<&DecodedLog<E>> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Releases the underlying logs. Safe to call any number of times.
    pub fn close(&mut self) {
        self.logs = None;
        self.current = None;
    }
}

impl<E: DecodeLog> Iterator for LogIterator<E> {
    type Item = Result<DecodedLog<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            self.current.take().map(Ok)
        } else {
            self.error.take().map(Err)
        }
    }
}

impl<E> Debug for LogIterator<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogIterator")
            .field("closed", &self.logs.is_none())
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::logs::test_events::{approval_log, transfer, transfer_log, Transfer};

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn advances_through_matching_logs_in_order() {
        let logs = vec![
            Ok(transfer_log(1, 2, 10)),
            Ok(approval_log()),
            Ok(transfer_log(2, 3, 20)),
        ];
        let mut iterator = LogIterator::<Transfer>::new(logs);

        let mut events = vec![];
        while iterator.advance() {
            let current = iterator.event().expect("advance returned true");
            events.push(current.event.clone());
        }

        assert_eq!(events, vec![transfer(1, 2, 10), transfer(2, 3, 20)]);
        assert!(iterator.error().is_none());
        assert!(iterator.event().is_none());
    }

    #[test]
    fn decoding_fault_is_terminal() {
        let mut truncated = transfer_log(1, 2, 10);
        truncated.data.pop();
        let logs = vec![
            Ok(transfer_log(1, 2, 10)),
            Ok(truncated),
            Ok(transfer_log(2, 3, 20)),
        ];
        let mut iterator = LogIterator::<Transfer>::new(logs);

        assert!(iterator.advance());
        assert!(!iterator.advance());
        assert!(matches!(iterator.error(), Some(Error::Decode(_))));
        assert!(!iterator.advance());
    }

    #[test]
    fn transport_fault_surfaces_as_the_error() {
        let logs = vec![
            Ok(transfer_log(1, 2, 10)),
            Err(ethbind_core::error!(Transport, "connection reset")),
        ];

        let result = LogIterator::<Transfer>::new(logs).collect::<Result<Vec<_>>>();

        let err = result.expect_err("should have failed");
        assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    }

    #[test]
    fn collects_as_an_iterator() -> Result<()> {
        let logs = vec![Ok(transfer_log(1, 2, 10)), Ok(transfer_log(2, 3, 20))];

        let events = LogIterator::<Transfer>::new(logs)
            .map(|decoded| decoded.map(|decoded| decoded.event))
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(events, vec![transfer(1, 2, 10), transfer(2, 3, 20)]);

        Ok(())
    }

    #[test]
    fn close_releases_the_logs_and_is_idempotent() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(released.clone());
        let logs = std::iter::repeat_with(|| Ok(transfer_log(1, 2, 10))).map(move |log| {
            let _flag = &flag;
            log
        });
        let mut iterator = LogIterator::<Transfer>::new(logs);

        assert!(iterator.advance());
        iterator.close();
        iterator.close();

        assert!(released.load(Ordering::SeqCst));
        assert!(!iterator.advance());
        assert!(iterator.event().is_none());
        assert!(iterator.error().is_none());
    }

    #[test]
    fn close_after_exhaustion_is_a_no_op() {
        let mut iterator = LogIterator::<Transfer>::new(Vec::new());

        assert!(!iterator.advance());
        iterator.close();

        assert!(iterator.error().is_none());
    }
}
