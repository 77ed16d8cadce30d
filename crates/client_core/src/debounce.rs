use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Last-writer-wins debounce state with the clock passed in.
///
/// A pushed value replaces any value still waiting, restarting the quiet
/// period, so at most one deadline is pending at a time.
#[derive(Debug, Clone)]
pub struct DebouncedValue<T> {
    committed: T,
    pending: Option<(T, Instant)>,
    delay: Duration,
}

impl<T: Clone> DebouncedValue<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            committed: initial,
            pending: None,
            delay,
        }
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Commits the waiting value once its deadline has passed; returns the
    /// newly committed value, or `None` if nothing was committed.
    pub fn poll(&mut self, now: Instant) -> Option<&T> {
        match self.pending.take() {
            Some((value, deadline)) if deadline <= now => {
                self.committed = value;
                Some(&self.committed)
            }
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub fn value(&self) -> &T {
        &self.committed
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Write side of a spawned debouncer. Dropping it stops the task and
/// discards whatever is still waiting.
#[derive(Debug, Clone)]
pub struct DebounceInput<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> DebounceInput<T> {
    /// Returns `false` once the debouncer has stopped.
    pub fn set(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Runs a [`DebouncedValue`] on a tokio task. Committed values are published
/// on the returned receiver, which only observes actual changes.
pub fn spawn_debouncer<T>(initial: T, delay: Duration) -> (DebounceInput<T>, watch::Receiver<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<T>();
    let (out_tx, out_rx) = watch::channel(initial.clone());

    tokio::spawn(async move {
        let mut state = DebouncedValue::new(initial, delay);
        loop {
            let deadline = state.deadline();
            tokio::select! {
                value = rx.recv() => match value {
                    Some(value) => state.push(value, Instant::now()),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(value) = state.poll(Instant::now()) {
                        let value = value.clone();
                        out_tx.send_if_modified(|current| {
                            if *current == value {
                                false
                            } else {
                                *current = value;
                                true
                            }
                        });
                    }
                }
                _ = out_tx.closed() => break,
            }
        }
    });

    (DebounceInput { tx }, out_rx)
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
