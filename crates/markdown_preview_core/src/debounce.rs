use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

// If the timer isn't active, it will be set to expire "never",
// which is actually just 1 year in the future.
const NEVER: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug)]
enum DebounceEvent<T> {
    Call(T),
    Cancel,
}

/// Collapses bursts of calls into one callback invocation.
///
/// Each [`Debouncer::call`] replaces the pending value and restarts the quiet
/// interval; the callback runs with the last value once the interval passes
/// without another call. Callbacks are spawned, so a slow one does not delay
/// the next.
#[derive(Debug)]
pub struct Debouncer<T> {
    event_sender: UnboundedSender<DebounceEvent<T>>,
}

impl<T> Clone for Debouncer<T> {
    fn clone(&self) -> Self {
        Self {
            event_sender: self.event_sender.clone(),
        }
    }
}

impl<T: Send + 'static> Debouncer<T> {
    /// Start the debounce loop. Must be called within a tokio runtime.
    ///
    /// The loop stops once every handle is dropped; a pending value is then
    /// discarded.
    pub fn spawn<F, Fut>(delay: Duration, callback: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (event_sender, event_receiver) = unbounded_channel();
        tokio::spawn(run_debounce_loop(delay, event_receiver, callback));
        Self { event_sender }
    }

    pub fn call(&self, value: T) {
        let _ = self.event_sender.send(DebounceEvent::Call(value));
    }

    /// Drop the pending value, if any.
    pub fn cancel(&self) {
        let _ = self.event_sender.send(DebounceEvent::Cancel);
    }
}

async fn run_debounce_loop<T, F, Fut>(
    delay: Duration,
    mut events: UnboundedReceiver<DebounceEvent<T>>,
    mut callback: F,
) where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut pending = None;
    let timer = tokio::time::sleep(NEVER);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(DebounceEvent::Call(value)) => {
                        pending.replace(value);
                        timer.as_mut().reset(Instant::now() + delay);
                    }
                    Some(DebounceEvent::Cancel) => {
                        pending.take();
                        timer.as_mut().reset(Instant::now() + NEVER);
                    }
                    None => break,
                }
            }
            _ = timer.as_mut(), if pending.is_some() => {
                timer.as_mut().reset(Instant::now() + NEVER);
                if let Some(value) = pending.take() {
                    tokio::spawn(callback(value));
                }
            }
        }
    }

    tracing::trace!("Debounce loop exited");
}
