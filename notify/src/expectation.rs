use crate::error::{Error, Result};
use crate::key::CorrelationKey;
use idnet_protocol::CallbackEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use triggered::{Listener, Trigger};

pub type ExpectationId = u64;

#[derive(Clone, Debug)]
enum State {
    Pending,
    Resolved(CallbackEvent),
    /// The waiter already reported a timeout; later matches are ignored.
    Lapsed,
}

/// A registered expectation: resolved at most once, by the first published
/// event its key matches.
#[derive(Debug)]
pub(crate) struct Expectation {
    id: ExpectationId,
    source: Option<String>,
    key: CorrelationKey,
    state: Mutex<State>,
    trigger: Trigger,
    listener: Listener,
}

impl Expectation {
    pub fn new(id: ExpectationId, source: Option<String>, key: CorrelationKey) -> Self {
        let (trigger, listener) = triggered::trigger();
        Self { id, source, key, state: Mutex::new(State::Pending), trigger, listener }
    }

    pub fn id(&self) -> ExpectationId {
        self.id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    pub fn matches(&self, event: &CallbackEvent) -> bool {
        self.key.matches(event)
    }

    /// Attempts the `Pending -> Resolved` transition. Returns whether this
    /// call performed it; a resolved or lapsed expectation is left untouched.
    pub fn resolve(&self, event: &CallbackEvent) -> bool {
        let mut state = self.state.lock();
        match *state {
            State::Pending => {
                *state = State::Resolved(event.clone());
                self.trigger.trigger();
                true
            }
            _ => false,
        }
    }
}

/// Caller-side handle of a registered [`Expectation`].
#[derive(Clone, Debug)]
pub struct ExpectationHandle {
    inner: Arc<Expectation>,
}

impl ExpectationHandle {
    pub(crate) fn new(inner: Arc<Expectation>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> ExpectationId {
        self.inner.id()
    }

    pub fn key(&self) -> &CorrelationKey {
        self.inner.key()
    }

    /// Suspends until the expectation resolves or `timeout` elapses.
    ///
    /// On timeout the expectation transitions to lapsed, so an event arriving
    /// later can never surface a resolution that was already reported as
    /// timed out.
    pub async fn wait(&self, timeout: Duration) -> Result<CallbackEvent> {
        if tokio::time::timeout(timeout, self.inner.listener.clone()).await.is_ok() {
            let state = self.inner.state.lock();
            match *state {
                State::Resolved(ref event) => return Ok(event.clone()),
                // The trigger only fires on resolution
                _ => return Err(Error::General(format!("expectation {} triggered while unresolved", self.inner.id()))),
            }
        }
        let mut state = self.inner.state.lock();
        match *state {
            // Resolution raced the timeout boundary: the event wins
            State::Resolved(ref event) => Ok(event.clone()),
            _ => {
                *state = State::Lapsed;
                Err(Error::WaitTimeout(self.inner.key().to_string(), timeout))
            }
        }
    }
}
