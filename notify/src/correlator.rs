use crate::error::{Error, Result};
use crate::expectation::{Expectation, ExpectationHandle, ExpectationId};
use crate::key::CorrelationKey;
use async_channel::{Receiver, Sender, unbounded};
use futures::{FutureExt, select};
use idnet_core::{debug, trace};
use idnet_protocol::CallbackEvent;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use triggered::{Listener, Trigger};

/// Sending side of a correlator source channel, handed to the producer of one
/// role's callback stream.
#[derive(Clone, Debug)]
pub struct EventSink {
    source: String,
    sender: Sender<(String, CallbackEvent)>,
}

impl EventSink {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn send(&self, event: CallbackEvent) -> Result<()> {
        self.sender.try_send((self.source.clone(), event))?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    /// Events accepted for matching.
    pub routed: u64,
    /// Expectations resolved (one event may resolve several).
    pub resolved: u64,
    /// Events that resolved nothing, including events of detached sources.
    pub dropped: u64,
}

/// A scenario-scoped correlation broker.
///
/// Producers either hand events to [`publish`](Correlator::publish) directly
/// or push them through the [`EventSink`] channel of an attached source, in
/// which case a routing task owned by the correlator performs the matching.
/// Every operation except [`ExpectationHandle::wait`] is non-blocking.
#[derive(Clone, Debug)]
pub struct Correlator {
    inner: Arc<Inner>,
}

impl Correlator {
    pub fn new(name: &'static str) -> Self {
        Self { inner: Arc::new(Inner::new(name)) }
    }

    /// Spawns the routing task draining attached source channels. Must be
    /// called from within a tokio runtime; callers relying solely on
    /// [`publish`](Self::publish) do not need it.
    pub fn start(&self) {
        self.inner.clone().spawn_routing_task();
    }

    /// Registers a source and returns the sink its producer pushes into.
    /// Re-attaching an already active source returns a fresh sink for the
    /// same stream.
    pub fn attach_source(&self, source: &str) -> EventSink {
        self.inner.active_sources.lock().insert(source.to_string());
        trace!("[Correlator-{}] attached source {}", self.inner.name, source);
        EventSink { source: source.to_string(), sender: self.inner.ingress_sender.clone() }
    }

    /// Creates a pending expectation for `key`, not tied to any source.
    pub fn register(&self, key: CorrelationKey) -> ExpectationHandle {
        self.inner.register(None, key)
    }

    /// Creates a pending expectation discarded when `source` is unregistered.
    pub fn register_scoped(&self, source: &str, key: CorrelationKey) -> ExpectationHandle {
        self.inner.register(Some(source.to_string()), key)
    }

    /// Delivers `event` to every currently pending expectation whose key
    /// matches; each of them resolves with this event exactly once.
    pub fn publish(&self, event: &CallbackEvent) {
        self.inner.route(event);
    }

    /// Detaches `source`: its queued and future events are dropped and the
    /// expectations registered under its scope are discarded. Unknown sources
    /// are ignored.
    pub fn unregister(&self, source: &str) {
        if self.inner.active_sources.lock().remove(source) {
            let mut expectations = self.inner.expectations.lock();
            let before = expectations.len();
            expectations.retain(|_, expectation| expectation.source() != Some(source));
            trace!(
                "[Correlator-{}] unregistered source {} and discarded {} expectations",
                self.inner.name,
                source,
                before - expectations.len()
            );
        }
    }

    pub fn stats(&self) -> CorrelatorStats {
        self.inner.stats()
    }

    /// Stops the routing task. Idempotence is reported, not silent: a second
    /// stop returns [`Error::AlreadyStoppedError`].
    pub async fn stop(&self) -> Result<()> {
        if self.inner.started.compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(Error::AlreadyStoppedError);
        }
        self.inner.shutdown_trigger.trigger();
        self.inner.terminated_listener.clone().await;
        Ok(())
    }
}

#[derive(Debug)]
struct Inner {
    name: &'static str,
    started: AtomicBool,
    next_id: AtomicU64,
    expectations: Mutex<HashMap<ExpectationId, Arc<Expectation>>>,
    active_sources: Mutex<HashSet<String>>,
    ingress_sender: Sender<(String, CallbackEvent)>,
    ingress_receiver: Receiver<(String, CallbackEvent)>,
    shutdown_trigger: Trigger,
    shutdown_listener: Listener,
    terminated_trigger: Trigger,
    terminated_listener: Listener,
    routed: AtomicU64,
    resolved: AtomicU64,
    dropped: AtomicU64,
}

impl Inner {
    fn new(name: &'static str) -> Self {
        let (ingress_sender, ingress_receiver) = unbounded();
        let (shutdown_trigger, shutdown_listener) = triggered::trigger();
        let (terminated_trigger, terminated_listener) = triggered::trigger();
        Self {
            name,
            started: AtomicBool::default(),
            next_id: AtomicU64::new(1),
            expectations: Mutex::new(HashMap::new()),
            active_sources: Mutex::new(HashSet::new()),
            ingress_sender,
            ingress_receiver,
            shutdown_trigger,
            shutdown_listener,
            terminated_trigger,
            terminated_listener,
            routed: AtomicU64::default(),
            resolved: AtomicU64::default(),
            dropped: AtomicU64::default(),
        }
    }

    fn register(&self, source: Option<String>, key: CorrelationKey) -> ExpectationHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let expectation = Arc::new(Expectation::new(id, source, key));
        self.expectations.lock().insert(id, expectation.clone());
        trace!("[Correlator-{}] registered expectation {} for {}", self.name, id, expectation.key());
        ExpectationHandle::new(expectation)
    }

    fn route(&self, event: &CallbackEvent) {
        self.routed.fetch_add(1, Ordering::Relaxed);
        let mut resolved = 0;
        {
            let expectations = self.expectations.lock();
            for expectation in expectations.values() {
                if expectation.matches(event) && expectation.resolve(event) {
                    trace!("[Correlator-{}] resolved expectation {} with {}", self.name, expectation.id(), event);
                    resolved += 1;
                }
            }
        }
        if resolved == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("[Correlator-{}] no pending expectation for {}", self.name, event);
        } else {
            self.resolved.fetch_add(resolved, Ordering::Relaxed);
        }
    }

    fn spawn_routing_task(self: Arc<Self>) {
        // The task can only be spawned once
        if self.started.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return;
        }
        trace!("[Correlator-{}] starting event routing task", self.name);
        tokio::spawn(async move {
            loop {
                select! {
                    _ = self.shutdown_listener.clone().fuse() => break,
                    item = self.ingress_receiver.recv().fuse() => {
                        match item {
                            Ok((source, event)) => {
                                if self.active_sources.lock().contains(&source) {
                                    self.route(&event);
                                } else {
                                    self.dropped.fetch_add(1, Ordering::Relaxed);
                                    trace!("[Correlator-{}] dropping {} from detached source {}", self.name, event, source);
                                }
                            }
                            Err(_) => break,
                        }
                    }
                }
            }
            let stats = self.stats();
            debug!(
                "[Correlator-{}] routing task exiting: {} routed, {} resolved, {} dropped",
                self.name, stats.routed, stats.resolved, stats.dropped
            );
            self.terminated_trigger.trigger();
        });
    }

    fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            routed: self.routed.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
