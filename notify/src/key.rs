use idnet_protocol::{CallbackEvent, EventType};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&CallbackEvent) -> bool + Send + Sync>;

/// Predicate over an incoming event's fields.
///
/// A key always matches on the event type; any of the common correlation
/// fields may be pinned in addition, and scenario-specific conditions that
/// reach into the event body (e.g. "first response is signed") are expressed
/// through [`with_predicate`](Self::with_predicate).
///
/// A key is exclusively owned by the expectation that registered it.
#[derive(Clone)]
pub struct CorrelationKey {
    event_type: EventType,
    request_id: Option<String>,
    reference_id: Option<String>,
    node_id: Option<String>,
    predicate: Option<Predicate>,
}

impl CorrelationKey {
    pub fn of(event_type: EventType) -> Self {
        Self { event_type, request_id: None, reference_id: None, node_id: None, predicate: None }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CallbackEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn matches(&self, event: &CallbackEvent) -> bool {
        if event.event_type() != self.event_type {
            return false;
        }
        if let Some(ref request_id) = self.request_id {
            if event.request_id() != Some(request_id.as_str()) {
                return false;
            }
        }
        if let Some(ref reference_id) = self.reference_id {
            if event.reference_id() != Some(reference_id.as_str()) {
                return false;
            }
        }
        if let Some(ref node_id) = self.node_id {
            if event.node_id() != node_id.as_str() {
                return false;
            }
        }
        match self.predicate {
            Some(ref predicate) => predicate(event),
            None => true,
        }
    }
}

impl Debug for CorrelationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationKey")
            .field("event_type", &self.event_type)
            .field("request_id", &self.request_id)
            .field("reference_id", &self.reference_id)
            .field("node_id", &self.node_id)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Display for CorrelationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_type)?;
        if let Some(ref request_id) = self.request_id {
            write!(f, " request_id={request_id}")?;
        }
        if let Some(ref reference_id) = self.reference_id {
            write!(f, " reference_id={reference_id}")?;
        }
        if let Some(ref node_id) = self.node_id {
            write!(f, " node_id={node_id}")?;
        }
        if self.predicate.is_some() {
            write!(f, " +predicate")?;
        }
        Ok(())
    }
}
