use crate::error::{Error, Result};
use idnet_core::trace;
use idnet_protocol::envelope::StatusEvent;
use idnet_protocol::{Mode, RequestStatus};
use std::collections::HashMap;

/// What a verified observation changed, fed back into the scenario baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Status or response accounting materially changed since the previous
    /// observation by this role.
    pub material: bool,
    pub height: u64,
}

/// Per-request, per-observing-role lifecycle state and the invariants every
/// observed status sequence must satisfy.
///
/// One tracker instance follows one `request_id` as seen by one role stream;
/// heights are only ordered within that stream, while cross-role consistency
/// is checked against the committed height via [`check_committed`](Self::check_committed).
#[derive(Debug)]
pub struct LifecycleTracker {
    request_id: String,
    viewer_is_requester: bool,
    chain_id: Option<String>,
    last_status: Option<RequestStatus>,
    last_height: Option<u64>,
    last_answered: u32,
    last_response_count: usize,
    // service_id -> (signed_data_count, received_data_count)
    accounting: HashMap<String, (u32, u32)>,
    closed: bool,
    timed_out: bool,
}

impl LifecycleTracker {
    pub fn new(request_id: impl Into<String>, viewer_is_requester: bool) -> Self {
        Self {
            request_id: request_id.into(),
            viewer_is_requester,
            chain_id: None,
            last_status: None,
            last_height: None,
            last_answered: 0,
            last_response_count: 0,
            accounting: HashMap::new(),
            closed: false,
            timed_out: false,
        }
    }

    /// Pins the creation height so that the first status observation must
    /// already lie strictly above it.
    pub fn pin_creation_height(&mut self, height: u64) {
        self.last_height = Some(height);
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_terminal(&self) -> bool {
        self.closed || self.timed_out
    }

    /// Validates one status observation against the lifecycle invariants and
    /// folds it into the tracked state.
    pub fn observe(&mut self, event: &StatusEvent) -> Result<Progress> {
        if event.request_id != self.request_id {
            return Err(Error::FieldMismatch {
                request_id: self.request_id.clone(),
                field: "request_id",
                expected: self.request_id.clone(),
                actual: event.request_id.clone(),
            });
        }
        if self.is_terminal() {
            return Err(Error::EventAfterTerminal { request_id: self.request_id.clone() });
        }
        if event.closed && event.timed_out {
            return Err(Error::ConflictingTerminalMarkers { request_id: self.request_id.clone() });
        }
        if event.closed && event.status == RequestStatus::Pending {
            return Err(Error::FieldMismatch {
                request_id: self.request_id.clone(),
                field: "closed",
                expected: "a post-pending status".to_string(),
                actual: event.status.to_string(),
            });
        }

        match self.chain_id {
            None => self.chain_id = Some(event.block_height.chain_id().to_string()),
            Some(ref pinned) if pinned != event.block_height.chain_id() => {
                return Err(Error::ChainMismatch {
                    request_id: self.request_id.clone(),
                    pinned: pinned.clone(),
                    actual: event.block_height.chain_id().to_string(),
                });
            }
            Some(_) => {}
        }

        if let Some(last) = self.last_status {
            if !last.can_transition_to(event.status) {
                return Err(Error::IllegalTransition { request_id: self.request_id.clone(), from: last, to: event.status });
            }
        }

        let material = self.check_accounting(event)?;
        self.check_redaction(event)?;

        let height = event.block_height.height();
        if let Some(last) = self.last_height {
            if material && height <= last {
                return Err(Error::HeightNotAdvanced { request_id: self.request_id.clone(), last, actual: height });
            }
            if !material && height < last {
                return Err(Error::HeightRegression { request_id: self.request_id.clone(), last, actual: height });
            }
        }

        trace!(
            "[Lifecycle-{}] {} at {} (material: {material}, closed: {}, timed_out: {})",
            self.request_id, event.status, event.block_height, event.closed, event.timed_out
        );

        self.last_status = Some(event.status);
        self.last_height = Some(height);
        self.last_answered = event.answered_idp_count;
        self.last_response_count = event.response_list.len();
        for service in &event.service_list {
            self.accounting.insert(service.service_id.clone(), (service.signed_data_count, service.received_data_count));
        }
        self.closed = event.closed;
        self.timed_out = event.timed_out;

        Ok(Progress { material, height })
    }

    /// Cross-role consistency: a non-originating role observing the same
    /// ledger-committed update must report exactly the committed height.
    pub fn check_committed(&self, event: &StatusEvent, committed: u64) -> Result<()> {
        let actual = event.block_height.height();
        if actual != committed {
            return Err(Error::HeightDrift { request_id: self.request_id.clone(), committed, actual });
        }
        Ok(())
    }

    /// Monotonicity of the response accounting; reports whether anything
    /// materially changed.
    fn check_accounting(&self, event: &StatusEvent) -> Result<bool> {
        if event.answered_idp_count < self.last_answered {
            return Err(Error::AccountingRegression {
                request_id: self.request_id.clone(),
                field: "answered_idp_count",
                last: self.last_answered as u64,
                actual: event.answered_idp_count as u64,
            });
        }
        if event.response_list.len() < self.last_response_count {
            return Err(Error::AccountingRegression {
                request_id: self.request_id.clone(),
                field: "response_list",
                last: self.last_response_count as u64,
                actual: event.response_list.len() as u64,
            });
        }
        let mut accounting_changed = false;
        for service in &event.service_list {
            let (last_signed, last_received) = self.accounting.get(&service.service_id).copied().unwrap_or((0, 0));
            if service.signed_data_count < last_signed {
                return Err(Error::AccountingRegression {
                    request_id: self.request_id.clone(),
                    field: "signed_data_count",
                    last: last_signed as u64,
                    actual: service.signed_data_count as u64,
                });
            }
            if service.received_data_count < last_received {
                return Err(Error::AccountingRegression {
                    request_id: self.request_id.clone(),
                    field: "received_data_count",
                    last: last_received as u64,
                    actual: service.received_data_count as u64,
                });
            }
            accounting_changed |= service.signed_data_count > last_signed || service.received_data_count > last_received;
        }

        let material = self.last_status != Some(event.status)
            || event.answered_idp_count > self.last_answered
            || event.response_list.len() > self.last_response_count
            || accounting_changed;
        Ok(material)
    }

    /// The redaction rule must hold for every element of the response list,
    /// identically for every observing role.
    fn check_redaction(&self, event: &StatusEvent) -> Result<()> {
        if self.viewer_is_requester && event.mode != Mode::M1 {
            return Ok(());
        }
        for (index, view) in event.response_list.iter().enumerate() {
            if view.valid_signature.is_some() {
                return Err(Error::RedactionViolation { request_id: self.request_id.clone(), index, field: "valid_signature" });
            }
            if view.valid_ial.is_some() {
                return Err(Error::RedactionViolation { request_id: self.request_id.clone(), index, field: "valid_ial" });
            }
        }
        Ok(())
    }
}
