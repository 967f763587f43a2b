use crate::error::{Error, Result};
use crate::lifecycle::LifecycleTracker;
use crate::settings::Settings;
use idnet_core::debug;
use idnet_notify::{CorrelationKey, Correlator, EventSink, ExpectationHandle};
use idnet_protocol::envelope::StatusEvent;
use idnet_protocol::{CallbackEvent, EventType, IdpResponseView, RequestStatus};
use num_bigint::BigUint;
use std::collections::HashMap;

/// Field-level shape a scenario expects of the next status observation.
/// Unset fields are not compared.
#[derive(Clone, Debug)]
pub struct ExpectedStatus {
    pub status: RequestStatus,
    pub closed: bool,
    pub timed_out: bool,
    pub answered_idp_count: Option<u32>,
    pub response_list: Option<Vec<IdpResponseView>>,
}

impl ExpectedStatus {
    pub fn of(status: RequestStatus) -> Self {
        Self { status, closed: false, timed_out: false, answered_idp_count: None, response_list: None }
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn timed_out(mut self) -> Self {
        self.timed_out = true;
        self
    }

    pub fn with_answered(mut self, count: u32) -> Self {
        self.answered_idp_count = Some(count);
        self
    }

    pub fn with_response_list(mut self, response_list: Vec<IdpResponseView>) -> Self {
        self.response_list = Some(response_list);
        self
    }

    fn check(&self, event: &StatusEvent) -> Result<()> {
        let mismatch = |field: &'static str, expected: String, actual: String| Error::FieldMismatch {
            request_id: event.request_id.clone(),
            field,
            expected,
            actual,
        };
        if event.status != self.status {
            return Err(mismatch("status", self.status.to_string(), event.status.to_string()));
        }
        if event.closed != self.closed {
            return Err(mismatch("closed", self.closed.to_string(), event.closed.to_string()));
        }
        if event.timed_out != self.timed_out {
            return Err(mismatch("timed_out", self.timed_out.to_string(), event.timed_out.to_string()));
        }
        if let Some(answered) = self.answered_idp_count {
            if event.answered_idp_count != answered {
                return Err(mismatch("answered_idp_count", answered.to_string(), event.answered_idp_count.to_string()));
            }
        }
        if let Some(ref response_list) = self.response_list {
            if event.response_list != *response_list {
                return Err(mismatch(
                    "response_list",
                    format!("{response_list:?}"),
                    format!("{:?}", event.response_list),
                ));
            }
        }
        Ok(())
    }
}

/// Drives one conformance scenario: owns the correlator the role streams push
/// into, the per-(request, observer) lifecycle trackers, and the block-height
/// baseline fed back from each verified status observation into the next
/// ordering check.
pub struct ScenarioVerifier {
    correlator: Correlator,
    settings: Settings,
    sources: Vec<String>,
    trackers: HashMap<(String, String), LifecycleTracker>,
    last_status_height: Option<u64>,
}

impl ScenarioVerifier {
    pub fn new(name: &'static str, settings: Settings) -> Self {
        Self {
            correlator: Correlator::new(name),
            settings,
            sources: Vec::new(),
            trackers: HashMap::new(),
            last_status_height: None,
        }
    }

    /// Spawns the correlator routing task; required before any attached
    /// source is drained, irrelevant for direct publication.
    pub fn start(&self) {
        self.correlator.start();
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registers a role stream and returns its producer sink. The source is
    /// unregistered again at [`teardown`](Self::teardown).
    pub fn attach_source(&mut self, source: &str) -> EventSink {
        self.sources.push(source.to_string());
        self.correlator.attach_source(source)
    }

    /// Starts following `request_id` as observed by the `observer` node.
    pub fn track_request(&mut self, request_id: &str, observer: &str, viewer_is_requester: bool) {
        self.trackers.insert(
            (request_id.to_string(), observer.to_string()),
            LifecycleTracker::new(request_id, viewer_is_requester),
        );
    }

    /// Pins the creation height reported by `create_request_result`, so the
    /// first status observation must lie strictly above it.
    pub fn pin_creation_height(&mut self, request_id: &str, observer: &str, height: u64) -> Result<()> {
        self.tracker(request_id, observer)?.pin_creation_height(height);
        Ok(())
    }

    pub fn expect_status(&self, source: &str, request_id: &str) -> ExpectationHandle {
        self.correlator.register_scoped(source, CorrelationKey::of(EventType::RequestStatus).with_request_id(request_id))
    }

    pub fn expect_event(&self, source: &str, key: CorrelationKey) -> ExpectationHandle {
        self.correlator.register_scoped(source, key)
    }

    /// Awaits the expectation and verifies the status observation it
    /// resolved with (see [`verify_status`](Self::verify_status)).
    pub async fn await_status(&mut self, handle: &ExpectationHandle, expected: &ExpectedStatus) -> Result<StatusEvent> {
        let event = handle.wait(self.settings.callback_timeout()).await?;
        self.verify_status(&event, expected)
    }

    /// Verifies a status observation of the originating role: expected field
    /// shape, lifecycle invariants, then feeds the confirmed height into the
    /// scenario baseline.
    pub fn verify_status(&mut self, event: &CallbackEvent, expected: &ExpectedStatus) -> Result<StatusEvent> {
        let status = Self::as_status(event)?;
        expected.check(status)?;
        let progress = self.tracker(&status.request_id, &status.node_id)?.observe(status)?;
        debug!(
            "[Scenario] verified {} for request {} at height {} (material: {})",
            status.status, status.request_id, progress.height, progress.material
        );
        self.last_status_height = Some(progress.height);
        Ok(status.clone())
    }

    /// Verifies a non-originating role's view of an update already verified
    /// from the originating stream: the reported height must equal the
    /// baseline exactly, on top of the regular checks.
    pub fn verify_status_committed(&mut self, event: &CallbackEvent, expected: &ExpectedStatus) -> Result<StatusEvent> {
        let committed = self.last_status_height.ok_or(Error::NoCommittedHeight)?;
        let status = Self::as_status(event)?;
        expected.check(status)?;
        let tracker = self.tracker(&status.request_id, &status.node_id)?;
        tracker.check_committed(status, committed)?;
        tracker.observe(status)?;
        Ok(status.clone())
    }

    /// Awaits the expectation and verifies the non-originating observation it
    /// resolved with (see [`verify_status_committed`](Self::verify_status_committed)).
    pub async fn await_status_committed(
        &mut self,
        handle: &ExpectationHandle,
        expected: &ExpectedStatus,
    ) -> Result<StatusEvent> {
        let event = handle.wait(self.settings.callback_timeout()).await?;
        self.verify_status_committed(&event, expected)
    }

    /// The block-height baseline: the height of the last verified status
    /// observation, starting point of the next ordering check.
    pub fn last_status_height(&self) -> Option<u64> {
        self.last_status_height
    }

    pub async fn await_result_success(&self, handle: &ExpectationHandle) -> Result<CallbackEvent> {
        let event = handle.wait(self.settings.callback_timeout()).await?;
        match event.success() {
            Some(true) => Ok(event),
            _ => Err(Error::UnexpectedFailure { actual: event.error_code() }),
        }
    }

    pub async fn await_result_error(&self, handle: &ExpectationHandle, expected_code: u32) -> Result<CallbackEvent> {
        let event = handle.wait(self.settings.callback_timeout()).await?;
        if event.success() == Some(false) && event.error_code() == Some(expected_code) {
            Ok(event)
        } else {
            Err(Error::UnexpectedResponse { expected_code, actual: event.error_code() })
        }
    }

    /// Recomputes the consent padded hash and compares it with the value an
    /// `accessor_encrypt` callback carried.
    pub fn verify_consent_hash(
        &self,
        observed_b64: &str,
        message: &str,
        initial_salt: &str,
        request_id: &str,
        modulus: &BigUint,
    ) -> Result<()> {
        let expected =
            idnet_consent::build_padded_hash_b64(message, initial_salt, request_id, modulus, self.settings.consent_block_bits)?;
        if expected != observed_b64 {
            return Err(Error::ConsentHashMismatch);
        }
        Ok(())
    }

    /// Checks a provider consent signature against the recomputed padded hash.
    pub fn verify_consent_signature(
        &self,
        signature: &[u8],
        exponent: &BigUint,
        modulus: &BigUint,
        padded_hash: &[u8],
    ) -> Result<()> {
        if !idnet_consent::verify_consent_signature(signature, exponent, modulus, padded_hash)? {
            return Err(Error::ConsentSignatureInvalid);
        }
        Ok(())
    }

    /// Detaches every source attached by this scenario and stops the routing
    /// task, releasing all matched-but-never-consumed expectations.
    pub async fn teardown(&mut self) -> Result<()> {
        for source in self.sources.drain(..) {
            self.correlator.unregister(&source);
        }
        match self.correlator.stop().await {
            Ok(()) | Err(idnet_notify::Error::AlreadyStoppedError) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn tracker(&mut self, request_id: &str, observer: &str) -> Result<&mut LifecycleTracker> {
        self.trackers
            .get_mut(&(request_id.to_string(), observer.to_string()))
            .ok_or_else(|| Error::UntrackedRequest { request_id: request_id.to_string(), observer: observer.to_string() })
    }

    fn as_status(event: &CallbackEvent) -> Result<&StatusEvent> {
        event.as_status().ok_or_else(|| Error::FieldMismatch {
            request_id: event.request_id().unwrap_or_default().to_string(),
            field: "type",
            expected: EventType::RequestStatus.to_string(),
            actual: event.event_type().to_string(),
        })
    }
}
