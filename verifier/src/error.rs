use idnet_protocol::{BlockHeightError, RequestStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Notify(#[from] idnet_notify::Error),

    #[error(transparent)]
    Consent(#[from] idnet_consent::Error),

    #[error(transparent)]
    BlockHeight(#[from] BlockHeightError),

    #[error("request {request_id}: illegal status transition {from} -> {to}")]
    IllegalTransition { request_id: String, from: RequestStatus, to: RequestStatus },

    #[error("request {request_id}: {field} expected {expected}, got {actual}")]
    FieldMismatch { request_id: String, field: &'static str, expected: String, actual: String },

    #[error("request {request_id}: height regressed from {last} to {actual}")]
    HeightRegression { request_id: String, last: u64, actual: u64 },

    #[error("request {request_id}: material change requires a height above {last}, got {actual}")]
    HeightNotAdvanced { request_id: String, last: u64, actual: u64 },

    #[error("request {request_id}: observer height {actual} drifted from committed height {committed}")]
    HeightDrift { request_id: String, committed: u64, actual: u64 },

    #[error("request {request_id}: observed on chain {actual} but pinned to {pinned}")]
    ChainMismatch { request_id: String, pinned: String, actual: String },

    #[error("request {request_id}: status event observed after a terminal configuration")]
    EventAfterTerminal { request_id: String },

    #[error("request {request_id}: closed and timed_out are mutually exclusive")]
    ConflictingTerminalMarkers { request_id: String },

    #[error("request {request_id}: {field} shrank from {last} to {actual}")]
    AccountingRegression { request_id: String, field: &'static str, last: u64, actual: u64 },

    #[error("request {request_id}: response {index} exposes {field} to a non-requester or mode-1 viewer")]
    RedactionViolation { request_id: String, index: usize, field: &'static str },

    #[error("request {request_id} is not tracked for observer {observer}")]
    UntrackedRequest { request_id: String, observer: String },

    #[error("no committed height to check a non-originating observation against")]
    NoCommittedHeight,

    #[error("result reported failure with code {actual:?} where success was expected")]
    UnexpectedFailure { actual: Option<u32> },

    #[error("expected result with error code {expected_code}, got {actual:?}")]
    UnexpectedResponse { expected_code: u32, actual: Option<u32> },

    #[error("recomputed consent padded hash disagrees with the observed value")]
    ConsentHashMismatch,

    #[error("consent signature failed raw-RSA verification")]
    ConsentSignatureInvalid,
}

pub type Result<T> = std::result::Result<T, Error>;
