use crate::block_height::BlockHeight;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(thiserror::Error, PartialEq, Eq, Debug, Clone)]
pub enum ModeError {
    #[error("Invalid identity-binding mode: {0}")]
    InvalidMode(u8),
}

/// Identity-binding strength of a request. Mode 1 carries no on-ledger
/// identity binding, modes 2 and 3 bind the subject identity with
/// increasing strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Mode {
    M1 = 1,
    M2 = 2,
    M3 = 3,
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        mode as u8
    }
}

impl TryFrom<u8> for Mode {
    type Error = ModeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Mode::M1),
            2 => Ok(Mode::M2),
            3 => Ok(Mode::M3),
            _ => Err(ModeError::InvalidMode(value)),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

#[derive(thiserror::Error, PartialEq, Eq, Debug, Clone)]
pub enum RequestStatusError {
    #[error("Invalid request status: {0}")]
    InvalidStatus(String),
}

/// Ledger status of a request.
///
/// `Pending` is the unique initial status. The post-confirmed statuses are
/// layered with the orthogonal `closed`/`timed_out` terminal markers kept on
/// the [`Request`] record itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Completed,
    Rejected,
    Errored,
    Complicated,
    PartialCompleted,
}

impl RequestStatus {
    /// True for the statuses that may legally carry `closed = true`.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed
                | RequestStatus::Rejected
                | RequestStatus::Errored
                | RequestStatus::Complicated
                | RequestStatus::PartialCompleted
        )
    }

    /// Whether a status observation may legally follow another for the same
    /// request. Repeating a status is always legal since the accounting
    /// carried by the observation may still grow.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        if *self == next {
            return true;
        }
        match (*self, next) {
            (Pending, Confirmed) | (Pending, Rejected) | (Pending, Errored) => true,
            (Confirmed, Completed) | (Confirmed, PartialCompleted) | (Confirmed, Complicated) => true,
            (Confirmed, Rejected) | (Confirmed, Errored) => true,
            (PartialCompleted, Completed) | (PartialCompleted, Errored) => true,
            (Complicated, Completed) | (Complicated, Errored) => true,
            _ => false,
        }
    }
}

impl FromStr for RequestStatus {
    type Err = RequestStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "confirmed" => Ok(RequestStatus::Confirmed),
            "completed" => Ok(RequestStatus::Completed),
            "rejected" => Ok(RequestStatus::Rejected),
            "errored" => Ok(RequestStatus::Errored),
            "complicated" => Ok(RequestStatus::Complicated),
            "partial_completed" => Ok(RequestStatus::PartialCompleted),
            _ => Err(RequestStatusError::InvalidStatus(s.to_string())),
        }
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Confirmed => "confirmed",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Errored => "errored",
            RequestStatus::Complicated => "complicated",
            RequestStatus::PartialCompleted => "partial_completed",
        };
        f.write_str(s)
    }
}

/// Per data-source outcome inside a [`ServiceRequest`] response list.
///
/// A data source that answered appends a received record whose `signed`
/// flag is set at signing time and whose `received_data` flag flips once
/// the actual payload arrived; a failing source appends an error record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceResponse {
    Received { as_id: String, signed: bool, received_data: bool },
    Error { as_id: String, error_code: u32 },
}

impl ServiceResponse {
    pub fn as_id(&self) -> &str {
        match self {
            ServiceResponse::Received { as_id, .. } | ServiceResponse::Error { as_id, .. } => as_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ServiceResponse::Error { .. })
    }
}

/// A data request towards one service, fanned out to `as_id_list` and
/// answered by at least `min_as` signers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub service_id: String,
    pub as_id_list: Vec<String>,
    pub min_as: u32,
    pub request_params_hash: String,
    /// Created empty together with the owning request, grows monotonically.
    #[serde(default)]
    pub response_list: Vec<ServiceResponse>,
}

impl ServiceRequest {
    pub fn signed_count(&self) -> usize {
        self.response_list.iter().filter(|r| matches!(r, ServiceResponse::Received { signed: true, .. })).count()
    }

    pub fn received_data_count(&self) -> usize {
        self.response_list.iter().filter(|r| matches!(r, ServiceResponse::Received { received_data: true, .. })).count()
    }
}

/// Per-service accounting snapshot carried by a status observation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub service_id: String,
    pub min_as: u32,
    pub signed_data_count: u32,
    pub received_data_count: u32,
}

/// An identity-verification request record as kept on the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: String,
    pub mode: Mode,
    pub requester_node_id: String,
    pub min_idp: u32,
    pub min_aal: f64,
    pub min_ial: f64,
    /// Seconds until the platform times the request out.
    pub request_timeout: u64,
    /// Order is preserved for display purposes only, membership is what matters.
    pub idp_id_list: Vec<String>,
    pub request_message_hash: String,
    pub status: RequestStatus,
    pub closed: bool,
    pub timed_out: bool,
    pub block_height: BlockHeight,
    #[serde(default)]
    pub data_request_list: Vec<ServiceRequest>,
}

impl Request {
    /// `closed` and `timed_out` are mutually exclusive terminal markers.
    pub fn terminal_markers_consistent(&self) -> bool {
        !(self.closed && self.timed_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "confirmed", "completed", "rejected", "errored", "complicated", "partial_completed"] {
            let status = RequestStatus::from_str(s).unwrap();
            assert_eq!(status.to_string(), s);
            assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{s}\""));
        }
        assert_eq!(RequestStatus::from_str("canceled"), Err(RequestStatusError::InvalidStatus("canceled".to_string())));
    }

    #[test]
    fn test_status_transitions() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Confirmed));
        assert!(PartialCompleted.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Confirmed));
        assert!(!Rejected.can_transition_to(Completed));
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(serde_json::to_string(&Mode::M3).unwrap(), "3");
        assert_eq!(serde_json::from_str::<Mode>("1").unwrap(), Mode::M1);
        assert!(serde_json::from_str::<Mode>("4").is_err());
    }

    #[test]
    fn test_request_record_round_trip() {
        use crate::block_height::BlockHeight;
        let request = Request {
            request_id: "req-1".to_string(),
            mode: Mode::M3,
            requester_node_id: "rp1".to_string(),
            min_idp: 1,
            min_aal: 3.0,
            min_ial: 2.3,
            request_timeout: 86400,
            idp_id_list: vec!["idp1".to_string(), "idp2".to_string()],
            request_message_hash: "aGFzaA==".to_string(),
            status: RequestStatus::Confirmed,
            closed: false,
            timed_out: false,
            block_height: BlockHeight::new("chain-1", 101).unwrap(),
            data_request_list: vec![ServiceRequest {
                service_id: "bank_statement".to_string(),
                as_id_list: vec!["as1".to_string()],
                min_as: 1,
                request_params_hash: "cGFyYW1z".to_string(),
                response_list: vec![
                    ServiceResponse::Received { as_id: "as1".to_string(), signed: true, received_data: false },
                    ServiceResponse::Error { as_id: "as2".to_string(), error_code: 15022 },
                ],
            }],
        };
        assert!(request.terminal_markers_consistent());
        assert_eq!(request.data_request_list[0].signed_count(), 1);
        assert_eq!(request.data_request_list[0].received_data_count(), 0);

        let back: Request = serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(back, request);

        let conflicting = Request { closed: true, timed_out: true, ..request };
        assert!(!conflicting.terminal_markers_consistent());
    }

    #[test]
    fn test_service_response_shapes() {
        let received: ServiceResponse = serde_json::from_str(r#"{"as_id":"as1","signed":true,"received_data":false}"#).unwrap();
        assert_eq!(received, ServiceResponse::Received { as_id: "as1".to_string(), signed: true, received_data: false });
        let error: ServiceResponse = serde_json::from_str(r#"{"as_id":"as2","error_code":15022}"#).unwrap();
        assert!(error.is_error());
        assert_eq!(error.as_id(), "as2");
    }
}
