use crate::block_height::BlockHeight;
use crate::request::{Mode, RequestStatus, ServiceRequest, ServiceSummary};
use crate::response::IdpResponseView;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(thiserror::Error, PartialEq, Eq, Debug, Clone)]
pub enum EventTypeError {
    #[error("Invalid event type: {0}")]
    InvalidEventType(String),
}

/// Event type classifying the callback envelopes of every role stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CreateRequestResult,
    RequestStatus,
    IncomingRequest,
    ResponseResult,
    DataRequest,
    MessageQueueSendSuccess,
    AccessorEncrypt,
    CreateIdentityResult,
    UpdateIalResult,
    UpgradeIdentityModeRequestResult,
    UpgradeIdentityModeResult,
}

impl FromStr for EventType {
    type Err = EventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_request_result" => Ok(EventType::CreateRequestResult),
            "request_status" => Ok(EventType::RequestStatus),
            "incoming_request" => Ok(EventType::IncomingRequest),
            "response_result" => Ok(EventType::ResponseResult),
            "data_request" => Ok(EventType::DataRequest),
            "message_queue_send_success" => Ok(EventType::MessageQueueSendSuccess),
            "accessor_encrypt" => Ok(EventType::AccessorEncrypt),
            "create_identity_result" => Ok(EventType::CreateIdentityResult),
            "update_ial_result" => Ok(EventType::UpdateIalResult),
            "upgrade_identity_mode_request_result" => Ok(EventType::UpgradeIdentityModeRequestResult),
            "upgrade_identity_mode_result" => Ok(EventType::UpgradeIdentityModeResult),
            _ => Err(EventTypeError::InvalidEventType(s.to_string())),
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::CreateRequestResult => "create_request_result",
            EventType::RequestStatus => "request_status",
            EventType::IncomingRequest => "incoming_request",
            EventType::ResponseResult => "response_result",
            EventType::DataRequest => "data_request",
            EventType::MessageQueueSendSuccess => "message_queue_send_success",
            EventType::AccessorEncrypt => "accessor_encrypt",
            EventType::CreateIdentityResult => "create_identity_result",
            EventType::UpdateIalResult => "update_ial_result",
            EventType::UpgradeIdentityModeRequestResult => "upgrade_identity_mode_request_result",
            EventType::UpgradeIdentityModeResult => "upgrade_identity_mode_result",
        };
        f.write_str(s)
    }
}

/// Failure detail carried by a `success: false` result callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackError {
    pub code: u32,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateRequestResult {
    pub node_id: String,
    pub reference_id: String,
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallbackError>,
    pub creation_block_height: BlockHeight,
}

/// A `request_status` observation: the full ledger-committed snapshot of a
/// request as delivered to one observing role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub node_id: String,
    pub request_id: String,
    pub status: RequestStatus,
    pub mode: Mode,
    pub min_idp: u32,
    pub answered_idp_count: u32,
    pub closed: bool,
    pub timed_out: bool,
    #[serde(default)]
    pub service_list: Vec<ServiceSummary>,
    #[serde(default)]
    pub response_list: Vec<IdpResponseView>,
    pub block_height: BlockHeight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncomingRequest {
    pub node_id: String,
    pub request_id: String,
    pub mode: Mode,
    pub request_message_hash: String,
    pub requester_node_id: String,
    pub min_ial: f64,
    pub min_aal: f64,
    pub request_timeout: u64,
    #[serde(default)]
    pub data_request_list: Vec<ServiceRequest>,
    pub creation_block_height: BlockHeight,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseResult {
    pub node_id: String,
    pub reference_id: String,
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallbackError>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub node_id: String,
    pub request_id: String,
    pub service_id: String,
    pub mode: Mode,
    pub request_params_hash: String,
    pub requester_node_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageQueueSendSuccess {
    pub node_id: String,
    pub destination_node_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessorEncrypt {
    pub node_id: String,
    pub request_id: String,
    pub reference_id: String,
    pub accessor_id: String,
    /// Base64 of the padded hash the accessor key is asked to sign.
    pub padded_request_message_hash: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateIdentityResult {
    pub node_id: String,
    pub reference_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallbackError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_group_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateIalResult {
    pub node_id: String,
    pub reference_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallbackError>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeIdentityModeRequestResult {
    pub node_id: String,
    pub reference_id: String,
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallbackError>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeIdentityModeResult {
    pub node_id: String,
    pub reference_id: String,
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CallbackError>,
}

/// Inbound callback envelope, recognized by its `type` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackEvent {
    CreateRequestResult(CreateRequestResult),
    RequestStatus(StatusEvent),
    IncomingRequest(IncomingRequest),
    ResponseResult(ResponseResult),
    DataRequest(DataRequest),
    MessageQueueSendSuccess(MessageQueueSendSuccess),
    AccessorEncrypt(AccessorEncrypt),
    CreateIdentityResult(CreateIdentityResult),
    UpdateIalResult(UpdateIalResult),
    UpgradeIdentityModeRequestResult(UpgradeIdentityModeRequestResult),
    UpgradeIdentityModeResult(UpgradeIdentityModeResult),
}

impl CallbackEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn event_type(&self) -> EventType {
        match self {
            CallbackEvent::CreateRequestResult(_) => EventType::CreateRequestResult,
            CallbackEvent::RequestStatus(_) => EventType::RequestStatus,
            CallbackEvent::IncomingRequest(_) => EventType::IncomingRequest,
            CallbackEvent::ResponseResult(_) => EventType::ResponseResult,
            CallbackEvent::DataRequest(_) => EventType::DataRequest,
            CallbackEvent::MessageQueueSendSuccess(_) => EventType::MessageQueueSendSuccess,
            CallbackEvent::AccessorEncrypt(_) => EventType::AccessorEncrypt,
            CallbackEvent::CreateIdentityResult(_) => EventType::CreateIdentityResult,
            CallbackEvent::UpdateIalResult(_) => EventType::UpdateIalResult,
            CallbackEvent::UpgradeIdentityModeRequestResult(_) => EventType::UpgradeIdentityModeRequestResult,
            CallbackEvent::UpgradeIdentityModeResult(_) => EventType::UpgradeIdentityModeResult,
        }
    }

    pub fn node_id(&self) -> &str {
        match self {
            CallbackEvent::CreateRequestResult(e) => &e.node_id,
            CallbackEvent::RequestStatus(e) => &e.node_id,
            CallbackEvent::IncomingRequest(e) => &e.node_id,
            CallbackEvent::ResponseResult(e) => &e.node_id,
            CallbackEvent::DataRequest(e) => &e.node_id,
            CallbackEvent::MessageQueueSendSuccess(e) => &e.node_id,
            CallbackEvent::AccessorEncrypt(e) => &e.node_id,
            CallbackEvent::CreateIdentityResult(e) => &e.node_id,
            CallbackEvent::UpdateIalResult(e) => &e.node_id,
            CallbackEvent::UpgradeIdentityModeRequestResult(e) => &e.node_id,
            CallbackEvent::UpgradeIdentityModeResult(e) => &e.node_id,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            CallbackEvent::CreateRequestResult(e) => Some(&e.request_id),
            CallbackEvent::RequestStatus(e) => Some(&e.request_id),
            CallbackEvent::IncomingRequest(e) => Some(&e.request_id),
            CallbackEvent::ResponseResult(e) => Some(&e.request_id),
            CallbackEvent::DataRequest(e) => Some(&e.request_id),
            CallbackEvent::MessageQueueSendSuccess(e) => Some(&e.request_id),
            CallbackEvent::AccessorEncrypt(e) => Some(&e.request_id),
            CallbackEvent::CreateIdentityResult(_) => None,
            CallbackEvent::UpdateIalResult(_) => None,
            CallbackEvent::UpgradeIdentityModeRequestResult(e) => Some(&e.request_id),
            CallbackEvent::UpgradeIdentityModeResult(e) => Some(&e.request_id),
        }
    }

    /// Present on `*_result` envelopes and on `accessor_encrypt`.
    pub fn reference_id(&self) -> Option<&str> {
        match self {
            CallbackEvent::CreateRequestResult(e) => Some(&e.reference_id),
            CallbackEvent::ResponseResult(e) => Some(&e.reference_id),
            CallbackEvent::AccessorEncrypt(e) => Some(&e.reference_id),
            CallbackEvent::CreateIdentityResult(e) => Some(&e.reference_id),
            CallbackEvent::UpdateIalResult(e) => Some(&e.reference_id),
            CallbackEvent::UpgradeIdentityModeRequestResult(e) => Some(&e.reference_id),
            CallbackEvent::UpgradeIdentityModeResult(e) => Some(&e.reference_id),
            _ => None,
        }
    }

    pub fn success(&self) -> Option<bool> {
        match self {
            CallbackEvent::CreateRequestResult(e) => Some(e.success),
            CallbackEvent::ResponseResult(e) => Some(e.success),
            CallbackEvent::CreateIdentityResult(e) => Some(e.success),
            CallbackEvent::UpdateIalResult(e) => Some(e.success),
            CallbackEvent::UpgradeIdentityModeRequestResult(e) => Some(e.success),
            CallbackEvent::UpgradeIdentityModeResult(e) => Some(e.success),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<u32> {
        let error = match self {
            CallbackEvent::CreateRequestResult(e) => &e.error,
            CallbackEvent::ResponseResult(e) => &e.error,
            CallbackEvent::CreateIdentityResult(e) => &e.error,
            CallbackEvent::UpdateIalResult(e) => &e.error,
            CallbackEvent::UpgradeIdentityModeRequestResult(e) => &e.error,
            CallbackEvent::UpgradeIdentityModeResult(e) => &e.error,
            _ => &None,
        };
        error.as_ref().map(|e| e.code)
    }

    pub fn as_status(&self) -> Option<&StatusEvent> {
        match self {
            CallbackEvent::RequestStatus(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for CallbackEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.request_id() {
            Some(request_id) => write!(f, "{} [{}]", self.event_type(), request_id),
            None => write!(f, "{}", self.event_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trip() {
        for s in [
            "create_request_result",
            "request_status",
            "incoming_request",
            "response_result",
            "data_request",
            "message_queue_send_success",
            "accessor_encrypt",
            "create_identity_result",
            "update_ial_result",
            "upgrade_identity_mode_request_result",
            "upgrade_identity_mode_result",
        ] {
            assert_eq!(EventType::from_str(s).unwrap().to_string(), s);
        }
        assert_eq!(EventType::from_str("request-status"), Err(EventTypeError::InvalidEventType("request-status".to_string())));
    }

    #[test]
    fn test_status_envelope_parsing() {
        let json = r#"{
            "type": "request_status",
            "node_id": "rp1",
            "request_id": "ff3ab2",
            "status": "confirmed",
            "mode": 3,
            "min_idp": 1,
            "answered_idp_count": 1,
            "closed": false,
            "timed_out": false,
            "service_list": [
                { "service_id": "bank_statement", "min_as": 1, "signed_data_count": 0, "received_data_count": 0 }
            ],
            "response_list": [
                { "idp_id": "idp1", "ial": 2.3, "aal": 3.0, "status": "accept", "valid_signature": true, "valid_ial": true }
            ],
            "block_height": "chain-1:104"
        }"#;
        let event = CallbackEvent::from_json(json).unwrap();
        assert_eq!(event.event_type(), EventType::RequestStatus);
        assert_eq!(event.request_id(), Some("ff3ab2"));
        assert_eq!(event.reference_id(), None);
        let status = event.as_status().unwrap();
        assert_eq!(status.status, RequestStatus::Confirmed);
        assert_eq!(status.mode, Mode::M3);
        assert_eq!(status.block_height.height(), 104);
        assert_eq!(status.service_list[0].service_id, "bank_statement");
    }

    #[test]
    fn test_result_envelope_parsing() {
        let json = r#"{
            "type": "response_result",
            "node_id": "idp1",
            "reference_id": "ref-77",
            "request_id": "ff3ab2",
            "success": false,
            "error": { "code": 20060, "message": "IAL too low" }
        }"#;
        let event = CallbackEvent::from_json(json).unwrap();
        assert_eq!(event.success(), Some(false));
        assert_eq!(event.error_code(), Some(20060));
        assert_eq!(event.reference_id(), Some("ref-77"));
    }

    #[test]
    fn test_identity_management_envelopes() {
        let created: CallbackEvent = serde_json::from_str(
            r#"{
                "type": "create_identity_result",
                "node_id": "idp1",
                "reference_id": "ref-enroll",
                "success": true,
                "reference_group_code": "3f1a"
            }"#,
        )
        .unwrap();
        assert_eq!(created.event_type(), EventType::CreateIdentityResult);
        assert_eq!(created.request_id(), None);
        assert_eq!(created.success(), Some(true));

        let upgraded: CallbackEvent = serde_json::from_str(
            r#"{
                "type": "upgrade_identity_mode_result",
                "node_id": "idp1",
                "reference_id": "ref-upgrade",
                "request_id": "req-7",
                "success": false,
                "error": { "code": 20025, "message": "request already closed" }
            }"#,
        )
        .unwrap();
        assert_eq!(upgraded.event_type(), EventType::UpgradeIdentityModeResult);
        assert_eq!(upgraded.request_id(), Some("req-7"));
        assert_eq!(upgraded.error_code(), Some(20025));
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let json = r#"{ "type": "request_challenge", "node_id": "idp1" }"#;
        assert!(CallbackEvent::from_json(json).is_err());
    }
}
