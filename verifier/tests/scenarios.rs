use idnet_notify::{CorrelationKey, Error as NotifyError};
use idnet_protocol::envelope::{
    AccessorEncrypt, CallbackError, CallbackEvent, CreateRequestResult, DataRequest, IncomingRequest, ResponseResult,
    StatusEvent,
};
use idnet_protocol::request::ServiceSummary;
use idnet_protocol::{BlockHeight, EventType, IdpResponseView, Mode, ProviderResponse, RequestStatus, error_codes};
use idnet_verifier::{Error, ExpectedStatus, ProjectionContext, ScenarioVerifier, Settings, project};
use num_bigint::BigUint;
use std::str::FromStr;
use std::time::Duration;

const CHAIN: &str = "test-chain-idnet";

fn height(h: u64) -> BlockHeight {
    BlockHeight::from_str(&format!("{CHAIN}:{h}")).unwrap()
}

fn provider_raw(request_id: &str) -> ProviderResponse {
    ProviderResponse {
        idp_id: "idp1".to_string(),
        reference_id: "ref-answer".to_string(),
        callback_url: "https://idp1.example/callback".to_string(),
        request_id: request_id.to_string(),
        accessor_id: "acc-1".to_string(),
        node_id: "idp1".to_string(),
        ial: 2.3,
        aal: 3.0,
        status: "accept".to_string(),
        valid_signature: Some(true),
        valid_ial: Some(true),
    }
}

#[allow(clippy::too_many_arguments)]
fn status_event(
    node_id: &str,
    request_id: &str,
    status: RequestStatus,
    h: u64,
    answered: u32,
    closed: bool,
    service_list: Vec<ServiceSummary>,
    response_list: Vec<IdpResponseView>,
) -> CallbackEvent {
    CallbackEvent::RequestStatus(StatusEvent {
        node_id: node_id.to_string(),
        request_id: request_id.to_string(),
        status,
        mode: Mode::M3,
        min_idp: 1,
        answered_idp_count: answered,
        closed,
        timed_out: false,
        service_list,
        response_list,
        block_height: height(h),
    })
}

fn service_summary(signed: u32, received: u32) -> ServiceSummary {
    ServiceSummary { service_id: "bank_statement".to_string(), min_as: 1, signed_data_count: signed, received_data_count: received }
}

/// Mode-3 request with `min_idp = 1` and a single data service: the provider
/// accepts, the sole data source signs and delivers, the request closes.
#[tokio::test]
async fn test_mode3_happy_path() {
    idnet_core::log::try_init_logger("debug,idnet_notify=trace");
    let request_id = "req-mode3-happy";
    let settings = Settings { callback_timeout_secs: 5, ..Default::default() };
    let mut scenario = ScenarioVerifier::new("mode3-happy-path", settings);
    scenario.start();
    let rp = scenario.attach_source("rp");
    let idp = scenario.attach_source("idp");
    let data_source = scenario.attach_source("as");
    scenario.track_request(request_id, "rp1", true);
    scenario.track_request(request_id, "idp1", false);

    // Request creation confirms on the ledger
    let created = scenario.expect_event("rp", CorrelationKey::of(EventType::CreateRequestResult).with_reference_id("ref-create"));
    rp.send(CallbackEvent::CreateRequestResult(CreateRequestResult {
        node_id: "rp1".to_string(),
        reference_id: "ref-create".to_string(),
        request_id: request_id.to_string(),
        success: true,
        error: None,
        creation_block_height: height(100),
    }))
    .unwrap();
    let created = scenario.await_result_success(&created).await.unwrap();
    let CallbackEvent::CreateRequestResult(created) = created else { panic!("expected create_request_result") };
    scenario.pin_creation_height(request_id, "rp1", created.creation_block_height.height()).unwrap();

    // The provider is notified
    let incoming = scenario.expect_event("idp", CorrelationKey::of(EventType::IncomingRequest).with_request_id(request_id));
    idp.send(CallbackEvent::IncomingRequest(IncomingRequest {
        node_id: "idp1".to_string(),
        request_id: request_id.to_string(),
        mode: Mode::M3,
        request_message_hash: "aGFzaA==".to_string(),
        requester_node_id: "rp1".to_string(),
        min_ial: 2.3,
        min_aal: 3.0,
        request_timeout: 86400,
        data_request_list: vec![],
        creation_block_height: height(100),
    }))
    .unwrap();
    let incoming = incoming.wait(scenario.settings().callback_timeout()).await.unwrap();
    let CallbackEvent::IncomingRequest(incoming) = incoming else { panic!("expected incoming_request") };
    assert_eq!(incoming.requester_node_id, "rp1");
    assert_eq!(incoming.creation_block_height.height(), 100);

    // Provider accepts: the requester sees `confirmed` strictly above the creation height
    let raw = vec![provider_raw(request_id)];
    let rp_views = project(&raw, ProjectionContext { viewer_is_requester: true, mode: Mode::M3 });
    let confirmed = scenario.expect_status("rp", request_id);
    rp.send(status_event("rp1", request_id, RequestStatus::Confirmed, 101, 1, false, vec![service_summary(0, 0)], rp_views.clone()))
        .unwrap();
    scenario
        .await_status(&confirmed, &ExpectedStatus::of(RequestStatus::Confirmed).with_answered(1).with_response_list(rp_views))
        .await
        .unwrap();
    assert_eq!(scenario.last_status_height(), Some(101));

    // The provider's own stream reports the same committed update, redacted
    let idp_views = project(&raw, ProjectionContext { viewer_is_requester: false, mode: Mode::M3 });
    assert!(idp_views.iter().all(|view| view.valid_signature.is_none() && view.valid_ial.is_none()));
    let observed = scenario.expect_status("idp", request_id);
    idp.send(status_event("idp1", request_id, RequestStatus::Confirmed, 101, 1, false, vec![service_summary(0, 0)], idp_views.clone()))
        .unwrap();
    scenario
        .await_status_committed(
            &observed,
            &ExpectedStatus::of(RequestStatus::Confirmed).with_answered(1).with_response_list(idp_views),
        )
        .await
        .unwrap();

    // The data source is asked for the service payload
    let asked = scenario.expect_event("as", CorrelationKey::of(EventType::DataRequest).with_request_id(request_id));
    data_source
        .send(CallbackEvent::DataRequest(DataRequest {
            node_id: "as1".to_string(),
            request_id: request_id.to_string(),
            service_id: "bank_statement".to_string(),
            mode: Mode::M3,
            request_params_hash: "cGFyYW1z".to_string(),
            requester_node_id: "rp1".to_string(),
        }))
        .unwrap();
    let asked = asked.wait(scenario.settings().callback_timeout()).await.unwrap();
    let CallbackEvent::DataRequest(asked) = asked else { panic!("expected data_request") };
    assert_eq!(asked.service_id, "bank_statement");

    // Data signed and delivered: `completed`, correlated on the signed first service
    let completed = scenario.expect_event(
        "rp",
        CorrelationKey::of(EventType::RequestStatus).with_request_id(request_id).with_predicate(|event| {
            event.as_status().is_some_and(|status| status.service_list.first().is_some_and(|svc| svc.signed_data_count > 0))
        }),
    );
    let rp_views = project(&raw, ProjectionContext { viewer_is_requester: true, mode: Mode::M3 });
    rp.send(status_event("rp1", request_id, RequestStatus::Completed, 102, 1, false, vec![service_summary(1, 1)], rp_views.clone()))
        .unwrap();
    scenario
        .await_status(&completed, &ExpectedStatus::of(RequestStatus::Completed).with_answered(1).with_response_list(rp_views.clone()))
        .await
        .unwrap();

    // Final closure arrives at the very height `completed` was committed at
    let closed = scenario.expect_status("rp", request_id);
    rp.send(status_event("rp1", request_id, RequestStatus::Completed, 102, 1, true, vec![service_summary(1, 1)], rp_views.clone()))
        .unwrap();
    scenario
        .await_status(&closed, &ExpectedStatus::of(RequestStatus::Completed).closed().with_answered(1).with_response_list(rp_views))
        .await
        .unwrap();
    assert_eq!(scenario.last_status_height(), Some(102));

    scenario.teardown().await.unwrap();
    let stats = scenario.correlator().stats();
    assert_eq!(stats.resolved, 7);
    assert_eq!(stats.dropped, 0);
}

/// Provider answers with `ial = 2.3` while the request demands `min_ial = 3`:
/// the response attempt is rejected with the dedicated error code before any
/// `confirmed` status can be observed.
#[tokio::test]
async fn test_response_rejected_below_min_ial() {
    idnet_core::log::try_init_logger("debug,idnet_notify=trace");
    let request_id = "req-low-ial";
    let settings = Settings { callback_timeout_secs: 5, ..Default::default() };
    let mut scenario = ScenarioVerifier::new("ial-below-min", settings);
    scenario.start();
    let _rp = scenario.attach_source("rp");
    let idp = scenario.attach_source("idp");
    scenario.track_request(request_id, "rp1", true);

    let rejected = scenario.expect_event("idp", CorrelationKey::of(EventType::ResponseResult).with_reference_id("ref-answer"));
    idp.send(CallbackEvent::ResponseResult(ResponseResult {
        node_id: "idp1".to_string(),
        reference_id: "ref-answer".to_string(),
        request_id: request_id.to_string(),
        success: false,
        error: Some(CallbackError { code: error_codes::IAL_BELOW_REQUIRED, message: "IAL below the request minimum".to_string() }),
    }))
    .unwrap();
    scenario.await_result_error(&rejected, error_codes::IAL_BELOW_REQUIRED).await.unwrap();

    // No confirmed status ever becomes observable for the requester
    let confirmed = scenario.expect_status("rp", request_id);
    assert!(matches!(confirmed.wait(Duration::from_millis(200)).await, Err(NotifyError::WaitTimeout(_, _))));

    scenario.teardown().await.unwrap();
}

/// The padded hash carried by `accessor_encrypt` must match the independent
/// recomputation, and the provider signature must survive raw-RSA verification.
#[tokio::test]
async fn test_consent_hash_binding() {
    idnet_core::log::try_init_logger("debug");
    let request_id = "req-consent";
    // Textbook RSA toy key: p = 61, q = 53
    let modulus = BigUint::from(3233u32);
    let exponent = BigUint::from(17u32);
    let private_exponent = BigUint::from(2753u32);
    let message = "please confirm the disclosure of your bank statement";
    let initial_salt = idnet_consent::derive_salt(&["citizen_id", "1234567890123", "seed"]);

    let settings = Settings::default();
    let mut scenario = ScenarioVerifier::new("consent-hash", settings);
    scenario.start();
    let idp = scenario.attach_source("idp");

    let padded =
        idnet_consent::build_padded_hash(message, &initial_salt, request_id, &modulus, scenario.settings().consent_block_bits)
            .unwrap();
    let padded_b64 = idnet_consent::build_padded_hash_b64(
        message,
        &initial_salt,
        request_id,
        &modulus,
        scenario.settings().consent_block_bits,
    )
    .unwrap();

    let encrypt = scenario.expect_event("idp", CorrelationKey::of(EventType::AccessorEncrypt).with_request_id(request_id));
    idp.send(CallbackEvent::AccessorEncrypt(AccessorEncrypt {
        node_id: "idp1".to_string(),
        request_id: request_id.to_string(),
        reference_id: "ref-consent".to_string(),
        accessor_id: "acc-1".to_string(),
        padded_request_message_hash: padded_b64,
    }))
    .unwrap();
    let encrypt = encrypt.wait(scenario.settings().callback_timeout()).await.unwrap();
    let CallbackEvent::AccessorEncrypt(encrypt) = encrypt else { panic!("expected accessor_encrypt") };

    scenario
        .verify_consent_hash(&encrypt.padded_request_message_hash, message, &initial_salt, request_id, &modulus)
        .unwrap();

    // A different message cannot produce the same binding
    assert!(matches!(
        scenario.verify_consent_hash(&encrypt.padded_request_message_hash, "another message", &initial_salt, request_id, &modulus),
        Err(Error::ConsentHashMismatch)
    ));

    // Raw "private encrypt" by the accessor key, then raw public decrypt
    let signature_int = BigUint::from_bytes_be(&padded).modpow(&private_exponent, &modulus);
    let mut signature = vec![0u8; 256 - signature_int.to_bytes_be().len()];
    signature.extend_from_slice(&signature_int.to_bytes_be());
    scenario.verify_consent_signature(&signature, &exponent, &modulus, &padded).unwrap();

    let mut tampered = signature.clone();
    tampered[255] ^= 1;
    assert!(matches!(
        scenario.verify_consent_signature(&tampered, &exponent, &modulus, &padded),
        Err(Error::ConsentSignatureInvalid)
    ));

    scenario.teardown().await.unwrap();
}
