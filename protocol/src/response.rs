use serde::{Deserialize, Serialize};

/// Raw per-provider response record, produced once per provider per request
/// at response time and immutable thereafter.
///
/// Carries both protocol fields and transport/correlation fields; only the
/// projection in `idnet-verifier` decides which of them a given observing
/// role gets to see.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub idp_id: String,
    pub reference_id: String,
    pub callback_url: String,
    pub request_id: String,
    pub accessor_id: String,
    pub node_id: String,
    pub ial: f64,
    pub aal: f64,
    pub status: String,
    pub valid_signature: Option<bool>,
    pub valid_ial: Option<bool>,
}

/// Role-visible view of a provider response: the transport/correlation
/// fields are stripped, and the two trust signals are redacted for every
/// viewer except the requester of a mode-2/3 request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdpResponseView {
    pub idp_id: String,
    pub ial: f64,
    pub aal: f64,
    pub status: String,
    pub valid_signature: Option<bool>,
    pub valid_ial: Option<bool>,
}
