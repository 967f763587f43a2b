use idnet_protocol::{IdpResponseView, Mode, ProviderResponse};

/// Who is looking at the response list, and through which request mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectionContext {
    pub viewer_is_requester: bool,
    pub mode: Mode,
}

/// Derives the role-visible view of raw provider responses.
///
/// Transport and correlation fields are stripped by construction of
/// [`IdpResponseView`]. The `valid_signature`/`valid_ial` trust signals are
/// only disclosed to the requesting role, and mode-1 requests never carry
/// them, so every other viewer sees `None` in both positions. The same
/// projection applies to every observing role's callback stream.
pub fn project(raw: &[ProviderResponse], ctx: ProjectionContext) -> Vec<IdpResponseView> {
    let redact = !ctx.viewer_is_requester || ctx.mode == Mode::M1;
    raw.iter()
        .map(|response| IdpResponseView {
            idp_id: response.idp_id.clone(),
            ial: response.ial,
            aal: response.aal,
            status: response.status.clone(),
            valid_signature: if redact { None } else { response.valid_signature },
            valid_ial: if redact { None } else { response.valid_ial },
        })
        .collect()
}
