use crate::domain::billing::PaymentProvider;

use super::payment_event::WebhookEnvelope;
use super::webhook_errors::WebhookError;

/// Headers a provider delivery carries alongside its raw body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryHeaders<'a> {
    pub signature: Option<&'a str>,
    /// Provider-assigned delivery id, when the provider sends one in a header.
    pub event_id: Option<&'a str>,
}

/// Authenticates a raw webhook body and decodes it into an envelope.
///
/// Implementations verify the signature over the exact received bytes
/// before parsing anything.
pub trait WebhookAuthenticator: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// Name of the header carrying the signature.
    fn signature_header(&self) -> &'static str;

    fn authenticate(
        &self,
        payload: &[u8],
        headers: DeliveryHeaders<'_>,
    ) -> Result<WebhookEnvelope, WebhookError>;
}
