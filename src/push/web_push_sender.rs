use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder,
};

use super::{PushError, PushSender};
use crate::config::Config;
use crate::models::Subscription;

/// Production [`PushSender`] over the `web-push` crate, signing every message
/// with the application's VAPID key pair.
pub struct WebPushSender {
    client: IsahcWebPushClient,
    vapid_private_key: String,
    subject: String,
}

impl WebPushSender {
    pub fn new(config: &Config) -> Result<Self, PushError> {
        let client = IsahcWebPushClient::new().map_err(to_push_error)?;
        Ok(Self {
            client,
            vapid_private_key: config.vapid_private_key.clone(),
            subject: config.vapid_subject.clone(),
        })
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(
        &self,
        subscription: &Subscription,
        payload: &[u8],
        ttl_secs: u32,
    ) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut signature = VapidSignatureBuilder::from_base64(&self.vapid_private_key, &info)
            .map_err(to_push_error)?;
        signature.add_claim("sub", self.subject.clone());

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_ttl(ttl_secs);
        builder.set_vapid_signature(signature.build().map_err(to_push_error)?);

        let message = builder.build().map_err(to_push_error)?;
        self.client.send(message).await.map_err(to_push_error)
    }
}

fn to_push_error(err: WebPushError) -> PushError {
    let status_code = match err {
        WebPushError::EndpointNotValid(_) => Some(410),
        WebPushError::EndpointNotFound(_) => Some(404),
        WebPushError::Unauthorized(_) => Some(401),
        WebPushError::PayloadTooLarge => Some(413),
        _ => None,
    };
    PushError {
        status_code,
        message: err.to_string(),
    }
}
