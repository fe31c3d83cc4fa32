//! Client for the payment-session collaborator.

use async_trait::async_trait;

use crate::config::Config;

use super::{CheckoutRequest, ClientError, PaymentSessions, SessionResponse};

#[derive(Clone)]
pub struct PaymentSessionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PaymentSessionClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.collaborator_timeout())
            .timeout(config.collaborator_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.checkout_api_base.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentSessions for PaymentSessionClient {
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<SessionResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/v1/checkout-sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        // The collaborator's rejection message is surfaced verbatim to the
        // buyer-facing caller, so keep whatever it said.
        match response.json::<SessionResponse>().await {
            Ok(mut body) => {
                body.success = false;
                if body.error.is_none() {
                    body.error = Some(format!("Checkout session rejected ({})", status));
                }
                Ok(body)
            }
            Err(_) => Err(ClientError::Status(status.as_u16())),
        }
    }
}
