//! Client for the Source Portal: campaign prices, price listings,
//! inventory, catalog id mapping and gift-card verification.

use async_trait::async_trait;
use serde_json::json;

use crate::config::Config;

use super::{
    CampaignLookup, CampaignPriceResponse, ClientError, GiftCardVerification, GiftCardVerifier,
    InventoryLookup, InventoryResponse, PriceAmountResponse, PriceCatalog,
};

#[derive(Clone)]
pub struct SourcePortalClient {
    http: reqwest::Client,
    base_url: String,
    tenant_id: String,
    api_key: String,
}

impl SourcePortalClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.collaborator_timeout())
            .timeout(config.collaborator_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.source_api_base.clone(),
            tenant_id: config.tenant_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned + Default>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        not_found_is_empty: bool,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND && not_found_is_empty {
            // 404 means the portal has no record, not that the call failed.
            return Ok(T::default());
        }
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CampaignLookup for SourcePortalClient {
    async fn campaign_price(
        &self,
        product_id: &str,
        original_price_id: Option<&str>,
    ) -> Result<CampaignPriceResponse, ClientError> {
        let mut query = vec![
            ("tenantId", self.tenant_id.as_str()),
            ("productId", product_id),
            ("status", "active"),
        ];
        if let Some(price_id) = original_price_id {
            query.push(("originalPriceId", price_id));
        }
        self.get_json("/v1/campaign-prices", &query, true).await
    }
}

#[async_trait]
impl PriceCatalog for SourcePortalClient {
    async fn price_amount(
        &self,
        product_id: &str,
        price_id: &str,
    ) -> Result<PriceAmountResponse, ClientError> {
        self.get_json(
            "/v1/prices",
            &[
                ("tenantId", self.tenant_id.as_str()),
                ("productId", product_id),
                ("stripePriceId", price_id),
            ],
            true,
        )
        .await
    }

    async fn resolve_external_id(&self, product_id: &str) -> Result<Option<String>, ClientError> {
        #[derive(Default, serde::Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        struct MappingResponse {
            found: bool,
            external_id: Option<String>,
        }

        let resp: MappingResponse = self
            .get_json(
                "/v1/catalog/mapping",
                &[
                    ("tenantId", self.tenant_id.as_str()),
                    ("productId", product_id),
                ],
                true,
            )
            .await?;
        Ok(resp.external_id.filter(|_| resp.found))
    }
}

#[async_trait]
impl InventoryLookup for SourcePortalClient {
    async fn by_price_id(&self, price_id: &str) -> Result<InventoryResponse, ClientError> {
        self.get_json(
            "/v1/inventory",
            &[
                ("tenantId", self.tenant_id.as_str()),
                ("stripePriceId", price_id),
            ],
            false,
        )
        .await
    }

    async fn by_product_id(&self, product_id: &str) -> Result<InventoryResponse, ClientError> {
        self.get_json(
            "/v1/inventory",
            &[
                ("tenantId", self.tenant_id.as_str()),
                ("productId", product_id),
            ],
            false,
        )
        .await
    }
}

#[async_trait]
impl GiftCardVerifier for SourcePortalClient {
    async fn verify(&self, code: &str) -> Result<GiftCardVerification, ClientError> {
        let formatted = code.trim().to_uppercase();
        let response = self
            .http
            .post(self.url("/gift-cards/verify"))
            .bearer_auth(&self.api_key)
            .header("X-Tenant", &self.tenant_id)
            .json(&json!({ "code": formatted }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            // Unknown, expired or exhausted card. Not a transport failure.
            let mut body: GiftCardVerification = response.json().await.unwrap_or_default();
            body.valid = false;
            if body.error.is_none() {
                body.error = Some(format!("Verification failed: {}", status));
            }
            return Ok(body);
        }
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}
