use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{ChargeRequest, ChargeResult, ChargeStatus, PixGateway};
use crate::errors::ServiceError;

/// HTTP client for the PIX payment provider. Stateless beyond the
/// connection pool; authenticated with a static bearer credential.
#[derive(Clone)]
pub struct PixClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct QrCodeBody {
    text: String,
    image: String,
}

#[derive(Debug, Deserialize)]
struct CreateChargeBody {
    id: String,
    status: String,
    qr_code: QrCodeBody,
    txid: String,
}

#[derive(Debug, Deserialize)]
struct ChargeStatusBody {
    status: String,
}

impl PixClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn charges_url(&self) -> String {
        format!("{}/charges", self.base_url)
    }

    fn charge_url(&self, transaction_id: &str) -> String {
        format!("{}/charges/{}", self.base_url, transaction_id)
    }

    /// Maps a non-success provider response to the error taxonomy:
    /// 5xx is retryable, 401/403 is a credential problem, any other 4xx
    /// is a rejection that must not be retried with the same key.
    async fn error_from_response(response: reqwest::Response) -> ServiceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = if body.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, body.chars().take(200).collect::<String>())
        };

        if status.is_server_error() {
            ServiceError::GatewayUnavailable(detail)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ServiceError::GatewayAuth(detail)
        } else {
            ServiceError::ChargeRejected(detail)
        }
    }

    fn transport_error(e: reqwest::Error) -> ServiceError {
        ServiceError::GatewayUnavailable(e.to_string())
    }
}

#[async_trait]
impl PixGateway for PixClient {
    #[instrument(skip(self, request), fields(reference_id = %request.reference_id))]
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ServiceError> {
        if request.amount.value <= 0 {
            return Err(ServiceError::ValidationError(
                "Charge amount must be positive".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.charges_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            warn!(error = %err, "Charge creation failed");
            return Err(err);
        }

        let body: CreateChargeBody = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayUnavailable(format!("Invalid charge body: {e}")))?;

        debug!(charge_id = %body.id, txid = %body.txid, "Charge created");

        Ok(ChargeResult {
            charge_id: body.id,
            status: ChargeStatus::from_provider(&body.status),
            qr_image: body.qr_code.image,
            qr_text: body.qr_code.text,
            transaction_id: body.txid,
        })
    }

    #[instrument(skip(self))]
    async fn get_charge_status(&self, transaction_id: &str) -> Result<ChargeStatus, ServiceError> {
        let response = self
            .client
            .get(self.charge_url(transaction_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!(
                "Charge {} not found",
                transaction_id
            )));
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: ChargeStatusBody = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayUnavailable(format!("Invalid status body: {e}")))?;

        Ok(ChargeStatus::from_provider(&body.status))
    }
}
