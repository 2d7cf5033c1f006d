use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub mod pix;

pub use pix::PixClient;

/// Buyer contact block sent with a charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeCustomer {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A purchased line item, priced in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeItem {
    pub name: String,
    pub quantity: u32,
    pub unit_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeAmount {
    /// Minor currency units (centavos)
    pub value: i64,
}

/// Charge creation request. `reference_id` is the idempotency key and
/// must be unique per attempt; reusing one is undefined behavior at the
/// provider and is never masked here.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub reference_id: String,
    pub customer: ChargeCustomer,
    pub items: Vec<ChargeItem>,
    pub amount: ChargeAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Outcome of a successful charge creation.
#[derive(Debug, Clone)]
pub struct ChargeResult {
    pub charge_id: String,
    pub status: ChargeStatus,
    pub qr_image: String,
    pub qr_text: String,
    pub transaction_id: String,
}

/// Charge state as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    Pending,
    Paid,
    Expired,
    Unknown,
}

impl ChargeStatus {
    /// Maps a provider status string; unrecognized values become
    /// `Unknown` so a provider vocabulary change cannot abort polling.
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "PAID" => ChargeStatus::Paid,
            "EXPIRED" => ChargeStatus::Expired,
            "PENDING" | "CREATED" | "WAITING_PAYMENT" => ChargeStatus::Pending,
            _ => ChargeStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChargeStatus::Paid | ChargeStatus::Expired)
    }
}

/// Seam between the orchestration layer and the payment provider.
#[async_trait]
pub trait PixGateway: Send + Sync {
    /// Issues a charge. Transient transport failures and provider 5xx
    /// map to a retryable error kind; provider rejections are fatal for
    /// the attempt and propagate as a distinct kind.
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ServiceError>;

    /// Looks up the current status of a charge. Pure read.
    async fn get_charge_status(&self, transaction_id: &str) -> Result<ChargeStatus, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PAID", ChargeStatus::Paid)]
    #[case("paid", ChargeStatus::Paid)]
    #[case("EXPIRED", ChargeStatus::Expired)]
    #[case("PENDING", ChargeStatus::Pending)]
    #[case("created", ChargeStatus::Pending)]
    #[case("CHARGEBACK", ChargeStatus::Unknown)]
    #[case("", ChargeStatus::Unknown)]
    fn provider_status_mapping(#[case] raw: &str, #[case] expected: ChargeStatus) {
        assert_eq!(ChargeStatus::from_provider(raw), expected);
    }

    #[test]
    fn only_paid_and_expired_are_terminal() {
        assert!(ChargeStatus::Paid.is_terminal());
        assert!(ChargeStatus::Expired.is_terminal());
        assert!(!ChargeStatus::Pending.is_terminal());
        assert!(!ChargeStatus::Unknown.is_terminal());
    }
}
