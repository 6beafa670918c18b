//! Wire types exchanged by the payment gate, the facilitator and clients.
//!
//! Field names follow the JSON shapes the resource server has always spoken
//! (`camelCase` where the facilitator protocol uses it).

use serde::{Deserialize, Serialize};

/// Settlement outcome attached to a paid response in the `X-PAYMENT-RESPONSE` header.
///
/// Carried as base64-encoded JSON; see [`crate::utils::encode_receipt_header`].
///
/// # Examples
///
/// ```
/// use shieldpay::types::SettlementReceipt;
///
/// let receipt = SettlementReceipt::settled("tx123", "ALEO");
/// assert!(receipt.success);
/// assert_eq!(receipt.transaction, "tx123");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    /// Whether settlement succeeded
    pub success: bool,

    /// Transaction identifier returned by the ledger
    pub transaction: String,

    /// Network label of the route that was paid for
    pub network: String,
}

impl SettlementReceipt {
    /// Builds the receipt for a successful settlement.
    pub fn settled(transaction: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            success: true,
            transaction: transaction.into(),
            network: network.into(),
        }
    }
}

/// Body of a `402 Payment Required` response sent when the proof header is missing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequiredBody {
    /// Human-readable reason
    pub error: String,

    /// Required price in the smallest currency unit
    pub amount: u64,

    /// Payee address
    pub recipient: String,
}

/// Generic `{ "error": ... }` body used by the gate and the facilitator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    /// Human-readable reason
    pub error: String,
}

/// Request to a facilitator's `/settle` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SettleRequest {
    /// Payee address
    #[serde(rename = "payTo")]
    pub pay_to: String,

    /// Amount in the smallest currency unit
    pub amount: u64,

    /// Network label the transfer should happen on
    pub network: String,
}

/// Response from a facilitator's `/settle` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SettleResponse {
    /// Whether the transfer was submitted
    pub success: bool,

    /// Transaction identifier, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    /// Network the transfer was submitted to
    pub network: String,

    /// Reason for failure, present when `success` is false
    #[serde(
        rename = "errorReason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error_reason: Option<String>,
}

impl SettleResponse {
    /// Successful settlement with the given transaction id.
    pub fn settled(transaction: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            success: true,
            transaction: Some(transaction.into()),
            network: network.into(),
            error_reason: None,
        }
    }

    /// Failed settlement with a reason.
    pub fn failed(network: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction: None,
            network: network.into(),
            error_reason: Some(reason.into()),
        }
    }
}

/// Response from a facilitator's `/supported` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SupportedResponse {
    /// Network labels the facilitator can settle on
    pub networks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_receipt_shape() {
        let receipt = SettlementReceipt::settled("tx123", "ALEO");
        let value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "transaction": "tx123", "network": "ALEO"})
        );
    }

    #[test]
    fn test_settle_request_uses_pay_to_camel_case() {
        let request = SettleRequest {
            pay_to: "aleo1payee".to_string(),
            amount: 100000,
            network: "ALEO".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"payTo\""));
        assert!(!json.contains("pay_to"));
    }

    #[test]
    fn test_failed_settle_response() {
        let response = SettleResponse::failed("ALEO", "no spendable record");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "network": "ALEO", "errorReason": "no spendable record"})
        );

        let parsed: SettleResponse =
            serde_json::from_value(json!({"success": true, "transaction": "at1", "network": "ALEO"}))
                .unwrap();
        assert_eq!(parsed.transaction.as_deref(), Some("at1"));
        assert!(parsed.error_reason.is_none());
    }
}
