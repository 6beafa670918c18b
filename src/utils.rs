//! Header names and encoding helpers shared by the gate and the client.

use crate::errors::{Result, ShieldPayError};
use crate::types::SettlementReceipt;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Request header carrying the caller's proof of payment.
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Response header carrying the base64-encoded [`SettlementReceipt`].
pub const PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// Encodes a settlement receipt as base64 JSON for the `X-PAYMENT-RESPONSE` header.
///
/// # Examples
///
/// ```
/// use shieldpay::types::SettlementReceipt;
/// use shieldpay::utils::encode_receipt_header;
///
/// let encoded = encode_receipt_header(&SettlementReceipt::settled("tx123", "ALEO")).unwrap();
/// assert!(!encoded.is_empty());
/// ```
pub fn encode_receipt_header(receipt: &SettlementReceipt) -> Result<String> {
    let json = serde_json::to_vec(receipt)?;
    Ok(BASE64.encode(json))
}

/// Decodes a base64 JSON settlement receipt from the `X-PAYMENT-RESPONSE` header.
///
/// # Examples
///
/// ```
/// use shieldpay::types::SettlementReceipt;
/// use shieldpay::utils::{decode_receipt_header, encode_receipt_header};
///
/// let receipt = SettlementReceipt::settled("tx123", "ALEO");
/// let encoded = encode_receipt_header(&receipt).unwrap();
/// assert_eq!(decode_receipt_header(&encoded).unwrap(), receipt);
/// ```
pub fn decode_receipt_header(encoded: &str) -> Result<SettlementReceipt> {
    let decoded = BASE64.decode(encoded.trim().as_bytes())?;
    let json_str = String::from_utf8(decoded)
        .map_err(|e| ShieldPayError::InvalidReceipt(format!("Invalid UTF-8: {}", e)))?;
    let receipt = serde_json::from_str(&json_str)?;
    Ok(receipt)
}
