//! Inbound webhook payload shapes.
//!
//! These structs map directly to the JSON body pushed by the indexing
//! service. Parsing and validation happen once, at the intake boundary;
//! everything downstream works with the typed [`WebhookPayload`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Errors produced when an inbound payload fails shape validation.
///
/// These are rejected at the intake boundary and never reach the
/// pipeline's shared state.
#[derive(Debug, Error)]
pub enum MalformedPayload {
    /// The request body is not valid JSON for the webhook shape.
    #[error("payload is not valid webhook JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The transfer list is absent or empty.
    #[error("payload contains no ERC-20 transfers")]
    EmptyTransfers,

    /// The block timestamp is not a unix-seconds value.
    #[error("block timestamp {raw:?} is not a unix-seconds value")]
    BadBlockTimestamp { raw: String },
}

/// Block metadata attached to a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    /// Block number, as a decimal string.
    pub number: String,
    /// Block hash.
    pub hash: String,
    /// Block timestamp, as a decimal string of unix seconds.
    pub timestamp: String,
}

/// One raw ERC-20 transfer record as delivered by the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransfer {
    pub transaction_hash: String,
    pub from: String,
    pub to: String,
    pub token_name: String,
    pub token_symbol: String,
    /// Transfer value with token decimals already applied, as a decimal string.
    pub value_with_decimals: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

/// The full inbound webhook payload: one block plus its transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub chain_id: String,
    pub block: BlockDescriptor,
    #[serde(default)]
    pub erc20_transfers: Vec<RawTransfer>,
}

impl WebhookPayload {
    /// Parse and validate a payload from raw request bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MalformedPayload> {
        let payload: Self = serde_json::from_slice(bytes)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Parse and validate a payload from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MalformedPayload> {
        let payload: Self = serde_json::from_value(value)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Validate the payload shape.
    ///
    /// A payload with no transfers is a client error, not an empty batch.
    pub fn validate(&self) -> Result<(), MalformedPayload> {
        if self.erc20_transfers.is_empty() {
            return Err(MalformedPayload::EmptyTransfers);
        }
        Ok(())
    }

    /// Resolve the block timestamp to an instant.
    ///
    /// Every transfer in the payload inherits this instant, so an
    /// unparseable timestamp rejects the whole payload.
    pub fn block_instant(&self) -> Result<OffsetDateTime, MalformedPayload> {
        let raw = self.block.timestamp.trim();
        let seconds: i64 = raw.parse().map_err(|_| MalformedPayload::BadBlockTimestamp {
            raw: self.block.timestamp.clone(),
        })?;
        OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| {
            MalformedPayload::BadBlockTimestamp {
                raw: self.block.timestamp.clone(),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "confirmed": true,
            "chainId": "0x1",
            "block": {
                "number": "18570000",
                "hash": "0xblock",
                "timestamp": "1700000000"
            },
            "erc20Transfers": [{
                "transactionHash": "0xA",
                "from": "0x1111111111111111111111111111111111111111",
                "to": "0x2222222222222222222222222222222222222222",
                "tokenName": "Pepe",
                "tokenSymbol": "PEPE",
                "valueWithDecimals": "100"
            }]
        })
    }

    #[test]
    fn test_parse_valid_payload() {
        let payload = WebhookPayload::from_value(sample_payload()).unwrap();
        assert!(payload.confirmed);
        assert_eq!(payload.chain_id, "0x1");
        assert_eq!(payload.erc20_transfers.len(), 1);
        assert_eq!(payload.erc20_transfers[0].transaction_hash, "0xA");
        assert_eq!(payload.erc20_transfers[0].contract_address, None);
    }

    #[test]
    fn test_empty_transfer_list_rejected() {
        let mut value = sample_payload();
        value["erc20Transfers"] = json!([]);
        let err = WebhookPayload::from_value(value).unwrap_err();
        assert!(matches!(err, MalformedPayload::EmptyTransfers));

        let mut value = sample_payload();
        value.as_object_mut().unwrap().remove("erc20Transfers");
        let err = WebhookPayload::from_value(value).unwrap_err();
        assert!(matches!(err, MalformedPayload::EmptyTransfers));
    }

    #[test]
    fn test_block_instant_from_unix_seconds() {
        let payload = WebhookPayload::from_value(sample_payload()).unwrap();
        let instant = payload.block_instant().unwrap();
        assert_eq!(instant, time::macros::datetime!(2023-11-14 22:13:20 UTC));
    }

    #[test]
    fn test_bad_block_timestamp_rejected() {
        let mut value = sample_payload();
        value["block"]["timestamp"] = json!("not-a-number");
        let payload = WebhookPayload::from_value(value).unwrap();
        let err = payload.block_instant().unwrap_err();
        assert!(matches!(err, MalformedPayload::BadBlockTimestamp { .. }));
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = WebhookPayload::from_slice(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, MalformedPayload::Json(_)));
    }
}
