//! Normalized transfer events.

use crate::entities::payload::RawTransfer;
use crate::lookup::{LabelBook, PriceBook};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors produced when a single raw transfer cannot be normalized.
///
/// A malformed transfer is dropped with a warning; it never fails the
/// batch it arrived in.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The value string does not parse as a number.
    #[error("transfer value {raw:?} is not a number")]
    UnparseableValue { raw: String },

    /// The value parsed but is NaN or infinite.
    #[error("transfer value {raw:?} is not finite")]
    NonFiniteValue { raw: String },

    /// The value parsed but is negative.
    #[error("transfer value {raw:?} is negative")]
    NegativeValue { raw: String },
}

/// One normalized on-chain ERC-20 transfer.
///
/// `transaction_hash` is the identity key: two events with the same hash
/// are the same transfer. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    pub transaction_hash: String,
    pub sender: String,
    pub receiver: String,
    pub token_name: String,
    pub token_symbol: String,
    /// The original decimal string, kept for display fidelity.
    pub raw_value: String,
    /// Decimal-adjusted value as a float.
    pub value: f64,
    /// `value` times the configured USD price; 0.0 when no price is known.
    pub usd_value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub block_timestamp: OffsetDateTime,
    pub sender_label: String,
    pub receiver_label: String,
}

impl TransferEvent {
    /// Normalize one raw transfer into a [`TransferEvent`].
    ///
    /// The value must be a finite, non-negative number. A missing USD
    /// price is the documented degraded case and yields `usd_value = 0.0`
    /// rather than an error; label resolution never fails (it falls back
    /// to a truncated address).
    pub fn normalize(
        raw: &RawTransfer,
        block_timestamp: OffsetDateTime,
        prices: &PriceBook,
        labels: &LabelBook,
    ) -> Result<Self, NormalizeError> {
        let value: f64 =
            raw.value_with_decimals
                .trim()
                .parse()
                .map_err(|_| NormalizeError::UnparseableValue {
                    raw: raw.value_with_decimals.clone(),
                })?;
        if !value.is_finite() {
            return Err(NormalizeError::NonFiniteValue {
                raw: raw.value_with_decimals.clone(),
            });
        }
        if value < 0.0 {
            return Err(NormalizeError::NegativeValue {
                raw: raw.value_with_decimals.clone(),
            });
        }

        let usd_value = prices.usd_price(raw.contract_address.as_deref()) * value;

        Ok(Self {
            transaction_hash: raw.transaction_hash.clone(),
            sender: raw.from.clone(),
            receiver: raw.to.clone(),
            token_name: raw.token_name.clone(),
            token_symbol: raw.token_symbol.clone(),
            raw_value: raw.value_with_decimals.clone(),
            value,
            usd_value,
            block_timestamp,
            sender_label: labels.resolve(&raw.from),
            receiver_label: labels.resolve(&raw.to),
        })
    }
}
