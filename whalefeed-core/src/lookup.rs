//! Price and label lookups.
//!
//! Both books are pure, case-insensitive maps keyed by account or
//! contract address. They are external collaborators from the pipeline's
//! point of view: a missing price degrades to 0.0 and a missing label
//! degrades to a truncated address, never to an error.

use std::collections::HashMap;

/// USD price per token contract address.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    prices: HashMap<String, f64>,
}

impl PriceBook {
    /// Build a book from `(contract_address, usd_price)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        Self {
            prices: pairs
                .into_iter()
                .map(|(address, price)| (normalize_address(&address), price))
                .collect(),
        }
    }

    /// Look up the USD price for a contract address.
    ///
    /// Returns 0.0 when the address is absent or unknown; the caller
    /// multiplies, so unknown tokens surface as `usd_value = 0.0`.
    pub fn usd_price(&self, contract_address: Option<&str>) -> f64 {
        contract_address
            .and_then(|address| self.prices.get(&normalize_address(address)))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Display names per account address.
#[derive(Debug, Clone, Default)]
pub struct LabelBook {
    labels: HashMap<String, String>,
}

impl LabelBook {
    /// Build a book from `(address, label)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            labels: pairs
                .into_iter()
                .map(|(address, label)| (normalize_address(&address), label))
                .collect(),
        }
    }

    /// Resolve an address to a display name.
    ///
    /// Falls back to the truncated address form when no label is
    /// registered.
    pub fn resolve(&self, address: &str) -> String {
        self.labels
            .get(&normalize_address(address))
            .cloned()
            .unwrap_or_else(|| truncate_address(address))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Truncate an address to `first 6 chars + "..." + last 4 chars`.
///
/// Addresses too short to truncate are returned unchanged.
pub fn truncate_address(address: &str) -> String {
    let address = address.trim();
    if address.chars().count() <= 10 {
        return address.to_string();
    }
    let head: String = address.chars().take(6).collect();
    let tail: String = address
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{head}...{tail}")
}
