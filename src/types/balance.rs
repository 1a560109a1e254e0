//! Account balances: mutated field-by-field by partial pushes, keyed by
//! asset symbol. Snapshot rows arrive as full records.

use serde::{Deserialize, Serialize};

use super::de;

/// Balance kind. Margin balances carry derived margin fields that plain asset
/// balances do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceKind {
    Asset,
    Margin,
}

impl Default for BalanceKind {
    fn default() -> Self {
        BalanceKind::Asset
    }
}

/// Partial balance push (`ab` frames). Only fields present on the wire
/// overwrite the stored balance; absent fields are left alone.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BalancePush {
    pub asset: String,
    #[serde(default)]
    pub kind: Option<BalanceKind>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub available: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub locked: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub margin_level: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub unrealized_pnl: Option<f64>,
}

/// One stored account balance, keyed by asset symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Balance {
    pub asset: String,
    #[serde(default)]
    pub kind: BalanceKind,
    #[serde(default, deserialize_with = "de::f64_flexible")]
    pub total: f64,
    #[serde(default, deserialize_with = "de::f64_flexible")]
    pub available: f64,
    #[serde(default, deserialize_with = "de::f64_flexible")]
    pub locked: f64,
    /// Margin accounts only.
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub margin_level: Option<f64>,
    /// Margin accounts only.
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub unrealized_pnl: Option<f64>,
}

impl Balance {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            kind: BalanceKind::default(),
            total: 0.0,
            available: 0.0,
            locked: 0.0,
            margin_level: None,
            unrealized_pnl: None,
        }
    }

    /// Merge a partial push: present fields overwrite, absent fields keep
    /// their stored value.
    pub fn merge(&mut self, push: &BalancePush) {
        if let Some(v) = push.kind {
            self.kind = v;
        }
        if let Some(v) = push.total {
            self.total = v;
        }
        if let Some(v) = push.available {
            self.available = v;
        }
        if let Some(v) = push.locked {
            self.locked = v;
        }
        if let Some(v) = push.margin_level {
            self.margin_level = Some(v);
        }
        if let Some(v) = push.unrealized_pnl {
            self.unrealized_pnl = Some(v);
        }
    }

    /// Equity including unrealized PnL where the account kind has one.
    pub fn equity(&self) -> f64 {
        self.total + self.unrealized_pnl.unwrap_or(0.0)
    }
}
