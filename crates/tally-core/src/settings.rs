//! # Settings
//!
//! The single settings record of a store, and the deep merge that keeps
//! older persisted records compatible with newer defaults.
//!
//! ## Merge Rule
//! ```text
//!   defaults                     persisted / remote              result
//!   ─────────────────────        ─────────────────────          ─────────────────────
//!   soundConfig.enabled: true    soundConfig.volume: 20         soundConfig.enabled: true
//!   soundConfig.volume:  70                                     soundConfig.volume:  20
//!   cloudSync.url:       null    (missing)                      cloudSync.url:       null
//! ```
//!
//! Objects merge key by key, recursively. Anything else in the overlay
//! replaces the default, except `null`, which keeps the default.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::Collection;

// =============================================================================
// Settings Record
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub store: StoreProfile,
    pub tax: TaxSettings,
    pub sound_config: SoundConfig,
    pub cloud_sync: CloudSyncSettings,
    pub sequences: SequenceOffsets,
    pub safety: SafetySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreProfile {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub currency_symbol: String,
}

impl Default for StoreProfile {
    fn default() -> Self {
        StoreProfile {
            name: "My Store".to_string(),
            address: None,
            phone: None,
            currency_symbol: "$".to_string(),
        }
    }
}

/// Tax rate in basis points (1600 = 16%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxSettings {
    pub enabled: bool,
    pub rate_bps: u32,
    pub included_in_price: bool,
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            enabled: false,
            rate_bps: 1600,
            included_in_price: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundConfig {
    pub enabled: bool,
    /// 0 to 100.
    pub volume: u8,
    pub sale_sound: String,
    pub error_sound: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        SoundConfig {
            enabled: true,
            volume: 70,
            sale_sound: "register".to_string(),
            error_sound: "buzz".to_string(),
        }
    }
}

/// Remote snapshot store coordinates. Read-only to the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudSyncSettings {
    pub enable_cloud_sync: bool,
    pub url: Option<String>,
    pub secret: Option<String>,
}

impl CloudSyncSettings {
    /// Returns the remote endpoint when cloud sync is on and a URL is set.
    pub fn endpoint(&self) -> Option<(&str, Option<&str>)> {
        if !self.enable_cloud_sync {
            return None;
        }
        let url = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        Some((url, self.secret.as_deref()))
    }
}

/// First id handed out per sequenced collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequenceOffsets {
    pub products: i64,
    pub customers: i64,
    pub suppliers: i64,
    pub cash_movements: i64,
    pub orders: i64,
    pub purchases: i64,
    pub transactions: i64,
}

impl Default for SequenceOffsets {
    fn default() -> Self {
        SequenceOffsets {
            products: 1,
            customers: 1,
            suppliers: 1,
            cash_movements: 1,
            orders: 1,
            purchases: 1,
            transactions: 1,
        }
    }
}

impl SequenceOffsets {
    /// Starting offset for a collection; 1 for anything unsequenced.
    pub fn offset_for(&self, collection: Collection) -> i64 {
        match collection {
            Collection::Products => self.products,
            Collection::Customers => self.customers,
            Collection::Suppliers => self.suppliers,
            Collection::CashMovements => self.cash_movements,
            Collection::Orders => self.orders,
            Collection::Purchases => self.purchases,
            Collection::Transactions => self.transactions,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SafetySettings {
    /// Activity newer than this counts as "recent" for the push safety check.
    pub recent_activity_window_hours: i64,
}

impl Default for SafetySettings {
    fn default() -> Self {
        SafetySettings {
            recent_activity_window_hours: 24,
        }
    }
}

// =============================================================================
// Merge
// =============================================================================

impl Settings {
    /// Builds settings from an untrusted JSON value, merged over the defaults.
    ///
    /// Falls back to the defaults when the merged value does not deserialize.
    ///
    /// ```rust
    /// use tally_core::Settings;
    ///
    /// let s = Settings::merged_from(&serde_json::json!({ "soundConfig": { "volume": 20 } }));
    /// assert_eq!(s.sound_config.volume, 20);
    /// assert!(s.sound_config.enabled);
    /// ```
    pub fn merged_from(overlay: &Value) -> Settings {
        Settings::default().merge(overlay)
    }

    /// Merges `overlay` over `self` sub-record by sub-record.
    pub fn merge(&self, overlay: &Value) -> Settings {
        let mut base = match serde_json::to_value(self) {
            Ok(v) => v,
            Err(_) => return self.clone(),
        };
        deep_merge(&mut base, overlay);
        serde_json::from_value(base).unwrap_or_else(|_| self.clone())
    }
}

/// Recursively merges `overlay` into `base`.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay.clone(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
