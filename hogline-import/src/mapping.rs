//! Item-name mapping table
//!
//! Known curling.io line-item names mapped to catalog external ids. The
//! built-in table covers the club's standing catalog; an operator can layer
//! a TOML file on top for one-off items without a code change:
//!
//! ```toml
//! [items]
//! "2026 Spring Bonspiel Entry" = "cio-bonspiel-2026"
//! ```

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Known item names from the upstream store, keyed by exact trimmed name.
const BUILTIN_ITEM_MAPPINGS: &[(&str, &str)] = &[
    ("2025-2026 Membership: Active", "cio-mem-active"),
    ("2025-2026 Membership: Social", "cio-mem-social"),
    ("2025-2026 Membership: Junior", "cio-mem-junior"),
    ("2025-2026 Membership: Senior", "cio-mem-senior"),
    ("2025-2026 Membership: Couple", "cio-mem-couple"),
    ("Learn to Curl Program (Fall)", "cio-ltc-fall"),
    ("Learn to Curl Program (Winter)", "cio-ltc-winter"),
    ("Locker Rental", "cio-locker"),
];

/// Free-text item name → catalog external id.
#[derive(Debug, Clone)]
pub struct ItemMapping {
    entries: HashMap<String, String>,
}

impl ItemMapping {
    /// The compiled-in mapping table.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_ITEM_MAPPINGS
                .iter()
                .map(|(name, id)| (name.to_string(), id.to_string()))
                .collect(),
        }
    }

    /// Built-in table plus overrides from a TOML `[items]` table.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read mapping file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("invalid mapping file {}", path.display()))?;

        let mut mapping = Self::builtin();
        let items = value
            .get("items")
            .and_then(|v| v.as_table())
            .ok_or_else(|| {
                anyhow::anyhow!("mapping file {} has no [items] table", path.display())
            })?;

        for (name, id) in items {
            let id = id.as_str().ok_or_else(|| {
                anyhow::anyhow!("mapping for {:?} must be a string external id", name)
            })?;
            mapping
                .entries
                .insert(name.trim().to_string(), id.to_string());
        }

        tracing::info!(
            path = %path.display(),
            entries = mapping.entries.len(),
            "Item mapping loaded"
        );
        Ok(mapping)
    }

    pub fn external_id_for(&self, item_name: &str) -> Option<&str> {
        self.entries.get(item_name.trim()).map(String::as_str)
    }
}
