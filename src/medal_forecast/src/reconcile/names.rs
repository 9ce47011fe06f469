//! Curated country-name → country-code table.
//!
//! The table is versioned data (`data/country_names.toml` is embedded as the default):
//!
//! ```toml
//! [names]
//! "United States" = "USA"
//!
//! [overrides]
//! "People's Republic of China" = "CHN"
//! ```
//!
//! Names are matched after trimming, collapsing inner whitespace and lowercasing. Codes are
//! trimmed, upper-cased and must be three ASCII alphanumerics. `[overrides]` wins over `[names]`.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::Deserialize;

const EMBEDDED: &str = include_str!("../../data/country_names.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NameTable {
    #[serde(default)]
    names: IndexMap<String, String>,
    #[serde(default)]
    overrides: IndexMap<String, String>,
}

/// Normalized name lookup.
#[derive(Debug, Clone, Default)]
pub struct CountryNameMap {
    by_name: HashMap<String, String>,
    codes: HashSet<String>,
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn normalize_code(code: &str) -> anyhow::Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("country code {code:?} is not three alphanumeric characters");
    }
    Ok(code)
}

fn normalize_section(section: &str, raw: IndexMap<String, String>) -> anyhow::Result<IndexMap<String, String>> {
    let mut out = IndexMap::with_capacity(raw.len());
    for (name, code) in raw {
        let key = normalize_name(&name);
        if key.is_empty() {
            bail!("[{section}] contains an empty name");
        }
        let code = normalize_code(&code).with_context(|| format!("[{section}] entry {name:?}"))?;
        match out.get(&key) {
            Some(existing) if *existing != code => {
                bail!("[{section}] maps {name:?} to both {existing} and {code}")
            }
            Some(_) => {}
            None => {
                out.insert(key, code);
            }
        }
    }
    Ok(out)
}

impl CountryNameMap {
    /// The table shipped with the crate.
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_toml_str(EMBEDDED).context("embedded country name table")
    }

    /// Parse and normalize a table.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let table: NameTable = toml::from_str(toml_str).context("failed to parse country name TOML")?;
        let mut by_name: HashMap<String, String> = normalize_section("names", table.names)?.into_iter().collect();
        by_name.extend(normalize_section("overrides", table.overrides)?);
        let codes = by_name.values().cloned().collect();
        Ok(Self { by_name, codes })
    }

    /// Read a table from disk.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("read country name file {}", path.as_ref().display()))?;
        Self::from_toml_str(&text)
    }

    /// Code for `name`. An entry that already is one of the table's codes maps to itself, so
    /// code-keyed result tables reconcile too.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(code) = self.by_name.get(&normalize_name(name)) {
            return Some(code);
        }
        let upper = name.trim().to_ascii_uppercase();
        self.codes.get(&upper).map(String::as_str)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// `true` for an empty table.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
