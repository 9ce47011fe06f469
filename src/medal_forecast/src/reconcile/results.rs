use std::{io::Read, path::Path};

use anyhow::Context;
use serde::Deserialize;

/// One row of an authoritative medal table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthoritativeEntry {
    /// Entity name as published.
    #[serde(alias = "country", alias = "Country", alias = "NOC")]
    pub name: String,
    /// Total medals won.
    #[serde(alias = "Total", alias = "total_medals")]
    pub total: u32,
}

impl AuthoritativeEntry {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, total: u32) -> Self {
        Self {
            name: name.into(),
            total,
        }
    }
}

/// Read a results CSV (header row required; extra columns are ignored).
pub fn read_results<R: Read>(reader: R) -> anyhow::Result<Vec<AuthoritativeEntry>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("results row {}", i + 2)))
        .collect()
}

/// [`read_results`] over a file.
pub fn read_results_path(path: impl AsRef<Path>) -> anyhow::Result<Vec<AuthoritativeEntry>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("open results file {}", path.display()))?;
    read_results(file)
}
