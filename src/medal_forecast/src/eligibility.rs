//! Country codes that cannot field a team at a future Games.

use std::collections::BTreeSet;

/// Dissolved, merged, superseded or suspended entities excluded from forecasts.
pub const DEFAULT_DEFUNCT_CODES: [&str; 14] = [
    "URS", "GDR", "FRG", "EUN", "ROC", "TCH", "YUG", "SCG", "BOH", "ANZ", "RU1", "UAR", "RUS", "BLR",
];

/// Set of excluded country codes; membership is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityFilter {
    defunct: BTreeSet<String>,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DEFUNCT_CODES)
    }
}

impl EligibilityFilter {
    /// Filter excluding exactly `codes`.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            defunct: codes
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// `true` if `country_code` may appear in a forecast.
    pub fn is_eligible(&self, country_code: &str) -> bool {
        !self.defunct.contains(&country_code.trim().to_ascii_uppercase())
    }

    /// Excluded codes, sorted.
    pub fn defunct(&self) -> impl Iterator<Item = &str> {
        self.defunct.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_excludes_historical_entities() {
        let f = EligibilityFilter::default();
        for code in ["URS", "urs", "GDR", "RUS", "BLR", " ROC "] {
            assert!(!f.is_eligible(code), "{code} should be excluded");
        }
        for code in ["USA", "FRA", "GER", "AIN"] {
            assert!(f.is_eligible(code));
        }
        assert_eq!(f.defunct().count(), 14);
    }

    #[test]
    fn custom_list_replaces_default() {
        let f = EligibilityFilter::new(["yug", "", "YUG"]);
        assert!(!f.is_eligible("YUG"));
        assert!(f.is_eligible("URS"));
        assert_eq!(f.defunct().collect::<Vec<_>>(), vec!["YUG"]);
    }
}
