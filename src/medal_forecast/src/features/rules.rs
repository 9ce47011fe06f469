//! The closed rule table that maps model feature names to values.
//!
//! Resolution runs once per model load. For every declared feature name the first matching stage
//! wins:
//!
//! 1. **Direct** – the name (or a documented alias) is a column of the stats record, or `is_host`
//!    which comes from the request context.
//! 2. **Indicator** – one-hot columns: `country_3_letter_code_<CODE>`, `country_code_<CODE>`,
//!    `noc_<CODE>` and `season_<Summer|Winter>`.
//! 3. **Proxy** – a stand-in for a quantity the stats table does not track.
//! 4. **Unmapped** – fed as 0.
//!
//! | proxy feature             | value                     | rationale                                   |
//! |---------------------------|---------------------------|---------------------------------------------|
//! | `medalist_athletes`       | `total_medals`            | one medal ≈ one medalist; team events overcount |
//! | `avg_athlete_experience`  | 1.0                       | prior-games history is not stored           |
//! | `avg_games_participation` | 1.0                       | same                                        |
//! | `gdp_per_capita`          | 0.0                       | no economic data in the table               |
//! | `population`              | 0.0                       | no demographic data in the table            |

use indexmap::IndexMap;
use olympic_stats::{Season, StatsRecord};
use serde::Serialize;

/// Bumped whenever a rule is added, removed or changes meaning.
pub const RULES_VERSION: u32 = 1;

/// Age substituted when a record has no mean athlete age.
pub const DEFAULT_AVG_AGE: f64 = 24.0;

const COUNTRY_INDICATOR_PREFIXES: [&str; 3] = ["country_3_letter_code_", "country_code_", "noc_"];
const SEASON_INDICATOR_PREFIX: &str = "season_";

/// Numeric columns of a stats record a feature can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsField {
    /// `total_athletes`
    TotalAthletes,
    /// `total_medals`
    TotalMedals,
    /// `gold_medals`
    GoldMedals,
    /// `silver_medals`
    SilverMedals,
    /// `bronze_medals`
    BronzeMedals,
    /// `medals_in_current_year`
    MedalsInCurrentYear,
    /// `avg_age_athletes` (nullable)
    AvgAgeAthletes,
    /// `cumulative_medals`
    CumulativeMedals,
    /// `year`
    Year,
}

impl StatsField {
    /// Read the field; `None` only for a NULL mean age.
    pub fn read(self, rec: &StatsRecord) -> Option<f64> {
        match self {
            StatsField::TotalAthletes => Some(f64::from(rec.total_athletes)),
            StatsField::TotalMedals => Some(f64::from(rec.total_medals)),
            StatsField::GoldMedals => Some(f64::from(rec.gold_medals)),
            StatsField::SilverMedals => Some(f64::from(rec.silver_medals)),
            StatsField::BronzeMedals => Some(f64::from(rec.bronze_medals)),
            StatsField::MedalsInCurrentYear => Some(f64::from(rec.medals_in_current_year)),
            StatsField::AvgAgeAthletes => rec.avg_age_athletes,
            StatsField::CumulativeMedals => Some(rec.cumulative_medals),
            StatsField::Year => Some(f64::from(rec.year)),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "total_athletes" => StatsField::TotalAthletes,
            "total_medals" => StatsField::TotalMedals,
            "gold_medals" => StatsField::GoldMedals,
            "silver_medals" => StatsField::SilverMedals,
            "bronze_medals" => StatsField::BronzeMedals,
            "medals_in_current_year" => StatsField::MedalsInCurrentYear,
            "avg_age_athletes" | "avg_athlete_age" => StatsField::AvgAgeAthletes,
            "cumulative_medals" => StatsField::CumulativeMedals,
            "year" => StatsField::Year,
            _ => return None,
        })
    }
}

/// Stage of the rule table that produced a feature's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStage {
    /// Stage 1.
    Direct,
    /// Stage 2.
    Indicator,
    /// Stage 3.
    Proxy,
    /// Stage 4.
    Unmapped,
}

/// How one feature's value is computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum FillRule {
    /// Copy a record column; NULL becomes `null_default`.
    Field {
        /// Column read.
        source: StatsField,
        /// Substitute for NULL.
        null_default: f64,
    },
    /// 1 for the edition host, else 0.
    HostFlag,
    /// 1 when the target edition is in this season.
    SeasonIndicator {
        /// Season encoded by the column.
        season: Season,
    },
    /// 1 when the record's country is `code`.
    CountryIndicator {
        /// Upper-cased country code.
        code: String,
    },
    /// Copy a record column standing in for an untracked quantity.
    ProxyField {
        /// Column read.
        source: StatsField,
    },
    /// Fixed stand-in value.
    ProxyConstant {
        /// Value fed to the model.
        value: f64,
    },
    /// No rule matched.
    Unmapped,
}

impl FillRule {
    /// Stage that produced this rule.
    pub fn stage(&self) -> RuleStage {
        match self {
            FillRule::Field { .. } | FillRule::HostFlag => RuleStage::Direct,
            FillRule::SeasonIndicator { .. } | FillRule::CountryIndicator { .. } => RuleStage::Indicator,
            FillRule::ProxyField { .. } | FillRule::ProxyConstant { .. } => RuleStage::Proxy,
            FillRule::Unmapped => RuleStage::Unmapped,
        }
    }
}

/// A stage-3 stand-in and why it is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proxy {
    /// Value source.
    pub rule: FillRule,
    /// Human-readable justification, surfaced in documentation and `inspect` output.
    pub note: String,
}

/// Versioned rule table; proxy constants may be overridden from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    avg_age_default: f64,
    proxies: IndexMap<String, Proxy>,
}

impl Default for RuleTable {
    fn default() -> Self {
        let mut proxies = IndexMap::new();
        proxies.insert(
            "medalist_athletes".to_string(),
            Proxy {
                rule: FillRule::ProxyField {
                    source: StatsField::TotalMedals,
                },
                note: "medalist count approximated by medals won".into(),
            },
        );
        for (name, value, note) in [
            ("avg_athlete_experience", 1.0, "prior-games experience is not tracked"),
            ("avg_games_participation", 1.0, "prior-games participation is not tracked"),
            ("gdp_per_capita", 0.0, "economic indicators are not tracked"),
            ("population", 0.0, "population is not tracked"),
        ] {
            proxies.insert(
                name.to_string(),
                Proxy {
                    rule: FillRule::ProxyConstant { value },
                    note: note.into(),
                },
            );
        }
        Self {
            avg_age_default: DEFAULT_AVG_AGE,
            proxies,
        }
    }
}

impl RuleTable {
    /// Replace the NULL-age substitute.
    pub fn with_avg_age_default(mut self, age: f64) -> Self {
        self.avg_age_default = age;
        self
    }

    /// Set (or add) a constant proxy.
    pub fn with_proxy_constant(mut self, name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        let note = match self.proxies.get(&name) {
            Some(existing) => existing.note.clone(),
            None => "configured constant".to_string(),
        };
        self.proxies.insert(
            name,
            Proxy {
                rule: FillRule::ProxyConstant { value },
                note,
            },
        );
        self
    }

    /// NULL-age substitute in effect.
    pub fn avg_age_default(&self) -> f64 {
        self.avg_age_default
    }

    /// Every proxy, in declaration order.
    pub fn proxies(&self) -> impl Iterator<Item = (&str, &Proxy)> {
        self.proxies.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve one feature name to its rule.
    pub fn resolve(&self, name: &str) -> FillRule {
        if name == "is_host" {
            return FillRule::HostFlag;
        }
        if let Some(source) = StatsField::from_name(name) {
            let null_default = match source {
                StatsField::AvgAgeAthletes => self.avg_age_default,
                _ => 0.0,
            };
            return FillRule::Field { source, null_default };
        }
        if let Some(code) = country_indicator(name) {
            return FillRule::CountryIndicator { code };
        }
        if let Some(season) = name
            .strip_prefix(SEASON_INDICATOR_PREFIX)
            .and_then(|s| s.parse::<Season>().ok())
        {
            return FillRule::SeasonIndicator { season };
        }
        if let Some(proxy) = self.proxies.get(name) {
            return proxy.rule.clone();
        }
        FillRule::Unmapped
    }
}

fn country_indicator(name: &str) -> Option<String> {
    COUNTRY_INDICATOR_PREFIXES.iter().find_map(|prefix| {
        let code = name.strip_prefix(prefix)?;
        (code.len() == 3 && code.chars().all(|c| c.is_ascii_alphanumeric()))
            .then(|| code.to_ascii_uppercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_and_alias_resolve_to_the_same_column() {
        let rules = RuleTable::default();
        let expected = FillRule::Field {
            source: StatsField::AvgAgeAthletes,
            null_default: DEFAULT_AVG_AGE,
        };
        assert_eq!(rules.resolve("avg_age_athletes"), expected);
        assert_eq!(rules.resolve("avg_athlete_age"), expected);
    }

    #[test]
    fn indicators() {
        let rules = RuleTable::default();
        assert_eq!(
            rules.resolve("country_3_letter_code_FRA"),
            FillRule::CountryIndicator { code: "FRA".into() }
        );
        assert_eq!(
            rules.resolve("noc_ru1"),
            FillRule::CountryIndicator { code: "RU1".into() }
        );
        assert_eq!(
            rules.resolve("season_Winter"),
            FillRule::SeasonIndicator { season: Season::Winter }
        );
        // Not a 3-character code.
        assert_eq!(rules.resolve("country_code_FRANCE"), FillRule::Unmapped);
    }

    #[test]
    fn proxies_and_fallthrough() {
        let rules = RuleTable::default();
        assert_eq!(
            rules.resolve("medalist_athletes"),
            FillRule::ProxyField { source: StatsField::TotalMedals }
        );
        assert_eq!(rules.resolve("gdp_per_capita"), FillRule::ProxyConstant { value: 0.0 });
        assert_eq!(rules.resolve("coach_count"), FillRule::Unmapped);
        assert_eq!(rules.resolve("is_host"), FillRule::HostFlag);
    }

    #[test]
    fn configured_constants_override_defaults() {
        let rules = RuleTable::default()
            .with_proxy_constant("avg_athlete_experience", 2.5)
            .with_proxy_constant("coach_count", 12.0)
            .with_avg_age_default(25.0);
        assert_eq!(
            rules.resolve("avg_athlete_experience"),
            FillRule::ProxyConstant { value: 2.5 }
        );
        assert_eq!(rules.resolve("coach_count"), FillRule::ProxyConstant { value: 12.0 });
        assert_eq!(
            rules.resolve("avg_athlete_age"),
            FillRule::Field {
                source: StatsField::AvgAgeAthletes,
                null_default: 25.0
            }
        );
        let notes: Vec<&str> = rules.proxies().map(|(_, p)| p.note.as_str()).collect();
        assert!(notes.contains(&"prior-games experience is not tracked"));
        assert!(notes.contains(&"configured constant"));
    }
}
