//! Feature materialization: stats record + ordered feature list → model input vector.
//!
//! A [`FeatureSpec`] is derived once per model load by resolving every declared feature name
//! against the [`RuleTable`]. After that, [`materialize`] is a pure lookup per feature and never
//! fails; unmapped features read 0.

mod materialize;
pub mod rules;

pub use materialize::{MaterializeContext, materialize};
pub use rules::{FillRule, Proxy, RULES_VERSION, RuleStage, RuleTable, StatsField};

use serde::Serialize;

/// Numeric model input, ordered exactly as the model's [`FeatureSpec`].
pub type FeatureVector = Vec<f64>;

/// One declared feature and the rule that fills it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFeature {
    /// Name as declared by the model.
    pub name: String,
    /// Rule chosen at derivation time.
    #[serde(flatten)]
    pub rule: FillRule,
}

/// Ordered feature list of one model.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeatureSpec {
    features: Vec<ResolvedFeature>,
}

impl FeatureSpec {
    /// Resolve each name in order; duplicates are kept so the vector still lines up with the
    /// model's columns.
    pub fn derive<S: AsRef<str>>(names: &[S], rules: &RuleTable) -> Self {
        let features = names
            .iter()
            .map(|n| {
                let name = n.as_ref().to_string();
                let rule = rules.resolve(&name);
                ResolvedFeature { name, rule }
            })
            .collect();
        Self { features }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// `true` for a model with no inputs.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Resolved features in model order.
    pub fn features(&self) -> &[ResolvedFeature] {
        &self.features
    }

    /// Names in model order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    fn names_at(&self, stage: RuleStage) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| f.rule.stage() == stage)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Features filled by a lossy proxy.
    pub fn proxied(&self) -> Vec<String> {
        self.names_at(RuleStage::Proxy)
    }

    /// Features no rule matched; they read 0.
    pub fn unmapped(&self) -> Vec<String> {
        self.names_at(RuleStage::Unmapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_preserves_order_and_classifies() {
        let spec = FeatureSpec::derive(
            &[
                "total_athletes",
                "medalist_athletes",
                "coach_count",
                "season_Winter",
                "gdp_per_capita",
            ],
            &RuleTable::default(),
        );
        assert_eq!(spec.len(), 5);
        assert_eq!(
            spec.names().collect::<Vec<_>>(),
            vec![
                "total_athletes",
                "medalist_athletes",
                "coach_count",
                "season_Winter",
                "gdp_per_capita"
            ]
        );
        assert_eq!(spec.proxied(), vec!["medalist_athletes", "gdp_per_capita"]);
        assert_eq!(spec.unmapped(), vec!["coach_count"]);
    }

    #[test]
    fn serialized_spec_lists_rules() {
        let spec = FeatureSpec::derive(&["avg_athlete_age", "is_host"], &RuleTable::default());
        insta::assert_json_snapshot!(spec, @r#"
        {
          "features": [
            {
              "name": "avg_athlete_age",
              "rule": "field",
              "source": "avg_age_athletes",
              "null_default": 24.0
            },
            {
              "name": "is_host",
              "rule": "host_flag"
            }
          ]
        }
        "#);
    }
}
