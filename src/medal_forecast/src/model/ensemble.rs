use super::{MedalModel, ModelArtifact, ModelFamily, SplitRule, Tree};
use crate::error::{InvocationFailure, ModelLoadError};

/// Validated tree ensemble ready for evaluation.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    family: ModelFamily,
    feature_names: Vec<String>,
    base_score: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Validate an artifact. `fallback_features` is used when the artifact carries no names.
    pub fn from_artifact(
        artifact: ModelArtifact,
        fallback_features: Option<&[String]>,
    ) -> Result<Self, ModelLoadError> {
        let ModelArtifact {
            family,
            feature_names,
            base_score,
            trees,
        } = artifact;

        let feature_names = match (feature_names, fallback_features) {
            (Some(names), _) if !names.is_empty() => names,
            (_, Some(fallback)) if !fallback.is_empty() => fallback.to_vec(),
            _ => return Err(ModelLoadError::MissingFeatureNames),
        };
        if trees.is_empty() {
            return Err(ModelLoadError::Invalid("ensemble has no trees".into()));
        }
        if !base_score.is_finite() {
            return Err(ModelLoadError::Invalid(format!("base score {base_score} is not finite")));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(feature_names.len())
                .map_err(|e| ModelLoadError::Invalid(format!("tree {i}: {e}")))?;
        }

        Ok(Self {
            family,
            feature_names,
            base_score,
            trees,
        })
    }

    /// Number of trees.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn split_rule(&self) -> SplitRule {
        match self.family {
            ModelFamily::GradientBoosting => SplitRule::LessThan,
            ModelFamily::RandomForest => SplitRule::LessOrEqual,
        }
    }
}

impl MedalModel for TreeEnsemble {
    fn family(&self) -> ModelFamily {
        self.family
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_raw(&self, features: &[f64]) -> Result<f64, InvocationFailure> {
        let rule = self.split_rule();
        let mut sum = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            sum += tree.eval(features, rule, i)?;
        }
        Ok(match self.family {
            ModelFamily::GradientBoosting => self.base_score + sum,
            ModelFamily::RandomForest => sum / self.trees.len() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    fn athletes_tree(low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![Node::split(0, 100.0, 1, 2), Node::leaf(low), Node::leaf(high)],
        }
    }

    fn artifact(family: ModelFamily, names: Option<Vec<String>>) -> ModelArtifact {
        ModelArtifact {
            family,
            feature_names: names,
            base_score: 2.0,
            trees: vec![athletes_tree(1.0, 10.0), athletes_tree(3.0, 30.0)],
        }
    }

    #[test]
    fn boosting_sums_over_base_score() {
        let m = TreeEnsemble::from_artifact(
            artifact(ModelFamily::GradientBoosting, Some(vec!["total_athletes".into()])),
            None,
        )
        .unwrap();
        assert_eq!(m.predict_raw(&[50.0]).unwrap(), 6.0);
        // Threshold value goes right under the boosting convention.
        assert_eq!(m.predict_raw(&[100.0]).unwrap(), 42.0);
        assert_eq!(m.predict(&[150.0]), Ok(42));
    }

    #[test]
    fn forest_averages_and_ignores_base_score() {
        let m = TreeEnsemble::from_artifact(
            artifact(ModelFamily::RandomForest, None),
            Some(&["total_athletes".to_string()]),
        )
        .unwrap();
        assert_eq!(m.feature_names(), ["total_athletes".to_string()]);
        assert_eq!(m.predict_raw(&[100.0]).unwrap(), 2.0);
        assert_eq!(m.predict_raw(&[101.0]).unwrap(), 20.0);
        assert_eq!(m.tree_count(), 2);
    }

    #[test]
    fn wrong_vector_length_is_a_shape_failure() {
        let m = TreeEnsemble::from_artifact(
            artifact(ModelFamily::RandomForest, Some(vec!["a".into(), "b".into()])),
            None,
        )
        .unwrap();
        assert_eq!(
            m.predict(&[1.0]),
            Err(InvocationFailure::Shape {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn load_validation() {
        assert!(matches!(
            TreeEnsemble::from_artifact(artifact(ModelFamily::RandomForest, None), None),
            Err(ModelLoadError::MissingFeatureNames)
        ));
        let mut empty = artifact(ModelFamily::GradientBoosting, Some(vec!["x".into()]));
        empty.trees.clear();
        assert!(matches!(
            TreeEnsemble::from_artifact(empty, None),
            Err(ModelLoadError::Invalid(_))
        ));
        let mut bad = artifact(ModelFamily::GradientBoosting, Some(vec!["x".into()]));
        bad.trees[1].nodes[0].feature = 4;
        let err = TreeEnsemble::from_artifact(bad, None).unwrap_err();
        assert!(err.to_string().contains("tree 1"));
    }
}
