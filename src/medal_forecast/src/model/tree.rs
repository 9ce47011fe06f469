use serde::{Deserialize, Serialize};

use crate::error::InvocationFailure;

/// A decision tree node; leaves carry `value`, internal nodes split on `feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Feature index compared at an internal node.
    pub feature: u32,
    /// Split threshold.
    pub threshold: f64,
    /// Index of the left child.
    pub left: u32,
    /// Index of the right child.
    pub right: u32,
    /// Leaf output (None for internal nodes).
    pub value: Option<f64>,
}

impl Node {
    /// Internal node.
    pub fn split(feature: u32, threshold: f64, left: u32, right: u32) -> Self {
        Self {
            feature,
            threshold,
            left,
            right,
            value: None,
        }
    }

    /// Leaf node.
    pub fn leaf(value: f64) -> Self {
        Self {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            value: Some(value),
        }
    }
}

/// A single tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Nodes addressed by index.
    pub nodes: Vec<Node>,
}

/// Which way a value equal to the threshold goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    /// `x < threshold` goes left.
    LessThan,
    /// `x <= threshold` goes left.
    LessOrEqual,
}

impl SplitRule {
    fn goes_left(self, x: f64, threshold: f64) -> bool {
        match self {
            SplitRule::LessThan => x < threshold,
            SplitRule::LessOrEqual => x <= threshold,
        }
    }
}

impl Tree {
    /// Check structure against a model with `n_features` inputs.
    ///
    /// Every node must be reachable from the root at most once: that rules out cycles as well as
    /// shared subtrees, so evaluation terminates within `nodes.len()` steps.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if std::mem::replace(&mut seen[idx], true) {
                return Err(format!("node {idx} is reachable more than once"));
            }
            let node = &self.nodes[idx];
            if node.value.is_some() {
                continue;
            }
            if node.feature as usize >= n_features {
                return Err(format!(
                    "node {idx} splits on feature {} but the model has {n_features} features",
                    node.feature
                ));
            }
            for child in [node.left, node.right] {
                let child = child as usize;
                if child >= self.nodes.len() {
                    return Err(format!("node {idx} points to missing node {child}"));
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf. `tree` is only used to label failures.
    pub fn eval(&self, features: &[f64], rule: SplitRule, tree: usize) -> Result<f64, InvocationFailure> {
        let mut idx = 0usize;
        for _ in 0..self.nodes.len() {
            let node = self
                .nodes
                .get(idx)
                .ok_or(InvocationFailure::MalformedTree { tree, node: idx })?;
            if let Some(value) = node.value {
                return Ok(value);
            }
            let x = features
                .get(node.feature as usize)
                .copied()
                .ok_or(InvocationFailure::MalformedTree { tree, node: idx })?;
            idx = if rule.goes_left(x, node.threshold) {
                node.left as usize
            } else {
                node.right as usize
            };
        }
        Err(InvocationFailure::MalformedTree { tree, node: idx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64) -> Tree {
        Tree {
            nodes: vec![Node::split(0, threshold, 1, 2), Node::leaf(10.0), Node::leaf(20.0)],
        }
    }

    #[test]
    fn boundary_follows_split_rule() {
        let t = stump(50.0);
        assert_eq!(t.eval(&[50.0], SplitRule::LessThan, 0), Ok(20.0));
        assert_eq!(t.eval(&[50.0], SplitRule::LessOrEqual, 0), Ok(10.0));
        assert_eq!(t.eval(&[30.0], SplitRule::LessThan, 0), Ok(10.0));
        assert_eq!(t.eval(&[60.0], SplitRule::LessOrEqual, 0), Ok(20.0));
    }

    #[test]
    fn validate_rejects_cycles_and_bad_indices() {
        assert!(stump(1.0).validate(1).is_ok());
        assert!(stump(1.0).validate(0).unwrap_err().contains("feature 0"));

        let cyclic = Tree {
            nodes: vec![Node::split(0, 1.0, 1, 2), Node::split(0, 1.0, 0, 2), Node::leaf(1.0)],
        };
        assert!(cyclic.validate(1).unwrap_err().contains("more than once"));

        let dangling = Tree {
            nodes: vec![Node::split(0, 1.0, 1, 7), Node::leaf(1.0)],
        };
        assert!(dangling.validate(1).unwrap_err().contains("missing node 7"));

        assert!(Tree { nodes: vec![] }.validate(1).is_err());
    }

    #[test]
    fn unvalidated_cycle_fails_instead_of_looping() {
        let cyclic = Tree {
            nodes: vec![Node::split(0, 1.0, 1, 1), Node::split(0, 1.0, 0, 0)],
        };
        assert!(matches!(
            cyclic.eval(&[0.0], SplitRule::LessThan, 3),
            Err(InvocationFailure::MalformedTree { tree: 3, .. })
        ));
    }

    #[test]
    fn short_vector_is_a_malformed_invocation() {
        assert_eq!(
            stump(1.0).eval(&[], SplitRule::LessThan, 0),
            Err(InvocationFailure::MalformedTree { tree: 0, node: 0 })
        );
    }
}
