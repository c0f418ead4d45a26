use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::error::PredictError;

pub const FOREST_ARTIFACT_VERSION: u32 = 1;

/// Pre-trained random-forest classifier, exported from the training
/// collaborator as versioned JSON. Trees use sklearn-style parallel node
/// arrays. Pure function of the input vector; nothing mutates between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    pub version: u32,
    pub n_features: usize,
    /// Training-time column order. Absent on older exports; the assembler
    /// then uses its own fixed construction order.
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Class label per probability slot, in the forest's own class order.
    pub class_labels: Vec<String>,
    pub trees: Vec<Tree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    /// Split column per node; -1 marks a leaf.
    pub feature: Vec<i32>,
    pub threshold: Vec<f64>,
    pub left: Vec<i32>,
    pub right: Vec<i32>,
    /// Per-node class counts; only meaningful at leaves.
    pub value: Vec<Vec<f64>>,
}

impl ForestModel {
    pub fn n_classes(&self) -> usize {
        self.class_labels.len()
    }

    /// Per-class probabilities in `class_labels` order, averaged over the
    /// normalized leaf distributions of every tree.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, PredictError> {
        if features.len() != self.n_features {
            return Err(PredictError::FeatureShape(format!(
                "classifier expects {} columns, got {}",
                self.n_features,
                features.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(PredictError::Internal(
                "forest artifact has no trees".to_string(),
            ));
        }

        let n_classes = self.n_classes();
        let mut acc = vec![0.0_f64; n_classes];
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let leaf = tree
                .leaf_distribution(features, n_classes)
                .map_err(|msg| PredictError::Internal(format!("tree {tree_idx}: {msg}")))?;
            for (a, p) in acc.iter_mut().zip(&leaf) {
                *a += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        for a in acc.iter_mut() {
            *a /= n_trees;
        }
        Ok(acc)
    }

    /// Predicted class code (argmax; first wins on ties, matching the
    /// training stack).
    pub fn predict(&self, features: &[f64]) -> Result<usize, PredictError> {
        let probs = self.predict_proba(features)?;
        Ok(argmax(&probs))
    }
}

pub fn argmax(probs: &[f64]) -> usize {
    let mut best = 0usize;
    for (idx, p) in probs.iter().enumerate() {
        if *p > probs[best] {
            best = idx;
        }
    }
    best
}

impl Tree {
    /// Structural checks run once at artifact load; a failure here is a
    /// fatal startup condition, never a per-request error.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        let n_nodes = self.feature.len();
        if n_nodes == 0 {
            bail!("tree has no nodes");
        }
        if self.threshold.len() != n_nodes
            || self.left.len() != n_nodes
            || self.right.len() != n_nodes
            || self.value.len() != n_nodes
        {
            bail!("node arrays have inconsistent lengths");
        }
        for node in 0..n_nodes {
            let split = self.feature[node];
            if split < 0 {
                let counts = &self.value[node];
                if counts.len() != n_classes {
                    bail!(
                        "leaf {node} has {} class counts, model has {n_classes} classes",
                        counts.len()
                    );
                }
                if counts.iter().sum::<f64>() <= 0.0 {
                    bail!("leaf {node} has no class counts");
                }
            } else {
                if split as usize >= n_features {
                    bail!("node {node} splits on column {split}, model has {n_features} columns");
                }
                for child in [self.left[node], self.right[node]] {
                    if child < 0 || child as usize >= n_nodes {
                        bail!("node {node} child {child} out of bounds");
                    }
                }
            }
        }
        Ok(())
    }

    // Walks to a leaf and returns its normalized class distribution.
    // Guards stay in place even after validate() so that hand-built test
    // forests fail loudly instead of panicking.
    fn leaf_distribution(&self, features: &[f64], n_classes: usize) -> Result<Vec<f64>, String> {
        let n_nodes = self.feature.len();
        if self.threshold.len() != n_nodes
            || self.left.len() != n_nodes
            || self.right.len() != n_nodes
            || self.value.len() != n_nodes
        {
            return Err("node arrays have inconsistent lengths".to_string());
        }

        let mut node = 0usize;
        let mut hops = 0usize;
        loop {
            if node >= n_nodes {
                return Err(format!("node index {node} out of bounds"));
            }
            let split = self.feature[node];
            if split < 0 {
                let counts = &self.value[node];
                if counts.len() != n_classes {
                    return Err(format!(
                        "leaf {node} has {} class counts, expected {n_classes}",
                        counts.len()
                    ));
                }
                let total: f64 = counts.iter().sum();
                if total <= 0.0 {
                    return Err(format!("leaf {node} has no class counts"));
                }
                return Ok(counts.iter().map(|c| c / total).collect());
            }

            let col = split as usize;
            if col >= features.len() {
                return Err(format!("split on column {col} outside the feature vector"));
            }
            let next = if features[col] <= self.threshold[node] {
                self.left[node]
            } else {
                self.right[node]
            };
            node = next as usize;
            hops += 1;
            if hops > n_nodes {
                return Err("cycle detected during traversal".to_string());
            }
        }
    }
}
