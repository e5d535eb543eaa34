//! Random forest of weighted CART trees with gini impurity.
//!
//! Trees are grown depth-first from an explicit work stack, so deep trees
//! never recurse. Each node stores the weighted proportion of title samples
//! that reached it; a forest's probability is the mean of its trees' leaf
//! proportions.

use serde::{Deserialize, Serialize};

use crate::{ClassifierError, FeatureVector, N_FEATURES, TitleScorer};

/// Hyperparameters for [`RandomForest::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` means `floor(sqrt(n_features))`.
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample of the training rows for each tree.
    pub bootstrap: bool,
    /// Weight each class by `n / (2 * n_class)`.
    pub balanced: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            balanced: true,
        }
    }
}

impl ForestParams {
    fn features_per_split(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (N_FEATURES as f64).sqrt().floor() as usize)
            .clamp(1, N_FEATURES)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

fn gini(w0: f64, w1: f64) -> f64 {
    let total = w0 + w1;
    if total <= 0.0 {
        return 0.0;
    }
    let (p0, p1) = (w0 / total, w1 / total);
    1.0 - p0 * p0 - p1 * p1
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// `w_left * gini_left + w_right * gini_right`
    child_impurity: f64,
}

/// Borrowed training data for growing one tree.
struct Grower<'a> {
    x: &'a [FeatureVector],
    y: &'a [bool],
    weights: &'a [f64],
    params: &'a ForestParams,
    max_features: usize,
}

impl Grower<'_> {
    fn class_weights(&self, samples: &[usize]) -> (f64, f64) {
        samples.iter().fold((0.0, 0.0), |(w0, w1), &i| {
            if self.y[i] {
                (w0, w1 + self.weights[i])
            } else {
                (w0 + self.weights[i], w1)
            }
        })
    }

    fn best_split(
        &self,
        samples: &[usize],
        totals: (f64, f64),
        rng: &mut fastrand::Rng,
    ) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..N_FEATURES).collect();
        rng.shuffle(&mut features);

        let n = samples.len();
        let mut order = samples.to_vec();
        let mut best: Option<SplitCandidate> = None;
        let mut informative = 0;

        // Keep drawing past constant features until `max_features` features
        // with at least two distinct values have been examined.
        for feature in features {
            if informative >= self.max_features {
                break;
            }
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));
            if self.x[order[0]][feature] >= self.x[order[n - 1]][feature] {
                continue;
            }
            informative += 1;

            let (mut lw0, mut lw1) = (0.0, 0.0);
            for pos in 0..n - 1 {
                let i = order[pos];
                if self.y[i] {
                    lw1 += self.weights[i];
                } else {
                    lw0 += self.weights[i];
                }

                let here = self.x[i][feature];
                let next = self.x[order[pos + 1]][feature];
                if here >= next {
                    continue;
                }
                let n_left = pos + 1;
                if n_left < self.params.min_samples_leaf
                    || n - n_left < self.params.min_samples_leaf
                {
                    continue;
                }

                let (rw0, rw1) = (totals.0 - lw0, totals.1 - lw1);
                let (wl, wr) = (lw0 + lw1, rw0 + rw1);
                if wl <= 0.0 || wr <= 0.0 {
                    continue;
                }
                let child_impurity = wl * gini(lw0, lw1) + wr * gini(rw0, rw1);
                if best
                    .as_ref()
                    .is_none_or(|b| child_impurity < b.child_impurity)
                {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next || !threshold.is_finite() {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        child_impurity,
                    });
                }
            }
        }
        best
    }

    /// Grow one tree over `samples` (indices into the training data, with
    /// repeats for bootstrap draws). Returns the tree and its unnormalized
    /// impurity decrease per feature.
    fn grow(
        &self,
        samples: Vec<usize>,
        rng: &mut fastrand::Rng,
    ) -> (DecisionTree, [f64; N_FEATURES]) {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut importances = [0.0; N_FEATURES];
        let mut stack = vec![(0usize, samples, 0usize)];

        while let Some((id, samples, depth)) = stack.pop() {
            let (w0, w1) = self.class_weights(&samples);
            let total = w0 + w1;
            let impurity = gini(w0, w1);
            let value = if total > 0.0 { w1 / total } else { 0.0 };

            let splittable = impurity > 0.0
                && samples.len() >= self.params.min_samples_split
                && samples.len() >= 2 * self.params.min_samples_leaf
                && self.params.max_depth.is_none_or(|d| depth < d);

            let split = if splittable {
                self.best_split(&samples, (w0, w1), rng)
            } else {
                None
            };
            let Some(split) = split else {
                nodes[id] = Node::Leaf { value };
                continue;
            };

            importances[split.feature] += total * impurity - split.child_impurity;
            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&i| self.x[i][split.feature] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            stack.push((right, right_samples, depth + 1));
            stack.push((left, left_samples, depth + 1));
        }

        (DecisionTree { nodes }, importances)
    }
}

impl DecisionTree {
    /// Weighted title proportion of the leaf `features` falls into.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if features[feature] <= threshold { left } else { right },
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(Node::Split { left, right, .. }) = self.nodes.get(id) {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }

    /// Structural checks for trees read from disk: children always come
    /// after their parent, so traversal is bounded.
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = *node
            {
                if feature >= N_FEATURES {
                    return Err(format!("node {id} splits on unknown feature {feature}"));
                }
                let n = self.nodes.len();
                if left <= id || right <= id || left >= n || right >= n {
                    return Err(format!("node {id} has out-of-order children"));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: ForestParams,
    pub n_features: usize,
    /// Mean decrease in impurity per feature, summing to 1.
    pub feature_importances: Vec<f64>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(
        x: &[FeatureVector],
        y: &[bool],
        params: &ForestParams,
        rng: &mut fastrand::Rng,
    ) -> Result<Self, ClassifierError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ClassifierError::InsufficientData(format!(
                "{} feature rows for {} labels",
                x.len(),
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(ClassifierError::InsufficientData("n_trees must be positive".into()));
        }

        let n = x.len();
        let n_pos = y.iter().filter(|&&t| t).count();
        let weights: Vec<f64> = if params.balanced {
            let w_pos = if n_pos > 0 { n as f64 / (2.0 * n_pos as f64) } else { 1.0 };
            let w_neg = if n_pos < n { n as f64 / (2.0 * (n - n_pos) as f64) } else { 1.0 };
            y.iter().map(|&t| if t { w_pos } else { w_neg }).collect()
        } else {
            vec![1.0; n]
        };

        let grower = Grower {
            x,
            y,
            weights: &weights,
            params,
            max_features: params.features_per_split(),
        };

        let mut trees = Vec::with_capacity(params.n_trees);
        let mut importances = [0.0; N_FEATURES];
        for _ in 0..params.n_trees {
            let mut tree_rng = fastrand::Rng::with_seed(rng.u64(..));
            let samples: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| tree_rng.usize(0..n)).collect()
            } else {
                (0..n).collect()
            };
            let (tree, tree_importances) = grower.grow(samples, &mut tree_rng);
            let sum: f64 = tree_importances.iter().sum();
            if sum > 0.0 {
                for (acc, v) in importances.iter_mut().zip(tree_importances) {
                    *acc += v / sum;
                }
            }
            trees.push(tree);
        }

        let sum: f64 = importances.iter().sum();
        let feature_importances = importances
            .iter()
            .map(|v| if sum > 0.0 { v / sum } else { 0.0 })
            .collect();

        tracing::debug!(
            trees = trees.len(),
            max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
            "random forest fitted"
        );
        Ok(Self {
            params: params.clone(),
            n_features: N_FEATURES,
            feature_importances,
            trees,
        })
    }

    pub fn predict_proba(&self, features: &FeatureVector) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(features)).sum::<f64>() / self.trees.len() as f64
    }

    /// Hard decision: title when the probability exceeds one half.
    pub fn predict(&self, features: &FeatureVector) -> bool {
        self.predict_proba(features) > 0.5
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.n_features != N_FEATURES {
            return Err(format!(
                "model expects {} features, this build computes {N_FEATURES}",
                self.n_features
            ));
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        self.trees.iter().try_for_each(DecisionTree::validate)
    }
}

impl TitleScorer for RandomForest {
    fn title_probability(&self, features: &FeatureVector) -> f64 {
        self.predict_proba(features)
    }
}
