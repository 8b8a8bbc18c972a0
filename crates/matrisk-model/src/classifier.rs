//! Candidate classifiers over preprocessed feature vectors.
//!
//! Every classifier returns a probability for each class, so callers can
//! report confidence and per-class breakdowns uniformly.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Training algorithms tried during model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    LogisticRegression,
    GaussianNaiveBayes,
    KNearestNeighbors,
}

impl Algorithm {
    /// All candidates, in the order they are tried.
    pub const ALL: [Algorithm; 3] = [
        Algorithm::LogisticRegression,
        Algorithm::GaussianNaiveBayes,
        Algorithm::KNearestNeighbors,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::LogisticRegression => "Logistic Regression",
            Algorithm::GaussianNaiveBayes => "Gaussian Naive Bayes",
            Algorithm::KNearestNeighbors => "K-Nearest Neighbors",
        }
    }

    /// Fits this algorithm on `x` (rows are samples) and class labels `y`.
    pub fn fit(&self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Classifier {
        match self {
            Algorithm::LogisticRegression => {
                Classifier::LogisticRegression(SoftmaxRegression::fit(x, y, n_classes))
            }
            Algorithm::GaussianNaiveBayes => {
                Classifier::GaussianNaiveBayes(GaussianNb::fit(x, y, n_classes))
            }
            Algorithm::KNearestNeighbors => {
                Classifier::KNearestNeighbors(KNearest::fit(x, y, n_classes, KNearest::DEFAULT_K))
            }
        }
    }
}

/// A fitted classifier with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "params", rename_all = "snake_case")]
pub enum Classifier {
    LogisticRegression(SoftmaxRegression),
    GaussianNaiveBayes(GaussianNb),
    KNearestNeighbors(KNearest),
}

impl Classifier {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Classifier::LogisticRegression(_) => Algorithm::LogisticRegression,
            Classifier::GaussianNaiveBayes(_) => Algorithm::GaussianNaiveBayes,
            Classifier::KNearestNeighbors(_) => Algorithm::KNearestNeighbors,
        }
    }

    pub fn name(&self) -> &'static str {
        self.algorithm().name()
    }

    /// Class probabilities for one encoded sample.
    pub fn predict_proba(&self, x: ArrayView1<f64>) -> Vec<f64> {
        match self {
            Classifier::LogisticRegression(m) => m.predict_proba(x),
            Classifier::GaussianNaiveBayes(m) => m.predict_proba(x),
            Classifier::KNearestNeighbors(m) => m.predict_proba(x),
        }
    }

    /// Most probable class for one encoded sample.
    pub fn predict(&self, x: ArrayView1<f64>) -> usize {
        argmax(&self.predict_proba(x))
    }

    /// Fraction of rows whose prediction matches `y`.
    pub fn accuracy(&self, x: &Array2<f64>, y: &[usize]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let correct = x
            .axis_iter(Axis(0))
            .zip(y)
            .filter(|(row, &label)| self.predict(row.view()) == label)
            .count();
        correct as f64 / y.len() as f64
    }
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
        .0
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Multinomial logistic regression trained by batch gradient descent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    /// Shape `(n_features, n_classes)`.
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl SoftmaxRegression {
    const EPOCHS: usize = 500;
    const LEARNING_RATE: f64 = 0.5;
    const L2: f64 = 1e-3;

    pub fn fit(x: &Array2<f64>, y: &[usize], n_classes: usize) -> Self {
        let (n, d) = x.dim();
        let mut weights = Array2::<f64>::zeros((d, n_classes));
        let mut bias = Array1::<f64>::zeros(n_classes);
        if n == 0 {
            return Self { weights, bias };
        }

        let mut onehot = Array2::<f64>::zeros((n, n_classes));
        for (i, &label) in y.iter().enumerate() {
            onehot[[i, label]] = 1.0;
        }

        for _ in 0..Self::EPOCHS {
            let mut probs = x.dot(&weights) + &bias;
            for mut row in probs.axis_iter_mut(Axis(0)) {
                let p = softmax(&row.to_vec());
                row.assign(&Array1::from(p));
            }
            let residual = probs - &onehot;
            let grad_w = x.t().dot(&residual) / n as f64 + &weights * Self::L2;
            let grad_b = residual.sum_axis(Axis(0)) / n as f64;
            weights = weights - grad_w * Self::LEARNING_RATE;
            bias = bias - grad_b * Self::LEARNING_RATE;
        }

        Self { weights, bias }
    }

    pub fn predict_proba(&self, x: ArrayView1<f64>) -> Vec<f64> {
        let logits = x.dot(&self.weights) + &self.bias;
        softmax(&logits.to_vec())
    }
}

/// Gaussian naive Bayes with per-class feature means and variances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNb {
    /// Shape `(n_classes, n_features)`.
    means: Array2<f64>,
    variances: Array2<f64>,
    /// Class frequency in the training set; zero for absent classes.
    priors: Vec<f64>,
}

impl GaussianNb {
    const VAR_SMOOTHING: f64 = 1e-9;

    pub fn fit(x: &Array2<f64>, y: &[usize], n_classes: usize) -> Self {
        let (n, d) = x.dim();
        let mut means = Array2::<f64>::zeros((n_classes, d));
        let mut variances = Array2::<f64>::ones((n_classes, d));
        let mut priors = vec![0.0; n_classes];

        let epsilon = Self::VAR_SMOOTHING
            * x.var_axis(Axis(0), 0.0)
                .iter()
                .copied()
                .fold(0.0, f64::max)
                .max(1.0);

        for class in 0..n_classes {
            let rows: Vec<usize> = (0..n).filter(|&i| y[i] == class).collect();
            if rows.is_empty() {
                continue;
            }
            let subset = x.select(Axis(0), &rows);
            if let Some(mean) = subset.mean_axis(Axis(0)) {
                means.row_mut(class).assign(&mean);
            }
            let var = subset.var_axis(Axis(0), 0.0) + epsilon;
            variances.row_mut(class).assign(&var);
            priors[class] = rows.len() as f64 / n as f64;
        }

        Self { means, variances, priors }
    }

    pub fn predict_proba(&self, x: ArrayView1<f64>) -> Vec<f64> {
        let joint: Vec<f64> = self
            .priors
            .iter()
            .enumerate()
            .map(|(class, &prior)| {
                if prior <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                let mean = self.means.row(class);
                let var = self.variances.row(class);
                let log_likelihood: f64 = x
                    .iter()
                    .zip(mean.iter().zip(var.iter()))
                    .map(|(&xi, (&m, &v))| {
                        -0.5 * ((2.0 * std::f64::consts::PI * v).ln() + (xi - m).powi(2) / v)
                    })
                    .sum();
                prior.ln() + log_likelihood
            })
            .collect();
        softmax(&joint)
    }
}

/// Brute-force k-nearest neighbours voting on Euclidean distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearest {
    k: usize,
    n_classes: usize,
    points: Array2<f64>,
    labels: Vec<usize>,
}

impl KNearest {
    pub const DEFAULT_K: usize = 5;

    pub fn fit(x: &Array2<f64>, y: &[usize], n_classes: usize, k: usize) -> Self {
        Self {
            k: k.max(1),
            n_classes,
            points: x.clone(),
            labels: y.to_vec(),
        }
    }

    pub fn predict_proba(&self, x: ArrayView1<f64>) -> Vec<f64> {
        let mut votes = vec![0.0; self.n_classes];
        if self.labels.is_empty() {
            return vec![1.0 / self.n_classes as f64; self.n_classes];
        }

        let mut distances: Vec<(f64, usize)> = self
            .points
            .axis_iter(Axis(0))
            .zip(&self.labels)
            .map(|(p, &label)| {
                let d: f64 = p.iter().zip(x.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                (d, label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let neighbours = &distances[..self.k.min(distances.len())];
        for &(_, label) in neighbours {
            votes[label] += 1.0;
        }
        let total = neighbours.len() as f64;
        votes.into_iter().map(|v| v / total).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn clusters() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [-2.0, -2.0],
            [-2.2, -1.8],
            [-1.8, -2.1],
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [2.0, 2.1],
            [2.1, 1.9],
            [1.9, 2.0],
        ];
        (x, vec![0, 0, 0, 1, 1, 1, 2, 2, 2])
    }

    #[test]
    fn every_algorithm_separates_clusters() {
        let (x, y) = clusters();
        for algorithm in Algorithm::ALL {
            let model = algorithm.fit(&x, &y, 3);
            assert_eq!(model.accuracy(&x, &y), 1.0, "{}", algorithm.name());
            assert_eq!(model.predict(array![2.5, 2.5].view()), 2, "{}", algorithm.name());
        }
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = clusters();
        for algorithm in Algorithm::ALL {
            let probs = algorithm.fit(&x, &y, 3).predict_proba(array![0.5, 0.5].view());
            assert_eq!(probs.len(), 3);
            assert_abs_diff_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn absent_class_gets_zero_probability() {
        let (x, y) = clusters();
        let nb = GaussianNb::fit(&x, &y, 4);
        let probs = nb.predict_proba(array![0.0, 0.0].view());
        assert_eq!(probs[3], 0.0);
    }

    #[test]
    fn knn_votes_are_fractions_of_k() {
        let (x, y) = clusters();
        let knn = KNearest::fit(&x, &y, 3, 3);
        assert_eq!(knn.predict_proba(array![-2.0, -2.0].view()), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn classifier_json_names_its_algorithm() {
        let (x, y) = clusters();
        let model = Algorithm::GaussianNaiveBayes.fit(&x, &y, 3);
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["algorithm"], "gaussian_naive_bayes");

        let back: Classifier = serde_json::from_value(json).unwrap();
        assert_eq!(back.name(), "Gaussian Naive Bayes");
    }
}
