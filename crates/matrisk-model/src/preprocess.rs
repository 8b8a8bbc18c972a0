//! Feature preprocessing fitted from a training dataset.

use matrisk_core::{FeatureRecord, LabelEncoder, LabelEncoders, Preprocessor, RiskError, RiskTier};
use matrisk_data::Dataset;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// How a single feature column is turned into a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Standardized with the training mean and population deviation.
    Numeric { mean: f64, std: f64 },
    /// Replaced by its index in the column's label encoder.
    Categorical,
}

/// Preprocessor fitted on a dataset: standard scaling for numeric columns,
/// label encoding for categorical columns and the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    target_column: String,
    feature_columns: Vec<String>,
    encodings: Vec<ColumnEncoding>,
    label_encoders: LabelEncoders,
}

impl Preprocessor for FittedPreprocessor {
    fn label_encoders(&self) -> Option<&LabelEncoders> {
        Some(&self.label_encoders)
    }

    fn feature_columns(&self) -> Option<&[String]> {
        Some(&self.feature_columns)
    }
}

fn fit_target(values: &[&str]) -> LabelEncoder {
    let tiers: Option<Vec<RiskTier>> = values.iter().map(|v| RiskTier::from_alias(v)).collect();
    match tiers {
        Some(mut tiers) => {
            tiers.sort();
            tiers.dedup();
            LabelEncoder::from_classes(tiers.iter().map(|t| t.label().to_string()).collect())
        }
        None => LabelEncoder::fit(values.iter().copied()),
    }
}

fn fit_numeric(values: &[f64]) -> ColumnEncoding {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    ColumnEncoding::Numeric {
        mean,
        std: if std.is_finite() && std > 0.0 { std } else { 1.0 },
    }
}

impl FittedPreprocessor {
    /// Fits encoders on every non-target column of `dataset`.
    pub fn fit(dataset: &Dataset, target_column: &str) -> Result<Self, ModelError> {
        if dataset.is_empty() {
            return Err(ModelError::Data(matrisk_data::DataError::Empty));
        }

        let mut label_encoders = LabelEncoders::new();
        label_encoders.insert(target_column.to_string(), fit_target(&dataset.column(target_column)?));

        let mut feature_columns = Vec::new();
        let mut encodings = Vec::new();
        for name in dataset.columns.iter().filter(|c| *c != target_column) {
            let cells = dataset.column(name)?;
            let numeric: Option<Vec<f64>> = cells.iter().map(|c| c.trim().parse().ok()).collect();
            let encoding = match numeric {
                Some(values) => fit_numeric(&values),
                None => {
                    label_encoders.insert(name.clone(), LabelEncoder::fit(cells.iter().copied()));
                    ColumnEncoding::Categorical
                }
            };
            feature_columns.push(name.clone());
            encodings.push(encoding);
        }

        if feature_columns.is_empty() {
            return Err(ModelError::NoFeatures);
        }

        Ok(Self {
            target_column: target_column.to_string(),
            feature_columns,
            encodings,
            label_encoders,
        })
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Feature columns in encoding order.
    pub fn columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn n_features(&self) -> usize {
        self.feature_columns.len()
    }

    /// Number of target classes.
    pub fn n_classes(&self) -> usize {
        self.target_encoder().map_or(0, |e| e.classes().len())
    }

    fn target_encoder(&self) -> Option<&LabelEncoder> {
        self.label_encoders.get(&self.target_column)
    }

    /// Class index of a raw target label, accepting tier aliases.
    pub fn encode_target(&self, raw: &str) -> Option<usize> {
        let encoder = self.target_encoder()?;
        encoder.transform(raw).or_else(|| {
            RiskTier::from_alias(raw).and_then(|tier| encoder.transform(tier.label()))
        })
    }

    fn encode_cell(&self, column: usize, cell: &str) -> Option<f64> {
        let name = &self.feature_columns[column];
        match &self.encodings[column] {
            ColumnEncoding::Numeric { mean, std } => {
                cell.trim().parse::<f64>().ok().map(|v| (v - mean) / std)
            }
            ColumnEncoding::Categorical => self
                .label_encoders
                .get(name)
                .and_then(|enc| enc.transform(cell))
                .map(|i| i as f64),
        }
    }

    /// Encodes a whole dataset into a feature matrix and class labels.
    pub fn encode_dataset(&self, dataset: &Dataset) -> Result<(Array2<f64>, Vec<usize>), ModelError> {
        let indices = self
            .feature_columns
            .iter()
            .map(|c| {
                dataset
                    .column_index(c)
                    .ok_or_else(|| matrisk_data::DataError::MissingColumn(c.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let target = dataset
            .column_index(&self.target_column)
            .ok_or_else(|| matrisk_data::DataError::MissingColumn(self.target_column.clone()))?;

        let mut x = Array2::zeros((dataset.len(), indices.len()));
        let mut y = Vec::with_capacity(dataset.len());
        for (r, row) in dataset.rows.iter().enumerate() {
            for (j, &idx) in indices.iter().enumerate() {
                x[[r, j]] = self.encode_cell(j, &row[idx]).ok_or_else(|| ModelError::BadCell {
                    row: r,
                    column: self.feature_columns[j].clone(),
                    value: row[idx].clone(),
                })?;
            }
            let label = &row[target];
            y.push(self.encode_target(label).ok_or_else(|| ModelError::BadCell {
                row: r,
                column: self.target_column.clone(),
                value: label.clone(),
            })?);
        }
        Ok((x, y))
    }

    /// Encodes one request's features in column order. Extra keys are ignored.
    pub fn transform(&self, features: &FeatureRecord) -> Result<Array1<f64>, RiskError> {
        self.feature_columns
            .iter()
            .zip(&self.encodings)
            .map(|(name, encoding)| {
                let value = features
                    .get(name)
                    .ok_or_else(|| RiskError::MissingFeature(name.clone()))?;
                match encoding {
                    ColumnEncoding::Numeric { mean, std } => value
                        .as_f64()
                        .map(|v| (v - mean) / std)
                        .ok_or_else(|| RiskError::invalid_feature(name, "expected a number")),
                    ColumnEncoding::Categorical => {
                        let label = value.as_label();
                        self.label_encoders
                            .get(name)
                            .and_then(|enc| enc.transform(&label))
                            .map(|i| i as f64)
                            .ok_or_else(|| {
                                RiskError::invalid_feature(name, format!("unseen category '{}'", label))
                            })
                    }
                }
            })
            .collect::<Result<Vec<f64>, RiskError>>()
            .map(Array1::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dataset() -> Dataset {
        let csv = "Age,Smoker,RiskLevel\n20,no,low risk\n30,yes,high risk\n40,no,mid risk\n";
        Dataset::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn canonical_target_classes_follow_severity() {
        let pre = FittedPreprocessor::fit(&dataset(), "RiskLevel").unwrap();
        let target = pre.label_encoders().unwrap().get("RiskLevel").unwrap();

        assert_eq!(target.classes(), ["Low Risk", "Medium Risk", "High Risk"]);
        assert_eq!(pre.encode_target("mid risk"), Some(1));
        assert_eq!(pre.n_classes(), 3);
    }

    #[test]
    fn unknown_target_labels_are_sorted() {
        let csv = "x,RiskLevel\n1,b\n2,a\n3,c\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let pre = FittedPreprocessor::fit(&ds, "RiskLevel").unwrap();
        assert_eq!(pre.encode_target("a"), Some(0));
        assert_eq!(pre.encode_target("c"), Some(2));
    }

    #[test]
    fn columns_are_scaled_or_encoded() {
        let pre = FittedPreprocessor::fit(&dataset(), "RiskLevel").unwrap();
        assert_eq!(pre.feature_columns().unwrap(), ["Age", "Smoker"]);

        let (x, y) = pre.encode_dataset(&dataset()).unwrap();
        assert_eq!(y, vec![0, 2, 1]);
        assert_abs_diff_eq!(x[[1, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[[2, 0]], 10.0 / (200.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!(x[[1, 1]], 1.0);
    }

    #[test]
    fn transform_reports_missing_and_invalid_features() {
        let pre = FittedPreprocessor::fit(&dataset(), "RiskLevel").unwrap();

        let missing = FeatureRecord::new().with_numeric("Age", 30.0);
        assert_eq!(
            pre.transform(&missing).unwrap_err(),
            RiskError::MissingFeature("Smoker".into())
        );

        let bad_number = FeatureRecord::new()
            .with_categorical("Age", "thirty")
            .with_categorical("Smoker", "no");
        assert!(matches!(
            pre.transform(&bad_number).unwrap_err(),
            RiskError::InvalidFeature { ref field, .. } if field == "Age"
        ));

        let unseen = FeatureRecord::new()
            .with_numeric("Age", 30.0)
            .with_categorical("Smoker", "sometimes");
        assert!(matches!(
            pre.transform(&unseen).unwrap_err(),
            RiskError::InvalidFeature { ref field, .. } if field == "Smoker"
        ));
    }

    #[test]
    fn transform_coerces_numeric_text_and_ignores_extras() {
        let pre = FittedPreprocessor::fit(&dataset(), "RiskLevel").unwrap();
        let record = FeatureRecord::new()
            .with_categorical("Age", "30")
            .with_categorical("Smoker", "yes")
            .with_categorical("Notes", "ignored");
        let x = pre.transform(&record).unwrap();
        assert_eq!(x.len(), 2);
        assert_abs_diff_eq!(x[0], 0.0, epsilon = 1e-12);
    }
}
