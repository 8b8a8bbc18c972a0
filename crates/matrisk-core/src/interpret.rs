//! Risk interpreter: class index and probabilities to user-facing guidance.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::gateway::{LabelEncoder, LabelEncoders};
use crate::{Prediction, RiskError};

/// Column names checked, in order, for a target label encoder.
pub const TARGET_COLUMN_CANDIDATES: [&str; 6] =
    ["RiskLevel", "Risk", "risk_level", "risk", "target", "Target"];

/// The three pregnancy risk tiers.
///
/// Class indices 0, 1, 2 are assumed to mean Low, Medium, High when no
/// target encoder is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// All tiers in class-index order.
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    /// Display label, e.g. `"High Risk"`.
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
        }
    }

    /// Tier at a class index of the fixed table.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Tier whose display label matches exactly.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Tier for a raw dataset label such as `"mid risk"` or `"HIGH"`.
    pub fn from_alias(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low risk" | "low" => Some(RiskTier::Low),
            "mid risk" | "medium risk" | "mid" | "medium" => Some(RiskTier::Medium),
            "high risk" | "high" => Some(RiskTier::High),
            _ => None,
        }
    }

    fn guidance(&self) -> &'static Guidance {
        match self {
            RiskTier::Low => &LOW_GUIDANCE,
            RiskTier::Medium => &MEDIUM_GUIDANCE,
            RiskTier::High => &HIGH_GUIDANCE,
        }
    }
}

/// Static content shown for a risk tier.
#[derive(Debug, PartialEq, Eq)]
pub struct Guidance {
    /// Bootstrap contextual class used by the UI.
    pub color: &'static str,
    pub message: &'static str,
    pub recommendations: &'static [&'static str],
}

static LOW_GUIDANCE: Guidance = Guidance {
    color: "success",
    message: "Low risk pregnancy. Continue with regular prenatal care.",
    recommendations: &[
        "Maintain regular prenatal checkups",
        "Follow a healthy diet rich in folic acid, iron, and calcium",
        "Stay physically active as recommended by your doctor",
        "Avoid alcohol, smoking, and harmful substances",
        "Take prenatal vitamins as prescribed",
        "Monitor weight gain according to medical guidelines",
    ],
};

static MEDIUM_GUIDANCE: Guidance = Guidance {
    color: "warning",
    message: "Medium risk pregnancy. Requires closer monitoring.",
    recommendations: &[
        "Schedule more frequent prenatal appointments",
        "Monitor blood pressure and blood sugar levels regularly",
        "Follow specific dietary restrictions if advised",
        "Consider genetic counseling if recommended",
        "Be aware of warning signs and symptoms",
        "Discuss birth plan options with your healthcare provider",
    ],
};

static HIGH_GUIDANCE: Guidance = Guidance {
    color: "danger",
    message: "High risk pregnancy. Requires immediate medical attention and specialized care.",
    recommendations: &[
        "Seek immediate consultation with a maternal-fetal medicine specialist",
        "Schedule frequent medical monitoring and tests",
        "Follow strict medical guidelines and restrictions",
        "Consider hospitalization or bed rest if recommended",
        "Plan delivery at a high-risk obstetric facility",
        "Prepare for possible complications and emergency interventions",
    ],
};

/// Guidance for a resolved label; unknown labels get the medium entry.
pub fn guidance_for(label: &str) -> &'static Guidance {
    RiskTier::from_label(label)
        .unwrap_or(RiskTier::Medium)
        .guidance()
}

fn target_encoder(encoders: &LabelEncoders) -> Option<&LabelEncoder> {
    TARGET_COLUMN_CANDIDATES
        .iter()
        .find_map(|name| encoders.get(*name))
}

/// Resolves a class index to a display label.
///
/// Tries the target encoder first, then the fixed tier table, then a generic
/// `"Risk Level {index}"`.
pub fn resolve_label(index: usize, encoders: Option<&LabelEncoders>) -> String {
    encoders
        .and_then(target_encoder)
        .and_then(|enc| enc.inverse_transform(index))
        .map(str::to_string)
        .or_else(|| RiskTier::from_index(index).map(|t| t.label().to_string()))
        .unwrap_or_else(|| format!("Risk Level {}", index))
}

/// Probability of one class, formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    #[serde(skip)]
    pub label: String,
    pub percentage: String,
    pub width: String,
}

/// Interpretation of a prediction, valid for one response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskInfo {
    pub risk_level: String,
    pub confidence: String,
    pub color: String,
    pub message: String,
    pub recommendations: Vec<String>,
    /// Serialized as an ordered object keyed by `"Risk Level {i}"`.
    #[serde(serialize_with = "serialize_breakdown")]
    pub probabilities: Vec<ClassProbability>,
}

fn serialize_breakdown<S: Serializer>(
    entries: &[ClassProbability],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for entry in entries {
        map.serialize_entry(&entry.label, entry)?;
    }
    map.end()
}

fn percent(p: f64) -> String {
    format!("{:.1}", p * 100.0)
}

/// Builds the risk information for a prediction.
pub fn interpret(
    prediction: &Prediction,
    encoders: Option<&LabelEncoders>,
) -> Result<RiskInfo, RiskError> {
    let max_prob = prediction
        .max_probability()
        .ok_or(RiskError::EmptyProbabilities)?;

    let risk_level = resolve_label(prediction.class_index, encoders);
    let guidance = guidance_for(&risk_level);

    let probabilities = prediction
        .probabilities
        .iter()
        .enumerate()
        .map(|(i, &p)| ClassProbability {
            label: format!("Risk Level {}", i),
            percentage: percent(p),
            width: percent(p),
        })
        .collect();

    Ok(RiskInfo {
        risk_level,
        confidence: format!("{}%", percent(max_prob)),
        color: guidance.color.to_string(),
        message: guidance.message.to_string(),
        recommendations: guidance.recommendations.iter().map(|r| r.to_string()).collect(),
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoders(column: &str, classes: &[&str]) -> LabelEncoders {
        let mut map = LabelEncoders::new();
        map.insert(
            column.to_string(),
            LabelEncoder::from_classes(classes.iter().map(|c| c.to_string()).collect()),
        );
        map
    }

    #[test]
    fn table_labels_without_encoders() {
        assert_eq!(resolve_label(0, None), "Low Risk");
        assert_eq!(resolve_label(1, None), "Medium Risk");
        assert_eq!(resolve_label(2, None), "High Risk");
    }

    #[test]
    fn out_of_table_index_gets_generic_label() {
        for index in [3, 4, 17] {
            assert_eq!(resolve_label(index, None), format!("Risk Level {}", index));
        }
    }

    #[test]
    fn target_encoder_takes_precedence() {
        let enc = encoders("risk_level", &["High Risk", "Low Risk", "Medium Risk"]);
        assert_eq!(resolve_label(0, Some(&enc)), "High Risk");
        assert_eq!(resolve_label(1, Some(&enc)), "Low Risk");
    }

    #[test]
    fn out_of_domain_encoder_index_falls_back_to_table() {
        let enc = encoders("RiskLevel", &["only"]);
        assert_eq!(resolve_label(2, Some(&enc)), "High Risk");
        assert_eq!(resolve_label(5, Some(&enc)), "Risk Level 5");
    }

    #[test]
    fn encoders_for_other_columns_are_ignored() {
        let enc = encoders("Smoker", &["no", "yes"]);
        assert_eq!(resolve_label(1, Some(&enc)), "Medium Risk");
    }

    #[test]
    fn unknown_label_gets_medium_guidance() {
        assert_eq!(guidance_for("mid risk"), &MEDIUM_GUIDANCE);
        assert_eq!(guidance_for("Risk Level 9").color, "warning");
        assert_eq!(guidance_for("High Risk").color, "danger");
        assert_eq!(guidance_for("Low Risk").color, "success");
    }

    #[test]
    fn confidence_is_max_probability_with_one_decimal() {
        let info = interpret(&Prediction::new(0, vec![0.123, 0.6543, 0.2227]), None).unwrap();
        assert_eq!(info.confidence, "65.4%");
        assert_eq!(info.risk_level, "Low Risk");
        assert_eq!(info.recommendations.len(), 6);
    }

    #[test]
    fn breakdown_keeps_class_order() {
        let info = interpret(&Prediction::new(1, vec![0.25, 0.5, 0.25]), None).unwrap();
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["probabilities"]["Risk Level 1"]["percentage"], "50.0");
        assert_eq!(json["probabilities"]["Risk Level 2"]["width"], "25.0");
        let labels: Vec<_> = info.probabilities.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["Risk Level 0", "Risk Level 1", "Risk Level 2"]);
    }

    #[test]
    fn empty_probabilities_are_an_error() {
        let err = interpret(&Prediction::new(0, vec![]), None).unwrap_err();
        assert_eq!(err, RiskError::EmptyProbabilities);
    }

    #[test]
    fn aliases_map_dataset_labels_to_tiers() {
        assert_eq!(RiskTier::from_alias("mid risk"), Some(RiskTier::Medium));
        assert_eq!(RiskTier::from_alias(" HIGH RISK "), Some(RiskTier::High));
        assert_eq!(RiskTier::from_alias("low"), Some(RiskTier::Low));
        assert_eq!(RiskTier::from_alias("severe"), None);
    }
}
