use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// The seven applicant attributes the risk model consumes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoanApplication {
    pub age: f64,
    pub income: f64,
    pub loan_amount: f64,
    pub credit_score: f64,
    pub dti_ratio: f64,
    pub education: String,
    pub employment: String,
}

/// Binary model output. `Safe` is label 0, `Danger` is label 1.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "i64", try_from = "i64")]
pub enum Prediction {
    Safe,
    Danger,
}

impl Prediction {
    pub fn label(self) -> i64 {
        match self {
            Prediction::Safe => 0,
            Prediction::Danger => 1,
        }
    }

    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Prediction::Safe),
            1 => Some(Prediction::Danger),
            _ => None,
        }
    }

    pub fn is_danger(self) -> bool {
        self == Prediction::Danger
    }
}

impl From<Prediction> for i64 {
    fn from(prediction: Prediction) -> Self {
        prediction.label()
    }
}

impl TryFrom<i64> for Prediction {
    type Error = String;

    fn try_from(label: i64) -> Result<Self, Self::Error> {
        Prediction::from_label(label).ok_or_else(|| format!("invalid prediction label {}", label))
    }
}

/// One persisted prediction request and its result. Never updated after insert.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: i64,
    pub username: String,
    #[serde(flatten)]
    pub application: LoanApplication,
    pub prediction: Prediction,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts shown on the dashboard. `safe + danger == total` always holds.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub safe: usize,
    pub danger: usize,
    pub total: usize,
}

impl HistoryStats {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        let danger = records.iter().filter(|r| r.prediction.is_danger()).count();
        Self {
            safe: records.len() - danger,
            danger,
            total: records.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, prediction: Prediction) -> HistoryRecord {
        HistoryRecord {
            id,
            username: "alice".into(),
            application: LoanApplication {
                age: 35.0,
                income: 50000.0,
                loan_amount: 20000.0,
                credit_score: 650.0,
                dti_ratio: 0.3,
                education: "Bachelor".into(),
                employment: "Full-time".into(),
            },
            prediction,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stats_partition_total() {
        let records = vec![
            record(1, Prediction::Safe),
            record(2, Prediction::Danger),
            record(3, Prediction::Danger),
        ];
        let stats = HistoryStats::from_records(&records);
        assert_eq!(stats, HistoryStats { safe: 1, danger: 2, total: 3 });
        assert_eq!(stats.safe + stats.danger, stats.total);
    }

    #[test]
    fn stats_of_empty_history_are_zero() {
        assert_eq!(HistoryStats::from_records(&[]), HistoryStats::default());
    }

    #[test]
    fn prediction_serializes_as_label() {
        let json = serde_json::to_value(record(7, Prediction::Danger)).unwrap();
        assert_eq!(json["prediction"], 1);
        assert_eq!(json["education"], "Bachelor");

        let back: HistoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.prediction, Prediction::Danger);
        assert!(serde_json::from_str::<Prediction>("2").is_err());
    }
}
