//! Adapter around the pre-trained loan risk classifier.
//!
//! The artifact is a JSON description of a fitted logistic model: every numeric
//! feature is standardized with its training mean and scale before weighting,
//! and each categorical value carries its own one-hot weight.

use std::collections::HashMap;
use std::path::Path;
use serde::Deserialize;
use crate::errors::{AppError, AppResult};
use crate::models::{LoanApplication, Prediction};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NumericFeature {
    pub mean: f64,
    pub scale: f64,
    pub weight: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NumericFeatures {
    pub age: NumericFeature,
    pub income: NumericFeature,
    pub loan_amount: NumericFeature,
    pub credit_score: NumericFeature,
    pub dti_ratio: NumericFeature,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogisticModel {
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub numeric: NumericFeatures,
    #[serde(default)]
    pub education: HashMap<String, f64>,
    #[serde(default)]
    pub employment: HashMap<String, f64>,
}

fn default_threshold() -> f64 {
    0.5
}

impl LogisticModel {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let model: LogisticModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> AppResult<()> {
        let n = &self.numeric;
        for (name, feature) in [
            ("age", &n.age),
            ("income", &n.income),
            ("loan_amount", &n.loan_amount),
            ("credit_score", &n.credit_score),
            ("dti_ratio", &n.dti_ratio),
        ] {
            if !(feature.scale.is_finite() && feature.scale > 0.0) {
                return Err(AppError::Model(format!("feature {} has a non-positive scale", name)));
            }
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AppError::Model(format!("threshold {} outside [0, 1]", self.threshold)));
        }
        Ok(())
    }

    /// Probability of the danger class.
    pub fn probability(&self, app: &LoanApplication) -> f64 {
        let n = &self.numeric;
        let mut z = self.intercept;
        z += contribution(&n.age, app.age);
        z += contribution(&n.income, app.income);
        z += contribution(&n.loan_amount, app.loan_amount);
        z += contribution(&n.credit_score, app.credit_score);
        z += contribution(&n.dti_ratio, app.dti_ratio);
        // Categories unseen during training contribute nothing
        z += self.education.get(&app.education).copied().unwrap_or(0.0);
        z += self.employment.get(&app.employment).copied().unwrap_or(0.0);
        1.0 / (1.0 + (-z).exp())
    }

    pub fn predict(&self, app: &LoanApplication) -> Prediction {
        if self.probability(app) >= self.threshold {
            Prediction::Danger
        } else {
            Prediction::Safe
        }
    }
}

fn contribution(feature: &NumericFeature, value: f64) -> f64 {
    feature.weight * (value - feature.mean) / feature.scale
}

/// Read-only model handle, loaded once at startup and shared by all handlers.
#[derive(Debug, Clone)]
pub struct RiskModel {
    inner: Option<LogisticModel>,
}

impl RiskModel {
    pub fn new(model: LogisticModel) -> Self {
        Self { inner: Some(model) }
    }

    /// A handle that rejects every prediction.
    pub fn unavailable() -> Self {
        Self { inner: None }
    }

    /// Loads the artifact. A missing or broken file leaves the adapter unusable
    /// instead of aborting startup.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let loaded = std::fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|json| LogisticModel::from_json(&json));

        match loaded {
            Ok(model) => {
                tracing::info!("Model loaded successfully from {}", path.display());
                Self::new(model)
            }
            Err(e) => {
                tracing::error!("Model failed to load from {}: {}", path.display(), e);
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    pub fn predict(&self, app: &LoanApplication) -> AppResult<Prediction> {
        let model = self.inner.as_ref().ok_or(AppError::ModelUnavailable)?;
        Ok(model.predict(app))
    }

    pub fn probability(&self, app: &LoanApplication) -> AppResult<f64> {
        let model = self.inner.as_ref().ok_or(AppError::ModelUnavailable)?;
        Ok(model.probability(app))
    }
}
