use serde::{Deserialize, Serialize};
use crate::errors::{AppError, AppResult};
use super::history::LoanApplication;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

// Raw prediction form. Fields stay strings so a bad value re-renders the form
// with a message instead of failing extraction.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct PredictForm {
    pub age: String,
    pub income: String,
    pub loan_amount: String,
    pub credit_score: String,
    pub dti_ratio: String,
    pub education: String,
    pub employment: String,
}

impl PredictForm {
    pub fn parse(&self) -> AppResult<LoanApplication> {
        Ok(LoanApplication {
            age: parse_number("age", &self.age)?,
            income: parse_number("income", &self.income)?,
            loan_amount: parse_number("loan_amount", &self.loan_amount)?,
            credit_score: parse_number("credit_score", &self.credit_score)?,
            dti_ratio: parse_number("dti_ratio", &self.dti_ratio)?,
            education: required_text("education", &self.education)?,
            employment: required_text("employment", &self.employment)?,
        })
    }
}

impl From<&LoanApplication> for PredictForm {
    fn from(app: &LoanApplication) -> Self {
        Self {
            age: app.age.to_string(),
            income: app.income.to_string(),
            loan_amount: app.loan_amount.to_string(),
            credit_score: app.credit_score.to_string(),
            dti_ratio: app.dti_ratio.to_string(),
            education: app.education.clone(),
            employment: app.employment.clone(),
        }
    }
}

fn parse_number(field: &'static str, raw: &str) -> AppResult<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidField { field, reason: "is required".into() });
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AppError::InvalidField {
            field,
            reason: format!("'{}' is not a number", raw),
        }),
    }
}

fn required_text(field: &'static str, raw: &str) -> AppResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidField { field, reason: "is required".into() });
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PredictForm {
        PredictForm {
            age: "35".into(),
            income: "50000".into(),
            loan_amount: "20000".into(),
            credit_score: "650".into(),
            dti_ratio: "0.3".into(),
            education: "Bachelor".into(),
            employment: "Full-time".into(),
        }
    }

    #[test]
    fn parses_complete_form() {
        let app = sample().parse().unwrap();
        assert_eq!(app.age, 35.0);
        assert_eq!(app.dti_ratio, 0.3);
        assert_eq!(app.employment, "Full-time");
    }

    #[test]
    fn rejects_non_numeric_field() {
        let mut form = sample();
        form.income = "lots".into();
        match form.parse() {
            Err(AppError::InvalidField { field, .. }) => assert_eq!(field, "income"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_missing_fields() {
        let mut form = sample();
        form.education = "  ".into();
        assert!(matches!(
            form.parse(),
            Err(AppError::InvalidField { field: "education", .. })
        ));

        let mut form = sample();
        form.credit_score.clear();
        assert!(matches!(
            form.parse(),
            Err(AppError::InvalidField { field: "credit_score", .. })
        ));
    }

    #[test]
    fn rejects_non_finite_numbers() {
        let mut form = sample();
        form.age = "NaN".into();
        assert!(form.parse().is_err());
    }
}
