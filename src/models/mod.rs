mod user;
mod forms;
mod history;

pub use user::User;
pub use forms::{ContactForm, LoginForm, PredictForm, SignupForm};
pub use history::{HistoryRecord, HistoryStats, LoanApplication, Prediction};
