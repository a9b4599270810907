pub mod orchestrator;
pub mod regression;

pub use orchestrator::*;
pub use regression::RegressionForecaster;
