use thiserror::Error;

/// Errors raised by planners, sampling strategies and their configuration.
///
/// Running out of iterations without a path is not an error: planners
/// report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum PlanningError {
	#[error("invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("invalid cost field: {0}")]
	InvalidCostField(String),

	#[error("static sampling requires at least one point")]
	EmptyStaticSamples,

	#[error("cell ({row}, {col}) is outside the cost field")]
	OutOfBounds { row: f64, col: f64 },

	#[error("sampling predictor failed: {0}")]
	Predictor(#[source] Box<dyn std::error::Error + Send + Sync>),

	#[error("predictor returned a {actual:?} map, expected {expected:?}")]
	PredictionShape { expected: [usize; 2], actual: [usize; 2] },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type PlanningResult<T> = Result<T, PlanningError>;
