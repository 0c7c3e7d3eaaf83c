use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::cost_field::CostField;
use crate::error::{PlanningError, PlanningResult};
use crate::sample_space::*;

pub type PredictorError = Box<dyn std::error::Error + Send + Sync>;

/// Input channels handed to the sampling predictor, all row-major over the
/// cost field's shape.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMaps {
	pub rows: usize,
	pub cols: usize,
	pub obstacle: Vec<f32>,
	pub start: Vec<f32>,
	pub goal: Vec<f32>,
	pub distance: Option<Vec<f32>>,
}

impl FeatureMaps {
	pub fn encode(field: &CostField, start: &Point, goal: &Point, with_distance: bool) -> PlanningResult<Self> {
		let (rows, cols) = (field.rows(), field.cols());

		let obstacle = field.values().iter()
			.map(|&v| if v == 1.0 { 1.0 } else { 0.0 })
			.collect();

		let one_hot = |p: &Point| -> PlanningResult<Vec<f32>> {
			let [row, col] = field.cell(p).ok_or(PlanningError::OutOfBounds { row: p[0], col: p[1] })?;
			let mut map = vec![0.0; rows * cols];
			map[row * cols + col] = 1.0;
			Ok(map)
		};

		Ok(Self {
			rows,
			cols,
			obstacle,
			start: one_hot(start)?,
			goal: one_hot(goal)?,
			distance: if with_distance { Some(obstacle_distance_map(field)) } else { None },
		})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityMap {
	rows: usize,
	cols: usize,
	values: Vec<f32>,
}

impl ProbabilityMap {
	pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> PlanningResult<Self> {
		if values.len() != rows * cols {
			return Err(PlanningError::PredictionShape { expected: [rows, cols], actual: [values.len() / cols.max(1), cols] });
		}
		Ok(Self { rows, cols, values })
	}

	pub fn shape(&self) -> [usize; 2] {
		[self.rows, self.cols]
	}

	pub fn get(&self, row: usize, col: usize) -> f32 {
		self.values[row * self.cols + col]
	}
}

/// External inference service scoring every cell of the field.
pub trait Predictor {
	fn predict(&self, features: &FeatureMaps) -> Result<ProbabilityMap, PredictorError>;
}

impl<F> Predictor for F
where
	F: Fn(&FeatureMaps) -> Result<ProbabilityMap, PredictorError>,
{
	fn predict(&self, features: &FeatureMaps) -> Result<ProbabilityMap, PredictorError> {
		self(features)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnedSamplingConfig {
	pub goal_bias: f64,
	/// Cells scoring strictly above this are candidates.
	pub probability_threshold: f32,
	pub max_attempts: usize,
	/// Candidates at or above this cost are rejected.
	pub near_obstacle_cost: f64,
	pub include_distance_map: bool,
	/// Revert to a uniform draw instead of failing when the predictor errors.
	pub fallback_to_uniform: bool,
}

impl Default for LearnedSamplingConfig {
	fn default() -> Self {
		Self {
			goal_bias: 0.1,
			probability_threshold: 0.1,
			max_attempts: 100,
			near_obstacle_cost: 0.9,
			include_distance_map: true,
			fallback_to_uniform: false,
		}
	}
}

pub struct LearnedSampling<P: Predictor> {
	predictor: P,
	config: LearnedSamplingConfig,
}

impl<P: Predictor> LearnedSampling<P> {
	pub fn new(predictor: P, config: LearnedSamplingConfig) -> PlanningResult<Self> {
		if !(0.0..=1.0).contains(&config.goal_bias) {
			return Err(PlanningError::InvalidParameter(format!("goal_bias must be in [0, 1], got {}", config.goal_bias)));
		}
		Ok(Self { predictor, config })
	}

	pub fn config(&self) -> &LearnedSamplingConfig {
		&self.config
	}

	pub fn set_goal_bias(&mut self, goal_bias: f64) {
		self.config.goal_bias = clamp_bias(goal_bias);
	}

	fn predict(&self, field: &CostField, start: &Point, goal: &Point) -> PlanningResult<ProbabilityMap> {
		let features = FeatureMaps::encode(field, start, goal, self.config.include_distance_map)?;
		let prediction = self.predictor.predict(&features).map_err(PlanningError::Predictor)?;

		if prediction.shape() != field.shape() {
			return Err(PlanningError::PredictionShape { expected: field.shape(), actual: prediction.shape() });
		}
		Ok(prediction)
	}

	fn sample_from_probability(&self, prediction: &ProbabilityMap, field: &CostField, rng: &mut PlannerRng) -> Point {
		let mut candidates = Vec::new();
		for row in 0..prediction.rows {
			for col in 0..prediction.cols {
				if prediction.get(row, col) > self.config.probability_threshold {
					candidates.push([row, col]);
				}
			}
		}

		if candidates.is_empty() {
			return self.random_free_cell(field, rng);
		}

		for _ in 0..self.config.max_attempts {
			let [row, col] = candidates[rng.gen_range(0..candidates.len())];
			if field.get(row, col) < self.config.near_obstacle_cost {
				return [row as f64, col as f64];
			}
		}

		self.random_free_cell(field, rng)
	}

	fn random_free_cell(&self, field: &CostField, rng: &mut PlannerRng) -> Point {
		let free: Vec<usize> = field.values().iter()
			.enumerate()
			.filter(|(_, &v)| v < self.config.near_obstacle_cost)
			.map(|(i, _)| i)
			.collect();

		if free.is_empty() {
			return field.center();
		}

		let i = free[rng.gen_range(0..free.len())];
		[(i / field.cols()) as f64, (i % field.cols()) as f64]
	}
}

impl<P: Predictor> SamplingStrategy for LearnedSampling<P> {
	fn sample(&mut self, field: &CostField, start: &Point, goal: &Point, rng: &mut PlannerRng) -> PlanningResult<Point> {
		if rng.gen::<f64>() < self.config.goal_bias {
			return Ok(*goal);
		}

		match self.predict(field, start, goal) {
			Ok(prediction) => Ok(self.sample_from_probability(&prediction, field, rng)),
			Err(err @ (PlanningError::Predictor(_) | PlanningError::PredictionShape { .. })) if self.config.fallback_to_uniform => {
				warn!("learned sampling falls back to uniform: {}", err);
				Ok(uniform_cell(field, rng))
			}
			Err(err) => Err(err),
		}
	}
}

/// Euclidean distance from every cell to the closest obstacle cell
/// (`value == 1.0`), scaled to [0, 1] by the largest distance.
pub fn obstacle_distance_map(field: &CostField) -> Vec<f32> {
	let (rows, cols) = (field.rows(), field.cols());

	if !field.values().iter().any(|&v| v == 1.0) {
		return vec![1.0; rows * cols];
	}

	// squared distances, separable: columns first, then rows
	let mut grid: Vec<f64> = field.values().iter()
		.map(|&v| if v == 1.0 { 0.0 } else { UNREACHED })
		.collect();

	for col in 0..cols {
		let column: Vec<f64> = (0..rows).map(|row| grid[row * cols + col]).collect();
		for (row, d) in squared_distance_1d(&column).into_iter().enumerate() {
			grid[row * cols + col] = d;
		}
	}

	for row in 0..rows {
		let line = squared_distance_1d(&grid[row * cols..(row + 1) * cols]);
		grid[row * cols..(row + 1) * cols].copy_from_slice(&line);
	}

	let distances: Vec<f64> = grid.into_iter().map(f64::sqrt).collect();
	let max = distances.iter().cloned().fold(0.0, f64::max);

	if max > 0.0 {
		distances.into_iter().map(|d| (d / max) as f32).collect()
	} else {
		vec![0.0; rows * cols]
	}
}

const UNREACHED: f64 = 1e20;

// lower envelope of parabolas (Felzenszwalb & Huttenlocher)
fn squared_distance_1d(f: &[f64]) -> Vec<f64> {
	let n = f.len();
	let mut v = vec![0usize; n];
	let mut z = vec![0.0; n + 1];
	let mut k = 0;
	z[0] = f64::NEG_INFINITY;
	z[1] = f64::INFINITY;

	let intersection = |q: usize, p: usize| {
		let (qf, pf) = (q as f64, p as f64);
		((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
	};

	for q in 1..n {
		let mut s = intersection(q, v[k]);
		while s <= z[k] {
			k -= 1;
			s = intersection(q, v[k]);
		}
		k += 1;
		v[k] = q;
		z[k] = s;
		z[k + 1] = f64::INFINITY;
	}

	let mut d = vec![0.0; n];
	k = 0;
	for (q, dq) in d.iter_mut().enumerate() {
		while z[k + 1] < q as f64 {
			k += 1;
		}
		let offset = q as f64 - v[k] as f64;
		*dq = offset * offset + f[v[k]];
	}
	d
}
