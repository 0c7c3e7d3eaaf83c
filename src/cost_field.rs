use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::error::{PlanningError, PlanningResult};

/// Cells at or above this value are impassable.
pub const OBSTACLE_THRESHOLD: f64 = 0.99;

/// Dense row-major grid of traversal costs in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct CostField {
	rows: usize,
	cols: usize,
	values: Vec<f64>,
}

impl CostField {
	pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> PlanningResult<Self> {
		if rows == 0 || cols == 0 {
			return Err(PlanningError::InvalidCostField(format!("empty grid {}x{}", rows, cols)));
		}

		if values.len() != rows * cols {
			return Err(PlanningError::InvalidCostField(format!(
				"expected {} values for a {}x{} grid, got {}", rows * cols, rows, cols, values.len())));
		}

		if let Some(i) = values.iter().position(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
			return Err(PlanningError::InvalidCostField(format!(
				"value {} at ({}, {}) is not a finite cost in [0, 1]", values[i], i / cols, i % cols)));
		}

		Ok(Self { rows, cols, values })
	}

	pub fn from_rows(grid: Vec<Vec<f64>>) -> PlanningResult<Self> {
		let rows = grid.len();
		let cols = grid.first().map_or(0, Vec::len);

		if grid.iter().any(|row| row.len() != cols) {
			return Err(PlanningError::InvalidCostField("rows have different lengths".to_string()));
		}

		Self::new(rows, cols, grid.into_iter().flatten().collect())
	}

	pub fn filled(rows: usize, cols: usize, value: f64) -> PlanningResult<Self> {
		Self::new(rows, cols, vec![value; rows * cols])
	}

	pub fn rows(&self) -> usize {
		self.rows
	}

	pub fn cols(&self) -> usize {
		self.cols
	}

	pub fn shape(&self) -> [usize; 2] {
		[self.rows, self.cols]
	}

	pub fn values(&self) -> &[f64] {
		&self.values
	}

	/// Cost of cell `(row, col)`. Panics outside the grid, see `cost_at` for
	/// a checked lookup by point.
	pub fn get(&self, row: usize, col: usize) -> f64 {
		self.values[row * self.cols + col]
	}

	pub fn set(&mut self, row: usize, col: usize, value: f64) -> PlanningResult<()> {
		if row >= self.rows || col >= self.cols {
			return Err(PlanningError::OutOfBounds { row: row as f64, col: col as f64 });
		}
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(PlanningError::InvalidCostField(format!("value {} is not a finite cost in [0, 1]", value)));
		}

		self.values[row * self.cols + col] = value;
		Ok(())
	}

	/// Grid cell containing `p`, rounding half to even.
	pub fn cell(&self, p: &Point) -> Option<[usize; 2]> {
		let row = round_index(p[0])?;
		let col = round_index(p[1])?;

		if row < self.rows && col < self.cols {
			Some([row, col])
		} else {
			None
		}
	}

	pub fn cost_at(&self, p: &Point) -> Option<f64> {
		self.cell(p).map(|[row, col]| self.get(row, col))
	}

	pub fn center(&self) -> Point {
		[(self.rows / 2) as f64, (self.cols / 2) as f64]
	}
}

fn round_index(v: f64) -> Option<usize> {
	let r = v.round_ties_even();
	if r.is_finite() && r >= 0.0 {
		Some(r as usize)
	} else {
		None
	}
}

/// Coefficients of the objective `length * sum(dist) + cost * sum(cell_cost)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weights {
	pub length: f64,
	pub cost: f64,
}

impl Weights {
	pub fn new(length: f64, cost: f64) -> PlanningResult<Self> {
		let weights = Self { length, cost };
		weights.validate()?;
		Ok(weights)
	}

	pub fn validate(&self) -> PlanningResult<()> {
		if !(self.length >= 0.0 && self.cost >= 0.0) || !self.length.is_finite() || !self.cost.is_finite() {
			return Err(PlanningError::InvalidParameter(format!(
				"weights must be finite and non-negative, got length={} cost={}", self.length, self.cost)));
		}
		Ok(())
	}
}

impl Default for Weights {
	fn default() -> Self {
		Self { length: 1.0, cost: 1.0 }
	}
}

/// Segment traversability test shared by all planners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionChecker {
	pub threshold: f64,
	pub step: f64,
}

impl Default for CollisionChecker {
	fn default() -> Self {
		Self { threshold: OBSTACLE_THRESHOLD, step: 1.0 }
	}
}

impl CollisionChecker {
	pub fn validate(&self) -> PlanningResult<()> {
		if !(self.step > 0.0) || !self.step.is_finite() {
			return Err(PlanningError::InvalidParameter(format!("collision step must be positive, got {}", self.step)));
		}
		if !self.threshold.is_finite() {
			return Err(PlanningError::InvalidParameter(format!("collision threshold must be finite, got {}", self.threshold)));
		}
		Ok(())
	}

	pub fn is_segment_free(&self, from: &Point, to: &Point, field: &CostField) -> bool {
		collision_free(from, to, field, self.threshold, self.step)
	}

	pub fn is_path_valid(&self, path: &[Point], field: &CostField) -> bool {
		match path {
			[] => false,
			[single] => self.is_segment_free(single, single, field),
			_ => pairwise_iter(path).all(|(a, b)| self.is_segment_free(a, b, field)),
		}
	}
}

/// Samples `floor(d / step) + 1` evenly spaced points along the segment, both
/// endpoints included, and requires each rounded cell to be inside the grid
/// and below `threshold`.
pub fn collision_free(p0: &Point, p1: &Point, field: &CostField, threshold: f64, step: f64) -> bool {
	let d = norm2(p0, p1);
	let mut n = (d / step).floor() as usize + 1;
	if n < 2 && d > 0.0 {
		n = 2;
	}

	(0..n).all(|i| {
		let p = if i == 0 {
			*p0
		} else if i == n - 1 {
			*p1
		} else {
			let t = i as f64 / (n - 1) as f64;
			[p0[0] + (p1[0] - p0[0]) * t, p0[1] + (p1[1] - p0[1]) * t]
		};

		matches!(field.cost_at(&p), Some(c) if c < threshold)
	})
}

/// Weighted cost of a path. Every segment start cell is charged, plus the
/// final point's cell once. Points outside the grid make the cost infinite.
pub fn path_cost(path: &[Point], field: &CostField, weights: &Weights) -> f64 {
	let last = match path.last() {
		Some(last) => last,
		None => return 0.0,
	};

	let mut length = 0.0;
	let mut cost = 0.0;

	for (a, b) in pairwise_iter(path) {
		length += norm2(a, b);
		match field.cost_at(a) {
			Some(c) => cost += c,
			None => return f64::INFINITY,
		}
	}

	match field.cost_at(last) {
		Some(c) => cost += c,
		None => return f64::INFINITY,
	}

	weights.length * length + weights.cost * cost
}

/// Cost of `prefix + [next]` given the cost of `prefix`, whose last point is `last`.
pub fn extended_path_cost(prefix_cost: f64, last: &Point, next: &Point, field: &CostField, weights: &Weights) -> f64 {
	match field.cost_at(next) {
		Some(c) => prefix_cost + weights.length * norm2(last, next) + weights.cost * c,
		None => f64::INFINITY,
	}
}

/// Cost of a directed roadmap edge, charged on the source cell.
pub fn edge_cost(from: &Point, to: &Point, field: &CostField, weights: &Weights) -> f64 {
	match field.cost_at(from) {
		Some(c) => weights.length * norm2(from, to) + weights.cost * c,
		None => f64::INFINITY,
	}
}
