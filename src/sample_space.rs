use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::common::*;
use crate::cost_field::CostField;
use crate::error::{PlanningError, PlanningResult};

/// The single random source threaded through a `plan` call.
pub type PlannerRng = Pcg64;

pub fn seeded_rng(seed: u64) -> PlannerRng {
	Pcg64::seed_from_u64(seed)
}

/// Source of candidate configurations for the planners.
pub trait SamplingStrategy {
	fn sample(&mut self, field: &CostField, start: &Point, goal: &Point, rng: &mut PlannerRng) -> PlanningResult<Point>;

	/// Draw that ignores start and goal, as used by batch planners.
	fn sample_space(&mut self, field: &CostField, rng: &mut PlannerRng) -> PlanningResult<Point> {
		Ok(uniform_cell(field, rng))
	}
}

impl<S: SamplingStrategy + ?Sized> SamplingStrategy for Box<S> {
	fn sample(&mut self, field: &CostField, start: &Point, goal: &Point, rng: &mut PlannerRng) -> PlanningResult<Point> {
		(**self).sample(field, start, goal, rng)
	}

	fn sample_space(&mut self, field: &CostField, rng: &mut PlannerRng) -> PlanningResult<Point> {
		(**self).sample_space(field, rng)
	}
}

impl<S: SamplingStrategy + ?Sized> SamplingStrategy for &mut S {
	fn sample(&mut self, field: &CostField, start: &Point, goal: &Point, rng: &mut PlannerRng) -> PlanningResult<Point> {
		(**self).sample(field, start, goal, rng)
	}

	fn sample_space(&mut self, field: &CostField, rng: &mut PlannerRng) -> PlanningResult<Point> {
		(**self).sample_space(field, rng)
	}
}

/// Integer cell drawn uniformly over the grid extents.
pub fn uniform_cell(field: &CostField, rng: &mut PlannerRng) -> Point {
	[rng.gen_range(0..field.rows()) as f64, rng.gen_range(0..field.cols()) as f64]
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UniformSampling;

impl SamplingStrategy for UniformSampling {
	fn sample(&mut self, field: &CostField, _start: &Point, _goal: &Point, rng: &mut PlannerRng) -> PlanningResult<Point> {
		Ok(uniform_cell(field, rng))
	}
}

/// Uniform sampling that returns the goal with probability `goal_bias`.
#[derive(Clone, Copy, Debug)]
pub struct HybridSampling {
	goal_bias: f64,
}

impl HybridSampling {
	pub fn new(goal_bias: f64) -> PlanningResult<Self> {
		if !(0.0..=1.0).contains(&goal_bias) {
			return Err(PlanningError::InvalidParameter(format!("goal_bias must be in [0, 1], got {}", goal_bias)));
		}
		Ok(Self { goal_bias })
	}

	pub fn goal_bias(&self) -> f64 {
		self.goal_bias
	}

	pub fn set_goal_bias(&mut self, goal_bias: f64) {
		self.goal_bias = clamp_bias(goal_bias);
	}
}

impl Default for HybridSampling {
	fn default() -> Self {
		Self { goal_bias: 0.1 }
	}
}

impl SamplingStrategy for HybridSampling {
	fn sample(&mut self, field: &CostField, _start: &Point, goal: &Point, rng: &mut PlannerRng) -> PlanningResult<Point> {
		if rng.gen::<f64>() < self.goal_bias {
			return Ok(*goal);
		}
		Ok(uniform_cell(field, rng))
	}
}

pub(crate) fn clamp_bias(goal_bias: f64) -> f64 {
	if goal_bias.is_nan() {
		0.0
	} else {
		goal_bias.clamp(0.0, 1.0)
	}
}

/// Replays a fixed list of points, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct StaticSampling {
	points: Vec<Point>,
	index: usize,
}

impl StaticSampling {
	pub fn new(points: Vec<Point>) -> PlanningResult<Self> {
		if points.is_empty() {
			return Err(PlanningError::EmptyStaticSamples);
		}
		Ok(Self { points, index: 0 })
	}

	pub fn points(&self) -> &[Point] {
		&self.points
	}

	pub fn reset(&mut self) {
		self.index = 0;
	}

	fn next_point(&mut self) -> PlanningResult<Point> {
		let p = *self.points.get(self.index).ok_or(PlanningError::EmptyStaticSamples)?;
		self.index = (self.index + 1) % self.points.len();
		Ok(p)
	}
}

impl SamplingStrategy for StaticSampling {
	fn sample(&mut self, _field: &CostField, _start: &Point, _goal: &Point, _rng: &mut PlannerRng) -> PlanningResult<Point> {
		self.next_point()
	}

	fn sample_space(&mut self, _field: &CostField, _rng: &mut PlannerRng) -> PlanningResult<Point> {
		self.next_point()
	}
}

#[cfg(test)]
mod tests {

use super::*;

fn field() -> CostField {
	CostField::filled(7, 13, 0.0).unwrap()
}

#[test]
fn draw_uniform_sample() {
	let field = field();
	let mut rng = seeded_rng(0);
	let mut sampler = UniformSampling;

	for _ in 0..500 {
		let s = sampler.sample(&field, &[0.0, 0.0], &[6.0, 12.0], &mut rng).unwrap();
		assert!(s[0] >= 0.0 && s[0] < 7.0);
		assert!(s[1] >= 0.0 && s[1] < 13.0);
		assert_eq!(s[0].fract(), 0.0);
		assert_eq!(s[1].fract(), 0.0);
	}
}

#[test]
fn same_seed_same_samples() {
	let field = field();
	let mut a = seeded_rng(42);
	let mut b = seeded_rng(42);

	for _ in 0..100 {
		assert_eq!(uniform_cell(&field, &mut a), uniform_cell(&field, &mut b));
	}
}

#[test]
fn hybrid_extreme_biases() {
	let field = field();
	let mut rng = seeded_rng(1);
	let goal = [2.5, 3.5];

	let mut always = HybridSampling::new(1.0).unwrap();
	for _ in 0..50 {
		assert_eq!(always.sample(&field, &[0.0, 0.0], &goal, &mut rng).unwrap(), goal);
	}

	let mut never = HybridSampling::new(0.0).unwrap();
	for _ in 0..50 {
		assert_ne!(never.sample(&field, &[0.0, 0.0], &goal, &mut rng).unwrap(), goal);
	}
}

#[test]
fn hybrid_goal_frequency() {
	let field = CostField::filled(100, 100, 0.0).unwrap();
	let mut rng = seeded_rng(3);
	let goal = [0.5, 0.5];
	let mut sampler = HybridSampling::new(0.3).unwrap();

	let hits = (0..10_000)
		.filter(|_| sampler.sample(&field, &[0.0, 0.0], &goal, &mut rng).unwrap() == goal)
		.count();
	assert!(hits > 2_700 && hits < 3_300, "hits = {}", hits);
}

#[test]
fn hybrid_rejects_and_clamps_bias() {
	assert!(HybridSampling::new(1.5).is_err());
	let mut sampler = HybridSampling::default();
	sampler.set_goal_bias(2.0);
	assert_eq!(sampler.goal_bias(), 1.0);
	sampler.set_goal_bias(-1.0);
	assert_eq!(sampler.goal_bias(), 0.0);
}

#[test]
fn static_replay_wraps_around() {
	let field = field();
	let mut rng = seeded_rng(0);
	let points = vec![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
	let mut sampler = StaticSampling::new(points.clone()).unwrap();

	let drawn: Vec<Point> = (0..7)
		.map(|_| sampler.sample(&field, &[0.0, 0.0], &[0.0, 0.0], &mut rng).unwrap())
		.collect();
	assert_eq!(drawn, vec![points[0], points[1], points[2], points[0], points[1], points[2], points[0]]);

	sampler.reset();
	assert_eq!(sampler.sample_space(&field, &mut rng).unwrap(), points[0]);
}

#[test]
fn static_requires_points() {
	assert!(matches!(StaticSampling::new(vec![]), Err(PlanningError::EmptyStaticSamples)));
}

#[test]
fn borrowed_strategy_keeps_its_cursor() {
	let field = field();
	let mut rng = seeded_rng(0);
	let mut sampler = StaticSampling::new(vec![[1.0, 1.0], [2.0, 2.0]]).unwrap();

	fn draw_one<S: SamplingStrategy>(mut sampler: S, field: &CostField, rng: &mut PlannerRng) -> Point {
		sampler.sample_space(field, rng).unwrap()
	}

	assert_eq!(draw_one(&mut sampler, &field, &mut rng), [1.0, 1.0]);
	assert_eq!(sampler.sample_space(&field, &mut rng).unwrap(), [2.0, 2.0]);
}

#[test]
fn boxed_strategy_dispatches() {
	let field = field();
	let mut rng = seeded_rng(0);
	let mut sampler: Box<dyn SamplingStrategy> = Box::new(StaticSampling::new(vec![[4.0, 4.0]]).unwrap());
	assert_eq!(sampler.sample(&field, &[0.0, 0.0], &[1.0, 1.0], &mut rng).unwrap(), [4.0, 4.0]);
}
}
