use crate::common::*;
use crate::cost_field::{CostField, Weights};
use crate::error::PlanningResult;
use crate::sample_space::PlannerRng;

/// Common entry point of the four planners.
///
/// `Ok(None)` means the planner exhausted its budget without a path. Every
/// returned path starts at `start`, ends at `goal`, and each consecutive pair
/// passes the planner's collision checker.
pub trait Planner {
	fn name(&self) -> &'static str;

	fn plan(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<Option<Path>>;
}

impl<P: Planner + ?Sized> Planner for Box<P> {
	fn name(&self) -> &'static str {
		(**self).name()
	}

	fn plan(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<Option<Path>> {
		(**self).plan(start, goal, field, weights, rng)
	}
}
