use std::f64::consts::PI;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::cost_field::*;
use crate::error::{PlanningError, PlanningResult};
use crate::planner::Planner;
use crate::rrt::{validate_step_size, RRTTree};
use crate::sample_space::{PlannerRng, SamplingStrategy};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidirectionalESTConfig {
	pub step_size: f64,
	pub max_iterations: usize,
	pub k_samples: usize,
	pub radius: f64,
	pub collision: CollisionChecker,
}

impl Default for BidirectionalESTConfig {
	fn default() -> Self {
		Self { step_size: 5.0, max_iterations: 1000, k_samples: 10, radius: 10.0, collision: CollisionChecker::default() }
	}
}

impl BidirectionalESTConfig {
	pub fn validate(&self) -> PlanningResult<()> {
		validate_step_size(self.step_size)?;
		if self.max_iterations == 0 || self.k_samples == 0 {
			return Err(PlanningError::InvalidParameter("max_iterations and k_samples must be positive".to_string()));
		}
		if !(self.radius > 0.0) || !self.radius.is_finite() {
			return Err(PlanningError::InvalidParameter(format!("radius must be positive, got {}", self.radius)));
		}
		self.collision.validate()
	}
}

/// Bidirectional Expansive Space Trees.
///
/// Each iteration expands a random node of the active tree toward the
/// cheapest of `k_samples` random neighbors, then tries to bridge to the
/// other tree. The two trees alternate roles every iteration. Expansion
/// draws its own candidates around tree nodes, so the sampling strategy is
/// held like the other planners hold theirs but never drawn from.
pub struct BidirectionalEST<S: SamplingStrategy> {
	sampling: S,
	config: BidirectionalESTConfig,
}

impl<S: SamplingStrategy> BidirectionalEST<S> {
	pub fn new(sampling: S, config: BidirectionalESTConfig) -> PlanningResult<Self> {
		config.validate()?;
		Ok(Self { sampling, config })
	}

	pub fn config(&self) -> &BidirectionalESTConfig {
		&self.config
	}

	pub fn sampling_mut(&mut self) -> &mut S {
		&mut self.sampling
	}

	/// Cheapest collision-free candidate around node `q_id`, with its cost from the root.
	fn expand(&self, tree: &RRTTree, q_id: usize, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> Option<(Point, f64)> {
		let q = &tree.nodes[q_id];
		let mut best: Option<(Point, f64)> = None;

		for _ in 0..self.config.k_samples {
			let theta = rng.gen::<f64>() * 2.0 * PI;
			let r = rng.gen::<f64>() * self.config.radius;

			let mut candidate = [q.state[0] + r * theta.cos(), q.state[1] + r * theta.sin()];
			steer(&q.state, &mut candidate, self.config.step_size);

			if !self.config.collision.is_segment_free(&q.state, &candidate, field) {
				continue;
			}

			let cost = extended_path_cost(q.cost_from_root, &q.state, &candidate, field, weights);
			if cost < best.map_or(f64::INFINITY, |(_, c)| c) {
				best = Some((candidate, cost));
			}
		}

		best
	}
}

impl<S: SamplingStrategy> Planner for BidirectionalEST<S> {
	fn name(&self) -> &'static str {
		"bidirectional_est"
	}

	fn plan(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<Option<Path>> {
		let BidirectionalESTConfig { step_size, max_iterations, collision, .. } = self.config;

		// trees[0] grows from the start, trees[1] from the goal
		let mut trees = [
			RRTTree::new(start, path_cost(&[start], field, weights)),
			RRTTree::new(goal, path_cost(&[goal], field, weights)),
		];
		let mut a = 0;

		for it in 0..max_iterations {
			let b = 1 - a;
			let q_id = trees[a].random_node(rng);

			let (new_state, new_cost) = match self.expand(&trees[a], q_id, field, weights, rng) {
				Some(best) => best,
				None => {
					a = b;
					continue;
				}
			};

			let new_id = trees[a].add_node(new_state, q_id, new_cost);
			let new_state = trees[a].nodes[new_id].state;

			let nearest_id = trees[b].nearest(&new_state);
			let nearest = trees[b].nodes[nearest_id].state;

			if norm2(&new_state, &nearest) < step_size && collision.is_segment_free(&new_state, &nearest, field) {
				let (start_id, goal_id) = if a == 0 { (new_id, nearest_id) } else { (nearest_id, new_id) };
				let path = join_branches(trees[0].get_path_to(start_id), trees[1].get_path_to(goal_id));

				let cost = path_cost(&path, field, weights);
				if cost.is_finite() {
					info!("bidirectional_est: path found after {} iterations, {} waypoints, cost {:.3}", it + 1, path.len(), cost);
					return Ok(Some(path));
				}
			}

			a = b;
		}

		debug!("bidirectional_est: no path after {} iterations (tree sizes {} / {})", max_iterations, trees[0].len(), trees[1].len());
		Ok(None)
	}
}
