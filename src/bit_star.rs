use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::cost_field::*;
use crate::error::{PlanningError, PlanningResult};
use crate::nearest_neighbor::KdTree;
use crate::planner::Planner;
use crate::prm_graph::{astar, Roadmap};
use crate::rrt::validate_step_size;
use crate::sample_space::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BITStarConfig {
	pub batch_size: usize,
	pub max_batches: usize,
	pub step_size: f64,
	pub collision: CollisionChecker,
}

impl Default for BITStarConfig {
	fn default() -> Self {
		Self { batch_size: 100, max_batches: 10, step_size: 5.0, collision: CollisionChecker::default() }
	}
}

impl BITStarConfig {
	pub fn validate(&self) -> PlanningResult<()> {
		validate_step_size(self.step_size)?;
		if self.batch_size == 0 || self.max_batches == 0 {
			return Err(PlanningError::InvalidParameter("batch_size and max_batches must be positive".to_string()));
		}
		self.collision.validate()
	}
}

/// Result of a batch run: the best path, its cost (`inf` without a path)
/// and the best cost known after each batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BITStarOutcome {
	pub path: Option<Path>,
	pub cost: f64,
	pub batch_costs: Vec<f64>,
}

/// Batch informed tree search.
///
/// A cumulative sample set seeded with start and goal grows by one batch at
/// a time. Once a solution is known, samples whose straight-line detour
/// cannot beat it are discarded. After each batch every pair of samples at
/// most `step_size` apart is connected if free, and A* is rerun on the
/// resulting graph.
pub struct BITStar<S: SamplingStrategy> {
	sampling: S,
	config: BITStarConfig,
}

impl<S: SamplingStrategy> BITStar<S> {
	pub fn new(sampling: S, config: BITStarConfig) -> PlanningResult<Self> {
		config.validate()?;
		Ok(Self { sampling, config })
	}

	pub fn config(&self) -> &BITStarConfig {
		&self.config
	}

	pub fn sampling_mut(&mut self) -> &mut S {
		&mut self.sampling
	}

	pub fn plan_batches(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<BITStarOutcome> {
		let mut graph = Roadmap::new();
		let start_id = graph.add_node(start);
		let goal_id = graph.add_node(goal);

		let mut best_path = None;
		let mut best_cost = f64::INFINITY;
		let mut batch_costs = Vec::with_capacity(self.config.max_batches);

		for batch in 0..self.config.max_batches {
			for _ in 0..self.config.batch_size {
				let sample = self.sampling.sample_space(field, rng)?;
				if heuristic(&start, &sample) + heuristic(&sample, &goal) < best_cost {
					graph.add_node(sample);
				}
			}

			self.rebuild_edges(&mut graph, field, weights);

			if let Some((path, cost)) = astar(&graph, start_id, goal_id) {
				if cost < best_cost {
					info!("bit_star: batch {} improved cost from {:.3} to {:.3}", batch, best_cost, cost);
					best_cost = cost;
					best_path = Some(path);
				}
			}

			debug!("bit_star: batch {} done, {} samples, {} edges", batch, graph.n_nodes(), graph.n_edges());
			batch_costs.push(best_cost);
		}

		Ok(BITStarOutcome { path: best_path, cost: best_cost, batch_costs })
	}

	/// Connects every ordered pair within `step_size` whose segment is free.
	fn rebuild_edges(&self, graph: &mut Roadmap, field: &CostField, weights: &Weights) {
		graph.clear_edges();

		let kdtree = match KdTree::from_states(graph.nodes()) {
			Some(kdtree) => kdtree,
			None => return,
		};

		for from_id in 0..graph.n_nodes() {
			let from = graph.nodes()[from_id];

			let mut neighbour_ids: Vec<usize> = kdtree.nearest_neighbors(from, self.config.step_size).iter()
				.map(|node| node.id)
				.filter(|&id| id != from_id)
				.collect();
			neighbour_ids.sort_unstable();

			for to_id in neighbour_ids {
				let to = graph.nodes()[to_id];
				if self.config.collision.is_segment_free(&from, &to, field) {
					graph.add_edge(from_id, to_id, edge_cost(&from, &to, field, weights));
				}
			}
		}
	}
}

impl<S: SamplingStrategy> Planner for BITStar<S> {
	fn name(&self) -> &'static str {
		"bit_star"
	}

	fn plan(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<Option<Path>> {
		Ok(self.plan_batches(start, goal, field, weights, rng)?.path)
	}
}
