use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::cost_field::*;
use crate::error::{PlanningError, PlanningResult};
use crate::nearest_neighbor::*;
use crate::planner::Planner;
use crate::prm_graph::*;
use crate::sample_space::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PRMConfig {
	pub n_samples: usize,
	pub k_neighbors: usize,
	pub max_sample_attempts: usize,
	pub collision: CollisionChecker,
}

impl Default for PRMConfig {
	fn default() -> Self {
		Self { n_samples: 200, k_neighbors: 10, max_sample_attempts: 100_000, collision: CollisionChecker::default() }
	}
}

impl PRMConfig {
	pub fn validate(&self) -> PlanningResult<()> {
		if self.k_neighbors == 0 {
			return Err(PlanningError::InvalidParameter("k_neighbors must be positive".to_string()));
		}
		if self.max_sample_attempts < self.n_samples {
			return Err(PlanningError::InvalidParameter(format!(
				"max_sample_attempts ({}) must be at least n_samples ({})", self.max_sample_attempts, self.n_samples)));
		}
		self.collision.validate()
	}
}

pub struct PRM<S: SamplingStrategy> {
	sampling: S,
	config: PRMConfig,
}

impl<S: SamplingStrategy> PRM<S> {
	pub fn new(sampling: S, config: PRMConfig) -> PlanningResult<Self> {
		config.validate()?;
		Ok(Self { sampling, config })
	}

	pub fn config(&self) -> &PRMConfig {
		&self.config
	}

	pub fn sampling_mut(&mut self) -> &mut S {
		&mut self.sampling
	}

	/// Samples the roadmap and connects each node to its `k_neighbors`
	/// nearest others. Start and goal get handles 0 and 1 (a single handle
	/// when they coincide).
	pub fn build_roadmap(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<Roadmap> {
		let mut graph = Roadmap::new();
		graph.add_node(start);
		graph.add_node(goal);

		let mut n_collected = 0;
		let mut n_attempts = 0;
		while n_collected < self.config.n_samples {
			if n_attempts == self.config.max_sample_attempts {
				warn!("prm: only {} of {} samples admitted after {} attempts", n_collected, self.config.n_samples, n_attempts);
				break;
			}
			n_attempts += 1;

			let sample = self.sampling.sample(field, &start, &goal, rng)?;
			if matches!(field.cost_at(&sample), Some(c) if c < OBSTACLE_THRESHOLD) {
				graph.add_node(sample);
				n_collected += 1;
			}
		}

		self.connect(&mut graph, field, weights);

		debug!("prm: roadmap with {} nodes and {} edges ({} sample attempts)", graph.n_nodes(), graph.n_edges(), n_attempts);
		Ok(graph)
	}

	fn connect(&self, graph: &mut Roadmap, field: &CostField, weights: &Weights) {
		let kdtree = match KdTree::from_states(graph.nodes()) {
			Some(kdtree) => kdtree,
			None => return,
		};

		for from_id in 0..graph.n_nodes() {
			let from = graph.nodes()[from_id];

			let edges: Vec<(usize, f64)> = kdtree.k_nearest_neighbors(from, self.config.k_neighbors).iter()
				.filter(|node| self.config.collision.is_segment_free(&from, &node.state, field))
				.map(|node| (node.id, edge_cost(&from, &node.state, field, weights)))
				.collect();

			for (to_id, cost) in edges {
				graph.add_edge(from_id, to_id, cost);
			}
		}
	}
}

impl<S: SamplingStrategy> Planner for PRM<S> {
	fn name(&self) -> &'static str {
		"prm"
	}

	fn plan(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<Option<Path>> {
		let graph = self.build_roadmap(start, goal, field, weights, rng)?;

		let (start_id, goal_id) = match (graph.id_of(&start), graph.id_of(&goal)) {
			(Some(start_id), Some(goal_id)) => (start_id, goal_id),
			_ => return Ok(None),
		};

		Ok(astar(&graph, start_id, goal_id).map(|(path, cost)| {
			info!("prm: path found, {} waypoints, cost {:.3}", path.len(), cost);
			path
		}))
	}
}

#[cfg(test)]
mod tests {

use super::*;
use crate::test_fixtures::*;

fn planner(n_samples: usize, k_neighbors: usize) -> PRM<UniformSampling> {
	PRM::new(UniformSampling, PRMConfig { n_samples, k_neighbors, ..Default::default() }).unwrap()
}

#[test]
fn test_roadmap_samples_are_admissible() {
	let field = scenario_field();
	let graph = planner(100, 5).build_roadmap(START, GOAL, &field, &scenario_weights(), &mut seeded_rng(42)).unwrap();

	assert!(graph.n_nodes() > 2);
	for node in &graph.nodes()[2..] {
		assert!(field.cost_at(node).unwrap() < 0.99);
	}
}

#[test]
fn test_roadmap_edges_are_free_and_bounded() {
	let field = wall_field(20, 20, 10, (8, 12));
	let weights = scenario_weights();
	let graph = planner(80, 4).build_roadmap([2.0, 2.0], [17.0, 17.0], &field, &weights, &mut seeded_rng(1)).unwrap();

	for (from_id, from) in graph.nodes().iter().enumerate() {
		assert!(graph.edges(from_id).len() <= 4);
		for &(to_id, cost) in graph.edges(from_id) {
			assert_ne!(to_id, from_id);
			let to = graph.nodes()[to_id];
			assert!(collision_free(from, &to, &field, 0.99, 1.0));
			approx::assert_relative_eq!(cost, edge_cost(from, &to, &field, &weights));
		}
	}
}

#[test]
fn test_plan_through_gap() {
	let field = wall_field(20, 20, 10, (6, 14));
	let start = [2.0, 2.0];
	let goal = [17.0, 17.0];

	let path = planner(300, 10).plan(start, goal, &field, &Weights::default(), &mut seeded_rng(0)).unwrap().expect("No path found!");
	assert_valid_path(&path, &start, &goal, &field);
}

#[test]
fn test_plan_blocked_returns_none() {
	let field = blocked_field(20, 20, 10);
	let result = planner(100, 8).plan([5.0, 2.0], [5.0, 18.0], &field, &Weights::default(), &mut seeded_rng(0)).unwrap();
	assert!(result.is_none());
}

#[test]
fn test_sample_budget_is_bounded() {
	let mut field = CostField::filled(10, 10, 1.0).unwrap();
	field.set(0, 0, 0.0).unwrap();
	field.set(0, 1, 0.0).unwrap();

	let mut prm = PRM::new(StaticSampling::new(vec![[5.0, 5.0]]).unwrap(), PRMConfig { n_samples: 10, k_neighbors: 1, max_sample_attempts: 50, ..Default::default() }).unwrap();
	let graph = prm.build_roadmap([0.0, 0.0], [0.0, 1.0], &field, &Weights::default(), &mut seeded_rng(0)).unwrap();
	assert_eq!(graph.n_nodes(), 2);

	let path = prm.plan([0.0, 0.0], [0.0, 1.0], &field, &Weights::default(), &mut seeded_rng(0)).unwrap();
	assert_eq!(path, Some(vec![[0.0, 0.0], [0.0, 1.0]]));
}

#[test]
fn test_scenario_is_reproducible() {
	let field = scenario_field();
	let weights = scenario_weights();
	let run = || planner(400, 10).plan(START, GOAL, &field, &weights, &mut seeded_rng(42)).unwrap();

	let first = run();
	if let Some(path) = &first {
		assert_valid_path(path, &START, &GOAL, &field);
	}
	assert_eq!(run(), first);
}

#[test]
fn test_roadmap_can_be_saved_and_searched_later() {
	let field = open_field(15, 15);
	let graph = planner(60, 6).build_roadmap([1.0, 1.0], [13.0, 13.0], &field, &Weights::default(), &mut seeded_rng(3)).unwrap();

	let filename = std::env::temp_dir().join("sampling_planners_test_prm_roadmap.json");
	graph.save(&filename).unwrap();
	let loaded = Roadmap::load(&filename).unwrap();
	let _ = std::fs::remove_file(&filename);

	assert_eq!(loaded.nodes(), graph.nodes());
	assert_eq!(loaded.n_edges(), graph.n_edges());

	let (_, cost) = astar(&graph, 0, 1).unwrap();
	let (loaded_path, loaded_cost) = astar(&loaded, 0, 1).unwrap();
	assert_valid_path(&loaded_path, &[1.0, 1.0], &[13.0, 13.0], &field);
	approx::assert_relative_eq!(loaded_cost, cost, epsilon = 1e-9);
}

#[test]
fn test_invalid_config() {
	assert!(PRM::new(UniformSampling, PRMConfig { k_neighbors: 0, ..Default::default() }).is_err());
	assert!(PRM::new(UniformSampling, PRMConfig { n_samples: 10, max_sample_attempts: 5, ..Default::default() }).is_err());
}
}
