use std::collections::HashMap;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::cost_field::*;
use crate::error::{PlanningError, PlanningResult};
use crate::nearest_neighbor::*;
use crate::planner::Planner;
use crate::sample_space::*;

pub struct RRTNode {
	pub state: Point,
	pub parent_id: Option<usize>,
	pub cost_from_root: f64,
}

/// Arena tree keyed by exact coordinates, with a kd-tree over its states.
pub struct RRTTree {
	pub nodes: Vec<RRTNode>,
	index: HashMap<PointKey, usize>,
	kdtree: KdTree<2>,
}

impl RRTTree {
	pub fn new(root: Point, root_cost: f64) -> Self {
		let mut index = HashMap::new();
		index.insert(point_key(&root), 0);

		Self {
			nodes: vec![RRTNode { state: root, parent_id: None, cost_from_root: root_cost }],
			index,
			kdtree: KdTree::new(root),
		}
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn root(&self) -> Point {
		self.nodes[0].state
	}

	/// Inserts `state` under `parent_id`. A state already in the tree keeps
	/// its parent and its existing id is returned.
	pub fn add_node(&mut self, state: Point, parent_id: usize, cost_from_root: f64) -> usize {
		if let Some(&id) = self.index.get(&point_key(&state)) {
			return id;
		}

		let id = self.nodes.len();
		self.nodes.push(RRTNode { state, parent_id: Some(parent_id), cost_from_root });
		self.index.insert(point_key(&state), id);
		self.kdtree.add(state, id);
		id
	}

	pub fn nearest(&self, state: &Point) -> usize {
		self.kdtree.nearest_neighbor(*state).id
	}

	pub fn random_node(&self, rng: &mut PlannerRng) -> usize {
		rng.gen_range(0..self.nodes.len())
	}

	/// Root-to-node path.
	pub fn get_path_to(&self, id: usize) -> Path {
		let mut path = Vec::new();

		let mut node = &self.nodes[id];
		path.push(node.state);

		while let Some(id) = node.parent_id {
			node = &self.nodes[id];
			path.push(node.state);
		}

		path.reverse();
		path
	}
}

/// Extends `tree` from its node nearest to `target` by at most `step_size`.
/// Returns the id of the reached node if the steered segment is free.
pub(crate) fn extend(tree: &mut RRTTree, target: &Point, step_size: f64, checker: &CollisionChecker, field: &CostField, weights: &Weights) -> Option<usize> {
	let from_id = tree.nearest(target);
	let from = tree.nodes[from_id].state;

	let mut new_state = *target;
	steer(&from, &mut new_state, step_size);

	if !checker.is_segment_free(&from, &new_state, field) {
		return None;
	}

	let cost = extended_path_cost(tree.nodes[from_id].cost_from_root, &from, &new_state, field, weights);
	Some(tree.add_node(new_state, from_id, cost))
}

/***************************RRT-Connect*****************************/

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RRTConnectConfig {
	pub step_size: f64,
	pub max_iterations: usize,
	pub collision: CollisionChecker,
}

impl Default for RRTConnectConfig {
	fn default() -> Self {
		Self { step_size: 5.0, max_iterations: 1000, collision: CollisionChecker::default() }
	}
}

impl RRTConnectConfig {
	pub fn validate(&self) -> PlanningResult<()> {
		validate_step_size(self.step_size)?;
		if self.max_iterations == 0 {
			return Err(PlanningError::InvalidParameter("max_iterations must be positive".to_string()));
		}
		self.collision.validate()
	}
}

pub(crate) fn validate_step_size(step_size: f64) -> PlanningResult<()> {
	if step_size > 0.0 && step_size.is_finite() {
		Ok(())
	} else {
		Err(PlanningError::InvalidParameter(format!("step_size must be positive, got {}", step_size)))
	}
}

/// Grows one tree from the start toward each sample and the goal tree toward
/// the newest start-tree node, until the two meet.
pub struct RRTConnect<S: SamplingStrategy> {
	sampling: S,
	config: RRTConnectConfig,
}

impl<S: SamplingStrategy> RRTConnect<S> {
	pub fn new(sampling: S, config: RRTConnectConfig) -> PlanningResult<Self> {
		config.validate()?;
		Ok(Self { sampling, config })
	}

	pub fn config(&self) -> &RRTConnectConfig {
		&self.config
	}

	pub fn sampling_mut(&mut self) -> &mut S {
		&mut self.sampling
	}
}

impl<S: SamplingStrategy> Planner for RRTConnect<S> {
	fn name(&self) -> &'static str {
		"rrt_connect"
	}

	fn plan(&mut self, start: Point, goal: Point, field: &CostField, weights: &Weights, rng: &mut PlannerRng) -> PlanningResult<Option<Path>> {
		let RRTConnectConfig { step_size, max_iterations, collision } = self.config;

		let mut tree_a = RRTTree::new(start, path_cost(&[start], field, weights));
		let mut tree_b = RRTTree::new(goal, path_cost(&[goal], field, weights));

		for it in 0..max_iterations {
			let sample = self.sampling.sample(field, &start, &goal, rng)?;

			let new_a_id = match extend(&mut tree_a, &sample, step_size, &collision, field, weights) {
				Some(id) => id,
				None => continue,
			};
			let new_a = tree_a.nodes[new_a_id].state;

			let new_b_id = match extend(&mut tree_b, &new_a, step_size, &collision, field, weights) {
				Some(id) => id,
				None => continue,
			};
			let new_b = tree_b.nodes[new_b_id].state;

			if norm2(&new_a, &new_b) < step_size && collision.is_segment_free(&new_a, &new_b, field) {
				let path = join_branches(tree_a.get_path_to(new_a_id), tree_b.get_path_to(new_b_id));

				let cost = path_cost(&path, field, weights);
				if cost.is_finite() {
					info!("rrt_connect: path found after {} iterations, {} waypoints, cost {:.3}", it + 1, path.len(), cost);
					return Ok(Some(path));
				}
			}
		}

		debug!("rrt_connect: no path after {} iterations (tree sizes {} / {})", max_iterations, tree_a.len(), tree_b.len());
		Ok(None)
	}
}
