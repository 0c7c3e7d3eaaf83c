use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};

use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::error::PlanningResult;

/****************************Roadmap******************************/

/// Directed weighted graph over sampled points. Nodes are keyed by their
/// exact coordinates; adding a point twice yields the same handle.
#[derive(Clone, Debug, Default)]
pub struct Roadmap {
	nodes: Vec<Point>,
	edges: Vec<Vec<(usize, f64)>>,
	index: HashMap<PointKey, usize>,
}

impl Roadmap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_node(&mut self, state: Point) -> usize {
		if let Some(&id) = self.index.get(&point_key(&state)) {
			return id;
		}

		let id = self.nodes.len();
		self.nodes.push(state);
		self.edges.push(Vec::new());
		self.index.insert(point_key(&state), id);
		id
	}

	/// Adds the oriented edge `from_id -> to_id`.
	///
	/// # Panics
	///
	/// Panics if either id is not a node of the roadmap.
	pub fn add_edge(&mut self, from_id: usize, to_id: usize, cost: f64) {
		assert!(to_id < self.nodes.len(), "edge target {} is not a node", to_id);
		self.edges[from_id].push((to_id, cost));
	}

	pub fn clear_edges(&mut self) {
		for edges in &mut self.edges {
			edges.clear();
		}
	}

	pub fn id_of(&self, state: &Point) -> Option<usize> {
		self.index.get(&point_key(state)).copied()
	}

	pub fn nodes(&self) -> &[Point] {
		&self.nodes
	}

	/// Outgoing edges of node `id`. Panics if `id` is not a node.
	pub fn edges(&self, id: usize) -> &[(usize, f64)] {
		&self.edges[id]
	}

	pub fn n_nodes(&self) -> usize {
		self.nodes.len()
	}

	pub fn n_edges(&self) -> usize {
		self.edges.iter().map(Vec::len).sum()
	}
}

/***************************IO*****************************/

#[derive(Serialize, Deserialize)]
pub struct SerializableEdge {
	pub from: usize,
	pub to: usize,
	pub cost: f64,
}

#[derive(Serialize, Deserialize)]
pub struct SerializableRoadmap {
	pub nodes: Vec<Point>,
	pub edges: Vec<SerializableEdge>,
}

impl SerializableRoadmap {
	pub fn from_roadmap(roadmap: &Roadmap) -> Self {
		let edges = roadmap.edges.iter()
			.enumerate()
			.flat_map(|(from, edges)| edges.iter().map(move |&(to, cost)| SerializableEdge { from, to, cost }))
			.collect();

		Self { nodes: roadmap.nodes.clone(), edges }
	}

	pub fn to_roadmap(&self) -> Roadmap {
		let mut roadmap = Roadmap::new();
		let ids: Vec<usize> = self.nodes.iter().map(|node| roadmap.add_node(*node)).collect();

		for edge in &self.edges {
			if let (Some(&from), Some(&to)) = (ids.get(edge.from), ids.get(edge.to)) {
				roadmap.add_edge(from, to, edge.cost);
			}
		}
		roadmap
	}
}

impl Roadmap {
	pub fn save(&self, filename: impl AsRef<std::path::Path>) -> PlanningResult<()> {
		let writer = BufWriter::new(File::create(filename)?);
		serde_json::to_writer_pretty(writer, &SerializableRoadmap::from_roadmap(self))?;
		Ok(())
	}

	pub fn load(filename: impl AsRef<std::path::Path>) -> PlanningResult<Self> {
		let reader = BufReader::new(File::open(filename)?);
		let roadmap: SerializableRoadmap = serde_json::from_reader(reader)?;
		Ok(roadmap.to_roadmap())
	}
}

/****************************A*******************************/

#[derive(PartialEq, Eq)]
struct Priority {
	f: OrderedFloat<f64>,
	g: OrderedFloat<f64>,
	seq: u64,
}

// the queue pops its greatest element: smallest f, then smallest g, then oldest
impl Ord for Priority {
	fn cmp(&self, other: &Self) -> Ordering {
		other.f.cmp(&self.f)
			.then_with(|| other.g.cmp(&self.g))
			.then_with(|| other.seq.cmp(&self.seq))
	}
}

impl PartialOrd for Priority {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// A* from `start_id` to `goal_id` with the Euclidean heuristic.
/// Returns the path and its accumulated edge cost, or `None` if the goal is
/// unreachable or either id is not a node.
pub fn astar(graph: &Roadmap, start_id: usize, goal_id: usize) -> Option<(Path, f64)> {
	let n = graph.n_nodes();
	if start_id >= n || goal_id >= n {
		return None;
	}
	let goal = graph.nodes[goal_id];

	let mut g = vec![f64::INFINITY; n];
	let mut parents: Vec<Option<usize>> = vec![None; n];
	let mut closed = vec![false; n];
	let mut q = PriorityQueue::new();
	let mut seq = 0;

	g[start_id] = 0.0;
	q.push(start_id, Priority { f: OrderedFloat(heuristic(&graph.nodes[start_id], &goal)), g: OrderedFloat(0.0), seq });

	while let Some((u_id, _)) = q.pop() {
		if u_id == goal_id {
			return Some((extract_path(graph, &parents, goal_id), g[goal_id]));
		}

		closed[u_id] = true;

		for &(v_id, cost) in &graph.edges[u_id] {
			if closed[v_id] {
				continue;
			}

			let alt = g[u_id] + cost;
			if alt < g[v_id] {
				g[v_id] = alt;
				parents[v_id] = Some(u_id);
				seq += 1;
				q.push(v_id, Priority { f: OrderedFloat(alt + heuristic(&graph.nodes[v_id], &goal)), g: OrderedFloat(alt), seq });
			}
		}
	}

	None
}

fn extract_path(graph: &Roadmap, parents: &[Option<usize>], goal_id: usize) -> Path {
	let mut path = vec![graph.nodes[goal_id]];
	let mut id = goal_id;

	while let Some(parent_id) = parents[id] {
		path.push(graph.nodes[parent_id]);
		id = parent_id;
	}

	path.reverse();
	path
}

/****************************Tests******************************/
