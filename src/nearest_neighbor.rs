use crate::common::*;

pub struct KdNode<const N: usize> {
	pub id: usize,
	pub state: [f64; N],
	left: Option<Box<KdNode<N>>>,
	right: Option<Box<KdNode<N>>>,
}

/// Incremental kd-tree. Ids are insertion handles; distance ties resolve to
/// the smallest id so results match a linear scan in insertion order.
pub struct KdTree<const N: usize> {
	pub root: KdNode<N>,
	len: usize,
}

impl<const N: usize> KdTree<N> {
	pub fn new(state: [f64; N]) -> Self {
		let root = KdNode { id: 0, state, left: None, right: None };
		Self { root, len: 1 }
	}

	/// Builds a static index over `states`, ids being their positions.
	pub fn from_states(states: &[[f64; N]]) -> Option<Self> {
		let (first, rest) = states.split_first()?;
		let mut tree = Self::new(*first);
		for (i, state) in rest.iter().enumerate() {
			tree.add(*state, i + 1);
		}
		Some(tree)
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		false
	}

	pub fn add(&mut self, state: [f64; N], id: usize) {
		self.len += 1;

		let mut current = &mut self.root;
		for axis in (0..N).cycle() {
			let next = if state[axis] < current.state[axis] {
				&mut current.left
			} else {
				&mut current.right
			};

			match next {
				Some(node) => current = node,
				None => {
					*next = Some(Box::new(KdNode { id, state, left: None, right: None }));
					return;
				}
			}
		}
	}

	pub fn nearest_neighbor(&self, state: [f64; N]) -> &KdNode<N> {
		struct Args<'a, const N: usize> {
			state: [f64; N],
			dmin: f64,
			nearest: &'a KdNode<N>,
		}

		fn inner<'a, const N: usize>(a: &mut Args<'a, N>, from: &'a KdNode<N>, axis: usize) {
			{
				let d = norm2(&from.state, &a.state);
				if d < a.dmin || (d == a.dmin && from.id < a.nearest.id) {
					a.dmin = d;
					a.nearest = from;
				}
			}

			// go down
			let next_axis = (axis + 1) % N;
			if a.state[axis] < from.state[axis] {
				// left first
				if let Some(left) = &from.left {
					if a.state[axis] - a.dmin < from.state[axis] {
						inner(a, left, next_axis);
					}
				}
				if let Some(right) = &from.right {
					if a.state[axis] + a.dmin >= from.state[axis] {
						inner(a, right, next_axis);
					}
				}
			} else {
				// right first
				if let Some(right) = &from.right {
					if a.state[axis] + a.dmin >= from.state[axis] {
						inner(a, right, next_axis);
					}
				}
				if let Some(left) = &from.left {
					if a.state[axis] - a.dmin < from.state[axis] {
						inner(a, left, next_axis);
					}
				}
			}
		}

		let mut a = Args { state, dmin: f64::INFINITY, nearest: &self.root };
		inner(&mut a, &self.root, 0);
		a.nearest
	}

	/// All nodes within `radius` (inclusive), in no particular order.
	pub fn nearest_neighbors(&self, state: [f64; N], radius: f64) -> Vec<&KdNode<N>> {
		struct Args<'a, const N: usize> {
			state: [f64; N],
			radius: f64,
			nearest: Vec<&'a KdNode<N>>,
		}

		fn inner<'a, const N: usize>(a: &mut Args<'a, N>, from: &'a KdNode<N>, axis: usize) {
			{
				let d = norm2(&from.state, &a.state);
				if d <= a.radius {
					a.nearest.push(from);
				}
			}

			let next_axis = (axis + 1) % N;

			if let Some(left) = &from.left {
				if a.state[axis] - a.radius <= from.state[axis] {
					inner(a, left, next_axis);
				}
			}
			if let Some(right) = &from.right {
				if a.state[axis] + a.radius >= from.state[axis] {
					inner(a, right, next_axis);
				}
			}
		}

		let mut a = Args { state, radius, nearest: vec![] };
		inner(&mut a, &self.root, 0);
		a.nearest
	}

	/// The `k` closest nodes sorted by distance then id. Nodes sitting exactly
	/// on `state` are skipped, so a member never counts as its own neighbor.
	pub fn k_nearest_neighbors(&self, state: [f64; N], k: usize) -> Vec<&KdNode<N>> {
		struct Args<'a, const N: usize> {
			state: [f64; N],
			k: usize,
			best: Vec<(f64, &'a KdNode<N>)>,
		}

		impl<'a, const N: usize> Args<'a, N> {
			fn worst(&self) -> f64 {
				if self.best.len() < self.k {
					f64::INFINITY
				} else {
					self.best[self.k - 1].0
				}
			}

			fn offer(&mut self, d: f64, node: &'a KdNode<N>) {
				let pos = self.best.iter()
					.position(|(bd, bn)| d < *bd || (d == *bd && node.id < bn.id))
					.unwrap_or(self.best.len());
				if pos < self.k {
					self.best.insert(pos, (d, node));
					self.best.truncate(self.k);
				}
			}
		}

		fn inner<'a, const N: usize>(a: &mut Args<'a, N>, from: &'a KdNode<N>, axis: usize) {
			if from.state != a.state {
				let d = norm2(&from.state, &a.state);
				a.offer(d, from);
			}

			let next_axis = (axis + 1) % N;
			let (near, far) = if a.state[axis] < from.state[axis] {
				(&from.left, &from.right)
			} else {
				(&from.right, &from.left)
			};

			for child in [near, far].iter().copied().flatten() {
				let w = a.worst();
				let reachable = if child.state[axis] < from.state[axis] {
					a.state[axis] - w < from.state[axis]
				} else {
					a.state[axis] + w >= from.state[axis]
				};
				if reachable {
					inner(a, child, next_axis);
				}
			}
		}

		if k == 0 {
			return vec![];
		}

		let mut a = Args { state, k, best: Vec::with_capacity(k + 1) };
		inner(&mut a, &self.root, 0);
		a.best.into_iter().map(|(_, node)| node).collect()
	}
}

/// Linear-scan nearest point, ties resolved to the first occurrence.
pub fn nearest<const N: usize>(points: &[[f64; N]], query: &[f64; N]) -> Option<[f64; N]> {
	let mut best: Option<(f64, [f64; N])> = None;
	for p in points {
		let d = norm2(p, query);
		if best.map_or(true, |(bd, _)| d < bd) {
			best = Some((d, *p));
		}
	}
	best.map(|(_, p)| p)
}

/// Linear-scan `k` nearest points, excluding points equal to `query`.
pub fn k_nearest<const N: usize>(points: &[[f64; N]], query: &[f64; N], k: usize) -> Vec<[f64; N]> {
	let mut dists: Vec<(usize, f64)> = points.iter()
		.enumerate()
		.filter(|(_, p)| *p != query)
		.map(|(i, p)| (i, norm2(p, query)))
		.collect();

	// stable sort keeps input order among ties
	dists.sort_by(|(_, a), (_, b)| a.total_cmp(b));
	dists.into_iter().take(k).map(|(i, _)| points[i]).collect()
}
