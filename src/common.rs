use itertools::izip;
use ordered_float::OrderedFloat;
use std::{iter::Zip, slice::Iter};

/// Planning coordinate, `[row, col]`. Rounded to a grid index for cost lookups.
pub type Point = [f64; 2];

/// Ordered sequence of points, first = start, last = goal.
pub type Path = Vec<Point>;

/// Exact-coordinate key used for tree and roadmap membership.
pub type PointKey = [OrderedFloat<f64>; 2];

pub fn point_key(p: &Point) -> PointKey {
	[OrderedFloat(p[0]), OrderedFloat(p[1])]
}

pub fn norm2<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
	let mut d2 = 0.0;

	for (xa, xb) in izip!(a.iter(), b.iter())
	{
		let dx = xb - xa;
		d2 += dx * dx;
	}

	d2.sqrt()
}

/// Straight-line cost-to-go estimate.
pub fn heuristic(node: &Point, goal: &Point) -> f64 {
	norm2(node, goal)
}

/// Moves `to` toward `from` so that it lies at most `max_step` away.
/// A target closer than `max_step` is left untouched.
pub fn steer<const N: usize>(from: &[f64; N], to: &mut [f64; N], max_step: f64) {
	let d = norm2(from, to);

	if d >= max_step && d > 0.0 {
		let lambda = max_step / d;
		for i in 0..N {
			to[i] = from[i] + (to[i] - from[i]) * lambda;
		}
	}
}

pub fn pairwise_iter<T>(v: &[T]) -> Zip<Iter<T>, Iter<T>> {
	let tail = if v.is_empty() { v } else { &v[1..] };
	v.iter().zip(tail)
}

/// Concatenates two root-to-node branches meeting at their last points.
/// The second branch is walked backward; a shared junction appears once.
pub fn join_branches(mut head: Path, tail: Path) -> Path {
	let mut tail = tail.into_iter().rev().peekable();

	if let (Some(last), Some(first)) = (head.last(), tail.peek()) {
		if point_key(last) == point_key(first) {
			tail.next();
		}
	}

	head.extend(tail);
	head
}
