use rand::Rng;

use crate::common::*;
use crate::cost_field::{CostField, Weights};
use crate::sample_space::seeded_rng;

pub const START: Point = [5.0, 5.0];
pub const GOAL: Point = [45.0, 45.0];

/// 50x50 field of random costs, cells above 0.8 turned into obstacles.
/// The `START` and `GOAL` cells are cleared so the query is solvable.
pub fn scenario_field() -> CostField {
	let mut rng = seeded_rng(42);
	let values = (0..50 * 50)
		.map(|_| {
			let v: f64 = rng.gen();
			if v > 0.8 { 1.0 } else { v }
		})
		.collect();

	let mut field = CostField::new(50, 50, values).unwrap();
	for p in &[START, GOAL] {
		field.set(p[0] as usize, p[1] as usize, 0.0).unwrap();
	}
	field
}

pub fn scenario_weights() -> Weights {
	Weights::new(0.7, 0.3).unwrap()
}

pub fn open_field(rows: usize, cols: usize) -> CostField {
	CostField::filled(rows, cols, 0.0).unwrap()
}

/// Open field split by a vertical wall at `wall_col` with a gap of rows
/// `gap.0..gap.1`.
pub fn wall_field(rows: usize, cols: usize, wall_col: usize, gap: (usize, usize)) -> CostField {
	let mut field = open_field(rows, cols);
	for row in 0..rows {
		if row < gap.0 || row >= gap.1 {
			field.set(row, wall_col, 1.0).unwrap();
		}
	}
	field
}

/// Field fully blocked by a wall without any gap.
pub fn blocked_field(rows: usize, cols: usize, wall_col: usize) -> CostField {
	wall_field(rows, cols, wall_col, (0, 0))
}

/// Checks the properties every returned path must have.
pub fn assert_valid_path(path: &[Point], start: &Point, goal: &Point, field: &CostField) {
	assert!(!path.is_empty());
	assert_eq!(path[0], *start);
	assert_eq!(path[path.len() - 1], *goal);
	for (a, b) in pairwise_iter(path) {
		assert!(crate::cost_field::collision_free(a, b, field, 0.99, 1.0), "segment {:?} -> {:?} collides", a, b);
	}
}

#[test]
fn test_scenario_endpoints_are_free() {
	let field = scenario_field();
	assert_eq!(field.cost_at(&START), Some(0.0));
	assert_eq!(field.cost_at(&GOAL), Some(0.0));
}
