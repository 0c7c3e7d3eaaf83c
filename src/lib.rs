pub mod common;
pub mod error;
pub mod cost_field;
pub mod nearest_neighbor;
pub mod sample_space;
pub mod learned_sampling;
pub mod planner;
pub mod prm_graph;
pub mod rrt;
pub mod est;
pub mod bit_star;
pub mod prm;
pub mod config;

#[cfg(test)]
mod test_fixtures;

pub use crate::common::{Path, Point};
pub use crate::error::{PlanningError, PlanningResult};
pub use crate::cost_field::{collision_free, path_cost, CollisionChecker, CostField, Weights, OBSTACLE_THRESHOLD};
pub use crate::sample_space::{seeded_rng, HybridSampling, PlannerRng, SamplingStrategy, StaticSampling, UniformSampling};
pub use crate::learned_sampling::{FeatureMaps, LearnedSampling, LearnedSamplingConfig, Predictor, ProbabilityMap};
pub use crate::planner::Planner;
pub use crate::prm_graph::{astar, Roadmap};
pub use crate::rrt::{RRTConnect, RRTConnectConfig};
pub use crate::est::{BidirectionalEST, BidirectionalESTConfig};
pub use crate::bit_star::{BITStar, BITStarConfig, BITStarOutcome};
pub use crate::prm::{PRMConfig, PRM};
pub use crate::config::{PlannerConfig, PlanningConfig, SamplingConfig};
