use std::fs::File;
use std::io::BufReader;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::bit_star::*;
use crate::common::*;
use crate::cost_field::*;
use crate::error::{PlanningError, PlanningResult};
use crate::est::*;
use crate::learned_sampling::*;
use crate::planner::Planner;
use crate::prm::*;
use crate::rrt::*;
use crate::sample_space::*;

fn from_json_str<T: DeserializeOwned>(json: &str) -> PlanningResult<T> {
	Ok(serde_json::from_str(json)?)
}

fn from_file<T: DeserializeOwned>(filename: impl AsRef<std::path::Path>) -> PlanningResult<T> {
	let reader = BufReader::new(File::open(filename)?);
	Ok(serde_json::from_reader(reader)?)
}

/****************************Sampling******************************/

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SamplingConfig {
	Uniform,
	Hybrid {
		#[serde(default = "default_goal_bias")]
		goal_bias: f64,
	},
	Static {
		points: Vec<Point>,
	},
	Learned(LearnedSamplingConfig),
}

fn default_goal_bias() -> f64 {
	HybridSampling::default().goal_bias()
}

impl Default for SamplingConfig {
	fn default() -> Self {
		SamplingConfig::Uniform
	}
}

impl SamplingConfig {
	pub fn from_json_str(json: &str) -> PlanningResult<Self> {
		from_json_str(json)
	}

	pub fn from_file(filename: impl AsRef<std::path::Path>) -> PlanningResult<Self> {
		from_file(filename)
	}

	/// Builds the strategy. Learned sampling needs a predictor, see `build_with`.
	pub fn build(&self) -> PlanningResult<Box<dyn SamplingStrategy>> {
		match self {
			SamplingConfig::Uniform => Ok(Box::new(UniformSampling)),
			SamplingConfig::Hybrid { goal_bias } => Ok(Box::new(HybridSampling::new(*goal_bias)?)),
			SamplingConfig::Static { points } => Ok(Box::new(StaticSampling::new(points.clone())?)),
			SamplingConfig::Learned(_) => Err(PlanningError::InvalidParameter("learned sampling requires a predictor".to_string())),
		}
	}

	/// Like `build`, handing `predictor` to a learned strategy.
	pub fn build_with<P: Predictor + 'static>(&self, predictor: P) -> PlanningResult<Box<dyn SamplingStrategy>> {
		match self {
			SamplingConfig::Learned(config) => Ok(Box::new(LearnedSampling::new(predictor, config.clone())?)),
			_ => self.build(),
		}
	}
}

/****************************Planner******************************/

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum PlannerConfig {
	RrtConnect(RRTConnectConfig),
	BidirectionalEst(BidirectionalESTConfig),
	BitStar(BITStarConfig),
	Prm(PRMConfig),
}

impl Default for PlannerConfig {
	fn default() -> Self {
		PlannerConfig::RrtConnect(RRTConnectConfig::default())
	}
}

impl PlannerConfig {
	pub fn from_json_str(json: &str) -> PlanningResult<Self> {
		from_json_str(json)
	}

	pub fn from_file(filename: impl AsRef<std::path::Path>) -> PlanningResult<Self> {
		from_file(filename)
	}

	pub fn validate(&self) -> PlanningResult<()> {
		match self {
			PlannerConfig::RrtConnect(config) => config.validate(),
			PlannerConfig::BidirectionalEst(config) => config.validate(),
			PlannerConfig::BitStar(config) => config.validate(),
			PlannerConfig::Prm(config) => config.validate(),
		}
	}

	pub fn build(&self, sampling: Box<dyn SamplingStrategy>) -> PlanningResult<Box<dyn Planner>> {
		let planner: Box<dyn Planner> = match self {
			PlannerConfig::RrtConnect(config) => Box::new(RRTConnect::new(sampling, *config)?),
			PlannerConfig::BidirectionalEst(config) => Box::new(BidirectionalEST::new(sampling, *config)?),
			PlannerConfig::BitStar(config) => Box::new(BITStar::new(sampling, *config)?),
			PlannerConfig::Prm(config) => Box::new(PRM::new(sampling, *config)?),
		};
		Ok(planner)
	}
}

/****************************Planning run******************************/

/// Everything needed to reproduce a planning query apart from the field
/// and the endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningConfig {
	pub planner: PlannerConfig,
	#[serde(default)]
	pub sampling: SamplingConfig,
	#[serde(default)]
	pub weights: Weights,
	#[serde(default)]
	pub seed: u64,
}

impl PlanningConfig {
	pub fn from_json_str(json: &str) -> PlanningResult<Self> {
		from_json_str(json)
	}

	pub fn from_file(filename: impl AsRef<std::path::Path>) -> PlanningResult<Self> {
		from_file(filename)
	}

	pub fn build(&self) -> PlanningResult<Box<dyn Planner>> {
		self.planner.build(self.sampling.build()?)
	}

	/// Builds the planner and runs one query with a fresh generator seeded from `seed`.
	pub fn plan(&self, start: Point, goal: Point, field: &CostField) -> PlanningResult<Option<Path>> {
		self.weights.validate()?;
		let mut planner = self.build()?;
		let mut rng = seeded_rng(self.seed);

		debug!("planning with {} (seed {})", planner.name(), self.seed);
		planner.plan(start, goal, field, &self.weights, &mut rng)
	}
}

#[cfg(test)]
mod tests {

use super::*;
use crate::test_fixtures::*;

#[test]
fn test_planner_config_from_json() {
	let config = PlannerConfig::from_json_str(r#"{ "algorithm": "rrt_connect", "step_size": 2.5 }"#).unwrap();
	assert_eq!(config, PlannerConfig::RrtConnect(RRTConnectConfig { step_size: 2.5, ..Default::default() }));

	let config = PlannerConfig::from_json_str(r#"{ "algorithm": "bit_star", "batch_size": 50, "max_batches": 5 }"#).unwrap();
	assert_eq!(config, PlannerConfig::BitStar(BITStarConfig { batch_size: 50, max_batches: 5, ..Default::default() }));

	let config = PlannerConfig::from_json_str(r#"{ "algorithm": "prm", "collision": { "step": 0.5 } }"#).unwrap();
	match config {
		PlannerConfig::Prm(prm) => {
			assert_eq!(prm.n_samples, 200);
			assert_eq!(prm.collision.step, 0.5);
			assert_eq!(prm.collision.threshold, OBSTACLE_THRESHOLD);
		}
		other => panic!("unexpected config {:?}", other),
	}
}

#[test]
fn test_unknown_algorithm_is_rejected() {
	let err = PlannerConfig::from_json_str(r#"{ "algorithm": "rrt_star" }"#).unwrap_err();
	assert!(matches!(err, PlanningError::Serialization(_)));
}

#[test]
fn test_sampling_config_from_json() {
	assert_eq!(SamplingConfig::from_json_str(r#"{ "strategy": "uniform" }"#).unwrap(), SamplingConfig::Uniform);
	assert_eq!(SamplingConfig::from_json_str(r#"{ "strategy": "hybrid" }"#).unwrap(), SamplingConfig::Hybrid { goal_bias: 0.1 });
	assert_eq!(
		SamplingConfig::from_json_str(r#"{ "strategy": "static", "points": [[1.0, 2.0], [3.0, 4.0]] }"#).unwrap(),
		SamplingConfig::Static { points: vec![[1.0, 2.0], [3.0, 4.0]] });

	let learned = SamplingConfig::from_json_str(r#"{ "strategy": "learned", "max_attempts": 10 }"#).unwrap();
	assert_eq!(learned, SamplingConfig::Learned(LearnedSamplingConfig { max_attempts: 10, ..Default::default() }));
}

#[test]
fn test_invalid_sampling_configs_fail_to_build() {
	assert!(matches!(SamplingConfig::Static { points: vec![] }.build(), Err(PlanningError::EmptyStaticSamples)));
	assert!(SamplingConfig::Hybrid { goal_bias: 1.5 }.build().is_err());
	assert!(SamplingConfig::Learned(LearnedSamplingConfig::default()).build().is_err());
}

#[test]
fn test_learned_sampling_builds_with_predictor() {
	fn flat(features: &FeatureMaps) -> Result<ProbabilityMap, PredictorError> {
		Ok(ProbabilityMap::new(features.rows, features.cols, vec![1.0; features.rows * features.cols])?)
	}

	let field = open_field(8, 8);
	let mut sampler = SamplingConfig::Learned(LearnedSamplingConfig { goal_bias: 0.0, ..Default::default() }).build_with(flat).unwrap();
	let p = sampler.sample(&field, &[0.0, 0.0], &[7.0, 7.0], &mut seeded_rng(0)).unwrap();
	assert!(field.cell(&p).is_some());
}

#[test]
fn test_build_every_planner() {
	let field = open_field(20, 20);
	let configs = [
		(PlannerConfig::RrtConnect(RRTConnectConfig::default()), "rrt_connect"),
		(PlannerConfig::BidirectionalEst(BidirectionalESTConfig::default()), "bidirectional_est"),
		(PlannerConfig::BitStar(BITStarConfig { batch_size: 100, max_batches: 2, ..Default::default() }), "bit_star"),
		(PlannerConfig::Prm(PRMConfig { n_samples: 150, ..Default::default() }), "prm"),
	];

	for (config, name) in configs.iter() {
		let mut planner = config.build(SamplingConfig::Uniform.build().unwrap()).unwrap();
		assert_eq!(planner.name(), *name);

		let path = planner.plan([2.0, 2.0], [12.0, 13.0], &field, &Weights::default(), &mut seeded_rng(1)).unwrap();
		if let Some(path) = path {
			assert_valid_path(&path, &[2.0, 2.0], &[12.0, 13.0], &field);
		}
	}
}

#[test]
fn test_invalid_planner_config_fails_to_build() {
	let config = PlannerConfig::Prm(PRMConfig { k_neighbors: 0, ..Default::default() });
	assert!(config.validate().is_err());
	assert!(config.build(Box::new(UniformSampling)).is_err());
}

#[test]
fn test_planning_config_end_to_end() {
	let json = r#"{
		"planner": { "algorithm": "rrt_connect", "step_size": 5.0, "max_iterations": 2000 },
		"sampling": { "strategy": "uniform" },
		"weights": { "length": 0.7, "cost": 0.3 },
		"seed": 42
	}"#;
	let config = PlanningConfig::from_json_str(json).unwrap();
	assert_eq!(config.weights, scenario_weights());

	let field = scenario_field();
	let first = config.plan(START, GOAL, &field).unwrap().expect("No path found!");
	assert_valid_path(&first, &START, &GOAL, &field);
	assert_eq!(config.plan(START, GOAL, &field).unwrap(), Some(first));
}

#[test]
fn test_planning_config_from_file() {
	let config = PlanningConfig {
		planner: PlannerConfig::Prm(PRMConfig { n_samples: 50, k_neighbors: 5, ..Default::default() }),
		sampling: SamplingConfig::Hybrid { goal_bias: 0.2 },
		weights: Weights::new(0.5, 2.0).unwrap(),
		seed: 7,
	};

	let filename = std::env::temp_dir().join("sampling_planners_test_planning_config.json");
	std::fs::write(&filename, serde_json::to_string_pretty(&config).unwrap()).unwrap();
	let loaded = PlanningConfig::from_file(&filename).unwrap();
	let _ = std::fs::remove_file(&filename);

	assert_eq!(loaded, config);
	assert!(matches!(PlanningConfig::from_file("/nonexistent/planning.json"), Err(PlanningError::Io(_))));
}

#[test]
fn test_negative_weights_are_rejected() {
	let config = PlanningConfig { weights: Weights { length: -1.0, cost: 0.0 }, ..Default::default() };
	assert!(config.plan(START, GOAL, &scenario_field()).is_err());
}
}
