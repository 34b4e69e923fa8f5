pub mod batched_env;
pub mod env;
pub mod env_builder;
pub mod preprocessors;
pub mod rng;

pub use batched_env::{BatchStep, BatchedEnv};
