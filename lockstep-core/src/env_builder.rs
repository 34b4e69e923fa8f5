use crate::env::Env;
use anyhow::Result;
use std::sync::Arc;

pub trait EnvBuilderTrait: Sync + Send + 'static {
    type Env: Env;

    fn build_env(&self) -> Result<Self::Env>;
}

impl<E: Env, F: Sync + Send + 'static> EnvBuilderTrait for F
where
    F: Fn() -> Result<E>,
{
    type Env = E;

    fn build_env(&self) -> Result<Self::Env> {
        (self)()
    }
}

// how the environment builders should be injected into a batch
pub enum EnvBuilderType<EB: EnvBuilderTrait> {
    EnvBuilder { builder: Arc<EB>, n_envs: usize },
    EnvBuilderVec { builders: Vec<Arc<EB>> },
}

impl<EB: EnvBuilderTrait> EnvBuilderType<EB> {
    pub fn num_envs(&self) -> usize {
        match self {
            Self::EnvBuilder { n_envs, .. } => *n_envs,
            Self::EnvBuilderVec { builders } => builders.len(),
        }
    }

    /// Builds every env in order. The first builder error aborts the whole batch.
    pub fn build_envs(&self) -> Result<Vec<EB::Env>> {
        match self {
            Self::EnvBuilder { builder, n_envs } => {
                (0..*n_envs).map(|_| builder.build_env()).collect()
            }
            Self::EnvBuilderVec { builders } => builders.iter().map(|b| b.build_env()).collect(),
        }
    }
}
