use crate::{
    env::{Env, EnvironmentDescription, Space},
    env_builder::{EnvBuilderTrait, EnvBuilderType},
    preprocessors::{Preprocessor, PreprocessorKind},
    rng::next_seed,
};
use anyhow::{Result, bail, ensure};
use candle_core::{DType, Device, Tensor};
use std::sync::Arc;
use tracing::{debug, trace};

/// Shape, dtype and device of a single preprocessed observation, captured on reset. Terminated
/// envs report zeros of exactly this layout.
#[derive(Debug, Clone)]
struct SampleLayout {
    shape: Vec<usize>,
    dtype: DType,
    device: Device,
}

impl SampleLayout {
    fn of(sample: &Tensor) -> Self {
        Self {
            shape: sample.dims().to_vec(),
            dtype: sample.dtype(),
            device: sample.device().clone(),
        }
    }

    fn zeros(&self) -> Result<Tensor> {
        Ok(Tensor::zeros(self.shape.as_slice(), self.dtype, &self.device)?)
    }
}

#[derive(Debug, Clone)]
pub struct BatchStep {
    pub observations: Tensor,
    pub rewards: Tensor,
    pub dones: Vec<bool>,
}

impl BatchStep {
    pub fn done_mask(&self) -> Result<Tensor> {
        let mask = self.dones.iter().map(|done| *done as u8).collect::<Vec<_>>();
        let len = mask.len();
        Ok(Tensor::from_vec(mask, len, self.rewards.device())?)
    }

    pub fn all_done(&self) -> bool {
        self.dones.iter().all(|done| *done)
    }
}

/// A fixed set of envs stepped in lockstep. Once an env reports done it is frozen until the next
/// [`BatchedEnv::reset`] and contributes a zero observation and zero reward, so every batch keeps
/// the same leading dimension.
///
/// The spaces are taken from the first env, the batch is assumed to be homogeneous.
pub struct BatchedEnv<E: Env> {
    envs: Vec<E>,
    preprocessor: PreprocessorKind,
    env_description: EnvironmentDescription,
    layout: Option<SampleLayout>,
    dones: Vec<bool>,
}

impl<E: Env> BatchedEnv<E> {
    pub fn new<EB: EnvBuilderTrait<Env = E>>(
        builder: EB,
        batchsize: usize,
        preprocessor: Option<PreprocessorKind>,
    ) -> Result<Self> {
        let builder_type = EnvBuilderType::EnvBuilder {
            builder: Arc::new(builder),
            n_envs: batchsize,
        };
        Self::from_builder_type(&builder_type, preprocessor)
    }

    pub fn from_builder_type<EB: EnvBuilderTrait<Env = E>>(
        builder_type: &EnvBuilderType<EB>,
        preprocessor: Option<PreprocessorKind>,
    ) -> Result<Self> {
        ensure!(builder_type.num_envs() >= 1, "batch size must be at least 1");
        let envs = builder_type.build_envs()?;
        Self::from_envs(envs, preprocessor)
    }

    pub fn from_envs(envs: Vec<E>, preprocessor: Option<PreprocessorKind>) -> Result<Self> {
        let Some(first) = envs.first() else {
            bail!("batch size must be at least 1");
        };
        let env_description = first.env_description();
        let batchsize = envs.len();
        debug!(batchsize, "built batched env");
        Ok(Self {
            envs,
            preprocessor: preprocessor.unwrap_or_default(),
            env_description,
            layout: None,
            dones: vec![false; batchsize],
        })
    }

    pub fn batchsize(&self) -> usize {
        self.envs.len()
    }

    pub fn observation_space(&self) -> &Space {
        &self.env_description.observation_space
    }

    pub fn action_space(&self) -> &Space {
        &self.env_description.action_space
    }

    pub fn env_description(&self) -> &EnvironmentDescription {
        &self.env_description
    }

    pub fn preprocessor(&self) -> &PreprocessorKind {
        &self.preprocessor
    }

    pub fn dones(&self) -> &[bool] {
        &self.dones
    }

    /// Per env shape of a preprocessed observation, known after the first reset.
    pub fn sample_shape(&self) -> Option<&[usize]> {
        self.layout.as_ref().map(|layout| layout.shape.as_slice())
    }

    pub fn reset(&mut self) -> Result<Tensor> {
        let observations = self
            .envs
            .iter_mut()
            .map(|env| {
                let observation = env.reset(next_seed())?;
                Ok(self.preprocessor.transform(&observation)?)
            })
            .collect::<Result<Vec<_>>>()?;
        // from_envs guarantees at least one env
        self.layout = observations.first().map(SampleLayout::of);
        self.dones = vec![false; self.envs.len()];
        debug!(batchsize = self.envs.len(), "reset batched env");
        stack(&observations)
    }

    pub fn step(&mut self, actions: &Tensor, render: bool) -> Result<BatchStep> {
        let Some(layout) = self.layout.clone() else {
            bail!("step called before reset");
        };
        let Some(&n_actions) = actions.dims().first() else {
            bail!("actions need a leading batch axis, got a scalar");
        };
        ensure!(
            n_actions == self.envs.len(),
            "expected {} actions, got {n_actions}",
            self.envs.len()
        );
        let mut observations = Vec::with_capacity(self.envs.len());
        let mut rewards = Vec::with_capacity(self.envs.len());
        for (env_idx, env) in self.envs.iter_mut().enumerate() {
            if self.dones[env_idx] {
                observations.push(layout.zeros()?);
                rewards.push(0.);
                continue;
            }
            let action = unwrap_action(actions.get(env_idx)?)?;
            let snapshot = env.step(&action)?;
            observations.push(self.preprocessor.transform(&snapshot.state)?);
            rewards.push(snapshot.reward);
            if snapshot.done() {
                debug!(env_idx, "env finished its episode");
            }
            self.dones[env_idx] = snapshot.done();
        }
        if render {
            self.envs[0].render()?;
        }
        trace!(
            alive = self.dones.iter().filter(|done| !**done).count(),
            "stepped batched env"
        );
        let batchsize = rewards.len();
        Ok(BatchStep {
            observations: stack(&observations)?,
            rewards: Tensor::from_vec(rewards, batchsize, &layout.device)?,
            dones: self.dones.clone(),
        })
    }
}

// A single element action is handed over as its only element, anything else as is
fn unwrap_action(action: Tensor) -> Result<Tensor> {
    match action.dims().first() {
        Some(1) => Ok(action.get(0)?),
        _ => Ok(action),
    }
}

// Concatenates along the leading axis, treating rank zero and rank one samples as single rows.
fn stack(samples: &[Tensor]) -> Result<Tensor> {
    let rows = samples
        .iter()
        .map(|sample| match sample.rank() {
            0 => sample.reshape((1, 1)),
            1 => sample.unsqueeze(0),
            _ => Ok(sample.clone()),
        })
        .collect::<candle_core::Result<Vec<_>>>()?;
    Ok(Tensor::cat(&rows, 0)?)
}
