use anyhow::Result;
use candle_core::Tensor;

#[derive(Debug, Clone)]
pub enum Space {
    Discrete(usize),
    Continuous {
        min: Option<Tensor>,
        max: Option<Tensor>,
        shape: Vec<usize>,
    },
}

impl Space {
    pub fn continuous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continuous {
            min: None,
            max: None,
            shape: dims,
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continuous { shape, .. } => shape.iter().product(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }
}

/// What a single env step hands back. Whatever diagnostic info the simulator produces is dropped
/// before it reaches this struct.
#[derive(Debug, Clone)]
pub struct SnapShot {
    pub state: Tensor,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
}

impl SnapShot {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Env {
    fn reset(&mut self, seed: u64) -> Result<Tensor>;
    fn step(&mut self, action: &Tensor) -> Result<SnapShot>;
    fn env_description(&self) -> EnvironmentDescription;

    // Most envs have nothing to show
    fn render(&mut self) -> Result<()> {
        Ok(())
    }
}
