use anyhow::{Result, bail};
use candle_core::{DType, Device, Tensor};
use lockstep_core::{
    BatchedEnv,
    env::{Env, EnvironmentDescription, SnapShot, Space},
    env_builder::EnvBuilderTrait,
    preprocessors::PreprocessorKind,
};
use pyo3::{
    Bound, PyAny, PyObject, Python,
    types::{PyAnyMethods, PyDict, PyModule},
};
use tracing::debug;

/// An action in the form gymnasium accepts it.
#[derive(Debug, Clone, PartialEq)]
pub enum GymAction {
    Discrete(i64),
    Continuous(Vec<f32>),
}

impl GymAction {
    /// Discrete spaces take either a scalar index or a one-hot style vector, continuous ones get
    /// the flattened action clamped to the space bounds.
    pub fn from_tensor(action: &Tensor, action_space: &Space) -> Result<Self> {
        let values = action.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        match action_space {
            Space::Discrete(_) => {
                let index = match (action.rank(), values.as_slice()) {
                    (0, [value]) => *value as i64,
                    (_, values) => one_hot_position(values)?,
                };
                Ok(Self::Discrete(index))
            }
            Space::Continuous { min, max, .. } => {
                let values = match (min, max) {
                    (Some(min), Some(max)) => {
                        let min = min.flatten_all()?.to_vec1::<f32>()?;
                        let max = max.flatten_all()?.to_vec1::<f32>()?;
                        if min.len() != values.len() || max.len() != values.len() {
                            bail!(
                                "action has {} values but the space bounds have {}",
                                values.len(),
                                min.len()
                            );
                        }
                        values
                            .iter()
                            .zip(min.iter().zip(max.iter()))
                            .map(|(value, (min, max))| value.clamp(*min, *max))
                            .collect()
                    }
                    _ => values,
                };
                Ok(Self::Continuous(values))
            }
        }
    }
}

fn one_hot_position(values: &[f32]) -> Result<i64> {
    if let Some(position) = values.iter().position(|value| *value > 0.) {
        return Ok(position as i64);
    }
    match values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
    {
        Some((position, _)) => Ok(position as i64),
        None => bail!("empty action for a discrete space"),
    }
}

// Goes through one python float per element, for pixel frames this dominates the step time.
fn array_to_tensor(py: Python<'_>, array: &Bound<'_, PyAny>) -> Result<Tensor> {
    let numpy = py.import("numpy")?;
    let array = numpy.call_method1("asarray", (array, "float32"))?;
    let shape: Vec<usize> = array.getattr("shape")?.extract()?;
    let data: Vec<f32> = array
        .call_method0("ravel")?
        .call_method0("tolist")?
        .extract()?;
    Ok(Tensor::from_vec(data, shape, &Device::Cpu)?)
}

fn space_from_gym(
    py: Python<'_>,
    space: &Bound<'_, PyAny>,
    gym_spaces: &Bound<'_, PyModule>,
) -> Result<Space> {
    if space.is_instance(&gym_spaces.getattr("Discrete")?)? {
        let n = space.getattr("n")?.extract()?;
        Ok(Space::Discrete(n))
    } else if space.is_instance(&gym_spaces.getattr("Box")?)? {
        let shape: Vec<usize> = space.getattr("shape")?.extract()?;
        let min = array_to_tensor(py, &space.getattr("low")?)?;
        let max = array_to_tensor(py, &space.getattr("high")?)?;
        Ok(Space::Continuous {
            min: Some(min),
            max: Some(max),
            shape,
        })
    } else {
        bail!("unsupported gymnasium space: {space}")
    }
}

pub struct GymEnv {
    env: PyObject,
    action_space: Space,
    observation_space: Space,
}

impl GymEnv {
    pub fn new(name: &str, render_mode: Option<&str>) -> Result<GymEnv> {
        Python::with_gil(|py| {
            let gym = py.import("gymnasium")?;
            let kwargs = PyDict::new(py);
            if let Some(render_mode) = render_mode {
                kwargs.set_item("render_mode", render_mode)?;
            }
            let make = gym.getattr("make")?;
            let env = make.call((name,), Some(&kwargs))?;
            let gym_spaces = py.import("gymnasium.spaces")?;
            let action_space = space_from_gym(py, &env.getattr("action_space")?, &gym_spaces)?;
            let observation_space =
                space_from_gym(py, &env.getattr("observation_space")?, &gym_spaces)?;
            debug!(name, "created gym env");
            Ok(GymEnv {
                env: env.unbind(),
                action_space,
                observation_space,
            })
        })
    }
}

impl Env for GymEnv {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        Python::with_gil(|py| {
            let kwargs = PyDict::new(py);
            kwargs.set_item("seed", seed)?;
            let reset = self.env.call_method(py, "reset", (), Some(&kwargs))?;
            let reset = reset.bind(py);
            array_to_tensor(py, &reset.get_item(0)?)
        })
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let action = GymAction::from_tensor(action, &self.action_space)?;
        Python::with_gil(|py| {
            let step = match action {
                GymAction::Discrete(index) => self.env.call_method1(py, "step", (index,))?,
                GymAction::Continuous(values) => {
                    let numpy = py.import("numpy")?;
                    let values = numpy.call_method1("asarray", (values, "float32"))?;
                    self.env.call_method1(py, "step", (values,))?
                }
            };
            // (observation, reward, terminated, truncated, info), info is dropped
            let step = step.bind(py);
            Ok(SnapShot {
                state: array_to_tensor(py, &step.get_item(0)?)?,
                reward: step.get_item(1)?.extract()?,
                terminated: step.get_item(2)?.extract()?,
                truncated: step.get_item(3)?.extract()?,
            })
        })
    }

    fn render(&mut self) -> Result<()> {
        Python::with_gil(|py| {
            self.env.call_method0(py, "render")?;
            Ok(())
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(self.observation_space.clone(), self.action_space.clone())
    }
}

pub struct GymEnvBuilder {
    name: String,
    render_mode: Option<String>,
}

impl GymEnvBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            render_mode: None,
        }
    }

    pub fn with_render_mode(mut self, render_mode: &str) -> Self {
        self.render_mode = Some(render_mode.to_owned());
        self
    }
}

impl EnvBuilderTrait for GymEnvBuilder {
    type Env = GymEnv;

    fn build_env(&self) -> Result<Self::Env> {
        GymEnv::new(&self.name, self.render_mode.as_deref())
    }
}

/// `batchsize` instances of the gymnasium env `name`.
pub fn make_batched(
    name: &str,
    batchsize: usize,
    preprocessor: Option<PreprocessorKind>,
) -> Result<BatchedEnv<GymEnv>> {
    BatchedEnv::new(GymEnvBuilder::new(name), batchsize, preprocessor)
}
