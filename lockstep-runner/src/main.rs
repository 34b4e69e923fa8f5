// Drives a batch of gymnasium envs with uniformly random actions and logs the episode returns.
// Mostly useful to check that an env id works with a given preprocessor before training on it.

use anyhow::Result;
use candle_core::{Device, Tensor};
use clap::{Parser, ValueEnum};
use lockstep_core::{
    BatchedEnv,
    env::Space,
    env_builder::EnvBuilderType,
    preprocessors::{
        NoPreprocessor, PreprocessorKind, memory_state_preprocessor::MemoryStatePreprocessor,
        pixel_frame_preprocessor::PixelFramePreprocessor,
    },
    rng,
};
use lockstep_gym::{GymEnvBuilder, make_batched};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PreprocessorType {
    None,
    Pixel,
    Memory,
}

impl From<PreprocessorType> for PreprocessorKind {
    fn from(value: PreprocessorType) -> Self {
        match value {
            PreprocessorType::None => NoPreprocessor.into(),
            PreprocessorType::Pixel => PixelFramePreprocessor.into(),
            PreprocessorType::Memory => MemoryStatePreprocessor.into(),
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    env_name: String,

    #[arg(long, default_value_t = 4)]
    batch_size: usize,

    #[arg(long, value_enum, default_value_t = PreprocessorType::None)]
    preprocessor: PreprocessorType,

    #[arg(long, default_value_t = 1000)]
    steps: usize,

    /// Opens a window for the first env of the batch
    #[arg(long)]
    render: bool,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

// Unbounded box dimensions are sampled from [-1, 1].
fn sample_actions(rng: &mut impl Rng, action_space: &Space, batchsize: usize) -> Result<Tensor> {
    match action_space {
        Space::Discrete(n) => {
            let actions = (0..batchsize)
                .map(|_| rng.random_range(0..*n as u32))
                .collect::<Vec<_>>();
            Ok(Tensor::from_vec(actions, batchsize, &Device::Cpu)?)
        }
        Space::Continuous { min, max, shape } => {
            let size = shape.iter().product::<usize>();
            let bounds = |bound: &Option<Tensor>, fallback: f32| -> Result<Vec<f32>> {
                let values = match bound {
                    Some(bound) => bound.flatten_all()?.to_vec1::<f32>()?,
                    None => vec![fallback; size],
                };
                Ok(values
                    .into_iter()
                    .map(|v| if v.is_finite() { v } else { fallback })
                    .collect())
            };
            let min = bounds(min, -1.)?;
            let max = bounds(max, 1.)?;
            let actions = (0..batchsize)
                .flat_map(|_| min.iter().zip(max.iter()))
                .map(|(lo, hi)| if lo < hi { rng.random_range(*lo..*hi) } else { *lo })
                .collect::<Vec<_>>();
            Ok(Tensor::from_vec(actions, (batchsize, size), &Device::Cpu)?)
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();
    rng::seed(args.seed);
    let mut action_rng = StdRng::seed_from_u64(args.seed);

    let preprocessor: Option<PreprocessorKind> = Some(args.preprocessor.into());
    let mut env = if args.render {
        // only the first env gets a window, the rest run headless
        let builders = (0..args.batch_size)
            .map(|env_idx| {
                let builder = GymEnvBuilder::new(&args.env_name);
                let builder = if env_idx == 0 {
                    builder.with_render_mode("human")
                } else {
                    builder
                };
                Arc::new(builder)
            })
            .collect::<Vec<_>>();
        BatchedEnv::from_builder_type(&EnvBuilderType::EnvBuilderVec { builders }, preprocessor)?
    } else {
        make_batched(&args.env_name, args.batch_size, preprocessor)?
    };

    let observations = env.reset()?;
    info!(
        env_name = %args.env_name,
        shape = ?observations.dims(),
        "started rollouts"
    );
    let mut returns = vec![0f32; env.batchsize()];
    let mut episode = 0;
    for _ in 0..args.steps {
        let actions = sample_actions(&mut action_rng, env.action_space(), env.batchsize())?;
        let step = env.step(&actions, args.render)?;
        for (ret, reward) in returns.iter_mut().zip(step.rewards.to_vec1::<f32>()?) {
            *ret += reward;
        }
        if step.all_done() {
            let mean_return = returns.iter().sum::<f32>() / returns.len() as f32;
            info!(episode, mean_return, ?returns, "batch finished");
            env.reset()?;
            returns.fill(0.);
            episode += 1;
        }
    }
    info!(episodes = episode, "rollouts done");
    Ok(())
}
