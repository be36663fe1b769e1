use anyhow::Result;
use clap::Parser;
use simgym::{
    core::{util, Env as _, Policy},
    veins::{BoxAct, SpaceObs, VeinsEnv, VeinsEnvConfig},
};
use std::path::PathBuf;

type Env = VeinsEnv<SpaceObs, BoxAct>;

/// Drives a Veins scenario with uniformly random box actions.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML file with the environment configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of the scenario, ignored with --config
    #[arg(short, long, default_value = "scenario")]
    scenario_dir: PathBuf,

    /// Number of values of an action
    #[arg(short, long, default_value_t = 4)]
    arity: usize,

    /// Number of episodes
    #[arg(short, long, default_value_t = 1)]
    episodes: usize,

    /// Seed of the first episode
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct RandomPolicy {
    arity: usize,
}

impl Policy<Env> for RandomPolicy {
    fn sample(&mut self, _: &SpaceObs) -> BoxAct {
        BoxAct::new((0..self.arity).map(|_| fastrand::f64()).collect())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    fastrand::seed(args.seed);

    let config: VeinsEnvConfig<BoxAct> = match args.config.as_ref() {
        Some(path) => VeinsEnvConfig::load(path)?,
        None => VeinsEnvConfig::default().scenario_dir(&args.scenario_dir),
    }
    .action_arity(Some(args.arity));
    let mut env = Env::build(&config, args.seed)?;
    let mut policy = RandomPolicy { arity: args.arity };

    for _ in 0..args.episodes {
        let summary = util::run_episode(&mut env, &mut policy)?;
        log::info!(
            "Episode {} done: {} steps, reward = {}",
            env.episode(),
            summary.steps,
            summary.total_reward
        );
    }
    env.close();

    Ok(())
}
