use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use simgym::{
    core::{
        record::{BufferedRecorder, Record},
        util, Env as _, Policy,
    },
    veins::{BoxAct, BoxObs, VeinsEnv, VeinsEnvConfig},
};
use std::{convert::TryFrom, fs::File, path::PathBuf};

type Env = VeinsEnv<BoxObs, BoxAct>;

const ACTION: [f64; 4] = [0.15, 0.15, 0.40, 0.40];

/// Repeats one action until the episode ends and writes every step to a CSV file,
/// the summary of every episode to another.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory of the scenario
    #[arg(short, long, default_value = "scenario")]
    scenario_dir: PathBuf,

    /// Seconds to wait for the simulator, 0 to wait indefinitely
    #[arg(short, long, default_value_t = 5.0)]
    timeout: f64,

    /// Number of episodes
    #[arg(short, long, default_value_t = 1)]
    episodes: usize,

    /// Pass the simulator's output through
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Output file of the steps
    #[arg(short, long, default_value = "fixed_action_veins.csv")]
    output: PathBuf,

    /// Output file of the episode summaries
    #[arg(long, default_value = "fixed_action_veins_summary.csv")]
    summary: PathBuf,
}

struct FixedPolicy;

impl Policy<Env> for FixedPolicy {
    fn sample(&mut self, _: &BoxObs) -> BoxAct {
        BoxAct::new(ACTION.to_vec())
    }
}

#[derive(Debug, Serialize)]
struct VeinsRecord {
    episode: i64,
    step: i64,
    request_id: i64,
    request: String,
    reward: f64,
    done: bool,
}

impl TryFrom<&Record> for VeinsRecord {
    type Error = anyhow::Error;

    fn try_from(record: &Record) -> Result<Self> {
        Ok(Self {
            episode: record.get_integer("episode")?,
            step: record.get_integer("step")?,
            request_id: record.get_integer("request_id")?,
            request: record.get_string("request")?,
            reward: record.get_scalar("reward")?,
            done: record.get_bool("done")?,
        })
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = VeinsEnvConfig::<BoxAct>::default()
        .scenario_dir(&args.scenario_dir)
        .timeout(Some(args.timeout))
        .print_simulator_output(args.verbose)
        .action_arity(Some(ACTION.len()));
    let mut env = Env::build(&config, 0)?;
    let mut recorder = BufferedRecorder::new();

    let summaries = util::eval_with_recorder(&mut env, &mut FixedPolicy, args.episodes, &mut recorder)?;
    env.close();
    for (i, summary) in summaries.iter().enumerate() {
        log::info!("Episode {}: {} steps, reward {}", i, summary.steps, summary.total_reward);
    }

    let mut wtr = csv::Writer::from_writer(File::create(&args.output)?);
    for record in recorder.iter() {
        wtr.serialize(VeinsRecord::try_from(record)?)?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_writer(File::create(&args.summary)?);
    for summary in summaries.iter() {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;

    Ok(())
}
