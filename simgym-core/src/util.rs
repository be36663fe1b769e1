//! Utilities for interaction of agents and environments.
use crate::{
    error::EnvError,
    record::{RecordValue, Recorder},
    Env, Policy,
};
use chrono::Local;
use log::{debug, info};
use serde::Serialize;

/// Outcome of one episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    /// Number of steps taken, including the terminal one.
    pub steps: usize,

    /// Sum of the rewards of all steps.
    pub total_reward: f64,
}

/// Runs one episode: resets the environment, then steps with the policy until
/// the environment reports the terminal step.
///
/// The loop stops only when a step is done or an error occurs. Errors are
/// returned as they are, the environment is not reset afterwards.
pub fn run_episode<E, P>(env: &mut E, policy: &mut P) -> Result<EpisodeSummary, EnvError>
where
    E: Env,
    P: Policy<E>,
{
    let mut obs = env.reset()?;
    let mut summary = EpisodeSummary {
        steps: 0,
        total_reward: 0.0,
    };

    loop {
        let act = policy.sample(&obs);
        let (step, _) = env.step(&act)?;
        summary.steps += 1;
        summary.total_reward += step.reward;
        if step.is_done() {
            break;
        }
        obs = step.obs;
    }

    debug!(
        "Episode finished after {} steps, reward = {}",
        summary.steps, summary.total_reward
    );
    Ok(summary)
}

/// Runs episodes with a policy and writes a record of every step to `recorder`.
///
/// Each written record is the one returned by the environment, extended with
/// `episode`, `step`, `reward`, `done` and the wall-clock `datetime` of the step.
pub fn eval_with_recorder<E, P, R>(
    env: &mut E,
    policy: &mut P,
    n_episodes: usize,
    recorder: &mut R,
) -> Result<Vec<EpisodeSummary>, EnvError>
where
    E: Env,
    P: Policy<E>,
    R: Recorder,
{
    let mut summaries = Vec::with_capacity(n_episodes);

    for episode in 0..n_episodes {
        let mut obs = env.reset()?;
        let mut summary = EpisodeSummary {
            steps: 0,
            total_reward: 0.0,
        };

        loop {
            let act = policy.sample(&obs);
            let (step, mut record) = env.step(&act)?;
            summary.total_reward += step.reward;

            record.insert("episode", RecordValue::Integer(episode as _));
            record.insert("step", RecordValue::Integer(summary.steps as _));
            record.insert("reward", RecordValue::Scalar(step.reward));
            record.insert("done", RecordValue::Bool(step.is_done()));
            record.insert("datetime", RecordValue::DateTime(Local::now()));
            recorder.write(record);

            summary.steps += 1;
            if step.is_done() {
                break;
            }
            obs = step.obs;
        }

        info!(
            "Episode {}, {} steps, reward = {}",
            episode, summary.steps, summary.total_reward
        );
        summaries.push(summary);
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::{BufferedRecorder, NullRecorder, Record},
        Act, Obs, Step,
    };
    use test_log::test;

    #[derive(Clone, Debug)]
    struct Counter(f64);

    impl Obs for Counter {
        fn len(&self) -> usize {
            1
        }
    }

    impl Act for Counter {
        fn len(&self) -> usize {
            1
        }
    }

    /// Ends the episode after a fixed number of steps, rewarding the action value.
    struct CountdownEnv {
        horizon: usize,
        remaining: Option<usize>,
    }

    impl Env for CountdownEnv {
        type Config = usize;
        type Obs = Counter;
        type Act = Counter;
        type Info = ();

        fn build(config: &Self::Config, _seed: u64) -> Result<Self, EnvError> {
            Ok(Self {
                horizon: *config,
                remaining: None,
            })
        }

        fn reset(&mut self) -> Result<Counter, EnvError> {
            self.remaining = Some(self.horizon);
            Ok(Counter(self.horizon as _))
        }

        fn reset_with_index(&mut self, _ix: usize) -> Result<Counter, EnvError> {
            self.reset()
        }

        fn step(&mut self, a: &Counter) -> Result<(Step<Self>, Record), EnvError> {
            let remaining = match self.remaining {
                Some(n) if n > 0 => n - 1,
                _ => {
                    return Err(EnvError::InvalidState {
                        op: "step",
                        state: "done".to_string(),
                    })
                }
            };
            self.remaining = Some(remaining);
            let step = Step::new(Counter(remaining as _), a.clone(), a.0, remaining == 0, ());
            Ok((step, Record::empty()))
        }
    }

    struct ConstantPolicy(f64);

    impl Policy<CountdownEnv> for ConstantPolicy {
        fn sample(&mut self, _obs: &Counter) -> Counter {
            Counter(self.0)
        }
    }

    #[test]
    fn run_episode_stops_at_done() {
        let mut env = CountdownEnv::build(&3, 0).unwrap();
        let summary = run_episode(&mut env, &mut ConstantPolicy(0.5)).unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.total_reward, 1.5);

        // The loop honoured done, so the environment still rejects a further step.
        assert!(matches!(
            env.step(&Counter(0.0)),
            Err(EnvError::InvalidState { .. })
        ));
    }

    #[test]
    fn run_episode_propagates_errors() {
        let mut env = CountdownEnv::build(&0, 0).unwrap();
        let err = run_episode(&mut env, &mut ConstantPolicy(1.0)).unwrap_err();
        assert!(matches!(err, EnvError::InvalidState { op: "step", .. }));
    }

    #[test]
    fn eval_writes_a_record_per_step() {
        let mut env = CountdownEnv::build(&2, 0).unwrap();
        let mut recorder = BufferedRecorder::new();
        let summaries =
            eval_with_recorder(&mut env, &mut ConstantPolicy(1.0), 3, &mut recorder).unwrap();

        assert_eq!(summaries.len(), 3);
        assert_eq!(recorder.len(), 6);
        let last = recorder.iter().last().unwrap();
        assert_eq!(last.get_integer("episode").unwrap(), 2);
        assert_eq!(last.get_integer("step").unwrap(), 1);
        assert!(last.get_bool("done").unwrap());
        assert!(last.get_datetime("datetime").unwrap() <= Local::now());
    }

    #[test]
    fn eval_without_recording() {
        let mut env = CountdownEnv::build(&4, 0).unwrap();
        let summaries =
            eval_with_recorder(&mut env, &mut ConstantPolicy(0.25), 2, &mut NullRecorder {})
                .unwrap();
        assert_eq!(
            summaries,
            vec![
                EpisodeSummary {
                    steps: 4,
                    total_reward: 1.0
                };
                2
            ]
        );
    }
}
