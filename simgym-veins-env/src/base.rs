//! Environment session driving one simulator at a time.
use crate::{
    act::VeinsAct,
    codec::{encode_ack, ActionCodec, DefaultActionCodec},
    config::VeinsEnvConfig,
    obs::VeinsObs,
    process::SimulatorProcess,
    proto::{request::Content, Request, StepRequest},
    space::{SpaceSpec, SpaceValue},
    transport::{deadline, TcpTransport, Transport},
};
use log::{debug, error, info, trace, warn};
use prost::Message;
use simgym_core::{
    record::{Record, RecordValue},
    Env, EnvError, Info, Step,
};
use std::{
    fmt,
    marker::PhantomData,
    sync::Arc,
    time::{Duration, Instant},
};

/// How long the startup wait blocks before checking on the simulator process.
const STARTUP_POLL: Duration = Duration::from_millis(100);

/// Lifecycle of a [`VeinsEnv`].
///
/// ```text
/// Uninitialized --reset--> Ready --step--> Stepping --step(done)--> Done
///                           ^                  |                     |
///                           +------reset-------+--------reset--------+
/// ```
///
/// `Failed` is entered on any fatal error and `Closed` on [`Env::close`]; both
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Built, no simulator started yet.
    Uninitialized,

    /// First observation received, no step taken yet.
    Ready,

    /// Mid-episode.
    Stepping,

    /// The episode ended; only `reset` is allowed.
    Done,

    /// A timeout or protocol violation occurred; the session must be rebuilt.
    Failed,

    /// Torn down by the caller.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Stepping => "stepping",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Information given at every step of the interaction with the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct VeinsInfo {
    /// Id of the simulator request answering the action.
    pub request_id: u64,
}

impl Info for VeinsInfo {}

/// A Veins simulation as an environment.
///
/// Building the environment starts nothing. Every [`Env::reset`] launches a
/// fresh simulator (unless `run_simulator` is off), answers its `init`
/// request and returns the observation of its first `step` request. Each
/// [`Env::step`] sends one encoded action and blocks until the next request
/// arrives. The episode ends when the simulator announces its shutdown.
///
/// The simulator process is killed when the environment fails, is closed, is
/// reset or is dropped.
pub struct VeinsEnv<O, A>
where
    O: VeinsObs,
    A: VeinsAct,
{
    config: VeinsEnvConfig<A>,
    codec: Arc<dyn ActionCodec<A>>,
    transport: Box<dyn Transport>,
    simulator: Option<SimulatorProcess>,
    state: SessionState,
    seed: u64,
    episode: usize,
    count_steps: usize,
    port: Option<u16>,
    observation_space: Option<SpaceSpec>,
    action_space: Option<SpaceSpec>,
    last_obs: Option<SpaceValue>,
    phantom: PhantomData<O>,
}

impl<O, A> VeinsEnv<O, A>
where
    O: VeinsObs,
    A: VeinsAct,
{
    /// Builds an environment encoding actions with `codec`.
    ///
    /// The codec of the configuration, if any, is ignored.
    pub fn with_codec(config: &VeinsEnvConfig<A>, seed: u64, codec: Arc<dyn ActionCodec<A>>) -> Self {
        Self {
            config: config.clone(),
            codec,
            transport: Box::new(TcpTransport::new()),
            simulator: None,
            state: SessionState::Uninitialized,
            seed,
            episode: 0,
            count_steps: 0,
            port: None,
            observation_space: None,
            action_space: None,
            last_obs: None,
            phantom: PhantomData,
        }
    }

    /// Replaces the transport. Only useful before the first reset.
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport.close();
        self.transport = transport;
        self
    }

    /// Current state of the session.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Port the current simulator connects to.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Number of episodes started so far.
    pub fn episode(&self) -> usize {
        self.episode
    }

    /// Number of steps taken in the current episode.
    pub fn count_steps(&self) -> usize {
        self.count_steps
    }

    /// Observation space announced by the simulator.
    pub fn observation_space(&self) -> Option<&SpaceSpec> {
        self.observation_space.as_ref()
    }

    /// Action space the codec checks actions against.
    pub fn action_space(&self) -> Option<&SpaceSpec> {
        self.action_space.as_ref()
    }

    /// PID of the simulator of the current episode.
    pub fn simulator_pid(&self) -> Option<u32> {
        self.simulator.as_ref().map(SimulatorProcess::pid)
    }

    /// Returns `true` while a simulator started by this session is alive.
    pub fn is_simulator_running(&mut self) -> bool {
        self.simulator
            .as_mut()
            .map_or(false, SimulatorProcess::is_running)
    }

    fn invalid(&self, op: &'static str) -> EnvError {
        EnvError::InvalidState {
            op,
            state: self.state.to_string(),
        }
    }

    /// Kills the simulator and drops the connection.
    fn teardown(&mut self) {
        if let Some(mut simulator) = self.simulator.take() {
            debug!("Stopping simulator {}", simulator.pid());
            simulator.kill();
        }
        self.transport.close();
        self.port = None;
    }

    /// Tears down and marks the session unusable.
    fn fail<T>(&mut self, err: EnvError) -> Result<T, EnvError> {
        match self.simulator.as_ref() {
            Some(simulator) => error!("Simulator {} failed: {}", simulator.pid(), err),
            None => error!("Simulator failed: {}", err),
        }
        self.teardown();
        self.state = SessionState::Failed;
        Err(err)
    }

    fn recv_request(&mut self, timeout: Option<Duration>) -> Result<Option<Request>, EnvError> {
        match self.transport.recv(timeout)? {
            Some(frame) => {
                let request = Request::decode(frame.as_slice())
                    .map_err(|e| EnvError::Protocol(format!("cannot decode request: {}", e)))?;
                trace!("Request {}: {:?}", request.id, request.content);
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    /// Decodes observation and reward, checking the observation layout.
    fn decode_step(&self, step: StepRequest) -> Result<(SpaceValue, f64), EnvError> {
        let obs = step
            .observation
            .ok_or_else(|| EnvError::Protocol("step request without observation".to_string()))
            .and_then(SpaceValue::try_from)?;
        let reward = step
            .reward
            .ok_or_else(|| EnvError::Protocol("step request without reward".to_string()))
            .and_then(SpaceValue::try_from)?;

        let reward = match reward.as_scalar() {
            Some(r) if r.is_finite() => r,
            Some(r) => return Err(EnvError::Protocol(format!("reward {} is not finite", r))),
            None => {
                return Err(EnvError::Protocol(format!(
                    "reward must be a single value, got {} of length {}",
                    reward.kind(),
                    reward.len()
                )))
            }
        };

        if let Some(space) = self.observation_space.as_ref() {
            space
                .check(&obs)
                .map_err(|e| EnvError::Protocol(format!("observation outside its space: {}", e)))?;
        }
        if let Some(prev) = self.last_obs.as_ref() {
            if !prev.same_shape(&obs) {
                return Err(EnvError::Protocol(format!(
                    "observation changed its layout from {:?} to {:?}",
                    prev, obs
                )));
            }
        }
        Ok((obs, reward))
    }

    /// Starts a simulator and waits for its first observation.
    fn start_episode(&mut self, seed: u64) -> Result<O, EnvError> {
        match self.state {
            SessionState::Failed | SessionState::Closed => return Err(self.invalid("reset")),
            SessionState::Stepping => info!("Discarding the running episode"),
            _ => {}
        }
        self.teardown();
        self.episode += 1;
        self.count_steps = 0;
        self.last_obs = None;
        self.observation_space = None;
        self.action_space = self.config.action_arity.map(SpaceSpec::boxed);

        let timeout = self.config.timeout_duration();
        let deadline = deadline(timeout);
        let port = match self.transport.listen(&self.config.host, self.config.port) {
            Ok(port) => port,
            Err(e) => return self.fail(e.into()),
        };
        self.port = Some(port);

        if self.config.run_simulator {
            let spawned = match self.config.command(seed, port) {
                Some(command) => SimulatorProcess::spawn(command),
                None => Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "empty simulator command",
                )),
            };
            match spawned {
                Ok(simulator) => {
                    info!(
                        "Launched simulator for episode {} (seed {}), waiting for request on port {}",
                        self.episode, seed, port
                    );
                    self.simulator = Some(simulator);
                }
                // Without a timeout nothing would ever end the wait.
                Err(e) if deadline.is_none() => return self.fail(e.into()),
                Err(e) => warn!(
                    "Cannot launch simulator in {:?}: {}",
                    self.config.scenario_dir, e
                ),
            }
        } else {
            info!("Listening on port {}, start the simulator now", port);
        }

        self.wait_for_connection(deadline, timeout)?;
        self.negotiate(deadline, timeout)
    }

    fn wait_for_connection(
        &mut self,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> Result<(), EnvError> {
        let mut exit_reported = false;
        loop {
            let slice = match deadline {
                Some(d) => {
                    let remaining = d.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        let timeout = timeout.unwrap_or_default();
                        return self.fail(EnvError::StartupTimeout { timeout });
                    }
                    remaining.min(STARTUP_POLL)
                }
                None => STARTUP_POLL,
            };
            match self.transport.accept(Some(slice)) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => return self.fail(e.into()),
            }

            let exited = self.simulator.as_mut().and_then(SimulatorProcess::exit_status);
            if let Some(status) = exited {
                if deadline.is_none() {
                    return self.fail(EnvError::Protocol(format!(
                        "simulator exited with {} before connecting",
                        status
                    )));
                }
                if !exit_reported {
                    warn!("Simulator exited with {} before connecting", status);
                    exit_reported = true;
                }
            }
        }
    }

    /// Answers `init` and returns the observation of the first `step`.
    fn negotiate(
        &mut self,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> Result<O, EnvError> {
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let request = match self.recv_request(remaining) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    let timeout = timeout.unwrap_or_default();
                    return self.fail(EnvError::StartupTimeout { timeout });
                }
                Err(e) => return self.fail(e),
            };

            match request.content {
                Some(Content::Init(init)) => {
                    info!(
                        "Simulator spaces: observation = {}, action = {}",
                        init.observation_space_code, init.action_space_code
                    );
                    self.observation_space = Some(SpaceSpec::parse(&init.observation_space_code));
                    match SpaceSpec::parse(&init.action_space_code) {
                        SpaceSpec::Opaque(_) if self.action_space.is_some() => {}
                        space => self.action_space = Some(space),
                    }
                    if let Err(e) = self.transport.send(&encode_ack()) {
                        return self.fail(e.into());
                    }
                }
                Some(Content::Step(step)) => {
                    let (obs, _) = match self.decode_step(step) {
                        Ok(decoded) => decoded,
                        Err(e) => return self.fail(e),
                    };
                    debug!("Received first observation (request {})", request.id);
                    let o = match O::from_space(obs.clone()) {
                        Ok(o) => o,
                        Err(e) => return self.fail(e),
                    };
                    self.last_obs = Some(obs);
                    self.state = SessionState::Ready;
                    return Ok(o);
                }
                Some(Content::Shutdown(_)) => {
                    return self.fail(EnvError::Protocol(
                        "simulator shut down before the first observation".to_string(),
                    ))
                }
                None => {
                    return self.fail(EnvError::Protocol("request without content".to_string()))
                }
            }
        }
    }

    /// Acknowledges the shutdown request and lets the simulator finish.
    fn finish_episode(&mut self) {
        if let Err(e) = self.transport.send(&encode_ack()) {
            warn!("Cannot acknowledge shutdown: {}", e);
        }
        if let Some(mut simulator) = self.simulator.take() {
            debug!("Episode ended, waiting for simulator {} to finish", simulator.pid());
            match simulator.wait_timeout(self.config.timeout_duration()) {
                Ok(Some(status)) => debug!("Simulator exited with {}", status),
                Ok(None) => warn!("Simulator {} did not exit, killing it", simulator.pid()),
                Err(e) => warn!("Cannot wait for simulator {}: {}", simulator.pid(), e),
            }
            simulator.kill();
        }
        self.transport.close();
        self.port = None;
        self.state = SessionState::Done;
    }
}

impl<O, A> Env for VeinsEnv<O, A>
where
    O: VeinsObs,
    A: VeinsAct,
{
    type Obs = O;
    type Act = A;
    type Info = VeinsInfo;
    type Config = VeinsEnvConfig<A>;

    /// Builds the environment. No simulator is started.
    ///
    /// * `seed` - Seed of the first episode; each further episode uses the next value.
    fn build(config: &Self::Config, seed: u64) -> Result<Self, EnvError> {
        let codec = match config.action_codec.clone() {
            Some(codec) => codec,
            None => Arc::new(DefaultActionCodec),
        };
        Ok(Self::with_codec(config, seed, codec))
    }

    fn reset(&mut self) -> Result<O, EnvError> {
        let seed = self.seed.wrapping_add(self.episode as u64);
        self.start_episode(seed)
    }

    /// Resets the environment with `ix` as the simulator's seed.
    fn reset_with_index(&mut self, ix: usize) -> Result<O, EnvError> {
        self.start_episode(ix as u64)
    }

    /// Sends the action and waits for the simulator's next request.
    ///
    /// A `step` request yields the next observation and reward. A `shutdown`
    /// request ends the episode: the returned step is terminal, repeats the
    /// last observation and carries no reward.
    fn step(&mut self, a: &A) -> Result<(Step<Self>, Record), EnvError> {
        match self.state {
            SessionState::Ready | SessionState::Stepping => {}
            _ => return Err(self.invalid("step")),
        }

        let bytes = match self.codec.encode(a, self.action_space.as_ref()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Aborting episode {}: {}", self.episode, e);
                self.teardown();
                self.state = SessionState::Done;
                return Err(e);
            }
        };

        self.state = SessionState::Stepping;
        if let Err(e) = self.transport.send(&bytes) {
            return self.fail(e.into());
        }

        let timeout = self.config.timeout_duration();
        let request = match self.recv_request(timeout) {
            Ok(Some(request)) => request,
            Ok(None) => {
                let timeout = timeout.unwrap_or_default();
                return self.fail(EnvError::StepTimeout { timeout });
            }
            Err(e) => return self.fail(e),
        };

        let (obs, reward, is_terminated) = match request.content {
            Some(Content::Step(step)) => match self.decode_step(step) {
                Ok((obs, reward)) => (obs, reward, false),
                Err(e) => return self.fail(e),
            },
            Some(Content::Shutdown(_)) => {
                info!(
                    "Episode {} ended after {} steps",
                    self.episode,
                    self.count_steps + 1
                );
                let obs = match self.last_obs.clone() {
                    Some(obs) => obs,
                    None => return self.fail(EnvError::Protocol("no observation".to_string())),
                };
                self.finish_episode();
                (obs, 0.0, true)
            }
            Some(Content::Init(_)) => {
                return self.fail(EnvError::Protocol(
                    "unexpected init request during an episode".to_string(),
                ))
            }
            None => return self.fail(EnvError::Protocol("request without content".to_string())),
        };

        self.count_steps += 1;
        let mut record = Record::from_slice(&[
            ("request_id", RecordValue::Integer(request.id as _)),
            ("obs", RecordValue::Array1(obs.flatten())),
            ("act", RecordValue::Array1(a.to_space().flatten())),
        ]);
        let kind = if is_terminated { "shutdown" } else { "step" };
        record.insert("request", RecordValue::String(kind.to_string()));
        let o = match O::from_space(obs.clone()) {
            Ok(o) => o,
            Err(e) => return self.fail(e),
        };
        self.last_obs = Some(obs);

        let info = VeinsInfo {
            request_id: request.id,
        };
        Ok((Step::new(o, a.clone(), reward, is_terminated, info), record))
    }

    fn close(&mut self) {
        if self.state != SessionState::Closed {
            info!("Closing environment");
        }
        self.teardown();
        self.state = SessionState::Closed;
    }
}

impl<O, A> Drop for VeinsEnv<O, A>
where
    O: VeinsObs,
    A: VeinsAct,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
