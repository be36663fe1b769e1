//! Configuration of [`VeinsEnv`](crate::VeinsEnv).
use crate::codec::ActionCodec;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
    time::Duration,
};

/// OMNeT++ user interface the simulator runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserInterface {
    /// Headless command line runs.
    #[default]
    Cmdenv,

    /// Interactive GUI runs. Usually combined with `timeout: ~`.
    Qtenv,
}

impl UserInterface {
    /// Name passed to the simulator's `-u` option.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserInterface::Cmdenv => "Cmdenv",
            UserInterface::Qtenv => "Qtenv",
        }
    }
}

fn default_timeout() -> Option<f64> {
    Some(3.0)
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_simulator_command() -> Vec<String> {
    vec!["./run".to_string()]
}

fn default_config_name() -> String {
    "General".to_string()
}

/// Configuration of [`VeinsEnv`](crate::VeinsEnv).
///
/// Can be loaded from YAML; only `scenario_dir` is required there. The action
/// codec cannot be serialized and is set with [`VeinsEnvConfig::action_codec`].
///
/// ```yaml
/// scenario_dir: ../scenario
/// timeout: 5.0
/// print_simulator_output: true
/// ```
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct VeinsEnvConfig<A> {
    pub(crate) scenario_dir: PathBuf,

    /// Seconds to wait for the simulator. `None`, zero, negative or
    /// non-finite values mean waiting indefinitely.
    #[serde(default = "default_timeout")]
    pub(crate) timeout: Option<f64>,

    #[serde(default)]
    pub(crate) print_simulator_output: bool,

    #[serde(default)]
    pub(crate) user_interface: UserInterface,

    /// If `false`, the session only listens and the simulator is started by hand.
    #[serde(default = "default_true")]
    pub(crate) run_simulator: bool,

    #[serde(default = "default_host")]
    pub(crate) host: String,

    #[serde(default)]
    pub(crate) port: Option<u16>,

    #[serde(default = "default_simulator_command")]
    pub(crate) simulator_command: Vec<String>,

    #[serde(default = "default_config_name")]
    pub(crate) config_name: String,

    #[serde(default)]
    pub(crate) extra_args: Vec<String>,

    /// Arity of box actions, used when the simulator's action space code is not understood.
    #[serde(default)]
    pub(crate) action_arity: Option<usize>,

    #[serde(skip)]
    pub(crate) action_codec: Option<Arc<dyn ActionCodec<A>>>,
}

impl<A> Default for VeinsEnvConfig<A> {
    fn default() -> Self {
        Self {
            scenario_dir: PathBuf::from("."),
            timeout: default_timeout(),
            print_simulator_output: false,
            user_interface: UserInterface::default(),
            run_simulator: true,
            host: default_host(),
            port: None,
            simulator_command: default_simulator_command(),
            config_name: default_config_name(),
            extra_args: Vec::new(),
            action_arity: None,
            action_codec: None,
        }
    }
}

impl<A> Clone for VeinsEnvConfig<A> {
    fn clone(&self) -> Self {
        Self {
            scenario_dir: self.scenario_dir.clone(),
            timeout: self.timeout,
            print_simulator_output: self.print_simulator_output,
            user_interface: self.user_interface,
            run_simulator: self.run_simulator,
            host: self.host.clone(),
            port: self.port,
            simulator_command: self.simulator_command.clone(),
            config_name: self.config_name.clone(),
            extra_args: self.extra_args.clone(),
            action_arity: self.action_arity,
            action_codec: self.action_codec.clone(),
        }
    }
}

impl<A> fmt::Debug for VeinsEnvConfig<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VeinsEnvConfig")
            .field("scenario_dir", &self.scenario_dir)
            .field("timeout", &self.timeout)
            .field("print_simulator_output", &self.print_simulator_output)
            .field("user_interface", &self.user_interface)
            .field("run_simulator", &self.run_simulator)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("simulator_command", &self.simulator_command)
            .field("config_name", &self.config_name)
            .field("extra_args", &self.extra_args)
            .field("action_arity", &self.action_arity)
            .field(
                "action_codec",
                &self.action_codec.as_ref().map_or("default", |_| "custom"),
            )
            .finish()
    }
}

impl<A> VeinsEnvConfig<A> {
    /// Constructs [`VeinsEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`VeinsEnvConfig`] as YAML, without the action codec.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the directory of the simulation scenario.
    pub fn scenario_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scenario_dir = dir.into();
        self
    }

    /// Sets the timeout in seconds. `None` waits indefinitely.
    pub fn timeout(mut self, secs: Option<f64>) -> Self {
        self.timeout = secs;
        self
    }

    /// Passes the simulator's stdout and stderr through.
    pub fn print_simulator_output(mut self, v: bool) -> Self {
        self.print_simulator_output = v;
        self
    }

    /// Sets the user interface of the simulator.
    pub fn user_interface(mut self, ui: UserInterface) -> Self {
        self.user_interface = ui;
        self
    }

    /// Whether the session starts the simulator itself.
    pub fn run_simulator(mut self, v: bool) -> Self {
        self.run_simulator = v;
        self
    }

    /// Sets the address to listen on.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets a fixed port. `None` picks a free one per episode.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Sets the program and leading arguments that start the simulator.
    pub fn simulator_command<S: Into<String>>(mut self, command: impl IntoIterator<Item = S>) -> Self {
        self.simulator_command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the name of the simulation configuration (`-c`).
    pub fn config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    /// Appends arguments to the simulator command line.
    pub fn extra_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the arity of box actions.
    pub fn action_arity(mut self, arity: Option<usize>) -> Self {
        self.action_arity = arity;
        self
    }

    /// Replaces the default action codec.
    pub fn action_codec(mut self, codec: Arc<dyn ActionCodec<A>>) -> Self {
        self.action_codec = Some(codec);
        self
    }

    /// The timeout as a duration, `None` if waiting indefinitely.
    ///
    /// Timeouts too large for a [`Duration`] wait indefinitely as well.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Builds the command that starts the simulator for one episode.
    pub(crate) fn command(&self, seed: u64, port: u16) -> Option<Command> {
        let (program, leading) = self.simulator_command.split_first()?;

        // Relative programs such as `./run` live in the scenario directory.
        let program = Path::new(program);
        let program = if program.is_relative() && program.components().count() > 1 {
            self.scenario_dir.join(program)
        } else {
            program.to_path_buf()
        };

        let mut command = Command::new(program);
        command
            .args(leading)
            .arg(format!("-u{}", self.user_interface.as_str()))
            .arg(format!("-c{}", self.config_name))
            .arg(format!("--seed-set={}", seed))
            .arg(format!("--*.manager.seed={}", seed))
            .arg(format!("--*.gym_connection.port={}", port))
            .args(&self.extra_args)
            .current_dir(&self.scenario_dir)
            .env("VEINS_GYM_HOST", &self.host)
            .env("VEINS_GYM_PORT", port.to_string())
            .stdin(Stdio::null());
        if self.print_simulator_output {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxAct;
    use tempdir::TempDir;

    type Config = VeinsEnvConfig<BoxAct>;

    #[test]
    fn yaml_round_trip() -> Result<()> {
        let dir = TempDir::new("veins_config")?;
        let path = dir.path().join("env.yaml");
        let config = Config::default()
            .scenario_dir("../scenario")
            .timeout(Some(5.0))
            .print_simulator_output(true)
            .extra_args(["--sim-time-limit=60s"]);
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded.scenario_dir, PathBuf::from("../scenario"));
        assert_eq!(loaded.timeout, Some(5.0));
        assert!(loaded.print_simulator_output);
        assert_eq!(loaded.extra_args, vec!["--sim-time-limit=60s".to_string()]);
        assert!(loaded.action_codec.is_none());
        Ok(())
    }

    #[test]
    fn yaml_defaults_and_no_timeout() -> Result<()> {
        let config: Config = serde_yaml::from_str("scenario_dir: scenario\n")?;
        assert_eq!(config.timeout_duration(), Some(Duration::from_secs(3)));
        assert!(config.run_simulator);
        assert_eq!(config.user_interface, UserInterface::Cmdenv);

        let config: Config =
            serde_yaml::from_str("scenario_dir: scenario\ntimeout: ~\nuser_interface: Qtenv\n")?;
        assert_eq!(config.timeout_duration(), None);
        assert_eq!(config.user_interface, UserInterface::Qtenv);
        Ok(())
    }

    #[test]
    fn non_positive_timeout_waits_indefinitely() {
        assert_eq!(Config::default().timeout(Some(0.0)).timeout_duration(), None);
        assert_eq!(Config::default().timeout(Some(-1.0)).timeout_duration(), None);
        assert_eq!(
            Config::default().timeout(Some(0.5)).timeout_duration(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn oversized_timeout_waits_indefinitely() {
        assert_eq!(Config::default().timeout(Some(1e300)).timeout_duration(), None);
        assert_eq!(Config::default().timeout(Some(f64::INFINITY)).timeout_duration(), None);
        assert_eq!(Config::default().timeout(Some(f64::NAN)).timeout_duration(), None);
    }

    #[test]
    fn command_line_of_an_episode() {
        let config = Config::default()
            .scenario_dir("/tmp/scenario")
            .extra_args(["-r", "0"]);
        let command = config.command(7, 5555).unwrap();

        assert_eq!(command.get_program(), "/tmp/scenario/./run");
        let args: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-uCmdenv",
                "-cGeneral",
                "--seed-set=7",
                "--*.manager.seed=7",
                "--*.gym_connection.port=5555",
                "-r",
                "0",
            ]
        );
        assert_eq!(command.get_current_dir(), Some(Path::new("/tmp/scenario")));
    }

    #[test]
    fn empty_command_builds_nothing() {
        let config = Config::default().simulator_command(Vec::<String>::new());
        assert!(config.command(0, 1).is_none());
    }
}
