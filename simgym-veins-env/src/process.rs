//! Supervision of the simulator subprocess.
use crate::transport::deadline;
use log::{debug, info, warn};
use std::{
    io,
    process::{Child, Command, ExitStatus},
    thread,
    time::{Duration, Instant},
};

const EXIT_POLL: Duration = Duration::from_millis(10);

/// A running simulator.
///
/// The process is killed and reaped when this value is dropped, so a
/// simulator never outlives the session that started it.
#[derive(Debug)]
pub struct SimulatorProcess {
    child: Child,
    status: Option<ExitStatus>,
}

impl SimulatorProcess {
    /// Spawns the simulator.
    pub fn spawn(mut command: Command) -> io::Result<Self> {
        debug!("Spawning {:?}", command);
        let child = command.spawn()?;
        info!("Launched simulator with PID {}", child.id());
        Ok(Self {
            child,
            status: None,
        })
    }

    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Exit status, if the process has exited.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        if self.status.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.status = status,
                Err(e) => warn!("Cannot query simulator {}: {}", self.pid(), e),
            }
        }
        self.status
    }

    /// Returns `true` until the process has exited.
    pub fn is_running(&mut self) -> bool {
        self.exit_status().is_none()
    }

    /// Waits for the process to exit on its own.
    ///
    /// Returns `None` if it is still running after `timeout`.
    pub fn wait_timeout(&mut self, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
        let deadline = deadline(timeout);
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.status = Some(status);
                return Ok(Some(status));
            }
            match deadline {
                Some(d) if Instant::now() >= d => return Ok(None),
                _ => thread::sleep(EXIT_POLL),
            }
        }
    }

    /// Kills the process, if still running, and reaps it.
    pub fn kill(&mut self) {
        if !self.is_running() {
            return;
        }
        let pid = self.pid();
        if let Err(e) = self.child.kill() {
            warn!("Cannot kill simulator {}: {}", pid, e);
        }
        match self.child.wait() {
            Ok(status) => {
                debug!("Simulator {} terminated: {}", pid, status);
                self.status = Some(status);
            }
            Err(e) => warn!("Cannot reap simulator {}: {}", pid, e),
        }
    }
}

impl Drop for SimulatorProcess {
    fn drop(&mut self) {
        self.kill();
    }
}
