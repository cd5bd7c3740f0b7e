//! Reachability probes
//!
//! A probe sends a single echo request and reports whether the host answered.
//! It never retries; consecutive-failure logic lives in the monitor.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Extra time granted to the ping process beyond its own reply deadline
const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Poll interval while waiting for the ping process
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Host answered the echo request
    Reachable,
    /// No answer within the timeout
    Unreachable,
    /// The probe itself could not be carried out (missing binary,
    /// no permission for raw sockets, unresolvable address)
    Failed(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Reachable => write!(f, "reachable"),
            ProbeOutcome::Unreachable => write!(f, "unreachable"),
            ProbeOutcome::Failed(reason) => write!(f, "probe error: {}", reason),
        }
    }
}

/// Something that can tell whether a host responds
pub trait Prober {
    /// Probe a host once, returning within a bounded time
    fn probe(&self, address: &str) -> ProbeOutcome;
}

/// Reply deadline passed to ping's `-W`
///
/// Linux iputils reads it in whole seconds.
#[cfg(target_os = "linux")]
fn wait_arg(timeout: Duration) -> String {
    timeout.as_secs().max(1).to_string()
}

/// Reply deadline passed to ping's `-W`
///
/// FreeBSD, the other BSDs and macOS read it in milliseconds.
#[cfg(not(target_os = "linux"))]
fn wait_arg(timeout: Duration) -> String {
    timeout.as_millis().max(1).to_string()
}

/// Prober backed by the system `ping` binary
///
/// Runs `ping -c 1 -W <wait> <address>`, with `<wait>` in the unit the host
/// platform's ping expects (see [`wait_arg`]). Exit status 0 means a reply
/// arrived and 1 means no reply. Any other status, or failing to spawn the
/// process, is a probe error. The process is killed if it outlives the
/// timeout.
#[derive(Debug, Clone)]
pub struct PingProber {
    program: PathBuf,
    timeout: Duration,
}

impl PingProber {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn run(&self, address: &str) -> ProbeOutcome {
        let wait = wait_arg(self.timeout);

        let mut child = match Command::new(&self.program)
            .args(["-c", "1", "-W", wait.as_str(), address])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return ProbeOutcome::Failed(format!(
                    "failed to run '{}': {}",
                    self.program.display(),
                    e
                ));
            }
        };

        let deadline = self.timeout + PROBE_GRACE;
        let start = Instant::now();

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return match status.code() {
                        Some(0) => ProbeOutcome::Reachable,
                        Some(1) => ProbeOutcome::Unreachable,
                        Some(code) => {
                            let stderr = child
                                .stderr
                                .take()
                                .map(|mut s| {
                                    let mut buf = String::new();
                                    s.read_to_string(&mut buf).ok();
                                    buf
                                })
                                .unwrap_or_default();
                            let detail = stderr.lines().next().unwrap_or("").trim();
                            if detail.is_empty() {
                                ProbeOutcome::Failed(format!("ping exited with status {}", code))
                            } else {
                                ProbeOutcome::Failed(format!(
                                    "ping exited with status {}: {}",
                                    code, detail
                                ))
                            }
                        }
                        None => ProbeOutcome::Failed("ping terminated by signal".to_string()),
                    };
                }
                Ok(None) => {
                    if start.elapsed() > deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return ProbeOutcome::Unreachable;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return ProbeOutcome::Failed(format!("failed to wait for ping: {}", e));
                }
            }
        }
    }
}

impl Prober for PingProber {
    fn probe(&self, address: &str) -> ProbeOutcome {
        self.run(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_outcome_display() {
        assert_eq!(ProbeOutcome::Reachable.to_string(), "reachable");
        assert_eq!(ProbeOutcome::Unreachable.to_string(), "unreachable");
        assert_eq!(
            ProbeOutcome::Failed("no permission".into()).to_string(),
            "probe error: no permission"
        );
    }

    #[test]
    fn test_zero_exit_is_reachable() {
        let prober = PingProber::new("true", Duration::from_secs(1));
        assert_eq!(prober.probe("10.0.0.1"), ProbeOutcome::Reachable);
    }

    #[test]
    fn test_exit_one_is_unreachable() {
        let prober = PingProber::new("false", Duration::from_secs(1));
        assert_eq!(prober.probe("10.0.0.1"), ProbeOutcome::Unreachable);
    }

    #[test]
    fn test_missing_binary_is_probe_error() {
        let prober = PingProber::new("/nonexistent/ping", Duration::from_secs(1));
        assert!(matches!(prober.probe("10.0.0.1"), ProbeOutcome::Failed(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_wait_arg_in_seconds() {
        assert_eq!(wait_arg(Duration::from_secs(2)), "2");
        assert_eq!(wait_arg(Duration::from_millis(300)), "1");
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_wait_arg_in_milliseconds() {
        assert_eq!(wait_arg(Duration::from_secs(2)), "2000");
        assert_eq!(wait_arg(Duration::from_millis(300)), "300");
    }

    #[test]
    fn test_ping_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args");

        let recorder = dir.path().join("recording-ping");
        fs::write(&recorder, format!("#!/bin/sh\necho \"$@\" > '{}'\n", out.display())).unwrap();
        fs::set_permissions(&recorder, fs::Permissions::from_mode(0o755)).unwrap();

        let timeout = Duration::from_secs(2);
        let prober = PingProber::new(&recorder, timeout);
        assert_eq!(prober.probe("10.0.0.7"), ProbeOutcome::Reachable);

        let args = fs::read_to_string(&out).unwrap();
        assert_eq!(args.trim(), format!("-c 1 -W {} 10.0.0.7", wait_arg(timeout)));
    }

    #[test]
    fn test_scripted_ping() {
        let dir = tempfile::tempdir().unwrap();

        let broken = dir.path().join("broken-ping");
        fs::write(&broken, "#!/bin/sh\necho 'ping: socket: Operation not permitted' >&2\nexit 2\n").unwrap();
        fs::set_permissions(&broken, fs::Permissions::from_mode(0o755)).unwrap();

        let prober = PingProber::new(&broken, Duration::from_secs(1));
        match prober.probe("10.0.0.1") {
            ProbeOutcome::Failed(reason) => {
                assert!(reason.contains("status 2"));
                assert!(reason.contains("Operation not permitted"));
            }
            other => panic!("expected probe error, got {:?}", other),
        }

        let hung = dir.path().join("hung-ping");
        fs::write(&hung, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&hung, fs::Permissions::from_mode(0o755)).unwrap();

        let prober = PingProber::new(&hung, Duration::from_secs(1));
        let start = Instant::now();
        assert_eq!(prober.probe("10.0.0.1"), ProbeOutcome::Unreachable);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
