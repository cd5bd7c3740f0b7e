//! Consecutive-failure monitor
//!
//! Owns one failure counter per host and drives the probe-and-evaluate cycle.
//! Per host, evaluated once per cycle in roster order:
//!
//! - probe succeeds: counter resets to 0
//! - probe fails, counter stays below threshold: host is degraded
//! - probe fails, counter reaches threshold: alert is dispatched and the
//!   counter resets to 0 whatever the dispatch outcome

use crate::courier::{Alert, Notifier};
use crate::roster::{Host, Roster};
use crate::sickbay::probe::{ProbeOutcome, Prober};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Health status of a host, derived from its failure counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    /// No outstanding failures
    Ok,
    /// Failing, but below the alert threshold
    Degraded(u32),
    /// Threshold reached, alert about to fire
    Alerting,
}

impl std::fmt::Display for HostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostStatus::Ok => write!(f, "ok"),
            HostStatus::Degraded(n) => write!(f, "degraded({})", n),
            HostStatus::Alerting => write!(f, "alerting"),
        }
    }
}

/// What happened to a host during one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Probe succeeded; carries the failure count that was cleared
    Reset { cleared: u32 },
    /// Probe failed below the threshold
    Degraded { failures: u32 },
    /// Threshold reached; carries whether the notifier accepted the alert
    Alerted { delivered: bool },
    /// Probe error ignored because probe errors are not counted
    Skipped,
}

/// Tallies for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Hosts probed
    pub probed: usize,
    /// Probes that did not succeed
    pub failed: usize,
    /// Hosts that answered after failing
    pub recovered: usize,
    /// Highest failure counter left below the threshold
    pub peak_failures: u32,
    /// Alerts fired
    pub alerts: usize,
    /// Alerts the notifier rejected
    pub undelivered: usize,
}

/// Monitor tuning
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Consecutive failures that trigger an alert (at least 1)
    pub threshold: u32,
    /// Pause between cycles
    pub interval: Duration,
    /// Whether probe errors increment the counter like timeouts do
    pub count_probe_errors: bool,
}

/// Per-host state
#[derive(Debug)]
struct HostState {
    host: Host,
    failures: u32,
}

/// Failure monitor over a fixed roster
pub struct Monitor<P, N> {
    hosts: Vec<HostState>,
    settings: MonitorSettings,
    prober: P,
    notifier: N,
}

impl<P: Prober, N: Notifier> Monitor<P, N> {
    /// Create a monitor with every counter at zero
    pub fn new(roster: Roster, settings: MonitorSettings, prober: P, notifier: N) -> Self {
        let hosts = roster
            .into_iter()
            .map(|host| HostState { host, failures: 0 })
            .collect();

        Self {
            hosts,
            settings: MonitorSettings {
                threshold: settings.threshold.max(1),
                ..settings
            },
            prober,
            notifier,
        }
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    fn status_for(&self, failures: u32) -> HostStatus {
        match failures {
            0 => HostStatus::Ok,
            n if n < self.settings.threshold => HostStatus::Degraded(n),
            _ => HostStatus::Alerting,
        }
    }

    /// Probe every host once, in roster order
    pub fn run_cycle(&mut self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        for idx in 0..self.hosts.len() {
            let outcome = self.prober.probe(&self.hosts[idx].host.address);
            summary.probed += 1;
            if !outcome.is_reachable() {
                summary.failed += 1;
            }

            let transition = self.apply(idx, outcome);
            let state = &self.hosts[idx];
            debug!(
                host = %state.host,
                status = %self.status_for(state.failures),
                ?transition,
                "Host evaluated"
            );
            match transition {
                Transition::Reset { cleared } if cleared > 0 => summary.recovered += 1,
                Transition::Degraded { failures } => {
                    summary.peak_failures = summary.peak_failures.max(failures);
                }
                Transition::Alerted { delivered } => {
                    summary.alerts += 1;
                    if !delivered {
                        summary.undelivered += 1;
                    }
                }
                Transition::Reset { .. } | Transition::Skipped => {}
            }
        }

        summary
    }

    /// Apply one probe outcome to a host's counter
    fn apply(&mut self, idx: usize, outcome: ProbeOutcome) -> Transition {
        let threshold = self.settings.threshold;

        let counts_as_failure = match &outcome {
            ProbeOutcome::Reachable => {
                let state = &mut self.hosts[idx];
                let cleared = state.failures;
                state.failures = 0;
                if cleared > 0 {
                    info!(host = %state.host, cleared, "Host recovered");
                }
                return Transition::Reset { cleared };
            }
            ProbeOutcome::Unreachable => true,
            ProbeOutcome::Failed(reason) => {
                warn!(host = %self.hosts[idx].host, reason = %reason, "Probe error");
                self.settings.count_probe_errors
            }
        };

        if !counts_as_failure {
            return Transition::Skipped;
        }

        let state = &mut self.hosts[idx];
        state.failures += 1;
        info!(
            "Failed to ping {}, failure count: {}",
            state.host, state.failures
        );

        if state.failures < threshold {
            return Transition::Degraded {
                failures: state.failures,
            };
        }

        let alert = Alert::new(&state.host.address, &state.host.label, threshold);
        state.failures = 0;

        Transition::Alerted {
            delivered: self.dispatch(&alert),
        }
    }

    /// Hand an alert to the notifier, logging but never propagating failure
    fn dispatch(&self, alert: &Alert) -> bool {
        warn!(
            address = %alert.address,
            label = %alert.label,
            threshold = alert.threshold,
            "ALERT {}",
            alert
        );

        match self.notifier.notify(alert) {
            Ok(()) => {
                info!(
                    "Email sent to {} for IP {} ({})",
                    self.notifier.destination(),
                    alert.address,
                    alert.label
                );
                true
            }
            Err(e) => {
                error!("Failed to send email: {}", e);
                error!(
                    "Undelivered alert: {} (recipients: {})",
                    alert,
                    self.notifier.destination()
                );
                false
            }
        }
    }

    /// Run cycles until the shutdown channel fires or disconnects
    ///
    /// The channel doubles as the end-of-cycle sleep: each cycle waits up to
    /// `interval` for a shutdown message before starting the next. Returns the
    /// number of completed cycles.
    pub fn run(&mut self, shutdown: &Receiver<()>) -> usize {
        info!(
            hosts = self.hosts.len(),
            threshold = self.settings.threshold,
            interval_secs = self.settings.interval.as_secs(),
            "Monitor started"
        );

        let mut cycles = 0;
        loop {
            let summary = self.run_cycle();
            cycles += 1;
            debug!(
                probed = summary.probed,
                failed = summary.failed,
                recovered = summary.recovered,
                peak_failures = summary.peak_failures,
                alerts = summary.alerts,
                undelivered = summary.undelivered,
                "Cycle complete"
            );

            match shutdown.recv_timeout(self.settings.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(cycles, "Monitor stopped");
        cycles
    }
}

#[cfg(test)]
impl<P: Prober, N: Notifier> Monitor<P, N> {
    /// Current failure counter for a host
    pub fn failures(&self, address: &str) -> Option<u32> {
        self.hosts
            .iter()
            .find(|s| s.host.address == address)
            .map(|s| s.failures)
    }

    /// Current status for a host
    pub fn status(&self, address: &str) -> Option<HostStatus> {
        self.failures(address).map(|n| self.status_for(n))
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }
}
