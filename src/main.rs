//! hostwatch - ICMP host monitor
//!
//! Pings a list of hosts every cycle and mails an alert when a host
//! fails a configured number of consecutive probes.

mod cli;
mod courier;
mod error;
mod logbook;
mod manifest;
mod roster;
mod sickbay;

use cli::{Cli, Commands};
use error::Result;
use roster::Roster;
use sickbay::{Monitor, MonitorSettings, PingProber, ProbeOutcome, Prober};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Completion { shell } => {
            Cli::generate_completion(shell);
            Ok(())
        }

        Commands::Check => {
            logbook::init_console(cli.verbose);
            let config = manifest::load(&cli.config)?;
            courier::SmtpCourier::from_config(&config.mail)?;
            let roster = Roster::load(&config.monitor.hosts_file)?;

            println!("Configuration OK: {}", cli.config.display());
            println!(
                "  interval {}s, threshold {}, probe timeout {}s",
                config.monitor.interval, config.monitor.threshold, config.monitor.probe_timeout
            );
            println!(
                "  alerts via {}:{} to {}",
                config.mail.relay,
                config.mail.port,
                config.mail.recipients.join(", ")
            );
            println!(
                "{} host(s) in {}:",
                roster.len(),
                config.monitor.hosts_file.display()
            );
            if !roster.skipped().is_empty() {
                let lines: Vec<String> = roster.skipped().iter().map(|n| n.to_string()).collect();
                println!("  skipped malformed line(s): {}", lines.join(", "));
            }
            if roster.is_empty() {
                println!("  (no hosts, the monitor will only sleep)");
            }
            for host in roster.iter() {
                println!("  {:<40} {}", host.address, host.label);
            }
            Ok(())
        }

        Commands::Probe { address } => {
            logbook::init_console(cli.verbose);
            let config = manifest::load(&cli.config)?;
            let prober = PingProber::new(
                &config.monitor.ping_command,
                config.monitor.probe_timeout_duration(),
            );

            match prober.probe(&address) {
                ProbeOutcome::Reachable => {
                    println!("{}: reachable", address);
                    Ok(())
                }
                ProbeOutcome::Unreachable => Err(error::Error::Unreachable { address }),
                ProbeOutcome::Failed(message) => Err(error::Error::Probe { address, message }),
            }
        }

        Commands::Run => {
            let config = manifest::load(&cli.config)?;
            logbook::init(&config.monitor.log_file, cli.verbose)?;

            let roster = Roster::load(&config.monitor.hosts_file)?;
            let courier = courier::SmtpCourier::from_config(&config.mail)?;
            let prober = PingProber::new(
                &config.monitor.ping_command,
                config.monitor.probe_timeout_duration(),
            );

            tracing::info!(
                config = %cli.config.display(),
                hosts_file = %config.monitor.hosts_file.display(),
                hosts = roster.len(),
                ping = %prober.program().display(),
                probe_timeout_ms = prober.timeout().as_millis() as u64,
                relay = %format!("{}:{}", config.mail.relay, config.mail.port),
                "Configuration loaded"
            );
            let settings = MonitorSettings {
                threshold: config.monitor.threshold,
                interval: config.monitor.interval_duration(),
                count_probe_errors: config.monitor.count_probe_errors,
            };
            let mut monitor = Monitor::new(roster, settings, prober, courier);
            if monitor.host_count() == 0 {
                tracing::warn!("Host list is empty, nothing will be probed");
            }

            let rt = tokio::runtime::Runtime::new().map_err(error::Error::Io)?;

            rt.block_on(async {
                let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded::<()>(1);

                let monitor_task = tokio::task::spawn_blocking(move || {
                    monitor.run(&shutdown_rx);
                });

                wait_for_shutdown().await?;
                tracing::info!("Shutdown requested, finishing current cycle");

                drop(shutdown_tx);
                monitor_task
                    .await
                    .map_err(|e| error::Error::Io(std::io::Error::other(e)))?;

                Ok::<(), error::Error>(())
            })
        }
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => {}
    }

    Ok(())
}
