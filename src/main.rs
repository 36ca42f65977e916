//! Binary entry point for the `volhook` container hook.

use std::io::{self, Write};
use std::process;

use clap::{CommandFactory, Parser};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use volhook::config::{CliOverrides, ConfigError, HookConfig, HookSettings, local_host_name};
use volhook::linode::{ApiError, LinodeClient};
use volhook::logging::{self, FileSink, LogFormat};
use volhook::{HookDispatcher, HookError, HookSummary};

mod cli;

use cli::Cli;

/// Exit status for a failed `pre` run.
const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client error: {0}")]
    Client(#[from] ApiError),
    #[error("hook failed: {0}")]
    Hook(#[from] HookError<ApiError>),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let exit_code = run(cli).await;
    process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    let log_format = match cli.log_format.parse::<LogFormat>() {
        Ok(format) => format,
        Err(err) => {
            report_usage(&CliError::Config(ConfigError::InvalidValue {
                field: String::from("log_format"),
                message: err.to_string(),
            }));
            return 0;
        }
    };
    let file_sink = cli
        .log_dir
        .clone()
        .map(|dir| FileSink::new(dir).max_files(cli.log_max_files));
    if let Err(err) = logging::init(log_format, file_sink.as_ref()) {
        writeln!(io::stderr(), "{err}; logging to stderr only").ok();
        if file_sink.is_some() {
            logging::init(log_format, None).ok();
        }
    }

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(err) => {
            report_usage(&err);
            return 0;
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    match execute(&config, &cancel).await {
        Ok(summary) => {
            info!(
                mode = %summary.mode,
                attached = summary.attached.len(),
                "hook finished"
            );
            0
        }
        Err(err) => {
            error!(error = %err, "hook failed");
            report_error(&err);
            EXIT_FAILURE
        }
    }
}

fn load_config(cli: Cli) -> Result<HookConfig, CliError> {
    let settings = HookSettings::load_without_cli_args()?;
    let overrides = CliOverrides {
        token: cli.token,
        name: cli.name,
        host: cli.host,
        hook: cli.hook,
        volumes: cli.volumes,
        api_url: cli.api_url,
        poll_interval_secs: cli.poll_interval_secs,
        max_poll_attempts: cli.max_poll_attempts,
        on_poll_exhausted: cli.on_poll_exhausted,
        config_id: cli.config_id,
    };
    Ok(HookConfig::resolve(settings, overrides, local_host_name)?)
}

async fn execute(config: &HookConfig, cancel: &CancellationToken) -> Result<HookSummary, CliError> {
    let client = LinodeClient::new(&config.api_url, &config.token)?;
    let dispatcher = HookDispatcher::from_config(client, config);
    Ok(dispatcher.run(config, cancel).await?)
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    shutdown_signal().await;
    warn!("shutdown requested; cancelling");
    cancel.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "unable to listen for SIGTERM");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}

fn report_usage(err: &CliError) {
    write_usage(io::stderr(), err);
}

fn write_usage(mut target: impl Write, err: &CliError) {
    let banner = "#".repeat(50);
    writeln!(target, "{banner}\n{err}\n{banner}").ok();
    writeln!(target, "{}", Cli::command().render_usage()).ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn render(write: fn(&mut Vec<u8>, &CliError), err: &CliError) -> String {
        let mut buf = Vec::new();
        write(&mut buf, err);
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn write_usage_includes_error_and_usage_line() {
        let err = CliError::Config(ConfigError::InvalidHookMode(String::from("start")));
        let rendered = render(|buf, err| write_usage(buf, err), &err);
        assert!(rendered.contains("pre or post"), "rendered: {rendered}");
        assert!(rendered.contains("Usage: volhook"), "rendered: {rendered}");
    }

    #[test]
    fn write_error_writes_cli_error() {
        let err = CliError::Client(ApiError::Transport {
            operation: String::from("build client"),
            message: String::from("no tls"),
        });
        let rendered = render(|buf, err| write_error(buf, err), &err);
        assert!(
            rendered.contains("build client request failed: no tls"),
            "rendered: {rendered}"
        );
    }

    #[test]
    fn cli_collects_repeated_volumes() {
        let cli = Cli::try_parse_from([
            "volhook", "--token", "t", "--hook", "pre", "--volume", "vol1", "--volume", "vol2",
        ])
        .expect("valid arguments");
        assert_eq!(cli.volumes, vec![String::from("vol1"), String::from("vol2")]);
        assert_eq!(cli.log_format, "text");
        assert_eq!(cli.log_dir, None);
        assert_eq!(cli.log_max_files, 7);
    }

    #[test]
    fn cli_accepts_log_directory_and_retention() {
        let cli = Cli::try_parse_from([
            "volhook",
            "--log-dir",
            "/var/log/volhook",
            "--log-max-files",
            "3",
        ])
        .expect("valid arguments");
        assert_eq!(cli.log_dir, Some(PathBuf::from("/var/log/volhook")));
        assert_eq!(cli.log_max_files, 3);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
