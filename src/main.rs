use std::fs::File;

use anyhow::{Result, anyhow};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, error};
use syslog::{BasicLogger, Facility, Formatter3164};

use smartfand::{application::Application, cli::Cli, config::Config};

const DAEMON_LOG: &str = "/var/tmp/smartfand.log";

fn init_syslog(level: LevelFilter) -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "smartfand".into(),
        pid: std::process::id(),
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(level))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn init_stderr_log(level: LevelFilter) {
    env_logger::Builder::new().filter_level(level).init();
}

fn into_daemon() -> Result<()> {
    File::create(DAEMON_LOG)
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = cli.log_level.into();

    // Fork before the runtime starts; threads do not survive it.
    if cli.daemonize {
        into_daemon()?;
        init_syslog(level)?;
    } else {
        init_stderr_log(level);
    }

    run(cli).inspect_err(|e| error!("{e:#}"))
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.clone())?;
    cli.apply_to(&mut config);

    let mut app = Application::builder().with_config(config).build()?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(app.run())
}
