use anyhow::Result;
use chrono::prelude::*;
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use tracing::{debug, info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pw_expiry::{
    build_report, check_login, open_database, write_report, PwExpiryConfig, ReportFormat,
    ReportOptions,
};

#[derive(Parser, Debug)]
#[clap(
    name = "pw-expiry",
    about = "Report shadow password expiration and whether a login warning is useful now",
    version
)]
struct Opt {
    #[clap(short = 'c', long = "config")]
    config: Option<String>,

    #[clap(long = "log-level")]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Report(ReportOpt),
    Check(CheckOpt),
}

#[derive(Args, Debug, Default)]
#[clap(about = "List accounts with an account expiry set")]
struct ReportOpt {
    #[clap(short = 'f', long = "format", help = "text|json")]
    format: Option<ReportFormat>,

    /// include accounts without an account expiry
    #[clap(short = 'a', long = "all", action)]
    all: bool,

    /// only accounts for which a warning is useful now
    #[clap(long = "only-notify", action)]
    only_notify: bool,

    /// evaluate at this RFC 3339 time instead of the system clock
    #[clap(long = "now")]
    now: Option<DateTime<Local>>,

    /// read records from a shadow-format file instead of the system database
    #[clap(short = 's', long = "shadow-file")]
    shadow_file: Option<String>,

    /// fail when the account database cannot be read
    #[clap(long = "strict", action)]
    strict: bool,
}

#[derive(Args, Debug)]
#[clap(about = "Evaluate a single login")]
struct CheckOpt {
    login: String,

    #[clap(short = 'f', long = "format", help = "text|json")]
    format: Option<ReportFormat>,

    #[clap(long = "now")]
    now: Option<DateTime<Local>>,

    #[clap(short = 's', long = "shadow-file")]
    shadow_file: Option<String>,
}

fn set_up_logging(log_level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(move |_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()?;
    Ok(())
}

#[instrument(name = "report", skip(cfg))]
async fn do_report(r: ReportOpt, cfg: PwExpiryConfig) -> Result<()> {
    let opts = ReportOptions {
        include_all: r.all || cfg.report.all,
        only_notify: r.only_notify || cfg.report.only_notify,
        strict: r.strict || cfg.core.strict,
        now: r.now.unwrap_or_else(Local::now),
    };
    let format = r.format.unwrap_or(cfg.report.format);
    let db = open_database(r.shadow_file.as_deref(), &cfg.core.shadow_path);

    // getspnam(3) blocks on NSS and shares static storage
    let entries =
        tokio::task::spawn_blocking(move || build_report(db.as_ref(), &opts)).await??;
    info!("{} account(s) reported", entries.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &entries, format, atty::is(atty::Stream::Stdout))?;
    out.flush()?;
    Ok(())
}

#[instrument(name = "check", skip(cfg))]
async fn do_check(c: CheckOpt, cfg: PwExpiryConfig) -> Result<()> {
    let now = c.now.unwrap_or_else(Local::now);
    let format = c.format.unwrap_or(cfg.report.format);
    let db = open_database(c.shadow_file.as_deref(), &cfg.core.shadow_path);
    let login = c.login.clone();

    let entry =
        tokio::task::spawn_blocking(move || check_login(db.as_ref(), &login, now)).await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match entry {
        Some(entry) => {
            write_report(&mut out, &[entry], format, atty::is(atty::Stream::Stdout))?;
        }
        None => {
            info!("{} has no shadow entry", c.login);
            writeln!(out, "{}: no shadow entry", c.login)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    let cfg = PwExpiryConfig::load(opt.config.as_deref()).await?;
    let log_level = opt.log_level.unwrap_or_else(|| cfg.core.log_level.clone());
    set_up_logging(&log_level)?;
    debug!("config as {:?}", cfg);

    match opt
        .command
        .unwrap_or_else(|| Command::Report(ReportOpt::default()))
    {
        Command::Report(r) => do_report(r, cfg).await,
        Command::Check(c) => do_check(c, cfg).await,
    }
}

#[test]
fn cli_parses() {
    let opt = Opt::parse_from(["pw-expiry", "report", "--format", "json", "--all"]);
    match opt.command {
        Some(Command::Report(r)) => {
            assert_eq!(r.format, Some(ReportFormat::Json));
            assert!(r.all);
            assert!(!r.strict);
        }
        other => panic!("unexpected {:?}", other),
    }

    let opt = Opt::parse_from([
        "pw-expiry",
        "-c",
        "/tmp/pw.toml",
        "check",
        "alice",
        "--now",
        "2024-03-01T12:00:00+00:00",
    ]);
    assert_eq!(opt.config.as_deref(), Some("/tmp/pw.toml"));
    match opt.command {
        Some(Command::Check(c)) => {
            assert_eq!(c.login, "alice");
            assert!(c.now.is_some());
        }
        other => panic!("unexpected {:?}", other),
    }

    assert!(Opt::parse_from(["pw-expiry"]).command.is_none());
}
