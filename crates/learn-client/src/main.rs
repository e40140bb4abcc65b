use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use learn_client::config::{Command, Config, EngineArgs, LearnArgs, SeedArgs};
use learn_client::{ApiClient, EdaxEngine, EngineCommand, LearnClient, LearnConfig, seed};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Config::parse_args().command {
        Command::Learn(args) => learn(args),
        Command::Seed(args) => run_seed(args),
    }
}

fn engine(args: &EngineArgs) -> anyhow::Result<EdaxEngine> {
    let (program, engine_args) = args.command().context("invalid engine command")?;
    Ok(EdaxEngine::new(EngineCommand {
        program,
        args: engine_args,
        working_dir: args.engine_working_dir.clone(),
        cores: args.cores,
        poll_interval: args.poll_interval(),
    }))
}

fn learn(args: LearnArgs) -> anyhow::Result<()> {
    let api = ApiClient::new(&args.server.server_url, &args.server.token)
        .context("failed to create HTTP client")?;
    let hostname = gethostname::gethostname().to_string_lossy().into_owned();

    let mut config = LearnConfig::new(hostname, args.build_id.clone());
    config.heartbeat_interval = Duration::from_secs(args.heartbeat_secs);
    config.idle = Duration::from_secs(args.idle_secs);

    info!(server = %args.server.server_url, "starting learn client");
    LearnClient::new(Arc::new(api), engine(&args.engine)?, config).run();
    Ok(())
}

fn run_seed(args: SeedArgs) -> anyhow::Result<()> {
    let api = ApiClient::new(&args.server.server_url, &args.server.token)
        .context("failed to create HTTP client")?;
    let mut engine = engine(&args.engine)?;

    let reports = seed::seed(&api, &mut engine, args.discs, args.level)?;
    for report in reports {
        println!(
            "{:>2} discs: {:>8} positions, {:>8} found, {:>8} computed",
            report.disc_count, report.positions, report.found, report.computed
        );
    }
    Ok(())
}
