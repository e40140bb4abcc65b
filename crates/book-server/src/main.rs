use anyhow::Context;
use book_server::config::{Command, Config, DatabaseArgs, ServeArgs};
use book_server::{AppState, EvaluationStore, router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Config::parse_args().command {
        Command::Serve(args) => serve(args).await,
        Command::Stats(args) => print_stats(args).await,
    }
}

async fn open_store(args: &DatabaseArgs) -> anyhow::Result<EvaluationStore> {
    EvaluationStore::connect(&args.database_url, args.max_connections)
        .await
        .with_context(|| format!("failed to open {}", args.database_url))
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let store = open_store(&args.database).await?;
    info!(positions = store.count().await?, "book opened");

    let app = router(AppState::new(store, args.auth(), args.scheduler()));
    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(address = %args.listen, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn print_stats(args: DatabaseArgs) -> anyhow::Result<()> {
    let store = open_store(&args).await?;
    let rows = store.book_stats().await?;

    println!("{:>5} {:>5} {:>10}", "discs", "level", "count");
    for row in &rows {
        println!("{:>5} {:>5} {:>10}", row.disc_count, row.level, row.count);
    }
    println!("total {:>16}", rows.iter().map(|row| row.count).sum::<u64>());
    Ok(())
}
