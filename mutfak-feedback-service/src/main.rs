use clap::{Parser, Subcommand};

pub mod app;

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run one low rating sweep and exit
    Sweep {
        /// Look-back window in hours; defaults to SWEEP_WINDOW_HOURS
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Publish queued outbox messages to Kafka
    Relay,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Migrate => app::migrate::main(),
        Commands::Sweep { hours } => app::sweep::main(*hours).await,
        Commands::Relay => tokio::task::spawn_blocking(app::relay::main).await?,
    }
}
