use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use querylens::config::{Config, OutputFormat};
use querylens::repl::{self, Shell};
use querylens::Session;

#[derive(Parser, Debug)]
#[command(name = "querylens")]
#[command(about = "querylens - A miniature SQL query engine over table files", long_about = None)]
struct Args {
    /// Config file path (defaults to ./querylens.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory path
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Database that is active at startup
    #[arg(short, long)]
    database: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Run these statements and exit instead of starting the shell
    #[arg(short, long = "execute")]
    execute: Vec<String>,

    /// Record and print execution steps for every query
    #[arg(long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "querylens=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }

    let session = Session::open(&config.data_dir, &config.database)?;
    tracing::debug!(
        "Session opened on '{}' with database '{}'",
        config.data_dir.display(),
        session.active_database()
    );

    if args.execute.is_empty() {
        return repl::run(session, &config, args.trace);
    }

    let mut shell = Shell::new(session, &config).with_trace(args.trace);
    let failed = args
        .execute
        .iter()
        .filter(|statement| !shell.execute(statement))
        .count();
    if failed > 0 {
        anyhow::bail!("{} of {} statements failed", failed, args.execute.len());
    }
    Ok(())
}
