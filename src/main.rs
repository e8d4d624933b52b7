use clap::Parser;
use poly_crowd::cli::{Cli, Commands};
use poly_crowd::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration; the defaults are a valid paper-trading setup
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("CONFIG ERROR: {}", e);
        }
        std::process::exit(1);
    }

    // Initialize telemetry
    let _guard = poly_crowd::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(&config).await?;
        }
        Commands::Scan(args) => {
            args.execute(&config).await?;
        }
        Commands::Status(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Mode: {:?}", config.execution.mode);
            println!("  Scan interval: {}s", config.market.scan_interval_secs);
            println!(
                "  Strategy: ${} stake, favorite band {} - {}, preferred side {}",
                config.strategy.stake_usd,
                config.strategy.min_threshold,
                config.strategy.max_threshold,
                config.strategy.preferred_side
            );
            println!(
                "  Risk: max ${}/position, {} concurrent, {} trades/day",
                config.risk.max_position_usd,
                config.risk.max_concurrent_positions,
                config.risk.max_daily_trades
            );
            println!("  Database: {}", config.storage.db_path.display());
        }
    }

    Ok(())
}
