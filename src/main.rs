//! Premarket breakout strategy - main entry point
//!
//! Subcommands:
//! - select: print the universe selection for one date
//! - replay: drive the engine over a recorded tick file with the paper venue
//! - download: fetch the gapper dataset CSV

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use premarket_breakout::data::{self, GapperTable};
use premarket_breakout::oms::{OrderState, OrderType, PaperVenue};
use premarket_breakout::selector::select_universe;
use premarket_breakout::{Config, Money, Side, StrategyEngine};

#[derive(Parser, Debug)]
#[command(name = "premarket-breakout")]
#[command(about = "Daily premarket-gap breakout strategy engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the universe selection for one trading day
    Select {
        /// Trading date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Path to configuration file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Gapper CSV path (overrides the config)
        #[arg(long)]
        data: Option<String>,
    },

    /// Replay recorded ticks through the engine on the paper venue
    Replay {
        /// Tick CSV path (datetime,symbol,price)
        #[arg(short, long)]
        ticks: String,

        /// Path to configuration file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Gapper CSV path (overrides the config)
        #[arg(long)]
        data: Option<String>,
    },

    /// Download the gapper dataset CSV
    Download {
        /// Source URL
        #[arg(
            short,
            long,
            default_value = "https://raw.githubusercontent.com/lieblius/financial-data/main/gappers.csv"
        )]
        url: String,

        /// Output path
        #[arg(short, long, default_value = "data/gappers.csv")]
        output: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!("{},hyper=warn,reqwest=warn,rustls=warn", level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => {
            let config = Config::default();
            config.validate().context("Invalid built-in defaults")?;
            Ok(config)
        }
    }
}

fn load_table(config: &Config, override_path: Option<&str>) -> Result<GapperTable> {
    let path = override_path.unwrap_or(&config.data.gapper_csv);
    GapperTable::load_csv(path)
}

fn run_select(date: String, config: Option<String>, data: Option<String>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let table = load_table(&config, data.as_deref())?;
    let date: NaiveDate = date.parse().context("Date must be YYYY-MM-DD")?;

    let selection = select_universe(date, &table, &config.filter);
    if selection.is_empty() {
        println!("{}: no candidates", date);
        return Ok(());
    }
    println!("{}: {} candidate(s)", date, selection.len());
    for (symbol, threshold) in &selection {
        println!("  {:<8} threshold {}", symbol, threshold);
    }
    Ok(())
}

fn run_replay(ticks: String, config: Option<String>, data: Option<String>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let cutoff = config.session.cutoff;
    let table = load_table(&config, data.as_deref())?;
    let ticks = data::load_ticks(&ticks)?;

    let mut engine = StrategyEngine::new(config, PaperVenue::new())?;

    // The replay loop plays scheduler: selection at each new date, one
    // liquidation per day at the cutoff.
    let mut current_day: Option<NaiveDate> = None;
    let mut liquidated = false;
    for st in &ticks {
        let date = st.tick.datetime.date();
        if current_day != Some(date) {
            if current_day.is_some() && !liquidated {
                engine.on_liquidation_due();
            }
            engine.on_selection_due(date, &table);
            current_day = Some(date);
            liquidated = false;
        }
        if !liquidated && st.tick.datetime.time() >= cutoff {
            engine.on_liquidation_due();
            liquidated = true;
        }
        engine.on_price_tick(&st.symbol, &st.tick);
    }
    if current_day.is_some() && !liquidated {
        engine.on_liquidation_due();
    }

    // Summary over the paper venue's fill record
    let venue = engine.venue();
    let mut entries = 0usize;
    let mut pnl = Money::ZERO;
    for order in venue.filled_orders() {
        let Some(price) = order.fill_price else {
            continue;
        };
        let notional = price * Money::from_i64(order.quantity as i64);
        match order.side {
            Side::Buy => {
                if order.order_type == OrderType::Market {
                    entries += 1;
                }
                pnl = pnl - notional;
            }
            Side::Sell => pnl = pnl + notional,
        }
    }
    let cancelled = venue
        .orders()
        .filter(|o| o.state == OrderState::Cancelled)
        .count();

    println!("Replay complete: {} tick(s)", ticks.len());
    println!("  entries:          {}", entries);
    println!("  filled orders:    {}", venue.filled_orders().count());
    println!("  cancelled orders: {}", cancelled);
    println!("  gross pnl:        {}", pnl.round_dp(2));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Select { .. } => "select",
        Commands::Replay { .. } => "replay",
        Commands::Download { .. } => "download",
    };
    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Select { date, config, data } => run_select(date, config, data),
        Commands::Replay { ticks, config, data } => run_replay(ticks, config, data),
        Commands::Download { url, output } => data::download_gappers(&url, output),
    }
}
