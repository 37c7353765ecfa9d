//! CoinGecko tracker CLI
//!
//! Search coins, list trending coins and watch a coin's price from the
//! terminal. Requires `COINGECKO_BASE_URL` and `COINGECKO_API_KEY`.

use clap::{Parser, Subcommand};
use coingecko_tracker::{
    constants::{POLL_INTERVAL_SECS, SEARCH_DEBOUNCE_MS},
    trending_rows, CoinGeckoClient, CoinPoller, MarketDataSource, MarketEvent, SearchCoin,
    SearchSession,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "coingecko-tracker")]
#[command(about = "CoinGecko price tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Search coins by name or symbol
    Search {
        /// Query for a one-shot search
        query: Option<String>,

        /// Read queries from stdin, one per line, with debouncing
        #[arg(short, long)]
        interactive: bool,
    },

    /// Show the trending coins table
    Trending,

    /// Poll price and OHLC data for a coin
    Watch {
        /// CoinGecko coin id (e.g., bitcoin)
        coin_id: String,

        /// Seconds between polls
        #[arg(long, default_value_t = POLL_INTERVAL_SECS)]
        interval_secs: u64,

        /// Stop after this many poll cycles
        #[arg(long)]
        cycles: Option<u32>,
    },

    /// Print OHLC candles for a coin
    Ohlc {
        /// CoinGecko coin id (e.g., bitcoin)
        coin_id: String,

        /// Days of history
        #[arg(short, long, default_value = "1")]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = Arc::new(CoinGeckoClient::from_env()?);
    info!(base_url = %client.config().base_url, "CoinGecko client ready");

    match cli.command {
        Commands::Search { query, interactive } => {
            if interactive {
                interactive_search(client.clone()).await?;
            } else {
                let query = query.unwrap_or_default();
                print_coins(&client.search_coins(&query).await?);
            }
        }
        Commands::Trending => {
            let rows = trending_rows(client.as_ref()).await?;
            println!("{:<28} {:>10} {:>16}", "Name", "24h", "Price");
            for row in rows {
                let arrow = if row.is_up { "▲" } else { "▼" };
                println!(
                    "{:<28} {} {:>7.2}% {:>16}",
                    row.name, arrow, row.change_24h_pct, format_price(row.price)
                );
            }
        }
        Commands::Watch {
            coin_id,
            interval_secs,
            cycles,
        } => {
            watch(
                client.clone(),
                coin_id,
                Duration::from_secs(interval_secs.max(1)),
                cycles,
            )
            .await?;
        }
        Commands::Ohlc { coin_id, days } => {
            let candles = client.ohlc(&coin_id, days).await?;
            println!(
                "{:<22} {:>14} {:>14} {:>14} {:>14}",
                "Time", "Open", "High", "Low", "Close"
            );
            for c in candles {
                let time = c
                    .timestamp()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<22} {:>14.4} {:>14.4} {:>14.4} {:>14.4}",
                    time, c.open, c.high, c.low, c.close
                );
            }
        }
    }

    let metrics = client.metrics().await;
    info!(
        requests = metrics.total_requests,
        failed = metrics.failed_requests,
        p50_ms = metrics.latency_p50_ms,
        "Done"
    );

    Ok(())
}

async fn interactive_search(client: Arc<CoinGeckoClient>) -> Result<(), Box<dyn std::error::Error>> {
    let session = SearchSession::spawn(client, Duration::from_millis(SEARCH_DEBOUNCE_MS));
    let mut state = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Type to search for coins... (empty line clears, Ctrl-D quits)");

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => session.set_query(line),
                None => break,
            },
            changed = state.changed() => {
                changed?;
                let current = state.borrow_and_update().clone();
                if current.is_loading {
                    eprintln!("Searching...");
                } else if let Some(error) = &current.error {
                    eprintln!("Search failed: {}", error);
                } else if !current.results.is_empty() {
                    print_coins(&current.results);
                } else if !current.query.trim().is_empty() {
                    println!("No results found.");
                }
            }
        }
    }

    session.close();
    Ok(())
}

async fn watch(
    client: Arc<CoinGeckoClient>,
    coin_id: String,
    interval: Duration,
    cycles: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut poller = CoinPoller::spawn(client, coin_id.clone(), interval);
    let mut events = poller.events();
    let mut seen = 0u32;

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(e) => return Err(e.into()),
                };
                if !matches!(event, MarketEvent::PollCompleted { .. }) {
                    println!("{}", event);
                    continue;
                }
                seen += 1;
                if cycles.is_some_and(|max| seen >= max) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.stop();
    let health = poller.health_check();
    info!(coin_id = %coin_id, status = ?health.status, "Watch finished");
    Ok(())
}

fn print_coins(coins: &[SearchCoin]) {
    if coins.is_empty() {
        println!("No results found.");
        return;
    }
    for coin in coins {
        let rank = coin
            .market_cap_rank
            .map(|r| format!("#{}", r))
            .unwrap_or_default();
        println!(
            "{:<24} {:<10} {:>6}  {}",
            coin.name,
            coin.symbol.to_uppercase(),
            rank,
            coin.id
        );
    }
}

fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("${:.2}", price)
    } else {
        format!("${:.8}", price)
    }
}
