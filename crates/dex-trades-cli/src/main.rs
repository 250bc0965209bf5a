use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use dex_trades_core::candle::{CandleSeries, duration_label, parse_duration};
use dex_trades_core::export::write_simulator_candles;
use dex_trades_core::store::CandleStore;
use dex_trades_subgraph::client::{SubgraphClient, TradeRequest, TradesOutput};
use dex_trades_subgraph::config::SubgraphConfig;
use dex_trades_subgraph::paginator::RetryPolicy;
use dex_trades_subgraph::protocol::Protocol;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "dex-trades",
    about = "Fetch DEX trades from protocol subgraphs and build candle series"
)]
struct Cli {
    /// Root directory for data storage (default: current directory)
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Abort the command after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Give up on a page after this many attempts (retries forever if omitted)
    #[arg(long)]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by the fetching commands.
#[derive(clap::Args, Debug)]
struct TradeArgs {
    /// Protocol alias: curve, uni, sushi, ...
    #[arg(short, long)]
    protocol: String,

    /// Pool addresses (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pools: Option<Vec<String>>,

    /// Coin addresses (comma-separated, at least 2)
    #[arg(long, value_delimiter = ',')]
    coins: Option<Vec<String>>,

    /// Earliest trade time: epoch seconds, YYYY-MM-DD or RFC 3339
    #[arg(long, value_parser = parse_time)]
    start: Option<i64>,

    /// Latest trade time (defaults to the newest matching trade)
    #[arg(long, value_parser = parse_time)]
    end: Option<i64>,
}

impl TradeArgs {
    fn request(&self) -> TradeRequest {
        TradeRequest {
            pools: self.pools.clone(),
            coins: self.coins.clone(),
            start: self.start,
            end: self.end,
            ..TradeRequest::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One simulator JSON file per pair
    Json,
    /// Parquet candle store
    Parquet,
}

#[derive(Subcommand)]
enum Commands {
    /// Print raw trades as JSON lines
    Trades {
        #[command(flatten)]
        args: TradeArgs,
    },

    /// Print the coin addresses of pools, one per line
    PoolCoins {
        /// Protocol alias
        #[arg(short, long)]
        protocol: String,

        /// Pool addresses (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        pools: Vec<String>,
    },

    /// Build candles for every coin pair and write them under the data dir
    Candles {
        #[command(flatten)]
        args: TradeArgs,

        /// Candle width, e.g. 30s, 5min, 1h, 1D
        #[arg(short, long)]
        duration: String,

        /// Keep each pair's own buckets instead of a shared, gap-filled grid
        #[arg(long)]
        no_reindex: bool,

        /// Keep buckets before every pair has traded
        #[arg(long)]
        no_truncate: bool,

        /// Display names for the coins, in coin order (e.g. USDC,WETH)
        #[arg(long, value_delimiter = ',')]
        names: Option<Vec<String>>,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Show what candle series exist in the store
    Status {
        /// Filter by protocol (shows all if omitted)
        #[arg(short, long)]
        protocol: Option<String>,
    },
}

/// Accept epoch seconds, a date (midnight UTC) or an RFC 3339 timestamp.
fn parse_time(text: &str) -> Result<i64, String> {
    if let Ok(secs) = text.parse::<i64>() {
        return Ok(secs);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| format!("invalid date: {text}"));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp())
        .map_err(|_| format!("expected epoch seconds, YYYY-MM-DD or RFC 3339, got '{text}'"))
}

fn create_client(max_retries: Option<u32>) -> Result<SubgraphClient> {
    let config = SubgraphConfig::from_env().context("invalid subgraph configuration")?;
    let retry = match max_retries {
        Some(attempts) => RetryPolicy::bounded(attempts),
        None => RetryPolicy::default(),
    };
    Ok(SubgraphClient::new(&config)
        .context("failed to create subgraph client")?
        .with_retry(retry))
}

async fn with_timeout<T>(secs: Option<u64>, task: impl Future<Output = Result<T>>) -> Result<T> {
    match secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
            .await
            .with_context(|| format!("timed out after {secs}s"))?,
        None => task.await,
    }
}

async fn cmd_trades(client: &SubgraphClient, args: &TradeArgs) -> Result<()> {
    let request = TradeRequest {
        as_table: false,
        ..args.request()
    };
    let output = client
        .trades(&args.protocol, &request)
        .await
        .context("failed to fetch trades")?;
    let TradesOutput::Raw(trades) = output else {
        anyhow::bail!("expected raw trades");
    };

    let mut out = std::io::stdout().lock();
    for trade in &trades {
        writeln!(out, "{}", serde_json::to_string(trade)?)?;
    }
    info!("{} trade(s)", trades.len());
    Ok(())
}

async fn cmd_pool_coins(client: &SubgraphClient, protocol: &str, pools: &[String]) -> Result<()> {
    let coins = client
        .pool_coins(protocol, pools)
        .await
        .context("failed to look up pool coins")?;
    for coin in coins {
        println!("{coin}");
    }
    Ok(())
}

struct CandleOptions<'a> {
    duration: &'a str,
    reindex: bool,
    truncate: bool,
    names: Option<&'a [String]>,
    format: OutputFormat,
}

async fn cmd_candles(
    client: &SubgraphClient,
    data_dir: &Path,
    args: &TradeArgs,
    options: CandleOptions<'_>,
) -> Result<()> {
    let protocol = Protocol::from_alias(&args.protocol)?;
    let duration = parse_duration(options.duration)?;
    let request = TradeRequest {
        candle_duration: Some(duration),
        reindex: options.reindex,
        truncate: options.truncate,
        ..args.request()
    };

    let output = client
        .trades(protocol.name(), &request)
        .await
        .context("failed to fetch trades")?;
    let TradesOutput::Candles(series) = output else {
        anyhow::bail!("expected candle series");
    };

    let written = match options.format {
        OutputFormat::Parquet => {
            let store = CandleStore::new(data_dir);
            let mut paths = Vec::new();
            for s in &series {
                paths.push(
                    store
                        .write_series(protocol.name(), s)
                        .with_context(|| format!("failed to store {}-{}", s.base, s.quote))?,
                );
            }
            paths
        }
        OutputFormat::Json => {
            let names = match options.names {
                Some(names) => names.to_vec(),
                None => coin_order(&series),
            };
            let dir = data_dir.join("simulator").join(protocol.name());
            write_simulator_candles(&dir, &series, &names)
                .with_context(|| format!("failed to write candles to {}", dir.display()))?
        }
    };

    for (s, path) in series.iter().zip(&written) {
        println!("{}: {}", describe(s), path.display());
    }
    Ok(())
}

/// Recover the coin order from pair series laid out as `(c0, c1), (c0, c2), ..., (c1, c2), ...`.
fn coin_order(series: &[CandleSeries]) -> Vec<String> {
    let Some(first) = series.first() else {
        return Vec::new();
    };
    let mut coins = vec![first.quote.clone()];
    coins.extend(
        series
            .iter()
            .take_while(|s| s.quote == first.quote)
            .map(|s| s.base.clone()),
    );
    coins
}

fn describe(series: &CandleSeries) -> String {
    format!(
        "{}-{} {} ({} candle(s))",
        series.base,
        series.quote,
        duration_label(chrono::Duration::seconds(series.duration_secs)),
        series.candles.len()
    )
}

fn cmd_status(store: &CandleStore, protocol: Option<&str>) -> Result<()> {
    let protocols = match protocol {
        Some(alias) => vec![Protocol::from_alias(alias)?.name().to_string()],
        None => store.list_protocols().context("failed to list protocols")?,
    };

    if protocols.is_empty() {
        println!("No data in store.");
        return Ok(());
    }

    for protocol in &protocols {
        let pairs = store
            .list_pairs(protocol)
            .with_context(|| format!("failed to list pairs for {protocol}"))?;

        if pairs.is_empty() {
            println!("{protocol}: no data");
            continue;
        }

        for pair in &pairs {
            for label in &pair.durations {
                let series = store
                    .read_series(protocol, &pair.base, &pair.quote, parse_duration(label)?)
                    .with_context(|| format!("failed to read {protocol} {}-{} {label}", pair.base, pair.quote))?;
                match (series.candles.first(), series.candles.last()) {
                    (Some(first), Some(last)) => println!(
                        "{protocol} {}: {} to {}",
                        describe(&series),
                        first.timestamp,
                        last.timestamp
                    ),
                    _ => println!("{protocol} {}: empty", describe(&series)),
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match &cli.command {
        Commands::Trades { args } => {
            let client = create_client(cli.max_retries)?;
            with_timeout(cli.timeout, cmd_trades(&client, args)).await?;
        }
        Commands::PoolCoins { protocol, pools } => {
            let client = create_client(cli.max_retries)?;
            with_timeout(cli.timeout, cmd_pool_coins(&client, protocol, pools)).await?;
        }
        Commands::Candles {
            args,
            duration,
            no_reindex,
            no_truncate,
            names,
            format,
        } => {
            let client = create_client(cli.max_retries)?;
            let options = CandleOptions {
                duration,
                reindex: !no_reindex,
                truncate: !no_truncate,
                names: names.as_deref(),
                format: *format,
            };
            with_timeout(
                cli.timeout,
                cmd_candles(&client, &cli.data_dir, args, options),
            )
            .await?;
        }
        Commands::Status { protocol } => {
            cmd_status(&CandleStore::new(&cli.data_dir), protocol.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_trades_args() {
        let cli = Cli::try_parse_from([
            "dex-trades",
            "trades",
            "-p",
            "curve",
            "--pools",
            "0xpool1,0xpool2",
            "--start",
            "1650000000",
            "--end",
            "2022-04-16",
        ])
        .unwrap();

        match cli.command {
            Commands::Trades { args } => {
                assert_eq!(args.protocol, "curve");
                assert_eq!(args.pools, Some(vec!["0xpool1".to_string(), "0xpool2".to_string()]));
                assert!(args.coins.is_none());
                assert_eq!(args.start, Some(1_650_000_000));
                assert_eq!(args.end, Some(1_650_067_200));
            }
            _ => panic!("expected Trades command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "dex-trades",
            "--timeout",
            "30",
            "--max-retries",
            "5",
            "--data-dir",
            "/tmp/dex",
            "status",
        ])
        .unwrap();

        assert_eq!(cli.timeout, Some(30));
        assert_eq!(cli.max_retries, Some(5));
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/dex"));
        assert!(matches!(cli.command, Commands::Status { protocol: None }));
    }

    #[test]
    fn parse_candles_defaults() {
        let cli = Cli::try_parse_from([
            "dex-trades",
            "candles",
            "-p",
            "uni",
            "--coins",
            "0xa,0xb,0xc",
            "--duration",
            "5min",
        ])
        .unwrap();

        match cli.command {
            Commands::Candles {
                args,
                duration,
                no_reindex,
                no_truncate,
                names,
                format,
            } => {
                assert_eq!(args.coins.map(|c| c.len()), Some(3));
                assert_eq!(duration, "5min");
                assert!(!no_reindex);
                assert!(!no_truncate);
                assert!(names.is_none());
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected Candles command"),
        }
    }

    #[test]
    fn parse_candles_options() {
        let cli = Cli::try_parse_from([
            "dex-trades",
            "candles",
            "-p",
            "sushi",
            "--pools",
            "0xpool",
            "-d",
            "1h",
            "--no-reindex",
            "--names",
            "USDC,WETH",
            "--format",
            "parquet",
        ])
        .unwrap();

        match cli.command {
            Commands::Candles {
                no_reindex,
                names,
                format,
                ..
            } => {
                assert!(no_reindex);
                assert_eq!(names, Some(vec!["USDC".to_string(), "WETH".to_string()]));
                assert_eq!(format, OutputFormat::Parquet);
            }
            _ => panic!("expected Candles command"),
        }
    }

    #[test]
    fn pool_coins_requires_pools() {
        assert!(Cli::try_parse_from(["dex-trades", "pool-coins", "-p", "curve"]).is_err());
        let cli =
            Cli::try_parse_from(["dex-trades", "pool-coins", "-p", "curve", "--pools", "0xabc"]).unwrap();
        assert!(matches!(cli.command, Commands::PoolCoins { ref pools, .. } if pools == &["0xabc"]));
    }

    fn pair(quote: &str, base: &str) -> CandleSeries {
        CandleSeries {
            quote: quote.to_string(),
            base: base.to_string(),
            duration_secs: 60,
            candles: Vec::new(),
        }
    }

    #[test]
    fn coin_order_from_pair_series() {
        let series = vec![
            pair("0xa", "0xb"),
            pair("0xa", "0xc"),
            pair("0xb", "0xc"),
        ];
        assert_eq!(coin_order(&series), vec!["0xa", "0xb", "0xc"]);
        assert_eq!(coin_order(&series[..1]), vec!["0xa", "0xb"]);
        assert!(coin_order(&[]).is_empty());
    }

    #[test]
    fn time_formats() {
        assert_eq!(parse_time("0"), Ok(0));
        assert_eq!(parse_time("1970-01-02"), Ok(86_400));
        assert_eq!(parse_time("1970-01-01T01:00:00Z"), Ok(3_600));
        assert!(parse_time("yesterday").is_err());
    }

    #[tokio::test]
    async fn timeout_aborts_slow_commands() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), anyhow::Error>(())
        };
        let err = with_timeout(Some(0), slow).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));

        assert_eq!(with_timeout(None, async { Ok::<_, anyhow::Error>(7) }).await.unwrap(), 7);
    }
}
