use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use block_tester::config::{
    DEFAULT_DNS_ADDR, DEFAULT_HTTP_PORT, DEFAULT_PROXY_ADDR, ProbeConfig, parse_addr,
};
use block_tester::error::SetupError;
use block_tester::files::{ensure_writable, load_names, write_results};
use block_tester::paths::NetworkPaths;
use block_tester::tester::Tester;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "block-tester")]
#[command(about = "Compare how domain names resolve and serve directly and over Tor", long_about = None)]
struct Args {
    /// Public DNS resolver (ip:port)
    #[arg(long, default_value = DEFAULT_DNS_ADDR)]
    dns_addr: String,

    /// SOCKS5 proxy of the Tor client (ip:port)
    #[arg(long, default_value = DEFAULT_PROXY_ADDR)]
    proxy_addr: String,

    /// File with one name per line
    #[arg(long, default_value = "names")]
    names_file: PathBuf,

    /// Where to write the JSON results
    #[arg(long, default_value = "results.json")]
    results_file: PathBuf,

    /// Number of names probed concurrently
    #[arg(short, long, default_value = "1")]
    workers: NonZeroUsize,

    /// Port the HTTP probe connects to
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    http_port: u16,

    /// DNS exchange and HTTP request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Connection timeout in seconds
    #[arg(long, default_value = "10")]
    dial_timeout_secs: u64,

    /// Log every probe step
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "block_tester=debug"
    } else {
        "block_tester=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<(), SetupError> {
    let config = ProbeConfig {
        dns_addr: parse_addr(&args.dns_addr)?,
        proxy_addr: parse_addr(&args.proxy_addr)?,
        http_port: args.http_port,
        timeout: Duration::from_secs(args.timeout_secs),
        dial_timeout: Duration::from_secs(args.dial_timeout_secs),
    };

    let names = load_names(&args.names_file).await?;
    ensure_writable(&args.results_file).await?;
    let paths = NetworkPaths::new(config)?;

    info!(
        names = names.len(),
        workers = args.workers.get(),
        dns = %paths.config().dns_addr,
        proxy = %paths.config().proxy_addr,
        "starting probes"
    );

    let tester = Tester::new(paths);
    let results = tester.run(names, args.workers).await?;
    info!("{}", tester.stats());

    write_results(&args.results_file, &results).await?;
    info!(path = %args.results_file.display(), "results written");

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
