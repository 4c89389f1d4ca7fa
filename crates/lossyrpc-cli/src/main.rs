//! # lossyrpc CLI Entry Point
//!
//! Main binary for lossyrpc. Provides command-line access to running
//! services and a runnable example service.
//!
//! ## Usage
//!
//! ```bash
//! # Run the coordination example on port 9000 with 10% packet loss
//! lossyrpc serve --port 9000 --lossy --loss-rate 0.1
//!
//! # Check that it is up
//! lossyrpc probe 127.0.0.1:9000
//!
//! # Make a call (outputs the raw reply envelope)
//! lossyrpc call 127.0.0.1:9000 method -a '[5, true]'
//! ```

use anyhow::Result;
use argh::FromArgs;
use lossyrpc_client::{Endpoint, RetryConfig};
use lossyrpc_common::transport::FaultConfig;
use lossyrpc_common::Request;
use std::time::Duration;

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// lossyrpc - RPC over a deliberately unreliable transport
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Call**: Make a single raw call (unix-friendly JSON output)
/// - **Probe**: Check whether a service is listening
/// - **Serve**: Run the coordination example service
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Call(CallArgs),
    Probe(ProbeArgs),
    Serve(ServeArgs),
}

/// Arguments for making a single call.
///
/// The `call` command sends one request envelope and prints the reply
/// envelope as raw JSON to stdout, failed replies included. Exchange failures
/// are reported to stderr with a non-zero exit code.
///
/// # Examples
///
/// ```bash
/// lossyrpc call 127.0.0.1:9000 rendezvous
/// lossyrpc call 127.0.0.1:9000 method -a '[7, false]' | jq '.Result[0]'
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call an operation on a service
struct CallArgs {
    /// address of the service (host:port)
    #[argh(positional)]
    address: String,

    /// name of the operation to call
    #[argh(positional)]
    method: String,

    /// JSON array of positional arguments
    ///
    /// Defaults to `[]`.
    #[argh(option, short = 'a', long = "args", default = "\"[]\".into()")]
    args: String,

    /// drop sends at random
    #[argh(switch)]
    lossy: bool,

    /// probability that a send is dropped when --lossy is set
    #[argh(option, default = "0.05")]
    loss_rate: f64,

    /// delay every send
    #[argh(switch)]
    delayed: bool,

    /// send delay, milliseconds part
    #[argh(option, default = "2")]
    delay_ms: u64,

    /// send delay, microseconds part
    #[argh(option, default = "0")]
    delay_us: u64,

    /// receive timeout, milliseconds part
    #[argh(option, default = "500")]
    timeout_ms: u64,

    /// receive timeout, microseconds part
    #[argh(option, default = "0")]
    timeout_us: u64,

    /// maximum number of send attempts (0 retries forever)
    #[argh(option, default = "16")]
    max_attempts: u32,
}

/// Arguments for probing a service.
///
/// Exits with 0 if something accepts connections at the address, 1 otherwise.
#[derive(FromArgs)]
#[argh(subcommand, name = "probe")]
/// check whether a service is listening
struct ProbeArgs {
    /// address to probe (host:port)
    #[argh(positional)]
    address: String,

    /// connect timeout in milliseconds
    #[argh(option, default = "5000")]
    timeout_ms: u64,
}

/// Arguments for running the coordination example service.
///
/// The service exposes `method(value, return_error)` and `rendezvous()` and
/// runs until Ctrl-C.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// run the coordination example service
struct ServeArgs {
    /// host to bind to
    #[argh(option, short = 'b', default = "\"0.0.0.0\".into()")]
    host: String,

    /// port to listen on (0 picks a free port)
    #[argh(option, short = 'p', default = "0")]
    port: u16,

    /// drop sends at random
    #[argh(switch)]
    lossy: bool,

    /// probability that a send is dropped when --lossy is set
    #[argh(option, default = "0.05")]
    loss_rate: f64,

    /// delay every send
    #[argh(switch)]
    delayed: bool,

    /// send delay, milliseconds part
    #[argh(option, default = "2")]
    delay_ms: u64,

    /// send delay, microseconds part
    #[argh(option, default = "0")]
    delay_us: u64,

    /// receive timeout, milliseconds part
    #[argh(option, default = "500")]
    timeout_ms: u64,

    /// receive timeout, microseconds part
    #[argh(option, default = "0")]
    timeout_us: u64,
}

/// Fault flags shared by `call` and `serve`.
struct FaultFlags {
    lossy: bool,
    loss_rate: f64,
    delayed: bool,
    delay_ms: u64,
    delay_us: u64,
    timeout_ms: u64,
    timeout_us: u64,
}

impl FaultFlags {
    fn into_config(self) -> Result<FaultConfig> {
        let mut faults = FaultConfig::reliable().with_timeout(self.timeout_ms, self.timeout_us);
        if self.lossy {
            faults = faults.with_loss(self.loss_rate);
        }
        if self.delayed {
            faults = faults.with_delay(self.delay_ms, self.delay_us);
        }
        faults.validate()?;
        Ok(faults)
    }
}

impl CallArgs {
    fn faults(&self) -> Result<FaultConfig> {
        FaultFlags {
            lossy: self.lossy,
            loss_rate: self.loss_rate,
            delayed: self.delayed,
            delay_ms: self.delay_ms,
            delay_us: self.delay_us,
            timeout_ms: self.timeout_ms,
            timeout_us: self.timeout_us,
        }
        .into_config()
    }

    fn retry(&self) -> RetryConfig {
        match self.max_attempts {
            0 => RetryConfig::unbounded(),
            n => RetryConfig::default().with_max_attempts(n),
        }
    }
}

impl ServeArgs {
    fn faults(&self) -> Result<FaultConfig> {
        FaultFlags {
            lossy: self.lossy,
            loss_rate: self.loss_rate,
            delayed: self.delayed,
            delay_ms: self.delay_ms,
            delay_us: self.delay_us,
            timeout_ms: self.timeout_ms,
            timeout_us: self.timeout_us,
        }
        .into_config()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // call and probe keep stdout clean for scripting
    if matches!(cli.command, Commands::Serve(_)) {
        // Set default log level to INFO, but allow RUST_LOG env var to override
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Call(args) => run_call(args).await,
        Commands::Probe(args) => {
            let up = lossyrpc_cli::probe(&args.address, Duration::from_millis(args.timeout_ms)).await;
            println!("{}", up);
            if !up {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Serve(args) => {
            let faults = args.faults()?;
            lossyrpc_cli::serve(&args.host, args.port, faults, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
            })
            .await?;
            Ok(())
        }
    }
}

/// Executes the `call` subcommand.
///
/// # Errors
///
/// Returns an error if:
/// - The args string is not a JSON array
/// - The fault or retry flags are invalid
/// - The exchange fails (connect, retry budget, timeout, undecodable reply)
async fn run_call(args: CallArgs) -> Result<()> {
    let call_args: Vec<serde_json::Value> = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("args must be a JSON array: {}", e))?;

    let endpoint = Endpoint::new(&args.address, args.faults()?).with_retry(args.retry());
    endpoint.validate()?;

    let reply = endpoint.exchange(&Request::new(&args.method, call_args)).await?;

    // Output raw JSON to stdout
    println!("{}", serde_json::to_string(&reply)?);
    Ok(())
}
