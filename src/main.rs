//! rtrelay - command line driver
//!
//! Usage:
//!   rtrelay call system.listMethods
//!   rtrelay multicall --filter main d.name= d.size_bytes=
//!   rtrelay batchcall --hash ABCDEF d.state= d.custom=seedingtime
//!   rtrelay relay < request.xml
//!
//! Output JSON ke stdout, log ke stderr.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use rtrelay::{RelayConfig, RpcClient, RpcError, RpcValue, ScgiClient, Target, TransportError};

/// Exit codes untuk setiap kelas error
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const TRANSPORT_ERROR: i32 = 2;
    pub const RPC_ERROR: i32 = 3;
    pub const IO_ERROR: i32 = 4;
}

#[derive(Parser)]
#[command(name = "rtrelay")]
#[command(about = "Talk XML-RPC to rTorrent over its SCGI socket")]
#[command(version)]
struct Cli {
    /// Relay config file (TOML)
    #[arg(short, long, global = true, env = "RTRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Daemon config file containing scgi_port
    #[arg(long, global = true)]
    rc: Option<PathBuf>,

    /// Per-call deadline in milliseconds (0 = unbounded)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Call a single method
    Call {
        method: String,
        /// Parameters; integers are sent as <int>, everything else as <string>
        params: Vec<String>,
    },
    /// Run one command set against every object matching a filter
    Multicall {
        #[arg(short, long, default_value = "d")]
        target: Target,
        #[arg(long, default_value = "")]
        hash: String,
        #[arg(short, long, default_value = "main")]
        filter: String,
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Run several commands against one object via system.multicall
    Batchcall {
        #[arg(short, long, default_value = "d")]
        target: Target,
        #[arg(long)]
        hash: String,
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Forward an XML-RPC document from stdin, print {"xml"} or {"error"}
    Relay,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    let client = RpcClient::new(ScgiClient::new(config));
    let code = match run(&client, cli.command) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            error!("{}", e);
            exit_code_for(&e)
        }
    };
    process::exit(code);
}

fn load_configuration(cli: &Cli) -> Result<RelayConfig, rtrelay::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    if let Some(rc) = &cli.rc {
        config.rtorrent_rc = rc.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    Ok(config)
}

#[derive(Debug)]
enum CliError {
    Rpc(RpcError),
    Io(io::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Rpc(e) => write!(f, "{e}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl From<RpcError> for CliError {
    fn from(e: RpcError) -> Self {
        CliError::Rpc(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Rpc(RpcError::Transport(
            TransportError::NoScgiPort { .. }
            | TransportError::ConfigUnreadable { .. }
            | TransportError::InvalidAddress(_),
        )) => exit_codes::CONFIG_ERROR,
        CliError::Rpc(RpcError::Transport(_)) => exit_codes::TRANSPORT_ERROR,
        CliError::Rpc(_) => exit_codes::RPC_ERROR,
        CliError::Io(_) => exit_codes::IO_ERROR,
    }
}

fn run(client: &RpcClient<ScgiClient>, command: Command) -> Result<(), CliError> {
    match command {
        Command::Call { method, params } => {
            let params = params.iter().map(|p| parse_param(p)).collect();
            let value = client.call(&method, params)?;
            print_json(&value)
        }
        Command::Multicall {
            target,
            hash,
            filter,
            commands,
        } => {
            let rows = client.multicall(target, &hash, &filter, &commands)?;
            print_json(&rows)
        }
        Command::Batchcall {
            target,
            hash,
            commands,
        } => {
            let row = client.batchcall(target, &hash, &commands)?;
            print_json(&row)
        }
        Command::Relay => {
            let mut payload = String::new();
            io::stdin().read_to_string(&mut payload)?;
            print_json(&client.relay(&payload))
        }
    }
}

/// Integer jika bisa di-parse, selain itu string
fn parse_param(raw: &str) -> RpcValue {
    raw.parse::<i64>()
        .map(RpcValue::Integer)
        .unwrap_or_else(|_| RpcValue::from(raw))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    println!("{text}");
    Ok(())
}
