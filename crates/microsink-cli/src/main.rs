//! microsink - replay files as micro-batches through a batch sink

mod callbacks;
mod metrics;
mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use microsink_bridge::{
    register_foreign, serve_receiver, BridgeConfig, ForeignCallbackHandle, HttpGateway,
};
use microsink_core::{BatchCallback, BatchSink, SchemaMatch, SinkConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::callbacks::{LogCallback, PrintingHandler};
use crate::metrics::ReplayMetrics;
use crate::replay::{InputFormat, ReplayOptions, DEFAULT_QUERY};

#[derive(Parser)]
#[command(name = "microsink")]
#[command(about = "Deliver query results to a callback one micro-batch at a time")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CallbackKind {
    /// Print each batch to stdout
    Log,
    /// Forward each batch to a foreign callback over HTTP
    Http,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay input files as consecutive micro-batches
    Replay {
        /// Input files, one micro-batch each, delivered in order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Input format (guessed from the extension if omitted)
        #[arg(long, value_enum)]
        format: Option<InputFormat>,

        /// Query over the table `source`
        #[arg(short, long, default_value = DEFAULT_QUERY)]
        query: String,

        /// Batch id of the first input
        #[arg(long, default_value = "0")]
        start_batch_id: i64,

        #[arg(long, value_enum, default_value = "log")]
        callback: CallbackKind,

        /// Base URL of the foreign callback endpoint
        #[arg(long, env = "MICROSINK_GATEWAY_URL")]
        gateway_url: Option<String>,

        /// Name the foreign side registered its callback under
        #[arg(long, default_value = "default")]
        callback_id: String,

        /// Output schema check policy
        #[arg(long, env = "MICROSINK_SCHEMA_MATCH")]
        schema_match: Option<SchemaMatch>,

        /// Print Prometheus counters when the replay ends
        #[arg(long)]
        metrics: bool,
    },

    /// Show the write plan of a query before and after marker elimination
    Explain {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, value_enum)]
        format: Option<InputFormat>,

        #[arg(short, long, default_value = DEFAULT_QUERY)]
        query: String,
    },

    /// Run a reference foreign-side endpoint that prints received batches
    Receive {
        #[arg(long, default_value = "127.0.0.1:8765", env = "MICROSINK_RECEIVER_BIND")]
        bind: String,

        /// Raise for this batch id instead of printing it
        #[arg(long)]
        fail_on_batch: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Replay {
            input,
            format,
            query,
            start_batch_id,
            callback,
            gateway_url,
            callback_id,
            schema_match,
            metrics,
        } => {
            let mut sink_config = SinkConfig::from_env()?;
            if let Some(policy) = schema_match {
                sink_config.schema_match = policy;
            }
            let callback = build_callback(callback, gateway_url, callback_id)?;
            let sink = BatchSink::with_config(callback, sink_config);

            let counters = ReplayMetrics::new();
            let options = ReplayOptions {
                inputs: input,
                format,
                query,
                start_batch_id,
            };
            let outcome = replay::replay(&sink, &options, &counters).await;
            if metrics {
                print!("{}", counters.encode()?);
            }
            let delivered = outcome?;
            info!("Replay finished: {} batches delivered", delivered);
        }
        Commands::Explain {
            input,
            format,
            query,
        } => {
            let format = format.unwrap_or_else(|| InputFormat::from_path(&input));
            print!("{}", replay::explain(&input, format, &query).await?);
        }
        Commands::Receive {
            bind,
            fail_on_batch,
        } => {
            serve_receiver(&bind, Arc::new(PrintingHandler { fail_on_batch })).await?;
        }
    }

    Ok(())
}

fn build_callback(
    kind: CallbackKind,
    gateway_url: Option<String>,
    callback_id: String,
) -> Result<Arc<dyn BatchCallback>> {
    match kind {
        CallbackKind::Log => Ok(Arc::new(LogCallback)),
        CallbackKind::Http => {
            let mut config = BridgeConfig::from_env()?;
            if let Some(url) = gateway_url {
                config.gateway_url = url;
            }
            info!(
                "Forwarding batches to '{}' at {}",
                callback_id, config.gateway_url
            );
            let gateway = Arc::new(HttpGateway::new(&config)?);
            Ok(register_foreign(ForeignCallbackHandle::new(
                callback_id,
                gateway,
            )))
        }
    }
}
