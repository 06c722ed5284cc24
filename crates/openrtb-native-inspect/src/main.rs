use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use openrtb_native_core::codec::ResidualReason;
use openrtb_native_core::{NativeCodec, NativeConfig};
use serde_json::json;
use simple_logger::SimpleLogger;

/// Decode OpenRTB native requests and show what the schema could not map
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML config with [codec] and [logging] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a native request and print it re-encoded with its residual report
    Decode {
        /// Path to the request JSON; stdin when omitted or `-`
        input: Option<PathBuf>,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List every bound JSON key with its description
    Schema,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<NativeConfig> {
    let Some(path) = path else {
        return Ok(NativeConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(NativeConfig::from_toml_str(&text)?)
}

fn read_input(input: Option<&PathBuf>) -> anyhow::Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;
    SimpleLogger::new()
        .with_level(config.logging.level)
        .init()
        .context("installing logger")?;

    let codec = NativeCodec::try_new(config.codec)?;
    match cli.command {
        Commands::Decode { input, pretty } => {
            let text = read_input(input.as_ref())?;
            let (request, report) = codec.decode_str_with_report(&text)?;
            log::info!(
                "decoded native request: assets={}, residual entries={}",
                request.assets.len(),
                report.entries.len()
            );
            let residual: Vec<_> = report
                .entries
                .iter()
                .map(|entry| match &entry.reason {
                    ResidualReason::UnknownField => {
                        json!({"path": entry.path.to_pointer(), "reason": "unknown field"})
                    }
                    ResidualReason::Mismatch(err) => {
                        json!({"path": entry.path.to_pointer(), "reason": err.to_string()})
                    }
                })
                .collect();
            let out = json!({
                "request": codec.encode_value(&request),
                "residual": residual,
            });
            let body = if pretty {
                serde_json::to_string_pretty(&out)?
            } else {
                serde_json::to_string(&out)?
            };
            println!("{}", body);
        }
        Commands::Schema => {
            for doc in codec.schema() {
                println!("{:<14} {:<16} {}", doc.type_name, doc.key, doc.description);
            }
        }
    }
    Ok(())
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("openrtb-native-inspect failed: {err:#}");
        std::process::exit(1);
    }
}
