#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use lpc_peripheral::{PeripheralConfig, Simulator, WishboneRam};
use lpc_sim_cli::{run_script, Script};

/// Drive the LPC peripheral model with a JSON script of host and BMC accesses.
#[derive(Debug, Parser)]
#[command(name = "lpc-sim", version)]
struct Args {
    /// Script to run.
    script: PathBuf,

    /// Peripheral configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Size of the simulated system memory behind the firmware window, in 32-bit words.
    #[arg(long, default_value_t = 1 << 20)]
    dma_words: usize,

    /// Print one JSON object per step instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            PeripheralConfig::from_json_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => PeripheralConfig::default(),
    };

    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read {}", args.script.display()))?;
    let script = Script::from_json_str(&text)?;

    ensure!(args.dma_words > 0, "--dma-words must be at least 1");
    let mut sim = Simulator::new(&config, WishboneRam::new(args.dma_words))?;
    tracing::info!(steps = script.steps.len(), "running script");
    let reports = run_script(&mut sim, &script)?;

    for report in &reports {
        if args.json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            println!("{report}");
        }
    }
    Ok(())
}
