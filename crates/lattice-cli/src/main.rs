// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Evaluates a matrix expression read from JSON.
// Run with: lattice --input expr.json [--workers 4] [--report]

use anyhow::{Context, Result};
use clap::Parser;
use lattice_engine::{ComputationNode, EngineConfig, LinearAlgebraEngine};
use std::fs;
use std::path::PathBuf;

/// Lattice matrix expression evaluator.
#[derive(Parser, Debug)]
#[command(name = "lattice", version)]
#[command(about = "Evaluate a matrix expression on a fatigue-aware worker pool")]
struct Args {
    /// JSON file holding the expression tree.
    #[arg(long, short)]
    input: PathBuf,

    /// Where to write the resulting matrix. Prints to stdout when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Number of worker threads. Overrides the config file.
    #[arg(long, short)]
    workers: Option<usize>,

    /// Seed for the per-worker fatigue multipliers. Overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON engine configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log the per-worker report after evaluation.
    #[arg(long)]
    report: bool,
}

impl Args {
    /// Reads the config file, if any, then applies the command-line overrides.
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => EngineConfig::default(),
        };

        if let Some(workers) = self.workers {
            config.pool.num_workers = workers;
        }
        if let Some(seed) = self.seed {
            config.pool.fatigue_seed = Some(seed);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.engine_config()?;

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read expression {}", args.input.display()))?;
    let root: ComputationNode = serde_json::from_str(&text)
        .with_context(|| format!("Invalid expression {}", args.input.display()))?;
    let root = root.nest_associative();

    log::info!(
        "Evaluating {} operation(s) on {} worker(s)",
        root.pending_operations(),
        config.pool.num_workers
    );

    let mut engine = LinearAlgebraEngine::new(config).context("Failed to start engine")?;
    let result = engine
        .evaluate(root)
        .context("Failed to evaluate expression")?;
    engine.shutdown();

    if args.report {
        log::info!("Worker report:\n{}", engine.worker_report());
    }

    let json = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write result {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
