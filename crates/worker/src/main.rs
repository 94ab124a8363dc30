use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use copilot_jobs::config::normalize_interpreter;
use copilot_jobs::{EngineConfig, JobEngine};
use copilot_worker::batch::run_batch;

#[derive(Parser)]
#[command(name = "copilot-worker")]
#[command(version)]
#[command(about = "Run several layout generation jobs concurrently and stream their output")]
struct Cli {
    /// Number of jobs to run
    #[arg(long, default_value_t = 3)]
    jobs: usize,

    /// Path to the generator script
    #[arg(long, env = "GENERATOR_SCRIPT", default_value = "data/generator.py")]
    generator: PathBuf,

    /// Parent directory for per-job directories
    #[arg(long, env = "JOBS_DIR", default_value = "jobs")]
    jobs_dir: PathBuf,

    /// Program used to run the script; empty runs it directly
    #[arg(long, env = "GENERATOR_INTERPRETER", default_value = "python3")]
    interpreter: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "copilot_worker=info,copilot_jobs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let generator_script = std::path::absolute(&cli.generator)?;
    let engine = Arc::new(JobEngine::new(EngineConfig {
        jobs_dir: cli.jobs_dir,
        generator_script,
        interpreter: normalize_interpreter(cli.interpreter),
    }));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            println!("{line}");
        }
    });

    let report = run_batch(&engine, cli.jobs, tx).await?;
    printer.await?;

    println!("All jobs completed.");
    for job in &report.jobs {
        println!("{}: {}", job.job_id, job.status);
    }

    let failed = report.failed_count();
    if failed > 0 {
        tracing::warn!(failed, "Some jobs failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
