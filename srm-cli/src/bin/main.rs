use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use srm_cfg::ConfigSet;
use srm_cli::{Args, report_and_persist};
use srm_core::cfgs::{QUARANTINE_DIR_NAME, all_cfgs};
use srm_core::{Engine, EngineConfig};
use tracing_subscriber::EnvFilter;

/// Prefix of environment variables that override configs, e.g. `SRM_DEFAULT_TTL_SECS`.
static ENV_PREFIX: &str = "SRM";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!srm_ore::env::is_truthy("NO_COLOR"))
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("srm: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, anyhow::Error> {
    let configs = {
        let mut builder = ConfigSet::builder();
        all_cfgs(&mut builder);
        builder.build()
    };
    let overridden = configs.update_from_env(ENV_PREFIX)?;
    if !overridden.is_empty() {
        tracing::info!(?overridden, "configs overridden from the environment");
    }

    if args.show_config {
        print!("{configs}");
        return Ok(ExitCode::SUCCESS);
    }

    let quarantine_root = match &args.root {
        Some(root) => root.clone(),
        None => {
            let Some(home) = srm_ore::env::home_dir() else {
                anyhow::bail!("could not find the home directory, set $HOME or pass --root");
            };
            home.join(QUARANTINE_DIR_NAME.read(&configs).as_str())
        }
    };
    let cwd = std::env::current_dir().context("failed to get the current directory")?;
    let intent = args.intent(cwd)?;

    let mut engine = Engine::new(EngineConfig {
        quarantine_root,
        configs,
    })
    .await?;
    let execution = engine.execute(intent).await;

    let succeeded = report_and_persist(&engine, execution, &mut std::io::stdout().lock()).await;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
