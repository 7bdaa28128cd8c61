use std::io;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser};

use azdo::{
    Args, AzureDevOpsClient, Config, Context,
    commands::{self, ExitCode},
    git::GitCli,
    logging::{LogConfig, init_logging},
};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::Success.into(),
        Err(e) => {
            let code = ExitCode::for_error(&e);
            if code == ExitCode::NoResults {
                eprintln!("{:#}", e);
            } else {
                eprintln!("Error: {:#}", e);
            }
            code.into()
        }
    }
}

async fn run(args: Args) -> Result<()> {
    // Handle --create-config flag
    if args.create_config {
        let path = Config::create_sample_config()?;
        println!("Configuration file: {}", path.display());
        return Ok(());
    }

    let Some(command) = &args.command else {
        Args::command()
            .print_help()
            .context("Failed to print help")?;
        return Ok(());
    };

    let _log_guard = init_logging(LogConfig::resolve(
        args.global.log_level,
        args.global.log_file.clone(),
        args.global.log_format,
    ))?;

    // CLI arguments win over environment variables, which win over the config file
    let config = Arc::new(
        Config::default()
            .merge(Config::load_from_file()?)
            .merge(Config::load_from_env())
            .merge(Config::from_args(&args)),
    );
    if let Some(organization) = &config.default_organization {
        tracing::debug!(
            organization = %organization,
            source = %organization.origin(),
            "Default organization"
        );
    }

    let protocol = config.git_protocol();
    let repo_dir = std::env::current_dir().context("Failed to determine current directory")?;
    let context = Context::new(
        config.clone(),
        Arc::new(GitCli::new(repo_dir)),
        Arc::new(AzureDevOpsClient::new(config)),
    )
    .with_repo_override(args.global.repo.as_deref())?;

    let result = commands::run(command, &context, protocol, &mut io::stdout()).await;
    if let Err(e) = &result {
        tracing::debug!(error = %format!("{:#}", e), "Command failed");
    }
    result
}
