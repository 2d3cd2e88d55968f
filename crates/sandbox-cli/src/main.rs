//! `sandbox-deploy`: rehearse and plan a sandbox deployment
//!
//! `rehearse` runs the full pipeline against an in-memory chain that
//! mirrors the configured production system. No live network backend is
//! wired in yet, so nothing here broadcasts a transaction.

mod render;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sandbox_core::{
    check_network, config::RPC_URL_VAR, outline, rehearsal_network, ArtifactSet,
    DeploymentOptions, DeploymentPlan, Environment, Orchestrator, SandboxConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let config = Arg::new("config")
        .long("config")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Deployment configuration (TOML)");

    Command::new("sandbox-deploy")
        .version(sandbox_core::VERSION)
        .about("Plan and rehearse deploying sandbox programs next to a production system")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("rehearse")
                .about("Deploy and configure the sandbox on an in-memory copy of the chain")
                .arg(config.clone())
                .arg(
                    Arg::new("artifacts")
                        .long("artifacts")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding <Program>.json artifacts"),
                )
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Do not ask for confirmation"),
                )
                .arg(
                    Arg::new("verify-delay-secs")
                        .long("verify-delay-secs")
                        .default_value("20")
                        .value_parser(value_parser!(u64))
                        .help("Seconds to wait before source verification"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the deployment report as JSON"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Print the staged deployment plan and configuration calls")
                .arg(config),
        )
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &ArgMatches) -> Result<SandboxConfig> {
    let path = args
        .get_one::<PathBuf>("config")
        .context("missing --config")?;
    SandboxConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

async fn rehearse(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let env = Environment::from_env();
    let artifacts_dir = args
        .get_one::<PathBuf>("artifacts")
        .context("missing --artifacts")?;
    let verify_delay = args.get_one::<u64>("verify-delay-secs").copied().unwrap_or(20);

    if env.rpc_url.is_some() {
        tracing::warn!("{RPC_URL_VAR} is ignored: rehearsals never leave the in-memory chain");
    }
    let network = Arc::new(rehearsal_network(&config));
    check_network(network.as_ref(), &config).await?;

    println!("{}", config.to_toml_string()?);
    if !args.get_flag("yes") {
        let stdin = std::io::stdin();
        let accepted = render::confirm(&mut stdin.lock(), &mut std::io::stdout())?;
        if !accepted {
            println!("Aborting...");
            return Ok(());
        }
    }

    let artifacts = ArtifactSet::load_dir(artifacts_dir)
        .with_context(|| format!("loading artifacts from {}", artifacts_dir.display()))?;

    let orchestrator = Orchestrator::new(network).with_options(
        DeploymentOptions::default().with_verify_delay(Duration::from_secs(verify_delay)),
    );
    let report = match orchestrator.deploy(&config, &artifacts).await {
        Ok(report) => report,
        Err(e) => {
            let deployed = e.deployed();
            if !deployed.is_empty() {
                eprintln!("Programs deployed before the failure:");
                eprint!("{}", render::programs(&deployed.iter().collect::<Vec<_>>()));
            }
            return Err(e.into());
        }
    };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::report(&report));
    }
    Ok(())
}

fn plan(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let plan = DeploymentPlan::sandbox(&config)?;

    println!("Deployment plan:");
    print!("{plan}");
    println!("\nConfiguration batch:");
    for (i, call) in outline(&config).iter().enumerate() {
        println!("  {i:>2}. {call}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let matches = cli().get_matches();

    let result = match matches.subcommand() {
        Some(("rehearse", args)) => rehearse(args).await,
        Some(("plan", args)) => plan(args),
        _ => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn rehearse_arguments_parse() {
        let matches = cli()
            .try_get_matches_from([
                "sandbox-deploy",
                "rehearse",
                "--config",
                "config/mainnet.toml",
                "--artifacts",
                "build",
                "--yes",
                "--verify-delay-secs",
                "0",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "rehearse");
        assert!(args.get_flag("yes"));
        assert!(!args.get_flag("json"));
        assert_eq!(args.get_one::<u64>("verify-delay-secs"), Some(&0));
    }

    #[test]
    fn rehearse_requires_artifacts() {
        assert!(cli()
            .try_get_matches_from(["sandbox-deploy", "rehearse", "--config", "c.toml"])
            .is_err());
    }

    #[test]
    fn there_is_no_live_deploy_command() {
        assert!(cli()
            .try_get_matches_from(["sandbox-deploy", "deploy", "--config", "c.toml"])
            .is_err());
    }

    #[test]
    fn plan_prints_for_shipped_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mainnet.toml");
        std::fs::write(&path, sandbox_test_utils::MAINNET_TOML).unwrap();
        let matches = cli()
            .try_get_matches_from(["sandbox-deploy", "plan", "--config", path.to_str().unwrap()])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        plan(args).unwrap();
    }

    #[tokio::test]
    async fn rehearse_runs_without_explorer_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mainnet.toml");
        std::fs::write(&config, sandbox_test_utils::MAINNET_TOML).unwrap();
        let artifacts = dir.path().join("artifacts");
        std::fs::create_dir(&artifacts).unwrap();
        sandbox_test_utils::write_fixture_artifacts(&artifacts);

        let matches = cli()
            .try_get_matches_from([
                "sandbox-deploy",
                "rehearse",
                "--config",
                config.to_str().unwrap(),
                "--artifacts",
                artifacts.to_str().unwrap(),
                "--yes",
                "--verify-delay-secs",
                "0",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        rehearse(args).await.unwrap();
    }
}
