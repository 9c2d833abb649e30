use anyhow::{Context, Result};
use cbn_cli::{
    diff_command, ingest_command, init_tracing, read_network, run_chat, seed_command, LogFormat,
};
use cbn_core::{AppConfig, Orchestrator};
use cbn_diff::DiffPolicy;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

fn cli() -> Command {
    Command::new("cbn")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build causal Bayesian networks in conversation with an LLM")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level unless RUST_LOG is set"),
        )
        .subcommand(
            Command::new("chat")
                .about("Start an interactive session")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                ),
        )
        .subcommand(
            Command::new("seed")
                .about("Print the seed network")
                .arg(
                    Arg::new("mermaid")
                        .long("mermaid")
                        .action(ArgAction::SetTrue)
                        .help("Print as a Mermaid flowchart instead of JSON"),
                ),
        )
        .subcommand(
            Command::new("ingest")
                .about("Run a saved agent reply through the ingestion pipeline")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File holding the raw reply text"),
                )
                .arg(
                    Arg::new("network")
                        .long("network")
                        .value_parser(value_parser!(PathBuf))
                        .help("Current network JSON (defaults to the seed)"),
                )
                .arg(audit_arg()),
        )
        .subcommand(
            Command::new("diff")
                .about("Describe the changes between two network files")
                .arg(
                    Arg::new("previous")
                        .long("previous")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("candidate")
                        .long("candidate")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(audit_arg()),
        )
}

fn audit_arg() -> Arg {
    Arg::new("audit")
        .long("audit")
        .action(ArgAction::SetTrue)
        .help("Also report removed nodes and edges")
}

fn policy(args: &ArgMatches) -> DiffPolicy {
    if args.get_flag("audit") {
        DiffPolicy::Audit
    } else {
        DiffPolicy::Narrative
    }
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing --{name}"))
}

async fn chat(args: &ArgMatches) -> Result<()> {
    let config = AppConfig::load(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let orchestrator = Orchestrator::from_config(config)?;
    info!(session = %orchestrator.session_id().await, "chat started");

    let mut stdout = std::io::stdout();
    run_chat(&orchestrator, BufReader::new(tokio::io::stdin()), &mut stdout).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let format = if matches.get_flag("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(format, matches.get_flag("verbose"));

    let mut stdout = std::io::stdout().lock();
    match matches.subcommand() {
        Some(("chat", args)) => {
            drop(stdout);
            chat(args).await
        }
        Some(("seed", args)) => seed_command(&mut stdout, args.get_flag("mermaid")),
        Some(("ingest", args)) => {
            let path = required_path(args, "file")?;
            let reply = std::fs::read_to_string(path)
                .with_context(|| format!("reading reply {}", path.display()))?;
            let current = args
                .get_one::<PathBuf>("network")
                .map(|path| read_network(path))
                .transpose()?;
            ingest_command(&mut stdout, &reply, current, policy(args))
        }
        Some(("diff", args)) => {
            let previous = read_network(required_path(args, "previous")?)?;
            let candidate = read_network(required_path(args, "candidate")?)?;
            diff_command(&mut stdout, &previous, &candidate, policy(args))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn diff_requires_both_files() {
        assert!(cli()
            .try_get_matches_from(["cbn", "diff", "--previous", "a.json"])
            .is_err());
        let matches = cli()
            .try_get_matches_from(["cbn", "diff", "--previous", "a", "--candidate", "b", "--audit"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(policy(args), DiffPolicy::Audit);
    }
}
