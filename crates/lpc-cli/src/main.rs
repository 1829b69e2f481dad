use anyhow::Result;
use lpc_cli::{command, commands, init_logging, LogFormat};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = command().get_matches();

    let format = matches
        .get_one::<LogFormat>("log-format")
        .copied()
        .unwrap_or_default();
    init_logging(format);

    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);

    match matches.subcommand() {
        Some(("reconcile", args)) => {
            let config = commands::load_config(config_path)?;
            let state = required_path(args, "state")?;
            let report = commands::reconcile(&config, state).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("watch", args)) => {
            let config = commands::load_config(config_path)?;
            let state = required_path(args, "state")?;
            let max_passes = args.get_one::<u64>("max-passes").copied();
            let passes = commands::watch(&config, state, max_passes).await?;
            tracing::info!(passes, "watch stopped");
        }
        Some(("observe", args)) => {
            let config = commands::load_config(config_path)?;
            let state = required_path(args, "state")?;
            let existing = args.get_one::<PathBuf>("existing").map(PathBuf::as_path);
            let observation = commands::observe(&config, state, existing).await?;
            println!("{}", serde_json::to_string_pretty(&observation)?);
        }
        Some(("resolve", args)) => {
            let raw = args
                .get_one::<String>("profile")
                .map(String::as_str)
                .unwrap_or_default();
            let parameters = commands::resolve(raw)?;
            println!("{}", serde_json::to_string_pretty(&parameters)?);
        }
        Some(("validate-config", args)) => {
            let config = commands::validate_config(config_path)?;
            if args.get_flag("print") {
                print!("{}", toml::to_string_pretty(&config)?);
            } else {
                println!("configuration ok");
            }
        }
        _ => {}
    }

    Ok(())
}

fn required_path<'a>(args: &'a clap::ArgMatches, name: &str) -> Result<&'a std::path::Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .ok_or_else(|| anyhow::anyhow!("--{name} is required"))
}

