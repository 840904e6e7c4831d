use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use foldergrid::actor::persistence::PersistenceActor;
use foldergrid::common::config::{Config, config_file, state_file};
use foldergrid::common::log;
use foldergrid::scenario::Scenario;
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Resizable folder grid simulator")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a RON scenario against a fresh workspace and print the result.
    Simulate {
        scenario: PathBuf,

        /// Where committed folder states are written. Defaults to the state
        /// file in the data directory.
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Print the report as JSON instead of RON.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();

    if let Err(e) = run(opt) {
        eprintln!("error: {e:?}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if opt.validate {
        let config = Config::read(&config_path);
        match config {
            Ok(_) => println!("Config validation passed"),
            Err(e) => {
                eprintln!("Config validation failed: {e:?}");
                process::exit(1);
            }
        }
        return Ok(());
    }

    let config = Config::read_or_default(&config_path)?;

    match opt.command {
        Some(Commands::Simulate { scenario, out, json }) => {
            let text = std::fs::read_to_string(&scenario)
                .with_context(|| format!("reading scenario {}", scenario.display()))?;
            let scenario = Scenario::parse(&text)
                .with_context(|| format!("parsing scenario {}", scenario.display()))?;

            let out = out.unwrap_or_else(state_file);
            let (writer, persistence) = PersistenceActor::spawn(Some(out.clone()));
            let report = scenario.run(&config, Box::new(writer))?;

            // The workspace (and its sender) is gone, so the actor drains and exits.
            let runtime = tokio::runtime::Builder::new_current_thread().build()?;
            let layout = runtime.block_on(persistence.run());
            info!(path = %out.display(), folders = layout.folders.len(), "Persisted layout");

            let rendered = if json {
                serde_json::to_string_pretty(&report)?
            } else {
                ron::ser::to_string_pretty(&report, ron::ser::PrettyConfig::default())?
            };
            println!("{rendered}");
        }
        None => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
