mod audit;
mod logging;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(name = "relaybot", about = "Discord gateway event and component router")]
struct Cli {
    /// Config file (defaults to ~/.relaybot/config.json5)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and route gateway events until Ctrl-C
    Run,
    /// Print the resolved configuration with the token redacted
    Config,
    /// Check the configuration without connecting
    Health,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, source) = relaybot_config::load_config_with_source(cli.config.as_deref())?;

    logging::init(&config.log);
    debug!(
        path = %source.path.display(),
        file_found = source.file_found,
        token_from_env = source.token_from_env,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Run => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run::run_bot(config))?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        Commands::Health => {
            println!("relaybot configuration");
            println!(
                "  bot token: {}",
                if config.discord.bot_token.is_some() {
                    "configured"
                } else {
                    "missing"
                }
            );
            match relaybot_discord::parse_intents(&config.discord.intents) {
                Ok(intents) => println!("  intents: {intents:?}"),
                Err(e) => println!("  intents: invalid ({e})"),
            }
            println!(
                "  duplicate custom ids: {:?}",
                config.components.duplicate_policy
            );
            println!("  concurrency: {:?}", config.components.concurrency);
            match config.components.default_ttl_secs {
                Some(secs) => println!("  default component ttl: {secs}s"),
                None => println!("  default component ttl: none"),
            }
        }
    }

    Ok(())
}
