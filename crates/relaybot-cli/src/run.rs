use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use relaybot_components::{ComponentTable, DispatchPolicy};
use relaybot_config::{ComponentConfig, RelayBotConfig};
use relaybot_discord::{DiscordBot, DiscordComponent, RouterOptions, parse_intents};
use relaybot_hooks::HookRegistry;

/// Table policy from the `components` config section.
pub fn dispatch_policy(config: &ComponentConfig) -> DispatchPolicy {
    DispatchPolicy {
        duplicates: config.duplicate_policy,
        concurrency: config.concurrency,
        default_ttl: config.default_ttl_secs.map(Duration::from_secs),
    }
}

fn router_options(config: &ComponentConfig) -> RouterOptions {
    RouterOptions {
        claim_unknown: config.claim_unknown,
        stale_message: config.stale_message.clone(),
        busy_message: config.busy_message.clone(),
    }
}

/// Connect to Discord and route events until Ctrl-C.
pub async fn run_bot(config: RelayBotConfig) -> anyhow::Result<()> {
    let token = config
        .discord
        .bot_token
        .clone()
        .filter(|token| !token.trim().is_empty())
        .context("No bot token configured: set DISCORD_TOKEN or discord.bot_token")?;
    let intents = parse_intents(&config.discord.intents)?;

    let hooks = Arc::new(HookRegistry::new());
    let components: Arc<ComponentTable<DiscordComponent>> =
        Arc::new(ComponentTable::new(dispatch_policy(&config.components)));

    crate::audit::install(&hooks);

    let bot = DiscordBot::new(
        token,
        intents,
        hooks.clone(),
        components.clone(),
        router_options(&config.components),
    );
    bot.start().await?;

    info!("relaybot running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    bot.stop().await?;
    hooks.shutdown();
    components.clear();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_types::{ConcurrencyPolicy, DuplicatePolicy};

    #[test]
    fn test_dispatch_policy_from_config() {
        let config = ComponentConfig {
            duplicate_policy: DuplicatePolicy::Overwrite,
            concurrency: ConcurrencyPolicy::SingleFlight,
            default_ttl_secs: Some(900),
            ..ComponentConfig::default()
        };
        let policy = dispatch_policy(&config);
        assert_eq!(policy.duplicates, DuplicatePolicy::Overwrite);
        assert_eq!(policy.concurrency, ConcurrencyPolicy::SingleFlight);
        assert_eq!(policy.default_ttl, Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_dispatch_policy_defaults() {
        let policy = dispatch_policy(&ComponentConfig::default());
        assert_eq!(policy.duplicates, DuplicatePolicy::Reject);
        assert_eq!(policy.default_ttl, None);
    }

    #[test]
    fn test_router_options_from_config() {
        let config = ComponentConfig {
            claim_unknown: false,
            stale_message: "Expired.".into(),
            busy_message: "Hold on.".into(),
            ..ComponentConfig::default()
        };
        let options = router_options(&config);
        assert!(!options.claim_unknown);
        assert_eq!(options.stale_message, "Expired.");
        assert_eq!(options.busy_message, "Hold on.");
    }

    #[tokio::test]
    async fn test_run_bot_requires_token() {
        let err = run_bot(RelayBotConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }
}
