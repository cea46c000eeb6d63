//! Discord gateway adapters for relaybot.
//!
//! Uses serenity to connect to the Discord Gateway. Gateway events are
//! converted into relaybot payloads and emitted on the [`HookRegistry`];
//! component interactions are routed through the [`ComponentTable`].
//!
//! # Configuration
//!
//! ```json5
//! {
//!   discord: {
//!     bot_token: "MTIzNDU2Nzg5...",
//!     intents: ["guilds", "guild_members", "guild_moderation"],
//!   },
//! }
//! ```

pub mod component;
pub mod convert;
pub mod handler;
pub mod router;

use std::sync::Arc;

use anyhow::{Context, bail};
use serenity::Client;
use serenity::all::GatewayIntents;
use serenity::gateway::ShardManager;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use relaybot_components::ComponentTable;
use relaybot_hooks::HookRegistry;
use relaybot_types::BotStatus;

pub use component::{ComponentSource, DiscordComponent};
pub use router::{RouteOutcome, RouterOptions, route_component};

/// Parse gateway intent names from configuration.
pub fn parse_intents(names: &[String]) -> anyhow::Result<GatewayIntents> {
    let mut intents = GatewayIntents::empty();
    for name in names {
        intents |= match name.trim().to_ascii_lowercase().as_str() {
            "guilds" => GatewayIntents::GUILDS,
            "guild_members" => GatewayIntents::GUILD_MEMBERS,
            "guild_moderation" => GatewayIntents::GUILD_MODERATION,
            "guild_invites" => GatewayIntents::GUILD_INVITES,
            "guild_voice_states" => GatewayIntents::GUILD_VOICE_STATES,
            "guild_messages" => GatewayIntents::GUILD_MESSAGES,
            "direct_messages" => GatewayIntents::DIRECT_MESSAGES,
            "message_content" => GatewayIntents::MESSAGE_CONTENT,
            other => bail!("Unknown gateway intent: {other}"),
        };
    }
    Ok(intents)
}

/// Owns the serenity client for one bot token.
pub struct DiscordBot {
    token: String,
    intents: GatewayIntents,
    hooks: Arc<HookRegistry>,
    components: Arc<ComponentTable<DiscordComponent>>,
    options: RouterOptions,
    state: Mutex<BotState>,
}

struct BotState {
    status: BotStatus,
    client_handle: Option<JoinHandle<()>>,
    /// Serenity shard manager for graceful shutdown.
    shard_manager: Option<Arc<ShardManager>>,
}

impl DiscordBot {
    pub fn new(
        token: String,
        intents: GatewayIntents,
        hooks: Arc<HookRegistry>,
        components: Arc<ComponentTable<DiscordComponent>>,
        options: RouterOptions,
    ) -> Self {
        Self {
            token,
            intents,
            hooks,
            components,
            options,
            state: Mutex::new(BotState {
                status: BotStatus::Stopped,
                client_handle: None,
                shard_manager: None,
            }),
        }
    }

    /// Connect to the gateway and start forwarding events.
    pub async fn start(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.status == BotStatus::Running {
            bail!("Discord bot is already running");
        }

        state.status = BotStatus::Starting;

        let event_handler = handler::RelayHandler {
            hooks: self.hooks.clone(),
            components: self.components.clone(),
            options: self.options.clone(),
        };

        let mut client = match Client::builder(&self.token, self.intents)
            .event_handler(event_handler)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                state.status = BotStatus::Error(e.to_string());
                return Err(e).context("Failed to create Discord client");
            }
        };

        let shard_manager = client.shard_manager.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = client.start().await {
                tracing::error!("Discord client error: {e}");
            }
        });

        state.shard_manager = Some(shard_manager);
        state.client_handle = Some(handle);
        state.status = BotStatus::Running;

        info!(intents = ?self.intents, "Discord bot started");

        Ok(())
    }

    /// Shut down all shards and wait for the client task to finish.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(shard_manager) = state.shard_manager.take() {
            shard_manager.shutdown_all().await;
        }

        if let Some(handle) = state.client_handle.take() {
            let _ = handle.await;
        }

        state.status = BotStatus::Stopped;

        info!("Discord bot stopped");

        Ok(())
    }

    pub fn status(&self) -> BotStatus {
        match self.state.try_lock() {
            Ok(state) => state.status.clone(),
            Err(_) => BotStatus::Starting,
        }
    }
}
