//! Built-in subscribers that write moderation-relevant gateway events to the
//! `audit` log target.

use tracing::info;

use relaybot_hooks::events::Ready;
use relaybot_hooks::{HookRegistry, Subscription, hook};
use relaybot_types::{GatewayEvent, ReadyInfo};

/// Subscribe the audit log to `hooks`.
pub fn install(hooks: &HookRegistry) -> Vec<Subscription> {
    let ready = hooks.on::<Ready>(hook(|ready: ReadyInfo| async move {
        info!(
            target: "audit",
            user_id = ready.user.id,
            session_id = %ready.session_id,
            guilds = ready.guild_count,
            "Session established"
        );
        Ok(())
    }));

    let any = hooks.on_any(hook(|event: GatewayEvent| async move {
        if let Some(line) = describe(&event) {
            info!(target: "audit", kind = %event.kind(), "{line}");
        }
        Ok(())
    }));

    vec![ready, any]
}

/// One-line description for events worth auditing, `None` for the rest.
pub fn describe(event: &GatewayEvent) -> Option<String> {
    let line = match event {
        GatewayEvent::GuildBanAdd(ban) => {
            format!("User {} ({}) banned from guild {}", ban.user.name, ban.user.id, ban.guild_id)
        }
        GatewayEvent::GuildBanRemove(ban) => format!(
            "User {} ({}) unbanned from guild {}",
            ban.user.name, ban.user.id, ban.guild_id
        ),
        GatewayEvent::GuildMemberRemove(removal) => format!(
            "User {} ({}) left guild {}",
            removal.user.name, removal.user.id, removal.guild_id
        ),
        GatewayEvent::MessageDelete(deletion) => format!(
            "Message {} deleted in channel {}",
            deletion.id, deletion.channel_id
        ),
        GatewayEvent::RoleDelete(deletion) => match &deletion.role {
            Some(role) => format!(
                "Role {} ({}) deleted in guild {}",
                role.name, deletion.role_id, deletion.guild_id
            ),
            None => format!("Role {} deleted in guild {}", deletion.role_id, deletion.guild_id),
        },
        GatewayEvent::ChannelDelete(channel) => {
            format!("Channel #{} ({}) deleted", channel.name, channel.id)
        }
        _ => return None,
    };
    Some(line)
}
