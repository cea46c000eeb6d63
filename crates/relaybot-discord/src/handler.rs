//! Serenity EventHandler that forwards gateway events into the hook registry
//! and component interactions into the dispatch table.

use std::sync::Arc;

use serenity::all::{
    ChannelId, Context, EventHandler, GuildChannel, GuildId, GuildMemberUpdateEvent, Interaction,
    InviteCreateEvent, Member, Message, MessageId, MessageUpdateEvent, Ready, Role, RoleId, User,
    VoiceState,
};
use serenity::async_trait;
use tracing::{debug, info, warn};

use relaybot_components::ComponentTable;
use relaybot_hooks::HookRegistry;
use relaybot_hooks::events as hook;
use relaybot_types::{
    ChannelChange, GuildBan, MemberChange, MemberRemoval, MessageDeletion, RoleDeletion,
    VoiceStateChange,
};

use crate::component::DiscordComponent;
use crate::convert;
use crate::router::{RouterOptions, route_component};

/// Serenity event handler bridging Discord events into relaybot.
pub struct RelayHandler {
    pub hooks: Arc<HookRegistry>,
    pub components: Arc<ComponentTable<DiscordComponent>>,
    pub options: RouterOptions,
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = ready.user.name,
            guilds = ready.guilds.len(),
            "Discord bot connected and ready"
        );
        self.hooks.emit::<hook::Ready>(convert::ready(&ready)).await;
    }

    async fn channel_create(&self, _ctx: Context, channel: GuildChannel) {
        self.hooks
            .emit::<hook::ChannelCreate>(convert::channel(&channel))
            .await;
    }

    async fn channel_update(&self, _ctx: Context, old: Option<GuildChannel>, new: GuildChannel) {
        let change = ChannelChange {
            old: old.as_ref().map(convert::channel),
            new: convert::channel(&new),
        };
        self.hooks.emit::<hook::ChannelUpdate>(change).await;
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        self.hooks
            .emit::<hook::ChannelDelete>(convert::channel(&channel))
            .await;
    }

    async fn guild_ban_addition(&self, _ctx: Context, guild_id: GuildId, banned_user: User) {
        let ban = GuildBan {
            guild_id: guild_id.get(),
            user: convert::user_ref(&banned_user),
        };
        self.hooks.emit::<hook::GuildBanAdd>(ban).await;
    }

    async fn guild_ban_removal(&self, _ctx: Context, guild_id: GuildId, unbanned_user: User) {
        let ban = GuildBan {
            guild_id: guild_id.get(),
            user: convert::user_ref(&unbanned_user),
        };
        self.hooks.emit::<hook::GuildBanRemove>(ban).await;
    }

    async fn guild_member_addition(&self, _ctx: Context, new_member: Member) {
        self.hooks
            .emit::<hook::GuildMemberAdd>(convert::member(&new_member))
            .await;
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        old_if_available: Option<Member>,
        new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        let change = MemberChange {
            old: old_if_available.as_ref().map(convert::member),
            new: match new {
                Some(member) => convert::member(&member),
                None => convert::member_update(&event),
            },
        };
        self.hooks.emit::<hook::GuildMemberUpdate>(change).await;
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        member_data_if_available: Option<Member>,
    ) {
        let removal = MemberRemoval {
            guild_id: guild_id.get(),
            user: convert::user_ref(&user),
            member: member_data_if_available.as_ref().map(convert::member),
        };
        self.hooks.emit::<hook::GuildMemberRemove>(removal).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        self.hooks
            .emit::<hook::MessageCreate>(convert::message(&msg))
            .await;
    }

    async fn message_update(
        &self,
        _ctx: Context,
        old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let change = convert::message_update(&event, old_if_available.as_ref());
        self.hooks.emit::<hook::MessageUpdate>(change).await;
    }

    async fn message_delete(
        &self,
        _ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let deletion = MessageDeletion {
            id: deleted_message_id.get(),
            channel_id: channel_id.get(),
            guild_id: guild_id.map(|id| id.get()),
        };
        self.hooks.emit::<hook::MessageDelete>(deletion).await;
    }

    async fn guild_role_create(&self, _ctx: Context, new: Role) {
        self.hooks
            .emit::<hook::RoleCreate>(convert::role(&new))
            .await;
    }

    async fn guild_role_delete(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        removed_role_id: RoleId,
        removed_role_data_if_available: Option<Role>,
    ) {
        let deletion = RoleDeletion {
            guild_id: guild_id.get(),
            role_id: removed_role_id.get(),
            role: removed_role_data_if_available.as_ref().map(convert::role),
        };
        self.hooks.emit::<hook::RoleDelete>(deletion).await;
    }

    async fn invite_create(&self, _ctx: Context, data: InviteCreateEvent) {
        self.hooks
            .emit::<hook::InviteCreate>(convert::invite(&data))
            .await;
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let change = VoiceStateChange {
            user_id: new.user_id.get(),
            guild_id: new.guild_id.map(|id| id.get()),
            old_channel_id: old.and_then(|state| state.channel_id).map(|id| id.get()),
            new_channel_id: new.channel_id.map(|id| id.get()),
        };
        self.hooks.emit::<hook::VoiceStateUpdate>(change).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        // Slash commands and autocomplete belong to the command framework
        let Some(component) = DiscordComponent::from_interaction(ctx, interaction) else {
            return;
        };

        let outcome = route_component(
            &self.components,
            component.clone(),
            self.options.claim_unknown,
        )
        .await;

        let Some(reply) = self.options.reply_for(outcome) else {
            return;
        };

        debug!(?outcome, user_id = %component.user().id, "Answering component interaction");
        if let Err(e) = component.reply_ephemeral(reply).await {
            warn!(?outcome, "Failed to answer component interaction: {e}");
        }
    }
}
