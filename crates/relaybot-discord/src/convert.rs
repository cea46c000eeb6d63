//! Conversions from serenity models into relaybot payloads.

use serenity::all::{
    ComponentInteractionDataKind, GuildChannel, GuildMemberUpdateEvent, InviteCreateEvent,
    Member, Message, MessageUpdateEvent, Ready, Role, User,
};

use relaybot_types::{
    ChannelInfo, ComponentKind, InviteInfo, MemberInfo, MessageChange, MessageInfo, ReadyInfo,
    RoleInfo, UserRef,
};

pub fn user_ref(user: &User) -> UserRef {
    UserRef {
        id: user.id.get(),
        name: user.name.clone(),
        global_name: user.global_name.clone(),
        bot: user.bot,
    }
}

pub fn ready(ready: &Ready) -> ReadyInfo {
    ReadyInfo {
        user: UserRef {
            id: ready.user.id.get(),
            name: ready.user.name.clone(),
            global_name: ready.user.global_name.clone(),
            bot: ready.user.bot,
        },
        session_id: ready.session_id.clone(),
        guild_count: ready.guilds.len(),
    }
}

pub fn channel(channel: &GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: channel.id.get(),
        guild_id: Some(channel.guild_id.get()),
        name: channel.name.clone(),
        kind: format!("{:?}", channel.kind).to_lowercase(),
        parent_id: channel.parent_id.map(|id| id.get()),
    }
}

pub fn member(member: &Member) -> MemberInfo {
    MemberInfo {
        guild_id: member.guild_id.get(),
        user: user_ref(&member.user),
        nick: member.nick.clone(),
        roles: member.roles.iter().map(|id| id.get()).collect(),
        joined_at: member.joined_at.map(|ts| ts.unix_timestamp()),
    }
}

/// Fallback for member updates when the gateway sent no full member.
pub fn member_update(event: &GuildMemberUpdateEvent) -> MemberInfo {
    MemberInfo {
        guild_id: event.guild_id.get(),
        user: user_ref(&event.user),
        nick: event.nick.clone(),
        roles: event.roles.iter().map(|id| id.get()).collect(),
        joined_at: None,
    }
}

pub fn message(msg: &Message) -> MessageInfo {
    MessageInfo {
        id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        guild_id: msg.guild_id.map(|id| id.get()),
        author: user_ref(&msg.author),
        content: msg.content.clone(),
        timestamp: msg.timestamp.unix_timestamp() * 1000,
    }
}

pub fn message_update(event: &MessageUpdateEvent, old: Option<&Message>) -> MessageChange {
    MessageChange {
        id: event.id.get(),
        channel_id: event.channel_id.get(),
        guild_id: event.guild_id.map(|id| id.get()),
        content: event.content.clone(),
        old: old.map(message),
    }
}

pub fn role(role: &Role) -> RoleInfo {
    RoleInfo {
        id: role.id.get(),
        guild_id: role.guild_id.get(),
        name: role.name.clone(),
    }
}

pub fn invite(event: &InviteCreateEvent) -> InviteInfo {
    InviteInfo {
        code: event.code.clone(),
        channel_id: event.channel_id.get(),
        guild_id: event.guild_id.map(|id| id.get()),
        inviter: event.inviter.as_ref().map(user_ref),
    }
}

pub fn component_kind(kind: &ComponentInteractionDataKind) -> ComponentKind {
    match kind {
        ComponentInteractionDataKind::Button => ComponentKind::Button,
        ComponentInteractionDataKind::StringSelect { .. } => ComponentKind::StringSelect,
        ComponentInteractionDataKind::UserSelect { .. } => ComponentKind::UserSelect,
        ComponentInteractionDataKind::RoleSelect { .. } => ComponentKind::RoleSelect,
        ComponentInteractionDataKind::MentionableSelect { .. } => {
            ComponentKind::MentionableSelect
        }
        ComponentInteractionDataKind::ChannelSelect { .. } => ComponentKind::ChannelSelect,
        _ => ComponentKind::Unknown,
    }
}

/// Selected values of a select menu as strings; ids are rendered as numbers.
pub fn selected_values(kind: &ComponentInteractionDataKind) -> Vec<String> {
    match kind {
        ComponentInteractionDataKind::StringSelect { values } => values.clone(),
        ComponentInteractionDataKind::UserSelect { values } => {
            values.iter().map(|id| id.get().to_string()).collect()
        }
        ComponentInteractionDataKind::RoleSelect { values } => {
            values.iter().map(|id| id.get().to_string()).collect()
        }
        ComponentInteractionDataKind::MentionableSelect { values } => {
            values.iter().map(|id| id.get().to_string()).collect()
        }
        ComponentInteractionDataKind::ChannelSelect { values } => {
            values.iter().map(|id| id.get().to_string()).collect()
        }
        _ => Vec::new(),
    }
}
