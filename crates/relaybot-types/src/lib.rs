use std::fmt;

use serde::{Deserialize, Serialize};

// ──────────────────── Gateway Payloads ────────────────────

/// A Discord user, reduced to what subscribers route on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Emitted once the gateway session is established.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyInfo {
    pub user: UserRef,
    pub session_id: String,
    /// Number of guilds the bot was in at connect time.
    pub guild_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
    pub name: String,
    /// Lowercase channel type name (e.g. "text", "voice").
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelChange {
    /// Previous state, only present when the gateway cached it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<ChannelInfo>,
    pub new: ChannelInfo,
}

/// A ban being added to or lifted from a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildBan {
    pub guild_id: u64,
    pub user: UserRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub guild_id: u64,
    pub user: UserRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<u64>,
    /// Join time (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<MemberInfo>,
    pub new: MemberInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRemoval {
    pub guild_id: u64,
    pub user: UserRef,
    /// Cached member data, if the gateway had it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: u64,
    pub channel_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
    pub author: UserRef,
    pub content: String,
    /// Message timestamp (unix millis).
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageChange {
    pub id: u64,
    pub channel_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
    /// New content, absent for embed-only edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<MessageInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeletion {
    pub id: u64,
    pub channel_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: u64,
    pub guild_id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDeletion {
    pub guild_id: u64,
    pub role_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteInfo {
    pub code: String,
    pub channel_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inviter: Option<UserRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateChange {
    pub user_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_channel_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_channel_id: Option<u64>,
}

// ──────────────────── Event Kinds ────────────────────

/// Every gateway event kind the hook registry carries a channel for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Ready,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    GuildBanAdd,
    GuildBanRemove,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    RoleCreate,
    RoleDelete,
    InviteCreate,
    VoiceStateUpdate,
}

impl EventKind {
    pub const ALL: [EventKind; 16] = [
        EventKind::Ready,
        EventKind::ChannelCreate,
        EventKind::ChannelUpdate,
        EventKind::ChannelDelete,
        EventKind::GuildBanAdd,
        EventKind::GuildBanRemove,
        EventKind::GuildMemberAdd,
        EventKind::GuildMemberUpdate,
        EventKind::GuildMemberRemove,
        EventKind::MessageCreate,
        EventKind::MessageUpdate,
        EventKind::MessageDelete,
        EventKind::RoleCreate,
        EventKind::RoleDelete,
        EventKind::InviteCreate,
        EventKind::VoiceStateUpdate,
    ];

    /// Routing name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::ChannelCreate => "channel_create",
            EventKind::ChannelUpdate => "channel_update",
            EventKind::ChannelDelete => "channel_delete",
            EventKind::GuildBanAdd => "guild_ban_add",
            EventKind::GuildBanRemove => "guild_ban_remove",
            EventKind::GuildMemberAdd => "guild_member_add",
            EventKind::GuildMemberUpdate => "guild_member_update",
            EventKind::GuildMemberRemove => "guild_member_remove",
            EventKind::MessageCreate => "message_create",
            EventKind::MessageUpdate => "message_update",
            EventKind::MessageDelete => "message_delete",
            EventKind::RoleCreate => "role_create",
            EventKind::RoleDelete => "role_delete",
            EventKind::InviteCreate => "invite_create",
            EventKind::VoiceStateUpdate => "voice_state_update",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any gateway event with its payload, as seen by wildcard subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    Ready(ReadyInfo),
    ChannelCreate(ChannelInfo),
    ChannelUpdate(ChannelChange),
    ChannelDelete(ChannelInfo),
    GuildBanAdd(GuildBan),
    GuildBanRemove(GuildBan),
    GuildMemberAdd(MemberInfo),
    GuildMemberUpdate(MemberChange),
    GuildMemberRemove(MemberRemoval),
    MessageCreate(MessageInfo),
    MessageUpdate(MessageChange),
    MessageDelete(MessageDeletion),
    RoleCreate(RoleInfo),
    RoleDelete(RoleDeletion),
    InviteCreate(InviteInfo),
    VoiceStateUpdate(VoiceStateChange),
}

impl GatewayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GatewayEvent::Ready(_) => EventKind::Ready,
            GatewayEvent::ChannelCreate(_) => EventKind::ChannelCreate,
            GatewayEvent::ChannelUpdate(_) => EventKind::ChannelUpdate,
            GatewayEvent::ChannelDelete(_) => EventKind::ChannelDelete,
            GatewayEvent::GuildBanAdd(_) => EventKind::GuildBanAdd,
            GatewayEvent::GuildBanRemove(_) => EventKind::GuildBanRemove,
            GatewayEvent::GuildMemberAdd(_) => EventKind::GuildMemberAdd,
            GatewayEvent::GuildMemberUpdate(_) => EventKind::GuildMemberUpdate,
            GatewayEvent::GuildMemberRemove(_) => EventKind::GuildMemberRemove,
            GatewayEvent::MessageCreate(_) => EventKind::MessageCreate,
            GatewayEvent::MessageUpdate(_) => EventKind::MessageUpdate,
            GatewayEvent::MessageDelete(_) => EventKind::MessageDelete,
            GatewayEvent::RoleCreate(_) => EventKind::RoleCreate,
            GatewayEvent::RoleDelete(_) => EventKind::RoleDelete,
            GatewayEvent::InviteCreate(_) => EventKind::InviteCreate,
            GatewayEvent::VoiceStateUpdate(_) => EventKind::VoiceStateUpdate,
        }
    }
}

// ──────────────────── Component Types ────────────────────

/// Kind of interactive component a custom id is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Button,
    StringSelect,
    UserSelect,
    RoleSelect,
    MentionableSelect,
    ChannelSelect,
    /// Modal submission; its custom id is the modal's.
    Modal,
    /// A component type this build does not know about.
    Unknown,
}

impl ComponentKind {
    pub fn is_select(&self) -> bool {
        matches!(
            self,
            ComponentKind::StringSelect
                | ComponentKind::UserSelect
                | ComponentKind::RoleSelect
                | ComponentKind::MentionableSelect
                | ComponentKind::ChannelSelect
        )
    }
}

/// What happens when a custom id is registered while a live entry holds it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the new registration; the existing handler keeps the id.
    #[default]
    Reject,
    /// Replace the existing handler.
    Overwrite,
}

/// Whether one custom id may have several handler invocations in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    #[default]
    Concurrent,
    /// At most one in-progress invocation per custom id.
    SingleFlight,
}

// ──────────────────── Bot Status ────────────────────

/// Lifecycle state of the gateway connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Stopped,
    Starting,
    Running,
    Error(String),
}
