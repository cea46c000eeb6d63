//! Hook event types.
//!
//! Each gateway event kind has a zero-sized marker type implementing
//! [`HookEvent`], which fixes the argument type its subscribers receive.

use std::sync::OnceLock;

use relaybot_types::{
    ChannelChange, ChannelInfo, EventKind, GatewayEvent, GuildBan, InviteInfo, MemberChange,
    MemberInfo, MemberRemoval, MessageChange, MessageDeletion, MessageInfo, ReadyInfo,
    RoleDeletion, RoleInfo, VoiceStateChange,
};

use crate::registry::{ErasedChannel, HookChannel};

/// A gateway event kind with a statically known argument type.
///
/// Sealed: the set of event kinds is fixed by [`EventKind`].
pub trait HookEvent: sealed::Sealed + Send + Sync + 'static {
    const KIND: EventKind;
    type Args: Clone + Send + Sync + 'static;

    /// Wrap the arguments for wildcard subscribers.
    fn wrap(args: Self::Args) -> GatewayEvent;

    #[doc(hidden)]
    fn channel(channels: &EventChannels) -> &HookChannel<Self::Args>;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! hook_events {
    ($($(#[$meta:meta])* $name:ident($args:ty) => $field:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name;

            impl sealed::Sealed for $name {}

            impl HookEvent for $name {
                const KIND: EventKind = EventKind::$name;
                type Args = $args;

                fn wrap(args: Self::Args) -> GatewayEvent {
                    GatewayEvent::$name(args)
                }

                fn channel(channels: &EventChannels) -> &HookChannel<Self::Args> {
                    channels
                        .$field
                        .get_or_init(|| HookChannel::new(Some(EventKind::$name)))
                }
            }
        )*

        /// Per-kind channels, each created on first use.
        #[doc(hidden)]
        #[derive(Default)]
        pub struct EventChannels {
            $($field: OnceLock<HookChannel<$args>>,)*
        }

        impl EventChannels {
            /// The channel for `kind`, if it has been created.
            pub(crate) fn existing(&self, kind: EventKind) -> Option<&dyn ErasedChannel> {
                match kind {
                    $(EventKind::$name => self.$field.get().map(|c| c as &dyn ErasedChannel),)*
                }
            }
        }
    };
}

hook_events! {
    /// The gateway session is ready.
    Ready(ReadyInfo) => ready;
    ChannelCreate(ChannelInfo) => channel_create;
    ChannelUpdate(ChannelChange) => channel_update;
    ChannelDelete(ChannelInfo) => channel_delete;
    /// A user was banned from a guild.
    GuildBanAdd(GuildBan) => guild_ban_add;
    /// A user was unbanned.
    GuildBanRemove(GuildBan) => guild_ban_remove;
    GuildMemberAdd(MemberInfo) => guild_member_add;
    GuildMemberUpdate(MemberChange) => guild_member_update;
    /// A member left, was kicked, or was banned.
    GuildMemberRemove(MemberRemoval) => guild_member_remove;
    MessageCreate(MessageInfo) => message_create;
    MessageUpdate(MessageChange) => message_update;
    MessageDelete(MessageDeletion) => message_delete;
    RoleCreate(RoleInfo) => role_create;
    RoleDelete(RoleDeletion) => role_delete;
    InviteCreate(InviteInfo) => invite_create;
    VoiceStateUpdate(VoiceStateChange) => voice_state_update;
}
