//! Component interactions handed to the dispatch table.

use serenity::all::{
    ChannelId, ComponentInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseMessage, GuildId, Interaction, ModalInteraction, User,
};

use relaybot_components::ComponentContext;
use relaybot_types::ComponentKind;

use crate::convert;

/// The serenity interaction behind a [`DiscordComponent`].
#[derive(Debug, Clone)]
pub enum ComponentSource {
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

/// A button, select menu or modal interaction plus the context to answer it.
#[derive(Clone)]
pub struct DiscordComponent {
    pub ctx: Context,
    pub source: ComponentSource,
    custom_id: String,
    kind: ComponentKind,
}

impl DiscordComponent {
    /// Wrap a component or modal interaction. Other interactions yield `None`.
    pub fn from_interaction(ctx: Context, interaction: Interaction) -> Option<Self> {
        match interaction {
            Interaction::Component(component) => Some(Self {
                custom_id: component.data.custom_id.clone(),
                kind: convert::component_kind(&component.data.kind),
                ctx,
                source: ComponentSource::Component(component),
            }),
            Interaction::Modal(modal) => Some(Self {
                custom_id: modal.data.custom_id.clone(),
                kind: ComponentKind::Modal,
                ctx,
                source: ComponentSource::Modal(modal),
            }),
            _ => None,
        }
    }

    pub fn user(&self) -> &User {
        match &self.source {
            ComponentSource::Component(c) => &c.user,
            ComponentSource::Modal(m) => &m.user,
        }
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        match &self.source {
            ComponentSource::Component(c) => c.guild_id,
            ComponentSource::Modal(m) => m.guild_id,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match &self.source {
            ComponentSource::Component(c) => c.channel_id,
            ComponentSource::Modal(m) => m.channel_id,
        }
    }

    /// Selected select-menu values; empty for buttons and modals.
    pub fn values(&self) -> Vec<String> {
        match &self.source {
            ComponentSource::Component(c) => convert::selected_values(&c.data.kind),
            ComponentSource::Modal(_) => Vec::new(),
        }
    }

    /// Answer the interaction with a message only the clicking user sees.
    pub async fn reply_ephemeral(&self, content: &str) -> serenity::Result<()> {
        let builder = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(content)
                .ephemeral(true),
        );
        match &self.source {
            ComponentSource::Component(c) => c.create_response(&self.ctx.http, builder).await,
            ComponentSource::Modal(m) => m.create_response(&self.ctx.http, builder).await,
        }
    }
}

impl ComponentContext for DiscordComponent {
    fn custom_id(&self) -> &str {
        &self.custom_id
    }

    fn kind(&self) -> ComponentKind {
        self.kind
    }
}
