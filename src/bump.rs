use poise::serenity_prelude as serenity;

/// Scope id used when counts are not split per server.
pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    PerGuild,
    Global,
}

impl ScopeMode {
    /// Resolves the scope id for a guild, `None` when per-guild counting is on
    /// and there is no guild (DMs).
    pub fn scope_id(&self, guild_id: Option<u64>) -> Option<String> {
        match self {
            ScopeMode::PerGuild => guild_id.map(|id| id.to_string()),
            ScopeMode::Global => Some(GLOBAL_SCOPE.to_string()),
        }
    }
}

/// What counts as a successful bump.
#[derive(Debug, Clone)]
pub struct BumpRules {
    pub tracked_bot_id: u64,
    pub success_marker: String,
    pub image_counts_as_bump: bool,
    pub scope: ScopeMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedView {
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// The parts of a Discord message the classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BumpMessage {
    pub author_id: u64,
    /// User who ran the slash command the tracked bot is answering.
    pub invoker_id: Option<u64>,
    pub guild_id: Option<u64>,
    pub embeds: Vec<EmbedView>,
}

/// Who ran the command a message answers. Falls back to the legacy
/// `interaction` field for payloads that only carry that one.
#[allow(deprecated)]
fn invoker_of(msg: &serenity::Message) -> Option<u64> {
    let from_metadata = msg.interaction_metadata.as_deref().and_then(|metadata| match metadata {
        serenity::MessageInteractionMetadata::Command(command) => Some(command.user.id),
        serenity::MessageInteractionMetadata::Component(component) => Some(component.user.id),
        serenity::MessageInteractionMetadata::ModalSubmit(modal) => Some(modal.user.id),
        _ => None,
    });

    from_metadata
        .or_else(|| msg.interaction.as_ref().map(|interaction| interaction.user.id))
        .map(|id| id.get())
}

impl BumpMessage {
    pub fn from_message(msg: &serenity::Message) -> Self {
        BumpMessage {
            author_id: msg.author.id.get(),
            invoker_id: invoker_of(msg),
            guild_id: msg.guild_id.map(|id| id.get()),
            embeds: msg
                .embeds
                .iter()
                .map(|embed| EmbedView {
                    description: embed.description.clone(),
                    image_url: embed.image.as_ref().map(|image| image.url.clone()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    NoMatch,
    Match {
        acting_user_id: String,
        scope_id: String,
    },
}

impl BumpRules {
    pub fn classify(&self, message: &BumpMessage) -> Classification {
        if message.author_id != self.tracked_bot_id {
            return Classification::NoMatch;
        }

        // The tracked bot posts on behalf of whoever ran its command
        let Some(invoker_id) = message.invoker_id else {
            return Classification::NoMatch;
        };

        if !message.embeds.iter().any(|embed| self.is_success_embed(embed)) {
            return Classification::NoMatch;
        }

        match self.scope.scope_id(message.guild_id) {
            Some(scope_id) => Classification::Match {
                acting_user_id: invoker_id.to_string(),
                scope_id,
            },
            None => Classification::NoMatch,
        }
    }

    fn is_success_embed(&self, embed: &EmbedView) -> bool {
        let has_marker = embed
            .description
            .as_deref()
            .map_or(false, |text| text.contains(&self.success_marker));

        has_marker || (self.image_counts_as_bump && embed.image_url.is_some())
    }
}
