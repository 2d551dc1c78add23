pub mod stats;
pub mod utility;

use crate::{Context, Error};

pub const SERVER_ONLY_REPLY: &str = "This command can only be used in a server!";

/// Reply only the invoking user sees.
pub fn private_reply(content: impl Into<String>) -> poise::CreateReply {
    poise::CreateReply::default().content(content).ephemeral(true)
}

/// Scope the invoking command counts against. Replies and returns `None` when
/// counts are per server and the command was used outside one.
pub async fn command_scope(ctx: Context<'_>) -> Result<Option<String>, Error> {
    let guild_id = ctx.guild_id().map(|id| id.get());

    match ctx.data().rules.scope.scope_id(guild_id) {
        Some(scope_id) => Ok(Some(scope_id)),
        None => {
            ctx.send(private_reply(SERVER_ONLY_REPLY)).await?;
            Ok(None)
        }
    }
}

// Re-export all commands
pub use stats::*;
pub use utility::*;
