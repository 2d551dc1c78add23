use poise::serenity_prelude as serenity;
use tracing::{debug, error, info};

use crate::bump::{BumpMessage, BumpRules, Classification};
use crate::database::Database;
use crate::{Data, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBump {
    pub user_id: String,
    pub scope_id: String,
    pub count: i64,
}

impl RecordedBump {
    pub fn confirmation(&self) -> String {
        format!(
            "📈 **Bump recorded** | <@{}> now has {} bumps in this server.",
            self.user_id, self.count
        )
    }
}

/// Classifies a message and counts it if it is a bump. `Ok(None)` means the
/// message was not a bump and nothing was written.
pub async fn record_bump(
    database: &Database,
    rules: &BumpRules,
    message: &BumpMessage,
) -> Result<Option<RecordedBump>, sqlx::Error> {
    let Classification::Match { acting_user_id, scope_id } = rules.classify(message) else {
        if message.author_id == rules.tracked_bot_id {
            debug!("Ignoring tracked bot message that is not a successful bump");
        }
        return Ok(None);
    };

    let count = database.increment(&acting_user_id, &scope_id).await?;

    Ok(Some(RecordedBump {
        user_id: acting_user_id,
        scope_id,
        count,
    }))
}

/// Counts a message if it is a bump. Storage failures are logged and the event
/// is dropped, so a failing store never takes the event loop down.
pub async fn process_message(data: &Data, message: &BumpMessage) -> Option<RecordedBump> {
    match record_bump(&data.database, &data.rules, message).await {
        Ok(Some(recorded)) => {
            info!(
                "Bump recorded for {} in {} (total {})",
                recorded.user_id, recorded.scope_id, recorded.count
            );
            Some(recorded)
        }
        Ok(None) => None,
        Err(e) => {
            error!(
                "Failed to record bump for {:?} in {:?}: {}",
                message.invoker_id, message.guild_id, e
            );
            None
        }
    }
}

pub async fn handle_message(ctx: &serenity::Context, msg: &serenity::Message, data: &Data) {
    let message = BumpMessage::from_message(msg);

    let Some(recorded) = process_message(data, &message).await else {
        return;
    };

    if let Err(e) = msg.channel_id.say(&ctx.http, recorded.confirmation()).await {
        error!("Failed to send bump confirmation: {}", e);
    }
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::Message { new_message } => {
            handle_message(ctx, new_message, data).await;
        }
        _ => {}
    }
    Ok(())
}
