use poise::serenity_prelude as serenity;
use tracing::error;

use crate::{Context, Error, database::{BumpRecord, Database}};
use super::{command_scope, private_reply};

pub const LEADERBOARD_SIZE: u32 = 10;

fn rank_badge(index: usize) -> &'static str {
    match index {
        0 => "🥇",
        1 => "🥈",
        2 => "🥉",
        _ => "🔹",
    }
}

/// One line per entry, 1-indexed. `None` when there is nothing to show.
pub fn render_leaderboard(entries: &[(String, i64)]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    let mut text = String::new();
    for (index, (user_id, count)) in entries.iter().enumerate() {
        text.push_str(&format!(
            "**{}.** {} <@{}> : `{} bumps`\n",
            index + 1,
            rank_badge(index),
            user_id,
            count
        ));
    }
    Some(text)
}

pub fn render_personal_stats(user_id: &str, count: i64, record: Option<&BumpRecord>) -> String {
    let mut response = format!(
        "Hi <@{}>, you have **{} bumps** in this server.",
        user_id, count
    );
    if let Some(record) = record {
        response.push_str(&format!(
            "\nLast bump: <t:{}:R>",
            record.last_bumped_at.timestamp()
        ));
    }
    response
}

/// Text for `/my-stats`, read with a single lookup of the user's record.
pub async fn personal_stats(database: &Database, user_id: &str, scope_id: &str) -> Result<String, sqlx::Error> {
    let record = database.get_record(user_id, scope_id).await?;
    let count = record.as_ref().map_or(0, |r| r.count);
    Ok(render_personal_stats(user_id, count, record.as_ref()))
}

/// Top 10 users with the most bumps in this server
#[poise::command(slash_command)]
pub async fn ranking(ctx: Context<'_>) -> Result<(), Error> {
    let Some(scope_id) = command_scope(ctx).await? else {
        return Ok(());
    };

    let entries = match ctx.data().database.top(&scope_id, LEADERBOARD_SIZE).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error getting leaderboard for {}: {}", scope_id, e);
            ctx.say("Error retrieving the ranking. Please try again.").await?;
            return Ok(());
        }
    };

    let Some(text) = render_leaderboard(&entries) else {
        ctx.send(private_reply("📭 No bumps recorded in this server yet.")).await?;
        return Ok(());
    };

    let guild_name = match ctx.partial_guild().await {
        Some(guild) => guild.name,
        None => "this server".to_string(),
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("🏆 Local Ranking - {}", guild_name))
        .colour(serenity::Colour::GOLD)
        .field(format!("Top {}", LEADERBOARD_SIZE), text, false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// See your bump stats in this server
#[poise::command(slash_command, rename = "my-stats")]
pub async fn my_stats(ctx: Context<'_>) -> Result<(), Error> {
    let Some(scope_id) = command_scope(ctx).await? else {
        return Ok(());
    };
    let user_id = ctx.author().id.to_string();

    let response = match personal_stats(&ctx.data().database, &user_id, &scope_id).await {
        Ok(text) => text,
        Err(e) => {
            error!("Error getting bump stats for {}: {}", user_id, e);
            "Error retrieving your stats. Please try again.".to_string()
        }
    };

    ctx.send(private_reply(response)).await?;
    Ok(())
}
