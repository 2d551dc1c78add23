use crate::{Context, Error};

#[poise::command(slash_command, prefix_command)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let response = format!(
        "Every successful `/bump` is counted for whoever ran it.\n\
        • `/ranking` - Top {} bumpers in this server\n\
        • `/my-stats` - Your bump count in this server\n\
        • `/info` or `!info` - Show this message\n",
        super::LEADERBOARD_SIZE
    );
    ctx.say(response).await?;
    Ok(())
}
