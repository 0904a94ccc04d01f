//! Gateway client: registers the guild commands and answers interactions.

use serenity::all::{
    Client, CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseMessage, EventHandler, GatewayIntents,
    GuildId, Interaction, Ready, ResolvedValue,
};
use serenity::async_trait;
use tracing::{error, info, warn};

use reposter_store::CredentialHandle;

use crate::commands::{CommandRouter, OperatorCommand, CURRENT, SESSION_ID_OPTION, UPDATE};
use crate::error::{BotError, BotResult};

/// Slash command definitions registered to the operator guild.
pub fn command_definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(UPDATE)
            .description("Replace the session id used for uploads")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    SESSION_ID_OPTION,
                    "Value of the sessionid cookie",
                )
                .required(true),
            ),
        CreateCommand::new(CURRENT).description("Show the session id in use"),
    ]
}

/// Parse a guild id from config.
pub fn parse_guild_id(raw: &str) -> BotResult<GuildId> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(GuildId::new)
        .ok_or_else(|| BotError::InvalidGuild(raw.to_string()))
}

struct Handler {
    guild_id: GuildId,
    router: CommandRouter,
}

impl Handler {
    async fn reply_for(&self, command: &CommandInteraction) -> String {
        let options: Vec<(&str, &str)> = command
            .data
            .options()
            .into_iter()
            .filter_map(|option| match option.value {
                ResolvedValue::String(value) => Some((option.name, value)),
                _ => None,
            })
            .collect();

        let result = match OperatorCommand::parse(&command.data.name, &options) {
            Ok(parsed) => self.router.execute(parsed).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            warn!(command = %command.data.name, error = %e, "Operator command failed");
            format!("Command failed: {}", e)
        })
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "Bot connected");
        match self
            .guild_id
            .set_commands(&ctx.http, command_definitions())
            .await
        {
            Ok(commands) => info!(
                guild_id = %self.guild_id,
                count = commands.len(),
                "Registered guild commands"
            ),
            Err(e) => error!(guild_id = %self.guild_id, error = %e, "Failed to register commands"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let reply = self.reply_for(&command).await;
        let message = CreateInteractionResponseMessage::new().content(reply);
        if let Err(e) = command
            .create_response(&ctx.http, CreateInteractionResponse::Message(message))
            .await
        {
            warn!(error = %e, "Failed to answer interaction");
        }
    }
}

/// Connect to the gateway and serve commands until the connection ends.
pub async fn run_bot(token: &str, guild_id: GuildId, credentials: CredentialHandle) -> BotResult<()> {
    let handler = Handler {
        guild_id,
        router: CommandRouter::new(credentials),
    };

    let mut client = Client::builder(token, GatewayIntents::GUILDS)
        .event_handler(handler)
        .await?;
    client.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_guild_id() {
        assert_eq!(parse_guild_id("1234").unwrap(), GuildId::new(1234));
        assert_eq!(parse_guild_id(" 99 ").unwrap(), GuildId::new(99));
        assert!(matches!(parse_guild_id("0"), Err(BotError::InvalidGuild(_))));
        assert!(matches!(parse_guild_id("guild"), Err(BotError::InvalidGuild(_))));
    }

    #[test]
    fn test_command_definitions() {
        assert_eq!(command_definitions().len(), 2);
    }
}
