use exambot::{
    bank::{self, Question},
    config::Config,
    Lobby,
};
use tokio::{runtime::Runtime, signal};
use twilight_gateway::{CloseFrame, Event, Intents, Shard, ShardId};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse environment variables and load the bank before serving anything.
    let config = Config::from_env()?;
    let bank = bank::load(&config.bank)?;
    log::info!("loaded {} questions from {}", bank.len(), config.bank.display());

    let runtime = Runtime::new()?;
    runtime.block_on(serve(config, bank))
}

/// The trigger command is served from guild channels and DMs alike.
fn intents() -> Intents {
    Intents::GUILD_MESSAGES | Intents::DIRECT_MESSAGES | Intents::MESSAGE_CONTENT
}

async fn serve(config: Config, bank: Vec<Question>) -> anyhow::Result<()> {
    let api = twilight_http::Client::new(config.token.clone());
    let user = api.current_user().await?.model().await?;
    let lobby = Lobby::new(api, user.id, bank);

    let mut shard = Shard::new(ShardId::ONE, config.token, intents());
    log::info!("bot is running; press Ctrl+C to exit");

    loop {
        let event = tokio::select! {
            biased;
            _ = signal::ctrl_c() => break,
            event = shard.next_event() => event,
        };
        match event {
            Ok(Event::MessageCreate(message)) => {
                // One independent task per command keeps concurrent runs in
                // separate channels from blocking each other.
                let lobby = lobby.clone();
                tokio::spawn(async move { lobby.on_message(message.0).await });
            }
            Ok(Event::InteractionCreate(interaction)) => {
                let lobby = lobby.clone();
                tokio::spawn(async move { lobby.on_component(interaction.0).await });
            }
            Ok(_) => {}
            Err(err) if err.is_fatal() => anyhow::bail!("fatal gateway error: {err}"),
            Err(err) => log::warn!("gateway error: {err}"),
        }
    }

    // In-flight runs are not drained.
    if let Err(err) = shard.close(CloseFrame::NORMAL).await {
        log::warn!("failed to close the gateway session: {err}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribes_to_guild_and_direct_messages() {
        let intents = intents();
        assert!(intents.contains(Intents::GUILD_MESSAGES));
        assert!(intents.contains(Intents::DIRECT_MESSAGES));
        assert!(intents.contains(Intents::MESSAGE_CONTENT));
    }
}
