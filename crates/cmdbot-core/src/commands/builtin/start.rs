use crate::commands::{CommandHandler, Invocation};
use crate::transport::SendOptions;
use async_trait::async_trait;
use tracing::info;

/// Records fresh sender and chat profiles and greets the user.
pub struct Start;

#[async_trait]
impl CommandHandler for Start {
    async fn execute(&self, invocation: Invocation) -> anyhow::Result<()> {
        let ctx = &invocation.ctx;
        let event = ctx.event();

        ctx.threads()
            .refresh(event.chat_id(), event.chat.profile()?)
            .await?;

        let Some(sender) = &event.sender else {
            return Ok(());
        };
        ctx.users().refresh(sender.id, sender.profile()?).await?;
        info!("User {} ({}) started the bot", sender.id, sender.first_name);

        let text = format!(
            "Hello, {}! Send {}help to see what I can do.",
            sender.first_name,
            ctx.prefix()
        );
        ctx.reply(&text, SendOptions::default()).await;
        Ok(())
    }
}
