use crate::commands::{CommandHandler, Invocation};
use crate::storage::Removal;
use crate::transport::SendOptions;
use async_trait::async_trait;
use tracing::info;

/// Deletes everything stored about the sender.
pub struct Forget;

#[async_trait]
impl CommandHandler for Forget {
    async fn execute(&self, invocation: Invocation) -> anyhow::Result<()> {
        let ctx = &invocation.ctx;
        let Some(user_id) = ctx.event().sender_id() else {
            return Ok(());
        };

        let text = match ctx.users().delete(user_id).await? {
            Removal::Found => {
                info!("User {user_id} removed their stored data");
                "Your data has been removed."
            }
            Removal::NotFound => "I had nothing stored about you.",
        };
        ctx.reply(text, SendOptions::default()).await;
        Ok(())
    }
}
