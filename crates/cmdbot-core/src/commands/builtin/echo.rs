use crate::commands::{CommandHandler, Invocation};
use crate::transport::SendOptions;
use async_trait::async_trait;

/// Replies with its arguments.
pub struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    async fn execute(&self, invocation: Invocation) -> anyhow::Result<()> {
        let ctx = &invocation.ctx;
        if invocation.args.is_empty() {
            ctx.syntax(Some(invocation.command.name()), None, None)
                .await;
            return Ok(());
        }
        ctx.reply(&invocation.args.join(" "), SendOptions::default())
            .await;
        Ok(())
    }
}
