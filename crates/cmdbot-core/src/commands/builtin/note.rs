use crate::commands::{CommandHandler, FollowUp, FollowUpInput, Invocation};
use crate::dispatch::RequestContext;
use crate::storage::{Document, Outcome};
use crate::transport::SendOptions;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Key holding the note in the user document.
pub const NOTE_KEY: &str = "note";

/// Per-user note: `note <text>`, `note`, `note clear`, `note ask`.
pub struct Note;

#[async_trait]
impl CommandHandler for Note {
    async fn execute(&self, invocation: Invocation) -> anyhow::Result<()> {
        let ctx = &invocation.ctx;
        let Some(user_id) = ctx.event().sender_id() else {
            return Ok(());
        };

        match invocation.args.first().map(String::as_str) {
            None => {
                let note = ctx
                    .users()
                    .retrieve(user_id)
                    .await?
                    .and_then(|doc| doc.get(NOTE_KEY).and_then(Value::as_str).map(str::to_string));
                let text = note.map_or_else(
                    || format!("No note saved. Send {}note <text> to save one.", ctx.prefix()),
                    |note| format!("Your note: {note}"),
                );
                ctx.reply(&text, SendOptions::default()).await;
            }
            Some("clear") if invocation.args.len() == 1 => {
                let text = match ctx.users().remove_key(user_id, [NOTE_KEY]).await? {
                    Outcome::Applied => "Note cleared.",
                    Outcome::NotFound => "Nothing to clear.",
                };
                ctx.reply(text, SendOptions::default()).await;
            }
            Some("ask") if invocation.args.len() == 1 => {
                let prompt = ctx
                    .reply(
                        "What should I remember? Reply to this message.",
                        SendOptions::default(),
                    )
                    .await;
                if let Some(prompt) = prompt {
                    ctx.await_reply(&prompt, json!({ "action": "set" })).await;
                }
            }
            Some(_) => save(ctx, user_id, &invocation.args.join(" ")).await?,
        }
        Ok(())
    }

    async fn on_follow_up(&self, follow_up: FollowUp) -> anyhow::Result<()> {
        let FollowUpInput::Reply { text } = &follow_up.input else {
            return Ok(());
        };
        let ctx = &follow_up.ctx;
        let Some(user_id) = ctx.event().sender_id() else {
            return Ok(());
        };
        save(ctx, user_id, text).await
    }
}

async fn save(ctx: &RequestContext, user_id: i64, text: &str) -> anyhow::Result<()> {
    let mut partial = Document::new();
    partial.insert(NOTE_KEY.to_string(), Value::String(text.to_string()));

    ctx.users().merge_or_create(user_id, partial).await?;
    ctx.reply("Saved.", SendOptions::default()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::RequestContext;
    use crate::storage::to_document;
    use crate::testing::{app_with, mock_transport_accepting_all, sample_event};

    #[tokio::test]
    async fn test_save_creates_missing_record() -> anyhow::Result<()> {
        let ctx = RequestContext::new(
            app_with(mock_transport_accepting_all()),
            sample_event("/note milk"),
            "note",
        );

        save(&ctx, 1, "milk").await?;

        assert_eq!(
            ctx.users().retrieve(1).await?.map(Value::Object),
            Some(json!({ "note": "milk" }))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_save_keeps_profile_fields() -> anyhow::Result<()> {
        let ctx = RequestContext::new(
            app_with(mock_transport_accepting_all()),
            sample_event("/note milk"),
            "note",
        );
        ctx.users()
            .refresh(1, to_document(json!({ "id": 1, "first_name": "Ada" }))?)
            .await?;

        save(&ctx, 1, "milk").await?;

        assert_eq!(
            ctx.users().retrieve(1).await?.map(Value::Object),
            Some(json!({ "id": 1, "first_name": "Ada", "isBanned": false, "note": "milk" }))
        );
        Ok(())
    }
}
