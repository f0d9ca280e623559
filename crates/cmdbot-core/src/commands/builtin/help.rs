use crate::commands::{
    CommandDescriptor, CommandHandler, CommandRegistry, FollowUp, Invocation,
};
use crate::dispatch::HELP_COMMAND;
use crate::pending::ResumeState;
use crate::transport::SendOptions;
use async_trait::async_trait;
use std::collections::BTreeMap;

const DEFAULT_CATEGORY: &str = "general";

/// Lists commands or shows usage for one; also answers help buttons.
pub struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn execute(&self, invocation: Invocation) -> anyhow::Result<()> {
        let ctx = &invocation.ctx;
        let text = describe(ctx.registry(), ctx.prefix(), invocation.args.first().map(String::as_str));
        ctx.reply(&text, SendOptions::default()).await;
        Ok(())
    }

    async fn on_follow_up(&self, follow_up: FollowUp) -> anyhow::Result<()> {
        let ResumeState::Help { command } = &follow_up.interaction.state else {
            return Ok(());
        };
        let ctx = &follow_up.ctx;
        let target = Some(command.as_str()).filter(|c| *c != HELP_COMMAND);
        let text = describe(ctx.registry(), ctx.prefix(), target);

        let prompt = &follow_up.interaction.response;
        ctx.pending().take(&prompt.message_ref()).await;
        ctx.edit(
            &text,
            prompt.message_id,
            Some(prompt.chat_id),
            SendOptions::default(),
        )
        .await?;
        Ok(())
    }
}

fn describe(registry: &CommandRegistry, prefix: &str, target: Option<&str>) -> String {
    match target {
        None => render_command_list(registry, prefix),
        Some(token) => registry.resolve(token).map_or_else(
            || format!("Command \"{token}\" not found. Send {prefix}help for the list."),
            |command| render_command_help(&command, prefix),
        ),
    }
}

/// Command overview grouped by category.
#[must_use]
pub fn render_command_list(registry: &CommandRegistry, prefix: &str) -> String {
    let mut groups: BTreeMap<&str, Vec<&CommandDescriptor>> = BTreeMap::new();
    for command in registry.commands() {
        let category = command
            .config
            .category
            .as_deref()
            .unwrap_or(DEFAULT_CATEGORY);
        groups.entry(category).or_default().push(command);
    }

    let mut out = String::from("Available commands:\n");
    for (category, commands) in groups {
        out.push_str(&format!("\n[{}]\n", category.to_uppercase()));
        for command in commands {
            out.push_str(&summary_line(command, prefix));
            out.push('\n');
        }
    }
    out.push_str(&format!("\nSend {prefix}help <command> for details."));
    out
}

fn summary_line(command: &CommandDescriptor, prefix: &str) -> String {
    let mut line = format!("{prefix}{}", command.name());
    if !command.config.aliases.is_empty() {
        line.push_str(&format!(" ({})", command.config.aliases.join(", ")));
    }
    if let Some(description) = &command.config.description {
        line.push_str(&format!(" - {description}"));
    }
    line
}

/// Full description of one command.
#[must_use]
pub fn render_command_help(command: &CommandDescriptor, prefix: &str) -> String {
    let mut lines = vec![format!("{prefix}{}", command.name())];
    if !command.config.aliases.is_empty() {
        lines.push(format!("Aliases: {}", command.config.aliases.join(", ")));
    }
    if let Some(description) = &command.config.description {
        lines.push(description.clone());
    }
    if let Some(usage) = command.usage(prefix) {
        lines.push(format!("Usage: {usage}"));
    }
    lines.push(format!(
        "Category: {}",
        command.config.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    ));
    if let Some(cooldown) = command.config.cooldown {
        lines.push(format!("Cooldown: {cooldown}s"));
    }
    if let Some(author) = &command.config.author {
        lines.push(format!("Author: {author}"));
    }
    lines.join("\n")
}
