//! Command token extraction.

use regex::Regex;

/// A command found at the start of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lower-cased command word without prefix.
    pub token: String,
    /// `@botname` suffix, if present.
    pub mention: Option<String>,
    /// Whitespace-separated arguments.
    pub args: Vec<String>,
}

/// Recognises `<prefix><word>[@bot] [args...]`.
#[derive(Debug, Clone)]
pub struct CommandParser {
    pattern: Regex,
    bot_username: Option<String>,
}

impl CommandParser {
    /// Build a parser for `prefix`. Commands addressed to another bot via
    /// `@name` are not ours once `bot_username` is known.
    ///
    /// # Errors
    ///
    /// Returns a `regex::Error` if the pattern cannot be compiled.
    pub fn new(prefix: &str, bot_username: Option<&str>) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"^\s*{}(\w+)(?:@(\w+))?(?:\s|$)",
            regex::escape(prefix)
        ))?;
        Ok(Self {
            pattern,
            bot_username: bot_username
                .map(|name| name.trim_start_matches('@').to_lowercase())
                .filter(|name| !name.is_empty()),
        })
    }

    /// Extract the command from `text`, or `None` if it is not one of ours.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let captures = self.pattern.captures(text)?;
        let token = captures.get(1)?.as_str().to_lowercase();
        let mention = captures.get(2).map(|m| m.as_str().to_string());

        if let (Some(mention), Some(me)) = (&mention, &self.bot_username) {
            if mention.to_lowercase() != *me {
                return None;
            }
        }

        let rest = text.get(captures.get(0)?.end()..).unwrap_or_default();
        Some(ParsedCommand {
            token,
            mention,
            args: rest.split_whitespace().map(str::to_string).collect(),
        })
    }
}
