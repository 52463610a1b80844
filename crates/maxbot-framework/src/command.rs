//! Command prefix matching and routing.
//!
//! The [`CommandRouter`] turns message text such as `"/greet Alice Bob"` into
//! a command name (`"greet"`) and an argument string (`"Alice Bob"`), then
//! invokes every handler registered under that name.
//!
//! # Matching rules
//!
//! Candidate prefixes are the configured prefixes in order, followed by
//! `"@{username} {prefix}"` for each of them when mention prefixes are
//! enabled and the bot username is known. Only the **first** candidate that
//! structurally matches the text is considered: if its command is not
//! registered, routing stops without trying later candidates.

use std::sync::Arc;

use tracing::debug;

use maxbot_core::{Message, UpdateKind};

use crate::bot::Bot;
use crate::context::CommandContext;
use crate::error::{DispatchError, DispatchResult};
use crate::registry::HandlerRegistry;

/// A command extracted from message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The command name as typed.
    pub name: String,
    /// Remaining tokens joined by single spaces.
    pub args: String,
}

/// Strips `prefix` from `text`, comparing per character under the case rule.
fn strip_prefix_normalized<'a>(
    text: &'a str,
    prefix: &str,
    case_sensitive: bool,
) -> Option<&'a str> {
    if case_sensitive {
        return text.strip_prefix(prefix);
    }

    let mut rest = text;
    for expected in prefix.chars() {
        let mut chars = rest.chars();
        let actual = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        rest = chars.as_str();
    }
    Some(rest)
}

/// Parses and routes commands for one bot.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    prefixes: Vec<String>,
    mention_prefix: bool,
    case_sensitive: bool,
}

impl CommandRouter {
    /// Creates a router.
    pub fn new(prefixes: Vec<String>, mention_prefix: bool, case_sensitive: bool) -> Self {
        Self {
            prefixes,
            mention_prefix,
            case_sensitive,
        }
    }

    /// Returns the candidate prefixes for a bot with the given username.
    pub fn candidates(&self, username: Option<&str>) -> Vec<String> {
        let mut candidates = self.prefixes.clone();
        if self.mention_prefix
            && let Some(username) = username
        {
            candidates.extend(
                self.prefixes
                    .iter()
                    .map(|prefix| format!("@{username} {prefix}")),
            );
        }
        candidates
    }

    /// Extracts a command from `text`.
    ///
    /// Returns `None` when no candidate prefix matches, and also when the
    /// first matching candidate is followed only by whitespace.
    pub fn parse(&self, text: &str, username: Option<&str>) -> Option<ParsedCommand> {
        let text_len = text.chars().count();

        for candidate in self.candidates(username) {
            if text_len <= candidate.chars().count() {
                continue;
            }
            let Some(rest) = strip_prefix_normalized(text, &candidate, self.case_sensitive) else {
                continue;
            };

            let mut tokens = rest.split_whitespace();
            let Some(name) = tokens.next() else {
                debug!(prefix = %candidate, "Prefix matched without a command name");
                return None;
            };
            return Some(ParsedCommand {
                name: name.to_owned(),
                args: tokens.collect::<Vec<_>>().join(" "),
            });
        }
        None
    }

    /// Routes `message` to its command handlers.
    ///
    /// Returns the command name if handlers ran, `None` if the message is not
    /// a registered command.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Handler`] from the first failing handler;
    /// later handlers for the same command are skipped.
    pub async fn route(
        &self,
        registry: &HandlerRegistry,
        bot: &Arc<Bot>,
        message: &Message,
        user_locale: Option<&str>,
    ) -> DispatchResult<Option<String>> {
        let username = bot.username();
        let Some(parsed) = self.parse(message.text(), username.as_deref()) else {
            return Ok(None);
        };

        let handlers = registry.command_handlers(&parsed.name);
        if handlers.is_empty() {
            debug!(command = %parsed.name, "Command not handled");
            return Ok(None);
        }

        for handler in handlers {
            let ctx = CommandContext {
                bot: Arc::clone(bot),
                message: message.clone(),
                name: parsed.name.clone(),
                args: parsed.args.clone(),
                user_locale: user_locale.map(str::to_owned),
            };
            handler
                .call(ctx)
                .await
                .map_err(|e| DispatchError::handler(UpdateKind::MessageCreated, e))?;
        }

        debug!(command = %parsed.name, "Command handled");
        Ok(Some(parsed.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(prefixes: &[&str], mention_prefix: bool, case_sensitive: bool) -> CommandRouter {
        CommandRouter::new(
            prefixes.iter().map(|p| p.to_string()).collect(),
            mention_prefix,
            case_sensitive,
        )
    }

    fn parsed(name: &str, args: &str) -> Option<ParsedCommand> {
        Some(ParsedCommand {
            name: name.into(),
            args: args.into(),
        })
    }

    #[test]
    fn test_parse_name_and_args() {
        let r = router(&["/"], false, true);
        assert_eq!(r.parse("/greet Alice Bob", None), parsed("greet", "Alice Bob"));
        assert_eq!(r.parse("/greet", None), parsed("greet", ""));
        assert_eq!(r.parse("/greet   Alice \t Bob ", None), parsed("greet", "Alice Bob"));
    }

    #[test]
    fn test_parse_requires_text_longer_than_prefix() {
        let r = router(&["/"], false, true);
        assert_eq!(r.parse("/", None), None);
        assert_eq!(r.parse("", None), None);
        assert_eq!(r.parse("greet", None), None);
    }

    #[test]
    fn test_parse_whitespace_only_remainder() {
        let r = router(&["/", "!"], false, true);
        assert_eq!(r.parse("/   ", None), None);
    }

    #[test]
    fn test_parse_case_insensitive_prefix() {
        let r = router(&["bot "], false, false);
        assert_eq!(r.parse("BOT help me", None), parsed("help", "me"));

        let r = router(&["bot "], false, true);
        assert_eq!(r.parse("BOT help me", None), None);
    }

    #[test]
    fn test_parse_mention_prefix() {
        let r = router(&["/"], true, true);
        assert_eq!(r.parse("@bot1 /greet x", Some("bot1")), r.parse("/greet x", Some("bot1")));
        assert_eq!(r.parse("@bot1 /greet x", Some("bot1")), parsed("greet", "x"));

        // Unknown username: mention candidates are not generated.
        assert_eq!(r.parse("@bot1 /greet x", None), None);

        let r = router(&["/"], false, true);
        assert_eq!(r.parse("@bot1 /greet x", Some("bot1")), None);
    }

    #[test]
    fn test_candidates_order() {
        let r = router(&["/", "!"], true, true);
        assert_eq!(r.candidates(Some("b")), vec!["/", "!", "@b /", "@b !"]);
    }

    #[test]
    fn test_first_structural_match_wins() {
        // "!" matches "!!x" before "!!" is tried, yielding the command "!x".
        let r = router(&["!", "!!"], false, true);
        assert_eq!(r.parse("!!x", None), parsed("!x", ""));
    }

    #[test]
    fn test_strip_prefix_unicode_case() {
        assert_eq!(strip_prefix_normalized("ПРИВЕТ мир", "привет ", false), Some("мир"));
        assert_eq!(strip_prefix_normalized("ПРИВЕТ мир", "привет ", true), None);
    }
}
