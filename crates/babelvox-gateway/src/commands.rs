//! Text commands understood by the bot.

pub const TRANSLATE_COMMAND: &str = "/translate_to";

pub const WELCOME_TEXT: &str = "Hi! Welcome to the Translator Bot 🌐\n\
1️⃣ Send your target language using: /translate_to <Language>\n\
2️⃣ Then send your voice note in any language.\n\
The bot will reply with translated audio in your chosen language.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/translate_to <Language>`; `None` when no language was given.
    SetLanguage(Option<String>),
}

/// Parse a text message as a command. The prefix match is ASCII case-insensitive.
///
/// The language is whatever follows the first space after the prefix, trimmed.
pub fn parse_command(text: &str) -> Option<Command> {
    let prefix = text.get(..TRANSLATE_COMMAND.len())?;
    if !prefix.eq_ignore_ascii_case(TRANSLATE_COMMAND) {
        return None;
    }

    let rest = &text[TRANSLATE_COMMAND.len()..];
    let language = rest
        .strip_prefix(' ')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string);
    Some(Command::SetLanguage(language))
}

pub fn confirmation_text(language: &str) -> String {
    format!("Target language set to {language} ✅")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_language() {
        assert_eq!(
            parse_command("/translate_to French"),
            Some(Command::SetLanguage(Some("French".into())))
        );
        assert_eq!(
            parse_command("/TRANSLATE_TO  Brazilian Portuguese  "),
            Some(Command::SetLanguage(Some("Brazilian Portuguese".into())))
        );
    }

    #[test]
    fn test_missing_language() {
        assert_eq!(parse_command("/translate_to"), Some(Command::SetLanguage(None)));
        assert_eq!(parse_command("/translate_to   "), Some(Command::SetLanguage(None)));
        assert_eq!(parse_command("/translate_toFrench"), Some(Command::SetLanguage(None)));
    }

    #[test]
    fn test_not_a_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/translate"), None);
        assert_eq!(parse_command("please /translate_to French"), None);
        assert_eq!(parse_command(""), None);
        // Multi-byte text shorter than the prefix must not panic.
        assert_eq!(parse_command("héllo wörld ✅"), None);
    }

    #[test]
    fn test_confirmation_mentions_language() {
        assert!(confirmation_text("French").contains("French"));
    }

    #[test]
    fn test_welcome_mentions_both_commands() {
        assert!(WELCOME_TEXT.contains(TRANSLATE_COMMAND));
        assert!(WELCOME_TEXT.contains("voice note"));
    }
}
