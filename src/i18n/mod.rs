//! Internationalization helpers
//!
//! Maps Telegram `language_code` values onto the language names used for
//! content and subscriptions, and holds the few fixed bot texts.

/// Language used when nothing better is known
pub const DEFAULT_LANGUAGE: &str = "English";

/// `language_code` → language name
pub const LANGUAGE_MAPPINGS: &[(&str, &str)] = &[
    ("en", "English"),
    ("ru", "Russian"),
    ("he", "Hebrew"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ar", "Arabic"),
    // Ukrainian and Belarusian readers get Russian content for now
    ("uk", "Russian"),
    ("be", "Russian"),
];

/// Resolve a language name from a Telegram language code.
///
/// Region suffixes (`en-US`, `pt_BR`) are ignored.
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let Some(code) = language_code else {
        return DEFAULT_LANGUAGE;
    };

    let primary = code
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    LANGUAGE_MAPPINGS
        .iter()
        .find(|(key, _)| *key == primary)
        .map(|(_, name)| *name)
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Greeting sent in reply to `/start`
pub fn welcome_text(language: &str, name: &str) -> String {
    match language {
        "Russian" => format!(
            "🕯️ Шалом, {}!\n\nЯ Torah Bot. Напишите «мудрость», чтобы получить мудрость дня, \
             или «викторина», чтобы проверить свои знания. /game откроет Shabbat Runner.",
            name
        ),
        "Hebrew" => format!(
            "🕯️ שלום, {}!\n\nאני Torah Bot. כתבו wisdom לחכמה יומית או quiz לחידון. \
             /game פותח את Shabbat Runner.",
            name
        ),
        _ => format!(
            "🕯️ Shalom, {}!\n\nI'm Torah Bot. Send \"wisdom\" for today's teaching or \
             \"quiz\" to test yourself. /game opens Shabbat Runner.",
            name
        ),
    }
}

/// Confirmation after a (re)subscription
pub fn subscribed_text(language: &str) -> &'static str {
    match language {
        "Russian" => "📧 Вы подписаны на ежедневную рассылку мудрости.",
        _ => "📧 You are subscribed to the daily wisdom newsletter.",
    }
}

/// Reply to `/unsubscribe`; `was_subscribed` picks the wording
pub fn unsubscribed_text(language: &str, was_subscribed: bool) -> &'static str {
    match (language, was_subscribed) {
        ("Russian", true) => "📭 Вы отписались от рассылки.",
        ("Russian", false) => "📭 Вы не были подписаны на рассылку.",
        (_, true) => "📭 You have been unsubscribed from the newsletter.",
        (_, false) => "📭 You were not subscribed to the newsletter.",
    }
}
