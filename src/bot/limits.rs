//! Discord length limits and the truncation applied before anything is sent.
//!
//! Discord rejects a whole message, embed or autocomplete list when a single piece of
//! text is over its limit, so user-supplied text is cut to fit at every view.

/// Message content.
pub const MESSAGE_CHARS: usize = 2000;
/// Embed title.
pub const EMBED_TITLE_CHARS: usize = 256;
/// Embed field name.
pub const EMBED_FIELD_NAME_CHARS: usize = 256;
/// Embed field value.
pub const EMBED_FIELD_VALUE_CHARS: usize = 1024;
/// Fields in one embed.
pub const EMBED_FIELDS: usize = 25;
/// Autocomplete choice name and value.
pub const CHOICE_CHARS: usize = 100;
/// A single free-text value inside a longer message, such as a creditor in a list row.
pub const INLINE_VALUE_CHARS: usize = 200;

const ELLIPSIS: char = '…';

/// Cuts `text` to at most `max` characters, ending in an ellipsis when anything was cut.
///
/// Counts `char`s, never splitting one. `max == 0` yields an empty string.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push(ELLIPSIS);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(truncate_chars("Bar Pepe", 100), "Bar Pepe");
        assert_eq!(truncate_chars("", 10), "");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn test_long_text_is_cut_to_the_limit() {
        let long = "x".repeat(2100);
        let cut = truncate_chars(&long, MESSAGE_CHARS);

        assert_eq!(cut.chars().count(), MESSAGE_CHARS);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate_chars("abcd", 3), "ab…");
        assert_eq!(truncate_chars("abcd", 0), "");
    }

    #[test]
    fn test_multibyte_text_is_counted_in_chars() {
        let name = "María García Pérez";
        let cut = truncate_chars(name, 6);

        assert_eq!(cut, "María…");
        assert_eq!(cut.chars().count(), 6);
    }
}
