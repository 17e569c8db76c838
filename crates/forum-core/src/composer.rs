//! Message composition: the emoji palette, the draft buffer and the picker.
//!
//! The picker never reaches into the composer on its own. Whoever opens it
//! passes the target explicitly, either the draft being edited or the message
//! being reacted to.

use uuid::Uuid;

/// Emoji offered by the picker and accepted as reactions.
pub const ALLOWED_EMOJIS: [&str; 20] = [
    "👍", "👎", "❤️", "😂", "😮", "😢", "😡", "🔥", "👏", "🎉", "💯", "😍", "🤔", "🌍", "🙄", "🚀",
    "💎", "📈", "💰", "⚡",
];

pub fn is_allowed_emoji(emoji: &str) -> bool {
    ALLOWED_EMOJIS.contains(&emoji)
}

/// Pictographic ranges screened by [`filter_emojis`].
fn is_screened(c: char) -> bool {
    matches!(
        c as u32,
        0x1F600..=0x1F64F
            | 0x1F300..=0x1F5FF
            | 0x1F680..=0x1F6FF
            | 0x1F1E0..=0x1F1FF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
    )
}

/// Strip pictographs that are not part of the palette. Plain text passes
/// through untouched.
pub fn filter_emojis(text: &str) -> String {
    text.chars()
        .filter(|&c| !is_screened(c) || ALLOWED_EMOJIS.iter().any(|e| e.starts_with(c)))
        .collect()
}

/// Draft text with a cursor, bounded to `max_chars` characters.
#[derive(Debug, Clone)]
pub struct Composer {
    text: String,
    /// Cursor position in characters
    cursor: usize,
    max_chars: usize,
}

impl Composer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            max_chars,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.max_chars.saturating_sub(self.text.chars().count())
    }

    /// Replace the draft, truncating at the length bound; the cursor moves to the end.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.chars().take(self.max_chars).collect();
        self.cursor = self.text.chars().count();
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.text.chars().count());
    }

    /// Insert at the cursor and move the cursor past the emoji. Refused when
    /// the draft would exceed the length bound.
    pub fn insert_emoji(&mut self, emoji: &str) -> bool {
        let added = emoji.chars().count();
        if self.text.chars().count() + added > self.max_chars {
            return false;
        }
        let at = self
            .text
            .char_indices()
            .nth(self.cursor)
            .map_or(self.text.len(), |(i, _)| i);
        self.text.insert_str(at, emoji);
        self.cursor += added;
        true
    }

    /// Hand over the trimmed draft for sending and clear the buffer.
    /// An empty or whitespace-only draft stays put and yields `None`.
    pub fn take(&mut self) -> Option<String> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let out = trimmed.to_string();
        self.text.clear();
        self.cursor = 0;
        Some(out)
    }
}

/// Where a picked emoji goes.
pub enum EmojiTarget<'a> {
    Draft(&'a mut Composer),
    Reaction(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Inserted,
    /// The draft is full or the emoji is not in the palette
    Rejected,
    /// The caller should toggle this reaction
    React { message_id: Uuid, emoji: String },
}

pub struct EmojiPicker;

impl EmojiPicker {
    pub fn select(emoji: &str, target: EmojiTarget<'_>) -> PickOutcome {
        if !is_allowed_emoji(emoji) {
            return PickOutcome::Rejected;
        }
        match target {
            EmojiTarget::Draft(composer) => {
                if composer.insert_emoji(emoji) {
                    PickOutcome::Inserted
                } else {
                    PickOutcome::Rejected
                }
            }
            EmojiTarget::Reaction(message_id) => PickOutcome::React {
                message_id,
                emoji: emoji.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_keeps_palette_and_plain_text() {
        assert_eq!(filter_emojis("gm 🔥🚀 frens"), "gm 🔥🚀 frens");
        assert_eq!(filter_emojis("no 😴 here"), "no  here");
        assert_eq!(filter_emojis("love ❤️"), "love ❤️");
        assert_eq!(filter_emojis("ünïcödé ok"), "ünïcödé ok");
    }

    #[test]
    fn emoji_goes_in_at_the_cursor() {
        let mut c = Composer::new(300);
        c.set_text("hello world");
        c.set_cursor(5);
        assert!(c.insert_emoji("🔥"));
        assert_eq!(c.text(), "hello🔥 world");
        assert_eq!(c.cursor(), 6);
    }

    #[test]
    fn insertion_respects_the_length_bound() {
        let mut c = Composer::new(5);
        c.set_text("abcd");
        assert!(c.insert_emoji("🔥"));
        assert!(!c.insert_emoji("🔥"));
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn take_trims_and_clears() {
        let mut c = Composer::new(300);
        c.set_text("   ");
        assert_eq!(c.take(), None);
        c.set_text("  gm  ");
        assert_eq!(c.take().as_deref(), Some("gm"));
        assert_eq!(c.text(), "");
    }

    #[test]
    fn picker_routes_to_the_given_target() {
        let mut draft = Composer::new(300);
        assert_eq!(EmojiPicker::select("🎉", EmojiTarget::Draft(&mut draft)), PickOutcome::Inserted);
        assert_eq!(draft.text(), "🎉");

        let id = Uuid::new_v4();
        assert_eq!(
            EmojiPicker::select("🔥", EmojiTarget::Reaction(id)),
            PickOutcome::React { message_id: id, emoji: "🔥".into() }
        );
        assert_eq!(EmojiPicker::select("😴", EmojiTarget::Reaction(id)), PickOutcome::Rejected);
    }
}
