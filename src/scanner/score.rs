use unicode_segmentation::UnicodeSegmentation;

use super::source::{ReactionKind, SourceMessage};

const PREVIEW_GRAPHEMES: usize = 30;
const MEDIA_PLACEHOLDER: &str = "[media]";
const EMPTY_PLACEHOLDER: &str = "[no text]";

/// Which reactions count toward a message's score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionSelector {
    /// Sum of every reaction on the message.
    All,
    Emoji(String),
    CustomEmoji(i64),
}

impl ReactionSelector {
    /// `""` and `"*"` select all reactions, a number selects a custom emoji id,
    /// anything else is taken as a literal emoji.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "*" {
            return ReactionSelector::All;
        }
        match value.parse::<i64>() {
            Ok(id) => ReactionSelector::CustomEmoji(id),
            Err(_) => ReactionSelector::Emoji(value.to_string()),
        }
    }

    fn matches(&self, kind: &ReactionKind) -> bool {
        match (self, kind) {
            (ReactionSelector::All, _) => true,
            (ReactionSelector::Emoji(want), ReactionKind::Emoji(got)) => emoji_eq(want, got),
            (ReactionSelector::CustomEmoji(want), ReactionKind::CustomEmoji(got)) => want == got,
            _ => false,
        }
    }
}

// Telegram reports some emoji with and without the variation selector.
fn emoji_eq(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.trim_end_matches('\u{fe0f}').to_string();
    strip(a) == strip(b)
}

/// Scores a message by its count of the designated reaction.
#[derive(Debug, Clone)]
pub struct ReactionScorer {
    selector: ReactionSelector,
}

impl ReactionScorer {
    pub fn new(selector: ReactionSelector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &ReactionSelector {
        &self.selector
    }

    /// Never fails: missing or negative counts contribute nothing.
    pub fn score(&self, message: &SourceMessage) -> u64 {
        message
            .reactions
            .iter()
            .filter(|r| self.selector.matches(&r.kind))
            .map(|r| r.count.max(0) as u64)
            .fold(0u64, u64::saturating_add)
    }
}

/// Short single-line description of a message body.
pub fn preview(message: &SourceMessage) -> String {
    let text = message.text.as_deref().unwrap_or("").trim();
    if text.is_empty() {
        return if message.has_media {
            MEDIA_PLACEHOLDER.to_string()
        } else {
            EMPTY_PLACEHOLDER.to_string()
        };
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut graphemes = collapsed.graphemes(true);
    let head: String = graphemes.by_ref().take(PREVIEW_GRAPHEMES).collect();
    if graphemes.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
