use crate::scanner::link::message_link;
use crate::session::{DisplayContext, Session};

use super::token::{ActionToken, Direction};

/// An inline button under a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub label: &'static str,
    pub token: ActionToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Markdown text.
    pub text: String,
    pub controls: Vec<Control>,
    /// The page actually rendered, after clamping.
    pub page: usize,
}

/// Render the session's current page. Pure; an out-of-range page is clamped.
pub fn render(session: &Session) -> RenderedPage {
    let total_pages = session.total_pages();
    let page = session.current_page.min(session.max_page());
    let items = session.results.items();
    let start = (page * session.page_size).min(items.len());
    let end = (start + session.page_size).min(items.len());

    let mut text = header(&session.context, items.len());
    text.push_str(&format!("Page {} of {}\n\n", page + 1, total_pages));

    if items.is_empty() {
        text.push_str(&no_results_text(&session.context));
    }

    for (offset, item) in items[start..end].iter().enumerate() {
        let rank = start + offset + 1;
        let link = message_link(&session.context.link_prefix, item.message_id);
        text.push_str(&format!(
            "{}. ❤️ **{}** · [{}]({})\n",
            rank,
            item.score,
            escape_markdown(&item.preview),
            link
        ));
    }

    let mut controls = Vec::new();
    if page > 0 {
        controls.push(Control {
            label: "⬅️ Previous",
            token: ActionToken::new(Direction::Prev, page),
        });
    }
    if end < items.len() {
        controls.push(Control {
            label: "Next ➡️",
            token: ActionToken::new(Direction::Next, page),
        });
    }

    RenderedPage {
        text: text.trim_end().to_string(),
        controls,
        page,
    }
}

fn header(context: &DisplayContext, found: usize) -> String {
    format!(
        "🏆 **Top posts in** {}\nFound **{}** posts with reactions among **{}** scanned.\n",
        inline_code(&context.channel_label),
        found,
        context.total_scanned
    )
}

/// Body shown when a scan found nothing.
pub fn no_results_text(context: &DisplayContext) -> String {
    format!(
        "No posts with reactions found among **{}** scanned messages of {}.",
        context.total_scanned,
        inline_code(&context.channel_label)
    )
}

/// Wrap free-form text in a code span. Backticks can't be escaped inside
/// one, so they are replaced.
pub fn inline_code(text: &str) -> String {
    format!("`{}`", text.replace('`', "'"))
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '(' | ')' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
