/// Build the prefix that, followed by a message id, links to that message.
///
/// Public sources (with username): `https://t.me/{username}/`
/// Private sources (no username):  `https://t.me/c/{channel_id}/`
pub fn link_prefix(chat_id: i64, username: Option<&str>) -> String {
    match username {
        Some(uname) if !uname.is_empty() => format!("https://t.me/{}/", uname),
        _ => {
            // Private: channel_id = abs(chat_id) - 1_000_000_000_000
            let channel_id = chat_id.unsigned_abs().saturating_sub(1_000_000_000_000);
            format!("https://t.me/c/{}/", channel_id)
        }
    }
}

pub fn message_link(prefix: &str, message_id: i64) -> String {
    format!("{}{}", prefix, message_id)
}
