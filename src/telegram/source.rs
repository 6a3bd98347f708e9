use async_trait::async_trait;
use grammers_client::types::{Message, Peer};
use grammers_client::{Client, InvocationError};
use grammers_session::defs::{PeerAuth, PeerId, PeerRef};
use grammers_tl_types as tl;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::scanner::source::{
    MessageSource, MessageStream, ReactionCount, ReactionKind, SourceError, SourceHandle,
    SourceKind, SourceMessage,
};

/// Messages buffered between the network reader and the scan loop.
const READ_AHEAD: usize = 100;

/// Reads channel history through a user client. Bot accounts can't call
/// `messages.getHistory`.
pub struct GrammersSource {
    client: Client,
}

impl GrammersSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Build a PeerRef from a bot API dialog id.
pub(crate) fn peer_ref_from_dialog_id(dialog_id: i64, access_hash: Option<i64>) -> PeerRef {
    if dialog_id > 0 {
        return PeerRef {
            id: PeerId::user(dialog_id),
            auth: access_hash.map(PeerAuth::from_hash).unwrap_or_default(),
        };
    }
    if dialog_id > -1_000_000_000_000 {
        return PeerRef {
            id: PeerId::chat(-dialog_id),
            auth: PeerAuth::default(),
        };
    }
    // channel / supergroup: bot_api_dialog_id = -(1000000000000 + bare_id)
    let bare_id = (-dialog_id) - 1_000_000_000_000;
    PeerRef {
        id: PeerId::channel(bare_id),
        auth: PeerAuth::from_hash(access_hash.unwrap_or(0)),
    }
}

fn handle_from_peer(peer: &Peer) -> SourceHandle {
    let (kind, access_hash) = match peer {
        Peer::User(_) => (SourceKind::User, None),
        Peer::Group(_) => (SourceKind::Group, None),
        Peer::Channel(channel) => {
            let kind = if channel.raw.broadcast {
                SourceKind::Channel
            } else {
                SourceKind::Supergroup
            };
            (kind, channel.raw.access_hash)
        }
    };
    SourceHandle {
        chat_id: peer.id().bot_api_dialog_id(),
        title: peer.name().unwrap_or("").to_string(),
        username: peer.username().map(|u| u.to_string()),
        kind,
        access_hash,
    }
}

fn map_error(reference: &str, e: InvocationError) -> SourceError {
    match &e {
        InvocationError::Rpc(rpc) => match rpc.name.as_str() {
            "USERNAME_NOT_OCCUPIED" | "USERNAME_INVALID" => {
                SourceError::NotFound(reference.to_string())
            }
            "CHAT_ADMIN_REQUIRED" | "CHANNEL_PRIVATE" | "CHANNEL_INVALID" => {
                SourceError::AccessDenied(reference.to_string())
            }
            _ => SourceError::Api(e.to_string()),
        },
        _ => SourceError::Api(e.to_string()),
    }
}

fn reaction_counts(raw: &tl::enums::Message) -> Vec<ReactionCount> {
    let tl::enums::Message::Message(message) = raw else {
        return Vec::new();
    };
    let Some(tl::enums::MessageReactions::Reactions(reactions)) = &message.reactions else {
        return Vec::new();
    };
    reactions
        .results
        .iter()
        .filter_map(|result| {
            let tl::enums::ReactionCount::Count(rc) = result;
            let kind = match &rc.reaction {
                tl::enums::Reaction::Emoji(e) => ReactionKind::Emoji(e.emoticon.clone()),
                tl::enums::Reaction::CustomEmoji(c) => ReactionKind::CustomEmoji(c.document_id),
                tl::enums::Reaction::Paid => ReactionKind::Paid,
                tl::enums::Reaction::Empty => return None,
            };
            Some(ReactionCount {
                kind,
                count: rc.count as i64,
            })
        })
        .collect()
}

fn source_message(msg: &Message) -> SourceMessage {
    let text = msg.text();
    SourceMessage {
        id: msg.id() as i64,
        text: (!text.is_empty()).then(|| text.to_string()),
        has_media: msg.media().is_some(),
        reactions: reaction_counts(&msg.raw),
    }
}

#[async_trait]
impl MessageSource for GrammersSource {
    async fn resolve(&self, reference: &str) -> Result<SourceHandle, SourceError> {
        match self.client.resolve_username(reference).await {
            Ok(Some(peer)) => Ok(handle_from_peer(&peer)),
            Ok(None) => Err(SourceError::NotFound(reference.to_string())),
            Err(e) => Err(map_error(reference, e)),
        }
    }

    async fn estimate_total(&self, source: &SourceHandle) -> Result<usize, SourceError> {
        let peer_ref = peer_ref_from_dialog_id(source.chat_id, source.access_hash);
        self.client
            .iter_messages(peer_ref)
            .total()
            .await
            .map_err(|e| map_error(&source.title, e))
    }

    async fn iterate(
        &self,
        source: &SourceHandle,
        limit: usize,
    ) -> Result<Box<dyn MessageStream>, SourceError> {
        let peer_ref = peer_ref_from_dialog_id(source.chat_id, source.access_hash);
        let client = self.client.clone();
        let title = source.title.clone();
        let (tx, rx) = mpsc::channel(READ_AHEAD);

        let reader = tokio::spawn(async move {
            let mut iter = client.iter_messages(peer_ref).limit(limit);
            loop {
                let item = match iter.next().await {
                    Ok(Some(msg)) => Ok(source_message(&msg)),
                    Ok(None) => break,
                    Err(e) => Err(map_error(&title, e)),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(Box::new(ChannelStream { rx, reader }))
    }
}

/// History read by a background task, handed over through a bounded channel.
struct ChannelStream {
    rx: mpsc::Receiver<Result<SourceMessage, SourceError>>,
    reader: JoinHandle<()>,
}

#[async_trait]
impl MessageStream for ChannelStream {
    async fn next(&mut self) -> Result<Option<SourceMessage>, SourceError> {
        self.rx.recv().await.transpose()
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
