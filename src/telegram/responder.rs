use async_trait::async_trait;
use grammers_client::types::InputMessage;
use grammers_client::{button, reply_markup, Client, InvocationError};
use grammers_tl_types as tl;

use super::source::peer_ref_from_dialog_id;
use crate::bot::responder::{EditOutcome, EventAck, MessageHandle, Responder, ResponderError};
use crate::paging::render::Control;
use crate::session::RequesterId;

pub struct GrammersResponder {
    client: Client,
}

impl GrammersResponder {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn api_error(e: InvocationError) -> ResponderError {
    ResponderError::Api(e.to_string())
}

fn input_message(text: &str, controls: &[Control]) -> InputMessage {
    let message = InputMessage::new().markdown(text).link_preview(false);
    if controls.is_empty() {
        return message;
    }
    let row = controls
        .iter()
        .map(|c| button::inline(c.label, c.token.to_string().into_bytes()))
        .collect();
    message.reply_markup(&reply_markup::inline(vec![row]))
}

#[async_trait]
impl Responder for GrammersResponder {
    async fn send(&self, chat: RequesterId, text: &str) -> Result<MessageHandle, ResponderError> {
        let message = self
            .client
            .send_message(peer_ref_from_dialog_id(chat, None), input_message(text, &[]))
            .await
            .map_err(api_error)?;
        Ok(MessageHandle {
            chat_id: chat,
            message_id: message.id() as i64,
        })
    }

    async fn edit(
        &self,
        handle: MessageHandle,
        text: &str,
        controls: &[Control],
    ) -> Result<EditOutcome, ResponderError> {
        let result = self
            .client
            .edit_message(
                peer_ref_from_dialog_id(handle.chat_id, None),
                handle.message_id as i32,
                input_message(text, controls),
            )
            .await;
        match result {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(InvocationError::Rpc(rpc)) if rpc.name == "MESSAGE_NOT_MODIFIED" => {
                Ok(EditOutcome::Unchanged)
            }
            Err(e) => Err(api_error(e)),
        }
    }

    async fn delete(&self, handle: MessageHandle) -> Result<(), ResponderError> {
        self.client
            .delete_messages(
                peer_ref_from_dialog_id(handle.chat_id, None),
                &[handle.message_id as i32],
            )
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn acknowledge(
        &self,
        ack: EventAck,
        notice: Option<&str>,
    ) -> Result<(), ResponderError> {
        let request = tl::functions::messages::SetBotCallbackAnswer {
            alert: notice.is_some(),
            query_id: ack.query_id,
            message: notice.map(str::to_string),
            url: None,
            cache_time: 0,
        };
        self.client.invoke(&request).await.map_err(api_error)?;
        Ok(())
    }
}
