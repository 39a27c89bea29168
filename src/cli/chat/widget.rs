use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use eyre::{Result, eyre};
use tracing::{debug, info, warn};

use super::conversation_state::{ConversationState, Turn};
use super::view::ChatView;
use crate::chat_client::{ChatReply, ChatRequest, ChatService, ChatServiceError};

const ERROR_PREFIX: &str = "❌ Error: ";
const TIMEOUT_MESSAGE: &str = "Response time exceeded.";
const SERVER_ERROR_MESSAGE: &str = "Server error.";
const UNREACHABLE_MESSAGE: &str = "Unable to reach the server.";

/// What to do with a reply whose conversation was reset while it was in
/// flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LateReplyPolicy {
    /// Append it to whatever conversation is current.
    #[default]
    Append,
    /// Drop it.
    Discard,
}

impl FromStr for LateReplyPolicy {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "discard" => Ok(Self::Discard),
            other => Err(eyre!(
                "unknown late reply policy '{}' (expected append or discard)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Send the service-issued conversation id back on later requests.
    pub track_conversation: bool,
    pub late_reply: LateReplyPolicy,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            track_conversation: true,
            late_reply: LateReplyPolicy::Append,
        }
    }
}

/// Result of a call to [`ChatWidget::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input, or a request was already in flight.
    Ignored,
    /// A reply or an error message was appended.
    Answered,
    /// The conversation was reset while waiting and the reply was dropped.
    Discarded,
}

struct Inner {
    state: Mutex<ConversationState>,
    service: Arc<dyn ChatService>,
    view: Arc<dyn ChatView>,
    config: WidgetConfig,
}

/// A conversation with the chat service.
///
/// Clones share the same conversation. At most one request is in flight at
/// any time; submissions made meanwhile are ignored.
#[derive(Clone)]
pub struct ChatWidget {
    inner: Arc<Inner>,
}

impl ChatWidget {
    pub fn new(
        service: Arc<dyn ChatService>,
        view: Arc<dyn ChatView>,
        config: WidgetConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ConversationState::new()),
                service,
                view,
                config,
            }),
        }
    }

    pub fn config(&self) -> WidgetConfig {
        self.inner.config
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.state().turns().to_vec()
    }

    pub fn pending_input(&self) -> String {
        self.state().pending_input().to_string()
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.state().is_awaiting_response()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.state().conversation_id().map(str::to_string)
    }

    pub fn set_input(&self, input: &str) {
        self.state().set_pending_input(input);
    }

    /// Submits the current pending input.
    pub async fn submit_pending(&self) -> SubmitOutcome {
        let input = {
            let state = self.state();
            if state.is_awaiting_response() {
                return SubmitOutcome::Ignored;
            }
            state.pending_input().to_string()
        };
        self.submit(&input).await
    }

    /// Sends `text` as the next user turn and appends the reply.
    ///
    /// Failures of the chat service end up in the transcript as assistant
    /// turns; they are never returned.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let message = text.trim();
        let Some((request, epoch)) = self.begin(message) else {
            return SubmitOutcome::Ignored;
        };

        let result = self.inner.service.send(&request).await;
        self.finish(epoch, result)
    }

    /// Starts a new conversation. A request still in flight is not
    /// cancelled; its reply is handled per [`LateReplyPolicy`].
    pub fn reset(&self) {
        let turns = {
            let mut state = self.state();
            state.clear();
            state.turns().to_vec()
        };
        info!("Conversation reset");
        self.inner.view.scroll_to_latest(&turns);
    }

    fn begin(&self, message: &str) -> Option<(ChatRequest, u64)> {
        if message.is_empty() {
            debug!("Ignoring empty message");
            return None;
        }

        let (request, epoch, turns) = {
            let mut state = self.state();
            if state.is_awaiting_response() {
                debug!("Ignoring message while a request is in flight");
                return None;
            }

            state.add_user_message(message);
            state.take_pending_input();
            state.set_awaiting_response(true);

            let conversation_id = if self.inner.config.track_conversation {
                state.conversation_id().map(str::to_string)
            } else {
                None
            };
            let request = ChatRequest {
                message: message.to_string(),
                conversation_id,
            };
            (request, state.epoch(), state.turns().to_vec())
        };

        self.inner.view.scroll_to_latest(&turns);
        self.inner.view.awaiting_changed(true);
        Some((request, epoch))
    }

    fn finish(&self, epoch: u64, result: Result<ChatReply, ChatServiceError>) -> SubmitOutcome {
        let turns = {
            let mut state = self.state();
            state.set_awaiting_response(false);
            let stale = state.epoch() != epoch;

            if stale && self.inner.config.late_reply == LateReplyPolicy::Discard {
                None
            } else {
                match result {
                    Ok(reply) => {
                        // A reply from before a reset belongs to the old session.
                        if self.inner.config.track_conversation
                            && !stale
                            && state.adopt_conversation_id(&reply.conversation_id)
                        {
                            info!("Joined conversation {}", reply.conversation_id);
                        }
                        state.add_assistant_message(&reply.response);
                    }
                    Err(e) => {
                        warn!("Chat request failed: {}", e);
                        state.add_assistant_message(&error_message(&e));
                    }
                }
                Some(state.turns().to_vec())
            }
        };

        self.inner.view.awaiting_changed(false);
        match turns {
            Some(turns) => {
                self.inner.view.scroll_to_latest(&turns);
                SubmitOutcome::Answered
            }
            None => {
                warn!("Discarding reply that arrived after the conversation was reset");
                SubmitOutcome::Discarded
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, ConversationState> {
        match self.inner.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// The text shown to the user for a failed request.
pub fn error_message(error: &ChatServiceError) -> String {
    let reason = match error {
        ChatServiceError::Timeout => TIMEOUT_MESSAGE,
        ChatServiceError::Server {
            detail: Some(detail),
            ..
        } => detail.as_str(),
        ChatServiceError::Server { detail: None, .. } | ChatServiceError::InvalidReply(_) => {
            SERVER_ERROR_MESSAGE
        }
        ChatServiceError::Unreachable(_) => UNREACHABLE_MESSAGE,
    };
    format!("{ERROR_PREFIX}{reason}")
}
