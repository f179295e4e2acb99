#[cfg(test)]
mod tests;

use futures::StreamExt;
use log::{ debug, error, info, warn };
use std::sync::Arc;
use std::time::Duration;

use crate::conversation::Conversation;
use crate::error::{ RewriteError, SendError, TransportError, ValidationError };
use crate::models::chat::{ TurnId, TurnStatus };
use crate::models::stream::{
    PricingMode,
    RewriteKind,
    RewriteRequest,
    StreamEvent,
    StreamRequest,
};
use crate::notify::{ ConversationDirectory, LogNotifier, Notice, Notifier };
use crate::stream::{ parse_frame, FrameSplitter, TypewriterBuffer };
use crate::stream::typewriter::DEFAULT_FLUSH_INTERVAL;
use crate::transport::{ ByteStream, ProposalTransport };

pub const MAX_PROMPT_CHARS: usize = 3000;
const STREAM_FAILED_NOTICE: &str = "Unable to stream message";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendParams {
    pub template_id: Option<String>,
    pub business_id: Option<String>,
    pub pricing: PricingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Opening,
    Streaming,
    Finalizing,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// `finalized` is false when the stream ended without a final record and the
    /// streamed text was kept as the reply.
    Completed {
        turn_id: TurnId,
        finalized: bool,
    },
    Failed {
        turn_id: TurnId,
        error: TransportError,
    },
}

impl TurnOutcome {
    pub fn turn_id(&self) -> TurnId {
        match self {
            TurnOutcome::Completed { turn_id, .. } | TurnOutcome::Failed { turn_id, .. } => *turn_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, TurnOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Runs one proposal request end to end: validates it, opens the stream, feeds the
/// typewriter and closes the turn in the conversation's ledger.
pub struct StreamController {
    transport: Arc<dyn ProposalTransport>,
    notifier: Arc<dyn Notifier>,
    directory: Option<Arc<dyn ConversationDirectory>>,
    flush_interval: Duration,
}

impl StreamController {
    pub fn new(transport: Arc<dyn ProposalTransport>) -> Self {
        Self {
            transport,
            notifier: Arc::new(LogNotifier),
            directory: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn ConversationDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    pub async fn send(
        &self,
        conversation: &mut Conversation,
        prompt: &str,
        params: &SendParams
    ) -> Result<TurnOutcome, SendError> {
        let request = build_request(conversation, prompt, params)?;
        if let Some(turn) = conversation.ledger().streaming_turn() {
            warn!("Rejecting new prompt while turn {} is still streaming", turn.id);
            return Err(SendError::Busy { turn_id: turn.id });
        }

        let is_new = conversation.is_new();
        conversation.set_title_if_absent(&request.query);
        let turn_id = conversation.ledger_mut().start_turn(&request.query);
        let mut run = TurnRun::new(conversation, turn_id, is_new, self.flush_interval);
        run.transition(StreamState::Opening);

        let outcome = match self.transport.open_stream(&request).await {
            Ok(body) => {
                run.transition(StreamState::Streaming);
                match drive(&mut run, body).await {
                    Ok(()) => run.complete(),
                    Err(e) => run.fail(e, self.notifier.as_ref()),
                }
            }
            Err(e) => run.fail(e, self.notifier.as_ref()),
        };

        if is_new && run.finalized {
            if let Some(directory) = &self.directory {
                if let Err(e) = directory.refresh().await {
                    warn!("Failed to refresh conversation list: {}", e);
                }
            }
        }

        Ok(outcome)
    }

    /// Expand or shorten a completed reply. The rewritten text replaces the reply
    /// wholesale; it is not streamed.
    pub async fn rewrite(
        &self,
        conversation: &mut Conversation,
        turn_id: TurnId,
        kind: RewriteKind
    ) -> Result<(), RewriteError> {
        let turn = conversation.ledger().turn(turn_id).ok_or(RewriteError::UnknownTurn(turn_id))?;
        if turn.status != TurnStatus::Complete {
            return Err(RewriteError::NotComplete(turn_id));
        }
        let request = RewriteRequest {
            previous_proposal: turn.reply.clone(),
            chat_id: conversation.chat_id(turn_id).map(str::to_string),
        };

        match self.transport.rewrite(kind, &request).await {
            Ok(None) => {
                debug!("Nothing to {} for turn {}; keeping the reply", kind.verb(), turn_id);
                Ok(())
            }
            Ok(Some(text)) => {
                conversation.ledger_mut().revise_reply(turn_id, &text);
                self.notifier.notify(Notice::success(format!("{} successfully.", kind.past_tense())));
                Ok(())
            }
            Err(e) => {
                error!("Failed to {} turn {}: {}", kind.verb(), turn_id, e);
                self.notifier.notify(Notice::error(format!("Failed to {}", kind.verb())));
                Err(e.into())
            }
        }
    }
}

/// Checks the send preconditions in the order the user would fix them and builds
/// the wire request. Template and business ids pinned on the conversation win over
/// the ones passed in.
pub fn build_request(
    conversation: &Conversation,
    prompt: &str,
    params: &SendParams
) -> Result<StreamRequest, ValidationError> {
    let query = prompt.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }
    let length = query.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(ValidationError::PromptTooLong { length, max: MAX_PROMPT_CHARS });
    }

    let business_id = conversation
        .business_id()
        .or(params.business_id.as_deref())
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::MissingBusiness)?;
    let template_id = conversation
        .template_id()
        .or(params.template_id.as_deref())
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::MissingTemplate)?;

    let manual_price = match &params.pricing {
        PricingMode::Auto => None,
        PricingMode::Manual(price) if price.trim().is_empty() => {
            return Err(ValidationError::MissingManualPrice);
        }
        PricingMode::Manual(price) => Some(price.trim().to_string()),
    };

    Ok(StreamRequest {
        is_new: if conversation.is_new() { 1 } else { 0 },
        conversation_id: conversation.id().unwrap_or("").to_string(),
        query: query.to_string(),
        conversation_title: conversation.title().unwrap_or(query).to_string(),
        template_id: template_id.to_string(),
        business_id: business_id.to_string(),
        auto_price: manual_price.is_none(),
        manual_price,
    })
}

/// Multiplexes network reads and flush ticks on the current task until the stream
/// is done. Returns the transport error that interrupted it, if any.
async fn drive(run: &mut TurnRun<'_>, mut body: ByteStream) -> Result<(), TransportError> {
    loop {
        tokio::select! {
            biased;
            _ = run.buffer.tick() => {
                run.flush();
            }
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for frame in run.splitter.push_bytes(&bytes) {
                        if run.handle_frame(&frame) == Flow::Stop {
                            return Ok(());
                        }
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    if let Some(frame) = run.splitter.finish() {
                        run.handle_frame(&frame);
                    }
                    return Ok(());
                }
            }
        }
    }
}

/// State of the one in-flight stream. Owns the flush timer through `buffer`, so
/// dropping the run (or the `send` future holding it) cancels the timer.
struct TurnRun<'a> {
    conversation: &'a mut Conversation,
    turn_id: TurnId,
    is_new: bool,
    state: StreamState,
    finalized: bool,
    splitter: FrameSplitter,
    buffer: TypewriterBuffer,
}

impl<'a> TurnRun<'a> {
    fn new(
        conversation: &'a mut Conversation,
        turn_id: TurnId,
        is_new: bool,
        flush_interval: Duration
    ) -> Self {
        Self {
            conversation,
            turn_id,
            is_new,
            state: StreamState::Idle,
            finalized: false,
            splitter: FrameSplitter::new(),
            buffer: TypewriterBuffer::new(flush_interval),
        }
    }

    fn transition(&mut self, next: StreamState) {
        debug!("Turn {}: {:?} -> {:?}", self.turn_id, self.state, next);
        self.state = next;
    }

    fn flush(&mut self) {
        self.buffer.flush_into(self.conversation.ledger_mut(), self.turn_id);
    }

    fn handle_frame(&mut self, frame: &str) -> Flow {
        let Some(event) = parse_frame(frame) else {
            return Flow::Continue;
        };

        match event {
            StreamEvent::Token { text } => {
                self.buffer.push(&text);
                Flow::Continue
            }
            StreamEvent::Final { reply, snapshot } => {
                if self.finalized {
                    debug!("Ignoring repeated final record for turn {}", self.turn_id);
                    return Flow::Continue;
                }
                self.transition(StreamState::Finalizing);
                self.flush();
                self.conversation.ledger_mut().finalize_turn(self.turn_id, &reply);
                if let Some(chat_id) = snapshot.chats.first().and_then(|chat| chat.id.as_deref()) {
                    self.conversation.link_chat(self.turn_id, chat_id);
                }
                if self.is_new {
                    self.conversation.apply_snapshot(&snapshot);
                }
                self.buffer.close();
                self.finalized = true;
                Flow::Continue
            }
            StreamEvent::Done => Flow::Stop,
            // already logged by the parser
            StreamEvent::Malformed { .. } => Flow::Continue,
        }
    }

    fn complete(&mut self) -> TurnOutcome {
        self.flush();
        self.buffer.close();
        if !self.finalized {
            warn!(
                "Stream for turn {} ended without a final record; keeping the streamed text",
                self.turn_id
            );
            self.conversation.ledger_mut().complete_turn(self.turn_id);
        }
        self.transition(StreamState::Complete);
        info!("Turn {} complete", self.turn_id);
        TurnOutcome::Completed { turn_id: self.turn_id, finalized: self.finalized }
    }

    fn fail(&mut self, error: TransportError, notifier: &dyn Notifier) -> TurnOutcome {
        // whatever already arrived stays visible
        self.flush();
        self.buffer.close();
        if self.finalized {
            warn!("Stream for turn {} broke after its final record: {}", self.turn_id, error);
            self.transition(StreamState::Complete);
            return TurnOutcome::Completed { turn_id: self.turn_id, finalized: true };
        }

        error!("Stream for turn {} failed: {}", self.turn_id, error);
        self.conversation.ledger_mut().fail_turn(self.turn_id);
        self.transition(StreamState::Failed);
        notifier.notify(Notice::error(STREAM_FAILED_NOTICE));
        TurnOutcome::Failed { turn_id: self.turn_id, error }
    }
}
