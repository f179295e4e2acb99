use super::*;
use crate::ledger::LedgerChange;
use crate::models::chat::ConversationSnapshot;
use crate::stream::parser::normalize_newlines;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use proptest::prelude::*;
use std::error::Error;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Default)]
struct ScriptedTransport {
    body: Mutex<Option<ByteStream>>,
    open_error: Option<TransportError>,
    rewrite_result: Mutex<Option<Result<Option<String>, TransportError>>>,
    requests: Mutex<Vec<StreamRequest>>,
    rewrites: Mutex<Vec<(RewriteKind, RewriteRequest)>>,
}

impl ScriptedTransport {
    fn with_chunks(chunks: Vec<Result<Bytes, TransportError>>) -> Self {
        let body: ByteStream = Box::pin(stream::iter(chunks));
        Self {
            body: Mutex::new(Some(body)),
            ..Self::default()
        }
    }

    fn with_receiver(rx: mpsc::Receiver<Result<Bytes, TransportError>>) -> Self {
        let body: ByteStream = Box::pin(ReceiverStream::new(rx));
        Self {
            body: Mutex::new(Some(body)),
            ..Self::default()
        }
    }

    fn failing(error: TransportError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }

    fn with_rewrite(self, result: Result<Option<String>, TransportError>) -> Self {
        *self.rewrite_result.lock().unwrap() = Some(result);
        self
    }

    fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProposalTransport for ScriptedTransport {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(e) = &self.open_error {
            return Err(e.clone());
        }
        self.body.lock().unwrap().take().ok_or(TransportError::MissingBody)
    }

    async fn rewrite(
        &self,
        kind: RewriteKind,
        request: &RewriteRequest
    ) -> Result<Option<String>, TransportError> {
        self.rewrites.lock().unwrap().push((kind, request.clone()));
        self.rewrite_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(TransportError::Network("no rewrite scripted".into())))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
struct CountingDirectory {
    refreshes: AtomicUsize,
}

#[async_trait]
impl ConversationDirectory for CountingDirectory {
    async fn refresh(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn frame(payload: &str) -> Result<Bytes, TransportError> {
    Ok(Bytes::from(format!("data:{}\n\n", payload)))
}

fn token(text: &str) -> Result<Bytes, TransportError> {
    frame(&serde_json::json!({ "token": text }).to_string())
}

fn final_frame(message: &str) -> Result<Bytes, TransportError> {
    frame(
        &serde_json::json!({
            "type": "final",
            "token": {
                "id": 77,
                "title": "Saved title",
                "template_id": "t-1",
                "business_id": "b-1",
                "chats": [{ "id": 501, "query": "prompt", "message": message }]
            }
        }).to_string()
    )
}

fn done() -> Result<Bytes, TransportError> {
    frame("[DONE]")
}

fn params() -> SendParams {
    SendParams {
        template_id: Some("t-1".into()),
        business_id: Some("b-1".into()),
        pricing: PricingMode::Auto,
    }
}

fn record(conversation: &mut Conversation) -> Arc<Mutex<Vec<LedgerChange>>> {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    conversation.ledger_mut().subscribe(move |change, _| sink.lock().unwrap().push(change.clone()));
    changes
}

fn appended(changes: &Mutex<Vec<LedgerChange>>) -> Vec<String> {
    changes
        .lock()
        .unwrap()
        .iter()
        .filter_map(|change| match change {
            LedgerChange::ReplyAppended { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn reply(conversation: &Conversation, turn_id: TurnId) -> (String, TurnStatus) {
    let turn = conversation.ledger().turn(turn_id).unwrap();
    (turn.reply.clone(), turn.status)
}

#[tokio::test]
async fn test_done_without_final_keeps_streamed_text() {
    let transport = Arc::new(ScriptedTransport::with_chunks(vec![token("Hello "), token("world"), done()]));
    let controller = StreamController::new(transport);
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "Write a proposal", &params()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Completed { turn_id: outcome.turn_id(), finalized: false });
    assert_eq!(reply(&conversation, outcome.turn_id()), ("Hello world".to_string(), TurnStatus::Complete));
}

#[tokio::test]
async fn test_final_overwrites_partial_text() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![token("Partial "), token("te"), final_frame("Full answer."), done()])
    );
    let directory = Arc::new(CountingDirectory::default());
    let controller = StreamController::new(transport).with_directory(directory.clone());
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "Write a proposal", &params()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Completed { turn_id: outcome.turn_id(), finalized: true });
    assert_eq!(reply(&conversation, outcome.turn_id()), ("Full answer.".to_string(), TurnStatus::Complete));
    assert_eq!(conversation.id(), Some("77"));
    assert_eq!(conversation.title(), Some("Write a proposal"));
    assert_eq!(conversation.chat_id(outcome.turn_id()), Some("501"));
    assert_eq!(directory.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_final_with_mistyped_fields_still_saves_conversation() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![
            token("Partial te"),
            frame(r#"{"type":"final","token":{"id":"c-7","title":7,"chats":null}}"#),
            done()
        ])
    );
    let directory = Arc::new(CountingDirectory::default());
    let controller = StreamController::new(transport).with_directory(directory.clone());
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "Write a proposal", &params()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Completed { turn_id: outcome.turn_id(), finalized: true });
    assert_eq!(reply(&conversation, outcome.turn_id()), (String::new(), TurnStatus::Complete));
    assert_eq!(conversation.id(), Some("c-7"));
    assert_eq!(directory.refreshes.load(Ordering::SeqCst), 1);

    let request = build_request(&conversation, "follow up", &params()).unwrap();
    assert_eq!(request.is_new, 0);
    assert_eq!(request.conversation_id, "c-7");
}

#[tokio::test]
async fn test_final_with_non_object_chat_keeps_reply_text() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![
            token("draft"),
            frame(r#"{"type":"final","token":{"id":5,"chats":[{"id":[1],"message":"Full answer."},"junk"]}}"#),
            done()
        ])
    );
    let controller = StreamController::new(transport);
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(reply(&conversation, outcome.turn_id()), ("Full answer.".to_string(), TurnStatus::Complete));
    assert_eq!(conversation.id(), Some("5"));
    assert_eq!(conversation.chat_id(outcome.turn_id()), None);
}

#[tokio::test]
async fn test_read_error_fails_turn_and_keeps_partial_reply() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![
            token("Only this"),
            Err(TransportError::Network("connection reset by peer".into()))
        ])
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = StreamController::new(transport).with_notifier(notifier.clone());
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "Write a proposal", &params()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Failed {
        turn_id: outcome.turn_id(),
        error: TransportError::Network("connection reset by peer".into()),
    });
    assert_eq!(reply(&conversation, outcome.turn_id()), ("Only this".to_string(), TurnStatus::Failed));
    assert_eq!(*notifier.notices.lock().unwrap(), vec![Notice::error("Unable to stream message")]);
    assert!(conversation.ledger().streaming_turn().is_none());
}

#[tokio::test]
async fn test_empty_prompt_is_rejected_before_any_request() {
    let transport = Arc::new(ScriptedTransport::with_chunks(vec![done()]));
    let controller = StreamController::new(transport.clone());
    let mut conversation = Conversation::new();

    let result = controller.send(&mut conversation, "   ", &params()).await;

    assert_eq!(result, Err(SendError::Validation(ValidationError::EmptyPrompt)));
    assert!(conversation.ledger().is_empty());
    assert_eq!(conversation.title(), None);
    assert!(transport.requests().is_empty());
}

#[test]
fn test_validation_order_and_messages() {
    let conversation = Conversation::new();

    let missing_business = SendParams { business_id: None, ..params() };
    let err = build_request(&conversation, "prompt", &missing_business).unwrap_err();
    assert_eq!(err.to_string(), "Please select a business");

    let missing_both = SendParams { business_id: None, template_id: None, ..params() };
    assert_eq!(build_request(&conversation, "prompt", &missing_both), Err(ValidationError::MissingBusiness));

    let missing_template = SendParams { template_id: Some(" ".into()), ..params() };
    let err = build_request(&conversation, "prompt", &missing_template).unwrap_err();
    assert_eq!(err.to_string(), "Please select a template");

    let blank_price = SendParams { pricing: PricingMode::Manual("  ".into()), ..params() };
    let err = build_request(&conversation, "prompt", &blank_price).unwrap_err();
    assert_eq!(err.to_string(), "Please enter manual pricing");

    let long_prompt = "x".repeat(MAX_PROMPT_CHARS + 1);
    assert_eq!(build_request(&conversation, &long_prompt, &params()), Err(ValidationError::PromptTooLong {
        length: MAX_PROMPT_CHARS + 1,
        max: MAX_PROMPT_CHARS,
    }));
}

#[test]
fn test_request_for_new_conversation() {
    let conversation = Conversation::new();
    let manual = SendParams { pricing: PricingMode::Manual(" $12,000 ".into()), ..params() };

    let request = build_request(&conversation, "  Coaching for 5 managers ", &manual).unwrap();

    assert_eq!(request, StreamRequest {
        is_new: 1,
        conversation_id: String::new(),
        query: "Coaching for 5 managers".into(),
        conversation_title: "Coaching for 5 managers".into(),
        template_id: "t-1".into(),
        business_id: "b-1".into(),
        auto_price: false,
        manual_price: Some("$12,000".into()),
    });
}

#[tokio::test]
async fn test_existing_conversation_pins_ids_and_keeps_identity() {
    let transport = Arc::new(ScriptedTransport::with_chunks(vec![final_frame("Second answer."), done()]));
    let directory = Arc::new(CountingDirectory::default());
    let controller = StreamController::new(transport.clone()).with_directory(directory.clone());

    let snapshot: ConversationSnapshot = serde_json
        ::from_value(
            serde_json::json!({
                "id": "c-1",
                "title": "Original title",
                "template_id": "t-pinned",
                "business_id": "b-pinned",
                "chats": [{ "id": 1, "query": "first", "message": "First answer." }]
            })
        )
        .unwrap();
    let mut conversation = Conversation::from_snapshot(&snapshot);

    let outcome = controller.send(&mut conversation, "follow up", &params()).await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.is_new, 0);
    assert_eq!(request.conversation_id, "c-1");
    assert_eq!(request.conversation_title, "Original title");
    assert_eq!(request.template_id, "t-pinned");
    assert_eq!(request.business_id, "b-pinned");

    assert_eq!(conversation.id(), Some("c-1"));
    assert_eq!(conversation.ledger().len(), 2);
    assert_eq!(reply(&conversation, outcome.turn_id()).0, "Second answer.");
    assert_eq!(directory.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_frame_contributes_nothing() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![token("one "), frame("{broken"), frame(r#"{"token":""}"#), token("two"), done()])
    );
    let controller = StreamController::new(transport);
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(reply(&conversation, outcome.turn_id()), ("one two".to_string(), TurnStatus::Complete));
}

#[tokio::test]
async fn test_events_after_final_change_nothing() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![
            token("draft"),
            final_frame("Authoritative."),
            token(" stray"),
            final_frame("Second final."),
            done(),
            token(" after done")
        ])
    );
    let controller = StreamController::new(transport);
    let mut conversation = Conversation::new();
    let changes = record(&mut conversation);

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(reply(&conversation, outcome.turn_id()), ("Authoritative.".to_string(), TurnStatus::Complete));
    let changes = changes.lock().unwrap();
    let finalized = changes
        .iter()
        .filter(|change| matches!(change, LedgerChange::TurnFinalized { .. }))
        .count();
    assert_eq!(finalized, 1);
    assert!(matches!(changes.last(), Some(LedgerChange::TurnFinalized { .. })));
}

#[tokio::test]
async fn test_frames_split_across_chunks_and_heartbeats() {
    let body = "data:{\"token\":\"na\\u00efve \"}\n\n: keep-alive\n\ndata:{\"token\":\"caf\u{e9}\"}\n\ndata:[DONE]\n\n";
    let bytes = body.as_bytes();
    let cut = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
    let chunks = vec![
        Ok(Bytes::copy_from_slice(&bytes[..7])),
        Ok(Bytes::copy_from_slice(&bytes[7..cut])),
        Ok(Bytes::copy_from_slice(&bytes[cut..]))
    ];
    let controller = StreamController::new(Arc::new(ScriptedTransport::with_chunks(chunks)));
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(reply(&conversation, outcome.turn_id()).0, "na\u{ef}ve caf\u{e9}");
}

#[tokio::test]
async fn test_multiline_tokens_are_normalized() {
    let transport = Arc::new(ScriptedTransport::with_chunks(vec![token("Scope:\n- Coaching"), token("\n- Workshops")]));
    let controller = StreamController::new(transport);
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(reply(&conversation, outcome.turn_id()).0, "Scope:<br/>- Coaching<br/>- Workshops");
}

#[tokio::test]
async fn test_unterminated_last_frame_is_still_read() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![token("Body"), Ok(Bytes::from_static(b"data:{\"type\":\"final\",\"token\":{\"chats\":[{\"message\":\"Done.\"}]}}"))])
    );
    let controller = StreamController::new(transport);
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Completed { turn_id: outcome.turn_id(), finalized: true });
    assert_eq!(reply(&conversation, outcome.turn_id()).0, "Done.");
}

#[tokio::test]
async fn test_missing_body_fails_turn() {
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = StreamController::new(Arc::new(ScriptedTransport::failing(TransportError::MissingBody)))
        .with_notifier(notifier.clone());
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Failed { turn_id: outcome.turn_id(), error: TransportError::MissingBody });
    assert_eq!(reply(&conversation, outcome.turn_id()), (String::new(), TurnStatus::Failed));
    assert_eq!(notifier.notices.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_error_after_final_keeps_turn_complete() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![final_frame("Saved."), Err(TransportError::Network("eof".into()))])
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = StreamController::new(transport).with_notifier(notifier.clone());
    let mut conversation = Conversation::new();

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(reply(&conversation, outcome.turn_id()), ("Saved.".to_string(), TurnStatus::Complete));
    assert!(notifier.notices.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_stream_is_rejected_while_one_is_live() {
    let transport = Arc::new(ScriptedTransport::with_chunks(vec![done()]));
    let controller = StreamController::new(transport.clone());
    let mut conversation = Conversation::new();
    let live = conversation.ledger_mut().start_turn("still going");

    let result = controller.send(&mut conversation, "another", &params()).await;

    assert_eq!(result, Err(SendError::Busy { turn_id: live }));
    assert_eq!(conversation.ledger().len(), 1);
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tokens_are_revealed_on_flush_ticks() {
    let (tx, rx) = mpsc::channel(8);
    let controller = StreamController::new(Arc::new(ScriptedTransport::with_receiver(rx)))
        .with_flush_interval(Duration::from_millis(50));
    let mut conversation = Conversation::new();
    let changes = record(&mut conversation);

    tokio::spawn(async move {
        tx.send(token("Hel")).await.unwrap();
        tx.send(token("lo")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        tx.send(token(" there")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        tx.send(done()).await.unwrap();
    });

    let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();

    assert_eq!(appended(&changes), vec!["Hello".to_string(), " there".to_string()]);
    assert_eq!(reply(&conversation, outcome.turn_id()), ("Hello there".to_string(), TurnStatus::Complete));
}

#[tokio::test]
async fn test_rewrite_replaces_completed_reply() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![final_frame("Short."), done()]).with_rewrite(Ok(Some("Much longer.".into())))
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = StreamController::new(transport.clone()).with_notifier(notifier.clone());
    let mut conversation = Conversation::new();
    let turn_id = controller.send(&mut conversation, "prompt", &params()).await.unwrap().turn_id();

    controller.rewrite(&mut conversation, turn_id, RewriteKind::Expand).await.unwrap();

    assert_eq!(reply(&conversation, turn_id).0, "Much longer.");
    let rewrites = transport.rewrites.lock().unwrap();
    assert_eq!(rewrites[0].0, RewriteKind::Expand);
    assert_eq!(rewrites[0].1, RewriteRequest {
        previous_proposal: "Short.".into(),
        chat_id: Some("501".into()),
    });
    assert_eq!(*notifier.notices.lock().unwrap(), vec![Notice::success("Expanded successfully.")]);
}

#[tokio::test]
async fn test_rewrite_failure_leaves_reply_untouched() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![final_frame("Keep me."), done()]).with_rewrite(
            Err(TransportError::Status { status: 500 })
        )
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = StreamController::new(transport).with_notifier(notifier.clone());
    let mut conversation = Conversation::new();
    let turn_id = controller.send(&mut conversation, "prompt", &params()).await.unwrap().turn_id();

    let result = controller.rewrite(&mut conversation, turn_id, RewriteKind::Shorten).await;

    assert_eq!(result, Err(RewriteError::Transport(TransportError::Status { status: 500 })));
    assert_eq!(reply(&conversation, turn_id).0, "Keep me.");
    assert_eq!(*notifier.notices.lock().unwrap(), vec![Notice::error("Failed to shorten")]);
}

#[tokio::test]
async fn test_empty_rewrite_keeps_reply_without_notice() {
    let transport = Arc::new(
        ScriptedTransport::with_chunks(vec![final_frame("Keep me."), done()]).with_rewrite(Ok(None))
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = StreamController::new(transport.clone()).with_notifier(notifier.clone());
    let mut conversation = Conversation::new();
    let turn_id = controller.send(&mut conversation, "prompt", &params()).await.unwrap().turn_id();

    let result = controller.rewrite(&mut conversation, turn_id, RewriteKind::Expand).await;

    assert_eq!(result, Ok(()));
    assert_eq!(reply(&conversation, turn_id).0, "Keep me.");
    assert_eq!(transport.rewrites.lock().unwrap().len(), 1);
    assert!(notifier.notices.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rewrite_requires_completed_turn() {
    let controller = StreamController::new(Arc::new(ScriptedTransport::default()));
    let mut conversation = Conversation::new();
    let turn_id = conversation.ledger_mut().start_turn("prompt");

    assert_eq!(
        controller.rewrite(&mut conversation, turn_id, RewriteKind::Expand).await,
        Err(RewriteError::NotComplete(turn_id))
    );
    let unknown = TurnId::new();
    assert_eq!(
        controller.rewrite(&mut conversation, unknown, RewriteKind::Expand).await,
        Err(RewriteError::UnknownTurn(unknown))
    );
}

fn streamed_reply(chunks: Vec<Result<Bytes, TransportError>>) -> (String, TurnStatus) {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    runtime.block_on(async {
        let controller = StreamController::new(Arc::new(ScriptedTransport::with_chunks(chunks)));
        let mut conversation = Conversation::new();
        let outcome = controller.send(&mut conversation, "prompt", &params()).await.unwrap();
        reply(&conversation, outcome.turn_id())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_reply_is_normalized_concatenation(
        texts in prop::collection::vec("[a-z \u{e9}\n\r]{0,8}", 1..10),
        noise in prop::collection::vec(any::<bool>(), 10),
        cuts in prop::collection::vec(0usize..512, 0..8)
    ) {
        let mut body = String::new();
        for (text, noisy) in texts.iter().zip(&noise) {
            body.push_str(&format!("data:{}\n\n", serde_json::json!({ "token": text })));
            if *noisy {
                body.push_str("data:{broken\n\n: keep-alive\n\n");
            }
        }
        body.push_str("data:[DONE]\n\n");
        let bytes = body.as_bytes();

        let mut points: Vec<usize> = cuts.into_iter().map(|c| c % (bytes.len() + 1)).collect();
        points.push(0);
        points.push(bytes.len());
        points.sort_unstable();
        let chunks = points
            .windows(2)
            .map(|window| Ok(Bytes::copy_from_slice(&bytes[window[0]..window[1]])))
            .collect();

        let expected: String = texts.iter().map(|text| normalize_newlines(text)).collect();
        prop_assert_eq!(streamed_reply(chunks), (expected, TurnStatus::Complete));
    }
}
