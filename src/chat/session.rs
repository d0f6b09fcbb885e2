//! Core chat session management.
//!
//! A [`ChatSession`] owns one conversation: the history, the configuration the next request
//! is built from, and running usage totals.  It reads lines from a [`LineSource`], talks to a
//! [`ChatClient`], and reports everything through a [`Renderer`].

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::chat::commands::{InputAction, help_text, parse_input};
use crate::chat::config::{ChatConfig, ResponseMode};
use crate::chat::input::LineSource;
use crate::client::ChatClient;
use crate::error::{Error, Result};
use crate::observability::{SESSION_RESETS, SESSION_TURN_ERRORS, SESSION_TURNS};
use crate::render::Renderer;
use crate::types::{Completion, Message, MessageHistory, MessageRole, StreamFragment, Usage};

/// The prompt shown before each line of input.
pub const PROMPT: &str = "You: ";

/// The result of one successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The reply, as appended to the history.
    pub completion: Completion,
    /// Number of text fragments displayed.  One for a blocking reply with text.
    pub fragments: usize,
}

/// Whether the session loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Prompt for the next line.
    Continue,
    /// Leave the loop.
    Quit,
}

/// A chat session that manages conversation state and backend interactions.
pub struct ChatSession<C: ChatClient> {
    client: C,
    config: ChatConfig,
    history: MessageHistory,
    usage_totals: Usage,
    last_turn_usage: Option<Usage>,
    request_count: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: String,
    /// Blocking or streaming replies.
    pub mode: ResponseMode,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// The maximum tokens per response.
    pub max_tokens: u32,
    /// The system prompt, if any.
    pub system_prompt: Option<String>,
    /// Total input tokens across all successful requests.
    pub total_input_tokens: u64,
    /// Total output tokens across all successful requests.
    pub total_output_tokens: u64,
    /// Total number of requests made, including failed ones.
    pub total_requests: u64,
    /// Usage of the last successful turn.
    pub last_turn_usage: Option<Usage>,
}

impl<C: ChatClient> ChatSession<C> {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: C, config: ChatConfig) -> Self {
        Self {
            client,
            config,
            history: MessageHistory::new(),
            usage_totals: Usage::default(),
            last_turn_usage: None,
            request_count: 0,
        }
    }

    /// Runs the loop until the quit command or the end of input.
    ///
    /// Failed turns are reported through `renderer` and never end the loop.  Only a failure to
    /// read input is returned.  The renderer's interrupt is reset before every prompt, so an
    /// interrupt only ever applies to the reply that follows it.
    pub async fn run(
        &mut self,
        input: &mut dyn LineSource,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        loop {
            renderer.reset_interrupt();
            let Some(line) = input.read_line(PROMPT)? else {
                renderer.print_info("Goodbye!");
                return Ok(());
            };
            if self.handle_input(&line, renderer).await == Flow::Quit {
                renderer.print_info("Goodbye!");
                return Ok(());
            }
        }
    }

    /// Acts on one raw line of input.
    pub async fn handle_input(&mut self, raw: &str, renderer: &mut dyn Renderer) -> Flow {
        match parse_input(raw) {
            InputAction::Empty => {}
            InputAction::Quit => return Flow::Quit,
            InputAction::Reset => {
                self.clear();
                renderer.print_info("[Conversation cleared]");
            }
            InputAction::Help => {
                for line in help_text().lines() {
                    renderer.print_info(&format!("    {line}"));
                }
            }
            InputAction::Stats => self.print_stats(renderer),
            InputAction::SaveTranscript(path) => match self.save_transcript_to(&path) {
                Ok(()) => renderer.print_info(&format!("Transcript saved to {path}")),
                Err(err) => renderer.print_error(&format!("Failed to save transcript: {err}")),
            },
            InputAction::LoadTranscript(path) => match self.load_transcript_from(&path) {
                Ok(()) => renderer.print_info(&format!("Transcript loaded from {path}")),
                Err(err) => renderer.print_error(&format!("Failed to load transcript: {err}")),
            },
            InputAction::Invalid(message) => renderer.print_error(&message),
            InputAction::Message(text) => {
                if let Err(err) = self.run_turn(&text, renderer).await {
                    // An abort has already been shown as "[interrupted]".
                    if !err.is_abort() {
                        renderer.print_error(&err.to_string());
                    }
                }
            }
        }
        Flow::Continue
    }

    /// Sends one user message and displays the reply.
    ///
    /// The request carries the history plus the new user message, but the history itself is
    /// only touched once the reply is complete: on success it grows by exactly the user
    /// message and the assistant reply, on failure it is unchanged.  Partial text of an
    /// interrupted stream has been displayed but is not recorded.
    pub async fn run_turn(
        &mut self,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let mut request = self.history.as_slice().to_vec();
        request.push(Message::user(text));
        SESSION_TURNS.click();
        self.request_count = self.request_count.saturating_add(1);

        let result = match self.config.mode {
            ResponseMode::Blocking => self.reply_blocking(&request, renderer).await,
            ResponseMode::Streaming => self.reply_streaming(&request, renderer).await,
        };

        match result {
            Ok(outcome) => {
                self.history.append(MessageRole::User, text);
                self.history
                    .append(MessageRole::Assistant, outcome.completion.text.clone());
                renderer.print_usage(&outcome.completion);
                self.record_usage(outcome.completion.usage);
                Ok(outcome)
            }
            Err(err) => {
                SESSION_TURN_ERRORS.click();
                Err(err)
            }
        }
    }

    async fn reply_blocking(
        &self,
        request: &[Message],
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let completion = self.client.complete(request, &self.config).await?;
        renderer.start_response();
        renderer.print_text(&completion.text);
        renderer.finish_response();
        Ok(TurnOutcome {
            fragments: usize::from(!completion.text.is_empty()),
            completion,
        })
    }

    async fn reply_streaming(
        &self,
        request: &[Message],
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let mut stream = self
            .client
            .complete_streaming(request, &self.config)
            .await?;
        renderer.start_response();
        let mut partial = String::new();
        let mut fragments = 0;
        loop {
            if renderer.should_interrupt() {
                drop(stream);
                renderer.print_interrupted();
                return Err(Error::abort("reply interrupted by user"));
            }
            match stream.next().await {
                Some(Ok(StreamFragment::Text(text))) => {
                    renderer.print_text(&text);
                    partial.push_str(&text);
                    fragments += 1;
                }
                Some(Ok(StreamFragment::Done(completion))) => {
                    renderer.finish_response();
                    return Ok(TurnOutcome {
                        completion,
                        fragments,
                    });
                }
                Some(Err(err)) => {
                    renderer.finish_response();
                    return Err(err);
                }
                None => {
                    renderer.finish_response();
                    return Err(Error::stream_interrupted(
                        "stream ended without a final fragment",
                        partial,
                    ));
                }
            }
        }
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        SESSION_RESETS.click();
        self.history.clear();
    }

    /// The conversation so far.
    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// The configuration the next request is built from.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the current model.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// The client requests are sent through.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile {
            version: TRANSCRIPT_VERSION,
            messages: self.history.clone(),
        };
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &transcript)
            .map_err(|err| Error::io("failed to write transcript", io::Error::from(err)))
    }

    /// Loads a transcript from disk in place of the current conversation.
    ///
    /// The file is read and checked in full first; a file that fails to load leaves the
    /// history untouched.
    pub fn load_transcript_from<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open transcript file", err))?;
        let reader = BufReader::new(file);
        let transcript: TranscriptFile = serde_json::from_reader(reader)
            .map_err(|err| Error::io("failed to parse transcript", io::Error::from(err)))?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(Error::configuration(
                format!("unsupported transcript version {}", transcript.version),
                None,
            ));
        }
        self.history.clear();
        for message in transcript.messages.iter() {
            self.history.append(message.role(), message.content());
        }
        Ok(())
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            mode: self.config.mode,
            message_count: self.message_count(),
            max_tokens: self.config.max_tokens,
            system_prompt: self.config.system_prompt.clone(),
            total_input_tokens: u64::from(self.usage_totals.input_tokens),
            total_output_tokens: u64::from(self.usage_totals.output_tokens),
            total_requests: self.request_count,
            last_turn_usage: self.last_turn_usage,
        }
    }

    fn record_usage(&mut self, usage: Usage) {
        self.last_turn_usage = Some(usage);
        self.usage_totals = self.usage_totals + usage;
    }

    fn print_stats(&self, renderer: &mut dyn Renderer) {
        let stats = self.stats();
        renderer.print_info("    Session Statistics:");
        renderer.print_info(&format!("      Model: {}", stats.model));
        renderer.print_info(&format!(
            "      Mode: {}",
            match stats.mode {
                ResponseMode::Blocking => "blocking",
                ResponseMode::Streaming => "streaming",
            }
        ));
        renderer.print_info(&format!("      Max tokens: {}", stats.max_tokens));
        if let Some(prompt) = stats.system_prompt.as_deref() {
            renderer.print_info(&format!("      System prompt: {prompt}"));
        }
        renderer.print_info(&format!("      Messages: {}", stats.message_count));
        renderer.print_info(&format!(
            "      Total tokens: {} in / {} out ({} requests)",
            stats.total_input_tokens, stats.total_output_tokens, stats.total_requests
        ));
        if let Some(usage) = stats.last_turn_usage {
            renderer.print_info(&format!(
                "      Last turn tokens: {} in / {} out",
                usage.input_tokens, usage.output_tokens
            ));
        }
    }

}

const TRANSCRIPT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    messages: MessageHistory,
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::chat::input::ScriptedInput;
    use crate::client::BoxFragmentStream;
    use crate::render::PlainTextRenderer;
    use crate::types::{Message, StopReason};

    enum Scripted {
        Reply(Completion),
        Fragments(Vec<Result<StreamFragment>>),
        Fail(Error),
    }

    #[derive(Default)]
    struct FakeClient {
        script: Mutex<VecDeque<Scripted>>,
        seen: Mutex<Vec<(Vec<Message>, ChatConfig)>>,
    }

    impl FakeClient {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen: Mutex::default(),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn next(&self, history: &[Message], config: &ChatConfig) -> Scripted {
            self.seen
                .lock()
                .unwrap()
                .push((history.to_vec(), config.clone()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    #[async_trait]
    impl ChatClient for FakeClient {
        async fn complete(&self, history: &[Message], config: &ChatConfig) -> Result<Completion> {
            match self.next(history, config) {
                Scripted::Reply(completion) => Ok(completion),
                Scripted::Fail(err) => Err(err),
                Scripted::Fragments(fragments) => {
                    match fragments.into_iter().find_map(|f| match f {
                        Ok(StreamFragment::Done(completion)) => Some(completion),
                        _ => None,
                    }) {
                        Some(completion) => Ok(completion),
                        None => Err(Error::invalid_response("no completion scripted", None)),
                    }
                }
            }
        }

        async fn complete_streaming(
            &self,
            history: &[Message],
            config: &ChatConfig,
        ) -> Result<BoxFragmentStream> {
            match self.next(history, config) {
                Scripted::Fragments(fragments) => Ok(Box::pin(stream::iter(fragments))),
                Scripted::Reply(completion) => Ok(Box::pin(stream::iter(vec![
                    Ok(StreamFragment::Text(completion.text.clone())),
                    Ok(StreamFragment::Done(completion)),
                ]))),
                Scripted::Fail(err) => Err(err),
            }
        }
    }

    const PALINDROME: &str = "function isPalindrome(s){ return s === s.split('').reverse().join(''); }";

    fn palindrome() -> Completion {
        Completion::new(PALINDROME, Some(StopReason::EndTurn), Usage::new(12, 40))
    }

    fn reply(text: &str) -> Completion {
        Completion::new(text, Some(StopReason::EndTurn), Usage::new(3, 4))
    }

    fn renderer() -> PlainTextRenderer<Vec<u8>> {
        PlainTextRenderer::with_writer(Vec::new(), false)
    }

    fn output(renderer: PlainTextRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn blocking_turn_prints_reply_and_usage() {
        let client = FakeClient::new(vec![Scripted::Reply(palindrome())]);
        let mut session = ChatSession::new(client, ChatConfig::new());
        let mut out = renderer();

        let outcome = session
            .run_turn("Write a JavaScript palindrome checker", &mut out)
            .await
            .unwrap();

        assert_eq!(outcome.completion, palindrome());
        let text = output(out);
        assert!(text.contains(PALINDROME));
        assert!(text.contains("Input tokens: 12"));
        assert!(text.contains("Output tokens: 40"));
        assert!(text.contains("Stop reason: end_turn"));

        let history = session.history().as_slice();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[0],
            Message::user("Write a JavaScript palindrome checker")
        );
        assert_eq!(history[1], Message::assistant(PALINDROME));
    }

    #[tokio::test]
    async fn streaming_turn_matches_blocking_turn() {
        let fragments = vec![
            Ok(StreamFragment::Text("function isPalindrome(s){ ".to_string())),
            Ok(StreamFragment::Text(
                "return s === s.split('').reverse().join(''); }".to_string(),
            )),
            Ok(StreamFragment::Done(palindrome())),
        ];
        let client = FakeClient::new(vec![Scripted::Fragments(fragments)]);
        let config = ChatConfig::new().with_mode(ResponseMode::Streaming);
        let mut streaming = ChatSession::new(client, config);
        let mut out = renderer();
        let outcome = streaming.run_turn("palindrome", &mut out).await.unwrap();
        assert_eq!(outcome.fragments, 2);

        let client = FakeClient::new(vec![Scripted::Reply(palindrome())]);
        let mut blocking = ChatSession::new(client, ChatConfig::new());
        let mut blocking_out = renderer();
        blocking.run_turn("palindrome", &mut blocking_out).await.unwrap();

        assert_eq!(streaming.history(), blocking.history());
        assert_eq!(output(out), output(blocking_out));
    }

    #[tokio::test]
    async fn interrupted_stream_shows_partial_and_records_nothing() {
        let fragments = vec![
            Ok(StreamFragment::Text("Hel".to_string())),
            Ok(StreamFragment::Text("lo".to_string())),
            Err(Error::stream_interrupted("connection closed", "Hello")),
        ];
        let client = FakeClient::new(vec![Scripted::Fragments(fragments)]);
        let config = ChatConfig::new().with_mode(ResponseMode::Streaming);
        let mut session = ChatSession::new(client, config);
        let mut out = renderer();

        let flow = session.handle_input("say hello", &mut out).await;
        assert_eq!(flow, Flow::Continue);
        assert!(session.history().is_empty());

        let text = output(out);
        assert!(text.contains("Hello"));
        assert!(text.contains("Error: Stream interrupted: connection closed"));
    }

    #[tokio::test]
    async fn stream_without_done_is_interrupted() {
        let fragments = vec![Ok(StreamFragment::Text("par".to_string()))];
        let client = FakeClient::new(vec![Scripted::Fragments(fragments)]);
        let config = ChatConfig::new().with_mode(ResponseMode::Streaming);
        let mut session = ChatSession::new(client, config);
        let err = session.run_turn("hi", &mut renderer()).await.unwrap_err();
        assert_eq!(err.partial_text(), Some("par"));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn user_interrupt_abandons_the_reply() {
        let fragments = vec![
            Ok(StreamFragment::Text("never shown".to_string())),
            Ok(StreamFragment::Done(reply("never shown"))),
        ];
        let client = FakeClient::new(vec![Scripted::Fragments(fragments)]);
        let config = ChatConfig::new().with_mode(ResponseMode::Streaming);
        let mut session = ChatSession::new(client, config);
        let flag = Arc::new(AtomicBool::new(true));
        let mut out = renderer().with_interrupt(flag.clone());

        let err = session.run_turn("hi", &mut out).await.unwrap_err();
        assert!(err.is_abort());
        assert!(session.history().is_empty());
        assert!(flag.load(Ordering::Relaxed));
        let text = output(out);
        assert!(text.contains("[interrupted]"));
        assert!(!text.contains("never shown"));
    }

    #[tokio::test]
    async fn quit_sends_nothing() {
        let client = FakeClient::new(vec![]);
        let mut session = ChatSession::new(client, ChatConfig::new());
        let mut input = ScriptedInput::new(["quit", "this is never read"]);
        let mut out = renderer();

        session.run(&mut input, &mut out).await.unwrap();

        assert_eq!(session.client().calls(), 0);
        assert!(session.history().is_empty());
        assert_eq!(input.remaining(), 1);
        assert!(output(out).contains("Goodbye!"));
    }

    #[tokio::test]
    async fn n_turns_make_2n_messages() {
        let replies = (0..4).map(|i| Scripted::Reply(reply(&format!("reply {i}"))));
        let client = FakeClient::new(replies.collect());
        let mut session = ChatSession::new(client, ChatConfig::new());
        let mut input = ScriptedInput::new(["one", "", "two", "three", "four"]);
        session.run(&mut input, &mut renderer()).await.unwrap();

        let history = session.history().as_slice();
        assert_eq!(history.len(), 8);
        for (i, pair) in history.chunks(2).enumerate() {
            assert_eq!(pair[0].role(), MessageRole::User);
            assert_eq!(pair[1].role(), MessageRole::Assistant);
            assert_eq!(pair[1].content(), format!("reply {i}"));
        }
        let stats = session.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.total_input_tokens, 12);
        assert_eq!(stats.total_output_tokens, 16);
    }

    #[tokio::test]
    async fn clear_empties_history_and_continues() {
        let client = FakeClient::new(vec![
            Scripted::Reply(reply("a")),
            Scripted::Reply(reply("b")),
            Scripted::Reply(reply("c")),
        ]);
        let mut session = ChatSession::new(client, ChatConfig::new());
        let mut input = ScriptedInput::new(["first", "second", "CLEAR"]);
        let mut out = renderer();
        session.run(&mut input, &mut out).await.unwrap();
        assert_eq!(session.history().len(), 0);
        assert!(output(out).contains("[Conversation cleared]"));

        session.run_turn("third", &mut renderer()).await.unwrap();
        let seen = session.client().seen.lock().unwrap();
        assert_eq!(seen[2].0, vec![Message::user("third")]);
    }

    #[tokio::test]
    async fn failures_roll_back_and_the_loop_continues() {
        let client = FakeClient::new(vec![
            Scripted::Reply(reply("ok")),
            Scripted::Fail(Error::backend(Some(500), None, "model crashed")),
            Scripted::Fail(Error::backend_unavailable("connection refused", None)),
            Scripted::Fail(Error::invalid_response("not json", None)),
            Scripted::Reply(reply("still here")),
        ]);
        let mut session = ChatSession::new(client, ChatConfig::new());
        let mut input = ScriptedInput::new(["a", "b", "c", "d", "e"]);
        let mut out = renderer();
        session.run(&mut input, &mut out).await.unwrap();

        let text = output(out);
        assert!(text.contains("Error: Backend error (500): model crashed"));
        assert!(text.contains("Error: Backend unavailable: connection refused"));
        assert!(text.contains("Error: Invalid response: not json"));

        let history = session.history().as_slice();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], Message::user("e"));
        assert_eq!(session.stats().total_requests, 5);
    }

    #[tokio::test]
    async fn system_prompt_is_config_not_history() {
        let client = FakeClient::new(vec![Scripted::Reply(reply("ok"))]);
        let config = ChatConfig::new().with_system_prompt("Be concise.");
        let mut session = ChatSession::new(client, config);
        session.run_turn("hi", &mut renderer()).await.unwrap();

        assert_eq!(session.history().len(), 2);
        let seen = session.client().seen.lock().unwrap();
        assert_eq!(seen[0].1.system_prompt.as_deref(), Some("Be concise."));
        assert_eq!(seen[0].0, vec![Message::user("hi")]);
    }

    #[tokio::test]
    async fn slash_prefixed_questions_reach_the_backend() {
        let client = FakeClient::new(vec![Scripted::Reply(reply("check permissions"))]);
        let mut session = ChatSession::new(client, ChatConfig::new());
        let mut out = renderer();

        session
            .handle_input("/etc/hosts is empty, why?", &mut out)
            .await;

        assert_eq!(session.message_count(), 2);
        assert_eq!(
            session.history().as_slice()[0],
            Message::user("/etc/hosts is empty, why?")
        );
        assert!(!output(out).contains("Error:"));
    }

    #[tokio::test]
    async fn configuration_is_fixed_for_the_session() {
        let client = FakeClient::new(vec![Scripted::Reply(reply("ok"))]);
        let config = ChatConfig::new().with_model("qwen3-coder");
        let mut session = ChatSession::new(client, config.clone());
        let mut out = renderer();

        session.handle_input("/model other-model", &mut out).await;
        session.handle_input("/stats", &mut out).await;

        assert_eq!(session.config(), &config);
        let seen = session.client().seen.lock().unwrap();
        assert_eq!(seen[0].0, vec![Message::user("/model other-model")]);
        assert_eq!(seen[0].1.model, "qwen3-coder");
        let text = output(out);
        assert!(text.contains("Model: qwen3-coder"));
        assert!(!text.contains("Model changed"));
    }

    #[tokio::test]
    async fn failed_turn_request_carries_the_pending_message() {
        let client = FakeClient::new(vec![
            Scripted::Reply(reply("first answer")),
            Scripted::Fail(Error::backend_unavailable("connection refused", None)),
        ]);
        let mut session = ChatSession::new(client, ChatConfig::new());
        session.run_turn("first", &mut renderer()).await.unwrap();
        let before = session.history().clone();

        assert!(session.run_turn("second", &mut renderer()).await.is_err());

        assert_eq!(session.history(), &before);
        let seen = session.client().seen.lock().unwrap();
        assert_eq!(
            seen[1].0,
            vec![
                Message::user("first"),
                Message::assistant("first answer"),
                Message::user("second"),
            ]
        );
    }

    #[tokio::test]
    async fn interrupt_is_reset_before_each_prompt() {
        let client = FakeClient::new(vec![Scripted::Reply(reply("streamed"))]);
        let config = ChatConfig::new().with_mode(ResponseMode::Streaming);
        let mut session = ChatSession::new(client, config);
        // A Ctrl+C left over from an earlier reply.
        let flag = Arc::new(AtomicBool::new(true));
        let mut out = renderer().with_interrupt(flag.clone());
        let mut input = ScriptedInput::new(["hello"]);

        session.run(&mut input, &mut out).await.unwrap();

        assert!(!flag.load(Ordering::Relaxed));
        assert_eq!(session.message_count(), 2);
        assert!(!output(out).contains("[interrupted]"));
    }

    #[tokio::test]
    async fn transcript_round_trip() {
        let client = FakeClient::new(vec![Scripted::Reply(reply("pong"))]);
        let mut session = ChatSession::new(client, ChatConfig::new());
        session.run_turn("ping", &mut renderer()).await.unwrap();

        let path = std::env::temp_dir().join(format!(
            "palaver-transcript-{}.json",
            std::process::id()
        ));
        session.save_transcript_to(&path).unwrap();

        let client = FakeClient::new(vec![Scripted::Reply(reply("stale"))]);
        let mut restored = ChatSession::new(client, ChatConfig::new());
        restored.run_turn("older", &mut renderer()).await.unwrap();
        restored.load_transcript_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(restored.history(), session.history());

        assert!(restored.load_transcript_from(&path).is_err());
        assert_eq!(restored.history(), session.history());
    }
}
