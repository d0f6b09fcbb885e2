//! Folds message stream events into reply fragments.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

use crate::client_logger::ClientLogger;
use crate::observability::{STREAM_ERRORS, STREAM_FRAGMENTS, STREAM_INTERRUPTED};
use crate::{
    Completion, ContentBlockDelta, ContentBlockDeltaEvent, Error, MessageStreamEvent, Result,
    StopReason, StreamFragment, Usage,
};

/// A stream wrapper that turns `MessageStreamEvent`s into [`StreamFragment`]s.
///
/// Every text delta is passed through as a `Text` fragment while the full reply is accumulated
/// alongside.  `message_stop` yields the accumulated `Done` fragment.  If the events run out, or
/// the transport breaks, before `message_stop`, the stream yields
/// [`Error::StreamInterrupted`] carrying everything received so far.  The stream ends after
/// its first error or its `Done`.
pub struct FragmentStream {
    inner: Pin<Box<dyn Stream<Item = Result<MessageStreamEvent>> + Send>>,
    logger: Option<Arc<dyn ClientLogger>>,
    text: String,
    stop_reason: Option<StopReason>,
    usage: Usage,
    finished: bool,
}

impl FragmentStream {
    /// Wrap an event stream.
    pub fn new<S>(events: S) -> Self
    where
        S: Stream<Item = Result<MessageStreamEvent>> + Send + 'static,
    {
        Self {
            inner: Box::pin(events),
            logger: None,
            text: String::new(),
            stop_reason: None,
            usage: Usage::default(),
            finished: false,
        }
    }

    /// Report fragments, the completion, and errors to `logger`.
    pub fn with_logger(mut self, logger: Option<Arc<dyn ClientLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Text received so far.
    pub fn partial_text(&self) -> &str {
        &self.text
    }

    fn fail(&mut self, err: Error) -> Poll<Option<Result<StreamFragment>>> {
        self.finished = true;
        STREAM_ERRORS.click();
        if err.is_stream_interrupted() {
            STREAM_INTERRUPTED.click();
        }
        if let Some(logger) = &self.logger {
            logger.log_error(&err);
        }
        Poll::Ready(Some(Err(err)))
    }

    fn interrupted(&mut self, message: String) -> Poll<Option<Result<StreamFragment>>> {
        let err = Error::stream_interrupted(message, self.text.clone());
        self.fail(err)
    }

    fn complete(&mut self) -> Poll<Option<Result<StreamFragment>>> {
        self.finished = true;
        let completion = Completion::new(std::mem::take(&mut self.text), self.stop_reason, self.usage);
        if let Some(logger) = &self.logger {
            logger.log_stream_completion(&completion);
        }
        Poll::Ready(Some(Ok(StreamFragment::Done(completion))))
    }
}

impl Stream for FragmentStream {
    type Item = Result<StreamFragment>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            let event = match this.inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(event))) => event,
                Poll::Ready(Some(Err(Error::StreamInterrupted { message, .. }))) => {
                    return this.interrupted(message);
                }
                Poll::Ready(Some(Err(err))) => return this.fail(err),
                Poll::Ready(None) => {
                    return this.interrupted("stream ended before message_stop".to_string());
                }
            };
            match event {
                MessageStreamEvent::MessageStart(start) => {
                    this.usage = start.message.usage;
                    if start.message.stop_reason.is_some() {
                        this.stop_reason = start.message.stop_reason;
                    }
                }
                MessageStreamEvent::ContentBlockDelta(ContentBlockDeltaEvent {
                    delta: ContentBlockDelta::TextDelta { text },
                    ..
                }) => {
                    if text.is_empty() {
                        continue;
                    }
                    this.text.push_str(&text);
                    STREAM_FRAGMENTS.click();
                    if let Some(logger) = &this.logger {
                        logger.log_stream_fragment(&text);
                    }
                    return Poll::Ready(Some(Ok(StreamFragment::Text(text))));
                }
                MessageStreamEvent::MessageDelta(delta) => {
                    if delta.delta.stop_reason.is_some() {
                        this.stop_reason = delta.delta.stop_reason;
                    }
                    if let Some(input_tokens) = delta.usage.input_tokens {
                        this.usage.input_tokens = input_tokens;
                    }
                    if let Some(output_tokens) = delta.usage.output_tokens {
                        this.usage.output_tokens = output_tokens;
                    }
                }
                MessageStreamEvent::MessageStop => return this.complete(),
                MessageStreamEvent::Error(event) => {
                    let err = Error::backend(None, event.error.error_type, event.error.message);
                    return this.fail(err);
                }
                MessageStreamEvent::Ping
                | MessageStreamEvent::ContentBlockStart(_)
                | MessageStreamEvent::ContentBlockDelta(_)
                | MessageStreamEvent::ContentBlockStop(_) => {}
            }
        }
    }
}
