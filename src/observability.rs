use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("palaver.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("palaver.stream.events");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("palaver.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("palaver.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("palaver.stream.bytes");
pub(crate) static STREAM_INTERRUPTED: Counter = Counter::new("palaver.stream.interrupted");

pub(crate) static SESSION_TURNS: Counter = Counter::new("palaver.session.turns");
pub(crate) static SESSION_TURN_ERRORS: Counter = Counter::new("palaver.session.turn_errors");
pub(crate) static SESSION_RESETS: Counter = Counter::new("palaver.session.resets");

pub(crate) static TOOL_CALLS: Counter = Counter::new("palaver.tools.calls");
pub(crate) static TOOL_ERRORS: Counter = Counter::new("palaver.tools.errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_INTERRUPTED);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_ERRORS);
    collector.register_counter(&SESSION_RESETS);

    collector.register_counter(&TOOL_CALLS);
    collector.register_counter(&TOOL_ERRORS);
}
