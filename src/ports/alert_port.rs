//! Fire-and-forget notification sink.

/// Implementations swallow their own delivery failures; `notify` never
/// reports back and the engine never retries.
pub trait AlertSink {
    fn notify(&self, text: &str);
}
