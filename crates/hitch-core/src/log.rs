/// Severity of a message forwarded through a `LogSink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Host-suppliable log adapter. The core never writes to stdout/stderr
/// directly; every component logs through a `LogSink`, defaulting to one
/// that forwards into `tracing`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Default `LogSink` forwarding into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<(LogLevel, String)>>,
    }

    impl LogSink for RecordingSink {
        fn log(&self, level: LogLevel, message: &str) {
            self.messages.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn tracing_sink_does_not_panic() {
        let sink = TracingLogSink;
        sink.log(LogLevel::Info, "hello");
        sink.log(LogLevel::Error, "boom");
    }

    #[test]
    fn custom_sink_records_messages() {
        let sink = RecordingSink::default();
        sink.log(LogLevel::Warn, "careful");
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], (LogLevel::Warn, "careful".to_string()));
    }
}
