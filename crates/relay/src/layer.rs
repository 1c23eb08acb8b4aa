//! Tracing layer feeding captured events into the store and the batcher.

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::batch::BatcherHandle;
use crate::level::LogLevel;
use crate::store::{ConsoleStore, LogEntry};
use crate::transport::LogPayload;
use crate::value::{LogValue, format_values};

/// Targets whose events the relay must never observe: its own modules and
/// the HTTP client stack it sends batches through. Capturing them would
/// loop the pipeline back on its own traffic.
const SELF_TARGETS: &[&str] = &["console_relay", "hyper", "reqwest", "h2", "rustls"];

fn is_self_traffic(target: &str) -> bool {
    SELF_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// Records every event into the display store and queues its flattened
/// form for upload. Other layers in the stack see events untouched, so
/// default console output is preserved by composition.
#[derive(Debug)]
pub struct CaptureLayer {
    store: ConsoleStore,
    batcher: BatcherHandle,
    source_url: String,
}

impl CaptureLayer {
    pub(crate) fn new(store: ConsoleStore, batcher: BatcherHandle, source_url: String) -> Self {
        Self {
            store,
            batcher,
            source_url,
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_self_traffic(metadata.target()) {
            return;
        }

        let mut visitor = ValueVisitor::default();
        event.record(&mut visitor);

        let level = LogLevel::from(metadata.level());
        let message = format_values(&visitor.values);

        self.store.append(LogEntry::new(level, visitor.values));
        self.batcher.enqueue(LogPayload {
            level,
            message,
            url: self.source_url.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }
}

/// Maps event fields onto captured values: the `message` field becomes a
/// bare value, every other field keeps its name.
#[derive(Debug, Default)]
struct ValueVisitor {
    values: Vec<LogValue>,
}

const MESSAGE_FIELD: &str = "message";

impl ValueVisitor {
    fn push(&mut self, field: &Field, value: LogValue) {
        if field.name() == MESSAGE_FIELD {
            self.values.push(value);
        } else {
            self.values.push(LogValue::Field {
                name: field.name().to_string(),
                value: Box::new(value),
            });
        }
    }
}

impl Visit for ValueVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, LogValue::Text(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, LogValue::Text(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, LogValue::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, LogValue::Uint(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, LogValue::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, LogValue::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(
            field,
            LogValue::Error {
                name: "Error".to_string(),
                message: value.to_string(),
            },
        );
    }
}
