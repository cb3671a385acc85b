//! Forwarding `tracing` events into a facade logger
//!
//! Libraries that log through `tracing` can share the facade's sink: install
//! [`FacadeLayer`] on a registry and their events are re-emitted through a
//! [`Logger`] with the same encoder, filter and rotation.

use std::fmt;

use tracing::field::{Field as TracingField, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

use super::encoder::Caller;
use super::field::Field;
use super::level::Level;
use super::logger::Logger;

/// Layer that writes every event it sees through a [`Logger`]
#[derive(Debug, Clone)]
pub struct FacadeLayer {
    logger: Logger,
}

impl FacadeLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

/// Collects event fields, pulling out the message
#[derive(Debug, Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<Field>,
}

impl FieldVisitor {
    fn record(&mut self, field: &TracingField, value: Field) {
        if field.name() == "message" {
            if let super::field::Value::Str(text) = value.value {
                self.message = Some(text);
            }
        } else {
            self.fields.push(value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &TracingField, value: &str) {
        self.record(field, Field::string(field.name(), value));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.record(field, Field::bool(field.name(), value));
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.record(field, Field::int(field.name(), value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.record(field, Field::uint(field.name(), value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.record(field, Field::float(field.name(), value));
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn std::error::Error + 'static)) {
        self.record(field, Field::named_error(field.name(), value));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn fmt::Debug) {
        self.record(field, Field::string(field.name(), format!("{:?}", value)));
    }
}

impl<S> Layer<S> for FacadeLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from(*metadata.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let caller = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(Caller::new(file, line)),
            _ => None,
        };
        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());

        self.logger
            .named(metadata.target())
            .log(level, caller, &message, &visitor.fields);
    }
}

/// Route all `tracing` events through `logger`.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` selects what is forwarded.
pub fn init_tracing_bridge(logger: Logger, default_filter: &str) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(FacadeLayer::new(logger))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::encoder::Encoder;
    use crate::logs::test_support::CapturedWriter;

    fn with_bridge(min: Level, f: impl FnOnce()) -> CapturedWriter {
        let out = CapturedWriter::default();
        let logger = Logger::from_writer(Encoder::json(), min, out.clone());
        let subscriber = tracing_subscriber::registry().with(FacadeLayer::new(logger));
        tracing::subscriber::with_default(subscriber, f);
        out
    }

    #[test]
    fn test_event_is_forwarded() {
        let out = with_bridge(Level::Debug, || {
            tracing::info!(target: "db", rows = 3u64, table = "users", "query finished");
        });

        let lines = out.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "info");
        assert_eq!(lines[0]["logger"], "db");
        assert_eq!(lines[0]["msg"], "query finished");
        assert_eq!(lines[0]["rows"], 3);
        assert_eq!(lines[0]["table"], "users");
        assert!(lines[0]["caller"].as_str().unwrap().starts_with("logs/bridge.rs:"));
    }

    #[test]
    fn test_trace_maps_to_debug_and_is_filtered() {
        let out = with_bridge(Level::Info, || {
            tracing::trace!("noise");
            tracing::debug!("more noise");
            tracing::warn!("signal");
        });

        let lines = out.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["msg"], "signal");
    }

    #[test]
    fn test_formatted_message() {
        let out = with_bridge(Level::Debug, || {
            tracing::error!(code = -1i64, "exit after {} retries", 3);
        });

        let line = &out.lines()[0];
        assert_eq!(line["msg"], "exit after 3 retries");
        assert_eq!(line["code"], -1);
        assert_eq!(line["level"], "error");
    }
}
