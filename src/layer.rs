use crate::entity::Caller;
use crate::level::Level;
use crate::logger::Logger;
use crate::producer::on_worker_thread;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that feeds every event into a [`Logger`], so
/// `tracing` macros are rendered locally and shipped like direct calls.
///
/// Events emitted by this crate itself, and anything raised on a producer
/// worker thread (the transport's own dependencies), are skipped so
/// shipping never generates more shipping.
pub struct ShipLayer {
    logger: Arc<Logger>,
}

impl ShipLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }
}

impl<S> Layer<S> for ShipLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target().starts_with(env!("CARGO_CRATE_NAME")) || on_worker_thread() {
            return;
        }

        let level = Level::from(*meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let caller = Caller::new(meta.file().unwrap_or_else(|| meta.target()), meta.line().unwrap_or(0));
        self.logger.emit(level, caller, render_message(message, &fields));
    }
}

/// Message text followed by the remaining fields as `key=value` pairs.
fn render_message(message: Option<String>, fields: &BTreeMap<String, serde_json::Value>) -> String {
    let mut out = message.unwrap_or_default();
    for (key, value) in fields {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = match value {
            serde_json::Value::String(s) => write!(out, "{key}={s}"),
            other => write!(out, "{key}={other}"),
        };
    }
    out
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
