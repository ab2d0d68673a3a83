//! Structured message log records.
//!
//! Every send and receive produces one [`MessageLogRecord`]. Records render
//! to an embedded-metric JSON document via [`MessageLogRecord::to_emf`]: the
//! record fields, the hosting [`LogContext`], and an `_aws` block declaring
//! which fields are metrics and which are dimensions.
//!
//! # Backends
//!
//! - [`TracingMessageLogger`]: emits the rendered document as a `tracing` event.
//! - [`NoopMessageLogger`]: discards records.
//! - [`MemoryMessageLogger`]: keeps records for inspection.
//!
//! ```
//! use tenantq_dispatch::log::{LogLevel, MessageLogRecord};
//! use tenantq_dispatch::LogContext;
//!
//! let record = MessageLogRecord::builder()
//!     .operation("send_message")
//!     .message_id("m-1")
//!     .tenant_id("t1")
//!     .queue("orders-pool-1")
//!     .metrics(vec!["messageCount".into()])
//!     .dimensions(vec!["operation".into(), "tenantId".into()])
//!     .build();
//! let doc = record.to_emf(&LogContext::default());
//! assert_eq!(doc["tenantId"], "t1");
//! assert_eq!(doc["loglevel"], LogLevel::Info.as_str());
//! ```

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use crate::config::LogContext;

/// Operation name for dispatched messages.
pub const SEND_OPERATION: &str = "send_message";

/// Operation name for consumed messages.
pub const RECEIVE_OPERATION: &str = "receive_message";

/// Metric emitted with every record.
pub const MESSAGE_COUNT_METRIC: &str = "messageCount";

/// Severity of a message log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Normal traffic.
    #[default]
    Info,
    /// A failed operation worth alerting on.
    Error,
}

impl LogLevel {
    /// Level name as written to the `loglevel` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One send or receive event.
#[derive(Debug, Clone, PartialEq, bon::Builder)]
pub struct MessageLogRecord {
    /// When the event occurred (defaults to now).
    #[builder(default = Utc::now())]
    pub timestamp: DateTime<Utc>,
    /// `send_message` or `receive_message`.
    #[builder(into)]
    pub operation: String,
    /// Queue-assigned message id, or `none`.
    #[builder(into)]
    pub message_id: String,
    /// Tenant the message belongs to.
    #[builder(into)]
    pub tenant_id: String,
    /// Always `1`; rendered as a string metric value.
    #[builder(into, default = "1".to_owned())]
    pub message_count: String,
    /// Short queue name.
    #[builder(into, default)]
    pub queue: String,
    /// Severity.
    #[builder(default)]
    pub level: LogLevel,
    /// Invocation request id, when known.
    #[builder(into)]
    pub request_id: Option<String>,
    /// Field names published as metrics.
    #[builder(default)]
    pub metrics: Vec<String>,
    /// Field names used as metric dimensions.
    #[builder(default)]
    pub dimensions: Vec<String>,
}

impl MessageLogRecord {
    /// Renders the record as an embedded-metric JSON document.
    ///
    /// `environment` is always appended to the dimension set; every metric
    /// has unit `None`.
    #[must_use]
    pub fn to_emf(&self, context: &LogContext) -> Value {
        let mut doc = Map::new();
        doc.insert("operation".into(), json!(self.operation));
        doc.insert("messageId".into(), json!(self.message_id));
        doc.insert("tenantId".into(), json!(self.tenant_id));
        doc.insert("messageCount".into(), json!(self.message_count));
        doc.insert("queue".into(), json!(self.queue));
        doc.insert("loglevel".into(), json!(self.level.as_str()));
        if let Some(request_id) = &self.request_id {
            doc.insert("requestId".into(), json!(request_id));
        }
        doc.insert("environment".into(), json!(context.environment));
        doc.insert("functionName".into(), json!(context.function_name));
        doc.insert("functionVersion".into(), json!(context.function_version));
        doc.insert("region".into(), json!(context.region));

        let mut dimensions = self.dimensions.clone();
        dimensions.push("environment".to_owned());
        let metrics: Vec<Value> =
            self.metrics.iter().map(|name| json!({ "Name": name, "Unit": "None" })).collect();
        doc.insert(
            "_aws".into(),
            json!({
                "Timestamp": self.timestamp.timestamp_millis(),
                "CloudWatchMetrics": [{
                    "Namespace": context.namespace,
                    "Dimensions": [dimensions],
                    "Metrics": metrics,
                }],
            }),
        );
        Value::Object(doc)
    }
}

/// Sink for message log records. Fire-and-forget.
#[async_trait]
pub trait MessageLogger: Send + Sync {
    /// Records one event.
    async fn log(&self, record: &MessageLogRecord);
}

#[async_trait]
impl<L: MessageLogger + ?Sized> MessageLogger for Arc<L> {
    async fn log(&self, record: &MessageLogRecord) {
        (**self).log(record).await;
    }
}

/// Emits each record's embedded-metric document as a `tracing` event.
///
/// Info records go out at `INFO`, error records at `ERROR`. The document is
/// carried in the `emf` field; `operation`, `tenant_id` and `queue` are also
/// recorded as separate fields for filtering.
#[derive(Debug, Clone, Default)]
pub struct TracingMessageLogger {
    context: LogContext,
}

impl TracingMessageLogger {
    /// Creates a logger stamping records with `context`.
    #[must_use]
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MessageLogger for TracingMessageLogger {
    async fn log(&self, record: &MessageLogRecord) {
        let emf = record.to_emf(&self.context);
        match record.level {
            LogLevel::Info => tracing::info!(
                operation = %record.operation,
                tenant_id = %record.tenant_id,
                queue = %record.queue,
                emf = %emf,
                "message_event"
            ),
            LogLevel::Error => tracing::error!(
                operation = %record.operation,
                tenant_id = %record.tenant_id,
                queue = %record.queue,
                emf = %emf,
                "message_event"
            ),
        }
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMessageLogger;

#[async_trait]
impl MessageLogger for NoopMessageLogger {
    async fn log(&self, _record: &MessageLogRecord) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryMessageLogger {
    records: Mutex<Vec<MessageLogRecord>>,
}

impl MemoryMessageLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records logged so far.
    #[must_use]
    pub fn records(&self) -> Vec<MessageLogRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl MessageLogger for MemoryMessageLogger {
    async fn log(&self, record: &MessageLogRecord) {
        self.records.lock().push(record.clone());
    }
}
