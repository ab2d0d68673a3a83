//! Consumer-side receive logging.
//!
//! Queue deliveries arrive as batches of [`QueueRecord`]s. Each record is
//! logged as a `receive_message` event so per-tenant send and receive
//! counts can be compared.

use std::{collections::HashMap, sync::Arc};

use serde::Deserialize;

use crate::{
    dispatcher::TENANT_ID_ATTRIBUTE,
    error::{DispatchError, Result},
    log::{MESSAGE_COUNT_METRIC, MessageLogRecord, MessageLogger, RECEIVE_OPERATION},
};

/// A batch of queue deliveries.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueEvent {
    /// Delivered records.
    #[serde(rename = "Records")]
    pub records: Vec<QueueRecord>,
}

/// One delivered message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    /// Queue-assigned message id.
    pub message_id: String,
    /// ARN of the queue the message came from.
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    /// Message body.
    #[serde(default)]
    pub body: String,
    /// Attributes attached on send.
    #[serde(default)]
    pub message_attributes: HashMap<String, AttributeValue>,
}

/// A delivered message attribute.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValue {
    /// String value, for `String` attributes.
    pub string_value: Option<String>,
    /// Declared data type.
    #[serde(default)]
    pub data_type: String,
}

impl QueueRecord {
    /// Queue name: the last `:` field of the source ARN.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        self.event_source_arn.rsplit(':').next().unwrap_or(&self.event_source_arn)
    }

    /// The `tenant_id` attribute, if present and non-empty.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.message_attributes
            .get(TENANT_ID_ATTRIBUTE)
            .and_then(|attr| attr.string_value.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Logs every received message.
pub struct ReceiveLogger {
    logger: Arc<dyn MessageLogger>,
}

impl ReceiveLogger {
    /// Creates a receive logger writing to `logger`.
    pub fn new(logger: Arc<dyn MessageLogger>) -> Self {
        Self { logger }
    }

    /// Logs one `receive_message` event per record and returns the count.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] if any record lacks a
    /// tenant attribute; nothing from the batch is logged in that case.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub async fn process(&self, records: &[QueueRecord]) -> Result<usize> {
        let tenants = records
            .iter()
            .map(|record| {
                record.tenant_id().ok_or_else(|| {
                    DispatchError::invalid_request(format!(
                        "message {} has no {TENANT_ID_ATTRIBUTE} attribute",
                        record.message_id
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for (record, tenant_id) in records.iter().zip(tenants) {
            let entry = MessageLogRecord::builder()
                .operation(RECEIVE_OPERATION)
                .message_id(record.message_id.as_str())
                .tenant_id(tenant_id)
                .queue(record.queue_name())
                .metrics(vec![MESSAGE_COUNT_METRIC.to_owned()])
                .dimensions(vec!["operation".to_owned(), "tenantId".to_owned()])
                .build();
            self.logger.log(&entry).await;
        }
        Ok(records.len())
    }
}
