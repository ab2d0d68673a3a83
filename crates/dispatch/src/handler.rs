//! Request boundary.
//!
//! [`MessageHandler::handle`] turns an [`InboundRequest`] into a
//! [`Response`]: it validates the body, verifies the bearer token,
//! dispatches, logs the send, and maps any [`DispatchError`] to a status
//! through [`outcome_for`]. Nothing below this layer knows about status codes.

use std::{collections::HashMap, sync::Arc};

use serde::Deserialize;
use serde_json::{Value, json};
use tenantq_authn::{AuthError, IdentityClaims, TokenVerifier};

use crate::{
    config::{DispatchConfig, account_id_from_arn},
    dispatcher::ScopedDispatcher,
    error::{DispatchError, Result, outcome_for},
    log::{
        LogLevel, MESSAGE_COUNT_METRIC, MessageLogRecord, MessageLogger, NoopMessageLogger,
        SEND_OPERATION,
    },
};

/// Success message returned with status 200.
pub const SENT_MESSAGE: &str = "message sent to queue";

/// One inbound request as handed over by the transport shim.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Request headers, with the casing the transport delivered.
    pub headers: HashMap<String, String>,
    /// Raw body.
    pub body: Option<String>,
    /// Invocation request id, when known.
    pub request_id: Option<String>,
    /// ARN of the invoked function; its account overrides the configured one.
    pub invoked_function_arn: Option<String>,
}

/// Status and JSON body returned to the transport shim.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// Handles send requests end to end.
pub struct MessageHandler {
    verifier: TokenVerifier,
    dispatcher: ScopedDispatcher,
    logger: Arc<dyn MessageLogger>,
    config: DispatchConfig,
}

#[bon::bon]
impl MessageHandler {
    /// Creates a handler.
    #[builder]
    pub fn new(
        verifier: TokenVerifier,
        dispatcher: ScopedDispatcher,
        config: DispatchConfig,
        #[builder(default = Arc::new(NoopMessageLogger) as Arc<dyn MessageLogger>)]
        logger: Arc<dyn MessageLogger>,
    ) -> Self {
        Self { verifier, dispatcher, logger, config }
    }

    /// Handles one request; never fails, every error becomes a response.
    #[tracing::instrument(
        skip_all,
        fields(request_id = request.request_id.as_deref().unwrap_or(""))
    )]
    pub async fn handle(&self, request: &InboundRequest) -> Response {
        match self.try_handle(request).await {
            Ok(claims) => {
                Response { status: 200, body: json!({ "message": SENT_MESSAGE, "claims": claims }) }
            },
            Err(err) => self.reject(request, &err).await,
        }
    }

    async fn try_handle(&self, request: &InboundRequest) -> Result<IdentityClaims> {
        let body = request
            .body
            .as_deref()
            .ok_or_else(|| DispatchError::invalid_request("missing body"))?;
        let parsed: MessageBody = serde_json::from_str(body).map_err(|e| {
            DispatchError::invalid_request(format!("body must carry a 'message' string: {e}"))
        })?;
        tracing::debug!(message_len = parsed.message.len(), "request body accepted");

        let (token, claims) = self.verifier.verify(&request.headers).await?;

        let account_id = request
            .invoked_function_arn
            .as_deref()
            .and_then(account_id_from_arn)
            .unwrap_or(self.config.account_id());

        let result = self
            .dispatcher
            .dispatch(&token, &claims, account_id, self.config.service_name(), &parsed.message)
            .await?;
        self.logger.log(&result.log_record(request.request_id.as_deref())).await;
        Ok(claims)
    }

    async fn reject(&self, request: &InboundRequest, err: &DispatchError) -> Response {
        let outcome = outcome_for(err);
        tracing::warn!(
            step = err.step(),
            class = %outcome.class,
            status = outcome.status,
            error = %err,
            "request rejected"
        );

        if matches!(err, DispatchError::Auth(AuthError::TokenExpired)) {
            let record = MessageLogRecord::builder()
                .operation(SEND_OPERATION)
                .message_id("none")
                .tenant_id("")
                .level(LogLevel::Error)
                .maybe_request_id(request.request_id.as_deref())
                .metrics(vec![MESSAGE_COUNT_METRIC.to_owned()])
                .dimensions(vec!["operation".to_owned(), "tenantId".to_owned()])
                .build();
            self.logger.log(&record).await;
        }

        Response {
            status: outcome.status,
            body: json!({ "message": err.to_string(), "class": outcome.class.as_str() }),
        }
    }
}
