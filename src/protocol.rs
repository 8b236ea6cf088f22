use serde::{Deserialize, Serialize};

use crate::{
    pipeline::{PipelineResult, ServiceError},
    types::{ConversationContext, PipelineInput, RequestId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Execute(PipelineInput),
    Ack { ack_token: String, text: String },
    Exit,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Execute(WireExecute),
    Ack(WireAck),
    Exit(WireExit),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireExecute {
    #[serde(default)]
    request_id: Option<RequestId>,
    message: String,
    #[serde(default)]
    context: ConversationContext,
    #[serde(default)]
    debug: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireAck {
    ack_token: String,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireExit {}

pub fn parse_client_message(line: &str) -> Result<ClientMessage, serde_json::Error> {
    let wire: WireMessage = serde_json::from_str(line)?;
    let message = match wire {
        WireMessage::Execute(execute) => ClientMessage::Execute(PipelineInput {
            request_id: execute.request_id,
            message: execute.message,
            context: execute.context,
            debug: execute.debug,
        }),
        WireMessage::Ack(ack) => ClientMessage::Ack {
            ack_token: ack.ack_token,
            text: ack.text,
        },
        WireMessage::Exit(WireExit {}) => ClientMessage::Exit,
    };
    Ok(message)
}

/// One NDJSON line written back per request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Result {
        result: Box<PipelineResult>,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        audit_id: Option<String>,
    },
}

impl ServerMessage {
    pub fn result(result: PipelineResult) -> Self {
        Self::Result {
            result: Box::new(result),
        }
    }

    /// Carries the generic display text only; details stay in the audit record and logs.
    pub fn service_error(err: &ServiceError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            audit_id: err.audit_id().map(str::to_string),
        }
    }

    pub fn protocol_error(err: &serde_json::Error) -> Self {
        Self::Error {
            code: "invalid_message".to_string(),
            message: format!("invalid protocol message: {err}"),
            audit_id: None,
        }
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
