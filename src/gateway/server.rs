//! Inbound interaction gateway.
//!
//! Consumes a plain method/headers/body triple from whatever web framework
//! hosts the webhook endpoint and produces a status/body pair, keeping the
//! framework itself out of the pipeline. Signature verification is a
//! boundary trait; the cryptography lives behind it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use super::dispatcher::Dispatcher;
use super::types::{interaction_type, response_type, InteractionPayload};

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
/// Header carrying the signature timestamp.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Verifies a request signature against the application public key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, body: &str, signature: &str, timestamp: &str) -> bool;
}

/// An inbound HTTP request, reduced to what the gateway consumes.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl GatewayRequest {
    pub fn new(method: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }
}

/// The gateway's answer, handed back to the hosting framework.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl GatewayResponse {
    fn status(status: u16) -> Self {
        Self { status, body: None }
    }

    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }
}

/// Webhook endpoint logic for interaction requests.
pub struct InteractionGateway {
    verifier: Arc<dyn SignatureVerifier>,
    dispatcher: Arc<Dispatcher>,
}

impl InteractionGateway {
    pub fn new(verifier: Arc<dyn SignatureVerifier>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            verifier,
            dispatcher,
        }
    }

    /// Handles one inbound request.
    ///
    /// Only `POST` is accepted. A missing signature/timestamp header pair or
    /// a failed verification is an unauthenticated rejection; a body that is
    /// not valid JSON after verification is a caller error. Ping payloads
    /// are answered synchronously with pong; recognized command payloads are
    /// acknowledged with 202 before dispatch runs detached; anything else is
    /// a bad request, logged for visibility.
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        if !request.method.eq_ignore_ascii_case("POST") {
            return GatewayResponse::status(405);
        }

        let (signature, timestamp) = match (
            request.header(SIGNATURE_HEADER),
            request.header(TIMESTAMP_HEADER),
        ) {
            (Some(signature), Some(timestamp)) => (signature, timestamp),
            _ => return GatewayResponse::status(401),
        };

        if !self
            .verifier
            .verify(&request.body, signature, timestamp)
            .await
        {
            return GatewayResponse::status(401);
        }

        let payload: InteractionPayload = match serde_json::from_str(&request.body) {
            Ok(payload) => payload,
            Err(_) => return GatewayResponse::status(400),
        };

        match payload.kind {
            interaction_type::PING => {
                GatewayResponse::json(200, json!({ "type": response_type::PONG }))
            }
            interaction_type::APPLICATION_COMMAND => {
                // Acknowledge first; handler execution is a detached flow
                // joined to this request only by the interaction id.
                self.dispatcher.dispatch_detached(payload);
                GatewayResponse::status(202)
            }
            other => {
                warn!(kind = other, body = %request.body, "Received unsupported interaction type");
                GatewayResponse::status(400)
            }
        }
    }
}
