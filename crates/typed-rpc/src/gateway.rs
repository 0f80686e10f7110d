//! Framework-agnostic adapter core
//!
//! A web framework binding only has to hand each request to
//! [`Gateway::handle_route`] and write back the returned status and body.
//! The route convention is:
//!
//! | Method | Path | Body |
//! |---|---|---|
//! | `POST` | `{prefix}/query/{path}` | `{"input": ...}` |
//! | `POST` | `{prefix}/mutation/{path}` | `{"input": ...}` |
//! | `GET` | `{prefix}/health` | |
//!
//! Responses use the envelopes from [`crate::response`].
//!
//! The gateway also implements [`Transport`], so a client can call a
//! router in-process through the full envelope round trip.

use crate::client::{Transport, TransportError};
use crate::config::{ConfigValidationError, GatewayConfig};
use crate::error::RpcError;
use crate::procedure::ProcedureKind;
use crate::response::ResponseEnvelope;
use crate::validation::validate_input_size;
use crate::{Router, RpcContext};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, trace};

/// A route recognised by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `{prefix}/health`
    Health,
    /// `{prefix}/{kind}/{path}`
    Procedure {
        /// Kind named in the URL
        kind: ProcedureKind,
        /// Dotted procedure path
        path: String,
    },
}

/// Status and JSON body to send back.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    /// Transport status code
    pub status: u16,
    /// Response body
    pub body: Value,
}

impl GatewayResponse {
    fn envelope(status: u16, envelope: ResponseEnvelope) -> Self {
        Self {
            status,
            body: envelope.into_value(),
        }
    }
}

/// Serves a router over the route convention.
#[derive(Debug, Clone)]
pub struct Gateway {
    router: Arc<Router>,
    config: GatewayConfig,
}

impl Gateway {
    /// Create a gateway with the default configuration
    pub fn new(router: impl Into<Arc<Router>>) -> Self {
        Self {
            router: router.into(),
            config: GatewayConfig::default(),
        }
    }

    /// Create a gateway with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found.
    pub fn with_config(
        router: impl Into<Arc<Router>>,
        config: GatewayConfig,
    ) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        Ok(Self {
            router: router.into(),
            config,
        })
    }

    /// The served router
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// URL for a procedure call.
    pub fn procedure_url(&self, kind: ProcedureKind, path: &str) -> String {
        format!("{}/{}/{}", self.config.prefix, kind, path)
    }

    /// URL of the health probe.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.config.prefix)
    }

    /// Match a URL path against the route convention.
    ///
    /// Any query string is ignored.
    pub fn parse_route(&self, url_path: &str) -> Option<Route> {
        let url_path = url_path.split('?').next().unwrap_or(url_path);
        let rest = url_path.strip_prefix(self.config.prefix.as_str())?;
        let rest = rest.strip_prefix('/')?;

        if rest == "health" {
            return Some(Route::Health);
        }

        let (kind, path) = rest.split_once('/')?;
        let kind = kind.parse::<ProcedureKind>().ok()?;
        if path.is_empty() {
            return None;
        }
        Some(Route::Procedure {
            kind,
            path: path.to_string(),
        })
    }

    /// Handle one transport request.
    ///
    /// `method` is compared case-insensitively. `ctx` carries whatever the
    /// adapter wants resolvers and middleware to see (usually the raw
    /// request); a fresh context is used when it is `None`.
    pub async fn handle_route(
        &self,
        method: &str,
        url_path: &str,
        body: Value,
        ctx: Option<RpcContext>,
    ) -> GatewayResponse {
        let Some(route) = self.parse_route(url_path) else {
            debug!(url = %url_path, "No route matched");
            return self.error(RpcError::not_found(format!("Route {} not found", url_path)));
        };

        match route {
            Route::Health => {
                if !method.eq_ignore_ascii_case("GET") {
                    return self.error(RpcError::method_not_allowed(format!(
                        "Method {} not allowed for health check",
                        method
                    )));
                }
                GatewayResponse {
                    status: 200,
                    body: json!({ "status": "healthy" }),
                }
            }
            Route::Procedure { kind, path } => {
                if !method.eq_ignore_ascii_case("POST") {
                    return self.error(RpcError::method_not_allowed(format!(
                        "Method {} not allowed; procedures are called with POST",
                        method
                    )));
                }
                self.call(kind, &path, body, ctx).await
            }
        }
    }

    async fn call(
        &self,
        kind: ProcedureKind,
        path: &str,
        body: Value,
        ctx: Option<RpcContext>,
    ) -> GatewayResponse {
        if !body.is_object() {
            debug!(path = %path, "Request body is not a JSON object");
            return self.error(RpcError::bad_request("Request body must be a JSON object"));
        }

        // The limit covers the whole body, not only the input field.
        if let Err(error) = validate_input_size(&body, self.config.max_input_size) {
            debug!(path = %path, max = self.config.max_input_size, "Request body too large");
            return self.error(error);
        }

        let input = match body {
            Value::Object(mut fields) => fields.remove("input").unwrap_or(Value::Null),
            _ => Value::Null,
        };

        if let Some(procedure) = self.router.resolve(path) {
            if procedure.kind() != kind {
                debug!(
                    path = %path,
                    requested = %kind,
                    declared = %procedure.kind(),
                    "Procedure kind mismatch"
                );
                return self.error(RpcError::method_not_allowed(format!(
                    "Procedure {} is a {}, not a {}",
                    path,
                    procedure.kind(),
                    kind
                )));
            }
        }

        trace!(path = %path, kind = %kind, "Gateway dispatch");
        let result = self.router.handle(path, input, ctx).await;
        let (status, envelope) = ResponseEnvelope::from_result(result, &self.config.error);
        GatewayResponse::envelope(status, envelope)
    }

    fn error(&self, error: RpcError) -> GatewayResponse {
        let (status, envelope) = ResponseEnvelope::from_result(Err(error), &self.config.error);
        GatewayResponse::envelope(status, envelope)
    }

    /// CORS response headers for a request from `origin`.
    ///
    /// Empty when CORS is disabled or the origin is not allowed.
    pub fn cors_headers(&self, origin: Option<&str>) -> Vec<(&'static str, String)> {
        let Some(cors) = &self.config.cors else {
            return Vec::new();
        };
        let allow_origin = match origin {
            Some(origin) if cors.allows_origin(origin) => {
                // Credentialed responses must name the origin, never "*".
                if !cors.allow_credentials && cors.allow_origins.iter().any(|o| o == "*") {
                    "*".to_string()
                } else {
                    origin.to_string()
                }
            }
            Some(_) => return Vec::new(),
            None if cors.allow_origins.iter().any(|o| o == "*") => "*".to_string(),
            None => return Vec::new(),
        };

        let mut headers = vec![
            ("Access-Control-Allow-Origin", allow_origin),
            ("Access-Control-Allow-Methods", cors.allow_methods.join(", ")),
            ("Access-Control-Allow-Headers", cors.allow_headers.join(", ")),
        ];
        // Browsers reject credentials alongside a wildcard origin.
        if cors.allow_credentials && headers[0].1 != "*" {
            headers.push(("Access-Control-Allow-Credentials", "true".to_string()));
        }
        headers
    }
}

#[async_trait]
impl Transport for Gateway {
    async fn send(
        &self,
        kind: ProcedureKind,
        full_path: &str,
        input: Value,
    ) -> Result<Value, TransportError> {
        let url = self.procedure_url(kind, full_path);
        let response = self
            .handle_route("POST", &url, json!({ "input": input }), None)
            .await;
        Ok(response.body)
    }
}
