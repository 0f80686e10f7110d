//! Client-side caller
//!
//! The client mirrors the dispatcher for outbound calls. It validates input
//! against the input schema, sends it over a [`Transport`], reconstructs
//! classified errors from error envelopes and validates the result against
//! the output schema.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_rpc::prelude::*;
//!
//! let client = RpcClient::new(transport);
//! let users = client.caller("users");
//! let get_user = users.query::<GetUserInput, User>("get");
//!
//! let user = get_user.call(GetUserInput { id: 1 }).await?;
//! let same = get_user.call_raw(json!({"id": 1})).await?;
//! ```

use crate::error::{ErrorCode, RpcError};
use crate::procedure::ProcedureKind;
use crate::response::{ErrorBody, ResponseEnvelope};
use crate::schema::{Schema, SchemaError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Failure to deliver a call or to receive its response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The call could not be delivered
    #[error("connection failed: {0}")]
    Connection(String),
    /// No response arrived in time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The response could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Sends a call and returns the response envelope.
///
/// Implementations carry `input` to the server however they like; the
/// convention is `POST {prefix}/{kind}/{full_path}` with body
/// `{"input": input}`. The returned value is the decoded envelope, either
/// `{"result": ...}` or `{"error": {"code": ..., "message": ...}}`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one call.
    async fn send(
        &self,
        kind: ProcedureKind,
        full_path: &str,
        input: Value,
    ) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        kind: ProcedureKind,
        full_path: &str,
        input: Value,
    ) -> Result<Value, TransportError> {
        (**self).send(kind, full_path, input).await
    }
}

/// A classified error raised on the client side.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct ClientError {
    /// Error code, as sent by the server or assigned by the client
    pub code: ErrorCode,
    /// Error message
    pub message: String,
    /// Details from the server, when present
    pub details: Option<Value>,
}

impl ClientError {
    /// Create a client error
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Transport-level failure (`NETWORK_ERROR`)
    pub fn network(err: TransportError) -> Self {
        Self::new(ErrorCode::NetworkError, err.to_string())
    }

    /// Client-side schema failure (`VALIDATION_ERROR`)
    pub fn validation(err: SchemaError) -> Self {
        Self {
            code: ErrorCode::ValidationError,
            message: err.message,
            details: (!err.errors.is_empty())
                .then(|| serde_json::json!({ "errors": err.errors })),
        }
    }

    /// Default status for the code
    pub fn status_code(&self) -> u16 {
        self.code.default_status()
    }
}

impl From<ErrorBody> for ClientError {
    fn from(body: ErrorBody) -> Self {
        Self {
            code: ErrorCode::from(body.code),
            message: body.message,
            details: body.details,
        }
    }
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        let mut error = RpcError::new(err.code, err.message);
        error.details = err.details;
        error
    }
}

/// Client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Per-call timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Entry point for making calls.
///
/// Cheap to clone; clones share the transport and the caller cache.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    callers: Arc<DashMap<String, ProcedureCaller>>,
}

impl RpcClient {
    /// Create a client over a transport
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    /// Create a client with a configuration
    pub fn with_config(transport: impl Transport + 'static, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            callers: Arc::new(DashMap::new()),
        }
    }

    /// The caller for a base path, created on first use.
    pub fn caller(&self, base_path: impl Into<String>) -> ProcedureCaller {
        let base_path = base_path.into();
        self.callers
            .entry(base_path.clone())
            .or_insert_with(|| {
                ProcedureCaller::new(base_path, self.transport.clone(), self.config.clone())
            })
            .clone()
    }

    /// The client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("config", &self.config)
            .field("callers", &self.callers.len())
            .finish()
    }
}

/// Creates and caches typed procedures under a base path.
#[derive(Clone)]
pub struct ProcedureCaller {
    inner: Arc<CallerInner>,
}

struct CallerInner {
    base_path: String,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    procedures: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ProcedureCaller {
    fn new(base_path: String, transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(CallerInner {
                base_path,
                transport,
                config,
                procedures: DashMap::new(),
            }),
        }
    }

    /// Base path shared by every procedure of this caller
    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    /// Full dotted path for a procedure of this caller.
    pub fn full_path(&self, path: &str) -> String {
        if self.inner.base_path.is_empty() {
            path.to_string()
        } else {
            format!("{}.{}", self.inner.base_path, path)
        }
    }

    /// A typed query
    pub fn query<I: Schema, O: Schema>(&self, path: &str) -> TypedProcedure<I, O> {
        self.procedure(path, ProcedureKind::Query)
    }

    /// A typed mutation
    pub fn mutation<I: Schema, O: Schema>(&self, path: &str) -> TypedProcedure<I, O> {
        self.procedure(path, ProcedureKind::Mutation)
    }

    /// A typed procedure of the given kind.
    ///
    /// Procedures are cached per path. Asking again for the same path with
    /// the same kind and types returns the cached procedure; asking with a
    /// different kind or types replaces it.
    pub fn procedure<I: Schema, O: Schema>(
        &self,
        path: &str,
        kind: ProcedureKind,
    ) -> TypedProcedure<I, O> {
        if let Some(cached) = self.inner.procedures.get(path) {
            if let Some(procedure) = cached.downcast_ref::<TypedProcedure<I, O>>() {
                if procedure.kind() == kind {
                    return procedure.clone();
                }
            }
        }

        let procedure = TypedProcedure::<I, O>::new(
            self.full_path(path),
            kind,
            self.inner.transport.clone(),
            self.inner.config.timeout,
        );
        trace!(path = %procedure.full_path(), kind = %kind, "Created typed procedure");
        self.inner
            .procedures
            .insert(path.to_string(), Arc::new(procedure.clone()));
        procedure
    }

    /// Send an untyped call and return the raw result.
    pub async fn send_raw(
        &self,
        kind: ProcedureKind,
        path: &str,
        input: Value,
    ) -> Result<Value, ClientError> {
        let full_path = self.full_path(path);
        send(
            self.inner.transport.as_ref(),
            kind,
            &full_path,
            input,
            self.inner.config.timeout,
        )
        .await
    }
}

impl fmt::Debug for ProcedureCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureCaller")
            .field("base_path", &self.inner.base_path)
            .field("procedures", &self.inner.procedures.len())
            .finish()
    }
}

/// A typed handle to one remote procedure.
pub struct TypedProcedure<I, O> {
    inner: Arc<ProcedureInner>,
    _phantom: PhantomData<fn(I) -> O>,
}

struct ProcedureInner {
    full_path: String,
    kind: ProcedureKind,
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl<I, O> Clone for TypedProcedure<I, O> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<I: Schema, O: Schema> TypedProcedure<I, O> {
    fn new(
        full_path: String,
        kind: ProcedureKind,
        transport: Arc<dyn Transport>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(ProcedureInner {
                full_path,
                kind,
                transport,
                timeout,
            }),
            _phantom: PhantomData,
        }
    }

    /// Full dotted path
    pub fn full_path(&self) -> &str {
        &self.inner.full_path
    }

    /// Query or mutation
    pub fn kind(&self) -> ProcedureKind {
        self.inner.kind
    }

    /// Call with an already typed input.
    ///
    /// # Errors
    ///
    /// * `VALIDATION_ERROR` if the input or the result fails its schema
    /// * `NETWORK_ERROR` if the transport fails
    /// * the server's code and message for an error envelope
    pub async fn call(&self, input: I) -> Result<O, ClientError> {
        let raw = Schema::serialize(&input).map_err(ClientError::validation)?;
        let result = send(
            self.inner.transport.as_ref(),
            self.inner.kind,
            &self.inner.full_path,
            raw,
            self.inner.timeout,
        )
        .await?;
        O::validate(result).map_err(|e| {
            debug!(path = %self.inner.full_path, error = %e, "Result failed output schema");
            ClientError::validation(e)
        })
    }

    /// Call with a raw value, validated against the input schema first.
    pub async fn call_raw(&self, raw: Value) -> Result<O, ClientError> {
        let input = I::validate(raw).map_err(ClientError::validation)?;
        self.call(input).await
    }
}

impl<I, O> fmt::Debug for TypedProcedure<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedProcedure")
            .field("full_path", &self.inner.full_path)
            .field("kind", &self.inner.kind)
            .finish()
    }
}

async fn send(
    transport: &dyn Transport,
    kind: ProcedureKind,
    full_path: &str,
    input: Value,
    timeout: Option<Duration>,
) -> Result<Value, ClientError> {
    trace!(path = %full_path, kind = %kind, "Sending call");
    let call = transport.send(kind, full_path, input);
    let sent = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(TransportError::Timeout(limit))),
        None => call.await,
    };

    let envelope = sent.map_err(|e| {
        debug!(path = %full_path, error = %e, "Transport failed");
        ClientError::network(e)
    })?;

    ResponseEnvelope::parse(&envelope).map_err(|body| {
        debug!(path = %full_path, code = %body.code, "Server returned error");
        ClientError::from(body)
    })
}
