#![warn(missing_docs)]
//! # Typed RPC
//!
//! A transport-agnostic RPC core: named procedures with validated input and
//! output schemas, grouped into nested routers and wrapped in onion-model
//! middleware.
//!
//! ## Overview
//!
//! - **Schemas** validate raw JSON into typed values ([`Schema`])
//! - **Procedures** pair a path and kind with a typed resolver ([`ProcedureBuilder`])
//! - **Routers** hold procedures, mount child routers under prefixes and
//!   dispatch calls by dotted path ([`Router::handle`])
//! - **Middleware** wraps every call made through a router ([`Middleware`])
//! - **Errors** carry a code, message and transport status ([`RpcError`])
//! - **Gateway** maps a URL and JSON body onto a router ([`Gateway`])
//! - **Client** calls procedures through any [`Transport`] ([`RpcClient`])
//!
//! ## Architecture
//!
//! ```text
//!  RpcClient ── Transport ──▶ Gateway ──▶ Router::handle
//!                                           │
//!                             resolve path (direct, then mounted children)
//!                                           │
//!                             validate input (Schema)
//!                                           │
//!                 parent middleware ▶ child middleware ▶ resolver
//!                                           │
//!                             validate output (Schema)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use typed_rpc::prelude::*;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct AddInput { a: i64, b: i64 }
//!
//! impl Validate for AddInput {
//!     fn validate(&self) -> ValidationResult { ValidationResult::ok() }
//! }
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct AddOutput { result: i64 }
//!
//! impl Validate for AddOutput {
//!     fn validate(&self) -> ValidationResult { ValidationResult::ok() }
//! }
//!
//! let math = Router::new()
//!     .query("add")
//!     .input::<AddInput>()
//!     .output::<AddOutput>()
//!     .resolver(|input: AddInput| async move {
//!         Ok::<_, RpcError>(AddOutput { result: input.a + input.b })
//!     })
//!     .register()?;
//!
//! let router = Router::new()
//!     .middleware_fn(logging_middleware(LogConfig::default()))
//!     .merge("math", math)?;
//!
//! let out = router.handle("math.add", json!({"a": 2, "b": 3}), None).await?;
//! assert_eq!(out, json!({"result": 5}));
//! ```

pub mod client;
mod config;
mod context;
mod error;
pub mod gateway;
pub mod logging;
pub mod middleware;
pub mod procedure;
pub mod response;
mod router;
pub mod schema;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

// Public API
pub use client::{
    ClientConfig, ClientError, ProcedureCaller, RpcClient, Transport, TransportError,
    TypedProcedure,
};
pub use config::{
    ConfigValidationError, CorsConfig, DEFAULT_MAX_INPUT_SIZE, DEFAULT_PREFIX, GatewayConfig,
};
pub use context::RpcContext;
pub use error::{
    DEFAULT_STATUS_CODE, ErrorCause, ErrorCode, ErrorConfig, RpcError, RpcResult,
    STATUS_CODE_TABLE, default_status_for,
};
pub use gateway::{Gateway, GatewayResponse, Route};
pub use logging::{LogConfig, LogLevel, logging_middleware, redact_value};
pub use middleware::{Middleware, MiddlewareChain, MiddlewareFn, Next, Request, Response, from_fn};
pub use procedure::{ProcedureBuilder, ProcedureDef, ProcedureKind};
pub use response::{ErrorBody, ResponseEnvelope};
pub use router::{ProcedureChain, Router};
pub use schema::{Schema, SchemaError};
pub use types::*;
pub use validation::{
    FieldError, Validate, ValidationResult, ValidationRules, validate_input_size, validate_path,
};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use typed_rpc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Client
        ClientError,
        RpcClient,
        Transport,
        // Gateway
        CorsConfig,
        Gateway,
        GatewayConfig,
        // Errors
        ErrorCode,
        ErrorConfig,
        RpcError,
        RpcResult,
        // Validation
        FieldError,
        Schema,
        Validate,
        ValidationResult,
        ValidationRules,
        // Logging
        LogConfig,
        LogLevel,
        logging_middleware,
        // Middleware
        Middleware,
        Next,
        Request,
        from_fn,
        // Procedures and routing
        NoInput,
        ProcedureBuilder,
        ProcedureKind,
        Router,
        RpcContext,
        SuccessResponse,
    };
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
