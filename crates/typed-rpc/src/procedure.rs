//! Procedure definitions and the typed procedure builder
//!
//! A procedure is a named resolver with declared input and output schemas.
//! [`ProcedureBuilder`] collects the pieces with the schema types given as
//! generic parameters, and [`ProcedureBuilder::build`] produces a
//! type-erased [`ProcedureDef`] that a [`Router`](crate::Router) owns.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_rpc::prelude::*;
//!
//! let add = ProcedureBuilder::query("add")
//!     .input::<AddInput>()
//!     .output::<AddOutput>()
//!     .meta("description", "Add two numbers")
//!     .resolver(|input: AddInput| async move {
//!         Ok::<_, RpcError>(AddOutput { result: input.a + input.b })
//!     })
//!     .build()?;
//!
//! let router = Router::new().register(add)?;
//! ```
//!
//! Schemas must be declared before the resolver: changing the input or
//! output type discards a resolver written for the previous types.

use crate::error::{RpcError, RpcResult};
use crate::schema::{Schema, SchemaError};
use crate::validation::validate_path;
use crate::RpcContext;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Kind of procedure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Side-effect-free read
    Query,
    /// State-changing call
    Mutation,
}

impl ProcedureKind {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcedureKind {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "mutation" => Ok(Self::Mutation),
            other => Err(RpcError::bad_request(format!(
                "Unknown procedure kind: '{}'",
                other
            ))),
        }
    }
}

/// A validated call ready to run: the resolver bound to its typed input.
///
/// Running it invokes the resolver and validates the output.
pub type Invocation = Box<dyn FnOnce(RpcContext) -> BoxFuture<'static, RpcResult<Value>> + Send>;

type PrepareFn = Arc<dyn Fn(Value) -> Result<Invocation, SchemaError> + Send + Sync>;

type ResolverFn<I, O> = Arc<dyn Fn(I, RpcContext) -> BoxFuture<'static, RpcResult<O>> + Send + Sync>;

/// A registered procedure.
///
/// Immutable once built. Routers share definitions behind an `Arc`.
#[derive(Clone)]
pub struct ProcedureDef {
    path: String,
    kind: ProcedureKind,
    meta: HashMap<String, Value>,
    accepts_context: bool,
    input_schema: Cow<'static, str>,
    output_schema: Cow<'static, str>,
    prepare: PrepareFn,
}

impl ProcedureDef {
    /// Local path within the owning router
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query or mutation
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Arbitrary metadata attached at registration
    pub fn meta(&self) -> &HashMap<String, Value> {
        &self.meta
    }

    /// Whether the resolver receives the call context
    pub fn accepts_context(&self) -> bool {
        self.accepts_context
    }

    /// Name of the input schema type
    pub fn input_schema(&self) -> &str {
        &self.input_schema
    }

    /// Name of the output schema type
    pub fn output_schema(&self) -> &str {
        &self.output_schema
    }

    /// Validate raw input against the input schema.
    ///
    /// The resolver is not called; the returned [`Invocation`] calls it.
    pub fn prepare(&self, raw: Value) -> Result<Invocation, SchemaError> {
        (self.prepare)(raw)
    }

    /// Validate, resolve and validate output, without any middleware.
    pub async fn invoke(&self, raw: Value, ctx: RpcContext) -> RpcResult<Value> {
        let invocation = self.prepare(raw)?;
        invocation(ctx).await
    }

    /// Same definition under another local path.
    pub(crate) fn with_path(mut self, path: String) -> Self {
        self.path = path;
        self
    }
}

impl fmt::Debug for ProcedureDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureDef")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("accepts_context", &self.accepts_context)
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .field("meta", &self.meta)
            .finish()
    }
}

/// Builder for a [`ProcedureDef`].
///
/// `I` and `O` are the input and output schema types; both must be declared
/// with [`input`](Self::input) and [`output`](Self::output) before
/// [`build`](Self::build) succeeds.
pub struct ProcedureBuilder<I = Value, O = Value> {
    path: String,
    kind: ProcedureKind,
    meta: HashMap<String, Value>,
    input_declared: bool,
    output_declared: bool,
    accepts_context: bool,
    resolver: Option<ResolverFn<I, O>>,
    _phantom: PhantomData<fn(I) -> O>,
}

impl ProcedureBuilder {
    /// Start building a procedure of the given kind
    pub fn new(path: impl Into<String>, kind: ProcedureKind) -> Self {
        Self {
            path: path.into(),
            kind,
            meta: HashMap::new(),
            input_declared: false,
            output_declared: false,
            accepts_context: false,
            resolver: None,
            _phantom: PhantomData,
        }
    }

    /// Start building a query
    pub fn query(path: impl Into<String>) -> Self {
        Self::new(path, ProcedureKind::Query)
    }

    /// Start building a mutation
    pub fn mutation(path: impl Into<String>) -> Self {
        Self::new(path, ProcedureKind::Mutation)
    }
}

impl<I, O> ProcedureBuilder<I, O>
where
    I: Schema,
    O: Schema,
{
    /// Get the procedure path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the procedure kind
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Declare the input schema.
    #[must_use = "This method returns a new builder and does not modify self"]
    pub fn input<NewI: Schema>(self) -> ProcedureBuilder<NewI, O> {
        if self.resolver.is_some() {
            debug!(path = %self.path, "Input schema changed after resolver; resolver discarded");
        }
        ProcedureBuilder {
            path: self.path,
            kind: self.kind,
            meta: self.meta,
            input_declared: true,
            output_declared: self.output_declared,
            accepts_context: false,
            resolver: None,
            _phantom: PhantomData,
        }
    }

    /// Declare the output schema.
    #[must_use = "This method returns a new builder and does not modify self"]
    pub fn output<NewO: Schema>(self) -> ProcedureBuilder<I, NewO> {
        if self.resolver.is_some() {
            debug!(path = %self.path, "Output schema changed after resolver; resolver discarded");
        }
        ProcedureBuilder {
            path: self.path,
            kind: self.kind,
            meta: self.meta,
            input_declared: self.input_declared,
            output_declared: true,
            accepts_context: false,
            resolver: None,
            _phantom: PhantomData,
        }
    }

    /// Attach a metadata entry.
    #[must_use = "This method returns a new builder and does not modify self"]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Set a resolver that takes only the validated input.
    #[must_use = "This method returns a new builder and does not modify self"]
    pub fn resolver<F, Fut, E>(mut self, resolver: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        E: Into<RpcError> + 'static,
    {
        let resolver: ResolverFn<I, O> = Arc::new(
            move |input: I, _ctx: RpcContext| -> BoxFuture<'static, RpcResult<O>> {
                let fut = resolver(input);
                Box::pin(async move { fut.await.map_err(Into::into) })
            },
        );
        self.accepts_context = false;
        self.resolver = Some(resolver);
        self
    }

    /// Set a resolver that takes the validated input and the call context.
    #[must_use = "This method returns a new builder and does not modify self"]
    pub fn resolver_with_context<F, Fut, E>(mut self, resolver: F) -> Self
    where
        F: Fn(I, RpcContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        E: Into<RpcError> + 'static,
    {
        let resolver: ResolverFn<I, O> = Arc::new(
            move |input: I, ctx: RpcContext| -> BoxFuture<'static, RpcResult<O>> {
                let fut = resolver(input, ctx);
                Box::pin(async move { fut.await.map_err(Into::into) })
            },
        );
        self.accepts_context = true;
        self.resolver = Some(resolver);
        self
    }

    /// Finish the definition.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG` error if the path is missing or malformed, or if
    /// the input schema, output schema or resolver was not provided.
    pub fn build(self) -> RpcResult<ProcedureDef> {
        validate_path(&self.path)?;
        if !self.input_declared {
            return Err(RpcError::config(format!(
                "Procedure '{}' has no input schema",
                self.path
            )));
        }
        if !self.output_declared {
            return Err(RpcError::config(format!(
                "Procedure '{}' has no output schema",
                self.path
            )));
        }
        let resolver = self.resolver.ok_or_else(|| {
            RpcError::config(format!("Procedure '{}' has no resolver", self.path))
        })?;

        let path = self.path.clone();
        let prepare: PrepareFn = Arc::new(move |raw: Value| -> Result<Invocation, SchemaError> {
            let input = I::validate(raw)?;
            let resolver = resolver.clone();
            let path = path.clone();
            let invocation: Invocation = Box::new(move |ctx: RpcContext| {
                let run: BoxFuture<'static, RpcResult<Value>> = Box::pin(async move {
                    trace!(path = %path, "Executing resolver");
                    let output = resolver(input, ctx).await?;
                    Schema::serialize(&output).map_err(|e| {
                        warn!(path = %path, error = %e, "Resolver output failed its schema");
                        RpcError::internal(format!("Output validation failed: {}", e))
                            .with_cause(e)
                    })
                });
                run
            });
            Ok(invocation)
        });

        Ok(ProcedureDef {
            path: self.path,
            kind: self.kind,
            meta: self.meta,
            accepts_context: self.accepts_context,
            input_schema: I::schema_name(),
            output_schema: O::schema_name(),
            prepare,
        })
    }
}
