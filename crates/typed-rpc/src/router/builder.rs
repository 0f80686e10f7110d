//! Router builder methods and the router-bound procedure chain

use super::core::Router;
use crate::{
    RpcContext, RpcError, RpcResult,
    middleware::{Middleware, MiddlewareFn},
    procedure::{ProcedureBuilder, ProcedureDef, ProcedureKind},
    schema::Schema,
    validation::validate_path,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

impl Router {
    /// Add middleware to the router.
    ///
    /// Middleware runs in registration order before the resolver and in
    /// reverse order after it. It wraps every procedure of this router and
    /// of the routers mounted on it.
    #[must_use = "This method returns a new Router and does not modify self"]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.use_middleware(middleware);
        self
    }

    /// Add a middleware function (already wrapped as [`MiddlewareFn`]).
    #[must_use = "This method returns a new Router and does not modify self"]
    pub fn middleware_fn(mut self, middleware: MiddlewareFn) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Register a built procedure under its own path.
    ///
    /// Registering a path that already exists replaces the earlier definition.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG` error if the definition's path is missing or malformed.
    pub fn register(mut self, procedure: ProcedureDef) -> RpcResult<Self> {
        validate_path(procedure.path())?;
        let path = procedure.path().to_string();
        let kind = procedure.kind();
        if self
            .procedures
            .insert(path.clone(), Arc::new(procedure))
            .is_some()
        {
            debug!(path = %path, "Replacing existing procedure");
        }
        debug!(path = %path, kind = %kind, "Registered procedure");
        Ok(self)
    }

    /// Register a built procedure under another path.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG` error if `path` is missing or malformed.
    pub fn register_at(self, path: impl Into<String>, procedure: ProcedureDef) -> RpcResult<Self> {
        self.register(procedure.with_path(path.into()))
    }

    /// Start defining a query on this router.
    #[must_use = "This method returns a ProcedureChain that must be registered"]
    pub fn query(self, path: impl Into<String>) -> ProcedureChain {
        self.procedure(path, ProcedureKind::Query)
    }

    /// Start defining a mutation on this router.
    #[must_use = "This method returns a ProcedureChain that must be registered"]
    pub fn mutation(self, path: impl Into<String>) -> ProcedureChain {
        self.procedure(path, ProcedureKind::Mutation)
    }

    /// Start defining a procedure of the given kind on this router.
    #[must_use = "This method returns a ProcedureChain that must be registered"]
    pub fn procedure(self, path: impl Into<String>, kind: ProcedureKind) -> ProcedureChain {
        ProcedureChain {
            router: self,
            builder: ProcedureBuilder::new(path, kind),
        }
    }

    /// Mount a sub-router under `prefix`.
    ///
    /// A call to `"{prefix}.{rest}"` that has no direct match on this router
    /// is delegated to `child` as `"{rest}"`. Mounting the same prefix again
    /// replaces the earlier child in place.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG` error if the prefix is empty or malformed.
    pub fn merge(mut self, prefix: impl Into<String>, child: Router) -> RpcResult<Self> {
        let prefix = prefix.into();
        validate_path(&prefix).map_err(|e| {
            RpcError::config(format!("Invalid mount prefix: {}", e.message))
        })?;

        let child = Arc::new(child);
        let count = child.procedures().len();
        match self.children.iter_mut().find(|(existing, _)| *existing == prefix) {
            Some(slot) => {
                debug!(prefix = %prefix, "Replacing mounted router");
                slot.1 = child;
            }
            None => self.children.push((prefix.clone(), child)),
        }
        debug!(prefix = %prefix, procedures = count, "Merged router");
        Ok(self)
    }
}

/// A fluent builder for a procedure that registers itself on a router.
///
/// Returned by [`Router::query`], [`Router::mutation`] and
/// [`Router::procedure`]; finish with [`register`](Self::register).
///
/// # Example
/// ```rust,ignore
/// let router = Router::new()
///     .query("add")
///     .input::<AddInput>()
///     .output::<AddOutput>()
///     .resolver(|input: AddInput| async move {
///         Ok::<_, RpcError>(AddOutput { result: input.a + input.b })
///     })
///     .register()?;
/// ```
pub struct ProcedureChain<I = Value, O = Value> {
    router: Router,
    builder: ProcedureBuilder<I, O>,
}

impl<I: Schema, O: Schema> ProcedureChain<I, O> {
    /// Declare the input schema.
    #[must_use = "This method returns a new ProcedureChain and does not modify self"]
    pub fn input<NewI: Schema>(self) -> ProcedureChain<NewI, O> {
        ProcedureChain {
            router: self.router,
            builder: self.builder.input::<NewI>(),
        }
    }

    /// Declare the output schema.
    #[must_use = "This method returns a new ProcedureChain and does not modify self"]
    pub fn output<NewO: Schema>(self) -> ProcedureChain<I, NewO> {
        ProcedureChain {
            router: self.router,
            builder: self.builder.output::<NewO>(),
        }
    }

    /// Attach a metadata entry.
    #[must_use = "This method returns a new ProcedureChain and does not modify self"]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.builder = self.builder.meta(key, value);
        self
    }

    /// Set a resolver that takes only the validated input.
    #[must_use = "This method returns a new ProcedureChain and does not modify self"]
    pub fn resolver<F, Fut, E>(mut self, resolver: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        E: Into<RpcError> + 'static,
    {
        self.builder = self.builder.resolver(resolver);
        self
    }

    /// Set a resolver that takes the validated input and the call context.
    #[must_use = "This method returns a new ProcedureChain and does not modify self"]
    pub fn resolver_with_context<F, Fut, E>(mut self, resolver: F) -> Self
    where
        F: Fn(I, RpcContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        E: Into<RpcError> + 'static,
    {
        self.builder = self.builder.resolver_with_context(resolver);
        self
    }

    /// Build the procedure and register it, returning the router.
    ///
    /// # Errors
    ///
    /// Returns a `CONFIG` error if the path, input schema, output schema or
    /// resolver is missing.
    pub fn register(self) -> RpcResult<Router> {
        let procedure = self.builder.build()?;
        self.router.register(procedure)
    }
}
