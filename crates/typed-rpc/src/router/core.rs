//! Core router implementation
//!
//! This module contains the `Router` type: the procedure table, mounted
//! sub-routers, and the dispatcher that runs a call through the pipeline.

use crate::{
    RpcContext, RpcError, RpcResult,
    middleware::{MiddlewareChain, Next, Request},
    procedure::{Invocation, ProcedureDef},
};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// A tree of procedures with per-router middleware.
///
/// Routers are assembled once with the builder methods and then only read.
/// Dispatch never mutates a router, so a built router can be shared across
/// tasks behind an `Arc`.
#[derive(Clone, Default)]
pub struct Router {
    pub(crate) procedures: HashMap<String, Arc<ProcedureDef>>,
    /// Mounted sub-routers in mount order
    pub(crate) children: Vec<(String, Arc<Router>)>,
    pub(crate) middleware: MiddlewareChain,
}

/// Result of resolving a path: the procedure plus the middleware of every
/// router passed through, outermost first.
struct Resolved<'a> {
    procedure: Arc<ProcedureDef>,
    pipelines: Vec<&'a MiddlewareChain>,
}

/// Panic raised inside a schema, resolver or middleware, kept as an error cause.
#[derive(Debug, Error)]
#[error("panic: {0}")]
struct PanicError(String);

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// List every resolvable full path, including those of mounted routers, sorted.
    pub fn procedures(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths("", &mut paths);
        paths.sort();
        paths.dedup();
        paths
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for path in self.procedures.keys() {
            out.push(format!("{}{}", prefix, path));
        }
        for (child_prefix, child) in &self.children {
            child.collect_paths(&format!("{}{}.", prefix, child_prefix), out);
        }
    }

    /// Number of procedures registered directly on this router
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Whether this router has neither procedures nor mounted routers
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty() && self.children.is_empty()
    }

    /// Mount prefixes in mount order
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(prefix, _)| prefix.as_str())
    }

    /// Number of middleware registered directly on this router
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// The procedure a path dispatches to, if any.
    pub fn resolve(&self, path: &str) -> Option<Arc<ProcedureDef>> {
        self.resolve_with_pipelines(path)
            .map(|resolved| resolved.procedure)
    }

    /// Direct lookup first; otherwise the first mounted router whose prefix
    /// plus `.` starts the path handles the remainder.
    fn resolve_with_pipelines(&self, path: &str) -> Option<Resolved<'_>> {
        if let Some(procedure) = self.procedures.get(path) {
            return Some(Resolved {
                procedure: procedure.clone(),
                pipelines: vec![&self.middleware],
            });
        }

        let (prefix, child, rest) = self.children.iter().find_map(|(prefix, child)| {
            path.strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .map(|rest| (prefix, child, rest))
        })?;

        trace!(prefix = %prefix, remainder = %rest, "Descending into mounted router");
        let mut resolved = child.resolve_with_pipelines(rest)?;
        resolved.pipelines.insert(0, &self.middleware);
        Some(resolved)
    }

    /// Dispatch a call.
    ///
    /// Resolves `path`, validates `raw_input` against the procedure's input
    /// schema, runs the middleware pipeline around the resolver and returns
    /// the serialized output. A fresh [`RpcContext`] is created when `ctx` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// * `NOT_FOUND` (404) if no procedure matches the path
    /// * `VALIDATION_ERROR` (400) if the input fails its schema; the resolver
    ///   is not invoked
    /// * `INTERNAL_SERVER_ERROR` (500) if the output fails its schema or a
    ///   schema, resolver or middleware panics
    /// * any error a resolver or middleware returns, unchanged
    pub async fn handle(
        &self,
        path: &str,
        raw_input: Value,
        ctx: Option<RpcContext>,
    ) -> RpcResult<Value> {
        let ctx = ctx.unwrap_or_default();

        let Some(resolved) = self.resolve_with_pipelines(path) else {
            debug!(path = %path, "Procedure not found");
            return Err(RpcError::procedure_not_found(path));
        };
        let procedure = resolved.procedure;

        // Schema code is user code and may panic before the pipeline exists.
        let prepared = std::panic::catch_unwind(AssertUnwindSafe(|| {
            procedure.prepare(raw_input.clone())
        }))
        .map_err(|payload| panic_error(path, payload.as_ref()))?;
        let invocation = prepared.map_err(|e| {
            debug!(path = %path, error = %e, "Input validation failed");
            RpcError::from(e)
        })?;

        let request = Request {
            path: path.to_string(),
            kind: procedure.kind(),
            input: raw_input,
        };

        trace!(
            path = %path,
            kind = %request.kind,
            request_id = %ctx.request_id(),
            pipelines = resolved.pipelines.len(),
            "Dispatching procedure"
        );

        let terminal = terminal_handler(procedure, invocation);
        let chain = resolved
            .pipelines
            .iter()
            .rev()
            .fold(terminal, |next, pipeline| pipeline.build(next));

        let outcome = AssertUnwindSafe(async move { chain(ctx, request).await })
            .catch_unwind()
            .await;

        outcome.unwrap_or_else(|payload| Err(panic_error(path, payload.as_ref())))
    }
}

fn panic_error(path: &str, payload: &(dyn Any + Send)) -> RpcError {
    let message = panic_message(payload);
    warn!(path = %path, panic = %message, "Procedure panicked");
    RpcError::internal(message.clone()).with_cause(PanicError(message))
}

/// The innermost continuation.
///
/// The first call runs the invocation prepared before the pipeline started.
/// Any later call (a retrying middleware) validates the request input again
/// and runs the resolver anew.
fn terminal_handler(procedure: Arc<ProcedureDef>, first: Invocation) -> Next {
    let first = Arc::new(Mutex::new(Some(first)));
    Arc::new(move |ctx: RpcContext, req: Request| -> BoxFuture<'static, RpcResult<Value>> {
        let prepared = first.lock().ok().and_then(|mut slot| slot.take());
        let procedure = procedure.clone();
        Box::pin(async move {
            let invocation = match prepared {
                Some(invocation) => invocation,
                None => {
                    trace!(path = %req.path, "Re-validating input for repeated call");
                    procedure.prepare(req.input)?
                }
            };
            invocation(ctx).await
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "procedure panicked".to_string()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut procedures: Vec<_> = self.procedures.keys().collect();
        procedures.sort();
        f.debug_struct("Router")
            .field("procedures", &procedures)
            .field("children", &self.children)
            .field("middleware", &self.middleware)
            .finish()
    }
}
