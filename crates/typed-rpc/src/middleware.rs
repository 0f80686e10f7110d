//! Middleware support for request/response processing
//!
//! Middleware wraps procedure execution in onion order: for `m1` then `m2`,
//! a call runs `m1.before → m2.before → resolver → m2.after → m1.after`.

use crate::{RpcContext, RpcResult, procedure::ProcedureKind};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Request information passed to middleware
#[derive(Clone, Debug)]
pub struct Request {
    /// Full path of the procedure as requested (e.g., "users.get")
    pub path: String,
    /// Kind of the resolved procedure
    pub kind: ProcedureKind,
    /// Raw input as received
    pub input: serde_json::Value,
}

impl Request {
    /// Get the namespace (first part of path)
    pub fn namespace(&self) -> Option<&str> {
        self.path.split_once('.').map(|(ns, _)| ns)
    }

    /// Get the procedure name (last part of path)
    pub fn procedure(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
}

/// Response type (JSON value)
pub type Response = serde_json::Value;

/// Continuation: the rest of the chain, ending in the resolver call
pub type Next = Arc<dyn Fn(RpcContext, Request) -> BoxFuture<'static, RpcResult<Response>> + Send + Sync>;

/// Middleware function type
pub type MiddlewareFn =
    Arc<dyn Fn(RpcContext, Request, Next) -> BoxFuture<'static, RpcResult<Response>> + Send + Sync>;

/// Trait for implementing custom middleware
///
/// A middleware may call `next` and pass the result through, transform it,
/// re-classify an error it returns, or never call it at all. In the last
/// case its own return value becomes the call's result.
pub trait Middleware: Send + Sync {
    /// Process the request, optionally calling next
    fn handle(
        &self,
        ctx: RpcContext,
        req: Request,
        next: Next,
    ) -> BoxFuture<'static, RpcResult<Response>>;
}

/// Async functions and closures are middleware.
///
/// ```rust,ignore
/// let router = Router::new()
///     .middleware(|ctx: RpcContext, req: Request, next: Next| async move {
///         let start = std::time::Instant::now();
///         let result = next(ctx, req).await;
///         tracing::info!(elapsed = ?start.elapsed(), "done");
///         result
///     });
/// ```
impl<F, Fut> Middleware for F
where
    F: Fn(RpcContext, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<Response>> + Send + 'static,
{
    fn handle(
        &self,
        ctx: RpcContext,
        req: Request,
        next: Next,
    ) -> BoxFuture<'static, RpcResult<Response>> {
        Box::pin(self(ctx, req, next))
    }
}

/// Create middleware from an async function
///
/// ```rust,ignore
/// async fn audit(ctx: RpcContext, req: Request, next: Next) -> RpcResult<Response> {
///     tracing::info!(path = %req.path, "audit");
///     next(ctx, req).await
/// }
///
/// let middleware = from_fn(audit);
/// ```
pub fn from_fn<F, Fut>(f: F) -> MiddlewareFn
where
    F: Fn(RpcContext, Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<Response>> + Send + 'static,
{
    Arc::new(move |ctx, req, next| Box::pin(f(ctx, req, next)))
}

/// Turn any [`Middleware`] implementation into a [`MiddlewareFn`].
pub fn into_middleware_fn<M: Middleware + 'static>(middleware: M) -> MiddlewareFn {
    let middleware = Arc::new(middleware);
    Arc::new(move |ctx, req, next| middleware.handle(ctx, req, next))
}

/// Ordered, append-only list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middleware: Vec<MiddlewareFn>,
}

impl MiddlewareChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it runs inside every previously added one.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.push(into_middleware_fn(middleware));
    }

    /// Append an already boxed middleware function.
    pub fn push(&mut self, middleware: MiddlewareFn) {
        self.middleware.push(middleware);
    }

    /// Number of middleware in the chain
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Whether the chain has no middleware
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Wrap `final_handler` with every middleware in the chain.
    ///
    /// Middleware is applied in reverse order (last added = innermost).
    /// An empty chain returns `final_handler` unchanged.
    pub fn build(&self, final_handler: Next) -> Next {
        self.middleware
            .iter()
            .rev()
            .fold(final_handler, |next, mw| {
                let mw = mw.clone();
                Arc::new(move |ctx, req| (mw)(ctx, req, next.clone()))
            })
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middleware.len())
            .finish()
    }
}
