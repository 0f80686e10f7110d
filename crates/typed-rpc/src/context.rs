//! Per-call context
//!
//! An [`RpcContext`] is created fresh for every call unless the caller
//! supplies one. It carries the transport's raw request as an opaque value
//! and an identity slot that middleware may fill. The dispatcher never
//! populates the identity itself.

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

type Opaque = Arc<dyn Any + Send + Sync>;

/// Context for a single call.
///
/// The context is passed by value through the middleware pipeline; a
/// middleware changes what downstream code sees by modifying its copy
/// before calling `next`.
///
/// # Example
/// ```rust,ignore
/// let router = Router::new().middleware(|mut ctx: RpcContext, req, next: Next| async move {
///     let token = ctx.raw_request::<HttpRequest>().and_then(|r| r.bearer_token());
///     if let Some(user) = token.and_then(lookup_user) {
///         ctx.set_identity(user);
///     }
///     next(ctx, req).await
/// });
/// ```
#[derive(Clone)]
pub struct RpcContext {
    request_id: Uuid,
    raw_request: Option<Opaque>,
    identity: Option<Opaque>,
    metadata: HashMap<String, Value>,
}

impl RpcContext {
    /// Create an empty context with a fresh request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7(),
            raw_request: None,
            identity: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach the transport's raw request.
    pub fn with_raw_request<T: Any + Send + Sync>(mut self, raw: T) -> Self {
        self.raw_request = Some(Arc::new(raw));
        self
    }

    /// Attach a raw request that is already shared.
    pub fn with_shared_raw_request(mut self, raw: Arc<dyn Any + Send + Sync>) -> Self {
        self.raw_request = Some(raw);
        self
    }

    /// Use a specific request id instead of a generated one.
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Unique id of this call.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The raw request, if one was attached and it has type `T`.
    pub fn raw_request<T: Any>(&self) -> Option<&T> {
        self.raw_request.as_deref()?.downcast_ref::<T>()
    }

    /// Whether any raw request is attached.
    pub fn has_raw_request(&self) -> bool {
        self.raw_request.is_some()
    }

    /// Store the caller identity.
    pub fn set_identity<T: Any + Send + Sync>(&mut self, identity: T) {
        self.identity = Some(Arc::new(identity));
    }

    /// Remove the caller identity.
    pub fn clear_identity(&mut self) {
        self.identity = None;
    }

    /// The caller identity, if set and of type `T`.
    pub fn identity<T: Any>(&self) -> Option<&T> {
        self.identity.as_deref()?.downcast_ref::<T>()
    }

    /// Whether an identity has been set.
    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Per-call metadata value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a per-call metadata value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.metadata.insert(key.into(), value)
    }

    /// All per-call metadata.
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }
}

impl Default for RpcContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RpcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcContext")
            .field("request_id", &self.request_id)
            .field("has_raw_request", &self.raw_request.is_some())
            .field("has_identity", &self.identity.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}
