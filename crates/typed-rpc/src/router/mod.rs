//! Router implementation with builder pattern
//!
//! The [`Router`] owns a procedure table, its middleware, and any routers
//! mounted under a prefix:
//!
//! ```rust,ignore
//! let users = Router::new()
//!     .query("get")
//!     .input::<GetUserInput>()
//!     .output::<User>()
//!     .resolver(get_user)
//!     .register()?;
//!
//! let router = Router::new()
//!     .middleware(timing)
//!     .query("health")
//!     .input::<NoInput>()
//!     .output::<SuccessResponse>()
//!     .resolver(|_: NoInput| async { Ok::<_, RpcError>(SuccessResponse::ok()) })
//!     .register()?
//!     .merge("users", users)?;
//!
//! let user = router.handle("users.get", json!({"id": 1}), None).await?;
//! ```
//!
//! # Resolution
//!
//! A path is looked up in the router's own table first. Only when that
//! fails is it matched against mount prefixes, in mount order; the first
//! router whose `prefix.` starts the path receives the remainder.
//!
//! # Middleware
//!
//! The pipelines of every router on the resolution path wrap the call,
//! with the parent's middleware outside the child's.

mod builder;
mod core;

pub use builder::ProcedureChain;
pub use core::Router;

#[cfg(test)]
mod tests;
