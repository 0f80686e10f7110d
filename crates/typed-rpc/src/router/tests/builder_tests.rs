//! Tests for router assembly: registration, mounting and the chain builder

use crate::{ErrorCode, Next, ProcedureBuilder, ProcedureKind, Request, Router, RpcContext, RpcError};
use serde_json::{Value, json};

fn echo(router: Router, path: &str) -> Router {
    router
        .query(path)
        .input::<Value>()
        .output::<Value>()
        .resolver(|input: Value| async move { Ok::<_, RpcError>(input) })
        .register()
        .unwrap()
}

#[test]
fn test_chain_registers_procedure() {
    let router = Router::new()
        .mutation("users.create")
        .input::<Value>()
        .output::<Value>()
        .meta("description", "Create a user")
        .resolver(|_: Value| async { Ok::<_, RpcError>(json!({"id": 1})) })
        .register()
        .unwrap();

    let def = router.resolve("users.create").unwrap();
    assert_eq!(def.kind(), ProcedureKind::Mutation);
    assert_eq!(def.meta().get("description"), Some(&json!("Create a user")));
    assert_eq!(router.len(), 1);
}

#[test]
fn test_chain_without_resolver_is_config_error() {
    let err = Router::new()
        .query("x")
        .input::<Value>()
        .output::<Value>()
        .register()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);
}

#[test]
fn test_invalid_paths_rejected() {
    for bad in ["", ".a", "a.", "a..b", "a b", "a/b"] {
        let err = Router::new()
            .query(bad)
            .input::<Value>()
            .output::<Value>()
            .resolver(|v: Value| async move { Ok::<_, RpcError>(v) })
            .register()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Config, "path {:?}", bad);
    }
}

#[test]
fn test_register_at_renames() {
    let def = ProcedureBuilder::query("original")
        .input::<Value>()
        .output::<Value>()
        .resolver(|v: Value| async move { Ok::<_, RpcError>(v) })
        .build()
        .unwrap();
    let router = Router::new().register_at("renamed", def).unwrap();
    assert!(router.resolve("renamed").is_some());
    assert!(router.resolve("original").is_none());
    assert_eq!(router.resolve("renamed").unwrap().path(), "renamed");
}

#[tokio::test]
async fn test_duplicate_registration_replaces() {
    let router = echo(Router::new(), "dup")
        .query("dup")
        .input::<Value>()
        .output::<Value>()
        .resolver(|_: Value| async { Ok::<_, RpcError>(json!("second")) })
        .register()
        .unwrap();

    assert_eq!(router.len(), 1);
    let out = router.handle("dup", json!("first"), None).await.unwrap();
    assert_eq!(out, json!("second"));
}

#[test]
fn test_merge_lists_nested_paths() {
    let inner = echo(Router::new(), "leaf");
    let middle = echo(Router::new(), "get").merge("inner", inner).unwrap();
    let router = echo(Router::new(), "health").merge("users", middle).unwrap();

    assert_eq!(
        router.procedures(),
        vec!["health", "users.get", "users.inner.leaf"]
    );
    assert_eq!(router.prefixes().collect::<Vec<_>>(), vec!["users"]);
}

#[test]
fn test_remount_replaces_in_place() {
    let router = Router::new()
        .merge("a", echo(Router::new(), "one"))
        .unwrap()
        .merge("b", echo(Router::new(), "two"))
        .unwrap()
        .merge("a", echo(Router::new(), "three"))
        .unwrap();

    assert_eq!(router.prefixes().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(router.procedures(), vec!["a.three", "b.two"]);
}

#[test]
fn test_invalid_mount_prefix() {
    let err = Router::new().merge("a..b", Router::new()).unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);
    assert!(err.message.contains("Invalid mount prefix"));
}

#[test]
fn test_middleware_count() {
    let router = Router::new()
        .middleware(|ctx: RpcContext, req: Request, next: Next| async move { next(ctx, req).await })
        .middleware(|ctx: RpcContext, req: Request, next: Next| async move { next(ctx, req).await });
    assert_eq!(router.middleware_count(), 2);
    assert!(router.is_empty());
}
