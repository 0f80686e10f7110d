//! Integration tests for a small calculator service
//!
//! These tests build a realistic router with nested routers and middleware,
//! then drive it directly, through the gateway and through the client.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use typed_rpc::prelude::*;
use typed_rpc::{ErrorConfig, MiddlewareFn};

// =============================================================================
// Schemas
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BinaryInput {
    a: f64,
    b: f64,
}

impl Validate for BinaryInput {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new()
            .custom("a", || self.a.is_finite(), "must be finite")
            .custom("b", || self.b.is_finite(), "must be finite")
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CalcOutput {
    result: f64,
}

impl Validate for CalcOutput {
    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UserId {
    id: u64,
}

impl Validate for UserId {
    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

impl Validate for User {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new().required("name", &self.name).build()
    }
}

// =============================================================================
// Routers
// =============================================================================

fn math_router(calls: Arc<AtomicUsize>) -> Router {
    let add_calls = calls.clone();
    Router::new()
        .query("add")
        .input::<BinaryInput>()
        .output::<CalcOutput>()
        .resolver(move |input: BinaryInput| {
            add_calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, RpcError>(CalcOutput {
                    result: input.a + input.b,
                })
            }
        })
        .register()
        .unwrap()
        .query("divide")
        .input::<BinaryInput>()
        .output::<CalcOutput>()
        .resolver(move |input: BinaryInput| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if input.b == 0.0 {
                    return Err(RpcError::bad_request("Cannot divide by zero"));
                }
                Ok(CalcOutput {
                    result: input.a / input.b,
                })
            }
        })
        .register()
        .unwrap()
}

fn users_router() -> Router {
    Router::new()
        .query("get")
        .input::<UserId>()
        .output::<User>()
        .resolver(|input: UserId| async move {
            match input.id {
                1 => Ok(User {
                    id: 1,
                    name: "Ada".into(),
                }),
                _ => Err(RpcError::not_found("User not found")),
            }
        })
        .register()
        .unwrap()
        .query("explode")
        .input::<NoInput>()
        .output::<SuccessResponse>()
        .resolver(|_: NoInput| async {
            if true {
                panic!("resolver bug");
            }
            Ok::<_, RpcError>(SuccessResponse::ok())
        })
        .register()
        .unwrap()
}

fn recorder(log: Arc<Mutex<Vec<String>>>, name: &'static str) -> MiddlewareFn {
    from_fn(move |ctx: RpcContext, req: Request, next: Next| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(format!("before_{}", name));
            let result = next(ctx, req).await;
            log.lock().unwrap().push(format!("after_{}", name));
            result
        }
    })
}

fn app_router(calls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .middleware_fn(logging_middleware(LogConfig::default()))
        .merge("math", math_router(calls))
        .unwrap()
        .merge("users", users_router())
        .unwrap()
}

// =============================================================================
// Direct dispatch
// =============================================================================

#[tokio::test]
async fn test_add() {
    let router = app_router(Arc::new(AtomicUsize::new(0)));
    let out = router
        .handle("math.add", json!({"a": 2, "b": 3}), None)
        .await
        .unwrap();
    assert_eq!(out, json!({"result": 5.0}));
}

#[tokio::test]
async fn test_divide_by_zero_is_bad_request() {
    let router = app_router(Arc::new(AtomicUsize::new(0)));
    let err = router
        .handle("math.divide", json!({"a": 1, "b": 0}), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BadRequest);
    assert_eq!(err.status_code, 400);
    assert_eq!(err.message, "Cannot divide by zero");
}

#[tokio::test]
async fn test_invalid_input_never_reaches_resolver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = app_router(calls.clone());
    let err = router
        .handle("math.add", json!({"a": "two", "b": 3}), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.status_code, 400);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_path() {
    let router = app_router(Arc::new(AtomicUsize::new(0)));
    let err = router
        .handle("math.modulo", json!({}), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.status_code, 404);
}

#[tokio::test]
async fn test_panic_is_internal_error() {
    let router = app_router(Arc::new(AtomicUsize::new(0)));
    let err = router
        .handle("users.explode", Value::Null, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InternalServerError);
    assert_eq!(err.status_code, 500);
}

#[tokio::test]
async fn test_nested_router_matches_direct_call() {
    let child = Router::new()
        .query("hello")
        .input::<NoInput>()
        .output::<Value>()
        .resolver(|_: NoInput| async { Ok::<_, RpcError>(json!("Hello!")) })
        .register()
        .unwrap();
    let direct = child.handle("hello", Value::Null, None).await.unwrap();

    let parent = Router::new().merge("child", child).unwrap();
    let nested = parent.handle("child.hello", Value::Null, None).await.unwrap();
    assert_eq!(direct, nested);
}

#[tokio::test]
async fn test_middleware_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .middleware_fn(recorder(log.clone(), "1"))
        .middleware_fn(recorder(log.clone(), "2"))
        .merge("math", math_router(Arc::new(AtomicUsize::new(0))))
        .unwrap();

    router
        .handle("math.add", json!({"a": 1, "b": 1}), None)
        .await
        .unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["before_1", "before_2", "after_2", "after_1"]
    );
}

#[tokio::test]
async fn test_short_circuit_middleware() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .middleware(|ctx: RpcContext, req: Request, next: Next| async move {
            if req.namespace() == Some("math") && !ctx.has_identity() {
                return Err(RpcError::unauthorized("Login required"));
            }
            next(ctx, req).await
        })
        .merge("math", math_router(calls.clone()))
        .unwrap();

    let err = router
        .handle("math.add", json!({"a": 1, "b": 1}), None)
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 401);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Gateway and client
// =============================================================================

#[tokio::test]
async fn test_gateway_end_to_end() {
    let gateway = Gateway::with_config(
        app_router(Arc::new(AtomicUsize::new(0))),
        GatewayConfig::new().with_error_config(ErrorConfig::development()),
    )
    .unwrap();

    let ok = gateway
        .handle_route(
            "POST",
            "/api/query/math.add",
            json!({"input": {"a": 2, "b": 3}}),
            None,
        )
        .await;
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body, json!({"result": {"result": 5.0}, "success": true}));

    let err = gateway
        .handle_route(
            "POST",
            "/api/query/math.divide",
            json!({"input": {"a": 2, "b": 0}}),
            None,
        )
        .await;
    assert_eq!(err.status, 400);
    assert_eq!(
        err.body,
        json!({
            "error": {"code": "BAD_REQUEST", "message": "Cannot divide by zero"},
            "success": false
        })
    );

    let health = gateway
        .handle_route("GET", "/api/health", Value::Null, None)
        .await;
    assert_eq!(health.body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_client_receives_classified_error() {
    let gateway = Gateway::new(app_router(Arc::new(AtomicUsize::new(0))));
    let client = RpcClient::new(gateway);
    let users = client.caller("users");

    let user = users
        .query::<UserId, User>("get")
        .call(UserId { id: 1 })
        .await
        .unwrap();
    assert_eq!(user.name, "Ada");

    let err = users
        .query::<UserId, User>("get")
        .call(UserId { id: 2 })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, "User not found");
    assert_eq!(err.to_string(), "NOT_FOUND: User not found");
}

#[tokio::test]
async fn test_client_math() {
    let client = RpcClient::new(Gateway::new(app_router(Arc::new(AtomicUsize::new(0)))));
    let add = client.caller("math").query::<BinaryInput, CalcOutput>("add");
    let out = add.call(BinaryInput { a: 2.0, b: 3.0 }).await.unwrap();
    assert_eq!(out.result, 5.0);
}
