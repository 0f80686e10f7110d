//! Scenario tests for the gateway route handling

use crate::{
    ErrorConfig, Gateway, GatewayConfig, Router, RpcContext, RpcError, Validate, ValidationResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    name: String,
}

impl Validate for Greeting {
    fn validate(&self) -> ValidationResult {
        crate::ValidationRules::new().required("name", &self.name).build()
    }
}

fn gateway_with(config: GatewayConfig) -> Gateway {
    let users = Router::new()
        .query("get")
        .input::<Value>()
        .output::<Value>()
        .resolver(|_: Value| async { Err::<Value, _>(RpcError::not_found("User not found")) })
        .register()
        .unwrap()
        .mutation("greet")
        .input::<Greeting>()
        .output::<Value>()
        .resolver(|g: Greeting| async move { Ok::<_, RpcError>(json!(format!("hi {}", g.name))) })
        .register()
        .unwrap()
        .query("crash")
        .input::<Value>()
        .output::<Value>()
        .resolver(|_: Value| async { Err::<Value, _>(RpcError::internal("db password leaked")) })
        .register()
        .unwrap()
        .query("whoami")
        .input::<Value>()
        .output::<Value>()
        .resolver_with_context(|_: Value, ctx: RpcContext| async move {
            Ok::<_, RpcError>(json!(ctx.raw_request::<String>().cloned()))
        })
        .register()
        .unwrap();
    let router = Router::new().merge("users", users).unwrap();
    Gateway::with_config(router, config).unwrap()
}

fn gateway() -> Gateway {
    gateway_with(GatewayConfig::default())
}

#[tokio::test]
async fn test_health() {
    let gw = gateway();
    let response = gw.handle_route("GET", "/api/health", Value::Null, None).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"status": "healthy"}));

    let response = gw.handle_route("POST", "/api/health", Value::Null, None).await;
    assert_eq!(response.status, 405);
}

#[tokio::test]
async fn test_success_envelope() {
    let response = gateway()
        .handle_route(
            "POST",
            "/api/mutation/users.greet",
            json!({"input": {"name": "bob"}}),
            None,
        )
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"result": "hi bob", "success": true}));
}

#[tokio::test]
async fn test_error_envelope_carries_status() {
    let response = gateway()
        .handle_route("post", "/api/query/users.get", json!({"input": {"id": 9}}), None)
        .await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body["success"], json!(false));
    assert_eq!(response.body["error"]["code"], json!("NOT_FOUND"));
    assert_eq!(response.body["error"]["message"], json!("User not found"));
}

#[tokio::test]
async fn test_validation_error_envelope() {
    let response = gateway()
        .handle_route("POST", "/api/mutation/users.greet", json!({"input": {"name": " "}}), None)
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"]["code"], json!("VALIDATION_ERROR"));
    assert!(response.body["error"]["details"]["errors"].is_array());
}

#[tokio::test]
async fn test_missing_input_is_null() {
    let response = gateway()
        .handle_route("POST", "/api/query/users.whoami", json!({}), None)
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["result"], Value::Null);
}

#[tokio::test]
async fn test_raw_request_reaches_resolver() {
    let ctx = RpcContext::new().with_raw_request("GET /api".to_string());
    let response = gateway()
        .handle_route("POST", "/api/query/users.whoami", json!({}), Some(ctx))
        .await;
    assert_eq!(response.body["result"], json!("GET /api"));
}

#[tokio::test]
async fn test_rejections() {
    let gw = gateway();

    let response = gw.handle_route("GET", "/api/query/users.get", json!({}), None).await;
    assert_eq!(response.status, 405);

    let response = gw.handle_route("POST", "/api/query/users.get", json!([1]), None).await;
    assert_eq!(response.status, 400);

    let response = gw.handle_route("POST", "/api/query/users.greet", json!({}), None).await;
    assert_eq!(response.status, 405);
    assert_eq!(response.body["error"]["code"], json!("METHOD_NOT_ALLOWED"));

    let response = gw.handle_route("POST", "/api/query/nope", json!({}), None).await;
    assert_eq!(response.status, 404);

    let response = gw.handle_route("POST", "/elsewhere", json!({}), None).await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_oversized_input_rejected() {
    let gw = gateway_with(GatewayConfig::new().with_max_input_size(32));
    let response = gw
        .handle_route(
            "POST",
            "/api/mutation/users.greet",
            json!({"input": {"name": "x".repeat(100)}}),
            None,
        )
        .await;
    assert_eq!(response.status, 413);
    assert_eq!(response.body["error"]["code"], json!("PAYLOAD_TOO_LARGE"));
}

#[tokio::test]
async fn test_oversized_body_rejected_even_with_small_input() {
    let gw = gateway_with(GatewayConfig::new().with_max_input_size(64));
    let response = gw
        .handle_route(
            "POST",
            "/api/mutation/users.greet",
            json!({"input": {"name": "ada"}, "padding": "x".repeat(200)}),
            None,
        )
        .await;
    assert_eq!(response.status, 413);
    assert_eq!(response.body["error"]["code"], json!("PAYLOAD_TOO_LARGE"));

    let response = gw
        .handle_route(
            "POST",
            "/api/mutation/users.greet",
            json!({"input": {"name": "ada"}}),
            None,
        )
        .await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_server_errors_hidden_unless_development() {
    let response = gateway()
        .handle_route("POST", "/api/query/users.crash", json!({}), None)
        .await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"]["message"], json!("An internal error occurred"));

    let gw = gateway_with(GatewayConfig::new().with_error_config(ErrorConfig::development()));
    let response = gw
        .handle_route("POST", "/api/query/users.crash", json!({}), None)
        .await;
    assert_eq!(response.body["error"]["message"], json!("db password leaked"));
}
