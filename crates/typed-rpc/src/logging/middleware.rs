//! Call logging middleware.

use super::config::{LogConfig, LogLevel};
use super::redaction::RedactionEngine;
use crate::middleware::{MiddlewareFn, Next, Request, Response, from_fn};
use crate::{RpcContext, RpcResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, info_span, warn};

// tracing macros need the level at compile time.
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
            LogLevel::Error => tracing::error!($($arg)+),
            LogLevel::Off => {}
        }
    };
}

/// Create a middleware that logs every call it wraps.
///
/// Successful calls are logged at `config.level`, failures at warn for
/// client errors and error for server errors. Calls slower than the
/// configured threshold get an extra warning. Inputs and outputs are only
/// logged when enabled, and always after redaction.
///
/// # Example
/// ```rust,ignore
/// use typed_rpc::logging::{LogConfig, LogLevel, logging_middleware};
///
/// let router = Router::new()
///     .middleware_fn(logging_middleware(
///         LogConfig::new()
///             .with_level(LogLevel::Debug)
///             .with_input(true)
///             .exclude_path("health"),
///     ));
/// ```
pub fn logging_middleware(config: LogConfig) -> MiddlewareFn {
    let engine = Arc::new(RedactionEngine::new(&config));
    let config = Arc::new(config);

    from_fn(move |ctx: RpcContext, req: Request, next: Next| {
        let config = config.clone();
        let engine = engine.clone();
        async move {
            if !config.should_log_path(&req.path) {
                return next(ctx, req).await;
            }

            let path = req.path.clone();
            let kind = req.kind;
            let request_id = ctx.request_id();
            let input = config.log_input.then(|| engine.redact(&req.input));

            let start = Instant::now();
            let call = next(ctx, req);
            let result = if config.create_spans {
                let span = info_span!("rpc_call", %request_id, path = %path, kind = %kind);
                call.instrument(span).await
            } else {
                call.await
            };
            let elapsed = start.elapsed();

            let outcome = CallOutcome {
                request_id: request_id.to_string(),
                path: &path,
                kind: kind.as_str(),
                elapsed,
                input,
            };
            outcome.log(&config, &engine, &result);
            result
        }
    })
}

struct CallOutcome<'a> {
    request_id: String,
    path: &'a str,
    kind: &'static str,
    elapsed: Duration,
    input: Option<serde_json::Value>,
}

impl CallOutcome<'_> {
    fn log(&self, config: &LogConfig, engine: &RedactionEngine, result: &RpcResult<Response>) {
        let duration_ms = self.elapsed.as_secs_f64() * 1000.0;
        let input = self.input.as_ref().map(|v| v.to_string());

        match result {
            Ok(output) => {
                if config.log_success {
                    let output = config.log_output.then(|| engine.redact(output).to_string());
                    event_at!(
                        config.level,
                        request_id = %self.request_id,
                        path = %self.path,
                        kind = self.kind,
                        duration_ms,
                        input = input.as_deref(),
                        output = output.as_deref(),
                        "RPC call succeeded"
                    );
                }
            }
            Err(error) if config.log_errors => {
                let level = if error.status_code >= 500 {
                    LogLevel::Error
                } else {
                    LogLevel::Warn
                };
                event_at!(
                    level,
                    request_id = %self.request_id,
                    path = %self.path,
                    kind = self.kind,
                    duration_ms,
                    input = input.as_deref(),
                    code = %error.code,
                    status = error.status_code,
                    error = %error.message,
                    "RPC call failed"
                );
            }
            Err(_) => {}
        }

        if config.is_slow(self.elapsed) {
            warn!(
                request_id = %self.request_id,
                path = %self.path,
                duration_ms,
                threshold_ms = config
                    .slow_request_threshold
                    .map(|t| t.as_millis() as u64)
                    .unwrap_or_default(),
                "Slow RPC call"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Router, RpcError};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn router(config: LogConfig, calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .middleware_fn(logging_middleware(config))
            .query("echo")
            .input::<Value>()
            .output::<Value>()
            .resolver(move |input: Value| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RpcError>(input)
                }
            })
            .register()
            .unwrap()
            .query("fail")
            .input::<Value>()
            .output::<Value>()
            .resolver(|_: Value| async { Err::<Value, _>(RpcError::internal("boom")) })
            .register()
            .unwrap()
    }

    #[tokio::test]
    async fn test_passes_results_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = router(LogConfig::new().with_input(true).with_output(true), calls.clone());

        let out = router
            .handle("echo", json!({"password": "x", "n": 1}), None)
            .await
            .unwrap();
        // Redaction only touches the logged copy.
        assert_eq!(out, json!({"password": "x", "n": 1}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = router.handle("fail", Value::Null, None).await.unwrap_err();
        assert_eq!(err.status_code, 500);
    }

    #[tokio::test]
    async fn test_excluded_and_off_still_call_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let excluded = router(LogConfig::new().exclude_path("echo"), calls.clone());
        excluded.handle("echo", json!(1), None).await.unwrap();

        let off = router(
            LogConfig::new().with_level(LogLevel::Off).with_spans(false),
            calls.clone(),
        );
        off.handle("echo", json!(2), None).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Info.should_log(LogLevel::Error));
        assert!(!LogLevel::Warn.should_log(LogLevel::Debug));
        assert!(!LogLevel::Off.should_log(LogLevel::Error));
        assert!(LogConfig::new().is_slow(Duration::from_secs(2)));
        assert!(!LogConfig::new().without_slow_request_logging().is_slow(Duration::from_secs(2)));
    }
}
