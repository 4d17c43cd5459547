//! 스텁 HTTP 서버를 상대로 한 Tushare 클라이언트 통합 테스트.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use mockito::Matcher;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stock_core::TushareConfig;
use stock_data::{DataError, DataProvider, TushareClient};

fn config(base_url: String, retry: u32) -> TushareConfig {
    TushareConfig {
        token: "test-token".to_string(),
        base_url,
        timeout_secs: 5,
        retry,
        retry_backoff_ms: 1,
    }
}

fn daily_response() -> Value {
    json!({
        "code": 0,
        "msg": "",
        "data": {
            "fields": ["ts_code", "trade_date", "open", "high", "low", "close",
                       "pre_close", "change", "pct_chg", "vol", "amount"],
            "items": [
                ["000001.SZ", "20231201", 9.2, 9.35, 9.15, 9.3, 9.18, 0.12, 1.3072, 1021345.5, 948723.1],
                ["000002.SZ", "20231201", null, 12.1, 11.8, 12.0, 11.9, 0.1, 0.8403, 500000.0, 600000.0]
            ]
        }
    })
}

/// 일봉 테이블 해석과 요청 본문 형식.
#[tokio::test]
async fn test_daily_success_parses_rows() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "api_name": "daily",
            "token": "test-token",
            "params": { "trade_date": "20231201" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(daily_response().to_string())
        .expect(1)
        .create_async()
        .await;

    let client = TushareClient::new(&config(server.url(), 3)).unwrap();
    let bars = client.daily("20231201", None).await.unwrap();

    mock.assert_async().await;
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].ts_code, "000001.SZ");
    assert_eq!(bars[0].close, 9.3);
    assert_eq!(bars[0].pct_chg, 1.3072);
}

/// `open`이 null이면 0.0, 나머지 필드는 그대로.
#[tokio::test]
async fn test_null_open_defaults_to_zero() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_body(daily_response().to_string())
        .create_async()
        .await;

    let client = TushareClient::new(&config(server.url(), 0)).unwrap();
    let bars = client.daily("20231201", None).await.unwrap();

    let bar = &bars[1];
    assert_eq!(bar.open, 0.0);
    assert_eq!(bar.ts_code, "000002.SZ");
    assert_eq!(bar.trade_date, "20231201");
    assert_eq!(bar.high, 12.1);
    assert_eq!(bar.close, 12.0);
    assert_eq!(bar.amount, 600000.0);
}

/// 0이 아닌 상태 코드는 재시도하고, 제공자 메시지를 그대로 반환.
#[tokio::test]
async fn test_provider_error_exhausts_retries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(
            json!({"code": 40203, "msg": "抱歉，您每分钟最多访问该接口200次", "data": null})
                .to_string(),
        )
        .expect(3)
        .create_async()
        .await;

    let client = TushareClient::new(&config(server.url(), 2)).unwrap();
    let err = client.daily("20231201", None).await.unwrap_err();

    mock.assert_async().await;
    match err {
        DataError::ApiError { code, msg } => {
            assert_eq!(code, 40203);
            assert_eq!(msg, "抱歉，您每分钟最多访问该接口200次");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// 필드 필터는 그대로 전달.
#[tokio::test]
async fn test_field_filter_forwarded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "api_name": "trade_cal",
            "fields": "cal_date,is_open"
        })))
        .with_status(200)
        .with_body(
            json!({"code": 0, "msg": null, "data": {"fields": ["cal_date", "is_open"], "items": []}})
                .to_string(),
        )
        .create_async()
        .await;

    let client = TushareClient::new(&config(server.url(), 0)).unwrap();
    let table = client
        .call("trade_cal", serde_json::Map::new(), Some("cal_date,is_open"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(table.is_empty());
    assert_eq!(table.fields, vec!["cal_date", "is_open"]);
}

async fn flaky_handler(
    State(calls): State<Arc<AtomicUsize>>,
    Json(_body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
    match n {
        1 => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"msg": "upstream"}))),
        2 => (
            StatusCode::OK,
            Json(json!({"code": -2001, "msg": "系统繁忙", "data": null})),
        ),
        _ => (StatusCode::OK, Json(daily_response())),
    }
}

/// retry=3에서 두 번 실패 후 성공하면 정확히 3회 호출.
#[tokio::test]
async fn test_retry_succeeds_on_third_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/", post(flaky_handler))
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = TushareClient::new(&config(format!("http://{addr}"), 3)).unwrap();
    let bars = client.daily("20231201", None).await.unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
