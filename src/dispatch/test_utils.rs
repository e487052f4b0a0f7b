#![cfg(test)]

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::{CallOutcome, Caller, EndpointTemplate};
use crate::source::Address;

pub fn addresses(n: usize) -> Vec<Address> {
    (0..n).map(|i| Address::from(format!("0x{:040x}", i))).collect()
}

/// A caller backed by a closure, for driving the dispatcher without a network
pub struct FnCaller<F>(pub F);

#[async_trait]
impl<F, Fut> Caller for FnCaller<F>
where
    F: Fn(Address) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallOutcome> + Send + 'static,
{
    type Remainder = ();

    async fn call(&self, address: &Address) -> (CallOutcome, Option<()>) {
        ((self.0)(address.clone()).await, None)
    }
}

/// Local stand-in for the txlist API
///
/// `0xAAA` gets a 200, `0xSLOW` a 200 after 5 seconds, anything else a 500
pub struct MockApi {
    pub url: String,
}

impl MockApi {
    pub async fn start() -> Self {
        let app = Router::new().route("/api", get(txlist));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url }
    }

    pub fn endpoint(&self) -> EndpointTemplate {
        format!(
            "{}/api?module=account&action=txlist&address={{address}}&apikey={{api_key}}",
            self.url
        )
        .try_into()
        .map(|t: EndpointTemplate| t.with_api_key("test-key"))
        .unwrap()
    }

    /// An endpoint nothing listens on
    pub fn unreachable() -> EndpointTemplate {
        "http://127.0.0.1:1/api?address={address}"
            .to_owned()
            .try_into()
            .unwrap()
    }
}

async fn txlist(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if params.get("apikey").map(String::as_str) != Some("test-key") {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"})),
        );
    }

    match params.get("address").map(String::as_str) {
        Some("0xAAA") => (
            StatusCode::OK,
            Json(json!({"status": "1", "message": "OK", "result": []})),
        ),
        Some("0xSLOW") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (
                StatusCode::OK,
                Json(json!({"status": "1", "message": "OK", "result": []})),
            )
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": "0", "message": "NOTOK", "result": "Error!"})),
        ),
    }
}

/// Answers every request with a 200 whose body never fully arrives
///
/// The server either stalls after part of the body, or closes the connection.
pub struct BrokenBodyApi {
    pub url: String,
}

impl BrokenBodyApi {
    pub async fn start(stall: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\n\
                              Content-Type: application/json\r\n\
                              Content-Length: 100\r\n\r\n\
                              {\"status\": \"1\", ",
                        )
                        .await;

                    if stall {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                    }
                });
            }
        });

        Self { url }
    }

    pub fn endpoint(&self) -> EndpointTemplate {
        format!("{}/api?address={{address}}", self.url)
            .try_into()
            .unwrap()
    }
}
