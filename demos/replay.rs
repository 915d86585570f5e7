use async_trait::async_trait;
use gosub_network::{
    ContinueOverrides, NetworkConfig, NetworkEvent, NetworkManager, NetworkWorker, Transport, TransportError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Answers every command locally. Bodies are served from a fixed page.
struct ReplayTransport;

#[async_trait]
impl Transport for ReplayTransport {
    async fn send(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        log::info!("-> {method} {params}");
        match method {
            "Network.getResponseBody" => Ok(json!({
                "body": "<html><body>Hello from c.test</body></html>",
                "base64Encoded": false,
            })),
            _ => Ok(json!({})),
        }
    }
}

fn request(url: &str) -> Value {
    json!({ "url": url, "method": "GET", "headers": { "Accept": "text/html" } })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = NetworkConfig::builder()
        .user_agent("Gosub/0.1")
        .extra_http_header("X-Requested-By", "gosub")
        .request_interception(true)
        .build()?;

    let manager = Arc::new(NetworkManager::new(Arc::new(ReplayTransport), config));
    manager.initialize().await?;

    // Only events published from this point on are received.
    let mut events = manager.subscribe();

    let (event_tx, event_rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(NetworkWorker::new(manager.clone(), event_rx).run(cancel.clone()));

    // A navigation to a.test that redirects twice, plus an inline image.
    let script = vec![
        ("Network.requestWillBeSent", json!({ "requestId": "1000.1", "request": request("https://a.test/") })),
        ("Network.requestIntercepted", json!({ "interceptionId": "id-1", "request": request("https://a.test/#top") })),
        ("Network.requestIntercepted", json!({
            "interceptionId": "id-1",
            "request": request("https://a.test/"),
            "redirectStatusCode": 301,
            "redirectHeaders": { "Location": "https://b.test/" },
            "redirectUrl": "https://b.test/",
        })),
        ("Network.requestIntercepted", json!({
            "interceptionId": "id-1",
            "request": request("https://b.test/"),
            "redirectStatusCode": 302,
            "redirectHeaders": { "Location": "https://c.test/" },
            "redirectUrl": "https://c.test/",
        })),
        ("Network.requestWillBeSent", json!({ "requestId": "1000.2", "request": request("data:image/png;base64,AAAA") })),
        ("Network.responseReceived", json!({ "requestId": "1000.1", "response": { "status": 200, "headers": { "Content-Type": "text/html" } } })),
        ("Network.loadingFinished", json!({ "requestId": "1000.1" })),
        ("Network.loadingFinished", json!({ "requestId": "1000.2" })),
    ];
    let expected = script.len();
    for (method, params) in script {
        event_tx.send((method.to_string(), params)).await?;
    }
    drop(event_tx);

    let handled = worker.await?;
    println!("worker handled {handled}/{expected} events");

    let mut final_response = None;
    while let Ok(ev) = events.try_recv() {
        match &ev {
            NetworkEvent::Request(req) => {
                println!("request   {} {}", req.method(), req.url());
                req.continue_request(ContinueOverrides::default()).await?;
            }
            NetworkEvent::Response(resp) => {
                println!("response  {} {} {}", resp.status(), resp.status_text(), resp.url());
                if resp.ok() {
                    final_response = Some(resp.clone());
                }
            }
            NetworkEvent::RequestFinished(req) => println!("finished  {}", req.url()),
            NetworkEvent::RequestFailed(req) => {
                println!("failed    {} ({})", req.url(), req.failure().unwrap_or_default())
            }
        }
    }

    if let Some(resp) = final_response {
        let (a, b) = futures::join!(resp.text(), resp.text());
        println!("body: {}", a?);
        assert_eq!(b?.len(), resp.body().await?.len());
    }

    cancel.cancel();
    Ok(())
}
