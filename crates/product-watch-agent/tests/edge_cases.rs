//! Edge case integration tests for product-watch-agent.
//!
//! Drives the protocol handler and the stdio transport with in-memory I/O.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::task::LocalSet;

use product_watch::{CoordinatorBus, WatchConfig};
use product_watch_agent::protocol::{LogControl, NoopLogControl, ProtocolHandler};
use product_watch_agent::session::WatchSession;
use product_watch_agent::transport::StdioTransport;
use product_watch_agent::types::AgentResult;

// ─────────────────────── helpers ───────────────────────

const URL: &str = "https://studio.tiktok.com/live/console";

fn page(active_title: &str) -> String {
    format!(
        r#"<html><head></head><body><div class="product-grid"><div class="product-card active"><span class="product-title">{active_title}</span></div><div class="product-card"><span class="product-title">Other</span></div></div></body></html>"#
    )
}

fn handler() -> ProtocolHandler {
    let session = WatchSession::new(WatchConfig::default(), None, CoordinatorBus::default());
    ProtocolHandler::new(session, Box::new(NoopLogControl))
}

fn line(value: Value) -> String {
    format!("{value}\n")
}

/// Feed `input` through a transport already watching `URL`; return every
/// output line.
async fn run_transport(input: String) -> Vec<Value> {
    run_transport_with(input.as_bytes()).await
}

async fn run_transport_with<R>(reader: R) -> Vec<Value>
where
    R: AsyncBufRead + Unpin,
{
    let mut transport = StdioTransport::new(handler());
    transport.handler_mut().navigate(URL, None).await;

    let mut out = Vec::new();
    let handler = transport.run_with(reader, &mut out).await.unwrap();
    assert!(!handler.session().is_open());

    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

async fn send(handler: &mut ProtocolHandler, msg: Value) -> Option<Value> {
    handler.handle_line(&msg.to_string()).await
}

async fn send_unwrap(handler: &mut ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

struct RecordingLogControl(Rc<RefCell<Vec<bool>>>);

impl LogControl for RecordingLogControl {
    fn set_debug(&self, enabled: bool) -> AgentResult<()> {
        self.0.borrow_mut().push(enabled);
        Ok(())
    }
}

// ─────────────────────── transport ───────────────────────

#[tokio::test]
async fn test_full_exchange_over_transport() {
    LocalSet::new()
        .run_until(async {
            let input = [
                line(json!({"type": "DOM_SNAPSHOT", "html": page("Prada Galleria  Edit")})),
                line(json!({"type": "FORCE_CHECK"})),
                line(json!({"type": "GET_CURRENT_PRODUCT"})),
                line(json!({"type": "FORCE_CHECK"})),
                line(json!({"type": "GET_STATUS"})),
                line(json!({"type": "CLOSE"})),
                line(json!({"type": "GET_STATUS"})),
            ]
            .concat();

            let out = run_transport(input).await;
            assert_eq!(out.len(), 6, "{out:#?}");

            assert_eq!(out[0]["type"], "PRODUCT_CHANGED");
            assert_eq!(out[0]["title"], "Prada Galleria");
            assert_eq!(out[0]["url"], URL);
            assert!(out[0]["timestampMillis"].as_i64().unwrap() > 0);

            assert_eq!(
                out[1],
                json!({"type": "RESPONSE", "request": "FORCE_CHECK", "success": true})
            );
            assert_eq!(out[2]["title"], "Prada Galleria");
            // Duplicate check: reply only, no second change.
            assert_eq!(out[3]["request"], "FORCE_CHECK");

            assert_eq!(out[4]["request"], "GET_STATUS");
            assert_eq!(out[4]["phase"], "watching");
            assert_eq!(out[4]["stats"]["emitted"], 1);
            assert_eq!(out[4]["stats"]["relevantBatches"], 1);

            // Nothing is read after CLOSE.
            assert_eq!(out[5]["request"], "CLOSE");
        })
        .await;
}

#[tokio::test]
async fn test_malformed_and_unknown_lines() {
    LocalSet::new()
        .run_until(async {
            let input = [
                "{not json\n".to_string(),
                "\n".to_string(),
                line(json!({"type": "LAUNCH_ROCKET"})),
                line(json!({"type": "TOGGLE_DEBUG"})),
                line(json!({"html": "<p></p>"})),
            ]
            .concat();

            let out = run_transport(input).await;
            assert_eq!(out.len(), 4, "{out:#?}");

            assert_eq!(out[0]["request"], Value::Null);
            assert!(out[0]["error"]
                .as_str()
                .unwrap()
                .starts_with("Parse error: "));

            assert_eq!(out[1]["request"], "LAUNCH_ROCKET");
            assert_eq!(out[1]["error"], "Unknown message type");

            assert_eq!(out[2]["request"], "TOGGLE_DEBUG");
            assert!(out[2]["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid message: "));

            assert_eq!(out[3]["request"], Value::Null);
        })
        .await;
}

#[tokio::test]
async fn test_eof_without_close_tears_down() {
    LocalSet::new()
        .run_until(async {
            let out = run_transport(String::new()).await;
            assert!(out.is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_change_fires_after_quiet_period() {
    LocalSet::new()
        .run_until(async {
            let stdin = tokio_test::io::Builder::new()
                .read(line(json!({"type": "DOM_SNAPSHOT", "html": page("Celine Triomphe")})).as_bytes())
                .wait(Duration::from_millis(300))
                .read(line(json!({"type": "GET_CURRENT_PRODUCT"})).as_bytes())
                .wait(Duration::from_millis(300))
                .read(line(json!({"type": "GET_CURRENT_PRODUCT"})).as_bytes())
                .build();

            let out = run_transport_with(BufReader::new(stdin)).await;
            assert_eq!(out.len(), 3, "{out:#?}");

            // Still inside the quiet period: nothing reported yet.
            assert_eq!(out[0]["request"], "GET_CURRENT_PRODUCT");
            assert_eq!(out[0]["title"], Value::Null);

            // The debounce fired on its own, between the two requests.
            assert_eq!(out[1]["type"], "PRODUCT_CHANGED");
            assert_eq!(out[1]["title"], "Celine Triomphe");

            assert_eq!(out[2]["request"], "GET_CURRENT_PRODUCT");
            assert_eq!(out[2]["title"], "Celine Triomphe");
        })
        .await;
}

// ─────────────────────── handler ───────────────────────

#[tokio::test]
async fn test_navigate_starts_fresh_gate() {
    LocalSet::new()
        .run_until(async {
            let mut handler = handler();
            let mut events = handler.session().bus().subscribe();

            let reply = send_unwrap(
                &mut handler,
                json!({"type": "NAVIGATE", "url": URL, "html": page("Gucci Jackie")}),
            )
            .await;
            assert_eq!(reply["phase"], "watching");
            assert!(events.try_recv().is_ok());

            let reply = send_unwrap(&mut handler, json!({"type": "GET_CURRENT_PRODUCT"})).await;
            assert_eq!(reply["title"], "Gucci Jackie");

            send_unwrap(
                &mut handler,
                json!({"type": "NAVIGATE", "url": format!("{URL}?tab=2"), "html": page("Gucci Jackie")}),
            )
            .await;
            assert!(events.try_recv().is_ok());

            handler.shutdown().await;
        })
        .await;
}

#[tokio::test]
async fn test_unsupported_page_is_disabled() {
    LocalSet::new()
        .run_until(async {
            let mut handler = handler();
            let mut events = handler.session().bus().subscribe();

            let reply = send_unwrap(
                &mut handler,
                json!({"type": "NAVIGATE", "url": "https://shop.example.net/", "html": page("Nope")}),
            )
            .await;
            assert_eq!(reply["phase"], "disabled");

            let reply = send_unwrap(&mut handler, json!({"type": "FORCE_CHECK"})).await;
            assert_eq!(reply["success"], true);
            assert!(events.try_recv().is_err());

            let reply = send_unwrap(&mut handler, json!({"type": "GET_CURRENT_PRODUCT"})).await;
            assert_eq!(reply["title"], Value::Null);

            handler.shutdown().await;
        })
        .await;
}

#[tokio::test]
async fn test_explicit_irrelevant_mutations_are_ignored() {
    LocalSet::new()
        .run_until(async {
            let mut handler = handler();
            handler.navigate(URL, Some(&page("Dior Lady"))).await;

            let reply = send(
                &mut handler,
                json!({
                    "type": "DOM_SNAPSHOT",
                    "html": page("Dior Lady"),
                    "mutations": [{"kind": "childList", "target": [1], "addedNodes": []}]
                }),
            )
            .await;
            assert!(reply.is_none());

            let status = send_unwrap(&mut handler, json!({"type": "GET_STATUS"})).await;
            assert_eq!(status["stats"]["ignoredBatches"], 1);
            assert_eq!(status["pendingCheck"], false);
            assert_eq!(status["lastTitle"], "Dior Lady");

            handler.shutdown().await;
        })
        .await;
}

#[tokio::test]
async fn test_toggle_debug_reaches_log_control() {
    LocalSet::new()
        .run_until(async {
            let toggles = Rc::new(RefCell::new(Vec::new()));
            let session = WatchSession::new(WatchConfig::default(), None, CoordinatorBus::default());
            let mut handler =
                ProtocolHandler::new(session, Box::new(RecordingLogControl(toggles.clone())));
            handler.navigate(URL, None).await;

            let reply = send_unwrap(&mut handler, json!({"type": "TOGGLE_DEBUG", "enabled": true})).await;
            assert_eq!(reply["debug"], true);
            let status = send_unwrap(&mut handler, json!({"type": "GET_STATUS"})).await;
            assert_eq!(status["debug"], true);
            send_unwrap(&mut handler, json!({"type": "TOGGLE_DEBUG", "enabled": false})).await;

            assert_eq!(*toggles.borrow(), vec![true, false]);
            handler.shutdown().await;
        })
        .await;
}

#[tokio::test]
async fn test_requests_after_close_fail() {
    LocalSet::new()
        .run_until(async {
            let mut handler = handler();
            handler.navigate(URL, None).await;

            let reply = send_unwrap(&mut handler, json!({"type": "CLOSE"})).await;
            assert_eq!(reply["success"], true);
            assert!(handler.is_closed());

            let reply = send_unwrap(&mut handler, json!({"type": "GET_STATUS"})).await;
            assert_eq!(reply["error"], "Watcher is not running");
            let reply = send_unwrap(&mut handler, json!({"type": "DOM_SNAPSHOT", "html": ""})).await;
            assert_eq!(reply["request"], "DOM_SNAPSHOT");
        })
        .await;
}
