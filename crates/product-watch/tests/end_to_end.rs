//! Full watcher runs driven through the command channel with paused time.

use std::time::Duration;

use product_watch::{
    CoordinatorBus, CoordinatorMessage, Dispatcher, Document, FileTitleStore, MemoryTitleStore,
    ProductWatcher, TitleStore, WatchCommand, WatchConfig, WatchStatus, WatcherPhase,
    LAST_TITLE_KEY,
};
use tokio::sync::{broadcast, mpsc, oneshot};

const URL: &str = "https://seller.tiktok.com/live/dashboard";

fn page(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(class, title)| {
            format!(r#"<div class="{class}"><span class="product-title">{title}</span></div>"#)
        })
        .collect();
    format!(r#"<html><head></head><body><div id="product-list">{body}</div></body></html>"#)
}

fn test_config() -> WatchConfig {
    WatchConfig {
        max_title_length: 40,
        poll_interval_millis: 60_000,
        ..WatchConfig::default()
    }
}

fn new_watcher(config: WatchConfig, url: &str) -> (ProductWatcher, broadcast::Receiver<CoordinatorMessage>) {
    let bus = CoordinatorBus::new(16);
    let rx = bus.subscribe();
    let dispatcher = Dispatcher::new(Box::new(MemoryTitleStore::new()), bus);
    (ProductWatcher::new(config, url, dispatcher), rx)
}

async fn status(tx: &mpsc::UnboundedSender<WatchCommand>) -> WatchStatus {
    let (reply, rx) = oneshot::channel();
    tx.send(WatchCommand::Status(reply)).unwrap();
    rx.await.unwrap()
}

async fn current_title(tx: &mpsc::UnboundedSender<WatchCommand>) -> Option<String> {
    let (reply, rx) = oneshot::channel();
    tx.send(WatchCommand::CurrentTitle(reply)).unwrap();
    rx.await.unwrap()
}

fn dom_changed(tx: &mpsc::UnboundedSender<WatchCommand>, html: String) {
    tx.send(WatchCommand::DomChanged {
        html,
        records: None,
    })
    .unwrap();
}

fn titles(rx: &mut broadcast::Receiver<CoordinatorMessage>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(CoordinatorMessage::ProductChanged { title, .. }) = rx.try_recv() {
        out.push(title);
    }
    out
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_live_session_scenario() {
    let (mut watcher, mut events) = new_watcher(test_config(), URL);
    let (tx, rx) = mpsc::unbounded_channel();

    // (a) Nothing active yet.
    watcher.start(Document::parse(&page(&[
        ("product-item", "chanel flap bag"),
        ("product-item", "Vintage Louis Vuitton Speedy 30 Monogram Canvas Handbag"),
    ])));
    assert!(titles(&mut events).is_empty());

    let driver = async move {
        // (b) First item becomes active, with control-label noise.
        dom_changed(
            &tx,
            page(&[
                ("product-item product--active", "  chanel flap bag  View product"),
                ("product-item", "Vintage Louis Vuitton Speedy 30 Monogram Canvas Handbag"),
            ]),
        );
        sleep_ms(600).await;
        let after_b = titles(&mut events);

        // (c) Unrelated attribute churn on the same item.
        tx.send(WatchCommand::DomChanged {
            html: page(&[
                ("product-item product--active hovered", "  chanel flap bag  View product"),
                ("product-item", "Vintage Louis Vuitton Speedy 30 Monogram Canvas Handbag"),
            ]),
            records: None,
        })
        .unwrap();
        sleep_ms(600).await;
        let after_c = titles(&mut events);
        let status_c = status(&tx).await;

        // (d) A different item with an overlong title becomes active.
        dom_changed(
            &tx,
            page(&[
                ("product-item", "chanel flap bag"),
                (
                    "product-item product--active",
                    "Vintage Louis Vuitton Speedy 30 Monogram Canvas Handbag",
                ),
            ]),
        );
        sleep_ms(600).await;
        let after_d = titles(&mut events);
        let last = current_title(&tx).await;

        tx.send(WatchCommand::Close).unwrap();
        (after_b, after_c, status_c, after_d, last)
    };

    let (watcher, (after_b, after_c, status_c, after_d, last)) =
        tokio::join!(watcher.run(rx), driver);

    assert_eq!(after_b, vec!["chanel flap bag".to_string()]);
    assert!(after_c.is_empty());
    assert_eq!(status_c.stats.evaluations, 3);
    assert_eq!(status_c.stats.emitted, 1);
    assert_eq!(
        after_d,
        vec!["Vintage Louis Vuitton Speedy 30 Monogram".to_string()]
    );
    assert_eq!(last.as_deref(), Some("Vintage Louis Vuitton Speedy 30 Monogram"));
    assert_eq!(watcher.phase(), WatcherPhase::TornDown);
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_into_one_evaluation() {
    let (mut watcher, _events) = new_watcher(test_config(), URL);
    let (tx, rx) = mpsc::unbounded_channel();
    watcher.start(Document::parse(&page(&[("product-item", "A")])));

    let driver = async move {
        for i in 0..5 {
            let class = if i % 2 == 0 { "product-item flash" } else { "product-item" };
            dom_changed(&tx, page(&[(class, "A")]));
            sleep_ms(100).await;
        }
        // Last signal at t=400; deadline is t=900.
        sleep_ms(399).await;
        let before = status(&tx).await;
        sleep_ms(2).await;
        let after = status(&tx).await;
        tx.send(WatchCommand::Close).unwrap();
        (before, after)
    };

    let (_, (before, after)) = tokio::join!(watcher.run(rx), driver);

    assert_eq!(before.stats.relevant_batches, 5);
    assert_eq!(before.stats.evaluations, 1);
    assert!(before.pending_check);
    assert_eq!(after.stats.evaluations, 2);
    assert!(!after.pending_check);
}

#[tokio::test(start_paused = true)]
async fn test_force_check_bypasses_quiet_period() {
    let (mut watcher, mut events) = new_watcher(test_config(), URL);
    let (tx, rx) = mpsc::unbounded_channel();
    watcher.start(Document::parse(&page(&[("product-item", "Dior Saddle")])));

    let driver = async move {
        dom_changed(&tx, page(&[("product-item product--active", "Dior Saddle")]));
        tx.send(WatchCommand::ForceCheck).unwrap();
        let status = status(&tx).await;
        let emitted = titles(&mut events);
        tx.send(WatchCommand::Close).unwrap();
        (status, emitted)
    };

    let (_, (status, emitted)) = tokio::join!(watcher.run(rx), driver);
    assert_eq!(emitted, vec!["Dior Saddle".to_string()]);
    assert_eq!(status.stats.evaluations, 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_catches_missed_change() {
    let mut config = test_config();
    config.poll_interval_millis = 1_000;
    config.profiles.overrides.clear();
    config.profiles.default.product_list_selector = "::not-a-selector".to_string();
    let (mut watcher, mut events) = new_watcher(config, URL);
    let (tx, rx) = mpsc::unbounded_channel();
    watcher.start(Document::parse(&page(&[("product-item", "Celine Box")])));
    assert!(!watcher.is_observing());

    let driver = async move {
        dom_changed(&tx, page(&[("product-item product--active", "Celine Box")]));
        sleep_ms(500).await;
        let early = titles(&mut events);
        sleep_ms(600).await;
        let late = titles(&mut events);
        tx.send(WatchCommand::Close).unwrap();
        (early, late)
    };

    let (_, (early, late)) = tokio::join!(watcher.run(rx), driver);
    assert!(early.is_empty());
    assert_eq!(late, vec!["Celine Box".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_vanished_item_keeps_last_title() {
    let (mut watcher, mut events) = new_watcher(test_config(), URL);
    let (tx, rx) = mpsc::unbounded_channel();
    watcher.start(Document::parse(&page(&[("product-item product--active", "Fendi Baguette")])));
    assert_eq!(titles(&mut events), vec!["Fendi Baguette".to_string()]);

    let driver = async move {
        dom_changed(&tx, page(&[("product-item", "Fendi Baguette")]));
        sleep_ms(600).await;
        dom_changed(&tx, page(&[("product-item product--active", "Fendi Baguette")]));
        sleep_ms(600).await;
        let last = current_title(&tx).await;
        drop(tx);
        (last, titles(&mut events))
    };

    let (watcher, (last, emitted)) = tokio::join!(watcher.run(rx), driver);
    assert_eq!(last.as_deref(), Some("Fendi Baguette"));
    assert!(emitted.is_empty());
    // Dropping every sender ends the loop too.
    assert_eq!(watcher.phase(), WatcherPhase::TornDown);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_watcher_still_answers() {
    let (mut watcher, mut events) = new_watcher(test_config(), "https://shop.example.com/");
    let (tx, rx) = mpsc::unbounded_channel();
    assert_eq!(
        watcher.start(Document::parse(&page(&[("product--active", "Hidden")]))),
        WatcherPhase::Disabled
    );

    let driver = async move {
        dom_changed(&tx, page(&[("product--active", "Still hidden")]));
        tx.send(WatchCommand::ForceCheck).unwrap();
        sleep_ms(5_000).await;
        let status = status(&tx).await;
        tx.send(WatchCommand::Close).unwrap();
        status
    };

    let (_, status) = tokio::join!(watcher.run(rx), driver);
    assert_eq!(status.phase, WatcherPhase::Disabled);
    assert_eq!(status.stats.evaluations, 0);
    assert!(titles(&mut events).is_empty());
}

#[tokio::test]
async fn test_file_store_receives_each_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("last.json");

    let bus = CoordinatorBus::default();
    let store = FileTitleStore::open(&path).unwrap();
    let mut watcher = ProductWatcher::new(
        test_config(),
        URL,
        Dispatcher::new(Box::new(store), bus),
    );

    watcher.start(Document::parse(&page(&[("product-item product--active", "Loewe Puzzle")])));
    assert!(watcher.on_dom_changed(
        &page(&[
            ("product-item", "Loewe Puzzle"),
            ("product-item product--active", "Bottega Jodie"),
        ]),
        None,
    ));
    assert!(watcher.has_pending_check());
    assert!(watcher.force_check().is_some());
    watcher.teardown();

    // The write lands on the blocking pool; wait for it.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let reopened = FileTitleStore::open(&path).unwrap();
            if reopened.get(LAST_TITLE_KEY).unwrap().as_deref() == Some("Bottega Jodie") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("last title never reached the file");
}
