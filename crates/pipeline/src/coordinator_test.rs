//! End-to-end pipeline tests
//!
//! Each test tails a real temp file through a coordinator wired to a
//! broadcaster on an ephemeral port, exactly as the binary wires them.

use super::*;
use std::io::Write as _;
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use bidwatch_catalog::{Catalog, CatalogEntry, ResolvedBatch};

use crate::broadcast::BroadcasterConfig;
use crate::event::{ui_channel, UiEvent};

const POLL: Duration = Duration::from_millis(10);
const WAIT: Duration = Duration::from_secs(5);

struct Rig {
    coordinator: Coordinator,
    broadcaster: Arc<Broadcaster>,
    events: UnboundedReceiver<UiEvent>,
    file: NamedTempFile,
}

fn entry(name: &str) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        attributes: json!({}),
    }
}

fn rig(catalog: Catalog) -> Rig {
    let (ui, events) = ui_channel();
    let broadcaster = Arc::new(Broadcaster::new(
        BroadcasterConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
        },
        ui.clone(),
    ));
    let coordinator = Coordinator::new(
        SharedCatalog::new(catalog),
        Arc::clone(&broadcaster),
        ui,
    )
    .with_poll_interval(POLL);

    Rig {
        coordinator,
        broadcaster,
        events,
        file: NamedTempFile::new().unwrap(),
    }
}

impl Rig {
    fn target(&self) -> MonitorTarget {
        MonitorTarget::new(self.file.path(), "Bids")
    }

    /// Start monitoring and wait until the tailer is attached, so lines
    /// written afterwards are guaranteed to be seen
    async fn start(&mut self) {
        let target = self.target();
        self.coordinator.start(target).await.unwrap();
        self.wait_for_status("Tailing log file").await;
    }

    async fn subscribe(&self) -> tokio::io::Lines<BufReader<TcpStream>> {
        let addr = self.broadcaster.ensure_listening().await.unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        timeout(WAIT, async {
            while self.broadcaster.registry().count() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriber never registered");
        BufReader::new(client).lines()
    }

    fn write_line(&mut self, line: &str) {
        writeln!(self.file, "{line}").unwrap();
        self.file.flush().unwrap();
    }

    async fn wait_for_status(&mut self, needle: &str) {
        timeout(WAIT, async {
            loop {
                match self.events.recv().await {
                    Some(UiEvent::Status(line)) if line.contains(needle) => return,
                    Some(_) => {}
                    None => panic!("event channel closed while waiting for {needle:?}"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for status {needle:?}"));
    }

    async fn wait_for_batch(&mut self) -> ResolvedBatch {
        timeout(WAIT, async {
            loop {
                match self.events.recv().await {
                    Some(UiEvent::Batch(batch)) => return batch,
                    Some(_) => {}
                    None => panic!("event channel closed while waiting for a batch"),
                }
            }
        })
        .await
        .expect("timed out waiting for a batch event")
    }
}

async fn next_message(lines: &mut tokio::io::Lines<BufReader<TcpStream>>) -> String {
    timeout(WAIT, lines.next_line())
        .await
        .expect("timed out waiting for a push message")
        .unwrap()
        .expect("push connection closed unexpectedly")
}

async fn expect_silence(lines: &mut tokio::io::Lines<BufReader<TcpStream>>) {
    let quiet = timeout(Duration::from_millis(300), lines.next_line()).await;
    assert!(quiet.is_err(), "expected no further push messages");
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_resolved_batch_is_broadcast_as_one_json_array() {
    let mut rig = rig(Catalog::from_entries([
        entry("Sword of Testing"),
        entry("Shield"),
    ]));
    rig.start().await;
    let mut client = rig.subscribe().await;

    rig.write_line("Berik tells Bids:1, 'Sword of Testing | Shield | 7'");

    let message: serde_json::Value =
        serde_json::from_str(&next_message(&mut client).await).unwrap();
    assert_eq!(
        message,
        json!([
            {"name": "Sword of Testing", "attributes": {}},
            {"name": "Shield", "attributes": {}}
        ])
    );

    // The UI tap got the same batch, independent of the network path
    let batch = rig.wait_for_batch().await;
    assert_eq!(
        batch.names().collect::<Vec<_>>(),
        vec!["Sword of Testing", "Shield"]
    );
}

#[tokio::test]
async fn test_empty_catalog_passes_raw_tokens_through() {
    let mut rig = rig(Catalog::new());
    rig.start().await;
    let mut client = rig.subscribe().await;

    rig.write_line("Berik tells Bids:1, 'Sword of Testing | Shield | 7'");

    assert_eq!(
        next_message(&mut client).await,
        r#"["Sword of Testing","Shield","7"]"#
    );
}

#[tokio::test]
async fn test_out_of_channel_lines_have_no_effect() {
    let mut rig = rig(Catalog::new());
    rig.start().await;
    let mut client = rig.subscribe().await;

    rig.write_line("Berik tells Raids:1, 'Shield'");
    // Speaker prefix spelling the channel name does not count
    rig.write_line("Bids tells Raids:1, 'Shield'");
    rig.write_line("Berik tells Bids:1, 'Shield'");

    // Only the genuine in-channel line arrives
    assert_eq!(next_message(&mut client).await, r#"["Shield"]"#);
    expect_silence(&mut client).await;
}

#[tokio::test]
async fn test_unmatched_only_batch_is_suppressed() {
    let mut rig = rig(Catalog::from_entries([entry("Shield")]));
    rig.start().await;
    let mut client = rig.subscribe().await;

    rig.write_line("Berik tells Bids:1, 'Berik | 50'");
    rig.write_line("Berik tells Bids:1, 'Shield'");

    assert_eq!(next_message(&mut client).await, r#"[{"name":"Shield","attributes":{}}]"#);
    expect_silence(&mut client).await;
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_fourth_batch_in_a_burst_is_rejected() {
    let mut rig = rig(Catalog::new());
    rig.start().await;
    let mut client = rig.subscribe().await;

    for _ in 0..4 {
        rig.write_line("Berik tells Bids:1, 'Shield'");
    }

    for _ in 0..3 {
        assert_eq!(next_message(&mut client).await, r#"["Shield"]"#);
    }
    expect_silence(&mut client).await;
    rig.wait_for_status("too many requests").await;
}

#[tokio::test]
async fn test_trip_clears_subscribers_and_ends_the_pipeline() {
    let mut rig = rig(Catalog::new());
    rig.start().await;
    let mut client = rig.subscribe().await;

    // 3 admitted, then 11 violations: the 11th trips the limiter
    for _ in 0..14 {
        rig.write_line("Berik tells Bids:1, 'Shield'");
    }

    for _ in 0..3 {
        assert_eq!(next_message(&mut client).await, r#"["Shield"]"#);
    }
    // Trip closes the connection
    let eof = timeout(WAIT, client.next_line())
        .await
        .expect("expected EOF after trip")
        .unwrap();
    assert_eq!(eof, None);

    rig.wait_for_status("hit the rate limit too many times").await;
    assert_eq!(rig.broadcaster.registry().count(), 0);

    // The pipeline task is gone; further lines have no effect
    timeout(WAIT, async {
        while rig.coordinator.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("pipeline task should end after trip");

    // External re-invocation brings monitoring back with a fresh limiter
    // and a fresh listener
    rig.start().await;
    let mut client = rig.subscribe().await;
    rig.write_line("Berik tells Bids:1, 'Shield'");
    assert_eq!(next_message(&mut client).await, r#"["Shield"]"#);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_start_same_target_twice_is_idempotent() {
    let mut rig = rig(Catalog::new());
    rig.start().await;
    let target = rig.target();
    rig.coordinator.start(target).await.unwrap();

    let mut client = rig.subscribe().await;
    rig.write_line("Berik tells Bids:1, 'Shield'");

    // Exactly one tailer: the line is delivered exactly once
    assert_eq!(next_message(&mut client).await, r#"["Shield"]"#);
    expect_silence(&mut client).await;
}

#[tokio::test]
async fn test_new_target_supersedes_the_old_one() {
    let mut rig = rig(Catalog::new());
    rig.start().await;

    let mut other_file = NamedTempFile::new().unwrap();
    let other_target = MonitorTarget::new(other_file.path(), "Auctions");
    rig.coordinator.start(other_target).await.unwrap();
    rig.wait_for_status("Stopped monitoring").await;
    rig.wait_for_status("Tailing log file").await;

    let mut client = rig.subscribe().await;

    // Old target no longer tailed
    rig.write_line("Berik tells Bids:1, 'Shield'");
    // New target is
    writeln!(other_file, "Berik tells Auctions:1, 'Sword of Testing'").unwrap();
    other_file.flush().unwrap();

    assert_eq!(next_message(&mut client).await, r#"["Sword of Testing"]"#);
    expect_silence(&mut client).await;
}

#[tokio::test]
async fn test_stop_releases_the_tailer_but_keeps_the_listener() {
    let mut rig = rig(Catalog::new());
    rig.start().await;
    let mut client = rig.subscribe().await;

    rig.coordinator.stop().await;
    assert!(!rig.coordinator.is_running());

    rig.write_line("Berik tells Bids:1, 'Shield'");
    expect_silence(&mut client).await;

    // Listener survives: new subscribers can still connect
    let addr = rig.broadcaster.ensure_listening().await.unwrap();
    let _late = TcpStream::connect(addr).await.unwrap();
}

#[tokio::test]
async fn test_oversized_batches_are_discarded() {
    let mut rig = rig(Catalog::new());
    rig.start().await;
    let mut client = rig.subscribe().await;

    let noisy = (0..12).map(|i| format!("t{i}")).collect::<Vec<_>>().join(" | ");
    rig.write_line(&format!("Berik tells Bids:1, '{noisy}'"));
    rig.write_line("Berik tells Bids:1, 'Shield'");

    assert_eq!(next_message(&mut client).await, r#"["Shield"]"#);
    expect_silence(&mut client).await;
}

// ============================================================================
// Configuration errors
// ============================================================================

#[tokio::test]
async fn test_empty_channel_does_not_start() {
    let mut rig = rig(Catalog::new());
    let target = MonitorTarget::new(rig.file.path(), "  ");

    let err = rig.coordinator.start(target).await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyChannel));
    assert!(!rig.coordinator.is_running());
    rig.wait_for_status("chat channel must be set").await;
}

#[tokio::test]
async fn test_empty_path_does_not_start() {
    let mut rig = rig(Catalog::new());
    let target = MonitorTarget::new("", "Bids");

    let err = rig.coordinator.start(target).await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyPath));
    assert!(!rig.coordinator.is_running());
}

#[tokio::test]
async fn test_unreadable_path_is_fatal_for_the_target_only() {
    let mut rig = rig(Catalog::new());
    let dir = tempfile::tempdir().unwrap();
    let target = MonitorTarget::new(dir.path().join("missing.log"), "Bids");

    // start succeeds (the listener is up); the tail task reports the
    // failure through the status tap and exits
    rig.coordinator.start(target).await.unwrap();
    rig.wait_for_status("Error trying to tail log file").await;
}
