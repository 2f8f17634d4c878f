//! Cross-module scenario tests.
//!
//! These drive full [`SyncClient`] engines against an in-memory relay hub that
//! reproduces the real hub's commit rules: operations commit only in
//! continuous sequence, committed batches broadcast to every client, and a
//! stale claimed index earns an `OP_TOO_OLD` catch-up slice.

use crate::algebra::{OtAlgebra, SpliceAlgebra};
use crate::client::{ChannelTransport, ClientConfig, Subscription, SyncClient, TransportEvent};
use crate::diff;
use crate::protocol::{constants, FileUpdate};
use crate::types::Notebook;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// In-memory relay with the hub's `FILE_UPDATE` commit semantics.
struct RelayHub {
    log: HashMap<String, Vec<String>>,
}

impl RelayHub {
    fn new() -> Self {
        RelayHub {
            log: HashMap::new(),
        }
    }

    /// Process one client frame. Returns the reply and whether it broadcasts
    /// to every client (commits) or returns to the origin only.
    fn handle(&mut self, frame: &FileUpdate) -> (FileUpdate, bool) {
        let log = self.log.entry(frame.file.clone()).or_default();
        let mut reply = FileUpdate {
            uid: frame.uid.clone(),
            endpoint: constants::ENDPOINT_FILE_UPDATE.to_string(),
            file: frame.file.clone(),
            index: frame.index,
            operations: Vec::new(),
            status: None,
        };

        if frame.index < 0 {
            // Fresh client: everything we have, from index 0.
            reply.index = 0;
            reply.operations = log.clone();
            reply.status = Some(constants::STATUS_OP_TOO_OLD.to_string());
            (reply, false)
        } else if frame.index as usize == log.len() {
            // Continuous: commit and broadcast.
            log.extend(frame.operations.iter().cloned());
            reply.operations = frame.operations.clone();
            reply.status = Some(constants::STATUS_OP_COMMITTED.to_string());
            (reply, true)
        } else if frame.index as usize > log.len() {
            reply.status = Some(constants::STATUS_OP_TOO_NEW.to_string());
            (reply, false)
        } else {
            // Stale: hand back the slice the client is missing.
            reply.operations = log[frame.index as usize..].to_vec();
            reply.status = Some(constants::STATUS_OP_TOO_OLD.to_string());
            (reply, false)
        }
    }
}

/// Pump frames between clients and the relay until every client hangs up.
/// Frames take a JSON round trip, exercising the wire codec.
async fn run_relay(
    wires: Vec<mpsc::UnboundedReceiver<FileUpdate>>,
    events: Vec<mpsc::UnboundedSender<TransportEvent>>,
) {
    let mut hub = RelayHub::new();
    let streams = wires.into_iter().enumerate().map(|(origin, rx)| {
        UnboundedReceiverStream::new(rx).map(move |frame| (origin, frame))
    });
    let mut inbound = futures::stream::select_all(streams);

    while let Some((origin, frame)) = inbound.next().await {
        let frame = FileUpdate::from_json(&frame.to_json().unwrap()).unwrap();
        let (reply, broadcast) = hub.handle(&frame);
        if broadcast {
            for tx in &events {
                let _ = tx.send(TransportEvent::Message(reply.clone()));
            }
        } else {
            let _ = events[origin].send(TransportEvent::Message(reply));
        }
    }
}

/// Capture engine logs in test output; `RUST_LOG` controls the filter.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Spin up `count` clients sharing one relay, ticking every 10ms.
fn connect_clients(count: usize) -> Vec<SyncClient<SpliceAlgebra>> {
    init_tracing();
    let mut wires = Vec::new();
    let mut event_txs = Vec::new();
    let mut clients = Vec::new();
    for _ in 0..count {
        let (transport, wire) = ChannelTransport::pair();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let client = SyncClient::connect(
            ClientConfig::new("test-hub").tick_interval(Duration::from_millis(10)),
            Arc::new(SpliceAlgebra),
            transport,
            event_rx,
        )
        .unwrap();
        wires.push(wire);
        event_txs.push(event_tx);
        clients.push(client);
    }
    tokio::spawn(run_relay(wires, event_txs));
    clients
}

/// Read snapshots until one satisfies `pred`, panicking after 5 seconds.
async fn wait_for(
    snapshots: &mut Subscription<Notebook>,
    pred: impl Fn(&Notebook) -> bool,
) -> Notebook {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .expect("timed out waiting for matching snapshot");
        let doc = timeout(remaining, snapshots.next())
            .await
            .expect("timed out waiting for snapshot")
            .expect("snapshot stream ended");
        if pred(&doc) {
            return doc;
        }
    }
}

#[tokio::test]
async fn test_edit_propagates_to_other_client() {
    let clients = connect_clients(2);
    let (handle_a, mut snaps_a) = clients[0]
        .subscribe("shared.ipynb", Notebook::with_cells(1))
        .await
        .unwrap();
    let (handle_b, mut snaps_b) = clients[1]
        .subscribe("shared.ipynb", Notebook::with_cells(1))
        .await
        .unwrap();

    handle_a
        .submit_edit(diff::cell_edit(&SpliceAlgebra, 0, "", "hello", 5, 5))
        .unwrap();

    wait_for(&mut snaps_a, |d| d.cell_source(0) == Some("hello")).await;
    wait_for(&mut snaps_b, |d| d.cell_source(0) == Some("hello")).await;

    // A second edit on top of the first, from the other side.
    handle_b
        .submit_edit(diff::cell_edit(&SpliceAlgebra, 0, "hello", "hello world", 11, 11))
        .unwrap();

    wait_for(&mut snaps_a, |d| d.cell_source(0) == Some("hello world")).await;
    wait_for(&mut snaps_b, |d| d.cell_source(0) == Some("hello world")).await;
}

#[tokio::test]
async fn test_concurrent_edits_converge() {
    let clients = connect_clients(2);
    let (handle_a, mut snaps_a) = clients[0]
        .subscribe("shared.ipynb", Notebook::with_cells(1))
        .await
        .unwrap();
    let (handle_b, mut snaps_b) = clients[1]
        .subscribe("shared.ipynb", Notebook::with_cells(1))
        .await
        .unwrap();

    // Both type into the same empty cell before either syncs. The hub decides
    // the order; both clients must converge to the same two-char source.
    handle_a
        .submit_edit(Some(SpliceAlgebra.splice(0, 0, 0, "a")))
        .unwrap();
    handle_b
        .submit_edit(Some(SpliceAlgebra.splice(0, 0, 0, "b")))
        .unwrap();

    let both = |d: &Notebook| {
        let s = d.cell_source(0).unwrap_or("");
        s.len() == 2 && s.contains('a') && s.contains('b')
    };
    let final_a = wait_for(&mut snaps_a, both).await;
    let final_b = wait_for(&mut snaps_b, both).await;
    assert_eq!(final_a, final_b);
}

#[tokio::test]
async fn test_late_joiner_catches_up() {
    let clients = connect_clients(2);
    let (handle_a, mut snaps_a) = clients[0]
        .subscribe("shared.ipynb", Notebook::with_cells(2))
        .await
        .unwrap();

    handle_a
        .submit_edit(Some(SpliceAlgebra.splice(0, 0, 0, "first")))
        .unwrap();
    wait_for(&mut snaps_a, |d| d.cell_source(0) == Some("first")).await;
    handle_a
        .submit_edit(Some(SpliceAlgebra.splice(1, 0, 0, "second")))
        .unwrap();
    wait_for(&mut snaps_a, |d| d.cell_source(1) == Some("second")).await;

    // B joins after two commits; its catch-up fetch replays the whole log.
    let (_handle_b, mut snaps_b) = clients[1]
        .subscribe("shared.ipynb", Notebook::with_cells(2))
        .await
        .unwrap();
    let doc = wait_for(&mut snaps_b, |d| {
        d.cell_source(0) == Some("first") && d.cell_source(1) == Some("second")
    })
    .await;
    assert_eq!(doc.cells.len(), 2);
}

#[tokio::test]
async fn test_edits_survive_disconnect() {
    // One client, transport down: edits stay buffered locally and land once
    // the connection returns.
    init_tracing();
    let (transport, wire) = ChannelTransport::pair();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let client = SyncClient::connect(
        ClientConfig::new("test-hub").tick_interval(Duration::from_millis(10)),
        Arc::new(SpliceAlgebra),
        transport.clone(),
        event_rx,
    )
    .unwrap();
    tokio::spawn(run_relay(vec![wire], vec![event_tx.clone()]));

    let (handle, mut snaps) = client
        .subscribe("shared.ipynb", Notebook::with_cells(1))
        .await
        .unwrap();

    transport.set_open(false);
    event_tx.send(TransportEvent::Closed).unwrap();
    handle
        .submit_edit(Some(SpliceAlgebra.splice(0, 0, 0, "offline")))
        .unwrap();

    // Local echo still works while disconnected.
    wait_for(&mut snaps, |d| d.cell_source(0) == Some("offline")).await;

    transport.set_open(true);
    event_tx.send(TransportEvent::Opened).unwrap();

    // After reconnect the edit commits; the committed snapshot carries it.
    let doc = wait_for(&mut snaps, |d| d.cell_source(0) == Some("offline")).await;
    assert_eq!(doc.cell_source(0), Some("offline"));
}

#[test]
fn test_diff_reproduces_random_edits() {
    // Deterministic pseudo-random single edits; the diff applied to the old
    // text must always reproduce the new text.
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move |bound: usize| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state as usize) % bound.max(1)
    };

    let alphabet: Vec<char> = "abcdefg ".chars().collect();
    for _ in 0..200 {
        let len = next(80);
        let old: String = (0..len).map(|_| alphabet[next(alphabet.len())]).collect();
        let old_len = old.chars().count();

        let pos = next(old_len + 1);
        let (new, caret) = if next(2) == 0 {
            // insert 1-3 chars at pos
            let ins: String = (0..1 + next(3)).map(|_| alphabet[next(alphabet.len())]).collect();
            let mut chars: Vec<char> = old.chars().collect();
            let ins_chars: Vec<char> = ins.chars().collect();
            let ins_len = ins_chars.len();
            chars.splice(pos..pos, ins_chars);
            (chars.into_iter().collect::<String>(), pos + ins_len)
        } else {
            // delete up to 3 chars at pos
            let del = next(4).min(old_len - pos);
            let mut chars: Vec<char> = old.chars().collect();
            chars.splice(pos..pos + del, std::iter::empty());
            (chars.into_iter().collect::<String>(), pos)
        };

        let Some(op) = diff::cell_edit(&SpliceAlgebra, 0, &old, &new, caret, caret) else {
            assert_eq!(old, new, "diff returned no-op for differing texts");
            continue;
        };
        let doc = Notebook {
            cells: vec![crate::types::Cell::new(old.clone())],
        };
        let applied = SpliceAlgebra.apply(&op, &doc);
        assert_eq!(
            applied.cell_source(0),
            Some(new.as_str()),
            "old={old:?} new={new:?} caret={caret}"
        );
    }
}
