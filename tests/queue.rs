//! Turn queue tests: FIFO draining, single-flight, and error isolation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use murmur_gateway::providers::Role;
use murmur_gateway::turn::{TurnInput, TurnOptions, TurnOutcome, TurnQueue, TurnRequest};
use murmur_gateway::Error;

mod common;
use common::{MockLlm, MockStt, MockTts, build_orchestrator};

fn text_request(message: &str) -> TurnRequest {
    TurnRequest {
        input: TurnInput::Text(message.to_string()),
        options: TurnOptions::default(),
    }
}

#[tokio::test]
async fn drains_in_fifo_order_without_reentrancy() {
    let llm = MockLlm::returning_slow("ack", Duration::from_millis(5));
    let (orchestrator, ledger) = build_orchestrator(
        MockStt::returning(""),
        llm.clone(),
        MockTts::returning(b"mp3"),
    );
    let queue = Arc::new(TurnQueue::new(orchestrator));

    // Enqueue three turns before the drain task gets a chance to run;
    // the returned depths are the backpressure signal.
    let mut receivers = Vec::new();
    for (i, message) in ["first", "second", "third"].iter().enumerate() {
        let (tx, rx) = oneshot::channel();
        let depth = queue.enqueue(text_request(message), tx);
        assert_eq!(depth, i + 1);
        receivers.push(rx);
    }

    for rx in receivers {
        let outcome = rx.await.unwrap().unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply(_)));
    }

    assert!(!llm.was_reentered());
    assert_eq!(llm.call_count(), 3);

    // Ledger pairs land in submission order
    let entries = ledger.recent(100);
    let user_messages: Vec<&str> = entries
        .iter()
        .filter(|e| e.role == Role::User)
        .map(|e| e.content.as_str())
        .collect();
    assert_eq!(user_messages, ["first", "second", "third"]);
}

#[tokio::test]
async fn failing_item_does_not_halt_drain() {
    // An empty message fails with InvalidInput inside the orchestrator;
    // the queue must swallow it and keep going.
    let (orchestrator, ledger) = build_orchestrator(
        MockStt::returning(""),
        MockLlm::returning("ack"),
        MockTts::returning(b"mp3"),
    );
    let queue = Arc::new(TurnQueue::new(orchestrator));

    let (tx1, rx1) = oneshot::channel();
    let (tx2, rx2) = oneshot::channel();
    let (tx3, rx3) = oneshot::channel();
    queue.enqueue(text_request("good one"), tx1);
    queue.enqueue(text_request(""), tx2);
    queue.enqueue(text_request("another good one"), tx3);

    assert!(rx1.await.unwrap().is_ok());
    assert!(matches!(
        rx2.await.unwrap(),
        Err(Error::InvalidInput(_))
    ));
    assert!(rx3.await.unwrap().is_ok());

    // Two successful turns, two pairs
    assert_eq!(ledger.len(), 4);
}

#[tokio::test]
async fn drain_stops_when_empty_and_restarts_on_enqueue() {
    let (orchestrator, _) = build_orchestrator(
        MockStt::returning(""),
        MockLlm::returning("ack"),
        MockTts::returning(b"mp3"),
    );
    let queue = Arc::new(TurnQueue::new(orchestrator));

    let (tx, rx) = oneshot::channel();
    queue.enqueue(text_request("one"), tx);
    rx.await.unwrap().unwrap();

    // Give the drain task a moment to observe the empty queue and stop
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!queue.is_draining());
    assert_eq!(queue.depth(), 0);

    // A new enqueue restarts the drain
    let (tx, rx) = oneshot::channel();
    queue.enqueue(text_request("two"), tx);
    let outcome = rx.await.unwrap().unwrap();
    assert!(matches!(outcome, TurnOutcome::Reply(_)));
}

#[tokio::test]
async fn dropped_receiver_does_not_stall_the_queue() {
    let (orchestrator, _) = build_orchestrator(
        MockStt::returning(""),
        MockLlm::returning("ack"),
        MockTts::returning(b"mp3"),
    );
    let queue = Arc::new(TurnQueue::new(orchestrator));

    let (tx1, rx1) = oneshot::channel();
    queue.enqueue(text_request("abandoned"), tx1);
    drop(rx1);

    let (tx2, rx2) = oneshot::channel();
    queue.enqueue(text_request("still served"), tx2);

    let outcome = rx2.await.unwrap().unwrap();
    assert!(matches!(outcome, TurnOutcome::Reply(_)));
}
