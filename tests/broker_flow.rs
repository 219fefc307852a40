//! End-to-end broker scenarios driven through the public API, with
//! in-memory channels standing in for transport connections.

#![allow(clippy::panic)]

use std::sync::Arc;

use stomp_relay::broker::Broker;
use stomp_relay::domain::SessionId;
use stomp_relay::stomp::{Command, Frame};
use tokio::sync::mpsc;

struct Client {
    id: SessionId,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Client {
    async fn open(broker: &Broker) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = broker.open_session(tx).await;
        Self { id, rx }
    }

    async fn send(&self, broker: &Broker, raw: &str) {
        if let Err(err) = broker.handle_text(self.id, raw).await {
            panic!("frame {raw:?} rejected: {err}");
        }
    }

    fn next(&mut self) -> Frame {
        let Ok(raw) = self.rx.try_recv() else {
            panic!("expected a frame for session {}", self.id);
        };
        let Ok(frame) = Frame::decode(&raw) else {
            panic!("undecodable frame {raw:?}");
        };
        frame
    }

    fn assert_idle(&mut self) {
        assert!(self.rx.try_recv().is_err(), "unexpected frame queued");
    }
}

#[tokio::test]
async fn chat_scenario() {
    let broker = Broker::new();
    let mut a = Client::open(&broker).await;
    let mut b = Client::open(&broker).await;

    a.send(&broker, "CONNECT\naccept-version:1.2\nhost:localhost\n\n\0")
        .await;
    assert_eq!(a.next().command(), &Command::Connected);

    a.send(&broker, "SUBSCRIBE\nid:sub-0\ndestination:/topic/chat\n\n\0")
        .await;
    let welcome = a.next();
    assert_eq!(welcome.header("subscription"), Some("sub-0"));

    b.send(&broker, "SEND\ndestination:/topic/chat\n\nhello\0")
        .await;

    let msg = a.next();
    assert_eq!(msg.command(), &Command::Message);
    assert_eq!(msg.header("subscription"), Some("sub-0"));
    assert_eq!(msg.header("destination"), Some("/topic/chat"));
    assert_eq!(msg.header("content-type"), Some("application/json"));
    assert_eq!(msg.body(), "hello");
    a.assert_idle();
    b.assert_idle();
}

#[tokio::test]
async fn two_subscribers_get_their_own_subscription_ids() {
    let broker = Broker::new();
    let mut a = Client::open(&broker).await;
    let mut b = Client::open(&broker).await;
    let publisher = Client::open(&broker).await;

    a.send(&broker, "SUBSCRIBE\nid:alpha\ndestination:/topic/x\n\n\0")
        .await;
    b.send(&broker, "SUBSCRIBE\nid:beta\ndestination:/topic/x\n\n\0")
        .await;
    let _ = a.next();
    let _ = b.next();

    publisher
        .send(&broker, "SEND\ndestination:/topic/x\n\n{\"n\":1}\0")
        .await;

    let from_a = a.next();
    let from_b = b.next();
    assert_eq!(from_a.header("subscription"), Some("alpha"));
    assert_eq!(from_b.header("subscription"), Some("beta"));
    assert_eq!(from_a.body(), "{\"n\":1}");
    assert_eq!(from_b.body(), "{\"n\":1}");
}

#[tokio::test]
async fn send_to_unsubscribed_destination_is_silent() {
    let broker = Broker::new();
    let mut a = Client::open(&broker).await;
    a.send(&broker, "SUBSCRIBE\nid:s\ndestination:/topic/a\n\n\0")
        .await;
    let _ = a.next();

    a.send(&broker, "SEND\ndestination:/topic/b\n\nnobody\0")
        .await;
    a.assert_idle();
}

#[tokio::test]
async fn closed_session_no_longer_receives() {
    let broker = Broker::new();
    let mut a = Client::open(&broker).await;
    let b = Client::open(&broker).await;
    a.send(&broker, "SUBSCRIBE\nid:s\ndestination:/topic/a\n\n\0")
        .await;
    let _ = a.next();

    broker.close_session(a.id).await;
    assert_eq!(broker.subscription_count().await, 0);
    assert_eq!(broker.session_count().await, 1);

    b.send(&broker, "SEND\ndestination:/topic/a\n\nlate\0").await;
    a.assert_idle();
}

#[tokio::test]
async fn disconnect_frame_stops_delivery_but_keeps_session() {
    let broker = Broker::new();
    let mut a = Client::open(&broker).await;
    a.send(&broker, "SUBSCRIBE\nid:s\ndestination:/topic/a\n\n\0")
        .await;
    let _ = a.next();

    a.send(&broker, "DISCONNECT\nreceipt:bye\n\n\0").await;
    assert_eq!(a.next().header("receipt-id"), Some("bye"));

    assert_eq!(broker.broadcast("/topic/a", "x").await, 0);
    assert_eq!(broker.session_count().await, 1);
    a.assert_idle();
}

#[tokio::test]
async fn concurrent_publishers_and_closing_subscribers_do_not_fail() {
    let broker = Arc::new(Broker::new());
    let mut subscribers = Vec::new();
    for i in 0..16 {
        let mut client = Client::open(&broker).await;
        client
            .send(
                &broker,
                &format!("SUBSCRIBE\nid:sub-{i}\ndestination:/topic/load\n\n\0"),
            )
            .await;
        let _ = client.next();
        subscribers.push(client);
    }

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let broker = Arc::clone(&broker);
        tasks.push(tokio::spawn(async move {
            let mut delivered = 0;
            for _ in 0..25 {
                delivered += broker.broadcast("/topic/load", "tick").await;
            }
            delivered
        }));
    }
    for client in subscribers.iter().take(8) {
        broker.close_session(client.id).await;
    }

    for task in tasks {
        let Ok(delivered) = task.await else {
            panic!("publisher task failed");
        };
        assert!(delivered <= 16 * 25);
    }
    assert_eq!(broker.session_count().await, 8);
    assert_eq!(broker.subscription_count().await, 8);
}
