//! Integration tests for the subscription handshake and inboxes

mod common;

use ::common::auth::Capability;
use ::common::client::Session;
use ::common::error::ProtocolError;
use ::common::host::Host;
use ::common::post::{Post, Visibility};
use ::common::pow::{self, SOLUTION_SIZE};
use ::common::storage::Layout;
use ::common::subscription::{InboxMessage, SubscriptionRequest};

#[tokio::test]
async fn test_request_reveals_requester_only_to_target() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let mut bob = common::session(&host, "bob").await;
    let eve = common::session(&host, "eve").await;

    let ephemeral = alice
        .subscribe_to(&bob.public(), Some("hello bob".into()))
        .await
        .unwrap();

    let pending = bob.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, ephemeral.to_hex());
    let request = pending[0].content.as_ref().unwrap();
    assert_eq!(request.requester, alice.public());
    assert_eq!(request.message.as_deref(), Some("hello bob"));

    // what the host holds says nothing about alice
    let stored = host
        .get(&Layout::new(&bob.public()).request(&ephemeral))
        .await
        .unwrap();
    let alice_hex = alice.public().to_hex();
    assert!(!String::from_utf8_lossy(&stored).contains(&alice_hex));
    assert!(!ephemeral.to_hex().contains(&alice_hex));
    assert!(SubscriptionRequest::open(eve.identity(), &ephemeral.to_hex(), &stored).is_err());
}

#[tokio::test]
async fn test_only_owner_lists_requests() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let bob = common::session(&host, "bob").await;
    alice.subscribe_to(&bob.public(), None).await.unwrap();

    let alice_token = alice.token().unwrap();
    assert!(matches!(
        host.requests(&bob.public(), alice_token).await,
        Err(ProtocolError::AuthenticationFailure(_))
    ));
    assert!(host
        .list(&Layout::new(&bob.public()).requests())
        .await
        .is_err());
}

#[tokio::test]
async fn test_accept_then_read_private_posts() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let mut bob = common::session(&host, "bob").await;

    alice.subscribe_to(&bob.public(), None).await.unwrap();
    for delivery in bob.pending_requests().await.unwrap() {
        let request = delivery.content.unwrap();
        assert!(bob.accept(request.requester));
        bob.dismiss_request(&delivery.name).await.unwrap();
    }
    assert!(bob.pending_requests().await.unwrap().is_empty());
    assert!(bob.subscribers().contains(&alice.public()));

    let id = bob
        .publish(&Post::text("subscribers only"), Visibility::Subscribers)
        .await
        .unwrap();
    let feed = alice.feed(&bob.public()).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, id);
}

#[tokio::test]
async fn test_junk_request_reported_not_fatal() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let mut bob = common::session(&host, "bob").await;

    alice.subscribe_to(&bob.public(), None).await.unwrap();
    let junk = ::common::crypto::AgreementSecretKey::generate().public();
    host.subscribe(&bob.public(), &junk, bytes::Bytes::from_static(&[7u8; 48]))
        .await
        .unwrap();

    let pending = bob.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending.iter().filter(|d| d.content.is_ok()).count(), 1);
    let bad = pending.iter().find(|d| d.name == junk.to_hex()).unwrap();
    assert!(bad.content.is_err());
}

#[tokio::test]
async fn test_inbox_message_flow() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let mut bob = common::session(&host, "bob").await;

    let id = alice
        .send_message(&bob.public(), "are you there?")
        .await
        .unwrap();

    let inbox = bob.read_inbox().await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].name, id.to_hex());
    let message = inbox[0].content.as_ref().unwrap();
    assert_eq!(message.from, alice.public());
    assert_eq!(message.text, "are you there?");
}

#[tokio::test]
async fn test_inbox_rejects_unpaid_delivery() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let bob = common::session(&host, "bob").await;

    let envelope = InboxMessage::seal(alice.identity(), &bob.public(), "spam").unwrap();
    let challenge = host
        .authority()
        .challenge_for(&Capability::message(&envelope));

    // right size, wrong work
    let mut unsolved = [0xffu8; SOLUTION_SIZE];
    while challenge.is_solved_by(&unsolved) {
        pow::increment(&mut unsolved);
    }

    let result = host
        .send_message(&bob.public(), bytes::Bytes::from(envelope), &unsolved)
        .await;
    assert!(matches!(result, Err(ProtocolError::AuthenticationFailure(_))));
    assert!(host
        .inbox(&bob.public(), bob.token().unwrap())
        .await
        .unwrap()
        .is_empty());
}

/// Store `payload` at `location` as `writer`, which the host allows for any path
async fn put_as(host: &Host, writer: &Session<Host>, location: &str, payload: &[u8]) {
    let signature = writer.identity().signing_key().sign(payload);
    host.put(
        location,
        bytes::Bytes::copy_from_slice(payload),
        &signature,
        &writer.public(),
        writer.token().unwrap(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_foreign_inbox_entry_does_not_hide_messages() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let mut bob = common::session(&host, "bob").await;
    let mallory = common::session(&host, "mallory").await;

    let id = alice.send_message(&bob.public(), "real mail").await.unwrap();
    let junk = format!("{}/not-a-hash", Layout::new(&bob.public()).inbox());
    put_as(&host, &mallory, &junk, b"junk").await;

    let inbox = bob.read_inbox().await.unwrap();
    assert_eq!(inbox.len(), 2);
    let real = inbox.iter().find(|d| d.name == id.to_hex()).unwrap();
    assert_eq!(real.content.as_ref().unwrap().text, "real mail");
    let bad = inbox.iter().find(|d| d.name == "not-a-hash").unwrap();
    assert!(matches!(bad.content, Err(ProtocolError::MalformedInput(_))));
}

#[tokio::test]
async fn test_nested_request_entry_does_not_hide_requests() {
    let host = common::memory_host();
    let alice = common::session(&host, "alice").await;
    let mut bob = common::session(&host, "bob").await;
    let mallory = common::session(&host, "mallory").await;

    let ephemeral = alice.subscribe_to(&bob.public(), None).await.unwrap();
    let nested = format!("{}/dir/leaf", Layout::new(&bob.public()).requests());
    put_as(&host, &mallory, &nested, b"junk").await;

    let pending = bob.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 2);
    let real = pending.iter().find(|d| d.name == ephemeral.to_hex()).unwrap();
    assert_eq!(real.content.as_ref().unwrap().requester, alice.public());
    let bad = pending.iter().find(|d| d.name == "dir").unwrap();
    assert!(bad.content.is_err());
}
