//! End-to-end flows over HTTP against a served host

use std::sync::Arc;

use tokio::net::TcpListener;
use url::Url;

use common::auth::{Authority, Difficulties};
use common::client::{Remote, Session};
use common::error::ProtocolError;
use common::host::Host;
use common::identity::Identity;
use common::post::{Post, Visibility};
use common::storage::{Layout, ObjectFileStore};
use veil_daemon::http_server;
use veil_daemon::{HttpRemote, ServiceState};

const EASY: Difficulties = Difficulties {
    user: 6,
    message: 6,
};

/// Serve a fresh in-memory host on an ephemeral port
async fn serve() -> HttpRemote {
    let host = Host::new(
        Authority::generate(EASY),
        Arc::new(ObjectFileStore::memory()),
    );
    let app = http_server::router(ServiceState::new(host));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    HttpRemote::new(&Url::parse(&format!("http://{}", addr)).unwrap()).unwrap()
}

async fn session(remote: &HttpRemote, name: &str) -> Session<HttpRemote> {
    let mut session = Session::new(remote.clone(), Identity::generate()).with_name(name);
    session.publish_profile().await.unwrap();
    session
}

#[tokio::test]
async fn test_publish_and_feed_over_http() {
    let remote = serve().await;
    let mut alice = session(&remote, "alice").await;
    let bob = session(&remote, "bob").await;

    let id = alice
        .publish(&Post::text("hello over http"), Visibility::World)
        .await
        .unwrap();

    let feed = bob.feed(&alice.public()).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, id);
    assert_eq!(
        feed[0].post.content,
        Post::text("hello over http").content
    );
}

#[tokio::test]
async fn test_status_codes_fold_back() {
    let remote = serve().await;
    let alice = session(&remote, "alice").await;

    let err = remote
        .get(&Layout::new(&alice.public()).index())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    assert!(matches!(
        remote.requests(&alice.public(), "not-a-token").await,
        Err(ProtocolError::AuthenticationFailure(_))
    ));

    assert!(matches!(
        remote.list(&Layout::new(&alice.public()).inbox()).await,
        Err(ProtocolError::AuthenticationFailure(_))
    ));
}

#[tokio::test]
async fn test_subscription_and_inbox_over_http() {
    let remote = serve().await;
    let alice = session(&remote, "alice").await;
    let mut bob = session(&remote, "bob").await;

    alice
        .subscribe_to(&bob.public(), Some("let me in".into()))
        .await
        .unwrap();
    let pending = bob.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    let request = pending[0].content.as_ref().unwrap();
    assert_eq!(request.requester, alice.public());
    assert!(bob.accept(request.requester));
    bob.dismiss_request(&pending[0].name).await.unwrap();

    let id = bob
        .publish(&Post::text("for subscribers"), Visibility::Subscribers)
        .await
        .unwrap();
    let post = alice.read_post(&bob.public(), &id).await.unwrap();
    assert_eq!(post.content, Post::text("for subscribers").content);

    let message_id = alice.send_message(&bob.public(), "thanks").await.unwrap();
    let inbox = bob.read_inbox().await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].name, message_id.to_hex());
    assert_eq!(inbox[0].content.as_ref().unwrap().text, "thanks");
}
