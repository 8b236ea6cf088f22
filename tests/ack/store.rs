use std::sync::Arc;

use futures_util::future::join_all;

use gatehouse::{
    ack::{InMemoryKvStore, KvStore},
    clock::ManualClock,
};

fn store() -> (Arc<InMemoryKvStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    (Arc::new(InMemoryKvStore::new(clock.clone())), clock)
}

#[tokio::test]
async fn given_live_key_when_set_if_not_exists_then_existing_value_wins() {
    let (store, _clock) = store();

    assert!(store.set_if_not_exists("k", "first".to_string(), Some(10)).await.expect("ok"));
    assert!(!store.set_if_not_exists("k", "second".to_string(), Some(10)).await.expect("ok"));

    assert_eq!(store.get("k").await.expect("ok").as_deref(), Some("first"));
}

#[tokio::test]
async fn given_expired_key_when_set_if_not_exists_then_slot_is_reused() {
    let (store, clock) = store();
    store.set("k", "old".to_string(), Some(1)).await.expect("ok");

    clock.advance_ms(1_000);

    assert!(!store.exists("k").await.expect("ok"));
    assert!(store.set_if_not_exists("k", "new".to_string(), None).await.expect("ok"));
    assert_eq!(store.get("k").await.expect("ok").as_deref(), Some("new"));
}

#[tokio::test]
async fn given_concurrent_takes_when_racing_then_one_caller_gets_the_value() {
    let (store, _clock) = store();
    store.set("k", "v".to_string(), None).await.expect("ok");

    let taken = join_all((0..10).map(|_| store.take("k")))
        .await
        .into_iter()
        .filter(|outcome| matches!(outcome, Ok(Some(_))))
        .count();

    assert_eq!(taken, 1);
    assert_eq!(store.live_entries().await, 0);
}

#[tokio::test]
async fn given_expired_entry_when_deleted_then_reports_nothing_removed() {
    let (store, clock) = store();
    store.set("k", "v".to_string(), Some(2)).await.expect("ok");

    clock.advance_ms(2_500);

    assert!(!store.delete("k").await.expect("ok"));
}
