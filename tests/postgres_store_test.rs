//! PostgreSQL store tests. They need a disposable database:
//!
//! ```text
//! DATABASE_URL=postgresql://localhost/webhooks_test cargo test -- --ignored
//! ```
//!
//! Every test clears the `webhook_events` table, so they run serially
//! behind a shared lock.

use serde_json::{json, Map};
use tokio::sync::Mutex;
use webhook_dashboard::{
    types::{EventFilter, GroupField, Headers},
    EventStore, NewWebhookEvent, PgEventStore,
};

static DB_LOCK: Mutex<()> = Mutex::const_new(());

async fn store() -> PgEventStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgEventStore::connect(&url, 2).await.expect("connect");
    store.migrate().await.expect("migrate");
    store.delete_all().await.expect("reset table");
    store
}

fn new_event(source: &str, event_type: &str) -> NewWebhookEvent {
    let mut payload = Map::new();
    payload.insert("nested".into(), json!({ "list": [1, 2, 3], "flag": true }));
    let mut headers = Headers::new();
    headers.insert("x-test".into(), source.into());
    NewWebhookEvent {
        source: source.into(),
        event_type: event_type.into(),
        payload,
        headers: Some(headers),
        ip: Some("127.0.0.1".into()),
        user_agent: None,
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn create_and_find_preserves_documents() {
    let _guard = DB_LOCK.lock().await;
    let store = store().await;

    let input = new_event("github", "push");
    let created = store.create(input.clone()).await.unwrap();
    let found = store.find_by_id(created.id).await.unwrap().unwrap();

    assert_eq!(found, created);
    assert_eq!(found.payload, input.payload);
    assert_eq!(found.headers, input.headers);
    assert_eq!(found.user_agent, None);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn filtering_paging_and_grouping() {
    let _guard = DB_LOCK.lock().await;
    let store = store().await;

    for (source, event_type) in [("github", "push"), ("github", "issues"), ("stripe", "push")] {
        store.create(new_event(source, event_type)).await.unwrap();
    }

    let github = EventFilter::from_query(Some("github".into()), None);
    assert_eq!(store.count(&github).await.unwrap(), 2);
    assert_eq!(store.count(&EventFilter::default()).await.unwrap(), 3);

    let page = store.find_many(&EventFilter::default(), 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);

    let all = store.find_many(&EventFilter::default(), 0, 10).await.unwrap();
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let sources = store.count_by(GroupField::Source).await.unwrap();
    assert_eq!(sources.iter().map(|g| g.count).sum::<u64>(), 3);
    let types = store.count_by(GroupField::EventType).await.unwrap();
    assert_eq!(types.len(), 2);

    let recent = store.recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, all[0].id);
}
