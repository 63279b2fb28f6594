//! Insert a few sample webhook events for local dashboard work.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{error, info};
use webhook_dashboard::{types::Headers, Config, EventStore, NewWebhookEvent, PgEventStore};

fn sample(
    source: &str,
    event_type: &str,
    payload: Value,
    headers: &[(&str, &str)],
    ip: &str,
    user_agent: &str,
) -> Result<NewWebhookEvent> {
    let Value::Object(payload) = payload else {
        anyhow::bail!("sample payload for {source} must be an object");
    };
    let headers: Headers = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Ok(NewWebhookEvent {
        source: source.to_string(),
        event_type: event_type.to_string(),
        payload,
        headers: Some(headers),
        ip: Some(ip.to_string()),
        user_agent: Some(user_agent.to_string()),
    })
}

fn samples() -> Result<Vec<NewWebhookEvent>> {
    Ok(vec![
        sample(
            "github",
            "push",
            json!({
                "ref": "refs/heads/main",
                "commits": [{
                    "id": "abc123",
                    "message": "Add new feature",
                    "author": { "name": "John Doe", "email": "john@example.com" }
                }]
            }),
            &[
                ("x-github-event", "push"),
                ("x-github-delivery", "12345678-1234-1234-1234-123456789012"),
            ],
            "192.168.1.1",
            "GitHub-Hookshot/abc123",
        )?,
        sample(
            "stripe",
            "payment.succeeded",
            json!({
                "id": "evt_1234567890",
                "type": "payment_intent.succeeded",
                "data": {
                    "object": { "id": "pi_1234567890", "amount": 2000, "currency": "usd" }
                }
            }),
            &[("stripe-signature", "t=1234567890,v1=abc123")],
            "54.187.174.169",
            "Stripe/1.0",
        )?,
        sample(
            "slack",
            "message",
            json!({
                "type": "message",
                "text": "Hello from Slack!",
                "user": "U1234567890",
                "channel": "C1234567890"
            }),
            &[
                ("x-slack-signature", "v0=abc123"),
                ("x-slack-request-timestamp", "1234567890"),
            ],
            "54.230.156.1",
            "Slackbot 1.0",
        )?,
    ])
}

async fn seed(store: &dyn EventStore) -> Result<()> {
    for event in samples()? {
        let stored = store.create(event).await.context("Failed to insert sample")?;
        info!(id = %stored.id, source = %stored.source, "Seeded event");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = Config::from_env()?;
    let store = PgEventStore::connect(&config.database_url, 1)
        .await
        .context("Failed to connect to database")?;
    store.migrate().await.context("Failed to prepare database schema")?;

    let result = seed(&store).await;
    store.close().await;

    match result {
        Ok(()) => {
            println!("Seed data created successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Error seeding database");
            Err(e)
        }
    }
}
