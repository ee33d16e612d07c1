//! Fire-and-forget publication of domain events to NATS.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct Notifier {
    nats: Option<async_nats::Client>,
    prefix: String,
}

impl Notifier {
    /// A notifier that only logs.
    pub fn disabled() -> Self { Self { nats: None, prefix: "shop".to_string() } }

    pub fn new(nats: Option<async_nats::Client>, prefix: impl Into<String>) -> Self {
        Self { nats, prefix: prefix.into() }
    }

    /// Connects to `url` if given. A failed connection is logged and
    /// leaves notifications disabled.
    pub async fn connect(url: Option<&str>, prefix: &str) -> Self {
        let Some(url) = url else { return Self::new(None, prefix) };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self::new(Some(client), prefix)
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable; realtime notifications disabled");
                Self::new(None, prefix)
            }
        }
    }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    /// Never waits on the broker; delivery failures are only logged.
    pub fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = format!("{}.{}", self.prefix, event.subject());
            tracing::debug!(%subject, ?event, "domain event");
            let Some(client) = self.nats.clone() else { continue };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(%subject, error = %e, "could not encode event");
                    continue;
                }
            };
            tokio::spawn(async move {
                if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                    tracing::warn!(%subject, error = %e, "event publish failed");
                }
            });
        }
    }
}
