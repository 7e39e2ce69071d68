//! Per-site style and script boosts.
//!
//! Injection is best-effort: document failures are logged and reported as
//! `false`, never returned as errors. Injected elements are keyed by boost id,
//! so applying twice replaces rather than duplicates.

use std::sync::Arc;
use tokio::sync::Mutex;

use tabkeeper_core::boost::{Boost, BoostPatch, BoostSource};
use tabkeeper_core::clock::Clock;
use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::{ChangeKind, EngineEvent};
use tabkeeper_core::host::{DocumentHandle, InjectionKind};
use tabkeeper_core::new_id;
use tabkeeper_core::pattern::{UrlPattern, parse_url};
use tabkeeper_core::store::{Partition, Store, StoreExt};

use crate::event_bus::EventBus;

pub struct BoostService {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    boosts: Mutex<Vec<(Boost, Option<UrlPattern>)>>,
}

fn compile(boost: Boost) -> (Boost, Option<UrlPattern>) {
    let pattern = match UrlPattern::new(&boost.url_pattern) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            tracing::warn!(target: "boosts", "Boost '{}' has an unusable pattern: {}", boost.name, e);
            None
        }
    };
    (boost, pattern)
}

impl BoostService {
    pub async fn load(store: Arc<dyn Store>, events: EventBus, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut boosts: Vec<Boost> = store.load_all(Partition::Boosts).await?;
        boosts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tracing::debug!(target: "boosts", "Loaded {} boosts", boosts.len());

        Ok(Self {
            store,
            events,
            clock,
            boosts: Mutex::new(boosts.into_iter().map(compile).collect()),
        })
    }

    pub async fn create(
        &self,
        name: &str,
        url_pattern: &str,
        css: Option<String>,
        js: Option<String>,
    ) -> Result<Boost> {
        if name.trim().is_empty() {
            return Err(TabkeeperError::invalid_input("boost name cannot be empty"));
        }
        let pattern = validate_pattern(url_pattern)?;

        let now = self.clock.now();
        let boost = Boost {
            id: new_id(),
            name: name.trim().to_string(),
            url_pattern: url_pattern.to_string(),
            enabled: true,
            css,
            js,
            created_at: now,
            updated_at: now,
            source: BoostSource::User,
            rating: None,
        };

        let mut boosts = self.boosts.lock().await;
        self.store.save(Partition::Boosts, &boost).await?;
        boosts.push((boost.clone(), Some(pattern)));
        drop(boosts);

        self.publish(&boost.id, ChangeKind::Created);
        Ok(boost)
    }

    pub async fn update(&self, boost_id: &str, patch: BoostPatch) -> Result<Boost> {
        if let Some(pattern) = &patch.url_pattern {
            validate_pattern(pattern)?;
        }

        let mut boosts = self.boosts.lock().await;
        let index = boosts
            .iter()
            .position(|(b, _)| b.id == boost_id)
            .ok_or_else(|| TabkeeperError::not_found("boost", boost_id))?;

        let mut updated = boosts[index].0.clone();
        patch.apply_to(&mut updated, self.clock.now());
        self.store.save(Partition::Boosts, &updated).await?;
        boosts[index] = compile(updated.clone());
        drop(boosts);

        self.publish(boost_id, ChangeKind::Updated);
        Ok(updated)
    }

    pub async fn delete(&self, boost_id: &str) -> Result<bool> {
        let mut boosts = self.boosts.lock().await;
        let Some(index) = boosts.iter().position(|(b, _)| b.id == boost_id) else {
            return Ok(false);
        };

        self.store.delete(Partition::Boosts, boost_id).await?;
        boosts.remove(index);
        drop(boosts);

        self.publish(boost_id, ChangeKind::Deleted);
        Ok(true)
    }

    /// Flips `enabled` and returns the new value.
    pub async fn toggle(&self, boost_id: &str) -> Result<bool> {
        let enabled = self
            .get(boost_id)
            .await
            .map(|b| !b.enabled)
            .ok_or_else(|| TabkeeperError::not_found("boost", boost_id))?;
        let updated = self
            .update(
                boost_id,
                BoostPatch {
                    enabled: Some(enabled),
                    ..Default::default()
                },
            )
            .await?;
        Ok(updated.enabled)
    }

    pub async fn get(&self, boost_id: &str) -> Option<Boost> {
        self.boosts
            .lock()
            .await
            .iter()
            .find(|(b, _)| b.id == boost_id)
            .map(|(b, _)| b.clone())
    }

    pub async fn list(&self) -> Vec<Boost> {
        self.boosts.lock().await.iter().map(|(b, _)| b.clone()).collect()
    }

    /// Enabled boosts whose pattern matches the url, in creation order.
    pub async fn boosts_for_url(&self, url: &str) -> Vec<Boost> {
        let Some(parsed) = parse_url(url) else {
            return Vec::new();
        };
        self.boosts
            .lock()
            .await
            .iter()
            .filter(|(b, pattern)| b.enabled && pattern.as_ref().is_some_and(|p| p.matches_url(&parsed)))
            .map(|(b, _)| b.clone())
            .collect()
    }

    /// Injects the boost's style and script blocks. Returns false if any
    /// injection failed.
    pub fn apply(&self, document: &dyn DocumentHandle, boost: &Boost) -> bool {
        let mut ok = true;
        if let Some(css) = &boost.css {
            ok &= inject(document, &boost.style_element_id(), InjectionKind::Style, css);
        }
        if let Some(js) = &boost.js {
            ok &= inject(document, &boost.script_element_id(), InjectionKind::Script, js);
        }
        ok
    }

    /// Removes whatever the boost injected into the document.
    pub fn remove_from(&self, document: &dyn DocumentHandle, boost: &Boost) -> bool {
        let mut ok = true;
        for element_id in [boost.style_element_id(), boost.script_element_id()] {
            if let Err(e) = document.remove_element(&element_id) {
                tracing::warn!(target: "boosts", "Failed to remove {}: {}", element_id, e);
                ok = false;
            }
        }
        ok
    }

    /// Applies every enabled boost matching `url`. Returns how many applied cleanly.
    pub async fn apply_matching(&self, document: &dyn DocumentHandle, url: &str) -> usize {
        self.boosts_for_url(url)
            .await
            .iter()
            .filter(|boost| self.apply(document, boost))
            .count()
    }

    fn publish(&self, boost_id: &str, change: ChangeKind) {
        self.events.publish(EngineEvent::BoostChanged {
            boost_id: boost_id.to_string(),
            change,
        });
    }
}

fn validate_pattern(pattern: &str) -> Result<UrlPattern> {
    if pattern.trim().is_empty() {
        return Err(TabkeeperError::invalid_input("boost url pattern cannot be empty"));
    }
    UrlPattern::new(pattern)
}

fn inject(document: &dyn DocumentHandle, element_id: &str, kind: InjectionKind, content: &str) -> bool {
    match document.upsert_element(element_id, kind, content) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(target: "boosts", "Injection of {} failed: {}", element_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingDocument, RecordingDocument};
    use chrono::Duration;
    use tabkeeper_core::clock::ManualClock;
    use tabkeeper_infrastructure::MemoryStore;

    async fn service() -> (BoostService, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        store.init().await.unwrap();
        let clock = Arc::new(ManualClock::default());
        let service = BoostService::load(store, EventBus::new(32), clock.clone())
            .await
            .unwrap();
        (service, clock)
    }

    #[tokio::test]
    async fn test_boosts_for_url_filters_disabled() {
        let (service, _) = service().await;
        let dark = service
            .create("Dark", "*.example.com", Some("body{}".into()), None)
            .await
            .unwrap();
        let other = service
            .create("Other", "other.org", Some("p{}".into()), None)
            .await
            .unwrap();

        let hits = service.boosts_for_url("https://news.example.com/").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, dark.id);

        assert!(!service.toggle(&dark.id).await.unwrap());
        assert!(service.boosts_for_url("https://news.example.com/").await.is_empty());
        assert_eq!(service.boosts_for_url("https://other.org/").await[0].id, other.id);
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at() {
        let (service, clock) = service().await;
        let boost = service.create("B", "example.com", None, None).await.unwrap();
        clock.advance(Duration::minutes(5));

        let updated = service
            .update(
                &boost.id,
                BoostPatch {
                    css: Some(Some("a{}".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.updated_at, boost.created_at + Duration::minutes(5));
        assert_eq!(updated.css.as_deref(), Some("a{}"));

        assert!(service.update("nope", BoostPatch::default()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_apply_is_idempotent_per_id() {
        let (service, _) = service().await;
        let boost = service
            .create("B", "example.com", Some("a{}".into()), Some("console.log(1)".into()))
            .await
            .unwrap();
        let document = RecordingDocument::default();

        assert!(service.apply(&document, &boost));
        assert!(service.apply(&document, &boost));
        assert_eq!(
            document.element_ids(),
            vec![boost.style_element_id(), boost.script_element_id()]
        );

        assert!(service.remove_from(&document, &boost));
        assert!(document.element_ids().is_empty());
    }

    #[tokio::test]
    async fn test_injection_failure_is_not_fatal() {
        let (service, _) = service().await;
        service
            .create("B", "example.com", Some("a{}".into()), None)
            .await
            .unwrap();

        assert_eq!(service.apply_matching(&FailingDocument, "https://example.com").await, 0);
        assert_eq!(
            service
                .apply_matching(&RecordingDocument::default(), "https://example.com")
                .await,
            1
        );
    }

    #[tokio::test]
    async fn test_invalid_pattern_rejected() {
        let (service, _) = service().await;
        assert!(service.create("B", "", None, None).await.is_err());
        assert!(service.list().await.is_empty());
        assert!(!service.delete("missing").await.unwrap());
    }
}
