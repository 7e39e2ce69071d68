//! Named session snapshots and the auto-save request timer.
//!
//! The engine stores sessions but cannot capture topology itself. Auto-save
//! therefore publishes `should-save-session` each tick and the host answers with
//! [`SessionService::update`]. At most one auto-save timer exists per service.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;

use tabkeeper_core::clock::Clock;
use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::new_id;
use tabkeeper_core::session::{Session, SessionWindow};
use tabkeeper_core::store::{Partition, Store, StoreExt};

use crate::event_bus::EventBus;
use crate::scheduler::ScheduledTask;

struct AutoSave {
    session_id: String,
    task: ScheduledTask,
}

pub struct SessionService {
    store: Arc<dyn Store>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    sessions: Mutex<Vec<Session>>,
    auto_save: Mutex<Option<AutoSave>>,
}

impl SessionService {
    pub async fn load(store: Arc<dyn Store>, events: EventBus, clock: Arc<dyn Clock>) -> Result<Self> {
        let sessions: Vec<Session> = store.load_all(Partition::Sessions).await?;
        Ok(Self {
            store,
            events,
            clock,
            sessions: Mutex::new(sessions),
            auto_save: Mutex::new(None),
        })
    }

    /// Creates an empty snapshot; the topology arrives later via [`Self::update`].
    pub async fn save_current(&self, name: &str, description: Option<String>) -> Result<Session> {
        if name.trim().is_empty() {
            return Err(TabkeeperError::invalid_input("session name cannot be empty"));
        }
        let session = Session {
            id: new_id(),
            name: name.trim().to_string(),
            description,
            windows: Vec::new(),
            created_at: self.clock.now(),
            auto_save: false,
        };

        let mut sessions = self.sessions.lock().await;
        self.store.save(Partition::Sessions, &session).await?;
        sessions.push(session.clone());
        drop(sessions);

        tracing::info!(target: "sessions", "Saved session '{}'", session.name);
        Ok(session)
    }

    /// Replaces the captured topology of a session.
    pub async fn update(&self, session_id: &str, windows: Vec<SessionWindow>) -> Result<Session> {
        self.modify(session_id, |session| session.windows = windows)
            .await
    }

    pub async fn rename(
        &self,
        session_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Session> {
        if name.trim().is_empty() {
            return Err(TabkeeperError::invalid_input("session name cannot be empty"));
        }
        self.modify(session_id, |session| {
            session.name = name.trim().to_string();
            session.description = description;
        })
        .await
    }

    /// Deletes a session, stopping auto-save if it targets it.
    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.lock().await;
        let Some(index) = sessions.iter().position(|s| s.id == session_id) else {
            return Ok(false);
        };

        self.store.delete(Partition::Sessions, session_id).await?;
        sessions.remove(index);
        drop(sessions);

        let mut auto_save = self.auto_save.lock().await;
        if auto_save.as_ref().is_some_and(|a| a.session_id == session_id) {
            if let Some(previous) = auto_save.take() {
                previous.task.stop();
            }
        }
        Ok(true)
    }

    /// All sessions, newest first.
    pub async fn list(&self) -> Vec<Session> {
        let mut sessions = self.sessions.lock().await.clone();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions
            .lock()
            .await
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
    }

    /// Starts requesting saves of `session_id` every `interval`, replacing any
    /// running auto-save.
    pub async fn start_auto_save(self: &Arc<Self>, session_id: &str, interval: Duration) -> Result<()> {
        if self.get(session_id).await.is_none() {
            return Err(TabkeeperError::not_found("session", session_id));
        }
        self.stop_auto_save().await?;
        self.set_auto_save_flag(session_id, true).await?;

        let weak: Weak<Self> = Arc::downgrade(self);
        let target = session_id.to_string();
        let task = ScheduledTask::periodic("session-auto-save", interval, move || {
            let weak = weak.clone();
            let session_id = target.clone();
            async move {
                if let Some(service) = weak.upgrade() {
                    service
                        .events
                        .publish(EngineEvent::ShouldSaveSession { session_id });
                }
            }
        });

        *self.auto_save.lock().await = Some(AutoSave {
            session_id: session_id.to_string(),
            task,
        });
        tracing::info!(target: "sessions", "Auto-save started for {} every {:?}", session_id, interval);
        Ok(())
    }

    /// Stops the auto-save timer. Returns false if none was running.
    pub async fn stop_auto_save(&self) -> Result<bool> {
        let Some(previous) = self.auto_save.lock().await.take() else {
            return Ok(false);
        };
        previous.task.stop();

        match self.set_auto_save_flag(&previous.session_id, false).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        tracing::info!(target: "sessions", "Auto-save stopped");
        Ok(true)
    }

    pub async fn auto_save_target(&self) -> Option<String> {
        self.auto_save
            .lock()
            .await
            .as_ref()
            .map(|a| a.session_id.clone())
    }

    /// Cancels the timer without touching the store. Waits for a concurrent
    /// start or stop to finish first.
    pub async fn shutdown(&self) {
        if let Some(previous) = self.auto_save.lock().await.take() {
            previous.task.stop();
        }
    }

    async fn set_auto_save_flag(&self, session_id: &str, enabled: bool) -> Result<Session> {
        self.modify(session_id, |session| session.auto_save = enabled)
            .await
    }

    async fn modify(&self, session_id: &str, change: impl FnOnce(&mut Session)) -> Result<Session> {
        let mut sessions = self.sessions.lock().await;
        let index = sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| TabkeeperError::not_found("session", session_id))?;

        let mut updated = sessions[index].clone();
        change(&mut updated);
        self.store.save(Partition::Sessions, &updated).await?;
        sessions[index] = updated.clone();
        Ok(updated)
    }
}
