//! Hand-written host fakes and event helpers shared by the policy tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::broadcast;

use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::host::{
    DocumentHandle, HostCapabilities, HostKind, HostResourceSample, InjectionKind, VideoHandle,
};

/// A host whose answers are set by the test.
#[derive(Default)]
pub struct FakeHost {
    pub sample: Mutex<HostResourceSample>,
    pub sampled_with: Mutex<Vec<Vec<String>>>,
    pub fail_sampling: AtomicBool,
    pub notifications: AtomicBool,
    pub picture_in_picture: AtomicBool,
    pub entered: Mutex<Vec<VideoHandle>>,
    pub exits: AtomicUsize,
}

impl FakeHost {
    pub fn with_capabilities(notifications: bool, picture_in_picture: bool) -> Self {
        let host = Self::default();
        host.notifications.store(notifications, Ordering::SeqCst);
        host.picture_in_picture
            .store(picture_in_picture, Ordering::SeqCst);
        host
    }

    pub fn set_sample(&self, sample: HostResourceSample) {
        *self.sample.lock().unwrap() = sample;
    }
}

#[async_trait]
impl HostCapabilities for FakeHost {
    fn kind(&self) -> HostKind {
        HostKind::HostBacked
    }

    async fn sample_resources(&self, tab_ids: &[String]) -> Result<HostResourceSample> {
        self.sampled_with.lock().unwrap().push(tab_ids.to_vec());
        if self.fail_sampling.load(Ordering::SeqCst) {
            return Err(TabkeeperError::io("host went away"));
        }
        Ok(self.sample.lock().unwrap().clone())
    }

    fn notifications_available(&self) -> bool {
        self.notifications.load(Ordering::SeqCst)
    }

    fn picture_in_picture_available(&self) -> bool {
        self.picture_in_picture.load(Ordering::SeqCst)
    }

    async fn enter_picture_in_picture(&self, handle: &VideoHandle) -> Result<()> {
        self.entered.lock().unwrap().push(handle.clone());
        Ok(())
    }

    async fn exit_picture_in_picture(&self) -> Result<()> {
        self.exits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records element upserts and removals in call order.
#[derive(Default)]
pub struct RecordingDocument {
    pub elements: Mutex<Vec<(String, InjectionKind, String)>>,
    pub removed: Mutex<Vec<String>>,
}

impl RecordingDocument {
    pub fn element_ids(&self) -> Vec<String> {
        self.elements
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _, _)| id.clone())
            .collect()
    }
}

impl DocumentHandle for RecordingDocument {
    fn upsert_element(&self, element_id: &str, kind: InjectionKind, content: &str) -> Result<()> {
        let mut elements = self.elements.lock().unwrap();
        elements.retain(|(id, _, _)| id != element_id);
        elements.push((element_id.to_string(), kind, content.to_string()));
        Ok(())
    }

    fn remove_element(&self, element_id: &str) -> Result<()> {
        self.elements
            .lock()
            .unwrap()
            .retain(|(id, _, _)| id != element_id);
        self.removed.lock().unwrap().push(element_id.to_string());
        Ok(())
    }
}

/// Rejects every injection.
pub struct FailingDocument;

impl DocumentHandle for FailingDocument {
    fn upsert_element(&self, _element_id: &str, _kind: InjectionKind, _content: &str) -> Result<()> {
        Err(TabkeeperError::internal("document is gone"))
    }

    fn remove_element(&self, _element_id: &str) -> Result<()> {
        Err(TabkeeperError::internal("document is gone"))
    }
}

/// Collects every event currently buffered for `receiver` without waiting.
pub fn drain(receiver: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(target: "events", skipped, "subscriber lagged");
            }
            Err(_) => break,
        }
    }
    events
}
