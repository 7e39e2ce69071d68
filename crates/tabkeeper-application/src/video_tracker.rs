//! Picture-in-picture bookkeeping.
//!
//! Entries are added when the host accepts the request and removed when the
//! host reports the surface left picture-in-picture. Hosts without the
//! capability fail with `Unsupported`.

use std::sync::Arc;
use tokio::sync::Mutex;

use tabkeeper_core::error::{Result, TabkeeperError};
use tabkeeper_core::event::EngineEvent;
use tabkeeper_core::host::{HostCapabilities, VideoHandle};
use tabkeeper_core::new_id;
use tabkeeper_core::video::FloatingVideo;

use crate::event_bus::EventBus;

pub struct VideoTracker {
    host: Arc<dyn HostCapabilities>,
    events: EventBus,
    videos: Mutex<Vec<FloatingVideo>>,
}

impl VideoTracker {
    pub fn new(host: Arc<dyn HostCapabilities>, events: EventBus) -> Self {
        Self {
            host,
            events,
            videos: Mutex::new(Vec::new()),
        }
    }

    /// Puts the video into picture-in-picture and returns the tracking id.
    pub async fn open(&self, tab_id: &str, handle: VideoHandle) -> Result<String> {
        if !self.host.picture_in_picture_available() {
            return Err(TabkeeperError::unsupported(
                "picture-in-picture is not available on this host",
            ));
        }
        self.host.enter_picture_in_picture(&handle).await?;

        let video = FloatingVideo {
            id: new_id(),
            tab_id: tab_id.to_string(),
            video_url: handle.video_url,
            bounds: handle.bounds,
            always_on_top: true,
        };
        self.videos.lock().await.push(video.clone());

        tracing::info!(target: "video", "Floating video {} from tab {}", video.id, tab_id);
        let id = video.id.clone();
        self.events.publish(EngineEvent::VideoOpened { video });
        Ok(id)
    }

    /// Called when the host reports a surface left picture-in-picture.
    pub async fn on_left_picture_in_picture(&self, video_id: &str) -> bool {
        let mut videos = self.videos.lock().await;
        let before = videos.len();
        videos.retain(|v| v.id != video_id);
        let removed = videos.len() != before;
        drop(videos);

        if removed {
            self.events.publish(EngineEvent::VideoClosed {
                id: video_id.to_string(),
            });
        }
        removed
    }

    /// Asks the host to exit its active picture-in-picture surface.
    pub async fn close(&self) -> Result<()> {
        if !self.host.picture_in_picture_available() {
            return Err(TabkeeperError::unsupported(
                "picture-in-picture is not available on this host",
            ));
        }
        self.host.exit_picture_in_picture().await
    }

    pub async fn list(&self) -> Vec<FloatingVideo> {
        self.videos.lock().await.clone()
    }
}
