//! Command palette registry.
//!
//! Commands pair a serializable [`CommandInfo`] with an async action. The
//! built-in commands only publish their command event; the host decides what
//! "new tab" or "screenshot" actually does.

use futures::future::BoxFuture;
use std::sync::{Arc, RwLock};

use tabkeeper_core::command::{CommandCategory, CommandInfo};
use tabkeeper_core::error::Result;
use tabkeeper_core::event::EngineEvent;

use crate::event_bus::EventBus;

pub type CommandAction = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Clone)]
pub struct Command {
    pub info: CommandInfo,
    pub action: CommandAction,
}

impl Command {
    pub fn new<F, Fut>(info: CommandInfo, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            info,
            action: Arc::new(move || -> BoxFuture<'static, Result<()>> { Box::pin(action()) }),
        }
    }

    /// A command whose action only publishes `event_name` on the bus.
    pub fn publishing(info: CommandInfo, events: EventBus, event_name: &'static str) -> Self {
        Self::new(info, move || {
            let events = events.clone();
            async move {
                events.publish(EngineEvent::command(event_name));
                Ok(())
            }
        })
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: RwLock<Vec<Command>>,
}

fn info(
    id: &str,
    name: &str,
    description: &str,
    shortcut: &str,
    icon: &str,
    category: CommandCategory,
    keywords: &[&str],
) -> CommandInfo {
    CommandInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        shortcut: Some(shortcut.to_string()),
        icon: icon.to_string(),
        category,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in commands.
    pub fn with_defaults(events: &EventBus) -> Self {
        let registry = Self::new();
        let defaults = [
            (
                info("new-tab", "New Tab", "Open a new tab", "Ctrl+T", "plus", CommandCategory::Tabs, &["open", "create"]),
                "new-tab",
            ),
            (
                info("close-tab", "Close Tab", "Close the current tab", "Ctrl+W", "x", CommandCategory::Tabs, &["remove"]),
                "close-tab",
            ),
            (
                info(
                    "toggle-devtools",
                    "Toggle Developer Tools",
                    "Show or hide the developer tools",
                    "F12",
                    "code",
                    CommandCategory::Developer,
                    &["inspect", "console", "debug"],
                ),
                "toggle-devtools",
            ),
            (
                info(
                    "toggle-focus-mode",
                    "Toggle Focus Mode",
                    "Block distracting sites for a while",
                    "Ctrl+Shift+F",
                    "target",
                    CommandCategory::Focus,
                    &["concentrate", "distraction", "pomodoro"],
                ),
                "toggle-focus-mode",
            ),
            (
                info(
                    "ai-summarize",
                    "Summarize Page",
                    "Summarize the current page with AI",
                    "Ctrl+Shift+S",
                    "sparkles",
                    CommandCategory::Ai,
                    &["summary", "tldr"],
                ),
                "ai-summarize",
            ),
            (
                info(
                    "screenshot",
                    "Take Screenshot",
                    "Capture the visible page",
                    "Ctrl+Shift+C",
                    "camera",
                    CommandCategory::Capture,
                    &["capture", "image"],
                ),
                "screenshot",
            ),
        ];
        for (info, event_name) in defaults {
            registry.register(Command::publishing(info, events.clone(), event_name));
        }
        registry
    }

    /// Registers a command. An existing command with the same id is replaced.
    pub fn register(&self, command: Command) {
        let mut commands = self.write();
        match commands.iter_mut().find(|c| c.info.id == command.info.id) {
            Some(existing) => *existing = command,
            None => commands.push(command),
        }
    }

    pub fn unregister(&self, command_id: &str) -> bool {
        let mut commands = self.write();
        let before = commands.len();
        commands.retain(|c| c.info.id != command_id);
        commands.len() != before
    }

    pub fn list(&self) -> Vec<CommandInfo> {
        self.read().iter().map(|c| c.info.clone()).collect()
    }

    pub fn search(&self, query: &str) -> Vec<CommandInfo> {
        self.read()
            .iter()
            .filter(|c| c.info.matches(query))
            .map(|c| c.info.clone())
            .collect()
    }

    /// Runs a command's action. Unknown ids are a no-op returning `false`.
    pub async fn execute(&self, command_id: &str) -> Result<bool> {
        let action = self
            .read()
            .iter()
            .find(|c| c.info.id == command_id)
            .map(|c| c.action.clone());

        let Some(action) = action else {
            tracing::debug!(target: "commands", "Unknown command {}", command_id);
            return Ok(false);
        };
        action().await?;
        Ok(true)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Command>> {
        self.commands.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Command>> {
        self.commands.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::drain;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_search_finds_focus_toggle() {
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let registry = CommandRegistry::with_defaults(&events);

        let hits = registry.search("focus");
        assert!(hits.iter().any(|c| c.name == "Toggle Focus Mode"));

        assert!(registry.execute("toggle-focus-mode").await.unwrap());
        assert_eq!(drain(&mut rx), vec![EngineEvent::command("toggle-focus-mode")]);
    }

    #[tokio::test]
    async fn test_execute_runs_action_once_per_call() {
        let registry = CommandRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        registry.register(Command::new(
            info("count", "Count", "Counts", "", "hash", CommandCategory::Custom, &[]),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        ));

        registry.execute("count").await.unwrap();
        registry.execute("count").await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!registry.execute("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_replaces_and_unregister() {
        let events = EventBus::new(16);
        let registry = CommandRegistry::with_defaults(&events);
        assert_eq!(registry.list().len(), 6);

        let mut replacement = registry.list()[0].clone();
        replacement.name = "Fresh Tab".into();
        registry.register(Command::publishing(replacement, events.clone(), "new-tab"));
        assert_eq!(registry.list().len(), 6);
        assert_eq!(registry.list()[0].name, "Fresh Tab");

        assert!(registry.unregister("screenshot"));
        assert!(!registry.unregister("screenshot"));
        assert_eq!(registry.search("").len(), 5);
    }
}
