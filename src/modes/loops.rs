//! Loop manager - one background broadcast task per `(loop mode, chat)`.
//!
//! A task walks its chat's targets in ascending id order, sends each one the
//! template under its cursor and sleeps the shared tick delay after every
//! target. The cursor only moves after a send succeeds.
//!
//! Stop is cooperative: it clears the handle's `alive` flag, which the task
//! checks once per full pass. A pass in progress is allowed to finish.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::names::NameResolver;
use super::registry::{NextTemplate, TargetRegistry};
use super::templates::TemplateStore;
use super::{LoopMode, Messenger, TargetKind};
use crate::error::BotResult;
use crate::utils::html_escape;

/// Key of a live loop.
pub type LoopKey = (LoopMode, i64);

/// Liveness flag shared between the manager and one task.
#[derive(Debug)]
struct LoopHandle {
    key: LoopKey,
    alive: AtomicBool,
}

impl LoopHandle {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn kill(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

struct LoopShared {
    handles: Mutex<HashMap<LoopKey, Arc<LoopHandle>>>,
    delay_us: AtomicU64,
    registry: Arc<TargetRegistry>,
    templates: Arc<dyn TemplateStore>,
    names: NameResolver,
    messenger: Arc<dyn Messenger>,
}

/// Owner of all broadcast-loop tasks.
#[derive(Clone)]
pub struct LoopManager {
    shared: Arc<LoopShared>,
}

impl LoopManager {
    pub fn new(
        registry: Arc<TargetRegistry>,
        templates: Arc<dyn TemplateStore>,
        names: NameResolver,
        messenger: Arc<dyn Messenger>,
        delay: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(LoopShared {
                handles: Mutex::new(HashMap::new()),
                delay_us: AtomicU64::new(micros(delay)),
                registry,
                templates,
                names,
                messenger,
            }),
        }
    }

    /// Start the loop for a key unless one is already alive.
    ///
    /// Returns `true` if a new task was spawned. Must run inside a tokio
    /// runtime.
    pub fn start(&self, mode: LoopMode, chat_id: i64) -> bool {
        let key = (mode, chat_id);
        let handle = {
            let mut handles = self.shared.handles.lock();
            if handles.get(&key).is_some_and(|h| h.is_alive()) {
                debug!("Loop {} already running in chat {}", mode, chat_id);
                return false;
            }
            let handle = Arc::new(LoopHandle {
                key,
                alive: AtomicBool::new(true),
            });
            handles.insert(key, handle.clone());
            handle
        };

        tokio::spawn(run_loop(self.shared.clone(), handle));
        info!("Started {} loop in chat {}", mode, chat_id);
        true
    }

    /// Stop the loop for a key. Returns `true` if one was alive.
    pub fn stop(&self, mode: LoopMode, chat_id: i64) -> bool {
        let removed = self.shared.handles.lock().remove(&(mode, chat_id));
        match removed {
            Some(handle) => {
                handle.kill();
                info!("Stopped {} loop in chat {}", mode, chat_id);
                true
            }
            None => false,
        }
    }

    /// Stop every loop of one chat.
    pub fn stop_chat(&self, chat_id: i64) -> usize {
        let mut handles = self.shared.handles.lock();
        let keys: Vec<LoopKey> = handles
            .keys()
            .filter(|(_, chat)| *chat == chat_id)
            .copied()
            .collect();
        for key in &keys {
            if let Some(handle) = handles.remove(key) {
                handle.kill();
            }
        }
        if !keys.is_empty() {
            info!("Stopped {} loop(s) in chat {}", keys.len(), chat_id);
        }
        keys.len()
    }

    /// Stop every loop in the process.
    pub fn stop_all(&self) -> usize {
        let drained: Vec<Arc<LoopHandle>> =
            self.shared.handles.lock().drain().map(|(_, h)| h).collect();
        for handle in &drained {
            handle.kill();
        }
        info!("Stopped all loops ({})", drained.len());
        drained.len()
    }

    pub fn is_running(&self, mode: LoopMode, chat_id: i64) -> bool {
        self.shared
            .handles
            .lock()
            .get(&(mode, chat_id))
            .is_some_and(|h| h.is_alive())
    }

    /// Keys of all live loops.
    pub fn running(&self) -> Vec<LoopKey> {
        let mut keys: Vec<LoopKey> = self
            .shared
            .handles
            .lock()
            .values()
            .filter(|h| h.is_alive())
            .map(|h| h.key)
            .collect();
        keys.sort();
        keys
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay()
    }

    /// Change the delay for every loop, effective from each loop's next sleep.
    pub fn set_delay(&self, delay: Duration) {
        self.shared
            .delay_us
            .store(micros(delay), Ordering::Relaxed);
        info!("Tick delay set to {:?}", delay);
    }
}

impl LoopShared {
    fn delay(&self) -> Duration {
        Duration::from_micros(self.delay_us.load(Ordering::Relaxed))
    }

    /// Send one target its next template. `Ok(false)` means skipped.
    async fn deliver(&self, mode: LoopMode, chat_id: i64, user_id: u64) -> BotResult<bool> {
        let kind = TargetKind::Loop(mode);
        let templates = self.templates.list(mode.category()).await?;

        let (text, cursor) = match self.registry.next_template(kind, chat_id, user_id, &templates) {
            NextTemplate::Ready { text, cursor } => (text, cursor),
            NextTemplate::NoTemplates | NextTemplate::NotTargeted => return Ok(false),
        };

        let mention = self.names.mention(user_id).await;
        self.messenger
            .send(chat_id, &compose(mode, &mention, &text))
            .await?;
        self.registry.advance(kind, chat_id, user_id, cursor);
        Ok(true)
    }
}

fn micros(delay: Duration) -> u64 {
    u64::try_from(delay.as_micros()).unwrap_or(u64::MAX)
}

/// Format a loop message.
fn compose(mode: LoopMode, mention: &str, template: &str) -> String {
    match mode {
        LoopMode::Fight => format!("{} : {}", mention, html_escape(template)),
        LoopMode::Love => format!("{} 💞 {}", mention, html_escape(template)),
    }
}

async fn run_loop(shared: Arc<LoopShared>, handle: Arc<LoopHandle>) {
    let (mode, chat_id) = handle.key;
    let kind = TargetKind::Loop(mode);

    while handle.is_alive() {
        let users = shared.registry.targets(kind, chat_id);
        if users.is_empty() {
            sleep(shared.delay()).await;
            continue;
        }

        for user_id in users {
            match shared.deliver(mode, chat_id, user_id).await {
                Ok(true) => debug!("{} tick sent to {} in chat {}", mode, user_id, chat_id),
                Ok(false) => debug!("{} tick skipped {} in chat {}", mode, user_id, chat_id),
                Err(e) => warn!("{} tick failed for {} in chat {}: {}", mode, user_id, chat_id, e),
            }
            sleep(shared.delay()).await;
        }
    }

    debug!("{} loop task for chat {} exited", mode, chat_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::Category;
    use crate::modes::testing::Harness;

    const FIGHT: TargetKind = TargetKind::Loop(LoopMode::Fight);

    #[tokio::test(start_paused = true)]
    async fn test_empty_templates_skip_until_one_is_added() {
        let h = Harness::new();
        h.registry.add_targets(FIGHT, 1, &[42]);
        let loops = h.loops(Duration::from_secs(1));

        assert!(loops.start(LoopMode::Fight, 1));
        sleep(Duration::from_millis(3500)).await;
        assert!(h.messenger.sent().is_empty());
        assert_eq!(h.registry.cursor(FIGHT, 1, 42), Some(0));

        h.templates.add(Category::Generic, "first").await.unwrap();
        sleep(Duration::from_millis(1000)).await;

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 1);
        assert!(sent[0].text.contains("first"));
        assert_eq!(h.registry.cursor(FIGHT, 1, 42), Some(1));
        loops.stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_does_not_skip_template() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["a", "b"]).await;
        h.registry.add_targets(FIGHT, 1, &[42]);
        h.messenger.fail_next_sends(1);
        let loops = h.loops(Duration::from_secs(1));

        loops.start(LoopMode::Fight, 1);
        sleep(Duration::from_millis(500)).await;
        assert_eq!(h.registry.cursor(FIGHT, 1, 42), Some(0));

        sleep(Duration::from_millis(2000)).await;
        let texts: Vec<String> = h.messenger.sent().into_iter().map(|s| s.text).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].ends_with(": a"));
        assert!(texts[1].ends_with(": b"));
        assert_eq!(h.registry.cursor(FIGHT, 1, 42), Some(2));
        loops.stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_sends_within_one_tick() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["a"]).await;
        h.registry.add_targets(FIGHT, 1, &[42]);
        let loops = h.loops(Duration::from_secs(1));

        loops.start(LoopMode::Fight, 1);
        sleep(Duration::from_millis(1500)).await;
        assert!(loops.stop(LoopMode::Fight, 1));
        assert!(!loops.is_running(LoopMode::Fight, 1));
        let before = h.messenger.sent().len();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(h.messenger.sent().len(), before);
        assert!(!loops.stop(LoopMode::Fight, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_does_not_spawn_duplicate() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["a"]).await;
        h.registry.add_targets(FIGHT, 1, &[42]);
        let loops = h.loops(Duration::from_secs(1));

        assert!(loops.start(LoopMode::Fight, 1));
        assert!(!loops.start(LoopMode::Fight, 1));
        sleep(Duration::from_millis(500)).await;

        assert_eq!(h.messenger.sent().len(), 1);
        assert_eq!(loops.running(), vec![(LoopMode::Fight, 1)]);
        loops.stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_targets_visited_in_ascending_order() {
        let h = Harness::new();
        h.add_templates(Category::Affection, &["x"]).await;
        h.registry.add_targets(TargetKind::Loop(LoopMode::Love), 1, &[30, 10]);
        let loops = h.loops(Duration::from_secs(1));

        loops.start(LoopMode::Love, 1);
        sleep(Duration::from_millis(1500)).await;

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].text.contains("id=10"));
        assert!(sent[1].text.contains("id=30"));
        assert!(sent[0].text.contains("💞"));
        loops.stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_chat_only_touches_that_chat() {
        let h = Harness::new();
        let loops = h.loops(Duration::from_secs(1));
        loops.start(LoopMode::Fight, 1);
        loops.start(LoopMode::Love, 1);
        loops.start(LoopMode::Fight, 2);

        assert_eq!(loops.stop_chat(1), 2);
        assert_eq!(loops.running(), vec![(LoopMode::Fight, 2)]);
        assert_eq!(loops.stop_all(), 1);
        assert!(loops.running().is_empty());
    }

    #[test]
    fn test_compose_escapes_template() {
        assert_eq!(compose(LoopMode::Fight, "@m", "a<b"), "@m : a&lt;b");
    }
}
