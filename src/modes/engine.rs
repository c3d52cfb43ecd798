//! Operator control surface over the registry, loops and dispatcher.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::loops::LoopManager;
use super::names::NameResolver;
use super::reactive::{Inbound, Outcome, ReactiveDispatcher};
use super::registry::{RegistryStats, TargetRegistry};
use super::templates::{Category, TemplateStore};
use super::{LoopMode, Messenger, PairMode, ReactiveMode, TargetKind, UserRef};
use crate::error::{BotError, BotResult};

/// Shortest tick delay accepted.
const MIN_TICK_DELAY_SECS: f64 = 0.001;
/// Longest tick delay accepted.
const MAX_TICK_DELAY_SECS: f64 = 3600.0;

/// Validate a tick delay given in seconds. Anything outside
/// [1 ms, 3600 s] is a `Config` error.
pub fn tick_delay_from_secs(seconds: f64) -> BotResult<Duration> {
    if !seconds.is_finite() || !(MIN_TICK_DELAY_SECS..=MAX_TICK_DELAY_SECS).contains(&seconds) {
        return Err(BotError::Config(format!(
            "delay must be between {} and {} seconds",
            MIN_TICK_DELAY_SECS, MAX_TICK_DELAY_SECS
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Counts for status views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub registry: RegistryStats,
    pub fight_loops: usize,
    pub love_loops: usize,
}

/// Result of a start-loop command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStart {
    /// Resolved user ids, in the order they were given.
    pub users: Vec<u64>,
    /// How many of them were not targets yet.
    pub added: usize,
    /// Whether a new task was spawned (false if one was already running).
    pub spawned: bool,
}

pub struct ModeEngine {
    registry: Arc<TargetRegistry>,
    loops: LoopManager,
    reactive: ReactiveDispatcher,
    messenger: Arc<dyn Messenger>,
}

impl ModeEngine {
    pub fn new(
        registry: Arc<TargetRegistry>,
        templates: Arc<dyn TemplateStore>,
        names: NameResolver,
        messenger: Arc<dyn Messenger>,
        operators: Vec<u64>,
        tick_delay: Duration,
    ) -> Self {
        let loops = LoopManager::new(
            registry.clone(),
            templates.clone(),
            names.clone(),
            messenger.clone(),
            tick_delay,
        );
        let reactive =
            ReactiveDispatcher::new(registry.clone(), templates, names, messenger.clone(), operators);

        Self {
            registry,
            loops,
            reactive,
            messenger,
        }
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn loops(&self) -> &LoopManager {
        &self.loops
    }

    /// Resolve user refs, skipping the ones the platform does not know.
    pub async fn resolve(&self, refs: &[UserRef]) -> Vec<u64> {
        let mut users = Vec::with_capacity(refs.len());
        for user in refs {
            match self.messenger.resolve_user(user).await {
                Ok(id) if !users.contains(&id) => users.push(id),
                Ok(_) => {}
                Err(e) => debug!("Skipping unresolvable target {}: {}", user, e),
            }
        }
        users
    }

    /// Like `resolve`, but an empty result is a `NotFound` error.
    async fn resolve_some(&self, refs: &[UserRef]) -> BotResult<Vec<u64>> {
        let users = self.resolve(refs).await;
        if users.is_empty() {
            return Err(BotError::NotFound(
                refs.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
        }
        Ok(users)
    }

    // --- Loops ---

    /// Merge targets into a loop and start it if it is not running.
    pub async fn start_loop(
        &self,
        mode: LoopMode,
        chat_id: i64,
        refs: &[UserRef],
    ) -> BotResult<LoopStart> {
        let users = self.resolve_some(refs).await?;
        let added = self.registry.add_targets(mode.into(), chat_id, &users);
        let spawned = self.loops.start(mode, chat_id);
        info!(
            "{} loop in chat {}: {} target(s), {} new",
            mode,
            chat_id,
            users.len(),
            added
        );
        Ok(LoopStart {
            users,
            added,
            spawned,
        })
    }

    /// Stop a loop and drop its targets. Returns whether a loop was running.
    pub fn stop_loop(&self, mode: LoopMode, chat_id: i64) -> bool {
        let stopped = self.loops.stop(mode, chat_id);
        self.registry.remove_all(mode.into(), chat_id);
        stopped
    }

    /// Stop every mode of one theme (loop, reactive table, pair) in a chat.
    pub fn stop_theme(&self, chat_id: i64, category: Category) -> bool {
        let (loop_mode, reactive, pair) = match category {
            Category::Generic => (LoopMode::Fight, ReactiveMode::Troll, PairMode::Funny),
            Category::Affection => (LoopMode::Love, ReactiveMode::LoveTroll, PairMode::LoveFunny),
        };
        let stopped = self.stop_loop(loop_mode, chat_id);
        let removed = self.registry.remove_all(reactive.into(), chat_id);
        let unpaired = self.registry.remove_pair(pair, chat_id);
        info!("Stopped {} modes in chat {}", category, chat_id);
        stopped || removed > 0 || unpaired
    }

    /// Stop every loop and clear every target table, pair and hide set of a
    /// chat. Monitoring is left as is.
    pub fn stop_all(&self, chat_id: i64) -> usize {
        let stopped = self.loops.stop_chat(chat_id);
        self.registry.clear_chat(chat_id);
        info!("Cleared all modes in chat {}", chat_id);
        stopped
    }

    // --- Reactive ---

    pub async fn add_reactive_targets(
        &self,
        mode: ReactiveMode,
        chat_id: i64,
        refs: &[UserRef],
    ) -> BotResult<Vec<u64>> {
        let users = self.resolve_some(refs).await?;
        let added = self
            .registry
            .add_targets(TargetKind::Reactive(mode), chat_id, &users);
        info!("{} in chat {}: {} new target(s)", mode, chat_id, added);
        Ok(users)
    }

    /// Set the pair for a chat. Both users must resolve and differ.
    pub async fn set_pair_targets(
        &self,
        mode: PairMode,
        chat_id: i64,
        first: &UserRef,
        second: &UserRef,
    ) -> BotResult<(u64, u64)> {
        let a = self.messenger.resolve_user(first).await?;
        let b = self.messenger.resolve_user(second).await?;
        if a == b {
            return Err(BotError::Config("a pair needs two different users".into()));
        }
        self.registry.set_pair(mode, chat_id, a, b);
        info!("{} pair in chat {}: {} <-> {}", mode, chat_id, a, b);
        Ok((a, b))
    }

    // --- Hide & monitor ---

    pub async fn hide(&self, chat_id: i64, refs: &[UserRef]) -> BotResult<Vec<u64>> {
        let users = self.resolve_some(refs).await?;
        self.registry.hide(chat_id, &users);
        info!("Hiding {:?} in chat {}", users, chat_id);
        Ok(users)
    }

    pub async fn unhide(&self, chat_id: i64, refs: &[UserRef]) -> BotResult<Vec<u64>> {
        let users = self.resolve_some(refs).await?;
        self.registry.unhide(chat_id, &users);
        info!("Unhiding {:?} in chat {}", users, chat_id);
        Ok(users)
    }

    /// Returns the previous flag.
    pub fn set_monitor(&self, chat_id: i64, enabled: bool) -> bool {
        let previous = self.registry.set_monitor(chat_id, enabled);
        info!("Monitor for chat {} set to {}", chat_id, enabled);
        previous
    }

    /// Flip the monitor flag. Returns the new value.
    pub fn toggle_monitor(&self, chat_id: i64) -> bool {
        let enabled = !self.registry.is_monitored(chat_id);
        self.set_monitor(chat_id, enabled);
        enabled
    }

    // --- Process-wide ---

    pub fn set_tick_delay(&self, seconds: f64) -> BotResult<Duration> {
        let delay = tick_delay_from_secs(seconds)?;
        self.loops.set_delay(delay);
        Ok(delay)
    }

    pub fn tick_delay(&self) -> Duration {
        self.loops.delay()
    }

    /// Kill every loop and clear all in-memory state.
    pub fn emergency_stop_all(&self) -> usize {
        let stopped = self.loops.stop_all();
        self.registry.clear();
        info!("Emergency stop: {} loop(s) killed, state cleared", stopped);
        stopped
    }

    pub fn stats(&self) -> EngineStats {
        let mut stats = EngineStats {
            registry: self.registry.stats(),
            ..Default::default()
        };
        for (mode, _) in self.loops.running() {
            match mode {
                LoopMode::Fight => stats.fight_loops += 1,
                LoopMode::Love => stats.love_loops += 1,
            }
        }
        stats
    }

    pub fn known_users(&self) -> HashSet<u64> {
        self.registry.known_users()
    }

    /// Run the reactive stages for one inbound message.
    pub async fn on_message(&self, msg: &Inbound) -> Outcome {
        self.reactive.handle(msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::testing::Harness;
    use tokio::time::sleep;

    fn engine(h: &Harness) -> ModeEngine {
        h.engine(vec![], Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_loop_requires_a_resolved_target() {
        let h = Harness::new();
        let engine = engine(&h);

        let err = engine
            .start_loop(LoopMode::Fight, 1, &[UserRef::Handle("@ghost".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
        assert!(engine.loops().running().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_loop_merges_targets_and_skips_unknown_refs() {
        let h = Harness::new();
        h.messenger.set_handle("@alice", 5);
        let engine = engine(&h);

        let first = engine
            .start_loop(
                LoopMode::Fight,
                1,
                &[UserRef::Id(42), UserRef::Handle("@nobody".into())],
            )
            .await
            .unwrap();
        assert_eq!(first.users, vec![42]);
        assert!(first.spawned);

        let second = engine
            .start_loop(
                LoopMode::Fight,
                1,
                &[UserRef::Id(42), UserRef::Handle("@alice".into())],
            )
            .await
            .unwrap();
        assert_eq!(second.added, 1);
        assert!(!second.spawned);
        assert_eq!(engine.registry().targets(LoopMode::Fight.into(), 1), vec![5, 42]);
        engine.emergency_stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_loop_removes_targets() {
        let h = Harness::new();
        let engine = engine(&h);
        engine
            .start_loop(LoopMode::Love, 1, &[UserRef::Id(7)])
            .await
            .unwrap();

        assert!(engine.stop_loop(LoopMode::Love, 1));
        assert!(engine.registry().targets(LoopMode::Love.into(), 1).is_empty());
        assert!(!engine.stop_loop(LoopMode::Love, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_theme_leaves_other_theme_running() {
        let h = Harness::new();
        let engine = engine(&h);
        engine.start_loop(LoopMode::Love, 1, &[UserRef::Id(7)]).await.unwrap();
        engine.start_loop(LoopMode::Fight, 1, &[UserRef::Id(7)]).await.unwrap();
        engine
            .add_reactive_targets(ReactiveMode::LoveTroll, 1, &[UserRef::Id(8)])
            .await
            .unwrap();
        engine
            .set_pair_targets(PairMode::LoveFunny, 1, &UserRef::Id(1), &UserRef::Id(2))
            .await
            .unwrap();

        assert!(engine.stop_theme(1, Category::Affection));
        let stats = engine.stats();
        assert_eq!(stats.love_loops, 0);
        assert_eq!(stats.fight_loops, 1);
        assert_eq!(stats.registry.love_troll_targets, 0);
        assert_eq!(stats.registry.love_funny_pairs, 0);
        engine.emergency_stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_clears_chat_but_keeps_monitor() {
        let h = Harness::new();
        let engine = engine(&h);
        engine.start_loop(LoopMode::Fight, 1, &[UserRef::Id(7)]).await.unwrap();
        engine.start_loop(LoopMode::Fight, 2, &[UserRef::Id(7)]).await.unwrap();
        engine.hide(1, &[UserRef::Id(9)]).await.unwrap();
        engine.set_monitor(1, true);

        assert_eq!(engine.stop_all(1), 1);
        assert!(!engine.registry().is_hidden(1, 9));
        assert!(engine.registry().is_monitored(1));
        assert!(engine.loops().is_running(LoopMode::Fight, 2));
        engine.emergency_stop_all();
    }

    #[tokio::test]
    async fn test_pair_requires_two_users() {
        let h = Harness::new();
        let engine = engine(&h);
        let err = engine
            .set_pair_targets(PairMode::Funny, 1, &UserRef::Id(3), &UserRef::Id(3))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
        assert!(engine.registry().pair(PairMode::Funny, 1).is_none());
    }

    #[tokio::test]
    async fn test_toggle_monitor() {
        let h = Harness::new();
        let engine = engine(&h);
        assert!(engine.toggle_monitor(1));
        assert!(!engine.toggle_monitor(1));
        assert!(!engine.registry().is_monitored(1));
    }

    #[tokio::test]
    async fn test_tick_delay_validation() {
        let h = Harness::new();
        let engine = engine(&h);

        assert!(matches!(engine.set_tick_delay(0.0), Err(BotError::Config(_))));
        assert!(matches!(engine.set_tick_delay(-1.0), Err(BotError::Config(_))));
        assert!(matches!(engine.set_tick_delay(f64::NAN), Err(BotError::Config(_))));
        assert_eq!(engine.tick_delay(), Duration::from_secs(1));

        engine.set_tick_delay(0.5).unwrap();
        assert_eq!(engine.tick_delay(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_sub_millisecond_delay_is_rejected() {
        let h = Harness::new();
        let engine = engine(&h);

        assert!(matches!(engine.set_tick_delay(0.0004), Err(BotError::Config(_))));
        assert!(matches!(engine.set_tick_delay(3600.5), Err(BotError::Config(_))));
        assert_eq!(engine.tick_delay(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_tick_delay_keeps_sub_second_precision() {
        let h = Harness::new();
        let engine = engine(&h);

        assert_eq!(engine.set_tick_delay(0.001).unwrap(), Duration::from_millis(1));
        assert_eq!(engine.tick_delay(), Duration::from_millis(1));

        engine.set_tick_delay(0.015625).unwrap();
        assert_eq!(engine.tick_delay(), Duration::from_micros(15_625));

        engine.set_tick_delay(3600.0).unwrap();
        assert_eq!(engine.tick_delay(), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emergency_stop_silences_everything() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["a"]).await;
        let engine = engine(&h);
        engine.start_loop(LoopMode::Fight, 1, &[UserRef::Id(1)]).await.unwrap();
        engine.start_loop(LoopMode::Fight, 2, &[UserRef::Id(2)]).await.unwrap();
        sleep(Duration::from_millis(500)).await;

        assert_eq!(engine.emergency_stop_all(), 2);
        let before = h.messenger.sent().len();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(h.messenger.sent().len(), before);
        assert_eq!(engine.stats(), EngineStats::default());
        assert!(engine.known_users().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_spawn_one_loop() {
        let h = Harness::new();
        h.add_templates(Category::Generic, &["a"]).await;
        let engine = Arc::new(engine(&h));
        engine.set_tick_delay(3600.0).unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(16));
        let starts: Vec<_> = (1..=16u64)
            .map(|user| {
                let engine = engine.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    engine
                        .start_loop(LoopMode::Fight, 1, &[UserRef::Id(user)])
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut spawned = 0;
        for start in starts {
            if start.await.unwrap().spawned {
                spawned += 1;
            }
        }

        assert_eq!(spawned, 1);
        assert_eq!(engine.loops().running(), vec![(LoopMode::Fight, 1)]);
        assert_eq!(
            engine.registry().targets(TargetKind::Loop(LoopMode::Fight), 1),
            (1..=16).collect::<Vec<u64>>()
        );
        engine.emergency_stop_all();
    }
}
