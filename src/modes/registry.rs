//! Target registry - per-chat target tables, pairs, hide sets and monitor flags.
//!
//! Every table is a sharded `DashMap`, so each read-modify-write on a
//! `(mode, chat)` key runs under that key's shard lock. Target tables are
//! `BTreeMap`s: iteration is always ascending by user id.

use std::collections::{BTreeMap, HashSet};

use dashmap::{DashMap, DashSet};
use tracing::debug;

use super::templates::Template;
use super::{PairMode, TargetKind};

/// Result of looking up the next template for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTemplate {
    /// Text to send and the cursor it was read at (pass it to `advance`).
    Ready { text: String, cursor: usize },
    /// The category has no templates right now.
    NoTemplates,
    /// The user is not (or no longer) a target for this key.
    NotTargeted,
}

/// Two users set against each other in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairEntry {
    pub first: u64,
    pub second: u64,
    /// Rotates the reply phrasing; advanced after each delivered reply.
    pub cursor: usize,
}

impl PairEntry {
    /// The other half of the pair, if `user_id` belongs to it.
    pub fn partner(&self, user_id: u64) -> Option<u64> {
        if user_id == self.first {
            Some(self.second)
        } else if user_id == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Counts for status views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub fight_targets: usize,
    pub love_targets: usize,
    pub troll_targets: usize,
    pub love_troll_targets: usize,
    pub funny_pairs: usize,
    pub love_funny_pairs: usize,
    pub hidden_users: usize,
    pub monitored_chats: usize,
}

/// Shared per-chat mode state.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: DashMap<(TargetKind, i64), BTreeMap<u64, usize>>,
    pairs: DashMap<(PairMode, i64), PairEntry>,
    hidden: DashMap<i64, HashSet<u64>>,
    monitored: DashSet<i64>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Target tables ---

    /// Register users for a key. Existing users keep their cursor.
    /// Returns how many were newly added.
    pub fn add_targets(&self, kind: TargetKind, chat_id: i64, users: &[u64]) -> usize {
        let mut table = self.targets.entry((kind, chat_id)).or_default();
        let mut added = 0;
        for &user in users {
            if !table.contains_key(&user) {
                table.insert(user, 0);
                added += 1;
            }
        }
        debug!("Added {} {} targets in chat {}", added, kind, chat_id);
        added
    }

    /// Snapshot of the targets for a key, ascending by user id.
    pub fn targets(&self, kind: TargetKind, chat_id: i64) -> Vec<u64> {
        self.targets
            .get(&(kind, chat_id))
            .map(|table| table.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, kind: TargetKind, chat_id: i64, user_id: u64) -> bool {
        self.cursor(kind, chat_id, user_id).is_some()
    }

    pub fn cursor(&self, kind: TargetKind, chat_id: i64, user_id: u64) -> Option<usize> {
        self.targets
            .get(&(kind, chat_id))
            .and_then(|table| table.get(&user_id).copied())
    }

    /// Pick the template at `cursor mod len` for a target.
    ///
    /// Does not advance; call `advance` once the send went through.
    pub fn next_template(
        &self,
        kind: TargetKind,
        chat_id: i64,
        user_id: u64,
        templates: &[Template],
    ) -> NextTemplate {
        let Some(cursor) = self.cursor(kind, chat_id, user_id) else {
            return NextTemplate::NotTargeted;
        };
        if templates.is_empty() {
            return NextTemplate::NoTemplates;
        }
        NextTemplate::Ready {
            text: templates[cursor % templates.len()].text.clone(),
            cursor,
        }
    }

    /// Advance a target's cursor if it still reads `from`.
    ///
    /// Two concurrent deliveries of the same template advance it once.
    pub fn advance(&self, kind: TargetKind, chat_id: i64, user_id: u64, from: usize) -> bool {
        let Some(mut table) = self.targets.get_mut(&(kind, chat_id)) else {
            return false;
        };
        match table.get_mut(&user_id) {
            Some(cursor) if *cursor == from => {
                *cursor = from.wrapping_add(1);
                true
            }
            _ => false,
        }
    }

    /// Drop every target for a key. Returns how many were removed.
    pub fn remove_all(&self, kind: TargetKind, chat_id: i64) -> usize {
        self.targets
            .remove(&(kind, chat_id))
            .map(|(_, table)| table.len())
            .unwrap_or(0)
    }

    // --- Pairs ---

    /// Set (or replace) the pair for a chat.
    pub fn set_pair(&self, mode: PairMode, chat_id: i64, first: u64, second: u64) {
        self.pairs.insert(
            (mode, chat_id),
            PairEntry {
                first,
                second,
                cursor: 0,
            },
        );
    }

    pub fn pair(&self, mode: PairMode, chat_id: i64) -> Option<PairEntry> {
        self.pairs.get(&(mode, chat_id)).map(|p| *p)
    }

    pub fn remove_pair(&self, mode: PairMode, chat_id: i64) -> bool {
        self.pairs.remove(&(mode, chat_id)).is_some()
    }

    /// Advance a pair's phrasing cursor if it still reads `from`.
    pub fn advance_pair(&self, mode: PairMode, chat_id: i64, from: usize) -> bool {
        match self.pairs.get_mut(&(mode, chat_id)) {
            Some(mut pair) if pair.cursor == from => {
                pair.cursor = from.wrapping_add(1);
                true
            }
            _ => false,
        }
    }

    // --- Hide ---

    /// Hide users in a chat. Returns how many were newly hidden.
    pub fn hide(&self, chat_id: i64, users: &[u64]) -> usize {
        let mut set = self.hidden.entry(chat_id).or_default();
        users.iter().filter(|&&u| set.insert(u)).count()
    }

    /// Unhide users. Drops the chat's set once it is empty.
    pub fn unhide(&self, chat_id: i64, users: &[u64]) -> usize {
        let removed = match self.hidden.get_mut(&chat_id) {
            Some(mut set) => users.iter().filter(|u| set.remove(*u)).count(),
            None => return 0,
        };
        self.hidden.remove_if(&chat_id, |_, set| set.is_empty());
        removed
    }

    pub fn is_hidden(&self, chat_id: i64, user_id: u64) -> bool {
        self.hidden
            .get(&chat_id)
            .map(|set| set.contains(&user_id))
            .unwrap_or(false)
    }

    pub fn has_hidden(&self, chat_id: i64) -> bool {
        self.hidden.contains_key(&chat_id)
    }

    // --- Monitor ---

    /// Set the monitor flag. Returns the previous value.
    pub fn set_monitor(&self, chat_id: i64, enabled: bool) -> bool {
        if enabled {
            !self.monitored.insert(chat_id)
        } else {
            self.monitored.remove(&chat_id).is_some()
        }
    }

    pub fn is_monitored(&self, chat_id: i64) -> bool {
        self.monitored.contains(&chat_id)
    }

    // --- Sweeps ---

    /// Clear every target table, pair and hide set of one chat.
    /// The monitor flag is left alone.
    pub fn clear_chat(&self, chat_id: i64) {
        self.targets.retain(|(_, chat), _| *chat != chat_id);
        self.pairs.retain(|(_, chat), _| *chat != chat_id);
        self.hidden.remove(&chat_id);
    }

    /// Clear all in-memory state.
    pub fn clear(&self) {
        self.targets.clear();
        self.pairs.clear();
        self.hidden.clear();
        self.monitored.clear();
    }

    /// Every user currently referenced by a target table or pair.
    pub fn known_users(&self) -> HashSet<u64> {
        let mut users: HashSet<u64> = self
            .targets
            .iter()
            .flat_map(|entry| entry.value().keys().copied().collect::<Vec<_>>())
            .collect();
        for pair in self.pairs.iter() {
            users.insert(pair.first);
            users.insert(pair.second);
        }
        users
    }

    pub fn stats(&self) -> RegistryStats {
        use super::{LoopMode, ReactiveMode};

        let mut stats = RegistryStats::default();
        for entry in self.targets.iter() {
            let count = entry.value().len();
            match entry.key().0 {
                TargetKind::Loop(LoopMode::Fight) => stats.fight_targets += count,
                TargetKind::Loop(LoopMode::Love) => stats.love_targets += count,
                TargetKind::Reactive(ReactiveMode::Troll) => stats.troll_targets += count,
                TargetKind::Reactive(ReactiveMode::LoveTroll) => {
                    stats.love_troll_targets += count
                }
            }
        }
        for entry in self.pairs.iter() {
            match entry.key().0 {
                PairMode::Funny => stats.funny_pairs += 1,
                PairMode::LoveFunny => stats.love_funny_pairs += 1,
            }
        }
        stats.hidden_users = self.hidden.iter().map(|set| set.len()).sum();
        stats.monitored_chats = self.monitored.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{LoopMode, ReactiveMode};
    use std::sync::Arc;

    const FIGHT: TargetKind = TargetKind::Loop(LoopMode::Fight);
    const TROLL: TargetKind = TargetKind::Reactive(ReactiveMode::Troll);

    fn templates(texts: &[&str]) -> Vec<Template> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Template::new(i as i64 + 1, *t))
            .collect()
    }

    #[test]
    fn test_add_targets_is_idempotent() {
        let registry = TargetRegistry::new();
        assert_eq!(registry.add_targets(FIGHT, 1, &[42]), 1);
        assert!(registry.advance(FIGHT, 1, 42, 0));

        assert_eq!(registry.add_targets(FIGHT, 1, &[42]), 0);
        assert_eq!(registry.targets(FIGHT, 1), vec![42]);
        assert_eq!(registry.cursor(FIGHT, 1, 42), Some(1));
    }

    #[test]
    fn test_modes_are_independent() {
        let registry = TargetRegistry::new();
        registry.add_targets(FIGHT, 1, &[42]);
        assert!(!registry.contains(TROLL, 1, 42));
        assert!(!registry.contains(FIGHT, 2, 42));
    }

    #[test]
    fn test_next_template_cycles_through_list() {
        let registry = TargetRegistry::new();
        let list = templates(&["a", "b", "c"]);
        registry.add_targets(TROLL, 1, &[7]);

        let mut seen = Vec::new();
        for _ in 0..4 {
            match registry.next_template(TROLL, 1, 7, &list) {
                NextTemplate::Ready { text, cursor } => {
                    seen.push(text);
                    assert!(registry.advance(TROLL, 1, 7, cursor));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_empty_template_list_does_not_advance() {
        let registry = TargetRegistry::new();
        registry.add_targets(FIGHT, 1, &[42]);
        assert_eq!(registry.next_template(FIGHT, 1, 42, &[]), NextTemplate::NoTemplates);
        assert_eq!(registry.cursor(FIGHT, 1, 42), Some(0));
        assert_eq!(
            registry.next_template(FIGHT, 1, 99, &templates(&["a"])),
            NextTemplate::NotTargeted
        );
    }

    #[test]
    fn test_stale_advance_is_ignored() {
        let registry = TargetRegistry::new();
        registry.add_targets(TROLL, 1, &[7]);
        assert!(registry.advance(TROLL, 1, 7, 0));
        assert!(!registry.advance(TROLL, 1, 7, 0));
        assert_eq!(registry.cursor(TROLL, 1, 7), Some(1));
    }

    #[test]
    fn test_targets_iterate_in_ascending_order() {
        let registry = TargetRegistry::new();
        registry.add_targets(FIGHT, 1, &[30, 10, 20]);
        assert_eq!(registry.targets(FIGHT, 1), vec![10, 20, 30]);
    }

    #[test]
    fn test_hide_and_unhide() {
        let registry = TargetRegistry::new();
        assert_eq!(registry.hide(1, &[99, 98]), 2);
        assert!(registry.is_hidden(1, 99));
        assert_eq!(registry.unhide(1, &[99, 5]), 1);
        assert!(!registry.is_hidden(1, 99));
        assert_eq!(registry.unhide(1, &[98]), 1);
        assert!(!registry.has_hidden(1));
    }

    #[test]
    fn test_pair_partner() {
        let registry = TargetRegistry::new();
        registry.set_pair(PairMode::Funny, 1, 1, 2);
        let pair = registry.pair(PairMode::Funny, 1).unwrap();
        assert_eq!(pair.partner(1), Some(2));
        assert_eq!(pair.partner(2), Some(1));
        assert_eq!(pair.partner(3), None);
        assert!(registry.pair(PairMode::LoveFunny, 1).is_none());
    }

    #[test]
    fn test_clear_chat_keeps_other_chats_and_monitor() {
        let registry = TargetRegistry::new();
        registry.add_targets(FIGHT, 1, &[1]);
        registry.add_targets(TROLL, 2, &[2]);
        registry.set_pair(PairMode::Funny, 1, 3, 4);
        registry.hide(1, &[5]);
        registry.set_monitor(1, true);

        registry.clear_chat(1);

        assert!(registry.targets(FIGHT, 1).is_empty());
        assert!(registry.pair(PairMode::Funny, 1).is_none());
        assert!(!registry.is_hidden(1, 5));
        assert!(registry.is_monitored(1));
        assert_eq!(registry.targets(TROLL, 2), vec![2]);
    }

    #[test]
    fn test_monitor_flag_reports_previous_value() {
        let registry = TargetRegistry::new();
        assert!(!registry.set_monitor(1, true));
        assert!(registry.set_monitor(1, true));
        assert!(registry.set_monitor(1, false));
        assert!(!registry.is_monitored(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_targets_loses_nothing() {
        let registry = Arc::new(TargetRegistry::new());

        // Eight writers, 50 ids each; every writer shares ids 0..10 with the others.
        let writers: Vec<_> = (0..8u64)
            .map(|w| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let mut added = 0;
                    for i in 0..50u64 {
                        let user = if i < 10 { i } else { 1_000 * (w + 1) + i };
                        added += registry.add_targets(FIGHT, 1, &[user]);
                        tokio::task::yield_now().await;
                    }
                    added
                })
            })
            .collect();

        let mut added = 0;
        for writer in writers {
            added += writer.await.unwrap();
        }

        let targets = registry.targets(FIGHT, 1);
        assert_eq!(targets.len(), 10 + 8 * 40);
        assert_eq!(added, targets.len());
        assert!(targets.windows(2).all(|w| w[0] < w[1]));
    }
}
