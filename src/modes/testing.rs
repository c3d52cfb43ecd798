//! In-memory collaborators for engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    Category, LoopManager, Messenger, ModeEngine, NameResolver, NicknameStore,
    ReactiveDispatcher, Template, TemplateStore, TargetRegistry, UserRef,
};
use crate::error::{BotError, BotResult};

/// One successful outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub chat_id: i64,
    pub reply_to: Option<i32>,
    pub text: String,
}

/// Messenger double that records sends and can be told to fail.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    deleted: Mutex<Vec<(i64, i32)>>,
    names: Mutex<HashMap<u64, String>>,
    handles: Mutex<HashMap<String, u64>>,
    failing_sends: AtomicUsize,
    deny_delete: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&self, user_id: u64, name: &str) {
        self.names.lock().insert(user_id, name.to_string());
    }

    pub fn set_handle(&self, handle: &str, user_id: u64) {
        self.handles.lock().insert(handle.to_string(), user_id);
    }

    /// Make the next `n` send/send_reply calls fail.
    pub fn fail_next_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    pub fn deny_delete(&self, deny: bool) {
        self.deny_delete.store(deny, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn deleted(&self) -> Vec<(i64, i32)> {
        self.deleted.lock().clone()
    }

    fn take_failure(&self) -> bool {
        self.failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn record(&self, chat_id: i64, reply_to: Option<i32>, text: &str) -> BotResult<()> {
        if self.take_failure() {
            return Err(BotError::TransientSend("injected failure".into()));
        }
        self.sent.lock().push(Sent {
            chat_id,
            reply_to,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn resolve_user(&self, user: &UserRef) -> BotResult<u64> {
        match user {
            UserRef::Id(id) => Ok(*id),
            UserRef::Handle(handle) => self
                .handles
                .lock()
                .get(handle)
                .copied()
                .ok_or_else(|| BotError::NotFound(handle.clone())),
        }
    }

    async fn send(&self, chat_id: i64, text: &str) -> BotResult<()> {
        self.record(chat_id, None, text)
    }

    async fn send_reply(&self, chat_id: i64, message_id: i32, text: &str) -> BotResult<()> {
        self.record(chat_id, Some(message_id), text)
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> BotResult<()> {
        if self.deny_delete.load(Ordering::SeqCst) {
            return Err(BotError::PermissionDenied("cannot delete".into()));
        }
        self.deleted.lock().push((chat_id, message_id));
        Ok(())
    }

    async fn display_name(&self, user_id: u64) -> BotResult<String> {
        self.names
            .lock()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| BotError::NotFound(user_id.to_string()))
    }
}

/// Template store backed by a vector per category.
#[derive(Default)]
pub struct MemoryTemplates {
    next_id: AtomicI64,
    items: Mutex<HashMap<Category, Vec<Template>>>,
}

#[async_trait]
impl TemplateStore for MemoryTemplates {
    async fn add(&self, category: Category, text: &str) -> anyhow::Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.items
            .lock()
            .entry(category)
            .or_default()
            .push(Template::new(id, text));
        Ok(id)
    }

    async fn list(&self, category: Category) -> anyhow::Result<Vec<Template>> {
        Ok(self.items.lock().get(&category).cloned().unwrap_or_default())
    }

    async fn remove(&self, category: Category, id: i64) -> anyhow::Result<bool> {
        let mut items = self.items.lock();
        let Some(list) = items.get_mut(&category) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|t| t.id != id);
        Ok(list.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryNicknames {
    items: Mutex<HashMap<u64, String>>,
}

impl MemoryNicknames {
    pub fn set(&self, user_id: u64, nickname: &str) {
        self.items.lock().insert(user_id, nickname.to_string());
    }
}

#[async_trait]
impl NicknameStore for MemoryNicknames {
    async fn nickname(&self, user_id: u64) -> anyhow::Result<Option<String>> {
        Ok(self.items.lock().get(&user_id).cloned())
    }
}

/// Wiring of a registry with in-memory collaborators.
pub struct Harness {
    pub registry: Arc<TargetRegistry>,
    pub templates: Arc<MemoryTemplates>,
    pub nicknames: Arc<MemoryNicknames>,
    pub messenger: Arc<RecordingMessenger>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(TargetRegistry::new()),
            templates: Arc::new(MemoryTemplates::default()),
            nicknames: Arc::new(MemoryNicknames::default()),
            messenger: Arc::new(RecordingMessenger::new()),
        }
    }

    pub fn names(&self) -> NameResolver {
        NameResolver::new(self.nicknames.clone(), self.messenger.clone())
    }

    pub fn loops(&self, delay: Duration) -> LoopManager {
        LoopManager::new(
            self.registry.clone(),
            self.templates.clone(),
            self.names(),
            self.messenger.clone(),
            delay,
        )
    }

    pub fn dispatcher(&self, operators: Vec<u64>) -> ReactiveDispatcher {
        ReactiveDispatcher::new(
            self.registry.clone(),
            self.templates.clone(),
            self.names(),
            self.messenger.clone(),
            operators,
        )
    }

    pub fn engine(&self, operators: Vec<u64>, delay: Duration) -> ModeEngine {
        ModeEngine::new(
            self.registry.clone(),
            self.templates.clone(),
            self.names(),
            self.messenger.clone(),
            operators,
            delay,
        )
    }

    pub async fn add_templates(&self, category: Category, texts: &[&str]) {
        for text in texts {
            self.templates.add(category, text).await.unwrap();
        }
    }
}
