//! Mode engine - broadcast loops, reactive replies and their shared state.
//!
//! ## Architecture
//!
//! - `registry` - per-chat target tables, pairs, hide sets, monitor flags
//! - `loops` - one background task per `(loop mode, chat)`
//! - `reactive` - per-message hide/monitor/troll/pair stages
//! - `engine` - operator control surface tying the above together
//! - `templates`, `names`, `messenger` - collaborator contracts
//!
//! Permission checks happen before any call reaches this module.

mod engine;
mod loops;
mod messenger;
mod names;
mod reactive;
mod registry;
mod templates;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

pub use engine::{tick_delay_from_secs, EngineStats, ModeEngine};
pub use loops::LoopManager;
pub use messenger::{Messenger, UserRef};
pub use names::{mention, NameResolver, NicknameStore};
pub use reactive::{Inbound, Outcome, ReactiveDispatcher};
pub use registry::TargetRegistry;
pub use templates::{Category, Template, TemplateStore};

/// Broadcast-loop modes: the bot posts on its own schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoopMode {
    Fight,
    Love,
}

/// Reactive modes: the bot answers each message of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReactiveMode {
    Troll,
    LoveTroll,
}

/// Pair modes: a message from one user is relayed at the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairMode {
    Funny,
    LoveFunny,
}

/// Which target table a cursor lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    Loop(LoopMode),
    Reactive(ReactiveMode),
}

impl LoopMode {
    pub fn category(self) -> Category {
        match self {
            Self::Fight => Category::Generic,
            Self::Love => Category::Affection,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fight => "fight",
            Self::Love => "love",
        }
    }

    /// Parse an operator argument such as `fight` or `love`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "fight" => Some(Self::Fight),
            "love" => Some(Self::Love),
            _ => None,
        }
    }
}

impl ReactiveMode {
    pub fn category(self) -> Category {
        match self {
            Self::Troll => Category::Generic,
            Self::LoveTroll => Category::Affection,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Troll => "troll",
            Self::LoveTroll => "love_troll",
        }
    }
}

impl PairMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Funny => "funny",
            Self::LoveFunny => "love_funny",
        }
    }
}

impl From<LoopMode> for TargetKind {
    fn from(mode: LoopMode) -> Self {
        Self::Loop(mode)
    }
}

impl From<ReactiveMode> for TargetKind {
    fn from(mode: ReactiveMode) -> Self {
        Self::Reactive(mode)
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ReactiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PairMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loop(mode) => mode.fmt(f),
            Self::Reactive(mode) => mode.fmt(f),
        }
    }
}
