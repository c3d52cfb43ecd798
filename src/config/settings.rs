//! Switches owners change at runtime. Not persisted.

use parking_lot::RwLock;

const DEFAULT_WELCOME: &str = "🎉 Welcome {name}! Thanks for joining the group.";

#[derive(Debug, Clone)]
struct SettingsState {
    speed_for_admins: bool,
    welcome_enabled: bool,
    welcome_text: String,
}

/// Runtime settings shared by every handler.
#[derive(Debug)]
pub struct RuntimeSettings {
    state: RwLock<SettingsState>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            state: RwLock::new(SettingsState {
                speed_for_admins: false,
                welcome_enabled: false,
                welcome_text: DEFAULT_WELCOME.to_string(),
            }),
        }
    }
}

impl RuntimeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether admins (not only owners) may change the tick delay.
    pub fn speed_for_admins(&self) -> bool {
        self.state.read().speed_for_admins
    }

    pub fn set_speed_for_admins(&self, enabled: bool) {
        self.state.write().speed_for_admins = enabled;
    }

    pub fn welcome_enabled(&self) -> bool {
        self.state.read().welcome_enabled
    }

    /// Flip welcome mode. Returns the new value.
    pub fn toggle_welcome(&self) -> bool {
        let mut state = self.state.write();
        state.welcome_enabled = !state.welcome_enabled;
        state.welcome_enabled
    }

    pub fn welcome_text(&self) -> String {
        self.state.read().welcome_text.clone()
    }

    pub fn set_welcome_text(&self, text: &str) {
        self.state.write().welcome_text = text.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RuntimeSettings::new();
        assert!(!settings.speed_for_admins());
        assert!(!settings.welcome_enabled());
        assert!(settings.welcome_text().contains("{name}"));
    }

    #[test]
    fn test_toggle_and_set_welcome() {
        let settings = RuntimeSettings::new();
        assert!(settings.toggle_welcome());
        settings.set_welcome_text("Hi {name} ({username})");
        assert_eq!(settings.welcome_text(), "Hi {name} ({username})");
        assert!(!settings.toggle_welcome());
    }
}
