use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Immutable animation settings for one typing controller.
///
/// Built by merging [`AnimationOverrides`] over [`AnimationConfig::default`].
/// `delete_speed_ms` and `loop_enabled` are carried but no code path reads
/// them yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimationConfig {
    pub type_speed_ms: u64,
    pub delete_speed_ms: u64,
    pub initial_delay_ms: u64,
    pub loop_enabled: bool,
    pub show_cursor: bool,
    pub cursor_char: char,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            type_speed_ms: 100,
            delete_speed_ms: 50,
            initial_delay_ms: 1000,
            loop_enabled: false,
            show_cursor: true,
            cursor_char: '|',
        }
    }
}

impl AnimationConfig {
    pub fn merged(overrides: &AnimationOverrides) -> Self {
        let defaults = Self::default();
        Self {
            type_speed_ms: overrides.type_speed_ms.unwrap_or(defaults.type_speed_ms),
            delete_speed_ms: overrides
                .delete_speed_ms
                .unwrap_or(defaults.delete_speed_ms),
            initial_delay_ms: overrides
                .initial_delay_ms
                .unwrap_or(defaults.initial_delay_ms),
            loop_enabled: overrides.loop_enabled.unwrap_or(defaults.loop_enabled),
            show_cursor: overrides.show_cursor.unwrap_or(defaults.show_cursor),
            cursor_char: overrides.cursor_char.unwrap_or(defaults.cursor_char),
        }
    }

    pub fn type_speed(&self) -> Duration {
        Duration::from_millis(self.type_speed_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// Caller-supplied options; every unset field falls back to the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationOverrides {
    pub type_speed_ms: Option<u64>,
    pub delete_speed_ms: Option<u64>,
    pub initial_delay_ms: Option<u64>,
    pub loop_enabled: Option<bool>,
    pub show_cursor: Option<bool>,
    pub cursor_char: Option<char>,
}

impl AnimationOverrides {
    /// The settings the bootstrapped page uses: slower typing for readability
    /// and a longer lead-in.
    pub fn widget() -> Self {
        Self {
            type_speed_ms: Some(120),
            initial_delay_ms: Some(1500),
            show_cursor: Some(true),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn overlay(self, other: &AnimationOverrides) -> Self {
        Self {
            type_speed_ms: other.type_speed_ms.or(self.type_speed_ms),
            delete_speed_ms: other.delete_speed_ms.or(self.delete_speed_ms),
            initial_delay_ms: other.initial_delay_ms.or(self.initial_delay_ms),
            loop_enabled: other.loop_enabled.or(self.loop_enabled),
            show_cursor: other.show_cursor.or(self.show_cursor),
            cursor_char: other.cursor_char.or(self.cursor_char),
        }
    }
}
