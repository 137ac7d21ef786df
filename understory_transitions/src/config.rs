// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.

use alloc::string::String;

/// Runtime options of a [`TransitionsEngine`](crate::TransitionsEngine).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Tag recorded on every pass span, to tell engines apart in traces.
    pub log_tag: Option<String>,
    /// Warn when a completion arrives for an id that was never animating.
    pub debug_animations: bool,
}

impl EngineConfig {
    /// Set the log tag.
    #[must_use]
    pub fn with_log_tag(mut self, tag: &str) -> Self {
        self.log_tag = Some(tag.into());
        self
    }

    /// Enable or disable animation debugging.
    #[must_use]
    pub fn with_debug_animations(mut self, enabled: bool) -> Self {
        self.debug_animations = enabled;
        self
    }

    pub(crate) fn tag(&self) -> &str {
        self.log_tag.as_deref().unwrap_or("")
    }
}
