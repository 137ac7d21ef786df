// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owning-thread checks.
//!
//! The engine is single threaded and every entry point must be called from
//! the thread that created it. With the `std` feature the check is real;
//! without it there is no thread identity to compare and the check is a no-op.

/// Remembers the thread that created its owner.
#[derive(Clone, Debug)]
pub(crate) struct ThreadAffinity {
    #[cfg(feature = "std")]
    owner: std::thread::ThreadId,
}

impl ThreadAffinity {
    /// Bind to the current thread.
    pub(crate) fn current() -> Self {
        Self {
            #[cfg(feature = "std")]
            owner: std::thread::current().id(),
        }
    }

    /// Panic if called off the owning thread.
    #[track_caller]
    pub(crate) fn assert_current(&self) {
        #[cfg(feature = "std")]
        assert_eq!(
            std::thread::current().id(),
            self.owner,
            "transitions engine used off its owning thread"
        );
    }
}
