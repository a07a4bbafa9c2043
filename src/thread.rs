//! Attributes for threads the application is about to create.
//!
//! Creating, joining and tearing down threads is left to the caller; this
//! only carries the settings and scopes which ones are pending.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::log_i;

pub const DEFAULT_PRIORITY: usize = 5;
pub const DEFAULT_STACK_SIZE: usize = 3072;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadConfig {
    pub name: Option<&'static str>,
    /// `None` lets the scheduler pick a core.
    pub core_id: Option<u8>,
    pub priority: usize,
    pub stack_size: usize,
    /// Put the stack in external RAM.
    pub stack_in_ext: bool,
}

impl ThreadConfig {
    pub const fn new() -> Self {
        Self {
            name: None,
            core_id: None,
            priority: DEFAULT_PRIORITY,
            stack_size: DEFAULT_STACK_SIZE,
            stack_in_ext: false,
        }
    }

    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub const fn with_core(mut self, core_id: u8) -> Self {
        self.core_id = Some(core_id);
        self
    }

    pub const fn with_priority(mut self, priority: usize) -> Self {
        self.priority = priority;
        self
    }

    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub const fn with_stack_in_ext(mut self, stack_in_ext: bool) -> Self {
        self.stack_in_ext = stack_in_ext;
        self
    }

    pub fn dump(&self) {
        log_i!(
            "Thread config: name({}), core_id({}), priority({}), stack_size({}), stack_in_ext({})",
            self.name.unwrap_or("none"),
            self.core_id.map_or(-1, i16::from),
            self.priority,
            self.stack_size,
            self.stack_in_ext
        );
    }

    /// Configuration the next created thread should use.
    pub fn pending() -> Self {
        PENDING.lock(|pending| pending.get()).unwrap_or_default()
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self::new()
    }
}

static PENDING: Mutex<CriticalSectionRawMutex, Cell<Option<ThreadConfig>>> = Mutex::new(Cell::new(None));

/// Makes a config pending for as long as the guard lives, then puts back
/// whatever was pending before.
#[must_use]
pub struct ThreadConfigGuard {
    previous: Option<ThreadConfig>,
}

impl ThreadConfigGuard {
    pub fn new(config: ThreadConfig) -> Self {
        let previous = PENDING.lock(|pending| pending.replace(Some(config)));
        Self { previous }
    }
}

impl Drop for ThreadConfigGuard {
    fn drop(&mut self) {
        PENDING.lock(|pending| pending.set(self.previous));
    }
}
