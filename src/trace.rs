//! Enter/Exit lines around a scope.

use crate::{
    config,
    logging::{LogLevel, Logger, Sink},
};

/// Logs `Enter` when created and `Exit` when dropped, so early returns are
/// still traced.
pub struct ScopeTrace<'a, S: Sink, const N: usize> {
    logger: &'a Logger<S, N>,
    tag: &'a str,
    file: &'static str,
    line: u32,
    func: &'static str,
    this: Option<*const ()>,
}

impl<'a, S: Sink, const N: usize> ScopeTrace<'a, S, N> {
    /// Starts a trace if tracing is compiled in and DEBUG passes `logger`.
    pub fn enter(
        logger: &'a Logger<S, N>,
        tag: &'a str,
        file: &'static str,
        line: u32,
        func: &'static str,
        this: Option<*const ()>,
    ) -> Option<Self> {
        if !config::ENABLE_LOG_TRACE || !logger.is_enabled(LogLevel::Debug) {
            return None;
        }
        Some(Self::new(logger, tag, file, line, func, this))
    }

    pub fn new(
        logger: &'a Logger<S, N>,
        tag: &'a str,
        file: &'static str,
        line: u32,
        func: &'static str,
        this: Option<*const ()>,
    ) -> Self {
        let trace = Self {
            logger,
            tag,
            file,
            line,
            func,
            this,
        };
        trace.emit("Enter");
        trace
    }

    fn emit(&self, what: &str) {
        match self.this {
            Some(this) => self.logger.print(
                LogLevel::Debug,
                self.tag,
                self.file,
                self.line,
                self.func,
                format_args!("(@{:p}) {}", this, what),
            ),
            None => self.logger.print(
                LogLevel::Debug,
                self.tag,
                self.file,
                self.line,
                self.func,
                format_args!("{}", what),
            ),
        }
    }
}

impl<S: Sink, const N: usize> Drop for ScopeTrace<'_, S, N> {
    fn drop(&mut self) {
        self.emit("Exit");
    }
}

/// Address used to tell instances apart in trace lines.
pub fn identity<T: ?Sized>(this: &T) -> *const () {
    this as *const T as *const ()
}

/// Traces the rest of the enclosing scope, optionally tagged with an
/// instance: `log_trace_guard!(self)`.
#[macro_export]
macro_rules! log_trace_guard {
    () => {
        let _log_trace_guard = $crate::trace::ScopeTrace::enter(
            &$crate::logging::LOGGER,
            $crate::config::LOG_TAG,
            ::core::file!(),
            ::core::line!(),
            $crate::function_name!(),
            ::core::option::Option::None,
        );
    };
    ($this:expr) => {
        let _log_trace_guard = $crate::trace::ScopeTrace::enter(
            &$crate::logging::LOGGER,
            $crate::config::LOG_TAG,
            ::core::file!(),
            ::core::line!(),
            $crate::function_name!(),
            ::core::option::Option::Some($crate::trace::identity($this)),
        );
    };
}

#[macro_export]
macro_rules! log_trace_enter {
    () => {
        if $crate::config::ENABLE_LOG_TRACE {
            $crate::log_d!("Enter")
        }
    };
    ($this:expr) => {
        if $crate::config::ENABLE_LOG_TRACE {
            $crate::log_d!("(@{:p}) Enter", $crate::trace::identity($this))
        }
    };
}

#[macro_export]
macro_rules! log_trace_exit {
    () => {
        if $crate::config::ENABLE_LOG_TRACE {
            $crate::log_d!("Exit")
        }
    };
    ($this:expr) => {
        if $crate::config::ENABLE_LOG_TRACE {
            $crate::log_d!("(@{:p}) Exit", $crate::trace::identity($this))
        }
    };
}
