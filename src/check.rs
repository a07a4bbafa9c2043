//! Guard macros that validate a value and escape the enclosing scope when
//! the check fails.
//!
//! Every check comes in three shapes, picked by the escape it performs:
//!
//! * `*_return!(x, ret, fmt, ..)` returns `ret` from the enclosing function
//! * `*_goto!(x, 'label, fmt, ..)` breaks out of the labeled block `'label`
//! * `*_exit!(x, fmt, ..)` returns `()`
//!
//! What a failure does is fixed at build time by [`MODE`]:
//!
//! ```
//! use esp_utils::{check_error_return, check_null_goto, error::EspErr};
//!
//! fn open(handle: Option<&u32>, code: i32) -> i32 {
//!     check_error_return!(code, -1, "open failed");
//!
//!     let mut result = 0;
//!     'cleanup: {
//!         check_null_goto!(handle, 'cleanup, "no handle");
//!         result = 1;
//!     }
//!     result
//! }
//!
//! assert_eq!(open(Some(&5), 0), 1);
//! # if esp_utils::check::MODE == esp_utils::check::CheckMode::ErrorLog {
//! assert_eq!(open(Some(&5), EspErr::FAIL.code()), -1);
//! assert_eq!(open(None, 0), 0);
//! # }
//! ```

use core::{fmt, ptr::NonNull};

use crate::{
    config,
    error::EspErr,
    logging::{LogLevel, Logger, Sink},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Values are evaluated, never checked.
    Disabled,
    /// A failed check panics.
    Assert,
    /// A failed check logs an error line, then escapes.
    ErrorLog,
    /// A failed check escapes without output.
    Silent,
}

pub const MODE: CheckMode = if !config::ENABLE_CHECK {
    CheckMode::Disabled
} else if config::CHECK_WITH_ASSERT {
    CheckMode::Assert
} else if config::CHECK_WITH_ERROR_LOG {
    CheckMode::ErrorLog
} else {
    CheckMode::Silent
};

/// What the caller of a guard has to do next.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Escape,
}

impl Flow {
    #[inline(always)]
    pub fn is_escape(self) -> bool {
        self == Flow::Escape
    }
}

impl CheckMode {
    /// Decides the outcome of one check. `report` runs only when a failure
    /// is to be logged.
    #[inline(always)]
    pub fn guard(self, passed: bool, what: &str, report: impl FnOnce()) -> Flow {
        match self {
            CheckMode::Disabled => Flow::Continue,
            _ if passed => Flow::Continue,
            CheckMode::Assert => panic!("assertion failed: {}", what),
            CheckMode::ErrorLog => {
                report();
                Flow::Escape
            }
            CheckMode::Silent => Flow::Escape,
        }
    }
}

/// Values with a null state, checked by the `check_null_*` macros.
pub trait IsNull {
    fn is_null_value(&self) -> bool;
}

impl<T: ?Sized> IsNull for *const T {
    fn is_null_value(&self) -> bool {
        self.is_null()
    }
}

impl<T: ?Sized> IsNull for *mut T {
    fn is_null_value(&self) -> bool {
        self.is_null()
    }
}

impl<T> IsNull for Option<T> {
    fn is_null_value(&self) -> bool {
        self.is_none()
    }
}

impl<T: ?Sized> IsNull for NonNull<T> {
    fn is_null_value(&self) -> bool {
        false
    }
}

impl<T: IsNull + ?Sized> IsNull for &T {
    fn is_null_value(&self) -> bool {
        (**self).is_null_value()
    }
}

/// Logs the message of a failed check at ERROR.
#[doc(hidden)]
pub fn report<S: Sink, const N: usize>(
    logger: &Logger<S, N>,
    file: &str,
    line: u32,
    func: &str,
    args: fmt::Arguments<'_>,
) {
    logger.print(LogLevel::Error, config::LOG_TAG, file, line, func, args);
}

/// Logs the message of a failed error-code check with the code's name
/// appended, e.g. `open failed [ESP_ERR_TIMEOUT]`.
#[doc(hidden)]
pub fn report_error<S: Sink, const N: usize>(
    logger: &Logger<S, N>,
    file: &str,
    line: u32,
    func: &str,
    err: EspErr,
    args: fmt::Arguments<'_>,
) {
    report(logger, file, line, func, format_args!("{} [{}]", args, err.name()));
}

/// Logs the intercepted error, then the message of the check.
#[doc(hidden)]
pub fn report_exception<S: Sink, const N: usize>(
    logger: &Logger<S, N>,
    file: &str,
    line: u32,
    func: &str,
    error: &dyn fmt::Display,
    args: fmt::Arguments<'_>,
) {
    report(logger, file, line, func, format_args!("Exception caught: {}", error));
    report(logger, file, line, func, args);
}

#[doc(hidden)]
#[macro_export]
macro_rules! __check_report {
    ($report:ident, [$($extra:expr),*], ($($arg:tt)+)) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Error) {
            $crate::check::$report(
                &$crate::logging::LOGGER,
                ::core::file!(),
                ::core::line!(),
                $crate::function_name!(),
                $($extra,)*
                ::core::format_args!($($arg)+),
            )
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __check_null {
    ($x:expr, $($arg:tt)+) => {
        $crate::check::MODE
            .guard(
                !$crate::check::IsNull::is_null_value(&$x),
                ::core::stringify!($x),
                || $crate::__check_report!(report, [], ($($arg)+)),
            )
            .is_escape()
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __check_false {
    ($x:expr, $($arg:tt)+) => {
        $crate::check::MODE
            .guard($x, ::core::stringify!($x), || {
                $crate::__check_report!(report, [], ($($arg)+))
            })
            .is_escape()
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __check_error {
    ($x:expr, $($arg:tt)+) => {{
        let err = $crate::error::EspErr::from($x);
        $crate::check::MODE
            .guard(err.is_ok(), ::core::stringify!($x), || {
                $crate::__check_report!(report_error, [err], ($($arg)+))
            })
            .is_escape()
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __check_exception {
    ($x:expr, $($arg:tt)+) => {
        match $x {
            ::core::result::Result::Ok(_) => false,
            ::core::result::Result::Err(e) => $crate::check::MODE
                .guard(false, ::core::stringify!($x), || {
                    $crate::__check_report!(report_exception, [&e], ($($arg)+))
                })
                .is_escape(),
        }
    };
}

/// Returns `$ret` if `$x` is null.
#[macro_export]
macro_rules! check_null_return {
    ($x:expr, $ret:expr, $($arg:tt)+) => {
        if $crate::__check_null!($x, $($arg)+) {
            return $ret;
        }
    };
}

/// Breaks out of `$label` if `$x` is null.
#[macro_export]
macro_rules! check_null_goto {
    ($x:expr, $label:lifetime, $($arg:tt)+) => {
        if $crate::__check_null!($x, $($arg)+) {
            break $label;
        }
    };
}

/// Returns `()` if `$x` is null.
#[macro_export]
macro_rules! check_null_exit {
    ($x:expr, $($arg:tt)+) => {
        if $crate::__check_null!($x, $($arg)+) {
            return;
        }
    };
}

/// Returns `$ret` if `$x` is false.
#[macro_export]
macro_rules! check_false_return {
    ($x:expr, $ret:expr, $($arg:tt)+) => {
        if $crate::__check_false!($x, $($arg)+) {
            return $ret;
        }
    };
}

/// Breaks out of `$label` if `$x` is false.
#[macro_export]
macro_rules! check_false_goto {
    ($x:expr, $label:lifetime, $($arg:tt)+) => {
        if $crate::__check_false!($x, $($arg)+) {
            break $label;
        }
    };
}

/// Returns `()` if `$x` is false.
#[macro_export]
macro_rules! check_false_exit {
    ($x:expr, $($arg:tt)+) => {
        if $crate::__check_false!($x, $($arg)+) {
            return;
        }
    };
}

/// Returns `$ret` if the error code `$x` is not `ESP_OK`. The code's name
/// is appended to the message.
#[macro_export]
macro_rules! check_error_return {
    ($x:expr, $ret:expr, $($arg:tt)+) => {
        if $crate::__check_error!($x, $($arg)+) {
            return $ret;
        }
    };
}

/// Breaks out of `$label` if the error code `$x` is not `ESP_OK`.
#[macro_export]
macro_rules! check_error_goto {
    ($x:expr, $label:lifetime, $($arg:tt)+) => {
        if $crate::__check_error!($x, $($arg)+) {
            break $label;
        }
    };
}

/// Returns `()` if the error code `$x` is not `ESP_OK`.
#[macro_export]
macro_rules! check_error_exit {
    ($x:expr, $($arg:tt)+) => {
        if $crate::__check_error!($x, $($arg)+) {
            return;
        }
    };
}

/// Evaluates the `Result` expression `$x` and returns `$ret` on `Err`.
#[macro_export]
macro_rules! check_exception_return {
    ($x:expr, $ret:expr, $($arg:tt)+) => {
        if $crate::__check_exception!($x, $($arg)+) {
            return $ret;
        }
    };
}

/// Evaluates the `Result` expression `$x` and breaks out of `$label` on `Err`.
#[macro_export]
macro_rules! check_exception_goto {
    ($x:expr, $label:lifetime, $($arg:tt)+) => {
        if $crate::__check_exception!($x, $($arg)+) {
            break $label;
        }
    };
}

/// Evaluates the `Result` expression `$x` and returns `()` on `Err`.
#[macro_export]
macro_rules! check_exception_exit {
    ($x:expr, $($arg:tt)+) => {
        if $crate::__check_exception!($x, $($arg)+) {
            return;
        }
    };
}
