use core::{
    cell::RefCell,
    fmt::{self, Write},
};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::String;
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::config;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [Self::Debug, Self::Info, Self::Warning, Self::Error];

    /// Fixed-width label used in the emitted line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => " INFO",
            Self::Warning => " WARN",
            Self::Error => "ERROR",
        }
    }

    /// Parses a configuration value: a level name or its number.
    pub const fn from_config(value: &str) -> Option<Self> {
        match value.as_bytes() {
            b"0" | b"debug" | b"DEBUG" => Some(Self::Debug),
            b"1" | b"info" | b"INFO" => Some(Self::Info),
            b"2" | b"warn" | b"WARN" | b"warning" | b"WARNING" => Some(Self::Warning),
            b"3" | b"error" | b"ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub const fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::Trace,
            Self::Info => LevelFilter::Info,
            Self::Warning => LevelFilter::Warn,
            Self::Error => LevelFilter::Error,
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace | Level::Debug => Self::Debug,
            Level::Info => Self::Info,
            Level::Warn => Self::Warning,
            Level::Error => Self::Error,
        }
    }
}

/// Whether the crate-wide configuration lets `level` through.
#[inline(always)]
pub const fn enabled(level: LogLevel) -> bool {
    config::ENABLE_LOG && level as u8 >= config::LOG_LEVEL as u8
}

/// Returns the last segment of a `/` or `\` separated path.
pub fn extract_file_name(path: &str) -> &str {
    match path.rfind('/').or_else(|| path.rfind('\\')) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[doc(hidden)]
pub fn function_from_path(path: &'static str) -> &'static str {
    let path = path.strip_suffix("::f").unwrap_or(path);
    path.rsplit("::")
        .find(|segment| *segment != "{{closure}}")
        .unwrap_or(path)
}

/// Where finished lines go.
pub trait Sink {
    fn emit(&self, line: fmt::Arguments<'_>);
}

impl<S: Sink + ?Sized> Sink for &S {
    fn emit(&self, line: fmt::Arguments<'_>) {
        (**self).emit(line)
    }
}

/// Prints to the chip's console, or stdout on a host.
pub struct Console;

impl Sink for Console {
    fn emit(&self, line: fmt::Arguments<'_>) {
        cfg_if::cfg_if! {
            if #[cfg(feature = "esp-println")] {
                esp_println::println!("{}", line);
            } else if #[cfg(any(test, feature = "std"))] {
                std::println!("{}", line);
            } else {
                let _ = line;
            }
        }
    }
}

/// Silently cuts the message at `N - 1` bytes, on a char boundary.
///
/// Once a chunk has been cut nothing more is taken, so the buffer always
/// holds a prefix of the full message.
struct Truncate<'a, const N: usize> {
    buffer: &'a mut String<N>,
    full: bool,
}

impl<'a, const N: usize> Truncate<'a, N> {
    fn new(buffer: &'a mut String<N>) -> Self {
        Self { buffer, full: false }
    }
}

impl<const N: usize> Write for Truncate<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.full {
            return Ok(());
        }

        let room = N.saturating_sub(1).saturating_sub(self.buffer.len());
        let mut end = s.len().min(room);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        if end < s.len() {
            self.full = true;
        }
        // Cannot overflow, `end` fits in `room`
        let _ = self.buffer.push_str(&s[..end]);
        Ok(())
    }
}

/// Level-filtered logger formatting into a fixed `N` byte buffer.
///
/// The buffer sits behind a critical-section mutex so concurrent callers
/// never interleave; the lock is held for format plus emit only.
pub struct Logger<S, const N: usize> {
    threshold: LogLevel,
    sink: S,
    buffer: Mutex<CriticalSectionRawMutex, RefCell<String<N>>>,
}

impl<S: Sink, const N: usize> Logger<S, N> {
    pub const fn new(threshold: LogLevel, sink: S) -> Self {
        Self {
            threshold,
            sink,
            buffer: Mutex::new(RefCell::new(String::new())),
        }
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        config::ENABLE_LOG && level >= self.threshold
    }

    pub fn print(
        &self,
        level: LogLevel,
        tag: &str,
        file: &str,
        line: u32,
        func: &str,
        args: fmt::Arguments<'_>,
    ) {
        if !self.is_enabled(level) {
            return;
        }

        self.buffer.lock(|buffer| {
            // Already borrowed means the arguments themselves are logging
            let Ok(mut buffer) = buffer.try_borrow_mut() else {
                return;
            };

            buffer.clear();
            let _ = Truncate::new(&mut *buffer).write_fmt(args);

            self.sink.emit(format_args!(
                "[{}][{}][{}:{:04}]({}): {}",
                tag,
                level.as_str(),
                extract_file_name(file),
                line,
                func,
                buffer.as_str()
            ));
        });
    }
}

impl<S: Sink + Send + Sync, const N: usize> Log for Logger<S, N> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.is_enabled(metadata.level().into())
    }

    fn log(&self, record: &Record) {
        self.print(
            record.level().into(),
            record.target(),
            record.file().unwrap_or("??"),
            record.line().unwrap_or(0),
            record.module_path().unwrap_or("??"),
            *record.args(),
        );
    }

    fn flush(&self) {}
}

pub type GlobalLogger = Logger<Console, { config::LOG_BUFFER_SIZE }>;

pub static LOGGER: GlobalLogger = Logger::new(config::LOG_LEVEL, Console);

/// Routes the `log` crate through [`LOGGER`].
///
/// Call once at the start of execution.
pub fn setup() {
    let level = if config::ENABLE_LOG {
        config::LOG_LEVEL.to_level_filter()
    } else {
        LevelFilter::Off
    };

    cfg_if::cfg_if! {
        if #[cfg(any(test, feature = "std"))] {
            if log::set_logger(&LOGGER).is_err() {
                // Someone else got there first
                return;
            }
            log::set_max_level(level);
        } else {
            // SAFETY:
            // This function must be called once at the beginning of execution.
            let result = unsafe { log::set_logger_racy(&LOGGER) };

            if result.is_err() {
                return;
            }

            // SAFETY:
            // This function must be called once at the beginning of execution.
            unsafe { log::set_max_level_racy(level) };
        }
    }

    crate::log_d!("Logger is ready");
}

/// Name of the enclosing function.
#[doc(hidden)]
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        $crate::logging::function_from_path(type_name_of(f))
    }};
}

/// Logs at `level`, optionally with an explicit `tag:`.
///
/// Arguments are not evaluated when the level is filtered out by the
/// build configuration.
#[macro_export]
macro_rules! log_at {
    ($level:expr, tag: $tag:expr, $($arg:tt)+) => {{
        let level: $crate::logging::LogLevel = $level;
        if $crate::logging::enabled(level) {
            $crate::logging::LOGGER.print(
                level,
                $tag,
                ::core::file!(),
                ::core::line!(),
                $crate::function_name!(),
                ::core::format_args!($($arg)+),
            );
        }
    }};
    ($level:expr, $($arg:tt)+) => {
        $crate::log_at!($level, tag: $crate::config::LOG_TAG, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_d {
    ($($arg:tt)+) => { $crate::log_at!($crate::logging::LogLevel::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! log_i {
    ($($arg:tt)+) => { $crate::log_at!($crate::logging::LogLevel::Info, $($arg)+) };
}

#[macro_export]
macro_rules! log_w {
    ($($arg:tt)+) => { $crate::log_at!($crate::logging::LogLevel::Warning, $($arg)+) };
}

#[macro_export]
macro_rules! log_e {
    ($($arg:tt)+) => { $crate::log_at!($crate::logging::LogLevel::Error, $($arg)+) };
}

#[cfg(all(test, feature = "enable-log"))]
mod tests {
    use super::{extract_file_name, LogLevel, Logger, Sink};
    use core::fmt;
    use log::{Level, Log, Record};
    use std::{
        string::{String, ToString},
        sync::Mutex,
        vec::Vec,
    };

    struct Capture(Mutex<Vec<String>>);

    impl Capture {
        const fn new() -> Self {
            Self(Mutex::new(Vec::new()))
        }

        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Sink for Capture {
        fn emit(&self, line: fmt::Arguments<'_>) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    fn body(line: &str) -> &str {
        line.split_once("): ").unwrap().1
    }

    #[test]
    fn filters_every_level_against_every_threshold() {
        for threshold in LogLevel::ALL {
            for level in LogLevel::ALL {
                let logger = Logger::<_, 64>::new(threshold, Capture::new());
                logger.print(level, "T", "f.rs", 1, "f", format_args!("msg"));

                let lines = logger.sink().lines();
                if level >= threshold {
                    assert_eq!(lines.len(), 1, "{level:?} at threshold {threshold:?}");
                } else {
                    assert!(lines.is_empty(), "{level:?} leaked at threshold {threshold:?}");
                }
            }
        }
    }

    #[test]
    fn filtered_call_does_not_format() {
        struct Bomb;
        impl fmt::Display for Bomb {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("formatted a filtered message");
            }
        }

        let logger = Logger::<_, 64>::new(LogLevel::Error, Capture::new());
        logger.print(LogLevel::Info, "T", "f.rs", 1, "f", format_args!("{}", Bomb));
        assert!(logger.sink().lines().is_empty());
    }

    #[test]
    fn line_format() {
        let logger = Logger::<_, 64>::new(LogLevel::Debug, Capture::new());
        logger.print(LogLevel::Warning, "Net", "/a/b/c.rs", 7, "connect", format_args!("x={}", 5));
        logger.print(LogLevel::Debug, "Net", "c.rs", 12345, "poll", format_args!("idle"));

        assert_eq!(
            logger.sink().lines(),
            [
                "[Net][ WARN][c.rs:0007](connect): x=5",
                "[Net][DEBUG][c.rs:12345](poll): idle",
            ]
        );
    }

    #[test]
    fn long_message_is_truncated() {
        let logger = Logger::<_, 8>::new(LogLevel::Debug, Capture::new());
        logger.print(LogLevel::Info, "T", "f.rs", 1, "f", format_args!("abc{}ghijkl", "def"));
        assert_eq!(body(&logger.sink().lines()[0]), "abcdefg");
    }

    #[test]
    fn truncation_keeps_whole_chars() {
        let logger = Logger::<_, 3>::new(LogLevel::Debug, Capture::new());
        logger.print(LogLevel::Info, "T", "f.rs", 1, "f", format_args!("aéb"));
        assert_eq!(body(&logger.sink().lines()[0]), "a");

        let logger = Logger::<_, 4>::new(LogLevel::Debug, Capture::new());
        logger.print(LogLevel::Info, "T", "f.rs", 1, "f", format_args!("aéb"));
        assert_eq!(body(&logger.sink().lines()[0]), "aé");
    }

    #[test]
    fn nothing_is_taken_after_a_cut_chunk() {
        let first = String::from("aé");
        let second = String::from("b");

        let logger = Logger::<_, 3>::new(LogLevel::Debug, Capture::new());
        logger.print(LogLevel::Info, "T", "f.rs", 1, "f", format_args!("{}{}", first, second));
        assert_eq!(body(&logger.sink().lines()[0]), "a");
    }

    #[test]
    fn truncated_body_is_a_prefix_of_the_message() {
        let parts = ["ab", "€", "c", "ü", "d", "e", "ß", "f"].map(String::from);
        let full: String = parts.concat();

        macro_rules! check {
            ($n:literal) => {{
                let logger = Logger::<_, $n>::new(LogLevel::Debug, Capture::new());
                logger.print(
                    LogLevel::Info,
                    "T",
                    "f.rs",
                    1,
                    "f",
                    format_args!(
                        "{}{}{}{}{}{}{}{}",
                        parts[0], parts[1], parts[2], parts[3], parts[4], parts[5], parts[6], parts[7]
                    ),
                );
                let lines = logger.sink().lines();
                let body = body(&lines[0]);
                assert!(body.len() < ($n as usize).max(1), "N={} body {body:?}", $n);
                assert!(full.starts_with(body), "N={} body {body:?} is not a prefix", $n);
            }};
        }

        check!(1);
        check!(2);
        check!(3);
        check!(4);
        check!(5);
        check!(6);
        check!(7);
        check!(9);
        check!(12);
        check!(32);
    }

    #[test]
    fn zero_capacity_buffer() {
        let logger = Logger::<_, 0>::new(LogLevel::Debug, Capture::new());
        logger.print(LogLevel::Error, "T", "f.rs", 1, "f", format_args!("anything"));
        assert_eq!(logger.sink().lines(), ["[T][ERROR][f.rs:0001](f): "]);
    }

    #[test]
    fn buffer_is_reused_between_messages() {
        let logger = Logger::<_, 16>::new(LogLevel::Debug, Capture::new());
        logger.print(LogLevel::Info, "T", "f.rs", 1, "f", format_args!("longer message"));
        logger.print(LogLevel::Info, "T", "f.rs", 1, "f", format_args!("short"));
        assert_eq!(body(&logger.sink().lines()[1]), "short");
    }

    static REENTRANT: Logger<Capture, 32> = Logger::new(LogLevel::Debug, Capture::new());

    #[test]
    fn nested_emission_is_dropped() {
        struct Noisy;
        impl fmt::Display for Noisy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                REENTRANT.print(LogLevel::Error, "T", "f.rs", 2, "inner", format_args!("inner"));
                f.write_str("outer")
            }
        }

        REENTRANT.print(LogLevel::Info, "T", "f.rs", 1, "outer", format_args!("{}", Noisy));
        assert_eq!(REENTRANT.sink().lines(), ["[T][ INFO][f.rs:0001](outer): outer"]);
    }

    #[test]
    fn log_crate_records() {
        let logger = Logger::<_, 64>::new(LogLevel::Info, Capture::new());
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .target("wifi")
                .file(Some("src/wifi.rs"))
                .line(Some(12))
                .module_path(Some("app::wifi"))
                .args(format_args!("link up"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Trace)
                .target("wifi")
                .args(format_args!("dropped"))
                .build(),
        );

        assert_eq!(logger.sink().lines(), ["[wifi][ WARN][wifi.rs:0012](app::wifi): link up"]);
    }

    #[test]
    fn file_names() {
        assert_eq!(extract_file_name("/a/b/c.c"), "c.c");
        assert_eq!(extract_file_name("a\\b\\c.c"), "c.c");
        assert_eq!(extract_file_name("c.c"), "c.c");
        assert_eq!(extract_file_name("dir/"), "");
    }

    #[test]
    fn config_level_names() {
        assert_eq!(LogLevel::from_config("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_config("2"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_config("WARNING"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_config("ERROR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_config("verbose"), None);
    }

    #[test]
    fn level_from_log_crate() {
        assert_eq!(LogLevel::from(Level::Trace), LogLevel::Debug);
        assert_eq!(LogLevel::from(Level::Warn), LogLevel::Warning);
        assert!(LogLevel::Error > LogLevel::Warning);
    }

    #[test]
    fn function_name_of_enclosing_fn() {
        assert_eq!(crate::function_name!(), "function_name_of_enclosing_fn");
        let in_closure = || crate::function_name!();
        assert_eq!(in_closure(), "function_name_of_enclosing_fn");
    }

    #[test]
    fn filtered_macro_arguments_are_not_evaluated() {
        use core::cell::Cell;

        let calls = Cell::new(0);
        let bump = || {
            calls.set(calls.get() + 1);
            calls.get()
        };

        let mut expected = 0;
        for level in LogLevel::ALL {
            crate::log_at!(level, "value {}", bump());
            if super::enabled(level) {
                expected += 1;
            }
            assert_eq!(calls.get(), expected, "{level:?}");
        }

        crate::log_d!("{}", bump());
        if !super::enabled(LogLevel::Debug) {
            assert_eq!(calls.get(), expected);
        }
    }

    #[test]
    fn global_macros_do_not_panic() {
        crate::log_d!("debug {}", 1);
        crate::log_i!("info {}", 2);
        crate::log_w!(tag: "Custom", "warn {}", 3);
        crate::log_e!("error");
        super::setup();
        log::info!("through the log crate");
    }
}
