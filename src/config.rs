//! Compile-time configuration.
//!
//! Switches come from Cargo features, values from `ESP_UTILS_CONF_*`
//! environment variables seen at build time (a `.env` file next to the
//! manifest is forwarded by `build.rs`). Everything here is `const`, so a
//! disabled facility folds away instead of branching on every call.

use core::fmt;

use crate::logging::LogLevel;

/// Check macros perform their checks.
pub const ENABLE_CHECK: bool = cfg!(feature = "enable-check");
/// Failed checks end in a panic instead of an escape.
pub const CHECK_WITH_ASSERT: bool = cfg!(feature = "check-with-assert");
/// Failed checks log an error line before escaping.
pub const CHECK_WITH_ERROR_LOG: bool = cfg!(feature = "check-with-error-log");

pub const ENABLE_LOG: bool = cfg!(feature = "enable-log");
pub const ENABLE_LOG_TRACE: bool = cfg!(feature = "enable-log-trace");

pub const LOG_BUFFER_SIZE: usize = match option_env!("ESP_UTILS_CONF_LOG_BUFFER_SIZE") {
    Some(v) => match usize::from_str_radix(v, 10) {
        Ok(v) => v,
        Err(_) => panic!("ESP_UTILS_CONF_LOG_BUFFER_SIZE failed to parse as usize"),
    },
    None => 256,
};

pub const LOG_LEVEL: LogLevel = match option_env!("ESP_UTILS_CONF_LOG_LEVEL") {
    Some(v) => match LogLevel::from_config(v) {
        Some(level) => level,
        None => panic!("ESP_UTILS_CONF_LOG_LEVEL must be one of debug, info, warning, error"),
    },
    None => LogLevel::Info,
};

/// Tag used by the logging macros when the call site gives none.
pub const LOG_TAG: &str = match option_env!("ESP_UTILS_CONF_LOG_TAG") {
    Some(tag) => tag,
    None => "Utils",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocType {
    /// Rust's global allocator
    Stdlib,
    /// `esp-alloc` heap with capability and alignment
    Esp,
    /// Functions named at build time
    Custom,
    /// Memory is owned by an embedding runtime, the shim does nothing
    Host,
}

pub const ALLOC_TYPE: AllocType = if cfg!(feature = "alloc-esp") {
    AllocType::Esp
} else if cfg!(feature = "alloc-custom") {
    AllocType::Custom
} else if cfg!(feature = "alloc-host") {
    AllocType::Host
} else {
    AllocType::Stdlib
};

#[cfg(feature = "alloc-esp")]
pub const ALLOC_ESP_ALIGN: usize = match option_env!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_ALIGN") {
    Some(v) => match usize::from_str_radix(v, 10) {
        Ok(v) if v.is_power_of_two() => v,
        _ => panic!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_ALIGN must be a power of two"),
    },
    None => panic!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_ALIGN must be set for the alloc-esp backend"),
};

#[cfg(feature = "alloc-esp")]
pub const ALLOC_ESP_CAPS: esp_alloc::MemoryCapability = match option_env!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_CAPS") {
    Some(v) => match v.as_bytes() {
        b"internal" => esp_alloc::MemoryCapability::Internal,
        b"external" => esp_alloc::MemoryCapability::External,
        _ => panic!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_CAPS must be `internal` or `external`"),
    },
    None => panic!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_CAPS must be set for the alloc-esp backend"),
};

/// Snapshot of the build configuration.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub enable_check: bool,
    pub check_with_assert: bool,
    pub check_with_error_log: bool,
    pub enable_log: bool,
    pub enable_log_trace: bool,
    pub log_buffer_size: usize,
    pub log_level: LogLevel,
    pub log_tag: &'static str,
    pub alloc_type: AllocType,
}

pub const CONFIG: Config = Config {
    enable_check: ENABLE_CHECK,
    check_with_assert: CHECK_WITH_ASSERT,
    check_with_error_log: CHECK_WITH_ERROR_LOG,
    enable_log: ENABLE_LOG,
    enable_log_trace: ENABLE_LOG_TRACE,
    log_buffer_size: LOG_BUFFER_SIZE,
    log_level: LOG_LEVEL,
    log_tag: LOG_TAG,
    alloc_type: ALLOC_TYPE,
};

impl Config {
    pub fn dump(&self) {
        crate::log_i!("{:?}", self);
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("enable_check", &self.enable_check)
            .field("check_with_assert", &self.check_with_assert)
            .field("check_with_error_log", &self.check_with_error_log)
            .field("enable_log", &self.enable_log)
            .field("enable_log_trace", &self.enable_log_trace)
            .field("log_buffer_size", &self.log_buffer_size)
            .field("log_level", &format_args!("{}", self.log_level.as_str().trim()))
            .field("log_tag", &self.log_tag)
            .field("alloc_type", &self.alloc_type)
            .finish()
    }
}
