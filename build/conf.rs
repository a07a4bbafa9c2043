//! Validation of the build configuration, shared by `build.rs` and its tests.

use anyhow::{bail, Context};

pub const CONF_PREFIX: &str = "ESP_UTILS_CONF_";

pub const CONF_KEYS: &[&str] = &[
    "ESP_UTILS_CONF_LOG_BUFFER_SIZE",
    "ESP_UTILS_CONF_LOG_LEVEL",
    "ESP_UTILS_CONF_LOG_TAG",
    "ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_ALIGN",
    "ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_CAPS",
    "ESP_UTILS_CONF_MEM_GEN_ALLOC_CUSTOM_MALLOC",
    "ESP_UTILS_CONF_MEM_GEN_ALLOC_CUSTOM_FREE",
    "ESP_UTILS_CONF_MEM_GEN_ALLOC_CUSTOM_INCLUDE",
];

pub const ALLOC_FEATURES: &[&str] = &["ALLOC_ESP", "ALLOC_CUSTOM", "ALLOC_HOST"];

pub const CHIP_FEATURES: &[&str] = &[
    "ESP32", "ESP32C2", "ESP32C3", "ESP32C6", "ESP32H2", "ESP32S2", "ESP32S3",
];

/// What the build script has to emit.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan {
    /// Contents of `OUT_DIR/custom_alloc.rs`
    pub custom_alloc: String,
    pub link_lib: Option<String>,
}

fn required(var: &impl Fn(&str) -> Option<String>, key: &str, backend: &str) -> Result<String, anyhow::Error> {
    let value = var(key).with_context(|| {
        format!("`{key}` must be set when the `{backend}` allocator backend is selected")
    })?;
    let value = value.trim();
    if value.is_empty() {
        bail!("`{key}` must not be empty when the `{backend}` allocator backend is selected");
    }
    Ok(value.to_owned())
}

pub fn is_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Checks the selected features (`CARGO_FEATURE_*` names without the
/// prefix) against the `ESP_UTILS_CONF_*` values.
pub fn plan(
    feature: impl Fn(&str) -> bool,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Plan, anyhow::Error> {
    let chips: Vec<_> = CHIP_FEATURES.iter().filter(|f| feature(**f)).collect();
    if chips.len() > 1 {
        bail!("only one chip feature may be enabled, found {chips:?}");
    }
    if feature("STD") && !chips.is_empty() {
        bail!(
            "the `std` feature cannot be combined with chip feature {:?}, \
             depend on esp-utils with `default-features = false`",
            chips[0]
        );
    }

    let selected: Vec<_> = ALLOC_FEATURES.iter().filter(|f| feature(**f)).collect();
    if selected.len() > 1 {
        bail!("only one allocator backend feature may be enabled, found {selected:?}");
    }

    if feature("ALLOC_ESP") {
        let align = required(&var, "ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_ALIGN", "alloc-esp")?;
        let align: usize = align
            .parse()
            .with_context(|| format!("invalid ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_ALIGN `{align}`"))?;
        if !align.is_power_of_two() {
            bail!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_ALIGN must be a power of two, got {align}");
        }

        let caps = required(&var, "ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_CAPS", "alloc-esp")?;
        if !matches!(caps.as_str(), "internal" | "external") {
            bail!("ESP_UTILS_CONF_MEM_GEN_ALLOC_ESP_CAPS must be `internal` or `external`, got `{caps}`");
        }
    }

    let mut plan = Plan::default();
    if feature("ALLOC_CUSTOM") {
        let malloc = required(&var, "ESP_UTILS_CONF_MEM_GEN_ALLOC_CUSTOM_MALLOC", "alloc-custom")?;
        let free = required(&var, "ESP_UTILS_CONF_MEM_GEN_ALLOC_CUSTOM_FREE", "alloc-custom")?;
        let lib = required(&var, "ESP_UTILS_CONF_MEM_GEN_ALLOC_CUSTOM_INCLUDE", "alloc-custom")?;
        for symbol in [&malloc, &free] {
            if !is_symbol(symbol) {
                bail!("`{symbol}` is not a valid C symbol name");
            }
        }

        plan.custom_alloc = format!(
            "extern \"C\" {{\n    \
                #[link_name = \"{malloc}\"]\n    \
                fn custom_malloc(size: usize) -> *mut core::ffi::c_void;\n    \
                #[link_name = \"{free}\"]\n    \
                fn custom_free(ptr: *mut core::ffi::c_void);\n\
            }}\n"
        );
        plan.link_lib = Some(lib);
    }

    Ok(plan)
}
