use std::{env, fs, path::{Path, PathBuf}};

use dotenv::{dotenv, vars};

#[path = "build/conf.rs"]
mod conf;

use conf::{CONF_KEYS, CONF_PREFIX};

fn feature(name: &str) -> bool {
    env::var_os(format!("CARGO_FEATURE_{name}")).is_some()
}

fn main() -> Result<(), anyhow::Error> {
    println!("cargo::rerun-if-changed=.env");
    println!("cargo::rerun-if-changed=build/conf.rs");
    for key in CONF_KEYS {
        println!("cargo::rerun-if-env-changed={key}");
    }

    if Path::new(".env").exists() {
        dotenv()?;

        for (key, value) in vars() {
            if key.starts_with(CONF_PREFIX) {
                println!("cargo::rustc-env={key}={value}");
            }
        }
    }

    let plan = conf::plan(feature, |key| env::var(key).ok())?;

    if let Some(lib) = &plan.link_lib {
        println!("cargo::rustc-link-lib={lib}");
    }

    // Always written so `include!` has something to pick up
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    fs::write(out_dir.join("custom_alloc.rs"), plan.custom_alloc)?;

    Ok(())
}
