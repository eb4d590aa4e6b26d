use anyhow::{Context, Result};

fn main() -> Result<()> {
    let app_version = env("CARGO_PKG_VERSION")?
        .into_string()
        .map_err(|version| anyhow::anyhow!("invalid CARGO_PKG_VERSION: {version:?}"))?;

    let rustc_version = rustc_version::version().context("failed to query rustc version")?;

    emit("ROCKETBOT_VERSION", &app_version);
    emit("ROCKETBOT_RUSTC_VERSION", &rustc_version.to_string());
    Ok(())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={key}={value}");
}

fn env(key: &str) -> Result<std::ffi::OsString> {
    println!("cargo:rerun-if-env-changed={key}");
    std::env::var_os(key).ok_or_else(|| anyhow::anyhow!("missing '{key}' environment variable"))
}
