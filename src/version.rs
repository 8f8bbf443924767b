//! Version strings for `--version`.
//!
//! Includes the git revision when the build environment sets
//! `DIVCHAIN_GIT_REV` (packaging builds do; plain `cargo build` does not).

use std::sync::LazyLock;

/// The package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git revision baked in at build time (empty string if not set).
pub const GIT_REV: &str = match option_env!("DIVCHAIN_GIT_REV") {
    Some(rev) => rev,
    None => "",
};

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    if GIT_REV.is_empty() {
        PKG_VERSION.to_string()
    } else {
        format!("{} ({})", PKG_VERSION, GIT_REV)
    }
});

/// Version string for clap's `long_version`: `"X.Y.Z (abcdef0)"` or `"X.Y.Z"`.
pub fn long_version() -> &'static str {
    LONG_VERSION.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_version_format() {
        let version = long_version();
        assert!(version.starts_with(PKG_VERSION));
        if GIT_REV.is_empty() {
            assert_eq!(version, PKG_VERSION);
        } else {
            assert!(version.ends_with(&format!("({})", GIT_REV)));
        }
    }
}
