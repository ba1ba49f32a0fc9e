//! Build-time metadata embedded by the build script.
//!
//! Both binaries log [`version_string`] at startup so a device's logs say
//! exactly which daemon and UI builds were talking to each other.

/// The git commit hash at build time (short form, `-dirty` if modified).
pub const GIT_HASH: &str = env!("NDG_GIT_HASH");

/// The build timestamp as a Unix epoch string.
pub const BUILD_TIMESTAMP: &str = env!("NDG_BUILD_TIMESTAMP");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("NDG_BUILD_PROFILE");

/// The target triple the binary was compiled for.
pub const BUILD_TARGET: &str = env!("NDG_BUILD_TARGET");

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return a formatted version string.
///
/// Example: `"0.1.0 (abc1234, release, aarch64-unknown-linux-musl)"`
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE}, {BUILD_TARGET})")
}
