//! Command: print version information.

/// Version reported by `homeconf version`.
#[must_use]
pub fn version() -> &'static str {
    option_env!("HOMECONF_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the homeconf version to stdout.
pub fn run() {
    println!("homeconf {}", version());
}
