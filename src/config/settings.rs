//! Shared `[general]` settings and `~` / `${var}` expansion.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Setting key holding the nest (personal repository) directory.
pub const NEST_DIR_KEY: &str = "nest_dir";

/// Default nest directory, relative to the home directory.
const DEFAULT_NEST_DIR: &str = "~/Nest";

/// Free-form string settings from the `[general]` table.
///
/// Lookups return the raw value; [`Settings::expand`] resolves `~/` and
/// `${var}` references where `var` is `home`, `nest` or any other key.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
    home: PathBuf,
}

impl Settings {
    /// Create settings bound to the given home directory.
    #[must_use]
    pub const fn new(values: BTreeMap<String, String>, home: PathBuf) -> Self {
        Self { values, home }
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The home directory the settings were loaded for.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The configured nest directory (default `~/Nest`), expanded.
    ///
    /// The value may reference `${home}` and other keys, but not `${nest}`.
    #[must_use]
    pub fn nest_dir(&self) -> PathBuf {
        let raw = self.get(NEST_DIR_KEY).unwrap_or(DEFAULT_NEST_DIR);
        let home = || self.home.display().to_string();
        PathBuf::from(expand_vars(raw, &self.home, |name| match name {
            "home" => Some(home()),
            "nest" => None,
            other => self
                .get(other)
                .map(|v| expand_vars(v, &self.home, |n| (n == "home").then(home))),
        }))
    }

    /// Expand `~/` and `${var}` references in `input`.
    ///
    /// `nest` overrides the configured nest directory (used after a script
    /// redirects it in its pre-run hook). Unknown variables are left verbatim.
    #[must_use]
    pub fn expand(&self, input: &str, nest: Option<&Path>) -> String {
        expand_vars(input, &self.home, |name| self.lookup_var(name, nest))
    }

    /// Expand `input` and interpret it as a path.
    #[must_use]
    pub fn expand_path(&self, input: &str, nest: Option<&Path>) -> PathBuf {
        PathBuf::from(self.expand(input, nest))
    }

    fn lookup_var(&self, name: &str, nest: Option<&Path>) -> Option<String> {
        let home = || self.home.display().to_string();
        let nest = || {
            nest.map_or_else(|| self.nest_dir(), Path::to_path_buf)
                .display()
                .to_string()
        };
        match name {
            "home" => Some(home()),
            "nest" => Some(nest()),
            // Values are expanded one level only, which also rules out cycles.
            other => self.get(other).map(|v| {
                expand_vars(v, &self.home, |n| match n {
                    "home" => Some(home()),
                    "nest" => Some(nest()),
                    _ => None,
                })
            }),
        }
    }
}

/// Expand a leading `~` and every `${name}` in `input`.
fn expand_vars(input: &str, home: &Path, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());

    let rest = if input == "~" {
        out.push_str(&home.display().to_string());
        ""
    } else if let Some(stripped) = input.strip_prefix("~/") {
        out.push_str(&home.display().to_string());
        out.push('/');
        stripped
    } else {
        input
    };

    let mut remaining = rest;
    while let Some((before, after)) = remaining.split_once("${") {
        out.push_str(before);
        if let Some((name, tail)) = after.split_once('}') {
            out.push_str(&lookup(name).unwrap_or_else(|| format!("${{{name}}}")));
            remaining = tail;
        } else {
            out.push_str("${");
            out.push_str(after);
            remaining = "";
        }
    }
    out.push_str(remaining);
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        Settings::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            PathBuf::from("/home/jane"),
        )
    }

    #[test]
    fn tilde_expands_to_home() {
        let s = settings(&[]);
        assert_eq!(s.expand("~/.homeconf/home", None), "/home/jane/.homeconf/home");
        assert_eq!(s.expand("~", None), "/home/jane");
    }

    #[test]
    fn tilde_in_middle_is_literal() {
        let s = settings(&[]);
        assert_eq!(s.expand("/srv/~cache", None), "/srv/~cache");
    }

    #[test]
    fn nest_defaults_under_home() {
        let s = settings(&[]);
        assert_eq!(s.nest_dir(), PathBuf::from("/home/jane/Nest"));
        assert_eq!(s.expand("${nest}/bin", None), "/home/jane/Nest/bin");
    }

    #[test]
    fn nest_override_wins() {
        let s = settings(&[("nest_dir", "/data/nest")]);
        assert_eq!(s.expand("${nest}", None), "/data/nest");
        assert_eq!(
            s.expand("${nest}", Some(Path::new("/home/jane/.Nest"))),
            "/home/jane/.Nest"
        );
    }

    #[test]
    fn general_keys_are_variables() {
        let s = settings(&[("configs", "~/Nest/Configs")]);
        assert_eq!(
            s.expand("${configs}/bashrc", None),
            "/home/jane/Nest/Configs/bashrc"
        );
    }

    #[test]
    fn general_values_may_reference_nest() {
        let s = settings(&[("configs", "${nest}/Configs"), ("nest_dir", "${home}/.Nest")]);
        assert_eq!(s.nest_dir(), PathBuf::from("/home/jane/.Nest"));
        assert_eq!(s.expand("${configs}", None), "/home/jane/.Nest/Configs");
    }

    #[test]
    fn nest_dir_cannot_reference_itself() {
        let s = settings(&[("nest_dir", "${nest}/x")]);
        assert_eq!(s.nest_dir(), PathBuf::from("${nest}/x"));
    }

    #[test]
    fn unknown_variables_are_kept() {
        let s = settings(&[]);
        assert_eq!(s.expand("${nope}/x", None), "${nope}/x");
        assert_eq!(s.expand("broken ${open", None), "broken ${open");
    }

    #[test]
    fn get_returns_raw_value() {
        let s = settings(&[("email", "jane@example.org")]);
        assert_eq!(s.get("email"), Some("jane@example.org"));
        assert_eq!(s.get("missing"), None);
        assert_eq!(s.keys().collect::<Vec<_>>(), vec!["email"]);
    }
}
