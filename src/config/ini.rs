//! Minimal key-value INI codec used for the per-script version file.
use anyhow::{Result, bail};

/// A key-value section of an INI document.
///
/// Headers preserve original case since they carry semantic meaning
/// (e.g. `[Current Version Info]`).
///
/// # Examples
///
/// ```
/// use homeconf_cli::config::ini::KvSection;
///
/// let section = KvSection {
///     header: "Current Version Info".to_string(),
///     entries: vec![("updatedToVersion".to_string(), "3".to_string())],
/// };
/// assert_eq!(section.get("updatedToVersion"), Some("3"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvSection {
    /// The raw section header.
    pub header: String,
    /// Key-value entries within this section, in file order.
    pub entries: Vec<(String, String)>,
}

impl KvSection {
    /// Create an empty section.
    #[must_use]
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            entries: Vec::new(),
        }
    }

    /// Look up the last value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace the value stored under `key`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }
}

/// Parse key-value INI content from a string.
///
/// Lines starting with `#` or `;` are comments. Inline comments (` #` or
/// `\t#`) are stripped from values. Both `key = value` and `key: value`
/// forms are accepted.
///
/// # Examples
///
/// ```
/// use homeconf_cli::config::ini::parse_kv_sections_from_str;
///
/// let sections = parse_kv_sections_from_str(
///     "[Current Version Info]\nupdatedToVersion = 7 # comment\n"
/// ).unwrap();
/// assert_eq!(sections[0].header, "Current Version Info");
/// assert_eq!(sections[0].entries[0], ("updatedToVersion".to_string(), "7".to_string()));
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - A key-value pair is malformed (missing `=`/`:` or empty key)
/// - An entry appears outside of a section header
pub fn parse_kv_sections_from_str(content: &str) -> Result<Vec<KvSection>> {
    let mut sections = Vec::new();
    let mut current: Option<KvSection> = None;

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = parse_raw_header(trimmed) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(KvSection::new(header));
        } else if let Some(ref mut section) = current {
            if let Some((key, value)) = parse_kv_line(trimmed) {
                section.entries.push((key, value));
            } else {
                bail!(
                    "invalid key-value pair at line {}: {}",
                    line_num + 1,
                    trimmed
                );
            }
        } else {
            bail!(
                "entry outside of section at line {}: {}",
                line_num + 1,
                trimmed
            );
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }

    Ok(sections)
}

/// Render sections back into INI text (`key = value`, blank line between sections).
#[must_use]
pub fn render_kv_sections(sections: &[KvSection]) -> String {
    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push('[');
        out.push_str(&section.header);
        out.push_str("]\n");
        for (key, value) in &section.entries {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}

/// Parse a `[header]` line preserving original case.
fn parse_raw_header(line: &str) -> Option<String> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Parse a `key = value` (or `key: value`) line, stripping inline comments.
fn parse_kv_line(line: &str) -> Option<(String, String)> {
    let split_at = match (line.find('='), line.find(':')) {
        (Some(eq), Some(colon)) => eq.min(colon),
        (Some(idx), None) | (None, Some(idx)) => idx,
        (None, None) => return None,
    };
    let key = line.get(..split_at)?.trim();
    let value = line.get(split_at + 1..)?.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), strip_inline_comment(value).to_string()))
}

/// Strip inline comments (`#` preceded by whitespace) from a value.
fn strip_inline_comment(value: &str) -> &str {
    value
        .find(" #")
        .or_else(|| value.find("\t#"))
        .map_or(value, |idx| value[..idx].trim_end())
}
