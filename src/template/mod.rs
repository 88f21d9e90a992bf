//! Placeholder scanning and substitution.
//!
//! Templates use a single placeholder form, `${NAME}` with `NAME` matching
//! `[A-Z_][A-Z0-9_]*`. Anything else (lowercase names, `$NAME`, nested
//! braces) is literal text.
pub mod backup;
pub mod extract;
pub mod json_path;

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::LazyLock;

use regex::{Captures, Regex};

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Names substituted from the environment rather than collected.
pub const BUILTIN_NAMES: [&str; 2] = ["HOME", "USER"];

/// One `${NAME}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Variable name without the `${}` wrapper.
    pub name: &'a str,
    /// Byte offset of `$`.
    pub start: usize,
    /// Byte offset one past `}`.
    pub end: usize,
}

/// Placeholders in `content`, in order of appearance.
pub fn find_placeholders(content: &str) -> impl Iterator<Item = Placeholder<'_>> {
    PLACEHOLDER.captures_iter(content).filter_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some(Placeholder {
            name: name.as_str(),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// Distinct placeholder names in order of first appearance.
#[must_use]
pub fn placeholder_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for p in find_placeholders(content) {
        if !names.iter().any(|n| n == p.name) {
            names.push(p.name.to_string());
        }
    }
    names
}

/// Whether `name` is `HOME` or `USER`.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Source of variable values for [`render`].
pub trait Lookup {
    /// Value for `name`, if known.
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> Lookup for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Lookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Values for the built-in placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Builtins {
    /// Value of `${HOME}`.
    pub home: String,
    /// Value of `${USER}`.
    pub user: String,
}

impl Builtins {
    /// Build from explicit values.
    #[must_use]
    pub fn new(home: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            user: user.into(),
        }
    }

    /// Read `HOME` and `USER` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            home: std::env::var("HOME").unwrap_or_default(),
            user: std::env::var("USER").unwrap_or_default(),
        }
    }

    /// Value for a built-in name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "HOME" => Some(&self.home),
            "USER" => Some(&self.user),
            _ => None,
        }
    }

    /// Substitute only `${HOME}` and `${USER}`.
    #[must_use]
    pub fn apply(&self, content: &str) -> String {
        replace_placeholders(content, |name| self.get(name))
    }
}

/// Substitute every placeholder with its collected value, falling back to
/// the built-ins. Unknown placeholders stay verbatim.
///
/// Substitution is a single pass: a value that itself contains `${...}` is
/// inserted as-is.
#[must_use]
pub fn render(content: &str, values: &impl Lookup, builtins: &Builtins) -> String {
    replace_placeholders(content, |name| {
        values.lookup(name).or_else(|| builtins.get(name))
    })
}

fn replace_placeholders<'v>(content: &str, resolve: impl Fn(&str) -> Option<&'v str>) -> String {
    PLACEHOLDER
        .replace_all(content, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let name = caps.get(1).map_or("", |m| m.as_str());
            resolve(name).unwrap_or(whole).to_string()
        })
        .into_owned()
}

/// A concrete value to turn back into `${name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restore {
    /// Placeholder name.
    pub name: String,
    /// Text to replace.
    pub value: String,
    /// Skip occurrences glued to a letter, digit or `_` on either side.
    pub bounded: bool,
}

impl Restore {
    /// A value replaced wherever it occurs.
    #[must_use]
    pub fn anywhere(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            bounded: false,
        }
    }

    /// A value replaced only where it stands on its own.
    #[must_use]
    pub fn bounded(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            bounded: true,
        }
    }
}

/// Replace concrete values with their placeholders in one left-to-right
/// pass. At each position the longest matching value wins, and inserted
/// placeholders are never scanned again. Empty values are ignored. Returns
/// the new text and the number of replacements made.
#[must_use]
pub fn sanitize(content: &str, restores: &[Restore]) -> (String, usize) {
    let mut ordered: Vec<&Restore> = restores.iter().filter(|r| !r.value.is_empty()).collect();
    ordered.sort_by(|a, b| {
        b.value
            .len()
            .cmp(&a.value.len())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut out = String::with_capacity(content.len());
    let mut count = 0;
    let mut at = 0;
    while let Some(ch) = content.get(at..).and_then(|rest| rest.chars().next()) {
        let rest = content.get(at..).unwrap_or_default();
        let hit = ordered.iter().find(|r| {
            rest.starts_with(r.value.as_str())
                && (!r.bounded || stands_alone(content, at, at + r.value.len()))
        });
        if let Some(r) = hit {
            out.push_str("${");
            out.push_str(&r.name);
            out.push('}');
            at += r.value.len();
            count += 1;
        } else {
            out.push(ch);
            at += ch.len_utf8();
        }
    }
    (out, count)
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn stands_alone(content: &str, start: usize, end: usize) -> bool {
    let before = content.get(..start).and_then(|s| s.chars().next_back());
    let after = content.get(end..).and_then(|s| s.chars().next());
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn builtins() -> Builtins {
        Builtins::new("/home/ada", "ada")
    }

    #[test]
    fn finds_placeholders_in_order_with_offsets() {
        let found: Vec<_> = find_placeholders("a ${ONE} b ${TWO_2}").collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "ONE");
        assert_eq!((found[0].start, found[0].end), (2, 8));
        assert_eq!(found[1].name, "TWO_2");
    }

    #[test]
    fn ignores_non_placeholder_forms() {
        let names = placeholder_names("$HOME ${lower} ${1BAD} ${GOOD} ${GOOD}");
        assert_eq!(names, vec!["GOOD"]);
    }

    #[test]
    fn builtins_only_touch_home_and_user() {
        let out = builtins().apply("${HOME}/x ${USER} ${TOKEN}");
        assert_eq!(out, "/home/ada/x ada ${TOKEN}");
    }

    #[test]
    fn render_prefers_collected_then_builtins() {
        let mut values = HashMap::new();
        values.insert("TOKEN".to_string(), "t0k".to_string());
        values.insert("USER".to_string(), "override".to_string());
        let out = render("${TOKEN} ${USER} ${HOME} ${MISSING}", &values, &builtins());
        assert_eq!(out, "t0k override /home/ada ${MISSING}");
    }

    #[test]
    fn render_does_not_resubstitute_inserted_values() {
        let mut values = BTreeMap::new();
        values.insert("A".to_string(), "${B}".to_string());
        values.insert("B".to_string(), "b".to_string());
        assert_eq!(render("${A}", &values, &builtins()), "${B}");
    }

    #[test]
    fn sanitize_replaces_longest_value_first() {
        let values = [Restore::anywhere("SHORT", "abc"), Restore::anywhere("LONG", "abcdef")];
        let (out, n) = sanitize("abcdef abc", &values);
        assert_eq!(out, "${LONG} ${SHORT}");
        assert_eq!(n, 2);
    }

    #[test]
    fn sanitize_skips_empty_values() {
        let values = [Restore::anywhere("EMPTY", "")];
        assert_eq!(sanitize("abc", &values), ("abc".to_string(), 0));
    }

    #[test]
    fn sanitize_never_rescans_inserted_placeholders() {
        let values = [Restore::anywhere("A", "x"), Restore::anywhere("B", "A")];
        let (out, n) = sanitize("a=x\nb=A\n", &values);
        assert_eq!(out, "a=${A}\nb=${B}\n");
        assert_eq!(n, 2);
    }

    #[test]
    fn sanitize_bounded_value_skips_longer_words() {
        let values = [Restore::bounded("USER", "al")];
        let (out, n) = sanitize("alias ll=ls # al\n/home/al/bin", &values);
        assert_eq!(out, "alias ll=ls # ${USER}\n/home/${USER}/bin");
        assert_eq!(n, 2);
    }

    #[test]
    fn sanitize_handles_multibyte_text() {
        let values = [Restore::anywhere("CITY", "Zürich")];
        let (out, n) = sanitize("café → Zürich", &values);
        assert_eq!(out, "café → ${CITY}");
        assert_eq!(n, 1);
    }
}
