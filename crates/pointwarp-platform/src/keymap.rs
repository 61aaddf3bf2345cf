//! Bidirectional mapping between key names and native key codes.
//!
//! A [`KeyTable`] holds one entry per code in `0..=255`, each with an
//! unshifted and a shifted name (either may be empty). Backends fill it once
//! at initialization from the display server's keymap. The [`Resolver`]
//! layers the alias pairs on top so that config-friendly names such as
//! `esc` or `,` resolve to the keysym names found in the table.

use std::collections::HashSet;

use tracing::debug;

/// Number of entries in a keycode table.
pub const TABLE_SIZE: usize = 256;

/// Names of one key code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEntry {
    pub code: u8,
    /// Unshifted name, empty when the key has none.
    pub name: String,
    /// Shifted name, empty when the key has none.
    pub shifted_name: String,
}

/// A symbolic name and the keysym name it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasPair {
    pub name: &'static str,
    pub canonical: &'static str,
}

/// Aliases accepted in configuration, in both directions.
pub const ALIASES: &[AliasPair] = &[
    AliasPair {
        name: "esc",
        canonical: "Escape",
    },
    AliasPair {
        name: ",",
        canonical: "comma",
    },
    AliasPair {
        name: ".",
        canonical: "period",
    },
    AliasPair {
        name: "-",
        canonical: "minus",
    },
    AliasPair {
        name: "/",
        canonical: "slash",
    },
    AliasPair {
        name: ";",
        canonical: "semicolon",
    },
    AliasPair {
        name: "$",
        canonical: "dollar",
    },
    AliasPair {
        name: "backspace",
        canonical: "BackSpace",
    },
];

/// Rewrite an alias to its canonical table name; other names pass through.
#[must_use]
pub fn normalize<'a>(aliases: &[AliasPair], name: &'a str) -> &'a str {
    aliases
        .iter()
        .find(|a| a.name == name)
        .map_or(name, |a| a.canonical)
}

/// Rewrite a canonical table name back to its alias, if it has one.
#[must_use]
pub fn denormalize<'a>(aliases: &[AliasPair], name: &'a str) -> &'a str {
    aliases
        .iter()
        .find(|a| a.canonical == name)
        .map_or(name, |a| a.name)
}

/// The keycode table.
///
/// Names are unique across the whole table, shifted and unshifted
/// namespaces combined.
#[derive(Debug, Clone)]
pub struct KeyTable {
    entries: Vec<KeyEntry>,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl KeyTable {
    /// A table with every code unnamed.
    #[must_use]
    pub fn empty() -> Self {
        let entries = (0..=u8::MAX)
            .map(|code| KeyEntry {
                code,
                ..KeyEntry::default()
            })
            .collect();
        Self { entries }
    }

    /// Build a table from `(code, name, shifted_name)` triples.
    ///
    /// Later triples for the same code replace earlier ones. A name already
    /// taken by a lower code (or by the unshifted level of the same code) is
    /// dropped, keeping the uniqueness invariant for keymaps that bind one
    /// keysym to several keys.
    pub fn from_names<I, N, S>(names: I) -> Self
    where
        I: IntoIterator<Item = (u8, N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut table = Self::empty();
        for (code, name, shifted) in names {
            let entry = &mut table.entries[usize::from(code)];
            entry.name = name.into();
            entry.shifted_name = shifted.into();
        }

        let mut seen = HashSet::new();
        for entry in &mut table.entries {
            let code = entry.code;
            for slot in [&mut entry.name, &mut entry.shifted_name] {
                if slot.is_empty() {
                    continue;
                }
                if !seen.insert(slot.clone()) {
                    debug!(code, name = %slot, "dropping duplicate key name");
                    slot.clear();
                }
            }
        }
        table
    }

    #[must_use]
    pub fn entry(&self, code: u8) -> &KeyEntry {
        &self.entries[usize::from(code)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyEntry> {
        self.entries.iter()
    }

    /// Number of codes with at least one name.
    #[must_use]
    pub fn named_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.name.is_empty() || !e.shifted_name.is_empty())
            .count()
    }

    /// Find a canonical name: unshifted names first, then shifted ones.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<(u8, bool)> {
        if name.is_empty() {
            return None;
        }
        if let Some(e) = self.entries.iter().find(|e| e.name == name) {
            return Some((e.code, false));
        }
        self.entries
            .iter()
            .find(|e| e.shifted_name == name)
            .map(|e| (e.code, true))
    }

    /// The canonical name of `code` in the requested shift state.
    #[must_use]
    pub fn name(&self, code: u8, shifted: bool) -> Option<&str> {
        let entry = self.entry(code);
        let name = if shifted {
            &entry.shifted_name
        } else {
            &entry.name
        };
        (!name.is_empty()).then_some(name.as_str())
    }
}

/// Name resolution against a keycode table with alias rewriting.
#[derive(Debug, Clone)]
pub struct Resolver {
    table: KeyTable,
    aliases: &'static [AliasPair],
}

impl Resolver {
    #[must_use]
    pub fn new(table: KeyTable) -> Self {
        Self::with_aliases(table, ALIASES)
    }

    #[must_use]
    pub fn with_aliases(table: KeyTable, aliases: &'static [AliasPair]) -> Self {
        Self { table, aliases }
    }

    #[must_use]
    pub fn table(&self) -> &KeyTable {
        &self.table
    }

    /// Resolve a key name to `(code, shifted)`; `None` if no key has it.
    #[must_use]
    pub fn lookup_code(&self, name: &str) -> Option<(u8, bool)> {
        let canonical = normalize(self.aliases, name);
        let found = self.table.find(canonical);
        if found.is_none() {
            debug!(name, "no key with this name");
        }
        found
    }

    /// Name of `code` in the requested shift state, alias-rewritten.
    #[must_use]
    pub fn lookup_name(&self, code: u8, shifted: bool) -> Option<&str> {
        self.table
            .name(code, shifted)
            .map(|name| denormalize(self.aliases, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeyTable {
        KeyTable::from_names([
            (9, "Escape", ""),
            (10, "1", "exclam"),
            (13, "4", "dollar"),
            (20, "minus", "underscore"),
            (22, "BackSpace", ""),
            (38, "a", "A"),
            (59, "comma", "less"),
            (60, "period", "greater"),
            (61, "slash", "question"),
            (47, "semicolon", "colon"),
            (65, "space", ""),
        ])
    }

    #[test]
    fn unshifted_lookup() {
        let r = Resolver::new(sample());
        assert_eq!(r.lookup_code("a"), Some((38, false)));
        assert_eq!(r.lookup_code("space"), Some((65, false)));
    }

    #[test]
    fn shifted_lookup() {
        let r = Resolver::new(sample());
        assert_eq!(r.lookup_code("A"), Some((38, true)));
        assert_eq!(r.lookup_code("exclam"), Some((10, true)));
    }

    #[test]
    fn alias_lookup() {
        let r = Resolver::new(sample());
        assert_eq!(r.lookup_code("esc"), Some((9, false)));
        assert_eq!(r.lookup_code(","), Some((59, false)));
        assert_eq!(r.lookup_code("$"), Some((13, true)));
        assert_eq!(r.lookup_code("backspace"), Some((22, false)));
    }

    #[test]
    fn alias_reverse_on_name_lookup() {
        let r = Resolver::new(sample());
        assert_eq!(r.lookup_name(9, false), Some("esc"));
        assert_eq!(r.lookup_name(13, true), Some("$"));
        assert_eq!(r.lookup_name(22, false), Some("backspace"));
        assert_eq!(r.lookup_name(38, true), Some("A"));
    }

    #[test]
    fn missing_names_are_none() {
        let r = Resolver::new(sample());
        assert_eq!(r.lookup_code("F13"), None);
        assert_eq!(r.lookup_code(""), None);
        assert_eq!(r.lookup_name(9, true), None);
        assert_eq!(r.lookup_name(200, false), None);
    }

    #[test]
    fn roundtrip_every_named_code() {
        let r = Resolver::new(sample());
        for entry in r.table().iter() {
            for shifted in [false, true] {
                if let Some(name) = r.lookup_name(entry.code, shifted) {
                    assert_eq!(
                        r.lookup_code(name),
                        Some((entry.code, shifted)),
                        "round-trip failed for {name:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn aliases_are_self_inverse() {
        for pair in ALIASES {
            assert_eq!(normalize(ALIASES, denormalize(ALIASES, pair.canonical)), pair.canonical);
            assert_eq!(denormalize(ALIASES, normalize(ALIASES, pair.name)), pair.name);
        }
    }

    #[test]
    fn alias_case_is_exact() {
        assert_eq!(normalize(ALIASES, "Backspace"), "Backspace");
        assert_eq!(normalize(ALIASES, "ESC"), "ESC");
    }

    #[test]
    fn duplicates_keep_lowest_code() {
        let table = KeyTable::from_names([
            (50, "Shift_L", ""),
            (62, "Shift_R", ""),
            (94, "less", "greater"),
            (59, "comma", "less"),
            (65, "space", "space"),
        ]);
        assert_eq!(table.find("less"), Some((59, true)));
        assert_eq!(table.name(94, false), None);
        assert_eq!(table.name(94, true), Some("greater"));
        assert_eq!(table.name(65, true), None);
        assert_eq!(table.named_count(), 5);
    }

    #[test]
    fn empty_table_has_all_codes() {
        let table = KeyTable::empty();
        assert_eq!(table.iter().count(), TABLE_SIZE);
        assert_eq!(table.entry(255).code, 255);
        assert_eq!(table.named_count(), 0);
    }
}
