use super::imports::{ImportTable, find_imports, replace_bare, split_lines};
use crate::exclusions::ExclusionRuleSet;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

/// An excluded call that must be written out fully qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteOverride {
    pub short_form: String,
    pub full_form: String,
}

/// Short-form call text mapped to its fully qualified replacement, for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    entries: BTreeMap<String, String>,
}

impl Overrides {
    pub fn insert(&mut self, entry: CallSiteOverride) {
        self.entries.insert(entry.short_form, entry.full_form);
    }

    #[cfg(test)]
    pub fn get(&self, short_form: &str) -> Option<&str> {
        self.entries.get(short_form).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, f)| (s.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Substitute every bare short-form occurrence on `line` with its full form.
    pub fn apply(&self, line: &str) -> String {
        let mut out = line.to_string();
        for (short, full) in &self.entries {
            if out.contains(short.as_str()) {
                out = replace_bare(&out, short, full, |_| true);
            }
        }
        out
    }
}

impl Extend<CallSiteOverride> for Overrides {
    fn extend<T: IntoIterator<Item = CallSiteOverride>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

/// Aliases seen so far while scanning a file.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    imports: ImportTable,
}

impl ScanState {
    #[cfg(test)]
    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }
}

/// Register imports found on `line`, then report excluded calls on it.
///
/// Calls are only recognised for aliases imported on this or an earlier line.
pub fn scan_line(
    mut state: ScanState,
    line: &str,
    file_name: &str,
    rules: &ExclusionRuleSet,
) -> (ScanState, Vec<CallSiteOverride>) {
    for import in find_imports(line) {
        state.imports.register(&import);
    }

    let found = state
        .imports
        .calls(line)
        .into_iter()
        .filter(|call| rules.is_excluded(file_name, call.method))
        .map(|call| CallSiteOverride {
            short_form: call.short_form(),
            full_form: call.full_form(),
        })
        .collect();
    (state, found)
}

/// Collect overrides for a file's text. Files without rules are not scanned.
pub fn scan_source(file_name: &str, text: &str, rules: &ExclusionRuleSet) -> Overrides {
    let mut overrides = Overrides::default();
    if !rules.has_rules_for(file_name) {
        return overrides;
    }

    let mut state = ScanState::default();
    for line in split_lines(text) {
        let (next, found) = scan_line(state, line, file_name, rules);
        state = next;
        overrides.extend(found);
    }
    overrides
}

/// Read `path` and collect its overrides. Read failures yield no overrides.
pub fn prescan_file(path: &Path, rules: &ExclusionRuleSet) -> Overrides {
    let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
        return Overrides::default();
    };
    if !rules.has_rules_for(file_name) {
        return Overrides::default();
    }

    match fs::read_to_string(path) {
        Ok(text) => {
            let overrides = scan_source(file_name, &text, rules);
            tracing::debug!(path=%path.display(), count = overrides.len(), "prescan");
            overrides
        }
        Err(err) => {
            tracing::warn!(path=%path.display(), "prescan failed: {}", err);
            Overrides::default()
        }
    }
}
