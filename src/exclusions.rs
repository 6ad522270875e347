use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Rules shipped with the binary, used when no readable rule file is supplied.
pub const DEFAULT_RULES: &str = include_str!("../resources/default_excludes.txt");

/// A rule line looks like `FileName.java/glExampleMethod`.
static RULE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z_$][a-z0-9_$]*\.java)/(gl[a-z0-9]+)$").expect("rule line regex")
});

/// Methods which must stay fully qualified in specific files.
///
/// Keyed by bare file name (no directory), so a rule applies to every file
/// with that name anywhere in the tree.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRuleSet {
    excludes: BTreeMap<String, BTreeSet<String>>,
}

impl ExclusionRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from `primary`, falling back to the embedded defaults when
    /// the primary source is absent or unreadable.
    ///
    /// Returns `true` when the primary source was used.
    pub fn load(&mut self, primary: Option<&Path>) -> bool {
        if let Some(path) = primary {
            match self.load_from_path(path) {
                Ok(added) => {
                    tracing::debug!(path=%path.display(), added, "loaded exclusion rules");
                    return true;
                }
                Err(err) => {
                    tracing::warn!("{:#}; falling back to default exclusions", err);
                }
            }
        }
        let added = self.read_rules(DEFAULT_RULES);
        tracing::debug!(added, "loaded default exclusion rules");
        false
    }

    /// Read a rule file. Malformed lines are ignored; only I/O failures are errors.
    pub fn load_from_path(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read exclusion rules {}", path.display()))?;
        Ok(self.read_rules(&content))
    }

    /// Parse rule text line by line and return how many lines were accepted.
    pub fn read_rules(&mut self, text: &str) -> usize {
        let mut accepted = 0usize;
        for line in text.lines() {
            if let Some(caps) = RULE_LINE.captures(line.trim()) {
                self.add_exclusion(&caps[1], &caps[2]);
                accepted += 1;
            }
        }
        accepted
    }

    pub fn add_exclusion(&mut self, file_name: &str, method: &str) {
        self.excludes
            .entry(file_name.to_string())
            .or_default()
            .insert(method.to_string());
    }

    pub fn has_rules_for(&self, file_name: &str) -> bool {
        self.excludes.contains_key(file_name)
    }

    pub fn is_excluded(&self, file_name: &str, method: &str) -> bool {
        self.excludes
            .get(file_name)
            .is_some_and(|methods| methods.contains(method))
    }

    pub fn clear(&mut self) {
        self.excludes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.excludes.is_empty()
    }

    /// Number of distinct (file, method) pairs.
    pub fn len(&self) -> usize {
        self.excludes.values().map(BTreeSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn valid_rule_is_looked_up_by_file_and_method() {
        let mut rules = ExclusionRuleSet::new();
        assert_eq!(rules.read_rules("Foo.java/glBar\n"), 1);

        assert!(rules.has_rules_for("Foo.java"));
        assert!(rules.is_excluded("Foo.java", "glBar"));
        assert!(!rules.is_excluded("Foo.java", "glBaz"));
        assert!(!rules.is_excluded("Other.java", "glBar"));
        assert!(!rules.has_rules_for("Other.java"));
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let mut rules = ExclusionRuleSet::new();
        let text = "Foo.txt/glBar\nFoo.java/drawBar\nFoo.java glBar\n1Foo.java/glBar\n\n# comment\n";
        assert_eq!(rules.read_rules(text), 0);
        assert!(rules.is_empty());
    }

    #[test]
    fn lines_are_trimmed_and_case_insensitive() {
        let mut rules = ExclusionRuleSet::new();
        rules.read_rules("  OpenGlHelper.JAVA/GLUseProgram  \r\n$Inner_1.java/glUniform4\n");
        assert!(rules.is_excluded("OpenGlHelper.JAVA", "GLUseProgram"));
        assert!(rules.is_excluded("$Inner_1.java", "glUniform4"));
    }

    #[test]
    fn duplicates_collapse() {
        let mut rules = ExclusionRuleSet::new();
        rules.read_rules("A.java/glX\nA.java/glX\nA.java/glY\n");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn readable_file_of_malformed_lines_reports_success() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("excludes.txt");
        fs::write(&path, "not a rule\nFoo.java/bar\n").unwrap();

        let mut rules = ExclusionRuleSet::new();
        assert!(rules.load(Some(&path)));
        assert!(rules.is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let mut rules = ExclusionRuleSet::new();
        assert!(!rules.load(Some(&dir.path().join("missing.txt"))));

        let mut defaults = ExclusionRuleSet::new();
        defaults.read_rules(DEFAULT_RULES);
        assert_eq!(rules.len(), defaults.len());
        assert!(rules.has_rules_for("OpenGlHelper.java"));
    }

    #[test]
    fn no_primary_uses_defaults() {
        let mut rules = ExclusionRuleSet::new();
        assert!(!rules.load(None));
        assert!(!rules.is_empty());
    }

    #[test]
    fn clear_resets() {
        let mut rules = ExclusionRuleSet::new();
        rules.add_exclusion("A.java", "glX");
        rules.clear();
        assert!(rules.is_empty());
        assert!(!rules.is_excluded("A.java", "glX"));
    }
}
