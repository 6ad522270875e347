use crate::exclusions::ExclusionRuleSet;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root: PathBuf,
    /// Primary rule source; `None` uses the embedded defaults.
    pub excludes: Option<PathBuf>,
    /// Extra rule lines added after the rule source.
    pub rules: Vec<String>,
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            excludes: None,
            rules: Vec::new(),
            dry_run: false,
        }
    }
}

// --- Raw TOML structures ---
#[derive(Deserialize)]
struct ConfigFile {
    gl_static_patcher: Option<PatcherToml>,
}

#[derive(Deserialize)]
struct PatcherToml {
    root: Option<String>,
    excludes: Option<String>,
    rules: Option<Vec<String>>,
    dry_run: Option<bool>,
}

impl AppConfig {
    /// Load settings from a TOML file, or defaults when no file is given.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let Some(path) = config_path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let Some(section) = file.gl_static_patcher else {
            bail!("[gl_static_patcher] not found in {}", path.display());
        };

        // Relative paths are taken from the config file's directory.
        let base = path.parent().unwrap_or(Path::new(""));
        let resolve = |p: String| base.join(p);

        Ok(Self {
            root: section
                .root
                .map(resolve)
                .unwrap_or_else(|| PathBuf::from(".")),
            excludes: section.excludes.map(resolve),
            rules: section.rules.unwrap_or_default(),
            dry_run: section.dry_run.unwrap_or(false),
        })
    }

    /// Apply positional arguments: one is the target directory, two are the
    /// rule source followed by the target directory.
    pub fn with_positionals(mut self, first: Option<PathBuf>, second: Option<PathBuf>) -> Self {
        match (first, second) {
            (Some(excludes), Some(root)) => {
                self.excludes = Some(excludes);
                self.root = root;
            }
            (Some(root), None) | (None, Some(root)) => self.root = root,
            (None, None) => {}
        }
        self
    }

    /// Build the rule set: the rule source (or defaults), then inline rules.
    pub fn exclusions(&self) -> ExclusionRuleSet {
        let mut set = ExclusionRuleSet::new();
        set.load(self.excludes.as_deref());
        let inline = set.read_rules(&self.rules.join("\n"));
        if inline < self.rules.len() {
            tracing::warn!(
                "ignored {} malformed inline rule(s)",
                self.rules.len() - inline
            );
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("glpatch.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[gl_static_patcher]").unwrap();
        write!(file, "{}", body).unwrap();
        path
    }

    #[test]
    fn no_file_gives_defaults() {
        let cfg = AppConfig::load(None).unwrap();
        assert_eq!(cfg.root, PathBuf::from("."));
        assert!(cfg.excludes.is_none());
        assert!(!cfg.dry_run);
    }

    #[test]
    fn loads_and_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            dir.path(),
            "root = \"src\"\nexcludes = \"rules.txt\"\nrules = [\"A.java/glX\"]\ndry_run = true\n",
        );
        let cfg = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.root, dir.path().join("src"));
        assert_eq!(cfg.excludes, Some(dir.path().join("rules.txt")));
        assert_eq!(cfg.rules, vec!["A.java/glX".to_string()]);
        assert!(cfg.dry_run);
    }

    #[test]
    fn missing_section_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glpatch.toml");
        fs::write(&path, "[other]\nx = 1\n").unwrap();
        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("[gl_static_patcher] not found"));
    }

    #[test]
    fn missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn positionals_override_file() {
        let cfg = AppConfig::default().with_positionals(Some("tree".into()), None);
        assert_eq!(cfg.root, PathBuf::from("tree"));
        assert!(cfg.excludes.is_none());

        let cfg = AppConfig::default().with_positionals(Some("ex.txt".into()), Some("tree".into()));
        assert_eq!(cfg.root, PathBuf::from("tree"));
        assert_eq!(cfg.excludes, Some(PathBuf::from("ex.txt")));
    }

    #[test]
    fn inline_rules_extend_rule_source() {
        let dir = TempDir::new().unwrap();
        let rules_path = dir.path().join("rules.txt");
        fs::write(&rules_path, "A.java/glX\n").unwrap();
        let cfg = AppConfig {
            excludes: Some(rules_path),
            rules: vec!["B.java/glY".into(), "bogus".into()],
            ..AppConfig::default()
        };
        let set = cfg.exclusions();
        assert!(set.is_excluded("A.java", "glX"));
        assert!(set.is_excluded("B.java", "glY"));
        assert!(!set.has_rules_for("OpenGlHelper.java"));
    }
}
