use super::imports::{find_import_at, replace_bare, split_lines};
use super::prescan::Overrides;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Every output line ends with CRLF regardless of the input's line endings.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Aliases whose qualifier is stripped from the current line onwards.
#[derive(Debug, Clone, Default)]
pub struct RewriteState {
    aliases: Vec<String>,
}

impl RewriteState {
    #[cfg(test)]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// Rewrite one line.
///
/// Imports are turned into static wildcard imports first, then overrides pin
/// excluded calls to their fully qualified form, and finally the `Alias.`
/// qualifier of every alias imported so far is stripped. Overrides must run
/// before stripping; their output is preceded by a dot and is left alone.
pub fn rewrite_line(
    mut state: RewriteState,
    line: &str,
    overrides: &Overrides,
) -> (RewriteState, String) {
    let mut line = line.to_string();
    let mut from = 0;
    while let Some(import) = find_import_at(&line, from) {
        let blanket = import.blanket();
        line.replace_range(import.span.clone(), &blanket);
        from = import.span.start + blanket.len();
        if !state.aliases.contains(&import.alias) {
            state.aliases.push(import.alias);
        }
    }

    let mut line = overrides.apply(&line);
    for alias in &state.aliases {
        let qualifier = format!("{alias}.");
        if line.contains(&qualifier) {
            line = replace_bare(&line, &qualifier, "", |rest| {
                rest.starts_with(|c: char| c.is_ascii_alphabetic())
            });
        }
    }
    (state, line)
}

/// Rewrite a whole file's text.
pub fn rewrite_source(text: &str, overrides: &Overrides) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut state = RewriteState::default();
    for line in split_lines(text) {
        let (next, rewritten) = rewrite_line(state, line, overrides);
        state = next;
        out.push_str(&rewritten);
        out.push_str(LINE_TERMINATOR);
    }
    out
}

/// Original and rewritten content of one file.
#[derive(Debug, Clone)]
pub struct FileRewrite {
    pub original: String,
    pub rewritten: String,
}

impl FileRewrite {
    pub fn is_changed(&self) -> bool {
        self.original != self.rewritten
    }
}

/// Compute the rewrite of `path` without touching it.
pub fn preview_file(path: &Path, overrides: &Overrides) -> Result<FileRewrite> {
    let original =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let rewritten = rewrite_source(&original, overrides);
    Ok(FileRewrite {
        original,
        rewritten,
    })
}

/// Rewrite `path` in place. Returns whether the content changed.
pub fn rewrite_file(path: &Path, overrides: &Overrides) -> Result<bool> {
    let rewrite = preview_file(path, overrides)?;
    if !rewrite.is_changed() {
        return Ok(false);
    }
    write_atomic(path, &rewrite.rewritten)?;
    Ok(true)
}

/// Replace `path` through a sibling temp file, so a failed write leaves the
/// original untouched.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let permissions = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .permissions();

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    tmp.as_file()
        .set_permissions(permissions)
        .with_context(|| format!("failed to copy permissions of {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
