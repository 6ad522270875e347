use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Plain (non-static) imports of LWJGL OpenGL classes and the GLU `Project` class.
static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"import (org\.lwjgl\.(?:opengl|util\.glu)\.(Project|GL[A-Za-z0-9_]+));")
        .expect("import line regex")
});

/// One `import org.lwjgl.opengl.GL11;` statement found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedImport {
    /// Class name used as the call-site qualifier, e.g. `GL11`.
    pub alias: String,
    /// Full dotted path, e.g. `org.lwjgl.opengl.GL11`.
    pub qualified: String,
    /// Byte range of the whole statement within the line.
    pub span: Range<usize>,
}

impl QualifiedImport {
    /// The static wildcard import that replaces this statement.
    pub fn blanket(&self) -> String {
        format!("import static {}.*;", self.qualified)
    }
}

/// First import statement starting at or after byte offset `from`.
pub fn find_import_at(line: &str, from: usize) -> Option<QualifiedImport> {
    let caps = IMPORT_LINE.captures_at(line, from)?;
    let whole = caps.get(0)?;
    Some(QualifiedImport {
        alias: caps[2].to_string(),
        qualified: caps[1].to_string(),
        span: whole.range(),
    })
}

/// Split source text into lines. `\r\n`, `\n` and a lone `\r` all end a line,
/// and a final terminator does not start an extra empty line.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(idx) = rest.find(['\r', '\n']) else {
            return Some(std::mem::take(&mut rest));
        };
        let line = &rest[..idx];
        let terminator = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[idx + terminator..];
        Some(line)
    })
}

/// All import statements on a line, left to right.
pub fn find_imports(line: &str) -> Vec<QualifiedImport> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(import) = find_import_at(line, from) {
        from = import.span.end;
        found.push(import);
    }
    found
}

/// A `Alias.glMethod(` invocation found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedCall<'a> {
    pub qualified: &'a str,
    /// `Alias.glMethod` as written, without the parenthesis.
    pub text: &'a str,
    pub method: &'a str,
}

impl QualifiedCall<'_> {
    /// Call text as it appears before rewriting, e.g. `GL11.glClear(`.
    pub fn short_form(&self) -> String {
        format!("{}(", self.text)
    }

    /// Fully qualified replacement, e.g. `org.lwjgl.opengl.GL11.glClear(`.
    pub fn full_form(&self) -> String {
        format!("{}.{}(", self.qualified, self.method)
    }
}

#[derive(Debug, Clone)]
struct AliasEntry {
    alias: String,
    qualified: String,
    call: Regex,
}

/// Aliases registered so far in one file, in registration order, each with a
/// call pattern compiled once and reused for every subsequent line.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: Vec<AliasEntry>,
}

impl ImportTable {
    /// Register an import. Re-registering an alias replaces the earlier entry.
    pub fn register(&mut self, import: &QualifiedImport) {
        let pattern = format!(r"({}\.(?i:(gl[a-z0-9]+)))\(", regex::escape(&import.alias));
        let Ok(call) = Regex::new(&pattern) else {
            tracing::warn!(alias = %import.alias, "could not build call pattern");
            return;
        };
        let entry = AliasEntry {
            alias: import.alias.clone(),
            qualified: import.qualified.clone(),
            call,
        };
        match self.entries.iter_mut().find(|e| e.alias == import.alias) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    #[cfg(test)]
    pub fn qualified(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.alias == alias)
            .map(|e| e.qualified.as_str())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Qualified calls on `line` for every registered alias.
    pub fn calls<'a>(&'a self, line: &'a str) -> Vec<QualifiedCall<'a>> {
        let mut calls = Vec::new();
        for entry in &self.entries {
            for caps in entry.call.captures_iter(line) {
                let (Some(text), Some(method)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                if !is_bare_reference(line, text.start()) {
                    continue;
                }
                calls.push(QualifiedCall {
                    qualified: &entry.qualified,
                    text: text.as_str(),
                    method: method.as_str(),
                });
            }
        }
        calls
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// True when the text at `at` is not the tail of a dotted path or of a longer identifier.
pub(crate) fn is_bare_reference(line: &str, at: usize) -> bool {
    !line[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c == '.' || is_identifier_char(c))
}

/// Replace each bare occurrence of `needle` whose trailing text satisfies `accept_rest`.
pub(crate) fn replace_bare(
    line: &str,
    needle: &str,
    replacement: &str,
    accept_rest: impl Fn(&str) -> bool,
) -> String {
    let mut out = String::with_capacity(line.len());
    let mut copied = 0;
    for (idx, _) in line.match_indices(needle) {
        let end = idx + needle.len();
        if is_bare_reference(line, idx) && accept_rest(&line[end..]) {
            out.push_str(&line[copied..idx]);
            out.push_str(replacement);
            copied = end;
        }
    }
    out.push_str(&line[copied..]);
    out
}
