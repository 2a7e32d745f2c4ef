//! Read-only access to the interview context directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::AgentError;
use crate::glob;

/// Resolve `relative` under `root` without letting it escape.
///
/// Leading slashes are treated as relative to the root. The check is lexical;
/// `..` that would climb above the root is rejected.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf, AgentError> {
    let mut depth = 0usize;
    let mut resolved = root.to_path_buf();

    for component in Path::new(relative.trim_start_matches(['/', '\\'])).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(AgentError::PathEscape(relative.to_string()));
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(AgentError::PathEscape(relative.to_string()));
            }
        }
    }

    Ok(resolved)
}

/// One file's matches from a grep search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrepFile {
    pub file: String,
    pub content: String,
}

/// The candidate's materials (resume, README, project notes).
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, relative: &str) -> Result<PathBuf, AgentError> {
        resolve_within(&self.root, relative)
    }

    /// Lines `start_line..=end_line` (1-based) of a text file.
    pub fn read_file(
        &self,
        path: &str,
        start_line: Option<usize>,
        end_line: Option<usize>,
    ) -> Result<String, AgentError> {
        let content = fs::read_to_string(self.resolve(path)?)?;
        let lines: Vec<&str> = content.split('\n').collect();

        let start = start_line.unwrap_or(1).max(1) - 1;
        let end = end_line.unwrap_or(lines.len()).min(lines.len());
        if start >= end {
            return Ok(String::new());
        }
        Ok(lines[start..end].join("\n"))
    }

    /// Child names of a directory, directories suffixed with `/`.
    pub fn list_dir(&self, path: &str) -> Result<Vec<String>, AgentError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Relative paths of files matching a glob pattern.
    pub fn file_search(&self, pattern: &str) -> Result<Vec<String>, AgentError> {
        let matcher = glob::compile(pattern)?;
        Ok(self
            .walk()?
            .into_iter()
            .filter(|path| matcher.is_match(path))
            .collect())
    }

    /// Regex search over every markdown file, with surrounding lines.
    ///
    /// Files without a match are omitted. Overlapping context windows are
    /// merged; separate windows are joined by a `--` line. Each line is
    /// prefixed with its 1-based number.
    pub fn grep_search(
        &self,
        query: &str,
        before: usize,
        after: usize,
    ) -> Result<Vec<GrepFile>, AgentError> {
        let regex = Regex::new(query)
            .map_err(|e| AgentError::InvalidInput(format!("bad regex {}: {}", query, e)))?;
        let markdown = glob::compile("**/*.md")?;

        let mut files = Vec::new();
        for relative in self.walk()?.into_iter().filter(|p| markdown.is_match(p)) {
            let content = match fs::read_to_string(self.root.join(&relative)) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!(file = %relative, error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            if let Some(snippet) = grep_snippet(&content, &regex, before, after) {
                files.push(GrepFile {
                    file: relative,
                    content: snippet,
                });
            }
        }
        Ok(files)
    }

    /// Every file under the root as a sorted, `/`-separated relative path.
    fn walk(&self) -> Result<Vec<String>, AgentError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| AgentError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }

        files.sort();
        Ok(files)
    }
}

fn grep_snippet(content: &str, regex: &Regex, before: usize, after: usize) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut windows: Vec<(usize, usize)> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !regex.is_match(line) {
            continue;
        }
        let start = i.saturating_sub(before);
        let end = (i + after).min(lines.len() - 1);
        match windows.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => windows.push((start, end)),
        }
    }

    if windows.is_empty() {
        return None;
    }

    let blocks: Vec<String> = windows
        .iter()
        .map(|&(start, end)| {
            (start..=end)
                .map(|n| format!("{}: {}", n + 1, lines[n]))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();
    Some(blocks.join("\n--\n"))
}
