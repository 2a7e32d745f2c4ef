//! File-backed scratch memory the interviewer can write to.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AgentError;
use crate::workspace::resolve_within;

/// One memory tool command, as sent by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MemoryCommand {
    View {
        path: String,
        #[serde(default)]
        view_range: Option<(i64, i64)>,
    },
    Create {
        path: String,
        file_text: String,
    },
    StrReplace {
        path: String,
        old_str: String,
        new_str: String,
    },
    Insert {
        path: String,
        insert_line: i64,
        insert_text: String,
    },
    Delete {
        path: String,
    },
    Rename {
        old_path: String,
        new_path: String,
    },
}

/// Memory files under a single root directory, created on first use.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: PathBuf,
}

impl MemoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn execute(&self, command: MemoryCommand) -> Result<String, AgentError> {
        fs::create_dir_all(&self.root)?;

        match command {
            MemoryCommand::View { path, view_range } => {
                let file = self.resolve(&path)?;
                if file.is_dir() {
                    return list_tree(&file);
                }
                let content = fs::read_to_string(&file)?;
                match view_range {
                    Some((start, end)) => {
                        let lines: Vec<&str> = content.split('\n').collect();
                        let start = (start.max(1) - 1) as usize;
                        let end = if end < 0 {
                            lines.len()
                        } else {
                            (end as usize).min(lines.len())
                        };
                        if start >= end {
                            return Ok(String::new());
                        }
                        Ok(lines[start..end].join("\n"))
                    }
                    None => Ok(content),
                }
            }
            MemoryCommand::Create { path, file_text } => {
                let file = self.resolve(&path)?;
                ensure_parent(&file)?;
                fs::write(&file, file_text)?;
                Ok(format!("File created: {}", path))
            }
            MemoryCommand::StrReplace {
                path,
                old_str,
                new_str,
            } => {
                let file = self.resolve(&path)?;
                let content = fs::read_to_string(&file)?;
                if !content.contains(&old_str) {
                    return Err(AgentError::Tool(format!("String not found in file: {}", path)));
                }
                fs::write(&file, content.replacen(&old_str, &new_str, 1))?;
                Ok(format!("String replaced in file: {}", path))
            }
            MemoryCommand::Insert {
                path,
                insert_line,
                insert_text,
            } => {
                let file = self.resolve(&path)?;
                let content = fs::read_to_string(&file)?;
                let mut lines: Vec<&str> = content.split('\n').collect();
                let at = insert_line.saturating_sub(1).clamp(0, lines.len() as i64) as usize;
                lines.insert(at, &insert_text);
                fs::write(&file, lines.join("\n"))?;
                Ok(format!(
                    "Text inserted at line {} in file: {}",
                    insert_line, path
                ))
            }
            MemoryCommand::Delete { path } => {
                let file = self.resolve(&path)?;
                if file == self.root {
                    return Err(AgentError::Tool(format!(
                        "Refusing to delete the memory root: {}",
                        path
                    )));
                }
                fs::remove_file(&file)?;
                Ok(format!("File deleted: {}", path))
            }
            MemoryCommand::Rename { old_path, new_path } => {
                let from = self.resolve(&old_path)?;
                let to = self.resolve(&new_path)?;
                ensure_parent(&to)?;
                fs::rename(&from, &to)?;
                Ok(format!("File renamed from {} to {}", old_path, new_path))
            }
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AgentError> {
        resolve_within(&self.root, path)
    }
}

fn ensure_parent(file: &Path) -> Result<(), AgentError> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn list_tree(dir: &Path) -> Result<String, AgentError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();
    Ok(names.join("\n"))
}
