//! Glob pattern matching for workspace file search.
//!
//! Supports `*`, `**`, `?`, `{a,b}` alternation and `[...]` character classes,
//! matched against `/`-separated paths relative to the workspace root.

use regex::Regex;

use crate::error::AgentError;

/// Compile a glob pattern into an anchored regex.
pub fn compile(pattern: &str) -> Result<Regex, AgentError> {
    let pattern = pattern.trim_start_matches("./");
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut brace_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                if at_segment_start && chars.get(i + 2) == Some(&'/') {
                    // `**/` matches zero or more whole directories.
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '{' => {
                brace_depth += 1;
                out.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                out.push(')');
            }
            ',' if brace_depth > 0 => out.push('|'),
            '[' => match chars[i + 1..].iter().position(|&ch| ch == ']') {
                Some(offset) => {
                    let class: String = chars[i + 1..i + 1 + offset].iter().collect();
                    let class = class.strip_prefix('!').map_or(class.clone(), |rest| format!("^{}", rest));
                    out.push('[');
                    out.push_str(&class.replace('\\', "\\\\"));
                    out.push(']');
                    i += offset + 2;
                    continue;
                }
                None => out.push_str("\\["),
            },
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    if brace_depth > 0 {
        return Err(AgentError::InvalidInput(format!(
            "unbalanced braces in pattern: {}",
            pattern
        )));
    }

    out.push('$');
    Regex::new(&out).map_err(|e| AgentError::InvalidInput(format!("bad glob {}: {}", pattern, e)))
}
