//! Requirements file reading.
//!
//! Understands the subset of the pip requirements format that matters for
//! resolution:
//!
//! - one requirement per line, blank lines ignored
//! - `#` comments, on their own line or after whitespace
//! - `\` at the end of a line joins it with the next one
//! - `-r FILE` / `--requirement FILE` includes, relative to the including
//!   file; a file already being read is skipped, so include cycles terminate
//! - every other option line (`-i`, `--hash`, `-e`, ...) is skipped
//!
//! Parse errors carry the file and line number of the logical line's first
//! physical line.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::Requirement;
use crate::core::PwiError;

/// A logical line after continuation joining and comment stripping.
#[derive(Debug, PartialEq, Eq)]
struct LogicalLine {
    number: usize,
    text: String,
}

/// Parse requirements from text.
///
/// `origin` names the text in error messages. Include lines are skipped
/// because there is no directory to resolve them against; use
/// [`read_requirements_file`] for files.
pub fn parse_requirements(content: &str, origin: &str) -> Result<Vec<Requirement>, PwiError> {
    let mut requirements = Vec::new();
    for line in logical_lines(content) {
        if line.text.starts_with('-') {
            tracing::debug!("{origin}:{}: skipping option line '{}'", line.number, line.text);
            continue;
        }
        requirements.push(parse_line(&line, origin)?);
    }
    Ok(requirements)
}

/// Read a requirements file, following `-r` includes.
pub fn read_requirements_file(path: &Path) -> Result<Vec<Requirement>, PwiError> {
    let mut requirements = Vec::new();
    let mut active = HashSet::new();
    read_into(path, &mut active, &mut requirements)?;
    Ok(requirements)
}

fn read_into(path: &Path, active: &mut HashSet<PathBuf>, out: &mut Vec<Requirement>) -> Result<(), PwiError> {
    let canonical = path.canonicalize().map_err(|e| PwiError::IoError(std::io::Error::new(
        e.kind(),
        format!("cannot read requirements file {}: {e}", path.display()),
    )))?;
    if !active.insert(canonical.clone()) {
        tracing::warn!("requirements file {} includes itself; skipping", path.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(&canonical)?;
    let origin = path.display().to_string();
    let base = canonical.parent().map(Path::to_path_buf).unwrap_or_default();

    for line in logical_lines(&content) {
        if let Some(include) = include_target(&line.text) {
            if include.is_empty() {
                return Err(PwiError::MalformedRequirement {
                    input: line.text.clone(),
                    reason: format!("{origin}:{}: missing file name after -r", line.number),
                });
            }
            tracing::debug!("{origin}:{}: including {include}", line.number);
            read_into(&base.join(include), active, out)?;
        } else if line.text.starts_with('-') {
            tracing::debug!("{origin}:{}: skipping option line '{}'", line.number, line.text);
        } else {
            out.push(parse_line(&line, &origin)?);
        }
    }

    active.remove(&canonical);
    Ok(())
}

fn parse_line(line: &LogicalLine, origin: &str) -> Result<Requirement, PwiError> {
    Requirement::parse(&line.text).map_err(|e| match e {
        PwiError::MalformedRequirement {
            input,
            reason,
        } => PwiError::MalformedRequirement {
            input,
            reason: format!("{origin}:{}: {reason}", line.number),
        },
        other => other,
    })
}

fn include_target(text: &str) -> Option<&str> {
    if let Some(rest) = text.strip_prefix("--requirement") {
        let rest = rest.strip_prefix('=').unwrap_or(rest);
        return Some(rest.trim());
    }
    text.strip_prefix("-r").map(str::trim)
}

fn strip_comment(line: &str) -> &str {
    let mut previous_is_space = true;
    for (i, c) in line.char_indices() {
        if c == '#' && previous_is_space {
            return &line[..i];
        }
        previous_is_space = c.is_whitespace();
    }
    line
}

fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    let mut start = 0;

    for (index, raw) in content.lines().enumerate() {
        if buffer.is_empty() {
            start = index + 1;
        }
        let line = strip_comment(raw).trim_end();
        match line.strip_suffix('\\') {
            Some(joined) => {
                buffer.push_str(joined);
                buffer.push(' ');
            }
            None => {
                buffer.push_str(line);
                let text = buffer.trim().to_string();
                if !text.is_empty() {
                    lines.push(LogicalLine {
                        number: start,
                        text,
                    });
                }
                buffer.clear();
            }
        }
    }

    let text = buffer.trim().to_string();
    if !text.is_empty() {
        lines.push(LogicalLine {
            number: start,
            text,
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(requirements: &[Requirement]) -> Vec<&str> {
        requirements.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let content = "# web stack\n\nFlask>=2.0  # the framework\n\n  gunicorn\nurl-lib#not-a-comment==1.0\n";
        let lines = logical_lines(content);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 3);
        assert_eq!(lines[0].text, "Flask>=2.0");
        assert_eq!(lines[2].text, "url-lib#not-a-comment==1.0");
    }

    #[test]
    fn test_continuation_lines() {
        let content = "requests >=2.0, \\\n    <3.0\nflask\n";
        let requirements = parse_requirements(content, "reqs.txt").unwrap();
        assert_eq!(names(&requirements), vec!["requests", "flask"]);
        assert_eq!(requirements[0].constraint.to_string(), ">=2.0,<3.0");
    }

    #[test]
    fn test_option_lines_are_skipped() {
        let content = "--index-url https://pypi.org/simple\n-e .\nflask\n--hash=sha256:abc\n";
        let requirements = parse_requirements(content, "reqs.txt").unwrap();
        assert_eq!(names(&requirements), vec!["flask"]);
    }

    #[test]
    fn test_error_has_line_number() {
        let content = "flask\n\nrequests>>2\n";
        match parse_requirements(content, "reqs.txt") {
            Err(PwiError::MalformedRequirement {
                input,
                reason,
            }) => {
                assert_eq!(input, "requests>>2");
                assert!(reason.starts_with("reqs.txt:3:"), "{reason}");
            }
            other => panic!("expected MalformedRequirement, got {other:?}"),
        }
    }

    #[test]
    fn test_includes_are_followed() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("base.txt"), "flask\n-r sub/dev.txt\n").unwrap();
        std::fs::write(dir.path().join("sub/dev.txt"), "pytest>=7\n--requirement=../extra.txt\n").unwrap();
        std::fs::write(dir.path().join("extra.txt"), "black\n").unwrap();

        let requirements = read_requirements_file(&dir.path().join("base.txt")).unwrap();
        assert_eq!(names(&requirements), vec!["flask", "pytest", "black"]);
    }

    #[test]
    fn test_include_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "flask\n-r b.txt\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "requests\n-r a.txt\n").unwrap();

        let requirements = read_requirements_file(&dir.path().join("a.txt")).unwrap();
        assert_eq!(names(&requirements), vec!["flask", "requests"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_requirements_file(&dir.path().join("nope.txt"));
        assert!(matches!(result, Err(PwiError::IoError(_))));
    }
}
