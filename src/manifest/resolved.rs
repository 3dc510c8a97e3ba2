//! `Cartfile.resolved` parsing

use crate::dependency::Dependency;
use crate::error::{CartwheelError, CartwheelResult};
use std::path::Path;

/// Parse the pinned source dependencies of a `Cartfile.resolved`.
///
/// Each relevant line reads `<kind> "<location>" "<version>"` where kind is
/// `git` or `github`. The dependency name is the last path component of
/// the location without a `.git` suffix. Other lines (`binary`, comments,
/// blanks) are ignored.
pub fn parse(text: &str, path: &Path) -> CartwheelResult<Vec<Dependency>> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("git"))
        .map(|line| parse_line(line, path))
        .collect()
}

fn parse_line(line: &str, path: &Path) -> CartwheelResult<Dependency> {
    let invalid = |reason: &str| CartwheelError::ManifestInvalid {
        path: path.to_path_buf(),
        reason: format!("{}: {}", reason, line),
    };

    let fields: Vec<&str> = line
        .split_whitespace()
        .map(|field| field.trim_matches(|c| c == '"' || c == '\''))
        .collect();
    let [_, location, version] = fields.as_slice() else {
        return Err(invalid("expected `<kind> \"<location>\" \"<version>\"`"));
    };

    let name = location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|last| last.strip_suffix(".git").unwrap_or(last))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| invalid("cannot derive a dependency name"))?;

    if version.is_empty() {
        return Err(invalid("missing version"));
    }

    Ok(Dependency::new(name, *version))
}
