//! Path arithmetic on canonical `/`-separated path strings.
//!
//! The driver hands the pipeline already-enumerated paths; these helpers
//! only join and normalize, they never touch the filesystem.

/// Join a directory and a relative specifier, resolving `.` and `..`
/// segments. Returns `None` when `..` would escape the root.
pub fn join_normalized(dir: &str, rel: &str) -> Option<String> {
    let mut parts: Vec<&str> = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect()
    };
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Strip a leading `./` from a specifier.
pub fn strip_leading_dot(spec: &str) -> &str {
    spec.strip_prefix("./").unwrap_or(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_segments() {
        assert_eq!(
            join_normalized("src/models", "../util/helpers").as_deref(),
            Some("src/util/helpers")
        );
        assert_eq!(join_normalized("src", "./user").as_deref(), Some("src/user"));
        assert_eq!(join_normalized("", "main").as_deref(), Some("main"));
    }

    #[test]
    fn escaping_the_root_fails() {
        assert_eq!(join_normalized("src", "../../x"), None);
    }
}
