//! Per-language behavior objects.
//!
//! Everything the extractors and resolvers need to know about a language
//! beyond its grammar lives here: self-reference keywords, constructor
//! conventions, hoisting, and module-path resolution. The pipeline core
//! consults these objects instead of branching on the language.

use crate::parsing::language::Language;
use crate::parsing::paths::join_normalized;
use crate::types::FilePath;
use std::collections::HashMap;

/// The set of files known to the project, used to resolve import
/// specifiers. Lookup is by canonical path string.
#[derive(Debug, Default, Clone)]
pub struct FileSet {
    paths: HashMap<String, FilePath>,
}

impl FileSet {
    pub fn new(paths: impl IntoIterator<Item = FilePath>) -> Self {
        Self {
            paths: paths
                .into_iter()
                .map(|p| (p.as_str().to_string(), p))
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FilePath> {
        self.paths.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Language-specific policy consulted by the extractors and resolvers.
pub trait LanguageBehavior: Send + Sync {
    fn language(&self) -> Language;

    /// Keywords that make a method call a self-reference call.
    fn self_keywords(&self) -> &'static [&'static str];

    /// The name a constructor method carries in this language.
    fn constructor_method_name(&self) -> Option<&'static str>;

    /// Whether a bare-name call with a leading-uppercase callee is a
    /// constructor invocation (Python's `User()`).
    fn uppercase_call_is_constructor(&self) -> bool {
        false
    }

    /// Whether `var`-style declarations and function declarations bind in
    /// the nearest function scope instead of their lexical block.
    fn hoists_to_function_scope(&self) -> bool {
        false
    }

    /// Resolve an import specifier to a project file, or `None` for
    /// external/unresolvable modules.
    fn resolve_module_path(
        &self,
        importing: &FilePath,
        specifier: &str,
        files: &FileSet,
    ) -> Option<FilePath>;

    fn is_self_keyword(&self, text: &str) -> bool {
        self.self_keywords().contains(&text)
    }

    /// Receiver text that names a type rather than an instance.
    fn receiver_is_type_name(&self, receiver: &str) -> bool {
        receiver.chars().next().is_some_and(|c| c.is_uppercase())
    }
}

/// Look up the behavior object for a language.
pub fn behavior_for(language: Language) -> &'static dyn LanguageBehavior {
    match language {
        Language::JavaScript => &JsBehavior { typescript: false },
        Language::TypeScript => &JsBehavior { typescript: true },
        Language::Python => &PythonBehavior,
        Language::Rust => &RustBehavior,
    }
}

struct JsBehavior {
    #[allow(dead_code)]
    typescript: bool,
}

const JS_PROBE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

impl LanguageBehavior for JsBehavior {
    fn language(&self) -> Language {
        if self.typescript {
            Language::TypeScript
        } else {
            Language::JavaScript
        }
    }

    fn self_keywords(&self) -> &'static [&'static str] {
        &["this", "super"]
    }

    fn constructor_method_name(&self) -> Option<&'static str> {
        Some("constructor")
    }

    fn hoists_to_function_scope(&self) -> bool {
        true
    }

    fn resolve_module_path(
        &self,
        importing: &FilePath,
        specifier: &str,
        files: &FileSet,
    ) -> Option<FilePath> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            // Bare specifier: an external package.
            return None;
        }
        let base = join_normalized(importing.parent(), specifier)?;
        if let Some(found) = files.get(&base) {
            return Some(found.clone());
        }
        for ext in JS_PROBE_EXTENSIONS {
            if let Some(found) = files.get(&format!("{base}.{ext}")) {
                return Some(found.clone());
            }
        }
        for ext in JS_PROBE_EXTENSIONS {
            if let Some(found) = files.get(&format!("{base}/index.{ext}")) {
                return Some(found.clone());
            }
        }
        None
    }
}

struct PythonBehavior;

impl LanguageBehavior for PythonBehavior {
    fn language(&self) -> Language {
        Language::Python
    }

    fn self_keywords(&self) -> &'static [&'static str] {
        &["self", "cls", "super"]
    }

    fn constructor_method_name(&self) -> Option<&'static str> {
        Some("__init__")
    }

    fn uppercase_call_is_constructor(&self) -> bool {
        true
    }

    fn resolve_module_path(
        &self,
        importing: &FilePath,
        specifier: &str,
        files: &FileSet,
    ) -> Option<FilePath> {
        // Relative imports: one leading dot per level up, starting from
        // the importing file's package.
        let (base_dir, dotted) = if let Some(stripped) = specifier.strip_prefix('.') {
            let mut dir = importing.parent().to_string();
            let mut rest = stripped;
            while let Some(more) = rest.strip_prefix('.') {
                dir = match dir.rfind('/') {
                    Some(idx) => dir[..idx].to_string(),
                    None if dir.is_empty() => return None,
                    None => String::new(),
                };
                rest = more;
            }
            (dir, rest.to_string())
        } else {
            (String::new(), specifier.to_string())
        };

        let rel = dotted.replace('.', "/");
        let candidates = if rel.is_empty() {
            vec![format!("{base_dir}/__init__.py")]
        } else {
            let base = join_normalized(&base_dir, &rel)?;
            vec![
                format!("{base}.py"),
                format!("{base}/__init__.py"),
                format!("{base}.pyi"),
            ]
        };
        for candidate in candidates {
            let candidate = candidate.trim_start_matches('/');
            if let Some(found) = files.get(candidate) {
                return Some(found.clone());
            }
        }
        None
    }
}

struct RustBehavior;

impl LanguageBehavior for RustBehavior {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn self_keywords(&self) -> &'static [&'static str] {
        &["self", "Self"]
    }

    fn constructor_method_name(&self) -> Option<&'static str> {
        Some("new")
    }

    fn resolve_module_path(
        &self,
        importing: &FilePath,
        specifier: &str,
        files: &FileSet,
    ) -> Option<FilePath> {
        let mut segments: Vec<&str> = specifier.split("::").collect();
        if segments.is_empty() {
            return None;
        }

        // The final segment names a symbol; the prefix names the module.
        segments.pop();

        let mut dir: String;
        match segments.first().copied() {
            Some("crate") => {
                dir = "src".to_string();
                segments.remove(0);
            }
            Some("self") => {
                dir = importing.parent().to_string();
                segments.remove(0);
            }
            Some("super") => {
                dir = importing.parent().to_string();
                while segments.first() == Some(&"super") {
                    dir = match dir.rfind('/') {
                        Some(idx) => dir[..idx].to_string(),
                        None => return None,
                    };
                    segments.remove(0);
                }
            }
            _ => {
                // External crate or sibling module of the importing file.
                dir = importing.parent().to_string();
            }
        }

        if segments.is_empty() {
            return files.get(&format!("{dir}/mod.rs")).cloned().or_else(|| {
                files.get(&format!("{dir}.rs")).cloned()
            });
        }

        let module_rel = segments.join("/");
        let base = join_normalized(&dir, &module_rel)?;
        for candidate in [format!("{base}.rs"), format!("{base}/mod.rs")] {
            if let Some(found) = files.get(&candidate) {
                return Some(found.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_set(paths: &[&str]) -> FileSet {
        FileSet::new(paths.iter().map(|p| FilePath::new(*p)))
    }

    #[test]
    fn js_relative_import_probes_extensions() {
        let files = file_set(&["src/user.ts", "src/util/index.ts"]);
        let behavior = behavior_for(Language::TypeScript);
        let importing = FilePath::new("src/main.ts");

        assert_eq!(
            behavior
                .resolve_module_path(&importing, "./user", &files)
                .unwrap()
                .as_str(),
            "src/user.ts"
        );
        assert_eq!(
            behavior
                .resolve_module_path(&importing, "./util", &files)
                .unwrap()
                .as_str(),
            "src/util/index.ts"
        );
        assert!(behavior
            .resolve_module_path(&importing, "lodash", &files)
            .is_none());
    }

    #[test]
    fn python_absolute_and_relative_imports() {
        let files = file_set(&["pkg/models.py", "pkg/sub/__init__.py", "top.py"]);
        let behavior = behavior_for(Language::Python);

        let importing = FilePath::new("pkg/app.py");
        assert_eq!(
            behavior
                .resolve_module_path(&importing, "pkg.models", &files)
                .unwrap()
                .as_str(),
            "pkg/models.py"
        );
        assert_eq!(
            behavior
                .resolve_module_path(&importing, ".models", &files)
                .unwrap()
                .as_str(),
            "pkg/models.py"
        );
        assert_eq!(
            behavior
                .resolve_module_path(&importing, "pkg.sub", &files)
                .unwrap()
                .as_str(),
            "pkg/sub/__init__.py"
        );
        assert_eq!(
            behavior
                .resolve_module_path(&importing, "top", &files)
                .unwrap()
                .as_str(),
            "top.py"
        );
    }

    #[test]
    fn rust_crate_paths() {
        let files = file_set(&["src/lib.rs", "src/store.rs", "src/net/mod.rs"]);
        let behavior = behavior_for(Language::Rust);
        let importing = FilePath::new("src/lib.rs");

        assert_eq!(
            behavior
                .resolve_module_path(&importing, "crate::store::Store", &files)
                .unwrap()
                .as_str(),
            "src/store.rs"
        );
        assert_eq!(
            behavior
                .resolve_module_path(&importing, "crate::net::Listener", &files)
                .unwrap()
                .as_str(),
            "src/net/mod.rs"
        );
        assert!(behavior
            .resolve_module_path(&importing, "std::collections::HashMap", &files)
            .is_none());
    }

    #[test]
    fn self_keywords_per_language() {
        assert!(behavior_for(Language::JavaScript).is_self_keyword("this"));
        assert!(behavior_for(Language::Python).is_self_keyword("cls"));
        assert!(behavior_for(Language::Rust).is_self_keyword("self"));
        assert!(!behavior_for(Language::Rust).is_self_keyword("this"));
    }

    #[test]
    fn type_name_receivers() {
        let behavior = behavior_for(Language::TypeScript);
        assert!(behavior.receiver_is_type_name("User"));
        assert!(!behavior.receiver_is_type_name("user"));
    }
}
