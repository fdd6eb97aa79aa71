//! Project manifest reading.
//!
//! A manifest is a JSON file (comments and trailing commas allowed) with
//! optional `files`, `include`, `exclude` and `compilerOptions` fields. It
//! resolves to a sorted set of member files below the manifest directory
//! plus explicitly listed files, which may live anywhere.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Deserialize;

use super::config::HostOptions;
use super::error::ManifestError;
use super::fs::{normalize_path, FileSystem};

const SCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts", ".js", ".jsx"];
const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A resolved project manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub path: PathBuf,
    /// Directory containing the manifest
    pub dir: PathBuf,
    pub file_names: BTreeSet<PathBuf>,
    pub compiler_options: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    files: Option<Vec<String>>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    #[serde(default)]
    compiler_options: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    /// Read and resolve the manifest at `path`.
    pub fn read(
        fs: &dyn FileSystem,
        path: &Path,
        options: &HostOptions,
    ) -> Result<Self, ManifestError> {
        if !fs.exists(path) {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }
        let text = fs.read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawManifest = serde_json::from_str(&strip_json_comments(&text))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut file_names = BTreeSet::new();
        for file in raw.files.iter().flatten() {
            let file = normalize_path(&dir.join(file));
            if fs.exists(&file) {
                file_names.insert(file);
            }
        }

        let include = match (&raw.include, &raw.files) {
            (Some(include), _) => include.clone(),
            (None, Some(_)) => Vec::new(),
            (None, None) => vec!["**/*".to_string()],
        };
        let exclude = raw
            .exclude
            .clone()
            .unwrap_or_else(|| DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect());

        let include = compile_specs(&dir, &include)?;
        let exclude = compile_specs(&dir, &exclude)?;
        if !include.is_empty() {
            let extensions: Vec<&str> = SCRIPT_EXTENSIONS
                .iter()
                .copied()
                .chain(options.extra_extensions.iter().map(String::as_str))
                .collect();
            collect_files(fs, &dir, &include, &exclude, &extensions, &mut file_names);
        }

        let mut compiler_options = raw.compiler_options;
        compiler_options.insert("allowJs".to_string(), serde_json::Value::Bool(true));

        Ok(Self {
            path: path.to_path_buf(),
            dir,
            file_names,
            compiler_options,
        })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.file_names.contains(path)
    }
}

/// Patterns for include/exclude specs. A spec naming a directory (no
/// wildcard, no extension) also matches everything below it.
fn compile_specs(dir: &Path, specs: &[String]) -> Result<Vec<Pattern>, ManifestError> {
    let base = Pattern::escape(&dir.to_string_lossy());
    let mut patterns = Vec::with_capacity(specs.len());
    for spec in specs {
        let spec = spec.trim_start_matches("./").trim_end_matches('/');
        let pattern = if spec.is_empty() {
            base.clone()
        } else {
            format!("{}/{}", base.trim_end_matches('/'), spec)
        };
        let last = spec.rsplit('/').next().unwrap_or(spec);
        let is_directory = !last.contains(['*', '?', '[']) && !last.contains('.');
        if is_directory {
            patterns.push(Pattern::new(&format!("{}/**/*", pattern.trim_end_matches('/')))?);
        }
        patterns.push(Pattern::new(&pattern)?);
    }
    Ok(patterns)
}

fn matches_any(patterns: &[Pattern], path: &Path) -> bool {
    patterns
        .iter()
        .any(|pattern| pattern.matches_path_with(path, MATCH_OPTIONS))
}

fn collect_files(
    fs: &dyn FileSystem,
    dir: &Path,
    include: &[Pattern],
    exclude: &[Pattern],
    extensions: &[&str],
    out: &mut BTreeSet<PathBuf>,
) {
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = match fs.read_dir(&current) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(dir = %current.display(), %error, "cannot read directory");
                continue;
            }
        };
        for entry in entries {
            if matches_any(exclude, &entry) {
                continue;
            }
            if fs.is_dir(&entry) {
                stack.push(entry);
                continue;
            }
            let has_extension = entry
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| extensions.iter().any(|ext| name.ends_with(ext)));
            if has_extension && matches_any(include, &entry) {
                out.insert(entry);
            }
        }
    }
}

/// Remove `//` and `/* */` comments and trailing commas, leaving string
/// literals untouched.
fn strip_json_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;
    // Byte index in `out` of a pending comma, if nothing but whitespace follows it
    let mut pending_comma: Option<usize> = None;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                pending_comma = None;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&text[copied..i]);
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                copied = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[copied..i]);
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                copied = i;
            }
            b',' => {
                out.push_str(&text[copied..i]);
                pending_comma = Some(out.len());
                out.push(',');
                i += 1;
                copied = i;
            }
            b'}' | b']' => {
                if let Some(at) = pending_comma.take() {
                    out.push_str(&text[copied..i]);
                    out.replace_range(at..at + 1, " ");
                    copied = i;
                }
                i += 1;
            }
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            _ => {
                pending_comma = None;
                i += 1;
            }
        }
    }
    out.push_str(&text[copied.min(text.len())..]);
    out
}
