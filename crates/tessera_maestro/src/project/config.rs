//! Project host configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Host options, read from the editor-supplied initialization JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOptions {
    /// Whether file-set and content changes schedule validation passes
    #[serde(default = "default_true")]
    pub diagnostics: bool,

    /// File name of project manifests
    #[serde(default = "default_manifest_file_name")]
    pub manifest_file_name: String,

    /// Composite-document extensions added to every manifest's file list
    #[serde(default = "default_extra_extensions")]
    pub extra_extensions: Vec<String>,

    /// Directory names never scanned for manifests
    #[serde(default = "default_skip_directories")]
    pub skip_directories: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_manifest_file_name() -> String {
    "tsconfig.json".to_string()
}

fn default_extra_extensions() -> Vec<String> {
    vec![".vue".to_string()]
}

fn default_skip_directories() -> Vec<String> {
    vec!["node_modules".to_string()]
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            diagnostics: default_true(),
            manifest_file_name: default_manifest_file_name(),
            extra_extensions: default_extra_extensions(),
            skip_directories: default_skip_directories(),
        }
    }
}

impl HostOptions {
    /// Parse options from a JSON value; missing fields take their defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_manifest(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == self.manifest_file_name)
    }

    /// Whether the path names a composite document.
    pub fn is_composite(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        self.extra_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    pub fn is_skipped_directory(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.skip_directories.iter().any(|skip| skip == name))
    }
}
