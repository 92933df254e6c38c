//! Plugin discovery across configured plugin directories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::manifest::{ManifestSource, PluginManifest};

/// Directory names that are never scanned as candidate plugin roots.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".git",
    ".cache",
    "coverage",
    "vendor",
    "__pycache__",
];

/// Safety cap on candidate roots per configured directory.
const MAX_ROOTS_PER_DIR: usize = 80;

/// Plugin found on disk. Immutable per scan.
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    /// Plugin ID.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Version string.
    pub version: String,

    /// Description.
    pub description: Option<String>,

    /// Plugin root directory.
    pub root: PathBuf,

    /// Path of the manifest file the plugin was detected from.
    pub manifest_path: PathBuf,

    /// Which manifest file matched.
    pub source: ManifestSource,

    /// Renderer entry as written in the manifest, if any.
    pub renderer_entry: Option<String>,
}

/// Result of a discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Discovered plugins, deduped by manifest path and sorted by name.
    pub plugins: Vec<DiscoveredPlugin>,

    /// Non-fatal problems hit while scanning.
    pub warnings: Vec<String>,
}

/// Scan the configured plugin directories.
///
/// Each directory contributes itself plus its immediate non-hidden,
/// non-ignored subdirectories as candidate roots, capped at
/// [`MAX_ROOTS_PER_DIR`]. Manifest detection per root is first-match-wins in
/// the order primary, compat, package descriptor.
pub async fn discover(directories: &[PathBuf]) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();
    let mut seen_manifests: HashSet<PathBuf> = HashSet::new();

    for dir in directories {
        let meta = match tokio::fs::metadata(dir).await {
            Ok(meta) => meta,
            Err(_) => {
                outcome
                    .warnings
                    .push(format!("Plugin directory does not exist: {}", dir.display()));
                continue;
            }
        };
        if !meta.is_dir() {
            outcome
                .warnings
                .push(format!("Plugin path is not a directory: {}", dir.display()));
            continue;
        }

        for root in candidate_roots(dir).await {
            let Some(plugin) = detect_plugin(&root).await else {
                continue;
            };
            if seen_manifests.insert(plugin.manifest_path.clone()) {
                outcome.plugins.push(plugin);
            }
        }
    }

    outcome
        .plugins
        .sort_by_key(|p| p.name.to_lowercase());
    tracing::debug!(
        count = outcome.plugins.len(),
        warnings = outcome.warnings.len(),
        "plugin discovery finished"
    );
    outcome
}

/// The directory itself plus its eligible immediate subdirectories.
async fn candidate_roots(dir: &Path) -> Vec<PathBuf> {
    let mut roots = vec![dir.to_path_buf()];

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return roots;
    };
    let mut subdirs = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || IGNORED_DIRS.contains(&name) {
            continue;
        }
        match entry.file_type().await {
            Ok(ft) if ft.is_dir() => subdirs.push(path),
            _ => {}
        }
    }
    // Deterministic order regardless of readdir ordering.
    subdirs.sort();
    roots.extend(subdirs);
    roots.truncate(MAX_ROOTS_PER_DIR);
    roots
}

/// Try the manifest files for one candidate root, first match wins.
async fn detect_plugin(root: &Path) -> Option<DiscoveredPlugin> {
    for source in [
        ManifestSource::Primary,
        ManifestSource::Compat,
        ManifestSource::Package,
    ] {
        let manifest_path = root.join(source.filename());
        let Ok(content) = tokio::fs::read_to_string(&manifest_path).await else {
            continue;
        };

        let parsed = match source {
            ManifestSource::Package => PluginManifest::parse_package_descriptor(&content),
            _ => PluginManifest::parse(&content).map(Some),
        };
        let manifest = match parsed {
            Ok(Some(manifest)) => manifest,
            // A package.json without plugin hints is not an error; keep probing.
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(path = %manifest_path.display(), error = %e, "skipping unreadable manifest");
                continue;
            }
        };
        if let Err(e) = manifest.validate() {
            tracing::warn!(path = %manifest_path.display(), error = %e, "skipping invalid manifest");
            continue;
        }

        let dir_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("plugin")
            .to_string();
        let id = manifest.id.clone().unwrap_or_else(|| dir_name.clone());
        let name = manifest.name.clone().unwrap_or_else(|| id.clone());

        return Some(DiscoveredPlugin {
            id,
            name,
            version: manifest.version.clone().unwrap_or_else(|| "0.0.0".into()),
            description: manifest.description.clone(),
            root: root.to_path_buf(),
            manifest_path,
            source,
            renderer_entry: manifest.renderer_entry,
        });
    }
    None
}
