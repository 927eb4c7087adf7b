//! Export orchestration for the fbxcust engine
//!
//! Expands the batch mode of an [`ExportConfig`] into concrete export runs
//! (one per file) and hands each one to the core pipeline.

use crate::document::DocumentError;
use anyhow::{Context, Result};
use fbxcust_core::config::{BatchMode, ExportConfig};
use fbxcust_core::export::{EXTENSION, ExportReport, PreparedExport};
use fbxcust_core::scene::{Document, Group, Scene};
use fbxcust_core::ConfigError;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Options for an export command
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output file, or the file prefix in batch modes
    pub path: PathBuf,

    pub config: ExportConfig,
}

impl ExportOptions {
    /// Create export options for a given path with the default configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: ExportConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }
}

/// Result of one written file
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Scene or group the file was produced from
    pub source: String,

    pub report: ExportReport,
}

impl std::fmt::Display for ExportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.source, self.report)
    }
}

/// One planned export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTarget {
    /// Scene or group name
    pub source: String,
    pub path: PathBuf,
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`
pub fn clean_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Single-file output path, with the default extension when none is given
pub fn output_path(path: &Path) -> PathBuf {
    let mut output = path.to_path_buf();
    if output.extension().is_none() {
        output.set_extension(EXTENSION);
    }
    output
}

/// Batch output path: `path` is a directory plus file name prefix
pub fn batch_path(path: &Path, name: &str, own_dir: bool) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let prefix = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = format!("{prefix}{}", clean_name(name));
    let file = format!("{stem}.{EXTENSION}");

    if own_dir {
        dir.join(&stem).join(file)
    } else {
        dir.join(file)
    }
}

/// Every file the options produce for `document`, in order
pub fn plan_batch(document: &Document, options: &ExportOptions) -> Result<Vec<BatchTarget>, DocumentError> {
    let config = &options.config;
    let path = &options.path;

    let targets = match config.batch_mode {
        BatchMode::Off => {
            let scene = document.active().ok_or(DocumentError::NoScenes)?;
            vec![BatchTarget {
                source: scene.name.clone(),
                path: output_path(path),
            }]
        }
        BatchMode::Scene => {
            if document.scenes.is_empty() {
                return Err(DocumentError::NoScenes);
            }
            document
                .scenes
                .iter()
                .map(|scene| BatchTarget {
                    source: scene.name.clone(),
                    path: batch_path(path, &scene.name, config.batch_own_dir),
                })
                .collect()
        }
        BatchMode::Group => {
            if document.groups.is_empty() {
                return Err(DocumentError::NoGroups);
            }
            document
                .groups
                .iter()
                .map(|group| BatchTarget {
                    source: group.name.clone(),
                    path: batch_path(path, &group.name, config.batch_own_dir),
                })
                .collect()
        }
    };

    Ok(targets)
}

/// Scene restricted to the members of `group`
///
/// Membership replaces the host selection, so non-member ancestors stay in
/// the scene for parent resolution without being exported.
pub fn group_scene(scene: &Scene, group: &Group) -> Scene {
    let mut scene = scene.clone();
    for object in &mut scene.objects {
        object.selected = group.objects.contains(&object.name);
    }
    scene
}

/// Run every planned export for `document`
///
/// Every target is resolved and prepared before the first file is written,
/// so a configuration error in any target leaves the output untouched. If a
/// later write fails, files already written by this run are removed.
pub fn export_document(document: &Document, options: &ExportOptions) -> Result<Vec<ExportResult>> {
    if options.path.as_os_str().is_empty() {
        return Err(fbxcust_core::Error::from(ConfigError::MissingFilepath).into());
    }

    let targets = plan_batch(document, options)?;
    tracing::debug!(
        "Planned {} export(s) in {} mode",
        targets.len(),
        options.config.batch_mode
    );

    let mut inputs = Vec::with_capacity(targets.len());
    for (index, target) in targets.into_iter().enumerate() {
        let (scene, config) = resolve_input(document, &options.config, index)?;
        if options.config.batch_mode == BatchMode::Group && !scene.objects.iter().any(|o| o.selected) {
            tracing::info!("Skipping group '{}': no members in scene", target.source);
            continue;
        }
        inputs.push((target, scene, config));
    }

    let mut prepared = Vec::with_capacity(inputs.len());
    for (target, scene, config) in &inputs {
        let export = PreparedExport::new(scene, config)
            .with_context(|| format!("Failed to export '{}'", target.source))?;
        prepared.push((target, export));
    }

    let mut results: Vec<ExportResult> = Vec::with_capacity(prepared.len());
    for (target, export) in prepared {
        match write_target(target, export, options.config.batch_mode) {
            Ok(report) => results.push(ExportResult {
                source: target.source.clone(),
                report,
            }),
            Err(e) => {
                remove_written(&results);
                return Err(e);
            }
        }
    }

    Ok(results)
}

fn write_target(target: &BatchTarget, export: PreparedExport<'_>, mode: BatchMode) -> Result<ExportReport> {
    if mode != BatchMode::Off
        && let Some(dir) = target.path.parent().filter(|d| !d.as_os_str().is_empty())
    {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    export
        .write(&target.path)
        .with_context(|| format!("Failed to export '{}'", target.source))
}

fn remove_written(results: &[ExportResult]) {
    for result in results {
        let path = &result.report.path;
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// Scene and config for the `index`th planned target
fn resolve_input<'a>(
    document: &'a Document,
    config: &'a ExportConfig,
    index: usize,
) -> Result<(Cow<'a, Scene>, Cow<'a, ExportConfig>), DocumentError> {
    match config.batch_mode {
        BatchMode::Off => {
            let scene = document.active().ok_or(DocumentError::NoScenes)?;
            Ok((Cow::Borrowed(scene), Cow::Borrowed(config)))
        }
        BatchMode::Scene => {
            let scene = document.scenes.get(index).ok_or(DocumentError::NoScenes)?;
            Ok((Cow::Borrowed(scene), Cow::Borrowed(config)))
        }
        BatchMode::Group => {
            let scene = document.active().ok_or(DocumentError::NoScenes)?;
            let group = document.groups.get(index).ok_or(DocumentError::NoGroups)?;
            let config = config.clone().with_selection(true);
            Ok((Cow::Owned(group_scene(scene, group)), Cow::Owned(config)))
        }
    }
}
