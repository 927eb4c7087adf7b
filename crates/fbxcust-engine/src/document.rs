//! Scene documents for the fbxcust engine
//!
//! A document is the JSON stand-in for the host application: every scene,
//! its objects and actions, plus the object groups used by group batch
//! export. It is loaded once and handed to the core as read-only input.

use anyhow::{Context, Result};
use fbxcust_core::scene::{Document, ObjectKind, Scene};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when working with documents
#[derive(Error, Debug)]
pub enum DocumentError {
    /// No document is currently loaded
    #[error("No document loaded")]
    NoDocument,

    /// Document contains no scenes
    #[error("Document has no scenes")]
    NoScenes,

    /// Group batch export on a document without object groups
    #[error("Document has no object groups")]
    NoGroups,
}

/// A parsed document and where it came from
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: Document,

    /// Source file path (if loaded from file)
    pub source_path: Option<PathBuf>,
}

impl LoadedDocument {
    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(text).context("Invalid scene document")?;
        if document.scenes.is_empty() {
            return Err(DocumentError::NoScenes.into());
        }

        Ok(Self {
            document,
            source_path: None,
        })
    }

    /// Read and parse a document file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut loaded =
            Self::from_json(&text).with_context(|| format!("Failed to load {}", path.display()))?;
        loaded.source_path = Some(path.to_path_buf());
        Ok(loaded)
    }

    /// The scene exported when batch mode is off
    pub fn active(&self) -> Result<&Scene, DocumentError> {
        self.document.active().ok_or(DocumentError::NoScenes)
    }

    /// Get the source file name (without path)
    pub fn source_name(&self) -> Option<String> {
        self.source_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn summary(&self) -> DocumentSummary {
        let active = self.document.active().map(|s| s.name.clone());
        DocumentSummary {
            source: self.source_name(),
            scenes: self
                .document
                .scenes
                .iter()
                .map(|scene| SceneSummary::new(scene, active.as_deref() == Some(&scene.name)))
                .collect(),
            groups: self
                .document
                .groups
                .iter()
                .map(|g| (g.name.clone(), g.objects.len()))
                .collect(),
        }
    }
}

/// Object counts and timing of one scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub name: String,
    pub active: bool,
    pub frame_start: i32,
    pub frame_end: i32,
    pub fps: f64,
    /// Object count per type, types without objects omitted
    pub objects: Vec<(ObjectKind, usize)>,
    pub actions: usize,
}

impl SceneSummary {
    fn new(scene: &Scene, active: bool) -> Self {
        let objects = ObjectKind::ALL
            .into_iter()
            .map(|kind| (kind, scene.objects.iter().filter(|o| o.kind() == kind).count()))
            .filter(|&(_, count)| count > 0)
            .collect();

        Self {
            name: scene.name.clone(),
            active,
            frame_start: scene.frame_start,
            frame_end: scene.frame_end,
            fps: scene.fps,
            objects,
            actions: scene.actions.len(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.iter().map(|(_, n)| n).sum()
    }
}

/// Printable overview used by `fbxcust inspect`
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub source: Option<String>,
    pub scenes: Vec<SceneSummary>,
    /// (group name, member count)
    pub groups: Vec<(String, usize)>,
}

impl fmt::Display for DocumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            writeln!(f, "{source}")?;
        }
        for scene in &self.scenes {
            writeln!(
                f,
                "Scene '{}'{}: frames {}-{} at {} fps, {} objects, {} actions",
                scene.name,
                if scene.active { " (active)" } else { "" },
                scene.frame_start,
                scene.frame_end,
                scene.fps,
                scene.object_count(),
                scene.actions
            )?;
            for (kind, count) in &scene.objects {
                writeln!(f, "  {:<10} {}", kind.as_str(), count)?;
            }
        }
        for (name, members) in &self.groups {
            writeln!(f, "Group '{name}': {members} objects")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "scenes": [
            { "name": "Level", "objects": [
                { "name": "Floor", "data": { "type": "EMPTY" } },
                { "name": "Rig", "data": { "type": "ARMATURE", "bones": [] } }
            ] },
            { "name": "Props" }
        ],
        "active_scene": 1,
        "groups": [ { "name": "Set", "objects": ["Floor"] } ]
    }"#;

    #[test]
    fn test_from_json() {
        let loaded = LoadedDocument::from_json(DOCUMENT).unwrap();
        assert_eq!(loaded.document.scenes.len(), 2);
        assert_eq!(loaded.active().unwrap().name, "Props");
        assert!(loaded.source_name().is_none());
    }

    #[test]
    fn test_empty_document_rejected() {
        let err = LoadedDocument::from_json(r#"{ "scenes": [] }"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DocumentError>(),
            Some(DocumentError::NoScenes)
        ));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(LoadedDocument::from_json("{ scenes").is_err());
    }

    #[test]
    fn test_summary() {
        let summary = LoadedDocument::from_json(DOCUMENT).unwrap().summary();
        assert_eq!(
            summary.scenes[0].objects,
            vec![(ObjectKind::Empty, 1), (ObjectKind::Armature, 1)]
        );
        assert!(!summary.scenes[0].active);
        assert!(summary.scenes[1].active);
        assert_eq!(summary.groups, vec![("Set".to_string(), 1)]);

        let text = summary.to_string();
        assert!(text.contains("Scene 'Level': frames 1-250 at 24 fps, 2 objects, 0 actions"));
        assert!(text.contains("Group 'Set': 1 objects"));
    }
}
