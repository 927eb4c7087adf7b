//! fbxcust Engine - document loading and batch export
//!
//! The Engine is a thin orchestration layer over fbxcust-core: it loads a
//! scene document, expands batch modes into individual export runs and
//! decides where each file goes.
//!
//! ## Example
//!
//! ```ignore
//! use fbxcust_engine::{Engine, ExportOptions};
//!
//! let mut engine = Engine::new();
//! engine.load_document(Path::new("level.json"))?;
//!
//! let config = ExportConfig::default().with_batch(BatchMode::Scene, true);
//! for result in engine.export(&ExportOptions::new("out/level_").with_config(config))? {
//!     println!("{result}");
//! }
//! ```

pub mod document;
pub mod export;

use anyhow::Result;
use std::path::Path;

// Re-export commonly used types from the core
pub use fbxcust_core::config::{BatchMode, ExportConfig};
pub use fbxcust_core::export::ExportReport;
pub use fbxcust_core::scene::Document;
pub use fbxcust_core::warning::Warning;

// Re-export our own types
pub use document::{DocumentError, DocumentSummary, LoadedDocument, SceneSummary};
pub use export::{BatchTarget, ExportOptions, ExportResult, export_document, plan_batch};

/// The main fbxcust engine
///
/// Holds at most one loaded document and runs exports against it.
#[derive(Debug, Default)]
pub struct Engine {
    current: Option<LoadedDocument>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Load a scene document from a JSON file
    pub fn load_document(&mut self, path: &Path) -> Result<&LoadedDocument> {
        let loaded = LoadedDocument::from_path(path)?;
        tracing::debug!(
            "Loaded {} with {} scene(s)",
            path.display(),
            loaded.document.scenes.len()
        );
        Ok(&*self.current.insert(loaded))
    }

    /// Load a scene document from JSON text
    pub fn load_str(&mut self, json: &str) -> Result<&LoadedDocument> {
        let loaded = LoadedDocument::from_json(json)?;
        Ok(&*self.current.insert(loaded))
    }

    /// Get the currently loaded document (if any)
    pub fn document(&self) -> Option<&LoadedDocument> {
        self.current.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.current.is_some()
    }

    pub fn clear_document(&mut self) {
        self.current = None;
    }

    /// Summary of the loaded document
    pub fn inspect(&self) -> Result<DocumentSummary, DocumentError> {
        self.current
            .as_ref()
            .map(LoadedDocument::summary)
            .ok_or(DocumentError::NoDocument)
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Export the loaded document, one result per written file
    pub fn export(&self, options: &ExportOptions) -> Result<Vec<ExportResult>> {
        let loaded = self.current.as_ref().ok_or(DocumentError::NoDocument)?;
        export_document(&loaded.document, options)
    }

    /// Files an export would write, without writing them
    pub fn plan(&self, options: &ExportOptions) -> Result<Vec<BatchTarget>, DocumentError> {
        let loaded = self.current.as_ref().ok_or(DocumentError::NoDocument)?;
        plan_batch(&loaded.document, options)
    }
}
