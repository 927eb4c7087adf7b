//! Named export presets
//!
//! A preset is a complete [`ExportConfig`] stored as JSON in
//! `{config_dir}/fbxcust/presets/<name>.json`.

use anyhow::{Context, Result, bail};
use fbxcust_core::config::ExportConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the directory holding the preset files
fn presets_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("fbxcust").join("presets"))
        .context("Could not determine config directory")
}

fn preset_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '));
    if !valid {
        bail!("Invalid preset name '{name}'");
    }
    Ok(dir.join(format!("{name}.json")))
}

pub fn load_preset(name: &str) -> Result<ExportConfig> {
    load_from(&presets_dir()?, name)
}

pub fn save_preset(name: &str, config: &ExportConfig) -> Result<PathBuf> {
    save_to(&presets_dir()?, name, config)
}

pub fn list_presets() -> Result<Vec<String>> {
    list_in(&presets_dir()?)
}

fn load_from(dir: &Path, name: &str) -> Result<ExportConfig> {
    let path = preset_file(dir, name)?;
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Preset '{name}' not found ({})", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Preset '{name}' is not a valid config"))
}

fn save_to(dir: &Path, name: &str, config: &ExportConfig) -> Result<PathBuf> {
    let path = preset_file(dir, name)?;
    fs::create_dir_all(dir).context("Failed to create preset directory")?;

    let json = serde_json::to_string_pretty(config).context("Failed to serialize preset")?;
    fs::write(&path, json).context("Failed to write preset file")?;
    Ok(path)
}

fn list_in(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = fs::read_dir(dir)
        .context("Failed to read preset directory")?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbxcust_core::config::{AxisPreset, NormalMode};

    fn temp_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("fbxcust-preset-tests").join(test);
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_save_load_list() {
        let dir = temp_dir("roundtrip");
        let config = ExportConfig::default()
            .with_axis_preset(AxisPreset::SkelMesh)
            .with_normals(NormalMode::SharpEdges);

        save_to(&dir, "skel mesh", &config).unwrap();
        save_to(&dir, "static", &ExportConfig::default()).unwrap();

        assert_eq!(load_from(&dir, "skel mesh").unwrap(), config);
        assert_eq!(list_in(&dir).unwrap(), vec!["skel mesh", "static"]);
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        assert!(list_in(&temp_dir("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_names() {
        let dir = temp_dir("names");
        assert!(preset_file(&dir, "../escape").is_err());
        assert!(preset_file(&dir, "").is_err());
        assert!(load_from(&dir, "absent").is_err());
    }
}
