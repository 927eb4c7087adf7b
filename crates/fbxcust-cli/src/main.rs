//! fbxcust CLI - FBX 6.1 ASCII export from scene documents

mod presets;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fbxcust_core::config::{
    Axis, AxisPreset, BatchMode, ExportConfig, NormalMode, SmoothingMode, TangentMode,
};
use fbxcust_core::scene::ObjectKind;
use fbxcust_engine::{Engine, ExportOptions};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fbxcust")]
#[command(about = "Export scene documents to FBX 6.1 ASCII", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene document to FBX
    Export {
        /// Input scene document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, or file name prefix in batch modes
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        source: ConfigSource,

        #[command(flatten)]
        flags: ConfigFlags,
    },

    /// Manage saved export presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Print a summary of a scene document
    Inspect {
        /// Input scene document (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the resolved export configuration as JSON
    Config {
        #[command(flatten)]
        source: ConfigSource,

        #[command(flatten)]
        flags: ConfigFlags,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save the resolved configuration under a name
    Save {
        /// Preset name
        name: String,

        #[command(flatten)]
        source: ConfigSource,

        #[command(flatten)]
        flags: ConfigFlags,
    },

    /// List saved presets
    List,
}

/// Where the base configuration comes from; flags are applied on top
#[derive(Args)]
struct ConfigSource {
    /// Start from a saved preset
    #[arg(long)]
    preset: Option<String>,

    /// JSON config file; its keys override the preset
    #[arg(long)]
    config: Option<PathBuf>,
}

/// One flag per export option
#[derive(Args, Default)]
struct ConfigFlags {
    /// Object types to export (comma separated)
    #[arg(long, value_delimiter = ',')]
    types: Option<Vec<ObjectKind>>,

    /// Only export selected objects
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    use_selection: Option<bool>,

    /// Export modifier-evaluated meshes
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    apply_modifiers: Option<bool>,

    /// Axis preset (SKEL_MESH, STATIC_MESH)
    #[arg(long)]
    axis_preset: Option<AxisPreset>,

    /// Forward axis (X, Y, Z, -X, -Y, -Z)
    #[arg(long, allow_hyphen_values = true)]
    axis_forward: Option<Axis>,

    /// Up axis (X, Y, Z, -X, -Y, -Z)
    #[arg(long, allow_hyphen_values = true)]
    axis_up: Option<Axis>,

    /// Uniform scale (0.01 to 1000)
    #[arg(long)]
    scale: Option<f32>,

    /// Smoothing layer (OFF, GROUPS, FACE, EDGE)
    #[arg(long)]
    smoothing: Option<SmoothingMode>,

    /// Smoothing group split angle in degrees
    #[arg(long)]
    smoothing_angle: Option<f32>,

    /// Normal source (DEFAULT, SHARP_EDGES, SMOOTHING_GROUPS, EXTERNAL_SOURCE, AUTO)
    #[arg(long)]
    normals: Option<NormalMode>,

    /// Layer holding externally computed normals
    #[arg(long)]
    external_normals_layer: Option<String>,

    /// Tangent source (DEFAULT, CUSTOM_LENGYEL, NONE)
    #[arg(long)]
    tangents: Option<TangentMode>,

    /// UV layer index used for tangents
    #[arg(long)]
    tangent_uv_layer: Option<usize>,

    /// Combine all vertex color layers into one
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    merge_vertex_colors: Option<bool>,

    /// Write the edge array
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    use_mesh_edges: Option<bool>,

    /// Only export deforming bones
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    deform_bones_only: Option<bool>,

    /// Export keyframe animation
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    animation: Option<bool>,

    /// One take per action
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    all_actions: Option<bool>,

    /// Add a take over the scene frame range
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    default_take: Option<bool>,

    /// Remove redundant keyframes
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    optimize_keyframes: Option<bool>,

    /// Keyframe optimization precision (1 to 16)
    #[arg(long)]
    precision: Option<f64>,

    /// Batch layout (OFF, SCENE, GROUP)
    #[arg(long)]
    batch: Option<BatchMode>,

    /// Give each batch file its own directory
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    batch_own_dir: Option<bool>,
}

impl ConfigSource {
    fn load(&self) -> Result<ExportConfig> {
        let mut config = match &self.preset {
            Some(name) => presets::load_preset(name)?,
            None => ExportConfig::default(),
        };

        if let Some(path) = &self.config {
            config = apply_config_file(&config, path)?;
        }

        Ok(config)
    }
}

impl ConfigFlags {
    fn apply(self, config: &mut ExportConfig) {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        if let Some(types) = self.types {
            config.object_types = types.into_iter().collect();
        }
        set(&mut config.use_selection, self.use_selection);
        set(&mut config.apply_modifiers, self.apply_modifiers);
        if let Some(preset) = self.axis_preset {
            (config.axis_forward, config.axis_up) = preset.axes();
        }
        set(&mut config.axis_forward, self.axis_forward);
        set(&mut config.axis_up, self.axis_up);
        set(&mut config.global_scale, self.scale);
        set(&mut config.smoothing, self.smoothing);
        set(&mut config.smoothing_angle, self.smoothing_angle);
        set(&mut config.normals, self.normals);
        set(&mut config.external_normals_layer, self.external_normals_layer);
        set(&mut config.tangents, self.tangents);
        set(&mut config.tangent_uv_layer, self.tangent_uv_layer);
        set(&mut config.merge_vertex_colors, self.merge_vertex_colors);
        set(&mut config.use_mesh_edges, self.use_mesh_edges);
        set(&mut config.deform_bones_only, self.deform_bones_only);

        let animation = &mut config.animation;
        set(&mut animation.enabled, self.animation);
        set(&mut animation.all_actions, self.all_actions);
        set(&mut animation.default_take, self.default_take);
        set(&mut animation.optimize, self.optimize_keyframes);
        set(&mut animation.precision, self.precision);

        set(&mut config.batch_mode, self.batch);
        set(&mut config.batch_own_dir, self.batch_own_dir);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            source,
            flags,
        } => {
            let config = resolve_config(&source, flags)?;
            run_export(&input, output, config)?;
        }
        Commands::Preset { action } => match action {
            PresetAction::Save {
                name,
                source,
                flags,
            } => {
                let config = resolve_config(&source, flags)?;
                let path = presets::save_preset(&name, &config)?;
                println!("Saved preset '{}' to {}", name, path.display());
            }
            PresetAction::List => {
                let names = presets::list_presets()?;
                if names.is_empty() {
                    println!("No saved presets");
                }
                for name in names {
                    println!("{name}");
                }
            }
        },
        Commands::Inspect { input } => {
            let mut engine = Engine::new();
            engine.load_document(&input)?;
            print!("{}", engine.inspect()?);
        }
        Commands::Config { source, flags } => {
            let config = resolve_config(&source, flags)?;
            let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn resolve_config(source: &ConfigSource, flags: ConfigFlags) -> Result<ExportConfig> {
    let mut config = source.load()?;
    flags.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Overlay the keys of a JSON config file onto `base`
fn apply_config_file(base: &ExportConfig, path: &Path) -> Result<ExportConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let overlay: Value =
        serde_json::from_str(&contents).with_context(|| format!("Invalid config file {}", path.display()))?;
    overlay_config(base, overlay).with_context(|| format!("Invalid config file {}", path.display()))
}

fn overlay_config(base: &ExportConfig, overlay: Value) -> Result<ExportConfig> {
    let mut merged = serde_json::to_value(base).context("Failed to serialize config")?;
    merge_json(&mut merged, overlay);
    Ok(serde_json::from_value(merged)?)
}

/// Recursively merge objects; any other overlay value replaces the base
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn run_export(input: &Path, output: PathBuf, config: ExportConfig) -> Result<()> {
    let mut engine = Engine::new();
    engine.load_document(input)?;
    tracing::info!("Exporting {} in {} mode", input.display(), config.batch_mode);

    let results = engine.export(&ExportOptions::new(output).with_config(config))?;
    for result in &results {
        println!("{result}");
        for warning in &result.report.warnings {
            println!("  warning: {warning}");
        }
    }
    if results.is_empty() {
        println!("Nothing exported");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "fbxcust",
            "export",
            "-i",
            "scene.json",
            "-o",
            "out.fbx",
            "--axis-forward",
            "-Z",
            "--axis-up",
            "Y",
            "--normals",
            "smoothing_groups",
            "--types",
            "MESH,EMPTY",
            "--animation",
            "--use-selection",
            "false",
        ])
        .unwrap();

        let Commands::Export { flags, .. } = cli.command else {
            panic!("expected export command");
        };
        let mut config = ExportConfig::default().with_axis_preset(AxisPreset::SkelMesh);
        flags.apply(&mut config);

        assert_eq!(config.axis_forward, Axis::NegZ);
        assert_eq!(config.axis_up, Axis::Y);
        assert_eq!(config.normals, NormalMode::SmoothingGroups);
        assert!(config.exports(ObjectKind::Empty));
        assert!(!config.exports(ObjectKind::Armature));
        assert!(config.animation.enabled);
        assert!(!config.use_selection);
        assert_eq!(config.tangents, TangentMode::CustomLengyel);
    }

    #[test]
    fn test_config_file_overlays_preset() {
        let preset = ExportConfig::default()
            .with_axis_preset(AxisPreset::SkelMesh)
            .with_normals(NormalMode::SharpEdges)
            .with_tangents(TangentMode::None);
        let overlay = serde_json::json!({
            "global_scale": 2.0,
            "animation": { "enabled": true }
        });

        let config = overlay_config(&preset, overlay).unwrap();
        assert_relative_eq!(config.global_scale, 2.0);
        assert!(config.animation.enabled);
        assert_relative_eq!(config.animation.precision, preset.animation.precision);
        assert_eq!((config.axis_forward, config.axis_up), AxisPreset::SkelMesh.axes());
        assert_eq!(config.normals, NormalMode::SharpEdges);
        assert_eq!(config.tangents, TangentMode::None);
    }

    #[test]
    fn test_config_file_on_disk_overlays_preset() {
        let dir = std::env::temp_dir().join("fbxcust-cli-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("partial.json");
        std::fs::write(&path, r#"{ "use_selection": false }"#).unwrap();

        let preset = ExportConfig::default().with_normals(NormalMode::SharpEdges);
        let config = apply_config_file(&preset, &path).unwrap();
        assert!(!config.use_selection);
        assert_eq!(config.normals, NormalMode::SharpEdges);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let source = ConfigSource {
            preset: None,
            config: None,
        };
        let flags = ConfigFlags {
            axis_forward: Some(Axis::Z),
            ..Default::default()
        };
        assert!(resolve_config(&source, flags).is_err());
    }
}
