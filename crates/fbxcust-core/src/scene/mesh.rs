//! Mesh payload of the input model

use serde::{Deserialize, Serialize};

/// A polygon as an ordered list of vertex indices (one loop per entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<u32>,
    /// Host smooth-shading flag
    #[serde(default = "default_true")]
    pub smooth: bool,
}

impl Polygon {
    pub fn new(vertices: impl Into<Vec<u32>>) -> Self {
        Self {
            vertices: vertices.into(),
            smooth: true,
        }
    }

    pub fn flat(vertices: impl Into<Vec<u32>>) -> Self {
        Self {
            vertices: vertices.into(),
            smooth: false,
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Named per-loop UV coordinates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<[f32; 2]>,
}

/// Named per-loop RGBA colors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorLayer {
    pub name: String,
    pub colors: Vec<[f32; 4]>,
}

/// Element an attribute layer is stored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeDomain {
    #[default]
    Loop,
    Vertex,
}

/// Named 3-vector data layer, e.g. normals written by an external tool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeLayer {
    pub name: String,
    #[serde(default)]
    pub domain: AttributeDomain,
    pub values: Vec<[f32; 3]>,
}

/// Per-vertex weights for one bone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VertexGroup {
    /// Name of the bone this group binds to
    pub name: String,
    /// (vertex index, weight) pairs
    pub weights: Vec<(u32, f32)>,
}

/// Polygon mesh as provided by the host
///
/// Source topology is never mutated by the exporter; derived per-loop
/// data lives in the structures returned by the derivation passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub polygons: Vec<Polygon>,
    #[serde(default)]
    pub uv_layers: Vec<UvLayer>,
    #[serde(default)]
    pub color_layers: Vec<ColorLayer>,
    /// Edges flagged sharp, as vertex index pairs in any order
    #[serde(default)]
    pub sharp_edges: Vec<[u32; 2]>,
    /// Authored split normals, one per loop
    #[serde(default)]
    pub loop_normals: Option<Vec<[f32; 3]>>,
    /// Authored tangents (xyz + handedness), one per loop
    #[serde(default)]
    pub loop_tangents: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub attributes: Vec<AttributeLayer>,
    #[serde(default)]
    pub vertex_groups: Vec<VertexGroup>,
}

impl MeshData {
    pub fn new(positions: Vec<[f32; 3]>, polygons: Vec<Polygon>) -> Self {
        Self {
            positions,
            polygons,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Total number of polygon corners
    pub fn loop_count(&self) -> usize {
        self.polygons.iter().map(Polygon::len).sum()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeLayer> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn with_uv_layer(mut self, name: impl Into<String>, uvs: Vec<[f32; 2]>) -> Self {
        self.uv_layers.push(UvLayer {
            name: name.into(),
            uvs,
        });
        self
    }

    pub fn with_color_layer(mut self, name: impl Into<String>, colors: Vec<[f32; 4]>) -> Self {
        self.color_layers.push(ColorLayer {
            name: name.into(),
            colors,
        });
        self
    }

    pub fn with_sharp_edge(mut self, a: u32, b: u32) -> Self {
        self.sharp_edges.push([a, b]);
        self
    }

    /// Check indices and per-loop layer lengths
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let vertex_count = self.positions.len();
        for (i, polygon) in self.polygons.iter().enumerate() {
            if polygon.len() < 3 {
                return Err(format!("polygon {i} has {} vertices", polygon.len()));
            }
            if let Some(&v) = polygon.vertices.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(format!("polygon {i} references vertex {v} of {vertex_count}"));
            }
        }

        let loops = self.loop_count();
        for layer in &self.uv_layers {
            if layer.uvs.len() != loops {
                return Err(format!(
                    "UV layer '{}' has {} entries for {loops} loops",
                    layer.name,
                    layer.uvs.len()
                ));
            }
        }
        for layer in &self.color_layers {
            if layer.colors.len() != loops {
                return Err(format!(
                    "color layer '{}' has {} entries for {loops} loops",
                    layer.name,
                    layer.colors.len()
                ));
            }
        }
        if let Some(normals) = &self.loop_normals {
            if normals.len() != loops {
                return Err(format!("{} split normals for {loops} loops", normals.len()));
            }
        }
        if let Some(tangents) = &self.loop_tangents {
            if tangents.len() != loops {
                return Err(format!("{} tangents for {loops} loops", tangents.len()));
            }
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}
