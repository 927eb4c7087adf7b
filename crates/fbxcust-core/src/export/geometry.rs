//! Mesh models: inline geometry and layer elements

use super::ExportPlan;
use super::objects::{begin_model, model_footer, transform_properties};
use super::writer::{FbxWriter, num, nums};
use crate::collect::ExportObject;
use crate::config::SmoothingMode;
use crate::mesh::DerivedMesh;
use crate::scene::{ColorLayer, MeshData};
use glam::Vec3;
use std::io::{self, Write};

/// Layer element references of one `Layer` block
type LayerEntries = Vec<(&'static str, usize)>;

pub(super) fn write_mesh_model<W: Write>(
    w: &mut FbxWriter<W>,
    plan: &ExportPlan<'_>,
    object: &ExportObject<'_>,
    derived: &DerivedMesh,
) -> io::Result<()> {
    let Some(mesh) = object.mesh else {
        return Ok(());
    };
    let config = plan.config;

    begin_model(w, &object.name, "Mesh")?;
    w.begin("Properties60", "")?;
    transform_properties(w, object.local)?;
    w.end()?;
    model_footer(w, "")?;

    w.array("Vertices", mesh.positions.iter().flatten().map(|&v| num(v)))?;
    w.array("PolygonVertexIndex", polygon_vertex_index(mesh))?;
    if config.use_mesh_edges || config.smoothing == SmoothingMode::Edge {
        w.array(
            "Edges",
            derived.topology.edges.iter().flat_map(|e| [e.0, e.1]),
        )?;
    }
    w.field("GeometryVersion", 124)?;

    let mut layers: Vec<LayerEntries> = vec![Vec::new()];

    write_vectors(w, "Normal", "Normals", &derived.normals.normals)?;
    layers[0].push(("LayerElementNormal", 0));

    if let Some(tangents) = &derived.tangents {
        write_vectors(w, "Tangent", "Tangents", &tangents.tangents)?;
        write_vectors(w, "Binormal", "Binormals", &tangents.binormals)?;
        layers[0].push(("LayerElementTangent", 0));
        layers[0].push(("LayerElementBinormal", 0));
    }

    if let Some(values) = smoothing_values(config.smoothing, mesh, derived) {
        let mapping = if config.smoothing == SmoothingMode::Edge {
            "ByEdge"
        } else {
            "ByPolygon"
        };
        w.begin("LayerElementSmoothing", "0")?;
        w.field("Version", 102)?;
        w.string("Name", "")?;
        w.string("MappingInformationType", mapping)?;
        w.string("ReferenceInformationType", "Direct")?;
        w.array("Smoothing", values)?;
        w.end()?;
        layers[0].push(("LayerElementSmoothing", 0));
    }

    for (index, layer) in mesh.uv_layers.iter().enumerate() {
        w.begin("LayerElementUV", &index.to_string())?;
        w.field("Version", 101)?;
        w.string("Name", &layer.name)?;
        w.string("MappingInformationType", "ByPolygonVertex")?;
        w.string("ReferenceInformationType", "IndexToDirect")?;
        w.array("UV", layer.uvs.iter().flatten().map(|&v| num(v)))?;
        w.array("UVIndex", 0..layer.uvs.len())?;
        w.end()?;
        layer_slot(&mut layers, index).push(("LayerElementUV", index));
    }

    let colors = if config.merge_vertex_colors && mesh.color_layers.len() > 1 {
        vec![merge_colors(&mesh.color_layers)]
    } else {
        mesh.color_layers.clone()
    };
    for (index, layer) in colors.iter().enumerate() {
        w.begin("LayerElementColor", &index.to_string())?;
        w.field("Version", 101)?;
        w.string("Name", &layer.name)?;
        w.string("MappingInformationType", "ByPolygonVertex")?;
        w.string("ReferenceInformationType", "IndexToDirect")?;
        w.array("Colors", layer.colors.iter().flatten().map(|&v| num(v)))?;
        w.array("ColorIndex", 0..layer.colors.len())?;
        w.end()?;
        layer_slot(&mut layers, index).push(("LayerElementColor", index));
    }

    for (index, entries) in layers.iter().enumerate() {
        w.begin("Layer", &index.to_string())?;
        w.field("Version", 100)?;
        for (kind, typed_index) in entries {
            w.begin("LayerElement", "")?;
            w.string("Type", kind)?;
            w.field("TypedIndex", typed_index)?;
            w.end()?;
        }
        w.end()?;
    }

    w.end()
}

fn layer_slot(layers: &mut Vec<LayerEntries>, index: usize) -> &mut LayerEntries {
    if layers.len() <= index {
        layers.resize_with(index + 1, Vec::new);
    }
    &mut layers[index]
}

/// Vertex indices with the last index of each polygon stored as `-(i + 1)`
pub(crate) fn polygon_vertex_index(mesh: &MeshData) -> Vec<i64> {
    mesh.polygons
        .iter()
        .flat_map(|polygon| {
            let last = polygon.vertices.len() - 1;
            polygon.vertices.iter().enumerate().map(move |(i, &v)| {
                let v = i64::from(v);
                if i == last { -v - 1 } else { v }
            })
        })
        .collect()
}

/// ByPolygonVertex / Direct vector layer
fn write_vectors<W: Write>(w: &mut FbxWriter<W>, element: &str, array: &str, values: &[Vec3]) -> io::Result<()> {
    w.begin(&format!("LayerElement{element}"), "0")?;
    w.field("Version", 101)?;
    w.string("Name", "")?;
    w.string("MappingInformationType", "ByPolygonVertex")?;
    w.string("ReferenceInformationType", "Direct")?;
    w.array(array, values.iter().map(|v| nums(v.to_array())))?;
    w.end()
}

fn smoothing_values(mode: SmoothingMode, mesh: &MeshData, derived: &DerivedMesh) -> Option<Vec<u32>> {
    match mode {
        SmoothingMode::Off => None,
        SmoothingMode::Groups => derived.smoothing.as_ref().map(|s| s.masks.clone()),
        SmoothingMode::Face => Some(mesh.polygons.iter().map(|p| u32::from(p.smooth)).collect()),
        SmoothingMode::Edge => Some(
            derived
                .topology
                .edge_sharp
                .iter()
                .map(|&sharp| u32::from(!sharp))
                .collect(),
        ),
    }
}

/// Component-wise product of every color layer
pub(crate) fn merge_colors(layers: &[ColorLayer]) -> ColorLayer {
    let len = layers.iter().map(|l| l.colors.len()).min().unwrap_or(0);
    let colors = (0..len)
        .map(|i| {
            layers.iter().fold([1.0f32; 4], |acc, layer| {
                let c = layer.colors[i];
                [acc[0] * c[0], acc[1] * c[1], acc[2] * c[2], acc[3] * c[3]]
            })
        })
        .collect();
    ColorLayer {
        name: "Col".to_string(),
        colors,
    }
}
