//! Model, deformer and pose blocks

use super::writer::{FbxWriter, num, nums, object_header, quoted};
use super::{Cluster, ExportPlan, Skin, geometry};
use crate::armature::Skeleton;
use crate::collect::{ExportObject, ExportSet};
use crate::scene::{CameraData, LampData, LampKind, ObjectData, ObjectKind};
use crate::transform::{Trs, to_f64};
use glam::Mat4;
use std::io::{self, Write};

/// FBX model type for an object type
pub(crate) fn model_type(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Mesh => "Mesh",
        ObjectKind::Camera => "Camera",
        ObjectKind::Lamp => "Light",
        ObjectKind::Empty | ObjectKind::Armature => "Null",
    }
}

/// Collect per-bone weights for a mesh deformed by an exported armature
pub(crate) fn build_skin(
    object: &ExportObject<'_>,
    set: &ExportSet<'_>,
    skeletons: &[Option<Skeleton>],
    global: Mat4,
) -> Option<Skin> {
    let mesh = object.mesh?;
    let armature = object.armature?;
    let skeleton = skeletons[armature].as_ref()?;
    let armature_world = global * set.objects[armature].world;
    let mesh_world = global * object.world;

    let clusters: Vec<Cluster> = skeleton
        .bones
        .iter()
        .filter_map(|bone| {
            let group = mesh.vertex_groups.iter().find(|g| g.name == bone.name)?;
            let (indexes, weights): (Vec<u32>, Vec<f32>) = group
                .weights
                .iter()
                .filter(|&&(v, w)| w > 0.0 && (v as usize) < mesh.positions.len())
                .copied()
                .unzip();
            if indexes.is_empty() {
                return None;
            }
            let link = armature_world * bone.bind;
            Some(Cluster {
                name: format!("Cluster {} {}", object.name, bone.model),
                bone: bone.model.clone(),
                indexes,
                weights,
                transform: link.inverse() * mesh_world,
                transform_link: link,
            })
        })
        .collect();

    (!clusters.is_empty()).then(|| Skin {
        name: format!("Skin {}", object.name),
        clusters,
    })
}

/// Every Model block, in model order
pub(super) fn write_models<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    for (i, object) in plan.set.objects.iter().enumerate() {
        match &object.source.data {
            ObjectData::Mesh(_) => {
                if let Some(derived) = &plan.meshes[i] {
                    geometry::write_mesh_model(w, plan, object, derived)?;
                }
            }
            ObjectData::Camera(camera) => write_camera(w, plan, object, camera)?,
            ObjectData::Lamp(lamp) => write_light(w, object, lamp)?,
            ObjectData::Empty | ObjectData::Armature(_) => write_null(w, object)?,
        }

        if let Some(skeleton) = &plan.skeletons[i] {
            for bone in &skeleton.bones {
                begin_model(w, &bone.model, "Limb")?;
                w.begin("Properties60", "")?;
                transform_properties(w, bone.rest_local(&skeleton.bones))?;
                w.property("Size", "double", num(100.0))?;
                w.end()?;
                model_footer(w, "Skeleton")?;
                w.end()?;
            }
        }
    }
    Ok(())
}

pub(super) fn begin_model<W: Write>(w: &mut FbxWriter<W>, name: &str, kind: &str) -> io::Result<()> {
    w.begin("Model", &object_header(&format!("Model::{name}"), kind))?;
    w.field("Version", 232)
}

/// Local transform and the fixed per-model properties
pub(super) fn transform_properties<W: Write>(w: &mut FbxWriter<W>, local: Mat4) -> io::Result<()> {
    let trs = Trs::from_matrix(to_f64(local));
    w.property("QuaternionInterpolate", "bool", 0)?;
    w.animated("Visibility", "Visibility", 1)?;
    w.animated("Lcl Translation", "Lcl Translation", nums(trs.translation.to_array()))?;
    w.animated("Lcl Rotation", "Lcl Rotation", nums(trs.rotation.to_array()))?;
    w.animated("Lcl Scaling", "Lcl Scaling", nums(trs.scale.to_array()))?;
    w.property("RotationOrder", "enum", 0)?;
    w.property("InheritType", "enum", 1)?;
    w.property("Show", "bool", 1)
}

/// Lines that follow Properties60 in every model
pub(super) fn model_footer<W: Write>(w: &mut FbxWriter<W>, type_flags: &str) -> io::Result<()> {
    w.field("MultiLayer", 0)?;
    w.field("MultiTake", 1)?;
    w.field("Shading", "Y")?;
    w.string("Culling", "CullingOff")?;
    w.string("TypeFlags", type_flags)
}

fn write_null<W: Write>(w: &mut FbxWriter<W>, object: &ExportObject<'_>) -> io::Result<()> {
    begin_model(w, &object.name, "Null")?;
    w.begin("Properties60", "")?;
    transform_properties(w, object.local)?;
    w.end()?;
    model_footer(w, "Null")?;
    w.end()
}

fn write_camera<W: Write>(
    w: &mut FbxWriter<W>,
    plan: &ExportPlan<'_>,
    object: &ExportObject<'_>,
    camera: &CameraData,
) -> io::Result<()> {
    let scale = plan.config.global_scale;
    begin_model(w, &object.name, "Camera")?;
    w.begin("Properties60", "")?;
    transform_properties(w, object.local)?;
    w.animated("FieldOfView", "FieldOfView", num(camera.field_of_view()))?;
    w.animated("FocalLength", "Real", num(camera.lens))?;
    w.property("FilmWidth", "double", num(camera.sensor_width / 25.4))?;
    w.property("NearPlane", "double", num(camera.clip_start * scale))?;
    w.property("FarPlane", "double", num(camera.clip_end * scale))?;
    w.property("CameraProjectionType", "enum", u8::from(camera.orthographic))?;
    w.property("OrthoZoom", "double", num(camera.ortho_scale))?;
    w.end()?;
    model_footer(w, "Camera")?;
    w.field("GeometryVersion", 124)?;
    w.field("Position", "0.000000,0.000000,0.000000")?;
    w.field("Up", "0,1,0")?;
    w.field("LookAt", "0,0,-1")?;
    w.end()
}

fn write_light<W: Write>(w: &mut FbxWriter<W>, object: &ExportObject<'_>, lamp: &LampData) -> io::Result<()> {
    let light_type = match lamp.kind {
        LampKind::Point | LampKind::Area => 0,
        LampKind::Sun | LampKind::Hemi => 1,
        LampKind::Spot => 2,
    };
    begin_model(w, &object.name, "Light")?;
    w.begin("Properties60", "")?;
    transform_properties(w, object.local)?;
    w.property("LightType", "enum", light_type)?;
    w.property("CastLight", "bool", 1)?;
    w.animated("Color", "Color", nums(lamp.color))?;
    w.animated("Intensity", "Intensity", num(lamp.energy * 100.0))?;
    w.animated("Cone angle", "Cone angle", num(lamp.spot_size.to_degrees()))?;
    w.property("DecayStart", "double", num(lamp.distance))?;
    w.property("CastShadows", "bool", u8::from(lamp.shadows))?;
    w.end()?;
    model_footer(w, "Light")?;
    w.field("GeometryVersion", 124)?;
    w.end()
}

/// Skin and cluster deformers, in mesh order
pub(super) fn write_deformers<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    for skin in plan.skins.iter().flatten() {
        w.begin("Deformer", &object_header(&format!("Deformer::{}", skin.name), "Skin"))?;
        w.field("Version", 100)?;
        w.field("MultiLayer", 0)?;
        w.string("Type", "Skin")?;
        w.begin("Properties60", "")?;
        w.end()?;
        w.field("Link_DeformAcuracy", 50)?;
        w.end()?;

        for cluster in &skin.clusters {
            w.begin("Deformer", &object_header(&format!("SubDeformer::{}", cluster.name), "Cluster"))?;
            w.field("Version", 100)?;
            w.field("MultiLayer", 0)?;
            w.string("Type", "Cluster")?;
            w.begin("Properties60", "")?;
            w.property("SrcModel", "object", "")?;
            w.property("SrcModelReference", "object", "")?;
            w.end()?;
            w.field("UserData", "\"\", \"\"")?;
            w.array("Indexes", &cluster.indexes)?;
            w.array("Weights", cluster.weights.iter().map(|&v| num(v)))?;
            w.field("Transform", matrix(cluster.transform))?;
            w.field("TransformLink", matrix(cluster.transform_link))?;
            w.end()?;
        }
    }
    Ok(())
}

/// Bind pose of every skinned mesh, its armature and bones
pub(super) fn write_bind_pose<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    let nodes = bind_pose_nodes(plan);
    if nodes.is_empty() {
        return Ok(());
    }

    w.begin("Pose", "\"Pose::BIND_POSES\", \"BindPose\"")?;
    w.string("Type", "BindPose")?;
    w.field("Version", 100)?;
    w.begin("Properties60", "")?;
    w.end()?;
    w.field("NbPoseNodes", nodes.len())?;
    for (name, global) in &nodes {
        w.begin("PoseNode", "")?;
        w.field("Node", quoted(&format!("Model::{name}")))?;
        w.field("Matrix", matrix(*global))?;
        w.end()?;
    }
    w.end()
}

/// (model name, global matrix) pairs, without repeats
pub(super) fn bind_pose_nodes(plan: &ExportPlan<'_>) -> Vec<(String, Mat4)> {
    let mut nodes: Vec<(String, Mat4)> = Vec::new();
    let mut add = |name: &str, global: Mat4| {
        if !nodes.iter().any(|(n, _)| n == name) {
            nodes.push((name.to_string(), global));
        }
    };

    for (i, object) in plan.set.objects.iter().enumerate() {
        if plan.skins[i].is_none() {
            continue;
        }
        add(&object.name, plan.global * object.world);

        let Some(a) = object.armature else { continue };
        let armature = &plan.set.objects[a];
        let armature_world = plan.global * armature.world;
        add(&armature.name, armature_world);
        if let Some(skeleton) = &plan.skeletons[a] {
            for bone in &skeleton.bones {
                add(&bone.model, armature_world * bone.bind);
            }
        }
    }
    nodes
}

/// Sixteen column-major values
fn matrix(m: Mat4) -> String {
    nums(m.to_cols_array())
}
