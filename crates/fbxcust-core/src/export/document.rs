//! Top-level layout of an FBX 6.1 ASCII document

use super::writer::{FbxWriter, num, object_header, quoted};
use super::{ExportPlan, objects, takes};
use crate::anim::ktime;
use std::io::{self, Write};

/// Fixed creation stamp so output does not depend on the clock
const CREATION_TIME: &str = "1970-01-01 00:00:00:000";

/// Serialize a complete plan
pub(super) fn write<W: Write>(plan: &ExportPlan<'_>, out: &mut W) -> io::Result<()> {
    let mut w = FbxWriter::new(out);

    write_header(&mut w)?;

    w.section("Object definitions")?;
    write_definitions(&mut w, plan)?;

    w.section("Object properties")?;
    w.begin("Objects", "")?;
    objects::write_models(&mut w, plan)?;
    objects::write_deformers(&mut w, plan)?;
    objects::write_bind_pose(&mut w, plan)?;
    write_global_settings(&mut w, plan)?;
    w.end()?;

    w.section("Object relations")?;
    write_relations(&mut w, plan)?;

    w.section("Object connections")?;
    write_connections(&mut w, plan)?;

    w.section("Takes and animation section")?;
    takes::write_takes(&mut w, plan)?;

    w.section("Version 5 settings")?;
    write_version5(&mut w, plan)?;

    w.into_inner().flush()
}

fn write_header<W: Write>(w: &mut FbxWriter<W>) -> io::Result<()> {
    w.comment("FBX 6.1.0 project file")?;
    w.comment(&format!("Created by fbxcust {}", env!("CARGO_PKG_VERSION")))?;
    w.comment(&"-".repeat(52))?;
    w.blank()?;

    w.begin("FBXHeaderExtension", "")?;
    w.field("FBXHeaderVersion", 1003)?;
    w.field("FBXVersion", 6100)?;
    w.begin("CreationTimeStamp", "")?;
    w.field("Version", 1000)?;
    w.field("Year", 1970)?;
    for field in ["Month", "Day"] {
        w.field(field, 1)?;
    }
    for field in ["Hour", "Minute", "Second", "Millisecond"] {
        w.field(field, 0)?;
    }
    w.end()?;
    w.string("Creator", "FBX SDK/FBX Plugins build 20070228")?;
    w.begin("OtherFlags", "")?;
    w.field("FlagPLE", 0)?;
    w.end()?;
    w.end()?;

    w.string("CreationTime", CREATION_TIME)?;
    w.string("Creator", &format!("fbxcust {}", env!("CARGO_PKG_VERSION")))
}

fn write_definitions<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    let models = plan.models().len();
    let geometry = plan.meshes.iter().flatten().count();
    let deformers: usize = plan
        .skins
        .iter()
        .flatten()
        .map(|skin| 1 + skin.clusters.len())
        .sum();
    let poses = usize::from(!objects::bind_pose_nodes(plan).is_empty());

    let counts = [
        ("Model", models),
        ("Geometry", geometry),
        ("Deformer", deformers),
        ("Pose", poses),
        ("GlobalSettings", 1),
    ];

    w.begin("Definitions", "")?;
    w.field("Version", 100)?;
    w.field("Count", counts.iter().map(|(_, n)| n).sum::<usize>())?;
    for (kind, count) in counts.iter().filter(|(_, n)| *n > 0) {
        w.begin("ObjectType", &quoted(kind))?;
        w.field("Count", count)?;
        w.end()?;
    }
    w.end()
}

fn write_global_settings<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    let forward = plan.config.axis_forward;
    let up = plan.config.axis_up;
    let right = forward.vector().cross(up.vector());
    let (coord_axis, coord_sign) = if right.x != 0.0 {
        (0, right.x)
    } else if right.y != 0.0 {
        (1, right.y)
    } else {
        (2, right.z)
    };

    w.begin("GlobalSettings", "")?;
    w.field("Version", 1000)?;
    w.begin("Properties60", "")?;
    w.property("UpAxis", "int", up.index())?;
    w.property("UpAxisSign", "int", up.sign() as i32)?;
    // FBX front points towards the viewer, opposite the model's forward
    w.property("FrontAxis", "int", forward.index())?;
    w.property("FrontAxisSign", "int", -forward.sign() as i32)?;
    w.property("CoordAxis", "int", coord_axis)?;
    w.property("CoordAxisSign", "int", coord_sign as i32)?;
    w.property("UnitScaleFactor", "double", 1)?;
    w.end()?;
    w.end()
}

fn write_relations<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    w.begin("Relations", "")?;
    for model in plan.models() {
        w.begin("Model", &object_header(&format!("Model::{}", model.name), model.kind))?;
        w.end()?;
    }
    for skin in plan.skins.iter().flatten() {
        w.begin("Deformer", &object_header(&format!("Deformer::{}", skin.name), "Skin"))?;
        w.end()?;
        for cluster in &skin.clusters {
            w.begin("Deformer", &object_header(&format!("SubDeformer::{}", cluster.name), "Cluster"))?;
            w.end()?;
        }
    }
    w.end()
}

fn write_connections<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    w.begin("Connections", "")?;
    for model in plan.models() {
        let parent = model.parent.as_deref().unwrap_or("Scene");
        connect(w, &format!("Model::{}", model.name), &format!("Model::{parent}"))?;
    }
    for (i, skin) in plan.skins.iter().enumerate() {
        let Some(skin) = skin else { continue };
        let skin_id = format!("Deformer::{}", skin.name);
        connect(w, &skin_id, &format!("Model::{}", plan.set.objects[i].name))?;
        for cluster in &skin.clusters {
            let cluster_id = format!("SubDeformer::{}", cluster.name);
            connect(w, &cluster_id, &skin_id)?;
            connect(w, &format!("Model::{}", cluster.bone), &cluster_id)?;
        }
    }
    w.end()
}

fn connect<W: Write>(w: &mut FbxWriter<W>, child: &str, parent: &str) -> io::Result<()> {
    w.field("Connect", format!("\"OO\", {}, {}", quoted(child), quoted(parent)))
}

fn write_version5<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    let scene = plan.scene;
    w.begin("Version5", "")?;

    w.begin("AmbientRenderSettings", "")?;
    w.field("Version", 101)?;
    w.field("AmbientLightColor", "0.0,0.0,0.0,0")?;
    w.end()?;

    w.begin("FogOptions", "")?;
    w.field("FlogEnable", 0)?;
    w.field("FogMode", 0)?;
    w.field("FogDensity", "0.000")?;
    w.field("FogStart", "5.000")?;
    w.field("FogEnd", "25.000")?;
    w.field("FogColor", "0.1,0.1,0.1,1")?;
    w.end()?;

    w.begin("Settings", "")?;
    w.string("FrameRate", &num(scene.fps))?;
    w.field("TimeFormat", 1)?;
    w.field("SnapOnFrames", 0)?;
    w.field("ReferenceTimeIndex", -1)?;
    w.field("TimeLineStartTime", ktime(f64::from(scene.frame_start), scene.fps))?;
    w.field("TimeLineStopTime", ktime(f64::from(scene.frame_end), scene.fps))?;
    w.end()?;

    w.begin("RendererSetting", "")?;
    w.string("DefaultCamera", "Producer Perspective")?;
    w.field("DefaultViewingMode", 0)?;
    w.end()?;

    w.end()
}
