//! Takes section

use super::ExportPlan;
use super::writer::{FbxWriter, KEY_DECIMALS, number, quoted};
use crate::anim::{AnimationCurve, ChannelGroup, Take, Track, ktime};
use std::io::{self, Write};

const AXES: [(&str, &str); 3] = [("X", "1,0,0"), ("Y", "0,1,0"), ("Z", "0,0,1")];

pub(super) fn write_takes<W: Write>(w: &mut FbxWriter<W>, plan: &ExportPlan<'_>) -> io::Result<()> {
    let fps = plan.scene.fps;
    w.begin("Takes", "")?;
    w.string("Current", plan.takes.first().map_or("", |t| t.name.as_str()))?;
    for take in &plan.takes {
        write_take(w, take, fps)?;
    }
    w.end()
}

fn write_take<W: Write>(w: &mut FbxWriter<W>, take: &Take, fps: f64) -> io::Result<()> {
    let span = format!(
        "{},{}",
        ktime(f64::from(take.start), fps),
        ktime(f64::from(take.end), fps)
    );

    w.begin("Take", &quoted(&take.name))?;
    w.string("FileName", &format!("{}.tak", take.name))?;
    w.field("LocalTime", &span)?;
    w.field("ReferenceTime", &span)?;
    w.blank()?;
    w.comment("Models animation")?;
    for track in &take.tracks {
        write_track(w, track, fps)?;
    }
    w.end()
}

fn write_track<W: Write>(w: &mut FbxWriter<W>, track: &Track, fps: f64) -> io::Result<()> {
    w.begin("Model", &quoted(&format!("Model::{}", track.model)))?;
    w.field("Version", "1.1")?;
    w.begin("Channel", "\"Transform\"")?;
    for group in ChannelGroup::ALL {
        w.begin("Channel", &quoted(group.fbx_name()))?;
        for (axis, (name, color)) in AXES.iter().enumerate() {
            w.begin("Channel", &quoted(name))?;
            write_curve(w, track.curve(group, axis), fps)?;
            w.field("Color", color)?;
            w.end()?;
        }
        w.field("LayerType", group.layer_type())?;
        w.end()?;
    }
    w.end()?;
    w.end()
}

fn write_curve<W: Write>(w: &mut FbxWriter<W>, curve: &AnimationCurve, fps: f64) -> io::Result<()> {
    w.field("Default", number(curve.first_value(), KEY_DECIMALS))?;
    w.field("KeyVer", 4005)?;
    w.field("KeyCount", curve.len())?;
    w.array(
        "Key",
        curve
            .samples
            .iter()
            .map(|&(frame, value)| format!("{},{},L", ktime(frame, fps), number(value, KEY_DECIMALS))),
    )
}
