//! Take planning and per-frame sampling

use super::optimize::optimize;
use super::{Take, Track};
use crate::armature::Skeleton;
use crate::collect::{ExportObject, ExportSet, UniqueNames};
use crate::config::AnimationConfig;
use crate::scene::{Action, ChannelTarget, Scene, TransformProperty};
use crate::transform::{Trs, compose, to_f64};
use crate::warning::{Warning, Warnings};
use glam::{DMat4, DVec3, EulerRot, Mat4};

/// Name of the take spanning the scene frame range
pub const DEFAULT_TAKE: &str = "Default Take";

/// Everything the sampler reads
pub struct TakeInput<'a> {
    pub scene: &'a Scene,
    pub set: &'a ExportSet<'a>,
    /// Ordered bones per exported object (armatures only)
    pub skeletons: &'a [Option<Skeleton>],
    pub global: Mat4,
    pub config: &'a AnimationConfig,
}

enum Source<'a> {
    /// Each object's own active action
    Active,
    Action(&'a Action),
}

struct Plan<'a> {
    name: String,
    start: i32,
    end: i32,
    source: Source<'a>,
}

/// Sample every take requested by the animation options
pub fn build_takes(input: &TakeInput<'_>, warnings: &mut Warnings) -> Vec<Take> {
    if !input.config.enabled {
        return Vec::new();
    }

    let active = active_actions(input, warnings);
    let plans = plan_takes(input, &active);
    let epsilon = input.config.epsilon();

    plans
        .iter()
        .map(|plan| {
            let mut tracks = Vec::new();
            for (i, object) in input.set.objects.iter().enumerate() {
                let Some(action) = applied_action(plan, input, i, active[i]) else {
                    continue;
                };
                sample_object(input, i, object, action, plan, &mut tracks);
            }

            if input.config.optimize {
                for track in &mut tracks {
                    for curve in &mut track.curves {
                        *curve = optimize(curve, epsilon);
                    }
                }
            }

            tracing::debug!(
                "Take '{}': frames {}..={}, {} tracks",
                plan.name,
                plan.start,
                plan.end,
                tracks.len()
            );
            Take {
                name: plan.name.clone(),
                start: plan.start,
                end: plan.end,
                tracks,
            }
        })
        .collect()
}

/// Resolve each exported object's active action by name
fn active_actions<'a>(input: &TakeInput<'a>, warnings: &mut Warnings) -> Vec<Option<&'a Action>> {
    input
        .set
        .objects
        .iter()
        .map(|object| {
            let name = object.source.active_action.as_deref()?;
            let action = input.scene.action(name);
            if action.is_none() {
                warnings.push(Warning::MissingAction {
                    object: object.name.clone(),
                    action: name.to_string(),
                });
            }
            action
        })
        .collect()
}

fn plan_takes<'a>(input: &TakeInput<'a>, active: &[Option<&'a Action>]) -> Vec<Plan<'a>> {
    let mut names = UniqueNames::new();
    let mut plans = Vec::new();

    if input.config.default_take {
        plans.push(Plan {
            name: names.claim(DEFAULT_TAKE),
            start: input.scene.frame_start,
            end: input.scene.frame_end.max(input.scene.frame_start),
            source: Source::Active,
        });
    }

    let actions: Vec<&Action> = if input.config.all_actions {
        input.scene.actions.iter().collect()
    } else {
        let mut distinct: Vec<&Action> = Vec::new();
        for &action in active.iter().flatten() {
            if !distinct.iter().any(|a| a.name == action.name) {
                distinct.push(action);
            }
        }
        distinct
    };

    for action in actions {
        let Some((first, last)) = action.frame_range() else {
            continue;
        };
        plans.push(Plan {
            name: names.claim(&action.name),
            start: first.floor() as i32,
            end: last.ceil() as i32,
            source: Source::Action(action),
        });
    }

    plans
}

/// Action driving object `index` in a take, if any
fn applied_action<'a>(
    plan: &Plan<'a>,
    input: &TakeInput<'a>,
    index: usize,
    active: Option<&'a Action>,
) -> Option<&'a Action> {
    match plan.source {
        Source::Active => active,
        Source::Action(action) => {
            if active.is_some_and(|a| a.name == action.name) {
                return Some(action);
            }
            let skeleton = input.skeletons.get(index)?.as_ref()?;
            let drives_bones = input.config.all_actions
                && action.bone_names().any(|name| skeleton.find(name).is_some());
            drives_bones.then_some(action)
        }
    }
}

/// Keyframes for one target, indexed by property then component
#[derive(Default)]
struct ChannelSet {
    keys: [[Option<Vec<(f64, f64)>>; 3]; 3],
}

impl ChannelSet {
    fn gather(action: &Action, target: &ChannelTarget) -> Self {
        let mut set = Self::default();
        for channel in action.channels.iter().filter(|c| &c.target == target) {
            if channel.component > 2 || channel.keys.is_empty() {
                continue;
            }
            let property = match channel.property {
                TransformProperty::Location => 0,
                TransformProperty::Rotation => 1,
                TransformProperty::Scale => 2,
            };
            let mut keys = channel.keys.clone();
            keys.sort_by(|a, b| a.0.total_cmp(&b.0));
            set.keys[property][channel.component] = Some(keys);
        }
        set
    }

    fn is_empty(&self) -> bool {
        self.keys.iter().flatten().all(Option::is_none)
    }

    /// Basis matrix at `frame`; missing channels take their rest value
    fn evaluate(&self, frame: f64, rest: &[[f64; 3]; 3]) -> DMat4 {
        let mut values = *rest;
        for (property, components) in self.keys.iter().enumerate() {
            for (component, keys) in components.iter().enumerate() {
                if let Some(keys) = keys {
                    values[property][component] = interpolate(keys, frame);
                }
            }
        }
        compose(
            DVec3::from_array(values[0]),
            DVec3::from_array(values[1]),
            DVec3::from_array(values[2]),
        )
    }
}

/// Linear interpolation, clamped to the first and last key
fn interpolate(keys: &[(f64, f64)], frame: f64) -> f64 {
    let Some(&(first_frame, first_value)) = keys.first() else {
        return 0.0;
    };
    if frame <= first_frame {
        return first_value;
    }
    for pair in keys.windows(2) {
        let ((f0, v0), (f1, v1)) = (pair[0], pair[1]);
        if frame <= f1 {
            let span = f1 - f0;
            if span <= 0.0 {
                return v1;
            }
            return v0 + (v1 - v0) * (frame - f0) / span;
        }
    }
    keys.last().map_or(first_value, |k| k.1)
}

/// Location, Euler XYZ radians and scale of a host matrix
fn rest_values(matrix: Mat4) -> [[f64; 3]; 3] {
    let (scale, rotation, translation) = to_f64(matrix).to_scale_rotation_translation();
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    [translation.to_array(), [x, y, z], scale.to_array()]
}

const POSE_REST: [[f64; 3]; 3] = [[0.0; 3], [0.0; 3], [1.0; 3]];

fn sample_object(
    input: &TakeInput<'_>,
    index: usize,
    object: &ExportObject<'_>,
    action: &Action,
    plan: &Plan<'_>,
    tracks: &mut Vec<Track>,
) {
    let channels = ChannelSet::gather(action, &ChannelTarget::Object);
    if !channels.is_empty() {
        let host_local = match object.parent {
            Some(p) => input.set.objects[p].world.inverse() * object.world,
            None => object.world,
        };
        let rest = rest_values(host_local);
        let global = to_f64(input.global);
        let is_root = object.parent.is_none();
        tracks.push(sample_track(&object.name, plan, |frame| {
            let basis = channels.evaluate(frame, &rest);
            if is_root { global * basis } else { basis }
        }));
    }

    let Some(skeleton) = input.skeletons.get(index).and_then(Option::as_ref) else {
        return;
    };
    for bone in &skeleton.bones {
        let channels = ChannelSet::gather(action, &ChannelTarget::Bone { name: bone.name.clone() });
        let rest_local = to_f64(bone.rest_local(&skeleton.bones));
        tracks.push(sample_track(&bone.model, plan, |frame| {
            rest_local * channels.evaluate(frame, &POSE_REST)
        }));
    }
}

/// Sample every integer frame of the take into a new track
fn sample_track(model: &str, plan: &Plan<'_>, matrix_at: impl Fn(f64) -> DMat4) -> Track {
    let mut track = Track::new(model);
    let mut previous = DVec3::ZERO;
    for frame in plan.start..=plan.end {
        let frame = f64::from(frame);
        let trs = Trs::from_matrix_continuous(matrix_at(frame), previous);
        previous = trs.rotation;
        track.push(
            frame,
            [trs.translation.to_array(), trs.rotation.to_array(), trs.scale.to_array()],
        );
    }
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::ChannelGroup;
    use crate::collect::collect;
    use crate::config::ExportConfig;
    use crate::scene::{ActionChannel, ArmatureData, Bone, ObjectData, SceneObject};
    use approx::assert_relative_eq;

    fn slide() -> Action {
        Action::new("Slide").with_channel(ActionChannel::new(
            ChannelTarget::Object,
            TransformProperty::Location,
            0,
            vec![(1.0, 0.0), (5.0, 4.0)],
        ))
    }

    fn wave() -> Action {
        Action::new("Wave").with_channel(ActionChannel::new(
            ChannelTarget::Bone { name: "Arm".into() },
            TransformProperty::Rotation,
            2,
            vec![(0.0, 0.0), (2.0, std::f64::consts::FRAC_PI_2)],
        ))
    }

    fn scene() -> Scene {
        Scene::new("S")
            .with_frame_range(1, 3)
            .with_object(SceneObject::new("Box", ObjectData::Empty).with_action("Slide"))
            .with_object(SceneObject::new(
                "Rig",
                ObjectData::Armature(ArmatureData {
                    bones: vec![Bone::new("Arm", None)],
                }),
            ))
            .with_action(slide())
            .with_action(wave())
    }

    fn takes(scene: &Scene, animation: AnimationConfig) -> (Vec<Take>, Warnings) {
        let config = ExportConfig::default()
            .with_object_types(crate::scene::ObjectKind::ALL)
            .with_animation(animation.clone());
        let mut warnings = Warnings::new();
        let set = collect(scene, &config, Mat4::IDENTITY, &mut warnings);
        let mut names = UniqueNames::new();
        let skeletons: Vec<Option<Skeleton>> = set
            .objects
            .iter()
            .map(|o| {
                o.armature_data()
                    .map(|a| Skeleton::build(&o.name, a, false, &mut names, &mut warnings))
            })
            .collect();
        let takes = build_takes(
            &TakeInput {
                scene,
                set: &set,
                skeletons: &skeletons,
                global: Mat4::IDENTITY,
                config: &animation,
            },
            &mut warnings,
        );
        (takes, warnings)
    }

    fn enabled() -> AnimationConfig {
        AnimationConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_produces_nothing() {
        let (takes, _) = takes(&scene(), AnimationConfig::default());
        assert!(takes.is_empty());
    }

    #[test]
    fn test_active_action_take() {
        let (takes, _) = takes(&scene(), enabled());
        assert_eq!(takes.len(), 1);
        let take = &takes[0];
        assert_eq!((take.name.as_str(), take.start, take.end), ("Slide", 1, 5));
        assert_eq!(take.tracks.len(), 1);

        let x = take.tracks[0].curve(ChannelGroup::Translation, 0);
        assert_eq!(x.len(), 5);
        assert_relative_eq!(x.samples[2].1, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_all_actions_and_default_take() {
        let animation = AnimationConfig {
            all_actions: true,
            default_take: true,
            ..enabled()
        };
        let (takes, _) = takes(&scene(), animation);
        let names: Vec<_> = takes.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![DEFAULT_TAKE, "Slide", "Wave"]);

        assert_eq!((takes[0].start, takes[0].end), (1, 3));
        let wave = &takes[2];
        assert_eq!(wave.tracks.len(), 1);
        assert_eq!(wave.tracks[0].model, "Arm");
        let rz = wave.tracks[0].curve(ChannelGroup::Rotation, 2);
        assert_relative_eq!(rz.samples[1].1, 45.0, epsilon = 1e-6);
        assert_relative_eq!(rz.samples[2].1, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_optimize_reduces_linear_motion() {
        let animation = AnimationConfig {
            optimize: true,
            precision: 4.0,
            ..enabled()
        };
        let (takes, _) = takes(&scene(), animation);
        let track = &takes[0].tracks[0];
        assert_eq!(track.curve(ChannelGroup::Translation, 0).len(), 2);
        assert_eq!(track.curve(ChannelGroup::Scaling, 1).samples, vec![(1.0, 1.0), (5.0, 1.0)]);
    }

    #[test]
    fn test_missing_action_warns() {
        let scene = Scene::new("S").with_object(SceneObject::new("Box", ObjectData::Empty).with_action("Nope"));
        let (takes, warnings) = takes(&scene, enabled());
        assert!(takes.is_empty());
        assert!(matches!(warnings.iter().next(), Some(Warning::MissingAction { .. })));
    }

    #[test]
    fn test_interpolate_clamps() {
        let keys = [(0.0, 1.0), (10.0, 3.0)];
        assert_eq!(interpolate(&keys, -5.0), 1.0);
        assert_eq!(interpolate(&keys, 5.0), 2.0);
        assert_eq!(interpolate(&keys, 50.0), 3.0);
    }
}
