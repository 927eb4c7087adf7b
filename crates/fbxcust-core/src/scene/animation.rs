//! Actions of the input model

use serde::{Deserialize, Serialize};

/// What a channel animates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelTarget {
    /// The object owning the action
    Object,
    /// A pose bone of the owning armature
    Bone { name: String },
}

/// Transform property animated by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformProperty {
    Location,
    /// Euler XYZ, radians
    Rotation,
    Scale,
}

/// One keyframed component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionChannel {
    pub target: ChannelTarget,
    pub property: TransformProperty,
    /// Component index, 0..=2
    pub component: usize,
    /// (frame, value) keyframes
    pub keys: Vec<(f64, f64)>,
}

impl ActionChannel {
    pub fn new(
        target: ChannelTarget,
        property: TransformProperty,
        component: usize,
        keys: Vec<(f64, f64)>,
    ) -> Self {
        Self {
            target,
            property,
            component,
            keys,
        }
    }
}

/// A named set of keyframed channels
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ActionChannel>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel: ActionChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// First and last keyed frame across all channels
    pub fn frame_range(&self) -> Option<(f64, f64)> {
        self.channels
            .iter()
            .flat_map(|c| c.keys.iter().map(|&(frame, _)| frame))
            .fold(None, |range, frame| match range {
                None => Some((frame, frame)),
                Some((lo, hi)) => Some((lo.min(frame), hi.max(frame))),
            })
    }

    /// Names of all bones this action animates
    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().filter_map(|c| match &c.target {
            ChannelTarget::Bone { name } => Some(name.as_str()),
            ChannelTarget::Object => None,
        })
    }

    pub fn animates_object(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.target == ChannelTarget::Object)
    }
}
