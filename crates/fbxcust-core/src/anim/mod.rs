//! Animation takes: sampled transform curves per model, optionally reduced

pub mod optimize;
mod sample;

pub use sample::{TakeInput, build_takes};

/// FBX time units per second
pub const KTIME_PER_SECOND: f64 = 46_186_158_000.0;

/// Convert a frame number to FBX time
pub fn ktime(frame: f64, fps: f64) -> i64 {
    (frame / fps * KTIME_PER_SECOND).round() as i64
}

/// Time-ordered (frame, value) samples of one channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationCurve {
    pub samples: Vec<(f64, f64)>,
}

impl AnimationCurve {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Value of the first sample
    pub fn first_value(&self) -> f64 {
        self.samples.first().map_or(0.0, |s| s.1)
    }
}

/// Transform group of an FBX channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelGroup {
    Translation,
    Rotation,
    Scaling,
}

impl ChannelGroup {
    pub const ALL: [Self; 3] = [Self::Translation, Self::Rotation, Self::Scaling];

    /// Channel name used in takes
    pub fn fbx_name(self) -> &'static str {
        match self {
            Self::Translation => "T",
            Self::Rotation => "R",
            Self::Scaling => "S",
        }
    }

    /// LayerType value of the channel block
    pub fn layer_type(self) -> u8 {
        match self {
            Self::Translation => 1,
            Self::Rotation => 2,
            Self::Scaling => 3,
        }
    }

    fn offset(self) -> usize {
        match self {
            Self::Translation => 0,
            Self::Rotation => 3,
            Self::Scaling => 6,
        }
    }
}

/// Nine transform curves for one model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    /// Model name in the output file
    pub model: String,
    pub curves: [AnimationCurve; 9],
}

impl Track {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            curves: Default::default(),
        }
    }

    /// Curve for one group and axis (0 = X)
    pub fn curve(&self, group: ChannelGroup, axis: usize) -> &AnimationCurve {
        &self.curves[group.offset() + axis]
    }

    /// Append one frame of translation, rotation (degrees) and scale
    pub fn push(&mut self, frame: f64, values: [[f64; 3]; 3]) {
        for (group, vector) in values.iter().enumerate() {
            for (axis, &value) in vector.iter().enumerate() {
                self.curves[group * 3 + axis].samples.push((frame, value));
            }
        }
    }
}

/// One animation clip
#[derive(Debug, Clone, PartialEq)]
pub struct Take {
    pub name: String,
    pub start: i32,
    pub end: i32,
    pub tracks: Vec<Track>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ktime() {
        assert_eq!(ktime(24.0, 24.0), 46_186_158_000);
        assert_eq!(ktime(0.0, 30.0), 0);
        assert_eq!(ktime(1.0, 30.0), 1_539_538_600);
    }

    #[test]
    fn test_track_push_layout() {
        let mut track = Track::new("Cube");
        track.push(1.0, [[1.0, 2.0, 3.0], [10.0, 20.0, 30.0], [1.0, 1.0, 2.0]]);

        assert_eq!(track.curve(ChannelGroup::Translation, 2).samples, vec![(1.0, 3.0)]);
        assert_eq!(track.curve(ChannelGroup::Rotation, 0).samples, vec![(1.0, 10.0)]);
        assert_eq!(track.curve(ChannelGroup::Scaling, 2).first_value(), 2.0);
    }
}
