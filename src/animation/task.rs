//! Animation tasks and their keyframe tracks.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::easing::{AnimationConfig, Easing};
use crate::camera::CameraTransform;
use crate::layout::Position;

/// Identifier of a registered animation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Scene element an animation writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Node(String),
    Link(String),
    Camera,
}

/// Conflict class of an animated attribute. Two tasks conflict only when
/// they write the same channel of the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Position,
    Scale,
    Opacity,
    Stroke,
    Shadow,
    /// Link endpoints.
    Path,
    /// Link draw-in fraction.
    Reveal,
    Camera,
}

/// An interpolatable attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Scalar(f32),
    Point(Position),
    Segment(Position, Position),
    Camera(CameraTransform),
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_point(a: Position, b: Position, t: f32) -> Position {
    Position::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
}

impl Value {
    /// Interpolate toward `to`. Mismatched kinds snap to `to` at `t >= 1`.
    pub fn lerp(&self, to: &Value, t: f32) -> Value {
        match (self, to) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(lerp(*a, *b, t)),
            (Value::Point(a), Value::Point(b)) => Value::Point(lerp_point(*a, *b, t)),
            (Value::Segment(a0, a1), Value::Segment(b0, b1)) => {
                Value::Segment(lerp_point(*a0, *b0, t), lerp_point(*a1, *b1, t))
            }
            (Value::Camera(a), Value::Camera(b)) => Value::Camera(a.lerp(b, t)),
            _ if t >= 1.0 => *to,
            _ => *self,
        }
    }
}

/// Keyframed interpolation of one channel of one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub target: Target,
    pub channel: Channel,
    /// `(offset, value)` pairs, offsets ascending from 0 to 1.
    keyframes: Vec<(f32, Value)>,
}

impl Track {
    /// Two-keyframe track from `from` to `to`.
    pub fn tween(target: Target, channel: Channel, from: Value, to: Value) -> Self {
        Self {
            target,
            channel,
            keyframes: vec![(0.0, from), (1.0, to)],
        }
    }

    /// Track through `values` spaced evenly over the task duration.
    pub fn sequence(target: Target, channel: Channel, values: &[Value]) -> Self {
        let last = values.len().saturating_sub(1).max(1) as f32;
        let keyframes = values
            .iter()
            .enumerate()
            .map(|(i, value)| (i as f32 / last, *value))
            .collect();
        Self {
            target,
            channel,
            keyframes,
        }
    }

    /// Track through explicit `(offset, value)` keyframes.
    pub fn keyframes(target: Target, channel: Channel, keyframes: Vec<(f32, Value)>) -> Self {
        Self {
            target,
            channel,
            keyframes,
        }
    }

    pub fn key(&self) -> (Target, Channel) {
        (self.target.clone(), self.channel)
    }

    pub fn final_value(&self) -> Option<Value> {
        self.keyframes.last().map(|(_, value)| *value)
    }

    /// Value at linear task progress `t`, easing applied within each segment.
    pub fn sample(&self, t: f32, easing: Easing) -> Option<Value> {
        let (first, rest) = self.keyframes.split_first()?;
        if rest.is_empty() || t <= first.0 {
            return Some(first.1);
        }

        let mut previous = first;
        for current in rest {
            if t <= current.0 {
                let span = current.0 - previous.0;
                let local = if span > 0.0 { (t - previous.0) / span } else { 1.0 };
                return Some(previous.1.lerp(&current.1, easing.apply(local)));
            }
            previous = current;
        }
        self.final_value()
    }
}

pub type CompletionCallback = Box<dyn FnOnce()>;

/// One scheduled, cancellable interpolation.
pub struct AnimationTask {
    pub id: TaskId,
    pub config: AnimationConfig,
    /// Set on the first frame the task sees.
    pub started_at: Option<f64>,
    pub tracks: Vec<Track>,
    /// Targets dropped from the scene when the task completes.
    pub removes: Vec<Target>,
    pub callbacks: Vec<CompletionCallback>,
}

impl fmt::Debug for AnimationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationTask")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("started_at", &self.started_at)
            .field("tracks", &self.tracks.len())
            .field("removes", &self.removes)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl AnimationTask {
    pub fn new(id: TaskId, config: AnimationConfig, tracks: Vec<Track>) -> Self {
        Self {
            id,
            config,
            started_at: None,
            tracks,
            removes: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// Linear progress in `[0, 1]` at `now_ms`.
    pub fn progress(&mut self, now_ms: f64) -> f32 {
        let start = *self.started_at.get_or_insert(now_ms);
        let elapsed = now_ms - start - self.config.delay_ms;
        if elapsed < 0.0 {
            return 0.0;
        }
        if self.config.duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed / self.config.duration_ms).clamp(0.0, 1.0) as f32
    }

    pub fn touches(&self, target: &Target) -> bool {
        self.tracks.iter().any(|track| &track.target == target)
    }

    /// Drop the track on `(target, channel)`. Returns true if one was removed.
    pub fn release(&mut self, target: &Target, channel: Channel) -> bool {
        let before = self.tracks.len();
        self.tracks
            .retain(|track| !(track.channel == channel && &track.target == target));
        self.tracks.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> Target {
        Target::Node(id.to_string())
    }

    #[test]
    fn test_tween_sample() {
        let track = Track::tween(node("a"), Channel::Opacity, Value::Scalar(0.0), Value::Scalar(1.0));
        assert_eq!(track.sample(0.0, Easing::Linear), Some(Value::Scalar(0.0)));
        assert_eq!(track.sample(0.25, Easing::Linear), Some(Value::Scalar(0.25)));
        assert_eq!(track.sample(1.0, Easing::Linear), Some(Value::Scalar(1.0)));
    }

    #[test]
    fn test_sequence_sample() {
        let track = Track::sequence(
            node("a"),
            Channel::Stroke,
            &[Value::Scalar(0.0), Value::Scalar(1.0), Value::Scalar(0.0)],
        );
        assert_eq!(track.sample(0.5, Easing::Linear), Some(Value::Scalar(1.0)));
        assert_eq!(track.sample(0.75, Easing::Linear), Some(Value::Scalar(0.5)));
        assert_eq!(track.final_value(), Some(Value::Scalar(0.0)));
    }

    #[test]
    fn test_point_lerp() {
        let track = Track::tween(
            node("a"),
            Channel::Position,
            Value::Point(Position::new(0.0, 0.0)),
            Value::Point(Position::new(10.0, 20.0)),
        );
        assert_eq!(
            track.sample(0.5, Easing::Linear),
            Some(Value::Point(Position::new(5.0, 10.0)))
        );
    }

    #[test]
    fn test_progress_with_delay() {
        let mut task = AnimationTask::new(
            TaskId(1),
            AnimationConfig::new(100.0, Easing::Linear).with_delay(50.0),
            Vec::new(),
        );
        assert_eq!(task.progress(1000.0), 0.0);
        assert_eq!(task.progress(1040.0), 0.0);
        assert_eq!(task.progress(1100.0), 0.5);
        assert_eq!(task.progress(2000.0), 1.0);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut task = AnimationTask::new(TaskId(1), AnimationConfig::immediate(), Vec::new());
        assert_eq!(task.progress(5.0), 1.0);
    }

    #[test]
    fn test_release() {
        let mut task = AnimationTask::new(
            TaskId(1),
            AnimationConfig::default(),
            vec![
                Track::tween(node("x"), Channel::Scale, Value::Scalar(0.0), Value::Scalar(1.0)),
                Track::tween(node("x"), Channel::Opacity, Value::Scalar(0.0), Value::Scalar(1.0)),
            ],
        );
        assert!(task.release(&node("x"), Channel::Scale));
        assert!(!task.release(&node("x"), Channel::Scale));
        assert!(task.touches(&node("x")));
        assert!(task.release(&node("x"), Channel::Opacity));
        assert!(!task.touches(&node("x")));
    }
}
