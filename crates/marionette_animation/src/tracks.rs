use marionette_core::{AnimationError, Result};

use crate::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

/// Gaps narrower than this are treated as zero-length brackets.
const MIN_KEYFRAME_GAP: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>, // For CubicSpline, length is times.len() * 3
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// Timestamp of the last keyframe, or 0 for an empty track.
    #[inline]
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Checks that timestamps strictly increase and the value count matches
    /// the interpolation mode.
    pub fn validate(&self) -> Result<()> {
        if self.times.is_empty() {
            return Err(AnimationError::InvalidChannel("track has no keyframes".into()));
        }

        if let Some(w) = self.times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AnimationError::InvalidChannel(format!(
                "timestamps must strictly increase ({} then {})",
                w[0], w[1]
            )));
        }

        let stride = match self.interpolation {
            InterpolationMode::CubicSpline => 3,
            _ => 1,
        };
        let expected = self.times.len() * stride;
        if self.values.len() != expected {
            return Err(AnimationError::InvalidChannel(format!(
                "expected {expected} values for {} keyframes, found {}",
                self.times.len(),
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Samples the track at `time`.
    ///
    /// Times outside the keyframe range clamp to the first/last value.
    /// Returns `None` only for an empty track.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        let len = self.times.len();
        if len == 0 || self.values.is_empty() {
            return None;
        }

        if time <= self.times[0] {
            return self.get_value_at(0);
        }
        if time >= self.times[len - 1] {
            return self.get_value_at(len - 1);
        }

        // partition_point finds the first index where t > time, i.e. next_index
        let next_idx = self.times.partition_point(|&t| t <= time);
        self.sample_at_frame(next_idx - 1, time)
    }

    /// Helper method: unified value accessor.
    /// For Linear/Step, the index is used directly.
    /// For CubicSpline, the value is at index * 3 + 1.
    fn get_value_at(&self, index: usize) -> Option<T> {
        match self.interpolation {
            InterpolationMode::CubicSpline => self.values.get(index * 3 + 1).copied(),
            _ => self.values.get(index).copied(),
        }
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> Option<T> {
        let next_idx = index + 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;

        let t = if dt > MIN_KEYFRAME_GAP { (time - t0) / dt } else { 0.0 };
        let t = t.clamp(0.0, 1.0);

        match self.interpolation {
            InterpolationMode::Step => self.get_value_at(index),
            InterpolationMode::Linear => {
                let v0 = self.get_value_at(index)?;
                let v1 = self.get_value_at(next_idx)?;
                Some(T::interpolate_linear(v0, v1, t))
            }
            InterpolationMode::CubicSpline => {
                let i_prev = index * 3;
                let i_next = next_idx * 3;

                let v0 = *self.values.get(i_prev + 1)?;
                let out_tangent0 = *self.values.get(i_prev + 2)?;
                let in_tangent1 = *self.values.get(i_next)?;
                let v1 = *self.values.get(i_next + 1)?;

                Some(T::interpolate_cubic(v0, out_tangent0, in_tangent1, v1, t, dt))
            }
        }
    }
}
