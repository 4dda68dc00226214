//! Capture and calibration state
//!
//! Axis capture compares live samples against the value each axis rests at,
//! since not every axis rests at zero. The resting values are sampled by a
//! calibration pass and owned here rather than in any global.

use std::sync::atomic::{AtomicBool, Ordering};

use super::binding::{AxisBinding, AxisParams};
use super::device::{DeviceId, DeviceSource};
use super::error::{BindError, BindResult};
use super::types::{AxisDirection, Hand, MAX_AXES, MAX_AXIS_DIRECTIONS, MAX_HANDS};

/// A deflection detected while capturing axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCapture {
    pub hand: Hand,
    pub axis: u32,
    pub direction: AxisDirection,
    /// The axis moved below its resting value
    pub negative: bool,
}

impl AxisCapture {
    /// Binding that makes the detected deflection read positive
    pub fn binding(&self) -> AxisBinding {
        AxisBinding::new(self.hand, self.axis, self.direction)
            .with_params(AxisParams::flipped(self.negative))
    }
}

/// Resting values of every axis component
#[derive(Debug, Clone, Default)]
pub struct AxisCalibration {
    resting: [[[f32; MAX_AXIS_DIRECTIONS]; MAX_AXES]; MAX_HANDS],
    calibrated: bool,
}

impl AxisCalibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Forget stored values; the next capture calibrates again
    pub fn invalidate(&mut self) {
        self.calibrated = false;
    }

    pub fn resting(&self, hand: Hand, axis: usize, direction: AxisDirection) -> f32 {
        self.resting[hand.index()][axis][direction.index()]
    }

    /// Sample the resting value of every axis on the given hands.
    ///
    /// Nothing is stored unless every hand could be read.
    pub fn calibrate(
        &mut self,
        hands: &[(Hand, DeviceId)],
        source: &dyn DeviceSource,
    ) -> BindResult<()> {
        log::info!("Calibrating controller axes for capture");
        let mut resting = self.resting;

        for &(hand, device) in hands {
            let samples = match source.axis_samples(device) {
                Some(samples) => samples,
                None => {
                    log::warn!(
                        "Calibration could not read device {} for the {:?} hand",
                        device,
                        hand
                    );
                    self.calibrated = false;
                    return Err(BindError::CalibrationUnavailable { hand });
                }
            };
            for (axis, sample) in samples.iter().enumerate() {
                resting[hand.index()][axis] = *sample;
                log::debug!(
                    "Calibrated {:?} axis {}: {}, {}",
                    hand,
                    axis,
                    sample[0],
                    sample[1]
                );
            }
        }

        self.resting = resting;
        self.calibrated = true;
        Ok(())
    }
}

/// Edge-triggered deflection detector for one axis component.
///
/// Reports once when the offset from rest first exceeds the threshold, then
/// stays quiet until the axis comes back inside it (or forever, when
/// re-arming is off).
#[derive(Debug)]
pub struct DeflectionDetector {
    resting: f32,
    threshold: f32,
    rearm: bool,
    latched: AtomicBool,
}

impl DeflectionDetector {
    pub fn new(resting: f32, threshold: f32, rearm: bool) -> Self {
        Self {
            resting,
            threshold,
            rearm,
            latched: AtomicBool::new(false),
        }
    }

    /// Feed a sample; returns `Some(negative)` on a new deflection
    pub fn sample(&self, value: f32) -> Option<bool> {
        let offset = value - self.resting;
        if offset.abs() > self.threshold {
            if self.latched.swap(true, Ordering::Relaxed) {
                return None;
            }
            log::debug!("Axis deflection detected: {} (offset {})", value, offset);
            Some(offset < 0.0)
        } else {
            if self.rearm {
                self.latched.store(false, Ordering::Relaxed);
            }
            None
        }
    }
}
