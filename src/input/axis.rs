//! Axis transform unit
//!
//! One of these sits behind every physical (hand, axis, direction) slot. It
//! turns a raw sample into a normalised value and hands it to the bound
//! consumer.
//!
//! Processing order:
//! 1. subtract the centre
//! 2. lift magnitudes inside the deadzone band to its outer edge
//! 3. clamp to the saturation range
//! 4. scale the saturation range onto -1..1
//! 5. apply the premultiply, whose sign tracks `flip`

use std::fmt;
use std::sync::Arc;

use super::binding::AxisParams;
use super::types::AxisFn;

fn noop() -> AxisFn {
    Arc::new(|_value: f32| {})
}

pub struct AxisTransform {
    deadzone_min: f32,
    deadzone_max: f32,
    saturation_min: f32,
    saturation_max: f32,
    centre: f32,
    premultiply: f32,
    // derived by update_scales
    scale_neg: f32,
    scale_pos: f32,
    one_sided: bool,
    func: AxisFn,
    enabled: bool,
    // hand samples through untouched; parameters stay stored
    passthrough: bool,
}

impl Default for AxisTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisTransform {
    /// An unbound slot with identity parameters
    pub fn new() -> Self {
        let mut unit = Self {
            deadzone_min: 0.0,
            deadzone_max: 0.0,
            saturation_min: -1.0,
            saturation_max: 1.0,
            centre: 0.0,
            premultiply: 1.0,
            scale_neg: 1.0,
            scale_pos: 1.0,
            one_sided: false,
            func: noop(),
            enabled: false,
            passthrough: false,
        };
        unit.update_scales();
        unit
    }

    /// Apply a full parameter set.
    ///
    /// Flip is idempotent: the premultiply is only negated when its sign does
    /// not already match the requested orientation.
    pub fn configure(&mut self, params: &AxisParams) {
        self.deadzone_min = params.deadzone_min;
        self.deadzone_max = params.deadzone_max;
        self.saturation_min = params.saturation_min;
        self.saturation_max = params.saturation_max;
        self.centre = params.centre;

        if params.flip {
            if self.premultiply > 0.0 {
                self.premultiply = -self.premultiply;
            }
        } else if self.premultiply < 0.0 {
            self.premultiply = -self.premultiply;
        }
        self.update_scales();
    }

    /// Configure and attach a consumer, enabling the slot
    pub fn bind(&mut self, func: AxisFn, params: &AxisParams) {
        self.configure(params);
        self.bind_consumer(func);
    }

    /// Attach a consumer keeping whatever parameters the slot already has
    pub fn bind_consumer(&mut self, func: AxisFn) {
        self.func = func;
        self.enabled = true;
        self.passthrough = false;
    }

    /// Attach a consumer that receives raw samples, bypassing every
    /// parameter. The stored parameters apply again on the next bind.
    pub fn bind_passthrough(&mut self, func: AxisFn) {
        self.func = func;
        self.enabled = true;
        self.passthrough = true;
    }

    /// Replace the consumer with a no-op and disable the slot; parameters are kept
    pub fn unbind(&mut self) {
        self.func = noop();
        self.enabled = false;
        self.passthrough = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn premultiply(&self) -> f32 {
        self.premultiply
    }

    pub fn params(&self) -> AxisParams {
        AxisParams {
            flip: self.premultiply < 0.0,
            deadzone_min: self.deadzone_min,
            deadzone_max: self.deadzone_max,
            saturation_min: self.saturation_min,
            saturation_max: self.saturation_max,
            centre: self.centre,
        }
    }

    fn update_scales(&mut self) {
        let (lo, hi) = (self.saturation_min, self.saturation_max);
        if lo < 0.0 && hi > 0.0 {
            // range straddles the centre: scale each side independently so the
            // centre stays at zero
            self.one_sided = false;
            self.scale_neg = 1.0 / -lo;
            self.scale_pos = 1.0 / hi;
        } else if hi > lo {
            self.one_sided = true;
            self.scale_pos = 2.0 / (hi - lo);
            self.scale_neg = self.scale_pos;
        } else {
            log::warn!(
                "Degenerate axis saturation range {}..{}, slot will read zero",
                lo,
                hi
            );
            self.one_sided = false;
            self.scale_neg = 0.0;
            self.scale_pos = 0.0;
        }
    }

    /// Transform a raw sample without dispatching it
    pub fn transform(&self, raw: f32) -> f32 {
        if self.passthrough {
            return raw;
        }
        let mut value = raw - self.centre;

        let band_lo = self.deadzone_min.min(self.deadzone_max).max(0.0);
        let band_hi = self.deadzone_min.max(self.deadzone_max);
        let magnitude = value.abs();
        if value != 0.0 && magnitude >= band_lo && magnitude < band_hi {
            value = band_hi.copysign(value);
        }

        value = value.clamp(
            self.saturation_min.min(self.saturation_max),
            self.saturation_max.max(self.saturation_min),
        );

        let scaled = if self.one_sided {
            (value - self.saturation_min) * self.scale_pos - 1.0
        } else if value >= 0.0 {
            value * self.scale_pos
        } else {
            value * self.scale_neg
        };
        scaled * self.premultiply
    }

    /// Transform and forward to the consumer if the slot is enabled
    pub fn execute(&self, raw: f32) {
        if let Some((func, value)) = self.resolve(raw) {
            func(value);
        }
    }

    /// The consumer and the value it would receive, without invoking it
    pub fn resolve(&self, raw: f32) -> Option<(AxisFn, f32)> {
        if !self.enabled {
            return None;
        }
        Some((self.func.clone(), self.transform(raw)))
    }

    /// Render the transfer curve as text, `rows` lines of `columns` cells.
    ///
    /// The horizontal span covers the saturation range around the centre with
    /// a quarter of headroom on each side; the vertical span is -1..1.
    pub fn graph(&self, columns: usize, rows: usize) -> String {
        let columns = columns.max(2);
        let rows = rows.max(3);
        let lo = self.saturation_min.min(self.saturation_max);
        let hi = self.saturation_max.max(self.saturation_min);
        let margin = (hi - lo).abs().max(f32::EPSILON) * 0.25;
        let (start, end) = (self.centre + lo - margin, self.centre + hi + margin);

        let mut grid = vec![vec![' '; columns]; rows];
        let zero_row = (rows - 1) / 2;
        for cell in grid[zero_row].iter_mut() {
            *cell = '-';
        }
        for col in 0..columns {
            let raw = start + (end - start) * col as f32 / (columns - 1) as f32;
            let out = self.transform(raw).clamp(-1.0, 1.0);
            let row = ((1.0 - out) * 0.5 * (rows - 1) as f32).round() as usize;
            grid[row.min(rows - 1)][col] = '*';
        }

        let mut text = String::with_capacity(rows * (columns + 1));
        for line in grid {
            text.extend(line);
            text.push('\n');
        }
        text
    }
}

impl fmt::Debug for AxisTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisTransform")
            .field("params", &self.params())
            .field("premultiply", &self.premultiply)
            .field("enabled", &self.enabled)
            .field("passthrough", &self.passthrough)
            .finish()
    }
}
