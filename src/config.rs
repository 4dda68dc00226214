use anyhow::{Context, Result};

/// How dispatch-table indices coming from the device layer are validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsCheck {
    /// Out of range indices are logged and fall back to a no-op
    Checked,
    /// Indices are used directly; callers must stay in range
    Unchecked,
}

impl Default for BoundsCheck {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            BoundsCheck::Checked
        } else {
            BoundsCheck::Unchecked
        }
    }
}

/// Engine options
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub bounds_check: BoundsCheck,
    /// Offset from the resting value that counts as a deliberate deflection
    /// during axis capture
    pub capture_threshold: f32,
    /// Re-arm an axis capture detector once the axis returns to rest
    pub capture_rearm: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bounds_check: BoundsCheck::default(),
            capture_threshold: 0.5,
            capture_rearm: true,
        }
    }
}

impl EngineConfig {
    pub fn checked() -> Self {
        Self {
            bounds_check: BoundsCheck::Checked,
            ..Self::default()
        }
    }

    /// Parse `key = value` lines on top of the defaults.
    ///
    /// `#` starts a comment. Unknown keys are logged and skipped.
    pub fn from_properties(text: &str) -> Result<Self> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((content, _)) => content,
                None => line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .with_context(|| format!("Line {}: expected key = value", number + 1))?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "bounds_check" => {
                    config.bounds_check = parse_bounds_check(value)
                        .with_context(|| format!("Line {}: invalid bounds_check", number + 1))?
                }
                "capture_threshold" => {
                    config.capture_threshold = parse_threshold(value).with_context(|| {
                        format!("Line {}: invalid capture_threshold", number + 1)
                    })?
                }
                "capture_rearm" => {
                    config.capture_rearm = value
                        .parse()
                        .with_context(|| format!("Line {}: invalid capture_rearm", number + 1))?
                }
                _ => log::warn!("Ignoring unknown engine option '{}'", key),
            }
        }

        Ok(config)
    }
}

/// Parse a bounds check mode ("checked" or "unchecked")
pub fn parse_bounds_check(s: &str) -> Result<BoundsCheck> {
    match s.to_ascii_lowercase().as_str() {
        "checked" => Ok(BoundsCheck::Checked),
        "unchecked" => Ok(BoundsCheck::Unchecked),
        other => anyhow::bail!("Unknown bounds check mode '{}'", other),
    }
}

/// Parse a capture threshold in normalised axis units
pub fn parse_threshold(s: &str) -> Result<f32> {
    let threshold: f32 = s.parse().context("Invalid threshold value")?;

    // a full axis swing is 2.0, anything beyond can never trigger
    if !(threshold > 0.0 && threshold <= 2.0) {
        anyhow::bail!("Capture threshold out of range (0 to 2)");
    }

    Ok(threshold)
}
