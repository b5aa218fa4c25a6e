//! Per-host [`Settings`] and process-wide [`GestureDefaults`].
//!
//! Mirrors the teacher crate's device-tuned tolerance struct: named
//! default constants, a `Default` impl, and consuming `with_*` builder
//! setters, generalized here from per-device pointer tolerances to
//! per-host engine configuration.

use std::time::Duration;

use bitflags::bitflags;

use crate::ids::TargetId;

/// Default minimum zoom factor.
pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
/// Default maximum zoom factor.
pub const DEFAULT_MAX_ZOOM: f64 = 10.0;
/// Default hover-dwell duration before a hover gesture may recognize.
pub const DEFAULT_HOVER_DWELL: Duration = Duration::from_millis(500);
/// Default recognition window for a newly constructed gesture.
pub const DEFAULT_RECOGNITION_TIMEOUT: Duration = Duration::from_millis(250);

bitflags! {
    /// Which spatial relations between a newly consolidated ink and an
    /// existing ink trigger auto-combine (spec §4.6). Empty means
    /// auto-combine is disabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AutoCombineMode: u8 {
        /// Combine when the new ink is fully contained within another.
        const CONTAINED_WITHIN = 0b0001;
        /// Combine when the new ink's first point lies within another.
        const STARTS_WITHIN = 0b0010;
        /// Combine when the new ink's last point lies within another.
        const ENDS_WITHIN = 0b0100;
        /// Combine when any point of the new ink lies within another.
        const ANY_POINT_WITHIN = 0b1000;
    }
}

/// Per-host configuration: zoom bounds, ink auto-combine policy, hover
/// dwell, and whether right-click contacts are accepted at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    min_zoom: f64,
    max_zoom: f64,
    auto_combine_mode: AutoCombineMode,
    hover_dwell: Duration,
    right_click_allowed: bool,
}

impl Settings {
    /// Host settings with library defaults.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            auto_combine_mode: AutoCombineMode::empty(),
            hover_dwell: DEFAULT_HOVER_DWELL,
            right_click_allowed: false,
        }
    }

    /// Minimum permitted zoom factor.
    #[inline]
    #[must_use]
    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    /// Maximum permitted zoom factor.
    #[inline]
    #[must_use]
    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Current ink auto-combine policy.
    #[inline]
    #[must_use]
    pub fn auto_combine_mode(&self) -> AutoCombineMode {
        self.auto_combine_mode
    }

    /// Hover dwell duration.
    #[inline]
    #[must_use]
    pub fn hover_dwell(&self) -> Duration {
        self.hover_dwell
    }

    /// Whether right-click contacts are accepted.
    #[inline]
    #[must_use]
    pub fn right_click_allowed(&self) -> bool {
        self.right_click_allowed
    }

    /// Sets zoom bounds. Fails with [`crate::error::MilError::InvalidArgument`]
    /// if `min > max` or either bound is non-positive.
    pub fn with_zoom_bounds(
        mut self,
        min: f64,
        max: f64,
    ) -> Result<Self, crate::error::MilError> {
        if min <= 0.0 || max <= 0.0 || min > max {
            return Err(crate::error::MilError::InvalidArgument(format!(
                "invalid zoom bounds [{min}, {max}]"
            )));
        }
        self.min_zoom = min;
        self.max_zoom = max;
        Ok(self)
    }

    /// Sets the ink auto-combine policy.
    #[must_use]
    pub fn with_auto_combine_mode(mut self, mode: AutoCombineMode) -> Self {
        self.auto_combine_mode = mode;
        self
    }

    /// Sets the hover dwell duration.
    #[must_use]
    pub fn with_hover_dwell(mut self, dwell: Duration) -> Self {
        self.hover_dwell = dwell;
        self
    }

    /// Sets whether right-click contacts are accepted.
    #[must_use]
    pub fn with_right_click_allowed(mut self, allowed: bool) -> Self {
        self.right_click_allowed = allowed;
        self
    }

    /// Clamps `zoom` into `[min_zoom, max_zoom]`.
    #[must_use]
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Process-wide defaults consulted only at gesture construction time
/// (spec §3, `GestureDefaults`).
#[derive(Debug, Clone, PartialEq)]
pub struct GestureDefaults {
    default_target: Option<TargetId>,
    default_group: Option<String>,
    default_recognition_timeout: Duration,
}

impl GestureDefaults {
    /// Empty process defaults: no default target/group, library default
    /// recognition timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_target: None,
            default_group: None,
            default_recognition_timeout: DEFAULT_RECOGNITION_TIMEOUT,
        }
    }

    /// The default target new gestures are constructed against, if any.
    #[inline]
    #[must_use]
    pub fn default_target(&self) -> Option<TargetId> {
        self.default_target
    }

    /// The default group name new gestures are assigned to, if any.
    #[inline]
    #[must_use]
    pub fn default_group(&self) -> Option<&str> {
        self.default_group.as_deref()
    }

    /// The default recognition timeout new gestures are given.
    #[inline]
    #[must_use]
    pub fn default_recognition_timeout(&self) -> Duration {
        self.default_recognition_timeout
    }

    /// Sets the default target.
    #[must_use]
    pub fn with_default_target(mut self, target: TargetId) -> Self {
        self.default_target = Some(target);
        self
    }

    /// Sets the default group name.
    #[must_use]
    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = Some(group.into());
        self
    }

    /// Sets the default recognition timeout.
    #[must_use]
    pub fn with_default_recognition_timeout(mut self, timeout: Duration) -> Self {
        self.default_recognition_timeout = timeout;
        self
    }
}

impl Default for GestureDefaults {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let s = Settings::default();
        assert_eq!(s.min_zoom(), DEFAULT_MIN_ZOOM);
        assert_eq!(s.max_zoom(), DEFAULT_MAX_ZOOM);
        assert_eq!(s.auto_combine_mode(), AutoCombineMode::empty());
        assert!(!s.right_click_allowed());
    }

    #[test]
    fn test_zoom_bounds_builder() {
        let s = Settings::default().with_zoom_bounds(0.5, 4.0).unwrap();
        assert_eq!(s.min_zoom(), 0.5);
        assert_eq!(s.max_zoom(), 4.0);
        assert_eq!(s.clamp_zoom(100.0), 4.0);
        assert_eq!(s.clamp_zoom(0.01), 0.5);
    }

    #[test]
    fn test_invalid_zoom_bounds_rejected() {
        assert!(Settings::default().with_zoom_bounds(5.0, 1.0).is_err());
        assert!(Settings::default().with_zoom_bounds(0.0, 1.0).is_err());
    }

    #[test]
    fn test_auto_combine_mode_bits() {
        let mode = AutoCombineMode::CONTAINED_WITHIN | AutoCombineMode::ANY_POINT_WITHIN;
        assert!(mode.contains(AutoCombineMode::CONTAINED_WITHIN));
        assert!(!mode.contains(AutoCombineMode::STARTS_WITHIN));
    }

    #[test]
    fn test_gesture_defaults_builder() {
        let defaults = GestureDefaults::new()
            .with_default_target(TargetId::new(7))
            .with_default_group("drawing")
            .with_default_recognition_timeout(Duration::from_millis(100));
        assert_eq!(defaults.default_target(), Some(TargetId::new(7)));
        assert_eq!(defaults.default_group(), Some("drawing"));
        assert_eq!(defaults.default_recognition_timeout(), Duration::from_millis(100));
    }
}
