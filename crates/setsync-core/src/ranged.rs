//! Numeric settings bounded by a device-advertised range.

use crate::setting::{LinkState, UpdateState, ValueSetting};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::trace;

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    /// Lower bound.
    pub min: T,
    /// Upper bound.
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    /// Create bounds, swapping the ends if given in the wrong order.
    pub fn new(a: T, b: T) -> Self {
        if b < a {
            Bounds { min: b, max: a }
        } else {
            Bounds { min: a, max: b }
        }
    }

    /// Clamp `value` into these bounds.
    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Whether `value` lies within these bounds.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A numeric setting whose user requests are clamped into [`Bounds`].
///
/// Device reports are mirrored as-is, even when outside the bounds.
#[derive(Debug, Clone)]
pub struct RangedSetting<T> {
    inner: ValueSetting<T>,
    bounds: Bounds<T>,
}

impl<T> RangedSetting<T>
where
    T: PartialOrd + Copy + Debug,
{
    /// Create an offline setting.
    pub fn new(initial: T, bounds: Bounds<T>) -> Self {
        RangedSetting {
            inner: ValueSetting::new(initial),
            bounds,
        }
    }

    /// Current bounds.
    pub fn bounds(&self) -> Bounds<T> {
        self.bounds
    }

    /// Replace the bounds. The current value is left untouched.
    pub fn update_bounds(&mut self, bounds: Bounds<T>) -> bool {
        if self.bounds == bounds {
            return false;
        }
        self.bounds = bounds;
        true
    }

    /// Request a new value, clamped into the current bounds first.
    ///
    /// Values that do not compare with themselves (`NaN`) are refused.
    pub fn set_value<S>(&mut self, value: T, send: S) -> bool
    where
        S: FnOnce(&T),
    {
        if value.partial_cmp(&value).is_none() {
            trace!(?value, "rejecting unordered value");
            return false;
        }
        let clamped = self.bounds.clamp(value);
        self.inner.set_value(clamped, send)
    }

    /// See [`ValueSetting::value`].
    pub fn value(&self) -> T {
        *self.inner.value()
    }

    /// See [`ValueSetting::confirmed`].
    pub fn confirmed(&self) -> T {
        *self.inner.confirmed()
    }

    /// See [`ValueSetting::state`].
    pub fn state(&self) -> UpdateState {
        self.inner.state()
    }

    /// See [`ValueSetting::link`].
    pub fn link(&self) -> LinkState {
        self.inner.link()
    }

    /// See [`ValueSetting::on_remote_value_reported`].
    pub fn on_remote_value_reported(&mut self, value: T) -> bool {
        self.inner.on_remote_value_reported(value)
    }

    /// See [`ValueSetting::apply_report`].
    pub fn apply_report<S>(&mut self, value: T, send: S) -> bool
    where
        S: FnOnce(&T),
    {
        self.inner.apply_report(value, send)
    }

    /// See [`ValueSetting::on_reconnect`].
    pub fn on_reconnect<S>(&mut self, device_value: T, send: S) -> bool
    where
        S: FnOnce(&T),
    {
        self.inner.on_reconnect(device_value, send)
    }

    /// See [`ValueSetting::on_connect`].
    pub fn on_connect(&mut self) {
        self.inner.on_connect();
    }

    /// See [`ValueSetting::on_connect_adopting`].
    pub fn on_connect_adopting(&mut self) {
        self.inner.on_connect_adopting();
    }

    /// See [`ValueSetting::on_disconnect`].
    pub fn on_disconnect(&mut self) -> bool {
        self.inner.on_disconnect()
    }

    /// See [`ValueSetting::restore`].
    pub fn restore(&mut self, value: T) -> bool {
        self.inner.restore(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn online(initial: f64) -> RangedSetting<f64> {
        let mut setting = RangedSetting::new(initial, Bounds::new(0.0, 1.0));
        setting.on_reconnect(initial, |_| {});
        setting
    }

    #[test]
    fn test_bounds_normalize_order() {
        let bounds = Bounds::new(10, 2);
        assert_eq!(bounds.min, 2);
        assert_eq!(bounds.max, 10);
        assert!(bounds.contains(2));
        assert!(!bounds.contains(11));
    }

    #[test]
    fn test_request_is_clamped() {
        let mut sent = Vec::new();
        let mut setting = online(0.5);

        assert!(setting.set_value(4.0, |v| sent.push(*v)));
        assert_eq!(setting.value(), 1.0);

        assert!(setting.set_value(-2.0, |v| sent.push(*v)));
        assert_eq!(setting.value(), 0.0);
        assert_eq!(sent, vec![1.0, 0.0]);
    }

    #[test]
    fn test_clamped_duplicate_is_suppressed() {
        let mut sent = Vec::new();
        let mut setting = online(1.0);

        assert!(!setting.set_value(3.0, |v| sent.push(*v)));
        assert!(sent.is_empty());
    }

    #[test]
    fn test_nan_request_is_refused() {
        let mut sent = Vec::new();
        let mut setting = online(0.5);

        assert!(!setting.set_value(f64::NAN, |v| sent.push(*v)));
        assert!(!setting.set_value(f64::NAN, |v| sent.push(*v)));
        assert_eq!(setting.value(), 0.5);
        assert_eq!(setting.state(), UpdateState::UpToDate);
        assert!(sent.is_empty());
    }

    #[test]
    fn test_report_outside_bounds_is_mirrored() {
        let mut setting = online(0.5);
        setting.on_remote_value_reported(1.5);
        assert_eq!(setting.value(), 1.5);
    }

    #[test]
    fn test_update_bounds() {
        let mut setting = online(0.5);
        assert!(!setting.update_bounds(Bounds::new(0.0, 1.0)));
        assert!(setting.update_bounds(Bounds::new(0.0, 0.25)));
        assert_eq!(setting.value(), 0.5);
    }
}
