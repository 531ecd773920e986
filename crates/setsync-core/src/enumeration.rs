//! Enum settings restricted to a device-advertised subset of values.

use crate::setting::{LinkState, UpdateState, ValueSetting};
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::trace;

// ============================================================================
// Setting Enum Trait
// ============================================================================

/// An enum usable as a setting value.
///
/// `VARIANTS` lists every enumerator in wire order: bit `i` of a bitfield
/// stands for `VARIANTS[i]`.
pub trait SettingEnum: Copy + Eq + Ord + Debug + 'static {
    /// All enumerators, in wire order.
    const VARIANTS: &'static [Self];

    /// Bit position of this enumerator.
    fn bit_index(self) -> u32 {
        Self::VARIANTS
            .iter()
            .position(|v| *v == self)
            .map(|i| i as u32)
            .unwrap_or(u32::MAX)
    }

    /// Single-bit mask of this enumerator.
    fn bit(self) -> u64 {
        1u64.checked_shl(self.bit_index()).unwrap_or(0)
    }

    /// Whether this enumerator is set in `bitfield`.
    fn in_bitfield(self, bitfield: u64) -> bool {
        bitfield & self.bit() != 0
    }

    /// Decode a bitfield into the set of enumerators it holds.
    ///
    /// Bits without a matching enumerator are ignored.
    fn from_bitfield(bitfield: u64) -> BTreeSet<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .filter(|v| v.in_bitfield(bitfield))
            .collect()
    }

    /// Encode a set of enumerators into a bitfield.
    fn to_bitfield<'a, I>(values: I) -> u64
    where
        I: IntoIterator<Item = &'a Self>,
    {
        values.into_iter().fold(0, |acc, v| acc | v.bit())
    }
}

// ============================================================================
// Enum Setting
// ============================================================================

/// A setting holding one enumerator out of a supported subset.
#[derive(Debug, Clone)]
pub struct EnumSetting<E> {
    inner: ValueSetting<E>,
    supported: BTreeSet<E>,
}

impl<E: SettingEnum> EnumSetting<E> {
    /// Create an offline setting with nothing supported yet.
    pub fn new(initial: E) -> Self {
        EnumSetting {
            inner: ValueSetting::new(initial),
            supported: BTreeSet::new(),
        }
    }

    /// Create an offline setting with an initial supported set.
    pub fn with_supported<I>(initial: E, supported: I) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        EnumSetting {
            inner: ValueSetting::new(initial),
            supported: supported.into_iter().collect(),
        }
    }

    /// Values the device currently accepts.
    pub fn supported_values(&self) -> &BTreeSet<E> {
        &self.supported
    }

    /// Whether `value` may be requested.
    pub fn is_supported(&self, value: E) -> bool {
        self.supported.contains(&value)
    }

    /// Replace the supported set from a capability report.
    ///
    /// The current value is never corrected, even when it drops out of the set.
    pub fn update_supported_values<I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = E>,
    {
        let values: BTreeSet<E> = values.into_iter().collect();
        if values == self.supported {
            return false;
        }
        trace!(?values, "supported values updated");
        self.supported = values;
        true
    }

    /// Request a new value. Unsupported values are rejected with no effect.
    pub fn set_value<S>(&mut self, value: E, send: S) -> bool
    where
        S: FnOnce(&E),
    {
        if !self.supported.contains(&value) {
            trace!(?value, "rejecting unsupported value");
            return false;
        }
        self.inner.set_value(value, send)
    }

    /// See [`ValueSetting::value`].
    pub fn value(&self) -> E {
        *self.inner.value()
    }

    /// See [`ValueSetting::confirmed`].
    pub fn confirmed(&self) -> E {
        *self.inner.confirmed()
    }

    /// See [`ValueSetting::state`].
    pub fn state(&self) -> UpdateState {
        self.inner.state()
    }

    /// See [`ValueSetting::is_updating`].
    pub fn is_updating(&self) -> bool {
        self.inner.is_updating()
    }

    /// See [`ValueSetting::link`].
    pub fn link(&self) -> LinkState {
        self.inner.link()
    }

    /// See [`ValueSetting::on_remote_value_reported`]. The report is not
    /// checked against the supported set.
    pub fn on_remote_value_reported(&mut self, value: E) -> bool {
        self.inner.on_remote_value_reported(value)
    }

    /// See [`ValueSetting::apply_report`].
    pub fn apply_report<S>(&mut self, value: E, send: S) -> bool
    where
        S: FnOnce(&E),
    {
        self.inner.apply_report(value, send)
    }

    /// See [`ValueSetting::on_reconnect`].
    pub fn on_reconnect<S>(&mut self, device_value: E, send: S) -> bool
    where
        S: FnOnce(&E),
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
    pub fn restore(&mut self, value: E) -> bool {
        self.inner.restore(value)
    }
}

// ============================================================================
// Bitfield Enum Setting
// ============================================================================

/// An [`EnumSetting`] whose capabilities and values travel as bit masks.
#[derive(Debug, Clone)]
pub struct BitfieldEnumSetting<E> {
    inner: EnumSetting<E>,
}

impl<E: SettingEnum> BitfieldEnumSetting<E> {
    /// Create an offline setting with nothing supported yet.
    pub fn new(initial: E) -> Self {
        BitfieldEnumSetting {
            inner: EnumSetting::new(initial),
        }
    }

    /// Replace the supported set from a capability bit mask.
    pub fn update_supported_bitfield(&mut self, bitfield: u64) -> bool {
        self.inner.update_supported_values(E::from_bitfield(bitfield))
    }

    /// The supported set, encoded.
    pub fn supported_bitfield(&self) -> u64 {
        E::to_bitfield(self.inner.supported_values())
    }

    /// Process a value reported as a bit mask.
    ///
    /// The lowest known bit wins. A mask with no known bit is ignored.
    pub fn on_remote_bitfield_reported(&mut self, bitfield: u64) -> bool {
        match E::from_bitfield(bitfield).into_iter().next() {
            Some(value) => self.inner.on_remote_value_reported(value),
            None => {
                trace!(bitfield, "ignoring report with no known bit");
                false
            }
        }
    }

    /// The exposed value, encoded.
    pub fn encoded_value(&self) -> u64 {
        self.inner.value().bit()
    }

    /// The underlying enum setting.
    pub fn as_enum(&self) -> &EnumSetting<E> {
        &self.inner
    }

    /// The underlying enum setting, mutably.
    pub fn as_enum_mut(&mut self) -> &mut EnumSetting<E> {
        &mut self.inner
    }
}

impl<E> std::ops::Deref for BitfieldEnumSetting<E> {
    type Target = EnumSetting<E>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<E> std::ops::DerefMut for BitfieldEnumSetting<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Mode {
        A,
        B,
        C,
    }

    impl SettingEnum for Mode {
        const VARIANTS: &'static [Self] = &[Mode::A, Mode::B, Mode::C];
    }

    fn online(supported: &[Mode], initial: Mode) -> EnumSetting<Mode> {
        let mut setting = EnumSetting::with_supported(initial, supported.iter().copied());
        setting.on_reconnect(initial, |_| {});
        setting
    }

    #[test]
    fn test_bitfield_mapping_is_symmetric() {
        assert_eq!(Mode::A.bit(), 0b001);
        assert_eq!(Mode::C.bit(), 0b100);
        let set = Mode::from_bitfield(0b101);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![Mode::A, Mode::C]);
        assert_eq!(Mode::to_bitfield(&set), 0b101);
    }

    #[test]
    fn test_unknown_bits_are_ignored() {
        assert_eq!(Mode::from_bitfield(0b1010).len(), 1);
        assert!(Mode::from_bitfield(0b1000).is_empty());
    }

    #[test]
    fn test_unsupported_request_is_rejected() {
        let mut sent = Vec::new();
        let mut setting = online(&[Mode::A, Mode::B], Mode::A);

        assert!(!setting.set_value(Mode::C, |v| sent.push(*v)));
        assert!(sent.is_empty());
        assert_eq!(setting.value(), Mode::A);
        assert_eq!(setting.state(), UpdateState::UpToDate);
    }

    #[test]
    fn test_concrete_scenario() {
        let mut sent = Vec::new();
        let mut setting = online(&[Mode::A, Mode::B], Mode::A);

        assert!(setting.set_value(Mode::B, |v| sent.push(*v)));
        assert_eq!(setting.value(), Mode::B);
        assert_eq!(setting.state(), UpdateState::Updating);
        assert_eq!(sent, vec![Mode::B]);

        setting.on_remote_value_reported(Mode::B);
        assert_eq!(setting.state(), UpdateState::UpToDate);
        assert_eq!(setting.confirmed(), Mode::B);

        setting.on_disconnect();
        assert!(setting.set_value(Mode::A, |_| panic!("no transport while offline")));
        assert_eq!(setting.value(), Mode::A);

        setting.on_reconnect(Mode::B, |v| sent.push(*v));
        assert_eq!(sent, vec![Mode::B, Mode::A]);
        assert_eq!(setting.value(), Mode::A);
    }

    #[test]
    fn test_supported_update_does_not_correct_value() {
        let mut setting = online(&[Mode::A, Mode::B], Mode::B);

        assert!(setting.update_supported_values([Mode::A]));
        assert_eq!(setting.value(), Mode::B);
        assert!(!setting.update_supported_values([Mode::A]));
    }

    #[test]
    fn test_report_outside_supported_is_accepted() {
        let mut setting = online(&[Mode::A], Mode::A);
        setting.on_remote_value_reported(Mode::C);
        assert_eq!(setting.value(), Mode::C);
    }

    #[test]
    fn test_bitfield_setting() {
        let mut setting = BitfieldEnumSetting::new(Mode::A);
        assert!(setting.update_supported_bitfield(0b011));
        assert_eq!(setting.supported_bitfield(), 0b011);
        setting.on_reconnect(Mode::A, |_| {});

        assert!(setting.on_remote_bitfield_reported(0b010));
        assert_eq!(setting.value(), Mode::B);
        assert_eq!(setting.encoded_value(), 0b010);

        assert!(!setting.on_remote_bitfield_reported(0b1000));
        assert_eq!(setting.value(), Mode::B);
    }
}
