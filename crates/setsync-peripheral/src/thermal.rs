//! Thermal camera control.
//!
//! Durable component: once the device has reported its capabilities they are
//! persisted, and the component stays published (backed by presets) while
//! the device is away. Offline edits become presets and are pushed to the
//! device when it comes back.

use crate::component::{Component, ComponentId, SettingSnapshot};
use crate::host::PeripheralContext;
use crate::notifier::ChangeNotifier;
use crate::peripheral::PeripheralController;
use serde::{Deserialize, Serialize};
use setsync_core::{
    BitfieldEnumSetting, Bounds, ComponentLifetime, DisconnectAction, EnumSetting,
    IncrementalListAssembler, ListUploader, Marker, RangedSetting, Reconcile,
    ReconciliationPolicy, SettingEnum, UpdateState, ValueSetting,
};
use setsync_protocol::{
    CalibrationMode, Command, Event, ListFlags, PaletteColor, PaletteSettings, Rendering,
    SettingId, ThermalMode, ThermalSensitivity, BACKGROUND_TEMPERATURE_MAX, BLENDING_RATE_MAX,
    BLENDING_RATE_MIN, EMISSIVITY_MAX, EMISSIVITY_MIN,
};
use setsync_store::StorageEntry;
use tracing::{debug, trace};

const ID: ComponentId = ComponentId::ThermalControl;

// device data
const SUPPORTED_MODES: StorageEntry<u64> = StorageEntry::new("supported_modes");

// presets
const MODE_PRESET: StorageEntry<ThermalMode> = StorageEntry::new("mode");
const SENSITIVITY_PRESET: StorageEntry<ThermalSensitivity> = StorageEntry::new("sensitivity");
const CALIBRATION_PRESET: StorageEntry<CalibrationMode> = StorageEntry::new("calibration_mode");
const EMISSIVITY_PRESET: StorageEntry<f32> = StorageEntry::new("emissivity");
const BACKGROUND_TEMPERATURE_PRESET: StorageEntry<f32> = StorageEntry::new("background_temperature");
const PALETTE_SETTINGS_PRESET: StorageEntry<PaletteSettings> = StorageEntry::new("palette_settings");

const DEFAULT_EMISSIVITY: f32 = 1.0;
/// 20 °C.
const DEFAULT_BACKGROUND_TEMPERATURE: f32 = 293.15;

/// Color stop used to fill an `EMPTY` palette message.
const BLANK_COLOR: PaletteColor = PaletteColor {
    red: 0.0,
    green: 0.0,
    blue: 0.0,
    position: 0.0,
};

/// Snapshot of the thermal control component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalControlState {
    /// Thermal imaging mode.
    pub mode: SettingSnapshot<ThermalMode>,
    /// Modes the device supports.
    pub supported_modes: Vec<ThermalMode>,
    /// Sensitivity range.
    pub sensitivity: SettingSnapshot<ThermalSensitivity>,
    /// Shutter calibration mode, once the device reported one.
    pub calibration_mode: Option<SettingSnapshot<CalibrationMode>>,
    /// Emissivity in `0.0..=1.0`.
    pub emissivity: SettingSnapshot<f32>,
    /// Background temperature in Kelvin.
    pub background_temperature: SettingSnapshot<f32>,
    /// Palette color stops, sorted by position.
    pub palette: Vec<PaletteColor>,
    /// How the palette maps onto temperatures.
    pub palette_settings: SettingSnapshot<PaletteSettings>,
}

// ============================================================================
// Controller
// ============================================================================

/// Mirrors the thermal camera settings of one device.
#[derive(Debug)]
pub struct ThermalControlController {
    notifier: ChangeNotifier,
    policy: ReconciliationPolicy,
    mode: BitfieldEnumSetting<ThermalMode>,
    sensitivity: EnumSetting<ThermalSensitivity>,
    calibration: Option<EnumSetting<CalibrationMode>>,
    calibration_preset: Option<CalibrationMode>,
    emissivity: RangedSetting<f32>,
    background_temperature: RangedSetting<f32>,
    palette: IncrementalListAssembler<PaletteColor, u32>,
    palette_settings: ValueSetting<PaletteSettings>,
    uploader: ListUploader<PaletteColor>,
    has_local_values: bool,
}

impl ThermalControlController {
    /// Create the controller, restoring whatever was persisted for the
    /// device. The component is published right away if the device was seen
    /// before.
    pub fn new(ctx: &PeripheralContext<'_>) -> Self {
        let mut controller = Self {
            notifier: ChangeNotifier::new(ID),
            policy: ReconciliationPolicy::new(ComponentLifetime::Durable),
            mode: BitfieldEnumSetting::new(ThermalMode::Disabled),
            sensitivity: EnumSetting::with_supported(
                ThermalSensitivity::HighRange,
                ThermalSensitivity::VARIANTS.iter().copied(),
            ),
            calibration: None,
            calibration_preset: None,
            emissivity: RangedSetting::new(
                DEFAULT_EMISSIVITY,
                Bounds::new(EMISSIVITY_MIN, EMISSIVITY_MAX),
            ),
            background_temperature: RangedSetting::new(
                DEFAULT_BACKGROUND_TEMPERATURE,
                Bounds::new(0.0, BACKGROUND_TEMPERATURE_MAX),
            ),
            palette: IncrementalListAssembler::sorted(
                |color: &PaletteColor| color.position.to_bits(),
                PaletteColor::cmp,
            ),
            palette_settings: ValueSetting::default(),
            uploader: ListUploader::new(),
            has_local_values: false,
        };
        controller.load_persisted(ctx);
        controller
    }

    fn load_persisted(&mut self, ctx: &PeripheralContext<'_>) {
        if let Some(modes) = SUPPORTED_MODES.load(ctx.device_data(ID)) {
            self.mode.update_supported_bitfield(modes);
        }
        let presets = ctx.presets(ID);
        if let Some(mode) = MODE_PRESET.load(presets) {
            self.mode.restore(mode);
        }
        if let Some(sensitivity) = SENSITIVITY_PRESET.load(presets) {
            self.sensitivity.restore(sensitivity);
        }
        self.calibration_preset = CALIBRATION_PRESET.load(presets);
        if let Some(value) = EMISSIVITY_PRESET.load(presets) {
            self.emissivity.restore(value);
        }
        if let Some(kelvin) = BACKGROUND_TEMPERATURE_PRESET.load(presets) {
            self.background_temperature.restore(kelvin);
        }
        if let Some(settings) = PALETTE_SETTINGS_PRESET.load(presets) {
            self.palette_settings.restore(settings);
        }

        if self.policy.should_publish_offline(ctx.has_device_data(ID)) {
            debug!("ThermalControl[{}]: restored from persisted data", ctx.host.device());
            self.has_local_values = true;
            self.notifier.publish();
        }
    }

    /// Items converged together on disconnect.
    fn reconcilables(&mut self) -> Vec<&mut dyn Reconcile> {
        let mut items: Vec<&mut dyn Reconcile> = vec![
            &mut self.mode as &mut dyn Reconcile,
            &mut self.sensitivity,
            &mut self.emissivity,
            &mut self.background_temperature,
            &mut self.palette,
            &mut self.palette_settings,
        ];
        if let Some(calibration) = self.calibration.as_mut() {
            items.push(calibration);
        }
        items
    }

    fn persist(&self, ctx: &mut PeripheralContext<'_>) {
        SUPPORTED_MODES.save(ctx.device_data_mut(ID), &self.mode.supported_bitfield());
        if let Some(presets) = ctx.presets_mut(ID) {
            MODE_PRESET.save(Some(&mut *presets), &self.mode.value());
            SENSITIVITY_PRESET.save(Some(&mut *presets), &self.sensitivity.value());
            EMISSIVITY_PRESET.save(Some(&mut *presets), &self.emissivity.value());
            BACKGROUND_TEMPERATURE_PRESET.save(Some(&mut *presets), &self.background_temperature.value());
            PALETTE_SETTINGS_PRESET.save(Some(&mut *presets), self.palette_settings.value());
            if let Some(calibration) = &self.calibration {
                CALIBRATION_PRESET.save(Some(presets), &calibration.value());
            }
        }
    }

    /// Current snapshot, as published.
    pub fn state(&self) -> ThermalControlState {
        ThermalControlState {
            mode: SettingSnapshot::new(self.mode.value(), self.mode.state()),
            supported_modes: self.mode.supported_values().iter().copied().collect(),
            sensitivity: SettingSnapshot::new(self.sensitivity.value(), self.sensitivity.state()),
            calibration_mode: self
                .calibration
                .as_ref()
                .map(|calibration| SettingSnapshot::new(calibration.value(), calibration.state())),
            emissivity: SettingSnapshot::new(self.emissivity.value(), self.emissivity.state()),
            background_temperature: SettingSnapshot::new(
                self.background_temperature.value(),
                self.background_temperature.state(),
            ),
            palette: self.palette.committed().to_vec(),
            palette_settings: SettingSnapshot::new(
                *self.palette_settings.value(),
                self.palette_settings.state(),
            ),
        }
    }

    fn on_calibration_mode(&mut self, ctx: &mut PeripheralContext<'_>, reported: CalibrationMode) -> bool {
        let host = &mut *ctx.host;
        let send = |mode: &CalibrationMode| host.send(ID, Command::SetCalibrationMode { mode: *mode });
        if let Some(calibration) = self.calibration.as_mut() {
            return calibration.apply_report(reported, send);
        }
        // first report: the setting only exists from now on, with any preset
        // taking priority over the device value
        let initial = self.calibration_preset.unwrap_or(reported);
        let mut calibration =
            EnumSetting::with_supported(initial, CalibrationMode::VARIANTS.iter().copied());
        calibration.on_connect();
        calibration.apply_report(reported, send);
        self.calibration = Some(calibration);
        true
    }
}

impl PeripheralController for ThermalControlController {
    fn id(&self) -> ComponentId {
        ID
    }

    fn snapshot(&self) -> Component {
        Component::ThermalControl(self.state())
    }

    fn notifier(&mut self) -> &mut ChangeNotifier {
        &mut self.notifier
    }

    fn on_connected(&mut self, _ctx: &mut PeripheralContext<'_>) {
        let policy = self.policy;
        let has_local_values = self.has_local_values;
        let mut persisted: [&mut dyn Reconcile; 5] = [
            &mut self.mode,
            &mut self.sensitivity,
            &mut self.emissivity,
            &mut self.background_temperature,
            &mut self.palette_settings,
        ];
        policy.connect(&mut persisted, has_local_values);
        if let Some(calibration) = self.calibration.as_mut() {
            policy.connect(&mut [calibration], has_local_values);
        }
        self.uploader.forget();
    }

    fn on_disconnected(&mut self, ctx: &mut PeripheralContext<'_>) {
        let policy = self.policy;
        let has_persisted = ctx.has_device_data(ID);
        let (changed, action) = policy.disconnect(&mut self.reconcilables(), has_persisted);
        self.uploader.forget();
        self.notifier.changed(changed);
        match action {
            DisconnectAction::PersistAndKeep => {
                self.persist(ctx);
                self.has_local_values = true;
                self.notifier.publish();
                self.notifier.mark();
            }
            DisconnectAction::Unpublish => {
                self.has_local_values = false;
                self.notifier.unpublish();
            }
        }
    }

    fn on_event(&mut self, ctx: &mut PeripheralContext<'_>, event: &Event) -> bool {
        let changed = match event {
            Event::ThermalCapabilities { modes } => {
                let changed = self.mode.update_supported_bitfield(*modes);
                SUPPORTED_MODES.save(ctx.device_data_mut(ID), modes);
                let usable = ThermalMode::from_bitfield(*modes)
                    .iter()
                    .any(|mode| *mode != ThermalMode::Disabled);
                if self.policy.should_publish_on_connect(usable) {
                    self.notifier.publish();
                } else {
                    trace!("ThermalControl[{}]: no usable thermal mode", ctx.host.device());
                }
                changed
            }
            Event::ThermalMode { mode } => {
                let host = &mut *ctx.host;
                self.mode
                    .apply_report(*mode, |m| host.send(ID, Command::SetThermalMode { mode: *m }))
            }
            Event::ThermalSensitivity { sensitivity } => {
                let host = &mut *ctx.host;
                self.sensitivity.apply_report(*sensitivity, |s| {
                    host.send(ID, Command::SetThermalSensitivity { sensitivity: *s })
                })
            }
            Event::CalibrationMode { mode } => self.on_calibration_mode(ctx, *mode),
            Event::Emissivity { value } => {
                let host = &mut *ctx.host;
                self.emissivity
                    .apply_report(*value, |v| host.send(ID, Command::SetEmissivity { value: *v }))
            }
            Event::BackgroundTemperature { kelvin } => {
                let host = &mut *ctx.host;
                self.background_temperature.apply_report(*kelvin, |k| {
                    host.send(ID, Command::SetBackgroundTemperature { kelvin: *k })
                })
            }
            Event::PaletteSettings { settings } => {
                let host = &mut *ctx.host;
                self.palette_settings.apply_report(*settings, |s| {
                    host.send(ID, Command::SetPaletteSettings { settings: *s })
                })
            }
            Event::PalettePart { color, flags } => {
                let marker = flags.marker();
                let item = (marker != Marker::Empty).then_some(*color);
                let changed = self.palette.process(item, marker);
                if changed {
                    self.uploader.sync_from(self.palette.committed());
                    if marker != Marker::Remove {
                        ctx.host
                            .list_committed(ID, SettingId::ThermalPalette, self.palette.committed().len());
                    }
                }
                changed
            }
            _ => return false,
        };
        self.notifier.changed(changed);
        true
    }
}

// ============================================================================
// User Handle
// ============================================================================

/// User access to a published thermal control component.
///
/// Every mutating call results in at most one change notification.
#[derive(Debug)]
pub struct ThermalControlHandle<'a> {
    controller: &'a mut ThermalControlController,
    ctx: PeripheralContext<'a>,
}

impl<'a> ThermalControlHandle<'a> {
    pub(crate) fn new(controller: &'a mut ThermalControlController, ctx: PeripheralContext<'a>) -> Self {
        Self { controller, ctx }
    }

    /// Current snapshot.
    pub fn state(&self) -> ThermalControlState {
        self.controller.state()
    }

    /// Thermal imaging mode.
    pub fn mode(&self) -> ThermalMode {
        self.controller.mode.value()
    }

    /// Whether the mode change was confirmed.
    pub fn mode_state(&self) -> UpdateState {
        self.controller.mode.state()
    }

    /// Sensitivity range.
    pub fn sensitivity(&self) -> ThermalSensitivity {
        self.controller.sensitivity.value()
    }

    /// Calibration mode, once reported.
    pub fn calibration_mode(&self) -> Option<CalibrationMode> {
        self.controller.calibration.as_ref().map(|calibration| calibration.value())
    }

    /// Emissivity.
    pub fn emissivity(&self) -> f32 {
        self.controller.emissivity.value()
    }

    /// Background temperature in Kelvin.
    pub fn background_temperature(&self) -> f32 {
        self.controller.background_temperature.value()
    }

    /// Palette color stops.
    pub fn palette(&self) -> &[PaletteColor] {
        self.controller.palette.committed()
    }

    /// Palette mapping.
    pub fn palette_settings(&self) -> PaletteSettings {
        *self.controller.palette_settings.value()
    }

    /// Change the thermal mode. Unsupported modes are refused.
    pub fn set_mode(&mut self, mode: ThermalMode) -> bool {
        let host = &mut *self.ctx.host;
        let controller = &mut *self.controller;
        let changed = controller
            .mode
            .set_value(mode, |m| host.send(ID, Command::SetThermalMode { mode: *m }));
        if changed {
            MODE_PRESET.save(self.ctx.presets_mut(ID), &mode);
        } else if !controller.mode.is_supported(mode) {
            self.ctx
                .host
                .request_rejected(ID, SettingId::ThermalMode, "mode not supported");
        }
        self.finish(changed)
    }

    /// Change the sensitivity range.
    pub fn set_sensitivity(&mut self, sensitivity: ThermalSensitivity) -> bool {
        let host = &mut *self.ctx.host;
        let changed = self.controller.sensitivity.set_value(sensitivity, |s| {
            host.send(ID, Command::SetThermalSensitivity { sensitivity: *s })
        });
        if changed {
            SENSITIVITY_PRESET.save(self.ctx.presets_mut(ID), &sensitivity);
        }
        self.finish(changed)
    }

    /// Change the calibration mode. Refused until the device reported one.
    pub fn set_calibration_mode(&mut self, mode: CalibrationMode) -> bool {
        let host = &mut *self.ctx.host;
        let changed = match self.controller.calibration.as_mut() {
            Some(calibration) => calibration
                .set_value(mode, |m| host.send(ID, Command::SetCalibrationMode { mode: *m })),
            None => {
                host.request_rejected(ID, SettingId::ThermalCalibrationMode, "not reported yet");
                false
            }
        };
        if changed {
            CALIBRATION_PRESET.save(self.ctx.presets_mut(ID), &mode);
        }
        self.finish(changed)
    }

    /// Change the emissivity, clamped to `0.0..=1.0`. Non-finite values are
    /// refused.
    pub fn set_emissivity(&mut self, value: f32) -> bool {
        if !value.is_finite() {
            self.ctx
                .host
                .request_rejected(ID, SettingId::ThermalEmissivity, "not a finite value");
            return false;
        }
        let host = &mut *self.ctx.host;
        let changed = self
            .controller
            .emissivity
            .set_value(value, |v| host.send(ID, Command::SetEmissivity { value: *v }));
        if changed {
            EMISSIVITY_PRESET.save(self.ctx.presets_mut(ID), &self.controller.emissivity.value());
        }
        self.finish(changed)
    }

    /// Change the background temperature, clamped to the supported range.
    /// Non-finite values are refused.
    pub fn set_background_temperature(&mut self, kelvin: f32) -> bool {
        if !kelvin.is_finite() {
            self.ctx.host.request_rejected(
                ID,
                SettingId::ThermalBackgroundTemperature,
                "not a finite value",
            );
            return false;
        }
        let host = &mut *self.ctx.host;
        let changed = self.controller.background_temperature.set_value(kelvin, |k| {
            host.send(ID, Command::SetBackgroundTemperature { kelvin: *k })
        });
        if changed {
            BACKGROUND_TEMPERATURE_PRESET.save(
                self.ctx.presets_mut(ID),
                &self.controller.background_temperature.value(),
            );
        }
        self.finish(changed)
    }

    /// Change the palette mapping. Nothing is sent when the device already
    /// holds the same settings.
    pub fn set_palette_settings(&mut self, settings: PaletteSettings) -> bool {
        if !settings.is_finite() {
            self.ctx
                .host
                .request_rejected(ID, SettingId::ThermalPaletteSettings, "not a finite value");
            return false;
        }
        let host = &mut *self.ctx.host;
        let changed = self.controller.palette_settings.set_value(settings, |s| {
            host.send(ID, Command::SetPaletteSettings { settings: *s })
        });
        if changed {
            PALETTE_SETTINGS_PRESET.save(self.ctx.presets_mut(ID), &settings);
        }
        self.finish(changed)
    }

    /// Change the rendered stream. One-shot, only possible while connected;
    /// the blending rate is clamped to `0.0..=1.0`.
    pub fn set_rendering(&mut self, rendering: Rendering) -> bool {
        let reason = if !self.ctx.host.is_connected() {
            Some("not connected")
        } else if !rendering.blending_rate.is_finite() {
            Some("not a finite value")
        } else {
            None
        };
        if let Some(reason) = reason {
            self.ctx
                .host
                .request_rejected(ID, SettingId::ThermalRendering, reason);
            return false;
        }
        let rendering = Rendering {
            blending_rate: Bounds::new(BLENDING_RATE_MIN, BLENDING_RATE_MAX).clamp(rendering.blending_rate),
            ..rendering
        };
        self.ctx.host.send(ID, Command::SetRendering { rendering });
        true
    }

    /// Upload a palette. Nothing is sent if the device already holds the same
    /// color stops, in whatever order. The committed palette changes once the
    /// device reports it back.
    pub fn send_palette(&mut self, mut colors: Vec<PaletteColor>) -> bool {
        if !self.ctx.host.is_connected() {
            self.ctx
                .host
                .request_rejected(ID, SettingId::ThermalPalette, "not connected");
            return false;
        }
        colors.sort();
        let host = &mut *self.ctx.host;
        self.controller.uploader.push(&colors, |color, marker| {
            host.send(
                ID,
                Command::SetPalettePart {
                    color: color.copied().unwrap_or(BLANK_COLOR),
                    flags: ListFlags::from(marker),
                },
            )
        })
    }

    /// Trigger a shutter calibration now. Only possible while connected.
    pub fn calibrate(&mut self) -> bool {
        if !self.ctx.host.is_connected() {
            return false;
        }
        self.ctx.host.send(ID, Command::TriggerCalibration);
        true
    }

    /// Drop everything persisted for this device. While disconnected the
    /// component goes away as well.
    pub fn forget(mut self) {
        debug!("ThermalControl[{}]: forgetting persisted data", self.ctx.host.device());
        self.ctx.forget(ID);
        self.controller.has_local_values = false;
        if !self.ctx.host.is_connected() {
            self.controller.notifier.unpublish();
        }
        self.finish(false);
    }

    fn finish(&mut self, changed: bool) -> bool {
        self.controller.notifier.changed(changed);
        self.controller.flush(&mut self.ctx);
        changed
    }
}
