//! Wifi access point configuration.
//!
//! Transient component: published while the device is connected, reset and
//! unpublished when it goes away.

use crate::component::{Component, ComponentId, SettingSnapshot};
use crate::host::PeripheralContext;
use crate::notifier::ChangeNotifier;
use crate::peripheral::PeripheralController;
use serde::{Deserialize, Serialize};
use setsync_core::{
    BitfieldEnumSetting, ComponentLifetime, EnumSetting, IncrementalListAssembler, Marker,
    ReconciliationPolicy, SettingEnum, ValueSetting,
};
use setsync_protocol::{
    parse_country_code, parse_country_codes, validate_ssid, validate_wpa2_password,
    AuthorizedChannel, Band, Channel, ChannelSelection, Command, Environment, Event, SecurityMode,
    SettingId,
};
use std::collections::BTreeSet;
use tracing::debug;

const ID: ComponentId = ComponentId::WifiAccessPoint;

/// Snapshot of the access point component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiAccessPointState {
    /// Indoor or outdoor regulation.
    pub environment: SettingSnapshot<Environment>,
    /// Environments that may be selected.
    pub available_environments: Vec<Environment>,
    /// Country code.
    pub country: SettingSnapshot<String>,
    /// Country codes that may be selected.
    pub available_countries: Vec<String>,
    /// Whether the device picked the country itself.
    pub automatic_country: bool,
    /// Network name.
    pub ssid: SettingSnapshot<String>,
    /// Security mode.
    pub security: SettingSnapshot<SecurityMode>,
    /// Security modes the device supports.
    pub supported_security: Vec<SecurityMode>,
    /// Channel selection.
    pub channel: SettingSnapshot<ChannelSelection>,
    /// Channels usable in the current environment.
    pub available_channels: Vec<Channel>,
}

// ============================================================================
// Controller
// ============================================================================

/// Mirrors the wifi access point settings of one device.
#[derive(Debug)]
pub struct WifiAccessPointController {
    notifier: ChangeNotifier,
    policy: ReconciliationPolicy,
    forced_country: Option<String>,
    environment: EnumSetting<Environment>,
    country: ValueSetting<String>,
    available_countries: BTreeSet<String>,
    automatic_country: bool,
    ssid: ValueSetting<String>,
    security: BitfieldEnumSetting<SecurityMode>,
    channel: ValueSetting<ChannelSelection>,
    authorized: IncrementalListAssembler<AuthorizedChannel, Channel>,
}

impl WifiAccessPointController {
    /// Create the controller. With `forced_country` set, the country is
    /// pinned to it and only the outdoor environment is offered.
    pub fn new(forced_country: Option<String>) -> Self {
        Self {
            notifier: ChangeNotifier::new(ID),
            policy: ReconciliationPolicy::new(ComponentLifetime::Transient),
            forced_country,
            environment: EnumSetting::with_supported(
                Environment::Indoor,
                Environment::VARIANTS.iter().copied(),
            ),
            country: ValueSetting::new(String::new()),
            available_countries: BTreeSet::new(),
            automatic_country: false,
            ssid: ValueSetting::new(String::new()),
            security: BitfieldEnumSetting::new(SecurityMode::Open),
            channel: ValueSetting::new(ChannelSelection::default()),
            authorized: IncrementalListAssembler::new(|authorized: &AuthorizedChannel| authorized.channel),
        }
    }

    /// Channels authorized in the current environment.
    pub fn available_channels(&self) -> Vec<Channel> {
        let environment = self.environment.value();
        self.authorized
            .committed()
            .iter()
            .filter(|authorized| authorized.allows(environment))
            .map(|authorized| authorized.channel)
            .collect()
    }

    /// Current snapshot, as published.
    pub fn state(&self) -> WifiAccessPointState {
        WifiAccessPointState {
            environment: SettingSnapshot::new(self.environment.value(), self.environment.state()),
            available_environments: self.environment.supported_values().iter().copied().collect(),
            country: SettingSnapshot::new(self.country.value().clone(), self.country.state()),
            available_countries: self.available_countries.iter().cloned().collect(),
            automatic_country: self.automatic_country,
            ssid: SettingSnapshot::new(self.ssid.value().clone(), self.ssid.state()),
            security: SettingSnapshot::new(self.security.value(), self.security.state()),
            supported_security: self.security.supported_values().iter().copied().collect(),
            channel: SettingSnapshot::new(*self.channel.value(), self.channel.state()),
            available_channels: self.available_channels(),
        }
    }

    /// Pin country and environment when auto-selection is configured.
    fn apply_forced_country(&mut self, ctx: &mut PeripheralContext<'_>) {
        let Some(code) = self.forced_country.clone() else {
            return;
        };
        let host = &mut *ctx.host;
        self.country
            .set_value(code.clone(), |c| host.send(ID, Command::SetCountry { code: c.clone() }));
        self.available_countries = BTreeSet::from([code]);
        self.environment.update_supported_values([Environment::Outdoor]);
        self.environment.set_value(Environment::Outdoor, |e| {
            host.send(ID, Command::SetEnvironment { environment: *e })
        });
    }
}

impl PeripheralController for WifiAccessPointController {
    fn id(&self) -> ComponentId {
        ID
    }

    fn snapshot(&self) -> Component {
        Component::WifiAccessPoint(self.state())
    }

    fn notifier(&mut self) -> &mut ChangeNotifier {
        &mut self.notifier
    }

    fn on_connected(&mut self, ctx: &mut PeripheralContext<'_>) {
        let policy = self.policy;
        policy.connect(
            &mut [
                &mut self.environment,
                &mut self.country,
                &mut self.ssid,
                &mut self.security,
                &mut self.channel,
                &mut self.authorized,
            ],
            false,
        );
        self.apply_forced_country(ctx);
        self.notifier.publish();
    }

    fn on_disconnected(&mut self, _ctx: &mut PeripheralContext<'_>) {
        let policy = self.policy;
        let (changed, _) = policy.disconnect(
            &mut [
                &mut self.environment,
                &mut self.country,
                &mut self.ssid,
                &mut self.security,
                &mut self.channel,
                &mut self.authorized,
            ],
            false,
        );
        // nothing survives the session
        let mut fresh = WifiAccessPointController::new(self.forced_country.take());
        std::mem::swap(&mut fresh.notifier, &mut self.notifier);
        *self = fresh;
        self.notifier.changed(changed);
        self.notifier.unpublish();
    }

    fn on_event(&mut self, ctx: &mut PeripheralContext<'_>, event: &Event) -> bool {
        let changed = match event {
            Event::Environment { environment } => {
                let host = &mut *ctx.host;
                self.environment.apply_report(*environment, |e| {
                    host.send(ID, Command::SetEnvironment { environment: *e })
                })
            }
            Event::Country { code, automatic } => {
                let mut changed = self.country.on_remote_value_reported(code.clone());
                changed |= self.automatic_country != *automatic;
                self.automatic_country = *automatic;
                if self.forced_country.is_some() {
                    let codes = BTreeSet::from([code.clone()]);
                    changed |= self.available_countries != codes;
                    self.available_countries = codes;
                }
                // authorized channels depend on the country
                ctx.host.send(ID, Command::UpdateAuthorizedChannels);
                changed
            }
            Event::SupportedCountries { codes } => {
                if self.forced_country.is_some() {
                    false
                } else {
                    let codes = parse_country_codes(codes);
                    let changed = self.available_countries != codes;
                    self.available_countries = codes;
                    changed
                }
            }
            Event::SupportedSecurityModes { modes } => self.security.update_supported_bitfield(*modes),
            Event::Security { mode } => self.security.on_remote_value_reported(*mode),
            Event::Ssid { ssid } => self.ssid.on_remote_value_reported(ssid.clone()),
            Event::ApChannel { selection } => self.channel.on_remote_value_reported(*selection),
            Event::AuthorizedChannel { channel, flags } => {
                let marker = flags.marker();
                let item = (marker != Marker::Empty).then_some(*channel);
                let changed = self.authorized.process(item, marker);
                if changed && marker != Marker::Remove {
                    ctx.host.list_committed(
                        ID,
                        SettingId::WifiAuthorizedChannels,
                        self.authorized.committed().len(),
                    );
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

/// User access to a published access point component.
#[derive(Debug)]
pub struct WifiAccessPointHandle<'a> {
    controller: &'a mut WifiAccessPointController,
    ctx: PeripheralContext<'a>,
}

impl<'a> WifiAccessPointHandle<'a> {
    pub(crate) fn new(controller: &'a mut WifiAccessPointController, ctx: PeripheralContext<'a>) -> Self {
        Self { controller, ctx }
    }

    /// Current snapshot.
    pub fn state(&self) -> WifiAccessPointState {
        self.controller.state()
    }

    /// Current environment.
    pub fn environment(&self) -> Environment {
        self.controller.environment.value()
    }

    /// Current country code.
    pub fn country(&self) -> &str {
        self.controller.country.value()
    }

    /// Current SSID.
    pub fn ssid(&self) -> &str {
        self.controller.ssid.value()
    }

    /// Current security mode.
    pub fn security(&self) -> SecurityMode {
        self.controller.security.value()
    }

    /// Current channel selection.
    pub fn channel(&self) -> ChannelSelection {
        *self.controller.channel.value()
    }

    /// Channels usable in the current environment.
    pub fn available_channels(&self) -> Vec<Channel> {
        self.controller.available_channels()
    }

    /// Change the environment.
    pub fn set_environment(&mut self, environment: Environment) -> bool {
        let host = &mut *self.ctx.host;
        let changed = self.controller.environment.set_value(environment, |e| {
            host.send(ID, Command::SetEnvironment { environment: *e })
        });
        if !changed && !self.controller.environment.is_supported(environment) {
            self.reject(SettingId::WifiEnvironment, "environment not available");
        }
        self.finish(changed)
    }

    /// Change the country. Only codes the device accepts are allowed.
    pub fn set_country(&mut self, code: &str) -> bool {
        let code = match parse_country_code(code) {
            Ok(code) => code,
            Err(e) => {
                self.reject(SettingId::WifiCountry, &e.to_string());
                return self.finish(false);
            }
        };
        if !self.controller.available_countries.contains(&code) {
            self.reject(SettingId::WifiCountry, "country not available");
            return self.finish(false);
        }
        let host = &mut *self.ctx.host;
        let changed = self
            .controller
            .country
            .set_value(code, |c| host.send(ID, Command::SetCountry { code: c.clone() }));
        self.finish(changed)
    }

    /// Change the SSID.
    pub fn set_ssid(&mut self, ssid: &str) -> bool {
        if let Err(e) = validate_ssid(ssid) {
            self.reject(SettingId::WifiSsid, &e.to_string());
            return self.finish(false);
        }
        let host = &mut *self.ctx.host;
        let changed = self
            .controller
            .ssid
            .set_value(ssid.to_string(), |s| host.send(ID, Command::SetSsid { ssid: s.clone() }));
        self.finish(changed)
    }

    /// Open the access point.
    pub fn set_open(&mut self) -> bool {
        self.set_security(SecurityMode::Open, String::new())
    }

    /// Secure the access point with WPA2. The password is sent even if the
    /// mode does not change, since it is never reported back.
    pub fn secure_with_wpa2(&mut self, password: &str) -> bool {
        if let Err(e) = validate_wpa2_password(password) {
            self.reject(SettingId::WifiSecurity, &e.to_string());
            return self.finish(false);
        }
        if self.controller.security.value() == SecurityMode::Wpa2Secured
            && self.controller.security.is_supported(SecurityMode::Wpa2Secured)
            && self.ctx.host.is_connected()
        {
            self.ctx.host.send(
                ID,
                Command::SetSecurity {
                    mode: SecurityMode::Wpa2Secured,
                    password: password.to_string(),
                },
            );
            return self.finish(false);
        }
        self.set_security(SecurityMode::Wpa2Secured, password.to_string())
    }

    fn set_security(&mut self, mode: SecurityMode, password: String) -> bool {
        let host = &mut *self.ctx.host;
        let changed = self.controller.security.set_value(mode, |m| {
            host.send(ID, Command::SetSecurity { mode: *m, password })
        });
        if !changed && !self.controller.security.is_supported(mode) {
            self.reject(SettingId::WifiSecurity, "security mode not supported");
        }
        self.finish(changed)
    }

    /// Use a fixed channel. Only channels available in the current
    /// environment are allowed.
    pub fn select_channel(&mut self, channel: Channel) -> bool {
        if !self.controller.available_channels().contains(&channel) {
            self.reject(SettingId::WifiChannel, "channel not available");
            return self.finish(false);
        }
        self.set_channel(ChannelSelection::Manual(channel))
    }

    /// Let the device pick the channel, optionally within one band that has
    /// available channels.
    pub fn auto_select_channel(&mut self, band: Option<Band>) -> bool {
        if let Some(band) = band {
            let band_available = self
                .controller
                .available_channels()
                .iter()
                .any(|channel| channel.band() == band);
            if !band_available {
                self.reject(SettingId::WifiChannel, "band not available");
                return self.finish(false);
            }
        }
        self.set_channel(ChannelSelection::Auto(band))
    }

    fn set_channel(&mut self, selection: ChannelSelection) -> bool {
        let host = &mut *self.ctx.host;
        let changed = self.controller.channel.set_value(selection, |s| {
            host.send(ID, Command::SetApChannel { selection: *s })
        });
        self.finish(changed)
    }

    fn reject(&mut self, setting: SettingId, reason: &str) {
        self.ctx.host.request_rejected(ID, setting, reason);
    }

    fn finish(&mut self, changed: bool) -> bool {
        if changed {
            debug!("WifiAccessPoint[{}]: user change", self.ctx.host.device());
        }
        self.controller.notifier.changed(changed);
        self.controller.flush(&mut self.ctx);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsync_protocol::ListFlags;
    use crate::test_support::Rig;

    fn channel(band: Band, id: u8) -> Channel {
        Channel::new(band, id).expect("valid channel")
    }

    fn connected(rig: &mut Rig, forced: Option<&str>) -> WifiAccessPointController {
        let mut ap = WifiAccessPointController::new(forced.map(str::to_string));
        rig.host.set_connected(true);
        let mut ctx = rig.ctx();
        ap.on_connected(&mut ctx);
        ap.flush(&mut ctx);
        ap
    }

    fn feed(rig: &mut Rig, ap: &mut WifiAccessPointController, event: Event) {
        let mut ctx = rig.ctx();
        assert!(ap.on_event(&mut ctx, &event));
        ap.flush(&mut ctx);
    }

    #[test]
    fn test_reports_adopted_on_connect() {
        let mut rig = Rig::new();
        let mut ap = connected(&mut rig, None);
        feed(&mut rig, &mut ap, Event::Ssid { ssid: "drone".to_string() });
        feed(&mut rig, &mut ap, Event::Environment { environment: Environment::Outdoor });
        assert_eq!(ap.ssid.value(), "drone");
        assert_eq!(ap.environment.value(), Environment::Outdoor);
        assert!(rig.drain_commands().is_empty());
    }

    #[test]
    fn test_country_change_refreshes_channels() {
        let mut rig = Rig::new();
        let mut ap = connected(&mut rig, None);
        feed(&mut rig, &mut ap, Event::SupportedCountries { codes: "FR;US".to_string() });
        feed(&mut rig, &mut ap, Event::Country { code: "US".to_string(), automatic: false });
        assert_eq!(rig.drain_commands(), vec![Command::UpdateAuthorizedChannels]);

        let mut handle = WifiAccessPointHandle::new(&mut ap, rig.ctx());
        assert!(!handle.set_country("DE"));
        assert!(handle.set_country("fr"));
        assert_eq!(handle.country(), "FR");
        assert_eq!(
            rig.drain_commands(),
            vec![Command::SetCountry { code: "FR".to_string() }]
        );
    }

    #[test]
    fn test_available_channels_follow_environment() {
        let mut rig = Rig::new();
        let mut ap = connected(&mut rig, None);
        let indoor_only = AuthorizedChannel {
            channel: channel(Band::Band5Ghz, 36),
            environments: Environment::Indoor.bit(),
        };
        let both = AuthorizedChannel {
            channel: channel(Band::Band2_4Ghz, 6),
            environments: Environment::to_bitfield(Environment::VARIANTS),
        };
        feed(&mut rig, &mut ap, Event::Environment { environment: Environment::Outdoor });
        feed(&mut rig, &mut ap, Event::AuthorizedChannel { channel: indoor_only, flags: ListFlags::FIRST });
        feed(&mut rig, &mut ap, Event::AuthorizedChannel { channel: both, flags: ListFlags::LAST });

        assert_eq!(ap.available_channels(), vec![channel(Band::Band2_4Ghz, 6)]);

        let mut handle = WifiAccessPointHandle::new(&mut ap, rig.ctx());
        assert!(!handle.select_channel(channel(Band::Band5Ghz, 36)));
        assert!(!handle.auto_select_channel(Some(Band::Band5Ghz)));
        assert!(handle.select_channel(channel(Band::Band2_4Ghz, 6)));
    }

    #[test]
    fn test_wpa2_requires_valid_password() {
        let mut rig = Rig::new();
        let mut ap = connected(&mut rig, None);
        feed(&mut rig, &mut ap, Event::SupportedSecurityModes {
            modes: SecurityMode::to_bitfield(SecurityMode::VARIANTS),
        });
        let mut handle = WifiAccessPointHandle::new(&mut ap, rig.ctx());
        assert!(!handle.secure_with_wpa2("short"));
        assert!(handle.secure_with_wpa2("long enough"));
        assert_eq!(handle.security(), SecurityMode::Wpa2Secured);
        assert_eq!(
            rig.drain_commands(),
            vec![Command::SetSecurity {
                mode: SecurityMode::Wpa2Secured,
                password: "long enough".to_string()
            }]
        );
    }

    #[test]
    fn test_forced_country_pins_country_and_environment() {
        let mut rig = Rig::new();
        let mut ap = connected(&mut rig, Some("FR"));
        assert_eq!(
            rig.drain_commands(),
            vec![
                Command::SetCountry { code: "FR".to_string() },
                Command::SetEnvironment { environment: Environment::Outdoor },
            ]
        );
        feed(&mut rig, &mut ap, Event::SupportedCountries { codes: "FR;US;DE".to_string() });
        let state = ap.state();
        assert_eq!(state.available_countries, vec!["FR".to_string()]);
        assert_eq!(state.available_environments, vec![Environment::Outdoor]);
    }

    #[test]
    fn test_disconnect_resets_and_unpublishes() {
        let mut rig = Rig::new();
        let mut ap = connected(&mut rig, None);
        assert!(rig.components.is_published(ID));
        feed(&mut rig, &mut ap, Event::Ssid { ssid: "drone".to_string() });

        rig.host.set_connected(false);
        let mut ctx = rig.ctx();
        ap.on_disconnected(&mut ctx);
        ap.flush(&mut ctx);
        assert!(!rig.components.is_published(ID));
        assert_eq!(ap.ssid.value(), "");
    }

    #[test]
    fn test_disconnect_with_pending_request_records_change() {
        let mut rig = Rig::new();
        let mut ap = connected(&mut rig, None);
        feed(&mut rig, &mut ap, Event::Ssid { ssid: "drone".to_string() });
        let mut handle = WifiAccessPointHandle::new(&mut ap, rig.ctx());
        assert!(handle.set_ssid("field-unit"));
        assert!(!ap.notifier().is_dirty());

        rig.host.set_connected(false);
        ap.on_disconnected(&mut rig.ctx());
        assert!(ap.notifier().is_dirty());
    }
}
