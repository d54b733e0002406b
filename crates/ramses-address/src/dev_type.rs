//! Device type classification (`DevType`) and the `TT` -> slug lookup table.
//!
//! Ported from `ramses_tx.const.DevType`/`DEV_TYPE_MAP`. The Python source
//! builds this as a runtime `AttrDict` (a dict doubling as an attribute
//! namespace and a two-way forward/reverse map, with "aka" aliases). Per the
//! design note in the spec we reimplement it as a closed enum plus explicit
//! `forward`/`reverse`/`slug_of` accessors instead of a generic bidirectional
//! map type.

use std::fmt;

/// A 3-letter device/zone class slug, e.g. `CTL`, `TRV`, `HGI`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::upper_case_acronyms)]
pub enum DevType {
    // Promotable/generic devices
    DEV,
    HEA,
    HVC,
    THM,
    // Heat (CH/DHW) devices
    BDR,
    CTL,
    DHW,
    DTS,
    DT2,
    HCW,
    HGI,
    OTB,
    OUT,
    PRG,
    RFG,
    RND,
    TRV,
    TR0,
    UFC,
    // Honeywell Jasper devices
    JIM,
    JST,
    // HVAC devices
    RFS,
    FAN,
    CO2,
    HUM,
    PIR,
    REM,
    SW2,
    DIS,
}

impl fmt::Display for DevType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl DevType {
    /// The 3-letter slug string, e.g. `"CTL"`.
    pub fn slug(&self) -> &'static str {
        match self {
            DevType::DEV => "DEV",
            DevType::HEA => "HEA",
            DevType::HVC => "HVC",
            DevType::THM => "THM",
            DevType::BDR => "BDR",
            DevType::CTL => "CTL",
            DevType::DHW => "DHW",
            DevType::DTS => "DTS",
            DevType::DT2 => "DT2",
            DevType::HCW => "HCW",
            DevType::HGI => "HGI",
            DevType::OTB => "OTB",
            DevType::OUT => "OUT",
            DevType::PRG => "PRG",
            DevType::RFG => "RFG",
            DevType::RND => "RND",
            DevType::TRV => "TRV",
            DevType::TR0 => "TR0",
            DevType::UFC => "UFC",
            DevType::JIM => "JIM",
            DevType::JST => "JST",
            DevType::RFS => "RFS",
            DevType::FAN => "FAN",
            DevType::CO2 => "CO2",
            DevType::HUM => "HUM",
            DevType::PIR => "PIR",
            DevType::REM => "REM",
            DevType::SW2 => "SW2",
            DevType::DIS => "DIS",
        }
    }

    /// A human-friendly name, e.g. `"radiator_valve"`.
    pub fn friendly_name(&self) -> &'static str {
        match self {
            DevType::DEV => "generic_device",
            DevType::HEA => "heat_device",
            DevType::HVC => "hvac_device",
            DevType::THM => "thermostat",
            DevType::HGI => "gateway_interface",
            DevType::TR0 | DevType::TRV => "radiator_valve",
            DevType::CTL => "controller",
            DevType::UFC => "ufh_controller",
            DevType::HCW => "analog_thermostat",
            DevType::DHW => "dhw_sensor",
            DevType::OTB => "opentherm_bridge",
            DevType::DTS | DevType::DT2 => "digital_thermostat",
            DevType::BDR => "electrical_relay",
            DevType::OUT => "outdoor_sensor",
            DevType::PRG => "programmer",
            DevType::RFG => "rf_gateway",
            DevType::RND => "round_thermostat",
            DevType::JIM => "jasper_interface",
            DevType::JST => "jasper_thermostat",
            DevType::CO2 => "co2_sensor",
            DevType::DIS => "switch_display",
            DevType::FAN => "ventilator",
            DevType::HUM => "rh_sensor",
            DevType::PIR => "presence_sensor",
            DevType::RFS => "hvac_gateway",
            DevType::REM => "switch",
            DevType::SW2 => "switch_variant",
        }
    }

    /// True for the three generic/promotable slugs that haven't yet been
    /// resolved to a concrete device class (`DEV`, `HEA`, `HVC`).
    pub fn is_promotable(&self) -> bool {
        matches!(self, DevType::DEV | DevType::HEA | DevType::HVC)
    }

    /// True for devices in the heat (CH/DHW) family, as opposed to HVAC.
    pub fn is_heat_device(&self) -> bool {
        matches!(
            self,
            DevType::TR0
                | DevType::CTL
                | DevType::UFC
                | DevType::HCW
                | DevType::TRV
                | DevType::DHW
                | DevType::OTB
                | DevType::DTS
                | DevType::BDR
                | DevType::OUT
                | DevType::DT2
                | DevType::PRG
                | DevType::RFG
                | DevType::RND
        )
    }

    /// Resolve the two-digit decimal type byte (the `TT` in `TT:NNNNNN`) to
    /// a `DevType`, resolving "aka" aliases to their canonical slug (`TR0`
    /// aka `TRV`, `DT2` aka `DTS`) as the original `AttrDict._SZ_AKA_SLUG`
    /// entries do.
    pub fn forward(type_byte: &str) -> Option<DevType> {
        Some(match type_byte {
            "00" => DevType::TR0,
            "01" => DevType::CTL,
            "02" => DevType::UFC,
            "03" => DevType::HCW,
            "04" => DevType::TRV,
            "07" => DevType::DHW,
            "08" => DevType::JIM,
            "10" => DevType::OTB,
            "12" => DevType::DTS,
            "13" => DevType::BDR,
            "17" => DevType::OUT,
            "18" => DevType::HGI,
            "22" => DevType::DT2,
            "23" => DevType::PRG,
            "30" => DevType::RFG,
            "31" => DevType::JST,
            "34" => DevType::RND,
            _ => return None,
        })
    }

    /// Resolve a `DevType` back to its canonical two-digit decimal type
    /// byte, where one exists (the generic/HVAC slugs have none: they are
    /// determined by eavesdropped packet patterns, not by type byte).
    pub fn reverse(self) -> Option<&'static str> {
        Some(match self {
            DevType::TR0 => "00",
            DevType::CTL => "01",
            DevType::UFC => "02",
            DevType::HCW => "03",
            DevType::TRV => "04",
            DevType::DHW => "07",
            DevType::JIM => "08",
            DevType::OTB => "10",
            DevType::DTS => "12",
            DevType::BDR => "13",
            DevType::OUT => "17",
            DevType::HGI => "18",
            DevType::DT2 => "22",
            DevType::PRG => "23",
            DevType::RFG => "30",
            DevType::JST => "31",
            DevType::RND => "34",
            _ => return None,
        })
    }

    /// The canonical (alias-resolved) slug for `self` -- `TR0` resolves to
    /// `TRV`, `DT2` resolves to `DTS`.
    pub fn canonical(self) -> DevType {
        match self {
            DevType::TR0 => DevType::TRV,
            DevType::DT2 => DevType::DTS,
            other => other,
        }
    }
}

/// Zone/DHW actuator-or-sensor role slugs (`ramses_tx.const.ZoneRole`),
/// used when resolving a zone's device-class membership from `0005`/`000C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum ZoneRole {
    ACT,
    SEN,
    ELE,
    MIX,
    RAD,
    UFH,
    VAL,
    DHW,
}

impl ZoneRole {
    pub fn slug(&self) -> &'static str {
        match self {
            ZoneRole::ACT => "ACT",
            ZoneRole::SEN => "SEN",
            ZoneRole::ELE => "ELE",
            ZoneRole::MIX => "MIX",
            ZoneRole::RAD => "RAD",
            ZoneRole::UFH => "UFH",
            ZoneRole::VAL => "VAL",
            ZoneRole::DHW => "DHW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_resolves_known_type_bytes() {
        assert_eq!(DevType::forward("01"), Some(DevType::CTL));
        assert_eq!(DevType::forward("18"), Some(DevType::HGI));
        assert_eq!(DevType::forward("99"), None);
    }

    #[test]
    fn reverse_round_trips_forward() {
        for tt in ["00", "01", "02", "03", "04", "07", "13", "18", "22", "34"] {
            let slug = DevType::forward(tt).unwrap();
            assert_eq!(slug.reverse(), Some(tt));
        }
    }

    #[test]
    fn aka_aliases_resolve_to_canonical() {
        assert_eq!(DevType::TR0.canonical(), DevType::TRV);
        assert_eq!(DevType::DT2.canonical(), DevType::DTS);
        assert_eq!(DevType::CTL.canonical(), DevType::CTL);
    }

    #[test]
    fn promotable_slugs_are_dev_hea_hvc_only() {
        assert!(DevType::DEV.is_promotable());
        assert!(DevType::HEA.is_promotable());
        assert!(DevType::HVC.is_promotable());
        assert!(!DevType::CTL.is_promotable());
    }
}
