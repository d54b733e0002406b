use std::fmt;

/// A RAMSES-II 4-hex-digit opcode.
///
/// Reimplemented as a closed enum over the representative subset of codes
/// this engine understands the grammar/shape of, with `Unknown` acting as
/// the side-table the design note calls for: any code this engine hasn't
/// been taught still round-trips through the wire format, it just can't be
/// matched against a known grammar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum Code {
    _0001,
    _0002,
    _0004,
    _0005,
    _0006,
    _0008,
    _0009,
    _000A,
    _000C,
    _0016,
    _0404,
    _0418,
    _10A0,
    _10E0,
    _1260,
    _12B0,
    _1F09,
    _1F41,
    _1FC9,
    _2249,
    _22C9,
    _2309,
    _2349,
    _2389,
    _2D49,
    _2E04,
    _30C9,
    _313F,
    _3150,
    _31D9,
    _31DA,
    _3220,
    _3B00,
    _3EF0,
    _3EF1,
    _7FFF,
    Unknown(u16),
}

impl Code {
    /// Parse a 4-hex-digit code string (e.g. `"1FC9"`).
    pub fn parse(s: &str) -> Option<Code> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u16::from_str_radix(s, 16).ok()?;
        Some(Code::from_u16(value))
    }

    fn from_u16(value: u16) -> Code {
        match value {
            0x0001 => Code::_0001,
            0x0002 => Code::_0002,
            0x0004 => Code::_0004,
            0x0005 => Code::_0005,
            0x0006 => Code::_0006,
            0x0008 => Code::_0008,
            0x0009 => Code::_0009,
            0x000A => Code::_000A,
            0x000C => Code::_000C,
            0x0016 => Code::_0016,
            0x0404 => Code::_0404,
            0x0418 => Code::_0418,
            0x10A0 => Code::_10A0,
            0x10E0 => Code::_10E0,
            0x1260 => Code::_1260,
            0x12B0 => Code::_12B0,
            0x1F09 => Code::_1F09,
            0x1F41 => Code::_1F41,
            0x1FC9 => Code::_1FC9,
            0x2249 => Code::_2249,
            0x22C9 => Code::_22C9,
            0x2309 => Code::_2309,
            0x2349 => Code::_2349,
            0x2389 => Code::_2389,
            0x2D49 => Code::_2D49,
            0x2E04 => Code::_2E04,
            0x30C9 => Code::_30C9,
            0x313F => Code::_313F,
            0x3150 => Code::_3150,
            0x31D9 => Code::_31D9,
            0x31DA => Code::_31DA,
            0x3220 => Code::_3220,
            0x3B00 => Code::_3B00,
            0x3EF0 => Code::_3EF0,
            0x3EF1 => Code::_3EF1,
            0x7FFF => Code::_7FFF,
            other => Code::Unknown(other),
        }
    }

    fn as_u16(self) -> u16 {
        match self {
            Code::_0001 => 0x0001,
            Code::_0002 => 0x0002,
            Code::_0004 => 0x0004,
            Code::_0005 => 0x0005,
            Code::_0006 => 0x0006,
            Code::_0008 => 0x0008,
            Code::_0009 => 0x0009,
            Code::_000A => 0x000A,
            Code::_000C => 0x000C,
            Code::_0016 => 0x0016,
            Code::_0404 => 0x0404,
            Code::_0418 => 0x0418,
            Code::_10A0 => 0x10A0,
            Code::_10E0 => 0x10E0,
            Code::_1260 => 0x1260,
            Code::_12B0 => 0x12B0,
            Code::_1F09 => 0x1F09,
            Code::_1F41 => 0x1F41,
            Code::_1FC9 => 0x1FC9,
            Code::_2249 => 0x2249,
            Code::_22C9 => 0x22C9,
            Code::_2309 => 0x2309,
            Code::_2349 => 0x2349,
            Code::_2389 => 0x2389,
            Code::_2D49 => 0x2D49,
            Code::_2E04 => 0x2E04,
            Code::_30C9 => 0x30C9,
            Code::_313F => 0x313F,
            Code::_3150 => 0x3150,
            Code::_31D9 => 0x31D9,
            Code::_31DA => 0x31DA,
            Code::_3220 => 0x3220,
            Code::_3B00 => 0x3B00,
            Code::_3EF0 => 0x3EF0,
            Code::_3EF1 => 0x3EF1,
            Code::_7FFF => 0x7FFF,
            Code::Unknown(v) => v,
        }
    }

    /// A friendly name, or `"unknown_XXXX"` for codes outside the known set.
    pub fn friendly_name(&self) -> String {
        match self {
            Code::_0001 => "unknown_command".to_owned(),
            Code::_0002 => "sensor_weather".to_owned(),
            Code::_0004 => "zone_name".to_owned(),
            Code::_0005 => "system_zones".to_owned(),
            Code::_0006 => "schedule_sync".to_owned(),
            Code::_0008 => "relay_demand".to_owned(),
            Code::_0009 => "relay_failsafe".to_owned(),
            Code::_000A => "zone_params".to_owned(),
            Code::_000C => "zone_devices".to_owned(),
            Code::_0016 => "rf_check".to_owned(),
            Code::_0404 => "schedule_fragment".to_owned(),
            Code::_0418 => "system_fault".to_owned(),
            Code::_10A0 => "dhw_params".to_owned(),
            Code::_10E0 => "device_info".to_owned(),
            Code::_1260 => "dhw_temp".to_owned(),
            Code::_12B0 => "window_state".to_owned(),
            Code::_1F09 => "system_sync".to_owned(),
            Code::_1F41 => "dhw_mode".to_owned(),
            Code::_1FC9 => "rf_bind".to_owned(),
            Code::_2249 => "setpoint_now_next".to_owned(),
            Code::_22C9 => "ufh_setpoint".to_owned(),
            Code::_2309 => "setpoint".to_owned(),
            Code::_2349 => "zone_mode".to_owned(),
            Code::_2389 => "unknown_2389".to_owned(),
            Code::_2D49 => "unknown_2d49".to_owned(),
            Code::_2E04 => "system_mode".to_owned(),
            Code::_30C9 => "temperature".to_owned(),
            Code::_313F => "datetime".to_owned(),
            Code::_3150 => "heat_demand".to_owned(),
            Code::_31D9 => "fan_state".to_owned(),
            Code::_31DA => "fan_extended_state".to_owned(),
            Code::_3220 => "opentherm_msg".to_owned(),
            Code::_3B00 => "actuator_sync".to_owned(),
            Code::_3EF0 => "actuator_state".to_owned(),
            Code::_3EF1 => "actuator_cycle".to_owned(),
            Code::_7FFF => "puzzle_packet".to_owned(),
            Code::Unknown(v) => format!("unknown_{v:04X}"),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_code() {
        assert_eq!(Code::parse("1FC9"), Some(Code::_1FC9));
        assert_eq!(Code::parse("1fc9"), Some(Code::_1FC9)); // hex is case-insensitive
    }

    #[test]
    fn unknown_code_round_trips_its_value() {
        let c = Code::parse("ABCD").unwrap();
        assert_eq!(c, Code::Unknown(0xABCD));
        assert_eq!(c.to_string(), "ABCD");
    }

    #[test]
    fn rejects_malformed_code() {
        assert_eq!(Code::parse("1FC"), None);
        assert_eq!(Code::parse("1FC9A"), None);
        assert_eq!(Code::parse("1FGZ"), None);
    }

    #[test]
    fn display_round_trips_known_code() {
        assert_eq!(Code::_0404.to_string(), "0404");
    }
}
