use crate::dev_type::DevType;
use std::fmt;
use std::str::FromStr;

/// The sentinel meaning "no address": `--:------`.
pub const NULL_ADDR_ID: &str = "--:------";

/// The sentinel meaning "broadcast/unset destination": `63:262142`.
pub const BROADCAST_ADDR_ID: &str = "63:262142";

const NULL_TYPE: u8 = 0xFF;

/// A parsed, validated RAMSES-II device address of the form `TT:NNNNNN`.
///
/// `TT` is a two-digit decimal device-type byte (`00..=63`), `NNNNNN` a
/// six-digit decimal device identifier. The sentinel `--:------` ("no
/// address") is represented internally with a reserved type marker; callers
/// should use [`Address::is_null`] rather than comparing fields directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    type_id: u8,
    number: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address: '{0}'")]
    InvalidAddr(String),
    #[error("unknown device type byte '{0}' in strict mode")]
    UnknownType(String),
}

impl Address {
    /// The sentinel "no address" value.
    pub const NULL: Address = Address {
        type_id: NULL_TYPE,
        number: 0,
    };

    /// The sentinel broadcast/unset-destination value, `63:262142`.
    pub const BROADCAST: Address = Address {
        type_id: 63,
        number: 262_142,
    };

    /// Parse a `TT:NNNNNN` address string (or the `--:------` sentinel).
    ///
    /// `strict` rejects type bytes that don't map to a known device family
    /// under [`DevType::forward`] (other than the promotable/HVAC classes,
    /// which are resolved by eavesdropping rather than type byte and so are
    /// always accepted).
    pub fn parse(s: &str, strict: bool) -> Result<Address, AddressError> {
        if s == NULL_ADDR_ID {
            return Ok(Address::NULL);
        }
        if s.len() != 9 || s.as_bytes()[2] != b':' {
            return Err(AddressError::InvalidAddr(s.to_owned()));
        }
        let (tt, rest) = s.split_at(2);
        let nnnnnn = &rest[1..];
        if tt.len() != 2 || nnnnnn.len() != 6 {
            return Err(AddressError::InvalidAddr(s.to_owned()));
        }
        if !tt.bytes().all(|b| b.is_ascii_digit()) || !nnnnnn.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidAddr(s.to_owned()));
        }
        let type_id: u8 = tt.parse().map_err(|_| AddressError::InvalidAddr(s.to_owned()))?;
        if type_id > 63 {
            return Err(AddressError::InvalidAddr(s.to_owned()));
        }
        let number: u32 = nnnnnn
            .parse()
            .map_err(|_| AddressError::InvalidAddr(s.to_owned()))?;

        if strict && type_id != 63 {
            match DevType::forward(tt) {
                Some(_) => {}
                None => return Err(AddressError::UnknownType(tt.to_owned())),
            }
        }

        Ok(Address { type_id, number })
    }

    /// True iff this is the `--:------` sentinel.
    pub fn is_null(&self) -> bool {
        self.type_id == NULL_TYPE
    }

    /// True iff this is the `63:262142` broadcast/unset-destination sentinel.
    pub fn is_broadcast(&self) -> bool {
        *self == Address::BROADCAST
    }

    /// True iff this address is an HGI (type byte `18`).
    pub fn is_hgi(&self) -> bool {
        !self.is_null() && self.type_id == 18
    }

    /// The two-digit decimal type byte, or `None` for the null sentinel.
    pub fn type_byte(&self) -> Option<&'static str> {
        if self.is_null() {
            return None;
        }
        // Leak-free: format once via a static lookup table of "00".."63".
        Some(TYPE_BYTES[self.type_id as usize])
    }

    /// Resolve the device-class slug for this address's type byte. Returns
    /// `None` for the null sentinel or an address whose type byte has no
    /// known mapping (i.e. requires eavesdropping to classify).
    pub fn device_type(&self) -> Option<DevType> {
        self.type_byte().and_then(DevType::forward)
    }
}

static TYPE_BYTES: [&str; 64] = [
    "00", "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "15",
    "16", "17", "18", "19", "20", "21", "22", "23", "24", "25", "26", "27", "28", "29", "30", "31",
    "32", "33", "34", "35", "36", "37", "38", "39", "40", "41", "42", "43", "44", "45", "46", "47",
    "48", "49", "50", "51", "52", "53", "54", "55", "56", "57", "58", "59", "60", "61", "62", "63",
];

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str(NULL_ADDR_ID)
        } else {
            write!(f, "{:02}:{:06}", self.type_id, self.number)
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s, false)
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s, false).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_address() {
        let a = Address::parse("01:145038", false).unwrap();
        assert_eq!(a.to_string(), "01:145038");
        assert_eq!(a.type_byte(), Some("01"));
    }

    #[test]
    fn parses_null_sentinel() {
        let a = Address::parse(NULL_ADDR_ID, false).unwrap();
        assert!(a.is_null());
        assert_eq!(a.to_string(), NULL_ADDR_ID);
        assert_eq!(a.type_byte(), None);
    }

    #[test]
    fn parses_broadcast_sentinel() {
        let a = Address::parse(BROADCAST_ADDR_ID, false).unwrap();
        assert!(a.is_broadcast());
        assert!(!a.is_null());
    }

    #[test]
    fn rejects_malformed_address() {
        assert!(Address::parse("1:145038", false).is_err());
        assert!(Address::parse("01-145038", false).is_err());
        assert!(Address::parse("01:14503", false).is_err());
        assert!(Address::parse("AB:145038", false).is_err());
        assert!(Address::parse("64:145038", false).is_err());
    }

    #[test]
    fn strict_mode_rejects_unknown_type_byte() {
        assert!(Address::parse("99", false).is_err()); // too short regardless
        // "62" has no entry in DevType::forward and isn't 63 (broadcast)
        assert!(Address::parse("62:000001", true).is_err());
        assert!(Address::parse("62:000001", false).is_ok());
    }

    #[test]
    fn is_hgi_detects_type_18_only() {
        assert!(Address::parse("18:013393", false).unwrap().is_hgi());
        assert!(!Address::parse("01:145038", false).unwrap().is_hgi());
        assert!(!Address::NULL.is_hgi());
    }

    #[test]
    fn device_type_resolves_known_families() {
        let ctl = Address::parse("01:145038", false).unwrap();
        assert_eq!(ctl.device_type(), Some(DevType::CTL));
        let hgi = Address::parse("18:013393", false).unwrap();
        assert_eq!(hgi.device_type(), Some(DevType::HGI));
    }

    #[test]
    fn ordering_is_derived_and_total() {
        let a = Address::parse("01:000001", false).unwrap();
        let b = Address::parse("01:000002", false).unwrap();
        assert!(a < b);
    }
}
