//! Step (3) of [`crate::Message::build`]: turn a grammar-validated hex
//! payload into a structured value.
//!
//! A handful of codes get a dedicated parser below; everything else falls
//! back to [`generic`], which exposes the raw hex under `_value` rather
//! than refusing to build a `Message` at all. This mirrors the framework's
//! job (plugging parsers in) without pretending to cover all ~150 RAMSES
//! codes.

use crate::error::MessageError;
use crate::hex;
use ramses_packet::{Code, Verb};
use serde_json::{Map, Value};

/// A parsed payload: either one record, or (for codes whose payload
/// repeats a fixed-size element, e.g. `000A`) a list of records.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Map(Map<String, Value>),
    List(Vec<Map<String, Value>>),
}

/// Parsers may signal "this payload is structurally fine but I don't know
/// how to interpret it" (coerced from the source's bare `NotImplementedError`)
/// or a hard contradiction (coerced from `AssertionError`). Both become
/// [`MessageError::PayloadParseFailed`] at the call site.
type ParseResult = Result<Map<String, Value>, String>;

pub fn parse(code: Code, verb: Verb, payload_hex: &str, has_array: bool) -> Result<PayloadValue, MessageError> {
    if has_array {
        return parse_array(code, payload_hex).map(PayloadValue::List);
    }
    let map = match code {
        Code::_000A => parse_000a_single(payload_hex),
        Code::_30C9 => parse_temperature(payload_hex, "temperature"),
        Code::_2309 => parse_temperature(payload_hex, "setpoint"),
        Code::_2349 => parse_2349(payload_hex),
        Code::_12B0 => parse_12b0(payload_hex),
        Code::_1260 => parse_temperature(payload_hex, "temperature"),
        Code::_1F09 => parse_1f09(payload_hex, verb),
        Code::_1FC9 => parse_1fc9_single(payload_hex),
        Code::_0404 => parse_0404(verb, payload_hex),
        Code::_0006 => parse_0006(verb, payload_hex),
        Code::_3EF0 => parse_3ef0(payload_hex),
        Code::_2E04 => parse_2e04(payload_hex),
        _ => Ok(generic(payload_hex)),
    }
    .map_err(|reason| MessageError::PayloadParseFailed { code, reason })?;
    Ok(PayloadValue::Map(map))
}

fn parse_array(code: Code, payload_hex: &str) -> Result<Vec<Map<String, Value>>, MessageError> {
    let size = ramses_packet::grammar::array_element_size(code).ok_or_else(|| {
        MessageError::PayloadParseFailed {
            code,
            reason: "code has no known array element size".to_owned(),
        }
    })?;
    let bytes = payload_hex.len() / 2;
    let count = bytes / size;
    (0..count)
        .map(|i| {
            let start = i * size * 2;
            let elem = &payload_hex[start..start + size * 2];
            match code {
                Code::_000A => parse_000a_single(elem),
                Code::_30C9 => parse_temperature(elem, "temperature"),
                Code::_2309 => parse_temperature(elem, "setpoint"),
                Code::_1FC9 => parse_1fc9_single(elem),
                _ => Ok(generic(elem)),
            }
            .map_err(|reason| MessageError::PayloadParseFailed { code, reason })
        })
        .collect()
}

/// `000A`: `<zone_idx><flags><min_temp><max_temp>`.
fn parse_000a_single(p: &str) -> ParseResult {
    let zone_idx = hex::byte(p, 0).ok_or("000A: missing zone_idx")?;
    let mut map = Map::new();
    map.insert("zone_idx".into(), Value::from(zone_idx));
    if let Some(min) = hex::temperature(p, 2) {
        map.insert("min_temp".into(), Value::from(min));
    }
    if let Some(max) = hex::temperature(p, 4) {
        map.insert("max_temp".into(), Value::from(max));
    }
    Ok(map)
}

/// `30C9`/`2309`/`1260`-shaped: `<zone_idx><temperature>`.
fn parse_temperature(p: &str, field: &str) -> ParseResult {
    let zone_idx = hex::byte(p, 0).ok_or("missing zone_idx")?;
    let mut map = Map::new();
    map.insert("zone_idx".into(), Value::from(zone_idx));
    match hex::temperature(p, 1) {
        Some(t) => map.insert(field.into(), Value::from(t)),
        None => map.insert(field.into(), Value::Null),
    };
    Ok(map)
}

fn parse_2349(p: &str) -> ParseResult {
    let mut map = parse_temperature(p, "setpoint")?;
    if let Some(mode) = hex::byte(p, 3) {
        map.insert("mode".into(), Value::from(mode));
    }
    Ok(map)
}

fn parse_12b0(p: &str) -> ParseResult {
    let zone_idx = hex::byte(p, 0).ok_or("12B0: missing zone_idx")?;
    let mut map = Map::new();
    map.insert("zone_idx".into(), Value::from(zone_idx));
    let state = match hex::u16be(p, 1) {
        Some(0xC800) => Value::from(true),
        Some(0x0000) => Value::from(false),
        _ => Value::Null,
    };
    map.insert("window_open".into(), state);
    Ok(map)
}

fn parse_1f09(p: &str, verb: Verb) -> ParseResult {
    let idx = hex::byte(p, 0).ok_or("1F09: missing idx")?;
    let mut map = Map::new();
    map.insert("idx".into(), Value::from(idx));
    map.insert("verb".into(), Value::from(verb.to_string()));
    if let Some(secs) = hex::u16be(p, 1) {
        map.insert("remaining_seconds".into(), Value::from(secs));
    }
    Ok(map)
}

fn parse_1fc9_single(p: &str) -> ParseResult {
    if p.len() < 12 {
        return Err("1FC9: payload shorter than one bind tuple".to_owned());
    }
    let domain_id = hex::byte(p, 0).ok_or("1FC9: missing domain_id")?;
    let code = u16::from_str_radix(&p[2..6], 16).map_err(|_| "1FC9: malformed code field")?;
    let addr = ramses_address::Address::parse(&format_dec_addr(&p[6..12])?, false)
        .map_err(|e| format!("1FC9: {e}"))?;
    let mut map = Map::new();
    map.insert("domain_id".into(), Value::from(domain_id));
    map.insert("bound_code".into(), Value::from(format!("{code:04X}")));
    map.insert("device_id".into(), Value::from(addr.to_string()));
    Ok(map)
}

/// `1FC9` device IDs are packed as 3 raw bytes (type byte + 16-bit number)
/// rather than the usual decimal `TT:NNNNNN` text form; reconstruct the
/// text form so the existing [`ramses_address::Address`] parser applies.
fn format_dec_addr(packed_hex: &str) -> Result<String, String> {
    if packed_hex.len() != 6 {
        return Err("1FC9: malformed device id".to_owned());
    }
    let type_id = u8::from_str_radix(&packed_hex[0..2], 16).map_err(|_| "1FC9: bad type byte")?;
    let number = u32::from_str_radix(&packed_hex[2..6], 16).map_err(|_| "1FC9: bad device number")?;
    Ok(format!("{type_id:02}:{number:06}"))
}

fn parse_0404(verb: Verb, p: &str) -> ParseResult {
    let mut map = Map::new();
    map.insert("verb".into(), Value::from(verb.to_string()));
    if p.len() < 10 {
        return Err("0404: payload shorter than header".to_owned());
    }
    let frag_number = hex::byte(p, 3).ok_or("0404: missing frag_number")?;
    let total_frags = hex::byte(p, 4).ok_or("0404: missing total_frags")?;
    map.insert("frag_number".into(), Value::from(frag_number));
    map.insert("total_frags".into(), Value::from(total_frags));
    if p.len() > 10 {
        map.insert("fragment".into(), Value::from(hex::rest(p, 5).to_owned()));
    }
    Ok(map)
}

fn parse_0006(verb: Verb, p: &str) -> ParseResult {
    let mut map = Map::new();
    map.insert("verb".into(), Value::from(verb.to_string()));
    if verb == Verb::RP {
        let change_counter = hex::u16be(p, 2).ok_or("0006: missing change_counter")?;
        map.insert("change_counter".into(), Value::from(change_counter));
    }
    Ok(map)
}

fn parse_3ef0(p: &str) -> ParseResult {
    let mut map = Map::new();
    if let Some(modulation) = hex::byte(p, 1) {
        map.insert("modulation_level".into(), Value::from(f64::from(modulation) / 200.0));
    }
    Ok(map)
}

fn parse_2e04(p: &str) -> ParseResult {
    let mode = hex::byte(p, 0).ok_or("2E04: missing system_mode")?;
    let mut map = Map::new();
    map.insert("system_mode".into(), Value::from(mode));
    Ok(map)
}

/// The fallback for any code without a dedicated parser: the raw hex
/// payload verbatim, plus its byte length.
fn generic(p: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("_value".into(), Value::from(p.to_owned()));
    map.insert("_length".into(), Value::from(p.len() / 2));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_temperature_message() {
        let PayloadValue::Map(map) = parse(Code::_30C9, Verb::I, "0007D0", false).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(map["zone_idx"], Value::from(0));
        assert_eq!(map["temperature"], Value::from(20.0));
    }

    #[test]
    fn parses_array_of_temperatures() {
        let PayloadValue::List(list) = parse(Code::_30C9, Verb::I, "0007D0010834", true).unwrap() else {
            panic!("expected list");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["zone_idx"], Value::from(1));
    }

    #[test]
    fn unknown_code_falls_back_to_generic_value() {
        let PayloadValue::Map(map) = parse(Code::Unknown(0x9999), Verb::I, "DEADBEEF", false).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(map["_value"], Value::from("DEADBEEF"));
        assert_eq!(map["_length"], Value::from(4));
    }

    #[test]
    fn temperature_sentinel_is_null() {
        let PayloadValue::Map(map) = parse(Code::_30C9, Verb::I, "007FFF", false).unwrap() else {
            panic!("expected map");
        };
        assert!(map["temperature"].is_null());
    }

    #[test]
    fn parses_1fc9_bind_tuple() {
        let PayloadValue::Map(map) = parse(Code::_1FC9, Verb::I, "00230904DC3A", false).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(map["bound_code"], Value::from("2309"));
        assert_eq!(map["device_id"], Value::from("04:056378"));
    }
}
