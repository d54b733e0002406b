//! The payload grammar table: `(code, verb) -> regex`, plus the handful of
//! code classification sets that drive index derivation and array-fragment
//! detection.
//!
//! Precompiled once behind `LazyLock` rather than populated lazily on first
//! use, per the convention that these tables are build-time constants.

use crate::code::Code;
use crate::error::PacketError;
use crate::verb::Verb;
use regex::Regex;
use std::sync::LazyLock;

fn rules_for(code: Code) -> &'static [(Verb, &'static str)] {
    match code {
        Code::_0001 => &[(Verb::W, "^00FFFF02(00|FF)$"), (Verb::I, "^(FF|00FFFF02(00|FF))$")],
        Code::_0002 => &[(Verb::I, "^[0-9A-Fa-f]{6,}$")],
        Code::_0004 => &[
            (Verb::RQ, "^0[0-9A-Fa-f]00$"),
            (Verb::RP, "^0[0-9A-Fa-f]00([0-9A-Fa-f]{2}){0,20}$"),
            (Verb::I, "^0[0-9A-Fa-f]00([0-9A-Fa-f]{2}){0,20}$"),
        ],
        Code::_0005 => &[
            (Verb::RQ, "^00[0-9A-Fa-f]{2}$"),
            (Verb::RP, "^00[0-9A-Fa-f]{2}([0-9A-Fa-f]{4})+$"),
            (Verb::I, "^00[0-9A-Fa-f]{2}([0-9A-Fa-f]{4})+$"),
        ],
        Code::_0006 => &[(Verb::RQ, "^00$"), (Verb::RP, "^0005[0-9A-Fa-f]{4}$")],
        Code::_0008 => &[(Verb::I, "^(F[9AC]|0[0-9A-Fa-f])[0-9A-Fa-f]{2}$")],
        Code::_0009 => &[(Verb::I, "^([0-9A-Fa-f]{6})+$")],
        Code::_000A => &[
            (Verb::I, "^([0-9A-Fa-f]{12})+$"),
            (Verb::RQ, "^0[0-9A-Fa-f]$"),
            (Verb::RP, "^[0-9A-Fa-f]{12}$"),
        ],
        Code::_000C => &[
            (Verb::RQ, "^00[0-9A-Fa-f]{2}$"),
            (Verb::RP, "^00[0-9A-Fa-f]{2}[0-9A-Fa-f]{2}([0-9A-Fa-f]{16})?$"),
        ],
        Code::_0016 => &[(Verb::RQ, "^[0-9A-Fa-f]{2,4}$"), (Verb::RP, "^[0-9A-Fa-f]{4}$")],
        Code::_0404 => &[
            (Verb::RQ, "^[0-9A-Fa-f]{10}$"),
            (Verb::W, "^[0-9A-Fa-f]{10}([0-9A-Fa-f]{2})+$"),
            (Verb::RP, "^[0-9A-Fa-f]{10}([0-9A-Fa-f]{2})+$"),
        ],
        Code::_0418 => &[(Verb::I, "^00[0-9A-Fa-f]{36,40}$"), (Verb::RQ, "^000000$")],
        Code::_10A0 => &[
            (Verb::RQ, "^00([0-9A-Fa-f]{8})?$"),
            (Verb::RP, "^00[0-9A-Fa-f]{10}$"),
        ],
        Code::_10E0 => &[(Verb::I, "^00[0-9A-Fa-f]{30,}$"), (Verb::RP, "^00[0-9A-Fa-f]{30,}$")],
        Code::_1260 => &[(Verb::RQ, "^00$"), (Verb::I, "^00[0-9A-Fa-f]{4}$")],
        Code::_12B0 => &[(Verb::RQ, "^00$"), (Verb::I, "^0[0-9A-Fa-f][0-9A-Fa-f]{4}$")],
        Code::_1F09 => &[
            (Verb::I, "^00[0-9A-Fa-f]{4}$"),
            (Verb::RQ, "^00$"),
            (Verb::RP, "^00[0-9A-Fa-f]{4}$"),
            (Verb::W, "^00[0-9A-Fa-f]{4}$"),
        ],
        Code::_1F41 => &[(Verb::RQ, "^00$"), (Verb::I, "^0[0-9A-Fa-f][0-9A-Fa-f]{2,18}$")],
        Code::_1FC9 => &[
            (Verb::I, "^([0-9A-Fa-f]{12})+$"),
            (Verb::W, "^([0-9A-Fa-f]{12})+$"),
            (Verb::RP, "^([0-9A-Fa-f]{12})+$"),
        ],
        Code::_2249 => &[(Verb::I, "^([0-9A-Fa-f]{14})+$")],
        Code::_22C9 => &[(Verb::I, "^([0-9A-Fa-f]{12})+$")],
        Code::_2309 => &[(Verb::I, "^([0-9A-Fa-f]{6})+$"), (Verb::RQ, "^0[0-9A-Fa-f]$")],
        Code::_2349 => &[
            (Verb::I, "^0[0-9A-Fa-f][0-9A-Fa-f]{2}[0-9A-Fa-f]{2}([0-9A-Fa-f]{12})?$"),
            (Verb::RQ, "^0[0-9A-Fa-f]$"),
        ],
        Code::_2389 => &[(Verb::I, "^[0-9A-Fa-f]{6,}$")],
        Code::_2D49 => &[(Verb::I, "^[0-9A-Fa-f]{8}$")],
        Code::_2E04 => &[(Verb::I, "^[0-9A-Fa-f]{16}$"), (Verb::RQ, "^FF$")],
        Code::_30C9 => &[(Verb::I, "^([0-9A-Fa-f]{6})+$"), (Verb::RQ, "^00$")],
        Code::_313F => &[(Verb::RQ, "^00$"), (Verb::I, "^00[0-9A-Fa-f]{16}$"), (Verb::W, "^00[0-9A-Fa-f]{16}$")],
        Code::_3150 => &[(Verb::I, "^([0-9A-Fa-f]{4})+$")],
        Code::_31D9 => &[(Verb::I, "^0[0-9A-Fa-f][0-9A-Fa-f]{2,}$")],
        Code::_31DA => &[(Verb::I, "^[0-9A-Fa-f]{58,}$"), (Verb::RQ, "^[0-9A-Fa-f]{2,4}$")],
        Code::_3220 => &[(Verb::RQ, "^00[0-9A-Fa-f]{10}$"), (Verb::RP, "^00[0-9A-Fa-f]{10}$")],
        Code::_3B00 => &[(Verb::I, "^00(C3|FC)$")],
        Code::_3EF0 => &[(Verb::I, "^00[0-9A-Fa-f]{2,}$"), (Verb::RQ, "^00$")],
        Code::_3EF1 => &[(Verb::RQ, "^00$"), (Verb::RP, "^00[0-9A-Fa-f]{10,}$")],
        Code::_7FFF => &[(Verb::I, "^[0-9A-Fa-f]{4,}$")],
        Code::Unknown(_) => &[],
    }
}

static COMPILED: LazyLock<Vec<(Code, Verb, Regex)>> = LazyLock::new(|| {
    ALL_KNOWN_CODES
        .iter()
        .flat_map(|&code| {
            rules_for(code)
                .iter()
                .map(move |&(verb, pattern)| (code, verb, Regex::new(pattern).expect("static grammar pattern is valid")))
        })
        .collect()
});

/// Every code this table has grammar rules for, in deterministic
/// (declaration) order -- HGI-adjacent bind/discovery codes first, bulk
/// telemetry codes last.
pub static ALL_KNOWN_CODES: &[Code] = &[
    Code::_1FC9,
    Code::_10E0,
    Code::_0016,
    Code::_1F09,
    Code::_313F,
    Code::_0001,
    Code::_0002,
    Code::_0004,
    Code::_0005,
    Code::_0006,
    Code::_0008,
    Code::_0009,
    Code::_000A,
    Code::_000C,
    Code::_0404,
    Code::_0418,
    Code::_10A0,
    Code::_1260,
    Code::_12B0,
    Code::_1F41,
    Code::_2249,
    Code::_22C9,
    Code::_2309,
    Code::_2349,
    Code::_2389,
    Code::_2D49,
    Code::_2E04,
    Code::_30C9,
    Code::_3150,
    Code::_31D9,
    Code::_31DA,
    Code::_3220,
    Code::_3B00,
    Code::_3EF0,
    Code::_3EF1,
    Code::_7FFF,
];

/// Validate `payload_hex` against the grammar rule for `(code, verb)`.
///
/// Errors distinguish "we've never heard of this code" from "we know this
/// code but not this verb for it", matching the two `PacketInvalid` messages
/// the table lookup is specified to produce.
pub fn validate_payload(code: Code, verb: Verb, payload_hex: &str) -> Result<(), PacketError> {
    if matches!(code, Code::Unknown(_)) {
        return Err(PacketError::invalid(format!("Unknown code: {code}")));
    }
    let rules = rules_for(code);
    if rules.is_empty() {
        return Err(PacketError::invalid(format!("Unknown code: {code}")));
    }
    let Some((_, pattern)) = rules.iter().find(|&&(v, _)| v == verb) else {
        return Err(PacketError::invalid(format!(
            "Unknown verb/code pair: {verb}/{code}"
        )));
    };
    let compiled = COMPILED
        .iter()
        .find(|(c, v, _)| *c == code && *v == verb)
        .map(|(_, _, re)| re)
        .expect("rules_for and COMPILED are built from the same table");
    if compiled.is_match(payload_hex) {
        Ok(())
    } else {
        Err(PacketError::payload_invalid(format!(
            "payload '{payload_hex}' does not match grammar for {verb}/{code} ({pattern})"
        )))
    }
}

/// Codes whose index byte is not simply "the first payload byte" and
/// requires code-specific derivation (ported from `ramses_tx.const
/// .CODE_IDX_COMPLEX`).
pub static CODE_IDX_COMPLEX: &[Code] = &[Code::_0005, Code::_000C, Code::_0009, Code::_3220];

/// As [`CODE_IDX_COMPLEX`], but only for `RQ` packets (an `RQ/0404` carries
/// `frag_number/total_frags` rather than a zone index, for instance).
pub static RQ_IDX_COMPLEX: &[Code] = &[Code::_0404, Code::_0005, Code::_000C];

/// Codes meaningful only to the heat (CH/DHW) family of devices.
pub static CODES_OF_HEAT_DOMAIN_ONLY: &[Code] = &[
    Code::_0001,
    Code::_10A0,
    Code::_1F41,
    Code::_1260,
    Code::_12B0,
    Code::_2309,
    Code::_2349,
    Code::_2E04,
    Code::_3150,
    Code::_3B00,
    Code::_3EF0,
    Code::_3EF1,
    Code::_3220,
];

/// Codes meaningful only to the HVAC family of devices.
pub static CODES_OF_HVAC_DOMAIN_ONLY: &[Code] =
    &[Code::_2249, Code::_22C9, Code::_2389, Code::_2D49, Code::_31D9, Code::_31DA];

/// Codes whose payload is a repeated-element array when long enough, along
/// with the byte width of one element -- used by `detect_array_fragment`
/// and by [`crate::Packet::has_array`].
pub fn array_element_size(code: Code) -> Option<usize> {
    match code {
        Code::_000A => Some(6),
        Code::_22C9 => Some(6),
        Code::_2309 | Code::_30C9 => Some(3),
        Code::_0009 => Some(3),
        Code::_1FC9 => Some(6),
        Code::_2249 => Some(7),
        _ => None,
    }
}

/// True iff a payload of `len_bytes` for `code` consists of more than one
/// repeated element.
pub fn has_array(code: Code, len_bytes: usize) -> bool {
    match array_element_size(code) {
        Some(size) if size > 0 => len_bytes > size && len_bytes % size == 0,
        _ => false,
    }
}

/// Per-device-slug routing table: which `(code, verbs)` a given class of
/// device is expected to originate or answer. Used by role validation
/// (dispatcher component) rather than by grammar validation itself.
pub fn codes_by_dev_slug(slug: &str) -> &'static [(Code, &'static [Verb])] {
    match slug {
        "CTL" => &[
            (Code::_000A, &[Verb::I, Verb::RP]),
            (Code::_2309, &[Verb::I]),
            (Code::_30C9, &[Verb::I]),
            (Code::_1F09, &[Verb::I]),
            (Code::_3EF1, &[Verb::RQ]), // hard-coded exception: CTL/RQ/3EF1
        ],
        "TRV" => &[(Code::_2309, &[Verb::I]), (Code::_12B0, &[Verb::I])],
        "BDR" => &[(Code::_3EF0, &[Verb::I]), (Code::_3EF0, &[Verb::RQ])], // hard-coded exception: BDR/RQ/3EF0
        "OTB" => &[(Code::_3220, &[Verb::RP]), (Code::_3EF0, &[Verb::I])],
        "DHW" => &[(Code::_1260, &[Verb::I])],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_unknown_verb_is_rejected() {
        let err = validate_payload(Code::_1FC9, Verb::RQ, "000000").unwrap_err();
        assert!(matches!(err, PacketError::PacketInvalid { .. }));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = validate_payload(Code::Unknown(0xABCD), Verb::I, "00").unwrap_err();
        assert!(matches!(err, PacketError::PacketInvalid { .. }));
    }

    #[test]
    fn valid_payload_matches_grammar() {
        assert!(validate_payload(Code::_30C9, Verb::I, "0007D0").is_ok());
    }

    #[test]
    fn malformed_payload_for_known_pair_is_rejected() {
        let err = validate_payload(Code::_30C9, Verb::I, "XYZ").unwrap_err();
        assert!(matches!(err, PacketError::PacketPayloadInvalid { .. }));
    }

    #[test]
    fn array_detection_flags_multi_element_payload() {
        assert!(has_array(Code::_000A, 12));
        assert!(!has_array(Code::_000A, 6));
        assert!(!has_array(Code::_313F, 18));
    }

    #[test]
    fn ctl_role_table_carries_the_hard_coded_3ef1_exception() {
        let rules = codes_by_dev_slug("CTL");
        assert!(rules
            .iter()
            .any(|&(code, verbs)| code == Code::_3EF1 && verbs.contains(&Verb::RQ)));
    }
}
