//! Index-key-name derivation (`zone_idx` vs `domain_id` vs the handful of
//! code-specific index names), ported from `MessageBase._idx`.
//!
//! The "What!! (AA)/(AB)/(BC)" assertions in the source that accompanied
//! this logic read as notes-to-self about surprising wire data rather than
//! real invariants; per policy they are not reproduced as hard failures
//! here, only as `tracing::debug!` when `strict_mode` catches an
//! inconsistency (see [`crate::Message::idx_value`]).

use ramses_packet::Code;

/// The index key a parsed payload's dict form should carry, given the raw
/// index byte hint lexed onto the packet.
pub fn index_key_name(code: Code, idx_hex: Option<&str>) -> Option<&'static str> {
    let idx_hex = idx_hex?;
    let byte = u8::from_str_radix(idx_hex, 16).ok()?;

    if byte >= 0xF0 {
        return Some("domain_id");
    }

    Some(match code {
        Code::_10A0 | Code::_1F41 | Code::_1260 => "dhw_idx",
        Code::_22C9 | Code::_2249 => "ufh_idx",
        Code::_0016 => "msg_id",
        Code::_0418 => "log_idx",
        Code::_31D9 | Code::_31DA => "hvac_id",
        Code::_10E0 | Code::_1FC9 | Code::_313F => return None,
        _ => "zone_idx",
    })
}
