//! The generic-HGI-ID substitution rule (spec §8 P7).
//!
//! Outbound commands are usually built with `ADDR0` already set to the
//! gateway's real ID, but the engine also accepts the generic placeholder
//! `18:000730` (the ID every stock HGI80 ships with before individual
//! pairing) and rewrites it to the gateway's actual ID just before the
//! frame hits the wire -- but only on evofw3, which tolerates an
//! arbitrary `ADDR0`. Native HGI80 firmware silently drops any frame whose
//! `ADDR0` isn't its own ID, so there the substitution would be pointless;
//! the caller is expected to already be using the real ID there.

use ramses_address::Address;

/// The generic/unpaired HGI80 placeholder ID.
pub const GENERIC_HGI_ID: &str = "18:000730";

/// Rewrite `frame`'s leading address field from the generic placeholder to
/// `actual_id`, when `is_evofw3` is true and the frame's `ADDR0` is indeed
/// the placeholder. Returns the frame unchanged otherwise.
pub fn substitute_generic_hgi_id(frame: &str, actual_id: Address, is_evofw3: bool) -> String {
    if !is_evofw3 {
        return frame.to_owned();
    }
    match frame.find(GENERIC_HGI_ID) {
        Some(pos) => {
            let mut out = String::with_capacity(frame.len());
            out.push_str(&frame[..pos]);
            out.push_str(&actual_id.to_string());
            out.push_str(&frame[pos + GENERIC_HGI_ID.len()..]);
            out
        }
        None => frame.to_owned(),
    }
}
