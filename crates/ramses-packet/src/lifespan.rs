//! Per-code message TTL ("lifespan") policy.
//!
//! Most codes carry a fixed default lifetime; `1F09` is unusual in that the
//! payload itself carries the remaining seconds until the next sync, and a
//! handful of codes (schedule/device metadata, the bind handshake) never
//! expire on their own.

use crate::code::Code;
use chrono::Duration;

/// How long a [`crate::Packet`]/Message built from it stays "current".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifespan {
    /// Never expires; only removed by explicit invalidation.
    Never,
    Duration(Duration),
}

/// Resolve the lifespan for `code`, consulting `payload_hex` for the codes
/// (currently only `1F09`) whose remaining lifetime is carried on the wire
/// rather than fixed by a table.
pub fn lifespan_for(code: Code, payload_hex: &str) -> Lifespan {
    match code {
        Code::_1F09 => sync_remaining(payload_hex),
        Code::_313F | Code::_10E0 | Code::_1FC9 | Code::_0005 | Code::_000C | Code::_0004 => {
            Lifespan::Never
        }
        Code::_30C9 | Code::_000A | Code::_12B0 | Code::_2309 | Code::_2349 | Code::_2E04 => {
            Lifespan::Duration(Duration::minutes(15))
        }
        Code::_3EF0 | Code::_3EF1 | Code::_3150 | Code::_0008 | Code::_0009 => {
            Lifespan::Duration(Duration::minutes(6))
        }
        Code::_31D9 | Code::_31DA => Lifespan::Duration(Duration::minutes(3)),
        Code::_1260 | Code::_1F41 | Code::_10A0 | Code::_2249 | Code::_22C9 => {
            Lifespan::Duration(Duration::hours(1))
        }
        Code::_0418 | Code::_7FFF | Code::_0404 | Code::_0006 | Code::_0001 | Code::_0002 => {
            Lifespan::Duration(Duration::hours(1))
        }
        Code::_0016 | Code::_3220 | Code::_3B00 | Code::_2389 | Code::_2D49 | Code::Unknown(_) => {
            Lifespan::Duration(Duration::hours(1))
        }
    }
}

/// `1F09`'s payload is `<idx:2><remaining_seconds:4>` as hex; fall back to a
/// conservative five-minute default if the payload is short or malformed
/// (e.g. the packet failed grammar validation but lifespan is still asked
/// for).
fn sync_remaining(payload_hex: &str) -> Lifespan {
    if payload_hex.len() >= 6 {
        if let Ok(secs) = u16::from_str_radix(&payload_hex[2..6], 16) {
            return Lifespan::Duration(Duration::seconds(i64::from(secs)));
        }
    }
    Lifespan::Duration(Duration::minutes(5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immortal_codes_never_expire() {
        assert_eq!(lifespan_for(Code::_1FC9, ""), Lifespan::Never);
        assert_eq!(lifespan_for(Code::_10E0, "00"), Lifespan::Never);
    }

    #[test]
    fn sync_code_reads_remaining_seconds_from_payload() {
        // idx=00, remaining = 0x012C = 300s
        assert_eq!(
            lifespan_for(Code::_1F09, "00012C"),
            Lifespan::Duration(Duration::seconds(300))
        );
    }

    #[test]
    fn sync_code_falls_back_on_short_payload() {
        assert_eq!(
            lifespan_for(Code::_1F09, "00"),
            Lifespan::Duration(Duration::minutes(5))
        );
    }

    #[test]
    fn ordinary_code_uses_table_default() {
        assert_eq!(
            lifespan_for(Code::_30C9, "001234"),
            Lifespan::Duration(Duration::minutes(15))
        );
    }
}
