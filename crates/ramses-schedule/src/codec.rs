//! Schedule (de)compression and fragmenting.
//!
//! The wire carries a zlib-compressed, hex-encoded JSON serialisation of
//! the [`crate::Schedule`] DOM, split into fixed-size fragments that ride
//! inside `0404` payloads -- vendor-specific in the exact byte stream, but
//! the framework (compress-then-chunk, one hex field per fragment) is
//! fixed by spec §4.J.

use crate::dom::Schedule;
use crate::error::ScheduleError;
use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

/// Maximum number of raw (pre-hex) bytes carried by one `0404` fragment.
/// Chosen to keep a fragment's hex payload comfortably inside the 48-byte
/// `len` ceiling most RAMSES frames observe.
pub const FRAGMENT_SIZE: usize = 48;

/// Serialise and zlib-compress `schedule` into one contiguous byte buffer,
/// ready to be split by [`fragment`].
pub fn compress(schedule: &Schedule) -> Result<Vec<u8>, ScheduleError> {
    let json = serde_json::to_vec(schedule).map_err(|e| ScheduleError::CodecFailed { reason: e.to_string() })?;
    let mut encoder = ZlibEncoder::new(&json[..], Compression::default());
    let mut out = Vec::new();
    encoder
        .read_to_end(&mut out)
        .map_err(|e| ScheduleError::CodecFailed { reason: e.to_string() })?;
    Ok(out)
}

/// Inverse of [`compress`]: reassemble and decompress a full byte buffer
/// (already concatenated in fragment order) back into a [`Schedule`].
pub fn decompress(bytes: &[u8]) -> Result<Schedule, ScheduleError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| ScheduleError::CodecFailed { reason: e.to_string() })?;
    serde_json::from_slice(&json).map_err(|e| ScheduleError::CodecFailed { reason: e.to_string() })
}

/// Split `bytes` into `FRAGMENT_SIZE`-byte chunks, hex-encoding each. The
/// number of chunks is the `total_frags` a `set_schedule` write reports.
pub fn fragment(bytes: &[u8]) -> Vec<String> {
    if bytes.is_empty() {
        return vec![String::new()];
    }
    bytes
        .chunks(FRAGMENT_SIZE)
        .map(|chunk| chunk.iter().map(|b| format!("{b:02X}")).collect())
        .collect()
}

/// Decode one fragment's hex payload back to raw bytes.
pub fn decode_fragment_hex(hex: &str) -> Result<Vec<u8>, ScheduleError> {
    if hex.len() % 2 != 0 {
        return Err(ScheduleError::CodecFailed {
            reason: "odd-length fragment hex".to_owned(),
        });
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ScheduleError::CodecFailed {
            reason: format!("malformed fragment hex byte at offset {i}"),
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DayOfWeek, SwitchPoint, ZoneRef};

    fn sample_schedule() -> Schedule {
        let days = std::array::from_fn(|i| DayOfWeek {
            day_of_week: i as u8,
            switchpoints: vec![SwitchPoint::Heat {
                time_of_day: "06:30".to_owned(),
                heat_setpoint: 18.5,
            }],
        });
        Schedule::new(ZoneRef::Zone(0), days)
    }

    #[test]
    fn compress_decompress_round_trips() {
        let sch = sample_schedule();
        let compressed = compress(&sch).unwrap();
        let decoded = decompress(&compressed).unwrap();
        assert_eq!(decoded, sch);
    }

    #[test]
    fn fragment_then_reassemble_round_trips() {
        let sch = sample_schedule();
        let compressed = compress(&sch).unwrap();
        let frags = fragment(&compressed);
        assert!(frags.len() >= 1);

        let mut reassembled = Vec::new();
        for f in &frags {
            reassembled.extend(decode_fragment_hex(f).unwrap());
        }
        assert_eq!(reassembled, compressed);
        assert_eq!(decompress(&reassembled).unwrap(), sch);
    }

    #[test]
    fn fragment_respects_max_fragment_size() {
        let big = vec![0xAB; FRAGMENT_SIZE * 3 + 5];
        let frags = fragment(&big);
        assert_eq!(frags.len(), 4);
        assert_eq!(frags[0].len(), FRAGMENT_SIZE * 2);
        assert_eq!(frags[3].len(), 5 * 2);
    }

    #[test]
    fn decode_fragment_hex_rejects_odd_length() {
        assert!(decode_fragment_hex("ABC").is_err());
    }
}
