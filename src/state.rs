use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current persisted-state schema version. Bumped whenever the shape of
/// [`PersistedState`] changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

/// One previously-seen wire frame, timestamped at receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPacket {
    pub dtm: DateTime<Utc>,
    pub frame: String,
}

/// The `{schema, packets, known_list}` document of spec §6: equivalent to
/// the entire packet log plus an inferred schema, replayed deterministically
/// (P4) by re-processing `packets` in `dtm` order regardless of how they
/// were batched when saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub schema: u32,
    pub packets: Vec<PersistedPacket>,
    pub known_list: Vec<String>,
}

impl PersistedState {
    pub fn new(packets: Vec<PersistedPacket>, known_list: Vec<String>) -> PersistedState {
        PersistedState {
            schema: SCHEMA_VERSION,
            packets,
            known_list,
        }
    }

    /// Packets sorted by `dtm`, stable on ties -- the order
    /// [`crate::Gateway::load_state`] replays them in, satisfying P4
    /// independent of the order they were appended to the log or batched
    /// on disk.
    pub fn packets_by_dtm(&self) -> Vec<&PersistedPacket> {
        let mut sorted: Vec<&PersistedPacket> = self.packets.iter().collect();
        sorted.sort_by_key(|p| p.dtm);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn pkt(secs: i64, frame: &str) -> PersistedPacket {
        PersistedPacket {
            dtm: at(secs),
            frame: frame.to_owned(),
        }
    }

    #[test]
    fn packets_by_dtm_is_stable_regardless_of_insertion_order() {
        let state = PersistedState::new(
            vec![pkt(5, "late"), pkt(1, "early"), pkt(3, "mid")],
            Vec::new(),
        );
        let sorted = state.packets_by_dtm();
        assert_eq!(sorted.iter().map(|p| p.frame.as_str()).collect::<Vec<_>>(), vec!["early", "mid", "late"]);
    }

    #[test]
    fn round_trips_through_json() {
        let state = PersistedState::new(vec![pkt(0, "045  I --- 01:145038 --:------ 01:145038 30C9 003 0007D0")], vec!["18:013393".to_owned()]);
        let json = serde_json::to_string(&state).unwrap();
        let back: PersistedState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.schema, SCHEMA_VERSION);
        assert_eq!(back.packets.len(), 1);
        assert_eq!(back.known_list, vec!["18:013393".to_owned()]);
    }
}
