//! The schedule read/write orchestrator (§4.J): drives `0006`/`0404`
//! traffic over a [`ProtocolHandle`], caching the last-seen schedule per
//! zone so a `get_schedule(force_io=false)` whose `change_counter` hasn't
//! moved never touches the wire beyond the version probe.

use crate::aggregator::{FragmentAggregator, Outcome as AggregatorOutcome};
use crate::codec;
use crate::dom::{Schedule, ZoneRef};
use crate::error::ScheduleError;
use ramses_address::Address;
use ramses_message::{Message, PayloadValue};
use ramses_packet::{Code, Verb};
use ramses_protocol::{Command, ProtocolHandle};
use std::collections::HashMap;

struct CachedSchedule {
    change_counter: u16,
    schedule: Schedule,
}

/// Per-controller schedule client (component J). One instance per
/// controller `Address`; `zone_ref` distinguishes the zones/DHW slot it
/// fronts, matching how [`ramses_binding::BindingContext`] is one instance
/// per device rather than a single shared machine.
pub struct ScheduleClient {
    protocol: ProtocolHandle,
    controller: Address,
    cache: HashMap<ZoneRef, CachedSchedule>,
}

impl ScheduleClient {
    pub fn new(protocol: ProtocolHandle, controller: Address) -> ScheduleClient {
        ScheduleClient {
            protocol,
            controller,
            cache: HashMap::new(),
        }
    }

    /// §4.J "Read": returns the cached copy untouched when `force_io` is
    /// false and the wire-reported `change_counter` matches what the cache
    /// was last read at; otherwise walks the full `0404` fragment chain.
    pub async fn get_schedule(&mut self, zone_ref: ZoneRef, force_io: bool) -> Result<Schedule, ScheduleError> {
        let change_counter = self.probe_version(zone_ref).await?;

        if !force_io {
            if let Some(cached) = self.cache.get(&zone_ref) {
                if cached.change_counter == change_counter {
                    return Ok(cached.schedule.clone());
                }
            }
        }

        let raw = self.fetch_fragments(zone_ref).await?;
        let schedule = codec::decompress(&raw)?;
        self.cache.insert(zone_ref, CachedSchedule { change_counter, schedule: schedule.clone() });
        Ok(schedule)
    }

    /// §4.J "Write": fragments and transmits `new`, then re-reads the
    /// version and rejects a write that didn't advance it.
    pub async fn set_schedule(&mut self, zone_ref: ZoneRef, new: Schedule) -> Result<Schedule, ScheduleError> {
        let before = self.probe_version(zone_ref).await?;

        let compressed = codec::compress(&new)?;
        let fragments = codec::fragment(&compressed);
        let total_frags = fragments.len() as u8;
        for (i, frag_hex) in fragments.iter().enumerate() {
            let frag_number = (i + 1) as u8;
            let payload = format!("{:02X}2000{frag_number:02X}{total_frags:02X}{frag_hex}", zone_ref.index_byte());
            let cmd = Command::new(Verb::W, Code::_0404, self.controller, payload).with_expected_reply(Verb::RP);
            self.protocol.send_cmd(cmd).await?;
        }

        let after = self.probe_version(zone_ref).await?;
        if after == before {
            return Err(ScheduleError::VersionDidNotAdvance { before, after });
        }

        self.cache.insert(zone_ref, CachedSchedule { change_counter: after, schedule: new.clone() });
        Ok(new)
    }

    /// `RQ/0006` → `RP/0006`: the cheap version probe every read and write
    /// anchors its staleness check on.
    async fn probe_version(&mut self, zone_ref: ZoneRef) -> Result<u16, ScheduleError> {
        let _ = zone_ref; // `0006` carries no zone index on the wire (grammar: RQ payload is always "00")
        let cmd = Command::new(Verb::RQ, Code::_0006, self.controller, "00");
        let reply = self.protocol.send_cmd(cmd).await?;
        let msg = Message::build(reply).map_err(|e| ScheduleError::CodecFailed { reason: e.to_string() })?;
        let PayloadValue::Map(map) = msg.payload() else {
            return Err(ScheduleError::CodecFailed { reason: "0006 reply was not a map".to_owned() });
        };
        map.get("change_counter")
            .and_then(|v| v.as_u64())
            .map(|v| v as u16)
            .ok_or_else(|| ScheduleError::CodecFailed { reason: "0006 reply missing change_counter".to_owned() })
    }

    /// The `RQ/0404` fragment loop: request `frag_number=1` with
    /// `total_frags=0` (unknown), let the first reply disclose the real
    /// `total_frags`, then walk the rest in order via
    /// [`FragmentAggregator`].
    async fn fetch_fragments(&mut self, zone_ref: ZoneRef) -> Result<Vec<u8>, ScheduleError> {
        let mut aggregator = FragmentAggregator::new();
        let mut next = 1u8;
        let mut total_hint = 0u8;

        loop {
            let payload = format!("{:02X}2000{next:02X}{total_hint:02X}", zone_ref.index_byte());
            let cmd = Command::new(Verb::RQ, Code::_0404, self.controller, payload);
            let reply = self.protocol.send_cmd(cmd).await?;
            let msg = Message::build(reply).map_err(|e| ScheduleError::CodecFailed { reason: e.to_string() })?;
            let PayloadValue::Map(map) = msg.payload() else {
                return Err(ScheduleError::CodecFailed { reason: "0404 reply was not a map".to_owned() });
            };
            let frag_number = map
                .get("frag_number")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| ScheduleError::FragmentGap { reason: "0404 reply missing frag_number".to_owned() })?
                as u8;
            let total_frags = map
                .get("total_frags")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| ScheduleError::FragmentGap { reason: "0404 reply missing total_frags".to_owned() })?
                as u8;
            let fragment_hex = map.get("fragment").and_then(|v| v.as_str()).unwrap_or("");
            let bytes = codec::decode_fragment_hex(fragment_hex)?;

            match aggregator.ingest(frag_number, total_frags, bytes)? {
                AggregatorOutcome::Complete(raw) => return Ok(raw),
                AggregatorOutcome::NeedMore { next: missing } => {
                    next = missing;
                    total_hint = total_frags;
                }
            }
        }
    }
}
