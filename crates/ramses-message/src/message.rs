use crate::error::MessageError;
use crate::index;
use crate::payload::{self, PayloadValue};
use chrono::{DateTime, Duration, Utc};
use ramses_address::Address;
use ramses_packet::{Code, Lifespan, Packet, Verb};
use serde_json::Value;

/// A grace period folded into the expiry calculation: a message isn't
/// considered even partway stale until 3 seconds past its nominal age,
/// absorbing ordinary wire/serial latency.
const EXPIRY_GRACE: Duration = Duration::seconds(3);

/// The threshold `fraction_expired` must clear for [`Message::is_expired`]
/// to report true.
const HAS_EXPIRED: f64 = 2.0;

/// A validated [`Packet`] whose payload has been parsed into a structured
/// value and (for the single-record form) tagged with its index key.
///
/// Two messages are equal iff their `(src, dst, verb, code, raw payload)`
/// match -- parse results and timestamps are not part of message identity.
#[derive(Debug, Clone)]
pub struct Message {
    packet: Packet,
    payload: PayloadValue,
}

impl Message {
    /// Run the build pipeline specified for turning a lexed [`Packet`] into
    /// a `Message`: payload-regex match (already done by
    /// [`Packet::from_frame`]), the `RQ`-with-no-payload special case, the
    /// code-specific parser, then index-key merge.
    pub fn build(packet: Packet) -> Result<Message, MessageError> {
        let code = packet.code();
        let verb = packet.verb();

        if let Err(grammar_err) = ramses_packet::grammar::validate_payload(code, verb, packet.payload()) {
            let is_rq_without_payload = verb == Verb::RQ
                && packet.is_empty()
                && !ramses_packet::grammar::RQ_IDX_COMPLEX.contains(&code);
            if is_rq_without_payload {
                tracing::debug!(%code, "RQ with no payload; treating as empty-payload request");
                return Ok(Message {
                    packet,
                    payload: PayloadValue::Map(serde_json::Map::new()),
                });
            }
            tracing::warn!(%code, %verb, error = %grammar_err, "packet failed payload grammar validation");
            return Err(grammar_err.into());
        }

        let mut value = payload::parse(code, verb, packet.payload(), packet.has_array())?;
        merge_index_key(&mut value, code, packet.idx());

        Ok(Message { packet, payload: value })
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn dtm(&self) -> DateTime<Utc> {
        self.packet.dtm()
    }

    pub fn verb(&self) -> Verb {
        self.packet.verb()
    }

    pub fn code(&self) -> Code {
        self.packet.code()
    }

    pub fn src(&self) -> Address {
        self.packet.src()
    }

    pub fn dst(&self) -> Address {
        self.packet.dst()
    }

    pub fn payload(&self) -> &PayloadValue {
        &self.payload
    }

    /// `(now - dtm - 3s) / lifespan`, or `None` for a message whose code
    /// never expires.
    pub fn fraction_expired(&self, now: DateTime<Utc>) -> Option<f64> {
        match self.packet.lifespan() {
            Lifespan::Never => None,
            Lifespan::Duration(lifespan) if lifespan.num_milliseconds() > 0 => {
                let elapsed = now - self.packet.dtm() - EXPIRY_GRACE;
                Some(elapsed.num_milliseconds() as f64 / lifespan.num_milliseconds() as f64)
            }
            Lifespan::Duration(_) => Some(HAS_EXPIRED),
        }
    }

    /// Pure query: true once `fraction_expired(now) >= 2.0`. Eviction from
    /// entity caches is a separate, explicit sweep -- this never mutates
    /// anything, unlike the source's combined query-and-evict helper.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.fraction_expired(now).is_some_and(|f| f >= HAS_EXPIRED)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.src() == other.src()
            && self.dst() == other.dst()
            && self.verb() == other.verb()
            && self.code() == other.code()
            && self.packet.payload() == other.packet.payload()
    }
}

impl Eq for Message {}

fn merge_index_key(value: &mut PayloadValue, code: Code, idx_hex: Option<&str>) {
    let PayloadValue::Map(map) = value else {
        // Array (List) entries carry their own per-element index already.
        return;
    };
    let Some(key) = index::index_key_name(code, idx_hex) else {
        return;
    };
    if map.contains_key(key) {
        return;
    }
    if let Some(byte) = idx_hex.and_then(|s| u8::from_str_radix(s, 16).ok()) {
        map.insert(key.to_owned(), Value::from(byte));
    }
}
