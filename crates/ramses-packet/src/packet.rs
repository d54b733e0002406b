use crate::code::Code;
use crate::error::PacketError;
use crate::grammar;
use crate::lifespan::{self, Lifespan};
use crate::verb::Verb;
use chrono::{DateTime, Utc};
use ramses_address::Address;
use regex::Regex;
use std::sync::LazyLock;

static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<rssi>\d{3}|---) (?P<verb>.{2}) (?P<seqn>\d{3}|---) ",
        r"(?P<addr0>\S{9}) (?P<addr1>\S{9}) (?P<addr2>\S{9}) ",
        r"(?P<code>[0-9A-Fa-f]{4}) (?P<len>\d{3}) (?P<payload>[0-9A-Fa-f]*)$",
    ))
    .expect("static frame pattern is valid")
});

/// The context key a packet is de-duplicated against in an entity cache:
/// `true`/`false` for codes whose instances don't carry a meaningful index,
/// or the hex index string itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ctx {
    Bool(bool),
    Index(String),
}

/// One lexed and grammar-validated wire frame.
///
/// Immutable after construction: every derived field (`idx`, `ctx`,
/// `has_array`, `lifespan`) is computed once in [`Packet::from_frame`] and
/// never recalculated.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    dtm: DateTime<Utc>,
    rssi: Option<u16>,
    verb: Verb,
    seqn: Option<u16>,
    src: Address,
    dst: Address,
    code: Code,
    len: u16,
    payload: String,
    idx: Option<String>,
    ctx: Ctx,
    has_array: bool,
    lifespan: Lifespan,
}

impl Packet {
    /// Lex and validate one `\r\n`-terminated wire line (CRLF already
    /// stripped) received at `dtm`.
    pub fn from_frame(frame: &str, dtm: DateTime<Utc>) -> Result<Packet, PacketError> {
        let caps = FRAME_RE
            .captures(frame)
            .ok_or_else(|| PacketError::invalid(format!("malformed frame: '{frame}'")))?;

        let rssi = parse_optional_digits(&caps["rssi"]);
        let seqn = parse_optional_digits(&caps["seqn"]);
        let verb: Verb = caps["verb"]
            .parse()
            .map_err(|()| PacketError::invalid(format!("unknown verb: '{}'", &caps["verb"])))?;
        let code = Code::parse(&caps["code"])
            .ok_or_else(|| PacketError::invalid(format!("malformed code: '{}'", &caps["code"])))?;
        let len: u16 = caps["len"]
            .parse()
            .map_err(|_| PacketError::invalid(format!("malformed length: '{}'", &caps["len"])))?;
        let payload = caps["payload"].to_owned();

        if payload.len() != 2 * len as usize {
            return Err(PacketError::invalid(format!(
                "payload length {} does not match declared len {len}",
                payload.len() / 2
            )));
        }

        let addrs = [
            parse_addr(&caps["addr0"])?,
            parse_addr(&caps["addr1"])?,
            parse_addr(&caps["addr2"])?,
        ];
        let (src, dst) = resolve_src_dst(addrs)?;

        // Payload-grammar validation (component C) happens one layer up, in
        // `ramses_message::Message::build` -- a Packet only needs its frame
        // structure to be well-formed, not its payload shape to be known.
        let idx = derive_idx(code, verb, &payload);
        let ctx = derive_ctx(code, verb, &payload, idx.as_deref());
        let has_array = grammar::has_array(code, len as usize);
        let lifespan = lifespan::lifespan_for(code, &payload);

        Ok(Packet {
            dtm,
            rssi,
            verb,
            seqn,
            src,
            dst,
            code,
            len,
            payload,
            idx,
            ctx,
            has_array,
            lifespan,
        })
    }

    pub fn dtm(&self) -> DateTime<Utc> {
        self.dtm
    }

    pub fn rssi(&self) -> Option<u16> {
        self.rssi
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn seqn(&self) -> Option<u16> {
        self.seqn
    }

    pub fn src(&self) -> Address {
        self.src
    }

    pub fn dst(&self) -> Address {
        self.dst
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The index hint: usually the first payload byte, but see
    /// `grammar::CODE_IDX_COMPLEX` for codes where this is code-specific or
    /// absent.
    pub fn idx(&self) -> Option<&str> {
        self.idx.as_deref()
    }

    pub fn ctx(&self) -> &Ctx {
        &self.ctx
    }

    pub fn has_array(&self) -> bool {
        self.has_array
    }

    pub fn lifespan(&self) -> Lifespan {
        self.lifespan
    }

    /// Format this packet back to its canonical outbound wire form (no
    /// RSSI: that field is only ever supplied by the radio on receive).
    pub fn to_wire_frame(&self) -> String {
        let seqn = self
            .seqn
            .map_or_else(|| "---".to_owned(), |s| format!("{s:03}"));
        format!(
            "{} {} {} {} {} {:04} {:03} {}",
            self.verb, seqn, self.src, Address::NULL, self.dst, self.code, self.len, self.payload
        )
    }
}

fn parse_optional_digits(s: &str) -> Option<u16> {
    if s == "---" {
        None
    } else {
        s.parse().ok()
    }
}

fn parse_addr(s: &str) -> Result<Address, PacketError> {
    Address::parse(s, false).map_err(|e| PacketError::invalid(e.to_string()))
}

/// Resolve the wire's three address slots down to (src, dst).
///
/// Exactly one slot is the null sentinel in the ordinary case; the
/// well-known exception is two nulls in `addr0`/`addr1` with a live
/// `addr2`, which is legal for a broadcast from an unknown source (src ==
/// dst == addr2).
fn resolve_src_dst(addrs: [Address; 3]) -> Result<(Address, Address), PacketError> {
    let non_null: Vec<usize> = (0..3).filter(|&i| !addrs[i].is_null()).collect();
    match non_null.len() {
        2 => Ok((addrs[non_null[0]], addrs[non_null[1]])),
        1 if addrs[0].is_null() && addrs[1].is_null() => Ok((addrs[2], addrs[2])),
        _ => Err(PacketError::addr_set_invalid(
            "expected exactly two non-null addresses (or the --:------ --:------ <addr> broadcast form)",
        )),
    }
}

/// The raw index hint: the first payload byte, when present. For codes in
/// `grammar::CODE_IDX_COMPLEX`/`grammar::RQ_IDX_COMPLEX` this is just a
/// hint -- naming the index (`frag_number`, `domain_id`, ...) is left to
/// the code-specific message parser.
fn derive_idx(_code: Code, _verb: Verb, payload: &str) -> Option<String> {
    if payload.is_empty() {
        None
    } else {
        Some(payload[0..2].to_owned())
    }
}

fn derive_ctx(_code: Code, verb: Verb, payload: &str, idx: Option<&str>) -> Ctx {
    match idx {
        None => Ctx::Bool(verb == Verb::RQ),
        Some(idx) => Ctx::Index(idx.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dtm() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn lexes_a_well_formed_frame() {
        let frame = "045  I --- 01:145038 --:------ 01:145038 30C9 003 0007D0";
        let pkt = Packet::from_frame(frame, dtm()).unwrap();
        assert_eq!(pkt.verb(), Verb::I);
        assert_eq!(pkt.code(), Code::_30C9);
        assert_eq!(pkt.len(), 3);
        assert_eq!(pkt.payload(), "0007D0");
        assert_eq!(pkt.idx(), Some("00"));
    }

    #[test]
    fn rejects_mismatched_len() {
        let frame = "045  I --- 01:145038 --:------ 01:145038 30C9 004 0007D0";
        assert!(Packet::from_frame(frame, dtm()).is_err());
    }

    #[test]
    fn accepts_unknown_source_broadcast_form() {
        let frame = "045  I --- --:------ --:------ 01:145038 30C9 003 0007D0";
        let pkt = Packet::from_frame(frame, dtm()).unwrap();
        assert_eq!(pkt.src(), pkt.dst());
    }

    #[test]
    fn rejects_all_three_addresses_live() {
        let frame = "045  I --- 01:145038 02:111111 03:222222 30C9 003 0007D0";
        assert!(Packet::from_frame(frame, dtm()).is_err());
    }

    #[test]
    fn lexes_an_otherwise_unknown_code_without_grammar_checks() {
        // Grammar validation is Message::build's job, not Packet::from_frame's;
        // an unrecognised code still lexes to a structurally valid packet.
        let frame = "045  I --- 01:145038 --:------ 01:145038 ABCD 003 0007D0";
        let pkt = Packet::from_frame(frame, dtm()).unwrap();
        assert_eq!(pkt.code(), Code::Unknown(0xABCD));
    }

    #[test]
    fn array_fragment_is_flagged() {
        let frame = "045  I --- 01:158182 --:------ 01:158182 000A 012 001201F409C4011001F409C4";
        let pkt = Packet::from_frame(frame, dtm()).unwrap();
        assert!(pkt.has_array());
    }

    #[test]
    fn to_wire_frame_omits_rssi_and_round_trips_fields() {
        let frame = "045  I --- 01:145038 --:------ 01:145038 30C9 003 0007D0";
        let pkt = Packet::from_frame(frame, dtm()).unwrap();
        let out = pkt.to_wire_frame();
        assert!(out.contains("30C9"));
        assert!(out.contains("0007D0"));
        assert!(!out.starts_with("045"));
    }
}
