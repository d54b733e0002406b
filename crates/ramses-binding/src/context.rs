use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ramses_address::Address;
use ramses_message::{Message, PayloadValue};
use ramses_packet::{Code, Verb};
use std::collections::HashSet;

/// Default deadline for every Offered/Accepted-style transition (§4.I).
pub const DEFAULT_DEADLINE: ChronoDuration = ChronoDuration::seconds(3);

/// A confirm must be observed this many times before either side considers
/// the pair `Bound` (S4: "both reach Bound after three confirms").
const CONFIRM_THRESHOLD: u32 = 3;

/// Which side of the three-way handshake a [`BindingContext`] is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Supplicant,
    Respondent,
}

/// Where a binding context sits in its handshake. The two roles' sequences
/// share one enum since both are driven by the same `1FC9` traffic and a
/// context is only ever in states reachable for its own role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Offering,
    Offered,
    Listening,
    Accepting,
    Accepted,
    Confirming,
    Confirmed,
    BoundAccepted,
    Bound,
    Unbound,
}

/// An outbound `1FC9` frame the owning gateway should hand to the protocol
/// layer. Carries `src` explicitly since binding is one of the few
/// operations that legitimately impersonates a device other than the
/// gateway itself (a "fakeable" device under test).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub verb: Verb,
    pub src: Address,
    pub dst: Address,
    pub codes: Vec<Code>,
}

/// What the caller should do after feeding an event to a [`BindingContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No externally visible effect.
    Continue,
    /// Transmit `Intent` through the protocol layer, then report its echo
    /// back via [`BindingContext::on_sent`].
    Send(Intent),
    /// The pair is bound.
    Bound,
    /// The deadline elapsed with no further progress.
    Unbound,
}

/// Per-device binding state (§3 "Binding context", §4.I). Pure: every
/// transition is a function of an event and the current instant, with no
/// I/O of its own -- the owning gateway performs the actual transmit and
/// reports completion back via [`BindingContext::on_sent`], mirroring how
/// [`ramses_protocol::InFlight`] separates QoS bookkeeping from the real
/// wire.
#[derive(Debug, Clone)]
pub struct BindingContext {
    pub role: Role,
    pub state: State,
    pub own_id: Address,
    pub codes: HashSet<Code>,
    pub tender: Option<Address>,
    pub accepter: Option<Address>,
    confirm_count: u32,
    pub deadline: DateTime<Utc>,
}

impl BindingContext {
    /// Begin as the supplicant: the device that will offer itself for
    /// binding. Call [`BindingContext::begin_offer`] to actually transmit.
    pub fn start_supplicant(own_id: Address, codes: impl IntoIterator<Item = Code>, now: DateTime<Utc>) -> BindingContext {
        BindingContext {
            role: Role::Supplicant,
            state: State::Idle,
            own_id,
            codes: codes.into_iter().collect(),
            tender: None,
            accepter: None,
            confirm_count: 0,
            deadline: now + DEFAULT_DEADLINE,
        }
    }

    /// Begin as the respondent: already `Listening` for a matching offer.
    pub fn start_listening(own_id: Address, codes: impl IntoIterator<Item = Code>, now: DateTime<Utc>) -> BindingContext {
        BindingContext {
            role: Role::Respondent,
            state: State::Listening,
            own_id,
            codes: codes.into_iter().collect(),
            tender: None,
            accepter: None,
            confirm_count: 0,
            deadline: now + DEFAULT_DEADLINE,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, State::Bound | State::Unbound)
    }

    /// Supplicant-only: kick off the handshake by broadcasting an offer.
    pub fn begin_offer(&mut self, now: DateTime<Utc>) -> Outcome {
        if self.role != Role::Supplicant || self.state != State::Idle {
            return Outcome::Continue;
        }
        self.state = State::Offering;
        self.deadline = now + DEFAULT_DEADLINE;
        Outcome::Send(Intent {
            verb: Verb::I,
            src: self.own_id,
            dst: Address::BROADCAST,
            codes: self.codes.iter().copied().collect(),
        })
    }

    /// The caller's report that a previously returned [`Intent`] actually
    /// went out over the wire (its echo was observed). Completes the
    /// transitions that hinge on our own transmission rather than on
    /// inbound traffic.
    pub fn on_sent(&mut self, now: DateTime<Utc>) -> Outcome {
        match (self.role, self.state) {
            (Role::Supplicant, State::Offering) => {
                self.state = State::Offered;
                self.deadline = now + DEFAULT_DEADLINE;
                Outcome::Continue
            }
            (Role::Respondent, State::Accepting) => {
                self.state = State::Accepted;
                self.deadline = now + DEFAULT_DEADLINE;
                Outcome::Continue
            }
            (Role::Supplicant, State::Confirming) => {
                self.state = State::Confirmed;
                self.confirm_count += 1;
                if self.confirm_count >= CONFIRM_THRESHOLD {
                    self.state = State::Bound;
                    Outcome::Bound
                } else {
                    self.deadline = now + DEFAULT_DEADLINE;
                    Outcome::Continue
                }
            }
            _ => Outcome::Continue,
        }
    }

    /// Feed an inbound `1FC9` message through the handshake.
    pub fn on_message(&mut self, msg: &Message, now: DateTime<Utc>) -> Outcome {
        if msg.code() != Code::_1FC9 {
            return Outcome::Continue;
        }
        match (self.role, self.state) {
            (Role::Respondent, State::Listening) if msg.verb() == Verb::I && msg.dst().is_broadcast() => {
                let offered = bound_codes(msg);
                if self.codes.is_disjoint(&offered) {
                    return Outcome::Continue;
                }
                self.tender = Some(msg.src());
                self.state = State::Accepting;
                self.deadline = now + DEFAULT_DEADLINE;
                Outcome::Send(Intent {
                    verb: Verb::W,
                    src: self.own_id,
                    dst: msg.src(),
                    codes: self.codes.iter().copied().collect(),
                })
            }
            (Role::Supplicant, State::Offered) if msg.verb() == Verb::W && msg.dst() == self.own_id => {
                self.accepter = Some(msg.src());
                self.state = State::Confirming;
                self.deadline = now + DEFAULT_DEADLINE;
                Outcome::Send(Intent {
                    verb: Verb::I,
                    src: self.own_id,
                    dst: msg.src(),
                    codes: self.codes.iter().copied().collect(),
                })
            }
            (Role::Respondent, State::Accepted | State::BoundAccepted)
                if msg.verb() == Verb::I && msg.dst() == self.own_id && Some(msg.src()) == self.tender =>
            {
                self.confirm_count += 1;
                self.deadline = now + DEFAULT_DEADLINE;
                if self.confirm_count >= CONFIRM_THRESHOLD {
                    self.state = State::Bound;
                    Outcome::Bound
                } else {
                    self.state = State::BoundAccepted;
                    Outcome::Continue
                }
            }
            _ => Outcome::Continue,
        }
    }

    /// Apply a deadline elapse: any non-terminal state with no progress by
    /// `now` transitions to `Unbound`.
    pub fn on_deadline(&mut self, now: DateTime<Utc>) -> Outcome {
        if self.is_terminal() || now < self.deadline {
            return Outcome::Continue;
        }
        self.state = State::Unbound;
        Outcome::Unbound
    }
}

/// The set of codes a `1FC9` offer/accept/confirm frame names, pulled from
/// its already-parsed bind tuples (single record or array form).
fn bound_codes(msg: &Message) -> HashSet<Code> {
    let maps: Vec<&serde_json::Map<String, serde_json::Value>> = match msg.payload() {
        PayloadValue::Map(m) => vec![m],
        PayloadValue::List(list) => list.iter().collect(),
    };
    maps.into_iter()
        .filter_map(|m| m.get("bound_code")?.as_str().and_then(Code::parse))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ramses_packet::Packet;

    fn addr(s: &str) -> Address {
        Address::parse(s, false).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(frame: &str, secs: i64) -> Message {
        Message::build(Packet::from_frame(frame, at(secs)).unwrap()).unwrap()
    }

    // Bind tuple = domain_id(1 byte) + code(2 bytes) + packed device_id(3
    // bytes: type byte + 16-bit number). `2309` is used as the bound code
    // throughout since it's both a real grammar-known code and, handily,
    // already 4 hex digits.
    const TENDER_FRAME_ADDR: &str = "01:000001";
    const OWN_FRAME_ADDR: &str = "13:000002";
    const BIND_TUPLE: &str = "002309010001";
    const OTHER_CODE_TUPLE: &str = "0022C9010001";

    #[test]
    fn respondent_accepts_matching_offer_and_binds_after_three_confirms() {
        let tender = addr(TENDER_FRAME_ADDR);
        let own = addr(OWN_FRAME_ADDR);
        let mut ctx = BindingContext::start_listening(own, [Code::_2309], at(0));

        let offer_frame = format!("045  I --- {TENDER_FRAME_ADDR} 63:262142 --:------ 1FC9 006 {BIND_TUPLE}");
        let outcome = ctx.on_message(&msg(&offer_frame, 1), at(1));
        assert_eq!(ctx.state, State::Accepting);
        assert!(matches!(outcome, Outcome::Send(Intent { verb: Verb::W, dst, .. }) if dst == tender));

        assert_eq!(ctx.on_sent(at(1)), Outcome::Continue);
        assert_eq!(ctx.state, State::Accepted);

        let confirm_frame = format!("045  I --- {TENDER_FRAME_ADDR} {OWN_FRAME_ADDR} --:------ 1FC9 006 {BIND_TUPLE}");
        assert_eq!(ctx.on_message(&msg(&confirm_frame, 2), at(2)), Outcome::Continue);
        assert_eq!(ctx.state, State::BoundAccepted);
        assert_eq!(ctx.on_message(&msg(&confirm_frame, 3), at(3)), Outcome::Continue);
        assert_eq!(ctx.on_message(&msg(&confirm_frame, 4), at(4)), Outcome::Bound);
        assert_eq!(ctx.state, State::Bound);
    }

    #[test]
    fn respondent_ignores_offer_with_no_matching_code() {
        let own = addr(OWN_FRAME_ADDR);
        let mut ctx = BindingContext::start_listening(own, [Code::_2309], at(0));
        let offer_frame = format!("045  I --- {TENDER_FRAME_ADDR} 63:262142 --:------ 1FC9 006 {OTHER_CODE_TUPLE}");
        assert_eq!(ctx.on_message(&msg(&offer_frame, 1), at(1)), Outcome::Continue);
        assert_eq!(ctx.state, State::Listening);
    }

    #[test]
    fn supplicant_completes_full_handshake() {
        let own = addr(OWN_FRAME_ADDR);
        let respondent = addr(TENDER_FRAME_ADDR);
        let mut ctx = BindingContext::start_supplicant(own, [Code::_2309], at(0));

        let outcome = ctx.begin_offer(at(0));
        assert!(matches!(outcome, Outcome::Send(Intent { verb: Verb::I, dst, .. }) if dst.is_broadcast()));
        ctx.on_sent(at(0));
        assert_eq!(ctx.state, State::Offered);

        let accept_frame = format!("045  W --- {TENDER_FRAME_ADDR} {OWN_FRAME_ADDR} --:------ 1FC9 006 {BIND_TUPLE}");
        let outcome = ctx.on_message(&msg(&accept_frame, 1), at(1));
        assert_eq!(ctx.state, State::Confirming);
        assert!(matches!(outcome, Outcome::Send(Intent { verb: Verb::I, dst, .. }) if dst == respondent));

        ctx.on_sent(at(1));
        assert_eq!(ctx.state, State::Confirmed);
        ctx.on_sent(at(2));
        assert_eq!(ctx.on_sent(at(3)), Outcome::Bound);
        assert_eq!(ctx.state, State::Bound);
    }

    #[test]
    fn deadline_without_progress_unbinds() {
        let own = addr(OWN_FRAME_ADDR);
        let mut ctx = BindingContext::start_listening(own, [Code::_2309], at(0));
        assert_eq!(ctx.on_deadline(at(1)), Outcome::Continue);
        assert_eq!(ctx.on_deadline(at(4)), Outcome::Unbound);
        assert_eq!(ctx.state, State::Unbound);
    }
}
