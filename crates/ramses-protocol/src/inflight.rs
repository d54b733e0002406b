use crate::command::Command;
use chrono::{DateTime, Utc};
use ramses_address::Address;
use ramses_packet::Packet;

/// Where a single in-flight command sits in its lifecycle (§4.H: "queued ->
/// sent -> echo_seen -> reply_seen (optional) -> done").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Transmitted, waiting for our own echo to come back off the wire.
    Sent,
    /// Echo observed; if a reply isn't required this phase is transient.
    EchoSeen,
    /// Echo observed and a reply is required; waiting for it.
    AwaitingReply,
}

/// The at-most-one command currently mid-transmission, plus the bookkeeping
/// [`crate::Protocol`] needs to retry it. Pure state: every transition is a
/// plain function of an event and the current instant, so it can be driven
/// deterministically in tests without a real clock or real I/O.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub cmd: Command,
    pub attempt: u32,
    pub phase: Phase,
    pub deadline: DateTime<Utc>,
}

/// What the owning actor should do after an event is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stay in flight; no action needed.
    Continue,
    /// The command completed; hand `packet` back to the caller.
    Done(Packet),
    /// Retransmit the command (echo or reply deadline elapsed, retries
    /// remain).
    Retry,
    /// Retries exhausted; fail the caller.
    Failed { retries: u32 },
}

impl InFlight {
    pub fn start(cmd: Command, now: DateTime<Utc>) -> InFlight {
        let deadline = now + chrono::Duration::from_std(cmd.echo_timeout).unwrap_or_default();
        InFlight {
            cmd,
            attempt: 0,
            phase: Phase::Sent,
            deadline,
        }
    }

    /// True iff `pkt` is the mirrored echo of our own outbound command:
    /// same verb/code/dst, transmitted by us.
    pub fn is_echo(&self, pkt: &Packet, hgi_id: Address) -> bool {
        let effective_src = self.cmd.src.unwrap_or(hgi_id);
        pkt.src() == effective_src && pkt.dst() == self.cmd.dst && pkt.verb() == self.cmd.verb && pkt.code() == self.cmd.code
    }

    /// True iff `pkt` is the reply to our command: the expected reply verb,
    /// same code, originating from our destination.
    pub fn is_reply(&self, pkt: &Packet) -> bool {
        let Some(expected_verb) = self.cmd.expected_reply() else {
            return false;
        };
        pkt.verb() == expected_verb && pkt.code() == self.cmd.code && pkt.src() == self.cmd.dst
    }

    /// Apply an inbound packet, advancing phase/deadline as appropriate.
    pub fn on_packet(&mut self, pkt: &Packet, hgi_id: Address, now: DateTime<Utc>) -> Outcome {
        match self.phase {
            Phase::Sent if self.is_echo(pkt, hgi_id) => {
                if self.cmd.wait_for_reply {
                    self.phase = Phase::AwaitingReply;
                    self.deadline = now + chrono::Duration::from_std(self.cmd.reply_timeout).unwrap_or_default();
                    Outcome::Continue
                } else {
                    self.phase = Phase::EchoSeen;
                    Outcome::Done(pkt.clone())
                }
            }
            Phase::AwaitingReply if self.is_reply(pkt) => Outcome::Done(pkt.clone()),
            _ => Outcome::Continue,
        }
    }

    /// Apply a deadline elapse: retry (resetting to the `Sent` phase) while
    /// attempts remain, otherwise fail.
    pub fn on_deadline(&mut self, now: DateTime<Utc>) -> Outcome {
        if self.attempt >= self.cmd.max_retries {
            return Outcome::Failed { retries: self.attempt };
        }
        self.attempt += 1;
        self.phase = Phase::Sent;
        self.deadline = now + chrono::Duration::from_std(self.cmd.echo_timeout).unwrap_or_default();
        Outcome::Retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ramses_packet::{Code, Verb};

    fn addr(s: &str) -> Address {
        Address::parse(s, false).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn pkt(frame: &str, secs: i64) -> Packet {
        Packet::from_frame(frame, at(secs)).unwrap()
    }

    #[test]
    fn echo_without_reply_completes_immediately() {
        let cmd = Command::new(Verb::I, Code::_30C9, addr("63:262142"), "0007D0").with_wait_for_reply(false);
        let mut inflight = InFlight::start(cmd, at(0));
        let hgi = addr("18:013393");
        let echo = pkt("045  I --- 18:013393 --:------ 63:262142 30C9 003 0007D0", 1);
        assert!(matches!(inflight.on_packet(&echo, hgi, at(1)), Outcome::Done(_)));
    }

    #[test]
    fn echo_then_reply_for_rq() {
        let cmd = Command::new(Verb::RQ, Code::_2309, addr("01:145038"), "00");
        let mut inflight = InFlight::start(cmd, at(0));
        let hgi = addr("18:013393");
        let echo = pkt("045 RQ --- 18:013393 01:145038 --:------ 2309 001 00", 1);
        assert_eq!(inflight.on_packet(&echo, hgi, at(1)), Outcome::Continue);
        assert_eq!(inflight.phase, Phase::AwaitingReply);

        let reply = pkt("045 RP --- 01:145038 18:013393 --:------ 2309 003 0107D0", 2);
        assert!(matches!(inflight.on_packet(&reply, hgi, at(2)), Outcome::Done(_)));
    }

    #[test]
    fn w_0404_awaits_rp_via_expected_reply_override() {
        let cmd = Command::new(Verb::W, Code::_0404, addr("01:145038"), "000020000801")
            .with_expected_reply(Verb::RP);
        let mut inflight = InFlight::start(cmd, at(0));
        let hgi = addr("18:013393");
        let echo = pkt("045  W --- 18:013393 01:145038 --:------ 0404 006 000020000801", 1);
        assert_eq!(inflight.on_packet(&echo, hgi, at(1)), Outcome::Continue);
        assert_eq!(inflight.phase, Phase::AwaitingReply);

        let reply = pkt("045 RP --- 01:145038 18:013393 --:------ 0404 006 000020000801", 2);
        assert!(matches!(inflight.on_packet(&reply, hgi, at(2)), Outcome::Done(_)));
    }

    #[test]
    fn deadline_retries_until_exhausted() {
        let cmd = Command::new(Verb::RQ, Code::_2309, addr("01:145038"), "00").with_max_retries(2);
        let mut inflight = InFlight::start(cmd, at(0));
        assert_eq!(inflight.on_deadline(at(3)), Outcome::Retry);
        assert_eq!(inflight.on_deadline(at(6)), Outcome::Retry);
        assert_eq!(inflight.on_deadline(at(9)), Outcome::Failed { retries: 2 });
    }

    #[test]
    fn reply_timeout_resets_to_sent_phase() {
        let cmd = Command::new(Verb::RQ, Code::_2309, addr("01:145038"), "00").with_max_retries(1);
        let mut inflight = InFlight::start(cmd, at(0));
        let hgi = addr("18:013393");
        let echo = pkt("045 RQ --- 18:013393 01:145038 --:------ 2309 001 00", 1);
        inflight.on_packet(&echo, hgi, at(1));
        assert_eq!(inflight.phase, Phase::AwaitingReply);

        assert_eq!(inflight.on_deadline(at(4)), Outcome::Retry);
        assert_eq!(inflight.phase, Phase::Sent);
    }
}
