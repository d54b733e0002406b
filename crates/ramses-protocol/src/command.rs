use crate::priority::Priority;
use ramses_address::Address;
use ramses_packet::{Code, Verb};
use std::time::Duration;

/// Default echo-wait window (§4.H: "not seen within a short window (<=3s
/// default)").
pub const DEFAULT_ECHO_TIMEOUT: Duration = Duration::from_secs(3);

/// Default reply-wait window and retry budget.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_NUM_REPEATS: u32 = 1;
pub const DEFAULT_GAP_DURATION: Duration = Duration::from_millis(200);

/// An outbound packet-to-be: verb, code, destination, payload, and the QoS
/// knobs governing how `send_cmd` drives it through the wire.
#[derive(Debug, Clone)]
pub struct Command {
    pub verb: Verb,
    pub code: Code,
    pub dst: Address,
    /// `None` defaults to the gateway's own ID at transmit time; set
    /// explicitly only to request impersonation of another device.
    pub src: Option<Address>,
    pub payload: String,
    pub priority: Priority,
    pub num_repeats: u32,
    pub gap_duration: Duration,
    pub max_retries: u32,
    pub echo_timeout: Duration,
    pub reply_timeout: Duration,
    pub wait_for_reply: bool,
    /// Overrides [`Verb::expected_reply`] for the handful of codes whose
    /// ack doesn't follow the generic verb-pairing rule -- e.g. a
    /// schedule-fragment `W/0404` is acknowledged with `RP/0404`, not the
    /// generic `W -> I` mapping.
    pub expected_reply_verb: Option<Verb>,
}

impl Command {
    pub fn new(verb: Verb, code: Code, dst: Address, payload: impl Into<String>) -> Self {
        Command {
            verb,
            code,
            dst,
            src: None,
            payload: payload.into(),
            priority: Priority::DEFAULT,
            num_repeats: DEFAULT_NUM_REPEATS,
            gap_duration: DEFAULT_GAP_DURATION,
            max_retries: DEFAULT_MAX_RETRIES,
            echo_timeout: DEFAULT_ECHO_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            wait_for_reply: matches!(verb, Verb::RQ | Verb::W),
            expected_reply_verb: None,
        }
    }

    /// The verb a reply to this command is expected to carry: the
    /// generic [`Verb::expected_reply`] mapping, unless overridden via
    /// [`Command::with_expected_reply`].
    pub fn expected_reply(&self) -> Option<Verb> {
        self.expected_reply_verb.or_else(|| self.verb.expected_reply())
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_expected_reply(mut self, verb: Verb) -> Self {
        self.expected_reply_verb = Some(verb);
        self
    }

    pub fn with_src(mut self, src: Address) -> Self {
        self.src = Some(src);
        self
    }

    pub fn with_wait_for_reply(mut self, wait: bool) -> Self {
        self.wait_for_reply = wait;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The on-wire frame, with `src` resolved (the gateway's own ID unless
    /// impersonation was requested via [`Command::with_src`]).
    pub fn to_wire_frame(&self, hgi_id: Address) -> String {
        let len = self.payload.len() / 2;
        format!(
            "{} --- {} {} {} {} {:03} {}",
            self.verb,
            self.src.unwrap_or(hgi_id),
            Address::NULL,
            self.dst,
            self.code,
            len,
            self.payload,
        )
    }

    /// True iff this command's effective source differs from the
    /// gateway's real ID -- the impersonation-alert trigger (§4.H).
    pub fn is_impersonating(&self, hgi_id: Address) -> bool {
        self.src.is_some_and(|src| src != hgi_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s, false).unwrap()
    }

    #[test]
    fn wire_frame_defaults_src_to_gateway_id() {
        let cmd = Command::new(Verb::RQ, Code::_2309, addr("01:145038"), "00");
        let hgi = addr("18:013393");
        let frame = cmd.to_wire_frame(hgi);
        assert!(frame.starts_with("RQ --- 18:013393"));
        assert!(frame.contains("2309 001 00"));
    }

    #[test]
    fn rq_and_w_default_to_waiting_for_reply() {
        assert!(Command::new(Verb::RQ, Code::_2309, addr("01:145038"), "00").wait_for_reply);
        assert!(Command::new(Verb::W, Code::_1FC9, addr("01:145038"), "00").wait_for_reply);
        assert!(!Command::new(Verb::I, Code::_1FC9, addr("01:145038"), "00").wait_for_reply);
    }

    #[test]
    fn is_impersonating_detects_foreign_src() {
        let hgi = addr("18:013393");
        let plain = Command::new(Verb::RQ, Code::_2309, addr("01:145038"), "00");
        assert!(!plain.is_impersonating(hgi));

        let impersonated = plain.with_src(addr("04:056378"));
        assert!(impersonated.is_impersonating(hgi));
    }
}
