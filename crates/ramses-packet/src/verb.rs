use std::fmt;
use std::str::FromStr;

/// The four roles a RAMSES-II frame can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::upper_case_acronyms)]
pub enum Verb {
    /// Inform/broadcast.
    I,
    /// Request.
    RQ,
    /// Reply.
    RP,
    /// Write.
    W,
}

impl Verb {
    /// The two-character on-wire form: one-letter verbs get a leading space.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Verb::I => " I",
            Verb::RQ => "RQ",
            Verb::RP => "RP",
            Verb::W => " W",
        }
    }

    /// The verb expected in the reply to a command carrying `self`, used by
    /// destination-role validation (`RQ` -> `RP`, `RP` -> `RQ`, `W` -> `I`).
    pub fn expected_reply(&self) -> Option<Verb> {
        match self {
            Verb::RQ => Some(Verb::RP),
            Verb::RP => Some(Verb::RQ),
            Verb::W => Some(Verb::I),
            Verb::I => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "I" => Ok(Verb::I),
            "RQ" => Ok(Verb::RQ),
            "RP" => Ok(Verb::RP),
            "W" => Ok(Verb::W),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_pads_single_letter_verbs() {
        assert_eq!(Verb::I.as_wire_str(), " I");
        assert_eq!(Verb::W.as_wire_str(), " W");
        assert_eq!(Verb::RQ.as_wire_str(), "RQ");
        assert_eq!(Verb::RP.as_wire_str(), "RP");
    }

    #[test]
    fn parses_trimmed_verb_tokens() {
        assert_eq!(" I".trim().parse::<Verb>(), Ok(Verb::I));
        assert_eq!("RQ".parse::<Verb>(), Ok(Verb::RQ));
    }

    #[test]
    fn expected_reply_mapping() {
        assert_eq!(Verb::RQ.expected_reply(), Some(Verb::RP));
        assert_eq!(Verb::RP.expected_reply(), Some(Verb::RQ));
        assert_eq!(Verb::W.expected_reply(), Some(Verb::I));
        assert_eq!(Verb::I.expected_reply(), None);
    }
}
