//! Literal wire-frame fixtures, lifted from the end-to-end scenarios
//! table (spec §8, `S1`..`S6`) and from the HGI/binding/schedule RF test
//! suites, for reuse across crates' integration tests.

/// S1: a fragmented `000A` array delivered as two frames within 3s of
/// each other -- the dispatcher should merge them into one 9-zone list.
pub const S1_000A_FRAGMENT_1: &str = "045  I --- 01:158182 --:------ 01:158182 000A 048 001201F409C4021201F409C4031201F409C4041201F409C4051201F409C4061201F409C4071201F409C4081201F409C4";
pub const S1_000A_FRAGMENT_2: &str = "045  I --- 01:158182 --:------ 01:158182 000A 006 081001F409C4";

/// S2: both addresses are HGIs, on a heat-only code -- must be rejected
/// with an address-set validation failure.
pub const S2_0001_BOTH_HGI: &str = "045  I --- 18:013393 18:000730 --:------ 0001 005 00FFFF0200";

/// S3: a simple `RQ/2309` round trip that `send_cmd` should complete on
/// the matching `RP`.
pub const S3_RQ_2309: &str = "RQ --- 18:000730 01:145038 --:------ 2309 001 00";
pub const S3_RP_2309: &str = "045 RP --- 01:145038 18:000730 --:------ 2309 003 0107D0";

/// S4: a binding offer/accept pair for a respondent whose known codes
/// include `1298`.
pub const S4_OFFER_1298: &str = "045  I --- 04:056378 --:------ 04:056378 1FC9 006 001298056378";
pub const S4_ACCEPT_1298: &str = "045  W --- 01:145038 04:056378 --:------ 1FC9 006 001298145038";

/// S5/S6: the `0006` version probe. `S5_UNCHANGED` matches the schedule
/// cache's last-seen counter (7); `S6_CHANGED` reports a newer one (8).
pub const S5_RQ_0006: &str = "RQ --- 18:000730 01:145038 --:------ 0006 001 00";
pub const S5_RP_0006_UNCHANGED: &str = "045 RP --- 01:145038 18:000730 --:------ 0006 004 00050007";
pub const S6_RP_0006_CHANGED: &str = "045 RP --- 01:145038 18:000730 --:------ 0006 004 00050008";

/// S6: a three-fragment `0404` read, each `RQ` answered by the matching
/// `RP` before the next `RQ` is issued.
pub const S6_RQ_0404_FRAG1: &str = "RQ --- 18:000730 01:145038 --:------ 0404 005 0020000100";
pub const S6_RP_0404_FRAG1: &str = "045 RP --- 01:145038 18:000730 --:------ 0404 013 00200001035468697320697320";
pub const S6_RQ_0404_FRAG2: &str = "RQ --- 18:000730 01:145038 --:------ 0404 005 0020000203";
pub const S6_RP_0404_FRAG2: &str = "045 RP --- 01:145038 18:000730 --:------ 0404 013 00200002036672616720746865";
pub const S6_RQ_0404_FRAG3: &str = "RQ --- 18:000730 01:145038 --:------ 0404 005 0020000303";
pub const S6_RP_0404_FRAG3: &str = "045 RP --- 01:145038 18:000730 --:------ 0404 009 002000030373747566";

/// The generic HGI device ID the protocol substitutes in for a real
/// gateway's ID when talking to an evofw3 dongle (`test_hgi_behaviors.py`).
pub const GENERIC_HGI_ID: &str = "18:000730";

/// A self-addressed `30C9` sent and received by the same generic-ID
/// gateway -- the degenerate "both src and dst are me" HGI behavior case.
pub const HGI_SELF_ADDRESSED_30C9: &str = " I --- 18:000730 --:------ 18:000730 30C9 003 000666";
