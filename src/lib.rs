//! The gateway façade (component K): wires the protocol engine's layers —
//! transport, QoS, entity dispatch, binding, and schedule transfer — into
//! one cooperatively-scheduled loop a host application drives by awaiting
//! [`Gateway::run`].
//!
//! Follows the teacher's worker-plus-bus idiom (`ClientConnector`): inbound
//! packets are forwarded off the [`ramses_protocol::Protocol`] actor onto an
//! `mpsc` channel rather than shared behind a lock, since [`HandlerFn`] must
//! be `Send` and the gateway's own state (registry, dispatcher, binding
//! contexts) is never touched from more than one task.

pub mod config;
pub mod error;
pub mod state;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use state::{PersistedPacket, PersistedState, SCHEMA_VERSION};

use chrono::{DateTime, Utc};
use ramses_address::Address;
use ramses_binding::{BindingContext, Intent, Outcome as BindingOutcome};
use ramses_entity::{Dispatcher, DispatcherConfig, Registry, detect_array_fragment};
use ramses_message::Message;
use ramses_packet::{Code, Packet, Verb};
use ramses_protocol::{Command, HandlerFn, Protocol, ProtocolHandle};
use ramses_schedule::ScheduleClient;
use ramses_transport::{SerialPort, Transport, TransportConfig};
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How often the housekeeping tick sweeps expired cache entries and (when
/// enabled) refreshes discovery.
const HOUSEKEEPING_INTERVAL: StdDuration = StdDuration::from_secs(60);

/// Install a `tracing-subscriber` `fmt` layer reading `RUST_LOG`, falling
/// back to `info`. Library crates never do this themselves (§A.1) -- only
/// a host application linking the façade should call it, once, at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// `RQ/10E0` ("device_info") with no specific sub-index, the literal probe
/// the source's HGI test fixtures send devices on the known list.
const DISCOVERY_PAYLOAD: &str = "00";

/// Pack a device address into a `1FC9` bind-tuple device-id field (type
/// byte + 16-bit number, 3 raw bytes) — the inverse of the parser in
/// `ramses_message::payload::format_dec_addr`.
fn pack_1fc9_device_id(addr: Address) -> Result<String, GatewayError> {
    let text = addr.to_string();
    let (tt, nnnnnn) = text.split_once(':').ok_or_else(|| GatewayError::MalformedMessage {
        reason: format!("cannot pack {addr} into a 1FC9 device-id tuple"),
    })?;
    let type_id: u8 = tt
        .parse()
        .map_err(|_| GatewayError::MalformedMessage { reason: format!("bad type byte in {addr}") })?;
    let number: u32 = nnnnnn
        .parse()
        .map_err(|_| GatewayError::MalformedMessage { reason: format!("bad device number in {addr}") })?;
    Ok(format!("{type_id:02X}{number:04X}"))
}

/// Turn a [`BindingContext`]'s requested [`Intent`] into the `1FC9` command
/// the gateway should transmit on its behalf, impersonating `intent.src`.
fn intent_to_command(intent: &Intent) -> Result<Command, GatewayError> {
    let packed_self = pack_1fc9_device_id(intent.src)?;
    let mut payload = String::new();
    for code in &intent.codes {
        payload.push_str("00"); // domain_id
        payload.push_str(&code.to_string());
        payload.push_str(&packed_self);
    }
    Ok(Command::new(intent.verb, Code::_1FC9, intent.dst, payload)
        .with_src(intent.src)
        .with_wait_for_reply(false))
}

/// Re-lex a merged two-fragment array payload back into a [`Message`],
/// reconstructing the minimal wire frame `Packet::from_frame` needs (no
/// RSSI/SEQN on a synthetic frame).
fn merge_array_fragment(prev: &Message, this: &Message, now: DateTime<Utc>) -> Result<Message, GatewayError> {
    let combined_payload = format!("{}{}", prev.packet().payload(), this.packet().payload());
    let len = combined_payload.len() / 2;
    let frame = format!(
        "--- {} --- {} {} {} {} {len:03} {combined_payload}",
        this.verb(),
        this.src(),
        Address::NULL,
        this.dst(),
        this.code(),
    );
    let pkt = Packet::from_frame(&frame, now).map_err(|e| GatewayError::MalformedMessage { reason: e.to_string() })?;
    Message::build(pkt).map_err(|e| GatewayError::MalformedMessage { reason: e.to_string() })
}

fn parse_known_list(ids: &[String]) -> HashSet<Address> {
    ids.iter()
        .filter_map(|s| match Address::parse(s, false) {
            Ok(addr) => Some(addr),
            Err(err) => {
                tracing::warn!(id = %s, %err, "ignoring malformed known_list entry");
                None
            }
        })
        .collect()
}

fn dispatcher_config(config: &GatewayConfig) -> DispatcherConfig {
    DispatcherConfig {
        enable_eavesdrop: config.enable_eavesdrop,
        enforce_known_list: config.enforce_known_list,
        known_list: parse_known_list(&config.known_list),
        reduce_processing: config.reduce_processing,
        strict_mode: config.strict_mode,
        dev_mode: config.dev_mode,
    }
}

/// The gateway itself: owns the entity registry, the dispatcher, every open
/// binding context and schedule client, and the receiving end of the
/// protocol actor's packet feed. Not generic over the transport's concrete
/// port type -- that's erased behind [`ProtocolHandle`] once
/// [`Gateway::new`] has spawned the protocol actor.
pub struct Gateway {
    protocol: ProtocolHandle,
    protocol_task: JoinHandle<()>,
    hgi_id: Address,
    config: GatewayConfig,
    registry: Registry,
    dispatcher: Dispatcher,
    bindings: HashMap<Address, BindingContext>,
    schedules: HashMap<Address, ScheduleClient>,
    inbound: mpsc::UnboundedReceiver<Packet>,
    history: Vec<PersistedPacket>,
    pending_fragments: HashMap<(Address, Code), Message>,
}

impl Gateway {
    /// Open `port` as the radio, spawn the protocol actor, and register the
    /// forwarding handler that feeds [`Gateway::run`].
    pub async fn new<P: SerialPort + 'static>(
        port: P,
        transport_config: TransportConfig,
        hgi_id: Address,
        config: GatewayConfig,
    ) -> Result<Gateway, GatewayError> {
        let transport = Transport::open(port, transport_config).await?;
        let (mut protocol, handle) = Protocol::new(transport, hgi_id);

        let (tx, rx) = mpsc::unbounded_channel();
        let forward: HandlerFn = Box::new(move |pkt: &Packet| {
            let _ = tx.send(pkt.clone());
        });
        protocol.add_handler(forward, None);
        let protocol_task = tokio::spawn(protocol.run());

        Ok(Gateway {
            protocol: handle,
            protocol_task,
            hgi_id,
            dispatcher: Dispatcher::new(dispatcher_config(&config)),
            config,
            registry: Registry::new(),
            bindings: HashMap::new(),
            schedules: HashMap::new(),
            inbound: rx,
            history: Vec::new(),
            pending_fragments: HashMap::new(),
        })
    }

    pub fn hgi_id(&self) -> Address {
        self.hgi_id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Submit a command through the protocol layer, rejecting it outright
    /// when `disable_sending` is configured (§6: "raise on any outbound
    /// send").
    pub async fn send_command(&self, cmd: Command) -> Result<Packet, GatewayError> {
        if self.config.disable_sending {
            return Err(GatewayError::SendingDisabled);
        }
        Ok(self.protocol.send_cmd(cmd).await?)
    }

    /// A schedule client talking to `controller`, created on first use.
    /// `disable_sending` is enforced once, here, rather than per-command --
    /// a client handed out before the flag was set keeps the handle it was
    /// built with.
    pub fn schedule_client(&mut self, controller: Address) -> Result<&mut ScheduleClient, GatewayError> {
        if self.config.disable_sending {
            return Err(GatewayError::SendingDisabled);
        }
        Ok(self
            .schedules
            .entry(controller)
            .or_insert_with(|| ScheduleClient::new(self.protocol.clone(), controller)))
    }

    /// Register `own_id` as a binding supplicant and transmit its `1FC9`
    /// offer immediately.
    pub async fn begin_binding_supplicant(
        &mut self,
        own_id: Address,
        codes: impl IntoIterator<Item = Code>,
        now: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let mut ctx = BindingContext::start_supplicant(own_id, codes, now);
        let outcome = ctx.begin_offer(now);
        self.bindings.insert(own_id, ctx);
        self.apply_binding_outcome(own_id, outcome, now).await
    }

    /// Register `own_id` as a binding respondent, listening for a matching
    /// offer; no transmission happens until one arrives.
    pub fn listen_for_binding(&mut self, own_id: Address, codes: impl IntoIterator<Item = Code>, now: DateTime<Utc>) {
        self.bindings.insert(own_id, BindingContext::start_listening(own_id, codes, now));
    }

    pub fn binding_state(&self, own_id: Address) -> Option<ramses_binding::State> {
        self.bindings.get(&own_id).map(|ctx| ctx.state)
    }

    /// Pump inbound packets and run periodic housekeeping until the
    /// protocol actor's transport disconnects. Mirrors the source's
    /// single-threaded event loop (spec §5): one packet, or one
    /// housekeeping tick, handled to completion before the next is drawn.
    pub async fn run(&mut self) -> Result<(), GatewayError> {
        let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        housekeeping.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                pkt = self.inbound.recv() => {
                    match pkt {
                        Some(pkt) => self.handle_packet(pkt).await?,
                        None => return Ok(()),
                    }
                }
                _ = housekeeping.tick() => self.run_housekeeping(Utc::now()),
            }
        }
    }

    async fn handle_packet(&mut self, pkt: Packet) -> Result<(), GatewayError> {
        let now = pkt.dtm();
        self.history.push(PersistedPacket { dtm: now, frame: pkt.to_wire_frame() });

        let msg = match Message::build(pkt) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!(%err, "dropping packet that failed message parsing");
                return Ok(());
            }
        };

        let msg = self.fold_array_fragment(msg, now)?;

        let own_ids: Vec<Address> = self.bindings.keys().copied().collect();
        for own_id in own_ids {
            let Some(ctx) = self.bindings.get_mut(&own_id) else { continue };
            let outcome = ctx.on_message(&msg, now);
            self.apply_binding_outcome(own_id, outcome, now).await?;
        }

        if let Err(err) = self.dispatcher.process(&mut self.registry, msg) {
            tracing::warn!(%err, "dispatcher rejected message");
        }
        Ok(())
    }

    /// Fold a split `000A`/`22C9` array message into its predecessor when
    /// [`detect_array_fragment`] recognises the pair (S1); otherwise cache
    /// `msg` as the candidate first half of a future pair and pass it
    /// through unchanged.
    fn fold_array_fragment(&mut self, msg: Message, now: DateTime<Utc>) -> Result<Message, GatewayError> {
        if !matches!(msg.code(), Code::_000A | Code::_22C9) || msg.verb() != Verb::I {
            return Ok(msg);
        }
        let key = (msg.src(), msg.code());
        if let Some(prev) = self.pending_fragments.get(&key) {
            if detect_array_fragment(prev, &msg) {
                let merged = merge_array_fragment(prev, &msg, now)?;
                self.pending_fragments.remove(&key);
                return Ok(merged);
            }
        }
        self.pending_fragments.insert(key, msg.clone());
        Ok(msg)
    }

    async fn apply_binding_outcome(&mut self, own_id: Address, outcome: BindingOutcome, now: DateTime<Utc>) -> Result<(), GatewayError> {
        match outcome {
            BindingOutcome::Continue => Ok(()),
            BindingOutcome::Bound => {
                tracing::info!(%own_id, "binding complete");
                Ok(())
            }
            BindingOutcome::Unbound => {
                tracing::info!(%own_id, "binding did not complete");
                Ok(())
            }
            BindingOutcome::Send(intent) => {
                let cmd = intent_to_command(&intent)?;
                if let Err(err) = self.send_command(cmd).await {
                    tracing::warn!(%own_id, %err, "failed to transmit binding intent");
                    return Ok(());
                }
                let Some(ctx) = self.bindings.get_mut(&own_id) else { return Ok(()) };
                let follow_up = ctx.on_sent(now);
                Box::pin(self.apply_binding_outcome(own_id, follow_up, now)).await
            }
        }
    }

    /// Sweep every entity's expired cache entries and, unless
    /// `disable_discovery` is set, refresh known devices with a fire-and-
    /// forget `RQ/10E0`.
    fn run_housekeeping(&mut self, now: DateTime<Utc>) {
        let mut evicted = 0usize;
        for entity in self.registry.entities_mut() {
            evicted += entity.cache_mut().sweep_expired(now);
        }
        if evicted > 0 {
            tracing::debug!(evicted, "swept expired entity cache entries");
        }

        if self.config.disable_sending || self.config.disable_discovery {
            return;
        }
        for target in parse_known_list(&self.config.known_list) {
            let cmd = Command::new(Verb::RQ, Code::_10E0, target, DISCOVERY_PAYLOAD).with_wait_for_reply(false);
            let handle = self.protocol.clone();
            tokio::spawn(async move {
                if let Err(err) = handle.send_cmd(cmd).await {
                    tracing::debug!(%target, %err, "discovery probe failed");
                }
            });
        }
    }

    /// Replay a persisted packet log (§6/B) in `dtm` order, rebuilding the
    /// registry and dispatcher exactly as if every packet had just arrived
    /// in that order (P4: replay determinism regardless of on-disk batch
    /// order).
    pub fn load_state(&mut self, state: &PersistedState) -> Result<(), GatewayError> {
        self.config.known_list = state.known_list.clone();
        self.dispatcher = Dispatcher::new(dispatcher_config(&self.config));
        self.registry = Registry::new();
        self.pending_fragments.clear();

        for persisted in state.packets_by_dtm() {
            let pkt = Packet::from_frame(&persisted.frame, persisted.dtm)
                .map_err(|e| GatewayError::InvalidState { reason: e.to_string() })?;
            let msg = match Message::build(pkt) {
                Ok(msg) => msg,
                Err(err) => {
                    tracing::warn!(%err, "skipping unparseable packet while replaying state");
                    continue;
                }
            };
            let msg = self.fold_array_fragment(msg, persisted.dtm)?;
            if let Err(err) = self.dispatcher.process(&mut self.registry, msg) {
                tracing::warn!(%err, "dispatcher rejected replayed message");
            }
        }
        Ok(())
    }

    /// Snapshot the packet log observed so far as a [`PersistedState`]
    /// document.
    pub fn save_state(&self) -> PersistedState {
        PersistedState::new(self.history.clone(), self.config.known_list.clone())
    }

    /// Abort the protocol actor and stop running. Any commands still
    /// awaiting a reply fail with [`ramses_protocol::ProtocolError::ConnectionLost`].
    pub fn shutdown(self) {
        self.protocol_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramses_test_support::fixtures;
    use ramses_transport::TransportConfig;

    fn addr(s: &str) -> Address {
        Address::parse(s, false).unwrap()
    }

    async fn gateway() -> (Gateway, tokio::io::DuplexStream) {
        let (theirs, ours) = tokio::io::duplex(8192);
        let gw = Gateway::new(
            ours,
            TransportConfig { min_write_gap: std::time::Duration::ZERO },
            addr("18:013393"),
            GatewayConfig::default(),
        )
        .await
        .unwrap();
        (gw, theirs)
    }

    #[tokio::test]
    async fn inbound_frame_creates_and_routes_devices() {
        let (mut gw, mut radio) = gateway().await;
        use tokio::io::AsyncWriteExt;
        radio
            .write_all(format!("{}\r\n", fixtures::S3_RP_2309).as_bytes())
            .await
            .unwrap();

        let run = tokio::spawn(async move {
            let _ = tokio::time::timeout(std::time::Duration::from_millis(200), gw.run()).await;
            gw
        });
        let mut gw = run.await.unwrap();
        assert!(gw.registry().contains(ramses_entity::EntityId::Device(addr("01:145038"))));
        gw.shutdown();
    }

    #[test]
    fn pack_1fc9_device_id_round_trips_type_and_number() {
        let packed = pack_1fc9_device_id(addr("01:000001")).unwrap();
        assert_eq!(packed, "010001");
    }

    #[test]
    fn intent_to_command_encodes_one_bind_tuple_per_code() {
        let intent = Intent {
            verb: Verb::I,
            src: addr("04:056378"),
            dst: Address::BROADCAST,
            codes: vec![Code::_2309],
        };
        let cmd = intent_to_command(&intent).unwrap();
        assert_eq!(cmd.payload, "00230904DC3A");
    }
}
