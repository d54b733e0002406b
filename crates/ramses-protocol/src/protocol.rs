use crate::command::Command;
use crate::error::ProtocolError;
use crate::handler::{Filter, HandlerFn, HandlerId, HandlerRegistry};
use crate::inflight::{InFlight, Outcome};
use crate::priority::Priority;
use crate::queue::{CommandQueue, Prioritized};
use chrono::Utc;
use ramses_address::Address;
use ramses_packet::{Code, Packet, Verb};
use ramses_transport::{SerialPort, Transport};
use tokio::sync::{mpsc, oneshot};

/// The vendor "puzzle" alert (`7FFF`) emitted immediately before an
/// impersonated transmission, per §6/SPEC_FULL.md B. Fire-and-forget: no
/// QoS wait, no retry.
fn puzzle_frame(hgi_id: Address, seq: u32) -> Command {
    let payload = format!("00{seq:04X}696D706572736F6E6174696E67"); // "impersonating" in ASCII hex
    Command::new(Verb::I, Code::_7FFF, Address::BROADCAST, payload)
        .with_src(hgi_id)
        .with_wait_for_reply(false)
}

/// A command paired with the channel its caller is awaiting a result on.
/// Queued and popped as one unit so a command can never become separated
/// from the reply it owes someone.
struct Request {
    cmd: Command,
    reply: oneshot::Sender<Result<Packet, ProtocolError>>,
}

impl Prioritized for Request {
    fn priority(&self) -> Priority {
        self.cmd.priority
    }
}

/// A cloneable front-end for submitting commands to a running [`Protocol`].
/// Mirrors the teacher's `Sender<Message>`-as-bus worker pattern: callers
/// never touch the actor's owned state directly, they hand it a request
/// and await the matching reply.
#[derive(Clone)]
pub struct ProtocolHandle {
    cmd_tx: mpsc::UnboundedSender<Request>,
}

impl ProtocolHandle {
    /// Submit `cmd` and await its echo (or reply, if `cmd.wait_for_reply`).
    /// Cancellation-safe: dropping this future's result (or the future
    /// itself) drops the reply sender, which the actor notices and either
    /// evicts `cmd` from the queue (if it hasn't started transmitting) or
    /// abandons the retry loop for it (if it's already in flight -- any
    /// echo/reply already observed is still delivered to registered
    /// handlers regardless).
    pub async fn send_cmd(&self, cmd: Command) -> Result<Packet, ProtocolError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Request { cmd, reply: tx })
            .map_err(|_| ProtocolError::ConnectionLost)?;
        rx.await.map_err(|_| ProtocolError::Cancelled)?
    }
}

/// The cooperative single-writer QoS actor (component H). Owns the
/// transport exclusively; at most one command is ever mid-transmission
/// (P5), enforced by `inflight` being a single `Option`, never a
/// collection.
pub struct Protocol<P: SerialPort> {
    transport: Transport<P>,
    hgi_id: Address,
    queue: CommandQueue<Request>,
    inflight: Option<InFlight>,
    inflight_reply: Option<oneshot::Sender<Result<Packet, ProtocolError>>>,
    handlers: HandlerRegistry,
    cmd_rx: mpsc::UnboundedReceiver<Request>,
    suppress_impersonation_alerts: bool,
    puzzle_seq: u32,
}

impl<P: SerialPort> Protocol<P> {
    pub fn new(transport: Transport<P>, hgi_id: Address) -> (Protocol<P>, ProtocolHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let protocol = Protocol {
            transport,
            hgi_id,
            queue: CommandQueue::new(),
            inflight: None,
            inflight_reply: None,
            handlers: HandlerRegistry::new(),
            cmd_rx,
            suppress_impersonation_alerts: false,
            puzzle_seq: 0,
        };
        (protocol, ProtocolHandle { cmd_tx })
    }

    pub fn hgi_id(&self) -> Address {
        self.hgi_id
    }

    pub fn suppress_impersonation_alerts(&mut self, suppress: bool) {
        self.suppress_impersonation_alerts = suppress;
    }

    pub fn add_handler(&mut self, handler: HandlerFn, filter: Option<Filter>) -> HandlerId {
        self.handlers.add(handler, filter)
    }

    pub fn remove_handler(&mut self, id: HandlerId) {
        self.handlers.remove(id);
    }

    /// The transport's up-call: feed one received packet through the
    /// in-flight matcher and the handler fan-out. Exposed directly so
    /// tests (and [`ramses_test_support`]) can drive the actor without
    /// owning a real transport.
    pub fn pkt_received(&mut self, pkt: Packet) {
        let now = pkt.dtm();
        if let Some(inflight) = self.inflight.as_mut() {
            match inflight.on_packet(&pkt, self.hgi_id, now) {
                Outcome::Done(reply_pkt) => {
                    self.inflight = None;
                    if let Some(tx) = self.inflight_reply.take() {
                        let _ = tx.send(Ok(reply_pkt));
                    }
                }
                Outcome::Continue => {}
                Outcome::Retry | Outcome::Failed { .. } => unreachable!("on_packet never retries/fails"),
            }
        }
        self.handlers.dispatch(&pkt);
    }

    /// Run one iteration: drain queued requests, start the next command if
    /// nothing's in flight, then service either an inbound line or the
    /// in-flight deadline, whichever comes first. Returns `false` once the
    /// transport has disconnected and no caller remains to serve.
    pub async fn tick(&mut self) -> bool {
        self.drain_requests();

        if self.inflight.is_none() {
            if let Some(req) = self.next_ready_request() {
                self.start(req).await;
            }
        }

        match self.inflight.as_ref().map(|i| i.deadline) {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    line = self.transport.recv_line() => self.handle_inbound(line),
                    () = sleep_until_utc(deadline) => self.handle_deadline().await,
                }
                true
            }
            None => self.pump_inbound_or_wait().await,
        }
    }

    /// Keep calling [`Protocol::tick`] until the transport disconnects and
    /// every handle has been dropped.
    pub async fn run(mut self) {
        while self.tick().await {}
    }

    fn drain_requests(&mut self) {
        while let Ok(req) = self.cmd_rx.try_recv() {
            self.queue.push(req);
        }
    }

    fn next_ready_request(&mut self) -> Option<Request> {
        // Drop commands whose caller already cancelled (reply receiver
        // dropped) before they ever got a chance to transmit.
        while let Some(req) = self.queue.pop() {
            if req.reply.is_closed() {
                tracing::debug!(code = %req.cmd.code, "dropping cancelled command before transmit");
                continue;
            }
            return Some(req);
        }
        None
    }

    async fn start(&mut self, req: Request) {
        let Request { cmd, reply } = req;
        if cmd.is_impersonating(self.hgi_id) && !self.suppress_impersonation_alerts {
            let alert = puzzle_frame(self.hgi_id, self.puzzle_seq);
            self.puzzle_seq = self.puzzle_seq.wrapping_add(1);
            let frame = ramses_transport::substitute_generic_hgi_id(
                &alert.to_wire_frame(self.hgi_id),
                self.hgi_id,
                self.transport.is_evofw3(),
            );
            if let Err(err) = self.transport.send_line(&frame).await {
                tracing::warn!(%err, "failed to send impersonation alert");
            }
        }
        self.transmit(&cmd).await;
        self.inflight = Some(InFlight::start(cmd, Utc::now()));
        self.inflight_reply = Some(reply);
    }

    async fn transmit(&mut self, cmd: &Command) {
        let frame = ramses_transport::substitute_generic_hgi_id(
            &cmd.to_wire_frame(self.hgi_id),
            self.hgi_id,
            self.transport.is_evofw3(),
        );
        for i in 0..cmd.num_repeats {
            if let Err(err) = self.transport.send_line(&frame).await {
                tracing::warn!(%err, "transport write failed");
                return;
            }
            if i + 1 < cmd.num_repeats {
                tokio::time::sleep(cmd.gap_duration).await;
            }
        }
    }

    fn handle_inbound(&mut self, line: Result<Option<String>, ramses_transport::TransportError>) {
        match line {
            Ok(Some(raw)) => match Packet::from_frame(&raw, Utc::now()) {
                Ok(pkt) => self.pkt_received(pkt),
                Err(err) => tracing::warn!(%err, frame = %raw, "dropping malformed frame"),
            },
            Ok(None) => {}
            Err(_) => self.fail_inflight(ProtocolError::ConnectionLost),
        }
    }

    async fn handle_deadline(&mut self) {
        let Some(inflight) = self.inflight.as_mut() else { return };
        match inflight.on_deadline(Utc::now()) {
            Outcome::Retry => {
                let cmd = inflight.cmd.clone();
                self.transmit(&cmd).await;
            }
            Outcome::Failed { retries } => {
                self.inflight = None;
                if let Some(tx) = self.inflight_reply.take() {
                    let _ = tx.send(Err(ProtocolError::SendFailed { retries }));
                }
            }
            Outcome::Continue | Outcome::Done(_) => unreachable!("on_deadline never continues/completes"),
        }
    }

    fn fail_inflight(&mut self, err: ProtocolError) {
        self.inflight = None;
        if let Some(tx) = self.inflight_reply.take() {
            let _ = tx.send(Err(err));
        }
    }

    async fn pump_inbound_or_wait(&mut self) -> bool {
        tokio::select! {
            biased;
            req = self.cmd_rx.recv() => {
                match req {
                    Some(req) => {
                        self.queue.push(req);
                        true
                    }
                    None => false,
                }
            }
            line = self.transport.recv_line() => {
                self.handle_inbound(line);
                !self.transport.is_closed()
            }
        }
    }
}

async fn sleep_until_utc(deadline: chrono::DateTime<Utc>) {
    let now = Utc::now();
    let remaining = (deadline - now).to_std().unwrap_or_default();
    tokio::time::sleep(remaining).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramses_transport::TransportConfig;

    fn addr(s: &str) -> Address {
        Address::parse(s, false).unwrap()
    }

    async fn pair() -> (tokio::io::DuplexStream, tokio::io::DuplexStream) {
        tokio::io::duplex(4096)
    }

    #[tokio::test]
    async fn send_cmd_completes_on_echo_without_reply() {
        let (mut theirs, ours) = pair().await;
        let transport = Transport::open(ours, TransportConfig { min_write_gap: std::time::Duration::ZERO })
            .await
            .unwrap();
        let hgi = addr("18:013393");
        let (protocol, handle) = Protocol::new(transport, hgi);
        let run = tokio::spawn(protocol.run());

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let send_task = tokio::spawn({
            let handle = handle.clone();
            async move {
                handle
                    .send_cmd(
                        Command::new(Verb::I, Code::_30C9, addr("63:262142"), "0007D0").with_wait_for_reply(false),
                    )
                    .await
            }
        });

        // Drain the transmitted frame off the wire, then mirror it back as
        // the echo the radio would supply.
        let mut buf = [0u8; 256];
        let n = tokio::time::timeout(std::time::Duration::from_secs(1), theirs.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let sent = String::from_utf8_lossy(&buf[..n]);
        assert!(sent.contains("30C9"));

        let echo = "045  I --- 18:013393 --:------ 63:262142 30C9 003 0007D0\r\n";
        theirs.write_all(echo.as_bytes()).await.unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), send_task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        run.abort();
    }
}
