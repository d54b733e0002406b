use crate::error::TransportError;
use crate::port::SerialPort;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::codec::{Framed, LinesCodec};

/// Serial port parameters the gateway opens the port with: 115200 8N1,
/// per spec §4.G.
pub const BAUD_RATE: u32 = 115_200;

/// How long [`Transport::open`] waits for an evofw3 boot banner before
/// assuming native HGI80 firmware.
const BANNER_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Minimum gap enforced between successive outbound writes. Defaults to
    /// 200ms; tests set this to zero to avoid slowing down the suite.
    pub min_write_gap: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            min_write_gap: Duration::from_millis(200),
        }
    }
}

/// Cooperative pause/resume signal shared between the transport and
/// whatever owns backpressure decisions (the protocol layer).
#[derive(Debug, Default)]
struct PauseGate {
    paused: AtomicBool,
    notify: Notify,
}

impl PauseGate {
    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Owns the serial port: reads `\r\n`-framed lines up, writes outbound
/// frames one at a time with a minimum inter-write gap.
///
/// `close` is terminal and idempotent: once closed, every subsequent
/// `recv_line`/`send_line` call returns [`TransportError::Disconnected`]
/// without touching the underlying port again.
pub struct Transport<P: SerialPort> {
    framed: Framed<P, LinesCodec>,
    config: TransportConfig,
    last_write: Option<Instant>,
    is_evofw3: bool,
    closed: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
}

impl<P: SerialPort> Transport<P> {
    /// Wrap an already-open port, probing its first line for the evofw3
    /// boot banner (`"# evofw3"` or similar, matched case-insensitively)
    /// within [`BANNER_PROBE_TIMEOUT`]. Absence of a banner inside the
    /// window is treated as native HGI80 firmware, not as an error.
    pub async fn open(port: P, config: TransportConfig) -> Result<Transport<P>, TransportError> {
        let mut framed = Framed::new(port, LinesCodec::new_with_max_length(4096));
        let is_evofw3 = match tokio::time::timeout(BANNER_PROBE_TIMEOUT, framed.next()).await {
            Ok(Some(Ok(line))) => line.to_ascii_lowercase().contains("evofw3"),
            _ => false,
        };
        if is_evofw3 {
            tracing::info!("evofw3 boot banner detected");
        } else {
            tracing::info!("no evofw3 banner observed within probe window; assuming HGI80 firmware");
        }
        Ok(Transport {
            framed,
            config,
            last_write: None,
            is_evofw3,
            closed: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(PauseGate::default()),
        })
    }

    pub fn is_evofw3(&self) -> bool {
        self.is_evofw3
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Cooperative backpressure signal: readers observe this and stop
    /// pulling new lines; the protocol layer awaits resume before issuing
    /// further `send_cmd`s.
    pub fn pause(&self) {
        self.gate.pause();
    }

    pub fn resume(&self) {
        self.gate.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Terminal, idempotent shutdown: marks the transport closed so every
    /// further call fails fast with [`TransportError::Disconnected`]
    /// without re-touching the underlying port.
    pub fn close(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::warn!("transport closed");
            self.gate.resume(); // unblock anyone waiting on pause
        }
    }

    /// Read the next `\r\n`-terminated line, honoring the pause gate.
    pub async fn recv_line(&mut self) -> Result<Option<String>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Disconnected);
        }
        self.gate.wait_if_paused().await;
        match self.framed.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(err)) => {
                self.close();
                Err(TransportError::Framing { reason: err.to_string() })
            }
            None => {
                self.close();
                Err(TransportError::Disconnected)
            }
        }
    }

    /// Write one outbound frame, first sleeping out any remainder of the
    /// minimum inter-write gap since the previous write.
    ///
    /// Per P7/§8, substitution of the generic HGI ID (`18:000730`) for the
    /// gateway's real ID is the caller's (protocol layer's) job -- this
    /// just writes whatever frame string it is given.
    pub async fn send_line(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Disconnected);
        }
        if let Some(last) = self.last_write {
            let elapsed = last.elapsed();
            if elapsed < self.config.min_write_gap {
                tokio::time::sleep(self.config.min_write_gap - elapsed).await;
            }
        }
        let result = self.framed.send(frame.to_owned()).await;
        self.last_write = Some(Instant::now());
        result.map_err(|err| {
            self.close();
            TransportError::Framing { reason: err.to_string() }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pair() -> (tokio::io::DuplexStream, tokio::io::DuplexStream) {
        tokio::io::duplex(4096)
    }

    #[tokio::test]
    async fn open_detects_evofw3_banner() {
        let (mut theirs, ours) = pair().await;
        use tokio::io::AsyncWriteExt;
        theirs.write_all(b"# evofw3 v0.7.1\r\n").await.unwrap();

        let transport = Transport::open(ours, TransportConfig::default()).await.unwrap();
        assert!(transport.is_evofw3());
    }

    #[tokio::test]
    async fn open_without_banner_assumes_hgi80() {
        let (_theirs, ours) = pair().await;
        let transport = Transport::open(ours, TransportConfig::default()).await.unwrap();
        assert!(!transport.is_evofw3());
    }

    #[tokio::test]
    async fn send_line_enforces_minimum_gap() {
        let (mut theirs, ours) = pair().await;
        let config = TransportConfig {
            min_write_gap: Duration::from_millis(50),
        };
        let mut transport = Transport::open(ours, config).await.unwrap();

        let start = Instant::now();
        transport.send_line("frame one").await.unwrap();
        transport.send_line("frame two").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));

        use tokio::io::AsyncReadExt;
        let mut buf = [0u8; 64];
        let n = theirs.read(&mut buf).await.unwrap();
        assert!(n > 0);
    }

    #[tokio::test]
    async fn recv_line_fails_after_close() {
        let (_theirs, ours) = pair().await;
        let mut transport = Transport::open(ours, TransportConfig::default()).await.unwrap();
        transport.close();
        transport.close(); // idempotent
        assert!(matches!(
            transport.recv_line().await,
            Err(TransportError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn pause_blocks_recv_until_resume() {
        let (mut theirs, ours) = pair().await;
        let mut transport = Transport::open(ours, TransportConfig::default()).await.unwrap();
        transport.pause();

        use tokio::io::AsyncWriteExt;
        theirs.write_all(b"045  I --- 01:145038 --:------ 01:145038 30C9 003 0007D0\r\n").await.unwrap();

        let recv = tokio::time::timeout(Duration::from_millis(50), transport.recv_line()).await;
        assert!(recv.is_err(), "recv should still be blocked while paused");

        transport.resume();
        let line = tokio::time::timeout(Duration::from_millis(200), transport.recv_line())
            .await
            .unwrap()
            .unwrap();
        assert!(line.unwrap().contains("30C9"));
    }
}
