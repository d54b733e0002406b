//! An in-memory "radio": a `tokio::io::duplex` pair where one half is
//! handed to [`ramses_transport::Transport`] (it satisfies `SerialPort`
//! via the blanket impl) and the other, [`FakeRadio`], is driven directly
//! by the test to assert on transmitted frames and inject inbound ones.
//!
//! Mirrors the teacher's `MockWsServer`/`MockWsClient` split: a real
//! component under test talking to a thin, test-only peer standing in for
//! the other end of the wire.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

/// Generous enough that a handful of queued test frames never blocks on
/// a full buffer.
const CHANNEL_CAPACITY: usize = 8192;

pub struct FakeRadio {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl FakeRadio {
    /// A connected pair: the returned `DuplexStream` is the half to open a
    /// real [`ramses_transport::Transport`] on; `FakeRadio` is the other
    /// end, played by the test.
    pub fn pair() -> (FakeRadio, DuplexStream) {
        let (theirs, ours) = tokio::io::duplex(CHANNEL_CAPACITY);
        let (read_half, write_half) = tokio::io::split(theirs);
        (
            FakeRadio {
                reader: BufReader::new(read_half),
                writer: write_half,
            },
            ours,
        )
    }

    /// Inject one inbound frame, as if received off the air. Appends the
    /// CRLF line terminator the wire format requires.
    pub async fn inject(&mut self, frame: &str) {
        self.writer
            .write_all(format!("{frame}\r\n").as_bytes())
            .await
            .expect("fake radio write failed");
    }

    /// Read the next frame the transport under test wrote, with its CRLF
    /// terminator stripped.
    pub async fn next_transmitted(&mut self) -> String {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .await
            .expect("fake radio read failed");
        line.trim_end_matches(['\r', '\n']).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramses_transport::{Transport, TransportConfig};

    #[tokio::test]
    async fn injected_frame_is_observed_by_transport() {
        let (mut radio, ours) = FakeRadio::pair();
        let mut transport = Transport::open(ours, TransportConfig { min_write_gap: std::time::Duration::ZERO })
            .await
            .unwrap();
        radio.inject("045  I --- 01:145038 --:------ 01:145038 30C9 003 0007D0").await;
        let line = transport.recv_line().await.unwrap().unwrap();
        assert!(line.contains("30C9"));
    }

    #[tokio::test]
    async fn transport_write_is_observed_by_radio() {
        let (mut radio, ours) = FakeRadio::pair();
        let mut transport = Transport::open(ours, TransportConfig { min_write_gap: std::time::Duration::ZERO })
            .await
            .unwrap();
        transport.send_line("RQ --- 18:013393 01:145038 --:------ 2309 001 00").await.unwrap();
        let line = radio.next_transmitted().await;
        assert!(line.contains("2309"));
    }
}
