use tokio::io::{AsyncRead, AsyncWrite};

/// Anything the transport can frame and write to: a real `tokio-serial`
/// port, or (in tests) an in-memory `tokio::io::DuplexStream` half.
///
/// Blanket-implemented rather than hand-implemented per concrete type, per
/// the "no generic-programming gymnastics" guidance -- the trait only
/// exists so [`crate::Transport`] doesn't need to be generic over two
/// different async-IO crates at once.
pub trait SerialPort: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPort for T {}
