//! TCP front end of the bank
//!
//! Newline-delimited JSON: each line from a teller is one [`Request`], each
//! line back is one [`Response`]. A connection may carry any number of
//! requests. Malformed input, oversized lines and failed authentication end
//! the connection after the error reply.

use crate::actor::LedgerHandle;
use crate::protocol::{Request, Response, MALFORMED_REQUEST_MSG};
use crate::{Error, Result};
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::Instrument;
use uuid::Uuid;

/// Longest request line accepted, in bytes (excluding the newline)
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Accept connections until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, handle: LedgerHandle, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Bank listening");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => spawn_connection(stream, peer, handle.clone()),
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            },
            _ = &mut shutdown => {
                tracing::info!("No longer accepting connections");
                break;
            }
        }
    }

    Ok(())
}

fn spawn_connection(stream: TcpStream, peer: SocketAddr, handle: LedgerHandle) {
    let span = tracing::info_span!("connection", id = %Uuid::new_v4(), %peer);

    tokio::spawn(
        async move {
            tracing::debug!("Connection opened");
            match handle_connection(stream, handle).await {
                Ok(()) => tracing::debug!("Connection closed"),
                Err(e) => tracing::debug!("Connection dropped: {}", e),
            }
        }
        .instrument(span),
    );
}

async fn handle_connection(stream: TcpStream, handle: LedgerHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut frames = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_REQUEST_BYTES));

    while let Some(frame) = frames.next().await {
        let line = match frame {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                tracing::warn!(limit = MAX_REQUEST_BYTES, "Request line too long");
                reject_malformed(&handle, &mut writer).await?;
                break;
            }
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!("Request is not valid UTF-8");
                reject_malformed(&handle, &mut writer).await?;
                break;
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };

        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<Request>(&line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Malformed request: {}", e);
                reject_malformed(&handle, &mut writer).await?;
                break;
            }
        };

        let cmd = request.message.cmd();
        let (response, close) = match handle.submit(request).await {
            Ok(response) => (response, false),
            Err(e) => {
                tracing::debug!(cmd, reason = e.reason(), "Replying with error");
                let close = matches!(e, Error::Authentication);
                (Response::from_error(&e), close)
            }
        };

        write_response(&mut writer, &response).await?;
        if close {
            break;
        }
    }

    Ok(())
}

async fn reject_malformed<W>(handle: &LedgerHandle, writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    handle.metrics().record_rejection("malformed");
    write_response(writer, &Response::error(MALFORMED_REQUEST_MSG)).await
}

/// Write one response line
pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(response)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::spawn_ledger_actor;
    use crate::crypto::KeyPair;
    use crate::ledger::Ledger;
    use crate::metrics::Metrics;
    use crate::processor::CommandProcessor;
    use crate::protocol::Message;
    use crate::store::{EncryptedStore, StoreKey};
    use rust_decimal::Decimal;
    use tempfile::TempDir;
    use tokio::io::{AsyncBufReadExt, BufReader, Lines};
    use tokio::net::tcp::OwnedReadHalf;
    use tokio::sync::oneshot;

    struct Bank {
        addr: SocketAddr,
        stop: Option<oneshot::Sender<()>>,
        _dir: TempDir,
    }

    async fn start() -> Bank {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedStore::new(dir.path().join("log.json"), StoreKey::generate());
        let ledger = Ledger::open(store, KeyPair::generate()).unwrap();
        let processor = CommandProcessor::new(ledger, Metrics::new().unwrap());
        let (handle, _task) = spawn_ledger_actor(processor, 16);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, handle, async {
            let _ = stopped.await;
        }));

        Bank {
            addr,
            stop: Some(stop),
            _dir: dir,
        }
    }

    struct Conn {
        lines: Lines<BufReader<OwnedReadHalf>>,
        writer: tokio::net::tcp::OwnedWriteHalf,
    }

    impl Conn {
        async fn open(addr: SocketAddr) -> Self {
            let (reader, writer) = TcpStream::connect(addr).await.unwrap().into_split();
            Self {
                lines: BufReader::new(reader).lines(),
                writer,
            }
        }

        async fn send_raw(&mut self, line: &str) -> Option<Response> {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
            let reply = self.lines.next_line().await.unwrap()?;
            Some(serde_json::from_str(&reply).unwrap())
        }

        async fn send(&mut self, request: &Request) -> Response {
            let line = serde_json::to_string(request).unwrap();
            self.send_raw(&line).await.unwrap()
        }

        async fn is_closed(&mut self) -> bool {
            matches!(self.lines.next_line().await, Ok(None) | Err(_))
        }
    }

    #[tokio::test]
    async fn test_multiple_requests_per_connection() {
        let bank = start().await;
        let mut conn = Conn::open(bank.addr).await;

        let (customer, h0) = match conn.send(&Request::register()).await {
            Response::Register {
                customer_secret,
                hash,
                ..
            } => (customer_secret.to_keypair().unwrap(), hash),
            other => panic!("unexpected response: {:?}", other),
        };

        let deposit = Request::signed(
            Message::Deposit {
                customer_id: customer.customer_id(),
                amount: Decimal::new(100, 0),
                last_hash: Some(h0),
            },
            &customer,
        );
        match conn.send(&deposit).await {
            Response::Balance {
                balance,
                customer_id,
                hash,
            } => {
                assert_eq!(balance, Decimal::new(100, 0));
                assert_eq!(customer_id, Some(customer.customer_id()));
                assert!(hash.is_some());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_connection() {
        let bank = start().await;
        let mut conn = Conn::open(bank.addr).await;

        let reply = conn
            .send_raw(r#"{"message":{"cmd":"transfer"}}"#)
            .await
            .unwrap();
        assert_eq!(reply, Response::error("Unknown command"));

        assert!(matches!(
            conn.send(&Request::register()).await,
            Response::Register { .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_request_closes_connection() {
        let bank = start().await;
        let mut conn = Conn::open(bank.addr).await;

        let reply = conn.send_raw("{not json").await.unwrap();
        assert_eq!(reply, Response::error(MALFORMED_REQUEST_MSG));
        assert!(conn.is_closed().await);
    }

    #[tokio::test]
    async fn test_oversized_line_closes_connection() {
        let bank = start().await;
        let mut conn = Conn::open(bank.addr).await;

        let flood = vec![b'a'; MAX_REQUEST_BYTES + 1];
        conn.writer.write_all(&flood).await.unwrap();

        let reply = conn.lines.next_line().await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<Response>(&reply).unwrap(),
            Response::error(MALFORMED_REQUEST_MSG)
        );
        assert!(conn.is_closed().await);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_parsed() {
        let bank = start().await;
        let mut conn = Conn::open(bank.addr).await;

        // Valid JSON padded with whitespace up to the limit
        let request = serde_json::to_string(&Request::register()).unwrap();
        let padded = format!("{}{}", request, " ".repeat(MAX_REQUEST_BYTES - request.len()));

        assert!(matches!(
            conn.send_raw(&padded).await.unwrap(),
            Response::Register { .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_authentication_closes_connection() {
        let bank = start().await;
        let mut conn = Conn::open(bank.addr).await;

        let customer = match conn.send(&Request::register()).await {
            Response::Register {
                customer_secret, ..
            } => customer_secret.to_keypair().unwrap(),
            other => panic!("unexpected response: {:?}", other),
        };

        let stale = Request::signed(
            Message::Balance {
                customer_id: customer.customer_id(),
                last_hash: None,
            },
            &customer,
        );
        assert_eq!(
            conn.send(&stale).await,
            Response::error("Authentication failed")
        );
        assert!(conn.is_closed().await);
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let mut bank = start().await;
        if let Some(stop) = bank.stop.take() {
            stop.send(()).unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(TcpStream::connect(bank.addr).await.is_err());
    }
}
