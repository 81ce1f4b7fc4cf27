//! Newline-delimited JSON client for the bank

use crate::{Result, TellerError};
use ledger_core::{Request, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Bank address
#[derive(Debug, Clone)]
pub struct BankClient {
    addr: String,
}

impl BankClient {
    /// Create client for `addr` (`host:port`)
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Open a connection
    pub async fn connect(&self) -> Result<Connection> {
        let stream = TcpStream::connect(&self.addr).await?;
        tracing::debug!(addr = %self.addr, "Connected to bank");
        Ok(Connection::new(stream))
    }

    /// Send one request on a fresh connection
    pub async fn send(&self, request: &Request) -> Result<Response> {
        self.connect().await?.send(request).await
    }
}

/// Open connection to the bank; requests are answered in order
#[derive(Debug)]
pub struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Connection {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// Send a request and wait for its response
    pub async fn send(&mut self, request: &Request) -> Result<Response> {
        let mut bytes = serde_json::to_vec(request)?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;

        let line = self
            .lines
            .next_line()
            .await?
            .ok_or(TellerError::ConnectionClosed)?;
        Ok(serde_json::from_str(&line)?)
    }
}
