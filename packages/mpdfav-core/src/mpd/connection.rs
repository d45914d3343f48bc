//! A single MPD socket: greeting, authentication and request/response.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::protocol::{parse_greeting, parse_line, Command, MpdError, MpdResult, ResponseLine};
use crate::protocol_constants::MPD_CONNECT_TIMEOUT_SECS;

/// Response body: the `key: value` pairs preceding `OK`.
pub type Pairs = Vec<(String, String)>;

/// One open protocol connection.
///
/// Generic over the transport so tests can drive it with an in-memory duplex.
pub struct Connection<S> {
    stream: BufReader<S>,
    version: String,
}

impl Connection<TcpStream> {
    /// Dials `addr`, reads the greeting and authenticates if a password is given.
    pub async fn open(addr: &str, password: Option<&str>) -> MpdResult<Self> {
        let connect = TcpStream::connect(addr);
        let stream = tokio::time::timeout(Duration::from_secs(MPD_CONNECT_TIMEOUT_SECS), connect)
            .await
            .map_err(|_| MpdError::ConnectTimeout(addr.to_string()))?
            .map_err(|source| MpdError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        let mut conn = Self::handshake(stream).await?;
        log::debug!("[Mpd] Connected to {} (protocol {})", addr, conn.version);

        if let Some(password) = password {
            conn.command(&Command::new("password").arg(password))
                .await?;
        }
        Ok(conn)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Reads the greeting from an already connected stream.
    pub async fn handshake(stream: S) -> MpdResult<Self> {
        let mut stream = BufReader::new(stream);
        let mut line = String::new();
        if stream.read_line(&mut line).await? == 0 {
            return Err(MpdError::Closed);
        }
        let version = parse_greeting(&line)?;
        Ok(Self { stream, version })
    }

    /// Protocol version announced in the greeting.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sends a command and collects its response pairs.
    pub async fn command(&mut self, cmd: &Command) -> MpdResult<Pairs> {
        self.send(cmd).await?;
        self.read_response().await
    }

    /// Sends a command without waiting for a response.
    ///
    /// Only used for `close`, which MPD answers by hanging up.
    pub async fn send(&mut self, cmd: &Command) -> MpdResult<()> {
        log::trace!("[Mpd] > {}", cmd.name());
        let writer = self.stream.get_mut();
        writer.write_all(cmd.to_wire().as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self) -> MpdResult<Pairs> {
        let mut pairs = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(MpdError::Closed);
            }
            match parse_line(&line)? {
                ResponseLine::Pair(key, value) => pairs.push((key, value)),
                ResponseLine::Ok => return Ok(pairs),
                ResponseLine::Ack(ack) => return Err(MpdError::Ack(ack)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn command_collects_pairs_until_ok() {
        let (client, mut server) = duplex(1024);
        server.write_all(b"OK MPD 0.23.5\n").await.unwrap();

        let mut conn = Connection::handshake(client).await.unwrap();
        assert_eq!(conn.version(), "0.23.5");

        server
            .write_all(b"volume: 40\nsongid: 12\nOK\n")
            .await
            .unwrap();
        let pairs = conn.command(&Command::new("status")).await.unwrap();

        assert_eq!(
            pairs,
            vec![
                ("volume".to_string(), "40".to_string()),
                ("songid".to_string(), "12".to_string()),
            ]
        );

        let mut sent = vec![0u8; 7];
        server.read_exact(&mut sent).await.unwrap();
        assert_eq!(&sent, b"status\n");
    }

    #[tokio::test]
    async fn ack_becomes_error() {
        let (client, mut server) = duplex(1024);
        server
            .write_all(b"OK MPD 0.23.5\nACK [50@0] {sticker} no such sticker\n")
            .await
            .unwrap();

        let mut conn = Connection::handshake(client).await.unwrap();
        let err = conn
            .command(&Command::new("sticker").word("get"))
            .await
            .unwrap_err();

        assert!(err.is_no_exist());
    }

    #[tokio::test]
    async fn hangup_mid_response_is_closed() {
        let (client, mut server) = duplex(1024);
        server.write_all(b"OK MPD 0.23.5\nsongid: 1\n").await.unwrap();

        let mut conn = Connection::handshake(client).await.unwrap();
        let server_task = tokio::spawn(async move {
            let mut sent = [0u8; 7];
            server.read_exact(&mut sent).await.unwrap();
        });

        let err = conn.command(&Command::new("status")).await.unwrap_err();
        assert!(matches!(err, MpdError::Closed));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn bad_greeting_is_rejected() {
        let (client, mut server) = duplex(64);
        server.write_all(b"SSH-2.0-OpenSSH\n").await.unwrap();

        assert!(matches!(
            Connection::handshake(client).await,
            Err(MpdError::Greeting(_))
        ));
    }
}
