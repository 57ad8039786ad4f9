use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::codec;
use super::protocol::{Command, Response};

/// Controller-side client for a running bridge
#[derive(Debug)]
pub struct BridgeClient {
    reader: BufReader<TcpStream>,
}

impl BridgeClient {
    /// Connect to a bridge at the given address
    pub async fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            reader: BufReader::new(stream),
        })
    }

    /// Send a command to the bridge
    pub async fn send_command(&mut self, command: &Command) -> io::Result<()> {
        let bytes = codec::encode_command(command)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.reader.get_mut().write_all(&bytes).await?;
        self.reader.get_mut().flush().await?;

        Ok(())
    }

    /// Receive one response from the bridge
    pub async fn recv_response(&mut self) -> io::Result<Response> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "bridge closed connection",
            ));
        }

        serde_json::from_str(&line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Send a command and wait for its response
    pub async fn call(&mut self, command: &Command) -> io::Result<Response> {
        self.send_command(command).await?;
        self.recv_response().await
    }
}
