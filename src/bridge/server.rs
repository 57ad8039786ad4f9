use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use super::codec::{self, Decoded, FrameBuffer};
use super::protocol::{ErrorKind, Response};
use super::scheduler::MainThreadScheduler;

const READ_CHUNK: usize = 8192;

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Peer closed the socket
    Closed,
    /// A malformed frame terminated the connection
    DecodeError,
}

/// TCP listener that feeds controller commands to the main-thread scheduler.
///
/// Connections are served one at a time. While one is active, further
/// connection attempts wait in the listen backlog and are accepted in order
/// once it closes, so an in-flight command is never interleaved with another
/// controller's traffic.
pub struct BridgeServer {
    listener: TcpListener,
    scheduler: MainThreadScheduler,
    max_frame_bytes: usize,
}

impl BridgeServer {
    /// Bind to `host:port`. Port 0 picks a free port.
    pub async fn bind(
        host: &str,
        port: u16,
        scheduler: MainThreadScheduler,
        max_frame_bytes: usize,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        info!(addr = %listener.local_addr()?, "bridge listening");
        Ok(Self {
            listener,
            scheduler,
            max_frame_bytes,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections sequentially until the task is dropped.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                    continue;
                }
            };
            info!(%peer, "controller connected");
            match serve_connection(stream, &self.scheduler, self.max_frame_bytes).await {
                Ok(end) => info!(%peer, ?end, "controller disconnected"),
                Err(e) => warn!(%peer, error = %e, "connection failed"),
            }
        }
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("bridge stopped");
                Ok(())
            }
        }
    }
}

/// Serve one connection: strictly one command in flight at a time.
///
/// The next frame is not decoded until the previous response has been
/// written in full.
pub async fn serve_connection(
    mut stream: TcpStream,
    scheduler: &MainThreadScheduler,
    max_frame_bytes: usize,
) -> io::Result<ConnectionEnd> {
    let mut buffer = FrameBuffer::new(max_frame_bytes);
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match buffer.next_frame() {
            Decoded::Frame(command) => {
                debug!(command = %command.name, "received");
                let response = scheduler.submit(command).await;
                write_response(&mut stream, &response).await?;
            }
            Decoded::NeedMoreBytes => {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    if !buffer.is_empty() {
                        debug!(leftover = buffer.len(), "peer closed mid-frame");
                    }
                    return Ok(ConnectionEnd::Closed);
                }
                buffer.extend(&chunk[..n]);
            }
            Decoded::Error(e) => {
                warn!(error = %e, "dropping connection on malformed frame");
                let response = Response::err(ErrorKind::DecodeError, e.to_string());
                // Best effort: the peer may already be gone
                let _ = write_response(&mut stream, &response).await;
                let _ = stream.shutdown().await;
                return Ok(ConnectionEnd::DecodeError);
            }
        }
    }
}

async fn write_response(stream: &mut TcpStream, response: &Response) -> io::Result<()> {
    let bytes = codec::encode_response(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    stream.write_all(&bytes).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::Command;
    use serde_json::json;
    use std::thread;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};

    /// Host stand-in: drains the scheduler on a plain thread until closed
    fn spawn_echo_host(scheduler: MainThreadScheduler) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            while !scheduler.is_closed() {
                if !scheduler.run_once(|cmd| Response::ok(json!({"ran": cmd.name}))) {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        })
    }

    async fn start_server(scheduler: MainThreadScheduler) -> SocketAddr {
        let server = BridgeServer::bind("127.0.0.1", 0, scheduler, 1 << 20)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    async fn read_response(reader: &mut BufReader<TcpStream>) -> Response {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn server_binds_ephemeral_port() {
        let scheduler = MainThreadScheduler::new();
        let server = BridgeServer::bind("127.0.0.1", 0, scheduler, 1024)
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn server_answers_each_command_in_order() {
        let scheduler = MainThreadScheduler::new();
        let host = spawn_echo_host(scheduler.clone());
        let addr = start_server(scheduler.clone()).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);

        // Both frames in a single write: the second must wait for the first response
        reader
            .get_mut()
            .write_all(b"{\"type\":\"first\"}\n{\"type\":\"second\"}\n")
            .await
            .unwrap();

        let r1 = read_response(&mut reader).await;
        let r2 = read_response(&mut reader).await;
        assert_eq!(r1.result, Some(json!({"ran": "first"})));
        assert_eq!(r2.result, Some(json!({"ran": "second"})));

        scheduler.shutdown();
        host.join().unwrap();
    }

    #[tokio::test]
    async fn server_handles_frame_split_across_writes() {
        let scheduler = MainThreadScheduler::new();
        let host = spawn_echo_host(scheduler.clone());
        let addr = start_server(scheduler.clone()).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);

        let frame = codec::encode_command(&Command::new("get_scene_info")).unwrap();
        let (head, tail) = frame.split_at(7);
        reader.get_mut().write_all(head).await.unwrap();
        reader.get_mut().flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        reader.get_mut().write_all(tail).await.unwrap();

        let response = read_response(&mut reader).await;
        assert_eq!(response.result, Some(json!({"ran": "get_scene_info"})));

        scheduler.shutdown();
        host.join().unwrap();
    }

    #[tokio::test]
    async fn malformed_frame_closes_connection_and_server_keeps_accepting() {
        let scheduler = MainThreadScheduler::new();
        let host = spawn_echo_host(scheduler.clone());
        let addr = start_server(scheduler.clone()).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);
        reader.get_mut().write_all(b"not valid json\n").await.unwrap();

        let response = read_response(&mut reader).await;
        assert_eq!(response.kind, Some(ErrorKind::DecodeError));

        // Connection is closed after the error frame
        let mut rest = String::new();
        let n = reader.read_line(&mut rest).await.unwrap();
        assert_eq!(n, 0);

        // A fresh connection works
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);
        reader.get_mut().write_all(b"{\"type\":\"ping\"}").await.unwrap();
        assert!(read_response(&mut reader).await.is_success());

        scheduler.shutdown();
        host.join().unwrap();
    }

    #[tokio::test]
    async fn second_connection_is_queued_until_first_closes() {
        let scheduler = MainThreadScheduler::new();
        let host = spawn_echo_host(scheduler.clone());
        let addr = start_server(scheduler.clone()).await;

        let first = TcpStream::connect(addr).await.unwrap();
        let mut first = BufReader::new(first);
        first.get_mut().write_all(b"{\"type\":\"one\"}\n").await.unwrap();
        assert_eq!(
            read_response(&mut first).await.result,
            Some(json!({"ran": "one"}))
        );

        let second = TcpStream::connect(addr).await.unwrap();
        let mut second = BufReader::new(second);
        second.get_mut().write_all(b"{\"type\":\"two\"}\n").await.unwrap();

        // The queued controller gets nothing while the first is still connected
        let mut line = String::new();
        let waited =
            tokio::time::timeout(Duration::from_millis(100), second.read_line(&mut line)).await;
        assert!(waited.is_err());

        // First connection is still served normally
        first.get_mut().write_all(b"{\"type\":\"three\"}\n").await.unwrap();
        assert_eq!(
            read_response(&mut first).await.result,
            Some(json!({"ran": "three"}))
        );

        drop(first);
        assert_eq!(
            read_response(&mut second).await.result,
            Some(json!({"ran": "two"}))
        );

        scheduler.shutdown();
        host.join().unwrap();
    }
}
