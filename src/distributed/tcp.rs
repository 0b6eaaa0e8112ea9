//! TCP transport
//!
//! The controller binds a [`TcpReportListener`]; each walker process opens one
//! connection with a [`TcpReportSender`]. Every accepted connection gets its own
//! reader task, and all readers feed a single queue, so `recv_any` hands out
//! reports in whatever order walkers finish.
//!
//! A connection that fails the handshake never identified a walker, so it is
//! logged and dropped rather than counted. A walker whose report never arrives
//! leaves the controller waiting: there is no receive timeout.

use crate::distributed::protocol::*;
use crate::distributed::transport::{CompletionReport, ReportReceiver, ReportSender, Received};
use crate::error::ProtocolError;
use crate::group::Rank;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Controller end of the TCP transport
pub struct TcpReportListener {
    local_addr: SocketAddr,
    rx: mpsc::UnboundedReceiver<Received>,
    accept_task: JoinHandle<()>,
}

impl TcpReportListener {
    /// Bind the controller address and start accepting walker connections
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind controller address {}", addr))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read controller listen address")?;

        let (tx, rx) = mpsc::unbounded_channel();
        let accept_task = tokio::spawn(accept_loop(listener, tx));

        debug!(%local_addr, "controller listening");

        Ok(Self {
            local_addr,
            rx,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl ReportReceiver for TcpReportListener {
    async fn recv_any(&mut self) -> Result<Received> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Controller listener stopped accepting connections"))
    }
}

impl Drop for TcpReportListener {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(listener: TcpListener, tx: mpsc::UnboundedSender<Received>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept walker connection: {}", e);
                continue;
            }
        };

        debug!(%peer, "walker connected");
        let tx = tx.clone();
        tokio::spawn(async move {
            match read_report(stream).await {
                Ok(received) => {
                    debug!(%peer, rank = %received.source, "report received");
                    // Receiver gone means the controller already finished
                    let _ = tx.send(received);
                }
                Err(e) => warn!("Dropping connection from {}: {:#}", peer, e),
            }
        });
    }
}

/// Read HELLO then REPORT from one walker connection
async fn read_report(mut stream: TcpStream) -> Result<Received> {
    let hello = match read_message(&mut stream).await.context("Failed to read HELLO")? {
        Message::Hello(hello) => hello,
        other => {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "HELLO",
                actual: other.kind().to_string(),
            }
            .into())
        }
    };

    if hello.protocol_version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            actual: hello.protocol_version,
        }
        .into());
    }

    debug!(rank = %hello.rank, host = %hello.host, "walker identified");

    let report = match read_message(&mut stream)
        .await
        .with_context(|| format!("Failed to read REPORT from rank {}", hello.rank))?
    {
        Message::Report(report) => report,
        other => {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "REPORT",
                actual: other.kind().to_string(),
            }
            .into())
        }
    };

    if report.tag != REPORT_TAG {
        return Err(ProtocolError::UnexpectedTag(report.tag).into());
    }

    Ok(Received {
        source: hello.rank,
        report: CompletionReport {
            steps_taken: report.steps_taken,
        },
    })
}

/// Walker end of the TCP transport
///
/// Connecting performs the HELLO handshake; `send` delivers the single report
/// and closes the connection.
pub struct TcpReportSender {
    rank: Rank,
    stream: TcpStream,
}

impl TcpReportSender {
    /// Connect to the controller, retrying until `timeout` elapses
    ///
    /// The controller may still be starting when walkers launch, so refused
    /// connections are retried with a short backoff.
    pub async fn connect(addr: &str, rank: Rank, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_millis(20);

        let mut stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(e) => {
                    if Instant::now() >= deadline {
                        return Err(e).with_context(|| {
                            format!(
                                "Rank {} could not reach controller at {} within {:.1}s",
                                rank,
                                addr,
                                timeout.as_secs_f64()
                            )
                        });
                    }
                    debug!(%rank, "controller not reachable yet ({}), retrying", e);
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_millis(500));
                }
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(%rank, "failed to set TCP_NODELAY: {}", e);
        }

        let hello = HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            rank,
            host: local_host_name(),
        };
        write_message(&mut stream, &Message::Hello(hello))
            .await
            .with_context(|| format!("Rank {} failed to send HELLO", rank))?;

        Ok(Self { rank, stream })
    }
}

impl ReportSender for TcpReportSender {
    async fn send(mut self, report: CompletionReport) -> Result<()> {
        let msg = Message::Report(ReportMessage {
            tag: REPORT_TAG,
            steps_taken: report.steps_taken,
        });
        write_message(&mut self.stream, &msg)
            .await
            .with_context(|| format!("Rank {} failed to send REPORT", self.rank))?;

        self.stream
            .shutdown()
            .await
            .with_context(|| format!("Rank {} failed to close controller connection", self.rank))?;

        Ok(())
    }
}

fn local_host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_reports_fan_in_from_many_walkers() {
        let mut listener = TcpReportListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().to_string();

        let mut handles = Vec::new();
        for rank in (1..=4u32).rev() {
            let addr = addr.clone();
            handles.push(tokio::spawn(async move {
                let sender = TcpReportSender::connect(&addr, Rank(rank), Duration::from_secs(5))
                    .await
                    .unwrap();
                sender
                    .send(CompletionReport {
                        steps_taken: rank as u64 + 100,
                    })
                    .await
                    .unwrap();
            }));
        }

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let received = listener.recv_any().await.unwrap();
            assert_eq!(received.report.steps_taken, received.source.0 as u64 + 100);
            seen.insert(received.source);
        }
        assert_eq!(seen.len(), 4);

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_garbage_connection_is_not_counted() {
        let mut listener = TcpReportListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().to_string();

        let mut junk = TcpStream::connect(&addr).await.unwrap();
        junk.write_all(&[3, 0, 0, 0, 0xc1, 0xc1, 0xc1]).await.unwrap();
        junk.shutdown().await.unwrap();
        drop(junk);

        let sender = TcpReportSender::connect(&addr, Rank(1), Duration::from_secs(5))
            .await
            .unwrap();
        sender.send(CompletionReport { steps_taken: 5 }).await.unwrap();

        let received = listener.recv_any().await.unwrap();
        assert_eq!(received.source, Rank(1));
        assert_eq!(received.report.steps_taken, 5);
    }

    #[tokio::test]
    async fn test_version_mismatch_is_rejected() {
        let stream = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let client = tokio::spawn(async move {
                let mut stream = TcpStream::connect(addr).await.unwrap();
                let hello = Message::Hello(HelloMessage {
                    protocol_version: PROTOCOL_VERSION + 1,
                    rank: Rank(1),
                    host: "test".to_string(),
                });
                write_message(&mut stream, &hello).await.unwrap();
            });
            let (stream, _) = listener.accept().await.unwrap();
            client.await.unwrap();
            stream
        };

        let err = read_report(stream).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ProtocolError>(),
            Some(&ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: PROTOCOL_VERSION + 1,
            })
        );
    }

    #[tokio::test]
    async fn test_connect_times_out_without_controller() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let result = TcpReportSender::connect(&addr, Rank(1), Duration::from_millis(100)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_walker_connects_before_controller_binds() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let walker_addr = addr.clone();
        let walker = tokio::spawn(async move {
            let sender = TcpReportSender::connect(&walker_addr, Rank(2), Duration::from_secs(5))
                .await
                .unwrap();
            sender.send(CompletionReport { steps_taken: 12 }).await.unwrap();
        });

        sleep(Duration::from_millis(100)).await;
        let mut listener = TcpReportListener::bind(&addr).await.unwrap();

        let received = listener.recv_any().await.unwrap();
        assert_eq!(received.source, Rank(2));
        assert_eq!(received.report.steps_taken, 12);
        walker.await.unwrap();
    }
}
