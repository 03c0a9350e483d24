//! Per-connection read and write loops.
//!
//! Both pumps are generic over the socket halves so they can be driven by
//! an axum `WebSocket` in production and by in-memory channels in tests.

use std::fmt::Display;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{sleep_until, timeout, Instant, MissedTickBehavior};

use crate::config::WebSocketConfig;
use crate::hub::{OutboundReceiver, Payload};

/// Upper bound on payloads coalesced into a single flush
const MAX_BATCH: usize = 64;

/// Timing knobs for one connection
#[derive(Debug, Clone, Copy)]
pub struct PumpConfig {
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub ping_interval: Duration,
}

impl From<&WebSocketConfig> for PumpConfig {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            write_timeout: config.write_timeout(),
            read_timeout: config.read_timeout(),
            ping_interval: config.ping_interval(),
        }
    }
}

/// Why a pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The hub dropped the outbound queue
    QueueClosed,
    WriteFailed,
    WriteTimeout,
    /// No pong arrived within the read timeout
    ReadTimeout,
    PeerClosed,
    ReadFailed,
    StreamEnded,
    /// The pump task panicked or was cancelled
    Aborted,
}

impl PumpExit {
    /// Label used for the closed-connection metric
    pub fn as_str(&self) -> &'static str {
        match self {
            PumpExit::QueueClosed => "queue_closed",
            PumpExit::WriteFailed => "write_failed",
            PumpExit::WriteTimeout => "write_timeout",
            PumpExit::ReadTimeout => "read_timeout",
            PumpExit::PeerClosed => "peer_closed",
            PumpExit::ReadFailed => "read_failed",
            PumpExit::StreamEnded => "stream_ended",
            PumpExit::Aborted => "aborted",
        }
    }
}

fn text_frame(payload: &Payload) -> Message {
    Message::Text(payload.as_ref().into())
}

/// Drain the outbound queue into the socket.
///
/// Every payload becomes its own text frame. Payloads already waiting in
/// the queue are fed behind the first one and flushed together, and the
/// whole batch must complete within the write timeout. A ping goes out
/// every ping interval. When the hub closes the queue a close frame is
/// sent before returning.
pub async fn write_pump<S>(mut sink: S, mut rx: OutboundReceiver, config: PumpConfig) -> PumpExit
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ping = tokio::time::interval_at(
        Instant::now() + config.ping_interval,
        config.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            payload = rx.recv() => {
                let Some(payload) = payload else {
                    if timeout(config.write_timeout, sink.send(Message::Close(None)))
                        .await
                        .is_err()
                    {
                        tracing::debug!("Timed out sending close frame");
                    }
                    return PumpExit::QueueClosed;
                };

                match timeout(config.write_timeout, write_batch(&mut sink, payload, &mut rx)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket write failed");
                        return PumpExit::WriteFailed;
                    }
                    Err(_) => return PumpExit::WriteTimeout,
                }
            }
            _ = ping.tick() => {
                match timeout(config.write_timeout, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket ping failed");
                        return PumpExit::WriteFailed;
                    }
                    Err(_) => return PumpExit::WriteTimeout,
                }
            }
        }
    }
}

async fn write_batch<S>(
    sink: &mut S,
    first: Payload,
    rx: &mut OutboundReceiver,
) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    sink.feed(text_frame(&first)).await?;

    for _ in 1..MAX_BATCH {
        match rx.try_recv() {
            Ok(next) => sink.feed(text_frame(&next)).await?,
            Err(_) => break,
        }
    }

    sink.flush().await
}

/// Consume inbound frames until the peer goes quiet or away.
///
/// Only pongs push the deadline forward. Anything else the client sends is
/// read and dropped.
pub async fn read_pump<St, E>(mut stream: St, read_timeout: Duration) -> PumpExit
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + read_timeout;

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return PumpExit::ReadTimeout,
            frame = stream.next() => match frame {
                Some(Ok(Message::Pong(_))) => {
                    deadline = Instant::now() + read_timeout;
                }
                Some(Ok(Message::Close(_))) => return PumpExit::PeerClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket read failed");
                    return PumpExit::ReadFailed;
                }
                None => return PumpExit::StreamEnded,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc as fmpsc;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::sync::mpsc;

    fn config() -> PumpConfig {
        PumpConfig {
            write_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(54),
        }
    }

    /// Sink that never accepts a frame
    struct StalledSink;

    impl Sink<Message> for StalledSink {
        type Error = std::io::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_sends_frames_then_close() {
        let (tx, rx) = mpsc::channel(8);
        let (sink, mut frames) = fmpsc::unbounded();

        tx.send(Payload::from("{\"a\":1}")).await.unwrap();
        tx.send(Payload::from("{\"b\":2}")).await.unwrap();
        drop(tx);

        assert_eq!(write_pump(sink, rx, config()).await, PumpExit::QueueClosed);

        assert!(matches!(frames.next().await, Some(Message::Text(t)) if t.as_str() == "{\"a\":1}"));
        assert!(matches!(frames.next().await, Some(Message::Text(t)) if t.as_str() == "{\"b\":2}"));
        assert!(matches!(frames.next().await, Some(Message::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_pings_on_interval() {
        let (_tx, rx) = mpsc::channel::<Payload>(8);
        let (sink, mut frames) = fmpsc::unbounded();
        let started = Instant::now();

        tokio::spawn(write_pump(sink, rx, config()));

        assert!(matches!(frames.next().await, Some(Message::Ping(_))));
        assert!(started.elapsed() >= Duration::from_secs(54));
        assert!(started.elapsed() < Duration::from_secs(55));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_reports_failed_sink() {
        let (tx, rx) = mpsc::channel(8);
        let (sink, frames) = fmpsc::unbounded();
        drop(frames);

        tx.send(Payload::from("{}")).await.unwrap();
        assert_eq!(write_pump(sink, rx, config()).await, PumpExit::WriteFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_times_out_on_stalled_peer() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(Payload::from("{}")).await.unwrap();

        let started = Instant::now();
        assert_eq!(write_pump(StalledSink, rx, config()).await, PumpExit::WriteTimeout);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_pump_times_out_without_pong() {
        let (_tx, stream) = fmpsc::unbounded::<Result<Message, String>>();
        let started = Instant::now();

        assert_eq!(read_pump(stream, Duration::from_secs(60)).await, PumpExit::ReadTimeout);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_extends_deadline_but_text_does_not() {
        let (tx, stream) = fmpsc::unbounded::<Result<Message, String>>();
        let started = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(40)).await;
            tx.unbounded_send(Ok(Message::Pong(Bytes::new()))).unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            tx.unbounded_send(Ok(Message::Text("hello".into()))).unwrap();
            tokio::time::sleep(Duration::from_secs(600)).await;
            drop(tx);
        });

        assert_eq!(read_pump(stream, Duration::from_secs(60)).await, PumpExit::ReadTimeout);
        assert!(started.elapsed() >= Duration::from_secs(100));
        assert!(started.elapsed() < Duration::from_secs(101));
    }

    #[tokio::test]
    async fn test_read_pump_exit_reasons() {
        let (tx, stream) = fmpsc::unbounded::<Result<Message, String>>();
        tx.unbounded_send(Ok(Message::Close(None))).unwrap();
        assert_eq!(read_pump(stream, Duration::from_secs(60)).await, PumpExit::PeerClosed);

        let (tx, stream) = fmpsc::unbounded::<Result<Message, String>>();
        tx.unbounded_send(Err("reset".to_string())).unwrap();
        assert_eq!(read_pump(stream, Duration::from_secs(60)).await, PumpExit::ReadFailed);

        let (tx, stream) = fmpsc::unbounded::<Result<Message, String>>();
        drop(tx);
        assert_eq!(read_pump(stream, Duration::from_secs(60)).await, PumpExit::StreamEnded);
    }
}
