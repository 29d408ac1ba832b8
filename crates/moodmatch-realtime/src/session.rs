//! One transport lifetime: open, authenticate, pump frames, tear down.
//!
//! A session that opened always ends the same way: heartbeat stopped, active
//! slot cleared (if still ours), `ConnectionClosed` emitted. The only
//! exception is a manual disconnect, where the facade emits the single
//! `ConnectionClosed` itself.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use moodmatch_core::{ConnectionId, ConnectionState, DomainEvent};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::codec;
use crate::config::ClientConfig;
use crate::connection::{CloseCause, Transport};
use crate::error::RealtimeError;
use crate::heartbeat::run_heartbeat;
use crate::shared::Shared;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bound on a single socket write, so a stalled peer cannot wedge the writer.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// How a session that got as far as opening (or was cancelled first) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Cancelled before the transport opened.
    Cancelled,
    /// The server closed the connection or the stream ended.
    PeerClosed,
    /// The WebSocket layer reported an error while reading.
    TransportError(String),
    /// The client closed the transport.
    Closed(CloseCause),
}

/// Open a transport and run it to completion.
///
/// Returns `Err` only if the transport never opened; nothing is emitted in
/// that case.
pub(crate) async fn run_session(
    shared: &Arc<Shared>,
    config: &ClientConfig,
    token: &str,
    cancel: &CancellationToken,
) -> Result<SessionEnd, RealtimeError> {
    let ws = tokio::select! {
        opened = open_transport(config, token) => opened?,
        () = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
    };

    let connection_id = ConnectionId::new();
    let span = info_span!("session", connection_id = %connection_id);
    drive(ws, connection_id, shared, config, cancel)
        .instrument(span)
        .await
}

async fn drive(
    ws: WsStream,
    connection_id: ConnectionId,
    shared: &Arc<Shared>,
    config: &ClientConfig,
    cancel: &CancellationToken,
) -> Result<SessionEnd, RealtimeError> {
    // Cancelled while the handshake was finishing: never publish it.
    if cancel.is_cancelled() {
        debug!("cancelled before transport attached");
        return Ok(SessionEnd::Cancelled);
    }

    let (sink, mut stream) = ws.split();
    let (tx, rx) = mpsc::channel(config.outbound_buffer_capacity);
    let transport = Arc::new(Transport::new(connection_id, tx, cancel.child_token()));
    let _writer = tokio::spawn(run_writer(sink, rx).in_current_span());

    shared.attach(transport.clone());
    shared.set_state(ConnectionState::Connected);
    shared.emit(DomainEvent::ConnectionOpened);
    info!("realtime connection opened");
    counter!("realtime_connections_total").increment(1);
    gauge!("realtime_connected").set(1.0);

    let heartbeat = tokio::spawn(
        run_heartbeat(
            transport.clone(),
            shared.clone(),
            config.heartbeat_interval,
            config.heartbeat_timeout,
        )
        .in_current_span(),
    );

    let end = read_loop(&transport, &mut stream, shared).await;

    // Teardown
    transport.shutdown();
    heartbeat.abort();
    let _ = shared.detach(&transport);
    info!(?end, dropped = transport.drop_count(), "realtime connection closed");
    counter!("realtime_disconnections_total").increment(1);
    gauge!("realtime_connected").set(0.0);
    histogram!("realtime_connection_duration_seconds").record(transport.age().as_secs_f64());
    if !shared.is_manual_disconnect() {
        shared.emit(DomainEvent::ConnectionClosed);
    }
    Ok(end)
}

async fn open_transport(config: &ClientConfig, token: &str) -> Result<WsStream, RealtimeError> {
    let mut request = config
        .ws_url
        .as_str()
        .into_client_request()
        .map_err(|e| RealtimeError::InvalidEndpoint(e.to_string()))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| RealtimeError::InvalidCredential)?;
    let _ = request.headers_mut().insert(AUTHORIZATION, bearer);

    debug!(url = %config.ws_url, "opening transport");
    let timeout_ms = u64::try_from(config.connect_timeout.as_millis()).unwrap_or(u64::MAX);
    let (ws, response) = time::timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| RealtimeError::ConnectTimeout { timeout_ms })??;
    debug!(status = %response.status(), "transport upgraded");
    Ok(ws)
}

async fn read_loop(
    transport: &Transport,
    stream: &mut SplitStream<WsStream>,
    shared: &Shared,
) -> SessionEnd {
    loop {
        let frame = tokio::select! {
            biased;
            () = transport.closed() => {
                let cause = transport.close_cause().unwrap_or(if shared.is_manual_disconnect() {
                    CloseCause::Manual
                } else {
                    CloseCause::Shutdown
                });
                return SessionEnd::Closed(cause);
            }
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                let Some(event) = codec::decode(text.as_str()) else {
                    continue;
                };
                if event == DomainEvent::HeartbeatAck {
                    transport.mark_ack();
                }
                shared.emit(event);
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "server sent close frame");
                return SessionEnd::PeerClosed;
            }
            // Ping/pong are answered by tungstenite; binary is not part of the protocol.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "transport read failed");
                return SessionEnd::TransportError(e.to_string());
            }
            None => return SessionEnd::PeerClosed,
        }
    }
}

/// Drain the outbound queue into the socket. Ends after a close frame, on a
/// write error, or when every sender is gone.
async fn run_writer(mut sink: SplitSink<WsStream, Message>, mut rx: mpsc::Receiver<Message>) {
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        match time::timeout(WRITE_TIMEOUT, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                break;
            }
            Ok(Err(e)) => {
                debug!(error = %e, "transport write failed");
                break;
            }
            Err(_) => {
                warn!("transport write timed out");
                break;
            }
        }
        if closing {
            break;
        }
    }
    let _ = time::timeout(WRITE_TIMEOUT, sink.close()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_endpoint_is_rejected_before_io() {
        let config = ClientConfig::with_url("not a url");
        let err = open_transport(&config, "tok").await.unwrap_err();
        assert!(matches!(err, RealtimeError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn token_with_newline_is_invalid_credential() {
        let config = ClientConfig::with_url("ws://127.0.0.1:9/ws");
        let err = open_transport(&config, "bad\ntoken").await.unwrap_err();
        assert!(matches!(err, RealtimeError::InvalidCredential));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::with_url(format!("ws://{addr}/ws"));
        let err = open_transport(&config, "tok").await.unwrap_err();
        assert!(matches!(err, RealtimeError::Transport(_)));
    }

    #[tokio::test]
    async fn cancelled_before_open_emits_nothing() {
        let shared = Arc::new(Shared::new(8));
        let mut events = shared.subscribe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        // A listener that never completes the handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ClientConfig::with_url(format!("ws://{}/ws", listener.local_addr().unwrap()));

        let end = run_session(&shared, &config, "tok", &cancel).await.unwrap();
        assert_eq!(end, SessionEnd::Cancelled);
        assert!(events.try_recv().is_err());
        assert_eq!(shared.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn stalled_handshake_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config =
            ClientConfig::with_url(format!("ws://{}/ws", listener.local_addr().unwrap()));
        config.connect_timeout = Duration::from_millis(100);

        let err = open_transport(&config, "tok").await.unwrap_err();
        assert!(matches!(err, RealtimeError::ConnectTimeout { timeout_ms: 100 }));
    }

    #[tokio::test]
    async fn cancelled_after_open_publishes_nothing() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ClientConfig::with_url(format!("ws://{}/ws", listener.local_addr().unwrap()));
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            // Drain until the client goes away.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let ws = open_transport(&config, "tok").await.unwrap();
        let shared = Arc::new(Shared::new(8));
        let mut events = shared.subscribe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let end = drive(ws, ConnectionId::new(), &shared, &config, &cancel)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Cancelled);
        assert!(events.try_recv().is_err());
        assert!(shared.active().is_none());
        assert_eq!(shared.state(), ConnectionState::Disconnected);

        time::timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    }
}
