//! Long-lived push channel from the HR API (Socket.IO over websocket).

use std::{collections::HashMap, sync::Arc};

use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::{json, Value};
use shared::protocol::{EventName, StreamEvent};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::StreamError,
    transport::{EnginePacket, SocketPacket, DEFAULT_NAMESPACE, ENGINE_IO_VERSION},
};

pub type EventHandler = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

const OUTBOUND_QUEUE: usize = 64;
const EVENT_BUFFER: usize = 256;

#[derive(Clone, Default)]
pub struct EventHandlers {
    handlers: HashMap<EventName, Vec<EventHandler>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs every named event the HR API is known to push.
    pub fn with_logging() -> Self {
        let mut handlers = Self::new();
        for name in EventName::KNOWN {
            handlers.on(name, log_event);
        }
        handlers
    }

    pub fn on<F>(&mut self, name: impl Into<EventName>, handler: F) -> &mut Self
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.handlers
            .entry(name.into())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    pub fn dispatch(&self, event: &StreamEvent) -> usize {
        let Some(handlers) = self.handlers.get(&event.name) else {
            debug!(event = %event.name, "no handler registered for event");
            return 0;
        };
        for handler in handlers {
            handler(event);
        }
        handlers.len()
    }
}

fn log_event(event: &StreamEvent) {
    match &event.name {
        EventName::Connect => info!(payload = %event.payload, "event stream connected"),
        EventName::Disconnect => info!(payload = %event.payload, "event stream disconnected"),
        name => info!(event = %name, payload = %event.payload, "event stream event"),
    }
}

pub struct EventStreamClient {
    outbound: mpsc::Sender<String>,
    events: broadcast::Sender<StreamEvent>,
    task: JoinHandle<()>,
    sid: Option<String>,
}

impl EventStreamClient {
    /// Connects, completes the Engine.IO and namespace handshakes, and spawns
    /// the task that owns the socket. There is no reconnection.
    pub async fn connect(server_url: &str, handlers: EventHandlers) -> Result<Self, StreamError> {
        let ws_url = socket_io_url(server_url)?;
        let (ws_stream, _) = connect_async(ws_url.as_str()).await?;
        let (mut writer, mut reader) = ws_stream.split();

        let open = match next_packet(&mut reader).await? {
            EnginePacket::Open(info) => info,
            other => {
                return Err(StreamError::Handshake(format!(
                    "expected open packet, got {other:?}"
                )))
            }
        };
        debug!(engine_sid = %open.sid, ping_interval = open.ping_interval, "engine.io session opened");

        send_packet(
            &mut writer,
            EnginePacket::Message(SocketPacket::connect(DEFAULT_NAMESPACE)),
        )
        .await?;

        let sid = loop {
            match next_packet(&mut reader).await? {
                EnginePacket::Ping(payload) => {
                    send_packet(&mut writer, EnginePacket::Pong(payload)).await?
                }
                EnginePacket::Message(SocketPacket::Connect { data, .. }) => {
                    break data
                        .as_ref()
                        .and_then(|data| data.get("sid"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
                EnginePacket::Message(SocketPacket::ConnectError { data, .. }) => {
                    return Err(StreamError::Handshake(data.to_string()))
                }
                EnginePacket::Close => return Err(StreamError::Closed),
                _ => {}
            }
        };

        let handlers = Arc::new(handlers);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);

        deliver(
            &handlers,
            &events,
            StreamEvent {
                name: EventName::Connect,
                payload: json!({ "sid": sid }),
            },
        );

        let task = tokio::spawn(run_stream(
            reader,
            writer,
            outbound_rx,
            Arc::clone(&handlers),
            events.clone(),
        ));

        Ok(Self {
            outbound,
            events,
            task,
            sid,
        })
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn emit(&self, name: &str, payload: Value) -> Result<(), StreamError> {
        let frame = EnginePacket::Message(SocketPacket::event(DEFAULT_NAMESPACE, name, payload));
        self.outbound
            .send(frame.encode())
            .await
            .map_err(|_| StreamError::Closed)
    }

    /// Asks the server for a `pong_client` reply.
    pub async fn ping(&self) -> Result<(), StreamError> {
        self.emit("ping_client", Value::Null).await
    }

    /// Sends the namespace disconnect and waits for the socket task to end.
    pub async fn close(self) {
        let Self { outbound, task, .. } = self;
        drop(outbound);
        if let Err(err) = task.await {
            warn!(error = %err, "event stream task ended abnormally");
        }
    }
}

/// Maps an http(s)/ws(s) server url to its Socket.IO websocket endpoint.
pub fn socket_io_url(server_url: &str) -> Result<Url, StreamError> {
    let invalid = |reason: String| StreamError::InvalidUrl {
        url: server_url.to_string(),
        reason,
    };
    let mut url = Url::parse(server_url.trim()).map_err(|err| invalid(err.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid("cannot switch to websocket scheme".to_string()))?;

    let path = url.path().trim_end_matches('/').to_string();
    if path.is_empty() {
        url.set_path("/socket.io/");
    } else {
        url.set_path(&format!("{path}/"));
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket");
    Ok(url)
}

fn deliver(handlers: &EventHandlers, events: &broadcast::Sender<StreamEvent>, event: StreamEvent) {
    handlers.dispatch(&event);
    let _ = events.send(event);
}

async fn next_packet<R>(reader: &mut R) -> Result<EnginePacket, StreamError>
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = reader.next().await {
        match message? {
            Message::Text(text) => return EnginePacket::decode(&text),
            Message::Close(_) => return Err(StreamError::Closed),
            _ => {}
        }
    }
    Err(StreamError::Closed)
}

async fn send_packet<W>(writer: &mut W, packet: EnginePacket) -> Result<(), StreamError>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    writer.send(Message::Text(packet.encode())).await?;
    Ok(())
}

async fn run_stream<R, W>(
    mut reader: R,
    mut writer: W,
    mut outbound: mpsc::Receiver<String>,
    handlers: Arc<EventHandlers>,
    events: broadcast::Sender<StreamEvent>,
) where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let reason = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = writer.send(Message::Text(frame)).await {
                        break format!("transport error: {err}");
                    }
                }
                None => {
                    let _ = send_packet(
                        &mut writer,
                        EnginePacket::Message(SocketPacket::disconnect(DEFAULT_NAMESPACE)),
                    )
                    .await;
                    let _ = writer.close().await;
                    break "io client disconnect".to_string();
                }
            },
            message = reader.next() => match message {
                Some(Ok(Message::Text(text))) => match EnginePacket::decode(&text) {
                    Ok(EnginePacket::Ping(payload)) => {
                        if let Err(err) = send_packet(&mut writer, EnginePacket::Pong(payload)).await {
                            break format!("transport error: {err}");
                        }
                    }
                    Ok(EnginePacket::Message(SocketPacket::Event { name, payload, .. })) => {
                        deliver(
                            &handlers,
                            &events,
                            StreamEvent {
                                name: EventName::from(name.as_str()),
                                payload,
                            },
                        );
                    }
                    Ok(EnginePacket::Message(SocketPacket::Disconnect { .. })) => {
                        break "io server disconnect".to_string();
                    }
                    Ok(EnginePacket::Close) => break "transport close".to_string(),
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "ignoring malformed event stream packet"),
                },
                Some(Ok(Message::Close(_))) | None => break "transport close".to_string(),
                Some(Ok(_)) => {}
                Some(Err(err)) => break format!("transport error: {err}"),
            }
        }
    };

    deliver(
        &handlers,
        &events,
        StreamEvent {
            name: EventName::Disconnect,
            payload: json!({ "reason": reason }),
        },
    );
}

#[cfg(test)]
#[path = "tests/event_stream_tests.rs"]
mod tests;
