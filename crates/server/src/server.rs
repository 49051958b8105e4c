//! TCP server and endpoint loops
//!
//! One connection per call: the first client message selects the endpoint.
//! Server streams select over the bus subscription, the read half (client
//! close = cancel, no log, no counter), and the shutdown signal (terminal
//! `Unavailable`). A closed bus subscription means the source node was
//! destroyed, also terminal `Unavailable`.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use thalamus_graph::{NodeRuntime, NodeSlot};
use thalamus_observable::{apply_change, Action, Address, ObservableCollection};
use thalamus_protocol::{
    AnalogRequest, ClientMessage, GraphRequest, ImageRequest, InjectAnalogRequest, ModalitySet,
    NodeRequest, NodeSelector, ObservableAction, ObservableChange, ObservableTransaction,
    ReplayRequest, ServerMessage, SpectrogramRequest, StimRequest, TextFrame,
};

use crate::binning::{BinEvent, GraphBinner};
use crate::bridge::BridgeHub;
use crate::logging::LogRing;
use crate::replay::{read_session, ReplayPayload};
use crate::spectral::ChannelStft;
use crate::stream::{FrameReader, FrameWriter};
use crate::{Result, ServerError};

/// How often a stream endpoint retries resolving its node
const RESOLVE_INTERVAL: Duration = Duration::from_millis(250);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:50674".into(),
        }
    }
}

/// Shared state behind every connection
pub struct ServerState {
    pub runtime: NodeRuntime,
    pub config: ObservableCollection,
    pub log: Arc<LogRing>,
    pub bridge: BridgeHub,
    shutdown: watch::Sender<bool>,
}

impl ServerState {
    /// Wire the runtime, document, log ring, and bridge hub together
    pub fn new(config: ObservableCollection, runtime: NodeRuntime) -> Arc<ServerState> {
        let log = Arc::new(LogRing::new());

        // Node log records land in the central ring
        let ring = Arc::clone(&log);
        runtime.set_log_sink(Arc::new(move |frame: TextFrame| {
            let ring = Arc::clone(&ring);
            tokio::spawn(async move {
                ring.append(frame).await;
            });
        }));

        let bridge = BridgeHub::new(&config);
        let (shutdown, _) = watch::channel(false);
        Arc::new(ServerState {
            runtime,
            config,
            log,
            bridge,
            shutdown,
        })
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stop the server, all streams, and the node runtime
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        self.bridge.shutdown();
        self.log.close();
        self.runtime.shutdown().await;
    }
}

/// The RPC server
pub struct Server {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl Server {
    /// Create a server over shared state
    pub fn new(state: Arc<ServerState>, config: ServerConfig) -> Self {
        Self { state, config }
    }

    /// Bind and serve until shutdown
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.address).await?;
        Self::serve(self.state, listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(state: Arc<ServerState>, listener: TcpListener) -> Result<()> {
        let address = listener.local_addr()?;
        info!(%address, "thalamus server listening");

        let mut shutdown = state.shutdown_signal();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "client connected");
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, state).await {
                                debug!(error = %e, "connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed");
                    }
                },
                _ = shutdown.changed() => break,
            }
        }
        info!("thalamus server stopped");
        Ok(())
    }

    /// Serve in a background task
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }
}

type Reader = FrameReader<OwnedReadHalf>;
type Writer = FrameWriter<OwnedWriteHalf>;

/// Why a stream ended before its node produced anything
enum StreamEnd {
    Cancelled,
    Shutdown,
}

async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) -> Result<()> {
    stream.set_nodelay(true).ok();
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    let Some(first) = reader.read_client().await? else {
        return Ok(());
    };

    let outcome = dispatch(first, &mut reader, &mut writer, &state).await;
    if let Err(e) = &outcome {
        // Best effort: surface the failure to the peer before closing
        let _ = writer
            .write_server(&ServerMessage::Error(e.to_string()))
            .await;
    }
    outcome
}

async fn dispatch(
    first: ClientMessage,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    match first {
        ClientMessage::GetModalities(selector) => get_modalities(selector, writer, state).await,
        ClientMessage::GetTypeName(type_tag) => {
            let label = state.runtime.type_label(&type_tag);
            writer.write_server(&ServerMessage::TypeName(label)).await
        }
        ClientMessage::NodeRequest(request) => {
            let response = node_request(state, &request).await;
            writer.write_server(&response).await
        }
        ClientMessage::NodeRequestStream(request) => {
            node_request_stream(request, reader, writer, state).await
        }
        ClientMessage::ChannelInfo(request) => channel_info(request, reader, writer, state).await,
        ClientMessage::Graph(request) => graph(request, reader, writer, state).await,
        ClientMessage::Spectrogram(request) => spectrogram(request, reader, writer, state).await,
        ClientMessage::Image(request) => image(request, reader, writer, state).await,
        ClientMessage::Xsens(selector) => xsens(selector, reader, writer, state).await,
        ClientMessage::Log(text) => log_ingest(text, reader, writer, state).await,
        ClientMessage::Logout => logout(reader, writer, state).await,
        ClientMessage::InjectAnalog(request) => inject_analog(request, reader, writer, state).await,
        ClientMessage::Stim(request) => stim(request, reader, writer, state).await,
        ClientMessage::Replay(request) => replay(request, writer, state).await,
        ClientMessage::ObservableBridge(transaction) => {
            observable_bridge(transaction, reader, writer, state).await
        }
    }
}

// ============================================================================
// Unary endpoints
// ============================================================================

async fn get_modalities(
    selector: NodeSelector,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    // Missing nodes report the empty set
    let set = state
        .runtime
        .slot(&selector.name)
        .map(|slot| slot.modalities())
        .unwrap_or(ModalitySet::EMPTY);
    writer.write_server(&ServerMessage::Modalities(set)).await
}

async fn node_request(state: &Arc<ServerState>, request: &NodeRequest) -> ServerMessage {
    let payload: serde_json::Value = if request.json.is_empty() {
        serde_json::Value::Null
    } else {
        match serde_json::from_str(&request.json) {
            Ok(payload) => payload,
            Err(e) => return ServerMessage::Error(format!("invalid request JSON: {e}")),
        }
    };
    match state.runtime.node_request(&request.node, payload).await {
        Ok(response) => ServerMessage::NodeResponse(thalamus_protocol::NodeResponse {
            json: response.to_string(),
        }),
        Err(e) => ServerMessage::Error(e.to_string()),
    }
}

async fn node_request_stream(
    first: NodeRequest,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let response = node_request(state, &first).await;
    writer.write_server(&response).await?;

    loop {
        match reader.read_client().await? {
            Some(ClientMessage::NodeRequestStream(request))
            | Some(ClientMessage::NodeRequest(request)) => {
                let response = node_request(state, &request).await;
                writer.write_server(&response).await?;
            }
            Some(_) => {
                return Err(ServerError::InvalidRequest(
                    "expected NodeRequest on this stream".into(),
                ))
            }
            None => return Ok(()),
        }
    }
}

// ============================================================================
// Server-stream endpoints
// ============================================================================

/// Wait until the named node exists; the client may cancel meanwhile
async fn resolve_slot(
    name: &str,
    reader: &mut Reader,
    shutdown: &mut watch::Receiver<bool>,
    state: &Arc<ServerState>,
) -> Result<std::result::Result<Arc<NodeSlot>, StreamEnd>> {
    loop {
        if let Some(slot) = state.runtime.slot(name) {
            return Ok(Ok(slot));
        }
        tokio::select! {
            _ = tokio::time::sleep(RESOLVE_INTERVAL) => {}
            message = reader.read_client() => {
                let _ = message;
                return Ok(Err(StreamEnd::Cancelled));
            }
            _ = shutdown.changed() => return Ok(Err(StreamEnd::Shutdown)),
        }
    }
}

async fn finish_stream(writer: &mut Writer, end: StreamEnd) -> Result<()> {
    match end {
        // Client-initiated termination: no log, no counter
        StreamEnd::Cancelled => Ok(()),
        StreamEnd::Shutdown => {
            writer
                .write_server(&ServerMessage::Unavailable("server shutting down".into()))
                .await
        }
    }
}

async fn node_destroyed(writer: &mut Writer) -> Result<()> {
    writer
        .write_server(&ServerMessage::Unavailable("node destroyed".into()))
        .await
}

async fn channel_info(
    request: AnalogRequest,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let mut shutdown = state.shutdown_signal();
    let slot = match resolve_slot(&request.node.name, reader, &mut shutdown, state).await? {
        Ok(slot) => slot,
        Err(end) => return finish_stream(writer, end).await,
    };

    let mut subscription = slot.outputs().analog.subscribe();
    let mut last_layout = slot.outputs().analog_layout();
    if let Some(layout) = &last_layout {
        writer
            .write_server(&ServerMessage::Analog(layout.clone()))
            .await?;
    }

    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    let changed = match &last_layout {
                        Some(layout) => !layout.same_layout(&frame),
                        None => true,
                    };
                    if changed {
                        let layout = frame.layout_only();
                        writer.write_server(&ServerMessage::Analog(layout.clone())).await?;
                        last_layout = Some(layout);
                    }
                }
                None => return node_destroyed(writer).await,
            },
            message = reader.read_client() => {
                let _ = message;
                return Ok(());
            }
            _ = shutdown.changed() => return finish_stream(writer, StreamEnd::Shutdown).await,
        }
    }
}

async fn graph(
    request: GraphRequest,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let mut shutdown = state.shutdown_signal();
    let slot = match resolve_slot(&request.node.name, reader, &mut shutdown, state).await? {
        Ok(slot) => slot,
        Err(end) => return finish_stream(writer, end).await,
    };

    let mut subscription = slot.outputs().analog.subscribe();
    let mut binner = GraphBinner::new(request.bin_ns, request.channel_names);

    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    for event in binner.push(&frame) {
                        let response = match event {
                            BinEvent::Boundary(response) | BinEvent::Bins(response) => response,
                        };
                        writer.write_server(&ServerMessage::Graph(response)).await?;
                    }
                }
                None => return node_destroyed(writer).await,
            },
            message = reader.read_client() => {
                let _ = message;
                return Ok(());
            }
            _ = shutdown.changed() => return finish_stream(writer, StreamEnd::Shutdown).await,
        }
    }
}

async fn spectrogram(
    request: SpectrogramRequest,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let mut shutdown = state.shutdown_signal();
    let slot = match resolve_slot(&request.node.name, reader, &mut shutdown, state).await? {
        Ok(slot) => slot,
        Err(end) => return finish_stream(writer, end).await,
    };

    let mut subscription = slot.outputs().analog.subscribe();
    let mut states: Vec<ChannelStft> = Vec::new();

    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    if states.is_empty() {
                        // Channel states initialize from the first frame's
                        // layout; empty request selects every channel.
                        for (span, interval) in frame.spans().iter().zip(frame.sample_intervals()) {
                            let selected = request.channels.is_empty()
                                || request.channels.iter().any(|n| n == &span.name);
                            if selected {
                                states.push(ChannelStft::new(
                                    span.name.clone(),
                                    *interval,
                                    request.window_s,
                                    request.hop_s,
                                ));
                            }
                        }
                    }
                    let mut spectrograms = Vec::new();
                    let mut any = false;
                    for stft in &mut states {
                        let samples = frame.channel_by_name(stft.name()).unwrap_or(&[]);
                        let mut spectra = stft.push(samples);
                        match spectra.pop() {
                            Some(spectrum) => {
                                any = true;
                                spectrograms.push(spectrum);
                            }
                            None => spectrograms.push(Default::default()),
                        }
                    }
                    if any {
                        writer
                            .write_server(&ServerMessage::Spectrogram(
                                thalamus_protocol::SpectrogramResponse { spectrograms },
                            ))
                            .await?;
                    }
                }
                None => return node_destroyed(writer).await,
            },
            message = reader.read_client() => {
                let _ = message;
                return Ok(());
            }
            _ = shutdown.changed() => return finish_stream(writer, StreamEnd::Shutdown).await,
        }
    }
}

async fn image(
    request: ImageRequest,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let mut shutdown = state.shutdown_signal();
    let slot = match resolve_slot(&request.node.name, reader, &mut shutdown, state).await? {
        Ok(slot) => slot,
        Err(end) => return finish_stream(writer, end).await,
    };

    let mut subscription = slot.outputs().image.subscribe();
    let min_interval = if request.framerate > 0.0 {
        Some(Duration::from_secs_f64(1.0 / request.framerate))
    } else {
        None
    };
    let mut last_sent: Option<tokio::time::Instant> = None;
    // Multi-chunk logical frames are dropped or delivered whole
    let mut mid_frame = false;
    let mut skipping = false;

    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    if !mid_frame && !skipping {
                        if let (Some(min), Some(last)) = (min_interval, last_sent) {
                            if last.elapsed() < min {
                                skipping = true;
                            }
                        }
                    }
                    if skipping {
                        if frame.last {
                            skipping = false;
                        }
                        continue;
                    }
                    writer.write_server(&ServerMessage::Image((*frame).clone())).await?;
                    mid_frame = !frame.last;
                    if frame.last {
                        last_sent = Some(tokio::time::Instant::now());
                    }
                }
                None => return node_destroyed(writer).await,
            },
            message = reader.read_client() => {
                let _ = message;
                return Ok(());
            }
            _ = shutdown.changed() => return finish_stream(writer, StreamEnd::Shutdown).await,
        }
    }
}

async fn xsens(
    selector: NodeSelector,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let mut shutdown = state.shutdown_signal();
    let slot = match resolve_slot(&selector.name, reader, &mut shutdown, state).await? {
        Ok(slot) => slot,
        Err(end) => return finish_stream(writer, end).await,
    };

    let mut subscription = slot.outputs().motion.subscribe();
    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    writer.write_server(&ServerMessage::Xsens((*frame).clone())).await?;
                }
                None => return node_destroyed(writer).await,
            },
            message = reader.read_client() => {
                let _ = message;
                return Ok(());
            }
            _ = shutdown.changed() => return finish_stream(writer, StreamEnd::Shutdown).await,
        }
    }
}

async fn logout(reader: &mut Reader, writer: &mut Writer, state: &Arc<ServerState>) -> Result<()> {
    let mut shutdown = state.shutdown_signal();
    let mut subscription = state.log.subscribe();
    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(frame) => {
                    writer.write_server(&ServerMessage::Text((*frame).clone())).await?;
                }
                None => return finish_stream(writer, StreamEnd::Shutdown).await,
            },
            message = reader.read_client() => {
                let _ = message;
                return Ok(());
            }
            _ = shutdown.changed() => return finish_stream(writer, StreamEnd::Shutdown).await,
        }
    }
}

// ============================================================================
// Client-stream endpoints
// ============================================================================

async fn log_ingest(
    first: TextFrame,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    state.log.append(first).await;
    loop {
        match reader.read_client().await? {
            Some(ClientMessage::Log(text)) => state.log.append(text).await,
            Some(_) => {
                return Err(ServerError::InvalidRequest(
                    "expected Text on log stream".into(),
                ))
            }
            None => {
                return writer.write_server(&ServerMessage::Empty).await;
            }
        }
    }
}

async fn inject_analog(
    first: InjectAnalogRequest,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let InjectAnalogRequest::Node(node) = first else {
        return Err(ServerError::InvalidRequest(
            "inject_analog must open with the target node".into(),
        ));
    };

    loop {
        match reader.read_client().await? {
            Some(ClientMessage::InjectAnalog(InjectAnalogRequest::Signal(frame))) => {
                if let Err(e) = state.runtime.inject_analog(&node, frame).await {
                    writer
                        .write_server(&ServerMessage::Error(e.to_string()))
                        .await?;
                    return Ok(());
                }
            }
            Some(_) => {
                return Err(ServerError::InvalidRequest(
                    "expected signal frames after the node name".into(),
                ))
            }
            None => {
                return writer.write_server(&ServerMessage::Empty).await;
            }
        }
    }
}

async fn stim(
    first: StimRequest,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let StimRequest::Node(selector) = first else {
        return Err(ServerError::InvalidRequest(
            "stim must open with the target node".into(),
        ));
    };
    let node = selector.name;

    loop {
        match reader.read_client().await? {
            Some(ClientMessage::Stim(StimRequest::InlineArm(declaration))) => {
                if let Err(e) = state.runtime.arm_stim(&node, declaration) {
                    writer
                        .write_server(&ServerMessage::Error(e.to_string()))
                        .await?;
                    return Ok(());
                }
            }
            Some(ClientMessage::Stim(StimRequest::Trigger(id))) => {
                match state.runtime.trigger_stim(&node).await {
                    Ok(fired) => {
                        if !fired {
                            debug!(node = %node, trigger = id, "trigger with nothing armed");
                        }
                    }
                    Err(e) => {
                        writer
                            .write_server(&ServerMessage::Error(e.to_string()))
                            .await?;
                        return Ok(());
                    }
                }
            }
            Some(_) => {
                return Err(ServerError::InvalidRequest(
                    "expected arm or trigger on stim stream".into(),
                ))
            }
            None => {
                return writer.write_server(&ServerMessage::Empty).await;
            }
        }
    }
}

// ============================================================================
// Replay
// ============================================================================

async fn replay(
    request: ReplayRequest,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    let mut file = match tokio::fs::File::open(&request.filename).await {
        Ok(file) => file,
        Err(e) => {
            return writer
                .write_server(&ServerMessage::Error(format!(
                    "cannot open '{}': {e}",
                    request.filename
                )))
                .await;
        }
    };
    let records = match read_session(&mut file).await {
        Ok(records) => records,
        Err(e) => {
            return writer
                .write_server(&ServerMessage::Error(e.to_string()))
                .await;
        }
    };

    let runtime = state.runtime.clone();
    let selected = request.nodes;
    tokio::spawn(async move {
        run_replay(runtime, records, selected).await;
    });

    writer.write_server(&ServerMessage::Empty).await
}

/// Re-emit records at their original inter-arrival times
async fn run_replay(
    runtime: NodeRuntime,
    records: Vec<crate::replay::ReplayRecord>,
    selected: Vec<String>,
) {
    let mut previous_time: Option<u64> = None;
    let mut published = 0usize;
    for record in records {
        // Empty selection replays every node
        if !selected.is_empty() && !selected.iter().any(|n| n == &record.node) {
            continue;
        }
        if let Some(previous) = previous_time {
            // Clock monotonicity is not guaranteed across files; negative
            // deltas replay back-to-back.
            let delta = record.time_ns.saturating_sub(previous);
            if delta > 0 {
                tokio::time::sleep(Duration::from_nanos(delta)).await;
            }
        }
        previous_time = Some(record.time_ns);

        let Some(slot) = runtime.slot(&record.node) else {
            continue;
        };
        match record.payload {
            ReplayPayload::Analog(frame) => slot.outputs().publish_analog(frame).await,
            ReplayPayload::Motion(frame) => slot.outputs().publish_motion(frame).await,
        }
        published += 1;
    }
    info!(published, "replay finished");
}

// ============================================================================
// Observable bridge
// ============================================================================

async fn observable_bridge(
    first: ObservableTransaction,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
) -> Result<()> {
    // Snapshot first: the whole document as one SET at the root address
    let snapshot = ObservableTransaction {
        id: 0,
        changes: vec![ObservableChange {
            address: String::new(),
            value: state.config.unwrap().to_string(),
            action: ObservableAction::Set,
        }],
        acknowledged: 0,
    };
    writer
        .write_server(&ServerMessage::Transaction(snapshot))
        .await?;

    // The opening message may already carry changes
    if !first.changes.is_empty() {
        apply_transaction(state, &first);
        writer
            .write_server(&ServerMessage::Transaction(ObservableTransaction {
                id: 0,
                changes: Vec::new(),
                acknowledged: first.id,
            }))
            .await?;
    }

    let queue = state.bridge.subscribe();
    let outcome = bridge_loop(reader, writer, state, &queue).await;
    state.bridge.unsubscribe(&queue);
    outcome
}

async fn bridge_loop(
    reader: &mut Reader,
    writer: &mut Writer,
    state: &Arc<ServerState>,
    queue: &thalamus_bus::IterableQueue<ObservableTransaction>,
) -> Result<()> {
    loop {
        tokio::select! {
            outbound = queue.next() => match outbound {
                Some(transaction) => {
                    writer.write_server(&ServerMessage::Transaction(transaction)).await?;
                }
                None => return finish_stream(writer, StreamEnd::Shutdown).await,
            },
            inbound = reader.read_client() => match inbound? {
                Some(ClientMessage::ObservableBridge(transaction)) => {
                    apply_transaction(state, &transaction);
                    writer
                        .write_server(&ServerMessage::Transaction(ObservableTransaction {
                            id: 0,
                            changes: Vec::new(),
                            acknowledged: transaction.id,
                        }))
                        .await?;
                }
                Some(_) => {
                    return Err(ServerError::InvalidRequest(
                        "expected transactions on the bridge".into(),
                    ))
                }
                None => return Ok(()),
            },
        }
    }
}

/// Apply each change of an inbound transaction; failures are logged and do
/// not abort the rest of the transaction
fn apply_transaction(state: &Arc<ServerState>, transaction: &ObservableTransaction) {
    for change in &transaction.changes {
        let address = match Address::parse(&change.address) {
            Ok(address) => address,
            Err(e) => {
                warn!(address = %change.address, error = %e, "bridge address rejected");
                continue;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&change.value) {
            Ok(value) => value,
            Err(e) => {
                warn!(address = %change.address, error = %e, "bridge value rejected");
                continue;
            }
        };
        let action = match change.action {
            ObservableAction::Set => Action::Set,
            ObservableAction::Delete => Action::Delete,
        };
        if let Err(e) = apply_change(&state.config, &address, action, &value) {
            warn!(address = %change.address, error = %e, "bridge change failed");
        }
    }
}
