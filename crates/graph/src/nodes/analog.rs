//! Analog node - injectable pass-through
//!
//! With no `Source`, the node is a pure injection target: frames arriving
//! through `inject_analog` appear on its output and define its channel
//! layout. With a `Source` of comma-joined upstream names, the node
//! subscribes to each upstream's analog output and republishes, keeping
//! only the channels listed in `Channels` and applying the per-upstream
//! `Out Name` renames from the `Sources` table.
//!
//! Upstreams resolve by current name. A missing upstream stalls that
//! forwarder silently; renames are noticed on the next resolution pass and
//! the subscription rebinds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use thalamus_observable::{Key, ObservableCollection, Value};
use thalamus_protocol::{AnalogFrame, Modality};

use crate::node::{parse_source_list, Node, NodeContext, NodeHost, NodeOutputs};
use crate::{Result, RESOLVE_INTERVAL_MS};

/// Type tag in node configs
pub const TYPE_TAG: &str = "ANALOG";

/// Injectable analog pass-through
pub struct AnalogNode {
    name: String,
    config: ObservableCollection,
    outputs: Arc<NodeOutputs>,
    host: Arc<dyn NodeHost>,
    forwarders: Vec<JoinHandle<()>>,
    /// Channel names to keep when forwarding; empty keeps all
    channels: Arc<RwLock<Vec<String>>>,
}

impl AnalogNode {
    /// Constructor for the registry
    pub fn create(ctx: NodeContext) -> Result<Box<dyn Node>> {
        let channels = read_channel_list(&ctx.config);
        Ok(Box::new(AnalogNode {
            name: ctx.name,
            config: ctx.config,
            outputs: ctx.outputs,
            host: ctx.host,
            forwarders: Vec::new(),
            channels: Arc::new(RwLock::new(channels)),
        }))
    }

    fn spawn_forwarders(&mut self) {
        let sources = self
            .config
            .get_str("Source")
            .map(|s| parse_source_list(&s))
            .unwrap_or_default();

        for source in sources {
            let host = Arc::clone(&self.host);
            let outputs = Arc::clone(&self.outputs);
            let channels = Arc::clone(&self.channels);
            let renames = read_rename_rules(&self.config, &source);
            let node = self.name.clone();
            self.forwarders.push(tokio::spawn(async move {
                forward_upstream(host, outputs, channels, renames, node, source).await;
            }));
        }
    }

    fn halt_forwarders(&mut self) {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
    }
}

/// Rename rules for one upstream from the `Sources` table:
/// `Sources: {<node>: [{Name, Out Name}]}`
fn read_rename_rules(config: &ObservableCollection, source: &str) -> Vec<(String, String)> {
    let Some(Value::Collection(table)) = config.get("Sources") else {
        return Vec::new();
    };
    let Some(Value::Collection(rules)) = table.get(source) else {
        return Vec::new();
    };
    rules
        .entries()
        .into_iter()
        .filter_map(|(_, value)| {
            let rule = value.as_collection()?;
            let name = rule.get_str("Name")?;
            let out = rule.get_str("Out Name")?;
            Some((name, out))
        })
        .collect()
}

/// Apply `Out Name` renames to a frame's spans
///
/// Renames never move span boundaries, so rebuilding cannot fail in
/// practice; a `None` simply drops the frame.
pub(crate) fn rename_channels(
    frame: AnalogFrame,
    rules: &[(String, String)],
) -> Option<AnalogFrame> {
    if rules.is_empty() {
        return Some(frame);
    }
    let (data, mut spans, intervals, channel_type, time_ns) = frame.into_parts();
    for span in &mut spans {
        if let Some((_, out)) = rules.iter().find(|(name, _)| name == &span.name) {
            span.name = out.clone();
        }
    }
    AnalogFrame::new(data, spans, intervals, channel_type, time_ns).ok()
}

fn read_channel_list(config: &ObservableCollection) -> Vec<String> {
    let Some(Value::Collection(list)) = config.get("Channels") else {
        return Vec::new();
    };
    list.entries()
        .into_iter()
        .filter_map(|(_, value)| value.as_str().map(str::to_string))
        .collect()
}

/// Keep only the named channels of a frame; `None` when nothing survives
pub(crate) fn select_channels(frame: &AnalogFrame, channels: &[String]) -> Option<AnalogFrame> {
    if channels.is_empty() {
        return Some(frame.clone());
    }
    let mut data = Vec::new();
    let mut spans = Vec::new();
    let mut intervals = Vec::new();
    for (index, span) in frame.spans().iter().enumerate() {
        if !channels.iter().any(|name| name == &span.name) {
            continue;
        }
        let samples = frame.channel_data(index)?;
        let begin = data.len() as u32;
        data.extend_from_slice(samples);
        spans.push(thalamus_protocol::Span::new(
            span.name.clone(),
            begin,
            data.len() as u32,
        ));
        intervals.push(frame.sample_intervals()[index]);
    }
    if spans.is_empty() {
        return None;
    }
    AnalogFrame::new(
        data,
        spans,
        intervals,
        frame.channel_type(),
        frame.time_ns(),
    )
    .ok()
}

/// Forward one upstream's analog output, re-resolving by name
async fn forward_upstream(
    host: Arc<dyn NodeHost>,
    outputs: Arc<NodeOutputs>,
    channels: Arc<RwLock<Vec<String>>>,
    renames: Vec<(String, String)>,
    node: String,
    source: String,
) {
    let resolve_interval = Duration::from_millis(RESOLVE_INTERVAL_MS);
    loop {
        // Resolve by current name; stall silently while unresolved or
        // while the upstream lacks the analog modality.
        let upstream = match host.outputs(&source) {
            Some(upstream)
                if host
                    .modalities(&source)
                    .is_some_and(|m| m.contains(Modality::Analog)) =>
            {
                upstream
            }
            _ => {
                tokio::time::sleep(resolve_interval).await;
                continue;
            }
        };

        debug!(node = %node, source = %source, "upstream resolved");
        let mut subscription = upstream.analog.subscribe();
        loop {
            tokio::select! {
                frame = subscription.recv() => {
                    match frame {
                        Some(frame) => {
                            let selection = {
                                let channels = channels.read();
                                select_channels(&frame, &channels)
                            };
                            let selection =
                                selection.and_then(|f| rename_channels(f, &renames));
                            if let Some(selected) = selection {
                                outputs.publish_analog(selected).await;
                            }
                        }
                        // Upstream stopped or was destroyed; go back to
                        // resolution.
                        None => break,
                    }
                }
                _ = tokio::time::sleep(resolve_interval) => {
                    // Rebind if the name now resolves to a different node.
                    let still_bound = host
                        .outputs(&source)
                        .is_some_and(|current| Arc::ptr_eq(&current, &upstream));
                    if !still_bound {
                        debug!(node = %node, source = %source, "upstream rebinding");
                        break;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Node for AnalogNode {
    async fn start(&mut self) -> Result<()> {
        if self.forwarders.is_empty() {
            self.spawn_forwarders();
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.halt_forwarders();
        Ok(())
    }

    async fn reconfigure(&mut self, path: &[Key], _value: &Value) -> Result<()> {
        match path.first().and_then(Key::as_field) {
            Some("Source") | Some("Sources") if !self.forwarders.is_empty() => {
                // Routing changed while running: cycle the forwarders.
                self.halt_forwarders();
                self.spawn_forwarders();
            }
            Some("Channels") => {
                *self.channels.write() = read_channel_list(&self.config);
            }
            _ => {}
        }
        Ok(())
    }

    async fn process(&mut self, _request: serde_json::Value) -> Result<serde_json::Value> {
        let layout = self.outputs.analog_layout();
        let channels: Vec<String> = layout
            .map(|l| l.spans().iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default();
        Ok(serde_json::json!({
            "type": TYPE_TAG,
            "channels": channels,
        }))
    }
}
