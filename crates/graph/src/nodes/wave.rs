//! Wave generator node - a synthetic multichannel analog source
//!
//! Produces sine or square waves at a configurable sample rate. Parameter
//! edits apply hot; `Running` cycles the producer task.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use thalamus_observable::{Key, MeteredUpdater, ObservableCollection, Value};
use thalamus_protocol::{AnalogFrame, ChannelType, Span};

use crate::error::GraphError;
use crate::node::{Node, NodeContext, NodeHost, NodeOutputs};
use crate::Result;

/// Type tag in node configs
pub const TYPE_TAG: &str = "WAVE";

/// Producer tick cadence
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Status write cadence; sample counters coalesce to this rate
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Sine,
    Square,
}

impl Shape {
    fn parse(text: &str) -> Result<Shape> {
        match text {
            "Sine" => Ok(Shape::Sine),
            "Square" => Ok(Shape::Square),
            other => Err(GraphError::ConfigInvalid(format!("unknown Shape '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WaveParams {
    pub(crate) frequency: f64,
    pub(crate) amplitude: f64,
    pub(crate) offset: f64,
    shape: Shape,
    pub(crate) sample_rate: f64,
    pub(crate) channel_count: usize,
}

impl WaveParams {
    pub(crate) fn from_config(config: &ObservableCollection) -> Result<WaveParams> {
        let sample_rate = config.get_f64("Sample Rate").unwrap_or(1000.0);
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(GraphError::ConfigInvalid(format!(
                "Sample Rate must be positive, got {sample_rate}"
            )));
        }
        let channel_count = config.get_f64("Channel Count").unwrap_or(1.0);
        if channel_count < 1.0 {
            return Err(GraphError::ConfigInvalid(
                "Channel Count must be at least 1".into(),
            ));
        }
        let shape = match config.get_str("Shape") {
            Some(text) => Shape::parse(&text)?,
            None => Shape::Sine,
        };
        Ok(WaveParams {
            frequency: config.get_f64("Frequency").unwrap_or(1.0),
            amplitude: config.get_f64("Amplitude").unwrap_or(1.0),
            offset: config.get_f64("Offset").unwrap_or(0.0),
            shape,
            sample_rate,
            channel_count: channel_count as usize,
        })
    }

    pub(crate) fn sample(&self, index: u64) -> f64 {
        let t = index as f64 / self.sample_rate;
        let sine = (TAU * self.frequency * t).sin();
        let value = match self.shape {
            Shape::Sine => sine,
            Shape::Square => {
                if sine >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        self.offset + self.amplitude * value
    }

    pub(crate) fn interval_ns(&self) -> u64 {
        (1e9 / self.sample_rate) as u64
    }
}

/// Synthetic analog source
pub struct WaveGeneratorNode {
    name: String,
    config: ObservableCollection,
    params: Arc<RwLock<WaveParams>>,
    outputs: Arc<NodeOutputs>,
    host: Arc<dyn NodeHost>,
    producer: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl WaveGeneratorNode {
    /// Constructor for the registry
    pub fn create(ctx: NodeContext) -> Result<Box<dyn Node>> {
        let params = WaveParams::from_config(&ctx.config)?;
        Ok(Box::new(WaveGeneratorNode {
            name: ctx.name,
            config: ctx.config,
            params: Arc::new(RwLock::new(params)),
            outputs: ctx.outputs,
            host: ctx.host,
            producer: None,
            running: Arc::new(AtomicBool::new(false)),
        }))
    }
}

#[async_trait]
impl Node for WaveGeneratorNode {
    async fn start(&mut self) -> Result<()> {
        if self.producer.is_some() {
            return Ok(());
        }
        self.running.store(true, Ordering::Release);
        let params = Arc::clone(&self.params);
        let outputs = Arc::clone(&self.outputs);
        let host = Arc::clone(&self.host);

        // Sample counters reach the config tree through the metered updater
        // so high-rate production never floods observers.
        let running = Arc::clone(&self.running);
        let status = MeteredUpdater::new(self.config.clone(), STATUS_INTERVAL, move || {
            running.load(Ordering::Acquire)
        });

        self.producer = Some(tokio::spawn(async move {
            let started = host.now_ns();
            let mut next_sample: u64 = 0;
            let mut timer = tokio::time::interval(POLL_INTERVAL);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                let params = *params.read();
                let interval_ns = params.interval_ns();
                if interval_ns == 0 {
                    continue;
                }
                let elapsed = host.now_ns().saturating_sub(started);
                let target = elapsed / interval_ns;
                if target <= next_sample {
                    continue;
                }
                let count = (target - next_sample) as usize;

                let mut data = Vec::with_capacity(count * params.channel_count);
                let mut spans = Vec::with_capacity(params.channel_count);
                for channel in 0..params.channel_count {
                    let begin = data.len() as u32;
                    for i in 0..count {
                        data.push(params.sample(next_sample + i as u64));
                    }
                    spans.push(Span::new(
                        format!("Channel {channel}"),
                        begin,
                        data.len() as u32,
                    ));
                }
                let intervals = vec![interval_ns; params.channel_count];
                next_sample = target;
                status.set("Samples Written", serde_json::json!(next_sample));

                match AnalogFrame::new(data, spans, intervals, ChannelType::Voltage, elapsed) {
                    Ok(frame) => outputs.publish_analog(frame).await,
                    Err(e) => {
                        debug!(error = %e, "wave frame construction failed");
                    }
                }
            }
        }));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        if let Some(producer) = self.producer.take() {
            producer.abort();
            let _ = producer.await;
        }
        Ok(())
    }

    async fn reconfigure(&mut self, path: &[Key], _value: &Value) -> Result<()> {
        // Every wave parameter applies hot; re-read the whole snapshot.
        let relevant = matches!(
            path.first().and_then(Key::as_field),
            Some("Frequency" | "Amplitude" | "Offset" | "Shape" | "Sample Rate" | "Channel Count")
        );
        if relevant {
            *self.params.write() = WaveParams::from_config(&self.config)?;
            debug!(node = %self.name, "wave parameters updated");
        }
        Ok(())
    }

    async fn process(&mut self, _request: serde_json::Value) -> Result<serde_json::Value> {
        let params = *self.params.read();
        Ok(serde_json::json!({
            "type": TYPE_TAG,
            "frequency": params.frequency,
            "amplitude": params.amplitude,
            "offset": params.offset,
            "sample_rate": params.sample_rate,
            "channels": params.channel_count,
        }))
    }
}
