//! Graph binning - mean-downsampling of analog channels
//!
//! The `graph` endpoint bins a node's analog output at a fixed `bin_ns`
//! using the mean over each window. Channel layout changes reset the
//! accumulators and surface as a boundary emission with empty bins.

use thalamus_protocol::{AnalogFrame, GraphResponse, Span};

/// One emission from the binner
#[derive(Debug, Clone, PartialEq)]
pub enum BinEvent {
    /// Channel layout changed; empty bins, new spans
    Boundary(GraphResponse),
    /// New mean bins
    Bins(GraphResponse),
}

struct ChannelBins {
    name: String,
    /// Samples per bin at this channel's rate, at least 1
    samples_per_bin: u64,
    sum: f64,
    count: u64,
    /// Completed bins since the last emission
    ready: Vec<f64>,
}

/// Mean-bins selected channels of an analog stream at a fixed `bin_ns`
pub struct GraphBinner {
    bin_ns: u64,
    /// Requested channel names; empty selects all
    filter: Vec<String>,
    channels: Vec<ChannelBins>,
    /// Spans and intervals of the frames feeding the current accumulators
    layout: Option<AnalogFrame>,
}

impl GraphBinner {
    /// Bin at `bin_ns`, selecting `channel_names` (empty = all channels)
    pub fn new(bin_ns: u64, channel_names: Vec<String>) -> Self {
        Self {
            bin_ns: bin_ns.max(1),
            filter: channel_names,
            channels: Vec::new(),
            layout: None,
        }
    }

    fn selects(&self, name: &str) -> bool {
        self.filter.is_empty() || self.filter.iter().any(|n| n == name)
    }

    fn rebuild(&mut self, frame: &AnalogFrame) -> GraphResponse {
        self.channels.clear();
        let mut spans = Vec::new();
        for (span, interval) in frame.spans().iter().zip(frame.sample_intervals()) {
            if !self.selects(&span.name) {
                continue;
            }
            let samples_per_bin = if *interval == 0 {
                1
            } else {
                (self.bin_ns / *interval).max(1)
            };
            spans.push(Span::new(span.name.clone(), 0, 0));
            self.channels.push(ChannelBins {
                name: span.name.clone(),
                samples_per_bin,
                sum: 0.0,
                count: 0,
                ready: Vec::new(),
            });
        }
        self.layout = Some(frame.layout_only());
        GraphResponse {
            bins: Vec::new(),
            spans,
        }
    }

    /// Feed one frame; returns boundary and bin emissions in order
    pub fn push(&mut self, frame: &AnalogFrame) -> Vec<BinEvent> {
        let mut events = Vec::new();

        let layout_changed = match &self.layout {
            Some(layout) => !layout.same_layout(frame),
            None => true,
        };
        if layout_changed {
            // The very first frame defines the layout silently; only a
            // change after that is a boundary.
            let had_layout = self.layout.is_some();
            let boundary = self.rebuild(frame);
            if had_layout {
                events.push(BinEvent::Boundary(boundary));
            }
        }

        for state in &mut self.channels {
            let Some(samples) = frame.channel_by_name(&state.name) else {
                continue;
            };
            for sample in samples {
                state.sum += *sample;
                state.count += 1;
                if state.count >= state.samples_per_bin {
                    state.ready.push(state.sum / state.count as f64);
                    state.sum = 0.0;
                    state.count = 0;
                }
            }
        }

        if self.channels.iter().any(|c| !c.ready.is_empty()) {
            let mut bins = Vec::new();
            let mut spans = Vec::new();
            for state in &mut self.channels {
                let begin = bins.len() as u32;
                bins.append(&mut state.ready);
                spans.push(Span::new(state.name.clone(), begin, bins.len() as u32));
            }
            events.push(BinEvent::Bins(GraphResponse { bins, spans }));
        }

        events
    }
}
