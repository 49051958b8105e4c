//! Short-time spectra for the spectrogram endpoint
//!
//! One `ChannelStft` per requested channel: samples accumulate in a sliding
//! buffer; every `hop` new samples past a full `window`, an FFT of the most
//! recent window is emitted as interleaved re/im pairs for the one-sided
//! spectrum.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use thalamus_protocol::SpectrogramChannel;

/// STFT state for one analog channel
pub struct ChannelStft {
    name: String,
    window: usize,
    hop: usize,
    buffer: VecDeque<f64>,
    fft: Arc<dyn Fft<f64>>,
    /// Nyquist frequency at this channel's sample rate
    max_frequency: f64,
}

impl ChannelStft {
    /// Build for a channel sampled every `sample_interval_ns`
    ///
    /// Window and hop are rounded to whole samples, at least one each.
    pub fn new(name: impl Into<String>, sample_interval_ns: u64, window_s: f64, hop_s: f64) -> Self {
        let interval_s = (sample_interval_ns.max(1)) as f64 * 1e-9;
        let window = ((window_s / interval_s).round() as usize).max(1);
        let hop = ((hop_s / interval_s).round() as usize).max(1);
        let mut planner = FftPlanner::new();
        Self {
            name: name.into(),
            window,
            hop,
            buffer: VecDeque::with_capacity(window + hop),
            fft: planner.plan_fft_forward(window),
            max_frequency: 0.5 / interval_s,
        }
    }

    /// Channel name this state follows
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Window length in samples
    pub fn window(&self) -> usize {
        self.window
    }

    /// Feed samples; returns one spectrum per completed hop
    pub fn push(&mut self, samples: &[f64]) -> Vec<SpectrogramChannel> {
        let mut spectra = Vec::new();
        for sample in samples {
            self.buffer.push_back(*sample);
            if self.buffer.len() >= self.window {
                spectra.push(self.compute());
                for _ in 0..self.hop.min(self.buffer.len()) {
                    self.buffer.pop_front();
                }
            }
        }
        spectra
    }

    fn compute(&self) -> SpectrogramChannel {
        let mut input: Vec<Complex<f64>> = self
            .buffer
            .iter()
            .take(self.window)
            .map(|s| Complex::new(*s, 0.0))
            .collect();
        self.fft.process(&mut input);

        // One-sided spectrum: bins 0..=window/2, interleaved re/im
        let half = self.window / 2;
        let mut data = Vec::with_capacity((half + 1) * 2);
        for bin in input.iter().take(half + 1) {
            data.push(bin.re);
            data.push(bin.im);
        }
        SpectrogramChannel {
            data,
            max_frequency: self.max_frequency,
        }
    }
}
