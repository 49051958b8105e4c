//! Tests for the spectrogram STFT

use super::spectral::ChannelStft;

/// Magnitude of bin `k` from interleaved re/im data
fn magnitude(data: &[f64], k: usize) -> f64 {
    let re = data[2 * k];
    let im = data[2 * k + 1];
    (re * re + im * im).sqrt()
}

#[test]
fn test_window_and_hop_round_to_samples() {
    // 1 kHz channel, 64 ms window, 16 ms hop
    let stft = ChannelStft::new("X", 1_000_000, 0.064, 0.016);
    assert_eq!(stft.window(), 64);
}

#[test]
fn test_no_output_until_window_full() {
    let mut stft = ChannelStft::new("X", 1_000_000, 0.008, 0.004);
    assert!(stft.push(&[0.0; 7]).is_empty());
    assert_eq!(stft.push(&[0.0]).len(), 1);
}

#[test]
fn test_pure_tone_peaks_at_its_bin() {
    // 1 kHz sample rate, 32-sample window: bin k is k * 1000/32 Hz.
    // A 125 Hz tone lands exactly in bin 4.
    let sample_rate = 1000.0;
    let window = 32;
    let mut stft = ChannelStft::new("X", 1_000_000, window as f64 / sample_rate, 0.032);

    let samples: Vec<f64> = (0..window)
        .map(|i| (std::f64::consts::TAU * 125.0 * i as f64 / sample_rate).sin())
        .collect();
    let spectra = stft.push(&samples);
    assert_eq!(spectra.len(), 1);

    let spectrum = &spectra[0];
    assert_eq!(spectrum.max_frequency, 500.0);
    // One-sided spectrum: window/2 + 1 complex pairs
    assert_eq!(spectrum.data.len(), (window / 2 + 1) * 2);

    let peak_bin = (0..=window / 2)
        .max_by(|a, b| {
            magnitude(&spectrum.data, *a)
                .partial_cmp(&magnitude(&spectrum.data, *b))
                .unwrap()
        })
        .unwrap();
    assert_eq!(peak_bin, 4);
}

#[test]
fn test_dc_signal_peaks_at_bin_zero() {
    let mut stft = ChannelStft::new("X", 1_000_000, 0.016, 0.016);
    let spectra = stft.push(&[3.0; 16]);
    assert_eq!(spectra.len(), 1);

    let data = &spectra[0].data;
    // DC bin holds the coherent sum; every other bin is ~0
    assert!((magnitude(data, 0) - 48.0).abs() < 1e-9);
    for k in 1..=8 {
        assert!(magnitude(data, k) < 1e-9);
    }
}

#[test]
fn test_hop_advances_between_spectra() {
    let mut stft = ChannelStft::new("X", 1_000_000, 0.004, 0.002);
    // window=4, hop=2: feeding 8 samples yields 3 spectra (at 4, 6, 8)
    let spectra = stft.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!(spectra.len(), 3);
}
