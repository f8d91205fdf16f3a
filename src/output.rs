//! Realtime audio output.
//!
//! Opens the default output device and pulls rendered samples from a
//! [`Mixer`]. The stream adopts the device's sample rate and channel count;
//! the mixer renders mono and the callback fans it out per channel.
//!
//! Everything else in the crate works without an output stream attached,
//! which keeps the engine testable on machines with no audio device.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::EarplayError;
use crate::mixer::Mixer;

/// A running audio stream. Dropping it stops playback.
pub struct OutputStream {
    _stream: cpal::Stream,
}

/// Open the default output device and start draining the mixer.
///
/// # Errors
/// [`EarplayError::Audio`] when no device is available or the stream
/// cannot be built or started.
pub fn open_output(mixer: Arc<Mixer>) -> Result<OutputStream, EarplayError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| EarplayError::Audio("no output device found".to_string()))?;
    let config = device
        .default_output_config()
        .map_err(|e| EarplayError::Audio(e.to_string()))?
        .config();

    let channels = config.channels.max(1) as usize;
    mixer.set_sample_rate(config.sample_rate.0);

    let mut mono: Vec<f32> = Vec::new();
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0.0);
                mixer.render(&mut mono);

                for (frame, value) in data.chunks_mut(channels).zip(mono.iter()) {
                    for sample in frame.iter_mut() {
                        *sample = *value;
                    }
                }
            },
            // Stream glitches degrade silently, the session must go on.
            |_err| {},
            None,
        )
        .map_err(|e| EarplayError::Audio(e.to_string()))?;

    stream.play().map_err(|e| EarplayError::Audio(e.to_string()))?;

    Ok(OutputStream { _stream: stream })
}
