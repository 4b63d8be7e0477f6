//! Device playback through rodio.
//!
//! Only compiled with the `playback` feature.

use std::sync::Arc;

use rodio::{buffer::SamplesBuffer, OutputStream, OutputStreamBuilder, Sink};
use tracing::debug;

use crate::{
    codec::SampleBuffer,
    playback::{ActiveVoice, AudioOutput, PlaybackError},
};

/// The default output device. Keep it alive for as long as audio should play.
pub struct RodioOutput {
    stream: OutputStream,
}

impl RodioOutput {
    pub fn open_default() -> Result<Self, PlaybackError> {
        let mut stream =
            OutputStreamBuilder::open_default_stream().map_err(|e| PlaybackError::Device(e.to_string()))?;
        stream.log_on_drop(false);
        debug!("audio output opened");
        Ok(Self { stream })
    }
}

/// One sink on the device mixer.
pub struct RodioVoice {
    sink: Sink,
}

impl ActiveVoice for RodioVoice {
    fn halt(&mut self) {
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}

impl AudioOutput for RodioOutput {
    type Voice = RodioVoice;

    fn start(&mut self, buffer: Arc<SampleBuffer>, rate: f32) -> Result<RodioVoice, PlaybackError> {
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_speed(rate);
        sink.append(SamplesBuffer::new(buffer.channel_count(), buffer.sample_rate(), buffer.interleaved()));
        Ok(RodioVoice { sink })
    }
}
