use super::capture::AudioFrame;
use crate::error::CaptureError;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Summary of a finalized recording file
#[derive(Debug, Clone)]
pub struct RecordingMeta {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
}

impl RecordingMeta {
    /// Recorded audio duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Writes the raw capture stream to disk as a WAV file
///
/// One file per meeting. Finalizes on drop if the caller never gets the
/// chance to, so a crash mid-session still leaves a readable file.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    meta: RecordingMeta,
}

impl WavSink {
    pub fn create(
        path: impl AsRef<Path>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CaptureError::Device(format!("failed to create {:?}: {}", parent, e)))?;
        }

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| CaptureError::Device(format!("failed to create WAV {:?}: {}", path, e)))?;

        info!("Recording audio to {:?}", path);

        Ok(Self {
            writer: Some(writer),
            meta: RecordingMeta {
                path,
                sample_rate,
                channels,
                sample_count: 0,
            },
        })
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<(), CaptureError> {
        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| CaptureError::Device(format!("failed to write sample: {}", e)))?;
            }
            self.meta.sample_count += frame.samples.len();
        }
        Ok(())
    }

    pub fn finalize(mut self) -> Result<RecordingMeta, CaptureError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| CaptureError::Device(format!("failed to finalize WAV: {}", e)))?;
        }
        Ok(self.meta.clone())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
