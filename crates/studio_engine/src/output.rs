use std::path::{Path, PathBuf};

use serde::Serialize;
use studio_logging::studio_debug;

use crate::filename::video_filename;
use crate::generator::GenerationParams;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::settings::OutputSettings;
use crate::video::{encode_y4m, VideoTensor};

/// Turns a generated tensor into a file and returns where it landed.
pub trait VideoSink: Send + Sync {
    fn persist(&self, video: &VideoTensor, params: &GenerationParams)
        -> Result<PathBuf, PersistError>;
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    video: &'a str,
    prompt: &'a str,
    negative_prompt: &'a str,
    size: String,
    steps: u32,
    guide_scale: f32,
    shift_scale: f32,
    seed: u64,
    offload_model: bool,
    fps: u32,
    frames: usize,
    width: usize,
    height: usize,
    created_utc: String,
}

/// Writes `.y4m` files plus an optional JSON sidecar describing the job.
#[derive(Debug, Clone)]
pub struct Y4mVideoSink {
    settings: OutputSettings,
}

impl Y4mVideoSink {
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }
}

impl VideoSink for Y4mVideoSink {
    fn persist(
        &self,
        video: &VideoTensor,
        params: &GenerationParams,
    ) -> Result<PathBuf, PersistError> {
        let bytes = encode_y4m(video, self.settings.fps, self.settings.value_range)?;
        let created_utc = (self.settings.created_utc)();
        let request = &params.request;
        let fingerprint = format!("{}|{}|{}", request.prompt, params.seed, created_utc);
        let filename = video_filename(&request.prompt, &fingerprint, "y4m");

        let writer = AtomicFileWriter::new(self.settings.output_dir.clone());
        let path = writer.write_bytes(&filename, &bytes)?;
        studio_debug!("Wrote {} bytes to {}", bytes.len(), path.display());

        if self.settings.write_manifest {
            let manifest = Manifest {
                video: &filename,
                prompt: &request.prompt,
                negative_prompt: &request.negative_prompt,
                size: request.size.to_string(),
                steps: request.steps,
                guide_scale: request.guide_scale,
                shift_scale: request.shift_scale,
                seed: params.seed,
                offload_model: request.offload_model,
                fps: self.settings.fps,
                frames: video.frames(),
                width: video.width(),
                height: video.height(),
                created_utc,
            };
            let json = serde_json::to_string_pretty(&manifest)?;
            let manifest_name = Path::new(&filename).with_extension("json");
            writer.write(&manifest_name.to_string_lossy(), &json)?;
        }
        Ok(path)
    }
}
