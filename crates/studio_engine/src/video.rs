use thiserror::Error;

use crate::persist::PersistError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("tensor data length {actual} does not match shape {shape:?}")]
    ShapeMismatch { shape: [usize; 4], actual: usize },
    #[error("unsupported channel count {0}, expected 1 or 3")]
    Channels(usize),
}

/// Decoded video as `[channels, frames, height, width]` samples.
///
/// Samples are expected in the model's value range (normally `[-1, 1]`);
/// the encoder clamps anything outside it.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl VideoTensor {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, TensorError> {
        if shape[0] != 1 && shape[0] != 3 {
            return Err(TensorError::Channels(shape[0]));
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::ShapeMismatch {
                shape,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Builds a tensor by evaluating `sample(channel, frame, y, x)` for every position.
    pub fn from_fn(
        shape: [usize; 4],
        mut sample: impl FnMut(usize, usize, usize, usize) -> f32,
    ) -> Result<Self, TensorError> {
        let [c, t, h, w] = shape;
        let mut data = Vec::with_capacity(c * t * h * w);
        for ch in 0..c {
            for frame in 0..t {
                for y in 0..h {
                    for x in 0..w {
                        data.push(sample(ch, frame, y, x));
                    }
                }
            }
        }
        Self::new(shape, data)
    }

    pub fn channels(&self) -> usize {
        self.shape[0]
    }

    pub fn frames(&self) -> usize {
        self.shape[1]
    }

    pub fn height(&self) -> usize {
        self.shape[2]
    }

    pub fn width(&self) -> usize {
        self.shape[3]
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn plane(&self, channel: usize, frame: usize) -> &[f32] {
        let len = self.height() * self.width();
        let start = (channel * self.frames() + frame) * len;
        &self.data[start..start + len]
    }
}

/// Encodes a tensor as an uncompressed YUV4MPEG2 stream (4:4:4, full range).
pub fn encode_y4m(
    video: &VideoTensor,
    fps: u32,
    value_range: (f32, f32),
) -> Result<Vec<u8>, PersistError> {
    let (lo, hi) = value_range;
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(PersistError::InvalidTensor(format!(
            "value range ({lo}, {hi}) is empty"
        )));
    }
    if video.is_empty() {
        return Err(PersistError::InvalidTensor("tensor has no samples".into()));
    }
    if fps == 0 {
        return Err(PersistError::InvalidTensor("frame rate must be positive".into()));
    }

    let pixels = video.height() * video.width();
    let header = format!(
        "YUV4MPEG2 W{} H{} F{}:1 Ip A1:1 C444\n",
        video.width(),
        video.height(),
        fps
    );
    let mut out = Vec::with_capacity(header.len() + video.frames() * (6 + 3 * pixels));
    out.extend_from_slice(header.as_bytes());

    let to_byte = |v: f32| -> f32 { ((v.clamp(lo, hi) - lo) / (hi - lo)) * 255.0 };
    for frame in 0..video.frames() {
        out.extend_from_slice(b"FRAME\n");
        if video.channels() == 1 {
            let luma = video.plane(0, frame);
            out.extend(luma.iter().map(|v| to_byte(*v).round() as u8));
            out.extend(std::iter::repeat(128u8).take(2 * pixels));
            continue;
        }
        let (r, g, b) = (
            video.plane(0, frame),
            video.plane(1, frame),
            video.plane(2, frame),
        );
        let mut cb = Vec::with_capacity(pixels);
        let mut cr = Vec::with_capacity(pixels);
        for i in 0..pixels {
            let (r, g, b) = (to_byte(r[i]), to_byte(g[i]), to_byte(b[i]));
            // BT.601 full-range.
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            out.push(y.round().clamp(0.0, 255.0) as u8);
            cb.push((128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b).round().clamp(0.0, 255.0) as u8);
            cr.push((128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b).round().clamp(0.0, 255.0) as u8);
        }
        out.extend_from_slice(&cb);
        out.extend_from_slice(&cr);
    }
    Ok(out)
}
