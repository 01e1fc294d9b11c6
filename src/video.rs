use cv2::prelude::*;
use opencv as cv2;

use anyhow::{bail, Context as AnyhowContext, Result};
use ndarray as nd;
use tracing::info;

use crate::adapter::{AnnotatedFrame, FrameSource, OutputSink};
use crate::codec::*;
use crate::image::ColorFrame;

trait AsArray {
    fn try_as_array(&self) -> Result<nd::Array3<u8>>;
}

impl AsArray for cv2::core::Mat {
    fn try_as_array(&self) -> Result<nd::Array3<u8>> {
        let bytes = self.data_bytes()?;
        let size = self.size()?;
        let a = nd::ArrayView3::from_shape((size.height as usize, size.width as usize, 3), bytes)?;
        Ok(a.to_owned())
    }
}

/// Decodes a video file frame by frame.
pub struct VideoInput {
    capture: cv2::videoio::VideoCapture,
    bgr: cv2::core::Mat,
    rgb: cv2::core::Mat,
    frame_count: Option<u64>,
    read: u64,
    fps: f64,
}

impl VideoInput {
    pub fn open(path: &str) -> Result<VideoInput> {
        let capture = cv2::videoio::VideoCapture::from_file(path, cv2::videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video {path}"))?;
        if !capture.is_opened()? {
            bail!("Failed to open video {path}");
        }
        let fourcc = fourcc_from_property(capture.get(cv2::videoio::CAP_PROP_FOURCC)?);
        let fps = capture.get(cv2::videoio::CAP_PROP_FPS)?;
        let frame_count = capture.get(cv2::videoio::CAP_PROP_FRAME_COUNT)?;
        info!(path, codec = %fourcc_to_string(fourcc), fps, frame_count, "opened video");
        Ok(VideoInput {
            capture,
            bgr: cv2::core::Mat::default(),
            rgb: cv2::core::Mat::default(),
            frame_count: (frame_count > 0.).then(|| frame_count as u64),
            read: 0,
            fps,
        })
    }
}

impl FrameSource for VideoInput {
    fn next_frame(&mut self) -> Result<Option<ColorFrame>> {
        if !self.capture.read(&mut self.bgr)? || self.bgr.empty() {
            return Ok(None);
        }
        self.read += 1;
        cv2::imgproc::cvt_color(&self.bgr, &mut self.rgb, cv2::imgproc::COLOR_BGR2RGB, 0)?;
        Ok(Some(self.rgb.try_as_array()?))
    }

    fn len_hint(&self) -> Option<u64> {
        self.frame_count.map(|n| n.saturating_sub(self.read))
    }

    fn fps(&self) -> Option<f64> {
        (self.fps.is_finite() && self.fps > 0.).then_some(self.fps)
    }
}

/// Encodes annotated frames into a video file. The writer is opened on the
/// first frame, when the frame size is known.
pub struct VideoOutput {
    path: String,
    fourcc: u32,
    fps: f64,
    writer: Option<cv2::videoio::VideoWriter>,
    bgr: cv2::core::Mat,
}

impl VideoOutput {
    pub fn new(path: &str, codec: [u8; 4], fps: f64) -> Self {
        VideoOutput {
            path: path.to_string(),
            fourcc: fourcc_code(codec),
            fps,
            writer: None,
            bgr: cv2::core::Mat::default(),
        }
    }
}

/// Wrap an RGB frame as an 8UC3 `Mat` without copying. The `Mat` must not
/// outlive `image`.
fn rgb_to_cv_8uc3(image: &[u8], height: usize, width: usize) -> Result<cv2::core::Mat> {
    let mat = unsafe {
        cv2::core::Mat::new_rows_cols_with_data(
            height as i32,
            width as i32,
            cv2::core::CV_8UC3,
            image.as_ptr() as *mut std::ffi::c_void,
            cv2::core::Mat_AUTO_STEP,
        )?
    };
    Ok(mat)
}

impl OutputSink for VideoOutput {
    fn write(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        let image = frame.image.as_standard_layout();
        let (height, width, _) = image.dim();
        let bytes = image.as_slice().context("frame is not contiguous")?;
        let rgb = rgb_to_cv_8uc3(bytes, height, width)?;
        cv2::imgproc::cvt_color(&rgb, &mut self.bgr, cv2::imgproc::COLOR_RGB2BGR, 0)?;
        if self.writer.is_none() {
            let size = self.bgr.size()?;
            let writer = cv2::videoio::VideoWriter::new(
                &self.path,
                self.fourcc as i32,
                self.fps,
                size,
                true,
            )
            .with_context(|| format!("Failed to open video writer {}", self.path))?;
            if !writer.is_opened()? {
                bail!("Failed to open video writer {}", self.path);
            }
            self.writer = Some(writer);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write(&self.bgr)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.release()?;
        }
        Ok(())
    }
}
