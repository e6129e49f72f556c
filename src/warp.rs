use log::{debug, error};
use opencv::{
    core::{self, Mat, Point2f, Scalar, Size, Vector},
    imgproc::{
        self, ADAPTIVE_THRESH_GAUSSIAN_C, COLOR_BGR2GRAY, COLOR_BGRA2GRAY, INTER_AREA,
        INTER_LINEAR, THRESH_BINARY,
    },
    prelude::*,
};
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::config::{FINAL_H, FINAL_W, WARP_HI_H, WARP_HI_W};
use crate::error::{ExtractorError, Result};
use crate::geometry::Quad;

/// Binarization knobs; the defaults match the dataset the tool was built for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpParams {
    pub block_size: i32,
    pub threshold_c: f64,
    pub median_ksize: i32,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            block_size: 11,
            threshold_c: 2.0,
            median_ksize: 3,
        }
    }
}

/// Warp the quad to the high-res buffer, binarize it there, then shrink to
/// the final `FINAL_W` x `FINAL_H` single-channel strip.
pub fn warp_strip(image: &Mat, quad: &Quad, params: &WarpParams) -> Result<Mat> {
    quad.validate()?;

    let dst = Vector::from_iter([
        Point2f::new(0.0, 0.0),
        Point2f::new((WARP_HI_W - 1) as f32, 0.0),
        Point2f::new((WARP_HI_W - 1) as f32, (WARP_HI_H - 1) as f32),
        Point2f::new(0.0, (WARP_HI_H - 1) as f32),
    ]);
    let m = imgproc::get_perspective_transform_def(&quad.to_vector(), &dst)?;

    let mut warped = Mat::default();
    imgproc::warp_perspective(
        image,
        &mut warped,
        &m,
        Size::new(WARP_HI_W, WARP_HI_H),
        INTER_LINEAR,
        core::BORDER_CONSTANT,
        Scalar::default(),
    )?;

    let gray = match warped.channels() {
        3 => convert(&warped, COLOR_BGR2GRAY)?,
        4 => convert(&warped, COLOR_BGRA2GRAY)?,
        _ => warped,
    };

    let mut binary = Mat::default();
    imgproc::adaptive_threshold(
        &gray,
        &mut binary,
        255.0,
        ADAPTIVE_THRESH_GAUSSIAN_C,
        THRESH_BINARY,
        params.block_size,
        params.threshold_c,
    )?;
    let mut denoised = Mat::default();
    imgproc::median_blur(&binary, &mut denoised, params.median_ksize)?;

    let mut strip = Mat::default();
    imgproc::resize(
        &denoised,
        &mut strip,
        Size::new(FINAL_W, FINAL_H),
        0.0,
        0.0,
        INTER_AREA,
    )?;
    debug!("warped quad {:?} into {}x{} strip", quad.corners, strip.cols(), strip.rows());
    Ok(strip)
}

fn convert(image: &Mat, code: i32) -> Result<Mat> {
    let mut out = Mat::default();
    imgproc::cvt_color_def(image, &mut out, code)?;
    Ok(out)
}

/// A warp running on the blocking pool; poll it once per frame.
pub struct PendingWarp {
    rx: oneshot::Receiver<Result<Mat>>,
}

impl PendingWarp {
    /// `None` while the job is still running.
    pub fn poll(&mut self) -> Option<Result<Mat>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(ExtractorError::JobAborted)),
        }
    }

    pub async fn wait(self) -> Result<Mat> {
        self.rx.await.unwrap_or(Err(ExtractorError::JobAborted))
    }
}

/// Run [`warp_strip`] off the UI thread. `notify` is called once the result
/// has been sent, e.g. to request a repaint.
pub fn spawn_warp<F>(
    runtime: &Handle,
    image: Mat,
    quad: Quad,
    params: WarpParams,
    notify: F,
) -> PendingWarp
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    runtime.spawn_blocking(move || {
        let result = warp_strip(&image, &quad, &params);
        if let Err(e) = &result {
            error!("warp failed: {}", e);
        }
        // receiver gone means the user moved on to another image
        let _ = tx.send(result);
        notify();
    });
    PendingWarp { rx }
}
