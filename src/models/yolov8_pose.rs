// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8-pose model: loading, preprocessing, inference, postprocessing

use anyhow::{anyhow, Result};
use image::{imageops, RgbImage};
use ndarray::{s, Array, Axis, Ix3, IxDyn};

use super::{Model, PoseCandidate};
use crate::config::LandmarkerConfig;
use crate::{non_max_suppression, Bbox, OrtBackend, OrtConfig, OrtEP, Point2, NUM_KEYPOINTS};

const CXYWH_OFFSET: usize = 4;
const KPT_STEP: usize = 3;
const IOU_THRESHOLD: f32 = 0.45;

pub struct YOLOv8Pose {
    engine: OrtBackend,
    nk: usize,
    conf: f32,
    iou: f32,
    height: u32,
    width: u32,
    profile: bool,
}

impl YOLOv8Pose {
    /// Loads the model selected by the landmarker configuration.
    ///
    /// The candidate floor is the lower of the detection and tracking thresholds so
    /// that tracked subjects can still be recovered by the session.
    pub fn new(config: &LandmarkerConfig) -> Result<Self> {
        let engine = OrtBackend::build(OrtConfig {
            f: config.model_path.clone(),
            ep: config.ep,
            image_size: (config.input_size, config.input_size),
        })?;
        let (height, width) = (engine.height(), engine.width());

        Ok(Self {
            engine,
            nk: NUM_KEYPOINTS,
            conf: config
                .min_pose_detection_confidence
                .min(config.min_tracking_confidence),
            iou: IOU_THRESHOLD,
            height,
            width,
            profile: config.profile,
        })
    }

    fn scale_wh(&self, w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
        let r = (w1 / w0).min(h1 / h0);
        (r, (w0 * r).round(), (h0 * r).round())
    }

    /// Letterboxes into the model input (top-left anchored) and lays out NCHW in [0, 1].
    pub fn preprocess(&self, x: &RgbImage) -> Result<Array<f32, IxDyn>> {
        let mut ys = Array::ones((1, 3, self.height as usize, self.width as usize)).into_dyn();
        ys.fill(144.0 / 255.0);

        let (w0, h0) = x.dimensions();
        if w0 == 0 || h0 == 0 {
            return Err(anyhow!("empty frame"));
        }
        let (_, w_new, h_new) =
            self.scale_wh(w0 as f32, h0 as f32, self.width as f32, self.height as f32);
        let img = imageops::resize(
            x,
            (w_new as u32).max(1),
            (h_new as u32).max(1),
            imageops::FilterType::Triangle,
        );

        for (x, y, rgb) in img.enumerate_pixels() {
            let x = x as usize;
            let y = y as usize;
            let [r, g, b] = rgb.0;
            ys[[0, 0, y, x]] = (r as f32) / 255.0;
            ys[[0, 1, y, x]] = (g as f32) / 255.0;
            ys[[0, 2, y, x]] = (b as f32) / 255.0;
        }

        Ok(ys)
    }

    pub fn postprocess(
        &self,
        xs: Vec<Array<f32, IxDyn>>,
        x0: &RgbImage,
    ) -> Result<Vec<PoseCandidate>> {
        let preds = xs.first().ok_or_else(|| anyhow!("model produced no outputs"))?;
        let (w0, h0) = x0.dimensions();
        let ratio = (self.width as f32 / w0 as f32).min(self.height as f32 / h0 as f32);
        decode_predictions(preds, ratio, w0 as f32, h0 as f32, self.nk, self.conf, self.iou)
    }

    pub fn summary(&self) {
        tracing::info!(
            ep = ?self.engine.ep(),
            height = self.height,
            width = self.width,
            nk = self.nk,
            conf = self.conf,
            iou = self.iou,
            profile = self.profile,
            "YOLOv8-pose loaded{}",
            if let OrtEP::CPU = self.engine.ep() {
                ""
            } else {
                " (may still fall back to CPU)"
            }
        );
    }
}

impl Model for YOLOv8Pose {
    fn forward(&mut self, image: &RgbImage) -> Result<Vec<PoseCandidate>> {
        let t_pre = std::time::Instant::now();
        let xs = self.preprocess(image)?;
        let t_run = std::time::Instant::now();
        let ys = self.engine.run(xs, self.profile)?;
        let t_post = std::time::Instant::now();
        let candidates = self.postprocess(ys, image)?;
        if self.profile {
            tracing::debug!(
                preprocess = ?(t_run - t_pre),
                inference = ?(t_post - t_run),
                postprocess = ?t_post.elapsed(),
                "model timings"
            );
        }
        Ok(candidates)
    }

    fn num_keypoints(&self) -> usize {
        self.nk
    }

    fn summary(&self) {
        YOLOv8Pose::summary(self)
    }
}

/// Decodes a `[1, 4 + 1 + 3 * nk, N]` pose output into candidates in source pixels.
///
/// `ratio` is the letterbox scale applied during preprocessing. Candidates scoring below
/// `conf` are dropped, then overlapping ones are suppressed (IoU above `iou`).
pub fn decode_predictions(
    preds: &Array<f32, IxDyn>,
    ratio: f32,
    width_original: f32,
    height_original: f32,
    nk: usize,
    conf: f32,
    iou: f32,
) -> Result<Vec<PoseCandidate>> {
    let preds = preds.view().into_dimensionality::<Ix3>()?;
    let rows = preds.shape()[1];
    if preds.shape()[0] != 1 || rows < CXYWH_OFFSET + 1 + KPT_STEP * nk {
        return Err(anyhow!(
            "unexpected pose output shape {:?} for {} keypoints",
            preds.shape(),
            nk
        ));
    }

    let anchor = preds.index_axis(Axis(0), 0);
    let mut data: Vec<PoseCandidate> = Vec::new();
    for pred in anchor.axis_iter(Axis(1)) {
        let confidence = pred[CXYWH_OFFSET];
        if confidence < conf {
            continue;
        }

        let bbox = pred.slice(s![0..CXYWH_OFFSET]);
        let cx = bbox[0] / ratio;
        let cy = bbox[1] / ratio;
        let w = bbox[2] / ratio;
        let h = bbox[3] / ratio;
        let x = cx - w / 2.;
        let y = cy - h / 2.;
        let y_bbox = Bbox::new(
            x.max(0.0f32).min(width_original),
            y.max(0.0f32).min(height_original),
            w,
            h,
            confidence,
        );

        let kpts = pred.slice(s![rows - KPT_STEP * nk..]);
        let mut kpts_ = Vec::with_capacity(nk);
        for i in 0..nk {
            let kx = kpts[KPT_STEP * i] / ratio;
            let ky = kpts[KPT_STEP * i + 1] / ratio;
            let kconf = kpts[KPT_STEP * i + 2];
            kpts_.push(Point2::new_with_conf(
                kx.max(0.0f32).min(width_original),
                ky.max(0.0f32).min(height_original),
                kconf,
            ));
        }

        data.push(PoseCandidate {
            bbox: y_bbox,
            keypoints: kpts_,
        });
    }

    non_max_suppression(&mut data, iou);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    const ROWS: usize = CXYWH_OFFSET + 1 + KPT_STEP * NUM_KEYPOINTS;

    fn put(preds: &mut Array3<f32>, col: usize, bbox: [f32; 4], conf: f32, kpt: (f32, f32, f32)) {
        for (i, v) in bbox.iter().enumerate() {
            preds[[0, i, col]] = *v;
        }
        preds[[0, CXYWH_OFFSET, col]] = conf;
        for k in 0..NUM_KEYPOINTS {
            let base = CXYWH_OFFSET + 1 + KPT_STEP * k;
            preds[[0, base, col]] = kpt.0;
            preds[[0, base + 1, col]] = kpt.1;
            preds[[0, base + 2, col]] = kpt.2;
        }
    }

    #[test]
    fn test_decode_rescales_filters_and_suppresses() {
        let mut preds = Array3::<f32>::zeros((1, ROWS, 3));
        put(&mut preds, 0, [100., 100., 40., 80.], 0.9, (110., 90., 0.8));
        put(&mut preds, 1, [102., 101., 40., 80.], 0.7, (0., 0., 0.8));
        put(&mut preds, 2, [300., 300., 40., 80.], 0.1, (0., 0., 0.8));

        let ys = decode_predictions(&preds.into_dyn(), 0.5, 1280., 720., NUM_KEYPOINTS, 0.25, 0.45)
            .unwrap();
        assert_eq!(ys.len(), 1);

        let c = &ys[0];
        assert_eq!(c.score(), 0.9);
        assert_eq!(c.bbox.xmin(), 160.);
        assert_eq!(c.bbox.ymin(), 120.);
        assert_eq!(c.bbox.width(), 80.);
        assert_eq!(c.keypoints.len(), NUM_KEYPOINTS);
        assert_eq!(c.keypoints[5].x(), 220.);
        assert_eq!(c.keypoints[5].y(), 180.);
        assert!((c.presence() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_decode_clamps_to_frame() {
        let mut preds = Array3::<f32>::zeros((1, ROWS, 1));
        put(&mut preds, 0, [10., 10., 40., 40.], 0.9, (700., -5., 0.9));
        let ys = decode_predictions(&preds.into_dyn(), 1.0, 640., 480., NUM_KEYPOINTS, 0.25, 0.45)
            .unwrap();
        assert_eq!(ys[0].bbox.xmin(), 0.);
        assert_eq!(ys[0].keypoints[0].x(), 640.);
        assert_eq!(ys[0].keypoints[0].y(), 0.);
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let preds = Array3::<f32>::zeros((1, 10, 4)).into_dyn();
        assert!(decode_predictions(&preds, 1.0, 640., 480., NUM_KEYPOINTS, 0.25, 0.45).is_err());
    }

    #[test]
    fn test_decode_empty_output() {
        let preds = Array3::<f32>::zeros((1, ROWS, 0)).into_dyn();
        let ys = decode_predictions(&preds, 1.0, 640., 480., NUM_KEYPOINTS, 0.25, 0.45).unwrap();
        assert!(ys.is_empty());
    }
}
