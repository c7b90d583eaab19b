/*
 * Detection Module
 *
 * The seam to the person detector. Detections arrive as labelled boxes in
 * video pixel coordinates; only "person" boxes are used, scaled to the canvas
 * and padded into a region of interest for edge extraction.
 *
 * Detection is slow compared to a frame, so it runs on a worker thread. The
 * scheduler decides when a new request may go out: only on every Nth frame,
 * no sooner than a fixed interval after the last successful detection, and
 * never while another request is still in flight.
 */

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::edges::Region;
use crate::error::DetectionError;
use crate::video::{VideoFrame, CHANNELS};

pub const PERSON: &str = "person";

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class: String,
    /// `[x, y, width, height]` in source video pixels.
    pub bbox: [f32; 4],
    pub score: f32,
}

/// An axis-aligned box in canvas pixels, origin top-left, y down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Detection {
    pub fn person(bbox: [f32; 4], score: f32) -> Self {
        Self {
            class: PERSON.to_string(),
            bbox,
            score,
        }
    }

    pub fn is_person(&self) -> bool {
        self.class == PERSON
    }

    pub fn is_valid(&self) -> bool {
        self.bbox.iter().all(|v| v.is_finite()) && self.bbox[2] >= 0.0 && self.bbox[3] >= 0.0
    }

    /// Scale the box from video resolution to canvas resolution.
    pub fn to_canvas(&self, video_size: (u32, u32), canvas_size: (u32, u32)) -> Option<CanvasBox> {
        let (video_w, video_h) = video_size;
        if video_w == 0 || video_h == 0 {
            return None;
        }
        let scale_x = canvas_size.0 as f32 / video_w as f32;
        let scale_y = canvas_size.1 as f32 / video_h as f32;
        let [x, y, w, h] = self.bbox;

        Some(CanvasBox {
            x: x * scale_x,
            y: y * scale_y,
            width: w * scale_x,
            height: h * scale_y,
        })
    }
}

impl CanvasBox {
    /// Pad and clamp to `[1, size - 1]`, keeping a margin for 3x3 neighborhoods.
    pub fn region_of_interest(&self, padding: f32, canvas_size: (u32, u32)) -> Region {
        let max_x = canvas_size.0.saturating_sub(1) as f32;
        let max_y = canvas_size.1.saturating_sub(1) as f32;

        let start_x = (self.x - padding).floor().max(1.0);
        let start_y = (self.y - padding).floor().max(1.0);
        let end_x = (self.x + self.width + padding).ceil().min(max_x);
        let end_y = (self.y + self.height + padding).ceil().min(max_y);

        // Negative ends saturate to 0 and leave a degenerate region
        Region::new(start_x as usize, start_y as usize, end_x as usize, end_y as usize)
    }
}

/// First person box of a detection set.
pub fn first_person(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().find(|d| d.is_person())
}

/// A person detector. Implementations run on the detection worker thread.
pub trait Detector: Send {
    /// Whether the model is ready to run.
    fn is_loaded(&self) -> bool {
        true
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError>;
}

/// Treats the bounding box of all dark pixels as one person.
///
/// Good enough for high-contrast scenes such as the synthetic source.
#[derive(Clone, Debug)]
pub struct SilhouetteDetector {
    pub level: f32,
    pub min_coverage: f32,
}

impl Default for SilhouetteDetector {
    fn default() -> Self {
        Self {
            level: 0.4,
            min_coverage: 0.002,
        }
    }
}

impl Detector for SilhouetteDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError> {
        frame.validate()?;

        let cutoff = self.level * 255.0;
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut count = 0usize;

        for (i, px) in frame.pixels.chunks_exact(CHANNELS).enumerate() {
            let luma = 0.2126 * px[0] as f32 + 0.7152 * px[1] as f32 + 0.0722 * px[2] as f32;
            if luma < cutoff {
                let x = (i % frame.width as usize) as u32;
                let y = (i / frame.width as usize) as u32;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                count += 1;
            }
        }

        let total = frame.width as usize * frame.height as usize;
        if count == 0 || (count as f32 / total as f32) < self.min_coverage {
            return Ok(Vec::new());
        }

        let width = (max_x - min_x + 1) as f32;
        let height = (max_y - min_y + 1) as f32;
        let score = count as f32 / (width * height);

        Ok(vec![Detection::person(
            [min_x as f32, min_y as f32, width, height],
            score,
        )])
    }
}

/// Rate gate for detection requests.
#[derive(Clone, Debug)]
pub struct DetectionScheduler {
    pub interval: Duration,
    pub frame_stride: u64,
    last_detection: Option<Duration>,
    in_flight: bool,
}

impl DetectionScheduler {
    pub fn new(interval: Duration, frame_stride: u64) -> Self {
        Self {
            interval,
            frame_stride,
            last_detection: None,
            in_flight: false,
        }
    }

    /// Whether `frame` is one of the frames on which detection is considered.
    pub fn is_detection_frame(&self, frame: u64) -> bool {
        self.frame_stride > 0 && frame % self.frame_stride == 0
    }

    /// Whether enough time passed since the last successful detection.
    pub fn is_detection_time(&self, now: Duration) -> bool {
        match self.last_detection {
            Some(last) => now.saturating_sub(last) > self.interval,
            None => true,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_detection(&self) -> Option<Duration> {
        self.last_detection
    }

    pub fn mark_requested(&mut self) {
        self.in_flight = true;
    }

    /// Record a finished request. Only successes move the rate gate.
    pub fn complete(&mut self, now: Duration, succeeded: bool) {
        self.in_flight = false;
        if succeeded {
            self.last_detection = Some(now);
        }
    }
}

pub type DetectionResult = Result<Vec<Detection>, DetectionError>;

/// Runs a detector on its own thread.
pub struct DetectionWorker {
    requests: Option<Sender<VideoFrame>>,
    results: Receiver<DetectionResult>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    pub fn spawn(mut detector: Box<dyn Detector>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<VideoFrame>();
        let (result_tx, result_rx) = mpsc::channel::<DetectionResult>();

        let handle = thread::Builder::new()
            .name("detector".to_string())
            .spawn(move || {
                for frame in request_rx {
                    let result = if detector.is_loaded() {
                        detector.detect(&frame)
                    } else {
                        Err(DetectionError::NotLoaded)
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                debug!("Detection worker stopped");
            })?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, frame: VideoFrame) -> Result<(), DetectionError> {
        match &self.requests {
            Some(tx) => tx.send(frame).map_err(|_| DetectionError::WorkerGone),
            None => Err(DetectionError::WorkerGone),
        }
    }

    /// A finished result, if one is waiting.
    pub fn try_recv(&self) -> Option<DetectionResult> {
        match self.results.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(DetectionError::WorkerGone)),
        }
    }

    /// Block until the next result arrives.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DetectionResult> {
        self.results.recv_timeout(timeout).ok()
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Detection worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError> {
            Err(DetectionError::Failed("model exploded".to_string()))
        }
    }

    struct UnloadedDetector;

    impl Detector for UnloadedDetector {
        fn is_loaded(&self) -> bool {
            false
        }

        fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError> {
            Ok(vec![Detection::person([0.0, 0.0, 1.0, 1.0], 1.0)])
        }
    }

    #[test]
    fn scales_box_to_canvas() {
        let det = Detection::person([10.0, 20.0, 30.0, 40.0], 0.9);
        let scaled = det.to_canvas((320, 240), (640, 720)).unwrap();
        assert_eq!(
            scaled,
            CanvasBox {
                x: 20.0,
                y: 60.0,
                width: 60.0,
                height: 120.0
            }
        );
        assert!(det.to_canvas((0, 240), (640, 480)).is_none());
    }

    #[test]
    fn region_is_padded_and_clamped() {
        let inner = CanvasBox {
            x: 50.5,
            y: 40.0,
            width: 20.0,
            height: 10.2,
        };
        assert_eq!(
            inner.region_of_interest(10.0, (200, 100)),
            Region::new(40, 30, 81, 61)
        );

        let edge = CanvasBox {
            x: 2.0,
            y: -5.0,
            width: 300.0,
            height: 300.0,
        };
        assert_eq!(
            edge.region_of_interest(10.0, (200, 100)),
            Region::new(1, 1, 199, 99)
        );

        let outside = CanvasBox {
            x: -500.0,
            y: 10.0,
            width: 20.0,
            height: 20.0,
        };
        assert!(outside.region_of_interest(10.0, (200, 100)).is_degenerate());
    }

    #[test]
    fn only_person_boxes_are_used() {
        let detections = vec![
            Detection {
                class: "dog".to_string(),
                bbox: [0.0, 0.0, 5.0, 5.0],
                score: 0.99,
            },
            Detection::person([1.0, 2.0, 3.0, 4.0], 0.5),
        ];
        assert_eq!(first_person(&detections).unwrap().bbox, [1.0, 2.0, 3.0, 4.0]);
        assert!(first_person(&detections[..1]).is_none());
    }

    #[test]
    fn invalid_boxes_are_flagged() {
        assert!(!Detection::person([f32::NAN, 0.0, 1.0, 1.0], 1.0).is_valid());
        assert!(!Detection::person([0.0, 0.0, -1.0, 1.0], 1.0).is_valid());
        assert!(Detection::person([0.0, 0.0, 1.0, 1.0], 1.0).is_valid());
    }

    #[test]
    fn silhouette_detector_boxes_dark_pixels() {
        let mut frame = VideoFrame::filled(40, 30, 230);
        for y in 5..15 {
            for x in 10..20 {
                frame.set_pixel(x, y, [10, 10, 10, 255]);
            }
        }
        let detections = SilhouetteDetector::default().detect(&frame).unwrap();
        assert_eq!(detections.len(), 1);
        assert!(detections[0].is_person());
        assert_eq!(detections[0].bbox, [10.0, 5.0, 10.0, 10.0]);
        assert_eq!(detections[0].score, 1.0);
    }

    #[test]
    fn silhouette_detector_rejects_malformed_frames() {
        let truncated = VideoFrame {
            width: 8,
            height: 8,
            pixels: vec![0; 12],
        };
        let err = SilhouetteDetector::default().detect(&truncated).unwrap_err();
        assert!(matches!(err, DetectionError::Failed(ref msg) if msg.contains("expected 256")));
        assert!(SilhouetteDetector::default()
            .detect(&VideoFrame::filled(0, 0, 0))
            .is_err());
    }

    #[test]
    fn silhouette_detector_sees_nobody_in_an_empty_scene() {
        let frame = VideoFrame::filled(40, 30, 230);
        assert!(SilhouetteDetector::default().detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn scheduler_honours_stride() {
        let scheduler = DetectionScheduler::new(Duration::from_millis(100), 10);
        assert!(!scheduler.is_detection_frame(9));
        assert!(scheduler.is_detection_frame(10));
        assert!(scheduler.is_detection_frame(20));
        assert!(!DetectionScheduler::new(Duration::ZERO, 0).is_detection_frame(10));
    }

    #[test]
    fn scheduler_rate_limits_after_success_only() {
        let mut scheduler = DetectionScheduler::new(Duration::from_millis(100), 10);
        assert!(scheduler.is_detection_time(Duration::ZERO));

        scheduler.mark_requested();
        assert!(scheduler.in_flight());
        scheduler.complete(Duration::from_millis(500), true);
        assert!(!scheduler.in_flight());
        assert!(!scheduler.is_detection_time(Duration::from_millis(600)));
        assert!(scheduler.is_detection_time(Duration::from_millis(601)));

        scheduler.mark_requested();
        scheduler.complete(Duration::from_millis(900), false);
        assert_eq!(scheduler.last_detection(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn worker_round_trips_a_detection() {
        let worker = DetectionWorker::spawn(Box::new(SilhouetteDetector::default())).unwrap();
        let mut frame = VideoFrame::filled(20, 20, 250);
        frame.set_pixel(5, 5, [0, 0, 0, 255]);
        worker.submit(frame).unwrap();

        let result = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.unwrap()[0].bbox, [5.0, 5.0, 1.0, 1.0]);
    }

    #[test]
    fn worker_reports_failures() {
        let worker = DetectionWorker::spawn(Box::new(FailingDetector)).unwrap();
        worker.submit(VideoFrame::filled(4, 4, 0)).unwrap();
        let result = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(DetectionError::Failed(_))));

        let unloaded = DetectionWorker::spawn(Box::new(UnloadedDetector)).unwrap();
        unloaded.submit(VideoFrame::filled(4, 4, 0)).unwrap();
        let result = unloaded.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, Err(DetectionError::NotLoaded));
    }
}
