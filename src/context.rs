/*
 * Simulation Context Module
 *
 * Everything one run of the effect needs between frames: the current
 * detections, the frame counter, the detection scheduler and backend, and the
 * particle system. The app creates one at startup and calls `step` once per
 * frame; nothing else mutates it.
 *
 * Per frame:
 * 1. Collect a finished detection, if any
 * 2. Maybe request a new one (frame stride, rate gate, single in flight)
 * 3. Filter the frame to a canvas-sized luminance buffer
 * 4. Extract edges around the first person and advance the swarm
 */

use std::time::Duration;

use log::{debug, error, info, trace, warn};

use crate::detection::{
    first_person, CanvasBox, Detection, DetectionResult, DetectionScheduler, DetectionWorker,
    Detector,
};
use crate::edges::{sanitize_edges, EdgeExtractor, EdgePoint};
use crate::error::{DetectionError, FrameError};
use crate::params::SimulationParams;
use crate::particle_system::{ParticleSystem, UpdateStats};
use crate::video::VideoFrame;

/// Where detection requests go.
pub enum DetectionBackend {
    /// Background thread; results show up on a later frame.
    Worker(DetectionWorker),
    /// Same thread; results apply immediately. Used by tests and as a fallback.
    Inline(Box<dyn Detector>),
}

/// What the renderer needs to know about the frame just simulated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameOutput {
    /// Person box in canvas pixels.
    pub person: Option<CanvasBox>,
    pub edge_count: usize,
    pub stats: UpdateStats,
    /// Whether the swarm ran this frame and should be drawn.
    pub active: bool,
}

pub struct SimulationContext {
    pub particles: ParticleSystem,
    pub detections: Vec<Detection>,
    pub edges: Vec<EdgePoint>,
    pub frame_count: u64,
    /// Last filtered, canvas-sized frame.
    pub filtered: Option<VideoFrame>,
    scheduler: DetectionScheduler,
    backend: DetectionBackend,
    canvas_size: (u32, u32),
    malformed_reported: bool,
    bad_frame_reported: bool,
    worker_gone_reported: bool,
}

impl SimulationContext {
    pub fn new(params: &SimulationParams, canvas_size: (u32, u32), backend: DetectionBackend) -> Self {
        Self {
            particles: ParticleSystem::new(params, canvas_size.0 as f32, canvas_size.1 as f32),
            detections: Vec::new(),
            edges: Vec::new(),
            frame_count: 0,
            filtered: None,
            scheduler: DetectionScheduler::new(params.detection_interval, params.detection_frame_stride),
            backend,
            canvas_size,
            malformed_reported: false,
            bad_frame_reported: false,
            worker_gone_reported: false,
        }
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    pub fn detection_in_flight(&self) -> bool {
        self.scheduler.in_flight()
    }

    pub fn resize(&mut self, canvas_size: (u32, u32)) {
        if canvas_size == self.canvas_size {
            return;
        }
        info!("Canvas resized to {}x{}", canvas_size.0, canvas_size.1);
        self.canvas_size = canvas_size;
        self.particles.resize(canvas_size.0 as f32, canvas_size.1 as f32);
        self.edges.clear();
        self.filtered = None;
    }

    /// Throw the swarm away and start over with a fresh random source.
    pub fn rebuild_particles(&mut self, params: &SimulationParams) {
        self.particles = ParticleSystem::new(
            params,
            self.canvas_size.0 as f32,
            self.canvas_size.1 as f32,
        );
    }

    /// Advance one rendered frame. `now` is the time since the run started.
    pub fn step(
        &mut self,
        frame: Option<VideoFrame>,
        source_ready: bool,
        now: Duration,
        params: &SimulationParams,
    ) -> FrameOutput {
        self.frame_count += 1;
        self.scheduler.interval = params.detection_interval;
        self.scheduler.frame_stride = params.detection_frame_stride;

        self.poll_detections(now);

        // A malformed frame is treated like no frame at all
        let frame = match frame.map(|f| f.validate().map(|()| f)) {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return self.skip_frame(Some(e)),
            None => return self.skip_frame(None),
        };

        self.maybe_request_detection(&frame, source_ready, now);

        let video_size = (frame.width, frame.height);
        let mut canvas_frame = match frame.resized(self.canvas_size.0, self.canvas_size.1) {
            Ok(resized) => resized,
            Err(e) => return self.skip_frame(Some(e)),
        };
        canvas_frame.grayscale();
        canvas_frame.threshold(params.threshold_level);

        let output = self.track_person(&canvas_frame, video_size, params);
        self.filtered = Some(canvas_frame);
        output
    }

    fn skip_frame(&mut self, error: Option<FrameError>) -> FrameOutput {
        if let Some(e) = error {
            if !self.bad_frame_reported {
                warn!("Skipping unusable frame: {}", e);
                self.bad_frame_reported = true;
            }
        }
        self.filtered = None;
        self.edges.clear();
        FrameOutput::default()
    }

    fn track_person(
        &mut self,
        canvas_frame: &VideoFrame,
        video_size: (u32, u32),
        params: &SimulationParams,
    ) -> FrameOutput {
        self.edges.clear();

        let Some(person) = first_person(&self.detections)
            .and_then(|det| det.to_canvas(video_size, self.canvas_size))
        else {
            return FrameOutput::default();
        };

        let region = person.region_of_interest(params.roi_padding, self.canvas_size);
        let extractor = EdgeExtractor::new(params.edge_threshold, params.edge_direction_scale);
        self.edges = extractor.extract(&canvas_frame.as_luma(), region);

        let dropped = sanitize_edges(&mut self.edges);
        if dropped > 0 && !self.malformed_reported {
            warn!("Dropped {} malformed edge points", dropped);
            self.malformed_reported = true;
        }
        trace!("Detected edges: {}", self.edges.len());

        if self.particles.is_empty() && !self.edges.is_empty() {
            self.particles.initialize_particles(&self.edges, params);
        }
        let stats = self.particles.update(&self.edges, params);

        FrameOutput {
            person: Some(person),
            edge_count: self.edges.len(),
            stats,
            active: !self.edges.is_empty(),
        }
    }

    fn poll_detections(&mut self, now: Duration) {
        let result = match &self.backend {
            DetectionBackend::Worker(worker) => worker.try_recv(),
            DetectionBackend::Inline(_) => None,
        };
        if let Some(result) = result {
            self.apply_detection(result, now);
        }
    }

    fn maybe_request_detection(&mut self, frame: &VideoFrame, source_ready: bool, now: Duration) {
        if !self.scheduler.is_detection_frame(self.frame_count)
            || !self.scheduler.is_detection_time(now)
            || self.scheduler.in_flight()
        {
            return;
        }

        if !source_ready {
            self.apply_detection(Err(DetectionError::NotReady), now);
            return;
        }

        self.scheduler.mark_requested();
        let result = match &mut self.backend {
            DetectionBackend::Worker(worker) => match worker.submit(frame.clone()) {
                Ok(()) => return,
                Err(e) => Err(e),
            },
            DetectionBackend::Inline(detector) => {
                if detector.is_loaded() {
                    detector.detect(frame)
                } else {
                    Err(DetectionError::NotLoaded)
                }
            }
        };
        self.apply_detection(result, now);
    }

    fn apply_detection(&mut self, result: DetectionResult, now: Duration) {
        match result {
            Ok(mut detections) => {
                let before = detections.len();
                detections.retain(Detection::is_valid);
                if detections.len() < before {
                    warn!("Dropped {} malformed detections", before - detections.len());
                }
                debug!("Detections: {:?}", detections);
                self.detections = detections;
                self.scheduler.complete(now, true);
            }
            Err(e) => {
                match e {
                    DetectionError::NotReady | DetectionError::NotLoaded => debug!("Detection skipped: {}", e),
                    DetectionError::WorkerGone => {
                        if !self.worker_gone_reported {
                            error!("Detection error: {}", e);
                            self.worker_gone_reported = true;
                        }
                    }
                    DetectionError::Failed(_) => error!("Detection error: {}", e),
                }
                self.detections.clear();
                self.scheduler.complete(now, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SilhouetteDetector;
    use crate::video::{FrameSource, SyntheticSource};
    use std::cell::Cell;
    use std::sync::Once;

    // Counts warnings and errors logged on the current thread
    struct WarningCounter;

    thread_local! {
        static WARNINGS: Cell<usize> = Cell::new(0);
    }

    impl log::Log for WarningCounter {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if record.level() <= log::Level::Warn {
                WARNINGS.with(|count| count.set(count.get() + 1));
            }
        }

        fn flush(&self) {}
    }

    static COUNTER: WarningCounter = WarningCounter;

    fn count_warnings<F: FnOnce()>(f: F) -> usize {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            if log::set_logger(&COUNTER).is_ok() {
                log::set_max_level(log::LevelFilter::Trace);
            }
        });
        WARNINGS.with(|count| count.set(0));
        f();
        WARNINGS.with(|count| count.get())
    }

    // Always reports the same person box
    struct FixedPerson;

    impl Detector for FixedPerson {
        fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError> {
            Ok(vec![Detection::person([20.0, 20.0, 40.0, 40.0], 0.9)])
        }
    }

    struct FlakyDetector {
        calls: usize,
    }

    impl Detector for FlakyDetector {
        fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                Err(DetectionError::Failed("flaky".to_string()))
            } else {
                Ok(vec![Detection::person([10.0, 10.0, 20.0, 20.0], 1.0)])
            }
        }
    }

    fn params() -> SimulationParams {
        let mut params = SimulationParams::seeded(99);
        params.max_particles = 40;
        params.detection_frame_stride = 1;
        params
    }

    // A dark square on a light background, in video pixels
    fn square_frame(width: u32, height: u32) -> VideoFrame {
        let mut frame = VideoFrame::filled(width, height, 230);
        for y in height / 4..height * 3 / 4 {
            for x in width / 4..width * 3 / 4 {
                frame.set_pixel(x, y, [15, 15, 15, 255]);
            }
        }
        frame
    }

    fn inline_context(params: &SimulationParams, canvas: (u32, u32)) -> SimulationContext {
        SimulationContext::new(
            params,
            canvas,
            DetectionBackend::Inline(Box::new(SilhouetteDetector::default())),
        )
    }

    #[test]
    fn person_drives_the_swarm() {
        let params = params();
        let mut ctx = inline_context(&params, (160, 120));

        let output = ctx.step(Some(square_frame(80, 60)), true, Duration::from_millis(16), &params);

        assert!(output.active);
        assert!(output.edge_count > 0);
        assert_eq!(ctx.particles.len(), params.max_particles);
        let person = output.person.unwrap();
        assert_eq!((person.x, person.y), (40.0, 30.0));
    }

    #[test]
    fn no_frame_means_no_work() {
        let params = params();
        let mut ctx = inline_context(&params, (100, 100));
        let output = ctx.step(None, true, Duration::ZERO, &params);
        assert_eq!(output, FrameOutput::default());
        assert!(ctx.particles.is_empty());
    }

    #[test]
    fn source_not_ready_clears_detections() {
        let params = params();
        let mut ctx = inline_context(&params, (160, 120));
        ctx.step(Some(square_frame(80, 60)), true, Duration::from_millis(0), &params);
        assert!(!ctx.detections.is_empty());

        let output = ctx.step(Some(square_frame(80, 60)), false, Duration::from_millis(500), &params);
        assert!(ctx.detections.is_empty());
        assert!(!output.active);
        assert!(output.person.is_none());
    }

    #[test]
    fn detection_failure_clears_state_and_keeps_running() {
        let params = params();
        let mut ctx = SimulationContext::new(
            &params,
            (100, 100),
            DetectionBackend::Inline(Box::new(FlakyDetector { calls: 0 })),
        );

        ctx.step(Some(square_frame(100, 100)), true, Duration::from_millis(0), &params);
        assert_eq!(ctx.detections.len(), 1);

        ctx.step(Some(square_frame(100, 100)), true, Duration::from_millis(200), &params);
        assert!(ctx.detections.is_empty());
        assert!(!ctx.detection_in_flight());

        ctx.step(Some(square_frame(100, 100)), true, Duration::from_millis(400), &params);
        assert_eq!(ctx.detections.len(), 1);
    }

    #[test]
    fn detection_is_rate_limited() {
        let params = params();
        let mut ctx = SimulationContext::new(
            &params,
            (100, 100),
            DetectionBackend::Inline(Box::new(FlakyDetector { calls: 0 })),
        );

        ctx.step(Some(square_frame(100, 100)), true, Duration::from_millis(0), &params);
        // Within 100ms of the success: the flaky second call must not happen yet
        ctx.step(Some(square_frame(100, 100)), true, Duration::from_millis(50), &params);
        ctx.step(Some(square_frame(100, 100)), true, Duration::from_millis(100), &params);
        assert_eq!(ctx.detections.len(), 1);
    }

    #[test]
    fn frame_stride_gates_detection() {
        let mut params = params();
        params.detection_frame_stride = 3;
        let mut ctx = inline_context(&params, (80, 60));

        ctx.step(Some(square_frame(80, 60)), true, Duration::from_secs(1), &params);
        ctx.step(Some(square_frame(80, 60)), true, Duration::from_secs(2), &params);
        assert!(ctx.detections.is_empty());
        ctx.step(Some(square_frame(80, 60)), true, Duration::from_secs(3), &params);
        assert_eq!(ctx.detections.len(), 1);
    }

    #[test]
    fn empty_scene_freezes_the_swarm() {
        let params = params();
        let mut ctx = inline_context(&params, (120, 120));
        ctx.step(Some(square_frame(120, 120)), true, Duration::from_millis(0), &params);
        let positions: Vec<_> = ctx.particles.particles.iter().map(|p| p.position).collect();

        // The detector still has the old box but the frame has no contrast left
        ctx.detections = vec![Detection::person([30.0, 30.0, 60.0, 60.0], 1.0)];
        let blank = VideoFrame::filled(120, 120, 230);
        let mut params = params.clone();
        params.detection_frame_stride = 0;
        let output = ctx.step(Some(blank), true, Duration::from_millis(16), &params);

        assert!(!output.active);
        assert_eq!(output.edge_count, 0);
        assert!(ctx.particles.is_frozen());
        let after: Vec<_> = ctx.particles.particles.iter().map(|p| p.position).collect();
        assert_eq!(positions, after);
    }

    #[test]
    fn unusable_frames_are_skipped_and_reported_once() {
        let params = params();
        let mut ctx = inline_context(&params, (80, 60));
        let truncated = VideoFrame {
            width: 80,
            height: 60,
            pixels: vec![0; 100],
        };

        let warnings = count_warnings(|| {
            for i in 0..5u64 {
                let now = Duration::from_millis(i * 200);
                let output = ctx.step(Some(VideoFrame::filled(0, 0, 0)), false, now, &params);
                assert_eq!(output, FrameOutput::default());
                let output = ctx.step(Some(truncated.clone()), true, now, &params);
                assert_eq!(output, FrameOutput::default());
            }
        });
        assert_eq!(warnings, 1);
        assert!(ctx.filtered.is_none());
        assert!(ctx.detections.is_empty());

        // A good frame afterwards still drives the swarm
        let output = ctx.step(Some(square_frame(80, 60)), true, Duration::from_secs(5), &params);
        assert!(output.active);
    }

    #[test]
    fn person_without_edges_stays_quiet() {
        let params = params();
        let mut ctx = SimulationContext::new(&params, (100, 100), DetectionBackend::Inline(Box::new(FixedPerson)));

        let warnings = count_warnings(|| {
            for i in 0..50u64 {
                let frame = VideoFrame::filled(100, 100, 230);
                let output = ctx.step(Some(frame), true, Duration::from_millis(i * 16), &params);
                assert!(output.person.is_some());
                assert!(!output.active);
            }
        });

        assert_eq!(warnings, 0);
        assert!(ctx.particles.is_empty());
    }

    #[test]
    fn source_not_ready_frees_the_detection_slot() {
        let params = params();
        let mut ctx = inline_context(&params, (160, 120));
        ctx.step(Some(square_frame(80, 60)), false, Duration::ZERO, &params);
        assert!(!ctx.detection_in_flight());
        assert!(ctx.detections.is_empty());

        // Not-ready results do not move the rate gate
        ctx.step(Some(square_frame(80, 60)), true, Duration::from_millis(1), &params);
        assert!(!ctx.detections.is_empty());
    }

    #[test]
    fn worker_backend_delivers_on_a_later_frame() {
        let params = params();
        let worker = DetectionWorker::spawn(Box::new(SilhouetteDetector::default())).unwrap();
        let mut ctx = SimulationContext::new(&params, (80, 60), DetectionBackend::Worker(worker));

        ctx.step(Some(square_frame(80, 60)), true, Duration::from_millis(0), &params);
        assert!(ctx.detection_in_flight());

        let mut delivered = false;
        for i in 1..500u64 {
            std::thread::sleep(Duration::from_millis(2));
            ctx.step(Some(square_frame(80, 60)), true, Duration::from_millis(i), &params);
            if !ctx.detections.is_empty() {
                delivered = true;
                break;
            }
        }
        assert!(delivered);
    }

    #[test]
    fn synthetic_source_runs_end_to_end() {
        let params = params();
        let mut source = SyntheticSource::new(64, 48).with_warmup(0);
        let mut ctx = inline_context(&params, (128, 96));

        let mut active_frames = 0;
        for i in 0..30u64 {
            let frame = source.next_frame();
            let output = ctx.step(frame, source.is_ready(), Duration::from_millis(i * 200), &params);
            if output.active {
                active_frames += 1;
                assert_eq!(ctx.particles.len(), params.max_particles);
            }
        }
        assert!(active_frames > 0);
    }
}
