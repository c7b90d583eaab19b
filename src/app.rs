/*
 * Application Module
 *
 * This module defines the main application model for the silhouette swarm.
 * It wires the frame source, the simulation context and the UI together and
 * advances them once per nannou update.
 */

use log::{error, info};
use nannou::prelude::*;
use nannou_egui::Egui;

use crate::canvas::Canvas;
use crate::context::{DetectionBackend, FrameOutput, SimulationContext};
use crate::debug::DebugInfo;
use crate::detection::{DetectionWorker, SilhouetteDetector};
use crate::input::{key_pressed, raw_window_event, window_resized};
use crate::params::SimulationParams;
use crate::renderer::view;
use crate::ui;
use crate::video::{FrameSource, SyntheticSource, VideoFrame};

pub const WINDOW_WIDTH: u32 = 640;
pub const WINDOW_HEIGHT: u32 = 480;

// Main model for the application
pub struct Model {
    pub params: SimulationParams,
    pub context: SimulationContext,
    pub source: Box<dyn FrameSource>,
    pub egui: Egui,
    pub debug_info: DebugInfo,
    pub last_output: FrameOutput,
    pub feed_texture: Option<wgpu::Texture>,
}

// Initialize the model
pub fn model(app: &App) -> Model {
    let window_id = app
        .new_window()
        .title("Silhouette Swarm")
        .size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .view(view)
        .key_pressed(key_pressed)
        .resized(window_resized)
        .raw_event(raw_window_event)
        .build()
        .unwrap();

    let window = app.window(window_id).unwrap();
    let egui = Egui::from_window(&window);

    let params = SimulationParams::default();
    let canvas = Canvas::from_window_rect(window.rect());

    let source = SyntheticSource::new(WINDOW_WIDTH, WINDOW_HEIGHT);
    let detector = SilhouetteDetector {
        level: params.threshold_level,
        ..SilhouetteDetector::default()
    };
    let backend = match DetectionWorker::spawn(Box::new(detector.clone())) {
        Ok(worker) => DetectionBackend::Worker(worker),
        Err(err) => {
            error!("Could not start detector thread, detecting inline: {}", err);
            DetectionBackend::Inline(Box::new(detector))
        }
    };

    let context = SimulationContext::new(&params, canvas.pixel_size(), backend);
    info!(
        "Started with a {}x{} canvas and up to {} particles",
        context.canvas_size().0,
        context.canvas_size().1,
        params.max_particles
    );

    Model {
        params,
        context,
        source: Box::new(source),
        egui,
        debug_info: DebugInfo::default(),
        last_output: FrameOutput::default(),
        feed_texture: None,
    }
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;

    // Update UI and check what needs rebuilding
    let (should_reset, changes) = ui::update_ui(&mut model.egui, &mut model.params, &model.debug_info);

    if should_reset || changes.reset_particles {
        model.context.rebuild_particles(&model.params);
    } else if changes.rebuild_flow_field {
        model.context.particles.rebuild_flow_field(&model.params);
    }

    if model.params.pause_simulation {
        return;
    }

    let frame = model.source.next_frame();
    let ready = model.source.is_ready();
    model.last_output = model.context.step(frame, ready, update.since_start, &model.params);

    if model.params.show_feed {
        if let Some(frame) = &model.context.filtered {
            upload_feed(app, &mut model.feed_texture, frame);
        }
    }

    model.debug_info.record(&model.context, &model.last_output);
}

// Copy the last filtered frame into the feed texture, creating it on first use or after a resize
fn upload_feed(app: &App, texture: &mut Option<wgpu::Texture>, frame: &VideoFrame) {
    let size = [frame.width, frame.height];
    let window = app.main_window();
    let device = window.device();

    if needs_new_texture(texture.as_ref().map(|t| t.size()), size) {
        *texture = Some(
            wgpu::TextureBuilder::new()
                .size(size)
                .format(wgpu::TextureFormat::Rgba8UnormSrgb)
                .usage(wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING)
                .build(device),
        );
    }

    if let Some(texture) = texture {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("feed upload"),
        });
        texture.upload_data(device, &mut encoder, &frame.pixels);
        window.queue().submit(Some(encoder.finish()));
    }
}

fn needs_new_texture(current: Option<[u32; 2]>, frame_size: [u32; 2]) -> bool {
    current != Some(frame_size)
}
