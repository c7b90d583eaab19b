/*
 * Input Module
 *
 * This module handles window events for the swarm.
 *
 * Features:
 * - Forwarding raw events to the UI
 * - Keyboard shortcuts for reset, pause and the debug overlay
 * - Resizing the canvas with the window
 */

use log::info;
use nannou::prelude::*;

use crate::app::Model;
use crate::canvas::Canvas;

// Key pressed event handler
pub fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    // Typing into a text field should not trigger shortcuts
    if model.egui.ctx().wants_keyboard_input() {
        return;
    }

    match key {
        Key::R => {
            info!("Resetting swarm");
            model.context.rebuild_particles(&model.params);
        }
        Key::P | Key::Space => {
            model.params.pause_simulation = !model.params.pause_simulation;
        }
        Key::D => {
            model.params.show_debug = !model.params.show_debug;
        }
        Key::F => {
            model.params.show_feed = !model.params.show_feed;
        }
        _ => {}
    }
}

// Window resized event handler
pub fn window_resized(_app: &App, model: &mut Model, size: Vec2) {
    let canvas = Canvas::new(size.x, size.y);
    model.context.resize(canvas.pixel_size());
}

// Handle raw window events for egui
pub fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    // Pass events to egui
    model.egui.handle_raw_event(event);
}
