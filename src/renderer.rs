/*
 * Renderer Module
 *
 * This module draws the silhouette swarm.
 * Layers, bottom to top:
 * - The filtered video feed
 * - The tracked person's bounding box
 * - The particles (trails, glow, core) with additive blending
 * - Debug overlays and the UI
 */

use nannou::prelude::*;

use crate::app::Model;
use crate::canvas::Canvas;
use crate::particle::{Particle, CORE_ALPHA};
use crate::ui;

// Additive blending so overlapping glows brighten
const ADDITIVE: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::SrcAlpha,
    dst_factor: wgpu::BlendFactor::One,
    operation: wgpu::BlendOperation::Add,
};

// Render the model
pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let window_rect = app.window_rect();
    let (width, height) = model.context.canvas_size();
    let canvas = Canvas::new(width as f32, height as f32);

    // The texture holds the last good frame; skip it when this frame was unusable
    if model.params.show_feed && model.context.filtered.is_some() {
        if let Some(texture) = &model.feed_texture {
            draw.texture(texture).w_h(window_rect.w(), window_rect.h());
        }
    }

    if let Some(person) = &model.last_output.person {
        let rect = canvas.box_to_screen(person);
        draw.rect()
            .xy(rect.xy())
            .wh(rect.wh())
            .no_fill()
            .stroke_weight(2.0)
            .stroke(RED);
    }

    if model.last_output.active {
        let glow = draw.color_blend(ADDITIVE);
        // Particles recycled this frame have not moved yet
        for particle in model.context.particles.particles.iter().filter(|p| p.age > 0) {
            draw_particle(&glow, particle, &canvas);
        }
    }

    if model.params.show_debug {
        draw_debug_overlay(&draw, model, &canvas);
        ui::draw_debug_info(&draw, &model.debug_info, window_rect);
    }

    // Finish drawing
    draw.to_frame(app, &frame).unwrap();

    // Draw the egui UI
    model.egui.draw_to_frame(&frame).unwrap();
}

fn draw_particle(draw: &Draw, particle: &Particle, canvas: &Canvas) {
    for segment in particle.trail_segments() {
        draw.line()
            .start(canvas.to_screen(segment.start))
            .end(canvas.to_screen(segment.end))
            .weight(segment.weight)
            .color(particle.color.with_alpha(segment.alpha));
    }

    let center = canvas.to_screen(particle.position);
    for layer in particle.glow_layers() {
        draw.ellipse()
            .xy(center)
            .w_h(layer.diameter, layer.diameter)
            .color(particle.color.with_alpha(layer.alpha));
    }

    draw.ellipse()
        .xy(center)
        .w_h(particle.size, particle.size)
        .color(particle.color.with_alpha(CORE_ALPHA));
}

// Edge points, flow vectors and the first particle's perception radii
fn draw_debug_overlay(draw: &Draw, model: &Model, canvas: &Canvas) {
    for edge in &model.context.edges {
        draw.ellipse()
            .xy(canvas.to_screen(edge.position))
            .radius(1.0)
            .color(rgba(0.0, 1.0, 1.0, 0.6));
    }

    let field = &model.context.particles.flow_field;
    let half = field.resolution / 2.0;
    for col in 0..field.columns {
        for row in 0..field.rows {
            let Some(force) = field.cell(col, row) else {
                continue;
            };
            let start = pt2(col as f32 * field.resolution + half, row as f32 * field.resolution + half);
            let end = start + force.normalize_or_zero() * half;
            draw.line()
                .start(canvas.to_screen(start))
                .end(canvas.to_screen(end))
                .weight(1.0)
                .color(rgba(0.4, 0.4, 0.4, 0.5));
        }
    }

    if let Some(first) = model.context.particles.particles.first() {
        let center = canvas.to_screen(first.position);
        let radii = [
            (model.params.separation_radius, RED),
            (model.params.alignment_radius, GREEN),
            (model.params.cohesion_radius, BLUE),
        ];
        for (radius, color) in radii {
            draw.ellipse()
                .xy(center)
                .radius(radius)
                .no_fill()
                .stroke(color)
                .stroke_weight(1.0);
        }

        // Velocity is in canvas space, flip y for the screen
        let velocity = vec2(first.velocity.x, -first.velocity.y);
        draw.arrow()
            .start(center)
            .end(center + velocity * 5.0)
            .color(YELLOW)
            .stroke_weight(2.0);
    }
}
