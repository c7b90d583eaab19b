/*
 * UI Module
 *
 * This module contains functions for creating and updating the user interface
 * using nannou_egui. It provides controls for the swarm, the edge tracer and
 * the flow field, and reports which rebuilds the edited parameters require.
 */

use nannou_egui::{egui, Egui};

use crate::debug::DebugInfo;
use crate::params::{MotionVariant, ParamChanges, SimulationParams};

// Update the UI and return whether the swarm should be reset and which rebuilds are needed
pub fn update_ui(
    egui: &mut Egui,
    params: &mut SimulationParams,
    debug_info: &DebugInfo,
) -> (bool, ParamChanges) {
    let mut should_reset = false;

    // Take a snapshot of current parameter values for change detection
    params.take_snapshot();

    let ctx = egui.begin_frame();

    egui::Window::new("Swarm Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.collapsing("Swarm", |ui| {
                ui.add(
                    egui::Slider::new(&mut params.max_particles, SimulationParams::get_max_particles_range())
                        .text("Max Particles"),
                );
                ui.horizontal(|ui| {
                    for variant in [MotionVariant::Flocking, MotionVariant::EdgeSeek] {
                        ui.radio_value(&mut params.variant, variant, variant.label());
                    }
                });
                ui.add(
                    egui::Slider::new(&mut params.recycle_distance, SimulationParams::get_recycle_distance_range())
                        .text("Recycle Distance"),
                );

                if ui.button("Reset Swarm").clicked() {
                    should_reset = true;
                }
            });

            ui.collapsing("Flocking", |ui| {
                ui.add(egui::Slider::new(&mut params.separation_weight, SimulationParams::get_weight_range()).text("Separation Weight"));
                ui.add(egui::Slider::new(&mut params.alignment_weight, SimulationParams::get_weight_range()).text("Alignment Weight"));
                ui.add(egui::Slider::new(&mut params.cohesion_weight, SimulationParams::get_weight_range()).text("Cohesion Weight"));
                ui.add(egui::Slider::new(&mut params.separation_radius, SimulationParams::get_radius_range()).text("Separation Radius"));
                ui.add(egui::Slider::new(&mut params.alignment_radius, SimulationParams::get_radius_range()).text("Alignment Radius"));
                ui.add(egui::Slider::new(&mut params.cohesion_radius, SimulationParams::get_radius_range()).text("Cohesion Radius"));
            });

            ui.collapsing("Edge Following", |ui| {
                ui.add(egui::Slider::new(&mut params.seek_magnitude, 0.0..=2.0).text("Seek Magnitude"));
                ui.add(egui::Slider::new(&mut params.seek_weight, SimulationParams::get_weight_range()).text("Seek Weight"));
                ui.add(egui::Slider::new(&mut params.min_speed, SimulationParams::get_speed_range()).text("Min Speed"));
                ui.add(egui::Slider::new(&mut params.max_speed, SimulationParams::get_speed_range()).text("Max Speed"));
                ui.add(egui::Slider::new(&mut params.flocking_damping, SimulationParams::get_damping_range()).text("Flocking Damping"));
                ui.add(egui::Slider::new(&mut params.edge_seek_damping, SimulationParams::get_damping_range()).text("Edge Seek Damping"));
            });

            ui.collapsing("Edges", |ui| {
                ui.add(egui::Slider::new(&mut params.edge_threshold, SimulationParams::get_edge_threshold_range()).text("Gradient Threshold"));
                ui.add(egui::Slider::new(&mut params.threshold_level, SimulationParams::get_threshold_level_range()).text("Silhouette Level"));
                ui.add(egui::Slider::new(&mut params.roi_padding, 0.0..=50.0).text("Box Padding"));
            });

            ui.collapsing("Flow Field", |ui| {
                ui.add(egui::Slider::new(&mut params.flow_field_resolution, SimulationParams::get_resolution_range()).text("Resolution"));
                ui.add(egui::Slider::new(&mut params.flow_field_update_interval, 0..=120).text("Update Interval (frames)"));
            });

            ui.collapsing("Display", |ui| {
                ui.checkbox(&mut params.show_feed, "Show Video Feed");
                ui.checkbox(&mut params.enable_spatial_grid, "Enable Spatial Grid");
                ui.checkbox(&mut params.show_debug, "Show Debug Info");
                ui.checkbox(&mut params.pause_simulation, "Pause Simulation");
            });

            ui.collapsing("Metrics", |ui| {
                for line in debug_info.lines() {
                    ui.label(line);
                }
            });
        });

    // Detect parameter changes
    let changes = params.detect_changes();

    (should_reset, changes)
}

// Draw debug information on the screen
pub fn draw_debug_info(draw: &nannou::Draw, debug_info: &DebugInfo, window_rect: nannou::geom::Rect) {
    let lines = debug_info.lines();

    // Create a background panel in the top-left corner
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 220.0;
    let panel_height = line_height * lines.len() as f32 + margin;
    let panel_x = window_rect.left() + panel_width / 2.0;
    let panel_y = window_rect.top() - panel_height / 2.0;

    draw.rect()
        .x_y(panel_x, panel_y)
        .w_h(panel_width, panel_height)
        .color(nannou::color::rgba(0.0, 0.0, 0.0, 0.7));

    let text_x = window_rect.left() + margin;
    let text_y = window_rect.top() - margin;

    for (i, text) in lines.iter().enumerate() {
        let y = text_y - (i as f32 * line_height);

        // Fixed offset from the left edge, nannou centres text on its position
        draw.text(text)
            .x_y(text_x + 80.0, y)
            .color(nannou::color::WHITE)
            .font_size(14);
    }
}
