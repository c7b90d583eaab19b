/*
 * Silhouette Swarm
 *
 * Glowing particles that gather on the outline of a person in front of the
 * camera. Each frame the person is located, the edges inside their bounding
 * box are traced, and a swarm flocks toward the nearest edge while drifting
 * through a noise flow field.
 *
 * Set RUST_LOG to change verbosity (defaults to info).
 */

use silhouette_swarm::app;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    nannou::app(app::model).update(app::update).run();
}
