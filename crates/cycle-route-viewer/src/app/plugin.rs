//! Walkers plugins drawing route lines and point markers on the map

use crate::app::state::{AppState, POINT_COLOR};
use cycle_route_lib::{CoordinateRow, RouteFeatureCollection};
use egui::{Color32, Pos2, Stroke};
use geo::{BoundingRect, Intersects};
use std::sync::Arc;
use walkers::{Plugin, Projector};

/// Extra hit distance around a line, in pixels
const HOVER_TOLERANCE: f32 = 4.0;

/// Radius of point markers in pixels
const POINT_RADIUS: f32 = 3.0;

/// Visible area in longitude/latitude
fn viewport_rect(response: &egui::Response, projector: &Projector) -> geo::Rect<f64> {
    let rect = response.rect;
    let top_left = projector.unproject(egui::Vec2::new(rect.min.x, rect.min.y));
    let bottom_right = projector.unproject(egui::Vec2::new(rect.max.x, rect.max.y));
    geo::Rect::new(
        geo::Coord {
            x: top_left.x(),
            y: top_left.y(),
        },
        geo::Coord {
            x: bottom_right.x(),
            y: bottom_right.y(),
        },
    )
}

fn to_screen(projector: &Projector, coord: &geo::Coord<f64>) -> Pos2 {
    let screen_vec = projector.project(walkers::lat_lon(coord.y, coord.x));
    Pos2::new(screen_vec.x, screen_vec.y)
}

/// Distance from `p` to the segment `a`-`b` in screen space
pub(crate) fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Plugin for rendering route features as lines
pub struct RoutePlugin {
    features: Arc<RouteFeatureCollection>,
    /// Line width in pixels
    width: f32,
    /// One color per route instead of a single line color
    color_by_route: bool,
}

impl RoutePlugin {
    pub fn new(features: Arc<RouteFeatureCollection>, width: f32, color_by_route: bool) -> Self {
        Self {
            features,
            width,
            color_by_route,
        }
    }
}

impl Plugin for RoutePlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("RoutePlugin::run");

        let painter = ui.painter();
        let viewport = viewport_rect(response, projector);
        let hover_pos = response.hover_pos();

        let mut hovered: Option<(i64, f32)> = None;
        let mut lines = Vec::with_capacity(self.features.len());

        for feature in self.features.features() {
            let visible = feature
                .line
                .bounding_rect()
                .is_some_and(|bounds| bounds.intersects(&viewport));
            if !visible {
                continue;
            }

            let screen_points: Vec<Pos2> = feature
                .line
                .0
                .iter()
                .map(|coord| to_screen(projector, coord))
                .collect();

            if let Some(pos) = hover_pos {
                let distance = screen_points
                    .windows(2)
                    .map(|w| distance_to_segment(pos, w[0], w[1]))
                    .fold(f32::INFINITY, f32::min);
                let within = distance <= self.width / 2.0 + HOVER_TOLERANCE;
                if within && hovered.is_none_or(|(_, best)| distance < best) {
                    hovered = Some((feature.route_id, distance));
                }
            }

            lines.push((feature.route_id, screen_points));
        }

        let hovered_id = hovered.map(|(id, _)| id);
        for (route_id, points) in lines {
            let width = if Some(route_id) == hovered_id {
                self.width + 2.0
            } else {
                self.width
            };
            painter.add(egui::Shape::line(
                points,
                Stroke::new(width, AppState::route_color(route_id, self.color_by_route)),
            ));
        }

        if let (Some(route_id), Some(pos)) = (hovered_id, hover_pos) {
            let galley = painter.layout_no_wrap(
                format!("Route ID: {route_id}"),
                egui::FontId::proportional(13.0),
                Color32::WHITE,
            );
            let text_pos = pos + egui::vec2(12.0, -12.0 - galley.size().y);
            let background = egui::Rect::from_min_size(text_pos, galley.size()).expand(4.0);
            painter.rect_filled(background, 4.0, Color32::from_black_alpha(200));
            painter.galley(text_pos, galley, Color32::WHITE);
        }
    }
}

/// Plugin for drawing a marker at every coordinate row
pub struct PointPlugin {
    rows: Arc<Vec<CoordinateRow>>,
}

impl PointPlugin {
    pub fn new(rows: Arc<Vec<CoordinateRow>>) -> Self {
        Self { rows }
    }
}

impl Plugin for PointPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("PointPlugin::run");

        let painter = ui.painter();
        let viewport = viewport_rect(response, projector);

        for row in self.rows.iter() {
            let coord = row.coord();
            if !viewport.intersects(&coord) {
                continue;
            }
            painter.circle_filled(to_screen(projector, &coord), POINT_RADIUS, POINT_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);

        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        // Beyond the end clamps to the endpoint
        assert_eq!(distance_to_segment(Pos2::new(13.0, 4.0), a, b), 5.0);
        // Degenerate segment
        assert_eq!(distance_to_segment(Pos2::new(3.0, 4.0), a, a), 5.0);
    }
}
