use trailmap_shared::{LngLat, PolygonGeometry, RingError};

#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    DoubleClick,
    FinishButton,
    Plugin(PolygonGeometry),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Idle,
    Drawing { vertices: Vec<LngLat> },
    // Shapes the plugin tracks on its own, such as rectangles.
    Plugin,
    Finished { polygon: PolygonGeometry },
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOutcome {
    Ignored,
    Preview(Vec<LngLat>),
    /// Too few vertices; drawing continues.
    Rejected(RingError),
    /// Emitted once per session.
    Completed(PolygonGeometry),
}

/// One polygon-drawing session fed by both the plugin and the manual
/// click tracker. Whichever completion signal arrives first wins; later ones
/// are ignored until the next session starts.
#[derive(Debug)]
pub struct DrawSession {
    phase: Phase,
    session: u64,
}

impl Default for DrawSession {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            session: 0,
        }
    }
}

impl DrawSession {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.phase, Phase::Drawing { .. })
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Drawing { .. } | Phase::Plugin)
    }

    pub fn activate(&mut self) {
        self.session += 1;
        self.phase = Phase::Drawing {
            vertices: Vec::new(),
        };
        tracing::debug!(session = self.session, "drawing started");
    }

    /// Opens a session whose only completion is the plugin's.
    pub fn activate_plugin(&mut self) {
        self.session += 1;
        self.phase = Phase::Plugin;
        tracing::debug!(session = self.session, "plugin drawing started");
    }

    pub fn add_vertex(&mut self, at: LngLat) -> DrawOutcome {
        let Phase::Drawing { vertices } = &mut self.phase else {
            return DrawOutcome::Ignored;
        };
        // A double-click also delivers two clicks on the same spot.
        if vertices.last() == Some(&at) {
            return DrawOutcome::Ignored;
        }
        vertices.push(at);
        DrawOutcome::Preview(vertices.clone())
    }

    pub fn complete(&mut self, signal: Completion) -> DrawOutcome {
        let polygon = match (&self.phase, signal) {
            (Phase::Finished { .. }, _) => {
                tracing::debug!(session = self.session, "duplicate completion ignored");
                return DrawOutcome::Ignored;
            }
            (_, Completion::Plugin(polygon)) => polygon,
            (Phase::Drawing { vertices }, Completion::DoubleClick | Completion::FinishButton) => {
                match PolygonGeometry::from_vertices(vertices) {
                    Ok(polygon) => polygon,
                    Err(error) => return DrawOutcome::Rejected(error),
                }
            }
            (Phase::Idle | Phase::Plugin, _) => return DrawOutcome::Ignored,
        };
        if matches!(self.phase, Phase::Idle) {
            self.session += 1;
        }
        self.phase = Phase::Finished {
            polygon: polygon.clone(),
        };
        tracing::info!(session = self.session, vertices = polygon.ring().len(), "polygon finished");
        DrawOutcome::Completed(polygon)
    }

    pub fn cancel(&mut self) -> bool {
        if self.is_active() {
            self.phase = Phase::Idle;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lat_lng(lat: f64, lng: f64) -> LngLat {
        LngLat::from_lat_lng(lat, lng).unwrap()
    }

    fn drawn(session: &mut DrawSession) {
        session.activate();
        session.add_vertex(lat_lng(53.0, -9.0));
        session.add_vertex(lat_lng(53.0, -8.5));
        session.add_vertex(lat_lng(52.5, -8.5));
    }

    #[test]
    fn finish_button_closes_the_ring() {
        let mut session = DrawSession::default();
        drawn(&mut session);
        let DrawOutcome::Completed(polygon) = session.complete(Completion::FinishButton) else {
            panic!("expected completion");
        };
        assert_eq!(polygon.ring().len(), 4);
        assert_eq!(polygon.ring()[0], polygon.ring()[3]);
    }

    #[test]
    fn first_completion_wins() {
        let mut session = DrawSession::default();
        drawn(&mut session);
        assert!(matches!(session.complete(Completion::DoubleClick), DrawOutcome::Completed(_)));
        let plugin = PolygonGeometry::from_vertices(&[
            lat_lng(53.0, -9.0),
            lat_lng(53.0, -8.5),
            lat_lng(52.5, -8.5),
        ])
        .unwrap();
        assert_eq!(session.complete(Completion::Plugin(plugin)), DrawOutcome::Ignored);
        assert_eq!(session.complete(Completion::FinishButton), DrawOutcome::Ignored);
    }

    #[test]
    fn double_click_needs_three_vertices() {
        let mut session = DrawSession::default();
        session.activate();
        session.add_vertex(lat_lng(53.0, -9.0));
        session.add_vertex(lat_lng(53.0, -8.5));
        assert_eq!(
            session.complete(Completion::DoubleClick),
            DrawOutcome::Rejected(RingError::TooFewVertices(2))
        );
        assert!(session.is_drawing());
    }

    #[test]
    fn repeated_click_on_the_same_spot_is_one_vertex() {
        let mut session = DrawSession::default();
        session.activate();
        assert!(matches!(session.add_vertex(lat_lng(53.0, -9.0)), DrawOutcome::Preview(ref v) if v.len() == 1));
        assert_eq!(session.add_vertex(lat_lng(53.0, -9.0)), DrawOutcome::Ignored);
    }

    #[test]
    fn clicks_outside_a_session_are_ignored() {
        let mut session = DrawSession::default();
        assert_eq!(session.add_vertex(lat_lng(53.0, -9.0)), DrawOutcome::Ignored);
        assert_eq!(session.complete(Completion::FinishButton), DrawOutcome::Ignored);
    }

    #[test]
    fn plugin_completion_from_idle_starts_and_finishes_a_session() {
        let mut session = DrawSession::default();
        let plugin = PolygonGeometry::from_vertices(&[
            lat_lng(53.0, -9.0),
            lat_lng(53.0, -8.5),
            lat_lng(52.5, -8.5),
        ])
        .unwrap();
        assert!(matches!(session.complete(Completion::Plugin(plugin)), DrawOutcome::Completed(_)));
        assert_eq!(session.session(), 1);
    }

    #[test]
    fn reset_allows_a_fresh_completion() {
        let mut session = DrawSession::default();
        drawn(&mut session);
        session.complete(Completion::FinishButton);
        session.reset();
        assert_eq!(session.phase(), &Phase::Idle);
        drawn(&mut session);
        assert!(matches!(session.complete(Completion::FinishButton), DrawOutcome::Completed(_)));
        assert_eq!(session.session(), 2);
    }

    #[test]
    fn rectangle_after_a_finished_polygon_completes() {
        let mut session = DrawSession::default();
        drawn(&mut session);
        assert!(matches!(session.complete(Completion::FinishButton), DrawOutcome::Completed(_)));
        session.activate_plugin();
        assert!(session.is_active());
        assert!(!session.is_drawing());
        assert_eq!(session.complete(Completion::DoubleClick), DrawOutcome::Ignored);
        let rectangle = PolygonGeometry::from_vertices(&[
            lat_lng(53.0, -9.0),
            lat_lng(53.0, -8.0),
            lat_lng(52.0, -8.0),
            lat_lng(52.0, -9.0),
        ])
        .unwrap();
        assert!(matches!(
            session.complete(Completion::Plugin(rectangle.clone())),
            DrawOutcome::Completed(_)
        ));
        assert_eq!(session.complete(Completion::Plugin(rectangle)), DrawOutcome::Ignored);
        assert_eq!(session.session(), 2);
    }

    #[test]
    fn cancel_only_applies_while_drawing() {
        let mut session = DrawSession::default();
        assert!(!session.cancel());
        session.activate();
        assert!(session.cancel());
        assert_eq!(session.phase(), &Phase::Idle);
    }
}
