//! Spatial fan-out of server-originated sync events
//!
//! Gameplay logic produces events anchored to map cells; the router resolves
//! which online roles can observe each event and delivers it at most once
//! per role, even when a role is visible at both the origin and the
//! destination or also appears in the explicit recipient list.

use std::sync::Arc;

use hashbrown::HashSet;
use serde_json::Value;

use crate::net::registry::ConnRegistry;

/// Viewport half-extent in cells, east-west
pub const VIEW_HALF_WIDTH: i32 = 8;
/// Viewport half-extent in cells, north-south
pub const VIEW_HALF_HEIGHT: i32 = 6;

/// Spatial index over online role positions (external collaborator)
pub trait CellIndex: Send + Sync {
    /// Role ids within the rectangle centered on `(x, y)` extending
    /// `half_width`/`half_height` cells each way
    ///
    /// Zero extents select the exact cell only.
    fn role_ids_in_range(&self, x: i32, y: i32, half_width: i32, half_height: i32) -> Vec<i64>;
}

/// A server-originated event to fan out to observing roles
pub trait SyncEvent {
    /// Message name delivered to every recipient
    fn message_name(&self) -> &str;

    /// Wire payload shared by every recipient
    fn payload(&self) -> Value;

    /// Origin cell of the event
    fn position(&self) -> (i32, i32);

    /// Destination cell when the event spans two positions (movement)
    fn target_position(&self) -> Option<(i32, i32)>;

    /// Whether recipients are discovered through viewport queries
    fn is_cell_view(&self) -> bool;

    /// Roles the event always belongs to, viewport or not (e.g. the actor)
    fn belong_role_ids(&self) -> Vec<i64>;

    /// Event-specific visibility rule for a candidate observer at `(x, y)`
    fn can_view(&self, rid: i64, x: i32, y: i32) -> bool;
}

/// Routes sync events to the online roles that can observe them
pub struct PushRouter {
    registry: Arc<ConnRegistry>,
    index: Arc<dyn CellIndex>,
}

impl PushRouter {
    pub fn new(registry: Arc<ConnRegistry>, index: Arc<dyn CellIndex>) -> Self {
        Self { registry, index }
    }

    /// Deliver one event, at most once per role
    ///
    /// Offline roles are silently skipped; the spatial index may lag the
    /// registry and an offline observer is a normal outcome.
    pub fn push(&self, event: &dyn SyncEvent) {
        let proto = event.payload();
        let name = event.message_name();
        let mut notified: HashSet<i64> = HashSet::new();

        // observers around the origin
        let (x, y) = event.position();
        if event.is_cell_view() {
            for rid in self
                .index
                .role_ids_in_range(x, y, VIEW_HALF_WIDTH, VIEW_HALF_HEIGHT)
            {
                if event.can_view(rid, x, y) {
                    self.registry.push_by_role(rid, name, proto.clone());
                    notified.insert(rid);
                }
            }
        }

        // observers around the destination; outside cell view only the
        // exact destination cell is queried
        if let Some((tx, ty)) = event.target_position() {
            let rids = if event.is_cell_view() {
                self.index
                    .role_ids_in_range(tx, ty, VIEW_HALF_WIDTH, VIEW_HALF_HEIGHT)
            } else {
                self.index.role_ids_in_range(tx, ty, 0, 0)
            };

            for rid in rids {
                if !notified.contains(&rid) && event.can_view(rid, tx, ty) {
                    self.registry.push_by_role(rid, name, proto.clone());
                    notified.insert(rid);
                }
            }
        }

        // the event's own recipients bypass the visibility check
        for rid in event.belong_role_ids() {
            if !notified.contains(&rid) {
                self.registry.push_by_role(rid, name, proto.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::conn::testing::RecordingConn;
    use crate::net::conn::GateConn;
    use serde_json::json;

    /// Honest range-query index over fixed role positions
    struct GridIndex {
        roles: Vec<(i64, i32, i32)>,
    }

    impl CellIndex for GridIndex {
        fn role_ids_in_range(
            &self,
            x: i32,
            y: i32,
            half_width: i32,
            half_height: i32,
        ) -> Vec<i64> {
            self.roles
                .iter()
                .filter(|(_, rx, ry)| (rx - x).abs() <= half_width && (ry - y).abs() <= half_height)
                .map(|(rid, _, _)| *rid)
                .collect()
        }
    }

    struct TestEvent {
        name: String,
        payload: Value,
        position: (i32, i32),
        target: Option<(i32, i32)>,
        cell_view: bool,
        belong: Vec<i64>,
        hidden_from: Vec<i64>,
    }

    impl TestEvent {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                payload: json!({"k": 1}),
                position: (0, 0),
                target: None,
                cell_view: true,
                belong: Vec::new(),
                hidden_from: Vec::new(),
            }
        }
    }

    impl SyncEvent for TestEvent {
        fn message_name(&self) -> &str {
            &self.name
        }

        fn payload(&self) -> Value {
            self.payload.clone()
        }

        fn position(&self) -> (i32, i32) {
            self.position
        }

        fn target_position(&self) -> Option<(i32, i32)> {
            self.target
        }

        fn is_cell_view(&self) -> bool {
            self.cell_view
        }

        fn belong_role_ids(&self) -> Vec<i64> {
            self.belong.clone()
        }

        fn can_view(&self, rid: i64, _x: i32, _y: i32) -> bool {
            !self.hidden_from.contains(&rid)
        }
    }

    /// Registry with one recording connection per listed role
    fn online_roles(rids: &[i64]) -> (Arc<ConnRegistry>, Vec<Arc<RecordingConn>>) {
        let registry = Arc::new(ConnRegistry::new());
        let mut conns = Vec::new();
        for rid in rids {
            let conn = RecordingConn::new(&format!("10.0.0.{}:0", rid));
            let gate: Arc<dyn GateConn> = conn.clone();
            registry.register(gate.clone());
            registry.role_enter(&gate, *rid);
            conns.push(conn);
        }
        (registry, conns)
    }

    fn router(registry: Arc<ConnRegistry>, roles: Vec<(i64, i32, i32)>) -> PushRouter {
        PushRouter::new(registry, Arc::new(GridIndex { roles }))
    }

    #[test]
    fn test_duplicate_across_all_channels_delivered_once() {
        // role 42 observes the origin, the destination, and is an explicit
        // recipient; it must still get exactly one push
        let (registry, conns) = online_roles(&[42]);
        let router = router(registry, vec![(42, 0, 0)]);

        let mut event = TestEvent::new("army.move");
        event.target = Some((1, 1));
        event.belong = vec![42];
        router.push(&event);

        assert_eq!(conns[0].pushed_names(), vec!["army.move".to_string()]);
    }

    #[test]
    fn test_movement_notifies_both_ends_once() {
        // observer near origin, observer near destination, one in the overlap
        let (registry, conns) = online_roles(&[1, 2, 3]);
        let router = router(
            registry,
            vec![(1, 0, 0), (2, 40, 0), (3, 20, 0)],
        );

        let mut event = TestEvent::new("army.state");
        event.position = (0, 0);
        event.target = Some((40, 0));
        router.push(&event);

        assert_eq!(conns[0].pushed_names().len(), 1);
        assert_eq!(conns[1].pushed_names().len(), 1);
        // role 3 sits outside both 8-cell windows
        assert!(conns[2].pushed().is_empty());
    }

    #[test]
    fn test_non_cell_view_queries_exact_destination_cell() {
        let (registry, conns) = online_roles(&[1, 2]);
        // role 1 in the exact destination cell, role 2 three cells off
        let router = router(registry, vec![(1, 10, 10), (2, 13, 10)]);

        let mut event = TestEvent::new("city.siege");
        event.cell_view = false;
        event.position = (0, 0);
        event.target = Some((10, 10));
        router.push(&event);

        assert_eq!(conns[0].pushed_names(), vec!["city.siege".to_string()]);
        assert!(conns[1].pushed().is_empty());
    }

    #[test]
    fn test_origin_skipped_when_not_cell_view() {
        let (registry, conns) = online_roles(&[1]);
        let router = router(registry, vec![(1, 0, 0)]);

        let mut event = TestEvent::new("role.private");
        event.cell_view = false;
        router.push(&event);

        assert!(conns[0].pushed().is_empty());
    }

    #[test]
    fn test_visibility_gates_spatial_but_not_belong() {
        let (registry, conns) = online_roles(&[1, 2]);
        let router = router(registry, vec![(1, 0, 0), (2, 0, 0)]);

        let mut event = TestEvent::new("army.hide");
        event.hidden_from = vec![1, 2];
        event.belong = vec![2];
        router.push(&event);

        // role 1 is filtered by the event's visibility rule
        assert!(conns[0].pushed().is_empty());
        // role 2 fails the visibility check but owns the event
        assert_eq!(conns[1].pushed_names(), vec!["army.hide".to_string()]);
    }

    #[test]
    fn test_offline_observer_is_skipped() {
        // index knows roles 1 and 99, only role 1 is online
        let (registry, conns) = online_roles(&[1]);
        let router = router(registry, vec![(1, 0, 0), (99, 0, 0)]);

        let event = TestEvent::new("army.state");
        router.push(&event);

        assert_eq!(conns[0].pushed_names(), vec!["army.state".to_string()]);
    }

    #[test]
    fn test_belong_only_event() {
        let (registry, conns) = online_roles(&[7, 8]);
        let router = router(registry, vec![]);

        let mut event = TestEvent::new("war.report");
        event.cell_view = false;
        event.belong = vec![7];
        router.push(&event);

        assert_eq!(conns[0].pushed(), vec![("war.report".to_string(), json!({"k": 1}))]);
        assert!(conns[1].pushed().is_empty());
    }
}
