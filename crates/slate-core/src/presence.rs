//! Ephemeral per-session presence records for remote cursors.

use crate::element::ElementId;
use kurbo::Point;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Inactivity window after which a peer is dropped.
pub const PRESENCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Palette of cursor colors; each user gets one, stable for the session.
pub const USER_COLORS: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A",
    "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
];

/// One participant's ephemeral state.
#[derive(Debug, Clone)]
pub struct Presence {
    pub user_id: String,
    pub user_name: String,
    /// Assigned once on first observation, stable thereafter.
    pub color: String,
    /// Absent until the first cursor movement.
    pub cursor: Option<Point>,
    pub selected: Option<ElementId>,
    last_seen: Instant,
}

/// Presence records keyed by user id. Self is tracked like any other entry
/// but excluded from the rendered peer list.
#[derive(Debug)]
pub struct PresenceMap {
    self_id: String,
    entries: HashMap<String, Presence>,
}

impl PresenceMap {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
            entries: HashMap::new(),
        }
    }

    /// Record (or refresh) a participant. The color assignment survives
    /// subsequent observations.
    pub fn observe(
        &mut self,
        user_id: &str,
        user_name: &str,
        cursor: Option<Point>,
        selected: Option<ElementId>,
        now: Instant,
    ) {
        match self.entries.get_mut(user_id) {
            Some(entry) => {
                entry.user_name = user_name.to_string();
                if cursor.is_some() {
                    entry.cursor = cursor;
                }
                entry.selected = selected;
                entry.last_seen = now;
            }
            None => {
                self.entries.insert(
                    user_id.to_string(),
                    Presence {
                        user_id: user_id.to_string(),
                        user_name: user_name.to_string(),
                        color: pick_color(user_id).to_string(),
                        cursor,
                        selected,
                        last_seen: now,
                    },
                );
            }
        }
    }

    /// Drop every entry not refreshed within the inactivity window.
    pub fn expire(&mut self, now: Instant) {
        self.entries
            .retain(|_, p| now.duration_since(p.last_seen) <= PRESENCE_TIMEOUT);
    }

    /// Everyone but self, in a stable order for rendering.
    pub fn peers(&self) -> Vec<&Presence> {
        let mut peers: Vec<&Presence> = self
            .entries
            .values()
            .filter(|p| p.user_id != self.self_id)
            .collect();
        peers.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        peers
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deterministic palette pick so a user keeps the same color across peers.
fn pick_color(user_id: &str) -> &'static str {
    let hash = user_id
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    USER_COLORS[hash % USER_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_excluded_from_peers() {
        let t0 = Instant::now();
        let mut map = PresenceMap::new("me");

        map.observe("me", "Me", Some(Point::new(1.0, 1.0)), None, t0);
        map.observe("other", "Other", Some(Point::new(2.0, 2.0)), None, t0);

        let peers = map.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].user_id, "other");
    }

    #[test]
    fn test_expiry_after_window() {
        let t0 = Instant::now();
        let mut map = PresenceMap::new("me");

        map.observe("p", "Peer", None, None, t0);
        map.expire(t0 + Duration::from_secs(59));
        assert_eq!(map.peers().len(), 1);

        map.expire(t0 + Duration::from_secs(61));
        assert!(map.peers().is_empty());
    }

    #[test]
    fn test_refresh_resets_expiry() {
        let t0 = Instant::now();
        let mut map = PresenceMap::new("me");

        map.observe("p", "Peer", None, None, t0);
        map.observe("p", "Peer", None, None, t0 + Duration::from_secs(50));
        map.expire(t0 + Duration::from_secs(100));
        assert_eq!(map.peers().len(), 1);
    }

    #[test]
    fn test_color_stable_across_observations() {
        let t0 = Instant::now();
        let mut map = PresenceMap::new("me");

        map.observe("p", "Peer", None, None, t0);
        let first = map.peers()[0].color.clone();
        map.observe("p", "Peer", Some(Point::new(5.0, 5.0)), None, t0);
        assert_eq!(map.peers()[0].color, first);
        assert!(USER_COLORS.contains(&first.as_str()));
    }

    #[test]
    fn test_cursor_absent_until_first_move() {
        let t0 = Instant::now();
        let mut map = PresenceMap::new("me");

        map.observe("p", "Peer", None, None, t0);
        assert!(map.peers()[0].cursor.is_none());

        map.observe("p", "Peer", Some(Point::new(3.0, 4.0)), None, t0);
        assert!(map.peers()[0].cursor.is_some());

        // A heartbeat without a cursor keeps the last-known position.
        map.observe("p", "Peer", None, None, t0);
        assert!(map.peers()[0].cursor.is_some());
    }
}
