use std::collections::BTreeSet;

/// Rooms the client believes it is subscribed to.
///
/// A durable intent: the set survives disconnects and is re-joined in full
/// on every successful connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomMembership {
    rooms: BTreeSet<String>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the room was not tracked yet
    pub fn join(&mut self, room_id: &str) -> bool {
        self.rooms.insert(room_id.to_string())
    }

    /// Returns `true` if the room was tracked
    pub fn leave(&mut self, room_id: &str) -> bool {
        self.rooms.remove(room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains(room_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.rooms.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.rooms.iter().cloned().collect()
    }
}
