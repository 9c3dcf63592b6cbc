//! Room membership state

use std::collections::HashSet;
use std::time::Instant;

use crate::protocol::{ActorId, RoomId};

/// Role of a room member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Privileged member (staff); receives operational events
    Staff,
    /// Regular member (customer); receives room-wide updates only
    Guest,
}

impl Role {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Staff)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Staff => f.write_str("staff"),
            Role::Guest => f.write_str("guest"),
        }
    }
}

/// A room and its two disjoint member sets
///
/// Lives only while at least one set is non-empty.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    staff: HashSet<ActorId>,
    guests: HashSet<ActorId>,
    pub created_at: Instant,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            staff: HashSet::new(),
            guests: HashSet::new(),
            created_at: Instant::now(),
        }
    }

    /// Role of `actor`, if a member
    pub fn role_of(&self, actor: ActorId) -> Option<Role> {
        if self.staff.contains(&actor) {
            Some(Role::Staff)
        } else if self.guests.contains(&actor) {
            Some(Role::Guest)
        } else {
            None
        }
    }

    /// Add a member; returns false if already present in that role
    pub fn insert(&mut self, actor: ActorId, role: Role) -> bool {
        match role {
            Role::Staff => self.staff.insert(actor),
            Role::Guest => self.guests.insert(actor),
        }
    }

    /// Remove a member from whichever set holds it
    pub fn remove(&mut self, actor: ActorId) -> Option<Role> {
        if self.staff.remove(&actor) {
            Some(Role::Staff)
        } else if self.guests.remove(&actor) {
            Some(Role::Guest)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.staff.is_empty() && self.guests.is_empty()
    }

    pub fn staff(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.staff.iter().copied()
    }

    pub fn guests(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.guests.iter().copied()
    }

    /// Every member regardless of role
    pub fn members(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.staff().chain(self.guests())
    }

    pub fn staff_count(&self) -> usize {
        self.staff.len()
    }

    pub fn len(&self) -> usize {
        self.staff.len() + self.guests.len()
    }
}
