use chrono::{DateTime, Utc};

use crate::domain::{Echelon, Uic};

/// A single organizational unit: one node in the order-of-battle forest.
///
/// A unit carries its own parent pointer for serialization, but once inserted
/// into a [`Forest`](crate::Forest) the forest's relation graph is the sole
/// source of truth. The pointer here is kept in sync by the forest, and other
/// code must treat it as read-only derived data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// The unit's identity.
    pub(crate) uic: Uic,
    /// Display name, e.g. "1-1 Cavalry Regiment".
    pub(crate) name: String,
    /// Organizational rank.
    pub(crate) echelon: Echelon,
    /// Immediate higher headquarters. `None` for root units.
    pub(crate) parent: Option<Uic>,
    /// Free-text notes body (markdown).
    pub(crate) notes: String,
    /// Timestamp recording when the unit record was created.
    pub(crate) created: DateTime<Utc>,
    /// Logical time of the last hierarchy-affecting update.
    ///
    /// Doubles as the optimistic-concurrency token: a reparent may name the
    /// `as_of` it read, and is rejected if the unit has moved on since.
    pub(crate) as_of: u64,
}

impl Unit {
    /// Construct a new [`Unit`] with no parent and empty notes.
    #[must_use]
    pub fn new(uic: Uic, name: String, echelon: Echelon) -> Self {
        Self {
            uic,
            name,
            echelon,
            parent: None,
            notes: String::new(),
            created: Utc::now(),
            as_of: 0,
        }
    }

    /// Reassembles a [`Unit`] from its serialized fields.
    pub(crate) const fn from_parts(
        uic: Uic,
        name: String,
        echelon: Echelon,
        parent: Option<Uic>,
        notes: String,
        created: DateTime<Utc>,
        as_of: u64,
    ) -> Self {
        Self {
            uic,
            name,
            echelon,
            parent,
            notes,
            created,
            as_of,
        }
    }

    /// Sets the parent pointer, builder style.
    ///
    /// Only meaningful before the unit is inserted into a forest; afterwards
    /// the forest maintains the relation.
    #[must_use]
    pub fn with_parent(mut self, parent: Uic) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the notes body, builder style.
    #[must_use]
    pub fn with_notes(mut self, notes: String) -> Self {
        self.notes = notes;
        self
    }

    /// The unit's identification code.
    #[must_use]
    pub const fn uic(&self) -> &Uic {
        &self.uic
    }

    /// The unit's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit's echelon.
    #[must_use]
    pub const fn echelon(&self) -> Echelon {
        self.echelon
    }

    /// The UIC of the immediate higher headquarters, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&Uic> {
        self.parent.as_ref()
    }

    /// The free-text notes body.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// When the unit record was created.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Logical time of the last hierarchy-affecting update.
    #[must_use]
    pub const fn as_of(&self) -> u64 {
        self.as_of
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uic(s: &str) -> Uic {
        Uic::new(s.to_string()).unwrap()
    }

    #[test]
    fn new_unit_is_a_root() {
        let unit = Unit::new(uic("WAGGAA"), "HHC".to_string(), Echelon::Company);
        assert_eq!(unit.parent(), None);
        assert_eq!(unit.as_of(), 0);
        assert!(unit.notes().is_empty());
    }

    #[test]
    fn builder_sets_parent_and_notes() {
        let unit = Unit::new(uic("WABCB0"), "B Co".to_string(), Echelon::Company)
            .with_parent(uic("WABC00"))
            .with_notes("Stood up for rotation 24-05".to_string());

        assert_eq!(unit.parent(), Some(&uic("WABC00")));
        assert_eq!(unit.notes(), "Stood up for rotation 24-05");
    }
}
