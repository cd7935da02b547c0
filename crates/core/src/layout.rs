//! Degree-of-freedom bookkeeping for the global state vector.
//!
//! [`StateLayout`] assigns every free object a slice of the global state
//! vector and records which objects are driven externally. Slices are
//! assigned in canonical kind order (lines, connections, rods, bodies) and,
//! within a kind, in creation order.
//!
//! The vector is allocated once with room for every line end to detach into
//! a new free connection (two ends per line, six components each). Objects
//! created mid-run are appended at the high-water mark of that reserve, so
//! existing offsets never move while a step is in progress.

use crate::{Error, ObjectKind, PhysicalObject};

/// State components reserved per line end that may detach.
pub const DETACHED_END_LEN: usize = 6;

/// A free object's slice of the global state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Index of the object within its kind.
    pub index: usize,

    /// First component in the global state vector.
    pub offset: usize,

    /// Number of components.
    pub len: usize,
}

/// An externally driven object and the size of its coupled kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoupledSlot {
    /// Index of the object within its kind.
    pub index: usize,

    /// Number of coupled degrees of freedom (3 or 6).
    pub dof: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct KindTable {
    free: Vec<Slot>,
    coupled: Vec<CoupledSlot>,
}

/// Index tables mapping objects onto the global state vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    tables: [KindTable; 4],
    used: usize,
    allocated: usize,
}

impl StateLayout {
    /// Builds the layout for a finalized object collection.
    ///
    /// Objects may be given in any interleaving of kinds, but objects of the
    /// same kind must appear in creation order; their position among objects
    /// of that kind becomes their index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if an object is both free and
    /// coupled.
    pub fn from_objects<'a, I>(objects: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a dyn PhysicalObject>,
    {
        let mut tables: [KindTable; 4] = Default::default();
        let mut counts = [0_usize; 4];
        let mut pending = Vec::new();

        for object in objects {
            let rank = object.kind().rank();
            let index = counts[rank];
            counts[rank] += 1;

            let (len, dof) = (object.state_len(), object.coupled_dof());
            if len > 0 && dof > 0 {
                return Err(Error::invalid_configuration(format!(
                    "{} {} cannot be both free and coupled",
                    object.kind(),
                    object.id()
                )));
            }
            if len > 0 {
                pending.push((rank, index, len));
            }
            if dof > 0 {
                tables[rank].coupled.push(CoupledSlot { index, dof });
            }
        }

        // Offsets follow kind order, not the order objects were supplied in.
        pending.sort_by_key(|&(rank, index, _)| (rank, index));
        let mut used = 0;
        for (rank, index, len) in pending {
            tables[rank].free.push(Slot {
                index,
                offset: used,
                len,
            });
            used += len;
        }

        let line_count = counts[ObjectKind::Line.rank()];
        let allocated = used + DETACHED_END_LEN * 2 * line_count;

        tracing::debug!(
            used,
            allocated,
            coupled_dof = tables.iter().flat_map(|t| &t.coupled).map(|c| c.dof).sum::<usize>(),
            "built state layout"
        );

        Ok(Self {
            tables,
            used,
            allocated,
        })
    }

    /// Free objects of a kind, in creation order.
    #[must_use]
    pub fn free(&self, kind: ObjectKind) -> &[Slot] {
        &self.tables[kind.rank()].free
    }

    /// Coupled objects of a kind, in creation order.
    #[must_use]
    pub fn coupled(&self, kind: ObjectKind) -> &[CoupledSlot] {
        &self.tables[kind.rank()].coupled
    }

    /// The slot of a free object, if it has one.
    #[must_use]
    pub fn slot(&self, kind: ObjectKind, index: usize) -> Option<Slot> {
        self.free(kind).iter().copied().find(|s| s.index == index)
    }

    /// Number of global state vector components in use.
    #[must_use]
    pub fn total_free_dof(&self) -> usize {
        self.used
    }

    /// Number of externally driven degrees of freedom.
    ///
    /// Six per coupled body, three per coupled connection, and six or three
    /// per coupled rod depending on whether it is cantilevered or pinned.
    #[must_use]
    pub fn total_coupled_dof(&self) -> usize {
        self.tables
            .iter()
            .flat_map(|t| &t.coupled)
            .map(|c| c.dof)
            .sum()
    }

    /// Length of the global state vector, reserve included.
    #[must_use]
    pub fn allocated_len(&self) -> usize {
        self.allocated
    }

    /// Components still available for objects created mid-run.
    #[must_use]
    pub fn reserve_remaining(&self) -> usize {
        self.allocated - self.used
    }

    /// Appends a free object at the next unused offset of the reserve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the reserve cannot hold `len` more
    /// components, or if the object already has a slot.
    pub fn append_free(
        &mut self,
        kind: ObjectKind,
        index: usize,
        len: usize,
    ) -> Result<Slot, Error> {
        if self.slot(kind, index).is_some() {
            return Err(Error::invalid_state(format!(
                "{kind} {index} already owns a state slot"
            )));
        }
        if len > self.reserve_remaining() {
            return Err(Error::invalid_state(format!(
                "state vector reserve exhausted: {len} components requested, {} left",
                self.reserve_remaining()
            )));
        }

        let slot = Slot {
            index,
            offset: self.used,
            len,
        };
        self.tables[kind.rank()].free.push(slot);
        self.used += len;
        Ok(slot)
    }

    /// Iterates coupled objects in the order external buffers are packed:
    /// bodies, then rods, then connections.
    pub fn coupled_order(&self) -> impl Iterator<Item = (ObjectKind, CoupledSlot)> + '_ {
        [ObjectKind::Body, ObjectKind::Rod, ObjectKind::Connection]
            .into_iter()
            .flat_map(move |kind| self.coupled(kind).iter().map(move |c| (kind, *c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Role;

    /// Minimal object with a fixed shape, enough to exercise the tables.
    struct Stub {
        kind: ObjectKind,
        id: usize,
        len: usize,
        dof: usize,
    }

    impl Stub {
        fn free(kind: ObjectKind, id: usize, len: usize) -> Self {
            Self { kind, id, len, dof: 0 }
        }

        fn coupled(kind: ObjectKind, id: usize, dof: usize) -> Self {
            Self { kind, id, len: 0, dof }
        }

        fn fixed(kind: ObjectKind, id: usize) -> Self {
            Self { kind, id, len: 0, dof: 0 }
        }
    }

    impl PhysicalObject for Stub {
        fn id(&self) -> usize {
            self.id
        }
        fn kind(&self) -> ObjectKind {
            self.kind
        }
        fn role(&self) -> Role {
            match (self.len, self.dof) {
                (0, 0) => Role::Fixed,
                (0, _) => Role::Coupled,
                _ => Role::Free,
            }
        }
        fn state_len(&self) -> usize {
            self.len
        }
        fn coupled_dof(&self) -> usize {
            self.dof
        }
        fn initial_state(&self, out: &mut [f64]) -> Result<(), Error> {
            self.require_free(out.len())
        }
        fn set_state(&mut self, state: &[f64]) -> Result<(), Error> {
            self.require_free(state.len())
        }
        fn state_deriv(&self, out: &mut [f64]) -> Result<(), Error> {
            self.require_free(out.len())
        }
    }

    fn layout_of(objects: &[Stub]) -> StateLayout {
        StateLayout::from_objects(objects.iter().map(|o| o as &dyn PhysicalObject)).unwrap()
    }

    #[test]
    fn offsets_follow_canonical_kind_order() {
        // Supplied bodies first; lines must still come first in the vector.
        let layout = layout_of(&[
            Stub::free(ObjectKind::Body, 1, 12),
            Stub::free(ObjectKind::Connection, 1, 6),
            Stub::fixed(ObjectKind::Connection, 2),
            Stub::free(ObjectKind::Connection, 3, 6),
            Stub::free(ObjectKind::Line, 1, 18),
        ]);

        assert_eq!(
            layout.free(ObjectKind::Line),
            &[Slot { index: 0, offset: 0, len: 18 }]
        );
        assert_eq!(
            layout.free(ObjectKind::Connection),
            &[
                Slot { index: 0, offset: 18, len: 6 },
                Slot { index: 2, offset: 24, len: 6 },
            ]
        );
        assert_eq!(
            layout.free(ObjectKind::Body),
            &[Slot { index: 0, offset: 30, len: 12 }]
        );
        assert_eq!(layout.total_free_dof(), 42);
        assert_eq!(layout.allocated_len(), 42 + 12);
        assert!(layout.slot(ObjectKind::Connection, 1).is_none());
    }

    #[test]
    fn coupled_dof_formula_holds_for_all_small_mixes() {
        for b in 0..3 {
            for c in 0..3 {
                for rc in 0..3 {
                    for rp in 0..3 {
                        let mut objects = Vec::new();
                        objects.extend((0..b).map(|i| Stub::coupled(ObjectKind::Body, i + 1, 6)));
                        objects.extend(
                            (0..c).map(|i| Stub::coupled(ObjectKind::Connection, i + 1, 3)),
                        );
                        objects.extend((0..rc).map(|i| Stub::coupled(ObjectKind::Rod, i + 1, 6)));
                        objects
                            .extend((0..rp).map(|i| Stub::coupled(ObjectKind::Rod, rc + i + 1, 3)));
                        objects.push(Stub::fixed(ObjectKind::Connection, 99));

                        let layout = layout_of(&objects);

                        assert_eq!(layout.total_coupled_dof(), 6 * b + 3 * c + 6 * rc + 3 * rp);
                    }
                }
            }
        }
    }

    #[test]
    fn every_object_lands_in_exactly_one_table() {
        let layout = layout_of(&[
            Stub::free(ObjectKind::Connection, 1, 6),
            Stub::coupled(ObjectKind::Connection, 2, 3),
            Stub::fixed(ObjectKind::Connection, 3),
        ]);

        let free: Vec<_> = layout.free(ObjectKind::Connection).iter().map(|s| s.index).collect();
        let coupled: Vec<_> = layout
            .coupled(ObjectKind::Connection)
            .iter()
            .map(|s| s.index)
            .collect();

        assert_eq!(free, vec![0]);
        assert_eq!(coupled, vec![1]);
    }

    #[test]
    fn append_uses_the_reserve_until_exhausted() {
        let mut layout = layout_of(&[
            Stub::free(ObjectKind::Line, 1, 6),
            Stub::free(ObjectKind::Connection, 1, 6),
        ]);
        assert_eq!(layout.reserve_remaining(), 12);

        let a = layout.append_free(ObjectKind::Connection, 1, 6).unwrap();
        let b = layout.append_free(ObjectKind::Connection, 2, 6).unwrap();

        assert_eq!(a.offset, 12);
        assert_eq!(b.offset, 18);
        assert_eq!(layout.total_free_dof(), 24);

        let err = layout.append_free(ObjectKind::Connection, 3, 6).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(layout.total_free_dof(), 24);
    }

    #[test]
    fn coupled_order_packs_bodies_then_rods_then_connections() {
        let layout = layout_of(&[
            Stub::coupled(ObjectKind::Connection, 1, 3),
            Stub::coupled(ObjectKind::Rod, 1, 3),
            Stub::coupled(ObjectKind::Body, 1, 6),
        ]);

        let kinds: Vec<_> = layout.coupled_order().map(|(k, _)| k).collect();

        assert_eq!(
            kinds,
            vec![ObjectKind::Body, ObjectKind::Rod, ObjectKind::Connection]
        );
    }

    #[test]
    fn free_and_coupled_at_once_is_rejected() {
        let both = Stub {
            kind: ObjectKind::Rod,
            id: 4,
            len: 6,
            dof: 3,
        };
        let err = StateLayout::from_objects([&both as &dyn PhysicalObject]).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
}
