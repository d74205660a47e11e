use std::collections::HashMap;

use crate::key::ObjectKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasOutcome {
    AlreadyEquivalent {
        canonical: ObjectKey,
    },
    /// `absorbed` was the canonical key of the losing class.
    Merged {
        canonical: ObjectKey,
        absorbed: ObjectKey,
    },
}

/// Equivalence classes of keys. Each class is represented by its smallest key,
/// so the result does not depend on registration order.
#[derive(Debug, Default, Clone)]
pub(crate) struct AliasTable {
    canonical_of: HashMap<ObjectKey, ObjectKey>,
    members: HashMap<ObjectKey, Vec<ObjectKey>>,
}

impl AliasTable {
    pub(crate) fn canonical<'a>(&'a self, key: &'a ObjectKey) -> &'a ObjectKey {
        self.canonical_of.get(key).unwrap_or(key)
    }

    pub(crate) fn union(&mut self, a: &ObjectKey, b: &ObjectKey) -> AliasOutcome {
        let canonical_a = self.canonical(a).clone();
        let canonical_b = self.canonical(b).clone();
        if canonical_a == canonical_b {
            return AliasOutcome::AlreadyEquivalent {
                canonical: canonical_a,
            };
        }

        let (winner, loser) = if canonical_a < canonical_b {
            (canonical_a, canonical_b)
        } else {
            (canonical_b, canonical_a)
        };

        let mut moved = self.members.remove(&loser).unwrap_or_default();
        moved.push(loser.clone());
        for member in &moved {
            self.canonical_of.insert(member.clone(), winner.clone());
        }
        self.members.entry(winner.clone()).or_default().extend(moved);

        AliasOutcome::Merged {
            canonical: winner,
            absorbed: loser,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.canonical_of.len()
    }

    pub(crate) fn clear(&mut self) {
        self.canonical_of.clear();
        self.members.clear();
    }
}
