use std::collections::HashSet;

use crate::catalog::CuratedCatalog;
use crate::key::{KeyQuantizer, ObjectKey};
use crate::store::AliasTable;
use crate::world::WorldObject;

use super::{KnowledgeBase, KnowledgeError, KnowledgeStrategy};

/// Lookup against a fixed catalog. Never mutates after construction.
#[derive(Debug, Clone)]
pub struct CuratedKnowledgeBase {
    quantizer: KeyQuantizer,
    catalog: CuratedCatalog,
    all_keys: Vec<ObjectKey>,
    aliases: AliasTable,
    known_canonicals: HashSet<ObjectKey>,
}

impl CuratedKnowledgeBase {
    pub fn new(catalog: CuratedCatalog, quantizer: KeyQuantizer) -> Self {
        let all_keys = catalog.keys().cloned().collect::<Vec<_>>();
        let mut aliases = AliasTable::default();
        for (a, b) in catalog.aliases() {
            aliases.union(a, b);
        }
        let known_canonicals = all_keys
            .iter()
            .map(|key| aliases.canonical(key).clone())
            .collect::<HashSet<_>>();
        Self {
            quantizer,
            catalog,
            all_keys,
            aliases,
            known_canonicals,
        }
    }

    pub fn catalog(&self) -> &CuratedCatalog {
        &self.catalog
    }

    pub fn is_known_key(&self, key: &ObjectKey) -> bool {
        self.known_canonicals.contains(self.aliases.canonical(key))
    }
}

impl KnowledgeBase for CuratedKnowledgeBase {
    fn strategy(&self) -> KnowledgeStrategy {
        KnowledgeStrategy::Curated
    }

    fn is_tracked(&mut self, object: &dyn WorldObject) -> Result<bool, KnowledgeError> {
        let key = self.quantizer.derive(object)?;
        Ok(self.is_known_key(&key))
    }

    fn all_tracked_keys(&self) -> Option<&[ObjectKey]> {
        Some(self.all_keys.as_slice())
    }

    fn aliases(&self) -> &[(ObjectKey, ObjectKey)] {
        self.catalog.aliases()
    }
}
