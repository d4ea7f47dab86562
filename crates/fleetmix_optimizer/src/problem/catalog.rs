use fxhash::FxHashMap;
use tracing::debug;

use crate::{
    problem::archetype::{ArchetypeIdx, FunctionalKey, VehicleArchetype},
    utils::enumerate_idx::EnumerateIdx,
};

/// The archetypes a search may pick from, indexed by [`ArchetypeIdx`].
#[derive(Debug, Clone, Default)]
pub struct ArchetypeCatalog {
    archetypes: Vec<VehicleArchetype>,
}

/// Result of collapsing functionally identical archetypes.
pub struct CatalogDeduplication {
    pub catalog: ArchetypeCatalog,
    /// Maps every input position to the index of its representative in `catalog`.
    pub mapping: Vec<ArchetypeIdx>,
}

impl ArchetypeCatalog {
    pub fn new(archetypes: Vec<VehicleArchetype>) -> Self {
        ArchetypeCatalog { archetypes }
    }

    /// Collapses archetypes with identical functional attributes into the
    /// cheapest one. Groups keep the position of their first member so the
    /// resulting order is stable; on equal prices the first member wins.
    pub fn deduplicated(archetypes: Vec<VehicleArchetype>) -> CatalogDeduplication {
        let mut kept: Vec<VehicleArchetype> = Vec::with_capacity(archetypes.len());
        let mut groups: FxHashMap<FunctionalKey, ArchetypeIdx> = FxHashMap::default();
        let mut mapping = Vec::with_capacity(archetypes.len());

        for archetype in archetypes {
            let key = archetype.functional_key();
            match groups.get(&key) {
                Some(&representative) => {
                    if archetype.yearly_cost() < kept[representative].yearly_cost() {
                        debug!(
                            "Archetype {} replaces {} as cheaper equivalent",
                            archetype.external_id(),
                            kept[representative].external_id()
                        );
                        kept[representative] = archetype;
                    }
                    mapping.push(representative);
                }
                None => {
                    let index = ArchetypeIdx::new(kept.len());
                    groups.insert(key, index);
                    kept.push(archetype);
                    mapping.push(index);
                }
            }
        }

        CatalogDeduplication {
            catalog: ArchetypeCatalog { archetypes: kept },
            mapping,
        }
    }

    pub fn archetypes(&self) -> &[VehicleArchetype] {
        &self.archetypes
    }

    pub fn archetype(&self, index: ArchetypeIdx) -> &VehicleArchetype {
        &self.archetypes[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeIdx, &VehicleArchetype)> {
        self.archetypes.iter().enumerate_idx()
    }

    pub fn find(&self, external_id: &str) -> Option<ArchetypeIdx> {
        self.archetypes
            .iter()
            .position(|archetype| archetype.external_id() == external_id)
            .map(ArchetypeIdx::new)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}
