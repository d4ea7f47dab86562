use serde::Serialize;

use crate::problem::archetype::ArchetypeIdx;

/// A physical vehicle of the current fleet, identified the way trips record it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FleetUnit {
    external_id: String,
    archetype: ArchetypeIdx,
}

impl FleetUnit {
    pub fn new(external_id: String, archetype: ArchetypeIdx) -> Self {
        FleetUnit {
            external_id,
            archetype,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn archetype(&self) -> ArchetypeIdx {
        self.archetype
    }
}
