//! Grouping of a flat selection by coding system.

use cohort_terms::{SelectedCode, SystemId};

/// One rendering/export group: every selected code of one system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemGroup {
    /// The shared coding system.
    pub system: SystemId,
    /// The group's codes, in selection order.
    pub codes: Vec<SelectedCode>,
}

/// Partitions a flat selection into per-system groups.
///
/// Groups appear in first-seen order of their system and each group keeps
/// the selection order of its codes. Used for chip rendering (one visual
/// group per system) and for the query-criteria serializer, which expects
/// codes pre-grouped by system.
///
/// # Example
///
/// ```rust
/// use cohort_terms::{SelectedCode, SystemId};
/// use cohort_terms_engine::group_by_system;
///
/// let selection = vec![
///     SelectedCode::new("E11", "Type 2 diabetes", SystemId::Cim10),
///     SelectedCode::new("A10", "Drugs used in diabetes", SystemId::Atc),
///     SelectedCode::new("E10", "Type 1 diabetes", SystemId::Cim10),
/// ];
///
/// let groups = group_by_system(&selection);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].system, SystemId::Cim10);
/// assert_eq!(groups[0].codes.len(), 2);
/// assert_eq!(groups[1].system, SystemId::Atc);
/// ```
pub fn group_by_system(selection: &[SelectedCode]) -> Vec<SystemGroup> {
    let mut groups: Vec<SystemGroup> = Vec::new();

    for code in selection {
        match groups.iter_mut().find(|g| g.system == code.system) {
            Some(group) => group.codes.push(code.clone()),
            None => groups.push(SystemGroup {
                system: code.system,
                codes: vec![code.clone()],
            }),
        }
    }

    groups
}
