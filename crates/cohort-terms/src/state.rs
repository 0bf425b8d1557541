//! Tri-state selection algebra.

/// Selection state of one node.
///
/// Leaves only ever hold `Checked` or `Unchecked`; `Indeterminate` is the
/// derived partial-selection state of an internal node whose descendants
/// disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CheckState {
    /// The node and (for internal nodes) its whole loaded subtree are selected.
    Checked,
    /// Nothing under the node is selected.
    #[default]
    Unchecked,
    /// Some, but not all, descendants are selected.
    Indeterminate,
}

impl CheckState {
    /// Derives a parent state from its children's states.
    ///
    /// Returns `None` for an empty child sequence: a node with no loaded
    /// children has no derived state and keeps its authoritative one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cohort_terms::CheckState;
    ///
    /// let all = [CheckState::Checked, CheckState::Checked];
    /// assert_eq!(CheckState::combine(all), Some(CheckState::Checked));
    ///
    /// let mixed = [CheckState::Checked, CheckState::Unchecked];
    /// assert_eq!(CheckState::combine(mixed), Some(CheckState::Indeterminate));
    ///
    /// assert_eq!(CheckState::combine([]), None);
    /// ```
    pub fn combine(children: impl IntoIterator<Item = CheckState>) -> Option<CheckState> {
        let mut any = false;
        let mut all_checked = true;
        let mut any_selected = false;

        for child in children {
            any = true;
            match child {
                CheckState::Checked => any_selected = true,
                CheckState::Indeterminate => {
                    all_checked = false;
                    any_selected = true;
                }
                CheckState::Unchecked => all_checked = false,
            }
        }

        if !any {
            return None;
        }
        Some(if all_checked {
            CheckState::Checked
        } else if any_selected {
            CheckState::Indeterminate
        } else {
            CheckState::Unchecked
        })
    }

    /// The state a toggle moves to from `self`.
    ///
    /// `Checked` flips to `Unchecked`; `Unchecked` and `Indeterminate` both
    /// move to `Checked`.
    pub fn toggled(self) -> CheckState {
        match self {
            CheckState::Checked => CheckState::Unchecked,
            CheckState::Unchecked | CheckState::Indeterminate => CheckState::Checked,
        }
    }

    /// Whether the node counts as selected for export purposes.
    pub fn is_checked(self) -> bool {
        self == CheckState::Checked
    }
}
