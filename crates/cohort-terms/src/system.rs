//! Coding-system identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::TermsError;

/// A coding terminology or organizational hierarchy.
///
/// Every node, DTO and selected code is tagged with its system; node
/// identity is the `(system, id)` pair. The discriminant is normalized at
/// the fetch boundary so the selection engine never branches on
/// system-specific field shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SystemId {
    /// Diagnoses (French ICD-10).
    Cim10,
    /// Medical procedures.
    Ccam,
    /// Anatomical Therapeutic Chemical drug classes.
    Atc,
    /// Drug dispensing units.
    Ucd,
    /// Hospital stay groups (groupes homogènes de malades).
    Ghm,
    /// Organizational care-site perimeters.
    Scope,
}

impl SystemId {
    /// All known systems, in display order.
    pub const ALL: [SystemId; 6] = [
        SystemId::Cim10,
        SystemId::Ccam,
        SystemId::Atc,
        SystemId::Ucd,
        SystemId::Ghm,
        SystemId::Scope,
    ];

    /// The uppercase wire name of the system (e.g. `"CIM10"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemId::Cim10 => "CIM10",
            SystemId::Ccam => "CCAM",
            SystemId::Atc => "ATC",
            SystemId::Ucd => "UCD",
            SystemId::Ghm => "GHM",
            SystemId::Scope => "SCOPE",
        }
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemId {
    type Err = TermsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CIM10" => Ok(SystemId::Cim10),
            "CCAM" => Ok(SystemId::Ccam),
            "ATC" => Ok(SystemId::Atc),
            "UCD" => Ok(SystemId::Ucd),
            "GHM" => Ok(SystemId::Ghm),
            "SCOPE" => Ok(SystemId::Scope),
            other => Err(TermsError::UnknownSystem(other.to_string())),
        }
    }
}
