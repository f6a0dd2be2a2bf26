//! Operation and presentation modes.
//!
//! `OperationMode` decides what a container does with persistence;
//! `PresentationMode` decides which view shape a dispatcher renders. The two
//! share `create`, `view` and `edit`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Persistence-affecting mode of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OperationMode {
    Create,
    View,
    Edit,
}

/// Rendering-affecting mode of a view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum PresentationMode {
    Create,
    View,
    Edit,
    List,
    ShortList,
    Card,
    Table,
}

impl PresentationMode {
    /// Modes that render a whole collection rather than a single item.
    pub fn is_list_like(&self) -> bool {
        matches!(
            self,
            PresentationMode::List | PresentationMode::ShortList | PresentationMode::Table
        )
    }
}

impl From<OperationMode> for PresentationMode {
    fn from(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Create => PresentationMode::Create,
            OperationMode::View => PresentationMode::View,
            OperationMode::Edit => PresentationMode::Edit,
        }
    }
}

/// Sub-mode of the flexible dialog channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlexibleMode {
    Create,
    Edit,
}

impl From<FlexibleMode> for OperationMode {
    fn from(mode: FlexibleMode) -> Self {
        match mode {
            FlexibleMode::Create => OperationMode::Create,
            FlexibleMode::Edit => OperationMode::Edit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_list_like() {
        assert!(PresentationMode::Table.is_list_like());
        assert!(PresentationMode::ShortList.is_list_like());
        assert!(!PresentationMode::Card.is_list_like());
        assert!(!PresentationMode::from(OperationMode::Edit).is_list_like());
    }

    #[test]
    fn test_parse_presentation_mode() {
        assert_eq!(
            PresentationMode::from_str("short-list").unwrap(),
            PresentationMode::ShortList
        );
        assert_eq!(PresentationMode::from_str("Card").unwrap(), PresentationMode::Card);
        assert!(PresentationMode::from_str("grid").is_err());
    }
}
