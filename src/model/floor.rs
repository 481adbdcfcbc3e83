use crate::model::fold;
use serde::{Deserialize, Serialize};

/// The floor of the building a booking belongs to. `General` is a category that only carries
/// expenses, it has no column in the day grid.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Floor {
    Ground,
    A,
    B,
    General,
}

serde_plain::derive_display_from_serialize!(Floor);
serde_plain::derive_fromstr_from_deserialize!(Floor);

impl Floor {
    /// The floors that have a column per month in the day grid.
    pub const BOOKABLE: [Floor; 3] = [Floor::Ground, Floor::A, Floor::B];

    /// All categories an expense may be recorded against.
    pub const ALL: [Floor; 4] = [Floor::Ground, Floor::A, Floor::B, Floor::General];

    pub fn display_name(&self) -> &'static str {
        match self {
            Floor::Ground => "Ισόγειο",
            Floor::A => "Α",
            Floor::B => "Β",
            Floor::General => "Γενικά",
        }
    }

    pub fn is_bookable(&self) -> bool {
        !matches!(self, Floor::General)
    }

    /// Parses the code or the display name, ignoring case and accents. The Latin and Greek
    /// capitals `A`/`Α` and `B`/`Β` are both accepted.
    pub fn from_name(s: &str) -> Option<Floor> {
        let folded = fold(s);
        match folded.as_str() {
            "a" | "α" => return Some(Floor::A),
            "b" | "β" => return Some(Floor::B),
            _ => {}
        }
        Floor::ALL.into_iter().find(|f| {
            folded == fold(f.display_name()) || folded == f.to_string().to_ascii_lowercase()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_from_name() {
        assert_eq!(Floor::from_name("Ισόγειο"), Some(Floor::Ground));
        assert_eq!(Floor::from_name("ground"), Some(Floor::Ground));
        assert_eq!(Floor::from_name("Α"), Some(Floor::A));
        assert_eq!(Floor::from_name("a"), Some(Floor::A));
        assert_eq!(Floor::from_name("Β"), Some(Floor::B));
        assert_eq!(Floor::from_name("γενικά"), Some(Floor::General));
        assert_eq!(Floor::from_name("Γ"), None);
        assert_eq!(Floor::from_name(""), None);
    }

    #[test]
    fn test_floor_code() {
        assert_eq!(Floor::Ground.to_string(), "GROUND");
        assert!(!Floor::General.is_bookable());
    }
}
