//! Games season (Summer / Winter).
//!
//! A typed alternative to the raw `season` TEXT column. Parsing is case-insensitive so the
//! importer and the CLI accept `summer`, `Summer` or `SUMMER`; the database always stores the
//! capitalized form checked by the migration.
//!
//! ```
//! use olympic_stats::season::Season;
//!
//! let s: Season = "winter".parse().unwrap();
//! assert_eq!(s, Season::Winter);
//! assert_eq!(s.as_db_str(), "Winter");
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Olympic season of a Games edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// Summer Games.
    Summer,
    /// Winter Games.
    Winter,
}

/// Raised when a season string is neither Summer nor Winter.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown season: {0:?}")]
pub struct UnknownSeason(pub String);

impl Season {
    /// Every season, in storage order.
    pub const ALL: [Season; 2] = [Season::Summer, Season::Winter];

    /// Value stored in the `season` column.
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Season::Summer => "Summer",
            Season::Winter => "Winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for Season {
    type Err = UnknownSeason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Season::ALL
            .into_iter()
            .find(|season| season.as_db_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownSeason(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" SUMMER ".parse::<Season>(), Ok(Season::Summer));
        assert_eq!("winter".parse::<Season>(), Ok(Season::Winter));
    }

    #[test]
    fn rejects_unknown() {
        let err = "Spring".parse::<Season>().unwrap_err();
        assert_eq!(err, UnknownSeason("Spring".into()));
    }

    #[test]
    fn display_matches_db_value() {
        for s in Season::ALL {
            assert_eq!(s.to_string(), s.as_db_str());
            assert_eq!(s.to_string().parse::<Season>(), Ok(s));
        }
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_casing_with_padding_parses(
            upper in proptest::collection::vec(any::<bool>(), 6),
            pad in "[ \t]{0,3}",
        ) {
            for s in Season::ALL {
                let mixed: String = s
                    .as_db_str()
                    .chars()
                    .zip(upper.iter().cycle())
                    .map(|(c, &u)| if u { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
                    .collect();
                let input = format!("{pad}{mixed}{pad}");
                prop_assert_eq!(input.parse::<Season>(), Ok(s));
            }
        }
    }
}
