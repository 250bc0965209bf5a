use std::fmt;

use crate::error::SubgraphError;

/// DEX protocols with a supported subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Curve,
    Uniswap,
    Sushiswap,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Curve, Protocol::Uniswap, Protocol::Sushiswap];

    /// Accepted spellings, lower case.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Protocol::Curve => &["curve", "c"],
            Protocol::Uniswap => &["uni", "univ3", "uniswap", "u"],
            Protocol::Sushiswap => &["sushi", "sushiswap", "s"],
        }
    }

    /// Canonical lower-case name, used for logging and store paths.
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Curve => "curve",
            Protocol::Uniswap => "uniswap",
            Protocol::Sushiswap => "sushiswap",
        }
    }

    /// Every accepted alias across all protocols.
    pub fn all_aliases() -> Vec<&'static str> {
        Self::ALL.iter().flat_map(|p| p.aliases().iter().copied()).collect()
    }

    /// Resolve a user-supplied alias, ignoring case.
    pub fn from_alias(alias: &str) -> Result<Self, SubgraphError> {
        let alias = alias.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.aliases().iter().any(|a| *a == alias))
            .ok_or_else(|| {
                SubgraphError::InvalidArgument(format!(
                    "protocol alias '{alias}' not found. Available aliases (case-insensitive): {}",
                    Self::all_aliases().join(", ")
                ))
            })
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
