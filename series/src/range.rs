use std::fmt;
use std::str::FromStr;

/// User-selectable lookback for the visible window. `All` shows the whole
/// series; every other variant maps to a fixed duration behind "now".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeSelection {
    #[default]
    All,
    M5,
    H1,
    D1,
    D2,
    W1,
}

impl RangeSelection {
    pub const ALL: [RangeSelection; 6] = [
        RangeSelection::All,
        RangeSelection::M5,
        RangeSelection::H1,
        RangeSelection::D1,
        RangeSelection::D2,
        RangeSelection::W1,
    ];

    /// Lookback in seconds, `None` for the unbounded `All` view.
    pub fn lookback_secs(self) -> Option<u64> {
        match self {
            RangeSelection::All => None,
            RangeSelection::M5 => Some(300),
            RangeSelection::H1 => Some(3_600),
            RangeSelection::D1 => Some(86_400),
            RangeSelection::D2 => Some(172_800),
            RangeSelection::W1 => Some(604_800),
        }
    }
}

impl fmt::Display for RangeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RangeSelection::All => "all",
                RangeSelection::M5 => "5m",
                RangeSelection::H1 => "1h",
                RangeSelection::D1 => "1d",
                RangeSelection::D2 => "2d",
                RangeSelection::W1 => "1w",
            }
        )
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown range key: {0}")]
pub struct ParseRangeError(pub String);

impl FromStr for RangeSelection {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(RangeSelection::All),
            "5m" => Ok(RangeSelection::M5),
            "1h" => Ok(RangeSelection::H1),
            "1d" => Ok(RangeSelection::D1),
            "2d" => Ok(RangeSelection::D2),
            "1w" => Ok(RangeSelection::W1),
            _ => Err(ParseRangeError(s.to_string())),
        }
    }
}
