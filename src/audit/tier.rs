use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::types::TierScheme;

/// Quality tier of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Critical,
    Correct,
    Excellent,
}

impl Tier {
    /// Converts a completeness rate (0.0–100.0) into a tier.
    ///
    /// | Scheme   | Excellent | Correct           | Critical |
    /// |----------|-----------|-------------------|----------|
    /// | Weighted | > 97.5    | 87.5 ..= 97.5     | < 87.5   |
    /// | Legacy   | >= 90     | 70 .. 90          | < 70     |
    pub fn classify(rate_percent: f64, scheme: TierScheme) -> Tier {
        match scheme {
            TierScheme::Weighted => match rate_percent {
                r if r > 97.5 => Tier::Excellent,
                r if r >= 87.5 => Tier::Correct,
                _ => Tier::Critical,
            },
            TierScheme::Legacy => match rate_percent {
                r if r >= 90.0 => Tier::Excellent,
                r if r >= 70.0 => Tier::Correct,
                _ => Tier::Critical,
            },
        }
    }

    /// Background fill used when the completeness table is rendered.
    pub fn color(self) -> &'static str {
        match self {
            Tier::Excellent => "C6EFCE",
            Tier::Correct => "FFEB9C",
            Tier::Critical => "FFC7CE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Excellent => "Excellent",
            Tier::Correct => "Correct",
            Tier::Critical => "Critical",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
