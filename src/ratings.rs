//! Rating normalizer
//!
//! Maps agency-native marks onto one ordinal ladder. S&P and Fitch share the
//! ladder already; Moody's alphanumeric grades go through a fixed table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A grade on the common ladder, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnifiedMark {
    #[serde(rename = "AAA")]
    Aaa,
    #[serde(rename = "AA+")]
    AaPlus,
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "AA-")]
    AaMinus,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "BBB+")]
    BbbPlus,
    #[serde(rename = "BBB")]
    Bbb,
    #[serde(rename = "BBB-")]
    BbbMinus,
    #[serde(rename = "BB+")]
    BbPlus,
    #[serde(rename = "BB")]
    Bb,
    #[serde(rename = "BB-")]
    BbMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "CCC+")]
    CccPlus,
    #[serde(rename = "CCC")]
    Ccc,
    #[serde(rename = "CCC-")]
    CccMinus,
    #[serde(rename = "CC")]
    Cc,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
}

use UnifiedMark::*;

/// The ladder in rank order; index + 1 is the score
pub const LADDER: [UnifiedMark; 22] = [
    Aaa, AaPlus, Aa, AaMinus, APlus, A, AMinus, BbbPlus, Bbb, BbbMinus, BbPlus, Bb, BbMinus,
    BPlus, B, BMinus, CccPlus, Ccc, CccMinus, Cc, C, D,
];

const MOODYS: [(&str, UnifiedMark); 22] = [
    ("Aaa", Aaa),
    ("Aa1", AaPlus),
    ("Aa2", Aa),
    ("Aa3", AaMinus),
    ("A1", APlus),
    ("A2", A),
    ("A3", AMinus),
    ("Baa1", BbbPlus),
    ("Baa2", Bbb),
    ("Baa3", BbbMinus),
    ("Ba1", BbPlus),
    ("Ba2", Bb),
    ("Ba3", BbMinus),
    ("B1", BPlus),
    ("B2", B),
    ("B3", BMinus),
    ("Caa1", CccPlus),
    ("Caa2", Ccc),
    ("Caa3", CccMinus),
    ("Ca", Cc),
    ("C", C),
    ("D", D),
];

impl UnifiedMark {
    pub fn as_str(self) -> &'static str {
        match self {
            Aaa => "AAA",
            AaPlus => "AA+",
            Aa => "AA",
            AaMinus => "AA-",
            APlus => "A+",
            A => "A",
            AMinus => "A-",
            BbbPlus => "BBB+",
            Bbb => "BBB",
            BbbMinus => "BBB-",
            BbPlus => "BB+",
            Bb => "BB",
            BbMinus => "BB-",
            BPlus => "B+",
            B => "B",
            BMinus => "B-",
            CccPlus => "CCC+",
            Ccc => "CCC",
            CccMinus => "CCC-",
            Cc => "CC",
            C => "C",
            D => "D",
        }
    }

    /// 1-based rank on the ladder (AAA = 1)
    pub fn score(self) -> u8 {
        self as u8 + 1
    }

    /// Exact match against an S&P-style symbol, ignoring case
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let upper = symbol.trim().to_uppercase();
        LADDER.iter().copied().find(|m| m.as_str() == upper)
    }
}

impl fmt::Display for UnifiedMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate any supported agency mark onto the common ladder.
///
/// S&P-style input wins over the Moody's table, so `C` and `D` resolve the
/// same either way. Unknown input is `None`, which is a valid "unrated" state.
pub fn normalize(mark: &str) -> Option<UnifiedMark> {
    let t = mark.trim();
    if t.is_empty() {
        return None;
    }
    if let Some(m) = UnifiedMark::from_symbol(t) {
        return Some(m);
    }
    moodys(t).or_else(|| moodys(&capitalize(t)))
}

/// Score of an S&P-style symbol; Moody's input must be normalized first
pub fn score_of(mark: &str) -> Option<u8> {
    UnifiedMark::from_symbol(mark).map(UnifiedMark::score)
}

fn moodys(symbol: &str) -> Option<UnifiedMark> {
    MOODYS
        .iter()
        .find(|(m, _)| *m == symbol)
        .map(|(_, unified)| *unified)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moodys_mapping() {
        assert_eq!(normalize("Aaa"), Some(Aaa));
        assert_eq!(normalize("Aa2"), Some(Aa));
        assert_eq!(normalize("Baa3"), Some(BbbMinus));
        assert_eq!(normalize("Ca"), Some(Cc));
        assert_eq!(normalize(" aa1 "), Some(AaPlus));
    }

    #[test]
    fn test_sp_marks_are_idempotent() {
        for mark in LADDER {
            assert_eq!(normalize(mark.as_str()), Some(mark));
            assert_eq!(normalize(&mark.as_str().to_lowercase()), Some(mark));
        }
        assert_eq!(normalize("bbb+").map(|m| m.to_string()), Some("BBB+".to_string()));
    }

    #[test]
    fn test_unrecognized_is_none() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("NR"), None);
        assert_eq!(normalize("Aa9"), None);
        assert_eq!(score_of("Aa2"), None);
    }

    #[test]
    fn test_scores() {
        assert_eq!(score_of("AAA"), Some(1));
        assert_eq!(score_of("aa-"), Some(4));
        assert_eq!(score_of("BBB-"), Some(10));
        assert_eq!(D.score(), LADDER.len() as u8);
        assert!(Aaa < D);
    }
}
