use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Grade {
    #[serde(rename = "A+")]
    #[sqlx(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    #[sqlx(rename = "A")]
    A,
    #[serde(rename = "A-")]
    #[sqlx(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    #[sqlx(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    #[sqlx(rename = "B")]
    B,
    #[serde(rename = "B-")]
    #[sqlx(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    #[sqlx(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    #[sqlx(rename = "C")]
    C,
    #[serde(rename = "C-")]
    #[sqlx(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    #[sqlx(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    #[sqlx(rename = "D")]
    D,
    #[serde(rename = "F")]
    #[sqlx(rename = "F")]
    F,
}

/// Lower bound of each band, highest first. Anything below the last entry
/// (including NaN) is an F.
const GRADE_THRESHOLDS: [(f64, Grade); 11] = [
    (97.0, Grade::APlus),
    (93.0, Grade::A),
    (90.0, Grade::AMinus),
    (87.0, Grade::BPlus),
    (83.0, Grade::B),
    (80.0, Grade::BMinus),
    (77.0, Grade::CPlus),
    (73.0, Grade::C),
    (70.0, Grade::CMinus),
    (67.0, Grade::DPlus),
    (60.0, Grade::D),
];

impl Grade {
    pub fn points(self) -> f64 {
        match self {
            Grade::APlus | Grade::A => 4.0,
            Grade::AMinus => 3.7,
            Grade::BPlus => 3.3,
            Grade::B => 3.0,
            Grade::BMinus => 2.7,
            Grade::CPlus => 2.3,
            Grade::C => 2.0,
            Grade::CMinus => 1.7,
            Grade::DPlus => 1.3,
            Grade::D => 1.0,
            Grade::F => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a 0–100 score onto the letter scale. Total over every `f64`: scores
/// above 100 are an A+, anything under 60 (or NaN) is an F.
pub fn percentage_to_grade(percentage: f64) -> Grade {
    GRADE_THRESHOLDS
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::F)
}

/// Grade-point value of a letter; a missing grade counts as 0.0.
///
/// Callers building a GPA must drop ungraded records first instead of leaning
/// on the zero.
pub fn grade_points(grade: Option<Grade>) -> f64 {
    grade.map(Grade::points).unwrap_or(0.0)
}
