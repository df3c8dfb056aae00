use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Letter grades recognized by the grade-point table.
///
/// The percentage scale only ever yields a subset of these (no `D+`/`D-`);
/// the remaining letters arrive through directly-set final grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "F")]
    F,
}

/// Percentage cut-offs, highest first. Anything below the last entry is an F.
const PERCENT_THRESHOLDS: [(f64, LetterGrade); 10] = [
    (90.0, LetterGrade::APlus),
    (85.0, LetterGrade::A),
    (80.0, LetterGrade::AMinus),
    (75.0, LetterGrade::BPlus),
    (70.0, LetterGrade::B),
    (65.0, LetterGrade::BMinus),
    (60.0, LetterGrade::CPlus),
    (55.0, LetterGrade::C),
    (50.0, LetterGrade::CMinus),
    (45.0, LetterGrade::D),
];

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
        }
    }

    /// Display letter for a course percentage.
    pub fn from_percentage(percent: f64) -> LetterGrade {
        PERCENT_THRESHOLDS
            .iter()
            .find(|(cut, _)| percent >= *cut)
            .map(|(_, letter)| *letter)
            .unwrap_or(LetterGrade::F)
    }

    /// Grade points on the 4.0 scale used for GPA rollups.
    pub fn grade_points(self) -> f64 {
        match self {
            LetterGrade::APlus | LetterGrade::A => 4.0,
            LetterGrade::AMinus => 3.75,
            LetterGrade::BPlus => 3.5,
            LetterGrade::B => 3.0,
            LetterGrade::BMinus => 2.75,
            LetterGrade::CPlus => 2.5,
            LetterGrade::C => 2.0,
            LetterGrade::CMinus => 1.7,
            LetterGrade::DPlus => 1.3,
            LetterGrade::D => 1.0,
            LetterGrade::DMinus => 0.7,
            LetterGrade::F => 0.0,
        }
    }

    pub fn is_fail(self) -> bool {
        self == LetterGrade::F
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized letter grade: {0}")]
pub struct UnknownLetter(pub String);

impl FromStr for LetterGrade {
    type Err = UnknownLetter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letter = match s.trim().to_ascii_uppercase().as_str() {
            "A+" => LetterGrade::APlus,
            "A" => LetterGrade::A,
            "A-" => LetterGrade::AMinus,
            "B+" => LetterGrade::BPlus,
            "B" => LetterGrade::B,
            "B-" => LetterGrade::BMinus,
            "C+" => LetterGrade::CPlus,
            "C" => LetterGrade::C,
            "C-" => LetterGrade::CMinus,
            "D+" => LetterGrade::DPlus,
            "D" => LetterGrade::D,
            "D-" => LetterGrade::DMinus,
            "F" => LetterGrade::F,
            _ => return Err(UnknownLetter(s.to_string())),
        };
        Ok(letter)
    }
}

/// Course outcome: a letter once any weighted work is graded, otherwise IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    Graded(LetterGrade),
    InProgress,
}

impl CourseStatus {
    pub fn letter(self) -> Option<LetterGrade> {
        match self {
            CourseStatus::Graded(l) => Some(l),
            CourseStatus::InProgress => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CourseStatus::Graded(l) => l.as_str(),
            CourseStatus::InProgress => "IP",
        }
    }
}

impl Serialize for CourseStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A stored final grade, normalized. Blank and "IP" both mean in progress.
pub fn parse_final_grade(raw: Option<&str>) -> FinalGrade {
    let Some(raw) = raw.map(str::trim) else {
        return FinalGrade::Absent;
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("IP") {
        return FinalGrade::Absent;
    }
    match raw.parse::<LetterGrade>() {
        Ok(letter) => FinalGrade::Letter(letter),
        Err(_) => FinalGrade::Unrecognized(raw.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalGrade {
    Absent,
    Letter(LetterGrade),
    /// Present but outside the grade-point table (e.g. "W"). Counts as
    /// completed when not a fail, never toward GPA.
    Unrecognized(String),
}

/// Half-up rounding to one decimal: `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}
