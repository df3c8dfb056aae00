use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CourseworkKind {
    Assignment,
    MidtermExam,
    FinalExam,
}

impl CourseworkKind {
    /// Storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            CourseworkKind::Assignment => "assignment",
            CourseworkKind::MidtermExam => "midterm_exam",
            CourseworkKind::FinalExam => "final_exam",
        }
    }

    /// Accepts storage keys as well as the spellings the UI sends
    /// ("MidtermExam", "midterm", "Final Exam", ...).
    pub fn parse(raw: &str) -> Option<CourseworkKind> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "assignment" => Some(CourseworkKind::Assignment),
            "midterm" | "midtermexam" => Some(CourseworkKind::MidtermExam),
            "final" | "finalexam" => Some(CourseworkKind::FinalExam),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseworkItem {
    pub item_id: String,
    pub course_code: String,
    pub kind: CourseworkKind,
    pub title: String,
    pub total_marks: f64,
    /// Percentage-point contribution; weights need not sum to 100.
    pub weight: f64,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseworkGrade {
    pub grade_id: String,
    pub student_id: String,
    pub course_code: String,
    pub item_id: String,
    pub marks_obtained: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerViolation {
    #[error("coursework item has non-positive total marks ({total_marks})")]
    NonPositiveTotal { total_marks: f64 },
    #[error("marks must be between 0 and {total_marks} (got {marks})")]
    OutOfRange { marks: f64, total_marks: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ItemShapeError {
    #[error("totalMarks must be > 0")]
    NonPositiveTotal,
    #[error("weight must be between 0 and 100")]
    WeightOutOfRange,
}

/// Ledger write precondition: `0 <= marks <= total_marks` against a gradable item.
pub fn validate_marks(item: &CourseworkItem, marks: f64) -> Result<(), LedgerViolation> {
    if !(item.total_marks > 0.0) {
        return Err(LedgerViolation::NonPositiveTotal {
            total_marks: item.total_marks,
        });
    }
    if !marks.is_finite() || marks < 0.0 || marks > item.total_marks {
        return Err(LedgerViolation::OutOfRange {
            marks,
            total_marks: item.total_marks,
        });
    }
    Ok(())
}

pub fn validate_item_shape(total_marks: f64, weight: f64) -> Result<(), ItemShapeError> {
    if !total_marks.is_finite() || total_marks <= 0.0 {
        return Err(ItemShapeError::NonPositiveTotal);
    }
    if !weight.is_finite() || !(0.0..=100.0).contains(&weight) {
        return Err(ItemShapeError::WeightOutOfRange);
    }
    Ok(())
}
