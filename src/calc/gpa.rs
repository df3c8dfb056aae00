use serde::Serialize;
use std::cmp::Ordering;

use super::scale::{parse_final_grade, FinalGrade};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub enrollment_id: String,
    pub student_id: String,
    pub course_code: String,
    pub semester: String,
    pub year: i32,
    pub credit_hours: u32,
    /// Raw stored value; see `scale::parse_final_grade`.
    pub final_grade: Option<String>,
}

impl Enrollment {
    pub fn grade(&self) -> FinalGrade {
        parse_final_grade(self.final_grade.as_deref())
    }

    pub fn in_term(&self, semester: &str, year: i32) -> bool {
        self.year == year && self.semester.trim().eq_ignore_ascii_case(semester.trim())
    }
}

/// Quality points and attempted credits over GPA-bearing enrollments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpaRollup {
    pub quality_points: f64,
    pub attempted_credits: u64,
}

impl GpaRollup {
    /// 0.0 when nothing was attempted; no credits is not a penalty.
    pub fn gpa(&self) -> f64 {
        if self.attempted_credits == 0 {
            0.0
        } else {
            self.quality_points / self.attempted_credits as f64
        }
    }
}

pub fn rollup<'a, I>(enrollments: I) -> GpaRollup
where
    I: IntoIterator<Item = &'a Enrollment>,
{
    let mut out = GpaRollup::default();
    for e in enrollments {
        let FinalGrade::Letter(letter) = e.grade() else {
            continue;
        };
        out.quality_points += letter.grade_points() * f64::from(e.credit_hours);
        out.attempted_credits += u64::from(e.credit_hours);
    }
    out
}

pub fn semester_gpa(enrollments: &[Enrollment], semester: &str, year: i32) -> f64 {
    rollup(enrollments.iter().filter(|e| e.in_term(semester, year))).gpa()
}

pub fn cumulative_gpa(enrollments: &[Enrollment]) -> f64 {
    rollup(enrollments).gpa()
}

/// Credits earned: any present final grade except F. Summed as `u64` so
/// any number of `u32` enrollments fits.
pub fn completed_credits<'a, I>(enrollments: I) -> u64
where
    I: IntoIterator<Item = &'a Enrollment>,
{
    enrollments
        .into_iter()
        .filter(|e| match e.grade() {
            FinalGrade::Absent => false,
            FinalGrade::Letter(l) => !l.is_fail(),
            FinalGrade::Unrecognized(_) => true,
        })
        .map(|e| u64::from(e.credit_hours))
        .sum()
}

fn semester_rank(semester: &str) -> u8 {
    match semester.trim().to_ascii_lowercase().as_str() {
        "winter" => 0,
        "spring" => 1,
        "summer" => 2,
        "fall" | "autumn" => 3,
        _ => 4,
    }
}

/// Chronological term order within a year, unknown names last.
pub fn compare_terms(a: (&str, i32), b: (&str, i32)) -> Ordering {
    a.1.cmp(&b.1)
        .then_with(|| semester_rank(a.0).cmp(&semester_rank(b.0)))
        .then_with(|| a.0.to_ascii_lowercase().cmp(&b.0.to_ascii_lowercase()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    pub semester: String,
    pub year: i32,
    pub gpa: f64,
    pub attempted_credits: u64,
    pub completed_credits: u64,
    pub enrollments: Vec<Enrollment>,
}

/// Groups enrollments by term in chronological order.
pub fn term_summaries(enrollments: &[Enrollment]) -> Vec<TermSummary> {
    let mut terms: Vec<(String, i32)> = Vec::new();
    for e in enrollments {
        if !terms.iter().any(|(s, y)| e.in_term(s, *y)) {
            terms.push((e.semester.trim().to_string(), e.year));
        }
    }
    terms.sort_by(|a, b| compare_terms((a.0.as_str(), a.1), (b.0.as_str(), b.1)));

    terms
        .into_iter()
        .map(|(semester, year)| {
            let members: Vec<Enrollment> = enrollments
                .iter()
                .filter(|e| e.in_term(&semester, year))
                .cloned()
                .collect();
            let r = rollup(&members);
            TermSummary {
                gpa: r.gpa(),
                attempted_credits: r.attempted_credits,
                completed_credits: completed_credits(&members),
                semester,
                year,
                enrollments: members,
            }
        })
        .collect()
}
