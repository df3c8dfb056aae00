use serde::Serialize;
use std::collections::HashMap;

use super::coursework::{CourseworkGrade, CourseworkItem, CourseworkKind};
use super::scale::{round_off_1_decimal, CourseStatus, LetterGrade};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemScore {
    pub item_id: String,
    pub kind: CourseworkKind,
    pub title: String,
    pub marks_obtained: f64,
    pub total_marks: f64,
    pub weight: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGrade {
    /// 0 when the course is still in progress.
    pub percentage: f64,
    pub status: CourseStatus,
    pub items: Vec<ItemScore>,
    /// Grades whose item could not be found in the catalog.
    pub orphaned_grades: usize,
}

impl CourseGrade {
    pub fn letter(&self) -> Option<LetterGrade> {
        self.status.letter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightedTotals {
    weighted_sum: f64,
    weight_sum: f64,
}

/// Grades with nothing to weigh (no grades, no matching items, or zero
/// total weight) leave the course in progress rather than at 0%/F.
pub fn compute_course_grade(items: &[CourseworkItem], grades: &[CourseworkGrade]) -> CourseGrade {
    let (totals, scores, orphaned) = accumulate(items, grades);
    match finish(totals) {
        Some(raw) => CourseGrade {
            percentage: round_off_1_decimal(raw).clamp(0.0, 100.0),
            status: CourseStatus::Graded(classify(raw)),
            items: scores,
            orphaned_grades: orphaned,
        },
        None => CourseGrade {
            percentage: 0.0,
            status: CourseStatus::InProgress,
            items: scores,
            orphaned_grades: orphaned,
        },
    }
}

/// Letter for the unrounded percentage. Only float noise is absorbed, so
/// 89.95 is still an A.
fn classify(raw: f64) -> LetterGrade {
    const NOISE: f64 = 1e-9;
    LetterGrade::from_percentage(raw + NOISE)
}

fn accumulate(
    items: &[CourseworkItem],
    grades: &[CourseworkGrade],
) -> (WeightedTotals, Vec<ItemScore>, usize) {
    let mut totals = WeightedTotals {
        weighted_sum: 0.0,
        weight_sum: 0.0,
    };
    let mut scores = Vec::with_capacity(grades.len());
    let mut orphaned = 0_usize;

    let by_id: HashMap<&str, &CourseworkItem> =
        items.iter().map(|i| (i.item_id.as_str(), i)).collect();

    for g in grades {
        let Some(item) = by_id.get(g.item_id.as_str()) else {
            orphaned += 1;
            tracing::warn!(
                grade_id = %g.grade_id,
                item_id = %g.item_id,
                course = %g.course_code,
                "grade references unknown coursework item; skipped"
            );
            continue;
        };
        if item.total_marks <= 0.0 {
            tracing::warn!(item_id = %item.item_id, "coursework item has no total marks; skipped");
            continue;
        }

        let percent = g.marks_obtained / item.total_marks * 100.0;
        let weight = item.weight.max(0.0);
        totals.weighted_sum += percent * weight;
        totals.weight_sum += weight;

        scores.push(ItemScore {
            item_id: item.item_id.clone(),
            kind: item.kind,
            title: item.title.clone(),
            marks_obtained: g.marks_obtained,
            total_marks: item.total_marks,
            weight: item.weight,
            percent: round_off_1_decimal(percent),
        });
    }

    (totals, scores, orphaned)
}

/// Raw weighted percentage clamped to [0, 100], `None` with nothing to weigh.
fn finish(totals: WeightedTotals) -> Option<f64> {
    if totals.weight_sum > 0.0 {
        Some((totals.weighted_sum / totals.weight_sum).clamp(0.0, 100.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, total_marks: f64, weight: f64) -> CourseworkItem {
        CourseworkItem {
            item_id: id.to_string(),
            course_code: "CS101".to_string(),
            kind: CourseworkKind::Assignment,
            title: format!("Item {id}"),
            total_marks,
            weight,
            due_date: None,
        }
    }

    fn grade(item_id: &str, marks: f64) -> CourseworkGrade {
        CourseworkGrade {
            grade_id: format!("g-{item_id}"),
            student_id: "s1".to_string(),
            course_code: "CS101".to_string(),
            item_id: item_id.to_string(),
            marks_obtained: marks,
        }
    }

    fn graded_percentage(items: &[CourseworkItem], grades: &[CourseworkGrade]) -> f64 {
        let out = compute_course_grade(items, grades);
        assert!(out.letter().is_some(), "expected a graded course: {out:?}");
        out.percentage
    }

    #[test]
    fn uniform_ninety_percent_is_a_plus() {
        let items = vec![
            item("a1", 20.0, 30.0),
            item("mid", 30.0, 30.0),
            item("fin", 50.0, 40.0),
        ];
        let grades = vec![grade("a1", 18.0), grade("mid", 27.0), grade("fin", 45.0)];

        let out = compute_course_grade(&items, &grades);
        assert_eq!(out.percentage, 90.0);
        assert_eq!(out.status, CourseStatus::Graded(LetterGrade::APlus));
        assert_eq!(out.items.len(), 3);
        assert!(out.items.iter().all(|s| s.percent == 90.0));
    }

    #[test]
    fn weights_are_normalized_by_weight_present() {
        // Only 40 of 100 points graded so far; the result reflects that 40 alone.
        let items = vec![item("a1", 10.0, 10.0), item("fin", 100.0, 30.0)];
        let grades = vec![grade("a1", 5.0), grade("fin", 70.0)];
        let pct = graded_percentage(&items, &grades);
        // (50*10 + 70*30) / 40 = 65
        assert!((pct - 65.0).abs() < 1e-9);
    }

    #[test]
    fn no_grades_means_in_progress() {
        let items = vec![item("a1", 10.0, 50.0)];
        let out = compute_course_grade(&items, &[]);
        assert_eq!(out.status, CourseStatus::InProgress);
        assert_eq!(out.percentage, 0.0);
        assert_eq!(out.letter(), None);
    }

    #[test]
    fn no_items_means_in_progress() {
        let out = compute_course_grade(&[], &[grade("a1", 5.0)]);
        assert_eq!(out.status, CourseStatus::InProgress);
        assert_eq!(out.orphaned_grades, 1);
    }

    #[test]
    fn all_zero_weights_never_divide_by_zero() {
        let items = vec![item("a1", 10.0, 0.0), item("a2", 10.0, 0.0)];
        let grades = vec![grade("a1", 10.0), grade("a2", 3.0)];
        let out = compute_course_grade(&items, &grades);
        assert_eq!(out.status, CourseStatus::InProgress);
        assert!(out.percentage.is_finite());
        assert_eq!(out.items.len(), 2);
    }

    #[test]
    fn orphaned_grades_are_skipped() {
        let items = vec![item("a1", 10.0, 50.0)];
        let grades = vec![grade("a1", 8.0), grade("ghost", 0.0)];
        let out = compute_course_grade(&items, &grades);
        assert_eq!(out.percentage, 80.0);
        assert_eq!(out.status, CourseStatus::Graded(LetterGrade::AMinus));
        assert_eq!(out.orphaned_grades, 1);
    }

    #[test]
    fn percentage_stays_within_bounds() {
        let items = vec![item("a1", 7.0, 13.0), item("a2", 9.0, 87.0)];
        for (m1, m2) in [(0.0, 0.0), (7.0, 9.0), (3.3, 8.1), (6.9, 0.2)] {
            let pct = graded_percentage(&items, &[grade("a1", m1), grade("a2", m2)]);
            assert!((0.0..=100.0).contains(&pct), "{pct} out of range");
        }
    }

    #[test]
    fn raising_marks_never_lowers_percentage() {
        let items = vec![item("a1", 20.0, 25.0), item("a2", 40.0, 75.0)];
        let mut prev = -1.0;
        for step in 0..=40 {
            let marks = step as f64;
            let pct = graded_percentage(&items, &[grade("a1", 12.0), grade("a2", marks)]);
            assert!(pct >= prev, "{pct} < {prev} at marks {marks}");
            prev = pct;
        }
    }

    #[test]
    fn repeated_computation_is_identical() {
        let items = vec![item("a1", 20.0, 25.0), item("a2", 40.0, 75.0)];
        let grades = vec![grade("a1", 11.0), grade("a2", 31.5)];
        assert_eq!(
            compute_course_grade(&items, &grades),
            compute_course_grade(&items, &grades)
        );
    }

    #[test]
    fn letters_use_unrounded_percentage_at_every_cut() {
        let items = vec![item("x", 10_000.0, 100.0)];
        let cuts = [
            (90.0, LetterGrade::APlus, LetterGrade::A),
            (85.0, LetterGrade::A, LetterGrade::AMinus),
            (80.0, LetterGrade::AMinus, LetterGrade::BPlus),
            (75.0, LetterGrade::BPlus, LetterGrade::B),
            (70.0, LetterGrade::B, LetterGrade::BMinus),
            (65.0, LetterGrade::BMinus, LetterGrade::CPlus),
            (60.0, LetterGrade::CPlus, LetterGrade::C),
            (55.0, LetterGrade::C, LetterGrade::CMinus),
            (50.0, LetterGrade::CMinus, LetterGrade::D),
            (45.0, LetterGrade::D, LetterGrade::F),
        ];
        for (cut, at, below) in cuts {
            let on_cut = compute_course_grade(&items, &[grade("x", cut * 100.0)]);
            assert_eq!(on_cut.status, CourseStatus::Graded(at), "at {cut}");

            let just_under = compute_course_grade(&items, &[grade("x", cut * 100.0 - 5.0)]);
            assert_eq!(
                just_under.status,
                CourseStatus::Graded(below),
                "{} should stay under {cut}",
                cut - 0.05
            );
            assert!((just_under.percentage - cut).abs() <= 0.1);
        }
    }

    #[test]
    fn zero_weight_item_leaves_percentage_alone() {
        let items = vec![item("a1", 20.0, 50.0), item("bonus", 10.0, 0.0)];
        let before = compute_course_grade(&items, &[grade("a1", 15.0)]);
        let after = compute_course_grade(&items, &[grade("a1", 15.0), grade("bonus", 0.0)]);
        assert_eq!(before.percentage, 75.0);
        assert_eq!(after.percentage, before.percentage);
        assert_eq!(after.status, before.status);
        assert_eq!(after.items.len(), 2);
    }
}
