use serde::Serialize;
use thiserror::Error;

use crate::calc::{
    self, gpa, standing, AcademicPolicy, CourseGrade, Enrollment, Standing, StandingInput,
};
use crate::store::{RecordStore, Student};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown student: {0}")]
    UnknownStudent(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EvalError {
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::UnknownStudent(_) => "unknown_student",
            EvalError::Store(_) => "db_query_failed",
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Outcome of re-running the grade pipeline for one (student, course).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub course_grade: CourseGrade,
    /// Enrollment that received the letter, if the student is enrolled.
    pub enrollment_id: Option<String>,
    pub completed_credits: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub student: Student,
    pub terms: Vec<gpa::TermSummary>,
    pub cgpa: f64,
    pub attempted_credits: u64,
    pub completed_credits: u64,
    pub standing: Standing,
}

/// Standing counts across every student in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummary {
    pub total_students: usize,
    pub on_probation: usize,
    pub eligible_for_graduation: usize,
}

/// Evaluation entry points over an injected record store.
pub struct Evaluator<'s, S: RecordStore> {
    store: &'s S,
    policy: AcademicPolicy,
}

impl<'s, S: RecordStore> Evaluator<'s, S> {
    pub fn new(store: &'s S, policy: AcademicPolicy) -> Self {
        Self { store, policy }
    }

    pub fn compute_course_grade(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> EvalResult<CourseGrade> {
        let items = self.store.fetch_coursework_items(course_code)?;
        let grades = self.store.fetch_grades(student_id, course_code)?;
        Ok(calc::compute_course_grade(&items, &grades))
    }

    pub fn compute_semester_gpa(
        &self,
        student_id: &str,
        semester: &str,
        year: i32,
    ) -> EvalResult<f64> {
        let enrollments = self.resolved_enrollments(student_id)?;
        Ok(gpa::semester_gpa(&enrollments, semester, year))
    }

    pub fn compute_cgpa(&self, student_id: &str) -> EvalResult<f64> {
        let enrollments = self.resolved_enrollments(student_id)?;
        Ok(gpa::cumulative_gpa(&enrollments))
    }

    pub fn compute_completed_credits(&self, student_id: &str) -> EvalResult<u64> {
        let enrollments = self.resolved_enrollments(student_id)?;
        Ok(gpa::completed_credits(&enrollments))
    }

    /// Fails only for a student the store cannot resolve.
    pub fn evaluate_standing(&self, student_id: &str) -> EvalResult<Standing> {
        let student = self.require_student(student_id)?;
        let enrollments = self.resolved_enrollments(student_id)?;
        Ok(self.standing_for(&student, &enrollments))
    }

    pub fn transcript(&self, student_id: &str) -> EvalResult<Transcript> {
        let student = self.require_student(student_id)?;
        let enrollments = self.resolved_enrollments(student_id)?;
        let rollup = gpa::rollup(&enrollments);
        let standing = self.standing_for(&student, &enrollments);
        Ok(Transcript {
            terms: gpa::term_summaries(&enrollments),
            cgpa: rollup.gpa(),
            attempted_credits: rollup.attempted_credits,
            completed_credits: gpa::completed_credits(&enrollments),
            standing,
            student,
        })
    }

    pub fn cohort_summary(&self) -> EvalResult<CohortSummary> {
        let mut summary = CohortSummary {
            total_students: 0,
            on_probation: 0,
            eligible_for_graduation: 0,
        };
        for student in self.store.fetch_students()? {
            let enrollments = self.resolved_enrollments(&student.id)?;
            let standing = self.standing_for(&student, &enrollments);
            summary.total_students += 1;
            summary.on_probation += usize::from(standing.on_probation);
            summary.eligible_for_graduation += usize::from(standing.eligible_for_graduation);
        }
        Ok(summary)
    }

    /// Recomputes the course grade, writes the letter (or clears it for IP)
    /// into the student's latest enrollment in that course, then refreshes the
    /// cached completed credits. Callers run this inside one transaction.
    pub fn commit_course_grade(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> EvalResult<CommitSummary> {
        let course_grade = self.compute_course_grade(student_id, course_code)?;

        let enrollments = self.store.fetch_enrollments(student_id)?;
        let target = enrollments
            .iter()
            .filter(|e| e.course_code == course_code)
            .max_by(|a, b| {
                gpa::compare_terms((a.semester.as_str(), a.year), (b.semester.as_str(), b.year))
            });

        let enrollment_id = match target {
            Some(e) => {
                self.store
                    .write_final_grade(&e.enrollment_id, course_grade.letter())?;
                tracing::debug!(
                    student = student_id,
                    course = course_code,
                    enrollment = %e.enrollment_id,
                    status = course_grade.status.label(),
                    "final grade written"
                );
                Some(e.enrollment_id.clone())
            }
            None => {
                tracing::warn!(
                    student = student_id,
                    course = course_code,
                    "no enrollment to receive course grade"
                );
                None
            }
        };

        let completed_credits = self.refresh_completed_credits(student_id)?;
        Ok(CommitSummary {
            course_grade,
            enrollment_id,
            completed_credits,
        })
    }

    pub fn refresh_completed_credits(&self, student_id: &str) -> EvalResult<u64> {
        let credits = self.compute_completed_credits(student_id)?;
        if self.store.fetch_student(student_id)?.is_some() {
            self.store.write_completed_credits(student_id, credits)?;
            tracing::debug!(student = student_id, credits, "completed credits written");
        }
        Ok(credits)
    }

    fn require_student(&self, student_id: &str) -> EvalResult<Student> {
        self.store
            .fetch_student(student_id)?
            .ok_or_else(|| EvalError::UnknownStudent(student_id.to_string()))
    }

    fn standing_for(&self, student: &Student, enrollments: &[Enrollment]) -> Standing {
        let rollup = gpa::rollup(enrollments);
        standing::evaluate(
            StandingInput {
                cgpa: rollup.gpa(),
                attempted_credits: rollup.attempted_credits,
                completed_credits: gpa::completed_credits(enrollments),
                required_credits: student.required_credits,
            },
            &self.policy,
        )
    }

    /// Enrollments with credit hours filled in from the course catalog where
    /// the enrollment carries none. Enrollments that still have no credit
    /// weight contribute nothing and are dropped.
    fn resolved_enrollments(&self, student_id: &str) -> EvalResult<Vec<Enrollment>> {
        let mut out = Vec::new();
        for mut e in self.store.fetch_enrollments(student_id)? {
            if e.credit_hours == 0 {
                match self.store.fetch_course(&e.course_code)? {
                    Some(course) if course.credit_hours > 0 => e.credit_hours = course.credit_hours,
                    _ => {
                        tracing::warn!(
                            enrollment = %e.enrollment_id,
                            course = %e.course_code,
                            "enrollment has no resolvable credit hours; skipped"
                        );
                        continue;
                    }
                }
            }
            out.push(e);
        }
        Ok(out)
    }
}
