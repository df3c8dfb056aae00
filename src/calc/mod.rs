//! Academic evaluation rules.
//!
//! Everything under `calc` is a pure function of the records handed in.
//! Store access and write-back live in `crate::evaluation`.

pub mod course_grade;
pub mod coursework;
pub mod gpa;
pub mod scale;
pub mod standing;

pub use course_grade::{compute_course_grade, CourseGrade};
pub use coursework::{CourseworkGrade, CourseworkItem, CourseworkKind};
pub use gpa::Enrollment;
pub use scale::{CourseStatus, LetterGrade};
pub use standing::{AcademicPolicy, Standing, StandingInput};
