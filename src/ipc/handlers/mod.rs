pub mod academics;
pub mod core;
pub mod courses;
pub mod coursework;
pub mod enrollments;
pub mod grades;
pub mod policy;
pub mod students;
