use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicPolicy {
    /// A CGPA strictly below this puts the student on probation.
    pub probation_below: f64,
    pub graduation_min_cgpa: f64,
}

impl Default for AcademicPolicy {
    fn default() -> Self {
        Self {
            probation_below: 2.0,
            graduation_min_cgpa: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandingInput {
    pub cgpa: f64,
    pub attempted_credits: u64,
    pub completed_credits: u64,
    pub required_credits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub on_probation: bool,
    pub eligible_for_graduation: bool,
    pub remaining_credits: u64,
    pub cgpa: f64,
    pub completed_credits: u64,
    pub required_credits: u32,
    /// Share of required credits completed, capped at 100.
    pub credit_progress_percent: f64,
}

pub fn evaluate(input: StandingInput, policy: &AcademicPolicy) -> Standing {
    let required = u64::from(input.required_credits);
    let on_probation = input.cgpa < policy.probation_below;
    let eligible_for_graduation =
        input.completed_credits >= required && input.cgpa >= policy.graduation_min_cgpa;
    let credit_progress_percent = if required == 0 {
        100.0
    } else {
        (100.0 * input.completed_credits as f64 / required as f64).min(100.0)
    };

    Standing {
        on_probation,
        eligible_for_graduation,
        remaining_credits: required.saturating_sub(input.completed_credits),
        cgpa: input.cgpa,
        completed_credits: input.completed_credits,
        required_credits: input.required_credits,
        credit_progress_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(cgpa: f64, completed: u64, required: u32) -> StandingInput {
        StandingInput {
            cgpa,
            attempted_credits: completed.max(1),
            completed_credits: completed,
            required_credits: required,
        }
    }

    #[test]
    fn low_cgpa_short_of_credits() {
        let s = evaluate(input(1.8, 90, 120), &AcademicPolicy::default());
        assert!(s.on_probation);
        assert!(!s.eligible_for_graduation);
        assert_eq!(s.remaining_credits, 30);
        assert_eq!(s.credit_progress_percent, 75.0);
    }

    #[test]
    fn eligibility_needs_both_credits_and_cgpa() {
        let policy = AcademicPolicy::default();
        assert!(evaluate(input(2.0, 120, 120), &policy).eligible_for_graduation);
        assert!(!evaluate(input(1.99, 130, 120), &policy).eligible_for_graduation);
        assert!(!evaluate(input(3.9, 119, 120), &policy).eligible_for_graduation);
    }

    #[test]
    fn probation_boundary_is_strict() {
        let policy = AcademicPolicy::default();
        assert!(!evaluate(input(2.0, 30, 120), &policy).on_probation);
        assert!(evaluate(input(1.999, 30, 120), &policy).on_probation);
    }

    #[test]
    fn remaining_never_negative() {
        let s = evaluate(input(3.0, 140, 120), &AcademicPolicy::default());
        assert_eq!(s.remaining_credits, 0);
        assert_eq!(s.credit_progress_percent, 100.0);

        let huge = evaluate(
            input(3.0, u64::from(u32::MAX) * 3, u32::MAX),
            &AcademicPolicy::default(),
        );
        assert_eq!(huge.remaining_credits, 0);
        assert!(huge.eligible_for_graduation);
        assert_eq!(huge.credit_progress_percent, 100.0);
    }

    #[test]
    fn fresh_student_starts_on_probation() {
        let s = evaluate(
            StandingInput {
                cgpa: 0.0,
                attempted_credits: 0,
                completed_credits: 0,
                required_credits: 120,
            },
            &AcademicPolicy::default(),
        );
        // CGPA 0.0 is below the 2.0 line whether or not anything was attempted.
        assert!(s.on_probation);
        assert!(!s.eligible_for_graduation);
        assert_eq!(s.remaining_credits, 120);
    }

    #[test]
    fn policy_thresholds_are_configurable() {
        let strict = AcademicPolicy {
            probation_below: 2.5,
            graduation_min_cgpa: 3.0,
        };
        let s = evaluate(input(2.4, 120, 120), &strict);
        assert!(s.on_probation);
        assert!(!s.eligible_for_graduation);
    }

    #[test]
    fn partial_policy_json_keeps_defaults() {
        let p: AcademicPolicy =
            serde_json::from_value(serde_json::json!({ "probationBelow": 1.5 })).expect("policy");
        assert_eq!(p.probation_below, 1.5);
        assert_eq!(p.graduation_min_cgpa, 2.0);
    }
}
