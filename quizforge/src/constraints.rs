//! Value constraints checked while building typed results.
//!
//! A constraint is either an **assert**, whose failure rejects the document,
//! or a **check**, whose failure is recorded and repaired by the caller.
//!
//! ```
//! use quizforge::constraints::{Constraint, ConstraintResults};
//!
//! let score: i64 = 8;
//! let mut results = ConstraintResults::new();
//! results.add(Constraint::assert("quality_score", "must be between 1 and 10").validate((1..=10).contains(&score)));
//! results.add(Constraint::check("passed", "must equal quality_score >= 7").validate(false));
//!
//! assert!(results.all_asserts_passed());
//! assert_eq!(results.failing_checks().len(), 1);
//! ```

use std::fmt;

/// Level of constraint enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintLevel {
    /// Must pass or the document is rejected.
    Assert,

    /// Failure is reported; the caller decides how to repair it.
    Check,
}

/// A named condition on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Enforcement level.
    pub level: ConstraintLevel,

    /// Dotted path of the constrained field.
    pub field: String,

    /// What the field must satisfy.
    pub description: String,
}

impl Constraint {
    /// Creates a new constraint.
    pub fn new(
        level: ConstraintLevel,
        field: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level,
            field: field.into(),
            description: description.into(),
        }
    }

    /// Creates an assert-level constraint.
    pub fn assert(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ConstraintLevel::Assert, field, description)
    }

    /// Creates a check-level constraint.
    pub fn check(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ConstraintLevel::Check, field, description)
    }

    /// Records whether the condition held.
    pub fn validate(self, passed: bool) -> ConstraintResult {
        ConstraintResult {
            constraint: self,
            passed,
        }
    }

    /// Returns true if this is an assert-level constraint.
    pub const fn is_assert(&self) -> bool {
        matches!(self.level, ConstraintLevel::Assert)
    }
}

/// Outcome of one constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintResult {
    /// The constraint that was validated.
    pub constraint: Constraint,

    /// Whether the constraint passed.
    pub passed: bool,
}

impl ConstraintResult {
    /// Returns true if this is a failing assert.
    pub const fn is_failing_assert(&self) -> bool {
        self.constraint.is_assert() && !self.passed
    }

    /// Returns true if this is a failing check.
    pub const fn is_failing_check(&self) -> bool {
        !self.constraint.is_assert() && !self.passed
    }
}

impl fmt::Display for ConstraintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "[{:?}] {}: {} ({})",
            self.constraint.level, status, self.constraint.field, self.constraint.description
        )
    }
}

/// Ordered collection of constraint outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintResults {
    results: Vec<ConstraintResult>,
}

impl ConstraintResults {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint outcome.
    pub fn add(&mut self, result: ConstraintResult) {
        self.results.push(result);
    }

    /// Returns all outcomes in insertion order.
    pub fn all(&self) -> &[ConstraintResult] {
        &self.results
    }

    /// Returns true if every assert passed.
    #[inline]
    pub fn all_asserts_passed(&self) -> bool {
        self.results.iter().all(|r| !r.is_failing_assert())
    }

    /// Returns all failing asserts.
    pub fn failing_asserts(&self) -> Vec<&ConstraintResult> {
        self.results.iter().filter(|r| r.is_failing_assert()).collect()
    }

    /// Returns all failing checks.
    pub fn failing_checks(&self) -> Vec<&ConstraintResult> {
        self.results.iter().filter(|r| r.is_failing_check()).collect()
    }

    /// Returns true if nothing was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns the number of outcomes.
    #[inline]
    pub fn len(&self) -> usize {
        self.results.len()
    }
}

impl fmt::Display for ConstraintResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No constraints");
        }
        writeln!(f, "Constraint results ({} total):", self.len())?;
        for result in &self.results {
            writeln!(f, "  {}", result)?;
        }
        Ok(())
    }
}
