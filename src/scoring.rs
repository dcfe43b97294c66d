//! Credit score engine
//!
//! Deterministic weighted formula over the five interview answers. No
//! statistical meaning is claimed for it.

use crate::models::{DebtStatus, EmploymentType, InterviewAnswers};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 1000.0;

const INCOME_WEIGHT: f64 = 50.0;

/// Trait for score computation
pub trait ScoreEngine: Send + Sync {
    /// A score in `[0, 1000]`.
    fn compute(&self, answers: &InterviewAnswers) -> f64;

    /// Qualitative label for a score.
    fn interpret(&self, score: f64) -> &'static str;
}

/// income / (expenses + 1) weighted, plus fixed weights for employment,
/// dependents and debt
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedScoreEngine;

impl WeightedScoreEngine {
    fn employment_weight(employment: EmploymentType) -> f64 {
        match employment {
            EmploymentType::Formal => 300.0,
            EmploymentType::SelfEmployed => 200.0,
            EmploymentType::Unemployed => 0.0,
        }
    }

    fn dependents_weight(dependents: u32) -> f64 {
        match dependents {
            0 => 100.0,
            1 => 80.0,
            2 => 60.0,
            _ => 30.0,
        }
    }

    fn debt_weight(has_debt: DebtStatus) -> f64 {
        match has_debt {
            DebtStatus::Yes => -100.0,
            DebtStatus::No => 100.0,
        }
    }
}

impl ScoreEngine for WeightedScoreEngine {
    fn compute(&self, answers: &InterviewAnswers) -> f64 {
        let income_ratio = answers.monthly_income.max(0.0) / (answers.fixed_expenses.max(0.0) + 1.0);

        let raw = income_ratio * INCOME_WEIGHT
            + Self::employment_weight(answers.employment)
            + Self::dependents_weight(answers.dependents)
            + Self::debt_weight(answers.has_debt);

        (raw.clamp(MIN_SCORE, MAX_SCORE) * 100.0).round() / 100.0
    }

    fn interpret(&self, score: f64) -> &'static str {
        if score < 300.0 {
            "very low"
        } else if score < 500.0 {
            "low"
        } else if score < 700.0 {
            "fair"
        } else if score < 850.0 {
            "good"
        } else {
            "excellent"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(income: f64, employment: EmploymentType, expenses: f64, dependents: u32, debt: DebtStatus) -> InterviewAnswers {
        InterviewAnswers {
            monthly_income: income,
            employment,
            fixed_expenses: expenses,
            dependents,
            has_debt: debt,
        }
    }

    #[test]
    fn test_strong_profile_scores_high() {
        let engine = WeightedScoreEngine;
        let score = engine.compute(&answers(8000.0, EmploymentType::Formal, 1500.0, 0, DebtStatus::No));
        // 8000 / 1501 * 50 = 266.49 + 300 + 100 + 100
        assert!((score - 766.49).abs() < 0.01, "score was {}", score);
        assert!(score >= 750.0);
        assert_eq!(engine.interpret(score), "good");
    }

    #[test]
    fn test_score_is_clamped() {
        let engine = WeightedScoreEngine;
        let high = engine.compute(&answers(1_000_000.0, EmploymentType::Formal, 0.0, 0, DebtStatus::No));
        assert_eq!(high, MAX_SCORE);

        let low = engine.compute(&answers(0.0, EmploymentType::Unemployed, 5000.0, 4, DebtStatus::Yes));
        assert_eq!(low, MIN_SCORE);
    }

    #[test]
    fn test_weights_order() {
        let engine = WeightedScoreEngine;
        let formal = engine.compute(&answers(3000.0, EmploymentType::Formal, 2000.0, 1, DebtStatus::No));
        let freelance = engine.compute(&answers(3000.0, EmploymentType::SelfEmployed, 2000.0, 1, DebtStatus::No));
        let with_debt = engine.compute(&answers(3000.0, EmploymentType::Formal, 2000.0, 1, DebtStatus::Yes));
        assert!(formal > freelance);
        assert!(formal > with_debt);
    }

    #[test]
    fn test_interpretation_bands() {
        let engine = WeightedScoreEngine;
        assert_eq!(engine.interpret(120.0), "very low");
        assert_eq!(engine.interpret(450.0), "low");
        assert_eq!(engine.interpret(650.0), "fair");
        assert_eq!(engine.interpret(849.99), "good");
        assert_eq!(engine.interpret(900.0), "excellent");
    }
}
