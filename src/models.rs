//! Core data models for the banking agents

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Agents =================
//

/// Every node the orchestrator can route to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Intake,
    Credit,
    Interview,
    Currency,
    Termination,
}

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Intake => "intake",
            AgentId::Credit => "credit",
            AgentId::Interview => "interview",
            AgentId::Currency => "currency",
            AgentId::Termination => "termination",
        }
    }

    /// Domain agents require an authenticated customer.
    pub fn requires_customer(&self) -> bool {
        matches!(self, AgentId::Credit | AgentId::Interview | AgentId::Currency)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ================= Customer =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub birthdate: NaiveDate,
    pub credit_limit: f64,
    pub credit_score: f64,
}

//
// ================= Interview =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Formal,
    SelfEmployed,
    Unemployed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Yes,
    No,
}

/// The five answers of a completed financial interview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterviewAnswers {
    pub monthly_income: f64,
    pub employment: EmploymentType,
    pub fixed_expenses: f64,
    pub dependents: u32,
    pub has_debt: DebtStatus,
}

//
// ================= Credit =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LimitRequestStatus {
    Approved,
    Rejected,
}

/// One entry of the limit request ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitRequest {
    pub customer_id: String,
    pub requested_at: DateTime<Utc>,
    pub current_limit: f64,
    pub requested_limit: f64,
    pub status: LimitRequestStatus,
}

//
// ================= Currency =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateQuote {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmploymentType::Formal => "formal employment",
            EmploymentType::SelfEmployed => "self-employed",
            EmploymentType::Unemployed => "unemployed",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DebtStatus::Yes => "yes",
            DebtStatus::No => "no",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for LimitRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitRequestStatus::Approved => "approved",
            LimitRequestStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Formats an amount with thousands separators and two decimals,
/// e.g. `20000.0` -> `"20,000.00"`.
pub fn format_money(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money_groups_thousands() {
        assert_eq!(format_money(20000.0), "20,000.00");
        assert_eq!(format_money(1234567.891), "1,234,567.89");
        assert_eq!(format_money(999.5), "999.50");
        assert_eq!(format_money(0.0), "0.00");
    }

    #[test]
    fn test_agent_id_serializes_lowercase() {
        let json = serde_json::to_string(&AgentId::Interview).unwrap();
        assert_eq!(json, "\"interview\"");
        assert!(AgentId::Credit.requires_customer());
        assert!(!AgentId::Intake.requires_customer());
        assert!(!AgentId::Termination.requires_customer());
    }
}
