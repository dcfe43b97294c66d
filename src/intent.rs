//! Intent Classifier
//!
//! Keyword classifiers for the three places where an utterance picks a
//! route rather than fills a field:
//! - Menu choice: which service the authenticated customer wants
//! - Rejection options: what to do after a limit request was refused
//! - Navigation: "menu"/"back" or "exit"/"quit" inside a domain agent

use crate::extract::{contains_any_phrase, contains_any_word, words};
use crate::models::AgentId;

/// Static keyword lists, checked in declaration order
const CREDIT_KEYWORDS: &[&str] = &["credit", "limit", "increase", "loan"];
const INTERVIEW_KEYWORDS: &[&str] = &["interview", "score", "reassess", "evaluation"];
const CURRENCY_KEYWORDS: &[&str] = &[
    "currency", "exchange", "dollar", "dollars", "euro", "euros", "pound", "pounds", "quote", "rate",
];
const EXIT_KEYWORDS: &[&str] = &["exit", "quit", "end", "goodbye", "bye"];

const NAV_MENU_KEYWORDS: &[&str] = &["menu", "back", "options"];
const NAV_EXIT_KEYWORDS: &[&str] = &["exit", "quit", "goodbye", "bye"];

//
// ================= Menu =================
//

/// Which service menu is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuVariant {
    /// credit, interview, currency, exit
    Full,
    /// Shown once after an approval: interview, currency, exit
    Reduced,
}

impl MenuVariant {
    /// Targets in option order; option `n` is `targets()[n - 1]`.
    pub fn targets(&self) -> &'static [AgentId] {
        match self {
            MenuVariant::Full => &[
                AgentId::Credit,
                AgentId::Interview,
                AgentId::Currency,
                AgentId::Termination,
            ],
            MenuVariant::Reduced => &[AgentId::Interview, AgentId::Currency, AgentId::Termination],
        }
    }

    pub fn render(&self) -> String {
        self.targets()
            .iter()
            .enumerate()
            .map(|(i, target)| format!("{}. {}", i + 1, menu_label(*target)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn menu_label(target: AgentId) -> &'static str {
    match target {
        AgentId::Credit => "Check or increase my credit limit",
        AgentId::Interview => "Financial interview to reassess my credit score",
        AgentId::Currency => "Currency exchange quotes",
        AgentId::Termination => "End the conversation",
        AgentId::Intake => "Main menu",
    }
}

/// Menu classifier
pub struct MenuClassifier;

impl MenuClassifier {
    /// Resolve a menu pick. A digit only counts when it is the whole trimmed
    /// utterance, so "born 15/05/1990" is never option 1.
    pub fn classify(text: &str, menu: MenuVariant) -> Option<AgentId> {
        let trimmed = text.trim();
        let targets = menu.targets();

        if let Ok(choice) = trimmed.parse::<usize>() {
            return choice
                .checked_sub(1)
                .and_then(|index| targets.get(index))
                .copied();
        }

        let tokens = words(trimmed);
        let keyword_target = if contains_any_word(&tokens, CREDIT_KEYWORDS) {
            Some(AgentId::Credit)
        } else if contains_any_word(&tokens, INTERVIEW_KEYWORDS) {
            Some(AgentId::Interview)
        } else if contains_any_word(&tokens, CURRENCY_KEYWORDS) {
            Some(AgentId::Currency)
        } else if contains_any_word(&tokens, EXIT_KEYWORDS) {
            Some(AgentId::Termination)
        } else {
            None
        };

        keyword_target.filter(|target| targets.contains(target))
    }
}

//
// ================= Rejection Options =================
//

/// The three outcomes offered after a refused limit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionChoice {
    /// 1: financial interview to try to raise the score
    Interview,
    /// 2: take the score-derived maximum now
    AcceptMaximum,
    /// 3: neither, back to the menu
    Decline,
}

const DECLINE_WORDS: &[&str] = &[
    "no", "nope", "decline", "refuse", "neither", "none", "not", "don't", "dont", "menu", "back",
];
const ACCEPT_MAX_WORDS: &[&str] = &["maximum", "max"];
const ACCEPT_MAX_PHRASES: &[&str] = &["option 2", "highest limit", "what i can get"];
const INTERVIEW_WORDS: &[&str] = &["yes", "yeah", "sure", "ok", "okay", "interview", "accept"];
const INTERVIEW_PHRASES: &[&str] = &["option 1", "improve my score", "improve score", "raise my score"];

/// Rejection option classifier
pub struct RejectionClassifier;

impl RejectionClassifier {
    /// Decline is checked before anything else: "no, I don't want the
    /// interview" contains "interview" but is a refusal.
    pub fn classify(text: &str) -> Option<RejectionChoice> {
        let trimmed = text.trim();
        match trimmed {
            "1" => return Some(RejectionChoice::Interview),
            "2" => return Some(RejectionChoice::AcceptMaximum),
            "3" => return Some(RejectionChoice::Decline),
            _ => {}
        }

        let tokens = words(trimmed);
        if contains_any_word(&tokens, DECLINE_WORDS) || contains_any_phrase(trimmed, &["option 3"]) {
            Some(RejectionChoice::Decline)
        } else if contains_any_word(&tokens, ACCEPT_MAX_WORDS)
            || contains_any_phrase(trimmed, ACCEPT_MAX_PHRASES)
        {
            Some(RejectionChoice::AcceptMaximum)
        } else if contains_any_word(&tokens, INTERVIEW_WORDS)
            || contains_any_phrase(trimmed, INTERVIEW_PHRASES)
        {
            Some(RejectionChoice::Interview)
        } else {
            None
        }
    }
}

//
// ================= Navigation =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Menu,
    Exit,
}

impl Navigation {
    pub fn target(&self) -> AgentId {
        match self {
            Navigation::Menu => AgentId::Intake,
            Navigation::Exit => AgentId::Termination,
        }
    }
}

/// Whole-word navigation request; leaving wins over going back.
pub fn navigation_intent(text: &str) -> Option<Navigation> {
    let tokens = words(text);
    if contains_any_word(&tokens, NAV_EXIT_KEYWORDS) {
        Some(Navigation::Exit)
    } else if contains_any_word(&tokens, NAV_MENU_KEYWORDS) {
        Some(Navigation::Menu)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_menu_choices() {
        assert_eq!(MenuClassifier::classify("1", MenuVariant::Full), Some(AgentId::Credit));
        assert_eq!(MenuClassifier::classify(" 2 ", MenuVariant::Full), Some(AgentId::Interview));
        assert_eq!(MenuClassifier::classify("3", MenuVariant::Full), Some(AgentId::Currency));
        assert_eq!(MenuClassifier::classify("4", MenuVariant::Full), Some(AgentId::Termination));
        assert_eq!(MenuClassifier::classify("5", MenuVariant::Full), None);
        assert_eq!(MenuClassifier::classify("0", MenuVariant::Full), None);
    }

    #[test]
    fn test_reduced_menu_shifts_options() {
        assert_eq!(MenuClassifier::classify("1", MenuVariant::Reduced), Some(AgentId::Interview));
        assert_eq!(MenuClassifier::classify("2", MenuVariant::Reduced), Some(AgentId::Currency));
        assert_eq!(MenuClassifier::classify("3", MenuVariant::Reduced), Some(AgentId::Termination));
        assert_eq!(MenuClassifier::classify("4", MenuVariant::Reduced), None);
        assert_eq!(MenuClassifier::classify("raise my credit limit", MenuVariant::Reduced), None);
    }

    #[test]
    fn test_digit_inside_longer_text_is_not_a_choice() {
        assert_eq!(MenuClassifier::classify("1990-05-15", MenuVariant::Full), None);
        assert_eq!(MenuClassifier::classify("I was born on 15/05/1990", MenuVariant::Full), None);
    }

    #[test]
    fn test_keyword_menu_choices() {
        assert_eq!(
            MenuClassifier::classify("I want to increase my limit", MenuVariant::Full),
            Some(AgentId::Credit)
        );
        assert_eq!(
            MenuClassifier::classify("reassess my score", MenuVariant::Full),
            Some(AgentId::Interview)
        );
        assert_eq!(
            MenuClassifier::classify("dollar exchange rate", MenuVariant::Full),
            Some(AgentId::Currency)
        );
        assert_eq!(MenuClassifier::classify("bye", MenuVariant::Full), Some(AgentId::Termination));
        assert_eq!(MenuClassifier::classify("hello", MenuVariant::Full), None);
    }

    #[test]
    fn test_rejection_negative_checked_first() {
        assert_eq!(RejectionClassifier::classify("1"), Some(RejectionChoice::Interview));
        assert_eq!(RejectionClassifier::classify("2"), Some(RejectionChoice::AcceptMaximum));
        assert_eq!(RejectionClassifier::classify("3"), Some(RejectionChoice::Decline));
        assert_eq!(
            RejectionClassifier::classify("no, I don't want the interview"),
            Some(RejectionChoice::Decline)
        );
        assert_eq!(
            RejectionClassifier::classify("I'll accept the maximum"),
            Some(RejectionChoice::AcceptMaximum)
        );
        assert_eq!(
            RejectionClassifier::classify("yes, let's do the interview"),
            Some(RejectionChoice::Interview)
        );
        assert_eq!(RejectionClassifier::classify("take me back"), Some(RejectionChoice::Decline));
        assert_eq!(RejectionClassifier::classify("hmm"), None);
    }

    #[test]
    fn test_navigation_whole_words() {
        assert_eq!(navigation_intent("back to the menu"), Some(Navigation::Menu));
        assert_eq!(navigation_intent("show options"), Some(Navigation::Menu));
        assert_eq!(navigation_intent("quit"), Some(Navigation::Exit));
        assert_eq!(navigation_intent("ok bye"), Some(Navigation::Exit));
        assert_eq!(navigation_intent("my backpack costs 100"), None);
        assert_eq!(navigation_intent("8000"), None);
        assert_eq!(Navigation::Exit.target(), AgentId::Termination);
    }
}
