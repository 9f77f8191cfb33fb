//! Follow-up routing and query typing.
//!
//! Both functions are pure keyword heuristics over the lowercased query.
//! [`route_followup`] decides whether a follow-up question can skip the
//! supervisor round-trip and jump straight to one specialist.
//! [`classify_query`] tags the turn with a coarse query type and detects
//! debate-style queries.

use roundtable_core::agents::{AgentKind, DebateCategory, QueryType, RouteTarget};

const REVENUE_KEYWORDS: &[&str] = &[
    "revenue",
    "money",
    "income",
    "pricing",
    "monetization",
    "profit",
    "earnings",
];

const UX_KEYWORDS: &[&str] = &[
    "ui",
    "ux",
    "design",
    "user experience",
    "interface",
    "usability",
    "accessibility",
];

const TECHNICAL_KEYWORDS: &[&str] = &[
    "technical",
    "architecture",
    "code",
    "database",
    "api",
    "infrastructure",
    "scalability",
];

const DOMAIN_KEYWORDS: &[&str] = &[
    "business",
    "domain",
    "market",
    "industry",
    "compliance",
    "regulation",
];

const DEBATE_KEYWORDS: &[&str] = &[
    "debate",
    "conflict",
    "disagreement",
    "argument",
    "dispute",
    "controversy",
];

// Single-word keywords match whole words only ("ui" must not match
// inside "build"); multi-word keywords match as phrases.
fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| {
        if kw.contains(' ') {
            haystack.contains(kw)
        } else {
            haystack
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == *kw)
        }
    })
}

/// Route a query, possibly bypassing the supervisor.
///
/// A first turn always goes to the supervisor. A follow-up is matched
/// against the keyword sets in precedence order (revenue, UX/UI,
/// technical, domain), first match wins; an ambiguous follow-up falls
/// back to the moderator as the safe aggregator.
pub fn route_followup(query: &str, has_history: bool) -> RouteTarget {
    if !has_history {
        return RouteTarget::Supervisor;
    }
    let lower = query.to_lowercase();
    let kind = if contains_any(&lower, REVENUE_KEYWORDS) {
        AgentKind::RevenueModelAnalyst
    } else if contains_any(&lower, UX_KEYWORDS) {
        AgentKind::UxUiSpecialist
    } else if contains_any(&lower, TECHNICAL_KEYWORDS) {
        AgentKind::TechnicalArchitect
    } else if contains_any(&lower, DOMAIN_KEYWORDS) {
        AgentKind::DomainExpert
    } else {
        AgentKind::Moderator
    };
    RouteTarget::Specialist(kind)
}

/// Tag a query with its coarse type, detecting debate-style queries.
///
/// Debate keywords win outright and set the debate category; otherwise
/// the type follows the same precedence order as [`route_followup`].
pub fn classify_query(query: &str) -> (QueryType, Option<DebateCategory>) {
    let lower = query.to_lowercase();
    if contains_any(&lower, DEBATE_KEYWORDS) {
        return (QueryType::General, Some(DebateCategory::Moderator));
    }
    let query_type = if contains_any(&lower, REVENUE_KEYWORDS) {
        QueryType::Revenue
    } else if contains_any(&lower, UX_KEYWORDS) {
        QueryType::UxUi
    } else if contains_any(&lower, TECHNICAL_KEYWORDS) {
        QueryType::Technical
    } else if contains_any(&lower, DOMAIN_KEYWORDS) {
        QueryType::Domain
    } else {
        QueryType::General
    };
    (query_type, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_turn_always_goes_to_supervisor() {
        assert_eq!(
            route_followup("Build me an app", false),
            RouteTarget::Supervisor
        );
        // Even with a keyword match.
        assert_eq!(
            route_followup("What about pricing?", false),
            RouteTarget::Supervisor
        );
    }

    #[test]
    fn pricing_followup_routes_to_revenue() {
        assert_eq!(
            route_followup("What about pricing for this?", true),
            RouteTarget::Specialist(AgentKind::RevenueModelAnalyst)
        );
    }

    #[test]
    fn each_keyword_set_routes_to_its_specialist() {
        assert_eq!(
            route_followup("Is the interface accessible?", true),
            RouteTarget::Specialist(AgentKind::UxUiSpecialist)
        );
        assert_eq!(
            route_followup("Which database should we use?", true),
            RouteTarget::Specialist(AgentKind::TechnicalArchitect)
        );
        assert_eq!(
            route_followup("Any compliance concerns?", true),
            RouteTarget::Specialist(AgentKind::DomainExpert)
        );
    }

    #[test]
    fn precedence_is_revenue_first() {
        // Both revenue and technical keywords present; revenue wins.
        assert_eq!(
            route_followup("pricing for the api", true),
            RouteTarget::Specialist(AgentKind::RevenueModelAnalyst)
        );
    }

    #[test]
    fn ambiguous_followup_falls_back_to_moderator() {
        assert_eq!(
            route_followup("And what else?", true),
            RouteTarget::Specialist(AgentKind::Moderator)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            route_followup("What about PRICING?", true),
            RouteTarget::Specialist(AgentKind::RevenueModelAnalyst)
        );
    }

    #[test]
    fn keywords_match_whole_words_only() {
        // "build" contains "ui" as a substring but is not a UX query.
        assert_eq!(
            route_followup("Build it quickly", true),
            RouteTarget::Specialist(AgentKind::Moderator)
        );
        // Phrase keywords still match across word boundaries.
        assert_eq!(
            route_followup("Polish the user experience", true),
            RouteTarget::Specialist(AgentKind::UxUiSpecialist)
        );
    }

    #[test]
    fn query_types_follow_keywords() {
        assert_eq!(classify_query("How do we make money?").0, QueryType::Revenue);
        assert_eq!(classify_query("Improve the UX flow").0, QueryType::UxUi);
        assert_eq!(
            classify_query("Pick an architecture").0,
            QueryType::Technical
        );
        assert_eq!(
            classify_query("What does the market look like?").0,
            QueryType::Domain
        );
        assert_eq!(
            classify_query("Build a mobile app for food delivery").0,
            QueryType::General
        );
    }

    #[test]
    fn debate_keywords_set_the_debate_category() {
        let (query_type, category) =
            classify_query("There is a disagreement about the roadmap");
        assert_eq!(query_type, QueryType::General);
        assert_eq!(category, Some(DebateCategory::Moderator));
        assert_eq!(classify_query("Build an app").1, None);
    }
}
