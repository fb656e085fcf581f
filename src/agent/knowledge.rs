//! Fixed keyword table the simulated agent answers from
//!
//! This table never learns. Supervisor answers go to the knowledge base,
//! which is for display and search only.

/// Keyword → canned answer, checked in order
pub const SALON_KNOWLEDGE: &[(&str, &str)] = &[
    (
        "hours",
        "We're open Monday-Saturday, 9 AM to 7 PM. Closed on Sundays.",
    ),
    (
        "services",
        "We offer haircuts, coloring, styling, manicures, pedicures, and facial treatments.",
    ),
    (
        "haircut",
        "Haircuts start at $45 for women and $35 for men.",
    ),
    (
        "walk-ins",
        "We accept walk-ins based on availability, but we recommend booking an appointment.",
    ),
];

/// Canned answer for the first keyword contained in `question`
///
/// Matching is a case-insensitive substring test.
pub fn find_known_answer(question: &str) -> Option<&'static str> {
    let lower = question.to_lowercase();
    SALON_KNOWLEDGE
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, answer)| *answer)
}
