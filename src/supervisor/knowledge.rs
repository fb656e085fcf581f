//! Learned knowledge base with client-side search

use crate::desk::HelpDesk;
use crate::error::Result;
use crate::events::{ChangeFilter, Table, TableWatcher};
use crate::types::KnowledgeBaseEntry;

/// Entries whose question or answer contains `term`, ignoring case
///
/// An empty term keeps everything. Order is preserved.
pub fn filter_entries<'a>(entries: &'a [KnowledgeBaseEntry], term: &str) -> Vec<&'a KnowledgeBaseEntry> {
    entries.iter().filter(|entry| entry.matches(term)).collect()
}

/// Read-only list of learned answers, newest first
pub struct KnowledgeBaseView {
    desk: HelpDesk,
    entries: Vec<KnowledgeBaseEntry>,
    search_term: String,
}

impl KnowledgeBaseView {
    pub fn new(desk: HelpDesk) -> Self {
        Self {
            desk,
            entries: Vec::new(),
            search_term: String::new(),
        }
    }

    pub fn watch_filter() -> ChangeFilter {
        ChangeFilter::table(Table::KnowledgeBase)
    }

    pub fn watch(&self) -> TableWatcher {
        self.desk.watch(Self::watch_filter())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.entries = self.desk.knowledge().await?;
        Ok(())
    }

    /// Wait for the next relevant change and reload; `false` once closed
    pub async fn follow(&mut self, watcher: &mut TableWatcher) -> Result<bool> {
        match watcher.next().await {
            Some(_) => {
                self.refresh().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Total learned answers, ignoring the search
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[KnowledgeBaseEntry] {
        &self.entries
    }

    pub fn filtered(&self) -> Vec<&KnowledgeBaseEntry> {
        filter_entries(&self.entries, &self.search_term)
    }

    /// Headline and hint shown when nothing is listed
    pub fn empty_message(&self) -> (&'static str, &'static str) {
        if self.search_term.is_empty() {
            (
                "No learned answers yet",
                "Answers will appear here as you resolve requests",
            )
        } else {
            ("No matching knowledge found", "Try a different search term")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryId, RequestId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn entry(question: &str, answer: &str) -> KnowledgeBaseEntry {
        KnowledgeBaseEntry {
            id: EntryId::new(),
            question: question.to_string(),
            answer: answer.to_string(),
            source_request_id: RequestId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_matches_question_or_answer() {
        let entries = vec![
            entry("Do you sell gift cards?", "Yes, in any amount."),
            entry("Is there parking?", "Free lot behind the building."),
            entry("Eyebrow threading?", "Yes, $15."),
        ];

        let hits = filter_entries(&entries, "PARKING");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].question, "Is there parking?");

        let hits = filter_entries(&entries, "yes");
        assert_eq!(hits.len(), 2);

        assert_eq!(filter_entries(&entries, "").len(), 3);
        assert!(filter_entries(&entries, "balayage").is_empty());
    }

    fn entry_strategy() -> impl Strategy<Value = (String, String)> {
        ("[a-zA-Z ?]{0,24}", "[a-zA-Z .$0-9]{0,24}")
    }

    proptest! {
        #[test]
        fn prop_filter_is_exact_subset(
            pairs in proptest::collection::vec(entry_strategy(), 0..12),
            term in "[a-zA-Z]{0,3}",
        ) {
            let entries: Vec<_> = pairs.iter().map(|(q, a)| entry(q, a)).collect();
            let hits = filter_entries(&entries, &term);
            let needle = term.to_lowercase();

            for hit in &hits {
                prop_assert!(
                    hit.question.to_lowercase().contains(&needle)
                        || hit.answer.to_lowercase().contains(&needle)
                );
            }

            let expected = entries
                .iter()
                .filter(|e| {
                    e.question.to_lowercase().contains(&needle)
                        || e.answer.to_lowercase().contains(&needle)
                })
                .count();
            prop_assert_eq!(hits.len(), expected);

            if term.is_empty() {
                prop_assert_eq!(hits.len(), entries.len());
            }
        }
    }
}
