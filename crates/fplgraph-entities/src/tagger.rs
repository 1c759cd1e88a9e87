//! Organisation-span tagging.
//!
//! Team resolution takes candidate spans from an NER capability and scores
//! them against the team vocabulary. [`OrgTagger`] is that seam; the default
//! [`CapitalizedSpanTagger`] needs no model and simply proposes maximal runs
//! of capitalised words.

/// Proposes text spans that may name an organisation.
pub trait OrgTagger: Send + Sync {
    fn org_spans(&self, text: &str) -> Vec<String>;
}

/// Words that start a question and are capitalised only by position.
const QUESTION_WORDS: &[&str] = &[
    "how", "what", "which", "who", "whom", "whose", "when", "where", "why", "show", "list",
    "compare", "give", "find", "tell", "is", "are", "did", "does", "do", "can", "top", "best",
];

/// Connectors allowed inside a span (`Brighton & Hove Albion`).
const CONNECTORS: &[&str] = &["&", "of"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CapitalizedSpanTagger;

impl OrgTagger for CapitalizedSpanTagger {
    fn org_spans(&self, text: &str) -> Vec<String> {
        let mut spans = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut sentence_start = true;

        for raw in text.split_whitespace() {
            let ends_sentence = raw.ends_with(['.', '?', '!']);
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != '\'');

            let capitalised = word.chars().next().is_some_and(char::is_uppercase);
            let skip_initial = sentence_start
                && QUESTION_WORDS.contains(&word.to_lowercase().as_str());

            if capitalised && !skip_initial {
                current.push(word);
            } else if !current.is_empty() && CONNECTORS.contains(&word.to_lowercase().as_str()) {
                current.push(word);
            } else {
                flush(&mut current, &mut spans);
            }

            if ends_sentence || raw.ends_with(',') {
                flush(&mut current, &mut spans);
            }
            sentence_start = ends_sentence;
        }
        flush(&mut current, &mut spans);
        spans
    }
}

fn flush(current: &mut Vec<&str>, spans: &mut Vec<String>) {
    while current
        .last()
        .is_some_and(|w| CONNECTORS.contains(&w.to_lowercase().as_str()))
    {
        current.pop();
    }
    if !current.is_empty() {
        let span = current.join(" ");
        if !spans.contains(&span) {
            spans.push(span);
        }
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_sentence_initial_question_word() {
        let spans = CapitalizedSpanTagger.org_spans("How did Manchester City do against Arsenal?");
        assert_eq!(spans, vec!["Manchester City".to_string(), "Arsenal".to_string()]);
    }

    #[test]
    fn keeps_inner_connectors_only() {
        let spans = CapitalizedSpanTagger.org_spans("Brighton & Hove Albion and Chelsea");
        assert_eq!(
            spans,
            vec!["Brighton & Hove Albion".to_string(), "Chelsea".to_string()]
        );

        let spans = CapitalizedSpanTagger.org_spans("points for Fulham &");
        assert_eq!(spans, vec!["Fulham".to_string()]);
    }

    #[test]
    fn lowercase_text_has_no_spans() {
        assert!(CapitalizedSpanTagger.org_spans("man city clean sheets").is_empty());
    }
}
