use std::collections::{BTreeSet, HashMap};

use crate::lens::{
    leak_guard::extract_numeric_tokens,
    types::{Claim, ClaimVerification, EvidenceItem},
};

pub trait ClaimExtractor: Send + Sync {
    fn extract(&self, message: &str) -> Vec<Claim>;
}

const STOPWORDS: &[&str] = &[
    "the", "what", "whats", "is", "are", "was", "were", "how", "much", "many", "who", "when",
    "where", "why", "which", "does", "did", "can", "could", "would", "should", "will", "current",
    "currently", "latest", "today", "now", "please", "tell", "about", "with", "from", "that",
    "this", "there", "their", "your", "you", "and", "for", "has", "have", "had", "into", "know",
    "me", "any", "right", "some", "they", "them", "its", "it's", "of", "a", "an", "in", "on",
    "to", "do", "be",
];

pub fn key_terms(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|word| word.trim_matches('\'').to_lowercase())
    {
        if word.len() < 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if word.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// Splits the message into sentences and keeps those with at least one key term.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyTermClaimExtractor;

impl ClaimExtractor for KeyTermClaimExtractor {
    fn extract(&self, message: &str) -> Vec<Claim> {
        message
            .split(['.', '?', '!', '\n'])
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .filter_map(|sentence| {
                let terms = key_terms(sentence);
                (!terms.is_empty()).then(|| (sentence.to_string(), terms))
            })
            .enumerate()
            .map(|(index, (text, key_terms))| Claim {
                id: format!("claim_{}", index + 1),
                text,
                key_terms,
            })
            .collect()
    }
}

/// At least half of the claim's key terms, rounded up, must appear in the text.
pub fn supports(key_terms: &[String], text: &str) -> bool {
    if key_terms.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    let needed = key_terms.len().div_ceil(2);
    key_terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .count()
        >= needed
}

#[derive(Debug, Clone, Copy)]
pub struct ClaimRules {
    pub min_sources: usize,
    pub official_source_suffices: bool,
}

pub fn verify_claim(claim: &Claim, evidence: &[EvidenceItem], rules: ClaimRules) -> ClaimVerification {
    let supporting: Vec<&EvidenceItem> = evidence
        .iter()
        .filter(|item| supports(&claim.key_terms, &format!("{} {}", item.title, item.snippet)))
        .collect();

    let mut supporting_domains: Vec<String> = Vec::new();
    for item in &supporting {
        if !supporting_domains.contains(&item.source_domain) {
            supporting_domains.push(item.source_domain.clone());
        }
    }
    let official_support = supporting.iter().any(|item| item.official);
    let verified = supporting_domains.len() >= rules.min_sources.max(1)
        || (official_support && rules.official_source_suffices);

    // Per-domain numeric sets from the supporting snippets.
    let mut numbers_by_domain: HashMap<&str, BTreeSet<String>> = HashMap::new();
    let mut official_numbers = BTreeSet::new();
    for item in &supporting {
        let numbers: BTreeSet<String> = extract_numeric_tokens(&item.snippet).into_iter().collect();
        if item.official {
            official_numbers.extend(numbers.iter().cloned());
        }
        numbers_by_domain
            .entry(item.source_domain.as_str())
            .or_default()
            .extend(numbers);
    }
    let numeric_sets: Vec<&BTreeSet<String>> = numbers_by_domain
        .values()
        .filter(|numbers| !numbers.is_empty())
        .collect();
    let conflicting = numeric_sets.iter().enumerate().any(|(index, left)| {
        numeric_sets[index + 1..]
            .iter()
            .any(|right| left.is_disjoint(right))
    });

    let mut licensed_numbers = BTreeSet::new();
    if verified && !conflicting {
        licensed_numbers.extend(official_numbers);
        let mut counts: HashMap<&String, usize> = HashMap::new();
        for numbers in &numeric_sets {
            for number in numbers.iter() {
                *counts.entry(number).or_default() += 1;
            }
        }
        licensed_numbers.extend(
            counts
                .into_iter()
                .filter(|(_, count)| *count >= 2)
                .map(|(number, _)| number.clone()),
        );
    }

    ClaimVerification {
        claim_id: claim.id.clone(),
        text: claim.text.clone(),
        supporting_domains,
        official_support,
        verified,
        conflicting,
        licensed_numbers,
    }
}
