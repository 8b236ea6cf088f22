use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::lens::{claims::supports, types::LensConstraints};

static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[$€£¥]\s?)?\d[\d,]*(?:\.\d+)?(?:\s?(?:%|percent\b))?")
        .expect("static numeric pattern compiles")
});

static ASSERTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:is|are|was|were|stands at|trades at|traded at|closed at|equals|costs|reached|hit)\b",
    )
    .expect("static assertion pattern compiles")
});

static HEDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:may|might|could|possibly|reportedly|unverified|uncertain|unclear|unavailable|not available|can't confirm|cannot confirm|couldn't (?:verify|confirm)|could not (?:verify|confirm)|wasn't able to|unable to|i don't have)\b",
    )
    .expect("static hedge pattern compiles")
});

/// Normalized numeric tokens: currency symbols, separators and trailing decimal zeros removed.
pub fn extract_numeric_tokens(text: &str) -> Vec<String> {
    NUMERIC_TOKEN
        .find_iter(text)
        .map(|found| normalize_number(found.as_str()))
        .filter(|token| !token.is_empty())
        .collect()
}

fn normalize_number(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let percent = lower.ends_with('%') || lower.ends_with("percent");
    let mut digits: String = lower
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.contains('.') {
        digits = digits.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    if percent {
        digits.push('%');
    }
    digits
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakKind {
    UnlicensedNumber,
    UnverifiedClaimAsserted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakViolation {
    pub kind: LeakKind,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakReport {
    pub violations: Vec<LeakViolation>,
}

impl LeakReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Scans generated text for specifics the evidence does not license.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeakGuard;

impl LeakGuard {
    pub fn check(
        &self,
        output: &str,
        constraints: &LensConstraints,
        user_message: &str,
    ) -> LeakReport {
        // The user's own figures count as licensed only where precision is allowed.
        let mut licensed: BTreeSet<String> = BTreeSet::new();
        if constraints.numeric_precision_allowed {
            licensed.extend(extract_numeric_tokens(user_message));
            licensed.extend(constraints.licensed_numbers.iter().cloned());
        }

        let mut report = LeakReport::default();
        for token in extract_numeric_tokens(output) {
            if !licensed.contains(&token)
                && !report.violations.iter().any(|violation| violation.token == token)
            {
                report.violations.push(LeakViolation {
                    kind: LeakKind::UnlicensedNumber,
                    token,
                });
            }
        }

        for sentence in output
            .split(['.', '!', '?', '\n'])
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
        {
            if HEDGE.is_match(sentence) || !ASSERTION.is_match(sentence) {
                continue;
            }
            for claim in &constraints.unverified_claims {
                if supports(&claim.key_terms, sentence) {
                    report.violations.push(LeakViolation {
                        kind: LeakKind::UnverifiedClaimAsserted,
                        token: claim.id.clone(),
                    });
                }
            }
        }

        report
    }
}

/// Replacement text when generation leaked. Contains no numerals.
pub fn safe_template(constraints: &LensConstraints) -> String {
    let mut response = String::from(
        "I wasn't able to verify the specifics here against reliable, up-to-date sources, so I won't state exact figures or claims as fact.",
    );
    if let Some(warning) = &constraints.freshness_warning {
        response.push(' ');
        response.push_str(warning);
    }
    response.push_str(" Please check an official or live source for the latest information.");
    response
}
