use std::collections::BTreeSet;

use proptest::prelude::*;

use gatehouse::lens::{Claim, LeakGuard, LeakKind, LensConstraints, safe_template};

fn restricted() -> LensConstraints {
    LensConstraints {
        numeric_precision_allowed: false,
        leak_guard_required: true,
        ..LensConstraints::default()
    }
}

fn licensing(numbers: &[String]) -> LensConstraints {
    LensConstraints {
        numeric_precision_allowed: true,
        licensed_numbers: numbers.iter().cloned().collect::<BTreeSet<_>>(),
        leak_guard_required: true,
        ..LensConstraints::default()
    }
}

proptest! {
    #[test]
    fn given_unlicensed_figure_in_any_wording_when_checked_then_reported(
        whole in 1u32..1_000_000,
        cents in 1u32..100,
        prefix in "[A-Za-z ]{0,20}",
    ) {
        let cents = if cents % 10 == 0 { cents + 1 } else { cents };
        let figure = format!("{whole}.{cents:02}");
        let output = format!("{prefix} the price is ${figure} today");

        let report = LeakGuard.check(&output, &restricted(), "what is the price");

        prop_assert!(
            report
                .violations
                .iter()
                .any(|violation| violation.kind == LeakKind::UnlicensedNumber && violation.token == figure),
            "missed {} in {:?}",
            figure,
            report
        );
    }

    #[test]
    fn given_figure_the_user_supplied_when_echoed_then_licensed_only_with_precision(
        amount in 1u32..100_000,
    ) {
        let user_message = format!("I have {amount} dollars, what can I buy");
        let output = format!("With {amount} dollars you could buy groceries.");

        let open = LeakGuard.check(&output, &licensing(&[]), &user_message);
        prop_assert!(open.is_clean(), "{:?}", open);

        let restricted = LeakGuard.check(&output, &restricted(), &user_message);
        let amount = amount.to_string();
        prop_assert!(
            restricted
                .violations
                .iter()
                .any(|violation| violation.kind == LeakKind::UnlicensedNumber && violation.token == amount),
            "echoed {} slipped through: {:?}",
            amount,
            restricted
        );
    }

    #[test]
    fn given_licensed_figures_when_precision_allowed_then_clean(
        numbers in proptest::collection::vec(1u32..10_000, 1..5),
    ) {
        let tokens: Vec<String> = numbers.iter().map(u32::to_string).collect();
        let output = tokens.join(" and ");

        prop_assert!(LeakGuard.check(&output, &licensing(&tokens), "").is_clean());
        prop_assert!(!LeakGuard.check(&output, &restricted(), "").is_clean());
    }

    #[test]
    fn given_any_digit_free_warning_when_template_rendered_then_no_numerals(
        warning in proptest::option::of("[A-Za-z ,.]{0,60}"),
    ) {
        let constraints = LensConstraints {
            freshness_warning: warning,
            ..restricted()
        };

        let text = safe_template(&constraints);

        prop_assert!(!text.chars().any(|c| c.is_ascii_digit()), "{}", text);
        prop_assert!(LeakGuard.check(&text, &constraints, "").is_clean());
    }
}

#[test]
fn given_unverified_claim_when_asserted_then_reported_but_hedged_form_passes() {
    let constraints = LensConstraints {
        unverified_claims: vec![Claim {
            id: "claim_1".to_string(),
            text: "ACME acquired Globex".to_string(),
            key_terms: vec!["acme".to_string(), "acquired".to_string(), "globex".to_string()],
        }],
        ..restricted()
    };

    let asserted = LeakGuard.check("ACME is the company that acquired Globex.", &constraints, "");
    assert!(
        asserted
            .violations
            .iter()
            .any(|violation| violation.kind == LeakKind::UnverifiedClaimAsserted)
    );

    let hedged = LeakGuard.check(
        "Reports say ACME may have acquired Globex, but I couldn't verify it.",
        &constraints,
        "",
    );
    assert!(hedged.is_clean(), "{hedged:?}");
}

#[test]
fn given_percentages_and_thousands_when_checked_then_normalized_before_matching() {
    let constraints = licensing(&["1234.5".to_string(), "7%".to_string()]);

    let report = LeakGuard.check("Revenue was $1,234.50, up 7 percent.", &constraints, "");

    assert!(report.is_clean(), "{report:?}");
}
