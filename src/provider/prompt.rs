use crate::{
    capability::Action,
    provider::types::GenerationConstraints,
    types::Stance,
};

fn stance_brief(stance: Stance) -> &'static str {
    match stance {
        Stance::Control => {
            "The user may be in crisis. Be warm and brief, and point them to the crisis resources provided."
        }
        Stance::Shield => {
            "The request carries real risk. Lead with the risks, stay balanced, and do not push the user toward the risky action."
        }
        Stance::Lens => {
            "Answer factually. Separate what is verified from what is not, and cite sources when you have them."
        }
        Stance::Sword => "Be direct and action-oriented. Help the user get the task done.",
    }
}

fn action_phrase(action: Action) -> &'static str {
    match action {
        Action::Answer => "answering the question",
        Action::WebSearch => "searching the web",
        Action::CiteSources => "citing sources",
        Action::GiveNumericEstimate => "giving numeric estimates",
        Action::GiveRecommendation => "giving a recommendation",
        Action::ExecuteTask => "executing tasks",
        Action::SetReminder => "setting reminders",
        Action::SuggestFollowUp => "suggesting a follow-up",
        Action::ProvideCrisisResources => "listing crisis resources",
    }
}

/// Renders the constraint set into system instructions for a chat-completions backend.
pub fn render_system_prompt(constraints: &GenerationConstraints) -> String {
    let mut lines = vec![stance_brief(constraints.stance).to_string()];

    if constraints.forbid_numeric {
        if constraints.licensed_numbers.is_empty() {
            lines.push(
                "Do not state any specific numbers, prices, percentages, dates or statistics."
                    .to_string(),
            );
        } else {
            let licensed: Vec<&str> = constraints
                .licensed_numbers
                .iter()
                .map(String::as_str)
                .collect();
            lines.push(format!(
                "The only specific figures you may state are: {}.",
                licensed.join(", ")
            ));
        }
    }
    if constraints.require_qualification {
        lines.push(
            "Clearly say that the information could not be fully verified and may be out of date."
                .to_string(),
        );
    }
    if let Some(warning) = &constraints.freshness_warning {
        lines.push(format!("Include this caveat: \"{warning}\""));
    }
    if let Some(note) = &constraints.caution_note {
        lines.push(format!("Open with this caution: \"{note}\""));
    }
    if !constraints.avoid_phrases.is_empty() {
        lines.push(format!(
            "Do not use these phrases: {}.",
            constraints.avoid_phrases.join("; ")
        ));
    }
    if !constraints.blocked_actions.is_empty() {
        let blocked: Vec<&str> = constraints
            .blocked_actions
            .iter()
            .map(|action| action_phrase(*action))
            .collect();
        lines.push(format!(
            "You are not permitted to do any of the following: {}.",
            blocked.join(", ")
        ));
    }
    if !constraints.must_include_actions.is_empty() {
        let required: Vec<&str> = constraints
            .must_include_actions
            .iter()
            .map(|action| action_phrase(*action))
            .collect();
        lines.push(format!("Your reply must include {}.", required.join(", ")));
    }
    if !constraints.citations.is_empty() {
        lines.push(format!(
            "Sources available for citation: {}",
            constraints.citations.join(" ")
        ));
    }

    lines.join("\n")
}
