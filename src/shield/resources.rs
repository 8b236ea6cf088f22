use crate::shield::types::CrisisResource;

pub fn default_crisis_resources() -> Vec<CrisisResource> {
    vec![
        CrisisResource {
            name: "988 Suicide & Crisis Lifeline".to_string(),
            contact: "Call or text 988".to_string(),
            region: Some("US".to_string()),
        },
        CrisisResource {
            name: "Crisis Text Line".to_string(),
            contact: "Text HOME to 741741".to_string(),
            region: Some("US".to_string()),
        },
        CrisisResource {
            name: "International Association for Suicide Prevention".to_string(),
            contact: "https://www.iasp.info/resources/Crisis_Centres/".to_string(),
            region: None,
        },
    ]
}

pub fn render_crisis_resources(resources: &[CrisisResource]) -> String {
    let mut lines = Vec::with_capacity(resources.len() + 1);
    lines.push("If you are in immediate danger, please reach out right now:".to_string());
    for resource in resources {
        match &resource.region {
            Some(region) => lines.push(format!(
                "- {} ({}): {}",
                resource.name, region, resource.contact
            )),
            None => lines.push(format!("- {}: {}", resource.name, resource.contact)),
        }
    }
    lines.join("\n")
}

/// Fixed response for the control stance; the resources always come first.
pub fn control_response(resources: &[CrisisResource], session_ended: bool) -> String {
    let mut response = render_crisis_resources(resources);
    response.push_str(
        "\n\nI'm really glad you told me. You don't have to go through this alone, and the people at these services want to help you right now.",
    );
    if session_ended {
        response.push_str(
            "\n\nI'm going to pause our conversation here so you can focus on getting support. Please contact one of the services above.",
        );
    } else {
        response.push_str("\n\nIf you'd like, we can keep talking while you reach out.");
    }
    response
}
