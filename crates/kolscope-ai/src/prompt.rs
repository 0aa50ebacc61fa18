use kolscope_core::NOT_AVAILABLE;

/// Fields requested from the completion service, with a hint for each.
pub const PROFILE_SCHEMA: &[(&str, &str)] = &[
    ("full_name", "string (include salutations)"),
    ("gender", "string (predict by name)"),
    ("qualifications", "array of strings"),
    (
        "primary_affiliation",
        "string (remove any electronic address; otherwise repeat the primary affiliation)",
    ),
    ("country", "string (the country of the primary affiliation)"),
    ("department", "string"),
    ("title", "string (current position title)"),
    (
        "email",
        "string (from the primary affiliation if present, otherwise another source)",
    ),
    ("phone", "string (institutional or medical reference sites)"),
    ("fax", "string (institutional or medical reference sites)"),
    ("twitter", "url of their twitter handle if available"),
    ("linkedin", "url of their linkedin profile if available"),
    ("professional_summary", "string (300-500 words)"),
    ("education", "array of strings"),
    ("professional_history", "array of strings"),
    ("conferences_and_awards", "array of strings"),
    ("areas_of_interest", "array of strings"),
    (
        "collaborators",
        "array of strings (the known collaborators without the KOL themself)",
    ),
    (
        "geographical_influence",
        "array of strings (locations only, formatted city,state,country, no duplicates)",
    ),
    (
        "speaking_engagements",
        "array of strings (industry events, e.g. clinicaltrials.gov, FirstWordPharma.com)",
    ),
    (
        "patient_advocacy",
        "array of strings (patient advocacy involvement, e.g. aacr.org, accc-cancer.org)",
    ),
];

/// Build the user prompt asking for one subject's profile.
pub fn build_profile_prompt(
    subject: &str,
    affiliation: &str,
    locations: &[String],
    collaborators: &[String],
) -> String {
    let schema = PROFILE_SCHEMA
        .iter()
        .map(|(field, hint)| format!("    \"{field}\": \"{hint}\""))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"You are a data extraction assistant. Generate and retrieve metadata for the Key Opinion Leader (KOL) of medical science "Dr. {subject}" with the following details:
- Primary Affiliation: "{affiliation}"
- Geographic influence: {locations}
- Collaborators: {collaborators}
Use the name and primary affiliation to locate further information.

Return a JSON object with:
{{
{schema}
}}
Guidelines:
1. Use verified sources (institutional websites, PubMed, Google Scholar, ClinicalTrials.gov, Wikipedia).
2. Use "{NOT_AVAILABLE}" for missing fields.
3. Follow strict JSON format.
4. Escape special characters; social media links must be valid URLs."#,
        locations = render_list(locations),
        collaborators = render_list(collaborators),
    )
}

fn render_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_inputs_and_schema() {
        let prompt = build_profile_prompt(
            "Alan Paul Venook",
            "Dept of Oncology, UCSF, USA",
            &["Dept of Oncology, UCSF, USA".to_string()],
            &["Jane Roe".to_string(), "John Doe".to_string()],
        );
        assert!(prompt.contains("\"Dr. Alan Paul Venook\""));
        assert!(prompt.contains("Primary Affiliation: \"Dept of Oncology, UCSF, USA\""));
        assert!(prompt.contains(r#"Collaborators: ["Jane Roe","John Doe"]"#));
        for (field, _) in PROFILE_SCHEMA {
            assert!(prompt.contains(&format!("\"{field}\":")), "missing {field}");
        }
        assert!(prompt.contains("Use \"Not available\" for missing fields."));
    }

    #[test]
    fn empty_inputs_render_as_empty_arrays() {
        let prompt = build_profile_prompt("X", "Affiliation not found", &[], &[]);
        assert!(prompt.contains("Geographic influence: []"));
        assert!(prompt.contains("Collaborators: []"));
    }
}
