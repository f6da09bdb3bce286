//! Centralized prompt definitions for plan generation
//!
//! Keeping the prompts and the response contract in one place makes them
//! easier to review and version alongside the normalizer that consumes them.

use crate::planner::FeatureBrief;

/// System instruction for plan generation.
pub const GENERATION_SYSTEM_PROMPT: &str =
    "Return only valid JSON. Do not include markdown, explanations, or extra keys.";

/// Minimal prompt used by the status check.
pub const PING_PROMPT: &str = "Reply with the word ok.";

/// JSON Schema the model is asked to follow.
pub const GENERATION_SCHEMA: &str = r#"{"type":"object","additionalProperties":false,"properties":{"userStories":{"type":"array","minItems":4,"maxItems":8,"items":{"type":"object","additionalProperties":false,"properties":{"story":{"type":"string"},"acceptanceCriteria":{"type":"array","minItems":2,"maxItems":5,"items":{"type":"string"}},"priority":{"type":"string","enum":["high","medium","low"]}},"required":["story","acceptanceCriteria","priority"]}},"tasks":{"type":"array","minItems":8,"maxItems":20,"items":{"type":"object","additionalProperties":false,"properties":{"title":{"type":"string"},"description":{"type":"string"},"group":{"type":"string","enum":["frontend","backend","qa","devops","product","unknown"]},"status":{"type":"string","enum":["todo","in_progress","done"]},"estimate":{"type":"string"},"priority":{"type":"string","enum":["high","medium","low"]}},"required":["title","description","group","status","priority"]}}},"required":["userStories","tasks"]}"#;

/// Sampling temperature for plan generation.
pub const GENERATION_TEMPERATURE: f64 = 0.2;

/// Completion budget for plan generation.
pub const GENERATION_MAX_TOKENS: u32 = 1800;

/// Brief fields as labelled lines.
pub fn brief_lines(brief: &FeatureBrief) -> String {
    [
        format!("Title: {}", brief.title),
        format!("Template: {}", brief.template_type),
        format!("Goal: {}", brief.goal),
        format!("Users: {}", brief.users),
        format!("Constraints: {}", brief.constraints),
        format!(
            "Risks/Unknowns: {}",
            brief
                .risk_unknowns
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or("None")
        ),
    ]
    .join("\n")
}

/// User message for plan generation: the brief plus the response contract.
pub fn generation_user_prompt(brief: &FeatureBrief) -> String {
    [
        "Create a planning output for this feature brief.".to_string(),
        String::new(),
        brief_lines(brief),
        String::new(),
        "Use this exact JSON shape:".to_string(),
        GENERATION_SCHEMA.to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::TemplateType;

    fn brief() -> FeatureBrief {
        FeatureBrief {
            title: "Ack".to_string(),
            template_type: TemplateType::MobileApp,
            goal: "Let users acknowledge alerts".to_string(),
            users: "On-call engineers".to_string(),
            constraints: "Must work offline".to_string(),
            risk_unknowns: None,
        }
    }

    #[test]
    fn test_schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(GENERATION_SCHEMA).unwrap();
        assert_eq!(schema["properties"]["userStories"]["minItems"], 4);
        assert_eq!(schema["properties"]["userStories"]["maxItems"], 8);
        assert_eq!(schema["properties"]["tasks"]["minItems"], 8);
        assert_eq!(schema["properties"]["tasks"]["maxItems"], 20);
    }

    #[test]
    fn test_brief_lines_default_risks() {
        let lines = brief_lines(&brief());
        assert!(lines.starts_with("Title: Ack\nTemplate: mobile_app\n"));
        assert!(lines.ends_with("Risks/Unknowns: None"));
    }

    #[test]
    fn test_generation_user_prompt_contains_contract() {
        let mut b = brief();
        b.risk_unknowns = Some("Pager vendor rate limits".to_string());
        let prompt = generation_user_prompt(&b);
        assert!(prompt.starts_with("Create a planning output for this feature brief.\n\n"));
        assert!(prompt.contains("Risks/Unknowns: Pager vendor rate limits"));
        assert!(prompt.ends_with(GENERATION_SCHEMA));
    }
}
