//! Integration tests for plan generation
//!
//! Drives the generator against a wiremock chat-completions endpoint and
//! checks normalization, fallback selection and usage accounting.

use serde_json::json;
use std::collections::HashSet;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use feature_planner::config::{LlmConfig, RequestConfig};
use feature_planner::llm::LlmClient;
use feature_planner::planner::{
    build_fallback, title_key, FeatureBrief, GenerationResult, Generator, TaskGroup, TemplateType,
};

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

fn create_generator(base_url: &str, api_key: Option<&str>) -> Generator {
    let config = LlmConfig::new(api_key.map(str::to_string), base_url);
    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0,
        retry_delay_ms: 10,
    };
    let llm = LlmClient::new(&config, request_config).expect("Failed to create client");
    Generator::new(llm, &config)
}

fn story(n: usize) -> serde_json::Value {
    json!({
        "story": format!("  As a responder, I want capability {} so alerts close faster.  ", n),
        "acceptanceCriteria": ["Works offline", "  ", "Syncs on reconnect"],
        "priority": "high"
    })
}

fn task(title: &str, group: &str) -> serde_json::Value {
    json!({
        "title": title,
        "description": format!("  Implement {}  ", title),
        "group": group,
        "status": "todo",
        "estimate": " ",
        "priority": "medium"
    })
}

fn model_plan(stories: usize, tasks: usize) -> serde_json::Value {
    let groups = ["frontend", "backend", "qa", "devops"];
    json!({
        "userStories": (0..stories).map(story).collect::<Vec<_>>(),
        "tasks": (0..tasks)
            .map(|i| task(&format!("Task number {}", i), groups[i % groups.len()]))
            .collect::<Vec<_>>()
    })
}

fn completion(content: &str, usage: Option<(u64, u64)>) -> serde_json::Value {
    let mut body = json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    });
    if let Some((prompt, completion)) = usage {
        body["usage"] = json!({
            "prompt_tokens": prompt,
            "completion_tokens": completion,
            "total_tokens": prompt + completion
        });
    }
    body
}

async fn mount_completion(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

fn assert_within_bounds(result: &GenerationResult) {
    let stories = result.payload.user_stories.len();
    let tasks = result.payload.tasks.len();
    assert!((4..=8).contains(&stories), "story count {}", stories);
    assert!((8..=20).contains(&tasks), "task count {}", tasks);

    let keys: HashSet<String> = result
        .payload
        .tasks
        .iter()
        .map(|t| title_key(&t.title))
        .collect();
    assert_eq!(keys.len(), tasks, "task titles must be unique");
}

#[cfg(test)]
mod success_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_valid_json_is_normalized() {
        let server = MockServer::start().await;
        let content = model_plan(5, 9).to_string();
        mount_completion(&server, 200, completion(&content, Some((1000, 500)))).await;

        let generator = create_generator(&server.uri(), Some("test-key"));
        let result = generator.generate(&brief()).await;

        assert!(!result.meta.used_fallback);
        assert_within_bounds(&result);
        assert_eq!(result.payload.user_stories.len(), 5);
        assert_eq!(result.payload.tasks.len(), 9);

        let first = &result.payload.user_stories[0];
        assert_eq!(
            first.story,
            "As a responder, I want capability 0 so alerts close faster."
        );
        assert_eq!(first.acceptance_criteria, vec!["Works offline", "Syncs on reconnect"]);

        let task = &result.payload.tasks[1];
        assert_eq!(task.description, "Implement Task number 1");
        assert_eq!(task.group, TaskGroup::Backend);
        assert!(task.estimate.is_none());
        assert_eq!(task.order, 1);

        assert_eq!(result.meta.usage.prompt_tokens, Some(1000));
        assert_eq!(result.meta.usage.total_tokens, Some(1500));
        // flash-lite rates: 0.1 in, 0.4 out per million
        assert_eq!(result.meta.estimated_cost_usd, Some(0.0003));
        assert!(result
            .payload
            .generated_markdown
            .contains("## Engineering Tasks\n1. [frontend] Task number 0 (todo, medium)"));
    }

    #[tokio::test]
    async fn test_fenced_json_is_extracted() {
        let server = MockServer::start().await;
        let content = format!(
            "Here is the plan:\n```JSON\n{}\n```\nLet me know!",
            model_plan(4, 8)
        );
        mount_completion(&server, 200, completion(&content, None)).await;

        let generator = create_generator(&server.uri(), Some("test-key"));
        let result = generator.generate(&brief()).await;

        assert!(!result.meta.used_fallback);
        assert_within_bounds(&result);
        assert!(result.meta.usage.is_unknown());
        assert!(result.meta.estimated_cost_usd.is_none());
    }

    #[tokio::test]
    async fn test_oversized_output_is_truncated_and_deduplicated() {
        let server = MockServer::start().await;
        let mut plan = model_plan(12, 30);
        plan["tasks"][1] = task("  task NUMBER 0 ", "qa");
        mount_completion(&server, 200, completion(&plan.to_string(), Some((10, 10)))).await;

        let generator = create_generator(&server.uri(), Some("test-key"));
        let result = generator.generate(&brief()).await;

        assert!(!result.meta.used_fallback);
        assert_within_bounds(&result);
        assert_eq!(result.payload.user_stories.len(), 8);
        assert_eq!(result.payload.tasks.len(), 20);
        assert_eq!(result.payload.tasks[1].title, "Task number 2");
        let orders: Vec<i64> = result.payload.tasks.iter().map(|t| t.order).collect();
        assert_eq!(orders, (0..20).collect::<Vec<i64>>());
    }
}

#[cfg(test)]
mod fallback_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_no_credential_uses_fallback_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let generator = create_generator(&server.uri(), None);
        let result = generator.generate(&brief()).await;

        assert!(result.meta.used_fallback);
        assert_eq!(result.payload.user_stories.len(), 4);
        assert_eq!(result.payload.tasks.len(), 10);
        assert!(result.payload.user_stories[0]
            .story
            .contains("let users acknowledge alerts"));
        assert!(result.meta.usage.is_unknown());
        assert!(result.meta.estimated_cost_usd.is_none());
        assert_eq!(result.meta.model, "gemini-2.5-flash-lite");
    }

    #[tokio::test]
    async fn test_malformed_output_uses_fallback() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            200,
            completion("I cannot help with that.", Some((50, 5))),
        )
        .await;

        let generator = create_generator(&server.uri(), Some("test-key"));
        let result = generator.generate(&brief()).await;

        assert!(result.meta.used_fallback);
        assert_eq!(result.payload, build_fallback(&brief()));
        assert!(result.meta.usage.is_unknown());
        assert!(result.meta.estimated_cost_usd.is_none());
    }

    #[tokio::test]
    async fn test_unknown_enum_value_uses_fallback() {
        let server = MockServer::start().await;
        let mut plan = model_plan(4, 8);
        plan["tasks"][0]["group"] = json!("design");
        mount_completion(&server, 200, completion(&plan.to_string(), None)).await;

        let generator = create_generator(&server.uri(), Some("test-key"));
        let result = generator.generate(&brief()).await;
        assert!(result.meta.used_fallback);
    }

    #[tokio::test]
    async fn test_http_error_uses_fallback() {
        let server = MockServer::start().await;
        mount_completion(&server, 500, json!({ "error": "boom" })).await;

        let generator = create_generator(&server.uri(), Some("test-key"));
        let result = generator.generate(&brief()).await;

        assert!(result.meta.used_fallback);
        assert_within_bounds(&result);
        assert!(result.meta.usage.is_unknown());
    }

    #[tokio::test]
    async fn test_under_minimum_output_keeps_usage() {
        let server = MockServer::start().await;
        let content = model_plan(3, 12).to_string();
        mount_completion(&server, 200, completion(&content, Some((1_000_000, 0)))).await;

        let config = LlmConfig::new(Some("test-key".to_string()), &server.uri())
            .with_model("gemini-2.5-flash");
        let llm = LlmClient::new(&config, RequestConfig::default()).unwrap();
        let generator = Generator::new(llm, &config);
        let result = generator.generate(&brief()).await;

        assert!(result.meta.used_fallback);
        assert_eq!(result.payload, build_fallback(&brief()));
        assert_eq!(result.meta.usage.prompt_tokens, Some(1_000_000));
        assert_eq!(result.meta.estimated_cost_usd, Some(0.3));
    }

    #[tokio::test]
    async fn test_duplicates_below_minimum_use_fallback() {
        let server = MockServer::start().await;
        let mut plan = model_plan(4, 8);
        plan["tasks"][7] = task("TASK NUMBER 3", "qa");
        mount_completion(&server, 200, completion(&plan.to_string(), None)).await;

        let generator = create_generator(&server.uri(), Some("test-key"));
        let result = generator.generate(&brief()).await;
        assert!(result.meta.used_fallback);
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let generator = create_generator("http://localhost:1", None);
        let a = generator.generate(&brief()).await;
        let b = generator.generate(&brief()).await;
        assert_eq!(a.payload.generated_markdown, b.payload.generated_markdown);
    }
}
