//! Prompt Quality Evaluation: Golden Test Set.
//!
//! Curated prompt renderings checked for the substrings they must (and
//! must not) contain, plus a set of canned model answers that the structured
//! parsers must accept.
//!
//! Run with `cargo test -p inkwell-llm --test eval_golden`.

use inkwell_llm::prompt::{self, PromptEngine, PromptId};
use inkwell_llm::types::{FindingsResponse, LogicReview, SuggestionsResponse, parse_structured};

/// A golden test case for prompt evaluation.
struct GoldenCase {
    /// Human-readable name for the test case.
    name: &'static str,
    /// Which prompt template constant to use.
    template: &'static str,
    /// Template variables to fill in.
    vars: Vec<(&'static str, &'static str)>,
    /// Strings that MUST appear in the rendered prompt.
    prompt_must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered prompt.
    prompt_must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. Grammar review: Korean greeting typo
        // ---------------------------------------------------------------
        GoldenCase {
            name: "grammar_review_korean_system",
            template: prompt::GRAMMAR_REVIEW_SYSTEM,
            vars: vec![("language", "Korean")],
            prompt_must_contain: vec!["Korean proofreader", "exactly as it appears", "JSON"],
            prompt_must_not_contain: vec!["{language}"],
        },
        GoldenCase {
            name: "grammar_review_korean_user",
            template: prompt::GRAMMAR_REVIEW_USER,
            vars: vec![("text", "안뇽 여러분, 반갑습니다."), ("context_block", "")],
            prompt_must_contain: vec!["안뇽 여러분", r#"{"findings": []}"#, "offset"],
            prompt_must_not_contain: vec!["{text}", "{context_block}", "{{"],
        },
        // ---------------------------------------------------------------
        // 2. Grammar review with surrounding document context
        // ---------------------------------------------------------------
        GoldenCase {
            name: "grammar_review_with_context",
            template: prompt::GRAMMAR_REVIEW_USER,
            vars: vec![
                ("text", "그래서 우리는 떠낫다."),
                ("context_block", "[Context]\n여행 이야기의 마지막 문단.\n\n"),
            ],
            prompt_must_contain: vec!["[Context]", "마지막 문단", "떠낫다"],
            prompt_must_not_contain: vec!["{context_block}"],
        },
        GoldenCase {
            name: "grammar_review_english_system",
            template: prompt::GRAMMAR_REVIEW_SYSTEM,
            vars: vec![("language", "English")],
            prompt_must_contain: vec!["English proofreader", "shortest substring"],
            prompt_must_not_contain: vec!["Korean"],
        },
        // ---------------------------------------------------------------
        // 3. Next sentence
        // ---------------------------------------------------------------
        GoldenCase {
            name: "next_sentence_system",
            template: prompt::NEXT_SENTENCE_SYSTEM,
            vars: vec![("language", "Korean")],
            prompt_must_contain: vec!["creative Korean writing assistant"],
            prompt_must_not_contain: vec!["{language}"],
        },
        GoldenCase {
            name: "next_sentence_three",
            template: prompt::NEXT_SENTENCE_USER,
            vars: vec![("text", "오늘은 비가 왔다. 우산을 챙기지 못했다."), ("count", "3")],
            prompt_must_contain: vec!["suggest 3 different", "우산을", "different direction"],
            prompt_must_not_contain: vec!["{count}", "{text}"],
        },
        GoldenCase {
            name: "next_sentence_five",
            template: prompt::NEXT_SENTENCE_USER,
            vars: vec![("text", "The meeting ended early."), ("count", "5")],
            prompt_must_contain: vec!["suggest 5 different", "meeting ended"],
            prompt_must_not_contain: vec!["{count}"],
        },
        // ---------------------------------------------------------------
        // 4. Logic review
        // ---------------------------------------------------------------
        GoldenCase {
            name: "logic_review_system",
            template: prompt::LOGIC_REVIEW_SYSTEM,
            vars: vec![("language", "Korean")],
            prompt_must_contain: vec!["logical Korean writing"],
            prompt_must_not_contain: vec!["{language}"],
        },
        GoldenCase {
            name: "logic_review_essay",
            template: prompt::LOGIC_REVIEW_USER,
            vars: vec![("text", "독서는 중요하다. 왜냐하면 생각을 넓혀 주기 때문이다.")],
            prompt_must_contain: vec!["Claim", "Evidence", "Flow", "Improvements", "독서는"],
            prompt_must_not_contain: vec!["{text}", "}}"],
        },
        GoldenCase {
            name: "logic_review_english",
            template: prompt::LOGIC_REVIEW_USER,
            vars: vec![("text", "Cats are mammals. Therefore the moon is cheese.")],
            prompt_must_contain: vec!["moon is cheese", "has_issues"],
            prompt_must_not_contain: vec!["{text}"],
        },
    ]
}

// ---------------------------------------------------------------------------
// Offline Tests: Template Rendering Validation
// ---------------------------------------------------------------------------

#[test]
fn golden_prompts_render_without_unresolved_vars() {
    for case in &golden_cases() {
        let rendered = prompt::render_template(case.template, &case.vars);

        for needle in &case.prompt_must_contain {
            assert!(
                rendered.contains(needle),
                "Golden case '{}': rendered prompt must contain '{}' but doesn't.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }
        for needle in &case.prompt_must_not_contain {
            assert!(
                !rendered.contains(needle),
                "Golden case '{}': rendered prompt must NOT contain '{}' but does.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }
    }
}

#[test]
fn golden_set_has_minimum_coverage() {
    let cases = golden_cases();
    assert!(cases.len() >= 10, "Golden set must have at least 10 cases, got {}", cases.len());
}

#[test]
fn all_user_prompts_request_json() {
    let engine = PromptEngine::builtin();
    for id in PromptId::all() {
        let tpl = engine.get(*id).expect("builtin");
        assert!(tpl.user.contains("JSON"), "User prompt '{id}' must ask for JSON");
        assert!(tpl.system.contains("You are"), "System prompt '{id}' must set a role");
    }
}

#[test]
fn toml_templates_match_builtins() {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/v1");
    let loaded = PromptEngine::from_directory(dir).expect("prompts/v1 loads");
    let builtin = PromptEngine::builtin();
    for id in PromptId::all() {
        let a = loaded.get(*id).expect("loaded");
        let b = builtin.get(*id).expect("builtin");
        assert_eq!(a.system, b.system, "{id} system drifted");
        assert_eq!(a.user, b.user, "{id} user drifted");
    }
}

// ---------------------------------------------------------------------------
// Canned answers the parsers must accept
// ---------------------------------------------------------------------------

#[test]
fn canned_findings_answer_parses() {
    let answer = "```json\n{\"findings\": [{\"original\": \"안뇽\", \"correction\": \"안녕\", \
                  \"category\": \"spelling\", \"confidence\": 0.9, \"explanation\": \"오타\"}]}\n```";
    let parsed: FindingsResponse = parse_structured(answer).expect("findings");
    assert_eq!(parsed.findings.len(), 1);
    assert_eq!(parsed.findings[0].correction, "안녕");
}

#[test]
fn canned_suggestion_answer_parses() {
    let answer = r#"{"suggestions": ["비에 젖은 채로 집에 돌아왔다.", "다행히 친구가 우산을 빌려주었다."]}"#;
    let parsed: SuggestionsResponse = parse_structured(answer).expect("suggestions");
    assert_eq!(parsed.into_candidates().len(), 2);
}

#[test]
fn canned_logic_answer_parses() {
    let answer = r#"Here is my review: {"claim": "독서는 중요하다", "evidence": "생각을 넓힌다",
        "flow": "자연스럽다", "improvements": ["예시 추가"], "has_issues": true}"#;
    let parsed: LogicReview = parse_structured(answer).expect("logic");
    assert!(parsed.has_issues);
    assert_eq!(parsed.improvements, vec!["예시 추가".to_string()]);
}
