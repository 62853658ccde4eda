//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module with hints that
//! use the error's JSON context.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::SkillNotFound => suggest_skill_not_found(context),
        ErrorCode::SkillAlreadyExists => suggest_already_exists(context),
        ErrorCode::SkillParseError => suggest_parse_error(context),
        ErrorCode::RemoteRateLimited => suggest_rate_limited(context),
        _ => code.suggestion().to_string(),
    }
}

fn suggest_skill_not_found(context: Option<&Value>) -> String {
    match context.and_then(|c| c.get("skill_id")).and_then(Value::as_str) {
        Some(id) => format!(
            "Skill '{id}' not found. Try:\n  - `skillhub list` to see all available skills\n  - `skillhub workspace scan <path>` if it lives in a project directory"
        ),
        None => ErrorCode::SkillNotFound.suggestion().to_string(),
    }
}

fn suggest_already_exists(context: Option<&Value>) -> String {
    match context.and_then(|c| c.get("skill_id")).and_then(Value::as_str) {
        Some(id) => format!(
            "Skill '{id}' already exists. Use `skillhub clone {id} <new-id>` to fork it under a new id"
        ),
        None => ErrorCode::SkillAlreadyExists.suggestion().to_string(),
    }
}

fn suggest_parse_error(context: Option<&Value>) -> String {
    match context.and_then(|c| c.get("path")).and_then(Value::as_str) {
        Some(path) => format!(
            "Parse error in {path}\nThe file must start with a `---` YAML header (name, description, command) followed by the prompt body"
        ),
        None => ErrorCode::SkillParseError.suggestion().to_string(),
    }
}

fn suggest_rate_limited(context: Option<&Value>) -> String {
    let authenticated = context
        .and_then(|c| c.get("authenticated"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if authenticated {
        "GitHub API rate limit reached with the configured token. Wait for the quota window to reset".to_string()
    } else {
        ErrorCode::RemoteRateLimited.suggestion().to_string()
    }
}

/// Suggest skill ids similar to a misspelled one.
pub fn suggest_similar_skills(query: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<_> = available
        .iter()
        .map(|s| (*s, similarity_score(&query_lower, &s.to_lowercase())))
        .filter(|(_, score)| *score > 0.3)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(s, _)| s.to_string())
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn similarity_score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if b.contains(a) || a.contains(b) {
        return 0.8;
    }
    let a_chars: std::collections::HashSet<char> = a.chars().collect();
    let b_chars: std::collections::HashSet<char> = b.chars().collect();
    let common = a_chars.intersection(&b_chars).count();
    let total = a_chars.union(&b_chars).count();
    if total == 0 {
        0.0
    } else {
        common as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_id() {
        let ctx = serde_json::json!({ "skill_id": "deploy" });
        let hint = suggest_for_error(ErrorCode::SkillNotFound, Some(&ctx));
        assert!(hint.contains("'deploy'"));
    }

    #[test]
    fn rate_limit_without_token_suggests_token() {
        let hint = suggest_for_error(ErrorCode::RemoteRateLimited, None);
        assert!(hint.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn similar_skills_prefers_substring_matches() {
        let out = suggest_similar_skills("review", &["code-review", "deploy", "reviewer"], 2);
        assert_eq!(out.len(), 2);
        assert!(out.contains(&"code-review".to_string()));
    }
}
