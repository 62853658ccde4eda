//! Compiled-in skill catalog.

use super::skill::{Requirements, Skill, Tier};

struct BundledEntry {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    tags: &'static [&'static str],
    allowed_tools: &'static [&'static str],
    bins: &'static [&'static str],
    prompt: &'static str,
}

const CATALOG: &[BundledEntry] = &[
    BundledEntry {
        id: "code-review",
        name: "Code Review",
        description: "Review the pending changes for bugs, risky patterns and missing tests",
        category: "development",
        tags: &["review", "quality"],
        allowed_tools: &["Read", "Grep", "Bash"],
        bins: &["git"],
        prompt: "Review the changes in the working tree against the base branch.\n\n\
                 Report correctness bugs first, then risky patterns, then missing tests. \
                 Quote file and line for every finding and skip style nits.",
    },
    BundledEntry {
        id: "commit-message",
        name: "Commit Message",
        description: "Draft a commit message from the staged diff",
        category: "development",
        tags: &["git"],
        allowed_tools: &["Bash"],
        bins: &["git"],
        prompt: "Read the staged diff with `git diff --cached` and write a commit message: \
                 an imperative subject under 72 characters, a blank line, then a short body \
                 explaining what changed.",
    },
    BundledEntry {
        id: "explain-code",
        name: "Explain Code",
        description: "Explain how a file or function works",
        category: "learning",
        tags: &["docs"],
        allowed_tools: &["Read", "Grep"],
        bins: &[],
        prompt: "Explain the code the user points at. Start with its purpose, walk through \
                 the control flow, and call out any non-obvious invariants.",
    },
    BundledEntry {
        id: "write-tests",
        name: "Write Tests",
        description: "Add unit tests for the selected code",
        category: "development",
        tags: &["testing", "quality"],
        allowed_tools: &["Read", "Write", "Bash"],
        bins: &[],
        prompt: "Write unit tests for the code the user selected, in the project's existing \
                 test style. Cover the edge cases first and run the suite when done.",
    },
    BundledEntry {
        id: "summarize-changes",
        name: "Summarize Changes",
        description: "Summarize recent commits for a changelog or standup",
        category: "writing",
        tags: &["git", "changelog"],
        allowed_tools: &["Bash"],
        bins: &["git"],
        prompt: "Summarize the commits since the last tag as changelog entries grouped by \
                 feature, fix and chore.",
    },
];

/// Build the bundled tier. Every entry is built-in.
#[must_use]
pub fn bundled_skills() -> Vec<Skill> {
    CATALOG.iter().map(to_skill).collect()
}

fn to_skill(entry: &BundledEntry) -> Skill {
    let mut skill = Skill::new(entry.id, entry.name)
        .with_tier(Tier::Bundled)
        .with_prompt(entry.prompt);
    skill.description = entry.description.to_string();
    skill.category = entry.category.to_string();
    skill.tags = to_strings(entry.tags);
    skill.allowed_tools = to_strings(entry.allowed_tools);
    skill.requirements = Requirements {
        bins: to_strings(entry.bins),
        ..Requirements::default()
    };
    skill.built_in = true;
    skill
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn bundled_skills_are_valid_built_ins() {
        let skills = bundled_skills();
        assert!(!skills.is_empty());
        for skill in &skills {
            skill.validate().unwrap();
            assert!(skill.built_in);
            assert_eq!(skill.tier, Tier::Bundled);
            assert!(skill.has_prompt(), "{} has no prompt", skill.id);
        }
    }

    #[test]
    fn bundled_ids_are_unique() {
        let skills = bundled_skills();
        let ids: HashSet<_> = skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), skills.len());
    }
}
