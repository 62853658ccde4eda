use proptest::prelude::*;

use crate::core::skill::{Skill, Tier};

pub fn arb_tier() -> impl Strategy<Value = Tier> {
    prop_oneof![
        Just(Tier::Extra),
        Just(Tier::Bundled),
        Just(Tier::Managed),
        Just(Tier::Workspace),
        Just(Tier::Unknown),
    ]
}

pub fn arb_skill_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,11}"
}

/// A skill with an arbitrary id, name and prompt in `tier`.
pub fn arb_skill_in(tier: Tier) -> impl Strategy<Value = Skill> {
    (arb_skill_id(), "[A-Za-z][A-Za-z ]{0,15}", "[a-z ]{0,40}").prop_map(move |(id, name, prompt)| {
        Skill::new(id, name).with_tier(tier).with_prompt(prompt)
    })
}

/// A list of skills in `tier` with distinct ids.
pub fn arb_tier_list(tier: Tier, max: usize) -> impl Strategy<Value = Vec<Skill>> {
    prop::collection::btree_map(arb_skill_id(), "[A-Za-z][A-Za-z ]{0,15}", 0..max).prop_map(
        move |entries| {
            entries
                .into_iter()
                .map(|(id, name)| {
                    let prompt = format!("{tier} body of {id}");
                    Skill::new(id, name).with_tier(tier).with_prompt(prompt)
                })
                .collect()
        },
    )
}
