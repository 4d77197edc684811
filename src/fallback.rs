//! Pre-authored fallback prompts, keyed by (tier, language).
//!
//! This is the last line of defense for the prompt generator: `get` has no
//! error path. A lookup miss falls back to the same tier under the default
//! language, and a miss there returns a single hard-coded generic prompt.
use crate::model::{Language, Prompt, Tier};
use rand::seq::SliceRandom;

struct Entry {
    text: &'static str,
    image_url: &'static str,
}

const BEGINNER_EN: &[Entry] = &[
    Entry {
        text: "Draw a single mug on a table. Focus on its outline before adding any shading.",
        image_url: "https://static.musebot.app/fallback/beginner-mug.png",
    },
    Entry {
        text: "Sketch three simple leaves from memory. Keep each under ten strokes.",
        image_url: "https://static.musebot.app/fallback/beginner-leaves.png",
    },
    Entry {
        text: "Draw your front door using only straight lines.",
        image_url: "https://static.musebot.app/fallback/beginner-door.png",
    },
];

const BEGINNER_RO: &[Entry] = &[
    Entry {
        text: "Deseneaza o cana pe o masa. Concentreaza-te pe contur inainte de umbre.",
        image_url: "https://static.musebot.app/fallback/beginner-mug.png",
    },
    Entry {
        text: "Schiteaza trei frunze simple din memorie, fiecare din cel mult zece linii.",
        image_url: "https://static.musebot.app/fallback/beginner-leaves.png",
    },
];

const INTERMEDIATE_EN: &[Entry] = &[
    Entry {
        text: "Draw a street corner from a low vantage point. Pay attention to two-point perspective.",
        image_url: "https://static.musebot.app/fallback/intermediate-street.png",
    },
    Entry {
        text: "Sketch a hand holding a piece of fruit. Spend most of your time on the knuckles.",
        image_url: "https://static.musebot.app/fallback/intermediate-hand.png",
    },
];

const INTERMEDIATE_RO: &[Entry] = &[
    Entry {
        text: "Deseneaza un colt de strada dintr-un unghi jos, in perspectiva cu doua puncte.",
        image_url: "https://static.musebot.app/fallback/intermediate-street.png",
    },
    Entry {
        text: "Schiteaza o mana care tine un fruct. Insista pe articulatii.",
        image_url: "https://static.musebot.app/fallback/intermediate-hand.png",
    },
];

const ADVANCED_EN: &[Entry] = &[
    Entry {
        text: "Compose a rainy market scene with at least five figures, lit from a single source.",
        image_url: "https://static.musebot.app/fallback/advanced-market.png",
    },
    Entry {
        text: "Draw an interior reflected in a curved mirror, keeping the distortion consistent.",
        image_url: "https://static.musebot.app/fallback/advanced-mirror.png",
    },
];

const ADVANCED_RO: &[Entry] = &[
    Entry {
        text: "Compune o scena de piata pe ploaie, cu cel putin cinci siluete si o singura sursa de lumina.",
        image_url: "https://static.musebot.app/fallback/advanced-market.png",
    },
];

const GENERIC: Entry = Entry {
    text: "Draw something you can see right now, in under five minutes.",
    image_url: "https://static.musebot.app/fallback/generic.png",
};

fn table(tier: Tier, language: Language) -> Option<&'static [Entry]> {
    let entries: &[Entry] = match (tier, language) {
        (Tier::Beginner, Language::En) => BEGINNER_EN,
        (Tier::Beginner, Language::Ro) => BEGINNER_RO,
        (Tier::Intermediate, Language::En) => INTERMEDIATE_EN,
        (Tier::Intermediate, Language::Ro) => INTERMEDIATE_RO,
        (Tier::Advanced, Language::En) => ADVANCED_EN,
        (Tier::Advanced, Language::Ro) => ADVANCED_RO,
    };
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Whether a pre-authored candidate set exists for this exact pair.
pub fn has(tier: Tier, language: Language) -> bool {
    table(tier, language).is_some()
}

/// Return a fallback prompt for the pair. Never fails.
pub fn get(tier: Tier, language: Language) -> Prompt {
    let entries = table(tier, language).or_else(|| table(tier, Language::DEFAULT));
    let entry = match entries {
        Some(entries) => entries
            .choose(&mut rand::thread_rng())
            .unwrap_or(&GENERIC),
        None => &GENERIC,
    };
    Prompt {
        text: entry.text.to_string(),
        image_url: entry.image_url.to_string(),
        tier,
        language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMG_BASE: &str = "https://static.musebot.app/fallback";

    #[test]
    fn every_pair_yields_a_valid_prompt() {
        for tier in Tier::ALL {
            for language in Language::ALL {
                let prompt = get(tier, language);
                assert!(!prompt.text.trim().is_empty());
                assert!(prompt.image_url.starts_with(IMG_BASE));
                assert_eq!(prompt.tier, tier);
                assert_eq!(prompt.language, language);
            }
        }
    }

    #[test]
    fn repeated_lookups_stay_within_candidates() {
        for _ in 0..20 {
            let prompt = get(Tier::Beginner, Language::En);
            assert!(BEGINNER_EN.iter().any(|e| e.text == prompt.text));
        }
    }

    #[test]
    fn has_reports_direct_hits() {
        assert!(has(Tier::Advanced, Language::En));
        assert!(has(Tier::Advanced, Language::Ro));
    }
}
