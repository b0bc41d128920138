//! Concept extraction from free-text queries.
//!
//! A concept is a weighted category of meaning (a platform name or a topic)
//! used by the ranking stages to score history records. The mapping from
//! query text to concepts is a fixed, ordered rule table so the rule set can
//! grow without touching control flow.

use once_cell::sync::Lazy;
use regex::Regex;

/// Weight given to synthesized concepts when no table rule matches.
const GENERIC_CONCEPT_WEIGHT: f32 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Concept {
    pub name: String,
    pub keywords: Vec<String>,
    pub weight: f32,
    pub is_platform: bool,
}

struct ConceptRule {
    name: &'static str,
    pattern: Regex,
    keywords: &'static [&'static str],
    weight: f32,
    is_platform: bool,
}

impl ConceptRule {
    fn new(
        name: &'static str,
        pattern: &str,
        keywords: &'static [&'static str],
        weight: f32,
        is_platform: bool,
    ) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("invalid concept pattern"),
            keywords,
            weight,
            is_platform,
        }
    }

    fn to_concept(&self) -> Concept {
        Concept {
            name: self.name.to_string(),
            keywords: self.keywords.iter().map(|k| k.to_string()).collect(),
            weight: self.weight,
            is_platform: self.is_platform,
        }
    }
}

/// Ordered rule table. Platform rules carry the highest weights so that
/// platform requests dominate topic matches downstream; every matching rule
/// contributes, not just the first.
static RULES: Lazy<Vec<ConceptRule>> = Lazy::new(|| {
    vec![
        ConceptRule::new(
            "reddit",
            r"reddit|r/|subreddit",
            &["reddit", "r/", "subreddit", "reddit.com"],
            25.0,
            true,
        ),
        ConceptRule::new(
            "youtube",
            r"youtube|\byt\b|video",
            &["youtube", "youtu.be", "yt", "video", "watch"],
            22.0,
            true,
        ),
        ConceptRule::new(
            "twitter",
            r"twitter|x\.com|tweet",
            &["twitter", "x.com", "tweet", "t.co"],
            22.0,
            true,
        ),
        ConceptRule::new(
            "chatbot",
            r"chatbot|\bbot\b|\bai\b|assistant|\bask\b|question",
            &[
                "chatbot",
                "bot",
                "ai",
                "assistant",
                "chat",
                "ask",
                "question",
                "answers",
                "perplexity",
            ],
            16.0,
            false,
        ),
        ConceptRule::new(
            "wallpaper",
            r"wallpaper|background|desktop|screen|image|picture|photo",
            &[
                "wallpaper",
                "wallpapers",
                "background",
                "backgrounds",
                "desktop",
                "screen",
                "image",
                "images",
                "picture",
                "pictures",
                "photo",
                "photos",
            ],
            15.0,
            false,
        ),
        ConceptRule::new(
            "arcane",
            r"arcane|jinx|\bvi\b|caitlyn|ekko|jayce|viktor|piltover|zaun",
            &[
                "arcane", "jinx", "vi", "caitlyn", "ekko", "jayce", "viktor", "piltover",
                "zaun", "league", "legends",
            ],
            15.0,
            false,
        ),
        ConceptRule::new(
            "programming",
            r"code|programming|javascript|python|react|node|github|tutorial",
            &[
                "code",
                "coding",
                "programming",
                "javascript",
                "python",
                "react",
                "node",
                "github",
                "tutorial",
                "developer",
                "dev",
            ],
            12.0,
            false,
        ),
        ConceptRule::new(
            "art",
            r"\bart\b|design|artwork|fanart|drawing|illustration",
            &[
                "art",
                "artwork",
                "fanart",
                "drawing",
                "illustration",
                "design",
                "artist",
                "deviantart",
                "artstation",
            ],
            12.0,
            false,
        ),
        ConceptRule::new(
            "gaming",
            r"\bgame\b|gaming|steam|epic|riot|league",
            &["game", "gaming", "steam", "epic", "riot", "league", "pc", "console"],
            10.0,
            false,
        ),
    ]
});

/// Extract the ordered concept list for a query.
///
/// Rules are tested against the lowercased query in table order and every
/// match is included. If nothing matches, each content word longer than
/// three characters becomes its own low-weight generic concept.
pub fn extract(query: &str) -> Vec<Concept> {
    let lower = query.to_lowercase();

    let mut concepts: Vec<Concept> = RULES
        .iter()
        .filter(|rule| rule.pattern.is_match(&lower))
        .map(|rule| rule.to_concept())
        .collect();

    if concepts.is_empty() {
        for word in lower.split_whitespace().filter(|w| w.len() > 3) {
            concepts.push(Concept {
                name: word.to_string(),
                keywords: vec![word.to_string()],
                weight: GENERIC_CONCEPT_WEIGHT,
                is_platform: false,
            });
        }
    }

    log::debug!(
        "extracted {} concept(s) from query: {:?}",
        concepts.len(),
        concepts.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    concepts
}
