//! Host-level scoring: platform inclusion/exclusion and domain bonuses.
//!
//! Platform requests are hard rules: when a query names a platform, a record
//! on any other host can never come back, no matter how many other bonuses
//! it collects. That is modeled with an explicit `Excluded` verdict instead
//! of a negative sentinel score.

use crate::concepts::Concept;

/// Bonus for landing on a platform the query explicitly asked for.
const PLATFORM_MATCH_BONUS: f32 = 100.0;
/// Penalty for generic social hosts.
const SOCIAL_PENALTY: f32 = -15.0;
/// Penalty for generic utility hosts.
const UTILITY_PENALTY: f32 = -25.0;
/// Bonus per concept-relevant keyword found in the host.
const RELEVANT_DOMAIN_BONUS: f32 = 12.0;

/// Concept name → domains that satisfy a platform request for it.
const PLATFORM_DOMAINS: &[(&str, &[&str])] = &[
    ("reddit", &["reddit.com"]),
    ("youtube", &["youtube.com", "youtu.be"]),
    ("twitter", &["twitter.com", "x.com", "t.co"]),
    ("github", &["github.com"]),
    ("stackoverflow", &["stackoverflow.com"]),
];

const SOCIAL_DOMAINS: &[&str] = &["facebook.com", "instagram.com", "tiktok.com"];
const UTILITY_DOMAINS: &[&str] = &["gmail.com", "linkedin.com", "google.com"];

/// Concept name → host keywords that suggest topical relevance.
const RELEVANT_DOMAINS: &[(&str, &[&str])] = &[
    ("wallpaper", &["wallpaper", "background", "desktop", "image", "photo", "pic"]),
    ("art", &["deviantart", "artstation", "pixiv", "behance", "art"]),
    ("gaming", &["steam", "epic", "riot", "gaming", "game"]),
    ("programming", &["dev", "tech", "code"]),
    ("chatbot", &["perplexity", "openai", "claude", "gemini", "bard"]),
];

/// Outcome of domain scoring for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainVerdict {
    /// Platform request not satisfied; drop the record unconditionally.
    Excluded,
    /// Additive contribution to the keyword score (may be negative).
    Score(f32),
}

fn platform_domains(name: &str) -> Option<&'static [&'static str]> {
    PLATFORM_DOMAINS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, domains)| *domains)
}

/// Score a record's host against the extracted concepts.
///
/// Malformed URLs are neutral, never an error: the keyword stage already
/// admitted the record, and a bad URL alone is not a reason to drop it.
pub fn verdict(url: &str, concepts: &[Concept]) -> DomainVerdict {
    let host = match url::Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return DomainVerdict::Score(0.0),
        },
        Err(_) => return DomainVerdict::Score(0.0),
    };

    let mut score = 0.0;

    let requested: Vec<&Concept> = concepts
        .iter()
        .filter(|c| platform_domains(&c.name).is_some())
        .collect();

    if !requested.is_empty() {
        let mut platform_match = false;
        for platform in &requested {
            let domains = platform_domains(&platform.name).unwrap_or(&[]);
            if domains.iter().any(|d| host.contains(d)) {
                score += PLATFORM_MATCH_BONUS;
                platform_match = true;
                log::debug!("platform match for {host}: query requested {}", platform.name);
            }
        }

        if !platform_match {
            log::debug!(
                "excluding {host}: query requested {:?}",
                requested.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
            );
            return DomainVerdict::Excluded;
        }
    }

    if SOCIAL_DOMAINS.iter().any(|d| host.contains(d)) {
        score += SOCIAL_PENALTY;
    }

    if UTILITY_DOMAINS.iter().any(|d| host.contains(d)) {
        score += UTILITY_PENALTY;
    }

    for concept in concepts {
        if let Some((_, keywords)) = RELEVANT_DOMAINS.iter().find(|(n, _)| *n == concept.name) {
            for keyword in *keywords {
                if host.contains(keyword) {
                    score += RELEVANT_DOMAIN_BONUS;
                }
            }
        }
    }

    DomainVerdict::Score(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts;

    #[test]
    fn requested_platform_gets_decisive_bonus() {
        let concepts = concepts::extract("reddit post about cats");
        let verdict = verdict("https://www.reddit.com/r/cats/1", &concepts);
        match verdict {
            DomainVerdict::Score(score) => assert!(score >= PLATFORM_MATCH_BONUS),
            DomainVerdict::Excluded => panic!("requested platform must not be excluded"),
        }
    }

    #[test]
    fn off_platform_host_is_excluded_when_platform_requested() {
        let concepts = concepts::extract("reddit post about cats");
        assert_eq!(
            verdict("https://youtube.com/watch?v=x", &concepts),
            DomainVerdict::Excluded
        );
        assert_eq!(
            verdict("https://catblog.example.com/cats", &concepts),
            DomainVerdict::Excluded
        );
    }

    #[test]
    fn no_platform_request_means_no_exclusion() {
        let concepts = concepts::extract("wallpaper for my desktop");
        assert!(matches!(
            verdict("https://youtube.com/watch?v=x", &concepts),
            DomainVerdict::Score(_)
        ));
    }

    #[test]
    fn social_and_utility_hosts_are_penalized() {
        let concepts = concepts::extract("cat pictures");
        match verdict("https://www.instagram.com/cats", &concepts) {
            DomainVerdict::Score(score) => assert_eq!(score, SOCIAL_PENALTY),
            _ => panic!("expected score"),
        }
        match verdict("https://mail.google.com/inbox", &concepts) {
            DomainVerdict::Score(score) => assert_eq!(score, UTILITY_PENALTY),
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn relevant_domain_keywords_earn_bonus_per_hit() {
        let concepts = concepts::extract("arcane wallpaper");
        // "wallpapercave.com" hits exactly one keyword of the wallpaper row.
        match verdict("https://wallpapercave.com/arcane", &concepts) {
            DomainVerdict::Score(score) => assert_eq!(score, RELEVANT_DOMAIN_BONUS),
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn malformed_url_is_neutral() {
        let concepts = concepts::extract("reddit post");
        assert_eq!(verdict("not a url at all", &concepts), DomainVerdict::Score(0.0));
    }
}
