use std::collections::HashSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::engine::error::Error;

/// Pluggable toxicity scoring function. Implementations may call out to an
/// external classifier; the gate bounds every call with a timeout.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Score in [0,1]; higher is more toxic.
    async fn score(&self, text: &str) -> Result<f32, Error>;
}

/// Terms that mark a message as hostile. Deliberately a coarse list; the
/// scorer is a stand-in for an external classifier, not a product feature.
static FLAGGED_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "idiot", "idiots", "moron", "morons", "stupid", "dumbass", "jackass",
        "loser", "losers", "trash", "garbage", "pathetic", "worthless",
        "shut up", "nobody likes you", "kill yourself", "kys",
        "fuck", "fucking", "fucker", "motherfucker",
        "shit", "shitty", "bullshit",
        "asshole", "assholes",
        "bitch", "bitches",
        "bastard", "bastards",
        "cunt", "dickhead", "prick", "twat", "wanker",
        "whore", "slut",
        "retard", "retarded",
        "die in a fire", "go die",
    ]
    .into_iter()
    .collect()
});

/// Built-in keyword scorer. One hit scores 0.5, each further hit adds 0.25,
/// capped at 1.0, so the default 0.7 threshold needs at least two hits.
#[derive(Default)]
pub struct KeywordScorer;

impl KeywordScorer {
    pub fn new() -> Self {
        Self
    }

    fn hits(text: &str) -> u32 {
        let lower = text.to_lowercase();
        // Undo common leetspeak substitutions used to evade the filter
        let normalized: String = lower
            .chars()
            .map(|c| match c {
                '0' => 'o',
                '1' | '!' => 'i',
                '3' => 'e',
                '4' | '@' => 'a',
                '5' | '$' => 's',
                '7' => 't',
                other => other,
            })
            .collect();

        let mut hits = 0;
        for term in FLAGGED_TERMS.iter() {
            if lower.contains(term) || normalized.contains(term) {
                hits += 1;
            }
        }
        hits
    }
}

#[async_trait]
impl ToxicityScorer for KeywordScorer {
    async fn score(&self, text: &str) -> Result<f32, Error> {
        let hits = Self::hits(text);
        let score = match hits {
            0 => 0.0,
            n => (0.5 + 0.25 * (n - 1) as f32).min(1.0),
        };
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_text_scores_zero() {
        let scorer = KeywordScorer::new();
        assert_eq!(scorer.score("good game everyone").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn single_hit_scores_below_default_threshold() {
        let scorer = KeywordScorer::new();
        let score = scorer.score("that play was stupid").await.unwrap();
        assert!((score - 0.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn multiple_hits_escalate_and_cap() {
        let scorer = KeywordScorer::new();
        let two = scorer.score("you stupid idiot").await.unwrap();
        assert!((two - 0.75).abs() < f32::EPSILON);

        let many = scorer
            .score("stupid idiot moron loser trash")
            .await
            .unwrap();
        assert_eq!(many, 1.0);
    }

    #[tokio::test]
    async fn leetspeak_evasion_is_normalized() {
        let scorer = KeywordScorer::new();
        let score = scorer.score("you are an 1d1ot and a m0ron").await.unwrap();
        assert!(score >= 0.7);
    }
}
