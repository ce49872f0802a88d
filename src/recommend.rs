//! Candidate scoring and education recommendations.
//!
//! Scoring is deterministic and additive: segment overlap is worth 10 per
//! match, interest overlap 5, plus a recency bonus of 5 under 7 days or 2
//! under 30. Candidates with a missing or unparseable `created_at` score
//! as if 100 days old. Equal scores keep the order candidates were
//! supplied in (stable sort) — there is deliberately no secondary key.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::segment::{InteractionRecord, UserProfile, segment};

/// A promotional or educational item eligible for ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub target_segments: Vec<String>,
    /// RFC 3339 timestamp; absent or unparseable values are treated as
    /// 100 days old.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A structured suggestion from the static education rule table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub rec_type: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub tags: Vec<String>,
}

/// The full envelope for a recommendation query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub segments: Vec<String>,
    pub ads: Vec<ScoredCandidate>,
    pub education_recommendations: Vec<Recommendation>,
}

/// Union of desire tags, clicked question ids, and service ids across a
/// user's interaction history.
pub fn extract_interests(history: &[InteractionRecord]) -> BTreeSet<String> {
    let mut interests = BTreeSet::new();
    for record in history {
        interests.extend(record.desires.iter().cloned());
        if let Some(q) = &record.question_clicked {
            interests.insert(q.clone());
        }
        if let Some(s) = &record.service {
            interests.insert(s.clone());
        }
    }
    interests
}

fn recency_bonus(created_at: Option<&str>, now: DateTime<Utc>) -> i64 {
    let days_old = created_at
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|created| (now - created.with_timezone(&Utc)).num_days())
        .unwrap_or(100);

    if days_old < 7 {
        5
    } else if days_old < 30 {
        2
    } else {
        0
    }
}

fn score_one(
    candidate: &Candidate,
    segments: &BTreeSet<String>,
    interests: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> i64 {
    let segment_matches = candidate
        .target_segments
        .iter()
        .filter(|s| segments.contains(*s))
        .count() as i64;
    let interest_matches = candidate
        .tags
        .iter()
        .filter(|t| interests.contains(*t))
        .count() as i64;

    10 * segment_matches
        + 5 * interest_matches
        + recency_bonus(candidate.created_at.as_deref(), now)
}

/// Rank active candidates against a user's segments and interests.
///
/// Descending by score; equal scores preserve the supplied order.
pub fn score_candidates(
    candidates: &[Candidate],
    segments: &BTreeSet<String>,
    interests: &BTreeSet<String>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .filter(|c| c.active)
        .map(|c| ScoredCandidate {
            candidate: c.clone(),
            score: score_one(c, segments, interests, now),
        })
        .collect();

    // sort_by is stable, which is what keeps the tie-break by input order.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    scored
}

fn recommendation(
    rec_type: &str,
    title: &str,
    message: &str,
    priority: Priority,
    tags: &[&str],
) -> Recommendation {
    Recommendation {
        rec_type: rec_type.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        priority,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Evaluate the static education rule table against a profile.
pub fn education_recommendations(profile: &UserProfile) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let is_government = profile
        .job_title
        .as_deref()
        .is_some_and(|j| j.to_lowercase().contains("government"));
    let sub_degree = profile
        .education
        .is_some_and(|e| e.is_sub_degree_qualification());
    let mid_career = profile.age.is_some_and(|a| (25..=50).contains(&a));

    if sub_degree && is_government && mid_career {
        recommendations.push(recommendation(
            "education",
            "Complete Your Degree",
            "Enhance your career with a recognized degree program",
            Priority::High,
            &["degree", "government", "career_advancement"],
        ));
    }

    for (i, &age) in profile.children_ages.iter().enumerate() {
        let record = profile
            .children_education
            .get(i)
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if (15..=18).contains(&age) && !record.contains("ol") {
            recommendations.push(recommendation(
                "child_education",
                "O/L Exam Preparation",
                "Special courses for your child's O/L exams",
                Priority::Medium,
                &["ol_exams", "tuition", "secondary_education"],
            ));
        }

        if (17..=20).contains(&age) && !record.contains("al") {
            recommendations.push(recommendation(
                "child_education",
                "A/L Stream Selection Guidance",
                "Expert guidance for A/L subject selection",
                Priority::Medium,
                &["al_exams", "career_guidance", "higher_education"],
            ));
        }
    }

    recommendations
}

/// Assemble the full recommendation envelope for one user.
///
/// A missing profile yields `segments = {"unknown"}` and empty lists — an
/// unknown user is an empty result, not an error.
pub fn respond(
    profile: Option<&UserProfile>,
    history: &[InteractionRecord],
    candidates: &[Candidate],
    now: DateTime<Utc>,
    limit: usize,
) -> RecommendationResponse {
    let segments = segment(profile, history);

    let Some(profile) = profile else {
        return RecommendationResponse {
            segments: segments.into_iter().collect(),
            ads: Vec::new(),
            education_recommendations: Vec::new(),
        };
    };

    let interests = extract_interests(history);
    let ads = score_candidates(candidates, &segments, &interests, now, limit);
    let education = education_recommendations(profile);

    RecommendationResponse {
        segments: segments.into_iter().collect(),
        ads,
        education_recommendations: education,
    }
}
