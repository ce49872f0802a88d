//! User profiles, interaction records, and the rule-table segmenter.
//!
//! Segmentation is a pure function: profile + history in, a set of
//! categorical tags out. All thresholds are inclusive and every axis is
//! independent, so one profile commonly carries several tags. A missing
//! profile yields exactly `{"unknown"}` — never a partial tag set.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest completed education, lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EducationTier {
    NoSchooling,
    Secondary,
    OrdinaryLevel,
    AdvancedLevel,
    Diploma,
    Degree,
    Masters,
    Doctorate,
}

impl EducationTier {
    /// True for the O/L, A/L, and diploma tiers — qualified but below a
    /// full degree.
    pub fn is_sub_degree_qualification(self) -> bool {
        matches!(
            self,
            EducationTier::OrdinaryLevel
                | EducationTier::AdvancedLevel
                | EducationTier::Diploma
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentFlags {
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub education: Option<EducationTier>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub children_ages: Vec<u32>,
    /// Per-child education records, aligned with `children_ages`.
    #[serde(default)]
    pub children_education: Vec<String>,
    #[serde(default)]
    pub consent: ConsentFlags,
}

/// Optional purchase details attached to an interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub item: String,
    pub amount: f64,
}

/// A single timestamped engagement event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Free-form interest tags supplied by the user.
    #[serde(default)]
    pub desires: Vec<String>,
    #[serde(default)]
    pub question_clicked: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub ad: Option<String>,
    #[serde(default)]
    pub purchase: Option<Purchase>,
}

/// The tag emitted when no profile is available.
pub const UNKNOWN_SEGMENT: &str = "unknown";

/// Derive the segment set for a profile and its interaction history.
///
/// Pure and idempotent; neither input is mutated. `history` is accepted so
/// behavioral axes can join the table without changing the signature; the
/// shipped rules are demographic.
pub fn segment(
    profile: Option<&UserProfile>,
    history: &[InteractionRecord],
) -> BTreeSet<String> {
    let _ = history;

    let Some(profile) = profile else {
        return BTreeSet::from([UNKNOWN_SEGMENT.to_string()]);
    };

    let mut tags = BTreeSet::new();

    if let Some(age) = profile.age {
        let tag = match age {
            0..=24 => "young_adult",
            25..=35 => "early_career",
            36..=45 => "mid_career_family",
            46..=60 => "established_professional",
            _ => "senior",
        };
        tags.insert(tag.to_string());
    }

    if let Some(education) = profile.education {
        let tag = match education {
            EducationTier::NoSchooling
            | EducationTier::Secondary
            | EducationTier::OrdinaryLevel => "needs_qualification",
            EducationTier::AdvancedLevel | EducationTier::Diploma => {
                "mid_education"
            }
            EducationTier::Degree
            | EducationTier::Masters
            | EducationTier::Doctorate => "highly_educated",
        };
        tags.insert(tag.to_string());
    }

    if !profile.children_ages.is_empty() {
        tags.insert("parent".to_string());
        let ages = &profile.children_ages;
        if ages.iter().any(|a| (5..=10).contains(a)) {
            tags.insert("primary_school_parent".to_string());
        }
        if ages.iter().any(|a| (11..=16).contains(a)) {
            tags.insert("secondary_school_parent".to_string());
        }
        if ages.iter().any(|a| (17..=20).contains(a)) {
            tags.insert("university_age_parent".to_string());
        }
    }

    if let Some(job) = &profile.job_title {
        let job = job.to_lowercase();
        if job.contains("government") {
            tags.insert("government_employee".to_string());
        }
        if ["manager", "director", "head"].iter().any(|w| job.contains(w)) {
            tags.insert("management".to_string());
        }
        if job.contains("student") || job.contains("undergraduate") {
            tags.insert("student".to_string());
        }
        if ["teacher", "lecturer", "professor"]
            .iter()
            .any(|w| job.contains(w))
        {
            tags.insert("teacher".to_string());
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(profile: &UserProfile) -> BTreeSet<String> {
        segment(Some(profile), &[])
    }

    fn has(set: &BTreeSet<String>, tag: &str) -> bool {
        set.contains(tag)
    }

    #[test]
    fn missing_profile_is_exactly_unknown() {
        let set = segment(None, &[]);
        assert_eq!(set.len(), 1);
        assert!(has(&set, "unknown"));
    }

    #[test]
    fn age_band_boundaries() {
        for (age, expected) in [
            (24, "young_adult"),
            (25, "early_career"),
            (35, "early_career"),
            (36, "mid_career_family"),
            (45, "mid_career_family"),
            (46, "established_professional"),
            (60, "established_professional"),
            (61, "senior"),
        ] {
            let set = tags(&UserProfile {
                age: Some(age),
                ..Default::default()
            });
            assert!(has(&set, expected), "age {age} should map to {expected}");
        }
    }

    #[test]
    fn education_tiers() {
        for (tier, expected) in [
            (EducationTier::NoSchooling, "needs_qualification"),
            (EducationTier::OrdinaryLevel, "needs_qualification"),
            (EducationTier::AdvancedLevel, "mid_education"),
            (EducationTier::Diploma, "mid_education"),
            (EducationTier::Degree, "highly_educated"),
            (EducationTier::Doctorate, "highly_educated"),
        ] {
            let set = tags(&UserProfile {
                education: Some(tier),
                ..Default::default()
            });
            assert!(has(&set, expected), "{tier:?} should map to {expected}");
        }
    }

    #[test]
    fn family_axes_stack() {
        let set = tags(&UserProfile {
            children_ages: vec![7, 14, 19],
            ..Default::default()
        });
        assert!(has(&set, "parent"));
        assert!(has(&set, "primary_school_parent"));
        assert!(has(&set, "secondary_school_parent"));
        assert!(has(&set, "university_age_parent"));
    }

    #[test]
    fn job_title_matching_is_case_insensitive() {
        let set = tags(&UserProfile {
            job_title: Some("Senior GOVERNMENT Director".into()),
            ..Default::default()
        });
        assert!(has(&set, "government_employee"));
        assert!(has(&set, "management"));
    }

    #[test]
    fn government_clerk_scenario() {
        let set = tags(&UserProfile {
            age: Some(40),
            job_title: Some("Government Clerk".into()),
            children_ages: vec![16],
            ..Default::default()
        });
        assert!(has(&set, "mid_career_family"));
        assert!(has(&set, "government_employee"));
        assert!(has(&set, "secondary_school_parent"));
    }

    #[test]
    fn segmentation_is_idempotent() {
        let profile = UserProfile {
            age: Some(30),
            education: Some(EducationTier::Degree),
            job_title: Some("Lecturer".into()),
            children_ages: vec![6],
            ..Default::default()
        };
        assert_eq!(segment(Some(&profile), &[]), segment(Some(&profile), &[]));
    }

    #[test]
    fn empty_profile_yields_no_tags() {
        // A present-but-empty profile is distinct from a missing one.
        assert!(tags(&UserProfile::default()).is_empty());
    }
}
