//! Shared lookup of counselling authorities and quota labels.
//!
//! Both the dataset views and the choice-list dialog resolve counselling
//! labels through this table.

use serde::Serialize;

use crate::records::ExamLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Counselling {
    pub label: &'static str,
    pub level: ExamLevel,
}

pub const DEFAULT_COUNSELLING: &str =
    "DNB Sponsored - PG Medical (Govt or PSU Inservice Candidates)";
pub const DEFAULT_EXAM_LEVEL: ExamLevel = ExamLevel::Pg;

const COUNSELLINGS: &[Counselling] = &[
    pg(DEFAULT_COUNSELLING),
    pg("Goa - PG Medical"),
    pg("Gujarat - PG Medical"),
    pg("Haryana - PG Medical"),
    pg("Himachal Pradesh - PG Medical"),
    pg("Jammu and Kashmir - PG Medical"),
    pg("Jharkhand - PG Medical"),
    pg("Karnataka - PG Medical"),
    pg("Kerala - PG Medical"),
    pg("Madhya Pradesh - PG Medical"),
    pg("Maharashtra - PG Medical"),
    pg("Manipur-JNIMS - PG Medical"),
    pg("Manipur-RIMS - PG Medical"),
    pg("Chandigarh - PG Medical"),
    pg("Chhattisgarh - PG Medical"),
    pg("CPS - PG Medical"),
    pg("Delhi - PG Medical"),
    pg("DNB - Inservice Seats - PG Medical"),
    pg("DNB - PDCET - PG Medical"),
    ug("All India Counselling - UG Medical"),
    ug("Maharashtra - UG Medical"),
    ug("Karnataka - UG Medical"),
    ug("Tamil Nadu - UG Medical"),
];

const fn pg(label: &'static str) -> Counselling {
    Counselling {
        label,
        level: ExamLevel::Pg,
    }
}

const fn ug(label: &'static str) -> Counselling {
    Counselling {
        label,
        level: ExamLevel::Ug,
    }
}

const UG_QUOTAS: &[&str] = &[
    "CW of Armed Forces Personnel",
    "BHU - Open",
    "JIPMER - NRI",
    "All India Quota",
    "Jamia internal",
    "AMU - NRI",
    "Deemed NRI",
    "ESI insured persons",
    "AIIMS - Open",
    "IP Univ - IP Quota (State)",
    "Jamia NRI",
    "Jamia Muslim",
    "Jamia - Open",
    "JIPMER - Open",
    "AMU - Self Financing Open",
    "Deemed Muslim Minority",
    "Delhi Univ - CW",
    "AIIMS - Foreign Nationals",
    "AMU - Internal",
    "AMU - Open",
    "Deemed Jain Minority",
    "Deemed Paid Seats",
    "Delhi Univ - State Quota",
    "IP Univ - CW",
    "Jamia Muslim Women",
    "JIPMER - Pondicherry Domicile",
];

const PG_QUOTAS: &[&str] = &[
    "AIQ",
    "DNB Post MBBS",
    "NBE Diploma",
    "MNG",
    "MM",
    "JM",
    "NRI",
    "DU",
    "IP",
    "BHU",
    "AMU",
    "CIQ",
    "AFMS",
    "AFMS-DNB",
];

pub fn all() -> &'static [Counselling] {
    COUNSELLINGS
}

/// Case-insensitive substring search; an empty query returns everything.
pub fn search(query: &str) -> Vec<&'static Counselling> {
    let needle = query.trim().to_lowercase();
    COUNSELLINGS
        .iter()
        .filter(|c| needle.is_empty() || c.label.to_lowercase().contains(&needle))
        .collect()
}

pub fn find(label: &str) -> Option<&'static Counselling> {
    let wanted = label.trim();
    if wanted.is_empty() {
        return None;
    }
    COUNSELLINGS
        .iter()
        .find(|c| c.label.eq_ignore_ascii_case(wanted))
}

pub fn for_level(level: ExamLevel) -> impl Iterator<Item = &'static Counselling> {
    COUNSELLINGS.iter().filter(move |c| c.level == level)
}

pub fn quotas(level: ExamLevel) -> &'static [&'static str] {
    match level {
        ExamLevel::Ug => UG_QUOTAS,
        ExamLevel::Pg => PG_QUOTAS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_counselling_is_listed() {
        let c = find(DEFAULT_COUNSELLING).unwrap();
        assert_eq!(c.level, DEFAULT_EXAM_LEVEL);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let hits = search("MAHARASHTRA");
        let labels: Vec<_> = hits.iter().map(|c| c.label).collect();
        assert_eq!(
            labels,
            vec!["Maharashtra - PG Medical", "Maharashtra - UG Medical"]
        );
        assert_eq!(search("").len(), all().len());
        assert!(search("nowhere").is_empty());
    }

    #[test]
    fn both_dialog_enumerations_are_covered() {
        for label in [
            "Chandigarh - PG Medical",
            "All India Counselling - UG Medical",
            "Tamil Nadu - UG Medical",
            "Manipur-RIMS - PG Medical",
        ] {
            assert!(find(label).is_some(), "{label} missing");
        }
        assert!(find("").is_none());
    }

    #[test]
    fn level_filter_and_quotas() {
        assert!(for_level(ExamLevel::Ug).all(|c| c.label.contains("UG")));
        assert!(quotas(ExamLevel::Pg).contains(&"AIQ"));
        assert!(quotas(ExamLevel::Ug).contains(&"All India Quota"));
    }
}
