use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Undergraduate vs postgraduate admission track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamLevel {
    #[serde(rename = "UG")]
    Ug,
    #[serde(rename = "PG")]
    Pg,
}

impl ExamLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ug" | "neet-ug" | "neet ug" => Some(Self::Ug),
            "pg" | "neet-pg" | "neet pg" => Some(Self::Pg),
            _ => None,
        }
    }

    /// Path segment used by the per-level API routes.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Ug => "ug",
            Self::Pg => "pg",
        }
    }
}

impl fmt::Display for ExamLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ug => f.write_str("UG"),
            Self::Pg => f.write_str("PG"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllotmentRecord {
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "State_Rank")]
    pub state_rank: u32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Institute")]
    pub institute: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Quota")]
    pub quota: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Fee")]
    pub fee: String,
    #[serde(rename = "Stipend_Year_1")]
    pub stipend_year_1: String,
    #[serde(rename = "Bond_Years")]
    pub bond_years: u32,
    #[serde(rename = "Bond_Penalty")]
    pub bond_penalty: String,
    #[serde(rename = "Beds")]
    pub beds: u32,
}

impl AllotmentRecord {
    pub fn stipend_has_footnote(&self) -> bool {
        stipend_has_footnote(&self.stipend_year_1)
    }
}

/// Closing ranks for rounds 1 to 5 of a single admission year.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundRanks(pub [u32; 5]);

impl RoundRanks {
    /// The last round that actually closed (non-zero rank), if any.
    pub fn last_closed(&self) -> Option<(usize, u32)> {
        self.0
            .iter()
            .enumerate()
            .rev()
            .find(|(_, rank)| **rank > 0)
            .map(|(i, rank)| (i + 1, *rank))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosingRankRecord {
    #[serde(rename = "Quota")]
    pub quota: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Institute")]
    pub institute: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Fee")]
    pub fee: String,
    #[serde(rename = "Stipend_Year_1")]
    pub stipend_year_1: String,
    #[serde(rename = "Bond_Years")]
    pub bond_years: u32,
    #[serde(rename = "Bond_Penalty")]
    pub bond_penalty: String,
    #[serde(rename = "Beds")]
    pub beds: u32,
    #[serde(rename = "CR_2023_1")]
    pub cr_2023_1: u32,
    #[serde(rename = "CR_2023_2")]
    pub cr_2023_2: u32,
    #[serde(rename = "CR_2023_3")]
    pub cr_2023_3: u32,
    #[serde(rename = "CR_2023_4")]
    pub cr_2023_4: u32,
    #[serde(rename = "CR_2023_5")]
    pub cr_2023_5: u32,
    #[serde(rename = "CR_2024_1")]
    pub cr_2024_1: u32,
    #[serde(rename = "CR_2024_2")]
    pub cr_2024_2: u32,
    #[serde(rename = "CR_2024_3")]
    pub cr_2024_3: u32,
    #[serde(rename = "CR_2024_4")]
    pub cr_2024_4: u32,
    #[serde(rename = "CR_2024_5")]
    pub cr_2024_5: u32,
}

impl ClosingRankRecord {
    pub fn ranks_2023(&self) -> RoundRanks {
        RoundRanks([
            self.cr_2023_1,
            self.cr_2023_2,
            self.cr_2023_3,
            self.cr_2023_4,
            self.cr_2023_5,
        ])
    }

    pub fn ranks_2024(&self) -> RoundRanks {
        RoundRanks([
            self.cr_2024_1,
            self.cr_2024_2,
            self.cr_2024_3,
            self.cr_2024_4,
            self.cr_2024_5,
        ])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatMatrixRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Institute")]
    pub institute: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Quota")]
    pub quota: String,
    #[serde(rename = "Total_Seats")]
    pub total_seats: u32,
    #[serde(rename = "General")]
    pub general: u32,
    #[serde(rename = "OBC")]
    pub obc: u32,
    #[serde(rename = "SC")]
    pub sc: u32,
    #[serde(rename = "ST")]
    pub st: u32,
    #[serde(rename = "EWS")]
    pub ews: u32,
    #[serde(rename = "PWD")]
    pub pwd: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeStipendBondRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Institute")]
    pub institute: String,
    #[serde(rename = "Course")]
    pub course: String,
    #[serde(rename = "Quota")]
    pub quota: String,
    #[serde(rename = "Fee")]
    pub fee: String,
    #[serde(rename = "Stipend_Year_1")]
    pub stipend_year_1: String,
    #[serde(rename = "Bond_Years")]
    pub bond_years: u32,
    #[serde(rename = "Bond_Penalty")]
    pub bond_penalty: String,
    #[serde(rename = "Beds")]
    pub beds: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Ownership {
    Government,
    Private,
    Unknown,
}

impl Ownership {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "government" | "govt" | "gov" => Some(Self::Government),
            "private" | "pvt" => Some(Self::Private),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollegeRecord {
    #[serde(rename = "NIRF_Rank_2024")]
    pub nirf_rank: u32,
    #[serde(rename = "College_Name")]
    pub name: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "NIRF_Score")]
    pub nirf_score: f64,
    #[serde(rename = "Tuition_Fees_Per_Year")]
    pub tuition_per_year: u64,
    #[serde(rename = "MBBS_Seats")]
    pub mbbs_seats: u32,
    #[serde(rename = "NEET_Cutoff_AIR_General")]
    pub cutoff: String,
    #[serde(rename = "Established")]
    pub established: u32,
    #[serde(rename = "College_Type")]
    pub college_type: String,
}

impl CollegeRecord {
    pub fn ownership(&self) -> Ownership {
        Ownership::parse(&self.college_type).unwrap_or(Ownership::Unknown)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Medium => f.write_str("medium"),
            Self::Low => f.write_str("low"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceList {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub priority: Priority,
    pub counselling_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "neetRank", default, skip_serializing_if = "Option::is_none")]
    pub neet_rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Servers hand out ids both as JSON strings and as integers.
pub(crate) fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

pub fn stipend_has_footnote(stipend: &str) -> bool {
    stipend.trim_end().ends_with('*')
}

/// Renders a rupee amount the way the college directory shows it.
pub fn format_currency(amount: u64) -> String {
    if amount == 0 {
        return "Free".to_string();
    }
    if amount >= 100_000 {
        let lakhs = amount as f64 / 100_000.0;
        return format!("₹{lakhs:.1}L");
    }
    format!("₹{}", group_indian(amount))
}

fn group_indian(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (a, b) = rest.split_at(rest.len() - 2);
        groups.push(b);
        rest = a;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

/// Distinct non-empty values in first-seen order.
pub fn unique_values<'a, T, F>(records: &'a [T], key: F) -> Vec<String>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        let value = key(record);
        if value.is_empty() {
            continue;
        }
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}
