//! Positional CSV parsing for the static fallback assets.
//!
//! Lines are split on literal commas with no quoting support, so a field that
//! itself contains a comma shifts every later column. Asset files are written
//! against that contract. Malformed or missing columns fall back to typed
//! defaults (0 for numbers, empty for strings) and parsing never fails.

use crate::records::{
    AllotmentRecord, ClosingRankRecord, CollegeRecord, FeeStipendBondRecord, SeatMatrixRecord,
};

/// A single split line of an asset file.
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    values: &'a [&'a str],
}

impl<'a> Row<'a> {
    pub fn text(&self, idx: usize) -> String {
        self.values
            .get(idx)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    pub fn int(&self, idx: usize) -> u32 {
        self.values
            .get(idx)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0)
    }

    pub fn long(&self, idx: usize) -> u64 {
        self.values
            .get(idx)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0)
    }

    pub fn float(&self, idx: usize) -> f64 {
        self.values
            .get(idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

/// Column layout of one record type inside a fallback asset.
pub trait FromCsvRow: Sized {
    fn from_row(row: Row<'_>) -> Self;
}

/// Parses `text` into records, discarding the header line.
pub fn parse_rows<T: FromCsvRow>(text: &str) -> Vec<T> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('\n')
        .skip(1)
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let values: Vec<&str> = line.split(',').collect();
            T::from_row(Row { values: &values })
        })
        .collect()
}

impl FromCsvRow for AllotmentRecord {
    fn from_row(row: Row<'_>) -> Self {
        Self {
            round: row.int(0),
            state_rank: row.int(1),
            state: row.text(2),
            institute: row.text(3),
            course: row.text(4),
            quota: row.text(5),
            category: row.text(6),
            fee: row.text(7),
            stipend_year_1: row.text(8),
            bond_years: row.int(9),
            bond_penalty: row.text(10),
            beds: row.int(11),
        }
    }
}

impl FromCsvRow for ClosingRankRecord {
    fn from_row(row: Row<'_>) -> Self {
        Self {
            quota: row.text(0),
            category: row.text(1),
            state: row.text(2),
            institute: row.text(3),
            course: row.text(4),
            fee: row.text(5),
            stipend_year_1: row.text(6),
            bond_years: row.int(7),
            bond_penalty: row.text(8),
            beds: row.int(9),
            cr_2023_1: row.int(10),
            cr_2023_2: row.int(11),
            cr_2023_3: row.int(12),
            cr_2023_4: row.int(13),
            cr_2023_5: row.int(14),
            cr_2024_1: row.int(15),
            cr_2024_2: row.int(16),
            cr_2024_3: row.int(17),
            cr_2024_4: row.int(18),
            cr_2024_5: row.int(19),
        }
    }
}

impl FromCsvRow for SeatMatrixRecord {
    fn from_row(row: Row<'_>) -> Self {
        Self {
            state: row.text(0),
            institute: row.text(1),
            course: row.text(2),
            quota: row.text(3),
            total_seats: row.int(4),
            general: row.int(5),
            obc: row.int(6),
            sc: row.int(7),
            st: row.int(8),
            ews: row.int(9),
            pwd: row.int(10),
        }
    }
}

impl FromCsvRow for FeeStipendBondRecord {
    fn from_row(row: Row<'_>) -> Self {
        Self {
            state: row.text(0),
            institute: row.text(1),
            course: row.text(2),
            quota: row.text(3),
            fee: row.text(4),
            stipend_year_1: row.text(5),
            bond_years: row.int(6),
            bond_penalty: row.text(7),
            beds: row.int(8),
        }
    }
}

impl FromCsvRow for CollegeRecord {
    fn from_row(row: Row<'_>) -> Self {
        Self {
            nirf_rank: row.int(0),
            name: row.text(1),
            city: row.text(2),
            state: row.text(3),
            nirf_score: row.float(4),
            tuition_per_year: row.long(5),
            mbbs_seats: row.int(6),
            cutoff: row.text(7),
            established: row.int(8),
            college_type: row.text(9),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOTMENTS: &str = "Round,State_Rank,State,Institute,Course,Quota,Category,Fee,Stipend_Year_1,Bond_Years,Bond_Penalty,Beds\n\
1,12897,Delhi,Hindu Rao Hospital,DNBGENERAL MEDICINE,DNB Sponsored,GEN,₹1.25L,₹1.21L*,0,₹0,980\n\
2,44,Goa,GMC Goa,MD Medicine,State,OBC,₹80K,₹60K,2,₹10L,650\n";

    #[test]
    fn header_is_discarded_and_columns_are_positional() {
        let rows: Vec<AllotmentRecord> = parse_rows(ALLOTMENTS);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state_rank, 12897);
        assert_eq!(rows[0].institute, "Hindu Rao Hospital");
        assert_eq!(rows[0].beds, 980);
        assert_eq!(rows[1].round, 2);
        assert_eq!(rows[1].bond_years, 2);
        assert!(rows[0].stipend_has_footnote());
    }

    #[test]
    fn header_only_yields_no_records() {
        let rows: Vec<CollegeRecord> = parse_rows("NIRF_Rank_2024,College_Name\n");
        assert!(rows.is_empty());
        let rows: Vec<CollegeRecord> = parse_rows("");
        assert!(rows.is_empty());
    }

    #[test]
    fn malformed_columns_fall_back_to_typed_defaults() {
        let text = "h\nabc,Name Only\n";
        let rows: Vec<CollegeRecord> = parse_rows(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nirf_rank, 0);
        assert_eq!(rows[0].name, "Name Only");
        assert_eq!(rows[0].city, "");
        assert_eq!(rows[0].nirf_score, 0.0);
        assert_eq!(rows[0].tuition_per_year, 0);
    }

    #[test]
    fn embedded_commas_shift_later_columns() {
        let text = "h\nDelhi,Hindu Rao Hospital, Delhi,MD,AIQ,₹1L,₹90K,1,₹5L,300\n";
        let rows: Vec<FeeStipendBondRecord> = parse_rows(text);
        assert_eq!(rows[0].institute, "Hindu Rao Hospital");
        assert_eq!(rows[0].course, " Delhi");
        assert_eq!(rows[0].bond_years, 0);
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let text = "h\r\nDelhi,AIIMS,MBBS,AIQ,100,50,20,15,7,10,3\r\n";
        let rows: Vec<SeatMatrixRecord> = parse_rows(text);
        assert_eq!(rows[0].pwd, 3);
        assert_eq!(rows[0].total_seats, 100);
    }

    #[test]
    fn parsing_is_idempotent() {
        let a: Vec<AllotmentRecord> = parse_rows(ALLOTMENTS);
        let b: Vec<AllotmentRecord> = parse_rows(ALLOTMENTS);
        assert_eq!(a, b);
    }

    #[test]
    fn closing_ranks_read_twenty_columns() {
        let mut line = String::from("AIQ,GEN,Delhi,AIIMS,MD,₹1K,₹1L,0,₹0,100");
        for i in 1..=10 {
            line.push_str(&format!(",{}", i * 100));
        }
        let text = format!("header\n{line}");
        let rows: Vec<ClosingRankRecord> = parse_rows(&text);
        assert_eq!(rows[0].cr_2023_1, 100);
        assert_eq!(rows[0].cr_2024_5, 1000);
        assert_eq!(rows[0].ranks_2024().last_closed(), Some((5, 1000)));
    }
}
