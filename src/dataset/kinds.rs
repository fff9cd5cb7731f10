use futures::future::BoxFuture;

use super::{Dataset, Selection};
use crate::api::{ApiClient, ApiError, ApiResponse, Filters};
use crate::records::{
    AllotmentRecord, ClosingRankRecord, CollegeRecord, ExamLevel, FeeStipendBondRecord, Ownership,
    SeatMatrixRecord,
};

const FEE_ASSET: &str = "Fee, Stipend and Bond UG Medical  - All India UG (Medical & Dental).csv";

pub struct Allotments;

impl Dataset for Allotments {
    type Record = AllotmentRecord;

    const NAME: &'static str = "allotments";

    fn fetch<'a>(
        api: &'a ApiClient,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<ApiResponse<Vec<AllotmentRecord>>, ApiError>> {
        Box::pin(async move { api.allotments(selection.level, &selection.filters()).await })
    }

    fn fallback_asset(level: ExamLevel) -> Option<&'static str> {
        Some(match level {
            ExamLevel::Ug => "Neet_UG_Allotment_data_all-open_seats.csv",
            ExamLevel::Pg => "INICET_PG.csv",
        })
    }

    fn sample() -> Vec<AllotmentRecord> {
        vec![AllotmentRecord {
            round: 1,
            state_rank: 12897,
            state: "Delhi".into(),
            institute: "Hindu Rao Hospital, Delhi".into(),
            course: "DNBGENERAL MEDICINE".into(),
            quota: "DNB Sponsored".into(),
            category: "GEN".into(),
            fee: "₹1,25,000".into(),
            stipend_year_1: "₹1,21,389*".into(),
            bond_years: 0,
            bond_penalty: "₹0".into(),
            beds: 980,
        }]
    }

    fn search_fields(record: &AllotmentRecord) -> Vec<&str> {
        vec![
            record.institute.as_str(),
            record.course.as_str(),
            record.state.as_str(),
            record.quota.as_str(),
            record.category.as_str(),
        ]
    }

    fn rank_key(record: &AllotmentRecord) -> Option<u64> {
        Some(record.state_rank.into())
    }

    fn state(record: &AllotmentRecord) -> &str {
        &record.state
    }

    fn choice_key(record: &AllotmentRecord) -> String {
        record.institute.clone()
    }
}

pub struct ClosingRanks;

impl Dataset for ClosingRanks {
    type Record = ClosingRankRecord;

    const NAME: &'static str = "closing-ranks";

    fn fetch<'a>(
        api: &'a ApiClient,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<ApiResponse<Vec<ClosingRankRecord>>, ApiError>> {
        Box::pin(async move { api.closing_ranks(selection.level, &selection.filters()).await })
    }

    fn fallback_asset(level: ExamLevel) -> Option<&'static str> {
        Some(match level {
            ExamLevel::Ug => "closing_ranks_ug.csv",
            ExamLevel::Pg => "closing_ranks_pg.csv",
        })
    }

    fn sample() -> Vec<ClosingRankRecord> {
        vec![ClosingRankRecord {
            quota: "DNB Sponsored".into(),
            category: "GEN".into(),
            state: "Delhi".into(),
            institute: "Hindu Rao Hospital, Delhi".into(),
            course: "DNBGENERAL MEDICINE".into(),
            fee: "₹1,25,000".into(),
            stipend_year_1: "₹1,21,389*".into(),
            bond_years: 0,
            bond_penalty: "₹0".into(),
            beds: 980,
            cr_2023_1: 12897,
            cr_2023_2: 13410,
            cr_2024_1: 12650,
            ..Default::default()
        }]
    }

    fn search_fields(record: &ClosingRankRecord) -> Vec<&str> {
        vec![
            record.institute.as_str(),
            record.course.as_str(),
            record.state.as_str(),
            record.quota.as_str(),
            record.category.as_str(),
        ]
    }

    /// Latest round with a recorded closing rank, preferring the newer year.
    fn rank_key(record: &ClosingRankRecord) -> Option<u64> {
        record
            .ranks_2024()
            .last_closed()
            .or_else(|| record.ranks_2023().last_closed())
            .map(|(_, rank)| u64::from(rank))
    }

    fn state(record: &ClosingRankRecord) -> &str {
        &record.state
    }

    fn choice_key(record: &ClosingRankRecord) -> String {
        record.institute.clone()
    }
}

pub struct SeatMatrix;

impl Dataset for SeatMatrix {
    type Record = SeatMatrixRecord;

    const NAME: &'static str = "seat-matrix";

    fn fetch<'a>(
        api: &'a ApiClient,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<ApiResponse<Vec<SeatMatrixRecord>>, ApiError>> {
        Box::pin(async move { api.seat_matrix(selection.level, &selection.filters()).await })
    }

    fn fallback_asset(level: ExamLevel) -> Option<&'static str> {
        Some(match level {
            ExamLevel::Ug => "seat_matrix_ug.csv",
            ExamLevel::Pg => "seat_matrix_pg.csv",
        })
    }

    fn sample() -> Vec<SeatMatrixRecord> {
        vec![SeatMatrixRecord {
            state: "Delhi".into(),
            institute: "Hindu Rao Hospital, Delhi".into(),
            course: "DNBGENERAL MEDICINE".into(),
            quota: "DNB Sponsored".into(),
            total_seats: 4,
            general: 2,
            obc: 1,
            sc: 1,
            st: 0,
            ews: 0,
            pwd: 0,
        }]
    }

    fn search_fields(record: &SeatMatrixRecord) -> Vec<&str> {
        vec![
            record.institute.as_str(),
            record.course.as_str(),
            record.state.as_str(),
            record.quota.as_str(),
        ]
    }

    fn rank_key(record: &SeatMatrixRecord) -> Option<u64> {
        Some(record.total_seats.into())
    }

    fn state(record: &SeatMatrixRecord) -> &str {
        &record.state
    }

    fn choice_key(record: &SeatMatrixRecord) -> String {
        record.institute.clone()
    }
}

pub struct FeeStipendBond;

impl Dataset for FeeStipendBond {
    type Record = FeeStipendBondRecord;

    const NAME: &'static str = "fees";

    fn fetch<'a>(
        api: &'a ApiClient,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<ApiResponse<Vec<FeeStipendBondRecord>>, ApiError>> {
        Box::pin(async move { api.fee_data(selection.level, &selection.filters()).await })
    }

    // Only a UG sheet is published; PG views reuse it.
    fn fallback_asset(_level: ExamLevel) -> Option<&'static str> {
        Some(FEE_ASSET)
    }

    fn sample() -> Vec<FeeStipendBondRecord> {
        vec![FeeStipendBondRecord {
            state: "Delhi".into(),
            institute: "Hindu Rao Hospital, Delhi".into(),
            course: "DNBGENERAL MEDICINE".into(),
            quota: "DNB Sponsored".into(),
            fee: "₹1,25,000".into(),
            stipend_year_1: "₹1,21,389*".into(),
            bond_years: 0,
            bond_penalty: "₹0".into(),
            beds: 980,
        }]
    }

    fn search_fields(record: &FeeStipendBondRecord) -> Vec<&str> {
        vec![
            record.institute.as_str(),
            record.course.as_str(),
            record.state.as_str(),
            record.quota.as_str(),
        ]
    }

    fn rank_key(record: &FeeStipendBondRecord) -> Option<u64> {
        Some(record.bond_years.into())
    }

    fn state(record: &FeeStipendBondRecord) -> &str {
        &record.state
    }

    fn choice_key(record: &FeeStipendBondRecord) -> String {
        record.institute.clone()
    }
}

/// NIRF college directory. Not scoped by counselling authority.
pub struct Colleges;

impl Dataset for Colleges {
    type Record = CollegeRecord;

    const NAME: &'static str = "colleges";

    fn fetch<'a>(
        api: &'a ApiClient,
        _selection: &'a Selection,
    ) -> BoxFuture<'a, Result<ApiResponse<Vec<CollegeRecord>>, ApiError>> {
        Box::pin(async move { api.colleges(&Filters::new()).await })
    }

    fn fallback_asset(_level: ExamLevel) -> Option<&'static str> {
        Some("TOP_50_NIRF.csv")
    }

    fn sample() -> Vec<CollegeRecord> {
        vec![
            CollegeRecord {
                nirf_rank: 1,
                name: "All India Institute of Medical Sciences".into(),
                city: "New Delhi".into(),
                state: "Delhi".into(),
                nirf_score: 94.32,
                tuition_per_year: 1628,
                mbbs_seats: 132,
                cutoff: "47".into(),
                established: 1956,
                college_type: "Government".into(),
            },
            CollegeRecord {
                nirf_rank: 3,
                name: "Christian Medical College".into(),
                city: "Vellore".into(),
                state: "Tamil Nadu".into(),
                nirf_score: 75.29,
                tuition_per_year: 52_000,
                mbbs_seats: 100,
                cutoff: "NA".into(),
                established: 1900,
                college_type: "Private".into(),
            },
        ]
    }

    fn search_fields(record: &CollegeRecord) -> Vec<&str> {
        vec![record.name.as_str(), record.city.as_str(), record.state.as_str()]
    }

    fn rank_key(record: &CollegeRecord) -> Option<u64> {
        Some(record.nirf_rank.into())
    }

    fn state(record: &CollegeRecord) -> &str {
        &record.state
    }

    fn ownership(record: &CollegeRecord) -> Option<Ownership> {
        Some(record.ownership())
    }

    fn choice_key(record: &CollegeRecord) -> String {
        record.nirf_rank.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::assets::AssetSource;
    use crate::dataset::{DatasetView, LoadState, RecordOrigin, RemoteSource};
    use crate::session::Session;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn source(url: &str, assets: AssetSource) -> RemoteSource {
        let api = ApiClient::new(url, Duration::from_secs(5), Session::in_memory()).unwrap();
        RemoteSource::new(api, assets)
    }

    #[test]
    fn every_sample_is_non_empty() {
        assert!(!Allotments::sample().is_empty());
        assert!(!ClosingRanks::sample().is_empty());
        assert!(!SeatMatrix::sample().is_empty());
        assert!(!FeeStipendBond::sample().is_empty());
        assert!(!Colleges::sample().is_empty());
    }

    #[test]
    fn fee_asset_is_shared_across_levels() {
        assert_eq!(
            FeeStipendBond::fallback_asset(ExamLevel::Ug),
            FeeStipendBond::fallback_asset(ExamLevel::Pg)
        );
    }

    #[test]
    fn closing_rank_key_prefers_latest_round() {
        let record = ClosingRankRecord {
            cr_2023_1: 900,
            cr_2024_1: 500,
            cr_2024_2: 650,
            ..Default::default()
        };
        assert_eq!(ClosingRanks::rank_key(&record), Some(650));
        assert_eq!(ClosingRanks::rank_key(&ClosingRankRecord::default()), None);
    }

    #[test]
    fn unranked_closing_rows_trail_descending_sort() {
        let mut view: DatasetView<ClosingRanks> = DatasetView::default();
        let ticket = view.begin_load();
        view.complete(
            ticket,
            crate::dataset::Loaded {
                records: vec![
                    ClosingRankRecord {
                        institute: "Unranked".into(),
                        ..Default::default()
                    },
                    ClosingRankRecord {
                        institute: "Ranked".into(),
                        cr_2024_1: 500,
                        ..Default::default()
                    },
                ],
                origin: RecordOrigin::Remote,
            },
        );
        view.set_sort(Some(crate::dataset::SortOrder::Desc));
        let order: Vec<_> = view.filtered().iter().map(|r| r.institute.as_str()).collect();
        assert_eq!(order, vec!["Ranked", "Unranked"]);
    }

    #[tokio::test]
    async fn hindu_rao_sample_when_api_and_asset_fail() {
        let mut server = Server::new_async().await;
        let _api = server
            .mock("GET", "/allotments/ug/")
            .match_query(Matcher::UrlEncoded(
                "counselling".into(),
                "Maharashtra - UG Medical".into(),
            ))
            .with_status(500)
            .create_async()
            .await;
        let empty = tempfile::tempdir().unwrap();

        let src = source(&server.url(), AssetSource::dir(empty.path()));
        let mut view: DatasetView<Allotments> = DatasetView::default();
        view.select_level(ExamLevel::Ug);
        view.select_counselling("Maharashtra - UG Medical");
        view.load(&src).await.unwrap();

        assert_eq!(view.state(), LoadState::Ready);
        assert_eq!(view.origin(), Some(RecordOrigin::Sample));
        let rows = view.records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state_rank, 12897);
        assert_eq!(rows[0].institute, "Hindu Rao Hospital, Delhi");
        assert_eq!(rows[0].beds, 980);
    }

    #[tokio::test]
    async fn colleges_are_fetched_from_the_directory_endpoint() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/colleges/")
            .with_body(r#"{"success":true,"data":[{"NIRF_Rank_2024":7,"College_Name":"KGMU","State":"Uttar Pradesh","College_Type":"Government"}]}"#)
            .create_async()
            .await;

        let src = source(&server.url(), AssetSource::dir("/nonexistent"));
        let mut view: DatasetView<Colleges> = DatasetView::default();
        view.load(&src).await.unwrap();
        m.assert_async().await;
        assert_eq!(view.origin(), Some(RecordOrigin::Remote));
        assert_eq!(view.records()[0].name, "KGMU");
        assert_eq!(Colleges::ownership(&view.records()[0]), Some(Ownership::Government));
    }

    #[tokio::test]
    async fn fee_fallback_reads_the_shared_sheet() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/fee-stipend-bond/pg/")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FEE_ASSET),
            "State,Institute,Course,Quota,Fee,Stipend,Bond,Penalty,Beds\r\nKerala,GMC Kozhikode,MBBS,AIQ,₹25000,₹0,1,₹10L,600\r\n",
        )
        .unwrap();

        let src = source(&server.url(), AssetSource::dir(dir.path()));
        let mut view: DatasetView<FeeStipendBond> = DatasetView::default();
        view.load(&src).await.unwrap();
        assert_eq!(view.origin(), Some(RecordOrigin::Fallback));
        assert_eq!(view.records()[0].beds, 600);
    }
}
