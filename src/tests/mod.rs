use std::time::Duration;

use mockito::{Matcher, Server};

use crate::api::ApiClient;
use crate::assets::AssetSource;
use crate::catalog;
use crate::choice::ChoiceListManager;
use crate::dataset::{
    Allotments, ClosingRanks, Colleges, DatasetView, FeeStipendBond, LoadState, RemoteSource,
    SeatMatrix, Selection, PAGE_SIZE,
};
use crate::parser::parse_rows;
use crate::records::{AllotmentRecord, CollegeRecord, ExamLevel};
use crate::session::{MemoryTokenStore, Session, SessionStatus};

const ALLOTMENT_CSV: &str = "Round,State_Rank,State,Institute,Course,Quota,Category,Fee,Stipend_Year_1,Bond_Years,Bond_Penalty,Beds
1,101,Kerala,GMC Kozhikode,MD GENERAL MEDICINE,State,GEN,₹25000,₹50000*,1,₹10L,600
2,abc,Goa,GMC Goa,MS ORTHOPAEDICS,AIQ,OBC
";

fn remote(url: &str, assets: AssetSource, session: Session) -> RemoteSource {
    let api = ApiClient::new(url, Duration::from_secs(5), session).unwrap();
    RemoteSource::new(api, assets)
}

#[test]
fn csv_parsing_is_total_and_idempotent() {
    let first: Vec<AllotmentRecord> = parse_rows(ALLOTMENT_CSV);
    let second: Vec<AllotmentRecord> = parse_rows(ALLOTMENT_CSV);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert!(first[0].stipend_has_footnote());
    assert_eq!(first[1].state_rank, 0);
    assert_eq!(first[1].beds, 0);
    assert_eq!(first[1].fee, "");
}

#[test]
fn colleges_csv_keeps_numeric_defaults() {
    let text = "NIRF,Name,City,State,Score,Fees,Seats,Cutoff,Est,Type\n2,PGIMER,Chandigarh,Chandigarh,81.1,x,,NA,1962,Government\n";
    let rows: Vec<CollegeRecord> = parse_rows(text);
    assert_eq!(rows[0].nirf_score, 81.1);
    assert_eq!(rows[0].tuition_per_year, 0);
    assert_eq!(rows[0].mbbs_seats, 0);
}

#[tokio::test]
async fn every_selection_change_ends_ready_with_rows() {
    let mut server = Server::new_async().await;
    let _down = server
        .mock("GET", Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    let empty = tempfile::tempdir().unwrap();
    let source = remote(
        &server.url(),
        AssetSource::dir(empty.path()),
        Session::in_memory(),
    );

    let mut view: DatasetView<Allotments> = DatasetView::default();
    for entry in catalog::all().iter().take(6) {
        view.select(Selection::new(entry.label, entry.level));
        view.load(&source).await.unwrap();
        assert_eq!(view.state(), LoadState::Ready);
        assert!(!view.records().is_empty());
    }

    macro_rules! ready_with_rows {
        ($kind:ty) => {{
            let mut v: DatasetView<$kind> = DatasetView::default();
            v.load(&source).await.unwrap();
            assert!(!v.records().is_empty());
        }};
    }
    ready_with_rows!(ClosingRanks);
    ready_with_rows!(SeatMatrix);
    ready_with_rows!(FeeStipendBond);
    ready_with_rows!(Colleges);
}

#[tokio::test]
async fn dataset_401_expires_session_for_every_subscriber() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/seat-matrix/pg/")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let session = Session::new(Box::new(MemoryTokenStore::with_token("old")));
    let mut watcher = session.subscribe();
    let source = remote(
        &server.url(),
        AssetSource::dir("/nonexistent"),
        session.clone(),
    );

    let mut view: DatasetView<SeatMatrix> = DatasetView::default();
    let err = view.load(&source).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!session.has_token());
    assert!(watcher.has_changed().unwrap());
    assert_eq!(*watcher.borrow_and_update(), SessionStatus::Expired);
    assert_eq!(view.state(), LoadState::Loading);
}

#[tokio::test]
async fn pagination_over_a_loaded_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("header\n");
    for i in 0..237 {
        csv.push_str(&format!("1,{i},Delhi,Institute {i},MBBS,AIQ,GEN,0,0,0,0,100\n"));
    }
    std::fs::write(dir.path().join("INICET_PG.csv"), csv).unwrap();

    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let source = remote(&server.url(), AssetSource::dir(dir.path()), Session::in_memory());

    let mut view: DatasetView<Allotments> = DatasetView::default();
    view.load(&source).await.unwrap();
    assert_eq!(view.records().len(), 237);

    let first = view.current_page();
    assert_eq!(first.total_pages, 5);
    assert_eq!(first.items.len(), PAGE_SIZE);

    view.set_page(5);
    let last = view.current_page();
    assert_eq!(last.items.len(), 237 % PAGE_SIZE);
    assert_eq!(last.first, 201);
    assert_eq!(last.last, 237);

    view.set_search("Institute 23");
    assert_eq!(view.page_number(), 1);
    // "Institute 23" and "Institute 230".."Institute 236"
    assert_eq!(view.filtered().len(), 8);
}

#[tokio::test]
async fn add_to_choice_list_from_a_dataset_row() {
    let mut server = Server::new_async().await;
    let _lists = server
        .mock("GET", "/choice-lists/")
        .with_body(r#"{"success":true,"data":[{"id":5,"name":"Kerala","count":0,"priority":"high","counselling_type":"Kerala - PG Medical"}]}"#)
        .create_async()
        .await;
    let add = server
        .mock("POST", "/choice-lists/5/colleges/")
        .match_body(Matcher::Json(serde_json::json!({"collegeId": "1"})))
        .with_body(r#"{"success":true,"data":null}"#)
        .create_async()
        .await;

    let session = Session::in_memory();
    let api = ApiClient::new(&server.url(), Duration::from_secs(5), session).unwrap();
    let mut lists = ChoiceListManager::new(api);
    lists.load().await.unwrap();

    let view: DatasetView<Colleges> = DatasetView::new(Selection::new(
        "Kerala - PG Medical",
        ExamLevel::Pg,
    ));
    let college = CollegeRecord {
        nirf_rank: 1,
        name: "AIIMS".into(),
        ..Default::default()
    };
    view.add_to_choice_list(&college, "5", &mut lists)
        .await
        .unwrap();
    add.assert_async().await;
    assert_eq!(lists.require("5").unwrap().count, 1);
}
