//! Generic dataset view: counselling selection, three-tier loading, search,
//! sorting and pagination over one record type.

pub mod filter;
pub mod kinds;

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{self, ApiClient, ApiError, ApiResponse, Filters};
use crate::assets::{AssetError, AssetSource};
use crate::catalog;
use crate::choice::{ChoiceError, ChoiceListManager};
use crate::parser::{self, FromCsvRow};
use crate::records::{ExamLevel, Ownership};

pub use filter::{Page, SortOrder, PAGE_SIZE};
pub use kinds::{Allotments, ClosingRanks, Colleges, FeeStipendBond, SeatMatrix};

/// Configuration of one dataset: where its rows come from and how they are
/// searched.
pub trait Dataset: Send + Sync + 'static {
    type Record: Clone + Send + Sync + DeserializeOwned + Serialize + FromCsvRow + 'static;

    const NAME: &'static str;

    fn fetch<'a>(
        api: &'a ApiClient,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<ApiResponse<Vec<Self::Record>>, ApiError>>;

    fn fallback_asset(level: ExamLevel) -> Option<&'static str>;

    /// Hardcoded rows shown when both the API and the asset fail. Never empty.
    fn sample() -> Vec<Self::Record>;

    fn search_fields(record: &Self::Record) -> Vec<&str>;

    /// Sort key for rank ordering. `None` sorts after every ranked row.
    fn rank_key(record: &Self::Record) -> Option<u64>;

    fn state(record: &Self::Record) -> &str;

    fn ownership(_record: &Self::Record) -> Option<Ownership> {
        None
    }

    /// Identifier sent when adding a row to a choice list.
    fn choice_key(record: &Self::Record) -> String;
}

/// The (counselling authority, exam level) pair every dataset is scoped to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub counselling: String,
    pub level: ExamLevel,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            counselling: catalog::DEFAULT_COUNSELLING.to_string(),
            level: catalog::DEFAULT_EXAM_LEVEL,
        }
    }
}

impl Selection {
    pub fn new(counselling: &str, level: ExamLevel) -> Self {
        Self {
            counselling: counselling.to_string(),
            level,
        }
    }

    pub fn filters(&self) -> Filters {
        api::filters([("counselling", self.counselling.as_str())])
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.counselling, self.level)
    }
}

/// Extra narrowing on top of free-text search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facets {
    pub state: Option<String>,
    pub ownership: Option<Ownership>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.ownership.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Selecting,
    Loading,
    Ready,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    Remote,
    Fallback,
    Sample,
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("remote"),
            Self::Fallback => f.write_str("fallback asset"),
            Self::Sample => f.write_str("built-in sample"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Loaded<R> {
    pub records: Vec<R>,
    pub origin: RecordOrigin,
}

/// Issued for every load; only the ticket of the latest load may complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    selection: Selection,
}

impl LoadTicket {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

/// Where records are fetched from. Implemented over the API client and the
/// static assets, and by fakes in tests.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_remote<D: Dataset>(&self, selection: &Selection) -> Result<Vec<D::Record>, ApiError>;

    async fn fetch_asset(&self, name: &str) -> Result<String, AssetError>;
}

#[derive(Clone, Debug)]
pub struct RemoteSource {
    api: ApiClient,
    assets: AssetSource,
}

impl RemoteSource {
    pub fn new(api: ApiClient, assets: AssetSource) -> Self {
        Self { api, assets }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl RecordSource for RemoteSource {
    async fn fetch_remote<D: Dataset>(&self, selection: &Selection) -> Result<Vec<D::Record>, ApiError> {
        D::fetch(&self.api, selection).await.map(ApiResponse::into_data)
    }

    async fn fetch_asset(&self, name: &str) -> Result<String, AssetError> {
        self.assets.fetch_text(name).await
    }
}

/// Remote, then CSV asset, then the built-in sample. Only an authorization
/// failure is returned; every other failure is recovered.
pub async fn resolve<D: Dataset, S: RecordSource>(
    source: &S,
    selection: &Selection,
) -> Result<Loaded<D::Record>, ApiError> {
    match source.fetch_remote::<D>(selection).await {
        Ok(records) => {
            debug!(dataset = D::NAME, rows = records.len(), "loaded from api");
            return Ok(Loaded {
                records,
                origin: RecordOrigin::Remote,
            });
        }
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
        Err(e) => warn!(dataset = D::NAME, error = %e, "api fetch failed, trying fallback asset"),
    }

    if let Some(asset) = D::fallback_asset(selection.level) {
        match source.fetch_asset(asset).await {
            Ok(text) => {
                let records: Vec<D::Record> = parser::parse_rows(&text);
                if !records.is_empty() {
                    info!(dataset = D::NAME, asset, rows = records.len(), "loaded fallback asset");
                    return Ok(Loaded {
                        records,
                        origin: RecordOrigin::Fallback,
                    });
                }
                warn!(dataset = D::NAME, asset, "fallback asset has no rows");
            }
            Err(e) => warn!(dataset = D::NAME, error = %e, "fallback asset unavailable"),
        }
    }

    info!(dataset = D::NAME, "using built-in sample rows");
    Ok(Loaded {
        records: D::sample(),
        origin: RecordOrigin::Sample,
    })
}

pub struct DatasetView<D: Dataset> {
    selection: Selection,
    state: LoadState,
    records: Vec<D::Record>,
    origin: Option<RecordOrigin>,
    search: String,
    sort: Option<SortOrder>,
    facets: Facets,
    page: usize,
    generation: u64,
}

impl<D: Dataset> Default for DatasetView<D> {
    fn default() -> Self {
        Self::new(Selection::default())
    }
}

impl<D: Dataset> fmt::Debug for DatasetView<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetView")
            .field("dataset", &D::NAME)
            .field("selection", &self.selection)
            .field("state", &self.state)
            .field("records", &self.records.len())
            .field("page", &self.page)
            .finish()
    }
}

impl<D: Dataset> DatasetView<D> {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            state: LoadState::Selecting,
            records: Vec::new(),
            origin: None,
            search: String::new(),
            sort: None,
            facets: Facets::default(),
            page: 1,
            generation: 0,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn origin(&self) -> Option<RecordOrigin> {
        self.origin
    }

    pub fn records(&self) -> &[D::Record] {
        &self.records
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn page_number(&self) -> usize {
        self.page
    }

    /// Switches the selection, dropping the current rows. The returned ticket
    /// must be completed for the view to become ready.
    pub fn select(&mut self, selection: Selection) -> LoadTicket {
        self.selection = selection;
        self.begin_load()
    }

    pub fn select_counselling(&mut self, counselling: &str) -> LoadTicket {
        let level = self.selection.level;
        self.select(Selection::new(counselling, level))
    }

    pub fn select_level(&mut self, level: ExamLevel) -> LoadTicket {
        let counselling = self.selection.counselling.clone();
        self.select(Selection::new(&counselling, level))
    }

    /// Re-fetches the current selection.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = LoadState::Loading;
        self.records.clear();
        self.origin = None;
        self.page = 1;
        LoadTicket {
            generation: self.generation,
            selection: self.selection.clone(),
        }
    }

    /// Applies a finished load. Returns `false` and leaves the view untouched
    /// when a newer load has been started since `ticket` was issued.
    pub fn complete(&mut self, ticket: LoadTicket, loaded: Loaded<D::Record>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                dataset = D::NAME,
                stale = ticket.generation,
                current = self.generation,
                "discarding stale response"
            );
            return false;
        }
        self.records = loaded.records;
        self.origin = Some(loaded.origin);
        self.state = LoadState::Ready;
        self.page = 1;
        true
    }

    pub async fn load<S: RecordSource>(&mut self, source: &S) -> Result<(), ApiError> {
        let ticket = self.begin_load();
        let loaded = resolve::<D, S>(source, ticket.selection()).await?;
        self.complete(ticket, loaded);
        Ok(())
    }

    pub fn set_search(&mut self, query: &str) {
        if self.search != query {
            self.search = query.to_string();
            self.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: Option<SortOrder>) {
        if self.sort != sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    pub fn set_facets(&mut self, facets: Facets) {
        if self.facets != facets {
            self.facets = facets;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = filter::clamp_page(page, self.filtered().len(), PAGE_SIZE);
    }

    /// Search, facets and sort applied, in display order.
    pub fn filtered(&self) -> Vec<&D::Record> {
        let mut rows = filter::filter_records(&self.records, &self.search, |r| D::search_fields(r));
        if !self.facets.is_empty() {
            rows.retain(|r| self.matches_facets(r));
        }
        if let Some(order) = self.sort {
            filter::sort_by_rank(&mut rows, order, |r| D::rank_key(r));
        }
        rows
    }

    pub fn current_page(&self) -> Page<&D::Record> {
        Page::build(&self.filtered(), self.page, PAGE_SIZE)
    }

    /// Distinct states in the loaded rows, for the state facet.
    pub fn states(&self) -> Vec<String> {
        crate::records::unique_values(&self.records, |r| D::state(r))
    }

    /// Adds `record` to a loaded list. The list must belong to the counselling
    /// authority this view is showing.
    pub async fn add_to_choice_list(
        &self,
        record: &D::Record,
        list_id: &str,
        lists: &mut ChoiceListManager,
    ) -> Result<(), ChoiceError> {
        let list = lists.require(list_id)?;
        if !list
            .counselling_type
            .eq_ignore_ascii_case(&self.selection.counselling)
        {
            return Err(ChoiceError::ScopeMismatch {
                list: list.id.clone(),
                list_counselling: list.counselling_type.clone(),
                counselling: self.selection.counselling.clone(),
            });
        }
        lists.add_item(list_id, &D::choice_key(record)).await
    }

    fn matches_facets(&self, record: &D::Record) -> bool {
        if let Some(state) = self.facets.state.as_deref() {
            if !D::state(record).eq_ignore_ascii_case(state) {
                return false;
            }
        }
        if let Some(ownership) = self.facets.ownership {
            if D::ownership(record) != Some(ownership) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AllotmentRecord, CollegeRecord};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned responses keyed by counselling label.
    #[derive(Default)]
    struct FakeSource {
        remote: HashMap<String, Vec<AllotmentRecord>>,
        unauthorized: bool,
        assets: HashMap<String, String>,
        asset_requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn fetch_remote<D: Dataset>(
            &self,
            selection: &Selection,
        ) -> Result<Vec<D::Record>, ApiError> {
            if self.unauthorized {
                return Err(ApiError::Unauthorized);
            }
            match self.remote.get(&selection.counselling) {
                Some(rows) => {
                    let value = serde_json::to_value(rows).unwrap();
                    Ok(serde_json::from_value(value).unwrap())
                }
                None => Err(ApiError::Status {
                    status: 503,
                    message: "down".into(),
                }),
            }
        }

        async fn fetch_asset(&self, name: &str) -> Result<String, AssetError> {
            self.asset_requests.lock().unwrap().push(name.to_string());
            self.assets
                .get(name)
                .cloned()
                .ok_or_else(|| AssetError::Read {
                    path: name.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }
    }

    fn allotment(rank: u32, institute: &str, state: &str) -> AllotmentRecord {
        AllotmentRecord {
            round: 1,
            state_rank: rank,
            institute: institute.to_string(),
            state: state.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn starts_selecting_then_becomes_ready_from_remote() {
        let mut source = FakeSource::default();
        source.remote.insert(
            catalog::DEFAULT_COUNSELLING.to_string(),
            vec![allotment(1, "AIIMS", "Delhi")],
        );
        let mut view: DatasetView<Allotments> = DatasetView::default();
        assert_eq!(view.state(), LoadState::Selecting);
        view.load(&source).await.unwrap();
        assert_eq!(view.state(), LoadState::Ready);
        assert_eq!(view.origin(), Some(RecordOrigin::Remote));
        assert_eq!(view.records().len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_asset_for_the_selected_level() {
        let mut source = FakeSource::default();
        source.assets.insert(
            "Neet_UG_Allotment_data_all-open_seats.csv".into(),
            "header\n1,77,Kerala,GMC Kozhikode,MBBS,AIQ,GEN,₹25K,₹0,0,₹0,500\n".into(),
        );
        let mut view: DatasetView<Allotments> = DatasetView::default();
        view.select_level(ExamLevel::Ug);
        view.load(&source).await.unwrap();
        assert_eq!(view.origin(), Some(RecordOrigin::Fallback));
        assert_eq!(view.records()[0].institute, "GMC Kozhikode");
        assert_eq!(
            source.asset_requests.lock().unwrap().as_slice(),
            ["Neet_UG_Allotment_data_all-open_seats.csv"]
        );
    }

    #[tokio::test]
    async fn header_only_asset_still_yields_rows() {
        let mut source = FakeSource::default();
        source
            .assets
            .insert("INICET_PG.csv".into(), "Round,State_Rank\n".into());
        let mut view: DatasetView<Allotments> = DatasetView::default();
        view.load(&source).await.unwrap();
        assert_eq!(view.origin(), Some(RecordOrigin::Sample));
        assert!(!view.records().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_is_not_papered_over() {
        let source = FakeSource {
            unauthorized: true,
            ..Default::default()
        };
        let mut view: DatasetView<Allotments> = DatasetView::default();
        let err = view.load(&source).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(source.asset_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_responses_are_discarded() {
        let mut source = FakeSource::default();
        source
            .remote
            .insert("Goa - PG Medical".into(), vec![allotment(1, "GMC Goa", "Goa")]);
        source.remote.insert(
            "Kerala - PG Medical".into(),
            vec![allotment(2, "GMC Kozhikode", "Kerala")],
        );

        let mut view: DatasetView<Allotments> = DatasetView::default();
        let first = view.select_counselling("Goa - PG Medical");
        let second = view.select_counselling("Kerala - PG Medical");

        let late = resolve::<Allotments, _>(&source, first.selection()).await.unwrap();
        let fresh = resolve::<Allotments, _>(&source, second.selection()).await.unwrap();

        assert!(view.complete(second, fresh));
        assert!(!view.complete(first, late));
        assert_eq!(view.records()[0].institute, "GMC Kozhikode");
        assert_eq!(view.selection().counselling, "Kerala - PG Medical");
    }

    #[tokio::test]
    async fn page_resets_on_search_and_selection_change() {
        let mut source = FakeSource::default();
        let rows: Vec<_> = (0..120)
            .map(|i| allotment(i, &format!("Institute {i}"), "Delhi"))
            .collect();
        source
            .remote
            .insert(catalog::DEFAULT_COUNSELLING.to_string(), rows.clone());
        source.remote.insert("Goa - PG Medical".into(), rows);

        let mut view: DatasetView<Allotments> = DatasetView::default();
        view.load(&source).await.unwrap();
        view.set_page(3);
        assert_eq!(view.page_number(), 3);
        assert_eq!(view.current_page().items.len(), 20);

        view.set_search("institute 1");
        assert_eq!(view.page_number(), 1);

        view.set_page(2);
        let ticket = view.select_counselling("Goa - PG Medical");
        assert_eq!(view.page_number(), 1);
        let loaded = resolve::<Allotments, _>(&source, ticket.selection())
            .await
            .unwrap();
        view.complete(ticket, loaded);
        assert_eq!(view.page_number(), 1);
    }

    #[tokio::test]
    async fn out_of_range_pages_clamp() {
        let mut source = FakeSource::default();
        source.remote.insert(
            catalog::DEFAULT_COUNSELLING.to_string(),
            vec![allotment(1, "A", "Delhi"), allotment(2, "B", "Goa")],
        );
        let mut view: DatasetView<Allotments> = DatasetView::default();
        view.load(&source).await.unwrap();
        view.set_page(99);
        assert_eq!(view.page_number(), 1);
        view.set_page(0);
        assert_eq!(view.page_number(), 1);
    }

    #[tokio::test]
    async fn sort_and_state_facet_narrow_the_view() {
        let mut source = FakeSource::default();
        source.remote.insert(
            catalog::DEFAULT_COUNSELLING.to_string(),
            vec![
                allotment(30, "C", "Delhi"),
                allotment(10, "A", "Goa"),
                allotment(20, "B", "delhi"),
            ],
        );
        let mut view: DatasetView<Allotments> = DatasetView::default();
        view.load(&source).await.unwrap();
        view.set_sort(Some(SortOrder::Asc));
        let ranks: Vec<_> = view.filtered().iter().map(|r| r.state_rank).collect();
        assert_eq!(ranks, vec![10, 20, 30]);

        view.set_facets(Facets {
            state: Some("Delhi".into()),
            ownership: None,
        });
        let ranks: Vec<_> = view.filtered().iter().map(|r| r.state_rank).collect();
        assert_eq!(ranks, vec![20, 30]);
        assert_eq!(view.states(), vec!["Delhi", "Goa", "delhi"]);
    }

    fn lists_manager(url: &str) -> ChoiceListManager {
        let api = ApiClient::new(
            url,
            std::time::Duration::from_secs(5),
            crate::session::Session::in_memory(),
        )
        .unwrap();
        ChoiceListManager::new(api)
    }

    #[tokio::test]
    async fn choice_list_of_another_counselling_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _lists = server
            .mock("GET", "/choice-lists/")
            .with_body(r#"[{"id":9,"name":"Mumbai","count":0,"counselling_type":"Maharashtra - UG Medical"}]"#)
            .create_async()
            .await;
        let add = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut lists = lists_manager(&server.url());
        lists.load().await.unwrap();
        let view: DatasetView<Allotments> =
            DatasetView::new(Selection::new("Goa - PG Medical", ExamLevel::Pg));
        let err = view
            .add_to_choice_list(&allotment(1, "GMC Goa", "Goa"), "9", &mut lists)
            .await
            .unwrap_err();
        assert!(matches!(err, ChoiceError::ScopeMismatch { .. }));
        add.assert_async().await;
        assert_eq!(lists.require("9").unwrap().count, 0);
    }

    #[tokio::test]
    async fn choice_list_must_be_loaded_before_adding() {
        let mut server = mockito::Server::new_async().await;
        let _lists = server
            .mock("GET", "/choice-lists/")
            .with_body(r#"[{"id":9,"name":"Goa","count":0,"counselling_type":"Goa - PG Medical"}]"#)
            .create_async()
            .await;
        let add = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut lists = lists_manager(&server.url());
        lists.load().await.unwrap();
        let view: DatasetView<Allotments> =
            DatasetView::new(Selection::new("Goa - PG Medical", ExamLevel::Pg));
        let err = view
            .add_to_choice_list(&allotment(1, "GMC Goa", "Goa"), "404", &mut lists)
            .await
            .unwrap_err();
        assert!(matches!(err, ChoiceError::UnknownList(id) if id == "404"));
        add.assert_async().await;
    }

    #[test]
    fn ownership_facet_applies_to_colleges() {
        let mut view: DatasetView<Colleges> = DatasetView::default();
        let ticket = view.begin_load();
        view.complete(
            ticket,
            Loaded {
                records: vec![
                    CollegeRecord {
                        name: "AIIMS".into(),
                        college_type: "Government".into(),
                        ..Default::default()
                    },
                    CollegeRecord {
                        name: "CMC".into(),
                        college_type: "Private".into(),
                        ..Default::default()
                    },
                ],
                origin: RecordOrigin::Remote,
            },
        );
        view.set_facets(Facets {
            state: None,
            ownership: Some(Ownership::Private),
        });
        let names: Vec<_> = view.filtered().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["CMC"]);
    }
}
