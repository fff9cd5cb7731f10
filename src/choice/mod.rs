//! Counselling-scoped choice lists.

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, NewChoiceList};
use crate::catalog::{self, Counselling};
use crate::records::{ChoiceList, Priority};

pub const NEW_LIST_COLOR: &str = "bg-indigo-50 border-indigo-200";

#[derive(Debug, Error)]
pub enum ChoiceError {
    #[error("select a counselling authority first")]
    MissingCounselling,

    #[error("unknown counselling authority: {0}")]
    UnknownCounselling(String),

    #[error("no choice list with id {0}")]
    UnknownList(String),

    #[error("choice list {list} belongs to {list_counselling}, not {counselling}")]
    ScopeMismatch {
        list: String,
        list_counselling: String,
        counselling: String,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ChoiceError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }
}

/// The two lists shown when the server cannot be reached.
pub fn sample_lists() -> Vec<ChoiceList> {
    vec![
        ChoiceList {
            id: "1".into(),
            name: "AIQ R1 Priority List".into(),
            count: 28,
            color: "bg-red-50 border-red-200".into(),
            priority: Priority::High,
            counselling_type: "All India Counselling - UG Medical".into(),
        },
        ChoiceList {
            id: "2".into(),
            name: "Maharashtra Govt List".into(),
            count: 14,
            color: "bg-blue-50 border-blue-200".into(),
            priority: Priority::Medium,
            counselling_type: "Maharashtra - UG Medical".into(),
        },
    ]
}

#[derive(Debug)]
pub struct ChoiceListManager {
    api: ApiClient,
    lists: Vec<ChoiceList>,
    from_sample: bool,
}

impl ChoiceListManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            lists: Vec::new(),
            from_sample: false,
        }
    }

    pub fn lists(&self) -> &[ChoiceList] {
        &self.lists
    }

    pub fn get(&self, id: &str) -> Option<&ChoiceList> {
        self.lists.iter().find(|l| l.id == id)
    }

    /// `true` when the lists on hand are the built-in samples.
    pub fn is_sample(&self) -> bool {
        self.from_sample
    }

    /// Fetches the user's lists. Any failure other than 401 substitutes the
    /// sample lists.
    pub async fn load(&mut self) -> Result<&[ChoiceList], ChoiceError> {
        match self.api.choice_lists().await {
            Ok(resp) => {
                self.lists = resp.into_data();
                self.from_sample = false;
            }
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
            Err(e) => {
                warn!(error = %e, "failed to load choice lists, showing samples");
                self.lists = sample_lists();
                self.from_sample = true;
            }
        }
        Ok(&self.lists)
    }

    /// Creates a list scoped to `counselling`, named after it.
    #[must_use = "a failed create must be reported"]
    pub async fn create(&mut self, counselling: &str) -> Result<&ChoiceList, ChoiceError> {
        let label = counselling.trim();
        if label.is_empty() {
            return Err(ChoiceError::MissingCounselling);
        }
        let entry = catalog::find(label)
            .ok_or_else(|| ChoiceError::UnknownCounselling(label.to_string()))?;

        let request = NewChoiceList {
            name: entry.label.to_string(),
            counselling_type: entry.label.to_string(),
            priority: Priority::Medium,
        };
        let created = self.api.create_choice_list(&request).await?.into_data();
        info!(id = %created.id, counselling = entry.label, "created choice list");

        self.lists.push(ChoiceList {
            id: created.id,
            name: created.name.unwrap_or(request.name),
            count: 0,
            color: NEW_LIST_COLOR.to_string(),
            priority: Priority::Medium,
            counselling_type: request.counselling_type,
        });
        let index = self.lists.len() - 1;
        Ok(&self.lists[index])
    }

    #[must_use = "a failed delete must be reported"]
    pub async fn delete(&mut self, id: &str) -> Result<(), ChoiceError> {
        self.api.delete_choice_list(id).await?;
        self.lists.retain(|l| l.id != id);
        info!(id, "deleted choice list");
        Ok(())
    }

    #[must_use = "a failed membership write must be reported"]
    pub async fn add_item(&mut self, list_id: &str, college_id: &str) -> Result<(), ChoiceError> {
        self.api.add_to_choice_list(list_id, college_id).await?;
        if let Some(list) = self.lists.iter_mut().find(|l| l.id == list_id) {
            list.count += 1;
        }
        Ok(())
    }

    #[must_use = "a failed membership write must be reported"]
    pub async fn remove_item(&mut self, list_id: &str, college_id: &str) -> Result<(), ChoiceError> {
        self.api.remove_from_choice_list(list_id, college_id).await?;
        if let Some(list) = self.lists.iter_mut().find(|l| l.id == list_id) {
            list.count = list.count.saturating_sub(1);
        }
        Ok(())
    }

    /// Checks that `id` names a list on hand before a membership write.
    pub fn require(&self, id: &str) -> Result<&ChoiceList, ChoiceError> {
        self.get(id)
            .ok_or_else(|| ChoiceError::UnknownList(id.to_string()))
    }

    pub fn counselling_options(query: &str) -> Vec<&'static Counselling> {
        catalog::search(query)
    }
}
