use serde::{Deserialize, Serialize};

use super::{PageQuery, PageResult};
use crate::dict::DictCache;
use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// Dictionary type as listed by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictSummary {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    pub dict_code: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub remark: Option<String>,
}

/// Editable dictionary item row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictItemForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub sort: i32,
    #[serde(default)]
    pub status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// Dictionary editor endpoints.
///
/// Every accepted mutation evicts the edited code from the [`DictCache`] so
/// the next read refetches it.
#[derive(Clone)]
pub struct DictEditor {
    client: ApiClient,
    cache: DictCache,
}

impl DictEditor {
    pub fn new(client: ApiClient, cache: DictCache) -> Self {
        Self { client, cache }
    }

    pub async fn list_dicts(&self, query: &PageQuery) -> Result<PageResult<DictSummary>, ApiError> {
        self.client
            .send(query.apply(ApiRequest::get("dicts/page")))
            .await
    }

    pub async fn item_page(
        &self,
        code: &str,
        query: &PageQuery,
    ) -> Result<PageResult<DictItemForm>, ApiError> {
        let request = ApiRequest::get(format!("{}/page", items_path(code)));
        self.client.send(query.apply(request)).await
    }

    pub async fn create_item(&self, code: &str, item: &DictItemForm) -> Result<(), ApiError> {
        let request = ApiRequest::post(items_path(code)).json_of(item)?;
        self.client.send_unit(request).await?;
        self.cache.remove(code);
        Ok(())
    }

    pub async fn update_item(&self, code: &str, id: u64, item: &DictItemForm) -> Result<(), ApiError> {
        let request = ApiRequest::put(format!("{}/{id}", items_path(code))).json_of(item)?;
        self.client.send_unit(request).await?;
        self.cache.remove(code);
        Ok(())
    }

    /// Deletes the given item ids in one call.
    pub async fn delete_items(&self, code: &str, ids: &[u64]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.client
            .send_unit(ApiRequest::delete(format!("{}/{joined}", items_path(code))))
            .await?;
        self.cache.remove(code);
        Ok(())
    }
}

pub(crate) fn items_path(code: &str) -> String {
    format!("dicts/{}/items", urlencoding::encode(code))
}
