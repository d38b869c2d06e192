//! REST response envelope, paging and filters.

use serde::{Deserialize, Serialize};

use crate::Expense;

/// The `{success, data?, error?}` envelope every API response uses.
///
/// A `success: false` body is a recoverable rejection, not a transport
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the server accepted the request.
    pub success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error text on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    /// A successful response with no payload.
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: None,
        }
    }

    /// A rejected response.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// Best available description of a failure.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "request failed".to_string())
    }

    /// Converts into a `Result`, treating `success: false` as an error.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error_message())
        }
    }
}

/// One page of `GET /expenses`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpensePage {
    /// Records in this page.
    pub items: Vec<Expense>,
    /// Total matching records across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl ExpensePage {
    /// Returns true if pages after this one may hold more records.
    pub fn has_more(&self, received: u64) -> bool {
        !self.items.is_empty() && received < self.total
    }
}

/// Query filters for `GET /expenses`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseFilters {
    /// Tenant scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Outlet scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlet_id: Option<String>,
    /// Lower bound; the pull phase passes the last sync time here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ExpenseFilters {
    /// Creates empty filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lower date bound.
    pub fn since(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    /// Sets the tenant and outlet scope.
    pub fn scoped(mut self, tenant_id: Option<String>, outlet_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self.outlet_id = outlet_id;
        self
    }

    /// Sets paging.
    pub fn paged(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.tenant_id {
            pairs.push(("tenantId", v.clone()));
        }
        if let Some(v) = &self.outlet_id {
            pairs.push(("outletId", v.clone()));
        }
        if let Some(v) = &self.start_date {
            pairs.push(("startDate", v.clone()));
        }
        if let Some(v) = &self.end_date {
            pairs.push(("endDate", v.clone()));
        }
        if let Some(v) = self.page {
            pairs.push(("page", v.to_string()));
        }
        if let Some(v) = self.limit {
            pairs.push(("limit", v.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Created {
        id: String,
    }

    fn decode<T: DeserializeOwned>(body: &str) -> ApiResponse<T> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn payload_needs_no_default() {
        let resp: ApiResponse<Created> = decode(r#"{"success":true,"data":{"id":"srv_1"}}"#);
        assert_eq!(resp.data, Some(Created { id: "srv_1".into() }));

        let bare: ApiResponse<Created> = decode(r#"{"success":true}"#);
        assert!(bare.data.is_none());
        assert!(bare.error.is_none());
    }

    #[test]
    fn rejected_envelope_decodes() {
        let resp: ApiResponse<Expense> =
            serde_json::from_str(r#"{"success":false,"error":"Expense not found"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error_message(), "Expense not found");
        assert_eq!(resp.into_result(), Err("Expense not found".to_string()));
    }

    #[test]
    fn error_message_falls_back_to_message() {
        let mut resp: ApiResponse<()> = ApiResponse::failure("x");
        resp.error = None;
        resp.message = Some("Validation failed".into());
        assert_eq!(resp.error_message(), "Validation failed");

        resp.message = None;
        assert_eq!(resp.error_message(), "request failed");
    }

    #[test]
    fn page_envelope_decodes() {
        let body = r#"{"success":true,"data":{"items":[{"id":"e1","amount":5}],"total":3,"page":1,"limit":1}}"#;
        let resp: ApiResponse<ExpensePage> = serde_json::from_str(body).unwrap();
        let page = resp.data.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more(1));
        assert!(!page.has_more(3));
    }

    #[test]
    fn empty_page_stops_paging() {
        let page = ExpensePage {
            total: 10,
            ..Default::default()
        };
        assert!(!page.has_more(0));
    }

    #[test]
    fn query_pairs_skip_unset() {
        let filters = ExpenseFilters::new()
            .since("2024-05-01T00:00:00.000Z")
            .paged(2, 50);
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("startDate", "2024-05-01T00:00:00.000Z".to_string()),
                ("page", "2".to_string()),
                ("limit", "50".to_string()),
            ]
        );
    }
}
