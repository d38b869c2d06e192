//! Expense records and field-level patches.

use serde::{Deserialize, Serialize};

/// Approval state of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Awaiting approval.
    #[default]
    Pending,
    /// Approved by a manager.
    Approved,
    /// Rejected by a manager.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
        }
    }
}

/// Fields recognised on a scanned bill.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrFields {
    /// Total amount read from the bill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Bill date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Supplier name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    /// Bill number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,
}

/// Bill-scan output attached to an expense. Carried verbatim; never interpreted here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrData {
    /// Raw recognised text.
    pub text: String,
    /// Recognition confidence.
    pub confidence: f64,
    /// Structured fields.
    pub extracted_fields: OcrFields,
}

/// A spend record owned by a tenant and booked against one outlet.
///
/// Missing fields decode to their defaults so that partially populated
/// server payloads still round-trip through the offline store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Expense {
    /// Canonical identifier.
    pub id: String,
    /// Owning tenant (restaurant business).
    pub tenant_id: String,
    /// Outlet (physical location).
    pub outlet_id: String,
    /// Amount spent.
    pub amount: f64,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: String,
    /// Vendor reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    /// Denormalized vendor name.
    pub vendor_name: String,
    /// Category reference.
    pub category_id: String,
    /// Denormalized category name.
    pub category_name: String,
    /// Bill or invoice number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,
    /// Uploaded bill image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_image_url: Option<String>,
    /// Bill-scan output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_extracted_data: Option<OcrData>,
    /// Bill-scan confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence_score: Option<f64>,
    /// Approval state.
    pub status: ExpenseStatus,
    /// Approver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Approval time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    /// Approval notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_notes: Option<String>,
    /// Creator.
    pub created_by: String,
    /// Creation time (ISO-8601).
    pub created_at: String,
    /// Last modification time (ISO-8601).
    pub updated_at: String,
}

/// A field-level patch for [`Expense`].
///
/// `None` means "leave the field untouched". Applying a patch never clears
/// a field; there is no way to express "unset" and none is needed by the
/// sync layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpensePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::id`].
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::tenant_id`].
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::outlet_id`].
    pub outlet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::amount`].
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::description`].
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::expense_date`].
    pub expense_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::vendor_id`].
    pub vendor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::vendor_name`].
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::category_id`].
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::category_name`].
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::bill_number`].
    pub bill_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::bill_image_url`].
    pub bill_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::ocr_extracted_data`].
    pub ocr_extracted_data: Option<OcrData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::ocr_confidence_score`].
    pub ocr_confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::status`].
    pub status: Option<ExpenseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::approved_by`].
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::approved_at`].
    pub approved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::approval_notes`].
    pub approval_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::created_by`].
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::created_at`].
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// New value for [`Expense::updated_at`].
    pub updated_at: Option<String>,
}

macro_rules! apply_fields {
    ($patch:expr, $target:expr; required: $($req:ident),*; optional: $($opt:ident),*) => {
        $(
            if let Some(value) = &$patch.$req {
                $target.$req = value.clone();
            }
        )*
        $(
            if let Some(value) = &$patch.$opt {
                $target.$opt = Some(value.clone());
            }
        )*
    };
}

impl ExpensePatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every set field of this patch onto `target`.
    pub fn apply_to(&self, target: &mut Expense) {
        apply_fields!(self, target;
            required: id, tenant_id, outlet_id, amount, expense_date, vendor_name,
                category_id, category_name, status, created_by, created_at, updated_at;
            optional: description, vendor_id, bill_number, bill_image_url,
                ocr_extracted_data, ocr_confidence_score, approved_by, approved_at,
                approval_notes);
    }

    /// Builds a new expense from defaults with this patch applied.
    pub fn to_expense(&self) -> Expense {
        let mut expense = Expense::default();
        self.apply_to(&mut expense);
        expense
    }

    /// Returns a copy of `base` with this patch applied.
    pub fn applied(&self, base: &Expense) -> Expense {
        let mut expense = base.clone();
        self.apply_to(&mut expense);
        expense
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sets the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets tenant and outlet.
    pub fn with_scope(mut self, tenant_id: impl Into<String>, outlet_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self.outlet_id = Some(outlet_id.into());
        self
    }

    /// Sets the amount.
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the vendor reference and name.
    pub fn with_vendor(mut self, vendor_id: impl Into<String>, vendor_name: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self.vendor_name = Some(vendor_name.into());
        self
    }

    /// Sets the category reference and name.
    pub fn with_category(
        mut self,
        category_id: impl Into<String>,
        category_name: impl Into<String>,
    ) -> Self {
        self.category_id = Some(category_id.into());
        self.category_name = Some(category_name.into());
        self
    }

    /// Sets the expense date.
    pub fn with_expense_date(mut self, date: impl Into<String>) -> Self {
        self.expense_date = Some(date.into());
        self
    }

    /// Sets the approval state.
    pub fn with_status(mut self, status: ExpenseStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<&Expense> for ExpensePatch {
    /// A patch that reproduces `expense`: every required field is set, and
    /// optional fields are set only when present.
    fn from(expense: &Expense) -> Self {
        let e = expense.clone();
        Self {
            id: Some(e.id),
            tenant_id: Some(e.tenant_id),
            outlet_id: Some(e.outlet_id),
            amount: Some(e.amount),
            description: e.description,
            expense_date: Some(e.expense_date),
            vendor_id: e.vendor_id,
            vendor_name: Some(e.vendor_name),
            category_id: Some(e.category_id),
            category_name: Some(e.category_name),
            bill_number: e.bill_number,
            bill_image_url: e.bill_image_url,
            ocr_extracted_data: e.ocr_extracted_data,
            ocr_confidence_score: e.ocr_confidence_score,
            status: Some(e.status),
            approved_by: e.approved_by,
            approved_at: e.approved_at,
            approval_notes: e.approval_notes,
            created_by: Some(e.created_by),
            created_at: Some(e.created_at),
            updated_at: Some(e.updated_at),
        }
    }
}

impl From<Expense> for ExpensePatch {
    fn from(expense: Expense) -> Self {
        Self::from(&expense)
    }
}

impl Expense {
    /// Overlays this record's fields onto `base`.
    ///
    /// Optional fields that are `None` here keep the value from `base`.
    pub fn overlaid_on(&self, base: &Expense) -> Expense {
        ExpensePatch::from(self).applied(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Expense {
        Expense {
            id: "e1".into(),
            tenant_id: "t1".into(),
            outlet_id: "o1".into(),
            amount: 120.5,
            description: Some("Vegetables".into()),
            expense_date: "2024-05-01".into(),
            vendor_id: Some("v1".into()),
            vendor_name: "Fresh Farms".into(),
            category_id: "c1".into(),
            category_name: "Produce".into(),
            status: ExpenseStatus::Pending,
            created_by: "cashier".into(),
            created_at: "2024-05-01T08:00:00.000Z".into(),
            updated_at: "2024-05-01T08:00:00.000Z".into(),
            ..Default::default()
        }
    }

    #[test]
    fn patch_leaves_unset_fields_untouched() {
        let mut expense = sample();
        ExpensePatch::new().with_amount(99.0).apply_to(&mut expense);

        assert_eq!(expense.amount, 99.0);
        assert_eq!(expense.vendor_name, "Fresh Farms");
        assert_eq!(expense.description.as_deref(), Some("Vegetables"));
    }

    #[test]
    fn empty_patch_is_identity() {
        let patch = ExpensePatch::new();
        assert!(patch.is_empty());
        assert_eq!(patch.applied(&sample()), sample());
    }

    #[test]
    fn full_patch_reproduces_record() {
        let expense = sample();
        assert_eq!(ExpensePatch::from(&expense).to_expense(), expense);
    }

    #[test]
    fn overlay_falls_back_to_base_for_missing_optionals() {
        let mut local = sample();
        local.amount = 150.0;
        local.bill_number = None;

        let mut server = sample();
        server.bill_number = Some("INV-7".into());
        server.approval_notes = Some("ok".into());

        let merged = local.overlaid_on(&server);
        assert_eq!(merged.amount, 150.0);
        assert_eq!(merged.bill_number.as_deref(), Some("INV-7"));
        assert_eq!(merged.approval_notes.as_deref(), Some("ok"));
    }

    #[test]
    fn json_uses_camel_case_and_lowercase_status() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["tenantId"], "t1");
        assert_eq!(json["vendorName"], "Fresh Farms");
        assert_eq!(json["status"], "pending");
        assert!(json.get("billNumber").is_none());
    }

    proptest! {
        #[test]
        fn full_patch_overwrites_any_base(amount in 0.0f64..1e6, vendor in "[a-z]{1,12}", note in proptest::option::of("[a-z ]{0,20}")) {
            let mut local = sample();
            local.amount = amount;
            local.vendor_name = vendor;
            local.approval_notes = note;

            let merged = local.overlaid_on(&Expense::default());
            prop_assert_eq!(merged, local);
        }
    }

    #[test]
    fn partial_server_payload_decodes() {
        let expense: Expense =
            serde_json::from_str(r#"{"id":"srv-1","amount":10,"status":"approved"}"#).unwrap();
        assert_eq!(expense.id, "srv-1");
        assert_eq!(expense.status, ExpenseStatus::Approved);
        assert!(expense.vendor_name.is_empty());
    }
}
