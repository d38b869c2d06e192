//! Local mutations: `add`, `edit`, `delete`.
//!
//! Changes are queued in the store; `sync` pushes them.

use super::CommandResult;
use clap::{Args, ValueEnum};
use tapserve_offline::{LocalDelete, OfflineExpense, OfflineStore};
use tapserve_sync_protocol::{ExpensePatch, ExpenseStatus};

/// Approval state accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Awaiting approval
    Pending,
    /// Approved
    Approved,
    /// Rejected
    Rejected,
}

impl From<StatusArg> for ExpenseStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => ExpenseStatus::Pending,
            StatusArg::Approved => ExpenseStatus::Approved,
            StatusArg::Rejected => ExpenseStatus::Rejected,
        }
    }
}

/// Arguments of `add`.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Amount spent
    #[arg(short, long)]
    pub amount: f64,

    /// Owning tenant
    #[arg(long)]
    pub tenant: String,

    /// Outlet the expense is booked against
    #[arg(long)]
    pub outlet: String,

    /// Vendor id
    #[arg(long)]
    pub vendor_id: Option<String>,

    /// Vendor name
    #[arg(long, default_value = "")]
    pub vendor_name: String,

    /// Category id
    #[arg(long, default_value = "")]
    pub category_id: String,

    /// Category name
    #[arg(long, default_value = "")]
    pub category_name: String,

    /// Free-form description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Date the expense was incurred (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,
}

impl AddArgs {
    fn to_patch(&self) -> ExpensePatch {
        let mut patch = ExpensePatch::new()
            .with_scope(self.tenant.clone(), self.outlet.clone())
            .with_amount(self.amount)
            .with_category(self.category_id.clone(), self.category_name.clone());
        patch.vendor_id = self.vendor_id.clone();
        patch.vendor_name = Some(self.vendor_name.clone());
        if let Some(description) = &self.description {
            patch = patch.with_description(description.clone());
        }
        if let Some(date) = &self.date {
            patch = patch.with_expense_date(date.clone());
        }
        patch
    }
}

/// Arguments of `edit`.
#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    /// Expense id
    pub id: String,

    /// New amount
    #[arg(short, long)]
    pub amount: Option<f64>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New approval state
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
}

impl EditArgs {
    fn to_patch(&self) -> ExpensePatch {
        let mut patch = ExpensePatch::new().with_id(self.id.clone());
        if let Some(amount) = self.amount {
            patch = patch.with_amount(amount);
        }
        if let Some(description) = &self.description {
            patch = patch.with_description(description.clone());
        }
        if let Some(status) = self.status {
            patch = patch.with_status(status.into());
        }
        patch
    }
}

fn print_record(record: &OfflineExpense, format: &str) -> CommandResult {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(record)?),
        _ => println!(
            "Saved {} (version {}, {:.2})",
            record.id(),
            record.version,
            record.expense.amount
        ),
    }
    Ok(())
}

/// Runs the add command.
pub async fn add(store: &OfflineStore, args: AddArgs, format: &str) -> CommandResult {
    let record = store.save_offline(args.to_patch()).await?;
    print_record(&record, format)
}

/// Runs the edit command.
pub async fn edit(store: &OfflineStore, args: EditArgs, format: &str) -> CommandResult {
    if store.get(&args.id).await?.is_none() {
        return Err(format!("No expense with id {}", args.id).into());
    }
    let patch = args.to_patch();
    if patch.amount.is_none() && patch.description.is_none() && patch.status.is_none() {
        return Err("Nothing to change".into());
    }
    let record = store.save_offline(patch).await?;
    print_record(&record, format)
}

/// Runs the delete command.
pub async fn delete(store: &OfflineStore, id: &str) -> CommandResult {
    match store.mark_deleted(id).await? {
        LocalDelete::Removed => println!("Removed {id} (it never reached the server)"),
        LocalDelete::Queued => println!("Queued delete for {id}"),
    }
    Ok(())
}
