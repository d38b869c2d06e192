//! Property-based test generators using proptest.

use crate::fixtures::{iso_at, OUTLET_ID, TENANT_ID};
use proptest::prelude::*;
use tapserve_sync_protocol::{Expense, ExpensePatch, ExpenseStatus};

/// Strategy for positive amounts with two decimals.
pub fn amount_strategy() -> impl Strategy<Value = f64> {
    (1u32..1_000_000).prop_map(|cents| f64::from(cents) / 100.0)
}

/// Strategy for canonical timestamps within roughly a year.
pub fn timestamp_strategy() -> impl Strategy<Value = String> {
    (0i64..31_536_000).prop_map(iso_at)
}

/// Strategy for approval states.
pub fn status_strategy() -> impl Strategy<Value = ExpenseStatus> {
    prop_oneof![
        Just(ExpenseStatus::Pending),
        Just(ExpenseStatus::Approved),
        Just(ExpenseStatus::Rejected),
    ]
}

/// Strategy for server records with ids `e0`..`e{max_id}`.
pub fn server_expense_strategy(max_id: usize) -> impl Strategy<Value = Expense> {
    (
        0..max_id.max(1),
        amount_strategy(),
        timestamp_strategy(),
        status_strategy(),
        proptest::option::of("[A-Za-z ]{1,24}"),
    )
        .prop_map(|(n, amount, updated_at, status, description)| Expense {
            id: format!("e{n}"),
            tenant_id: TENANT_ID.into(),
            outlet_id: OUTLET_ID.into(),
            amount,
            description,
            status,
            created_at: iso_at(0),
            updated_at,
            ..Default::default()
        })
}

/// Strategy for edit patches that touch a random subset of fields.
pub fn edit_patch_strategy() -> impl Strategy<Value = ExpensePatch> {
    (
        proptest::option::of(amount_strategy()),
        proptest::option::of("[A-Za-z ]{1,24}"),
        proptest::option::of(status_strategy()),
    )
        .prop_map(|(amount, description, status)| {
            let mut patch = ExpensePatch::new();
            if let Some(amount) = amount {
                patch = patch.with_amount(amount);
            }
            if let Some(description) = description {
                patch = patch.with_description(description);
            }
            if let Some(status) = status {
                patch = patch.with_status(status);
            }
            patch
        })
}

/// One step of a local mutation history.
#[derive(Debug, Clone)]
pub enum LocalOp {
    /// Save a new expense.
    Create(f64),
    /// Edit the n-th known record.
    Edit(usize, ExpensePatch),
    /// Delete the n-th known record.
    Delete(usize),
}

/// Strategy for local mutation histories.
pub fn local_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<LocalOp>> {
    let op = prop_oneof![
        3 => amount_strategy().prop_map(LocalOp::Create),
        3 => (0usize..16, edit_patch_strategy()).prop_map(|(i, p)| LocalOp::Edit(i, p)),
        1 => (0usize..16).prop_map(LocalOp::Delete),
    ];
    proptest::collection::vec(op, 1..max_len.max(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn amounts_are_positive(amount in amount_strategy()) {
            prop_assert!(amount > 0.0);
        }

        #[test]
        fn server_ids_stay_in_range(expense in server_expense_strategy(4)) {
            let n: usize = expense.id[1..].parse().unwrap();
            prop_assert!(n < 4);
            prop_assert!(expense.updated_at.ends_with('Z'));
        }
    }
}
