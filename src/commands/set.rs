//! Handlers that write values into the grid.

use crate::args::{ExpenseArgs, SetArgs};
use crate::commands::{open_session, save_session, Out};
use crate::model::{CellRef, ExpenseRef};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};

/// The content of one cell after a command touched it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellOut {
    pub cell: String,
    pub entries: String,
    pub changed: bool,
}

/// Reconciles `args.value()` into a day cell and saves the grid.
///
/// Blank or unparseable input changes nothing and nothing is saved.
///
/// # Errors
/// - Returns an error if the floor has no grid column, the day is out of range or the month is not
///   part of the season.
/// - Returns an error if the store cannot be read or written.
pub async fn set(config: Config, args: SetArgs) -> Result<Out<CellOut>> {
    let cell = CellRef::new(args.month(), args.floor(), args.day())?;
    let (mut session, stored) = open_session(&config, args.year()).await?;
    let changed = session.submit(cell, args.value())?;
    if changed {
        save_session(&config, &mut session, &stored).await?;
    }
    let out = CellOut {
        cell: cell.to_string(),
        entries: session.grid().get(&cell).to_string(),
        changed,
    };
    let message = if changed {
        format!("{}: {}", out.cell, out.entries)
    } else {
        format!("Nothing to change in {}", out.cell)
    };
    Ok(Out::new(message, out))
}

/// Reconciles `args.value()` into a month-level expense cell and saves the grid.
pub async fn expense(config: Config, args: ExpenseArgs) -> Result<Out<CellOut>> {
    let cell = ExpenseRef::new(args.month(), args.category());
    let (mut session, stored) = open_session(&config, args.year()).await?;
    let changed = session.submit_expense(cell, args.value())?;
    if changed {
        save_session(&config, &mut session, &stored).await?;
    }
    let out = CellOut {
        cell: format!(
            "{} {}",
            args.month().display_name(),
            args.category().display_name()
        ),
        entries: session.grid().expense(&cell).to_string(),
        changed,
    };
    let message = if changed {
        format!("Expenses {}: {}", out.cell, out.entries)
    } else {
        format!("Nothing to change in the expenses of {}", out.cell)
    };
    Ok(Out::new(message, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Floor, Month};
    use crate::store::Backend;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_set_saves_grid_and_ledger() {
        let env = TestEnv::new().await;
        let out = set(
            env.config(),
            SetArgs::new(2024, Month::April, Floor::A, 1, "100"),
        )
        .await
        .unwrap();
        assert!(out.structure().unwrap().changed);

        let out = set(
            env.config(),
            SetArgs::new(2023, Month::April, Floor::A, 1, "80"),
        )
        .await
        .unwrap();
        assert_eq!(
            out.structure().unwrap().entries,
            "100:2024;APRIL,80:2023;APRIL"
        );

        let ledger = env.config().store().load_ledger().await.unwrap();
        assert_eq!(ledger.bookings.len(), 2);
        assert_eq!(ledger.years(), vec![2023, 2024]);
    }

    #[tokio::test]
    async fn test_set_blank_is_a_no_op() {
        let env = TestEnv::new().await;
        let out = set(
            env.config(),
            SetArgs::new(2024, Month::May, Floor::B, 2, " "),
        )
        .await
        .unwrap();
        assert!(!out.structure().unwrap().changed);
        assert!(env.backup_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_rejects_general_floor() {
        let env = TestEnv::new().await;
        let out = set(
            env.config(),
            SetArgs::new(2024, Month::May, Floor::General, 2, "10"),
        )
        .await;
        assert!(out.is_err());
    }

    #[tokio::test]
    async fn test_expense() {
        let env = TestEnv::new().await;
        expense(
            env.config(),
            ExpenseArgs::new(2024, Month::June, Floor::General, "35"),
        )
        .await
        .unwrap();
        let ledger = env.config().store().load_ledger().await.unwrap();
        assert_eq!(ledger.expenses.len(), 1);
        assert_eq!(ledger.expenses[0].price.to_string(), "35");
        assert!(!env.backup_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_with_sheets_backend() {
        let env = TestEnv::with_backend(Backend::Sheets).await;
        set(
            env.config(),
            SetArgs::new(2024, Month::August, Floor::Ground, 15, "140"),
        )
        .await
        .unwrap();
        let out = set(
            env.config(),
            SetArgs::new(2024, Month::August, Floor::Ground, 15, "150"),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().entries, "150:2024;AUGUST");

        let ledger = env.config().store().load_ledger().await.unwrap();
        assert_eq!(ledger.bookings.len(), 1);
        assert_eq!(ledger.bookings[0].price.to_string(), "150");
        // No database, so only grid snapshots are kept.
        assert!(env
            .backup_names()
            .await
            .iter()
            .all(|name| name.starts_with("pre-save.")));
    }
}
