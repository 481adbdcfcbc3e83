use crate::args::{ClearArgs, ClearTarget};
use crate::codec::Kind;
use crate::commands::{current_year, open_session, save_session, Out};
use crate::model::{CellRef, ExpenseRef};
use crate::{Config, Result};

/// Removes entries from the grid and saves it.
///
/// - `cell` removes one year's booking (or expense) from a day cell
/// - `expense` removes one year's expense from a monthly expense cell
/// - `month` empties a month for one year, or for all years
/// - `all` empties the grid
pub async fn clear(config: Config, args: ClearArgs) -> Result<Out<()>> {
    match args.target() {
        ClearTarget::Cell {
            year,
            month,
            floor,
            day,
            expense,
        } => {
            let cell = CellRef::new(*month, *floor, *day)?;
            let kind = if *expense { Kind::Expense } else { Kind::Revenue };
            let (mut session, stored) = open_session(&config, *year).await?;
            if !session.clear_entry(cell, kind)? {
                return Ok(format!("{cell} has no {kind} entry for {year}").into());
            }
            save_session(&config, &mut session, &stored).await?;
            Ok(format!("Cleared the {year} {kind} entry of {cell}").into())
        }
        ClearTarget::Expense {
            year,
            month,
            category,
        } => {
            let cell = ExpenseRef::new(*month, *category);
            let (mut session, stored) = open_session(&config, *year).await?;
            if !session.clear_expense(cell)? {
                return Ok(format!(
                    "There is no {year} expense for {} in {}",
                    category.display_name(),
                    month.display_name()
                )
                .into());
            }
            save_session(&config, &mut session, &stored).await?;
            Ok(format!(
                "Cleared the {year} expense for {} in {}",
                category.display_name(),
                month.display_name()
            )
            .into())
        }
        ClearTarget::Month { month, year } => {
            let session_year = year.unwrap_or_else(current_year);
            let (mut session, stored) = open_session(&config, session_year).await?;
            session.clear_month(*month, *year);
            save_session(&config, &mut session, &stored).await?;
            Ok(match year {
                Some(year) => format!("Cleared {year} from {}", month.display_name()),
                None => format!("Cleared {} for every year", month.display_name()),
            }
            .into())
        }
        ClearTarget::All => {
            let (mut session, stored) = open_session(&config, current_year()).await?;
            session.clear_all();
            save_session(&config, &mut session, &stored).await?;
            Ok("Cleared the whole grid".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::SetArgs;
    use crate::commands::set;
    use crate::model::{Floor, Month};
    use crate::test::TestEnv;

    async fn seed(env: &TestEnv) {
        set(env.config(), SetArgs::new(2023, Month::May, Floor::A, 1, "80"))
            .await
            .unwrap();
        set(env.config(), SetArgs::new(2024, Month::May, Floor::A, 1, "90"))
            .await
            .unwrap();
        set(env.config(), SetArgs::new(2024, Month::June, Floor::B, 9, "70"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clear_cell() {
        let env = TestEnv::new().await;
        seed(&env).await;
        let target = ClearTarget::Cell {
            year: 2024,
            month: Month::May,
            floor: Floor::A,
            day: 1,
            expense: false,
        };
        clear(env.config(), ClearArgs::new(target)).await.unwrap();
        let ledger = env.config().store().load_ledger().await.unwrap();
        assert_eq!(ledger.bookings.len(), 2);
        assert_eq!(ledger.years(), vec![2023, 2024]);
    }

    #[tokio::test]
    async fn test_clear_month_one_year() {
        let env = TestEnv::new().await;
        seed(&env).await;
        let target = ClearTarget::Month {
            month: Month::May,
            year: Some(2023),
        };
        clear(env.config(), ClearArgs::new(target)).await.unwrap();
        let ledger = env.config().store().load_ledger().await.unwrap();
        assert_eq!(ledger.years(), vec![2024]);
        assert_eq!(ledger.bookings.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_month_all_years_and_all() {
        let env = TestEnv::new().await;
        seed(&env).await;
        let target = ClearTarget::Month {
            month: Month::May,
            year: None,
        };
        clear(env.config(), ClearArgs::new(target)).await.unwrap();
        let ledger = env.config().store().load_ledger().await.unwrap();
        assert_eq!(ledger.bookings.len(), 1);

        clear(env.config(), ClearArgs::new(ClearTarget::All))
            .await
            .unwrap();
        let ledger = env.config().store().load_ledger().await.unwrap();
        assert!(ledger.is_empty());
    }
}
