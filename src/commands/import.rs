use crate::args::ImportArgs;
use crate::commands::{open_session, save_session, Out};
use crate::import::{self, Format, MergePolicy, Table};
use crate::{Config, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A summary of an import.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImportOut {
    pub format: Format,
    pub policy: MergePolicy,
    pub imported: usize,
    pub skipped: usize,
    pub years: Vec<i32>,
}

/// Reads a CSV file, normalizes it and applies it to the stored grid with the requested policy.
///
/// Rows that cannot be understood are skipped and counted. A file whose columns match neither the
/// long nor the wide format is rejected and nothing is written.
///
/// # Errors
/// - Returns an error if the file cannot be read or its format is not recognized.
/// - Returns an error if the store cannot be read or written.
pub async fn import(config: Config, args: ImportArgs) -> Result<Out<ImportOut>> {
    let path = args.file().to_path_buf();
    let table = tokio::task::spawn_blocking(move || Table::from_path(&path))
        .await
        .context("The import task failed")??;
    let normalized = import::normalize(&table, config.period(), args.year())?;
    if normalized.skipped > 0 {
        warn!(
            "{} rows of {} could not be imported",
            normalized.skipped,
            args.file().display()
        );
    }

    let (mut session, stored) = open_session(&config, args.year()).await?;
    session.import(&normalized, args.policy())?;
    if session.is_dirty() {
        save_session(&config, &mut session, &stored).await?;
    }

    let out = ImportOut {
        format: normalized.format,
        policy: args.policy(),
        imported: normalized.imported(),
        skipped: normalized.skipped,
        years: normalized.years(),
    };
    let message = format!(
        "Imported {} entries ({} format, {}), skipped {}",
        out.imported, out.format, out.policy, out.skipped
    );
    Ok(Out::new(message, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellRef, Floor, Month};
    use crate::test::TestEnv;
    use crate::utils;

    #[tokio::test]
    async fn test_import_long_file() {
        let env = TestEnv::new().await;
        let file = env.path("long.csv");
        utils::write(
            &file,
            "year,floor,month,day,price\n\
             2024,Α,Απρίλιος,1,100\n\
             2023,B,MAY,2,80\n\
             2024,Γ,MAY,3,90\n",
        )
        .await
        .unwrap();

        let out = import(env.config(), ImportArgs::new(&file, 2025, MergePolicy::Merge))
            .await
            .unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.format, Format::Long);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.years, vec![2023, 2024]);

        let ledger = env.config().store().load_ledger().await.unwrap();
        assert_eq!(ledger.bookings.len(), 2);
    }

    #[tokio::test]
    async fn test_import_wide_file_replaces_the_imported_year() {
        let env = TestEnv::new().await;
        for (year, day, value) in [(2022, 5, "60"), (2024, 5, "65")] {
            crate::commands::set(
                env.config(),
                crate::args::SetArgs::new(year, Month::July, Floor::A, day, value),
            )
            .await
            .unwrap();
        }

        let file = env.path("wide.csv");
        utils::write(&file, "Ημέρα,Μάιος Ισόγειο\n1,\n2,75\n")
            .await
            .unwrap();
        import(env.config(), ImportArgs::new(&file, 2024, MergePolicy::Replace))
            .await
            .unwrap();

        let grid = env
            .config()
            .store()
            .load_grid(env.config().period())
            .await
            .unwrap();
        let may2 = CellRef::new(Month::May, Floor::Ground, 2).unwrap();
        let july5 = CellRef::new(Month::July, Floor::A, 5).unwrap();
        assert_eq!(grid.get(&may2), "75:2024;MAY");
        assert_eq!(grid.get(&july5), "60:2022;JULY");
    }

    #[tokio::test]
    async fn test_import_unrecognized_writes_nothing() {
        let env = TestEnv::new().await;
        let file = env.path("bad.csv");
        utils::write(&file, "date,amount\n2024-05-01,100\n")
            .await
            .unwrap();
        let out = import(env.config(), ImportArgs::new(&file, 2024, MergePolicy::Merge)).await;
        assert!(out.is_err());
        assert!(env.backup_names().await.is_empty());
    }
}
