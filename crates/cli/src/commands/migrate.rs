use amlbot_db::migrations::MIGRATOR;

use crate::commands::{open_migrated, prepare, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;
        pool.close().await;
        Ok::<(), StepFailure>(())
    });

    match result {
        Ok(()) => {
            let latest = MIGRATOR.iter().map(|migration| migration.version).max().unwrap_or(0);
            CommandResult::success(
                "migrate",
                format!("schema is current at version {latest} ({})", config.database.url),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
