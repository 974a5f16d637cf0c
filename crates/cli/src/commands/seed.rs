use amlbot_db::DemoCatalog;

use crate::commands::{open_migrated, prepare, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;

        let outcome: Result<_, StepFailure> = async {
            let seeded = DemoCatalog::load(&pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            let verification = DemoCatalog::verify(&pool)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

            if verification.all_present {
                Ok(seeded)
            } else {
                Err(("seed_verification", verification_failure(&verification.checks), 6u8))
            }
        }
        .await;

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success(
            "seed",
            format!(
                "demo catalog loaded: {} tokens across {} networks ({})",
                seeded.tokens_seeded.len(),
                seeded.networks_seeded,
                seeded.tokens_seeded.join(", ")
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure(checks: &[(&str, bool)]) -> String {
    let missing =
        checks.iter().filter_map(|(token, present)| (!present).then_some(*token)).collect::<Vec<_>>();
    if missing.is_empty() {
        "demo catalog verification failed".to_string()
    } else {
        format!("demo catalog incomplete for tokens: {}", missing.join(", "))
    }
}
