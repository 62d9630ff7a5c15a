// dqscore-core/src/application/engine.rs

use std::future::Future;
use std::time::Instant;
use tracing::{debug, error, instrument};

// Imports Hexagonaux corrects
use crate::domain::config::QualityConfig;
use crate::domain::run::{RunScope, Stage};
use crate::error::DqError;
use crate::ports::store::QualityStore;

/// Everything a stage needs for one (dataset, run_date).
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub store: &'a dyn QualityStore,
    pub config: &'a QualityConfig,
    pub scope: RunScope,
}

/// Exécute une étape du pipeline avec instrumentation (Logs + Timing).
/// Errors come back tagged with the stage that raised them.
#[instrument(skip(work), fields(stage = %stage, scope = %scope))]
pub async fn run_stage<T, F>(stage: Stage, scope: RunScope, work: F) -> Result<T, DqError>
where
    F: Future<Output = Result<T, DqError>>,
{
    let start = Instant::now();
    debug!("⚡ Stage started");

    let result = work.await;
    let duration = start.elapsed();

    match result {
        Ok(value) => {
            debug!("✅ Stage finished in {:.2?}", duration);
            Ok(value)
        }
        Err(e) => {
            // On log l'erreur ici pour avoir le contexte de temps,
            // même si elle sera remontée plus haut.
            error!("❌ Stage failed after {:.2?}: {}", duration, e);
            Err(e.in_stage(stage))
        }
    }
}
