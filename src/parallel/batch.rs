//! Side-by-side comparison of independent builds.
//!
//! Every build gets its own engine and generator; nothing is shared between runs, so
//! results match a sequential loop over the same builds.

use std::sync::atomic::AtomicBool;

use rayon::prelude::*;

use crate::combat::engine::SimulationReport;
use crate::data::config::PreparedBuild;
use crate::parallel::pool::WorkerPool;

/// Runs each build to completion in parallel. Output order matches input order.
pub fn compare_builds(builds: &[PreparedBuild], pool: &WorkerPool) -> Vec<SimulationReport> {
    pool.install(|| builds.par_iter().map(PreparedBuild::run).collect())
}

/// Like [compare_builds], but every engine watches `cancel` between rounds.
pub fn compare_builds_with_cancel(
    builds: &[PreparedBuild],
    pool: &WorkerPool,
    cancel: &AtomicBool,
) -> Vec<SimulationReport> {
    pool.install(|| {
        builds
            .par_iter()
            .map(|build| build.engine().run_with_cancel(cancel))
            .collect()
    })
}

/// Best build first by mean DPS. Illegal builds sort last.
pub fn rank_reports(reports: &[SimulationReport]) -> Vec<&SimulationReport> {
    let mut ranked: Vec<&SimulationReport> = reports.iter().collect();
    ranked.sort_by(|a, b| {
        a.illegal_dual_wield
            .cmp(&b.illegal_dual_wield)
            .then(b.mean_dps.total_cmp(&a.mean_dps))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::engine::StopReason;
    use crate::data::config::BuildConfig;

    fn prepared(weapon: &str, round_cap: u64) -> PreparedBuild {
        let mut config = BuildConfig::default();
        config.weapon.name = weapon.to_string();
        config.simulation.round_cap = round_cap;
        PreparedBuild::from_config_builtin(&config).unwrap()
    }

    #[test]
    fn parallel_results_match_sequential_order() {
        let builds = vec![
            prepared("Dagger", 300),
            prepared("Greataxe", 300),
            prepared("Rapier", 300),
        ];
        let parallel = compare_builds(&builds, &WorkerPool::with_workers(2));
        let sequential: Vec<_> = builds.iter().map(PreparedBuild::run).collect();
        assert_eq!(parallel, sequential);
        assert_eq!(parallel[1].build, "Greataxe");
    }

    #[test]
    fn cancelled_comparison_stops_every_build() {
        let builds = vec![prepared("Dagger", 300), prepared("Maul", 300)];
        let cancel = AtomicBool::new(true);
        let reports = compare_builds_with_cancel(&builds, &WorkerPool::default(), &cancel);
        assert!(reports.iter().all(|report| report.stop_reason == StopReason::Cancelled));
    }

    #[test]
    fn ranking_puts_illegal_builds_last() {
        let mut config = BuildConfig::default();
        config.weapon.name = "Greatsword".to_string();
        config.dual_wield.enabled = true;
        let illegal = PreparedBuild::from_config_builtin(&config).unwrap();
        let builds = vec![illegal, prepared("Longsword", 300)];
        let reports = compare_builds(&builds, &WorkerPool::default());
        let ranked = rank_reports(&reports);
        assert_eq!(ranked[0].build, "Longsword");
        assert!(ranked[1].illegal_dual_wield);
    }
}
