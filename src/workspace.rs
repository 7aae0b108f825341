//! The workspace ties the snapshot arena and the audit log together: load a
//! dataset, run engine operations against the current snapshot, persist the
//! results, and keep every mutation revertible.
//!
//! Mutating operations (feature edits, reduction, oversampling) derive a new
//! snapshot and advance the current pointer; analytic operations (fits,
//! interpolation, extrapolation, correlation) record an audit entry against
//! the current snapshot without touching the lineage.
//!
//! Revert semantics: reverting the entry for the *current head* walks the
//! pointer back to the head's predecessor, materially undoing the mutation.
//! Reverting any older entry only marks the log; collapsing history
//! underneath later snapshots would silently discard their work.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;

use crate::{
    audit::{AuditEntry, AuditLog, OperationKind, OperationParams, RevertOutcome},
    correlate::{self, CorrelationMethod},
    curvefit::{self, CurveFit, CurveFitMethod, coerce_degree},
    data::Value,
    error::{EngineError, Result},
    extrapolate::{self, ExtrapolationMethod},
    frame::DataFrame,
    history::{DatasetSnapshot, SnapshotArena, SnapshotId, SourceFile},
    interpolate::{self, InterpolateOptions, InterpolationKind},
    io_utils::{self, detect_format},
    oversample::{self, OversampleMethod},
    reduce::{self, ReduceOptions, ReductionMethod},
    summary::{DatasetSummary, summarize},
};

pub const WORKSPACE_FILE: &str = "workspace.json";

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Workspace {
    arena: SnapshotArena,
    audit: AuditLog,
    current: Option<SnapshotId>,
}

impl Workspace {
    /// Loads the workspace stored under `dir`, or starts an empty one.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let file = dir.join(WORKSPACE_FILE);
        if !file.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&file)
            .with_context(|| format!("Reading workspace from {file:?}"))?;
        serde_json::from_str(&raw).with_context(|| format!("Parsing workspace {file:?}"))
    }

    pub fn save(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("Creating workspace dir {dir:?}"))?;
        let file = dir.join(WORKSPACE_FILE);
        let encoded = serde_json::to_string_pretty(self).context("Encoding workspace")?;
        fs::write(&file, encoded).with_context(|| format!("Writing workspace to {file:?}"))?;
        Ok(file)
    }

    /// Loads a CSV/XLSX file as a new lineage root and makes it current.
    pub fn ingest(&mut self, path: &Path, name: Option<String>) -> Result<SnapshotId> {
        let format = detect_format(path)?;
        let frame = io_utils::load_table(path)?;
        let name = name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("dataset")
                .to_string()
        });
        let id = self.arena.insert_root(
            name,
            Some(SourceFile {
                path: path.to_path_buf(),
                format,
            }),
            frame,
        );
        self.current = Some(id);
        info!("Ingested {path:?} as snapshot {id}");
        Ok(id)
    }

    pub fn current_snapshot(&self) -> Result<&DatasetSnapshot> {
        let id = self.current.ok_or(EngineError::EmptyWorkspace)?;
        self.arena
            .get(id)
            .ok_or_else(|| EngineError::SnapshotNotFound(id.to_string()))
    }

    pub fn current_frame(&self) -> Result<&DataFrame> {
        Ok(&self.current_snapshot()?.frame)
    }

    pub fn history(&self) -> &[AuditEntry] {
        self.audit.entries()
    }

    pub fn lineage(&self) -> Result<Vec<&DatasetSnapshot>> {
        let id = self.current.ok_or(EngineError::EmptyWorkspace)?;
        self.arena.lineage(id)
    }

    pub fn summary(&self) -> Result<DatasetSummary> {
        Ok(summarize(self.current_frame()?))
    }

    fn advance(
        &mut self,
        label: &str,
        frame: DataFrame,
        kind: OperationKind,
        params: OperationParams,
    ) -> Result<SnapshotId> {
        let parent = self.current_snapshot()?;
        let name = format!("{} ({label})", parent.name);
        let parent_id = parent.id;
        let id = self.arena.derive(parent_id, name, frame)?;
        self.current = Some(id);
        self.audit.record(kind, params, Some(id));
        info!("Applied {kind}; current snapshot is now {id}");
        Ok(id)
    }

    /// Creates a new dataset (a fresh lineage root) from a subset of the
    /// current snapshot's features, and makes it current.
    pub fn select_features(
        &mut self,
        features: &[String],
        name: Option<String>,
    ) -> Result<SnapshotId> {
        let parent = self.current_snapshot()?;
        let frame = parent.frame.select(features)?;
        let name = name.unwrap_or_else(|| format!("{} (subset)", parent.name));
        let id = self.arena.insert_root(name, None, frame);
        self.current = Some(id);
        info!("Created subset dataset as snapshot {id}");
        Ok(id)
    }

    pub fn add_feature(&mut self, name: &str, values: Vec<Value>) -> Result<SnapshotId> {
        let frame = self.current_frame()?.with_feature(name, values)?;
        self.advance(
            &format!("+{name}"),
            frame,
            OperationKind::AddFeature,
            OperationParams::Feature {
                name: name.to_string(),
            },
        )
    }

    pub fn delete_feature(&mut self, name: &str) -> Result<SnapshotId> {
        let frame = self.current_frame()?.without_feature(name)?;
        self.advance(
            &format!("-{name}"),
            frame,
            OperationKind::DeleteFeature,
            OperationParams::Feature {
                name: name.to_string(),
            },
        )
    }

    pub fn reduce(
        &mut self,
        method: ReductionMethod,
        options: &ReduceOptions,
    ) -> Result<SnapshotId> {
        let input = self.current_frame()?;
        let rows = input.row_count();
        let reduced = reduce::reduce(input, method, options)?;
        self.advance(
            &method.to_string(),
            reduced,
            method.into(),
            OperationParams::Reduction {
                method,
                n_components: options.n_components,
                rows,
            },
        )
    }

    pub fn oversample(
        &mut self,
        x: &str,
        y: &str,
        method: OversampleMethod,
        factor: f64,
        seed: u64,
    ) -> Result<SnapshotId> {
        let resampled = oversample::oversample(self.current_frame()?, x, y, method, factor, seed)?;
        self.advance(
            "oversample",
            resampled,
            OperationKind::DataOversample,
            OperationParams::Oversample {
                x: x.to_string(),
                y: y.to_string(),
                method,
                factor,
            },
        )
    }

    fn record(&mut self, kind: OperationKind, params: OperationParams) -> Result<()> {
        let snapshot = self.current_snapshot()?.id;
        self.audit.record(kind, params, Some(snapshot));
        Ok(())
    }

    pub fn fit_curve(
        &mut self,
        x: &str,
        y: &str,
        method: CurveFitMethod,
        degree: f64,
    ) -> Result<CurveFit> {
        let fit = curvefit::fit_curve(self.current_frame()?, x, y, method, degree)?;
        self.record(
            method.into(),
            OperationParams::CurveFit {
                x: x.to_string(),
                y: y.to_string(),
                method,
                degree: coerce_degree(degree).unwrap_or_default(),
            },
        )?;
        Ok(fit)
    }

    pub fn interpolate(
        &mut self,
        x: &str,
        y: &str,
        kind: InterpolationKind,
        options: &InterpolateOptions,
    ) -> Result<DataFrame> {
        let result = interpolate::interpolate(self.current_frame()?, x, y, kind, options)?;
        self.record(
            kind.into(),
            OperationParams::Interpolation {
                x: x.to_string(),
                y: y.to_string(),
                kind,
                num_points: options.num_points,
                degree: coerce_degree(options.degree).unwrap_or_default(),
            },
        )?;
        Ok(result)
    }

    pub fn extrapolate(
        &mut self,
        x: &str,
        y: &str,
        targets: &[f64],
        method: ExtrapolationMethod,
        degree: f64,
    ) -> Result<DataFrame> {
        let result =
            extrapolate::extrapolate(self.current_frame()?, x, y, targets, method, degree)?;
        self.record(
            method.into(),
            OperationParams::Extrapolation {
                x: x.to_string(),
                y: y.to_string(),
                method,
                degree: coerce_degree(degree).unwrap_or_default(),
                targets: targets.to_vec(),
            },
        )?;
        Ok(result)
    }

    pub fn correlation(&mut self, x: &str, y: &str, method: CorrelationMethod) -> Result<f64> {
        let value = correlate::correlation(self.current_frame()?, x, y, method)?;
        self.record(
            method.into(),
            OperationParams::Correlation {
                x: x.to_string(),
                y: y.to_string(),
                method,
            },
        )?;
        Ok(value)
    }

    /// Marks the audit entry reverted; if it produced the current head
    /// snapshot, the current pointer walks back to the predecessor.
    pub fn revert(&mut self, entry_id: u64) -> Result<RevertOutcome> {
        let snapshot = self.audit.entry(entry_id)?.snapshot;
        let outcome = self.audit.revert(entry_id)?;
        if outcome == RevertOutcome::Reverted
            && snapshot == self.current
            && let Some(id) = snapshot
            && let Some(previous) = self.arena.get(id).and_then(|s| s.previous)
        {
            self.current = Some(previous);
            info!("Reverted entry {entry_id}; current snapshot is now {previous}");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::DEFAULT_SEED;

    fn seeded() -> Workspace {
        let mut workspace = Workspace::default();
        let frame = DataFrame::from_numeric_columns(&[
            ("feature1", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            ("feature2", &[2.0, 4.0, 6.0, 8.0, 10.0]),
        ]);
        let id = workspace.arena.insert_root("test", None, frame);
        workspace.current = Some(id);
        workspace
    }

    #[test]
    fn mutations_advance_the_lineage_and_log() {
        let mut workspace = seeded();
        let before = workspace.current_snapshot().unwrap().id;
        let after = workspace
            .reduce(
                ReductionMethod::Pca,
                &ReduceOptions {
                    n_components: 1,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_ne!(before, after);
        assert_eq!(workspace.current_snapshot().unwrap().id, after);
        assert_eq!(workspace.current_frame().unwrap().features, vec!["dim1"]);
        let entries = workspace.history();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, OperationKind::Pca);
        assert_eq!(entries[0].snapshot, Some(after));
    }

    #[test]
    fn analytic_operations_log_without_new_snapshots() {
        let mut workspace = seeded();
        let head = workspace.current_snapshot().unwrap().id;
        let r = workspace
            .correlation("feature1", "feature2", CorrelationMethod::Pearson)
            .unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        assert_eq!(workspace.current_snapshot().unwrap().id, head);
        assert_eq!(workspace.history().len(), 1);
        assert_eq!(
            workspace.history()[0].kind,
            OperationKind::PearsonCorrelation
        );
    }

    #[test]
    fn revert_of_head_mutation_walks_back() {
        let mut workspace = seeded();
        let root = workspace.current_snapshot().unwrap().id;
        workspace
            .delete_feature("feature2")
            .unwrap();
        let entry = workspace.history()[0].id;

        let outcome = workspace.revert(entry).unwrap();
        assert_eq!(outcome, RevertOutcome::Reverted);
        assert_eq!(workspace.current_snapshot().unwrap().id, root);
        assert!(workspace.history()[0].reverted);

        // second revert: flag stays, pointer stays, no error
        let outcome = workspace.revert(entry).unwrap();
        assert_eq!(outcome, RevertOutcome::AlreadyReverted);
        assert_eq!(workspace.current_snapshot().unwrap().id, root);
    }

    #[test]
    fn revert_of_older_entry_marks_log_only() {
        let mut workspace = seeded();
        workspace.delete_feature("feature2").unwrap();
        let first_entry = workspace.history()[0].id;
        workspace
            .add_feature(
                "flag",
                vec![Value::Integer(1); 5],
            )
            .unwrap();
        let head = workspace.current_snapshot().unwrap().id;

        workspace.revert(first_entry).unwrap();
        assert!(workspace.history()[0].reverted);
        assert_eq!(
            workspace.current_snapshot().unwrap().id,
            head,
            "reverting a non-head entry leaves the pointer alone"
        );
    }

    #[test]
    fn redo_after_revert_creates_a_fresh_entry() {
        let mut workspace = seeded();
        workspace.delete_feature("feature2").unwrap();
        let entry = workspace.history()[0].id;
        workspace.revert(entry).unwrap();
        workspace.delete_feature("feature2").unwrap();

        let entries = workspace.history();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].reverted);
        assert!(!entries[1].reverted);
    }

    #[test]
    fn oversample_mutation_uses_label_column() {
        let mut workspace = Workspace::default();
        let mut frame = DataFrame::from_numeric_columns(&[("x", &[1.0, 2.0, 3.0, 9.0])]);
        for (row, label) in ["a", "a", "a", "b"].iter().enumerate() {
            frame.records[row].insert("class".to_string(), Value::from(*label));
        }
        frame.features.push("class".to_string());
        let id = workspace.arena.insert_root("labels", None, frame);
        workspace.current = Some(id);

        workspace
            .oversample("x", "class", OversampleMethod::Random, 1.0, DEFAULT_SEED)
            .unwrap();
        assert_eq!(workspace.current_frame().unwrap().row_count(), 6);
        assert_eq!(
            workspace.history()[0].kind,
            OperationKind::DataOversample
        );
    }

    #[test]
    fn subset_selection_starts_a_new_lineage() {
        let mut workspace = seeded();
        let original_root = workspace.current_snapshot().unwrap().id;
        let subset = workspace
            .select_features(&["feature1".to_string()], None)
            .unwrap();
        assert_ne!(subset, original_root);
        assert_eq!(workspace.current_frame().unwrap().features, vec!["feature1"]);
        let chain = workspace.lineage().unwrap();
        assert_eq!(chain.len(), 1, "subset dataset is its own root");
        assert_eq!(chain[0].previous, None);
    }

    #[test]
    fn empty_workspace_rejects_operations() {
        let mut workspace = Workspace::default();
        let err = workspace
            .correlation("a", "b", CorrelationMethod::Pearson)
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyWorkspace));
    }

    #[test]
    fn workspace_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut workspace = seeded();
        workspace.delete_feature("feature2").unwrap();
        workspace.save(dir.path()).unwrap();

        let restored = Workspace::open(dir.path()).unwrap();
        assert_eq!(restored.history().len(), 1);
        assert_eq!(
            restored.current_frame().unwrap().features,
            vec!["feature1"]
        );
        assert_eq!(restored.lineage().unwrap().len(), 2);
    }
}
