//! Append-only audit log: one entry per engine operation, each carrying a
//! typed parameter record and a monotonic `reverted` flag.
//!
//! The log is an explicitly passed collaborator, owned by the workspace
//! that drives the engine; nothing here is process-global. Entries are
//! never deleted, and `reverted` never resets; re-doing an operation
//! appends a fresh entry instead of un-reverting an old one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    correlate::CorrelationMethod,
    curvefit::CurveFitMethod,
    error::{EngineError, Result},
    extrapolate::ExtrapolationMethod,
    history::SnapshotId,
    interpolate::InterpolationKind,
    oversample::OversampleMethod,
    reduce::ReductionMethod,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    AddFeature,
    DeleteFeature,
    Pca,
    Tsne,
    Umap,
    LinearCurvefitting,
    PolynomialCurvefitting,
    ExponentialCurvefitting,
    LinearInterpolation,
    PolynomialInterpolation,
    SplineInterpolation,
    ExponentialInterpolation,
    LinearExtrapolation,
    PolynomialExtrapolation,
    ExponentialExtrapolation,
    SplineExtrapolation,
    PearsonCorrelation,
    SpearmanCorrelation,
    KendallCorrelation,
    DataOversample,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OperationKind::AddFeature => "ADD_FEATURE",
            OperationKind::DeleteFeature => "DELETE_FEATURE",
            OperationKind::Pca => "PCA",
            OperationKind::Tsne => "TSNE",
            OperationKind::Umap => "UMAP",
            OperationKind::LinearCurvefitting => "LINEAR_CURVEFITTING",
            OperationKind::PolynomialCurvefitting => "POLYNOMIAL_CURVEFITTING",
            OperationKind::ExponentialCurvefitting => "EXPONENTIAL_CURVEFITTING",
            OperationKind::LinearInterpolation => "LINEAR_INTERPOLATION",
            OperationKind::PolynomialInterpolation => "POLYNOMIAL_INTERPOLATION",
            OperationKind::SplineInterpolation => "SPLINE_INTERPOLATION",
            OperationKind::ExponentialInterpolation => "EXPONENTIAL_INTERPOLATION",
            OperationKind::LinearExtrapolation => "LINEAR_EXTRAPOLATION",
            OperationKind::PolynomialExtrapolation => "POLYNOMIAL_EXTRAPOLATION",
            OperationKind::ExponentialExtrapolation => "EXPONENTIAL_EXTRAPOLATION",
            OperationKind::SplineExtrapolation => "SPLINE_EXTRAPOLATION",
            OperationKind::PearsonCorrelation => "PEARSON_CORRELATION",
            OperationKind::SpearmanCorrelation => "SPEARMAN_CORRELATION",
            OperationKind::KendallCorrelation => "KENDALL_CORRELATION",
            OperationKind::DataOversample => "DATA_OVERSAMPLE",
        };
        write!(f, "{label}")
    }
}

impl From<ReductionMethod> for OperationKind {
    fn from(method: ReductionMethod) -> Self {
        match method {
            ReductionMethod::Pca => OperationKind::Pca,
            ReductionMethod::Tsne => OperationKind::Tsne,
            ReductionMethod::Umap => OperationKind::Umap,
        }
    }
}

impl From<CurveFitMethod> for OperationKind {
    fn from(method: CurveFitMethod) -> Self {
        match method {
            CurveFitMethod::Linear => OperationKind::LinearCurvefitting,
            CurveFitMethod::Polynomial => OperationKind::PolynomialCurvefitting,
            CurveFitMethod::Exponential => OperationKind::ExponentialCurvefitting,
        }
    }
}

impl From<InterpolationKind> for OperationKind {
    fn from(kind: InterpolationKind) -> Self {
        match kind {
            InterpolationKind::Linear => OperationKind::LinearInterpolation,
            InterpolationKind::Polynomial => OperationKind::PolynomialInterpolation,
            InterpolationKind::Spline => OperationKind::SplineInterpolation,
            InterpolationKind::Exponential => OperationKind::ExponentialInterpolation,
        }
    }
}

impl From<ExtrapolationMethod> for OperationKind {
    fn from(method: ExtrapolationMethod) -> Self {
        match method {
            ExtrapolationMethod::Linear => OperationKind::LinearExtrapolation,
            ExtrapolationMethod::Polynomial => OperationKind::PolynomialExtrapolation,
            ExtrapolationMethod::Exponential => OperationKind::ExponentialExtrapolation,
            ExtrapolationMethod::Spline => OperationKind::SplineExtrapolation,
        }
    }
}

impl From<CorrelationMethod> for OperationKind {
    fn from(method: CorrelationMethod) -> Self {
        match method {
            CorrelationMethod::Pearson => OperationKind::PearsonCorrelation,
            CorrelationMethod::Spearman => OperationKind::SpearmanCorrelation,
            CorrelationMethod::Kendall => OperationKind::KendallCorrelation,
        }
    }
}

/// Closed parameter schema, one variant per operation family. Malformed
/// entries are unrepresentable, at write time and on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationParams {
    Feature {
        name: String,
    },
    Reduction {
        method: ReductionMethod,
        n_components: usize,
        rows: usize,
    },
    CurveFit {
        x: String,
        y: String,
        method: CurveFitMethod,
        degree: usize,
    },
    Interpolation {
        x: String,
        y: String,
        kind: InterpolationKind,
        num_points: usize,
        degree: usize,
    },
    Extrapolation {
        x: String,
        y: String,
        method: ExtrapolationMethod,
        degree: usize,
        targets: Vec<f64>,
    },
    Correlation {
        x: String,
        y: String,
        method: CorrelationMethod,
    },
    Oversample {
        x: String,
        y: String,
        method: OversampleMethod,
        factor: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: u64,
    pub kind: OperationKind,
    pub timestamp: DateTime<Utc>,
    pub params: OperationParams,
    pub snapshot: Option<SnapshotId>,
    pub reverted: bool,
}

/// Whether a revert call changed anything; a second revert of the same
/// entry is a no-op rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    Reverted,
    AlreadyReverted,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    next_id: u64,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its id.
    pub fn record(
        &mut self,
        kind: OperationKind,
        params: OperationParams,
        snapshot: Option<SnapshotId>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(AuditEntry {
            id,
            kind,
            timestamp: Utc::now(),
            params,
            snapshot,
            reverted: false,
        });
        id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn entry(&self, id: u64) -> Result<&AuditEntry> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .ok_or(EngineError::EntryNotFound(id))
    }

    /// Marks an entry reverted. The flag is monotonic: once set it stays
    /// set, and repeating the call reports `AlreadyReverted`.
    pub fn revert(&mut self, id: u64) -> Result<RevertOutcome> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(EngineError::EntryNotFound(id))?;
        if entry.reverted {
            return Ok(RevertOutcome::AlreadyReverted);
        }
        entry.reverted = true;
        Ok(RevertOutcome::Reverted)
    }
}
