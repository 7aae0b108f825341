use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    correlate::CorrelationMethod,
    curvefit::CurveFitMethod,
    extrapolate::ExtrapolationMethod,
    interpolate::InterpolationKind,
    oversample::OversampleMethod,
    reduce::ReductionMethod,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore, transform, and version tabular datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a CSV/XLSX file into a workspace as a new dataset lineage
    Ingest(IngestArgs),
    /// Show shape, missing-value counts, and per-column means
    Summary(SummaryArgs),
    /// Reduce the numeric features to k components (PCA, t-SNE, UMAP)
    Reduce(ReduceArgs),
    /// Suggest reduction methods based on the feature count
    Recommend(RecommendArgs),
    /// Fit a curve through two columns and sample it
    Fit(FitArgs),
    /// Resample two columns over an evenly spaced grid
    Interpolate(InterpolateArgs),
    /// Predict y at explicit x targets beyond the observed range
    Extrapolate(ExtrapolateArgs),
    /// Compute the correlation between two columns
    Correlate(CorrelateArgs),
    /// Suggest features to drop or combine
    Suggest(SuggestArgs),
    /// Grow minority classes by SMOTE or random duplication
    Oversample(OversampleArgs),
    /// Create a new dataset from a subset of the current features
    Select(SelectArgs),
    /// Append a feature with explicit values to the current dataset
    AddFeature(AddFeatureArgs),
    /// Remove a feature from the current dataset
    DeleteFeature(DeleteFeatureArgs),
    /// Write the current dataset snapshot as CSV
    Export(ExportArgs),
    /// Print the audit log
    Log(LogArgs),
    /// Mark an audit entry reverted (undoes the head mutation)
    Revert(RevertArgs),
    /// Print the snapshot chain for the current dataset
    Lineage(LineageArgs),
}

/// Dataset source shared by the analysis commands: a bare file for one-off
/// runs, or a workspace directory for versioned, audited runs.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input CSV/XLSX file (stateless run)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Workspace directory (versioned run; see `ingest`)
    #[arg(short = 'w', long = "workspace")]
    pub workspace: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Input CSV/XLSX file to load
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Workspace directory to create or extend
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
    /// Dataset name (defaults to the file stem)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ReduceArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Reduction method
    #[arg(short, long, value_enum, default_value = "pca")]
    pub method: ReductionMethod,
    /// Number of output components
    #[arg(short = 'k', long, default_value_t = 2)]
    pub components: usize,
    /// Perplexity for t-SNE
    #[arg(long, default_value_t = 30.0)]
    pub perplexity: f64,
    /// Neighbourhood size for UMAP
    #[arg(long, default_value_t = 15)]
    pub neighbors: usize,
    /// Seed for the stochastic embeddings
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct FitArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Column holding the independent variable
    #[arg(short, long)]
    pub x: String,
    /// Column holding the dependent variable
    #[arg(short, long)]
    pub y: String,
    /// Fitting method
    #[arg(short, long, value_enum, default_value = "linear")]
    pub method: CurveFitMethod,
    /// Polynomial degree (polynomial method only)
    #[arg(short, long, default_value_t = 2.0)]
    pub degree: f64,
    /// Write the sampled curve to this CSV file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InterpolateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Column holding the independent variable
    #[arg(short, long)]
    pub x: String,
    /// Column holding the dependent variable
    #[arg(short, long)]
    pub y: String,
    /// Interpolation kind
    #[arg(short, long, value_enum, default_value = "linear")]
    pub kind: InterpolationKind,
    /// Number of generated samples
    #[arg(short = 'n', long, default_value_t = 100)]
    pub points: usize,
    /// Range start (defaults to the observed minimum of x)
    #[arg(long)]
    pub min: Option<f64>,
    /// Range end (defaults to the observed maximum of x)
    #[arg(long)]
    pub max: Option<f64>,
    /// Degree for the polynomial and spline kinds
    #[arg(short, long, default_value_t = 3.0)]
    pub degree: f64,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExtrapolateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Column holding the independent variable
    #[arg(short, long)]
    pub x: String,
    /// Column holding the dependent variable
    #[arg(short, long)]
    pub y: String,
    /// Target x values to predict at
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub targets: Vec<f64>,
    /// Extrapolation method
    #[arg(short, long, value_enum, default_value = "linear")]
    pub method: ExtrapolationMethod,
    /// Degree for the polynomial method
    #[arg(short, long, default_value_t = 2.0)]
    pub degree: f64,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CorrelateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// First column
    #[arg(short, long)]
    pub x: String,
    /// Second column
    #[arg(short, long)]
    pub y: String,
    /// Correlation method
    #[arg(short, long, value_enum, default_value = "pearson")]
    pub method: CorrelationMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum SuggestMode {
    Drop,
    Combine,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Whether to suggest features to drop or pairs to combine
    #[arg(long, value_enum, default_value = "drop")]
    pub mode: SuggestMode,
    /// Correlation threshold (defaults: 0.95 for drop, 0.9 for combine)
    #[arg(long)]
    pub correlation_threshold: Option<f64>,
    /// Variance threshold for the drop mode
    #[arg(long, default_value_t = 0.01)]
    pub variance_threshold: f64,
}

#[derive(Debug, Args)]
pub struct OversampleArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Feature column to resample
    #[arg(short, long)]
    pub x: String,
    /// Class label column
    #[arg(short, long)]
    pub y: String,
    /// Oversampling method
    #[arg(short, long, value_enum, default_value = "smote")]
    pub method: OversampleMethod,
    /// Oversample factor applied to class counts
    #[arg(short, long, default_value_t = 1.0)]
    pub factor: f64,
    /// Seed for sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Workspace directory
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
    /// Comma-separated features to keep, in order
    #[arg(short = 'C', long = "features", value_delimiter = ',', required = true)]
    pub features: Vec<String>,
    /// Name for the new dataset (defaults to "<parent> (subset)")
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddFeatureArgs {
    /// Workspace directory
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
    /// Name of the feature to add
    #[arg(long)]
    pub name: String,
    /// Comma-separated values, one per row
    #[arg(long, value_delimiter = ',', required = true)]
    pub values: Vec<String>,
}

#[derive(Debug, Args)]
pub struct DeleteFeatureArgs {
    /// Workspace directory
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
    /// Name of the feature to remove
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Workspace directory
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
    /// Destination CSV file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Workspace directory
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
}

#[derive(Debug, Args)]
pub struct RevertArgs {
    /// Workspace directory
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
    /// Audit entry id to revert (see `log`)
    #[arg(long)]
    pub entry: u64,
}

#[derive(Debug, Args)]
pub struct LineageArgs {
    /// Workspace directory
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,
}
