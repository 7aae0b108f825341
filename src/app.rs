//! Command handlers: resolve the dataset source, invoke the engine, render
//! or persist the result, and keep workspace runs audited.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    cli::{
        AddFeatureArgs, CorrelateArgs, DeleteFeatureArgs, ExportArgs, ExtrapolateArgs, FitArgs,
        IngestArgs, InterpolateArgs, LineageArgs, LogArgs, OversampleArgs, RecommendArgs,
        ReduceArgs, RevertArgs, SelectArgs, SourceArgs, SuggestArgs, SuggestMode, SummaryArgs,
    },
    correlate, curvefit,
    data::Value,
    extrapolate,
    frame::DataFrame,
    interpolate::{self, InterpolateOptions},
    io_utils, oversample, reduce,
    reduce::ReduceOptions,
    suggest, summary, table,
    workspace::Workspace,
};

enum Source {
    File(DataFrame),
    Workspace { dir: PathBuf, workspace: Workspace },
}

fn resolve(source: &SourceArgs) -> Result<Source> {
    match (&source.input, &source.workspace) {
        (Some(_), Some(_)) => bail!("Provide either --input or --workspace, not both"),
        (Some(path), None) => Ok(Source::File(
            io_utils::load_table(path).with_context(|| format!("Loading {path:?}"))?,
        )),
        (None, Some(dir)) => Ok(Source::Workspace {
            dir: dir.clone(),
            workspace: Workspace::open(dir)?,
        }),
        (None, None) => bail!("Provide --input <file> or --workspace <dir>"),
    }
}

fn emit(frame: &DataFrame, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            io_utils::write_csv(frame, path)
                .with_context(|| format!("Writing output to {path:?}"))?;
            info!("Wrote {} row(s) to {:?}", frame.row_count(), path);
        }
        None => io_utils::write_csv_to(frame, io::stdout().lock())?,
    }
    Ok(())
}

pub fn ingest(args: &IngestArgs) -> Result<()> {
    let mut workspace = Workspace::open(&args.workspace)?;
    let id = workspace
        .ingest(&args.input, args.name.clone())
        .with_context(|| format!("Ingesting {:?}", args.input))?;
    workspace.save(&args.workspace)?;
    info!("Workspace {:?} now tracks snapshot {id}", args.workspace);
    Ok(())
}

pub fn summary(args: &SummaryArgs) -> Result<()> {
    let report = match resolve(&args.source)? {
        Source::File(frame) => summary::summarize(&frame),
        Source::Workspace { workspace, .. } => workspace.summary()?,
    };
    info!("Dataset shape: {} row(s) x {} column(s)", report.rows, report.columns);
    let headers = vec![
        "column".to_string(),
        "missing".to_string(),
        "mean".to_string(),
    ];
    table::print_table(&headers, &report.render_rows());
    Ok(())
}

pub fn reduce(args: &ReduceArgs) -> Result<()> {
    let options = ReduceOptions {
        n_components: args.components,
        perplexity: args.perplexity,
        n_neighbors: args.neighbors,
        seed: args.seed,
    };
    let reduced = match resolve(&args.source)? {
        Source::File(frame) => reduce::reduce(&frame, args.method, &options)
            .with_context(|| format!("Applying {}", args.method))?,
        Source::Workspace { dir, mut workspace } => {
            workspace
                .reduce(args.method, &options)
                .with_context(|| format!("Applying {}", args.method))?;
            workspace.save(&dir)?;
            workspace.current_frame()?.clone()
        }
    };
    emit(&reduced, args.output.as_deref())
}

pub fn recommend(args: &RecommendArgs) -> Result<()> {
    let recommendations = match resolve(&args.source)? {
        Source::File(frame) => reduce::recommend(&frame),
        Source::Workspace { workspace, .. } => reduce::recommend(workspace.current_frame()?),
    };
    let headers = vec![
        "method".to_string(),
        "n_components".to_string(),
        "perplexity".to_string(),
        "n_neighbors".to_string(),
    ];
    let rows = recommendations
        .iter()
        .map(|r| {
            vec![
                r.method.to_string(),
                r.n_components.to_string(),
                r.perplexity.map(|p| p.to_string()).unwrap_or_default(),
                r.n_neighbors.map(|n| n.to_string()).unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

pub fn fit(args: &FitArgs) -> Result<()> {
    let fit = match resolve(&args.source)? {
        Source::File(frame) => {
            curvefit::fit_curve(&frame, &args.x, &args.y, args.method, args.degree)
                .with_context(|| format!("Fitting {} curve", args.method))?
        }
        Source::Workspace { dir, mut workspace } => {
            let fit = workspace
                .fit_curve(&args.x, &args.y, args.method, args.degree)
                .with_context(|| format!("Fitting {} curve", args.method))?;
            workspace.save(&dir)?;
            fit
        }
    };
    let headers = vec!["parameter".to_string(), "value".to_string()];
    let rows = fit
        .params
        .iter()
        .enumerate()
        .map(|(idx, value)| vec![format!("p{idx}"), format!("{value:.6}")])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    match &fit.covariance {
        Some(covariance) => info!("Covariance: {covariance:?}"),
        None => info!("No covariance estimate for this method"),
    }
    if let Some(output) = &args.output {
        io_utils::write_csv(&fit.curve, output)
            .with_context(|| format!("Writing fitted curve to {output:?}"))?;
        info!("Wrote fitted curve to {output:?}");
    }
    Ok(())
}

pub fn interpolate(args: &InterpolateArgs) -> Result<()> {
    let options = InterpolateOptions {
        num_points: args.points,
        min_value: args.min,
        max_value: args.max,
        degree: args.degree,
    };
    let result = match resolve(&args.source)? {
        Source::File(frame) => {
            interpolate::interpolate(&frame, &args.x, &args.y, args.kind, &options)
                .with_context(|| format!("{} interpolation", args.kind))?
        }
        Source::Workspace { dir, mut workspace } => {
            let result = workspace
                .interpolate(&args.x, &args.y, args.kind, &options)
                .with_context(|| format!("{} interpolation", args.kind))?;
            workspace.save(&dir)?;
            result
        }
    };
    emit(&result, args.output.as_deref())
}

pub fn extrapolate(args: &ExtrapolateArgs) -> Result<()> {
    let result = match resolve(&args.source)? {
        Source::File(frame) => extrapolate::extrapolate(
            &frame,
            &args.x,
            &args.y,
            &args.targets,
            args.method,
            args.degree,
        )
        .with_context(|| format!("{} extrapolation", args.method))?,
        Source::Workspace { dir, mut workspace } => {
            let result = workspace
                .extrapolate(&args.x, &args.y, &args.targets, args.method, args.degree)
                .with_context(|| format!("{} extrapolation", args.method))?;
            workspace.save(&dir)?;
            result
        }
    };
    emit(&result, args.output.as_deref())
}

pub fn correlate(args: &CorrelateArgs) -> Result<()> {
    let value = match resolve(&args.source)? {
        Source::File(frame) => correlate::correlation(&frame, &args.x, &args.y, args.method)?,
        Source::Workspace { dir, mut workspace } => {
            let value = workspace.correlation(&args.x, &args.y, args.method)?;
            workspace.save(&dir)?;
            value
        }
    };
    let headers = vec![
        "x".to_string(),
        "y".to_string(),
        "method".to_string(),
        "correlation".to_string(),
    ];
    let rows = vec![vec![
        args.x.clone(),
        args.y.clone(),
        args.method.to_string(),
        format!("{value:.6}"),
    ]];
    table::print_table(&headers, &rows);
    Ok(())
}

pub fn suggest(args: &SuggestArgs) -> Result<()> {
    let frame = match resolve(&args.source)? {
        Source::File(frame) => frame,
        Source::Workspace { workspace, .. } => workspace.current_frame()?.clone(),
    };
    match args.mode {
        SuggestMode::Drop => {
            let threshold = args
                .correlation_threshold
                .unwrap_or(suggest::DEFAULT_DROP_CORRELATION);
            let drops = suggest::suggest_dropping(&frame, threshold, args.variance_threshold)?;
            info!("{} feature(s) suggested for dropping", drops.len());
            let rows = drops.into_iter().map(|name| vec![name]).collect::<Vec<_>>();
            table::print_table(&["feature".to_string()], &rows);
        }
        SuggestMode::Combine => {
            let threshold = args
                .correlation_threshold
                .unwrap_or(suggest::DEFAULT_COMBINE_CORRELATION);
            let pairs = suggest::suggest_combining(&frame, threshold)?;
            info!("{} pair(s) suggested for combining", pairs.len());
            let headers = vec![
                "feature_a".to_string(),
                "feature_b".to_string(),
                "correlation".to_string(),
            ];
            let rows = pairs
                .iter()
                .map(|p| {
                    vec![
                        p.features[0].clone(),
                        p.features[1].clone(),
                        format!("{:.4}", p.correlation),
                    ]
                })
                .collect::<Vec<_>>();
            table::print_table(&headers, &rows);
        }
    }
    Ok(())
}

pub fn oversample(args: &OversampleArgs) -> Result<()> {
    let resampled = match resolve(&args.source)? {
        Source::File(frame) => oversample::oversample(
            &frame,
            &args.x,
            &args.y,
            args.method,
            args.factor,
            args.seed,
        )
        .with_context(|| format!("{} oversampling", args.method))?,
        Source::Workspace { dir, mut workspace } => {
            workspace
                .oversample(&args.x, &args.y, args.method, args.factor, args.seed)
                .with_context(|| format!("{} oversampling", args.method))?;
            workspace.save(&dir)?;
            workspace.current_frame()?.clone()
        }
    };
    emit(&resampled, args.output.as_deref())
}

pub fn select(args: &SelectArgs) -> Result<()> {
    let mut workspace = Workspace::open(&args.workspace)?;
    let id = workspace
        .select_features(&args.features, args.name.clone())
        .context("Creating subset dataset")?;
    workspace.save(&args.workspace)?;
    info!(
        "Subset with {} feature(s) is now current as snapshot {id}",
        args.features.len()
    );
    Ok(())
}

pub fn add_feature(args: &AddFeatureArgs) -> Result<()> {
    let mut workspace = Workspace::open(&args.workspace)?;
    let values = args
        .values
        .iter()
        .map(|raw| Value::infer(raw))
        .collect::<Vec<_>>();
    let id = workspace
        .add_feature(&args.name, values)
        .with_context(|| format!("Adding feature '{}'", args.name))?;
    workspace.save(&args.workspace)?;
    info!("Added feature '{}' in snapshot {id}", args.name);
    Ok(())
}

pub fn delete_feature(args: &DeleteFeatureArgs) -> Result<()> {
    let mut workspace = Workspace::open(&args.workspace)?;
    let id = workspace
        .delete_feature(&args.name)
        .with_context(|| format!("Deleting feature '{}'", args.name))?;
    workspace.save(&args.workspace)?;
    info!("Deleted feature '{}' in snapshot {id}", args.name);
    Ok(())
}

pub fn export(args: &ExportArgs) -> Result<()> {
    let workspace = Workspace::open(&args.workspace)?;
    let frame = workspace.current_frame()?;
    io_utils::write_csv(frame, &args.output)
        .with_context(|| format!("Exporting to {:?}", args.output))?;
    info!(
        "Exported {} row(s) x {} column(s) to {:?}",
        frame.row_count(),
        frame.features.len(),
        args.output
    );
    Ok(())
}

pub fn log(args: &LogArgs) -> Result<()> {
    let workspace = Workspace::open(&args.workspace)?;
    let headers = vec![
        "id".to_string(),
        "kind".to_string(),
        "timestamp".to_string(),
        "snapshot".to_string(),
        "reverted".to_string(),
    ];
    let rows = workspace
        .history()
        .iter()
        .map(|entry| {
            vec![
                entry.id.to_string(),
                entry.kind.to_string(),
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry
                    .snapshot
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                entry.reverted.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

pub fn revert(args: &RevertArgs) -> Result<()> {
    let mut workspace = Workspace::open(&args.workspace)?;
    let outcome = workspace
        .revert(args.entry)
        .with_context(|| format!("Reverting entry {}", args.entry))?;
    workspace.save(&args.workspace)?;
    info!("Entry {}: {outcome:?}", args.entry);
    Ok(())
}

pub fn lineage(args: &LineageArgs) -> Result<()> {
    let workspace = Workspace::open(&args.workspace)?;
    let current = workspace.current_snapshot()?.id;
    let headers = vec![
        "snapshot".to_string(),
        "name".to_string(),
        "created".to_string(),
        "rows".to_string(),
        "columns".to_string(),
        "current".to_string(),
    ];
    let rows = workspace
        .lineage()?
        .iter()
        .map(|snapshot| {
            vec![
                snapshot.id.to_string(),
                snapshot.name.clone(),
                snapshot.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                snapshot.frame.row_count().to_string(),
                snapshot.frame.features.len().to_string(),
                if snapshot.id == current { "*" } else { "" }.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}
