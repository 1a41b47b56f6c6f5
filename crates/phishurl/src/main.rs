use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use phishurl_core::config::{Config, Profile};
use phishurl_core::persist::load_state;
use phishurl_core::{
    FeatureExtractor, FeatureMatrix, FittedPipelineState, LinearModel, PhishingDetector,
    PipelineConfig, UrlFeaturePipeline,
};
use tracing_subscriber::EnvFilter;
const MAX_INPUT_BYTES: u64 = 1024 * 1024 * 1024;
const MAX_INPUT_LINES: usize = 50_000_000;
const MAX_MODEL_BYTES: u64 = 512 * 1024 * 1024;
#[derive(Parser)]
#[command(name = "phishurl", version)]
struct Args {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    profile: Option<String>,
    #[command(subcommand)]
    command: Command,
}
#[derive(Subcommand)]
enum Command {
    #[command(about = "Fit the pipeline on a URL corpus and write its state")]
    Fit {
        #[arg(short, long, help = "Text file with one URL per line")]
        input: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    #[command(about = "Transform URLs with a fitted state and export the feature matrix")]
    ExportFeatures {
        #[arg(long)]
        state: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value = "jsonl", value_parser = ["jsonl", "csv"])]
        format: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long, alias = "seq")]
        sequential: bool,
    },
    #[command(about = "Print the lexical features of one URL as JSON")]
    Features { url: String },
    #[command(about = "Summarise a persisted pipeline state")]
    Inspect {
        #[arg(long)]
        state: PathBuf,
        #[arg(long, help = "Also list every column name")]
        columns: bool,
    },
    #[command(about = "Score URLs with a fitted state and a linear model")]
    Score {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        model: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        threshold: Option<f64>,
    },
}
fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Some(Config::load(path)?),
        None => None,
    };
    init_logging(config.as_ref());
    let profile = config
        .as_ref()
        .and_then(|c| c.select_profile(args.profile.as_deref()));
    match args.command {
        Command::Fit { input, out } => run_fit(&input, &out, config.as_ref(), profile),
        Command::ExportFeatures {
            state,
            input,
            format,
            out,
            sequential,
        } => run_export_features(&state, &input, &format, out.as_deref(), sequential),
        Command::Features { url } => run_features(&url),
        Command::Inspect { state, columns } => run_inspect(&state, columns),
        Command::Score {
            state,
            model,
            input,
            threshold,
        } => {
            let threshold = threshold
                .or_else(|| config.as_ref().map(|c| c.threshold(profile)))
                .unwrap_or(phishurl_core::PHISHING_THRESHOLD);
            run_score(&state, &model, &input, threshold)
        }
    }
}
fn init_logging(config: Option<&Config>) {
    let fallback = config.and_then(|c| c.log_level()).unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
fn run_fit(
    input: &Path,
    out: &Path,
    config: Option<&Config>,
    profile: Option<&Profile>,
) -> Result<()> {
    let mut pipeline_config = PipelineConfig::default();
    if let Some(cfg) = config {
        cfg.apply(&mut pipeline_config, profile);
    }
    let urls = read_urls(input)?;
    let mut pipeline = UrlFeaturePipeline::new(pipeline_config);
    let state = pipeline.fit(&urls)?;
    let summary = serde_json::json!({
        "rows": urls.len(),
        "path_query_terms": state.path_query().vocabulary().len(),
        "domain_terms": state.domain().vocabulary().len(),
        "columns": state.n_features(),
        "state": out.display().to_string(),
    });
    pipeline.save(out)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
fn run_export_features(
    state_path: &Path,
    input: &Path,
    format: &str,
    out: Option<&Path>,
    sequential: bool,
) -> Result<()> {
    let state = load_state(state_path)?;
    let urls = read_urls(input)?;
    let matrix = if sequential {
        state.transform(&urls)?
    } else {
        state.transform_parallel(&urls)?
    };
    let mut writer: Box<dyn Write> = if let Some(path) = out {
        Box::new(std::io::BufWriter::new(fs::File::create(path)?))
    } else {
        Box::new(std::io::BufWriter::new(std::io::stdout()))
    };
    match format {
        "jsonl" => write_jsonl(&mut writer, &urls, &matrix)?,
        "csv" => write_csv(&mut writer, &state, &urls, &matrix)?,
        _ => return Err(anyhow!("unsupported format: {}", format)),
    }
    writer.flush()?;
    Ok(())
}
/// One object per URL holding only its non-zero columns.
fn write_jsonl(writer: &mut dyn Write, urls: &[String], matrix: &FeatureMatrix) -> Result<()> {
    for (r, url) in urls.iter().enumerate() {
        let (indices, values): (Vec<usize>, Vec<f64>) = matrix.row(r).unzip();
        let record = serde_json::json!({
            "url": url,
            "n_cols": matrix.n_cols(),
            "indices": indices,
            "values": values,
        });
        writer.write_all(serde_json::to_string(&record)?.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
fn write_csv(
    writer: &mut dyn Write,
    state: &FittedPipelineState,
    urls: &[String],
    matrix: &FeatureMatrix,
) -> Result<()> {
    let mut header = String::from("url");
    for name in state.column_names() {
        header.push(',');
        header.push_str(&csv_field(&name));
    }
    header.push('\n');
    writer.write_all(header.as_bytes())?;
    for (r, url) in urls.iter().enumerate() {
        let mut row = csv_field(url);
        for v in matrix.dense_row(r) {
            row.push(',');
            row.push_str(&format!("{:.6}", v));
        }
        row.push('\n');
        writer.write_all(row.as_bytes())?;
    }
    Ok(())
}
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
fn run_features(url: &str) -> Result<()> {
    let features = FeatureExtractor::extract(url);
    println!("{}", serde_json::to_string_pretty(&features)?);
    Ok(())
}
fn run_inspect(state_path: &Path, columns: bool) -> Result<()> {
    let state = load_state(state_path)?;
    let layout = state.layout();
    let mut summary = serde_json::json!({
        "config": state.config(),
        "documents": state.path_query().vocabulary().document_count(),
        "lexical_columns": layout.lexical(),
        "path_query_columns": layout.path_query(),
        "domain_columns": layout.domain(),
        "columns": state.n_features(),
    });
    if columns {
        summary["column_names"] = serde_json::json!(state.column_names());
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
fn run_score(state_path: &Path, model_path: &Path, input: &Path, threshold: f64) -> Result<()> {
    if let Ok(meta) = fs::metadata(model_path) {
        if meta.len() > MAX_MODEL_BYTES {
            return Err(anyhow!(
                "model {} exceeds {} bytes",
                model_path.display(),
                MAX_MODEL_BYTES
            ));
        }
    }
    let model = LinearModel::load_from_file(model_path)?;
    let detector = PhishingDetector::load(state_path, model, threshold)?;
    let urls = read_urls(input)?;
    let predictions = detector.predict(&urls)?;
    let out = serde_json::json!({
        "threshold": detector.threshold(),
        "predictions": predictions.iter().map(|p| p.prediction).collect::<Vec<_>>(),
        "probabilities": predictions.iter().map(|p| p.probability).collect::<Vec<_>>(),
        "labels": predictions.iter().map(|p| p.label.as_str()).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
/// One URL per line. Blank lines are kept so row indices match line numbers.
fn read_urls(path: &Path) -> Result<Vec<String>> {
    let data = read_text_with_limit(path, MAX_INPUT_BYTES)?;
    let mut urls: Vec<String> = data
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    if data.ends_with('\n') || data.is_empty() {
        urls.pop();
    }
    if urls.len() > MAX_INPUT_LINES {
        return Err(anyhow!(
            "{} has {} lines (max {})",
            path.display(),
            urls.len(),
            MAX_INPUT_LINES
        ));
    }
    Ok(urls)
}
fn read_text_with_limit(path: &Path, max_bytes: u64) -> Result<String> {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() > max_bytes {
            tracing::warn!(
                path = %path.display(),
                bytes = meta.len(),
                limit = max_bytes,
                "Input rejected: size limit"
            );
            return Err(anyhow!("file {} exceeds {} bytes", path.display(), max_bytes));
        }
    }
    fs::read_to_string(path).map_err(|e| anyhow!("failed to read {}: {}", path.display(), e))
}
#[cfg(test)]
mod tests {
    use super::{csv_field, read_urls};
    #[test]
    fn read_urls_keeps_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "http://a.com\r\n\nhttps://b.org/x\n").unwrap();
        let urls = read_urls(&path).unwrap();
        assert_eq!(urls, vec!["http://a.com", "", "https://b.org/x"]);
    }
    #[test]
    fn read_urls_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "http://a.com").unwrap();
        assert_eq!(read_urls(&path).unwrap(), vec!["http://a.com"]);
        std::fs::write(&path, "").unwrap();
        assert!(read_urls(&path).unwrap().is_empty());
    }
    #[test]
    fn csv_field_quotes_commas() {
        assert_eq!(csv_field("http://a.com/x"), "http://a.com/x");
        assert_eq!(csv_field("http://a.com/?q=a,b"), "\"http://a.com/?q=a,b\"");
        assert_eq!(csv_field("a\"b"), "\"a\"\"b\"");
    }
}
