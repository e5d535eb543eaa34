use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use pdftitle_classifier::{TitlePredictor, load_model, load_training_rows, save_model, train};
use pdftitle_core::config_file::save_config;
use pdftitle_core::records::read_gold_records;
use pdftitle_core::{BibtexEntry, extract_first_page_lines, load_title_map};
use pdftitle_corpus::{
    ArxivPdfSource, DatasetStats, ItemStatus, build_training_set_file, download_papers,
    enrich_gold_standard, evaluate_heuristic, find_record, list_pdf_files, sample_corpus,
    write_gold,
};
use pdftitle_pdf_mupdf::MupdfBackend;

mod output;
mod settings;

use output::ColorMode;
use settings::Settings;

/// PDF title extraction - build a weakly-labeled corpus, train a line
/// classifier and read titles off first pages
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Extra TOML config layered over the platform and ./.pdftitle.toml configs
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for sampling and training (overrides PDFTITLE_SEED and config)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample a category-balanced gold standard from the metadata snapshot
    Sample {
        /// Newline-delimited metadata snapshot
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Gold-standard JSONL to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated target categories, in priority order
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,

        /// Reservoir size per category
        #[arg(long)]
        per_category: Option<usize>,
    },

    /// Add a BibTeX entry to every gold record, in place
    Enrich {
        /// Gold-standard JSONL
        #[arg(long)]
        gold: Option<PathBuf>,
    },

    /// Fetch first-page PDFs for the gold records
    Download {
        #[arg(long)]
        gold: Option<PathBuf>,

        /// Directory to store PDFs in
        #[arg(long)]
        pdf_dir: Option<PathBuf>,

        /// Stop after this many new downloads
        #[arg(long)]
        limit: Option<usize>,

        /// User-Agent header (overrides PDFTITLE_USER_AGENT and config)
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Extract and weakly label lines from every downloaded PDF
    BuildDataset {
        #[arg(long)]
        gold: Option<PathBuf>,

        #[arg(long)]
        pdf_dir: Option<PathBuf>,

        /// Training-set JSONL to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Label distribution and font-size summary of a training set
    Stats {
        /// Training-set JSONL
        dataset: Option<PathBuf>,
    },

    /// Train the title classifier and save it
    Train {
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Where to write the model
        #[arg(long)]
        model: Option<PathBuf>,

        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,

        /// Maximum tree depth (unlimited when unset)
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Predict the title of one or more PDFs
    Predict {
        /// PDF files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Score the model-free heuristic against gold titles
    Heuristic {
        #[arg(long)]
        gold: Option<PathBuf>,

        #[arg(long)]
        pdf_dir: Option<PathBuf>,

        /// Only evaluate the first N PDFs
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the extracted first-page lines of a PDF
    Inspect {
        /// PDF file
        file: PathBuf,
    },

    /// Print the BibTeX entry for one gold record
    Bibtex {
        /// Paper id, e.g. 0704.0001
        id: String,

        #[arg(long)]
        gold: Option<PathBuf>,
    },

    /// Show the merged configuration
    Config {
        /// Write it to the platform config file
        #[arg(long)]
        save: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_file = settings::load_layered(cli.config.as_deref())?;
    let mut settings = Settings::resolve(&config_file, cli.seed);
    let color = ColorMode(!cli.no_color);
    let mut out = std::io::stdout();

    match cli.command {
        Command::Sample {
            metadata,
            output,
            categories,
            per_category,
        } => {
            if !categories.is_empty() {
                settings.sampler.categories = categories;
            }
            if let Some(n) = per_category {
                settings.sampler.samples_per_category = n;
            }
            let metadata = metadata.unwrap_or_else(|| settings.paths.metadata.clone());
            let output = output.unwrap_or_else(|| settings.paths.gold.clone());
            sample(&settings, &metadata, &output, &mut out, color)
        }
        Command::Enrich { gold } => {
            let gold = gold.unwrap_or(settings.paths.gold);
            let n = enrich_gold_standard(&gold)?;
            writeln!(out, "Added BibTeX entries to {} records in {}", n, gold.display())?;
            Ok(())
        }
        Command::Download {
            gold,
            pdf_dir,
            limit,
            user_agent,
        } => {
            if let Some(ua) = user_agent {
                settings.download.user_agent = ua;
            }
            settings.download.limit = limit;
            let gold = gold.unwrap_or_else(|| settings.paths.gold.clone());
            let pdf_dir = pdf_dir.unwrap_or_else(|| settings.paths.pdf_dir.clone());
            download(&settings, &gold, &pdf_dir, &mut out, color).await
        }
        Command::BuildDataset {
            gold,
            pdf_dir,
            output,
        } => {
            let gold = gold.unwrap_or(settings.paths.gold);
            let pdf_dir = pdf_dir.unwrap_or(settings.paths.pdf_dir);
            let output = output.unwrap_or(settings.paths.training_set);
            build_dataset(&gold, &pdf_dir, &output, &mut out, color)
        }
        Command::Stats { dataset } => {
            let dataset = dataset.unwrap_or(settings.paths.training_set);
            let rows = load_training_rows(&dataset)?;
            writeln!(out, "{}", DatasetStats::from_rows(&rows))?;
            Ok(())
        }
        Command::Train {
            dataset,
            model,
            trees,
            max_depth,
        } => {
            if let Some(n) = trees {
                settings.training.forest.n_trees = n;
            }
            if max_depth.is_some() {
                settings.training.forest.max_depth = max_depth;
            }
            let dataset = dataset.unwrap_or_else(|| settings.paths.training_set.clone());
            let model = model.unwrap_or_else(|| settings.paths.model.clone());
            train_model(&settings, &dataset, &model, &mut out, color)
        }
        Command::Predict { files, model } => {
            let model = model.unwrap_or(settings.paths.model);
            predict(&files, &model, &mut out, color)
        }
        Command::Heuristic {
            gold,
            pdf_dir,
            limit,
        } => {
            let gold = gold.unwrap_or_else(|| settings.paths.gold.clone());
            let pdf_dir = pdf_dir.unwrap_or_else(|| settings.paths.pdf_dir.clone());
            let titles = load_title_map(&gold)?;
            let mut files = list_pdf_files(&pdf_dir)?;
            if let Some(n) = limit {
                files.truncate(n);
            }
            let eval =
                evaluate_heuristic(&files, &titles, &MupdfBackend::new(), &settings.heuristic);
            output::print_heuristic_evaluation(&mut out, &eval, color)?;
            Ok(())
        }
        Command::Inspect { file } => {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
            let lines = extract_first_page_lines(&file, &MupdfBackend::new())?;
            output::print_lines(&mut out, &lines, color)?;
            Ok(())
        }
        Command::Bibtex { id, gold } => {
            let gold = gold.unwrap_or(settings.paths.gold);
            let record = find_record(&gold, &id)?.ok_or_else(|| {
                anyhow::anyhow!("No gold record with id {} in {}", id, gold.display())
            })?;
            let entry = match record.bibtex {
                Some(ref stored) => stored.clone(),
                None => BibtexEntry::from_record(&record).to_string(),
            };
            writeln!(out, "{}", entry)?;
            Ok(())
        }
        Command::Config { save } => {
            write!(out, "{}", toml::to_string_pretty(&config_file)?)?;
            if save {
                let path = save_config(&config_file).map_err(|e| anyhow::anyhow!(e))?;
                writeln!(out, "Saved to {}", path.display())?;
            }
            Ok(())
        }
    }
}

fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len} (eta {eta})",
        )?
        .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

fn sample(
    settings: &Settings,
    metadata: &Path,
    output: &Path,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !metadata.exists() {
        anyhow::bail!("Metadata file not found: {}", metadata.display());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")?);
    spinner.set_message(format!("Sampling {}...", metadata.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let mut rng = fastrand::Rng::with_seed(settings.sampling_seed);
    let reader = BufReader::with_capacity(1 << 20, File::open(metadata)?);
    let outcome = sample_corpus(reader, &settings.sampler, &mut rng)?;
    spinner.finish_and_clear();

    write_gold(output, &outcome.records)?;
    output::print_sample_summary(out, &outcome, output, color)?;
    Ok(())
}

async fn download(
    settings: &Settings,
    gold: &Path,
    pdf_dir: &Path,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    let parsed = read_gold_records(gold)?;
    let ids: Vec<String> = parsed.records.into_iter().map(|r| r.id).collect();
    let source = ArxivPdfSource::new(&settings.download)?;

    let bar = progress_bar(ids.len() as u64)?;
    let summary = download_papers(&ids, pdf_dir, &source, &settings.download, |id, status| {
        bar.inc(1);
        if let ItemStatus::Downloaded { .. } = status {
            bar.set_message(id.to_string());
        }
    })
    .await?;
    bar.finish_and_clear();

    output::print_download_summary(out, &summary, color)?;
    Ok(())
}

fn build_dataset(
    gold: &Path,
    pdf_dir: &Path,
    output: &Path,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    let titles = load_title_map(gold)?;
    let total = list_pdf_files(pdf_dir)?.len();
    let bar = progress_bar(total as u64)?;

    let summary = build_training_set_file(pdf_dir, &titles, &MupdfBackend::new(), output, |path| {
        bar.inc(1);
        if let Some(name) = path.file_name() {
            bar.set_message(name.to_string_lossy().to_string());
        }
    })?;
    bar.finish_and_clear();

    output::print_training_set_summary(out, &summary, output, color)?;
    Ok(())
}

fn train_model(
    settings: &Settings,
    dataset: &Path,
    model_path: &Path,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    let rows = load_training_rows(dataset)?;
    writeln!(out, "Loaded {} training rows from {}", rows.len(), dataset.display())?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")?);
    spinner.set_message(format!(
        "Training {} trees...",
        settings.training.forest.n_trees
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let outcome = train(&rows, &settings.training)?;
    spinner.finish_and_clear();

    save_model(model_path, &outcome.artifact)?;
    output::print_training_report(out, &outcome, model_path, color)?;
    Ok(())
}

fn predict(
    files: &[PathBuf],
    model_path: &Path,
    out: &mut dyn Write,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !model_path.exists() {
        anyhow::bail!(
            "Model not found at {}. Train one with: pdftitle train",
            model_path.display()
        );
    }
    let predictor = TitlePredictor::new(load_model(model_path)?);
    let backend = MupdfBackend::new();

    let mut failures = 0;
    for file in files {
        match predictor.predict_pdf(file, &backend) {
            Ok(prediction) => output::print_prediction(out, file, &prediction, color)?,
            Err(e) => {
                failures += 1;
                tracing::debug!(path = %file.display(), error = %e, "prediction failed");
                output::print_error_line(out, file, &e, color)?;
            }
        }
    }
    if failures == files.len() {
        anyhow::bail!("No title could be predicted");
    }
    Ok(())
}
