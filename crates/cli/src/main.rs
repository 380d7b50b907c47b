use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use html2epub_core::batch;
use html2epub_core::extract::extract_zip;
use html2epub_core::folder::InputFolder;
use html2epub_core::job::{make_file, pack_tree};
use html2epub_core::merge::merge_folder;
use html2epub_core::pack::save;

#[derive(Parser)]
#[command(name = "html2epub")]
#[command(about = "Convert folders of HTML into EPUB books")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one input folder or zip into an EPUB
    Make {
        /// Input folder or zip archive
        input: PathBuf,

        /// Output file, overriding the book's configured output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory to place the output in
        #[arg(long)]
        outdir: Option<PathBuf>,
    },

    /// Convert many inputs: a directory of book folders/zips, or a list file
    Batch {
        /// Directory of inputs, or a text file with one input path per line
        input: PathBuf,

        /// Directory to place the outputs in
        #[arg(long)]
        outdir: Option<PathBuf>,
    },

    /// Re-pack an unpacked EPUB tree without converting it
    Pack {
        /// Folder or zip holding the unpacked tree
        input: PathBuf,

        /// Output file
        output: PathBuf,
    },

    /// Merge a folder of HTML files into a single document
    Merge {
        /// Folder of HTML files
        input: PathBuf,

        /// Output file
        output: PathBuf,
    },

    /// Unpack an EPUB or zip into a directory
    Extract {
        /// Archive to unpack
        input: PathBuf,

        /// Directory to unpack into
        outdir: PathBuf,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let result = match &cli.command {
        Commands::Make {
            input,
            output,
            outdir,
        } => run_make(input, outdir.as_deref(), output.as_deref()),
        Commands::Batch { input, outdir } => run_batch(input, outdir.as_deref()),
        Commands::Pack { input, output } => run_pack(input, output),
        Commands::Merge { input, output } => run_merge(input, output),
        Commands::Extract { input, outdir } => run_extract(input, outdir),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_make(input: &Path, outdir: Option<&Path>, output: Option<&Path>) -> CliResult {
    let written = make_file(input, outdir, output)?;
    println!("{}", written.display());
    Ok(())
}

fn run_batch(input: &Path, outdir: Option<&Path>) -> CliResult {
    let inputs = batch::collect_inputs(input)?;
    if inputs.is_empty() {
        eprintln!("No inputs found under {}", input.display());
        return Ok(());
    }

    let bar = ProgressBar::new(inputs.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40} {pos}/{len} {msg}",
    )?);
    let report = batch::run_batch(&inputs, outdir, |item, _result| {
        bar.set_message(item.display().to_string());
        bar.inc(1);
    });
    bar.finish_and_clear();

    println!(
        "total: {}, succeeded: {}, failed: {}",
        report.total,
        report.succeeded(),
        report.failed()
    );
    for (item, message) in &report.failures {
        eprintln!("Failed: {} - {}", item.display(), message);
    }
    if !report.all_succeeded() {
        return Err(format!("{} of {} items failed", report.failed(), report.total).into());
    }
    Ok(())
}

fn run_pack(input: &Path, output: &Path) -> CliResult {
    let mut folder = InputFolder::open_path(input)?;
    let data = pack_tree(&mut folder)?;
    save(&data, output)?;
    println!("{}", output.display());
    Ok(())
}

fn run_merge(input: &Path, output: &Path) -> CliResult {
    let merged = merge_folder(input)?;
    std::fs::write(output, merged)?;
    println!("{}", output.display());
    Ok(())
}

fn run_extract(input: &Path, outdir: &Path) -> CliResult {
    extract_zip(input, outdir)?;
    println!("{}", outdir.display());
    Ok(())
}
