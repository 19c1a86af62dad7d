//! formpdf CLI - PDF form detection and generation tool

mod template;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use formpdf::detect::{spawn_analysis, AnalysisEvent};
use formpdf::{
    add_fields_to_pdf, generate_form, locate_box, sniff_path, AnalysisResult, AnalyzerConfig,
    DocumentAnalyzer, Lexicon, PdfDocument,
};

use template::Template;

#[derive(Parser)]
#[command(name = "formpdf")]
#[command(version)]
#[command(about = "Detect PDF form fields and generate fillable forms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the form fields of a PDF
    Analyze {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Write the result to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Label vocabulary
        #[arg(long, value_enum, default_value = "es")]
        lexicon: LexiconChoice,

        /// Skip the raster line detector
        #[arg(long)]
        vector_only: bool,

        /// Detect pages one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Generate a fillable PDF from a template
    Generate {
        /// Template JSON file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Document drawn beneath every page
        #[arg(long, value_name = "PDF")]
        background: Option<PathBuf>,

        /// Title, overriding the template's
        #[arg(long)]
        title: Option<String>,

        /// JSON object of default values keyed by field label
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,

        /// Do not draw labels for absolutely positioned fields
        #[arg(long)]
        no_labels: bool,
    },

    /// Add positioned fields to an existing PDF without redrawing it
    Overlay {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Template or field list JSON file
        #[arg(value_name = "FIELDS")]
        fields: PathBuf,

        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Find the drawn box around a point (top-left page points)
    Locate {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Horizontal position
        #[arg(short)]
        x: f32,

        /// Vertical position, from the top of the page
        #[arg(short)]
        y: f32,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty JSON analysis result
    Json,
    /// Template JSON, ready for `generate`
    Template,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LexiconChoice {
    /// Spanish labels and headings
    Es,
    /// English labels and headings
    En,
}

impl From<LexiconChoice> for Lexicon {
    fn from(choice: LexiconChoice) -> Self {
        match choice {
            LexiconChoice::Es => Lexicon::spanish(),
            LexiconChoice::En => Lexicon::english(),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            output,
            format,
            lexicon,
            vector_only,
            sequential,
        } => {
            let mut config = AnalyzerConfig::new().with_lexicon(lexicon.into());
            if vector_only {
                config = config.vector_only();
            }
            if sequential {
                config = config.sequential();
            }
            cmd_analyze(&input, output.as_deref(), format, config)
        }
        Commands::Generate {
            template,
            output,
            background,
            title,
            values,
            no_labels,
        } => cmd_generate(
            &template,
            &output,
            background,
            title,
            values.as_deref(),
            no_labels,
        ),
        Commands::Overlay {
            input,
            fields,
            output,
        } => cmd_overlay(&input, &fields, &output),
        Commands::Locate { input, page, x, y } => cmd_locate(&input, page, x, y),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_analyze(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    config: AnalyzerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = spawn_analysis(DocumentAnalyzer::with_config(config), input)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] page {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let mut result = None;
    for event in handle.events().iter() {
        match event {
            AnalysisEvent::Progress { current, total } => {
                pb.set_length(total as u64);
                pb.set_position(current as u64);
            }
            AnalysisEvent::Finished(r) => {
                result = Some(r);
                break;
            }
        }
    }
    pb.finish_and_clear();

    let result = match result {
        Some(result) => result,
        None => handle.wait(),
    };
    if !result.success {
        return Err(result
            .error
            .unwrap_or_else(|| "analysis failed".to_string())
            .into());
    }

    let rendered = match format {
        OutputFormat::Table => render_table(input, &result),
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Template => {
            serde_json::to_string_pretty(&Template::from_fields(result.title.clone(), &result.fields))?
        }
    };

    if let Some(path) = output {
        fs::write(path, &rendered)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

fn render_table(input: &Path, result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", input.display().to_string().cyan().bold()));
    if let Some(title) = &result.title {
        out.push_str(&format!("{}: {}\n", "Title".bold(), title));
    }
    let source = if result.has_acroform {
        "AcroForm"
    } else {
        "visual detection"
    };
    out.push_str(&format!(
        "{}: {} ({} fields, {} pages)\n",
        "Source".bold(),
        source,
        result.fields.len(),
        result.page_count
    ));
    out.push_str(&format!("{}\n", "─".repeat(72).dimmed()));

    if result.fields.is_empty() {
        out.push_str(&format!("{}\n", "No fields found; add them by hand.".yellow()));
        return out;
    }

    for (i, field) in result.fields.iter().enumerate() {
        let position = match &field.absolute_position {
            Some(pos) => format!(
                "p{} x={:.1} y={:.1} w={:.1} h={:.1}",
                pos.page_index + 1,
                pos.x,
                pos.y,
                pos.w,
                pos.h
            ),
            None => "flowing".to_string(),
        };
        out.push_str(&format!(
            "{:>3}  {:<32} {:<10} {}\n",
            i,
            field.label,
            field.type_name().green(),
            position.dimmed()
        ));
    }
    out
}

fn cmd_generate(
    template_path: &Path,
    output: &Path,
    background: Option<PathBuf>,
    title: Option<String>,
    values: Option<&Path>,
    no_labels: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let template = Template::load(template_path)?;
    let fields = template.fields_with_values(values)?;

    let mut options = template.compose_options().with_absolute_labels(!no_labels);
    if let Some(path) = background {
        options = options.with_background(path);
    }
    if let Some(title) = title {
        options = options.with_title(title);
    }

    generate_form(&fields, &options, output)?;
    println!(
        "{} {} fields to {}",
        "Generated".green().bold(),
        fields.iter().filter(|f| f.kind.is_interactive()).count(),
        output.display()
    );
    Ok(())
}

fn cmd_overlay(input: &Path, fields_path: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let fields = Template::load(fields_path)?.fields();
    let skipped = fields.iter().filter(|f| f.absolute_position.is_none()).count();
    if skipped > 0 {
        println!(
            "{} {} fields without a position are skipped",
            "Note:".yellow(),
            skipped
        );
    }

    let added = add_fields_to_pdf(input, output, &fields)?;
    println!("{} {} fields to {}", "Added".green().bold(), added, output.display());
    Ok(())
}

fn cmd_locate(input: &Path, page: usize, x: f32, y: f32) -> Result<(), Box<dyn std::error::Error>> {
    let index = page.checked_sub(1).ok_or("pages are numbered from 1")?;
    match locate_box(input, index, x, y)? {
        Some(rect) => println!(
            "{} x={:.1} y={:.1} w={:.1} h={:.1}",
            "Box".green().bold(),
            rect.x,
            rect.y,
            rect.w,
            rect.h
        ),
        None => println!("{}", "No box around that point".yellow()),
    }
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let header = sniff_path(input)?;
    let doc = PdfDocument::open(input)?;
    let metadata = doc.metadata();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), header);
    println!("{}: {}", "Pages".bold(), metadata.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if metadata.encrypted { "Yes" } else { "No" }
    );
    println!(
        "{}: {}",
        "AcroForm".bold(),
        if metadata.has_acroform { "Yes" } else { "No" }
    );

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }

    if doc.page_count() > 0 {
        let frame = doc.page_frame(0)?;
        println!("{}: {:.0} x {:.0} pt", "Page size".bold(), frame.width, frame.height);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "formpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF form detection and generation tool");
    println!();
    println!("License: MIT");
}
