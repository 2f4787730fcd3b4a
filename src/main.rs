use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use report_pdf::{
    CompileOptions, FontSet, HeuristicParser, LayoutOptions, PageGeometry, PageKind,
    ParseOptions, ReportParser, paginate_with, suggested_filename,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PageSize {
    A4,
    Letter,
}

#[derive(Parser)]
#[command(version, about = "Compile a generated research report into a paginated PDF")]
struct Cli {
    /// Report text file, or `-` to read stdin
    input: PathBuf,

    /// Output PDF path (defaults to a name derived from the report title)
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = PageSize::A4)]
    page_size: PageSize,

    /// Page margin in points
    #[arg(long)]
    margin: Option<f32>,

    /// TrueType/OpenType file for body text
    #[arg(long, conflicts_with = "font_family")]
    font: Option<PathBuf>,

    /// TrueType/OpenType file for bold text (defaults to --font)
    #[arg(long, requires = "font")]
    bold_font: Option<PathBuf>,

    /// Installed font family to resolve from the system font directories
    #[arg(long)]
    font_family: Option<String>,

    /// Date shown in the "Generated on" captions (defaults to today)
    #[arg(long)]
    date: Option<String>,

    /// Recognise markdown-decorated section headings and source lists
    #[arg(long)]
    markdown: bool,

    /// Print the page plan summary instead of writing a PDF
    #[arg(long)]
    dump_plan: bool,
}

fn read_input(cli: &Cli) -> std::io::Result<String> {
    if cli.input.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        Ok(raw)
    } else {
        std::fs::read_to_string(&cli.input)
    }
}

fn run(cli: Cli) -> Result<(), report_pdf::Error> {
    let raw = read_input(&cli)?;

    let mut geometry = match cli.page_size {
        PageSize::A4 => PageGeometry::a4(),
        PageSize::Letter => PageGeometry::letter(),
    };
    if let Some(margin) = cli.margin {
        geometry.margin = margin;
    }

    let fonts = match (&cli.font, &cli.font_family) {
        (Some(regular), _) => FontSet::from_files(regular, cli.bold_font.as_deref())?,
        (None, Some(family)) => FontSet::from_family(family),
        (None, None) => FontSet::builtin(),
    };

    let generated_on = cli
        .date
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let options = CompileOptions {
        geometry,
        parse: if cli.markdown {
            ParseOptions::markdown()
        } else {
            ParseOptions::default()
        },
        layout: LayoutOptions::new(generated_on),
        fonts,
    };

    let report = HeuristicParser::new(options.parse).parse(&raw);

    if cli.dump_plan {
        let plan = paginate_with(&report, options.geometry, &options.fonts, &options.layout)?;
        for (i, page) in plan.pages.iter().enumerate() {
            let kind = match page.kind {
                PageKind::Title => "title".to_string(),
                PageKind::Content => format!(
                    "page {} of {}",
                    page.page_number.unwrap_or_default(),
                    page.total_pages
                ),
            };
            println!("#{:<3} {:<14} {:>4} ops", i + 1, kind, page.ops.len());
        }
        return Ok(());
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(suggested_filename(&report)));
    let bytes = report_pdf::compile_report(&report, &options)?;
    std::fs::write(&output, &bytes)?;
    println!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
