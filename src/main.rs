use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use labprint::{
    DefaultFormatter, Error, FontSet, PageGeometry, PageSize, PrintContext, PrintKind,
    ReportJob, ReportStyle, TextMeasurer, generate_report, load_ranges, write_pdf,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Paper {
    A4,
    Letter,
    Legal,
}

impl From<Paper> for PageSize {
    fn from(paper: Paper) -> Self {
        match paper {
            Paper::A4 => PageSize::A4,
            Paper::Letter => PageSize::Letter,
            Paper::Legal => PageSize::Legal,
        }
    }
}

/// Print a lab order as a paginated PDF report
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Lab order JSON (patient, doctor and results)
    #[arg(long)]
    order: PathBuf,

    /// Reference ranges JSON (array of ranges for any tests)
    #[arg(long)]
    ranges: Option<PathBuf>,

    /// Output PDF path
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = Paper::A4)]
    paper: Paper,

    /// Space reserved for pre-printed letterhead, in points (at most 35% of the page)
    #[arg(long, default_value_t = 180.0)]
    top_inset: f32,

    /// Space reserved below the content for page numbers, in points
    #[arg(long, default_value_t = 48.0)]
    bottom_inset: f32,

    /// Left and right margin, in points
    #[arg(long, default_value_t = 36.0)]
    margin: f32,

    /// Style overrides JSON
    #[arg(long)]
    style: Option<PathBuf>,

    /// Mark the report as a reprint
    #[arg(long)]
    reprint: bool,

    /// Name printed in the "Printed by" line
    #[arg(long)]
    operator: Option<String>,

    /// Log more (-v timings, -vv page breaks, -vvv everything)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(args: &Args) -> Result<(), Error> {
    let style = match &args.style {
        Some(path) => ReportStyle::from_json_file(path)?,
        None => ReportStyle::default(),
    };
    let order = labprint::LabOrder::from_json_file(&args.order)?;
    let ranges = match &args.ranges {
        Some(path) => load_ranges(path)?,
        None => Vec::new(),
    };

    let fonts = FontSet::load(&style.font_family);
    let measurer = TextMeasurer::new(&fonts, &style);
    let kind = if args.reprint {
        PrintKind::Reprint
    } else {
        PrintKind::Original
    };
    let context = PrintContext {
        operator: args.operator.clone(),
        ..PrintContext::now(kind)
    };
    let formatter = DefaultFormatter::default();

    let job = ReportJob {
        geometry: PageGeometry::for_paper(args.paper.into(), args.top_inset, args.bottom_inset, args.margin),
        style: &style,
        measure: &measurer,
        formatter: &formatter,
        context: &context,
    };
    let report = generate_report(&order, &ranges, &job);
    if !report.overflow_pages.is_empty() {
        eprintln!(
            "warning: some rows do not fit a page and are clipped (page(s) {:?})",
            report.overflow_pages
        );
    }
    write_pdf(&report, &fonts, &style, &args.output)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
