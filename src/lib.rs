mod config;
mod content;
mod error;
mod fonts;
mod format;
mod layout;
mod model;
mod pdf;
mod print;
mod reference;

pub use config::{CellMargins, DEFAULT_FOOTER_TEXT, ReportStyle};
pub use content::{
    ContentBlock, OTHER_DEPARTMENT, PatientInfo, PrintContext, PrintKind, ReportContentBuilder,
    ResultRow, TABLE_CAPTIONS, department_of,
};
pub use error::Error;
pub use fonts::{FontFace, FontSet};
pub use format::{DefaultFormatter, Formatter};
pub use layout::{
    FlowOptions, Measure, Page, PageFlowEngine, PageGeometry, PageSize, PlacedBlock, TextLine,
    TextMeasurer, layout, wrap_text,
};
pub use model::{
    Doctor, Gender, LabOrder, LabResult, Patient, RangeGender, ReferenceRange, TestDefinition,
    load_ranges,
};
pub use pdf::PdfPrinter;
pub use print::{Printer, dispatch};
pub use reference::{DisplaySite, RangeSource, range_text, resolve};

use std::path::Path;
use std::time::Instant;

/// A laid-out report, ready for printing.
#[derive(Clone, Debug)]
pub struct Report {
    pub pages: Vec<Page>,
    /// Numbers of pages holding a row taller than the usable page height.
    pub overflow_pages: Vec<usize>,
}

/// Everything that shapes a report besides the order itself.
pub struct ReportJob<'a, M: Measure + ?Sized> {
    pub geometry: PageGeometry,
    pub style: &'a ReportStyle,
    pub measure: &'a M,
    pub formatter: &'a dyn Formatter,
    pub context: &'a PrintContext,
}

/// Build the content of `order` and paginate it.
pub fn generate_report<R, M>(order: &LabOrder, ranges: &R, job: &ReportJob<'_, M>) -> Report
where
    R: RangeSource + ?Sized,
    M: Measure + ?Sized,
{
    let t0 = Instant::now();

    let blocks = ReportContentBuilder::new(job.style, job.formatter, job.context).build(order, ranges);
    let t_build = t0.elapsed();

    let options = FlowOptions {
        repeat_patient_header: job.style.repeat_patient_header,
        patient_header_fraction: job.style.patient_header_fraction,
    };
    let pages = PageFlowEngine::new(job.measure, job.geometry)
        .with_options(options)
        .layout(&blocks);
    let t_layout = t0.elapsed();

    let overflow_pages: Vec<usize> = pages.iter().filter(|p| p.overflow).map(|p| p.number).collect();
    if !overflow_pages.is_empty() {
        log::warn!("Order {}: rows overflow on page(s) {:?}", order.id, overflow_pages);
    }

    log::info!(
        "Order {}: {} result(s), {} block(s), {} page(s); build={:.1}ms, layout={:.1}ms",
        order.id,
        order.results.len(),
        blocks.len(),
        pages.len(),
        t_build.as_secs_f64() * 1000.0,
        (t_layout - t_build).as_secs_f64() * 1000.0,
    );

    Report {
        pages,
        overflow_pages,
    }
}

/// Send every page of `report` to `printer`.
pub fn print_report<P: Printer + ?Sized>(report: &Report, printer: &mut P) -> Result<(), Error> {
    dispatch(&report.pages, printer)
}

/// Print `report` to an in-memory PDF.
pub fn render_pdf(report: &Report, fonts: &FontSet, style: &ReportStyle) -> Result<Vec<u8>, Error> {
    let mut printer = PdfPrinter::new(fonts, style);
    print_report(report, &mut printer)?;
    printer.finish()
}

/// Print `report` to a PDF file.
pub fn write_pdf(report: &Report, fonts: &FontSet, style: &ReportStyle, output: &Path) -> Result<(), Error> {
    let t0 = Instant::now();
    let bytes = render_pdf(report, fonts, style)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_render.as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
