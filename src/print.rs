//! Hands finished pages to a printer, one at a time.

use std::time::Instant;

use crate::error::Error;
use crate::layout::Page;

/// A physical or virtual printer. Receives each sized page in order and
/// reports whether it was printed.
pub trait Printer {
    fn print_page(&mut self, page: &Page, total: usize) -> bool;
}

/// Send `pages` to `printer` in order. Stops at the first page the printer
/// rejects; pages already sent are not recalled and nothing is retried.
pub fn dispatch<P: Printer + ?Sized>(pages: &[Page], printer: &mut P) -> Result<(), Error> {
    let t0 = Instant::now();
    let total = pages.len();
    for page in pages {
        if !printer.print_page(page, total) {
            log::warn!("Printer rejected page {} of {total}", page.number);
            return Err(Error::PrintFailed {
                page: page.number,
                total,
            });
        }
        log::debug!("Printed page {} of {total}", page.number);
    }
    log::info!(
        "Printed {total} page(s) in {:.1}ms",
        t0.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}
