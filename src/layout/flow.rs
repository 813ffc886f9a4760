//! Greedy page flow: places blocks and table rows page by page, measuring the
//! realized page after every row and breaking before the row that overflows.

use crate::content::{ContentBlock, PatientInfo, ResultRow};

use super::{Measure, PageGeometry};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowOptions {
    /// Print the patient header on every page instead of the first only.
    pub repeat_patient_header: bool,
    /// Share of the content width given to the patient header box.
    pub patient_header_fraction: f32,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            repeat_patient_header: false,
            patient_header_fraction: 0.55,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedBlock {
    pub block: ContentBlock,
    /// Offset from the top of the content region.
    pub y: f32,
    pub height: f32,
}

/// One finished sheet. Every page of a report has the same canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub number: usize,
    pub geometry: PageGeometry,
    /// Patient header, drawn in the reserved region above the content.
    pub header: Option<PatientInfo>,
    pub blocks: Vec<PlacedBlock>,
    /// Set when a single row could not fit even on a fresh page and was
    /// placed anyway.
    pub overflow: bool,
}

impl Page {
    pub fn rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.blocks.iter().filter_map(|p| match &p.block {
            ContentBlock::ResultsTableRow(row) => Some(row),
            _ => None,
        })
    }

    pub fn content_height(&self) -> f32 {
        self.blocks.last().map_or(0.0, |p| p.y + p.height)
    }
}

pub struct PageFlowEngine<'m, M: Measure + ?Sized> {
    measure: &'m M,
    geometry: PageGeometry,
    options: FlowOptions,
}

struct FlowState {
    pages: Vec<Page>,
    open: Vec<ContentBlock>,
    overflow: bool,
    header: Option<PatientInfo>,
    /// Department label + table header of the table being filled. Re-emitted
    /// at the top of every continuation page.
    heading: Vec<ContentBlock>,
    rows_on_page: usize,
}

impl<'m, M: Measure + ?Sized> PageFlowEngine<'m, M> {
    pub fn new(measure: &'m M, geometry: PageGeometry) -> Self {
        Self {
            measure,
            geometry: geometry.normalized(),
            options: FlowOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    fn used(&self, state: &FlowState) -> f32 {
        self.measure.measure_stack(&state.open, self.geometry.content_width)
    }

    fn fits(&self, state: &FlowState) -> bool {
        self.used(state) <= self.geometry.usable_height()
    }

    fn seal_page(&self, state: &mut FlowState) {
        let number = state.pages.len() + 1;
        let width = self.geometry.content_width;
        let mut y = 0.0f32;
        let blocks = std::mem::take(&mut state.open)
            .into_iter()
            .map(|block| {
                let height = self.measure.measure(&block, width);
                let placed = PlacedBlock { block, y, height };
                y += height;
                placed
            })
            .collect();
        let header = if number == 1 || self.options.repeat_patient_header {
            state.header.clone()
        } else {
            None
        };
        state.pages.push(Page {
            number,
            geometry: self.geometry,
            header,
            blocks,
            overflow: std::mem::take(&mut state.overflow),
        });
        state.rows_on_page = 0;
    }

    fn place_heading(&self, state: &mut FlowState, heading: Vec<ContentBlock>) {
        let pair_h = self.measure.measure_stack(&heading, self.geometry.content_width);
        if !state.open.is_empty() && self.used(state) + pair_h > self.geometry.usable_height() {
            log::debug!(
                "Page {}: no room for '{}' heading ({:.1}pt), opening a new page",
                state.pages.len() + 1,
                heading_name(&heading),
                pair_h,
            );
            self.seal_page(state);
        }
        state.open.extend(heading.iter().cloned());
        state.heading = heading;
        state.rows_on_page = 0;
    }

    fn place_row(&self, state: &mut FlowState, row: &ContentBlock) {
        state.open.push(row.clone());
        if self.fits(state) {
            state.rows_on_page += 1;
            return;
        }
        state.open.pop();

        let page_has_only_heading = state.rows_on_page == 0 && state.open.len() == state.heading.len();
        if page_has_only_heading {
            // Breaking again would not gain any room: place it and move on
            state.open.push(row.clone());
            self.flag_overflow(state, row);
            state.rows_on_page += 1;
            return;
        }
        if state.rows_on_page == 0 {
            // Heading would be stranded without rows; it moves along
            let keep = state.open.len() - state.heading.len();
            state.open.truncate(keep);
        }

        log::debug!(
            "Page {} full before '{}', continuing '{}' on page {}",
            state.pages.len() + 1,
            row_name(row),
            heading_name(&state.heading),
            state.pages.len() + 2,
        );
        self.seal_page(state);
        state.open.extend(state.heading.iter().cloned());
        state.open.push(row.clone());
        state.rows_on_page = 1;
        if !self.fits(state) {
            self.flag_overflow(state, row);
        }
    }

    fn flag_overflow(&self, state: &mut FlowState, row: &ContentBlock) {
        log::warn!(
            "Row '{}' does not fit on an empty page ({:.1}pt > {:.1}pt usable); printing it clipped on page {}",
            row_name(row),
            self.used(state),
            self.geometry.usable_height(),
            state.pages.len() + 1,
        );
        state.overflow = true;
    }

    pub fn layout(&self, blocks: &[ContentBlock]) -> Vec<Page> {
        let mut state = FlowState {
            pages: Vec::new(),
            open: Vec::new(),
            overflow: false,
            header: None,
            heading: Vec::new(),
            rows_on_page: 0,
        };

        let mut i = 0;
        while i < blocks.len() {
            let block = &blocks[i];
            i += 1;
            match block {
                ContentBlock::PatientInfo(info) => {
                    let header_w = self.geometry.content_width * self.options.patient_header_fraction;
                    let header_h = self.measure.measure(block, header_w);
                    if header_h > self.geometry.top_inset {
                        log::warn!(
                            "Patient header ({:.1}pt) is taller than the reserved top inset ({:.1}pt)",
                            header_h,
                            self.geometry.top_inset,
                        );
                    }
                    state.header = Some(info.clone());
                }
                ContentBlock::DepartmentLabel(_) => {
                    let mut heading = vec![block.clone()];
                    if let Some(ContentBlock::ResultsTableHeader) = blocks.get(i) {
                        heading.push(ContentBlock::ResultsTableHeader);
                        i += 1;
                    }
                    self.place_heading(&mut state, heading);
                }
                ContentBlock::ResultsTableHeader => {
                    self.place_heading(&mut state, vec![block.clone()]);
                }
                ContentBlock::ResultsTableRow(_) => self.place_row(&mut state, block),
                ContentBlock::Spacer(_) => {
                    state.open.push(block.clone());
                    if !self.fits(&state) {
                        state.open.pop();
                    }
                }
                ContentBlock::Footer(_) => {
                    state.open.push(block.clone());
                    if !self.fits(&state) {
                        log::debug!("Footer overflows page {}", state.pages.len() + 1);
                    }
                }
            }
        }

        self.seal_page(&mut state);
        state.pages
    }
}

/// Paginate `blocks` with default options.
pub fn layout<M: Measure + ?Sized>(
    blocks: &[ContentBlock],
    geometry: &PageGeometry,
    measure: &M,
) -> Vec<Page> {
    PageFlowEngine::new(measure, *geometry).layout(blocks)
}

fn heading_name(heading: &[ContentBlock]) -> &str {
    heading
        .iter()
        .find_map(|b| match b {
            ContentBlock::DepartmentLabel(name) => Some(name.as_str()),
            _ => None,
        })
        .unwrap_or("")
}

fn row_name(row: &ContentBlock) -> &str {
    match row {
        ContentBlock::ResultsTableRow(r) => r.test_name.as_str(),
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed heights: label 10, header 10, row 20, spacer as given, footer 5.
    struct Fixed;

    impl Measure for Fixed {
        fn measure(&self, block: &ContentBlock, _width: f32) -> f32 {
            match block {
                ContentBlock::PatientInfo(_) => 50.0,
                ContentBlock::DepartmentLabel(_) | ContentBlock::ResultsTableHeader => 10.0,
                ContentBlock::ResultsTableRow(_) => 20.0,
                ContentBlock::Spacer(h) => *h,
                ContentBlock::Footer(_) => 5.0,
            }
        }
    }

    fn row(name: &str) -> ContentBlock {
        ContentBlock::ResultsTableRow(ResultRow {
            test_name: name.into(),
            value: "1".into(),
            unit: "-".into(),
            reference_range: "-".into(),
            abnormal: false,
            remarks: None,
        })
    }

    fn department(name: &str, rows: &[&str]) -> Vec<ContentBlock> {
        let mut out = vec![
            ContentBlock::DepartmentLabel(name.into()),
            ContentBlock::ResultsTableHeader,
        ];
        out.extend(rows.iter().map(|r| row(r)));
        out.push(ContentBlock::Spacer(8.0));
        out
    }

    /// No insets, so the whole sheet height is usable.
    fn geometry(usable: f32) -> PageGeometry {
        PageGeometry::new(400.0, usable, 0.0, 0.0, 360.0)
    }

    fn kinds(page: &Page) -> Vec<&'static str> {
        page.blocks.iter().map(|b| b.block.kind()).collect()
    }

    #[test]
    fn breaks_and_reemits_heading() {
        // label + header + 2 rows = 60
        let blocks = department("Hematology", &["a", "b", "c"]);
        let pages = layout(&blocks, &geometry(60.0), &Fixed);
        assert_eq!(pages.len(), 2);
        assert_eq!(kinds(&pages[0]), ["department", "table-header", "row", "row"]);
        assert_eq!(kinds(&pages[1]), ["department", "table-header", "row", "spacer"]);
        assert!(pages.iter().all(|p| !p.overflow));
    }

    #[test]
    fn heading_moves_when_it_cannot_fit() {
        let mut blocks = department("A", &["a1", "a2"]);
        blocks.extend(department("B", &["b1"]));
        // A fills 60 of 75; B's heading needs 20
        let pages = layout(&blocks, &geometry(75.0), &Fixed);
        assert_eq!(pages.len(), 2);
        assert_eq!(kinds(&pages[0]), ["department", "table-header", "row", "row", "spacer"]);
        assert_eq!(pages[1].blocks[0].block, ContentBlock::DepartmentLabel("B".into()));
    }

    #[test]
    fn heading_without_room_for_a_row_is_not_stranded() {
        let mut blocks = department("A", &["a1"]);
        blocks.extend(department("B", &["b1"]));
        // A = 40 (+8 spacer), B heading fits in 70 but its first row does not
        let pages = layout(&blocks, &geometry(70.0), &Fixed);
        assert_eq!(pages.len(), 2);
        assert_eq!(kinds(&pages[0]), ["department", "table-header", "row", "spacer"]);
        assert_eq!(kinds(&pages[1]), ["department", "table-header", "row", "spacer"]);
    }

    #[test]
    fn oversized_row_is_placed_and_flagged() {
        let blocks = department("A", &["a1", "a2"]);
        // heading fits, no row ever does
        let pages = layout(&blocks, &geometry(25.0), &Fixed);
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.overflow));
        assert_eq!(pages.iter().map(|p| p.rows().count()).sum::<usize>(), 2);
    }

    #[test]
    fn zero_height_page_still_terminates() {
        let blocks = department("A", &["a1", "a2", "a3"]);
        let pages = layout(&blocks, &geometry(0.0), &Fixed);
        assert_eq!(pages.iter().map(|p| p.rows().count()).sum::<usize>(), 3);
    }

    #[test]
    fn spacer_is_dropped_not_broken() {
        let blocks = department("A", &["a1", "a2"]);
        let pages = layout(&blocks, &geometry(62.0), &Fixed);
        assert_eq!(pages.len(), 1);
        assert_eq!(kinds(&pages[0]), ["department", "table-header", "row", "row"]);
    }

    #[test]
    fn footer_is_always_appended() {
        let mut blocks = department("A", &["a1", "a2"]);
        blocks.push(ContentBlock::Footer("end".into()));
        let pages = layout(&blocks, &geometry(60.0), &Fixed);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].blocks.last().map(|b| b.block.kind()), Some("footer"));
    }

    #[test]
    fn empty_content_gives_one_page() {
        let pages = layout(&[], &geometry(100.0), &Fixed);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].blocks.is_empty());
        assert!(pages[0].header.is_none());
    }

    #[test]
    fn placements_stack() {
        let blocks = department("A", &["a1"]);
        let pages = layout(&blocks, &geometry(200.0), &Fixed);
        let ys: Vec<f32> = pages[0].blocks.iter().map(|b| b.y).collect();
        assert_eq!(ys, [0.0, 10.0, 20.0, 40.0]);
        assert_eq!(pages[0].content_height(), 48.0);
    }

    /// Page content grows by an extra 15pt once it holds more than two rows,
    /// which only a whole-page measurement notices.
    struct Holistic;

    impl Measure for Holistic {
        fn measure(&self, block: &ContentBlock, width: f32) -> f32 {
            Fixed.measure(block, width)
        }

        fn measure_stack(&self, blocks: &[ContentBlock], width: f32) -> f32 {
            let base: f32 = blocks.iter().map(|b| self.measure(b, width)).sum();
            let rows = blocks.iter().filter(|b| b.kind() == "row").count();
            if rows > 2 { base + 15.0 } else { base }
        }
    }

    #[test]
    fn whole_page_is_remeasured_after_each_row() {
        let blocks = department("A", &["a1", "a2", "a3"]);
        // 80 fits three rows by per-block sum, but not with the extra 15
        let pages = layout(&blocks, &geometry(80.0), &Holistic);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].rows().count(), 2);
    }

    #[test]
    fn header_repeats_when_asked() {
        let mut blocks = vec![ContentBlock::PatientInfo(PatientInfo {
            patient_name: "P".into(),
            mrn: "M".into(),
            age: "-".into(),
            gender: "-".into(),
            order_id: "1".into(),
            ordered_at: "-".into(),
            printed_at: "-".into(),
            doctor: "-".into(),
            printed_by: None,
            reprint: false,
        })];
        blocks.extend(department("A", &["a1", "a2", "a3"]));
        let first_only = layout(&blocks, &geometry(60.0), &Fixed);
        assert!(first_only[0].header.is_some());
        assert!(first_only[1].header.is_none());

        let repeated = PageFlowEngine::new(&Fixed, geometry(60.0))
            .with_options(FlowOptions {
                repeat_patient_header: true,
                ..FlowOptions::default()
            })
            .layout(&blocks);
        assert!(repeated.iter().all(|p| p.header.is_some()));
    }
}
