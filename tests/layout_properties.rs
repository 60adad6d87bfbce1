use proptest::prelude::*;

use therapy_plan_pdf::layout::columns::WIDTH_GRID_MM;
use therapy_plan_pdf::layout::{
    row_height, wrap_cells, ColumnPlan, ColumnSpec, FontSpec, TextMeasurer,
};

/// Fixed widths on the grid, at most `budget` mm in total.
fn fixed_widths(budget: u32) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(1u32..=400, 1..10).prop_map(move |ticks| {
        let mut remaining = budget * 8;
        ticks
            .into_iter()
            .map(|t| {
                let take = t.min(remaining);
                remaining -= take;
                take as f32 * WIDTH_GRID_MM
            })
            .collect()
    })
}

fn cell_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-ZäöüÄÖÜß0-9]{1,14}", 0..12)
        .prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn flex_plan_sums_to_content_width(
        widths in fixed_widths(277),
        flex_at in 0usize..10,
    ) {
        let mut specs: Vec<ColumnSpec> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| ColumnSpec::fixed(&format!("c{}", i), *w))
            .collect();
        let at = flex_at.min(specs.len());
        specs.insert(at, ColumnSpec::flex("flex"));

        let plan = ColumnPlan::new(277.0, specs).unwrap();
        prop_assert_eq!(plan.widths().iter().sum::<f32>(), 277.0);
        prop_assert!(plan.widths()[at] >= 0.0);
        for (i, w) in widths.iter().enumerate() {
            let index = if i < at { i } else { i + 1 };
            prop_assert_eq!(plan.widths()[index], *w);
        }
    }

    #[test]
    fn overfull_fixed_widths_are_rejected(extra in 1u32..200) {
        let specs = vec![
            ColumnSpec::fixed("a", 200.0),
            ColumnSpec::fixed("b", 77.0 + extra as f32),
            ColumnSpec::flex("c"),
        ];
        prop_assert!(ColumnPlan::new(277.0, specs).is_err());
    }

    #[test]
    fn row_height_is_whole_lines_of_tallest_cell(
        cells in prop::collection::vec(cell_text(), 1..6),
        line_height in 3u32..10,
    ) {
        let measurer = TextMeasurer::new(FontSpec::regular(9.0));
        let widths = vec![30.0; cells.len()];
        let line_height = line_height as f32;

        let height = row_height(&measurer, &cells, line_height, &widths);
        let tallest = wrap_cells(&measurer, &cells, &widths)
            .iter()
            .map(|w| w.line_count())
            .max()
            .unwrap_or(1);

        prop_assert!(height >= line_height);
        prop_assert_eq!(height, line_height * tallest as f32);
    }

    #[test]
    fn wrapped_lines_fit_unless_single_word(text in cell_text(), width in 10u32..120) {
        let measurer = TextMeasurer::new(FontSpec::regular(9.0));
        let wrapped = measurer.measure(&text, width as f32);
        for line in &wrapped.lines {
            let fits = measurer.text_width(line) <= width as f32 + 1e-3;
            prop_assert!(fits || !line.contains(' '), "line {:?} overflows", line);
        }
    }
}
