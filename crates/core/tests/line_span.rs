use reforge_core::dwarf::lines::{compute_line_span, CuLineRow};
use reforge_core::dwarf::ranges::AddressRange;

fn row(address: u64, file: &str, line: u64) -> CuLineRow {
    CuLineRow { address, file: file.to_string(), line }
}

#[test]
fn empty_ranges_yield_empty_span() {
    let rows = vec![row(0x100, "main.c", 3)];
    let span = compute_line_span(&rows, &[]);
    assert!(span.is_empty());
    assert_eq!(span.n_line_rows, 0);
}

#[test]
fn counts_form_a_multiset() {
    let rows = vec![
        row(0x100, "main.c", 3),
        row(0x104, "main.c", 3),
        row(0x108, "main.c", 4),
        row(0x10c, "util.c", 9),
        // Outside the range; must not count.
        row(0x300, "main.c", 5),
    ];
    let ranges = vec![AddressRange { low: 0x100, high: 0x200 }];
    let span = compute_line_span(&rows, &ranges);

    assert_eq!(span.n_line_rows, 4);
    let total: u64 = span.line_rows.values().sum();
    assert_eq!(total, span.n_line_rows);
    assert_eq!(span.line_rows[&("main.c".to_string(), 3)], 2);
    assert_eq!(span.line_rows[&("main.c".to_string(), 4)], 1);
    assert_eq!(span.line_rows[&("util.c".to_string(), 9)], 1);
}

#[test]
fn dominant_file_and_ratio() {
    let rows = vec![
        row(0x100, "main.c", 3),
        row(0x104, "main.c", 4),
        row(0x108, "main.c", 5),
        row(0x10c, "helper.h", 12),
    ];
    let ranges = vec![AddressRange { low: 0x100, high: 0x110 }];
    let span = compute_line_span(&rows, &ranges);

    assert_eq!(span.dominant_file.as_deref(), Some("main.c"));
    assert!((span.dominant_file_ratio - 0.75).abs() < 1e-9);
    assert_eq!(span.line_min, Some(3));
    assert_eq!(span.line_max, Some(5));
    assert_eq!(span.file_row_counts["main.c"], 3);
    assert_eq!(span.file_row_counts["helper.h"], 1);
}

#[test]
fn single_file_has_ratio_one() {
    let rows = vec![row(0x40, "add.c", 1), row(0x44, "add.c", 2)];
    let ranges = vec![AddressRange { low: 0x40, high: 0x50 }];
    let span = compute_line_span(&rows, &ranges);
    assert!((span.dominant_file_ratio - 1.0).abs() < 1e-9);
}

#[test]
fn multiple_segments_all_contribute() {
    let rows = vec![row(0x100, "a.c", 1), row(0x300, "a.c", 7)];
    let ranges = vec![
        AddressRange { low: 0x100, high: 0x104 },
        AddressRange { low: 0x300, high: 0x304 },
    ];
    let span = compute_line_span(&rows, &ranges);
    assert_eq!(span.n_line_rows, 2);
}
