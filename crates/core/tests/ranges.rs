use reforge_core::dwarf::ranges::{in_ranges, normalize_ranges, total_range_bytes, AddressRange};

#[test]
fn normalize_drops_empty_segments() {
    let raw = vec![
        AddressRange { low: 0x100, high: 0x100 },
        AddressRange { low: 0x200, high: 0x180 },
    ];
    assert!(normalize_ranges(&raw).is_empty());
}

#[test]
fn normalize_sorts_and_merges_overlapping() {
    let raw = vec![
        AddressRange { low: 0x300, high: 0x400 },
        AddressRange { low: 0x100, high: 0x250 },
        AddressRange { low: 0x200, high: 0x320 },
    ];
    let normalized = normalize_ranges(&raw);
    assert_eq!(normalized, vec![AddressRange { low: 0x100, high: 0x400 }]);
}

#[test]
fn normalize_merges_adjacent_segments() {
    let raw = vec![
        AddressRange { low: 0x100, high: 0x200 },
        AddressRange { low: 0x200, high: 0x300 },
    ];
    let normalized = normalize_ranges(&raw);
    assert_eq!(normalized, vec![AddressRange { low: 0x100, high: 0x300 }]);
}

#[test]
fn normalize_keeps_disjoint_segments_sorted() {
    let raw = vec![
        AddressRange { low: 0x500, high: 0x600 },
        AddressRange { low: 0x100, high: 0x200 },
    ];
    let normalized = normalize_ranges(&raw);
    assert_eq!(normalized.len(), 2);
    assert_eq!(normalized[0].low, 0x100);
    assert_eq!(normalized[1].low, 0x500);
    // Pairwise non-overlapping.
    assert!(normalized[0].high <= normalized[1].low);
}

#[test]
fn total_bytes_sums_segments() {
    let ranges = vec![
        AddressRange { low: 0x100, high: 0x180 },
        AddressRange { low: 0x200, high: 0x210 },
    ];
    assert_eq!(total_range_bytes(&ranges), 0x80 + 0x10);
}

#[test]
fn in_ranges_is_half_open() {
    let ranges = vec![AddressRange { low: 0x100, high: 0x200 }];
    assert!(in_ranges(0x100, &ranges));
    assert!(in_ranges(0x1ff, &ranges));
    assert!(!in_ranges(0x200, &ranges));
    assert!(!in_ranges(0xff, &ranges));
}
