use reforge_core::dwarf::functions::FunctionEntry;
use reforge_core::dwarf::lines::{compute_line_span, CuLineRow};
use reforge_core::dwarf::ranges::AddressRange;
use reforge_core::dwarf::verdict::{gate_binary, judge_function, DwarfProfile};
use reforge_core::elf::ElfMeta;
use reforge_core::model::Verdict;

fn entry(name: Option<&str>, ranges: Vec<AddressRange>) -> FunctionEntry {
    FunctionEntry {
        function_id: "cu0x0:die0x2a".to_string(),
        cu_offset: 0,
        die_offset: 0x2a,
        name: name.map(|s| s.to_string()),
        linkage_name: None,
        ranges,
        is_declaration: false,
        is_external: false,
        decl_file_index: Some(1),
        decl_line: Some(3),
        decl_column: Some(5),
    }
}

fn span_for(file: &str, n: u64) -> reforge_core::dwarf::lines::LineSpan {
    let rows: Vec<CuLineRow> = (0..n)
        .map(|i| CuLineRow { address: 0x100 + 4 * i, file: file.to_string(), line: i + 1 })
        .collect();
    compute_line_span(&rows, &[AddressRange { low: 0x100, high: 0x100 + 4 * n }])
}

fn meta_ok() -> ElfMeta {
    ElfMeta {
        path: "bin".to_string(),
        file_sha256: "00".repeat(32),
        file_size: 1,
        elf_type: "ET_DYN".to_string(),
        machine: "EM_X86_64".to_string(),
        is_64: true,
        endianness: "little".to_string(),
        has_debug_info: true,
        has_debug_line: true,
        has_debug_ranges: true,
        has_debug_str: true,
        debug_section_names: vec![".debug_info".to_string(), ".debug_line".to_string()],
        build_id: None,
        has_split_dwarf: false,
    }
}

#[test]
fn gate_accepts_debug_x86_64() {
    let (verdict, reasons) = gate_binary(&meta_ok(), &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Accept);
    assert!(reasons.is_empty());
}

#[test]
fn gate_rejects_missing_debug_sections() {
    let mut meta = meta_ok();
    meta.has_debug_info = false;
    meta.has_debug_line = false;
    let (verdict, reasons) = gate_binary(&meta, &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Reject);
    assert!(reasons.iter().any(|r| r == "NO_DEBUG_INFO"));
    assert!(reasons.iter().any(|r| r == "NO_DEBUG_LINE"));
}

#[test]
fn gate_rejects_wrong_arch_and_split_dwarf() {
    let mut meta = meta_ok();
    meta.machine = "EM_AARCH64".to_string();
    meta.has_split_dwarf = true;
    let (verdict, reasons) = gate_binary(&meta, &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Reject);
    assert!(reasons.iter().any(|r| r == "UNSUPPORTED_ARCH"));
    assert!(reasons.iter().any(|r| r == "SPLIT_DWARF"));
}

#[test]
fn declaration_only_rejects() {
    let mut func = entry(Some("f"), vec![]);
    func.is_declaration = true;
    let (verdict, reasons) =
        judge_function(&func, &Default::default(), &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Reject);
    assert_eq!(reasons, vec!["DECLARATION_ONLY".to_string()]);
}

#[test]
fn missing_range_rejects() {
    let func = entry(Some("f"), vec![]);
    let (verdict, reasons) =
        judge_function(&func, &Default::default(), &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Reject);
    assert_eq!(reasons, vec!["MISSING_RANGE".to_string()]);
}

#[test]
fn no_line_rows_rejects() {
    let func = entry(Some("f"), vec![AddressRange { low: 0x100, high: 0x200 }]);
    let (verdict, reasons) =
        judge_function(&func, &Default::default(), &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Reject);
    assert_eq!(reasons, vec!["NO_LINE_ROWS_IN_RANGE".to_string()]);
}

#[test]
fn clean_function_accepts() {
    let func = entry(Some("add"), vec![AddressRange { low: 0x100, high: 0x140 }]);
    let span = span_for("add.c", 8);
    let (verdict, reasons) = judge_function(&func, &span, &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Accept);
    assert!(reasons.is_empty());
}

#[test]
fn nameless_function_warns_but_survives() {
    let func = entry(None, vec![AddressRange { low: 0x100, high: 0x140 }]);
    let span = span_for("a.c", 4);
    let (verdict, reasons) = judge_function(&func, &span, &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Warn);
    assert!(reasons.iter().any(|r| r == "NAME_MISSING"));
}

#[test]
fn system_header_dominant_warns() {
    let func = entry(Some("f"), vec![AddressRange { low: 0x100, high: 0x140 }]);
    let span = span_for("/usr/include/bits/string.h", 4);
    let (verdict, reasons) = judge_function(&func, &span, &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Warn);
    assert!(reasons.iter().any(|r| r == "SYSTEM_HEADER_DOMINANT"));
}

#[test]
fn fragmented_ranges_warn() {
    let ranges = vec![
        AddressRange { low: 0x100, high: 0x110 },
        AddressRange { low: 0x200, high: 0x210 },
        AddressRange { low: 0x300, high: 0x310 },
    ];
    let func = entry(Some("f"), ranges);
    let span = span_for("f.c", 4);
    let (verdict, reasons) = judge_function(&func, &span, &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Warn);
    assert!(reasons.iter().any(|r| r == "RANGES_FRAGMENTED"));
}

#[test]
fn multi_file_range_warns_below_ratio() {
    // Two files, 50/50 split: dominant ratio 0.5 < 0.7.
    let rows = vec![
        CuLineRow { address: 0x100, file: "a.c".to_string(), line: 1 },
        CuLineRow { address: 0x104, file: "b.h".to_string(), line: 2 },
    ];
    let span = compute_line_span(&rows, &[AddressRange { low: 0x100, high: 0x110 }]);
    let func = entry(Some("f"), vec![AddressRange { low: 0x100, high: 0x110 }]);
    let (verdict, reasons) = judge_function(&func, &span, &DwarfProfile::default());
    assert_eq!(verdict, Verdict::Warn);
    assert!(reasons.iter().any(|r| r == "MULTI_FILE_RANGE"));
}
