use reforge_core::tsoracle::normalize::{normalize_and_hash, normalize_text, raw_hash};

#[test]
fn strips_line_and_block_comments() {
    let src = b"int f(void) { // add\n  return 1 + /* inline */ 2;\n}";
    let normalized = String::from_utf8(normalize_text(src)).unwrap();
    assert_eq!(normalized, "int f(void) { return 1 + 2; }");
}

#[test]
fn collapses_whitespace_runs() {
    let src = b"int\t\tf(  int   a )\n\n{ return a; }";
    let normalized = String::from_utf8(normalize_text(src)).unwrap();
    assert_eq!(normalized, "int f( int a ) { return a; }");
}

#[test]
fn comment_markers_inside_strings_survive() {
    let src = br#"const char *u = "http://example/*x*/";"#;
    let normalized = String::from_utf8(normalize_text(src)).unwrap();
    assert!(normalized.contains("http://example/*x*/"));
}

#[test]
fn context_hash_insensitive_to_formatting() {
    let compact = b"int add(int a, int b) { return a + b; }";
    let commented = b"int add(int a,\n       int b)\n{\n  /* sum */\n  return a + b;\n}";
    assert_eq!(normalize_and_hash(compact), normalize_and_hash(commented));
    assert_ne!(raw_hash(compact), raw_hash(commented));
}

#[test]
fn no_token_rewriting() {
    let hex = b"int f(void) { return 0x10; }";
    let dec = b"int f(void) { return 16; }";
    assert_ne!(normalize_and_hash(hex), normalize_and_hash(dec));
}

#[test]
fn raw_hash_is_plain_sha256() {
    // sha256("") well-known digest.
    assert_eq!(
        raw_hash(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
