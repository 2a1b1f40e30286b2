//! Noise classification for decompiler-discovered functions.
//!
//! Drives the boolean flags `is_plt_or_stub`, `is_init_fini_aux`,
//! `is_compiler_aux`, `is_library_like`. All flags are derivable from
//! emitted evidence: section hint, name, external/thunk/import markers.
//! The canonical name sets live in `crate::model`.

use crate::model::{
    normalize_glibc_name, AUX_INIT_FINI_NAMES, COMPILER_AUX_NAMES, PLT_SECTION_PREFIXES,
    STUB_NAME_PREFIXES,
};

/// Noise flags for one function.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseFlags {
    pub is_plt_or_stub: bool,
    pub is_init_fini_aux: bool,
    pub is_compiler_aux: bool,
    pub is_library_like: bool,
}

/// Classify a function into noise categories.
pub fn classify_noise(
    name: Option<&str>,
    section_hint: Option<&str>,
    is_external_block: bool,
    is_thunk: bool,
    is_import: bool,
) -> NoiseFlags {
    let name_clean = name.unwrap_or("").trim();
    let name_norm = normalize_glibc_name(name_clean);

    let mut is_plt_or_stub = false;
    if let Some(section) = section_hint {
        if PLT_SECTION_PREFIXES.iter().any(|p| section.starts_with(p)) {
            is_plt_or_stub = true;
        }
    }
    if STUB_NAME_PREFIXES.iter().any(|p| name_clean.starts_with(p)) {
        is_plt_or_stub = true;
    }

    let is_init_fini_aux = AUX_INIT_FINI_NAMES.contains(&name_norm);
    let is_compiler_aux = COMPILER_AUX_NAMES.contains(&name_norm);

    let is_library_like =
        is_external_block || is_import || is_plt_or_stub || is_init_fini_aux || is_compiler_aux;

    NoiseFlags { is_plt_or_stub, is_init_fini_aux, is_compiler_aux, is_library_like }
}
