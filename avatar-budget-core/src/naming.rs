//! Object naming rules shared by the scene arena and the selection bridge

/// Strip a trailing `.<digits>` duplication suffix.
///
/// `"Hips.002"` becomes `"Hips"`; `"Hips.abc"`, `"Hips."` and `"Hips"` are
/// returned unchanged.
pub fn base_name(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    }
}

/// True if `name` or its base name appears in `list`
pub fn matches_name_list<S: AsRef<str>>(name: &str, list: &[S]) -> bool {
    let base = base_name(name);
    list.iter()
        .any(|entry| entry.as_ref() == name || entry.as_ref() == base)
}

/// Pick a name not accepted by `taken`, appending `.001`, `.002`, ... to the base name
pub fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    let base = base_name(name);
    (1u32..)
        .map(|n| format!("{base}.{n:03}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}
