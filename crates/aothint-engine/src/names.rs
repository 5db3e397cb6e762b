//! Type name normalization
//!
//! The engine keys everything by internal names: slashed package separators,
//! `$` for nested classes, and one `[]` suffix per array dimension
//! (`com/example/Outer$Inner[][]`). These helpers convert the dotted and
//! descriptor forms found in configuration and tag attributes.

/// Convert `a.b.C` to `a/b/C`
pub fn to_slashed(name: &str) -> String {
    name.replace('.', "/")
}

/// Convert `a/b/C` to `a.b.C`
pub fn to_dotted(name: &str) -> String {
    name.replace('/', ".")
}

/// True if `text` looks like a field descriptor for a reference type
pub fn is_reference_descriptor(text: &str) -> bool {
    text.starts_with('[') || (text.starts_with('L') && text.ends_with(';') && text.len() > 2)
}

/// Normalize a dotted name, slashed name or reference descriptor to an
/// internal name with array suffixes
///
/// Returns `None` for descriptors whose element type is primitive.
pub fn normalize(name: &str) -> Option<String> {
    if !is_reference_descriptor(name) {
        return Some(to_slashed(name));
    }
    let dims = name.bytes().take_while(|b| *b == b'[').count();
    let element = &name[dims..];
    let base = element.strip_prefix('L')?.strip_suffix(';')?;
    let mut out = String::with_capacity(base.len() + 2 * dims);
    out.push_str(base);
    for _ in 0..dims {
        out.push_str("[]");
    }
    Some(out)
}

/// Split `a/b/C[][]` into `("a/b/C", 2)`
pub fn split_array(name: &str) -> (&str, usize) {
    let mut base = name;
    let mut dims = 0;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
        dims += 1;
    }
    (base, dims)
}

/// Reference descriptor for an internal name: `a/b/C[]` becomes `[La/b/C;`
pub fn descriptor_of(name: &str) -> String {
    let (base, dims) = split_array(name);
    let mut out = String::with_capacity(base.len() + dims + 2);
    for _ in 0..dims {
        out.push('[');
    }
    out.push('L');
    out.push_str(base);
    out.push(';');
    out
}

/// Package part of an internal name, empty for the default package
pub fn package_of(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[..idx],
        None => "",
    }
}

/// Name without its package (`Outer$Inner`)
pub fn short_name(name: &str) -> &str {
    match name.rfind('/') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Innermost simple name (`Inner` for `a/b/Outer$Inner`)
pub fn simple_name(name: &str) -> &str {
    let short = short_name(name);
    match short.rfind('$') {
        Some(idx) => &short[idx + 1..],
        None => short,
    }
}
