//! Stored file names in a year directory: `NNN-name.ext`.
//!
//! The numeric prefix records upload order inside a year (`001-beach.jpg`,
//! `002-toast.mp4`, ...). Uploaded names are slugged before they hit the
//! disk so the library stays portable across filesystems and URL-safe for
//! the generated gallery:
//!
//! - `"Beach Day.JPG"` → `"001-Beach-Day.jpg"`
//! - `"photos/Été 2023.png"` → `"001-t-2023.png"` (directories and non-ASCII dropped)

/// Upload number of a stored name's stem: `"004-Beach-Day"` → `Some(4)`.
///
/// A bare number (`"001"`) counts; camera names like `"IMG-0001"` do not.
pub fn upload_number(stem: &str) -> Option<u32> {
    let prefix = stem.split_once('-').map_or(stem, |(prefix, _)| prefix);
    prefix.parse().ok()
}

/// Reduce an uploaded name's stem to `[A-Za-z0-9-]`, collapsing runs of
/// anything else into a single dash.
pub fn slug(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "media".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Compose the stored name for the `number`-th upload of a year.
pub fn stored_name(number: u32, original: &str) -> String {
    // Only the last path component; a stored name never leaves its year directory.
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext.to_ascii_lowercase())),
        _ => (base, None),
    };
    match ext {
        Some(ext) => format!("{number:03}-{}.{}", slug(stem), slug(&ext)),
        None => format!("{number:03}-{}", slug(stem)),
    }
}

/// Next free upload number given the names already in a year directory.
pub fn next_number<'a>(existing: impl IntoIterator<Item = &'a str>) -> u32 {
    existing
        .into_iter()
        .filter_map(|name| {
            let stem = name.split('.').next().unwrap_or(name);
            upload_number(stem)
        })
        .max()
        .map_or(1, |n| n + 1)
}
