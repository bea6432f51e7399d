// ── Path canonicalization ─────────────────────────────────────────────────────
//
// Pure string rules; the only OS input is the current directory, supplied by
// the caller as a closure so network paths never query it.  Separators and
// dots are ASCII, so splicing bytes here never splits a UTF-8 sequence.
// No `unsafe`, no Win32 imports.

use crate::error::{BackendError, Result};

/// The platform's native separator.
pub const SEPARATOR: char = '\\';

const SEP: u8 = b'\\';

/// Produce the canonical absolute form of `input`.
///
/// `current_dir` must return an absolute path; it is called at most once and
/// not at all for `\\server\share` input.  The result is absolute, uses `\`
/// exclusively, contains no `.` or `..` segment, and has no trailing
/// separator other than the root's own.
pub fn canonicalize<F>(input: &str, current_dir: F) -> Result<String>
where
    F: FnOnce() -> Result<String>,
{
    if input.is_empty() {
        return Err(BackendError::InvalidArgument);
    }
    let input = input.replace('/', "\\");
    let bytes = input.as_bytes();

    let assembled = if bytes.starts_with(b"\\\\") {
        input
    } else {
        let mut cwd = current_dir()?.replace('/', "\\");
        if cwd.is_empty() {
            return Err(BackendError::InvalidArgument);
        }
        if !cwd.ends_with(SEPARATOR) {
            cwd.push(SEPARATOR);
        }
        assemble(&input, &cwd)
    };

    Ok(normalize(&assembled))
}

/// Resolve `input` (not a network path) against `cwd` (absolute, separator
/// terminated) without touching the lexical content of either.
fn assemble(input: &str, cwd: &str) -> String {
    let bytes = input.as_bytes();

    if let Some(drive) = drive_letter(input) {
        let rest = &input[2..];
        if bytes.get(2) == Some(&SEP) {
            // "X:\…" is already absolute.
            return input.to_owned();
        }
        // "X:rest" is relative to the current directory only when X is the
        // current drive; on any other drive it names that drive's root.
        return match drive_letter(cwd) {
            Some(current) if current.eq_ignore_ascii_case(&drive) => format!("{cwd}{rest}"),
            _ => format!("{drive}:\\{rest}"),
        };
    }

    if bytes.first() == Some(&SEP) {
        // Drive-relative: root of the current directory's volume.
        return match drive_letter(cwd) {
            Some(current) => format!("{current}:{input}"),
            None => {
                let root = &cwd[..root_len(cwd.as_bytes())];
                format!("{}{}", root.trim_end_matches(SEPARATOR), input)
            }
        };
    }

    format!("{cwd}{input}")
}

/// Remove `.` and `..` segments, collapse repeated separators, and drop a
/// trailing separator that is not part of the root.
///
/// `..` above the root clamps to the root.  Input is expected to use `\`.
pub fn normalize(path: &str) -> String {
    let mut buf = collapse_separators(path.as_bytes());
    let root = root_len(&buf);

    let mut p = root.saturating_sub(1);
    while let Some(found) = find_dot_segment(&buf, p) {
        p = found;
        let next = buf.get(p + 2).copied();
        match next {
            // "\.\" → "\"
            Some(SEP) => {
                buf.drain(p..p + 2);
            }
            // trailing "\."
            None => {
                let keep = if p < root { p + 1 } else { p };
                buf.truncate(keep);
            }
            Some(b'.') if is_segment_end(&buf, p + 3) => {
                p = remove_parent(&mut buf, p, root);
            }
            _ => p += 1,
        }
    }

    if buf.len() > root && buf.last() == Some(&SEP) {
        buf.pop();
    }
    buf.shrink_to_fit();

    // Only whole ASCII bytes were removed, so the content is still UTF-8.
    String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Splice out the `..` segment whose separator sits at `p`, together with the
/// segment before it.  Returns the position scanning resumes from.
fn remove_parent(buf: &mut Vec<u8>, p: usize, root: usize) -> usize {
    if p < root {
        // ".." at the root: turn it into a "." marker and let the next pass
        // remove that.
        buf.remove(p + 1);
        return p;
    }

    let prev = buf[..p].iter().rposition(|&c| c == SEP);
    let seg_start = prev.map_or(root, |q| q + 1);
    let dotdot_end = p + 3;

    if dotdot_end < buf.len() {
        // "…\prev\..\rest" → "…\rest"
        buf.drain(seg_start..=dotdot_end);
    } else {
        // "…\prev\.." → "…", keeping a root separator.
        let keep = match prev {
            Some(q) if q + 1 > root => q,
            Some(q) => q + 1,
            None => root,
        };
        buf.truncate(keep);
    }
    prev.unwrap_or(root)
}

/// Index of the next `\.` at or after `from`.
fn find_dot_segment(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\\.")
        .map(|i| i + from)
}

fn is_segment_end(buf: &[u8], i: usize) -> bool {
    i >= buf.len() || buf[i] == SEP
}

/// Collapse runs of separators, preserving a leading `\\` network prefix.
fn collapse_separators(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let keep_double = bytes.starts_with(b"\\\\");
    for (i, &c) in bytes.iter().enumerate() {
        if c == SEP && out.last() == Some(&SEP) && !(keep_double && i == 1) {
            continue;
        }
        out.push(c);
    }
    out
}

/// Length of the root prefix that `..` can never climb above:
/// `X:\` (3), `X:` (2), `\\server\share\` (through the share's separator),
/// `\` (1), or nothing for a relative path.
///
/// A network prefix only covers names that are not `.` or `..`: a missing
/// or dotted share stops the root after `\\server\`, a dotted server stops
/// it after the leading `\\`.
fn root_len(bytes: &[u8]) -> usize {
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return if bytes.get(2) == Some(&SEP) { 3 } else { 2 };
    }
    if bytes.starts_with(b"\\\\") {
        return network_root_len(bytes);
    }
    usize::from(bytes.first() == Some(&SEP))
}

fn network_root_len(bytes: &[u8]) -> usize {
    let next_sep = |from: usize| {
        bytes
            .get(from..)?
            .iter()
            .position(|&c| c == SEP)
            .map(|i| i + from)
    };
    let is_dots = |seg: &[u8]| seg == b"." || seg == b"..";

    let Some(server_end) = next_sep(2) else {
        return if is_dots(&bytes[2..]) { 2 } else { bytes.len() };
    };
    if is_dots(&bytes[2..server_end]) {
        return 2;
    }
    let share_start = server_end + 1;
    match next_sep(share_start) {
        Some(share_end) if !is_dots(&bytes[share_start..share_end]) => share_end + 1,
        Some(_) => share_start,
        None if is_dots(&bytes[share_start..]) => share_start,
        None => bytes.len(),
    }
}

/// The drive letter of `path` when it starts with `X:`.
fn drive_letter(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let letter = chars.next()?;
    (letter.is_ascii_alphabetic() && chars.next() == Some(':')).then_some(letter)
}

// ── Helpers used by the Win32 layer ───────────────────────────────────────────

/// Concatenate `prepend`, `dir`, and `append`, converting every `/` to `\`.
pub fn join(prepend: Option<&str>, dir: &str, append: Option<&str>) -> String {
    let mut out = String::with_capacity(
        prepend.map_or(0, str::len) + dir.len() + append.map_or(0, str::len),
    );
    out.push_str(prepend.unwrap_or(""));
    out.push_str(dir);
    out.push_str(append.unwrap_or(""));
    out.replace('/', "\\")
}

/// The `FindFirstFileW` query for `dir`: exactly one trailing separator
/// followed by `*`.
pub fn wildcard_query(dir: &str) -> Result<String> {
    if dir.is_empty() {
        return Err(BackendError::InvalidArgument);
    }
    let mut query = String::with_capacity(dir.len() + 2);
    query.push_str(dir);
    if !dir.ends_with(SEPARATOR) {
        query.push(SEPARATOR);
    }
    query.push('*');
    Ok(query)
}

/// `.` and `..`, which directory enumeration never reports.
pub fn is_pseudo_entry(name: &str) -> bool {
    name == "." || name == ".."
}

/// `path` up to and including its last separator.
pub fn directory_of(path: &str) -> Result<&str> {
    path.rfind(SEPARATOR)
        .map(|i| &path[..=i])
        .ok_or(BackendError::NoDirectory)
}

/// Append a separator unless `dir` already ends with one.
pub fn with_trailing_separator(mut dir: String) -> String {
    if !dir.ends_with(SEPARATOR) {
        dir.push(SEPARATOR);
    }
    dir
}

// ── Tests ─────────────────────────────────────────────────────────────────────
