use frame_filter_common::config::BorderPolicy;

/// Map a possibly out-of-range coordinate onto `0..len` according to `policy`.
///
/// `len` must be non-zero.
pub fn resolve(policy: BorderPolicy, pos: isize, len: usize) -> usize {
    match policy {
        BorderPolicy::Reflect101 => reflect101(pos, len),
        BorderPolicy::Replicate => pos.clamp(0, len as isize - 1) as usize,
    }
}

/// Mirror `pos` around the first and last samples without repeating them,
/// so for `abcd` the sequence extends as `dcb|abcd|cba`.
///
/// Coordinates further out than one frame width keep reflecting back and forth.
pub fn reflect101(mut pos: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    while pos < 0 || pos > last {
        pos = if pos < 0 { -pos } else { 2 * last - pos };
    }
    pos as usize
}
