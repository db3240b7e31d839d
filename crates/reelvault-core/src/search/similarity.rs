//! Ratcliff/Obershelp similarity: twice the matched characters over the
//! total length, where matches are found by repeatedly taking the longest
//! common block and recursing on both sides of it.

/// Similarity in `0.0..=1.0`. Two empty strings are identical.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_block(a, b, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        matched += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    matched
}

/// Longest common block within the window; the earliest one on ties.
fn longest_block(
    a: &[char],
    b: &[char],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let width = b_hi - b_lo;
    let mut best = (a_lo, b_lo, 0);
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];
    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let k = j - b_lo;
            current[k + 1] = if a[i] == b[j] { previous[k] + 1 } else { 0 };
            let run = current[k + 1];
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}
