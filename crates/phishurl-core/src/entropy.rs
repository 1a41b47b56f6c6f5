use std::collections::BTreeMap;

/// Computes the Shannon entropy, in bits, of the characters of a string.
///
/// Frequencies are taken over Unicode scalar values, so a URL with
/// non-ASCII characters is measured by what it displays, not its UTF-8
/// bytes. The empty string has entropy 0.0.
///
/// Terms are summed in order of each character's first appearance, so the
/// result is bit-identical across calls, threads and processes.
pub fn shannon_entropy(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let mut slot: BTreeMap<char, usize> = BTreeMap::new();
    let mut freq: Vec<usize> = Vec::new();
    let mut total = 0usize;
    for c in text.chars() {
        let idx = *slot.entry(c).or_insert_with(|| {
            freq.push(0);
            freq.len() - 1
        });
        freq[idx] += 1;
        total += 1;
    }
    let len = total as f64;
    let mut out = 0.0;
    for &c in &freq {
        let p = c as f64 / len;
        out -= p * p.log2();
    }
    out
}
