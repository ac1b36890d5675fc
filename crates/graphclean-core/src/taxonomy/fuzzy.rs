//! Indel-normalized string similarity.

/// Similarity in `0.0..=100.0` based on the insert/delete edit distance.
///
/// `100 * (1 - indel(a, b) / (len(a) + len(b)))`, which equals
/// `200 * lcs(a, b) / (len(a) + len(b))`. Two empty strings score 100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Best-scoring choice, first one winning ties.
pub fn best_match<'a, I>(query: &str, choices: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for choice in choices {
        let score = ratio(query, choice);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((choice, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("automotive", "automotive"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_ratio_known_values() {
        // lcs("medical device", "medical devices") = 14 -> 200*14/29
        let score = ratio("medical device", "medical devices");
        assert!((score - 96.551_724).abs() < 1e-4);

        // lcs("aerospce", "aerospace") = 8 -> 200*8/17
        let score = ratio("aerospce", "aerospace");
        assert!((score - 94.117_647).abs() < 1e-4);
    }

    #[test]
    fn test_ratio_is_symmetric() {
        assert_eq!(ratio("telecom", "telco"), ratio("telco", "telecom"));
    }

    #[test]
    fn test_best_match_first_wins_ties() {
        let best = best_match("ab", ["ax", "ay", "ab"]).unwrap();
        assert_eq!(best, ("ab", 100.0));
        let best = best_match("ab", ["ax", "ay"]).unwrap();
        assert_eq!(best.0, "ax");
        assert!(best_match("ab", std::iter::empty()).is_none());
    }
}
