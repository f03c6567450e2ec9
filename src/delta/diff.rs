use super::Delta;

/// Compute a delta turning `old` into `new`.
///
/// Only the common prefix and suffix are retained; everything between is
/// replaced with a single delete and insert. Good enough for whole-file
/// reloads where edits are usually contiguous.
pub fn diff(old: &str, new: &str) -> Delta {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let removed = old_chars.len() - prefix - suffix;
    let inserted: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();

    let mut delta = Delta::new();
    delta.retain(prefix).insert(&inserted).delete(removed);
    delta.chop();
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ropey::Rope;

    #[test]
    fn test_identical_text_is_empty_delta() {
        assert!(diff("same", "same").is_empty());
    }

    #[test]
    fn test_append_retains_prefix() {
        let mut expected = Delta::new();
        expected.retain(5).insert(" world");
        assert_eq!(diff("hello", "hello world"), expected);
    }

    #[test]
    fn test_middle_replacement() {
        let mut expected = Delta::new();
        expected.retain(4).insert("X").delete(3);
        assert_eq!(diff("abcdefgh", "abcdXh"), expected);
    }

    #[test]
    fn test_repeated_characters_do_not_overlap() {
        // "aaa" -> "aa": prefix takes two, suffix must not reuse them.
        let mut expected = Delta::new();
        expected.retain(2).delete(1);
        assert_eq!(diff("aaa", "aa"), expected);
    }

    proptest! {
        #[test]
        fn diff_applied_to_old_yields_new(old in "\\PC{0,40}", new in "\\PC{0,40}") {
            let mut rope = Rope::from_str(&old);
            diff(&old, &new).apply_to(&mut rope).unwrap();
            prop_assert_eq!(rope.to_string(), new);
        }
    }
}
