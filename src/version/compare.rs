//! Composer-style multi-part version comparison
//!
//! Normalized Composer versions (`1.2.3.0`, `2.0.0.0-beta1`, `1.9999999.9999999.9999999-dev`)
//! are not semver, so they are compared segment by segment:
//!
//! - `-`, `_`, `+` and any other non-alphanumeric character separate segments
//! - a switch between digits and letters also starts a new segment (`beta1` -> `beta`, `1`)
//! - numeric segments compare numerically
//! - word segments rank `dev < alpha = a < beta = b < RC = rc < (number) < pl = p`,
//!   unknown words rank below `dev`
//! - when one side runs out, a remaining numeric segment makes the longer side higher,
//!   a remaining word segment is ranked against a release (so `1.0-beta` < `1.0`)

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Number(&'a str),
    Word(&'a str),
}

/// Rank given to a numeric segment when compared against a word
const RELEASE_RANK: i8 = 4;

/// Rank of words that are not a known stability form
const UNKNOWN_RANK: i8 = -6;

const FORMS: &[(&str, i8)] = &[
    ("dev", 0),
    ("alpha", 1),
    ("a", 1),
    ("beta", 2),
    ("b", 2),
    ("RC", 3),
    ("rc", 3),
    ("pl", 5),
    ("p", 5),
];

fn word_rank(word: &str) -> i8 {
    FORMS
        .iter()
        .find(|(form, _)| word.starts_with(form))
        .map_or(UNKNOWN_RANK, |(_, rank)| *rank)
}

fn segments(version: &str) -> Vec<Segment<'_>> {
    let mut result = Vec::new();
    let mut start: Option<usize> = None;
    let mut digits = false;

    for (index, c) in version.char_indices() {
        if !c.is_ascii_alphanumeric() {
            if let Some(begin) = start.take() {
                result.push(make_segment(&version[begin..index], digits));
            }
            continue;
        }

        let is_digit = c.is_ascii_digit();
        match start {
            Some(begin) if is_digit != digits => {
                result.push(make_segment(&version[begin..index], digits));
                start = Some(index);
            }
            Some(_) => {}
            None => start = Some(index),
        }
        digits = is_digit;
    }

    if let Some(begin) = start {
        result.push(make_segment(&version[begin..], digits));
    }

    result
}

fn make_segment(text: &str, digits: bool) -> Segment<'_> {
    if digits {
        Segment::Number(text)
    } else {
        Segment::Word(text)
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_segments(a: &Segment<'_>, b: &Segment<'_>) -> Ordering {
    match (a, b) {
        (Segment::Number(a), Segment::Number(b)) => compare_numbers(a, b),
        (Segment::Word(a), Segment::Word(b)) => word_rank(a).cmp(&word_rank(b)),
        (Segment::Number(_), Segment::Word(b)) => RELEASE_RANK.cmp(&word_rank(b)),
        (Segment::Word(a), Segment::Number(_)) => word_rank(a).cmp(&RELEASE_RANK),
    }
}

/// Ranks the first segment left over on the longer side against the end of the shorter one
fn compare_remainder(first: &Segment<'_>) -> Ordering {
    match first {
        Segment::Number(_) => Ordering::Greater,
        Segment::Word(word) => word_rank(word).cmp(&RELEASE_RANK),
    }
}

/// Compare two versions using Composer ordering
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = compare_segments(l, r);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    match left.len().cmp(&right.len()) {
        Ordering::Greater => compare_remainder(&left[right.len()]),
        Ordering::Less => compare_remainder(&right[left.len()]).reverse(),
        Ordering::Equal => Ordering::Equal,
    }
}
