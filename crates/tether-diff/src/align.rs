//! Character alignment (Myers O(ND))
//!
//! Tokens are reported from the point of view of the second string:
//! `added` holds characters only in `new`, `removed` characters only in
//! `old`. Unchanged tokens carry the characters of `new`, so when several
//! alignments are equally short the result keeps `new` as its backbone.

/// One unit of aligned output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffToken {
    /// Characters covered by this token
    pub value: String,
    /// Number of characters in `value`
    pub count: usize,
    pub added: bool,
    pub removed: bool,
}

impl DiffToken {
    pub fn unchanged(value: String) -> Self {
        Self::with_flags(value, false, false)
    }

    pub fn added(value: String) -> Self {
        Self::with_flags(value, true, false)
    }

    pub fn removed(value: String) -> Self {
        Self::with_flags(value, false, true)
    }

    fn with_flags(value: String, added: bool, removed: bool) -> Self {
        DiffToken {
            count: value.chars().count(),
            value,
            added,
            removed,
        }
    }

    /// Is this token an addition or a removal?
    #[inline]
    pub fn is_change(&self) -> bool {
        self.added || self.removed
    }

    /// Same token seen from the other string's side
    pub fn inverted(self) -> Self {
        DiffToken {
            added: self.removed,
            removed: self.added,
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edit {
    Equal,
    Delete,
    Insert,
}

/// Align `old` against `new`, treating characters as equal when `eq` says so
pub fn diff_chars<F>(old: &str, new: &str, eq: F) -> Vec<DiffToken>
where
    F: Fn(char, char) -> bool,
{
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    let edits = shortest_edit(&old, &new, &eq);
    build_tokens(&edits, &old, &new)
}

/// Shortest edit script between `old` and `new`
///
/// Runs in O((N + M) * D) time for D edits. Each round keeps only the
/// diagonals it can reach, so the trace needs O(D^2) memory. Inputs are
/// answer-sized: a few hundred characters with a handful of edits.
fn shortest_edit<F>(old: &[char], new: &[char], eq: &F) -> Vec<Edit>
where
    F: Fn(char, char) -> bool,
{
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    // Diagonal k lives at index k + offset; k ranges over [-max - 1, max + 1]
    let offset = max + 1;
    let at = |k: isize| (k + offset) as usize;

    let mut v = vec![0isize; (2 * max + 3) as usize];
    // Round d only reads diagonals [-d - 1, d + 1] of the previous round
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v[at(-d - 1)..=at(d + 1)].to_vec());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[at(k - 1)] < v[at(k + 1)]) {
                v[at(k + 1)]
            } else {
                v[at(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && eq(old[x as usize], new[y as usize]) {
                x += 1;
                y += 1;
            }
            v[at(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the trace backwards from (n, m)
    let mut edits = Vec::with_capacity(max as usize);
    let (mut x, mut y) = (n, m);
    for (d, band) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let reach = |k: isize| band[(k + d + 1) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && reach(k - 1) < reach(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = reach(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(Edit::Equal);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            edits.push(if x == prev_x { Edit::Insert } else { Edit::Delete });
        }
        x = prev_x;
        y = prev_y;
    }
    edits.reverse();
    edits
}

/// Group an edit script into tokens, removals first within each change run
fn build_tokens(edits: &[Edit], old: &[char], new: &[char]) -> Vec<DiffToken> {
    let mut tokens = Vec::new();
    let mut common = String::new();
    let mut removed = String::new();
    let mut added = String::new();
    let (mut i, mut j) = (0usize, 0usize);

    for edit in edits {
        match edit {
            Edit::Equal => {
                flush_changes(&mut tokens, &mut removed, &mut added);
                common.push(new[j]);
                i += 1;
                j += 1;
            }
            Edit::Delete => {
                flush_common(&mut tokens, &mut common);
                removed.push(old[i]);
                i += 1;
            }
            Edit::Insert => {
                flush_common(&mut tokens, &mut common);
                added.push(new[j]);
                j += 1;
            }
        }
    }
    flush_changes(&mut tokens, &mut removed, &mut added);
    flush_common(&mut tokens, &mut common);

    tokens
}

fn flush_common(tokens: &mut Vec<DiffToken>, common: &mut String) {
    if !common.is_empty() {
        tokens.push(DiffToken::unchanged(std::mem::take(common)));
    }
}

fn flush_changes(tokens: &mut Vec<DiffToken>, removed: &mut String, added: &mut String) {
    if !removed.is_empty() {
        tokens.push(DiffToken::removed(std::mem::take(removed)));
    }
    if !added.is_empty() {
        tokens.push(DiffToken::added(std::mem::take(added)));
    }
}
