//! Pure next-job selection and queue rotation.
//!
//! Success removes every occurrence of the finished key and continues from
//! the position it held, so duplicates elsewhere in the queue keep their
//! turn. Failure leaves the queue alone and round-robins to the following
//! entry; whether a failing job may be attempted again at all is decided by
//! the retry ledger, not by queue membership.

/// Decide the queue contents and next key after an attempt at `current`.
///
/// Returns the (possibly rewritten) queue and the key to try next:
/// - `current` missing from `queue` (removed by a concurrent invocation):
///   queue unchanged, next is the head.
/// - `succeeded`: all occurrences of `current` removed; next is the entry now
///   at `current`'s old index, or the head when that index is past the end.
/// - failed: queue unchanged; next is the entry after `current`, wrapping to
///   the head.
pub fn select_next(
    queue: &[String],
    current: &str,
    succeeded: bool,
) -> (Vec<String>, Option<String>) {
    let Some(index) = queue.iter().position(|k| k == current) else {
        return (queue.to_vec(), queue.first().cloned());
    };

    if succeeded {
        let remaining: Vec<String> = queue.iter().filter(|k| *k != current).cloned().collect();
        let next = remaining
            .get(index)
            .or_else(|| remaining.first())
            .cloned();
        (remaining, next)
    } else {
        let next = queue[(index + 1) % queue.len()].clone();
        (queue.to_vec(), Some(next))
    }
}
