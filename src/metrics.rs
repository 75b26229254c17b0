//! Pure typing metrics. Nothing in here holds state, so every function can be
//! called on each keystroke without coordination.

/// Live figures shown while a session is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveMetrics {
    pub accuracy: u32,
    pub wpm: u32,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            accuracy: 100,
            wpm: 0,
        }
    }
}

/// Result of a finished session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalReport {
    pub wpm: u32,
    pub accuracy: u32,
    pub words: usize,
    pub elapsed_secs: u32,
}

/// Number of positions where `typed` agrees with `reference`.
/// Characters past the end of `reference` never count.
pub fn correct_count(reference: &str, typed: &str) -> usize {
    reference
        .chars()
        .zip(typed.chars())
        .filter(|(expected, actual)| expected == actual)
        .count()
}

pub fn accuracy(reference: &str, typed: &str) -> u32 {
    let total = typed.chars().count();
    if total == 0 {
        return 100;
    }

    let correct = correct_count(reference, typed);
    (correct as f64 * 100.0 / total as f64).round() as u32
}

pub fn word_count(typed: &str) -> usize {
    typed.split_whitespace().count()
}

pub fn wpm(words: usize, elapsed_secs: u32) -> u32 {
    if elapsed_secs == 0 {
        return 0;
    }

    // words / (elapsed / 60)
    (words as f64 * 60.0 / elapsed_secs as f64).round() as u32
}

/// Seconds used for the final score. A session that ends before a single
/// tick has fired is scored against the whole configured duration.
pub fn effective_elapsed_secs(duration_total: u32, duration_remaining: u32) -> u32 {
    match duration_total.saturating_sub(duration_remaining) {
        0 => duration_total,
        elapsed => elapsed,
    }
}

pub fn compute_live(reference: &str, typed: &str, elapsed_secs: u32) -> LiveMetrics {
    LiveMetrics {
        accuracy: accuracy(reference, typed),
        wpm: wpm(word_count(typed), elapsed_secs),
    }
}

pub fn compute_final(reference: &str, typed: &str, effective_elapsed_secs: u32) -> FinalReport {
    let words = word_count(typed);
    FinalReport {
        wpm: wpm(words, effective_elapsed_secs),
        accuracy: accuracy(reference, typed),
        words,
        elapsed_secs: effective_elapsed_secs,
    }
}
