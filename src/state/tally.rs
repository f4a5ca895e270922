//! Vote aggregation for revealed rounds.

/// Mean and modes of the numeric votes in a round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub mean: Option<f64>,
    pub modes: Vec<f64>,
}

/// Parse a vote label as a number. Labels such as `?` or `☕` are not
/// numeric and take no part in the tally.
pub fn numeric_vote(label: &str) -> Option<f64> {
    label.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Aggregate vote labels. Non-numeric labels are skipped; with no numeric
/// votes the mean is absent and the mode list empty. Modes come back
/// ascending.
pub fn tally<'a, I>(votes: I) -> Tally
where
    I: IntoIterator<Item = &'a str>,
{
    let mut values: Vec<f64> = votes.into_iter().filter_map(numeric_vote).collect();
    if values.is_empty() {
        return Tally::default();
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;

    values.sort_by(f64::total_cmp);
    let mut modes = Vec::new();
    let mut best = 0;
    let mut i = 0;
    while i < values.len() {
        let run = values[i..].iter().take_while(|v| **v == values[i]).count();
        if run > best {
            best = run;
            modes.clear();
            modes.push(values[i]);
        } else if run == best {
            modes.push(values[i]);
        }
        i += run;
    }

    Tally {
        mean: Some(mean),
        modes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_single_mode() {
        let t = tally(["3", "5", "5", "8"]);
        assert_eq!(t.mean, Some(5.25));
        assert_eq!(t.modes, vec![5.0]);
    }

    #[test]
    fn ties_are_all_reported_ascending() {
        let t = tally(["8", "3", "8", "3", "1"]);
        assert_eq!(t.modes, vec![3.0, 8.0]);
    }

    #[test]
    fn non_numeric_votes_are_ignored() {
        let t = tally(["?", "☕", "2", " 4 "]);
        assert_eq!(t.mean, Some(3.0));
        assert_eq!(t.modes, vec![2.0, 4.0]);
    }

    #[test]
    fn no_numeric_votes_gives_empty_tally() {
        assert_eq!(tally(["?", "coffee"]), Tally::default());
        assert_eq!(tally(Vec::<&str>::new()), Tally::default());
    }

    #[test]
    fn fractional_votes_count() {
        assert_eq!(numeric_vote("0.5"), Some(0.5));
        assert_eq!(numeric_vote("inf"), None);
        assert_eq!(numeric_vote("NaN"), None);
    }
}
