mod report;
use log::debug;

use std::cmp::Ordering;

pub use crate::report::*;

// **** Private structures ****

// A position in the election's option list.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct OptionId(usize);

// Score-round aggregates for one option.
// Invariant: the frequency entries sum to the number of ballots tabulated.
#[derive(Eq, PartialEq, Debug, Clone)]
struct OptionMetrics {
    id: OptionId,
    total: i64,
    frequency: [u32; 6],
}

impl OptionMetrics {
    fn new(id: OptionId) -> OptionMetrics {
        OptionMetrics {
            id,
            total: 0,
            frequency: [0; 6],
        }
    }

    fn record(&mut self, score: u8) {
        self.total += i64::from(score);
        self.frequency[score as usize] += 1;
    }

    fn fives(&self) -> u32 {
        self.frequency[MAX_SCORE as usize]
    }
}

/// Tabulates a STAR election: the score round over every ballot, then the
/// automatic runoff between the finalists.
///
/// Arguments:
/// * `options` the option names, in the order ballots reference them
/// * `ballots` every ballot cast, with scores aligned to `options`
///
/// The result is total and deterministic: identical inputs always produce an
/// identical winner and head-to-head matrix. A tabulation without ballots or
/// without options is valid and reports no runoff outcome.
pub fn run_star_tally(
    options: &[String],
    ballots: &[BallotScores],
) -> Result<Statistics, TallyErrors> {
    debug!(
        "run_star_tally: {} ballots over {} options",
        ballots.len(),
        options.len()
    );

    let mut metrics: Vec<OptionMetrics> = (0..options.len())
        .map(|idx| OptionMetrics::new(OptionId(idx)))
        .collect();

    for ballot in ballots.iter() {
        for score in ballot.scores.iter() {
            if *score > MAX_SCORE {
                return Err(TallyErrors::InvalidScore(*score));
            }
        }
        for m in metrics.iter_mut() {
            m.record(ballot.score_at(m.id.0));
        }
    }

    let total_ballots = ballots.len() as u32;
    let runoff = run_automatic_runoff(options, ballots, &metrics);

    let option_stats = metrics
        .iter()
        .map(|m| OptionTally {
            name: options[m.id.0].clone(),
            total_score: m.total,
            average_score: round2(mean(m.total, total_ballots)),
            frequency: m.frequency,
            total_votes: total_ballots,
        })
        .collect();

    Ok(Statistics {
        total_ballots,
        options: option_stats,
        runoff,
    })
}

fn mean(total: i64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / f64::from(count)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// The runoff stage. Returns None when no winner is determinable: an election
// without options or without ballots.
fn run_automatic_runoff(
    options: &[String],
    ballots: &[BallotScores],
    metrics: &[OptionMetrics],
) -> Option<RunoffOutcome> {
    if metrics.is_empty() || ballots.is_empty() {
        return None;
    }

    let finalists = select_finalists(metrics);
    debug!(
        "run_automatic_runoff: finalists {:?}",
        finalists.iter().map(|m| m.id).collect::<Vec<_>>()
    );

    if finalists.len() < 2 {
        // Degenerate single-option election: the score round decides outright.
        return Some(RunoffOutcome {
            winner: options[finalists[0].id.0].clone(),
            finalists: vec![options[finalists[0].id.0].clone()],
            matchups: Vec::new(),
        });
    }

    let mut matchups: Vec<Matchup> = Vec::new();
    // Head-to-head points accumulated per finalist across every matchup.
    let mut points: Vec<u32> = vec![0; finalists.len()];
    for i in 0..finalists.len() {
        for j in (i + 1)..finalists.len() {
            let (p1, p2, neither) = head_to_head(ballots, finalists[i].id, finalists[j].id);
            points[i] += p1;
            points[j] += p2;
            matchups.push(Matchup {
                finalists: (
                    options[finalists[i].id.0].clone(),
                    options[finalists[j].id.0].clone(),
                ),
                points: (p1, p2),
                no_preference: neither,
            });
        }
    }

    // The tie-break cascade: head-to-head points, then total score, then the
    // count of maximum ratings, then the option order.
    let mut ranked: Vec<(usize, &OptionMetrics)> =
        finalists.iter().enumerate().map(|(i, m)| (i, m)).collect();
    ranked.sort_by(|(i, a), (j, b)| {
        points[*j]
            .cmp(&points[*i])
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| b.fives().cmp(&a.fives()))
            .then_with(|| a.id.cmp(&b.id))
    });
    let winner = ranked[0].1.id;

    Some(RunoffOutcome {
        winner: options[winner.0].clone(),
        finalists: finalists.iter().map(|m| options[m.id.0].clone()).collect(),
        matchups,
    })
}

// The options holding the two highest total scores, best first. Every option
// tied with the second-place total enters as a co-finalist.
fn select_finalists(metrics: &[OptionMetrics]) -> Vec<OptionMetrics> {
    let mut sorted: Vec<OptionMetrics> = metrics.to_vec();
    sorted.sort_by(|a, b| match b.total.cmp(&a.total) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
    if sorted.len() <= 2 {
        return sorted;
    }
    let cutoff = sorted[1].total;
    sorted.retain(|m| m.total >= cutoff);
    sorted
}

// One pairwise matchup: for every ballot, the option scored strictly higher
// earns one point; a ballot scoring both equally prefers neither.
fn head_to_head(ballots: &[BallotScores], a: OptionId, b: OptionId) -> (u32, u32, u32) {
    ballots
        .iter()
        .fold((0, 0, 0), |(pa, pb, neither), ballot| {
            match ballot.score_at(a.0).cmp(&ballot.score_at(b.0)) {
                Ordering::Greater => (pa + 1, pb, neither),
                Ordering::Less => (pa, pb + 1, neither),
                Ordering::Equal => (pa, pb, neither + 1),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn ballots(rows: &[&[u8]]) -> Vec<BallotScores> {
        rows.iter().map(|r| BallotScores::new(r.to_vec())).collect()
    }

    #[test]
    fn score_round_totals_are_exact() {
        let stats = run_star_tally(
            &names(&["A", "B", "C"]),
            &ballots(&[&[5, 3, 0], &[4, 5, 1]]),
        )
        .unwrap();
        assert_eq!(stats.total_ballots, 2);
        assert_eq!(stats.options[0].total_score, 9);
        assert_eq!(stats.options[1].total_score, 8);
        assert_eq!(stats.options[2].total_score, 1);
        assert_eq!(stats.options[0].average_score, 4.5);
        assert_eq!(stats.options[2].average_score, 0.5);
    }

    #[test]
    fn frequency_sums_to_total_votes() {
        let stats = run_star_tally(
            &names(&["A", "B"]),
            &ballots(&[&[5, 3], &[4, 5], &[0, 0], &[2, 2]]),
        )
        .unwrap();
        for opt in stats.options.iter() {
            let counted: u32 = opt.frequency.iter().sum();
            assert_eq!(counted, opt.total_votes);
            assert_eq!(opt.total_votes, stats.total_ballots);
        }
    }

    #[test]
    fn runoff_tie_falls_back_to_total_score() {
        // A and B tie 1-1 in the runoff; A wins on the higher total.
        let stats = run_star_tally(
            &names(&["A", "B", "C"]),
            &ballots(&[&[5, 3, 0], &[4, 5, 1]]),
        )
        .unwrap();
        let runoff = stats.runoff.unwrap();
        assert_eq!(runoff.winner, "A");
        assert_eq!(runoff.finalists, names(&["A", "B"]));
        assert_eq!(runoff.matchups.len(), 1);
        assert_eq!(runoff.matchups[0].points, (1, 1));
        assert_eq!(runoff.matchups[0].no_preference, 0);
    }

    #[test]
    fn runoff_beats_the_score_round() {
        // B wins more head-to-head points even though A has the higher total.
        let stats = run_star_tally(&names(&["A", "B"]), &ballots(&[&[5, 0], &[3, 4], &[2, 3]]))
            .unwrap();
        assert_eq!(stats.options[0].total_score, 10);
        assert_eq!(stats.options[1].total_score, 7);
        assert_eq!(stats.winner(), Some("B"));
    }

    #[test]
    fn full_tie_resolves_by_option_order() {
        // Identical columns: equal totals, equal head-to-head, equal fives.
        let stats = run_star_tally(&names(&["first", "second"]), &ballots(&[&[5, 5], &[2, 2]]))
            .unwrap();
        assert_eq!(stats.winner(), Some("first"));
    }

    #[test]
    fn five_star_count_breaks_equal_totals() {
        // Equal totals and an even runoff; B carries more maximum ratings.
        let stats = run_star_tally(
            &names(&["A", "B"]),
            &ballots(&[&[4, 2], &[3, 5], &[1, 1]]),
        )
        .unwrap();
        assert_eq!(stats.options[0].total_score, 8);
        assert_eq!(stats.options[1].total_score, 8);
        let runoff = stats.runoff.clone().unwrap();
        assert_eq!(runoff.matchups[0].points.0, runoff.matchups[0].points.1);
        assert_eq!(stats.winner(), Some("B"));
    }

    #[test]
    fn second_place_tie_brings_in_co_finalists() {
        let stats = run_star_tally(
            &names(&["A", "B", "C"]),
            &ballots(&[&[5, 4, 4], &[4, 4, 4]]),
        )
        .unwrap();
        let runoff = stats.runoff.unwrap();
        assert_eq!(runoff.finalists, names(&["A", "B", "C"]));
        // Full round-robin between the three finalists.
        assert_eq!(runoff.matchups.len(), 3);
        assert_eq!(runoff.winner, "A");
    }

    #[test]
    fn no_ballots_reports_no_winner() {
        let stats = run_star_tally(&names(&["A", "B"]), &[]).unwrap();
        assert_eq!(stats.total_ballots, 0);
        assert!(stats.runoff.is_none());
        assert_eq!(stats.options[0].total_score, 0);
        assert_eq!(stats.options[0].average_score, 0.0);
    }

    #[test]
    fn short_ballot_counts_missing_entries_as_zero() {
        let stats = run_star_tally(&names(&["A", "B"]), &ballots(&[&[5], &[3, 4]])).unwrap();
        assert_eq!(stats.options[1].total_score, 4);
        assert_eq!(stats.options[1].frequency[0], 1);
        assert_eq!(stats.options[1].frequency[4], 1);
        let counted: u32 = stats.options[1].frequency.iter().sum();
        assert_eq!(counted, 2);
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let res = run_star_tally(&names(&["A", "B"]), &ballots(&[&[6, 0]]));
        assert_eq!(res, Err(TallyErrors::InvalidScore(6)));
    }

    #[test]
    fn tabulation_is_deterministic() {
        let opts = names(&["A", "B", "C", "D"]);
        let rows = ballots(&[&[5, 5, 1, 0], &[0, 2, 5, 5], &[3, 3, 3, 3], &[1, 4, 2, 5]]);
        let first = run_star_tally(&opts, &rows).unwrap();
        let second = run_star_tally(&opts, &rows).unwrap();
        assert_eq!(first, second);
    }
}
