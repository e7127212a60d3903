use crate::types::{GameOutcome, Standing, Submission};

/// Result of counting the votes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Indices into the submission list, in submission order, all sharing
    /// the highest (nonzero) vote count
    Winners { indices: Vec<usize>, votes: usize },
    /// Nobody voted, or there was nothing to vote on
    NoVotes,
}

/// Pick the winner(s) among the submissions
///
/// Every submission tied on the highest vote count wins. Zero votes across
/// the board is "no winner", not an everyone-wins tie.
pub fn resolve_winners(submissions: &[Submission]) -> Resolution {
    let max_votes = submissions
        .iter()
        .map(Submission::vote_count)
        .max()
        .unwrap_or(0);

    if max_votes == 0 {
        return Resolution::NoVotes;
    }

    let indices = submissions
        .iter()
        .enumerate()
        .filter(|(_, s)| s.vote_count() == max_votes)
        .map(|(i, _)| i)
        .collect();

    Resolution::Winners {
        indices,
        votes: max_votes,
    }
}

impl Resolution {
    /// Turn indices into displayable standings
    pub fn into_outcome(self, submissions: &[Submission]) -> GameOutcome {
        match self {
            Resolution::NoVotes => GameOutcome::NoVotes,
            Resolution::Winners { indices, votes } => GameOutcome::Winners {
                votes,
                winners: indices
                    .into_iter()
                    .filter_map(|i| {
                        submissions.get(i).map(|s| Standing {
                            number: i + 1,
                            author: s.author.clone(),
                            artifact: s.artifact.clone(),
                            votes: s.vote_count(),
                        })
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Submissions whose vote sets have the given sizes
    fn with_votes(counts: &[usize]) -> Vec<Submission> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let mut submission =
                    Submission::new(format!("author{}", i), format!("https://img/{}.png", i));
                submission.votes = (0..count).map(|v| format!("voter{}-{}", i, v)).collect();
                submission
            })
            .collect()
    }

    #[test]
    fn test_two_way_tie() {
        assert_eq!(
            resolve_winners(&with_votes(&[3, 3, 1])),
            Resolution::Winners {
                indices: vec![0, 1],
                votes: 3
            }
        );
    }

    #[test]
    fn test_all_zero_is_no_votes() {
        assert_eq!(resolve_winners(&with_votes(&[0, 0, 0])), Resolution::NoVotes);
    }

    #[test]
    fn test_single_submission() {
        assert_eq!(
            resolve_winners(&with_votes(&[5])),
            Resolution::Winners {
                indices: vec![0],
                votes: 5
            }
        );
    }

    #[test]
    fn test_empty_is_no_votes() {
        assert_eq!(resolve_winners(&[]), Resolution::NoVotes);
    }

    #[test]
    fn test_winner_in_the_middle() {
        assert_eq!(
            resolve_winners(&with_votes(&[1, 4, 0, 2])),
            Resolution::Winners {
                indices: vec![1],
                votes: 4
            }
        );
    }

    #[test]
    fn test_into_outcome_numbers_from_one() {
        let submissions = with_votes(&[1, 0, 1]);
        let outcome = resolve_winners(&submissions).into_outcome(&submissions);

        match outcome {
            GameOutcome::Winners { votes, winners } => {
                assert_eq!(votes, 1);
                let numbers: Vec<_> = winners.iter().map(|w| w.number).collect();
                assert_eq!(numbers, vec![1, 3]);
                assert_eq!(winners[1].author, "author2");
            }
            other => panic!("Expected winners, got {:?}", other),
        }
    }
}
