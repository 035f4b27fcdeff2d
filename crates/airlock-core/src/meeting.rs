//! Meeting sub-machine: discussion turns, ballots and resolution.
//!
//! A meeting is opened by the winning trigger of a movement sub-step. It
//! discovers every body on the map, freezes the candidate list to the agents
//! active at that moment, and collects one utterance per candidate per turn
//! followed by one ballot each. Resolution is a strict plurality: SKIP never
//! counts for anyone and a tie at the top ejects nobody.

use std::collections::BTreeMap;

use airlock_agents::{AgentError, AgentStore};
use airlock_types::{
    AgentId, Ballot, Body, DegradedReason, DiscussionEntry, GameId, MeetingCause, MeetingId,
    ResultsEntry, TranscriptEntry, Utterance, VoteCount,
};
use tracing::{debug, info, warn};

use crate::fanout::Gathered;
use crate::movement::Trigger;
use crate::state::GameState;

/// An open meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingState {
    /// Meeting identifier.
    pub id: MeetingId,
    /// What opened the meeting.
    pub cause: MeetingCause,
    /// Who opened it.
    pub caller: AgentId,
    /// The reported body, for body reports.
    pub reported_body: Option<AgentId>,
    /// Bodies discovered when the meeting opened.
    pub bodies: Vec<Body>,
    /// Completed discussion turns, in turn then canonical order.
    pub transcript: Vec<TranscriptEntry>,
    /// Agents that may be voted for (everyone active at open).
    pub candidates: Vec<AgentId>,
    /// Votes per candidate.
    pub tally: BTreeMap<AgentId, u32>,
    /// SKIP ballots.
    pub skips: u32,
    /// Ballot cast by each voter.
    pub ballots: BTreeMap<AgentId, Ballot>,
}

impl MeetingState {
    /// Open a meeting for `trigger`.
    ///
    /// Takes every body off the map and resets each agent's per-meeting
    /// vote counters.
    pub fn open(state: &mut GameState, trigger: Trigger) -> Self {
        let bodies = std::mem::take(&mut state.bodies);
        for record in state.agents.iter_mut() {
            record.votes_received = 0;
            record.vote_cast = None;
        }
        let candidates = state.agents.active_ids();
        info!(
            round = state.round,
            cause = %trigger.cause,
            caller = %trigger.caller,
            bodies = bodies.len(),
            candidates = candidates.len(),
            "meeting opened"
        );
        Self {
            id: MeetingId::new(),
            cause: trigger.cause,
            caller: trigger.caller,
            reported_body: trigger.body,
            bodies,
            transcript: Vec::new(),
            candidates,
            tally: BTreeMap::new(),
            skips: 0,
            ballots: BTreeMap::new(),
        }
    }

    /// Append one discussion turn in canonical order.
    ///
    /// Degraded utterances are appended as empty entries, so the transcript
    /// always holds one entry per speaker per turn.
    pub fn append_turn(
        &mut self,
        game_id: GameId,
        round: u32,
        turn: u32,
        utterances: BTreeMap<AgentId, Gathered<Utterance>>,
        agents: &mut AgentStore,
    ) -> Vec<DiscussionEntry> {
        let mut entries = Vec::with_capacity(utterances.len());
        for (speaker, gathered) in utterances {
            let degraded = gathered.degraded().is_some();
            let text = if degraded {
                if let Some(record) = agents.get_mut(speaker) {
                    record.stats.degraded_decisions =
                        record.stats.degraded_decisions.saturating_add(1);
                }
                String::new()
            } else {
                gathered.into_value().text
            };
            self.transcript.push(TranscriptEntry {
                speaker,
                turn,
                text: text.clone(),
                degraded,
            });
            entries.push(DiscussionEntry {
                game_id,
                meeting_id: self.id,
                round,
                agent_id: speaker,
                turn,
                text,
                degraded,
            });
        }
        debug!(round, turn, transcript = self.transcript.len(), "discussion turn appended");
        entries
    }

    /// Record one ballot per voter.
    ///
    /// A ballot naming a non-candidate is illegal and counts as SKIP.
    pub fn record_votes(
        &mut self,
        ballots: BTreeMap<AgentId, Gathered<Ballot>>,
        agents: &mut AgentStore,
    ) {
        for (voter, gathered) in ballots {
            let mut degraded = gathered.degraded();
            let mut ballot = gathered.into_value();
            if let Ballot::Candidate(candidate) = ballot
                && !self.candidates.contains(&candidate)
            {
                warn!(
                    voter = %voter,
                    candidate = %candidate,
                    "vote for a non-candidate counted as skip"
                );
                ballot = Ballot::Skip;
                degraded = Some(DegradedReason::Illegal);
            }

            match ballot {
                Ballot::Candidate(candidate) => {
                    let count = self.tally.entry(candidate).or_insert(0);
                    *count = count.saturating_add(1);
                    if let Some(record) = agents.get_mut(candidate) {
                        record.votes_received = record.votes_received.saturating_add(1);
                        record.stats.votes_received = record.stats.votes_received.saturating_add(1);
                    }
                }
                Ballot::Skip => {
                    self.skips = self.skips.saturating_add(1);
                }
            }

            if let Some(record) = agents.get_mut(voter) {
                record.vote_cast = Some(ballot);
                if ballot == Ballot::Skip {
                    record.stats.skipped_votes = record.stats.skipped_votes.saturating_add(1);
                }
                if degraded.is_some() {
                    record.stats.degraded_decisions =
                        record.stats.degraded_decisions.saturating_add(1);
                }
            }
            self.ballots.insert(voter, ballot);
        }
    }

    /// Resolve the vote: eject the plurality winner, if any, and credit
    /// vote correctness.
    ///
    /// A vote is correct when it names an agent of the opposite team: an
    /// honest voter naming a Byzantine agent, or a Byzantine voter naming an
    /// honest one.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the winner cannot be ejected.
    pub fn resolve(self, state: &mut GameState) -> Result<ResultsEntry, AgentError> {
        for (voter, ballot) in &self.ballots {
            let Ballot::Candidate(candidate) = ballot else {
                continue;
            };
            let Some(target_role) = state.agents.get(*candidate).map(|r| r.role()) else {
                continue;
            };
            if let Some(record) = state.agents.get_mut(*voter) {
                if record.role() == target_role {
                    record.stats.incorrect_votes = record.stats.incorrect_votes.saturating_add(1);
                } else {
                    record.stats.correct_votes = record.stats.correct_votes.saturating_add(1);
                }
            }
        }

        let ejected = plurality(&self.tally);
        if let Some(target) = ejected {
            state.agents.require_mut(target)?.eject()?;
        }
        let remaining_active = u32::try_from(state.agents.active().count()).unwrap_or(u32::MAX);
        info!(
            round = state.round,
            ejected = ejected.map(|id| id.to_string()),
            skips = self.skips,
            remaining_active,
            "meeting resolved"
        );

        Ok(ResultsEntry {
            game_id: state.game_id,
            meeting_id: self.id,
            round: state.round,
            cause: self.cause,
            caller: self.caller,
            bodies: self.bodies,
            tally: self
                .tally
                .iter()
                .map(|(candidate, votes)| VoteCount {
                    candidate: *candidate,
                    votes: *votes,
                })
                .collect(),
            skips: self.skips,
            ejected,
            remaining_active,
        })
    }
}

/// The candidate with strictly more votes than every other, if one exists.
pub fn plurality(tally: &BTreeMap<AgentId, u32>) -> Option<AgentId> {
    let mut best: Option<(AgentId, u32)> = None;
    let mut tied = false;
    for (candidate, votes) in tally {
        if *votes == 0 {
            continue;
        }
        match best {
            Some((_, top)) if *votes == top => tied = true,
            Some((_, top)) if *votes < top => {}
            _ => {
                best = Some((*candidate, *votes));
                tied = false;
            }
        }
    }
    if tied { None } else { best.map(|(id, _)| id) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_agents::AgentRecord;
    use airlock_types::{AgentStatus, Phase, Role, RoomId};

    use super::*;

    fn state() -> GameState {
        let agents = AgentStore::from_records((1..=5).map(|i| {
            let role = if i == 3 { Role::Byzantine } else { Role::Honest };
            AgentRecord::new(AgentId::new(i), role, "m", "t", RoomId::from("Admin"), None)
        }))
        .unwrap();
        let mut s = GameState::new(GameId::new(), agents);
        s.round = 1;
        s
    }

    fn button(caller: u32) -> Trigger {
        Trigger {
            caller: AgentId::new(caller),
            cause: MeetingCause::EmergencyButton,
            body: None,
        }
    }

    fn ballots(pairs: &[(u32, Ballot)]) -> BTreeMap<AgentId, Gathered<Ballot>> {
        pairs
            .iter()
            .map(|(voter, ballot)| (AgentId::new(*voter), Gathered::Decided(*ballot)))
            .collect()
    }

    fn vote_for(index: u32) -> Ballot {
        Ballot::Candidate(AgentId::new(index))
    }

    #[test]
    fn plurality_requires_a_strict_winner() {
        let a = AgentId::new(1);
        let b = AgentId::new(2);
        assert_eq!(plurality(&BTreeMap::new()), None);
        assert_eq!(plurality(&BTreeMap::from([(a, 2), (b, 1)])), Some(a));
        assert_eq!(plurality(&BTreeMap::from([(a, 2), (b, 2)])), None);
        assert_eq!(plurality(&BTreeMap::from([(a, 1), (b, 3)])), Some(b));
    }

    #[test]
    fn skip_never_counts_for_a_candidate() {
        let mut s = state();
        let mut meeting = MeetingState::open(&mut s, button(1));
        meeting.record_votes(
            ballots(&[
                (1, Ballot::Skip),
                (2, Ballot::Skip),
                (3, Ballot::Skip),
                (4, vote_for(3)),
                (5, Ballot::Skip),
            ]),
            &mut s.agents,
        );
        assert_eq!(meeting.skips, 4);
        assert_eq!(meeting.tally.get(&AgentId::new(3)), Some(&1));
        // One vote and four skips still ejects: SKIP is not a candidate.
        let results = meeting.resolve(&mut s).unwrap();
        assert_eq!(results.ejected, Some(AgentId::new(3)));
    }

    #[test]
    fn tie_at_the_top_ejects_nobody() {
        let mut s = state();
        let mut meeting = MeetingState::open(&mut s, button(1));
        meeting.record_votes(
            ballots(&[
                (1, vote_for(3)),
                (2, vote_for(3)),
                (3, vote_for(1)),
                (4, vote_for(1)),
                (5, Ballot::Skip),
            ]),
            &mut s.agents,
        );
        let results = meeting.resolve(&mut s).unwrap();
        assert_eq!(results.ejected, None);
        assert_eq!(results.remaining_active, 5);
    }

    #[test]
    fn all_skip_ejects_nobody() {
        let mut s = state();
        let mut meeting = MeetingState::open(&mut s, button(1));
        meeting.record_votes(
            ballots(&[
                (1, Ballot::Skip),
                (2, Ballot::Skip),
                (3, Ballot::Skip),
                (4, Ballot::Skip),
                (5, Ballot::Skip),
            ]),

            &mut s.agents,
        );
        assert_eq!(meeting.resolve(&mut s).unwrap().ejected, None);
    }

    #[test]
    fn vote_for_non_candidate_becomes_skip() {
        let mut s = state();
        let mut meeting = MeetingState::open(&mut s, button(1));
        meeting.record_votes(ballots(&[(1, vote_for(42))]), &mut s.agents);
        assert_eq!(meeting.skips, 1);
        assert!(meeting.tally.is_empty());
        let voter = s.agents.get(AgentId::new(1)).unwrap();
        assert_eq!(voter.vote_cast, Some(Ballot::Skip));
        assert_eq!(voter.stats.degraded_decisions, 1);
    }

    #[test]
    fn opening_resets_votes_and_clears_bodies() {
        let mut s = state();
        s.agents.require_mut(AgentId::new(5)).unwrap().eliminate().unwrap();
        s.bodies.push(Body { room: RoomId::from("Admin"), deceased: AgentId::new(5) });
        s.agents.get_mut(AgentId::new(1)).unwrap().votes_received = 3;

        let meeting = MeetingState::open(
            &mut s,
            Trigger {
                caller: AgentId::new(2),
                cause: MeetingCause::BodyReport,
                body: Some(AgentId::new(5)),
            },
        );
        assert!(s.bodies.is_empty());
        assert_eq!(meeting.bodies.len(), 1);
        assert_eq!(meeting.candidates.len(), 4);
        assert!(s.agents.iter().all(|r| r.votes_received == 0));
    }

    #[test]
    fn degraded_utterance_is_appended_empty() {
        let mut s = state();
        let mut meeting = MeetingState::open(&mut s, button(1));
        let mut utterances = BTreeMap::new();
        utterances.insert(AgentId::new(2), Gathered::Decided(Utterance::new("I saw nothing.")));
        utterances.insert(
            AgentId::new(1),
            Gathered::Degraded {
                value: Utterance::empty(),
                reason: DegradedReason::Timeout,
            },
        );
        let entries = meeting.append_turn(s.game_id, 1, 0, utterances, &mut s.agents);
        assert_eq!(entries.len(), 2);
        let speakers: Vec<u32> = meeting.transcript.iter().map(|e| e.speaker.index()).collect();
        assert_eq!(speakers, vec![1, 2]);
        assert!(meeting.transcript.first().unwrap().degraded);
        assert!(meeting.transcript.first().unwrap().text.is_empty());
    }

    #[test]
    fn vote_correctness_is_credited_by_team() {
        let mut s = state();
        let mut meeting = MeetingState::open(&mut s, button(1));
        meeting.record_votes(
            ballots(&[(1, vote_for(3)), (2, vote_for(4)), (3, vote_for(1))]),
            &mut s.agents,
        );
        let results = meeting.resolve(&mut s).unwrap();
        assert_eq!(results.ejected, None);
        assert_eq!(s.agents.get(AgentId::new(1)).unwrap().stats.correct_votes, 1);
        assert_eq!(s.agents.get(AgentId::new(2)).unwrap().stats.incorrect_votes, 1);
        assert_eq!(s.agents.get(AgentId::new(3)).unwrap().stats.correct_votes, 1);
    }

    #[test]
    fn ejection_changes_status() {
        let mut s = state();
        s.transition(Phase::Discussion).unwrap();
        let mut meeting = MeetingState::open(&mut s, button(1));
        meeting.record_votes(ballots(&[(1, vote_for(3)), (2, vote_for(3))]), &mut s.agents);
        meeting.resolve(&mut s).unwrap();
        assert_eq!(s.agents.get(AgentId::new(3)).unwrap().status(), AgentStatus::Ejected);
    }
}
