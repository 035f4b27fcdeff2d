//! LLM response parsing into legal decisions.
//!
//! Models are asked for a bare keyword, room name or agent name, but they
//! answer in every shape: JSON objects, markdown code blocks, whole
//! sentences. Parsing normalizes the response to upper-case text and scans
//! it against the options the agent actually had. A response that names
//! none of them is a [`RunnerError::Parse`], which the core turns into the
//! safe default.

use airlock_types::{AgentId, Ballot, MovementAction, RoomId, Utterance, WorldView};

use crate::error::RunnerError;

/// Longest utterance kept, in characters.
pub const MAX_UTTERANCE_CHARS: usize = 400;

/// Shape of a JSON answer, when the model insists on one.
#[derive(Debug, serde::Deserialize)]
struct RawAnswer {
    #[serde(alias = "action_type", alias = "vote", alias = "choice")]
    action: String,
    #[serde(default, alias = "destination", alias = "room", alias = "body")]
    target: Option<String>,
}

/// Normalize a raw response: unwrap JSON or a code block, then upper-case.
fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = extract_from_codeblock(trimmed).unwrap_or(trimmed);
    match serde_json::from_str::<RawAnswer>(inner) {
        Ok(answer) => {
            format!("{} {}", answer.action, answer.target.unwrap_or_default()).to_uppercase()
        }
        Err(_) => inner.to_uppercase(),
    }
}

/// Extract the body of the first markdown code block.
fn extract_from_codeblock(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = text.get(open.checked_add(3)?..)?;
    // Skip an info string such as `json`.
    let body_start = after_fence.find('\n').and_then(|nl| nl.checked_add(1)).unwrap_or(0);
    let body = after_fence.get(body_start..)?;
    let close = body.find("```")?;
    body.get(..close).map(str::trim)
}

/// Every `Agent_<n>` mentioned in `upper`, in order of appearance.
fn agent_mentions(upper: &str) -> Vec<AgentId> {
    upper
        .match_indices("AGENT_")
        .filter_map(|(at, prefix)| {
            let rest = upper.get(at.checked_add(prefix.len())?..)?;
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok().filter(|n| *n > 0).map(AgentId::new)
        })
        .collect()
}

/// The room in `rooms` mentioned earliest in `upper`.
fn earliest_room<'a>(upper: &str, rooms: &'a [RoomId]) -> Option<&'a RoomId> {
    rooms
        .iter()
        .filter_map(|room| upper.find(&room.as_str().to_uppercase()).map(|at| (at, room)))
        .min_by_key(|(at, room)| (*at, std::cmp::Reverse(room.as_str().len())))
        .map(|(_, room)| room)
}

/// Map a movement-phase answer onto the actions `view` allows.
///
/// Keywords are checked in order ELIMINATE, REPORT, BUTTON, then rooms.
/// A keyword whose action is not available falls through to the next.
pub fn parse_movement(raw: &str, view: &WorldView) -> Result<MovementAction, RunnerError> {
    let upper = normalize(raw);
    let mentioned = agent_mentions(&upper);

    if (upper.contains("ELIMINATE") || upper.contains("KILL"))
        && let Some(target) = mentioned
            .iter()
            .find(|id| view.eliminable.contains(id))
            .or_else(|| view.eliminable.first())
    {
        return Ok(MovementAction::Eliminate { target: *target });
    }

    if upper.contains("REPORT")
        && let Some(body) = mentioned
            .iter()
            .find(|id| view.bodies.contains(id))
            .or_else(|| view.bodies.first())
    {
        return Ok(MovementAction::Report { body: *body });
    }

    if upper.contains("BUTTON") && view.button_available {
        return Ok(MovementAction::PressButton);
    }

    if let Some(room) = earliest_room(&upper, &view.exits) {
        return Ok(MovementAction::Move { to: room.clone() });
    }

    let here = view.self_state.room.as_str().to_uppercase();
    if upper.contains(&here) || upper.contains("STAY") || upper.contains("WAIT") {
        return Ok(MovementAction::Stay);
    }

    Err(RunnerError::Parse(raw.trim().to_owned()))
}

/// Clean a discussion answer into an utterance.
///
/// Strips quotes and a leading `Agent_<n>:` speaker tag, collapses
/// whitespace, and caps the length.
pub fn parse_utterance(raw: &str, speaker: AgentId) -> Result<Utterance, RunnerError> {
    let mut text = raw.trim();
    let tag = format!("{speaker}:");
    if let Some(rest) = text.strip_prefix(tag.as_str()) {
        text = rest.trim_start();
    }
    let text = text.trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let collapsed: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_UTTERANCE_CHARS)
        .collect();
    if collapsed.is_empty() {
        return Err(RunnerError::Parse(raw.to_owned()));
    }
    Ok(Utterance::new(collapsed))
}

/// Map a voting answer onto a ballot.
///
/// The first mentioned candidate wins. A named non-candidate is passed
/// through so the meeting records the vote as illegal.
pub fn parse_ballot(raw: &str, candidates: &[AgentId]) -> Result<Ballot, RunnerError> {
    let upper = normalize(raw);
    let mentioned = agent_mentions(&upper);
    if let Some(candidate) = mentioned.iter().find(|id| candidates.contains(id)) {
        return Ok(Ballot::Candidate(*candidate));
    }
    if upper.contains("SKIP") {
        return Ok(Ballot::Skip);
    }
    mentioned
        .first()
        .map(|id| Ballot::Candidate(*id))
        .ok_or_else(|| RunnerError::Parse(raw.trim().to_owned()))
}
