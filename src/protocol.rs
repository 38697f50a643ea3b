//! Netsnake wire protocol
//!
//! Client→server commands are short ASCII tokens:
//!
//! | Token | Meaning        |
//! |-------|----------------|
//! | `s`   | Start session  |
//! | `r`   | Reset game     |
//! | `q`   | Quit           |
//! | `ml`/`mu`/`mr`/`md` | Turn left/up/right/down |
//!
//! Server→client state frames are ASCII datagrams shaped as
//! `<len>::<body>`, where `<body>` is `#`-joined:
//!
//! ```text
//! <ownIndex>_<playerCount> # appleX,appleY # <player> # <player> ...
//! <player> = <aliveFlag>|<score>|<headX,headY>_<headingChar>_<tailString>
//! ```
//!
//! `aliveFlag` is the single character `d` for dead (anything else is
//! alive), `headingChar` is one of `U`/`D`/`L`/`R`, and `tailString` is a
//! possibly-empty run of `u`/`d`/`l`/`r` relative moves walked from the
//! head outward. Frames carry no sequence numbers; duplicate suppression
//! happens at the transport layer by byte comparison.

use crate::error::{BridgeError, Result};
use serde::Deserialize;

/// A position on the server grid.
///
/// Wire values are non-negative, but tail walking can step outside the
/// arena on transiently out-of-sync frames, so components are signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// L1 distance to another coordinate
    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Movement/heading direction. Screen convention: y grows downward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Parse a heading character (`U`/`D`/`L`/`R`)
    pub fn from_heading_char(c: char) -> Option<Self> {
        match c {
            'U' => Some(Direction::Up),
            'D' => Some(Direction::Down),
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            _ => None,
        }
    }

    /// Parse a tail symbol (`u`/`d`/`l`/`r`)
    pub fn from_tail_char(c: char) -> Option<Self> {
        match c {
            'u' => Some(Direction::Up),
            'd' => Some(Direction::Down),
            'l' => Some(Direction::Left),
            'r' => Some(Direction::Right),
            _ => None,
        }
    }

    /// One-cell displacement in this direction
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Direction after a relative left turn
    pub fn turned_left(self) -> Self {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    /// Direction after a relative right turn
    pub fn turned_right(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }
}

/// Commands the server accepts on the wire.
///
/// The no-op action never becomes a command: it produces no wire traffic
/// at all (see [`encode_action`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Open a session (`s`)
    Start,
    /// Restart the game (`r`)
    Reset,
    /// Leave the session (`q`)
    Quit,
    /// Change heading (`ml`/`mu`/`mr`/`md`)
    Turn(Direction),
}

impl Command {
    /// Wire token for this command
    pub fn token(self) -> &'static str {
        match self {
            Command::Start => "s",
            Command::Reset => "r",
            Command::Quit => "q",
            Command::Turn(Direction::Left) => "ml",
            Command::Turn(Direction::Up) => "mu",
            Command::Turn(Direction::Right) => "mr",
            Command::Turn(Direction::Down) => "md",
        }
    }
}

/// Action-encode policy.
///
/// The 3-action policy turns relative to the snake's current heading;
/// the 5-action policy addresses directions absolutely. Both speak the
/// same wire tokens, so the choice is config, not protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSet {
    /// 0 = no-op, 1 = turn left, 2 = turn right (relative to heading)
    Three,
    /// 0 = no-op, 1..4 = turn left/up/right/down (absolute)
    #[default]
    Five,
}

impl ActionSet {
    /// Number of discrete actions in this policy
    pub fn size(self) -> usize {
        match self {
            ActionSet::Three => 3,
            ActionSet::Five => 5,
        }
    }
}

/// Encode a discrete action into a wire command.
///
/// Returns `Ok(None)` for the no-op action, and also for a relative turn
/// when no heading is known yet (no frame has been decoded since reset):
/// there is nothing meaningful to send in that case.
///
/// Fails with `InvalidAction` before any other effect when `action` is
/// outside the policy's space.
pub fn encode_action(
    set: ActionSet,
    action: usize,
    heading: Option<Direction>,
) -> Result<Option<Command>> {
    let space = set.size();
    if action >= space {
        return Err(BridgeError::InvalidAction { action, space });
    }

    let command = match set {
        ActionSet::Three => match (action, heading) {
            (0, _) => None,
            (_, None) => None,
            (1, Some(h)) => Some(Command::Turn(h.turned_left())),
            (2, Some(h)) => Some(Command::Turn(h.turned_right())),
            _ => unreachable!("action validated against space above"),
        },
        ActionSet::Five => match action {
            0 => None,
            1 => Some(Command::Turn(Direction::Left)),
            2 => Some(Command::Turn(Direction::Up)),
            3 => Some(Command::Turn(Direction::Right)),
            4 => Some(Command::Turn(Direction::Down)),
            _ => unreachable!("action validated against space above"),
        },
    };

    Ok(command)
}

/// One player's slice of a state frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerState {
    pub alive: bool,
    pub score: u32,
    pub head: Coord,
    pub heading: Direction,
    /// Relative moves from the head outward
    pub tail: Vec<Direction>,
}

impl PlayerState {
    /// Absolute tail coordinates, walked from the head outward.
    ///
    /// The chain has exactly one link per tail symbol, each Manhattan-
    /// adjacent to the previous.
    pub fn tail_chain(&self) -> Vec<Coord> {
        let mut chain = Vec::with_capacity(self.tail.len());
        let mut cursor = self.head;
        for step in &self.tail {
            let (dx, dy) = step.offset();
            cursor = Coord::new(cursor.x + dx, cursor.y + dy);
            chain.push(cursor);
        }
        chain
    }
}

/// Decoded representation of one server tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Index of our own player in `players` (always in range)
    pub own_index: usize,
    pub apple: Coord,
    pub players: Vec<PlayerState>,
}

impl Snapshot {
    /// Decode a raw datagram payload.
    ///
    /// Pure: never touches the network or the mailbox. Fails with
    /// `MalformedFrame` on any structural or numeric violation; the
    /// declared byte length is checked for being numeric but not compared
    /// against the body (the server's exact accounting is not normative).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| malformed("payload is not ASCII text"))?;
        let text = text.trim_end_matches('\n');

        let (declared_len, body) = text
            .split_once("::")
            .ok_or_else(|| malformed("missing :: separator"))?;
        let _: usize = declared_len
            .parse()
            .map_err(|_| malformed(format!("non-numeric length prefix {:?}", declared_len)))?;

        let fields: Vec<&str> = body.split('#').collect();
        if fields.len() < 2 {
            return Err(malformed("missing apple field"));
        }

        let (own_index, player_count) = fields[0]
            .split_once('_')
            .ok_or_else(|| malformed("malformed player info field"))?;
        let own_index: usize = own_index
            .parse()
            .map_err(|_| malformed(format!("non-numeric player index {:?}", own_index)))?;
        let player_count: usize = player_count
            .parse()
            .map_err(|_| malformed(format!("non-numeric player count {:?}", player_count)))?;

        let apple = parse_coord(fields[1])?;

        let players = fields[2..]
            .iter()
            .map(|field| parse_player(field))
            .collect::<Result<Vec<_>>>()?;

        if players.len() != player_count {
            return Err(malformed(format!(
                "declared {} players, frame carries {}",
                player_count,
                players.len()
            )));
        }
        if own_index >= players.len() {
            return Err(malformed(format!(
                "own index {} outside {} players",
                own_index,
                players.len()
            )));
        }

        Ok(Self {
            own_index,
            apple,
            players,
        })
    }

    /// Our own player's state
    pub fn own_player(&self) -> &PlayerState {
        // In range by the decode check
        &self.players[self.own_index]
    }
}

fn malformed(msg: impl Into<String>) -> BridgeError {
    BridgeError::MalformedFrame(msg.into())
}

fn parse_coord(s: &str) -> Result<Coord> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| malformed(format!("malformed coordinate {:?}", s)))?;
    let x = x
        .parse()
        .map_err(|_| malformed(format!("non-numeric coordinate {:?}", s)))?;
    let y = y
        .parse()
        .map_err(|_| malformed(format!("non-numeric coordinate {:?}", s)))?;
    Ok(Coord::new(x, y))
}

fn parse_player(field: &str) -> Result<PlayerState> {
    let parts: Vec<&str> = field.split('|').collect();
    let &[alive, score, snake] = parts.as_slice() else {
        return Err(malformed(format!("malformed player field {:?}", field)));
    };

    let alive = alive != "d";
    let score: u32 = score
        .parse()
        .map_err(|_| malformed(format!("non-numeric score {:?}", score)))?;

    let snake_parts: Vec<&str> = snake.split('_').collect();
    let &[head, heading, tail] = snake_parts.as_slice() else {
        return Err(malformed(format!("malformed snake field {:?}", snake)));
    };

    let head = parse_coord(head)?;

    let mut heading_chars = heading.chars();
    let heading = heading_chars
        .next()
        .and_then(Direction::from_heading_char)
        .filter(|_| heading_chars.next().is_none())
        .ok_or_else(|| malformed(format!("unknown heading {:?}", heading)))?;

    // Unknown tail symbols are skipped, matching the tolerance of the
    // reference clients
    let tail = tail.chars().filter_map(Direction::from_tail_char).collect();

    Ok(PlayerState {
        alive,
        score,
        head,
        heading,
        tail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: &str = "34::0_2#3,7#a|2|5,5_L_rrdd#d|0|9,9_U_";

    #[test]
    fn test_decode_frame() {
        let snap = Snapshot::decode(FRAME.as_bytes()).unwrap();

        assert_eq!(snap.own_index, 0);
        assert_eq!(snap.apple, Coord::new(3, 7));
        assert_eq!(snap.players.len(), 2);

        let own = snap.own_player();
        assert!(own.alive);
        assert_eq!(own.score, 2);
        assert_eq!(own.head, Coord::new(5, 5));
        assert_eq!(own.heading, Direction::Left);
        assert_eq!(own.tail.len(), 4);

        // Second player: dead, empty tail
        assert!(!snap.players[1].alive);
        assert_eq!(snap.players[1].tail.len(), 0);
    }

    #[test]
    fn test_decode_idempotent() {
        // Same bytes decode to the same snapshot
        let a = Snapshot::decode(FRAME.as_bytes()).unwrap();
        let b = Snapshot::decode(FRAME.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_strips_trailing_newline() {
        let framed = format!("{}\n", FRAME);
        assert_eq!(
            Snapshot::decode(framed.as_bytes()).unwrap(),
            Snapshot::decode(FRAME.as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let cases: &[&[u8]] = &[
            b"no separator here",
            b"xx::0_1#3,7#a|0|5,5_L_",       // non-numeric length
            b"10::0_1#3,7",                  // no players
            b"10::0_2#3,7#a|0|5,5_L_",       // player count mismatch
            b"10::1_1#3,7#a|0|5,5_L_",       // own index out of range
            b"10::0_1#3,q#a|0|5,5_L_",       // non-numeric apple
            b"10::0_1#3,7#a|zz|5,5_L_",      // non-numeric score
            b"10::0_1#3,7#a|0|5,5_X_",       // unknown heading
            b"10::0_1#3,7#a|0|5,5_L",        // missing tail part
            b"10::0_1#3,7#a|0",              // missing snake part
        ];
        for case in cases {
            let result = Snapshot::decode(case);
            assert!(
                matches!(result, Err(BridgeError::MalformedFrame(_))),
                "expected MalformedFrame for {:?}, got {:?}",
                String::from_utf8_lossy(case),
                result
            );
        }
    }

    #[test]
    fn test_tail_chain() {
        let snap = Snapshot::decode(b"20::0_1#3,7#a|0|5,5_L_rrdd").unwrap();
        let chain = snap.own_player().tail_chain();

        assert_eq!(
            chain,
            vec![
                Coord::new(6, 5),
                Coord::new(7, 5),
                Coord::new(7, 6),
                Coord::new(7, 7),
            ]
        );

        // Each link is Manhattan-adjacent to the previous
        let mut prev = snap.own_player().head;
        for link in chain {
            assert_eq!(prev.manhattan(link), 1);
            prev = link;
        }
    }

    #[test]
    fn test_tail_skips_unknown_symbols() {
        let snap = Snapshot::decode(b"20::0_1#3,7#a|0|5,5_L_r?d").unwrap();
        assert_eq!(snap.own_player().tail.len(), 2);
    }

    #[test]
    fn test_encode_three_action_relative() {
        use Direction::*;

        // Legacy relative-turn table: (heading, turn-left, turn-right)
        let table = [
            (Up, Left, Right),
            (Down, Right, Left),
            (Right, Up, Down),
            (Left, Down, Up),
        ];
        for (heading, left, right) in table {
            assert_eq!(
                encode_action(ActionSet::Three, 1, Some(heading)).unwrap(),
                Some(Command::Turn(left))
            );
            assert_eq!(
                encode_action(ActionSet::Three, 2, Some(heading)).unwrap(),
                Some(Command::Turn(right))
            );
        }

        // No-op and unknown heading produce no wire traffic
        assert_eq!(encode_action(ActionSet::Three, 0, Some(Up)).unwrap(), None);
        assert_eq!(encode_action(ActionSet::Three, 1, None).unwrap(), None);
    }

    #[test]
    fn test_encode_five_action_absolute() {
        let expected = [
            None,
            Some(Command::Turn(Direction::Left)),
            Some(Command::Turn(Direction::Up)),
            Some(Command::Turn(Direction::Right)),
            Some(Command::Turn(Direction::Down)),
        ];
        for (action, want) in expected.into_iter().enumerate() {
            // Heading must not matter for the absolute policy
            assert_eq!(encode_action(ActionSet::Five, action, None).unwrap(), want);
            assert_eq!(
                encode_action(ActionSet::Five, action, Some(Direction::Up)).unwrap(),
                want
            );
        }
    }

    #[test]
    fn test_encode_rejects_out_of_space_action() {
        let result = encode_action(ActionSet::Three, 3, Some(Direction::Up));
        assert!(matches!(
            result,
            Err(BridgeError::InvalidAction { action: 3, space: 3 })
        ));

        let result = encode_action(ActionSet::Five, 7, None);
        assert!(matches!(
            result,
            Err(BridgeError::InvalidAction { action: 7, space: 5 })
        ));
    }

    #[test]
    fn test_command_tokens() {
        assert_eq!(Command::Start.token(), "s");
        assert_eq!(Command::Reset.token(), "r");
        assert_eq!(Command::Quit.token(), "q");
        assert_eq!(Command::Turn(Direction::Left).token(), "ml");
        assert_eq!(Command::Turn(Direction::Up).token(), "mu");
        assert_eq!(Command::Turn(Direction::Right).token(), "mr");
        assert_eq!(Command::Turn(Direction::Down).token(), "md");
    }
}
