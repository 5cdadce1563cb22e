//! Robot position/heading tracking and the search-patch sweep plan.
//!
//! The navigator holds no I/O. The session executes its decisions on the
//! wire and feeds every confirmed `OK x y` coordinate back in; the navigator
//! keeps the observed position, infers the heading from consecutive motions,
//! and answers planning questions (which way to face next, which turn brings
//! the robot closer to that direction, which cell the sweep visits next).

use shared::{Heading, Position};

use crate::error::{Result, SessionError};

/// Side length of the square patch swept around the target.
pub const SWEEP_SIDE: i32 = 5;
/// Index of the last cell in the sweep order.
pub const LAST_STEP: i32 = SWEEP_SIDE * SWEEP_SIDE - 1;

/// A single rotation command choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

/// Observed state of the steered robot.
///
/// The position starts at the `(0, 0)` sentinel and becomes meaningful with
/// the first confirmed move; the heading stays unknown until two successive
/// confirmations reveal a motion.
#[derive(Debug)]
pub struct Navigator {
    position: Position,
    heading: Option<Heading>,
    has_fix: bool,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            position: Position::new(0, 0),
            heading: None,
            has_fix: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn heading(&self) -> Option<Heading> {
        self.heading
    }

    /// Records the confirmation of a `102 MOVE`.
    ///
    /// Returns whether the robot actually advanced. The first confirmation
    /// only fixes the coordinates; from then on every motion updates the
    /// heading, and a motion along both axes at once is a logic error.
    pub fn confirm_move(&mut self, reported: Position) -> Result<bool> {
        let previous = self.position;
        self.position = reported;

        if !self.has_fix {
            self.has_fix = true;
            return Ok(true);
        }
        if reported == previous {
            return Ok(false);
        }
        match Heading::between(previous, reported) {
            Some(heading) => {
                self.heading = Some(heading);
                Ok(true)
            }
            None => Err(SessionError::Logic("robot moved along both axes at once")),
        }
    }

    /// Records the confirmation of a turn command.
    ///
    /// The reported coordinates are taken over verbatim; the heading, once
    /// known, rotates with the robot.
    pub fn confirm_turn(&mut self, turn: Turn, reported: Position) {
        self.position = reported;
        self.heading = self.heading.map(|heading| match turn {
            Turn::Left => heading.turned_left(),
            Turn::Right => heading.turned_right(),
        });
    }

    /// Direction the robot should face next on the way to `target`.
    ///
    /// The vertical distance is closed first, then the horizontal one.
    /// Callers only ask while the target is not yet reached.
    pub fn heading_toward(&self, target: Position) -> Heading {
        if self.position.y > target.y {
            Heading::Down
        } else if self.position.y < target.y {
            Heading::Up
        } else if self.position.x < target.x {
            Heading::Right
        } else {
            Heading::Left
        }
    }
}

/// One rotation bringing `have` toward `want`, or `None` when already
/// aligned.
///
/// Headings are compared by their clockwise rank (up, right, down, left); a
/// positive difference rotates clockwise, otherwise counterclockwise. The
/// caller re-evaluates after each turn, converging in at most three turns.
pub fn rotation_step(have: Heading, want: Heading) -> Option<Turn> {
    fn rank(heading: Heading) -> i8 {
        match heading {
            Heading::Up => 1,
            Heading::Right => 2,
            Heading::Down => 3,
            Heading::Left => 4,
        }
    }

    if have == want {
        None
    } else if rank(want) > rank(have) {
        Some(Turn::Right)
    } else {
        Some(Turn::Left)
    }
}

/// Serpentine visit order over the square patch whose top-left corner is
/// `anchor`.
///
/// Rows are walked top to bottom; even rows left to right, odd rows right to
/// left, so consecutive cells in the order are always grid-adjacent:
///
/// ```text
///  0  1  2  3  4
///  9  8  7  6  5
/// 10 11 12 13 14
/// 19 18 17 16 15
/// 20 21 22 23 24
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SweepPlan {
    anchor: Position,
}

impl SweepPlan {
    pub fn new(anchor: Position) -> Self {
        Self { anchor }
    }

    /// Index of `pos` in the visit order.
    pub fn step_of(&self, pos: Position) -> i32 {
        let row = self.anchor.y - pos.y;
        let col = (pos.x - self.anchor.x).rem_euclid(SWEEP_SIDE);
        row * SWEEP_SIDE
            + if row % 2 != 0 {
                SWEEP_SIDE - 1 - col
            } else {
                col
            }
    }

    /// Cell visited at `step`.
    pub fn cell_of(&self, step: i32) -> Position {
        let row = step / SWEEP_SIDE;
        let col = step % SWEEP_SIDE;
        let x = if row % 2 != 0 {
            self.anchor.x + SWEEP_SIDE - 1 - col
        } else {
            self.anchor.x + col
        };
        Position::new(x, self.anchor.y - row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::TARGET;

    #[test]
    fn first_confirmation_fixes_position_without_heading() {
        let mut nav = Navigator::new();
        assert!(nav.confirm_move(Position::new(4, -7)).unwrap());
        assert_eq!(nav.position(), Position::new(4, -7));
        assert_eq!(nav.heading(), None);
    }

    #[test]
    fn second_motion_reveals_heading() {
        let mut nav = Navigator::new();
        nav.confirm_move(Position::new(0, 0)).unwrap();
        assert!(nav.confirm_move(Position::new(0, 1)).unwrap());
        assert_eq!(nav.heading(), Some(Heading::Up));
    }

    #[test]
    fn repeated_position_is_reported_as_blocked() {
        let mut nav = Navigator::new();
        nav.confirm_move(Position::new(2, 2)).unwrap();
        assert!(!nav.confirm_move(Position::new(2, 2)).unwrap());
        assert_eq!(nav.heading(), None);
    }

    #[test]
    fn diagonal_motion_is_a_logic_error() {
        let mut nav = Navigator::new();
        nav.confirm_move(Position::new(0, 0)).unwrap();
        assert!(matches!(
            nav.confirm_move(Position::new(1, 1)),
            Err(SessionError::Logic(_))
        ));
    }

    #[test]
    fn later_motions_keep_heading_current() {
        let mut nav = Navigator::new();
        nav.confirm_move(Position::new(0, 0)).unwrap();
        nav.confirm_move(Position::new(1, 0)).unwrap();
        assert_eq!(nav.heading(), Some(Heading::Right));
        nav.confirm_move(Position::new(1, -1)).unwrap();
        assert_eq!(nav.heading(), Some(Heading::Down));
    }

    #[test]
    fn turns_rotate_known_heading_and_update_position() {
        let mut nav = Navigator::new();
        nav.confirm_move(Position::new(0, 0)).unwrap();
        nav.confirm_move(Position::new(0, 1)).unwrap();

        nav.confirm_turn(Turn::Right, Position::new(0, 1));
        assert_eq!(nav.heading(), Some(Heading::Right));
        nav.confirm_turn(Turn::Left, Position::new(0, 1));
        assert_eq!(nav.heading(), Some(Heading::Up));
        assert_eq!(nav.position(), Position::new(0, 1));
    }

    #[test]
    fn turn_before_heading_is_known_leaves_it_unknown() {
        let mut nav = Navigator::new();
        nav.confirm_turn(Turn::Left, Position::new(0, 0));
        assert_eq!(nav.heading(), None);
    }

    #[test]
    fn heading_toward_closes_vertical_axis_first() {
        let mut nav = Navigator::new();
        nav.confirm_move(Position::new(0, 0)).unwrap();
        assert_eq!(nav.heading_toward(Position::new(-2, 2)), Heading::Up);
        assert_eq!(nav.heading_toward(Position::new(-2, -2)), Heading::Down);
        assert_eq!(nav.heading_toward(Position::new(-2, 0)), Heading::Left);
        assert_eq!(nav.heading_toward(Position::new(2, 0)), Heading::Right);
    }

    #[test]
    fn rotation_step_is_none_when_aligned() {
        assert_eq!(rotation_step(Heading::Down, Heading::Down), None);
    }

    #[test]
    fn rotation_converges_within_three_turns() {
        let all = [Heading::Up, Heading::Right, Heading::Down, Heading::Left];
        for have in all {
            for want in all {
                let mut heading = have;
                let mut turns = 0;
                while let Some(turn) = rotation_step(heading, want) {
                    heading = match turn {
                        Turn::Left => heading.turned_left(),
                        Turn::Right => heading.turned_right(),
                    };
                    turns += 1;
                    assert!(turns <= 3, "{have:?} -> {want:?} did not converge");
                }
                assert_eq!(heading, want);
            }
        }
    }

    #[test]
    fn sweep_mapping_is_a_bijection() {
        let sweep = SweepPlan::new(TARGET);
        for step in 0..=LAST_STEP {
            let cell = sweep.cell_of(step);
            assert_eq!(sweep.step_of(cell), step);
        }
    }

    #[test]
    fn sweep_corners() {
        let sweep = SweepPlan::new(TARGET);
        assert_eq!(sweep.cell_of(0), Position::new(-2, 2));
        assert_eq!(sweep.cell_of(4), Position::new(2, 2));
        assert_eq!(sweep.cell_of(5), Position::new(2, 1));
        assert_eq!(sweep.cell_of(LAST_STEP), Position::new(2, -2));
    }

    #[test]
    fn consecutive_sweep_cells_are_grid_adjacent() {
        let sweep = SweepPlan::new(TARGET);
        for step in 0..LAST_STEP {
            let here = sweep.cell_of(step);
            let next = sweep.cell_of(step + 1);
            let distance = (here.x - next.x).abs() + (here.y - next.y).abs();
            assert_eq!(distance, 1, "steps {step} and {} are not adjacent", step + 1);
        }
    }
}
