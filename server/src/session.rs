//! Per-connection robot control session.
//!
//! A session owns one robot's stream for its whole lifetime and walks it
//! through the protocol: hash authentication, an initial move to learn the
//! coordinates, a second to learn the heading, greedy navigation to the
//! target cell, and a serpentine sweep of the surrounding patch with a
//! pick-up attempt on every cell until the secret appears. All exchanges are
//! strictly sequential request/response; the only departures are the
//! transparent recharging pause and the re-issued move when the robot is
//! blocked by an obstacle.

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use shared::{
    confirmation_hash, Position, CLIENT_FULL_POWER, CLIENT_KEY, CLIENT_RECHARGING,
    MAX_CONFIRMATION_LEN, MAX_FULL_POWER_LEN, MAX_OK_LEN, MAX_SECRET_LEN, MAX_USERNAME_LEN,
    RECHARGING_TIMEOUT, RECV_TIMEOUT, SERVER_KEY, SERVER_LOGIN_FAILED, SERVER_LOGOUT,
    SERVER_LOGIC_ERROR, SERVER_MOVE, SERVER_OK, SERVER_PICK_UP, SERVER_SYNTAX_ERROR,
    SERVER_TURN_LEFT, SERVER_TURN_RIGHT, TARGET,
};

use crate::codec::Wire;
use crate::error::{Result, SessionError};
use crate::navigator::{rotation_step, Navigator, SweepPlan, Turn, LAST_STEP};

/// One robot's control session.
pub struct Session<S> {
    wire: Wire<S>,
    nav: Navigator,
}

impl<S: AsyncRead + AsyncWrite> Session<S> {
    pub fn new(stream: S) -> Self {
        Self {
            wire: Wire::new(stream),
            nav: Navigator::new(),
        }
    }

    /// Drives the session to a terminal outcome and returns the secret.
    pub async fn run(mut self) -> Result<String> {
        self.authenticate().await?;
        let secret = self.retrieve_secret().await?;
        self.wire.send(SERVER_LOGOUT).await?;
        Ok(secret)
    }

    /// Two-message challenge: announce the server hash of the username and
    /// verify the client's confirmation code against the client-key hash.
    async fn authenticate(&mut self) -> Result<()> {
        let username = self.read_robot_msg(MAX_USERNAME_LEN).await?;
        let announced = confirmation_hash(SERVER_KEY, &username);
        self.wire.send(&announced.to_string()).await?;

        let confirmation = self.read_robot_msg(MAX_CONFIRMATION_LEN).await?;
        let code = match parse_confirmation(&confirmation) {
            Some(code) => code,
            None => {
                self.wire.send(SERVER_SYNTAX_ERROR).await?;
                return Err(SessionError::Syntax);
            }
        };
        if code != confirmation_hash(CLIENT_KEY, &username) {
            self.wire.send(SERVER_LOGIN_FAILED).await?;
            return Err(SessionError::LoginFailed);
        }

        self.wire.send(SERVER_OK).await?;
        debug!("robot authenticated");
        Ok(())
    }

    /// Locates the robot, brings it to the target cell and sweeps the patch
    /// until a pick-up yields the secret.
    async fn retrieve_secret(&mut self) -> Result<String> {
        // first move fixes the coordinates
        self.move_until_progress().await?;
        debug!("robot located at {}", self.nav.position());

        if self.nav.position() != TARGET {
            // second move reveals the heading
            self.move_until_progress().await?;
            self.navigate_to(TARGET).await?;
        }

        let sweep = SweepPlan::new(TARGET);
        loop {
            if let Some(secret) = self.pick_up().await? {
                return Ok(secret);
            }
            let step = sweep.step_of(self.nav.position()) + 1;
            if step > LAST_STEP {
                return Err(SessionError::SecretNotFound);
            }
            debug!("patch cell {} empty, sweeping on", step - 1);
            self.navigate_to(sweep.cell_of(step)).await?;
        }
    }

    /// Greedy axis-then-axis walk: face the wanted direction one turn at a
    /// time, then move, until the target is reached.
    async fn navigate_to(&mut self, target: Position) -> Result<()> {
        while self.nav.position() != target {
            let Some(heading) = self.nav.heading() else {
                // the robot spawned on the target and was never seen moving;
                // one plain move reveals the heading
                self.move_until_progress().await?;
                continue;
            };
            let want = self.nav.heading_toward(target);
            match rotation_step(heading, want) {
                Some(turn) => self.turn(turn).await?,
                None => self.move_until_progress().await?,
            }
        }
        Ok(())
    }

    /// Issues `102 MOVE` until the confirmed position changes. An obstacle
    /// blocks a single cell, so repeating the move is enough; the receive
    /// timeout bounds a robot that stops responding.
    async fn move_until_progress(&mut self) -> Result<()> {
        loop {
            self.wire.send(SERVER_MOVE).await?;
            let reported = self.read_position().await?;
            match self.nav.confirm_move(reported) {
                Ok(true) => return Ok(()),
                Ok(false) => debug!("robot blocked at {}, repeating move", reported),
                Err(err) => {
                    self.wire.send(SERVER_LOGIC_ERROR).await?;
                    return Err(err);
                }
            }
        }
    }

    async fn turn(&mut self, turn: Turn) -> Result<()> {
        let command = match turn {
            Turn::Left => SERVER_TURN_LEFT,
            Turn::Right => SERVER_TURN_RIGHT,
        };
        self.wire.send(command).await?;
        let reported = self.read_position().await?;
        self.nav.confirm_turn(turn, reported);
        Ok(())
    }

    /// Issues `105 GET MESSAGE`; an empty payload means the cell holds
    /// nothing.
    async fn pick_up(&mut self) -> Result<Option<String>> {
        self.wire.send(SERVER_PICK_UP).await?;
        let payload = self.read_robot_msg(MAX_SECRET_LEN).await?;
        if payload.is_empty() {
            Ok(None)
        } else {
            Ok(Some(String::from_utf8_lossy(&payload).into_owned()))
        }
    }

    async fn read_position(&mut self) -> Result<Position> {
        let payload = self.read_robot_msg(MAX_OK_LEN).await?;
        match parse_ok(&payload) {
            Some(position) => Ok(position),
            None => {
                self.wire.send(SERVER_SYNTAX_ERROR).await?;
                Err(SessionError::Syntax)
            }
        }
    }

    /// Reads one frame, transparently serving the recharging sub-protocol.
    ///
    /// A `RECHARGING` payload switches to the extended timeout and demands a
    /// `FULL POWER` frame; anything else there is a logic error. Afterwards
    /// the ordinary timeout is restored and the original read is repeated
    /// with its original cap.
    async fn read_robot_msg(&mut self, max_payload: usize) -> Result<Vec<u8>> {
        loop {
            let payload = self.wire.read_frame(max_payload).await?;
            if payload != CLIENT_RECHARGING {
                return Ok(payload);
            }
            debug!("robot recharging");
            self.wire.set_recv_timeout(RECHARGING_TIMEOUT);
            let resumed = self.wire.read_frame(MAX_FULL_POWER_LEN).await?;
            if resumed != CLIENT_FULL_POWER {
                self.wire.send(SERVER_LOGIC_ERROR).await?;
                return Err(SessionError::Logic("expected FULL POWER after RECHARGING"));
            }
            debug!("robot back at full power");
            self.wire.set_recv_timeout(RECV_TIMEOUT);
        }
    }
}

/// Validates and parses the client confirmation code: non-empty, decimal
/// digits only, value within 16 bits.
fn parse_confirmation(payload: &[u8]) -> Option<u16> {
    if payload.is_empty() || !payload.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(payload).ok()?.parse().ok()
}

/// Parses a move/turn confirmation: exactly the token `OK` followed by two
/// signed decimal coordinates.
fn parse_ok(payload: &[u8]) -> Option<Position> {
    let text = std::str::from_utf8(payload).ok()?;
    let mut tokens = text.split_whitespace();
    if tokens.next()? != "OK" {
        return None;
    }
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some(Position::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    async fn expect(far: &mut DuplexStream, text: &str) {
        let mut frame = vec![0u8; text.len() + 2];
        far.read_exact(&mut frame).await.unwrap();
        assert_eq!(&frame[..text.len()], text.as_bytes());
        assert_eq!(&frame[text.len()..], &[0x07, 0x08]);
    }

    async fn reply(far: &mut DuplexStream, payload: &[u8]) {
        let mut frame = payload.to_vec();
        frame.extend_from_slice(&[0x07, 0x08]);
        far.write_all(&frame).await.unwrap();
    }

    #[test]
    fn confirmation_requires_nonempty_digits_within_16_bits() {
        assert_eq!(parse_confirmation(b"0"), Some(0));
        assert_eq!(parse_confirmation(b"00000"), Some(0));
        assert_eq!(parse_confirmation(b"65535"), Some(65535));
        assert_eq!(parse_confirmation(b"65536"), None);
        assert_eq!(parse_confirmation(b"99999"), None);
        assert_eq!(parse_confirmation(b""), None);
        assert_eq!(parse_confirmation(b"12a45"), None);
        assert_eq!(parse_confirmation(b"-1"), None);
    }

    #[test]
    fn ok_frame_parses_exactly_three_tokens() {
        assert_eq!(parse_ok(b"OK -2 2"), Some(Position::new(-2, 2)));
        assert_eq!(parse_ok(b"OK 0 0"), Some(Position::new(0, 0)));
        assert_eq!(parse_ok(b"OK  7  -3"), Some(Position::new(7, -3)));
        assert_eq!(parse_ok(b"KO 1 2"), None);
        assert_eq!(parse_ok(b"OK 1"), None);
        assert_eq!(parse_ok(b"OK 1 2 3"), None);
        assert_eq!(parse_ok(b"OK 1.5 2"), None);
        assert_eq!(parse_ok(b"OK x y"), None);
        assert_eq!(parse_ok(b""), None);
    }

    #[tokio::test]
    async fn authentication_accepts_matching_code() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.authenticate().await
        });

        reply(&mut far, b"Ab").await;
        expect(&mut far, "21013").await;
        reply(&mut far, b"11720").await;
        expect(&mut far, SERVER_OK).await;

        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn authentication_rejects_wrong_code() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.authenticate().await
        });

        reply(&mut far, b"Ab").await;
        expect(&mut far, "21013").await;
        reply(&mut far, b"12345").await;
        expect(&mut far, SERVER_LOGIN_FAILED).await;

        assert!(matches!(
            handle.await.unwrap(),
            Err(SessionError::LoginFailed)
        ));
    }

    #[tokio::test]
    async fn authentication_rejects_malformed_code() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.authenticate().await
        });

        reply(&mut far, b"Ab").await;
        expect(&mut far, "21013").await;
        reply(&mut far, b"abc").await;
        expect(&mut far, SERVER_SYNTAX_ERROR).await;

        assert!(matches!(handle.await.unwrap(), Err(SessionError::Syntax)));
    }

    #[tokio::test]
    async fn recharging_pause_is_transparent() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.read_robot_msg(MAX_OK_LEN).await
        });

        reply(&mut far, CLIENT_RECHARGING).await;
        reply(&mut far, CLIENT_FULL_POWER).await;
        reply(&mut far, b"OK 1 2").await;

        assert_eq!(handle.await.unwrap().unwrap(), b"OK 1 2");
    }

    #[tokio::test]
    async fn recharging_without_full_power_is_a_logic_error() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.read_robot_msg(MAX_OK_LEN).await
        });

        reply(&mut far, CLIENT_RECHARGING).await;
        reply(&mut far, b"OK 1 2").await;
        expect(&mut far, SERVER_LOGIC_ERROR).await;

        assert!(matches!(handle.await.unwrap(), Err(SessionError::Logic(_))));
    }

    #[tokio::test]
    async fn repeated_recharging_cycles_are_allowed() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.read_robot_msg(MAX_SECRET_LEN).await
        });

        reply(&mut far, CLIENT_RECHARGING).await;
        reply(&mut far, CLIENT_FULL_POWER).await;
        reply(&mut far, CLIENT_RECHARGING).await;
        reply(&mut far, CLIENT_FULL_POWER).await;
        reply(&mut far, b"still here").await;

        assert_eq!(handle.await.unwrap().unwrap(), b"still here");
    }

    #[tokio::test]
    async fn malformed_position_confirmation_fails_the_session() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.move_until_progress().await
        });

        expect(&mut far, SERVER_MOVE).await;
        reply(&mut far, b"OK 1 2 3").await;
        expect(&mut far, SERVER_SYNTAX_ERROR).await;

        assert!(matches!(handle.await.unwrap(), Err(SessionError::Syntax)));
    }

    #[tokio::test]
    async fn empty_pick_up_means_no_secret() {
        let (near, mut far) = duplex(1024);
        let handle = tokio::spawn(async move {
            let mut session = Session::new(near);
            session.pick_up().await
        });

        expect(&mut far, SERVER_PICK_UP).await;
        reply(&mut far, b"").await;

        assert_eq!(handle.await.unwrap().unwrap(), None);
    }
}
