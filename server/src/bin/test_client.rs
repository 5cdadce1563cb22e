use std::error::Error;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

use shared::{
    confirmation_hash, Heading, Position, CLIENT_KEY, TERM_FIRST, TERM_SECOND,
};

// Simulated robot obeying the steering commands
struct Robot {
    position: Position,
    heading: Heading,
    secret_cell: Position,
}

impl Robot {
    fn confirmation(&self) -> String {
        format!("OK {} {}", self.position.x, self.position.y)
    }
}

async fn send_frame(stream: &mut TcpStream, payload: &str) -> Result<(), Box<dyn Error>> {
    let mut frame = payload.as_bytes().to_vec();
    frame.push(TERM_FIRST);
    frame.push(TERM_SECOND);
    stream.write_all(&frame).await?;
    Ok(())
}

async fn recv_frame(stream: &mut TcpStream, buffer: &mut Vec<u8>) -> Result<String, Box<dyn Error>> {
    loop {
        if let Some(end) = buffer
            .windows(2)
            .position(|pair| pair == &[TERM_FIRST, TERM_SECOND])
        {
            let payload: Vec<u8> = buffer.drain(..end + 2).take(end).collect();
            return Ok(String::from_utf8_lossy(&payload).into_owned());
        }
        let mut chunk = [0u8; 256];
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err("server closed the connection".into());
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let username = "Rusty";
    let mut robot = Robot {
        position: Position::new(3, -1),
        heading: Heading::Left,
        secret_cell: Position::new(0, 1),
    };

    let mut stream = TcpStream::connect("127.0.0.1:3999").await?;
    println!("Connected from {}", stream.local_addr()?);
    let mut buffer = Vec::new();

    // Authentication exchange
    send_frame(&mut stream, username).await?;
    let announced = recv_frame(&mut stream, &mut buffer).await?;
    println!("Server announced hash {}", announced);

    let confirmation = confirmation_hash(CLIENT_KEY, username.as_bytes());
    send_frame(&mut stream, &confirmation.to_string()).await?;

    let verdict = recv_frame(&mut stream, &mut buffer).await?;
    println!("Authentication: {}", verdict);
    if verdict != "200 OK" {
        return Ok(());
    }

    // Obey steering until logout; demonstrate one recharging pause before
    // the first move confirmation
    let mut recharged = false;
    loop {
        let command = recv_frame(&mut stream, &mut buffer).await?;
        println!("<- {}", command);

        match command.as_str() {
            "102 MOVE" => {
                if !recharged {
                    recharged = true;
                    println!("-> RECHARGING (pausing 2s)");
                    send_frame(&mut stream, "RECHARGING").await?;
                    sleep(Duration::from_secs(2)).await;
                    println!("-> FULL POWER");
                    send_frame(&mut stream, "FULL POWER").await?;
                }
                robot.position = robot.position.stepped(robot.heading);
                let reply = robot.confirmation();
                println!("-> {}", reply);
                send_frame(&mut stream, &reply).await?;
            }
            "103 TURN LEFT" => {
                robot.heading = robot.heading.turned_left();
                let reply = robot.confirmation();
                println!("-> {} (facing {})", reply, robot.heading);
                send_frame(&mut stream, &reply).await?;
            }
            "104 TURN RIGHT" => {
                robot.heading = robot.heading.turned_right();
                let reply = robot.confirmation();
                println!("-> {} (facing {})", reply, robot.heading);
                send_frame(&mut stream, &reply).await?;
            }
            "105 GET MESSAGE" => {
                let reply = if robot.position == robot.secret_cell {
                    "Secret cached under the third rock"
                } else {
                    ""
                };
                println!("-> {:?}", reply);
                send_frame(&mut stream, reply).await?;
            }
            "106 LOGOUT" => {
                println!("Logged out, test client finished");
                break;
            }
            other => {
                println!("Session ended by server: {}", other);
                break;
            }
        }
    }

    Ok(())
}
