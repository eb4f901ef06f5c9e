//! Operator input
//!
//! Reads acknowledgement commands from stdin on a dedicated thread and hands
//! them to the tick loop over a channel, so they are applied between ticks.

use blurwatch_core::CameraId;
use std::io::BufRead;
use std::str::FromStr;
use std::thread;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

pub const USAGE: &str = "Commands: clear <camera>, clear-site, status, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Lens wiped on this camera
    Clear(CameraId),
    /// Site-wide alert acknowledged
    ClearSite,
    Status,
    Quit,
}

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();

        match (command.as_str(), parts.next(), parts.next()) {
            ("clear" | "clean", Some(camera), None) => Ok(OperatorCommand::Clear(parse_camera(camera))),
            ("clear-site" | "clean-site", None, None) => Ok(OperatorCommand::ClearSite),
            ("status", None, None) => Ok(OperatorCommand::Status),
            ("quit" | "exit", None, None) => Ok(OperatorCommand::Quit),
            _ => Err(format!("Unrecognized command '{}'. {}", s.trim(), USAGE)),
        }
    }
}

/// `3` and `03` mean `CAM-03`; anything else is taken as a full id.
fn parse_camera(token: &str) -> CameraId {
    match token.parse::<usize>() {
        Ok(index) => CameraId::numbered(index),
        Err(_) => CameraId::from(token.to_uppercase()),
    }
}

/// Forward parsed commands until the input ends or the loop goes away.
pub fn forward_commands<R: BufRead>(reader: R, tx: &Sender<OperatorCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("Stopped reading operator input: {}", err);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<OperatorCommand>() {
            Ok(command) => {
                debug!("Operator command: {:?}", command);
                if tx.blocking_send(command).is_err() {
                    return;
                }
            }
            Err(message) => warn!("{}", message),
        }
    }
}

pub fn spawn_stdin_reader(tx: Sender<OperatorCommand>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        forward_commands(stdin.lock(), &tx);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::sync::mpsc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "clear CAM-02".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::Clear(CameraId::numbered(2))
        );
        assert_eq!(
            "clean 7".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::Clear(CameraId::numbered(7))
        );
        assert_eq!("clear-site".parse::<OperatorCommand>().unwrap(), OperatorCommand::ClearSite);
        assert_eq!(" STATUS ".parse::<OperatorCommand>().unwrap(), OperatorCommand::Status);
        assert_eq!("exit".parse::<OperatorCommand>().unwrap(), OperatorCommand::Quit);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("clear".parse::<OperatorCommand>().is_err());
        assert!("wipe CAM-01".parse::<OperatorCommand>().is_err());
        assert!("status now".parse::<OperatorCommand>().is_err());
    }

    #[test]
    fn test_forward_skips_bad_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        let input = Cursor::new("clear 1\n\nbogus\nstatus\n");

        forward_commands(input, &tx);
        drop(tx);

        assert_eq!(rx.blocking_recv(), Some(OperatorCommand::Clear(CameraId::numbered(1))));
        assert_eq!(rx.blocking_recv(), Some(OperatorCommand::Status));
        assert_eq!(rx.blocking_recv(), None);
    }
}
