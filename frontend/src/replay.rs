use bridge_core::protocol::{decode_command, CommandSender};
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::Path;

/// Feeds a JSON-lines file of command envelopes to the worker. Blank lines,
/// unknown types and malformed lines are skipped. Returns how many commands
/// were sent.
pub fn replay_commands(path: &Path, commands: &CommandSender) -> io::Result<usize> {
    let script = fs::read_to_string(path)?;
    let mut sent = 0;

    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match decode_command(line) {
            Ok(Some(command)) => {
                debug!("replay {}: {}", number + 1, command.tag());
                if commands.send(command).is_err() {
                    warn!("Worker hung up during replay");
                    break;
                }
                sent += 1;
            }
            Ok(None) => warn!("{}:{}: unknown command type", path.display(), number + 1),
            Err(err) => warn!("{}:{}: {}", path.display(), number + 1, err),
        }
    }

    Ok(sent)
}
