use std::path::PathBuf;

/// One line typed on stdin by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Re-run the still pipeline on the static frame.
    Apply,
    /// Edit one kernel cell. `text` is forwarded verbatim to the editor.
    Set { row: usize, col: usize, text: String },
    Load(PathBuf),
    Quit,
}

/// Parse a command line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "apply" => Command::Apply,
        "quit" | "exit" => Command::Quit,
        "set" => {
            let row = parse_index(words.next())?;
            let col = parse_index(words.next())?;
            let text = words.collect::<Vec<_>>().join(" ");
            Command::Set { row, col, text }
        }
        "load" => {
            let path = words.collect::<Vec<_>>().join(" ");
            if path.is_empty() {
                return Err(CommandError::Usage("load <path>"));
            }
            Command::Load(PathBuf::from(path))
        }
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_index(word: Option<&str>) -> Result<usize, CommandError> {
    word.and_then(|w| w.parse().ok())
        .ok_or(CommandError::Usage("set <row> <col> <value>"))
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command {0:?} (expected start, stop, apply, set, load or quit)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}
