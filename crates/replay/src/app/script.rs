use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::world::ScriptedObject;

/// One host callback, as recorded in a replay script (one JSON object per
/// line tagged by `event`, blank lines and `#` comments ignored).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptEvent {
    NewGame,
    Save {
        slot: String,
    },
    LoadSave {
        slot: String,
    },
    /// The region finished loading; `objects` is everything live in it.
    RegionEntered {
        region: String,
        objects: Vec<ScriptedObject>,
    },
    /// Advances the simulated clock, giving pending rescans a chance to run.
    Advance {
        ms: u64,
    },
    CutConfirmed {
        object: ScriptedObject,
    },
    SlashHit {
        object: ScriptedObject,
    },
    ReportStats {
        region: Option<String>,
    },
}

#[derive(Deserialize)]
struct SlotBody {
    slot: String,
}

#[derive(Deserialize)]
struct RegionBody {
    region: String,
    #[serde(default)]
    objects: Vec<ScriptedObject>,
}

#[derive(Deserialize)]
struct AdvanceBody {
    ms: u64,
}

#[derive(Deserialize)]
struct ObjectBody {
    object: ScriptedObject,
}

#[derive(Deserialize)]
struct StatsBody {
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("script line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub(crate) fn load_script(path: &Path) -> Result<Vec<ScriptEvent>, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&raw)
}

pub(crate) fn parse_script(raw: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    let mut events = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        events.push(parse_event(trimmed).map_err(|message| ScriptError::Parse {
            line: index + 1,
            message,
        })?);
    }
    Ok(events)
}

// The tag is read off a `Value` first so the body is deserialized on its own
// and `serde_path_to_error` keeps nested field paths.
fn parse_event(raw: &str) -> Result<ScriptEvent, String> {
    let mut value: Value =
        serde_json::from_str(raw).map_err(|error| format!("parse event json: {error}"))?;
    let Some(fields) = value.as_object_mut() else {
        return Err("event must be a JSON object".to_string());
    };
    let tag = match fields.remove("event") {
        Some(Value::String(tag)) => tag,
        Some(other) => return Err(format!("event tag must be a string, got {other}")),
        None => return Err("missing event tag".to_string()),
    };

    match tag.as_str() {
        "new_game" => Ok(ScriptEvent::NewGame),
        "save" => {
            let body: SlotBody = parse_body(value)?;
            Ok(ScriptEvent::Save { slot: body.slot })
        }
        "load_save" => {
            let body: SlotBody = parse_body(value)?;
            Ok(ScriptEvent::LoadSave { slot: body.slot })
        }
        "region_entered" => {
            let body: RegionBody = parse_body(value)?;
            Ok(ScriptEvent::RegionEntered {
                region: body.region,
                objects: body.objects,
            })
        }
        "advance" => {
            let body: AdvanceBody = parse_body(value)?;
            Ok(ScriptEvent::Advance { ms: body.ms })
        }
        "cut_confirmed" => {
            let body: ObjectBody = parse_body(value)?;
            Ok(ScriptEvent::CutConfirmed {
                object: body.object,
            })
        }
        "slash_hit" => {
            let body: ObjectBody = parse_body(value)?;
            Ok(ScriptEvent::SlashHit {
                object: body.object,
            })
        }
        "report_stats" => {
            let body: StatsBody = parse_body(value)?;
            Ok(ScriptEvent::ReportStats {
                region: body.region,
            })
        }
        other => Err(format!("unknown event '{other}'")),
    }
}

fn parse_body<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_path_to_error::deserialize(value).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            format!("parse event json: {source}")
        } else {
            format!("parse event json at {path}: {source}")
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn parses_events_and_skips_comments() {
        let events = parse_script(
            r#"
# fresh file
{"event": "new_game"}
{"event": "region_entered", "region": "Glade", "objects": [{"name": "grass_1", "region": "Glade", "x": 1.0, "y": 2.0, "markers": ["GrassCut"]}]}
{"event": "advance", "ms": 600}
{"event": "report_stats"}
"#,
        )
        .expect("parse");

        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ScriptEvent::NewGame);
        match &events[1] {
            ScriptEvent::RegionEntered { region, objects } => {
                assert_eq!(region, "Glade");
                assert_eq!(objects[0].index, 0);
                assert!(!objects[0].uninspectable);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[3], ScriptEvent::ReportStats { region: None });
    }

    #[test]
    fn parse_errors_name_line_and_field() {
        let err = parse_script(
            "{\"event\": \"new_game\"}\n{\"event\": \"cut_confirmed\", \"object\": {\"name\": \"g\", \"x\": \"left\", \"y\": 0}}",
        )
        .expect_err("bad field");
        let message = err.to_string();
        assert!(message.contains("script line 2"), "{message}");
        assert!(message.contains("object.x"), "{message}");

        let err = parse_script(r#"{"event": "explode"}"#).expect_err("unknown event");
        assert!(err.to_string().contains("unknown event 'explode'"));

        let err = parse_script(r#"{"region": "Glade"}"#).expect_err("untagged");
        assert!(err.to_string().contains("missing event tag"));
    }

    #[test]
    fn nested_object_errors_keep_their_path() {
        let err = parse_script(
            r#"{"event": "region_entered", "region": "Glade", "objects": [{"name": "g", "x": 0, "y": 0}, {"name": "h", "x": 1, "y": true}]}"#,
        )
        .expect_err("bad nested field");
        let message = err.to_string();
        assert!(message.contains("script line 1"), "{message}");
        assert!(message.contains("objects[1].y"), "{message}");

        let err = parse_script(r#"{"event": "advance"}"#).expect_err("missing ms");
        assert!(err.to_string().contains("missing field `ms`"), "{err}");
    }

    #[test]
    fn load_script_reads_from_disk() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("session.jsonl");
        fs::write(&path, "{\"event\": \"save\", \"slot\": \"a\"}\n").expect("write");
        let events = load_script(&path).expect("load");
        assert_eq!(
            events,
            vec![ScriptEvent::Save {
                slot: "a".to_string()
            }]
        );

        let err = load_script(&temp.path().join("missing.jsonl")).expect_err("missing");
        assert!(matches!(err, ScriptError::Read { .. }));
    }
}
