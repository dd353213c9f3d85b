//! JSON form of the protocol: `{"type": <tag>, "payload": <variant payload>}`.
//!
//! Decoding is forward compatible: a well-formed envelope whose `type` is not
//! known yet decodes to `None` instead of an error.

use super::{Command, Event};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
}

fn decode<T: DeserializeOwned>(text: &str, tags: &[&str]) -> Result<Option<T>, WireError> {
    let envelope: RawEnvelope = serde_json::from_str(text)?;
    if !tags.contains(&envelope.kind.as_str()) {
        return Ok(None);
    }

    Ok(Some(serde_json::from_str(text)?))
}

pub fn decode_command(text: &str) -> Result<Option<Command>, WireError> {
    decode(text, &Command::TAGS)
}

pub fn decode_event(text: &str) -> Result<Option<Event>, WireError> {
    decode(text, &Event::TAGS)
}

pub fn encode_command(command: &Command) -> Result<String, WireError> {
    Ok(serde_json::to_string(command)?)
}

pub fn encode_event(event: &Event) -> Result<String, WireError> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Button;
    use crate::palette::{DEFAULT_PALETTE, Palette, PaletteKind};
    use crate::protocol::GameInfo;
    use crate::video::{RAW_FRAME_LEN, render_frame};

    #[test]
    fn command_tags_match_serialization() {
        let commands = [
            Command::Run { rom: vec![1, 2, 3] },
            Command::Start,
            Command::JoypadDown { button: Button::A },
            Command::JoypadUp { button: Button::A },
            Command::MemoryRequest { start: 0, end: 16 },
            Command::SetPalette { name: "bw".to_string() },
            Command::SetCustomPalette {
                colors: DEFAULT_PALETTE,
            },
        ];
        for (command, tag) in commands.iter().zip(Command::TAGS) {
            let text = encode_command(command).unwrap();
            assert!(text.starts_with(&format!("{{\"type\":\"{}\"", tag)), "{}", text);
            assert_eq!(decode_command(&text).unwrap().as_ref(), Some(command));
        }
    }

    #[test]
    fn decodes_hand_written_envelopes() {
        assert_eq!(
            decode_command(r#"{"type":"joyp_down","payload":{"button":11}}"#).unwrap(),
            Some(Command::JoypadDown {
                button: Button::DumpOam
            })
        );
        assert_eq!(decode_command(r#"{"type":"start"}"#).unwrap(), Some(Command::Start));
        assert_eq!(
            decode_command(r#"{"type":"memRequest","payload":{"start":49152,"end":49408}}"#).unwrap(),
            Some(Command::MemoryRequest {
                start: 0xC000,
                end: 0xC100
            })
        );
    }

    #[test]
    fn unknown_types_are_ignored() {
        assert_eq!(decode_command(r#"{"type":"bogus"}"#).unwrap(), None);
        assert_eq!(decode_command(r#"{"type":"bogus","payload":[1,2]}"#).unwrap(), None);
        assert!(decode_event(r#"{"type":"rumble","payload":{}}"#).unwrap().is_none());
    }

    #[test]
    fn malformed_envelopes_are_errors() {
        assert!(decode_command("not json").is_err());
        assert!(decode_command(r#"{"payload":{}}"#).is_err());
        assert!(decode_command(r#"{"type":"joyp_down","payload":{"button":99}}"#).is_err());
    }

    #[test]
    fn events_cross_the_wire() {
        let info = GameInfo {
            title: "TETRIS".to_string(),
            cartridge_type: "ROM ONLY".to_string(),
            sgb_flag: "No SGB support".to_string(),
            cgb_flag: "DMG supported".to_string(),
            rom_size: "32 KiB in 1 bank".to_string(),
            ram_size: "0 KiB in 0 banks".to_string(),
            non_japanese: true,
        };
        let text = encode_event(&Event::GameInfo(info.clone())).unwrap();
        assert!(text.contains("\"cartridgeType\":\"ROM ONLY\""));
        assert_eq!(decode_event(&text).unwrap(), Some(Event::GameInfo(info)));

        let frame = render_frame(&[2; RAW_FRAME_LEN], &Palette::new(), PaletteKind::Default);
        let text = encode_event(&Event::Frame(frame)).unwrap();
        let Some(Event::Frame(decoded)) = decode_event(&text).unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(decoded.as_bytes().len(), 92_160);
        assert_eq!(decoded.pixel(159, 143), DEFAULT_PALETTE[2]);
    }
}
