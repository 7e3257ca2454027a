use crate::frame::{Frame, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use rosc::{OscMessage, OscPacket, OscType};

/// Why an OSC message cannot be shown
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameRejection {
    #[error("expected exactly one argument, got {0}")]
    ArgumentCount(usize),

    #[error("argument is {0}, expected a string")]
    NotAString(&'static str),

    #[error("string has {actual} characters, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("string contains characters other than '0' and '1'")]
    NonBinary,
}

/// All messages in a packet, with bundles flattened in order
pub fn messages(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(message) => vec![message],
        OscPacket::Bundle(bundle) => bundle.content.into_iter().flat_map(messages).collect(),
    }
}

/// Turn a message carrying one `'0'`/`'1'` string into a display frame
pub fn frame_from_message(message: &OscMessage) -> Result<Frame, FrameRejection> {
    let [arg] = message.args.as_slice() else {
        return Err(FrameRejection::ArgumentCount(message.args.len()));
    };

    let OscType::String(bits) = arg else {
        return Err(FrameRejection::NotAString(type_name(arg)));
    };

    let expected = DISPLAY_WIDTH * DISPLAY_HEIGHT;
    let actual = bits.chars().count();
    if actual != expected {
        return Err(FrameRejection::Length { expected, actual });
    }

    Frame::from_bit_string(bits, DISPLAY_WIDTH, DISPLAY_HEIGHT).map_err(|_| FrameRejection::NonBinary)
}

fn type_name(arg: &OscType) -> &'static str {
    match arg {
        OscType::Int(_) => "an int",
        OscType::Long(_) => "a long",
        OscType::Float(_) => "a float",
        OscType::Double(_) => "a double",
        OscType::Blob(_) => "a blob",
        OscType::Bool(_) => "a bool",
        OscType::Char(_) => "a char",
        OscType::Nil => "nil",
        _ => "a non-string value",
    }
}
