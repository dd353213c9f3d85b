use crate::protocol::Event;

/// Raw introspection output of the engine, one variant per debug slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugSnapshot {
    Cpu(Vec<u8>),
    Memory(Vec<u8>),
    Oam(Vec<u8>),
    Vram(Vec<u8>),
}

impl DebugSnapshot {
    pub fn slot(&self) -> &'static str {
        match self {
            DebugSnapshot::Cpu(_) => "cpu",
            DebugSnapshot::Memory(_) => "mem",
            DebugSnapshot::Oam(_) => "oam",
            DebugSnapshot::Vram(_) => "vram",
        }
    }

    /// Decodes the dump to text and wraps it in the matching event. Consumes
    /// the snapshot.
    pub fn into_event(self) -> Event {
        match self {
            DebugSnapshot::Cpu(raw) => Event::CpuTrace { text: decode(raw) },
            DebugSnapshot::Memory(raw) => Event::MemoryDump { text: decode(raw) },
            DebugSnapshot::Oam(raw) => Event::OamDump { text: decode(raw) },
            DebugSnapshot::Vram(raw) => Event::VramDump { text: decode(raw) },
        }
    }
}

fn decode(raw: Vec<u8>) -> String {
    String::from_utf8(raw).unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}
