use super::{ADDRESS_SPACE_END, Engine, EngineError};
use crate::cartridge::CartridgeHeader;
use crate::debug::DebugSnapshot;
use crate::input::Button;
use crate::input::joypad::{JOYP_ADDRESS, JoypSelect, Joypad};
use crate::video::{RAW_FRAME_LEN, RawFrame, SCREEN_WIDTH};
use log::trace;
use std::fmt::Write;

const VRAM_START: u32 = 0x8000;
const VRAM_SIZE: usize = 0x2000;
const OAM_START: u32 = 0xFE00;
const OAM_SIZE: usize = 0xA0;
const ROM_END: u32 = 0x8000;

const TILE_BYTES: usize = 16;
/// The boot ROM copies the logo to tiles 1..=24.
const LOGO_FIRST_TILE: usize = 1;
const LOGO_TILES_PER_ROW: usize = 12;
const LOGO_X: usize = (SCREEN_WIDTH - LOGO_TILES_PER_ROW * 8) / 2;
const LOGO_REST_Y: u64 = 64;

const DUMP_BYTES_PER_LINE: u32 = 16;

/// An engine without a CPU: it maps the cartridge, decodes the boot logo into
/// VRAM and scrolls it down the screen the way the boot sequence does. Useful
/// to drive the bridge end to end and as a test double.
pub struct HeadlessEngine {
    rom: Vec<u8>,
    header: CartridgeHeader,
    framebuffer: Box<RawFrame>,
    vram: Box<[u8; VRAM_SIZE]>,
    oam: [u8; OAM_SIZE],
    joypad: Joypad,
    frame_count: u64,
}

impl HeadlessEngine {
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn joypad(&self) -> &Joypad {
        &self.joypad
    }

    fn read(&self, addr: u32) -> u8 {
        match addr {
            0x0000..ROM_END => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            0x8000..0xA000 => self.vram[(addr - VRAM_START) as usize],
            0xFE00..0xFEA0 => self.oam[(addr - OAM_START) as usize],
            a if a == JOYP_ADDRESS as u32 => self.joypad.read(),
            _ => 0xFF,
        }
    }

    fn logo_y(&self) -> usize {
        self.frame_count.min(LOGO_REST_Y) as usize
    }

    fn draw(&mut self) {
        self.framebuffer.fill(0);

        let y0 = self.logo_y();
        for tile in 0..LOGO_TILES_PER_ROW * 2 {
            let x0 = LOGO_X + (tile % LOGO_TILES_PER_ROW) * 8;
            let y0 = y0 + (tile / LOGO_TILES_PER_ROW) * 8;
            let data = (LOGO_FIRST_TILE + tile) * TILE_BYTES;

            for line in 0..8 {
                let low = self.vram[data + line * 2];
                let high = self.vram[data + line * 2 + 1];
                for px in 0..8 {
                    let bit = 7 - px;
                    let shade = (((high >> bit) & 1) << 1) | ((low >> bit) & 1);
                    let offset = (y0 + line) * SCREEN_WIDTH + x0 + px;
                    if offset < RAW_FRAME_LEN {
                        self.framebuffer[offset] = shade;
                    }
                }
            }
        }
    }

    /// Reads JOYP once per key group, then deselects both again.
    fn cpu_trace(&mut self) -> String {
        self.joypad.write(JoypSelect::ACTIONS.bits());
        let directions = self.joypad.read();
        self.joypad.write(JoypSelect::DIRECTIONS.bits());
        let actions = self.joypad.read();
        self.joypad.write(JoypSelect::all().bits());

        format!(
            "frame: {}\tlogo y: {}\tJOYP dir: {:02X} act: {:02X}\theld: {:?}\n",
            self.frame_count,
            self.logo_y(),
            directions,
            actions,
            self.joypad.held()
        )
    }

    fn oam_dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "sprites enabled: false");
        for (sprite, attr) in self.oam.chunks_exact(4).enumerate() {
            let _ = writeln!(
                out,
                "sprite {}: x {} y {} tileId {:02X} attributes {:08b}",
                sprite, attr[1], attr[0], attr[2], attr[3]
            );
        }
        out
    }

    fn vram_dump(&self) -> String {
        const ROWS: usize = 24;
        const TILES_PER_ROW: usize = 16;

        let mut out = String::new();
        for line in 0..ROWS * 8 {
            let row_start = (line / 8) * TILES_PER_ROW;
            let block = match row_start {
                0..=128 => '0',
                129..=256 => '1',
                _ => '2',
            };
            out.push(block);
            out.push(' ');

            for tile in row_start..row_start + TILES_PER_ROW {
                let addr = tile * TILE_BYTES + (line % 8) * 2;
                let (low, high) = (self.vram[addr], self.vram[addr + 1]);
                for bit in (0..8).rev() {
                    let shade = (((high >> bit) & 1) << 1) | ((low >> bit) & 1);
                    out.push(match shade {
                        0 => '▁',
                        1 => '░',
                        2 => '▒',
                        _ => '▓',
                    });
                }
            }
            out.push('\n');
        }
        out
    }

    fn memory_dump(&self, start: u32, end: u32) -> String {
        let mut out = String::new();
        let mut addr = start;
        while addr < end {
            let line_end = (addr + DUMP_BYTES_PER_LINE).min(end);
            let _ = write!(out, "{:04X}:", addr);
            for a in addr..line_end {
                let _ = write!(out, " {:02X}", self.read(a));
            }
            out.push('\n');
            addr = line_end;
        }
        out
    }
}

/// Each logo nibble is one 4-pixel row of a 4x4 block; the boot ROM doubles
/// it in both directions into an 8x8 tile of shade 3.
fn decode_logo(logo: &[u8; 48], vram: &mut [u8; VRAM_SIZE]) {
    for (block, bytes) in logo.chunks_exact(2).enumerate() {
        let base = (LOGO_FIRST_TILE + block) * TILE_BYTES;
        let rows = [bytes[0] >> 4, bytes[0] & 0x0F, bytes[1] >> 4, bytes[1] & 0x0F];
        for (r, nibble) in rows.into_iter().enumerate() {
            let doubled = (0..4).fold(0u8, |acc, bit| {
                if nibble & (1 << bit) != 0 { acc | (0b11 << (bit * 2)) } else { acc }
            });
            for line in [r * 2, r * 2 + 1] {
                vram[base + line * 2] = doubled;
                vram[base + line * 2 + 1] = doubled;
            }
        }
    }
}

impl Engine for HeadlessEngine {
    fn load(rom: Vec<u8>) -> Result<Self, EngineError> {
        if rom.is_empty() {
            return Err(EngineError::EmptyRom);
        }

        let header = CartridgeHeader::parse(&rom)?;
        let mut vram = Box::new([0u8; VRAM_SIZE]);
        decode_logo(&header.logo, &mut vram);

        let mut engine = HeadlessEngine {
            rom,
            header,
            framebuffer: Box::new([0; RAW_FRAME_LEN]),
            vram,
            oam: [0; OAM_SIZE],
            joypad: Joypad::new(),
            frame_count: 0,
        };
        engine.draw();

        Ok(engine)
    }

    fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    fn run_frame(&mut self) -> Result<(), EngineError> {
        self.frame_count += 1;
        self.draw();
        Ok(())
    }

    fn framebuffer(&self) -> &RawFrame {
        &self.framebuffer
    }

    fn key_down(&mut self, button: Button) -> Option<DebugSnapshot> {
        trace!("key {} down", button);
        if button.is_joypad() {
            self.joypad.set_key_state(button, true);
        }

        match button {
            Button::Step => Some(DebugSnapshot::Cpu(self.cpu_trace().into_bytes())),
            Button::DumpOam => Some(DebugSnapshot::Oam(self.oam_dump().into_bytes())),
            Button::DumpVram => Some(DebugSnapshot::Vram(self.vram_dump().into_bytes())),
            _ => None,
        }
    }

    fn key_up(&mut self, button: Button) {
        trace!("key {} up", button);
        if button.is_joypad() {
            self.joypad.set_key_state(button, false);
        }
    }

    fn request_memory(&mut self, start: u32, end: u32) -> Result<Option<DebugSnapshot>, EngineError> {
        if start > end || end > ADDRESS_SPACE_END {
            return Err(EngineError::InvalidRange { start, end });
        }
        if start == end {
            return Ok(None);
        }

        Ok(Some(DebugSnapshot::Memory(self.memory_dump(start, end).into_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::test_rom;

    fn engine() -> HeadlessEngine {
        HeadlessEngine::load(test_rom("TETRIS")).unwrap()
    }

    #[test]
    fn load_rejects_empty_and_broken_images() {
        assert!(matches!(HeadlessEngine::load(Vec::new()), Err(EngineError::EmptyRom)));
        assert!(matches!(HeadlessEngine::load(vec![0; 0x40]), Err(EngineError::Header(_))));
    }

    #[test]
    fn logo_scrolls_down_and_stops() {
        let mut engine = engine();
        // first logo block's top-left pixel is set (0xCE -> 1100)
        assert_eq!(engine.framebuffer()[LOGO_X], 3);

        for _ in 0..100 {
            engine.run_frame().unwrap();
        }
        assert_eq!(engine.frame_count(), 100);
        assert_eq!(engine.framebuffer()[LOGO_X], 0);
        assert_eq!(engine.framebuffer()[64 * SCREEN_WIDTH + LOGO_X], 3);
        assert!(engine.framebuffer().iter().all(|&px| px <= 3));
    }

    #[test]
    fn debug_buttons_return_snapshots() {
        let mut engine = engine();
        assert_eq!(engine.key_down(Button::A), None);

        let Some(DebugSnapshot::Oam(oam)) = engine.key_down(Button::DumpOam) else {
            panic!("expected an OAM dump");
        };
        let oam = String::from_utf8(oam).unwrap();
        assert!(oam.starts_with("sprites enabled: false\n"));
        assert_eq!(oam.lines().count(), 41);

        let Some(DebugSnapshot::Vram(vram)) = engine.key_down(Button::DumpVram) else {
            panic!("expected a VRAM dump");
        };
        let vram = String::from_utf8(vram).unwrap();
        assert_eq!(vram.lines().count(), 24 * 8);
        assert!(vram.contains('▓'));

        assert!(matches!(engine.key_down(Button::Step), Some(DebugSnapshot::Cpu(_))));
    }

    #[test]
    fn joypad_follows_keys() {
        let mut engine = engine();
        engine.key_down(Button::Start);
        assert!(engine.joypad().is_key_pressed(Button::Start));
        engine.key_up(Button::Start);
        assert!(!engine.joypad().is_key_pressed(Button::Start));
    }

    #[test]
    fn cpu_trace_reads_both_key_groups() {
        let mut engine = engine();
        engine.key_down(Button::Up);
        engine.key_down(Button::Start);

        let Some(DebugSnapshot::Cpu(trace)) = engine.key_down(Button::Step) else {
            panic!("expected a CPU trace");
        };
        let trace = String::from_utf8(trace).unwrap();
        assert!(trace.contains("JOYP dir: EB act: D7"), "{}", trace);

        // both groups are deselected again afterwards
        assert_eq!(engine.read(JOYP_ADDRESS as u32), 0xFF);
    }

    #[test]
    fn memory_requests() {
        let mut engine = engine();

        let Ok(Some(DebugSnapshot::Memory(dump))) = engine.request_memory(0x104, 0x108) else {
            panic!("expected a memory dump");
        };
        assert_eq!(String::from_utf8(dump).unwrap(), "0104: CE ED 66 66\n");

        let Ok(Some(DebugSnapshot::Memory(dump))) = engine.request_memory(0x0000, 0x0021) else {
            panic!("expected a memory dump");
        };
        assert_eq!(String::from_utf8(dump).unwrap().lines().count(), 3);

        assert!(matches!(engine.request_memory(0x10, 0x10), Ok(None)));
        assert!(matches!(
            engine.request_memory(0x200, 0x100),
            Err(EngineError::InvalidRange { start: 0x200, end: 0x100 })
        ));
        assert!(matches!(
            engine.request_memory(0xFF00, 0x10001),
            Err(EngineError::InvalidRange { .. })
        ));
    }
}
