/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into `front` (tiles, then bodies, then the
///      player, then the aim marker, so later layers win)
///   2. Compare each cell with `back` (previous frame)
///   3. Only emit terminal commands for cells that changed, batched with
///      `queue!` and flushed once
///   4. Swap front/back
///
/// One tile = one terminal row by `CELL_W` columns. Positions in world
/// units are floored to the tile they fall in, so the 14x32 player covers
/// two rows of a single column.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use glam::Vec2;

use grenadier::domain::controller::{Animation, GroundState};
use grenadier::domain::entity::{BodyPart, EntityKind, Facing};
use grenadier::domain::tile::Tile;
use grenadier::sim::world::{Phase, WorldState};

/// Distance from the player center to the aim marker, in world units.
const AIM_MARKER_DIST: f32 = 24.0;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
    wide: bool,    // occupies 2 terminal columns
    cont: bool,    // right half of a wide char (never printed)
}

impl Cell {
    /// Explicit background for every cell. Using the same RGB for
    /// `Clear(ClearType::All)` keeps VTE terminals from showing seams
    /// between rows.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 20, b: 30 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG, wide: false, cont: false };
    const WIDE_CONT: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG, wide: false, cont: true };

    /// Differs from every real cell; filling `back` with it forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta, wide: false, cont: false };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
        Cell { ch, fg, bg, wide: false, cont: false }
    }

    fn wide(ch: char, fg: Color, bg: Color) -> Self {
        Cell { wide: true, ..Cell::new(ch, fg, bg) }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Both terminal columns of one map cell.
    fn set_pair(&mut self, col: usize, row: usize, c0: char, c1: char, fg: Color, bg: Color) {
        self.set(col, row, Cell::new(c0, fg, bg));
        self.set(col + 1, row, Cell::new(c1, fg, bg));
    }

    fn set_wide(&mut self, col: usize, row: usize, ch: char) {
        self.set(col, row, Cell::wide(ch, Color::Reset, Color::Reset));
        self.set(col + 1, row, Cell::WIDE_CONT);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Renderer ──

/// Terminal columns per map cell.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 24, g: 30, b: 64 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 150, b: 50 };
const PLAYER_FG: Color = Color::Rgb { r: 255, g: 220, b: 120 };
const AIM_FG: Color = Color::Rgb { r: 255, g: 120, b: 60 };
const DEBRIS_FG: Color = Color::Rgb { r: 230, g: 90, b: 90 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Terminal reports key Release events (kitty protocol).
    pub keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            keyboard_enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Force a full repaint on the next frame (level change, restart).
    pub fn invalidate(&mut self) {
        self.back.cells.fill(Cell::INVALID);
        self.last_phase = None;
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Viewport = terminal minus HUD, message and help rows, capped to the map.
        let reserved_rows = MAP_ROW + 4;
        let (gw, gh) = (world.grid.width(), world.grid.height());
        world.camera.view_w = (self.term_w / CELL_W).min(gw.max(1));
        world.camera.view_h = self.term_h.saturating_sub(reserved_rows).max(1).min(gh.max(1));

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        if world.phase == Phase::Playing {
            let (cx, cy) = world.player_cell();
            world.camera.follow(cx, cy, gw, gh);
        }

        self.front.clear();
        self.compose_hud(world);
        self.compose_tiles(world);
        self.compose_bodies(world);
        if !world.controller.is_destroyed() {
            self.compose_player(world);
            self.compose_aim(world);
        }
        self.compose_footer(world);
        if world.paused {
            self.compose_pause_overlay(world);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        // Terminal cursor position after the last print, if known.
        let mut cursor: Option<(usize, usize)> = None;

        // Explicit base colors, never ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                if cell.cont {
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide && self.front.get(x + 1, y) != self.back.get(x + 1, y);
                if cell == self.back.get(x, y) && !cont_changed {
                    x += 1;
                    continue;
                }

                if cursor != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;

                let advance = if cell.wide { 2 } else { 1 };
                x += advance;
                cursor = Some((x, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    /// World position → (terminal col, terminal row) if inside the viewport.
    fn to_screen(&self, w: &WorldState, p: Vec2) -> Option<(usize, usize)> {
        let (tw, th) = w.grid.tile_size();
        let (cx, cy) = ((p.x / tw).floor() as i32, (p.y / th).floor() as i32);
        let (vx, vy) = w.camera.world_to_view(cx, cy)?;
        let (col, row) = (vx * CELL_W, MAP_ROW + vy);
        (col + 1 < self.front.width && row < self.front.height).then_some((col, row))
    }

    fn compose_hud(&mut self, w: &WorldState) {
        let c = &w.controller;
        let state = match (c.is_destroyed(), c.ground_state()) {
            (true, _) => "DOWN",
            (false, GroundState::Grounded) => "GROUND",
            (false, GroundState::Airborne) => "AIR",
        };
        let v = c.velocity();
        let hud = format!(
            " {} [{}/{}]  {:<6} dx:{:+6.1} dy:{:+6.1}  Throws:{}  Bodies:{} ",
            w.level_name, w.current_level + 1, w.total_levels,
            state, v.x, v.y, w.throws, w.entities.len(),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_tiles(&mut self, w: &WorldState) {
        let cam = &w.camera;
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= self.front.width { break; }
                let (wx, wy) = (cam.x + vx as i32, cam.y + vy as i32);
                let (c0, c1, fg, bg) = match w.grid.tile_at(wx, wy) {
                    Tile::Empty => (' ', ' ', Color::Reset, Color::Reset),
                    Tile::Ground => ('▓', '▓', Color::Rgb { r: 120, g: 90, b: 50 }, Color::Rgb { r: 70, g: 50, b: 25 }),
                    Tile::Brick => ('▙', '▟', Color::Rgb { r: 170, g: 80, b: 60 }, Color::Rgb { r: 90, g: 40, b: 30 }),
                    Tile::Vine => ('┊', '┊', Color::Rgb { r: 80, g: 180, b: 80 }, Color::Reset),
                };
                self.front.set_pair(col, row, c0, c1, fg, bg);
            }
        }
    }

    fn compose_bodies(&mut self, w: &WorldState) {
        for (_, body) in w.entities.iter() {
            let Some((col, row)) = self.to_screen(w, body.rect.center()) else { continue };
            match body.kind {
                EntityKind::Grenade => self.front.set_wide(col, row, '💣'),
                EntityKind::Debris(part) => {
                    let (c0, c1) = match part {
                        BodyPart::Head => ('(', ')'),
                        BodyPart::Torso => ('▐', '▌'),
                        BodyPart::ArmLeft | BodyPart::LegLeft => ('╱', ' '),
                        BodyPart::ArmRight | BodyPart::LegRight => (' ', '╲'),
                    };
                    self.front.set_pair(col, row, c0, c1, DEBRIS_FG, Color::Reset);
                }
            }
        }
    }

    fn compose_player(&mut self, w: &WorldState) {
        let c = &w.controller;
        let pose = c.pose();
        let (bw, bh) = (c.rect().w, c.rect().h);
        let (px, py) = (pose.x as f32, pose.y as f32);
        let mid_x = px + bw / 2.0;

        let head = match pose.facing {
            Facing::Right => ('●', '▸'),
            Facing::Left => ('◂', '●'),
        };
        let stride = (w.tick / 6) % 2 == 0;
        let legs = match pose.animation {
            Animation::Idle => ('▐', '▌'),
            Animation::Walking if stride => ('╱', '╲'),
            Animation::Walking => ('│', '│'),
            Animation::Jumping => ('╲', '╱'),
        };

        if let Some((col, row)) = self.to_screen(w, Vec2::new(mid_x, py + 1.0)) {
            self.front.set_pair(col, row, head.0, head.1, PLAYER_FG, Color::Reset);
        }
        if let Some((col, row)) = self.to_screen(w, Vec2::new(mid_x, py + bh - 1.0)) {
            self.front.set_pair(col, row, legs.0, legs.1, PLAYER_FG, Color::Reset);
        }
    }

    /// Marker along the throw direction while something is held.
    fn compose_aim(&mut self, w: &WorldState) {
        let c = &w.controller;
        if c.held().is_none() { return; }
        let tip = c.center() + Vec2::from_angle(c.throw_angle()) * AIM_MARKER_DIST;
        if let Some((col, row)) = self.to_screen(w, tip) {
            self.front.set_pair(col, row, '✛', ' ', AIM_FG, Color::Reset);
        }
    }

    fn compose_footer(&mut self, w: &WorldState) {
        let msg_row = MAP_ROW + w.camera.view_h + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }

        let help_row = MAP_ROW + w.camera.view_h + 3;
        if help_row < self.front.height {
            let help = " ←→:Move  ↓:Crouch  ↑↓:Aim  Space:Jump  X:Throw  K:Explode  R:Restart  N:Next  F1:Pause  Q:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };

        let view_cols = w.camera.view_w * CELL_W;
        let box_w = 28_usize.min(view_cols);
        let box_h = 7_usize.min(w.camera.view_h);
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + w.camera.view_h.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::Reset, dim));
            }
        }

        self.front.put_str(box_x + 8, box_y + 1, "▶  PAUSED  ◀", hdr, dim);
        self.front.put_str(box_x + 2, box_y + 3, "F1  Resume", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 4, "R   Restart Level", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 5, "Q   Quit", key_c, dim);
    }
}
