/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each maze tile is two terminal columns wide. Agents are drawn on the
/// tile that contains their center.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::cell::CellKind;
use crate::domain::entity::{Appearance, Direction, Identity, TilePos};
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gap between rows matches on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 10, g: 10, b: 20 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
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
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
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

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Write a two-column glyph pair for one maze tile.
    fn put_tile(&mut self, col: usize, row: usize, glyph: (char, char), fg: Color, bg: Color) {
        self.set(col, row, Cell::from_char(glyph.0, fg, bg));
        self.set(col + 1, row, Cell::from_char(glyph.1, fg, bg));
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }
}

// ── Palette ──

const WALL_FG: Color = Color::Rgb { r: 60, g: 90, b: 255 };
const WALL_BG: Color = Color::Rgb { r: 20, g: 30, b: 120 };
const GATE_FG: Color = Color::Rgb { r: 255, g: 170, b: 210 };
const PELLET_FG: Color = Color::Rgb { r: 255, g: 210, b: 180 };
const PLAYER_FG: Color = Color::Rgb { r: 255, g: 230, b: 0 };
const FRIGHT_FG: Color = Color::Rgb { r: 60, g: 90, b: 255 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const HI: Color = Color::Rgb { r: 255, g: 230, b: 0 };

fn identity_color(id: Identity) -> Color {
    match id {
        Identity::Red => Color::Rgb { r: 255, g: 50, b: 50 },
        Identity::Pink => Color::Rgb { r: 255, g: 150, b: 210 },
        Identity::Cyan => Color::Rgb { r: 60, g: 230, b: 255 },
        Identity::Orange => Color::Rgb { r: 255, g: 170, b: 60 },
    }
}

fn player_glyph(dir: Direction, mouth_open: bool) -> (char, char) {
    if !mouth_open {
        return ('◖', '◗');
    }
    match dir {
        Direction::Left => ('<', '◗'),
        Direction::Right => ('◖', '>'),
        Direction::Up => ('◖', '◗'),
        Direction::Down => ('◖', '◗'),
        Direction::Stop => ('◖', '◗'),
    }
}

/// Frightened adversaries flash during the last two seconds.
fn frightened_color(power_timer: f32, frame: u64) -> Color {
    if power_timer < 2.0 && (frame / 8) % 2 == 0 {
        Color::White
    } else {
        FRIGHT_FG
    }
}

// ── Renderer ──

/// Game tile (gx) maps to terminal columns (gx*2, gx*2+1).
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Frames drawn; drives blinking.
    frame: u64,
    /// Terminal reports key Release events.
    keyboard_enhanced: bool,
    /// Show gamepad hints in the help bar.
    pad_connected: bool,
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
            frame: 0,
            keyboard_enhanced: false,
            pad_connected: false,
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
        // Force full repaint on first frame.
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

    pub fn set_pad_connected(&mut self, connected: bool) {
        self.pad_connected = connected;
    }

    /// True once init has switched on key Release reporting.
    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.keyboard_enhanced = false;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render<R>(&mut self, world: &mut WorldState<R>) -> io::Result<()> {
        self.frame += 1;

        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Viewport = terminal cols / CELL_W wide, minus HUD, message and help rows.
        let reserved_rows = MAP_ROW + 4;
        let (maze_w, maze_h) = (world.maze().width(), world.maze().height());
        world.camera.view_w = (self.term_w / CELL_W).min(maze_w);
        world.camera.view_h = self.term_h.saturating_sub(reserved_rows).max(1).min(maze_h);

        let phase_changed = self.last_phase != Some(world.phase);
        if phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        match world.phase {
            Phase::Playing => world.camera.follow(world.player.tile(), maze_w, maze_h),
            Phase::Ready => world.camera.center_on(world.player.tile(), maze_w, maze_h),
            Phase::Title | Phase::Won | Phase::Lost => {}
        }

        self.front.clear();

        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Ready => {
                self.compose_game(world);
                self.compose_banner(world, "READY!", HI);
            }
            Phase::Playing | Phase::Won | Phase::Lost => self.compose_game(world),
        }

        if world.phase.is_over() {
            self.compose_result(world);
        }

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
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal's
        // own default and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game<R>(&mut self, w: &WorldState<R>) {
        let buf_w = self.front.width;
        let cam = &w.camera;

        // ── HUD row ──
        let lives: String = "●".repeat(w.lives as usize);
        let power = if w.power_timer > 0.0 {
            format!("POWER {:>4.1}s", w.power_timer)
        } else {
            String::new()
        };
        let hud = format!(
            " {}  SCORE {:<6}  LIVES {:<5}  PELLETS {:<3}  {} ",
            w.level.name, w.score, lives, w.pellets_remaining(), power,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Maze (camera viewport) ──
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= buf_w { break; }
                self.compose_tile(w, cam.x + vx as i32, cam.y + vy as i32, col, row);
            }
        }

        // ── Agents: adversaries first, player on top ──
        for a in &w.adversaries {
            let t = a.tile();
            if let Some((vx, vy)) = cam.world_to_view(t.x, t.y) {
                let (glyph, fg) = match a.appearance() {
                    Appearance::Normal => (('◢', '◣'), identity_color(a.identity)),
                    Appearance::Frightened => (('◢', '◣'), frightened_color(w.power_timer, self.frame)),
                    Appearance::Eyes => (('°', '°'), Color::White),
                };
                self.front.put_tile(vx * CELL_W, MAP_ROW + vy, glyph, fg, Color::Reset);
            }
        }

        let t = w.player.tile();
        if let Some((vx, vy)) = cam.world_to_view(t.x, t.y) {
            let mouth_open = w.player.mover.direction != Direction::Stop && (self.frame / 4) % 2 == 0;
            let glyph = player_glyph(w.player.mover.direction, mouth_open);
            self.front.put_tile(vx * CELL_W, MAP_ROW + vy, glyph, PLAYER_FG, Color::Reset);
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + cam.view_h + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            let msg = format!(" ◈ {} ", w.message);
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &msg, Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + cam.view_h + 3;
        if help_row < self.front.height {
            let mut help = String::from(" ←↑↓→/WASD Move  P/F1 Pause  ESC Title");
            if self.pad_connected {
                help.push_str("  │  Pad: D-pad Move  B Pause  Select Title");
            }
            self.front.put_str(0, help_row, &help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Write the visual for maze tile (wx, wy) at (col, row).
    /// Out-of-bounds tiles draw as void.
    fn compose_tile<R>(&mut self, w: &WorldState<R>, wx: i32, wy: i32, col: usize, row: usize) {
        let maze = w.maze();
        if wx < 0 || wy < 0 || wx >= maze.width() as i32 || wy >= maze.height() as i32 {
            self.front.put_tile(col, row, (' ', ' '), Color::White, Color::Reset);
            return;
        }

        let t = TilePos::new(wx, wy);
        let (glyph, fg, bg) = match maze.cell_at(wx, wy) {
            CellKind::Wall => (('█', '█'), WALL_FG, WALL_BG),
            CellKind::Gate => (('━', '━'), GATE_FG, Color::Reset),
            CellKind::Pellet if w.dots.contains(&t) => (('·', ' '), PELLET_FG, Color::Reset),
            CellKind::PowerPellet if w.power_pellets.contains(&t) => {
                let glyph = if (self.frame / 10) % 2 == 0 { ('●', ' ') } else { (' ', ' ') };
                (glyph, PELLET_FG, Color::Reset)
            }
            CellKind::Empty | CellKind::Pellet | CellKind::PowerPellet => ((' ', ' '), Color::White, Color::Reset),
        };
        self.front.put_tile(col, row, glyph, fg, bg);
    }

    /// Short text centered over the maze viewport.
    fn compose_banner<R>(&mut self, w: &WorldState<R>, text: &str, fg: Color) {
        let cam = &w.camera;
        let view_cols = cam.view_w * CELL_W;
        let len = text.chars().count();
        let x = view_cols.saturating_sub(len) / 2;
        let y = MAP_ROW + cam.view_h / 2;
        self.front.put_str(x, y, text, fg, Color::Reset);
    }

    fn compose_title<R>(&mut self, w: &WorldState<R>) {
        let title = [
            r"  __  __                  ___ _                 ",
            r" |  \/  |__ _ ______     / __| |_  __ _ ___ ___ ",
            r" | |\/| / _` |_ / -_)   | (__| ' \/ _` (_-</ -_)",
            r" |_|  |_\__,_/__\___|    \___|_||_\__,_/__/\___|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, HI, Color::Reset);
        }

        let tagline = "━━━ Terminal Edition ━━━";
        let tx = 2 + title[1].len().saturating_sub(tagline.chars().count()) / 2;
        self.front.put_str(tx, 7, tagline, WALL_FG, Color::Reset);

        let menu_base = 10;
        self.front.put_str(8, menu_base, "ENTER   Start", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
        self.front.put_str(8, menu_base + 1, "  ESC   Quit", Color::White, Color::Reset);

        let info = format!(
            "Maze: {}  ({}x{}, {} pellets)",
            w.level.name,
            w.maze().width(),
            w.maze().height(),
            w.level.maze.pellet_tiles().len() + w.level.maze.power_pellet_tiles().len(),
        );
        self.front.put_str(8, menu_base + 3, &info, Color::DarkGrey, Color::Reset);

        // Legend
        let base = menu_base + 5;
        self.front.put_str(8, base, "Controls", HI, Color::Reset);
        self.front.put_str(8, base + 1, "  ←↑↓→ / WASD   Move", Color::White, Color::Reset);
        self.front.put_str(8, base + 2, "  P / F1        Pause", Color::White, Color::Reset);
        self.front.put_str(8, base + 3, "  ESC           Back to title", Color::White, Color::Reset);

        self.front.put_str(8, base + 5, "Eat every pellet. ● turns the ghosts blue: eat them for 200.", Color::DarkGrey, Color::Reset);
        let legend_y = base + 6;
        for (i, id) in Identity::ALL.iter().enumerate() {
            self.front.put_tile(10 + i * 3, legend_y, ('◢', '◣'), identity_color(*id), Color::Reset);
        }
        self.front.put_tile(24, legend_y, ('◢', '◣'), FRIGHT_FG, Color::Reset);
        self.front.put_tile(28, legend_y, ('°', '°'), Color::White, Color::Reset);
    }

    fn compose_result<R>(&mut self, w: &WorldState<R>) {
        let (headline, color) = if w.phase == Phase::Won {
            ("★ MAZE CLEARED! ★", Color::Rgb { r: 80, g: 255, b: 80 })
        } else {
            ("✕ GAME OVER ✕", Color::Rgb { r: 255, g: 60, b: 60 })
        };
        let cam = &w.camera;
        let view_cols = cam.view_w * CELL_W;
        let box_w = 34_usize.min(view_cols.max(1));
        let box_h = 7_usize.min(cam.view_h.max(1));
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + cam.view_h.saturating_sub(box_h) / 2;
        let bg = Color::Rgb { r: 30, g: 30, b: 30 };

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::White, bg));
            }
        }
        let center = |s: &str| box_x + box_w.saturating_sub(s.chars().count()) / 2;
        self.front.put_str(center(headline), box_y + 1, headline, color, bg);
        let score = format!("Final Score: {}", w.score);
        self.front.put_str(center(&score), box_y + 3, &score, Color::White, bg);
        let hint = "ENTER play again · ESC title";
        self.front.put_str(center(hint), box_y + 5, hint, Color::DarkGrey, bg);
    }

    fn compose_pause_overlay<R>(&mut self, w: &WorldState<R>) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let blink = (self.frame / 8) % 2 == 0;
        let cam = &w.camera;

        let view_cols = cam.view_w * CELL_W;
        let box_w = 30_usize.min(view_cols);
        let box_h = 8_usize.min(cam.view_h);
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + cam.view_h.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::Reset, dim));
            }
        }

        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + 9, box_y + 1, label, HI, dim);
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        self.front.put_str(box_x + 3, box_y + 3, "P / F1  Resume", key_c, dim);
        self.front.put_str(box_x + 3, box_y + 4, "ESC     Back to title", key_c, dim);
        self.front.put_str(box_x + 3, box_y + 5, "Ctrl+C  Quit", key_c, dim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_round_trips_glyph() {
        let c = Cell::from_char('█', Color::White, Color::Reset);
        assert_eq!(c.as_str(), "█");
        assert_eq!(c.bg, Cell::BASE_BG);
    }

    #[test]
    fn frame_buffer_clips_writes() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.put_str(2, 0, "abc", Color::White, Color::Reset);
        assert_eq!(fb.get(2, 0).as_str(), "a");
        assert_eq!(fb.get(3, 0).as_str(), "b");
        fb.set(9, 9, Cell::INVALID);
        assert!(fb.get(9, 9) == Cell::BLANK);
    }

    fn row_text(r: &Renderer, y: usize) -> String {
        (0..r.front.width).map(|x| r.front.get(x, y).as_str().to_string()).collect()
    }

    #[test]
    fn pad_hints_follow_connection() {
        use crate::sim::level::builtin_level;
        use crate::sim::world::RoundSettings;
        use rand::rngs::mock::StepRng;

        let mut world = WorldState::new_round(builtin_level().unwrap(), RoundSettings::default(), StepRng::new(0, 1));
        world.camera.view_w = 40;
        world.camera.view_h = 30;
        let help_row = MAP_ROW + 30 + 3;

        let mut r = Renderer::new();
        r.front.resize(160, 40);
        r.compose_game(&world);
        assert!(row_text(&r, help_row).contains("WASD"));
        assert!(!row_text(&r, help_row).contains("Pad"));

        r.set_pad_connected(true);
        r.front.clear();
        r.compose_game(&world);
        assert!(row_text(&r, help_row).contains("Pad: D-pad"));
    }

    #[test]
    fn frightened_flashes_only_near_expiry() {
        assert_eq!(frightened_color(4.0, 0), FRIGHT_FG);
        assert_eq!(frightened_color(1.0, 0), Color::White);
        assert_eq!(frightened_color(1.0, 8), FRIGHT_FG);
    }
}
