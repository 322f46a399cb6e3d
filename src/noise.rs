use rand::Rng;

/// Default edge length of a static cell, in logical pixels.
pub const DEFAULT_CELL_SIZE: u32 = 2;

/// The visible area the static has to cover, in logical pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Decides whether a cell changes at all on a given tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flicker {
    /// Every cell gets a new gray value every tick.
    Always,
    /// Each cell changes independently with this probability, clamped to [0, 1].
    Probability(f64),
}

impl Flicker {
    /// Analog looking texture: a flicker draw uniform in [0.2, 1.0] must exceed 0.5,
    /// which leaves five chances in eight for a cell to change.
    pub const ANALOG: Flicker = Flicker::Probability(0.625);

    fn changes<R: Rng>(&self, rng: &mut R) -> bool {
        match *self {
            Flicker::Always => true,
            Flicker::Probability(p) => rng.gen_bool(p.clamp(0.0, 1.0)),
        }
    }
}

impl Default for Flicker {
    fn default() -> Self {
        Flicker::ANALOG
    }
}

/// One tick worth of static. Cells are stored row by row; `None` means the cell
/// keeps whatever was drawn there before.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NoiseFrame {
    columns: usize,
    rows: usize,
    cell_size: u32,
    cells: Vec<Option<f32>>,
}

impl NoiseFrame {
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn cells(&self) -> &[Option<f32>] {
        &self.cells
    }

    /// Gray value of a changed cell, or None if it did not change (or is outside the grid).
    pub fn get(&self, column: usize, row: usize) -> Option<f32> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells[row * self.columns + column]
    }

    /// Writes the changed cells into an RGB24 pixel buffer, as `cell_size` squares.
    /// "pitch" is the length in bytes of a row of pixels. Cells that fall outside the
    /// buffer are clipped; unchanged cells are left as they are.
    pub fn paint_rgb24(&self, buffer: &mut [u8], pitch: usize) {
        if pitch == 0 {
            return;
        }
        let cell = self.cell_size as usize;
        let buffer_rows = buffer.len() / pitch;
        let buffer_columns = pitch / 3;
        for (index, value) in self.cells.iter().enumerate() {
            let Some(gray) = value else {
                continue;
            };
            let shade = (gray.clamp(0.0, 1.0) * 255.0).round() as u8;
            let x0 = (index % self.columns) * cell;
            let y0 = (index / self.columns) * cell;
            for y in y0..(y0 + cell).min(buffer_rows) {
                let row = &mut buffer[y * pitch..];
                for x in x0..(x0 + cell).min(buffer_columns) {
                    let i = x * 3;
                    row[i] = shade; // Red
                    row[i + 1] = shade; // Green
                    row[i + 2] = shade; // Blue
                }
            }
        }
    }
}

/// Blanks an RGB24 pixel buffer.
pub fn fill_black(buffer: &mut [u8]) {
    buffer.fill(0);
}

/// Generates static frames for a viewport. Each frame is a pure function of the
/// viewport and the random source; nothing carries over between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseRenderer {
    cell_size: u32,
    flicker: Flicker,
}

impl Default for NoiseRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE, Flicker::default())
    }
}

impl NoiseRenderer {
    /// A zero cell size is treated as one.
    pub fn new(cell_size: u32, flicker: Flicker) -> Self {
        Self {
            cell_size: cell_size.max(1),
            flicker,
        }
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn flicker(&self) -> Flicker {
        self.flicker
    }

    /// Grid dimensions (columns, rows) for a viewport.
    pub fn grid(&self, viewport: Viewport) -> (usize, usize) {
        (
            (viewport.width / self.cell_size) as usize,
            (viewport.height / self.cell_size) as usize,
        )
    }

    pub fn render<R: Rng>(&self, viewport: Viewport, rng: &mut R) -> NoiseFrame {
        let mut frame = NoiseFrame::default();
        self.render_into(viewport, rng, &mut frame);
        frame
    }

    /// Same as `render`, reusing the frame's allocation.
    pub fn render_into<R: Rng>(
        &self,
        viewport: Viewport,
        rng: &mut R,
        frame: &mut NoiseFrame,
    ) {
        let (columns, rows) = self.grid(viewport);
        frame.columns = columns;
        frame.rows = rows;
        frame.cell_size = self.cell_size;
        frame.cells.clear();
        frame.cells.reserve(columns * rows);
        for _ in 0..columns * rows {
            let cell = if self.flicker.changes(rng) {
                Some(rng.gen_range(0.0..=1.0))
            } else {
                None
            };
            frame.cells.push(cell);
        }
    }
}
