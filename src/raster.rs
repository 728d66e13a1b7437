//! Pixel buffer drawn with half blocks: one terminal cell shows two stacked pixels.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Raster {
    pub fn new(width: usize, height: usize, fill: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[cfg(test)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Fill pixels `x0..x1` × `y0..y1`, clipped to the raster.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, color: Color) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.pixels[y * self.width + x] = color;
            }
        }
    }

    /// Fill a convex quad given in pixel coordinates. Pixel centres closer
    /// than `edge` to the boundary take `outline`.
    pub fn fill_quad(&mut self, quad: [(f32, f32); 4], fill: Color, outline: Color, edge: f32) {
        let (min_x, max_x) = quad
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
        let (min_y, max_y) = quad
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }
        let x0 = min_x.max(0.0).floor() as usize;
        let y0 = min_y.max(0.0).floor() as usize;
        let x1 = (max_x.ceil().max(0.0) as usize).min(self.width);
        let y1 = (max_y.ceil().max(0.0) as usize).min(self.height);

        for y in y0..y1 {
            for x in x0..x1 {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                if let Some(depth) = inside_depth(&quad, p) {
                    let color = if depth < edge { outline } else { fill };
                    self.pixels[y * self.width + x] = color;
                }
            }
        }
    }

    /// Draw into `area`, two pixel rows per terminal row.
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height as usize {
            let top_y = row * 2;
            if top_y >= self.height {
                break;
            }
            for col in 0..(area.width as usize).min(self.width) {
                let top = self.pixels[top_y * self.width + col];
                let bottom = self.get(col, top_y + 1).unwrap_or(top);
                let pos = (area.x + col as u16, area.y + row as u16);
                if let Some(cell) = buf.cell_mut(pos) {
                    cell.set_symbol("▀").set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

/// Distance from `p` to the nearest edge if `p` lies inside the convex quad.
/// Works for either winding.
fn inside_depth(quad: &[(f32, f32); 4], p: (f32, f32)) -> Option<f32> {
    let mut sign = 0.0f32;
    let mut depth = f32::MAX;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let (ex, ey) = (b.0 - a.0, b.1 - a.1);
        let len = (ex * ex + ey * ey).sqrt();
        if len <= f32::EPSILON {
            continue;
        }
        let cross = ex * (p.1 - a.1) - ey * (p.0 - a.0);
        if cross != 0.0 {
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return None;
            }
        }
        depth = depth.min(cross.abs() / len);
    }
    Some(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Color = Color::Black;
    const FILL: Color = Color::Rgb(0, 240, 240);
    const LINE: Color = Color::Rgb(0, 190, 190);

    fn square(x: f32, y: f32, size: f32) -> [(f32, f32); 4] {
        [(x, y), (x + size, y), (x + size, y + size), (x, y + size)]
    }

    #[test]
    fn test_square_fill_and_outline() {
        let mut r = Raster::new(10, 10, BG);
        r.fill_quad(square(1.0, 1.0, 6.0), FILL, LINE, 1.0);
        assert_eq!(r.get(0, 0), Some(BG));
        assert_eq!(r.get(1, 1), Some(LINE));
        assert_eq!(r.get(6, 3), Some(LINE));
        assert_eq!(r.get(3, 3), Some(FILL));
        assert_eq!(r.get(4, 4), Some(FILL));
        assert_eq!(r.get(7, 7), Some(BG));
    }

    #[test]
    fn test_winding_does_not_matter() {
        let mut cw = Raster::new(8, 8, BG);
        let mut ccw = Raster::new(8, 8, BG);
        let mut q = square(0.0, 0.0, 8.0);
        cw.fill_quad(q, FILL, LINE, 1.0);
        q.reverse();
        ccw.fill_quad(q, FILL, LINE, 1.0);
        assert_eq!(cw.pixels, ccw.pixels);
    }

    #[test]
    fn test_rotated_quad_leaves_corners_empty() {
        let mut r = Raster::new(9, 9, BG);
        // Diamond centred on (4.5, 4.5).
        r.fill_quad([(4.5, 0.0), (9.0, 4.5), (4.5, 9.0), (0.0, 4.5)], FILL, LINE, 0.5);
        assert_eq!(r.get(0, 0), Some(BG));
        assert_eq!(r.get(8, 8), Some(BG));
        assert_eq!(r.get(4, 4), Some(FILL));
    }

    #[test]
    fn test_clipping_off_raster() {
        let mut r = Raster::new(4, 4, BG);
        r.fill_quad(square(-10.0, -10.0, 5.0), FILL, LINE, 1.0);
        r.fill_quad(square(2.0, 2.0, 50.0), FILL, LINE, 0.0);
        r.fill_rect(3, 0, 100, 1, LINE);
        assert_eq!(r.get(0, 0), Some(BG));
        assert_eq!(r.get(3, 3), Some(FILL));
        assert_eq!(r.get(3, 0), Some(LINE));
    }

    #[test]
    fn test_render_half_blocks() {
        let mut r = Raster::new(2, 4, BG);
        r.set(0, 0, FILL);
        r.set(0, 1, LINE);
        r.set(1, 3, FILL);
        let area = Rect::new(0, 0, 2, 2);
        let mut buf = Buffer::empty(area);
        r.render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "▀");
        assert_eq!(buf[(0, 0)].fg, FILL);
        assert_eq!(buf[(0, 0)].bg, LINE);
        assert_eq!(buf[(1, 1)].fg, BG);
        assert_eq!(buf[(1, 1)].bg, FILL);
    }
}
