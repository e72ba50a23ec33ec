//! Trim paths.
//!
//! A trim keeps the part of a path between two fractions of its length,
//! shifted by an offset. The window runs forward from `start` to `end` and
//! wraps through the path's origin when it has to, so a trim may come back as
//! two pieces.

use kurbo::{BezPath, Line, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Point, QuadBez};

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimMode {
    /// Every path is trimmed by the full window on its own.
    #[default]
    Simultaneously,
    /// Paths are laid end to end and trimmed as one length.
    Individually,
}

impl TrimMode {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => TrimMode::Individually,
            _ => TrimMode::Simultaneously,
        }
    }
}

/// Evaluated trim values: `start` and `end` in [0,1], `offset` in turns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f32,
    pub end: f32,
    pub offset: f32,
}

impl TrimWindow {
    pub const FULL: TrimWindow = TrimWindow {
        start: 0.0,
        end: 1.0,
        offset: 0.0,
    };

    pub fn new(start: f32, end: f32, offset: f32) -> Self {
        Self { start, end, offset }
    }

    /// Whether the window draws the whole path regardless of its length.
    pub fn is_full(&self, epsilon: f32) -> bool {
        (self.start == 1.0 && self.end == 0.0)
            || ((self.end - self.start).abs() - 1.0).abs() < epsilon
    }

    /// Arc-length ranges to keep on a path of `length`.
    pub fn ranges(&self, length: f64, epsilon: f32) -> TrimRanges {
        if self.is_full(epsilon) || !(length > 0.0) {
            return TrimRanges::Full;
        }
        let shift = self.offset as f64 * length;
        let mut lo = self.start as f64 * length + shift;
        let mut hi = self.end as f64 * length + shift;

        if lo >= length && hi >= length {
            lo = lo.rem_euclid(length);
            hi = hi.rem_euclid(length);
        }
        if lo < 0.0 {
            lo = lo.rem_euclid(length);
        }
        if hi < 0.0 {
            hi = hi.rem_euclid(length);
        }
        if lo == hi {
            return TrimRanges::Empty;
        }
        if lo > hi {
            lo -= length;
        }

        let mut ranges = vec![(lo.max(0.0), hi.min(length))];
        if hi > length {
            ranges.push((0.0, hi - length));
        } else if lo < 0.0 {
            ranges.push((length + lo, length));
        }
        TrimRanges::Ranges(ranges)
    }
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrimRanges {
    Full,
    Empty,
    Ranges(Vec<(f64, f64)>),
}

#[derive(Debug, Clone, Copy)]
struct MeasuredSegment {
    seg: PathSeg,
    offset: f64,
    length: f64,
    contour: usize,
}

/// A path with per-segment arc lengths, for extracting sub-ranges.
#[derive(Debug, Clone)]
pub struct MeasuredPath {
    segments: Vec<MeasuredSegment>,
    length: f64,
    accuracy: f64,
}

impl MeasuredPath {
    pub fn new(path: &BezPath, accuracy: f64) -> Self {
        let mut segments = Vec::new();
        let mut length = 0.0;
        let mut contour = 0;
        let mut first = Point::ZERO;
        let mut last = Point::ZERO;

        let mut push = |seg: PathSeg, contour: usize, segments: &mut Vec<MeasuredSegment>| {
            let seg_len = seg.arclen(accuracy);
            segments.push(MeasuredSegment {
                seg,
                offset: length,
                length: seg_len,
                contour,
            });
            length += seg_len;
        };

        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    contour += 1;
                    first = p;
                    last = p;
                }
                PathEl::LineTo(p) => {
                    push(PathSeg::Line(Line::new(last, p)), contour, &mut segments);
                    last = p;
                }
                PathEl::QuadTo(p1, p2) => {
                    push(PathSeg::Quad(QuadBez::new(last, p1, p2)), contour, &mut segments);
                    last = p2;
                }
                PathEl::CurveTo(p1, p2, p3) => {
                    push(
                        PathSeg::Cubic(kurbo::CubicBez::new(last, p1, p2, p3)),
                        contour,
                        &mut segments,
                    );
                    last = p3;
                }
                PathEl::ClosePath => {
                    if last != first {
                        push(PathSeg::Line(Line::new(last, first)), contour, &mut segments);
                    }
                    last = first;
                }
            }
        }

        Self {
            segments,
            length,
            accuracy,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Append the part of the path between arc lengths `from` and `to`.
    pub fn append_range(&self, from: f64, to: f64, out: &mut BezPath) {
        if to <= from {
            return;
        }
        let mut pen: Option<(usize, usize)> = None;
        for (index, m) in self.segments.iter().enumerate() {
            let seg_end = m.offset + m.length;
            if m.length <= 0.0 || seg_end <= from || m.offset >= to {
                continue;
            }
            let t0 = if from > m.offset {
                m.seg.inv_arclen(from - m.offset, self.accuracy)
            } else {
                0.0
            };
            let t1 = if to < seg_end {
                m.seg.inv_arclen(to - m.offset, self.accuracy)
            } else {
                1.0
            };
            let piece = m.seg.subsegment(t0..t1);
            let continues = t0 == 0.0
                && pen.is_some_and(|(contour, prev)| contour == m.contour && prev + 1 == index);
            if !continues {
                out.move_to(piece.start());
            }
            push_seg(out, piece);
            pen = (t1 == 1.0).then_some((m.contour, index));
        }
    }

    /// Trim this path by `window`.
    pub fn trim(&self, source: &BezPath, window: &TrimWindow, epsilon: f32) -> BezPath {
        match window.ranges(self.length, epsilon) {
            TrimRanges::Full => source.clone(),
            TrimRanges::Empty => BezPath::new(),
            TrimRanges::Ranges(ranges) => {
                let mut out = BezPath::new();
                for (from, to) in ranges {
                    self.append_range(from, to, &mut out);
                }
                out
            }
        }
    }
}

fn push_seg(out: &mut BezPath, seg: PathSeg) {
    match seg {
        PathSeg::Line(l) => out.line_to(l.p1),
        PathSeg::Quad(q) => out.quad_to(q.p1, q.p2),
        PathSeg::Cubic(c) => out.curve_to(c.p1, c.p2, c.p3),
    }
}

/// Trim a single path.
pub fn trim_path(path: &BezPath, window: &TrimWindow, config: &EngineConfig) -> BezPath {
    if window.is_full(config.trim_epsilon) {
        return path.clone();
    }
    MeasuredPath::new(path, config.arclen_accuracy).trim(path, window, config.trim_epsilon)
}

/// Trim every path of a group according to `mode`.
pub fn trim_paths(
    paths: &[BezPath],
    window: &TrimWindow,
    mode: TrimMode,
    config: &EngineConfig,
) -> Vec<BezPath> {
    if window.is_full(config.trim_epsilon) {
        return paths.to_vec();
    }
    match mode {
        TrimMode::Simultaneously => paths
            .iter()
            .map(|path| trim_path(path, window, config))
            .collect(),
        TrimMode::Individually => {
            let measured: Vec<MeasuredPath> = paths
                .iter()
                .map(|path| MeasuredPath::new(path, config.arclen_accuracy))
                .collect();
            let total: f64 = measured.iter().map(MeasuredPath::length).sum();
            let ranges = match window.ranges(total, config.trim_epsilon) {
                TrimRanges::Full => return paths.to_vec(),
                TrimRanges::Empty => return vec![BezPath::new(); paths.len()],
                TrimRanges::Ranges(ranges) => ranges,
            };
            let mut offset = 0.0;
            measured
                .iter()
                .map(|m| {
                    let mut out = BezPath::new();
                    for &(from, to) in &ranges {
                        let from = from.max(offset) - offset;
                        let to = to.min(offset + m.length()) - offset;
                        m.append_range(from, to, &mut out);
                    }
                    offset += m.length();
                    out
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(len: f64) -> BezPath {
        let mut p = BezPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((len, 0.0));
        p
    }

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn pieces(path: &BezPath) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        let mut start = 0.0;
        for el in path.elements() {
            match el {
                PathEl::MoveTo(p) => start = p.x,
                PathEl::LineTo(p) => out.push((start, p.x)),
                _ => {}
            }
        }
        out
    }

    fn close(a: &[(f64, f64)], b: &[(f64, f64)]) -> bool {
        a.len() == b.len()
            && a
                .iter()
                .zip(b)
                .all(|(x, y)| (x.0 - y.0).abs() < 1e-4 && (x.1 - y.1).abs() < 1e-4)
    }

    #[test]
    fn test_full_window_is_untouched() {
        let path = line(100.0);
        let full = trim_path(&path, &TrimWindow::new(0.0, 1.0, 0.0), &config());
        assert_eq!(full.elements(), path.elements());
        let sentinel = trim_path(&path, &TrimWindow::new(1.0, 0.0, 0.0), &config());
        assert_eq!(sentinel.elements(), path.elements());
    }

    #[test]
    fn test_middle_half() {
        let out = trim_path(&line(100.0), &TrimWindow::new(0.25, 0.75, 0.0), &config());
        assert!(close(&pieces(&out), &[(25.0, 75.0)]));
    }

    #[test]
    fn test_reversed_window_wraps() {
        let out = trim_path(&line(100.0), &TrimWindow::new(0.8, 0.3, 0.0), &config());
        let got = pieces(&out);
        assert!(close(&got, &[(0.0, 30.0), (80.0, 100.0)]), "{got:?}");
    }

    #[test]
    fn test_offset_past_the_end_wraps() {
        let out = trim_path(&line(100.0), &TrimWindow::new(0.0, 0.5, 0.75), &config());
        let got = pieces(&out);
        assert!(close(&got, &[(75.0, 100.0), (0.0, 25.0)]), "{got:?}");
    }

    #[test]
    fn test_negative_offset() {
        let out = trim_path(&line(100.0), &TrimWindow::new(0.0, 0.25, -0.5), &config());
        assert!(close(&pieces(&out), &[(50.0, 75.0)]));
    }

    #[test]
    fn test_empty_window() {
        let out = trim_path(&line(100.0), &TrimWindow::new(0.4, 0.4, 0.0), &config());
        assert!(out.elements().is_empty());
    }

    #[test]
    fn test_ranges() {
        let w = TrimWindow::new(0.75, 1.25, 0.0);
        assert_eq!(w.ranges(100.0, 0.01), TrimRanges::Ranges(vec![(75.0, 100.0), (0.0, 25.0)]));
        assert_eq!(TrimWindow::FULL.ranges(100.0, 0.01), TrimRanges::Full);
    }

    #[test]
    fn test_closed_path_measures_closing_edge() {
        let mut square = BezPath::new();
        square.move_to((0.0, 0.0));
        square.line_to((10.0, 0.0));
        square.line_to((10.0, 10.0));
        square.line_to((0.0, 10.0));
        square.close_path();
        let measured = MeasuredPath::new(&square, 0.1);
        assert!((measured.length() - 40.0).abs() < 1e-9);

        let out = measured.trim(&square, &TrimWindow::new(0.875, 1.0, 0.0), 0.01);
        assert_eq!(out.elements()[0], PathEl::MoveTo(Point::new(0.0, 5.0)));
        assert_eq!(out.elements()[1], PathEl::LineTo(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_segments_stay_connected() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.line_to((20.0, 0.0));
        let out = trim_path(&path, &TrimWindow::new(0.25, 0.75, 0.0), &config());
        let moves = out
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::MoveTo(_)))
            .count();
        assert_eq!(moves, 1);
    }

    #[test]
    fn test_individually_spans_all_paths() {
        let paths = vec![line(100.0), line(100.0)];
        let out = trim_paths(
            &paths,
            &TrimWindow::new(0.0, 0.75, 0.0),
            TrimMode::Individually,
            &config(),
        );
        assert_eq!(out[0].elements(), paths[0].elements());
        assert!(close(&pieces(&out[1]), &[(0.0, 50.0)]));

        let each = trim_paths(
            &paths,
            &TrimWindow::new(0.0, 0.75, 0.0),
            TrimMode::Simultaneously,
            &config(),
        );
        assert!(close(&pieces(&each[1]), &[(0.0, 75.0)]));
    }
}
