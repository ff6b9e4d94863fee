//! Minimal growable row-major numeric and text grids backing [`super::Dataset`].
//!
//! These are intentionally not `nalgebra` types: the dataset container grows
//! by row append and by column removal at arbitrary points, which a
//! column-major linear-algebra matrix does not make pleasant. Numerical
//! kernels (gradients, Hessians, covariance) convert to `nalgebra::DMatrix`/
//! `DVector` at their boundary instead — see [`crate::numerical`].

/// A dense, row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Grid {
    /// A zero-filled grid of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Grid { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Build from row-major data, checking the shape matches.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols, "row-major data length must equal rows*cols");
        Grid { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.cols + c] = v;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        let c = self.cols;
        &mut self.data[r * c..(r + 1) * c]
    }

    pub fn column(&self, c: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    /// Append a row to the bottom, reallocating.
    pub fn push_row(&mut self, row: &[f64]) {
        assert_eq!(row.len(), self.cols, "row width mismatch on push_row");
        self.data.extend_from_slice(row);
        self.rows += 1;
    }

    /// Return a new grid with rows `[0, at)` and `[at, rows)`.
    pub fn split_rows(&self, at: usize) -> (Grid, Grid) {
        let mut top = Vec::with_capacity(at * self.cols);
        let mut bottom = Vec::with_capacity((self.rows - at) * self.cols);
        for r in 0..self.rows {
            if r < at {
                top.extend_from_slice(self.row(r));
            } else {
                bottom.extend_from_slice(self.row(r));
            }
        }
        (Grid::from_row_major(at, self.cols, top), Grid::from_row_major(self.rows - at, self.cols, bottom))
    }

    /// Stack two grids vertically (same column count required by caller).
    pub fn stack_rows(a: &Grid, b: &Grid) -> Grid {
        assert_eq!(a.cols, b.cols, "column count mismatch in vertical stack");
        let mut data = a.data.clone();
        data.extend_from_slice(&b.data);
        Grid::from_row_major(a.rows + b.rows, a.cols, data)
    }

    /// Stack two grids horizontally (same row count required by caller).
    pub fn stack_cols(a: &Grid, b: &Grid) -> Grid {
        assert_eq!(a.rows, b.rows, "row count mismatch in horizontal stack");
        let cols = a.cols + b.cols;
        let mut data = vec![0.0; a.rows * cols];
        for r in 0..a.rows {
            data[r * cols..r * cols + a.cols].copy_from_slice(a.row(r));
            data[r * cols + a.cols..(r + 1) * cols].copy_from_slice(b.row(r));
        }
        Grid::from_row_major(a.rows, cols, data)
    }

    /// Drop columns where `mask[c]` is true.
    pub fn remove_columns(&self, mask: &[bool]) -> Grid {
        let keep: Vec<usize> = (0..self.cols).filter(|&c| !mask[c]).collect();
        let mut data = Vec::with_capacity(self.rows * keep.len());
        for r in 0..self.rows {
            for &c in &keep {
                data.push(self.get(r, c));
            }
        }
        Grid::from_row_major(self.rows, keep.len(), data)
    }

    /// Drop rows where `mask[r]` is true.
    pub fn remove_rows(&self, mask: &[bool]) -> Grid {
        let mut data = Vec::new();
        let mut kept = 0;
        for r in 0..self.rows {
            if !mask[r] {
                data.extend_from_slice(self.row(r));
                kept += 1;
            }
        }
        Grid::from_row_major(kept, self.cols, data)
    }

    /// Transpose rows/columns.
    pub fn transpose(&self) -> Grid {
        let mut out = Grid::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }

    /// Reorder rows in place according to a permutation (`perm[i]` is the
    /// original row that should end up at position `i`), cycle-by-cycle so
    /// auxiliary memory stays `O(cols)` (§4.1 "Sort in place").
    pub fn permute_rows_in_place(&mut self, perm: &[usize]) {
        let n = self.rows;
        let cols = self.cols;
        let mut visited = vec![false; n];
        let mut scratch = vec![0.0; cols];
        for start in 0..n {
            if visited[start] || perm[start] == start {
                visited[start] = true;
                continue;
            }
            scratch.copy_from_slice(self.row(start));
            let mut cur = start;
            loop {
                let src = perm[cur];
                visited[cur] = true;
                if src == start {
                    self.row_mut(cur).copy_from_slice(&scratch);
                    break;
                }
                let tmp = self.row(src).to_vec();
                self.row_mut(cur).copy_from_slice(&tmp);
                cur = src;
            }
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// A dense, row-major grid of text cells. Blank cells are the empty string
/// rather than a null pointer (§3.1's "shared sentinel empty string").
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextGrid {
    rows: usize,
    cols: usize,
    data: Vec<String>,
}

impl TextGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        TextGrid { rows, cols, data: vec![String::new(); rows * cols] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> &str {
        &self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: impl Into<String>) {
        self.data[r * self.cols + c] = v.into();
    }

    pub fn push_row(&mut self, row: &[String]) {
        assert_eq!(row.len(), self.cols, "row width mismatch on push_row");
        self.data.extend_from_slice(row);
        self.rows += 1;
    }

    pub fn split_rows(&self, at: usize) -> (TextGrid, TextGrid) {
        let mut top = Vec::with_capacity(at * self.cols);
        let mut bottom = Vec::with_capacity((self.rows - at) * self.cols);
        for r in 0..self.rows {
            let row: Vec<String> = (0..self.cols).map(|c| self.get(r, c).to_string()).collect();
            if r < at {
                top.extend(row);
            } else {
                bottom.extend(row);
            }
        }
        (TextGrid { rows: at, cols: self.cols, data: top }, TextGrid { rows: self.rows - at, cols: self.cols, data: bottom })
    }

    pub fn stack_rows(a: &TextGrid, b: &TextGrid) -> TextGrid {
        assert_eq!(a.cols, b.cols);
        let mut data = a.data.clone();
        data.extend(b.data.iter().cloned());
        TextGrid { rows: a.rows + b.rows, cols: a.cols, data }
    }

    pub fn remove_rows(&self, mask: &[bool]) -> TextGrid {
        let mut data = Vec::new();
        let mut kept = 0;
        for r in 0..self.rows {
            if !mask[r] {
                data.extend((0..self.cols).map(|c| self.get(r, c).to_string()));
                kept += 1;
            }
        }
        TextGrid { rows: kept, cols: self.cols, data }
    }

    pub fn transpose(&self) -> TextGrid {
        let mut out = TextGrid::new(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(c, r, self.get(r, c).to_string());
            }
        }
        out
    }

    pub fn permute_rows_in_place(&mut self, perm: &[usize]) {
        let n = self.rows;
        let cols = self.cols;
        let mut out = vec![String::new(); n * cols];
        for (new_r, &old_r) in perm.iter().enumerate() {
            for c in 0..cols {
                out[new_r * cols + c] = self.get(old_r, c).to_string();
            }
        }
        self.data = out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_and_split_roundtrip_rows() {
        let a = Grid::from_row_major(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let b = Grid::from_row_major(1, 2, vec![5.0, 6.0]);
        let s = Grid::stack_rows(&a, &b);
        assert_eq!(s.rows(), 3);
        let (top, bottom) = s.split_rows(2);
        assert_eq!(top, a);
        assert_eq!(bottom, b);
    }

    #[test]
    fn permute_rows_cycle_sort() {
        let mut g = Grid::from_row_major(3, 1, vec![3.0, 1.0, 2.0]);
        // sorted ascending: row order should become [1,2,0]
        let perm = vec![1usize, 2, 0];
        g.permute_rows_in_place(&perm);
        assert_eq!(g.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn remove_columns_drops_masked() {
        let g = Grid::from_row_major(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let out = g.remove_columns(&[false, true, false]);
        assert_eq!(out.cols(), 2);
        assert_eq!(out.row(0), &[1.0, 3.0]);
        assert_eq!(out.row(1), &[4.0, 6.0]);
    }
}
