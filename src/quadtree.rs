//! Barnes-Hut quadtree over node positions
//!
//! Cells live in a flat arena. Children are always pushed after their parent,
//! so walking the arena backwards visits every child before its parent, which
//! is all the bottom-up charge accumulation needs.

/// Subdivision stops at this depth; deeper points share a leaf
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone)]
enum CellKind {
    /// Point indices; all points are coincident unless `MAX_DEPTH` was hit
    Leaf(Vec<usize>),
    /// Children indexed by quadrant: `(y >= ym) << 1 | (x >= xm)`
    Internal([Option<usize>; 4]),
}

/// One square region of the tree
#[derive(Debug, Clone)]
pub struct Cell {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// Charge-weighted centroid, valid after accumulation
    pub cx: f64,
    pub cy: f64,
    /// Summed charge of every point in the cell
    pub charge: f64,
    kind: CellKind,
}

impl Cell {
    fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            cx: 0.0,
            cy: 0.0,
            charge: 0.0,
            kind: CellKind::Leaf(Vec::new()),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Point indices when this cell is a leaf
    pub fn points(&self) -> Option<&[usize]> {
        match &self.kind {
            CellKind::Leaf(points) => Some(points),
            CellKind::Internal(_) => None,
        }
    }

    fn quadrant(&self, x: f64, y: f64) -> (usize, [f64; 4]) {
        let xm = (self.x0 + self.x1) / 2.0;
        let ym = (self.y0 + self.y1) / 2.0;
        let right = x >= xm;
        let bottom = y >= ym;
        let (x0, x1) = if right { (xm, self.x1) } else { (self.x0, xm) };
        let (y0, y1) = if bottom { (ym, self.y1) } else { (self.y0, ym) };
        ((usize::from(bottom) << 1) | usize::from(right), [x0, y0, x1, y1])
    }
}

/// Quadtree built over a set of points
#[derive(Debug, Clone, Default)]
pub struct QuadTree {
    cells: Vec<Cell>,
    points: Vec<(f64, f64)>,
}

impl QuadTree {
    /// Build a tree over `points`; non-finite points are left out
    pub fn build(points: &[(f64, f64)]) -> Self {
        let finite: Vec<usize> = (0..points.len())
            .filter(|&i| points[i].0.is_finite() && points[i].1.is_finite())
            .collect();

        let mut tree = Self {
            cells: Vec::new(),
            points: points.to_vec(),
        };
        if finite.is_empty() {
            return tree;
        }

        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &i in &finite {
            let (x, y) = points[i];
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        let side = (x1 - x0).max(y1 - y0).max(1.0);
        tree.cells.push(Cell::new(x0, y0, x0 + side, y0 + side));

        for i in finite {
            tree.insert(i);
        }
        tree
    }

    fn insert(&mut self, point: usize) {
        let (px, py) = self.points[point];
        let mut current = 0;
        let mut depth = 0;

        loop {
            match &mut self.cells[current].kind {
                CellKind::Leaf(existing) if existing.is_empty() => {
                    existing.push(point);
                    return;
                }
                CellKind::Leaf(existing) => {
                    let (qx, qy) = self.points[existing[0]];
                    if (qx == px && qy == py) || depth >= MAX_DEPTH {
                        existing.push(point);
                        return;
                    }
                    // Split: the resident points move down one level and the
                    // new point is placed on the next loop iteration.
                    let resident = std::mem::take(existing);
                    let (quadrant, [cx0, cy0, cx1, cy1]) = self.cells[current].quadrant(qx, qy);
                    let mut child = Cell::new(cx0, cy0, cx1, cy1);
                    child.kind = CellKind::Leaf(resident);
                    let child_index = self.cells.len();
                    self.cells.push(child);

                    let mut children = [None; 4];
                    children[quadrant] = Some(child_index);
                    self.cells[current].kind = CellKind::Internal(children);
                }
                CellKind::Internal(children) => {
                    let children = *children;
                    let (quadrant, [cx0, cy0, cx1, cy1]) = self.cells[current].quadrant(px, py);
                    current = match children[quadrant] {
                        Some(child) => child,
                        None => {
                            let child_index = self.cells.len();
                            self.cells.push(Cell::new(cx0, cy0, cx1, cy1));
                            if let CellKind::Internal(children) = &mut self.cells[current].kind {
                                children[quadrant] = Some(child_index);
                            }
                            child_index
                        }
                    };
                    depth += 1;
                }
            }
        }
    }

    /// Sum per-point charges up the tree and place each cell's centroid at the
    /// charge-weighted mean of its children.
    pub fn accumulate(&mut self, charges: &[f64]) {
        for index in (0..self.cells.len()).rev() {
            let (charge, cx, cy) = match &self.cells[index].kind {
                CellKind::Leaf(points) => {
                    let charge: f64 = points.iter().map(|&p| charges[p]).sum();
                    let (x, y) = points.first().map(|&p| self.points[p]).unwrap_or_default();
                    (charge, x, y)
                }
                CellKind::Internal(children) => {
                    let (mut charge, mut weight, mut x, mut y) = (0.0, 0.0, 0.0, 0.0);
                    for child in children.iter().flatten() {
                        let child = &self.cells[*child];
                        let c = child.charge.abs();
                        if c != 0.0 {
                            charge += child.charge;
                            weight += c;
                            x += c * child.cx;
                            y += c * child.cy;
                        }
                    }
                    let cell = &self.cells[index];
                    if weight > 0.0 {
                        (charge, x / weight, y / weight)
                    } else {
                        (charge, (cell.x0 + cell.x1) / 2.0, (cell.y0 + cell.y1) / 2.0)
                    }
                }
            };
            let cell = &mut self.cells[index];
            cell.charge = charge;
            cell.cx = cx;
            cell.cy = cy;
        }
    }

    /// Pre-order traversal. The visitor returns `true` to skip a cell's children.
    pub fn visit(&self, mut visitor: impl FnMut(&Cell) -> bool) {
        if self.is_empty() {
            return;
        }
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let cell = &self.cells[index];
            if visitor(cell) {
                continue;
            }
            if let CellKind::Internal(children) = &cell.kind {
                stack.extend(children.iter().rev().flatten());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
